//! Four-vector kinematics in collider coordinates.

use std::f64::consts::PI;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

/// A Lorentz four-vector stored as Cartesian `(px, py, pz, E)`.
///
/// Constructed from the `(pt, eta, phi, m)` quantities stored in event
/// records. Accessors follow the usual hadron-collider conventions.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LorentzVector {
    /// x component of the momentum.
    pub px: f64,
    /// y component of the momentum.
    pub py: f64,
    /// z component of the momentum (beam axis).
    pub pz: f64,
    /// Energy.
    pub e: f64,
}

impl LorentzVector {
    /// Build from Cartesian components.
    pub const fn new(px: f64, py: f64, pz: f64, e: f64) -> Self {
        Self { px, py, pz, e }
    }

    /// Build from transverse momentum, pseudorapidity, azimuth and mass.
    ///
    /// A negative mass is interpreted as a spacelike vector with `m² = -m²`.
    pub fn from_pt_eta_phi_m(pt: f64, eta: f64, phi: f64, mass: f64) -> Self {
        let pt = pt.abs();
        let px = pt * phi.cos();
        let py = pt * phi.sin();
        let pz = pt * eta.sinh();
        let p2 = px * px + py * py + pz * pz;
        let e = if mass >= 0.0 {
            (p2 + mass * mass).sqrt()
        } else {
            (p2 - mass * mass).max(0.0).sqrt()
        };
        Self { px, py, pz, e }
    }

    /// Transverse momentum.
    pub fn pt(&self) -> f64 {
        self.px.hypot(self.py)
    }

    /// Magnitude of the three-momentum.
    pub fn p(&self) -> f64 {
        (self.px * self.px + self.py * self.py + self.pz * self.pz).sqrt()
    }

    /// Invariant mass squared.
    pub fn mass2(&self) -> f64 {
        self.e * self.e - (self.px * self.px + self.py * self.py + self.pz * self.pz)
    }

    /// Invariant mass. Spacelike vectors return `-sqrt(-m²)`.
    pub fn mass(&self) -> f64 {
        let m2 = self.mass2();
        if m2 < 0.0 { -(-m2).sqrt() } else { m2.sqrt() }
    }

    /// Azimuthal angle in `(-π, π]`.
    pub fn phi(&self) -> f64 {
        if self.px == 0.0 && self.py == 0.0 { 0.0 } else { self.py.atan2(self.px) }
    }

    /// Pseudorapidity. Vectors along the beam axis return `±1e10`.
    pub fn eta(&self) -> f64 {
        let p = self.p();
        if p == 0.0 {
            return 0.0;
        }
        let cos_theta = self.pz / p;
        if cos_theta * cos_theta < 1.0 {
            return -0.5 * ((1.0 - cos_theta) / (1.0 + cos_theta)).ln();
        }
        if self.pz > 0.0 { 1e10 } else { -1e10 }
    }

    /// Rapidity `0.5 ln((E + pz) / (E - pz))`.
    pub fn rapidity(&self) -> f64 {
        0.5 * ((self.e + self.pz) / (self.e - self.pz)).ln()
    }

    /// Absolute azimuthal separation, in `[0, π]`.
    pub fn delta_phi(&self, other: &Self) -> f64 {
        delta_phi(self.phi(), other.phi()).abs()
    }

    /// Angular separation `sqrt(Δη² + Δφ²)`.
    pub fn delta_r(&self, other: &Self) -> f64 {
        let deta = self.eta() - other.eta();
        let dphi = delta_phi(self.phi(), other.phi());
        deta.hypot(dphi)
    }
}

/// Signed azimuthal difference `a - b` wrapped into `[-π, π]`.
pub fn delta_phi(a: f64, b: f64) -> f64 {
    let mut d = a - b;
    while d > PI {
        d -= 2.0 * PI;
    }
    while d < -PI {
        d += 2.0 * PI;
    }
    d
}

impl Add for LorentzVector {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.px + rhs.px, self.py + rhs.py, self.pz + rhs.pz, self.e + rhs.e)
    }
}

impl AddAssign for LorentzVector {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sum for LorentzVector {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

impl<'a> Sum<&'a LorentzVector> for LorentzVector {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}
