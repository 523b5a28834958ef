//! Per-systematic copies of jet kinematics.
//!
//! [`JetSysColl`] keeps, for every [`Systematic`], the selected jets with
//! their momentum, mass and soft-drop mass replaced by the shifted values
//! stored upstream. Jets keep the index of their source record so raw
//! substructure variables (tau32, b-tag) can be looked up afterwards.

use na_core::{FatJet, HasP4, Jet, JetVariations, LorentzVector};

use crate::systematics::Systematic;

/// A jet source that carries shifted kinematics.
pub trait VariedSource: HasP4 {
    /// Large-radius jets also receive jet-mass scale/resolution shifts and
    /// carry a soft-drop mass.
    const LARGE_RADIUS: bool;

    /// Raw `(pt, eta, phi, mass)`.
    fn raw_kinematics(&self) -> (f64, f64, f64, f64);

    /// Stored shifted values.
    fn variations(&self) -> &JetVariations;

    /// Raw soft-drop mass.
    fn raw_msoftdrop(&self) -> Option<f64> {
        None
    }
}

impl VariedSource for Jet {
    const LARGE_RADIUS: bool = false;

    fn raw_kinematics(&self) -> (f64, f64, f64, f64) {
        (self.pt, self.eta, self.phi, self.mass)
    }

    fn variations(&self) -> &JetVariations {
        &self.variations
    }
}

impl VariedSource for FatJet {
    const LARGE_RADIUS: bool = true;

    fn raw_kinematics(&self) -> (f64, f64, f64, f64) {
        (self.pt, self.eta, self.phi, self.mass)
    }

    fn variations(&self) -> &JetVariations {
        &self.variations
    }

    fn raw_msoftdrop(&self) -> Option<f64> {
        self.msoftdrop
    }
}

/// One jet under one systematic variant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VariedJet {
    /// Index of the source record in the event collection.
    pub index: usize,
    /// Shifted four-momentum.
    pub p4: LorentzVector,
    /// Shifted soft-drop mass (large-radius jets only).
    pub msd: Option<f64>,
}

impl HasP4 for VariedJet {
    fn p4(&self) -> LorentzVector {
        self.p4
    }
}

/// Selected jets of one collection, copied once per systematic variant.
#[derive(Debug, Clone)]
pub struct JetSysColl {
    variants: Vec<Vec<VariedJet>>,
}

impl JetSysColl {
    /// Build the per-variant copies of the jets in `jets` that pass `sel`.
    ///
    /// Weight-only variants reuse the nominal kinematics. Missing shifted
    /// values fall back to nominal, and a missing nominal to raw.
    pub fn build<J, F>(jets: &[J], sel: F) -> Self
    where
        J: VariedSource,
        F: Fn(&J) -> bool,
    {
        let selected: Vec<(usize, &J)> = jets.iter().enumerate().filter(|(_, j)| sel(j)).collect();
        let variants = Systematic::ALL
            .iter()
            .map(|&syst| {
                selected
                    .iter()
                    .map(|&(index, jet)| {
                        let (pt, eta, phi, mass, msd) = shifted_kinematics(jet, syst);
                        VariedJet {
                            index,
                            p4: LorentzVector::from_pt_eta_phi_m(pt, eta, phi, mass),
                            msd,
                        }
                    })
                    .collect()
            })
            .collect();
        Self { variants }
    }

    /// Jets under variant `syst`, in source order.
    pub fn variant(&self, syst: Systematic) -> &[VariedJet] {
        &self.variants[syst.index()]
    }

    /// Number of selected jets (identical for every variant).
    pub fn len(&self) -> usize {
        self.variants.first().map_or(0, Vec::len)
    }

    /// Whether no jet passed the selection.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

type Kinematics = (f64, f64, f64, f64, Option<f64>);

fn shifted_kinematics<J: VariedSource>(jet: &J, syst: Systematic) -> Kinematics {
    let (raw_pt, eta, phi, raw_mass) = jet.raw_kinematics();
    let v = jet.variations();
    let pt_nom = v.pt_nom.unwrap_or(raw_pt);
    let mass_nom = v.mass_nom.unwrap_or(raw_mass);
    let msd_nom = if J::LARGE_RADIUS { v.msoftdrop_nom.or(jet.raw_msoftdrop()) } else { None };

    use Systematic::*;
    let (pt, mass, msd) = match syst {
        JerUp => (v.pt_jer_up, v.mass_jer_up, v.msoftdrop_jer_up),
        JerDn => (v.pt_jer_down, v.mass_jer_down, v.msoftdrop_jer_down),
        JecUp => (v.pt_jes_up, v.mass_jes_up, v.msoftdrop_jes_up),
        JecDn => (v.pt_jes_down, v.mass_jes_down, v.msoftdrop_jes_down),
        JmrUp if J::LARGE_RADIUS => (None, v.mass_jmr_up, v.msoftdrop_jmr_up),
        JmrDn if J::LARGE_RADIUS => (None, v.mass_jmr_down, v.msoftdrop_jmr_down),
        JmsUp if J::LARGE_RADIUS => (None, v.mass_jms_up, v.msoftdrop_jms_up),
        JmsDn if J::LARGE_RADIUS => (None, v.mass_jms_down, v.msoftdrop_jms_down),
        _ => (None, None, None),
    };
    let msd = if J::LARGE_RADIUS { msd.or(msd_nom) } else { None };
    (pt.unwrap_or(pt_nom), eta, phi, mass.unwrap_or(mass_nom), msd)
}
