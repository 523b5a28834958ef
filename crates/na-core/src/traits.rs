//! Core traits for NanoAna

use crate::kinematics::LorentzVector;

/// Any physics object that carries a four-momentum.
///
/// Object matching and grooming work on anything implementing this trait,
/// so reco jets, gen jets and subjets share one code path.
pub trait HasP4 {
    /// Four-momentum of the object.
    fn p4(&self) -> LorentzVector;
}

impl HasP4 for LorentzVector {
    fn p4(&self) -> LorentzVector {
        *self
    }
}

impl<T: HasP4 + ?Sized> HasP4 for &T {
    fn p4(&self) -> LorentzVector {
        (**self).p4()
    }
}
