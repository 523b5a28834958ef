//! Systematic variants of the hadronic analysis.

use std::fmt;

use na_core::EventWeights;
use serde::{Deserialize, Serialize};

/// A systematic variant. The discriminant is the integer alias used to
/// index per-variant storage.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Systematic {
    Nom = 0,
    PuUp,
    PuDn,
    PdfUp,
    PdfDn,
    PsUp,
    PsDn,
    JecUp,
    JecDn,
    JerUp,
    JerDn,
    JmsUp,
    JmsDn,
    JmrUp,
    JmrDn,
}

impl Systematic {
    /// Number of variants, nominal included.
    pub const COUNT: usize = 15;

    /// All variants in alias order.
    pub const ALL: [Systematic; Self::COUNT] = [
        Self::Nom,
        Self::PuUp,
        Self::PuDn,
        Self::PdfUp,
        Self::PdfDn,
        Self::PsUp,
        Self::PsDn,
        Self::JecUp,
        Self::JecDn,
        Self::JerUp,
        Self::JerDn,
        Self::JmsUp,
        Self::JmsDn,
        Self::JmrUp,
        Self::JmrDn,
    ];

    /// Integer alias (position in [`Systematic::ALL`]).
    pub fn index(self) -> usize {
        self as usize
    }

    /// Short label used in histogram names.
    pub fn label(self) -> &'static str {
        match self {
            Self::Nom => "nom",
            Self::PuUp => "pu_up",
            Self::PuDn => "pu_dn",
            Self::PdfUp => "pdf_up",
            Self::PdfDn => "pdf_dn",
            Self::PsUp => "ps_up",
            Self::PsDn => "ps_dn",
            Self::JecUp => "jec_up",
            Self::JecDn => "jec_dn",
            Self::JerUp => "jer_up",
            Self::JerDn => "jer_dn",
            Self::JmsUp => "jms_up",
            Self::JmsDn => "jms_dn",
            Self::JmrUp => "jmr_up",
            Self::JmrDn => "jmr_dn",
        }
    }

    /// Whether the variant changes jet four-vectors (as opposed to weights).
    pub fn is_kinematic(self) -> bool {
        matches!(
            self,
            Self::JecUp
                | Self::JecDn
                | Self::JerUp
                | Self::JerDn
                | Self::JmsUp
                | Self::JmsDn
                | Self::JmrUp
                | Self::JmrDn
        )
    }

    /// Extra PDF or parton-shower factor of this variant, 1 for the rest.
    fn theory_factor(self, w: &EventWeights) -> f64 {
        let factor = match self {
            Self::PdfUp => w.pdf_weight_up,
            Self::PdfDn => w.pdf_weight_down,
            Self::PsUp => w.ps_weight_up,
            Self::PsDn => w.ps_weight_down,
            _ => None,
        };
        factor.unwrap_or(1.0)
    }

    /// Event weight under this variant.
    ///
    /// Pileup variants replace the nominal pileup weight with the shifted
    /// one; every other variant scales [`EventWeights::nominal`].
    pub fn event_weight(self, w: &EventWeights) -> f64 {
        let pileup_shift = match self {
            Self::PuUp => w.pu_weight_up,
            Self::PuDn => w.pu_weight_down,
            _ => None,
        };
        match pileup_shift {
            Some(pu) => w.gen_weight * pu,
            None => w.nominal() * self.theory_factor(w),
        }
    }
}

impl fmt::Display for Systematic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
