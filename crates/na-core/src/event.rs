//! NanoAOD-style event records.
//!
//! One [`Event`] holds the flat per-object collections of a single
//! collision. Field names on the wire follow the NanoAOD branch names
//! (`jetId`, `subJetIdx1`, `pt_jesTotalUp`, ...), so records dumped from
//! NanoAOD trees deserialize without renaming.

#![allow(missing_docs)]

use serde::{Deserialize, Serialize};

use crate::kinematics::LorentzVector;
use crate::traits::HasP4;

/// Shifted jet kinematics produced upstream by the jet/MET uncertainty tools.
///
/// Every field is optional; absent values fall back to the nominal value,
/// and an absent nominal falls back to the raw kinematics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JetVariations {
    /// Nominal (corrected + smeared) pt.
    pub pt_nom: Option<f64>,
    /// Nominal mass.
    pub mass_nom: Option<f64>,
    /// pt with jet energy resolution shifted up.
    #[serde(rename = "pt_jerUp")]
    pub pt_jer_up: Option<f64>,
    /// pt with jet energy resolution shifted down.
    #[serde(rename = "pt_jerDown")]
    pub pt_jer_down: Option<f64>,
    /// pt with total jet energy scale shifted up.
    #[serde(rename = "pt_jesTotalUp")]
    pub pt_jes_up: Option<f64>,
    /// pt with total jet energy scale shifted down.
    #[serde(rename = "pt_jesTotalDown")]
    pub pt_jes_down: Option<f64>,
    /// Mass with jet energy resolution shifted up.
    #[serde(rename = "mass_jerUp")]
    pub mass_jer_up: Option<f64>,
    /// Mass with jet energy resolution shifted down.
    #[serde(rename = "mass_jerDown")]
    pub mass_jer_down: Option<f64>,
    /// Mass with total jet energy scale shifted up.
    #[serde(rename = "mass_jesTotalUp")]
    pub mass_jes_up: Option<f64>,
    /// Mass with total jet energy scale shifted down.
    #[serde(rename = "mass_jesTotalDown")]
    pub mass_jes_down: Option<f64>,
    /// Mass with jet mass resolution shifted up.
    #[serde(rename = "mass_jmrUp")]
    pub mass_jmr_up: Option<f64>,
    /// Mass with jet mass resolution shifted down.
    #[serde(rename = "mass_jmrDown")]
    pub mass_jmr_down: Option<f64>,
    /// Mass with jet mass scale shifted up.
    #[serde(rename = "mass_jmsUp")]
    pub mass_jms_up: Option<f64>,
    /// Mass with jet mass scale shifted down.
    #[serde(rename = "mass_jmsDown")]
    pub mass_jms_down: Option<f64>,
    /// Nominal soft-drop mass.
    pub msoftdrop_nom: Option<f64>,
    /// Soft-drop mass, JER up.
    #[serde(rename = "msoftdrop_jerUp")]
    pub msoftdrop_jer_up: Option<f64>,
    /// Soft-drop mass, JER down.
    #[serde(rename = "msoftdrop_jerDown")]
    pub msoftdrop_jer_down: Option<f64>,
    /// Soft-drop mass, JES up.
    #[serde(rename = "msoftdrop_jesTotalUp")]
    pub msoftdrop_jes_up: Option<f64>,
    /// Soft-drop mass, JES down.
    #[serde(rename = "msoftdrop_jesTotalDown")]
    pub msoftdrop_jes_down: Option<f64>,
    /// Soft-drop mass, JMR up.
    #[serde(rename = "msoftdrop_jmrUp")]
    pub msoftdrop_jmr_up: Option<f64>,
    /// Soft-drop mass, JMR down.
    #[serde(rename = "msoftdrop_jmrDown")]
    pub msoftdrop_jmr_down: Option<f64>,
    /// Soft-drop mass, JMS up.
    #[serde(rename = "msoftdrop_jmsUp")]
    pub msoftdrop_jms_up: Option<f64>,
    /// Soft-drop mass, JMS down.
    #[serde(rename = "msoftdrop_jmsDown")]
    pub msoftdrop_jms_down: Option<f64>,
}

/// Small-radius (AK4) jet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Jet {
    pub pt: f64,
    pub eta: f64,
    pub phi: f64,
    pub mass: f64,
    /// Jet identification bitmask; `> 0` passes loose ID.
    #[serde(rename = "jetId", default)]
    pub jet_id: i32,
    #[serde(flatten)]
    pub variations: JetVariations,
}

/// Large-radius (AK8) jet with substructure variables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FatJet {
    pub pt: f64,
    pub eta: f64,
    pub phi: f64,
    pub mass: f64,
    /// Soft-drop groomed mass; absent when grooming removed the jet.
    #[serde(default)]
    pub msoftdrop: Option<f64>,
    /// N-subjettiness tau2.
    #[serde(default)]
    pub tau2: f64,
    /// N-subjettiness tau3.
    #[serde(default)]
    pub tau3: f64,
    /// Energy-correlation ratio N3 (beta = 1).
    #[serde(default)]
    pub n3b1: f64,
    /// Highest subjet CSVv2 b-tag discriminant.
    #[serde(rename = "maxCSVV2", default)]
    pub max_csvv2: f64,
    #[serde(rename = "jetId", default)]
    pub jet_id: i32,
    /// Index into the `SubJet` collection, `-1` when absent.
    #[serde(rename = "subJetIdx1", default = "no_index")]
    pub sub_jet_idx1: i32,
    /// Index into the `SubJet` collection, `-1` when absent.
    #[serde(rename = "subJetIdx2", default = "no_index")]
    pub sub_jet_idx2: i32,
    #[serde(flatten)]
    pub variations: JetVariations,
}

fn no_index() -> i32 {
    -1
}

impl FatJet {
    /// tau3/tau2, defined as 0 when tau2 is not positive.
    pub fn tau32(&self) -> f64 {
        if self.tau2 > 0.0 { self.tau3 / self.tau2 } else { 0.0 }
    }
}

/// Reconstructed muon.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Muon {
    pub pt: f64,
    pub eta: f64,
    pub phi: f64,
    #[serde(default = "muon_mass")]
    pub mass: f64,
    #[serde(rename = "tightId", default)]
    pub tight_id: bool,
}

fn muon_mass() -> f64 {
    0.105_658
}

/// Generator-level jet (also used for generator subjets).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenJet {
    pub pt: f64,
    pub eta: f64,
    pub phi: f64,
    pub mass: f64,
}

/// Reconstructed soft-drop subjet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubJet {
    pub pt: f64,
    pub eta: f64,
    pub phi: f64,
    pub mass: f64,
}

/// Generator-level lepton dressed with nearby photons.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenDressedLepton {
    pub pt: f64,
    pub eta: f64,
    pub phi: f64,
    pub mass: f64,
    #[serde(rename = "pdgId")]
    pub pdg_id: i32,
}

macro_rules! impl_has_p4 {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl HasP4 for $ty {
                fn p4(&self) -> LorentzVector {
                    LorentzVector::from_pt_eta_phi_m(self.pt, self.eta, self.phi, self.mass)
                }
            }
        )+
    };
}

impl_has_p4!(Jet, FatJet, Muon, GenJet, SubJet, GenDressedLepton);

/// Per-event weights. Missing factors are treated as 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventWeights {
    #[serde(rename = "genWeight")]
    pub gen_weight: f64,
    #[serde(rename = "puWeight")]
    pub pu_weight: Option<f64>,
    #[serde(rename = "puWeightUp")]
    pub pu_weight_up: Option<f64>,
    #[serde(rename = "puWeightDown")]
    pub pu_weight_down: Option<f64>,
    #[serde(rename = "pdfWeightUp")]
    pub pdf_weight_up: Option<f64>,
    #[serde(rename = "pdfWeightDown")]
    pub pdf_weight_down: Option<f64>,
    #[serde(rename = "psWeightUp")]
    pub ps_weight_up: Option<f64>,
    #[serde(rename = "psWeightDown")]
    pub ps_weight_down: Option<f64>,
}

impl Default for EventWeights {
    fn default() -> Self {
        Self {
            gen_weight: 1.0,
            pu_weight: None,
            pu_weight_up: None,
            pu_weight_down: None,
            pdf_weight_up: None,
            pdf_weight_down: None,
            ps_weight_up: None,
            ps_weight_down: None,
        }
    }
}

impl EventWeights {
    /// Nominal event weight: generator weight times the nominal pileup weight.
    pub fn nominal(&self) -> f64 {
        self.gen_weight * self.pu_weight.unwrap_or(1.0)
    }
}

/// One collision event with its named object collections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Run number; simulation uses run 1.
    #[serde(default)]
    pub run: u32,
    #[serde(rename = "luminosityBlock", default)]
    pub luminosity_block: u32,
    #[serde(default)]
    pub event: u64,
    #[serde(flatten)]
    pub weights: EventWeights,
    #[serde(rename = "Jet", default)]
    pub jets: Vec<Jet>,
    #[serde(rename = "FatJet", default)]
    pub fat_jets: Vec<FatJet>,
    #[serde(rename = "Muon", default)]
    pub muons: Vec<Muon>,
    #[serde(rename = "GenJetAK8", default)]
    pub gen_jets_ak8: Vec<GenJet>,
    #[serde(rename = "SubGenJetAK8", default)]
    pub sub_gen_jets_ak8: Vec<GenJet>,
    #[serde(rename = "SubJet", default)]
    pub sub_jets: Vec<SubJet>,
    #[serde(rename = "GenDressedLepton", default)]
    pub gen_dressed_leptons: Vec<GenDressedLepton>,
}

impl Event {
    /// Simulated events carry run number 1.
    pub fn is_mc(&self) -> bool {
        self.run == 1
    }

    /// Parse one event from a JSON record.
    pub fn from_json(line: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(line)?)
    }
}
