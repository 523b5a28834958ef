//! Module configuration.
//!
//! Every parameter has a default, so a job file only names what it
//! changes. [`ModuleConfig`] is the tagged form used in job files:
//!
//! ```yaml
//! module:
//!   kind: ttbar_hadronic
//!   mode: signal
//!   pred_file: out/prediction.json
//! ```

#![allow(missing_docs)]

use std::path::PathBuf;

use na_core::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::module::AnalysisModule;
use crate::ttbar::TTbarResHadronic;
use crate::zjets::{ZPlusJetsXS, ZPlusJetsXS2D};

/// Which half of the mistag-rate method a hadronic job runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Anti-tag and probe: measure the mistag rate.
    #[default]
    Prediction,
    /// Single-tag region weighted by a previously measured rate.
    Signal,
}

/// Top-tagging working point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TopTagger {
    pub tau32_cut: f64,
    pub min_msd: f64,
    pub max_msd: f64,
}

impl TopTagger {
    /// `tau32 < tau32_cut` and `min_msd < msd < max_msd`; a missing soft-drop
    /// mass fails.
    pub fn pass(&self, tau32: f64, msd: Option<f64>) -> bool {
        let pass_tau32 = tau32 < self.tau32_cut;
        let pass_msd = msd.is_some_and(|m| self.min_msd < m && m < self.max_msd);
        pass_tau32 && pass_msd
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TTbarConfig {
    pub ht_cut: f64,
    pub min_msd: f64,
    pub max_msd: f64,
    pub tau32_cut: f64,
    pub ak8_pt_min: f64,
    pub ak4_pt_min: f64,
    pub max_abs_eta: f64,
    pub bdisc: f64,
    pub central_rapidity: f64,
    /// Seed of the probe/tag shuffling RNG.
    pub seed: u64,
    pub mode: RunMode,
    /// Histogram file holding `mistag<cat>` (signal mode only).
    pub pred_file: Option<PathBuf>,
    /// Directory of the mistag histograms inside `pred_file`.
    pub pred_dir: String,
}

impl Default for TTbarConfig {
    fn default() -> Self {
        Self {
            ht_cut: 1100.0,
            min_msd: 110.0,
            max_msd: 240.0,
            tau32_cut: 0.6,
            ak8_pt_min: 400.0,
            ak4_pt_min: 20.0,
            max_abs_eta: 2.5,
            bdisc: 0.7,
            central_rapidity: 1.0,
            seed: 12345,
            mode: RunMode::Prediction,
            pred_file: None,
            pred_dir: "ttbarres".to_string(),
        }
    }
}

impl TTbarConfig {
    /// Signal-mode configuration reading rates from `pred_file`.
    pub fn signal(pred_file: impl Into<PathBuf>) -> Self {
        Self { mode: RunMode::Signal, pred_file: Some(pred_file.into()), ..Self::default() }
    }

    pub fn top_tagger(&self) -> TopTagger {
        TopTagger { tau32_cut: self.tau32_cut, min_msd: self.min_msd, max_msd: self.max_msd }
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_msd >= self.max_msd {
            return Err(Error::Validation(format!(
                "min_msd ({}) must be below max_msd ({})",
                self.min_msd, self.max_msd
            )));
        }
        for (name, v) in [
            ("ht_cut", self.ht_cut),
            ("ak8_pt_min", self.ak8_pt_min),
            ("ak4_pt_min", self.ak4_pt_min),
            ("max_abs_eta", self.max_abs_eta),
            ("central_rapidity", self.central_rapidity),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(Error::Validation(format!("{name} must be finite and >= 0, got {v}")));
            }
        }
        if self.mode == RunMode::Signal && self.pred_file.is_none() {
            return Err(Error::Validation("signal mode requires pred_file".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZJetsConfig {
    pub min_zpt: f64,
    /// Inclusive reco Z mass window.
    pub z_mass_window: [f64; 2],
    pub min_jet_pt: f64,
    pub min_dphi_zjet: f64,
    pub match_dr: f64,
    pub groom_dr: f64,
    pub max_subjets: usize,
    /// Gen-level Z pt threshold as a fraction of `min_zpt`.
    pub gen_zpt_factor: f64,
    /// Gen-level jet pt threshold as a fraction of `min_jet_pt`.
    pub gen_jet_pt_factor: f64,
    /// Log per-event collections at debug level.
    pub verbose: bool,
}

impl Default for ZJetsConfig {
    fn default() -> Self {
        Self {
            min_zpt: 120.0,
            z_mass_window: [50.0, 150.0],
            min_jet_pt: 220.0,
            min_dphi_zjet: 1.57,
            match_dr: 0.05,
            groom_dr: 0.8,
            max_subjets: 2,
            gen_zpt_factor: 0.9,
            gen_jet_pt_factor: 0.8,
            verbose: false,
        }
    }
}

impl ZJetsConfig {
    pub fn validate(&self) -> Result<()> {
        let [lo, hi] = self.z_mass_window;
        if lo >= hi || lo.is_nan() || hi.is_nan() {
            return Err(Error::Validation(format!("z_mass_window [{lo}, {hi}] is empty")));
        }
        if self.match_dr <= 0.0 || self.groom_dr <= 0.0 {
            return Err(Error::Validation("match_dr and groom_dr must be positive".into()));
        }
        if self.max_subjets == 0 {
            return Err(Error::Validation("max_subjets must be at least 1".into()));
        }
        Ok(())
    }
}

/// A module selection with its parameters, as written in job files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ModuleConfig {
    #[serde(rename = "ttbar_hadronic")]
    TTbarHadronic(TTbarConfig),
    #[serde(rename = "zplusjets")]
    ZPlusJets(ZJetsConfig),
    #[serde(rename = "zplusjets_2d")]
    ZPlusJets2D(ZJetsConfig),
}

impl ModuleConfig {
    /// Validate and instantiate the module.
    pub fn build(&self) -> Result<Box<dyn AnalysisModule>> {
        Ok(match self {
            Self::TTbarHadronic(c) => Box::new(TTbarResHadronic::new(c.clone())?),
            Self::ZPlusJets(c) => Box::new(ZPlusJetsXS::new(c.clone())?),
            Self::ZPlusJets2D(c) => Box::new(ZPlusJetsXS2D::new(c.clone())?),
        })
    }
}
