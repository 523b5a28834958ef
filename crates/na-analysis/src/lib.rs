//! # na-analysis
//!
//! Event-selection modules for NanoAna:
//!
//! - [`TTbarResHadronic`]: data-driven mistag-rate background estimate for
//!   the all-hadronic ttbar resonance search (run once in prediction mode
//!   to measure the rate, then in signal mode to apply it).
//! - [`ZPlusJetsXS`] / [`ZPlusJetsXS2D`]: Z(→μμ)+jet groomed-mass response
//!   matrices for unfolding, in 1D (mass) and 2D (pt × mass).
//!
//! Modules implement [`AnalysisModule`] and are driven one event at a time
//! by a [`Processor`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod category;
pub mod config;
pub mod jets;
pub mod matching;
pub mod module;
pub mod processor;
pub mod systematics;
pub mod ttbar;
pub mod zjets;

pub use category::{AnalysisCategory, BtagBucket, RapidityRegion};
pub use config::{ModuleConfig, RunMode, TTbarConfig, TopTagger, ZJetsConfig};
pub use jets::{JetSysColl, VariedJet};
pub use module::AnalysisModule;
pub use processor::{JsonlEvents, ProcessStats, Processor};
pub use systematics::Systematic;
pub use ttbar::TTbarResHadronic;
pub use zjets::{ZPlusJetsXS, ZPlusJetsXS2D};
