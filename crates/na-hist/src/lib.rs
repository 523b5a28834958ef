//! # na-hist
//!
//! Histogram engine for NanoAna.
//!
//! Provides the weighted 1D/2D histograms filled by the analysis modules,
//! the multi-axis [`UnfoldBinning`] scheme used to flatten (pt, mass) phase
//! space into global bin numbers, the mistag-weighted
//! [`PredictedDistribution`] background accumulator, and the JSON
//! [`HistFile`] store the jobs write at the end.
//!
//! ## Example
//!
//! ```
//! use na_hist::Hist1D;
//!
//! let mut h = Hist1D::new("h_ak4ht", "h_ak4ht", 25, 0.0, 2500.0).unwrap();
//! h.fill_weighted(1234.0, 0.5);
//! assert_eq!(h.find_bin(1234.0), 13);
//! assert_eq!(h.content(13), 0.5);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod axis;
pub mod binning;
pub mod hist2d;
pub mod histogram;
pub mod predicted;
pub mod response;
pub mod store;

pub use axis::Axis;
pub use binning::{BinningAxis, BinningDistribution, UnfoldBinning};
pub use hist2d::Hist2D;
pub use histogram::Hist1D;
pub use predicted::PredictedDistribution;
pub use response::ResponseSummary;
pub use store::{HistDir, HistFile, HistObject, InputDigest, Provenance};
