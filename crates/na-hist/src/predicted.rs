//! Mistag-rate-weighted background prediction.
//!
//! A [`PredictedDistribution`] turns a single-tag sample into a background
//! estimate for the double-tag region: every taggable probe contributes its
//! event weight times the mistag rate looked up at the probe's rate
//! variable. Statistical errors of the events are uncorrelated; errors of
//! the rate are fully correlated between all entries that used the same
//! rate bin, so they are summed linearly per (output bin, rate bin) and
//! only then in quadrature.

use na_core::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::histogram::Hist1D;

/// Background prediction for one analysis category and one observable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PredictedRecord")]
pub struct PredictedDistribution {
    name: String,
    title: String,
    rate: Hist1D,
    observed: Hist1D,
    predicted: Hist1D,
    taggable: Hist1D,
    /// Σ (rate · w)² per output bin, flows included.
    uncorrelated_w2: Vec<f64>,
    /// Σ σ_rate · w per output bin (outer) and rate bin (inner).
    correlated: Vec<Vec<f64>>,
    errors_finalized: bool,
}

/// Stored form of a [`PredictedDistribution`], validated when read back.
#[derive(Deserialize)]
struct PredictedRecord {
    name: String,
    title: String,
    rate: Hist1D,
    observed: Hist1D,
    predicted: Hist1D,
    taggable: Hist1D,
    uncorrelated_w2: Vec<f64>,
    correlated: Vec<Vec<f64>>,
    errors_finalized: bool,
}

impl TryFrom<PredictedRecord> for PredictedDistribution {
    type Error = Error;

    fn try_from(r: PredictedRecord) -> Result<Self> {
        let axis = r.predicted.axis();
        if r.observed.axis() != axis || r.taggable.axis() != axis {
            return Err(Error::Validation(format!(
                "prediction '{}': observed/predicted/taggable binning differs",
                r.name
            )));
        }
        let n_out = r.predicted.n_bins() + 2;
        let n_rate = r.rate.n_bins() + 2;
        if r.uncorrelated_w2.len() != n_out
            || r.correlated.len() != n_out
            || r.correlated.iter().any(|row| row.len() != n_rate)
        {
            return Err(Error::Validation(format!(
                "prediction '{}': error accumulators do not match {n_out} x {n_rate} bins",
                r.name
            )));
        }
        Ok(Self {
            name: r.name,
            title: r.title,
            rate: r.rate,
            observed: r.observed,
            predicted: r.predicted,
            taggable: r.taggable,
            uncorrelated_w2: r.uncorrelated_w2,
            correlated: r.correlated,
            errors_finalized: r.errors_finalized,
        })
    }
}

impl PredictedDistribution {
    /// Book the observed/predicted/taggable histograms (`n` bins over
    /// `[lo, hi)`) against a mistag-rate histogram.
    pub fn new(
        rate: Hist1D,
        name: impl Into<String>,
        title: impl Into<String>,
        n: usize,
        lo: f64,
        hi: f64,
    ) -> Result<Self> {
        let name = name.into();
        let title = title.into();
        if rate.n_bins() == 0 {
            return Err(Error::Validation(format!("mistag rate for '{name}' has no bins")));
        }
        let observed = Hist1D::new(format!("{name}_observed"), title.clone(), n, lo, hi)?;
        let predicted = Hist1D::new(format!("{name}_predicted"), title.clone(), n, lo, hi)?;
        let taggable = Hist1D::new(format!("{name}_taggable"), title.clone(), n, lo, hi)?;
        let n_out = n + 2;
        let n_rate = rate.n_bins() + 2;
        Ok(Self {
            name,
            title,
            rate,
            observed,
            predicted,
            taggable,
            uncorrelated_w2: vec![0.0; n_out],
            correlated: vec![vec![0.0; n_rate]; n_out],
            errors_finalized: false,
        })
    }

    /// Add one probe.
    ///
    /// * `x`: value histogrammed in the output distributions
    /// * `rate_x`: value at which the mistag rate is looked up
    /// * `tagged`: whether the probe itself passes the tag
    /// * `weight`: event weight
    pub fn accumulate(&mut self, x: f64, rate_x: f64, tagged: bool, weight: f64) {
        let rate_bin = self.rate.find_bin(rate_x);
        let rate = self.rate.content(rate_bin);
        let rate_err = self.rate.error(rate_bin);

        if tagged {
            self.observed.fill_weighted(x, weight);
        }
        self.taggable.fill_weighted(x, weight);
        if let Some(bin) = self.predicted.fill_weighted(x, rate * weight) {
            self.uncorrelated_w2[bin] += (rate * weight).powi(2);
            self.correlated[bin][rate_bin] += rate_err * weight;
        }
        self.errors_finalized = false;
    }

    /// Set the predicted-histogram errors from the accumulated uncorrelated
    /// and correlated components. Idempotent; call again after further
    /// accumulation.
    pub fn set_calculated_errors(&mut self) {
        if self.errors_finalized {
            return;
        }
        for bin in 0..self.uncorrelated_w2.len() {
            let err2 = self.uncorrelated_w2[bin] + self.correlated_w2(bin);
            self.predicted.set_sumw2(bin, err2);
        }
        self.errors_finalized = true;
    }

    /// Object name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Axis title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// The mistag rate this prediction was built against.
    pub fn rate(&self) -> &Hist1D {
        &self.rate
    }

    /// Probes that were themselves tagged.
    pub fn observed(&self) -> &Hist1D {
        &self.observed
    }

    /// Rate-weighted prediction.
    pub fn predicted(&self) -> &Hist1D {
        &self.predicted
    }

    /// All probes, unweighted by the rate.
    pub fn taggable(&self) -> &Hist1D {
        &self.taggable
    }

    /// Whether the predicted errors reflect all accumulated entries.
    pub fn errors_finalized(&self) -> bool {
        self.errors_finalized
    }

    /// Uncorrelated (event statistics) error of an output bin.
    pub fn uncorrelated_error(&self, bin: usize) -> f64 {
        self.uncorrelated_w2.get(bin).copied().unwrap_or(0.0).sqrt()
    }

    /// Correlated (mistag-rate) error of an output bin.
    pub fn correlated_error(&self, bin: usize) -> f64 {
        self.correlated_w2(bin).sqrt()
    }

    fn correlated_w2(&self, bin: usize) -> f64 {
        self.correlated.get(bin).map_or(0.0, |row| row.iter().map(|c| c * c).sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Two rate bins: [0, 1000) → 0.1 ± 0.01, [1000, 2000) → 0.2 ± 0.05.
    fn rate() -> Hist1D {
        let mut r = Hist1D::new("mistag", "mistag", 2, 0.0, 2000.0).unwrap();
        r.set_content(1, 0.1).unwrap();
        r.set_error(1, 0.01).unwrap();
        r.set_content(2, 0.2).unwrap();
        r.set_error(2, 0.05).unwrap();
        r
    }

    #[test]
    fn test_accumulate_fills_all_views() {
        let mut p = PredictedDistribution::new(rate(), "predJetP0", "p", 10, 0.0, 3000.0).unwrap();
        p.accumulate(500.0, 500.0, true, 2.0);
        p.accumulate(500.0, 1500.0, false, 1.0);
        let bin = p.predicted().find_bin(500.0);
        assert_relative_eq!(p.observed().content(bin), 2.0);
        assert_relative_eq!(p.taggable().content(bin), 3.0);
        assert_relative_eq!(p.predicted().content(bin), 0.1 * 2.0 + 0.2 * 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rate_errors_add_linearly_within_rate_bin() {
        let mut p = PredictedDistribution::new(rate(), "x", "x", 10, 0.0, 3000.0).unwrap();
        p.accumulate(500.0, 100.0, false, 1.0);
        p.accumulate(500.0, 200.0, false, 1.0);
        p.set_calculated_errors();
        let bin = p.predicted().find_bin(500.0);
        // Same rate bin: (0.01 + 0.01)², not 2·0.01².
        assert_relative_eq!(p.correlated_error(bin), 0.02, epsilon = 1e-12);
        assert_relative_eq!(p.uncorrelated_error(bin), (2.0_f64 * 0.01).sqrt(), epsilon = 1e-12);
        let expected = (0.02_f64 * 0.02 + 2.0 * 0.01).sqrt();
        assert_relative_eq!(p.predicted().error(bin), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_rate_errors_add_in_quadrature_across_rate_bins() {
        let mut p = PredictedDistribution::new(rate(), "x", "x", 10, 0.0, 3000.0).unwrap();
        p.accumulate(500.0, 100.0, false, 1.0);
        p.accumulate(500.0, 1500.0, false, 1.0);
        let bin = p.predicted().find_bin(500.0);
        assert_relative_eq!(
            p.correlated_error(bin),
            (0.01_f64 * 0.01 + 0.05 * 0.05).sqrt(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_set_calculated_errors_is_idempotent() {
        let mut p = PredictedDistribution::new(rate(), "x", "x", 10, 0.0, 3000.0).unwrap();
        p.accumulate(500.0, 100.0, true, 1.0);
        p.set_calculated_errors();
        let first = p.predicted().error(p.predicted().find_bin(500.0));
        p.set_calculated_errors();
        assert!(p.errors_finalized());
        assert_eq!(p.predicted().error(p.predicted().find_bin(500.0)), first);
        p.accumulate(2500.0, 100.0, true, 1.0);
        assert!(!p.errors_finalized());
    }

    #[test]
    fn test_errors_cover_flow_bins() {
        let mut p = PredictedDistribution::new(rate(), "x", "x", 10, 0.0, 3000.0).unwrap();
        p.accumulate(5000.0, 100.0, false, 1.0);
        p.set_calculated_errors();
        let overflow = p.predicted().n_bins() + 1;
        assert_relative_eq!(p.predicted().content(overflow), 0.1, epsilon = 1e-12);
        assert_relative_eq!(
            p.predicted().sumw2(overflow),
            0.1 * 0.1 + 0.01 * 0.01,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_deserialize_checks_accumulators() {
        let mut p = PredictedDistribution::new(rate(), "x", "x", 10, 0.0, 3000.0).unwrap();
        p.accumulate(500.0, 100.0, true, 1.0);
        let mut v = serde_json::to_value(&p).unwrap();
        assert_eq!(serde_json::from_value::<PredictedDistribution>(v.clone()).unwrap(), p);

        v["correlated"][3] = serde_json::json!([0.0]);
        let err = serde_json::from_value::<PredictedDistribution>(v).unwrap_err();
        assert!(err.to_string().contains("error accumulators"), "{err}");
    }
}
