//! Weighted 1D histogram.

use na_core::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::axis::Axis;

/// A 1D histogram with sum-of-weights and sum-of-weights-squared per bin.
///
/// Storage includes the underflow (index 0) and overflow (index `n + 1`)
/// bins, so every finite fill is recorded somewhere. NaN values are
/// dropped without touching the entry count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Hist1DRecord")]
pub struct Hist1D {
    name: String,
    title: String,
    axis: Axis,
    /// Sum of weights per bin, including under/overflow (length = n_bins + 2).
    sumw: Vec<f64>,
    /// Sum of weights squared per bin, including under/overflow.
    sumw2: Vec<f64>,
    /// Number of accepted fills.
    entries: u64,
}

/// Stored form of a [`Hist1D`], validated when read back.
#[derive(Deserialize)]
struct Hist1DRecord {
    name: String,
    title: String,
    axis: Axis,
    sumw: Vec<f64>,
    sumw2: Vec<f64>,
    entries: u64,
}

impl TryFrom<Hist1DRecord> for Hist1D {
    type Error = Error;

    fn try_from(r: Hist1DRecord) -> Result<Self> {
        let cells = r.axis.n_bins() + 2;
        if r.sumw.len() != cells || r.sumw2.len() != cells {
            return Err(Error::Validation(format!(
                "histogram '{}' needs {cells} cells, got sumw={} sumw2={}",
                r.name,
                r.sumw.len(),
                r.sumw2.len()
            )));
        }
        Ok(Self {
            name: r.name,
            title: r.title,
            axis: r.axis,
            sumw: r.sumw,
            sumw2: r.sumw2,
            entries: r.entries,
        })
    }
}

impl Hist1D {
    /// `n` equal-width bins over `[lo, hi)`.
    pub fn new(
        name: impl Into<String>,
        title: impl Into<String>,
        n: usize,
        lo: f64,
        hi: f64,
    ) -> Result<Self> {
        Ok(Self::from_axis(name, title, Axis::uniform(n, lo, hi)?))
    }

    /// Variable-width bins from explicit edges.
    pub fn with_edges(
        name: impl Into<String>,
        title: impl Into<String>,
        edges: &[f64],
    ) -> Result<Self> {
        Ok(Self::from_axis(name, title, Axis::variable(edges)?))
    }

    /// Empty histogram over an existing axis.
    pub fn from_axis(name: impl Into<String>, title: impl Into<String>, axis: Axis) -> Self {
        let n = axis.n_bins() + 2;
        Self {
            name: name.into(),
            title: title.into(),
            axis,
            sumw: vec![0.0; n],
            sumw2: vec![0.0; n],
            entries: 0,
        }
    }

    /// Histogram name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Histogram title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// The binning.
    pub fn axis(&self) -> &Axis {
        &self.axis
    }

    /// Number of in-range bins.
    pub fn n_bins(&self) -> usize {
        self.axis.n_bins()
    }

    /// Bin index for `x` (0 = underflow, n + 1 = overflow). NaN maps to underflow.
    pub fn find_bin(&self, x: f64) -> usize {
        self.axis.find_bin(x).unwrap_or(0)
    }

    /// Fill with unit weight. Returns the bin that received the entry.
    pub fn fill(&mut self, x: f64) -> Option<usize> {
        self.fill_weighted(x, 1.0)
    }

    /// Fill with weight `w`. Returns the bin that received the entry, or
    /// `None` when `x` is NaN.
    pub fn fill_weighted(&mut self, x: f64, w: f64) -> Option<usize> {
        let bin = self.axis.find_bin(x)?;
        self.sumw[bin] += w;
        self.sumw2[bin] += w * w;
        self.entries += 1;
        Some(bin)
    }

    /// Sum of weights in `bin`. Out-of-range indices read as 0.
    pub fn content(&self, bin: usize) -> f64 {
        self.sumw.get(bin).copied().unwrap_or(0.0)
    }

    /// Statistical error `sqrt(sumw2)` of `bin`.
    pub fn error(&self, bin: usize) -> f64 {
        self.sumw2(bin).sqrt()
    }

    /// Sum of weights squared in `bin`.
    pub fn sumw2(&self, bin: usize) -> f64 {
        self.sumw2.get(bin).copied().unwrap_or(0.0)
    }

    /// Overwrite the content of `bin`.
    pub fn set_content(&mut self, bin: usize, value: f64) -> Result<()> {
        if bin >= self.sumw.len() {
            return Err(self.bad_bin(bin));
        }
        self.sumw[bin] = value;
        Ok(())
    }

    /// Overwrite the error of `bin` (stored as `error²`).
    pub fn set_error(&mut self, bin: usize, error: f64) -> Result<()> {
        if bin >= self.sumw2.len() {
            return Err(self.bad_bin(bin));
        }
        self.set_sumw2(bin, error * error);
        Ok(())
    }

    /// Overwrite the sum of weights squared of `bin`, which must be in
    /// `0..=n_bins + 1`.
    pub(crate) fn set_sumw2(&mut self, bin: usize, value: f64) {
        self.sumw2[bin] = value;
    }

    /// Number of accepted fills, flows included.
    pub fn entries(&self) -> u64 {
        self.entries
    }

    /// Sum of weights over the in-range bins.
    pub fn integral(&self) -> f64 {
        self.sumw[1..=self.n_bins()].iter().sum()
    }

    /// Underflow sum of weights.
    pub fn underflow(&self) -> f64 {
        self.sumw[0]
    }

    /// Overflow sum of weights.
    pub fn overflow(&self) -> f64 {
        self.sumw[self.n_bins() + 1]
    }

    /// In-range bin contents (length = n_bins).
    pub fn contents(&self) -> &[f64] {
        &self.sumw[1..=self.n_bins()]
    }

    /// Efficiency-style ratio `num / den` with binomial errors.
    ///
    /// Both histograms must share the same binning. Bins with an empty
    /// denominator are left at 0. Errors use the weighted binomial form
    /// `|(1 - 2p)·w2_num + p²·w2_den| / den²`.
    pub fn divide_binomial(
        num: &Hist1D,
        den: &Hist1D,
        name: impl Into<String>,
        title: impl Into<String>,
    ) -> Result<Hist1D> {
        if num.axis != den.axis {
            return Err(Error::Validation(format!(
                "cannot divide '{}' by '{}': binning differs",
                num.name, den.name
            )));
        }
        let mut out = Hist1D::from_axis(name, title, num.axis.clone());
        for bin in 0..out.sumw.len() {
            let d = den.sumw[bin];
            if d == 0.0 {
                continue;
            }
            let p = num.sumw[bin] / d;
            out.sumw[bin] = p;
            out.sumw2[bin] =
                ((1.0 - 2.0 * p) * num.sumw2[bin] + p * p * den.sumw2[bin]).abs() / (d * d);
        }
        out.entries = den.entries;
        Ok(out)
    }

    fn bad_bin(&self, bin: usize) -> Error {
        Error::Validation(format!(
            "bin {bin} out of range for '{}' ({} bins + flows)",
            self.name,
            self.n_bins()
        ))
    }
}
