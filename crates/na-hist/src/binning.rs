//! Multi-dimensional unfolding binning with global bin numbers.
//!
//! A binning node owns one or more distributions. Each distribution is a
//! product of axes, optionally extended by an underflow and/or overflow
//! bin per axis, and is flattened into a contiguous range of global bin
//! numbers. Global numbering starts at 1; the first axis varies fastest.
//! Histograms booked from a binning reserve bin 0 for "no bin", which is
//! what callers fill when a point has no global bin.

use na_core::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::axis::Axis;
use crate::hist2d::Hist2D;
use crate::histogram::Hist1D;

/// One axis of a [`BinningDistribution`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinningAxis {
    /// Axis name (e.g. `"pt"`).
    pub name: String,
    /// In-range bins.
    pub axis: Axis,
    /// Whether values below the first edge get their own bin.
    pub underflow: bool,
    /// Whether values at or above the last edge get their own bin.
    pub overflow: bool,
}

impl BinningAxis {
    /// Axis over `edges` with the given flow-bin flags.
    pub fn new(
        name: impl Into<String>,
        edges: &[f64],
        underflow: bool,
        overflow: bool,
    ) -> Result<Self> {
        Ok(Self { name: name.into(), axis: Axis::variable(edges)?, underflow, overflow })
    }

    /// Bins on this axis including the enabled flow bins.
    pub fn extended_bins(&self) -> usize {
        self.axis.n_bins() + usize::from(self.underflow) + usize::from(self.overflow)
    }

    /// Zero-based position of `x` among the extended bins.
    fn local_index(&self, x: f64) -> Option<usize> {
        let n = self.axis.n_bins();
        let uf = usize::from(self.underflow);
        match self.axis.find_bin(x)? {
            0 => self.underflow.then_some(0),
            b if b == n + 1 => self.overflow.then_some(n + uf),
            b => Some(b - 1 + uf),
        }
    }
}

/// A product of axes mapped onto a contiguous block of global bins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinningDistribution {
    name: String,
    axes: Vec<BinningAxis>,
    first_bin: usize,
}

impl BinningDistribution {
    /// Distribution name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The axes, in global-numbering order.
    pub fn axes(&self) -> &[BinningAxis] {
        &self.axes
    }

    /// First global bin number owned by this distribution.
    pub fn first_bin(&self) -> usize {
        self.first_bin
    }

    /// Number of global bins owned by this distribution.
    pub fn n_bins(&self) -> usize {
        self.axes.iter().map(BinningAxis::extended_bins).product()
    }

    /// Global bin number for one value per axis.
    ///
    /// Returns `None` when the number of values does not match the number
    /// of axes, a value is NaN, or a value falls outside an axis that has
    /// no flow bin on that side.
    pub fn global_bin_number(&self, values: &[f64]) -> Option<usize> {
        if values.len() != self.axes.len() {
            return None;
        }
        let mut global = self.first_bin;
        let mut stride = 1;
        for (axis, &x) in self.axes.iter().zip(values) {
            global += axis.local_index(x)? * stride;
            stride *= axis.extended_bins();
        }
        Some(global)
    }
}

/// A named binning scheme holding one or more distributions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnfoldBinning {
    name: String,
    distributions: Vec<BinningDistribution>,
}

impl UnfoldBinning {
    /// Empty binning node.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), distributions: Vec::new() }
    }

    /// Binning node with a single distribution.
    pub fn single(
        name: impl Into<String>,
        distribution: impl Into<String>,
        axes: Vec<BinningAxis>,
    ) -> Result<Self> {
        let mut b = Self::new(name);
        b.add_distribution(distribution, axes)?;
        Ok(b)
    }

    /// Node name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a distribution; its global bins follow the existing ones.
    pub fn add_distribution(
        &mut self,
        name: impl Into<String>,
        axes: Vec<BinningAxis>,
    ) -> Result<&BinningDistribution> {
        let name = name.into();
        if axes.is_empty() {
            return Err(Error::Validation(format!("distribution '{name}' needs at least one axis")));
        }
        if self.distribution(&name).is_some() {
            return Err(Error::Validation(format!(
                "distribution '{name}' already exists in binning '{}'",
                self.name
            )));
        }
        let first_bin = 1 + self.n_bins();
        self.distributions.push(BinningDistribution { name, axes, first_bin });
        let last = self.distributions.len() - 1;
        Ok(&self.distributions[last])
    }

    /// Look up a distribution by name.
    pub fn distribution(&self, name: &str) -> Option<&BinningDistribution> {
        self.distributions.iter().find(|d| d.name == name)
    }

    /// All distributions in numbering order.
    pub fn distributions(&self) -> &[BinningDistribution] {
        &self.distributions
    }

    /// Total number of global bins.
    pub fn n_bins(&self) -> usize {
        self.distributions.iter().map(BinningDistribution::n_bins).sum()
    }

    /// Axis whose bin `i` holds global bin `i` (range `[0.5, n + 0.5)`).
    pub fn global_axis(&self) -> Result<Axis> {
        let n = self.n_bins();
        Axis::uniform(n, 0.5, n as f64 + 0.5)
    }

    /// Book a 1D histogram indexed by this binning's global bins.
    pub fn create_histogram(&self, name: impl Into<String>) -> Result<Hist1D> {
        let name = name.into();
        Ok(Hist1D::from_axis(name.clone(), name, self.global_axis()?))
    }

    /// Book a migration histogram: detector global bins on x, generator
    /// global bins on y.
    pub fn create_migration_histogram(
        detector: &UnfoldBinning,
        generator: &UnfoldBinning,
        name: impl Into<String>,
    ) -> Result<Hist2D> {
        let name = name.into();
        Ok(Hist2D::from_axes(name.clone(), name, detector.global_axis()?, generator.global_axis()?))
    }
}
