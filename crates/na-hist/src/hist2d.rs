//! Weighted 2D histogram, used for response matrices.

use na_core::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::axis::Axis;

/// A 2D histogram with under/overflow on both axes.
///
/// Cells are stored row-major by y: `index = iy * (nx + 2) + ix`, with the
/// ROOT bin convention on each axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Hist2DRecord")]
pub struct Hist2D {
    name: String,
    title: String,
    x_axis: Axis,
    y_axis: Axis,
    sumw: Vec<f64>,
    sumw2: Vec<f64>,
    entries: u64,
}

/// Stored form of a [`Hist2D`], validated when read back.
#[derive(Deserialize)]
struct Hist2DRecord {
    name: String,
    title: String,
    x_axis: Axis,
    y_axis: Axis,
    sumw: Vec<f64>,
    sumw2: Vec<f64>,
    entries: u64,
}

impl TryFrom<Hist2DRecord> for Hist2D {
    type Error = Error;

    fn try_from(r: Hist2DRecord) -> Result<Self> {
        let cells = (r.x_axis.n_bins() + 2) * (r.y_axis.n_bins() + 2);
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
            x_axis: r.x_axis,
            y_axis: r.y_axis,
            sumw: r.sumw,
            sumw2: r.sumw2,
            entries: r.entries,
        })
    }
}

impl Hist2D {
    /// Variable-width bins on both axes.
    pub fn with_edges(
        name: impl Into<String>,
        title: impl Into<String>,
        x_edges: &[f64],
        y_edges: &[f64],
    ) -> Result<Self> {
        Ok(Self::from_axes(name, title, Axis::variable(x_edges)?, Axis::variable(y_edges)?))
    }

    /// Empty histogram over existing axes.
    pub fn from_axes(
        name: impl Into<String>,
        title: impl Into<String>,
        x_axis: Axis,
        y_axis: Axis,
    ) -> Self {
        let cells = (x_axis.n_bins() + 2) * (y_axis.n_bins() + 2);
        Self {
            name: name.into(),
            title: title.into(),
            x_axis,
            y_axis,
            sumw: vec![0.0; cells],
            sumw2: vec![0.0; cells],
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

    /// Binning on x.
    pub fn x_axis(&self) -> &Axis {
        &self.x_axis
    }

    /// Binning on y.
    pub fn y_axis(&self) -> &Axis {
        &self.y_axis
    }

    /// Fill with unit weight.
    pub fn fill(&mut self, x: f64, y: f64) -> Option<(usize, usize)> {
        self.fill_weighted(x, y, 1.0)
    }

    /// Fill with weight `w`; NaN on either axis drops the entry.
    pub fn fill_weighted(&mut self, x: f64, y: f64, w: f64) -> Option<(usize, usize)> {
        let ix = self.x_axis.find_bin(x)?;
        let iy = self.y_axis.find_bin(y)?;
        let idx = self.index(ix, iy);
        self.sumw[idx] += w;
        self.sumw2[idx] += w * w;
        self.entries += 1;
        Some((ix, iy))
    }

    /// Sum of weights in cell `(ix, iy)`; out-of-range reads as 0.
    pub fn content(&self, ix: usize, iy: usize) -> f64 {
        if ix > self.x_axis.n_bins() + 1 || iy > self.y_axis.n_bins() + 1 {
            return 0.0;
        }
        self.sumw[self.index(ix, iy)]
    }

    /// Statistical error of cell `(ix, iy)`.
    pub fn error(&self, ix: usize, iy: usize) -> f64 {
        if ix > self.x_axis.n_bins() + 1 || iy > self.y_axis.n_bins() + 1 {
            return 0.0;
        }
        self.sumw2[self.index(ix, iy)].sqrt()
    }

    /// Number of accepted fills.
    pub fn entries(&self) -> u64 {
        self.entries
    }

    /// Sum of weights over cells in range on both axes.
    pub fn integral(&self) -> f64 {
        let mut total = 0.0;
        for iy in 1..=self.y_axis.n_bins() {
            for ix in 1..=self.x_axis.n_bins() {
                total += self.sumw[self.index(ix, iy)];
            }
        }
        total
    }

    /// In-range contents as `matrix[ix - 1][iy - 1]`.
    pub fn matrix(&self) -> Vec<Vec<f64>> {
        (1..=self.x_axis.n_bins())
            .map(|ix| (1..=self.y_axis.n_bins()).map(|iy| self.content(ix, iy)).collect())
            .collect()
    }

    fn index(&self, ix: usize, iy: usize) -> usize {
        iy * (self.x_axis.n_bins() + 2) + ix
    }
}
