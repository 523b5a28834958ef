//! Response-matrix diagnostics.
//!
//! Summarises a filled response histogram (reco on x, gen on y) into the
//! purity and stability numbers used to judge a binning before unfolding.

use na_core::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::hist2d::Hist2D;

/// Plot-friendly summary of a response matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseSummary {
    /// Source histogram name.
    pub name: String,
    /// Reco-level bin edges.
    pub reco_bin_edges: Vec<f64>,
    /// Gen-level bin edges.
    pub gen_bin_edges: Vec<f64>,
    /// `matrix[reco][gen]`, normalised per gen column to P(reco | gen).
    pub matrix: Vec<Vec<f64>>,
    /// Per reco bin: fraction of entries from the diagonal gen bin.
    pub purity: Vec<f64>,
    /// Per gen bin: fraction of entries reconstructed in the diagonal bin.
    pub stability: Vec<f64>,
    /// Per gen bin: reconstructed fraction, counting misses in the reco underflow.
    pub efficiency: Vec<f64>,
}

impl ResponseSummary {
    /// Build from a response histogram with reco on x and gen on y.
    pub fn from_hist2d(h: &Hist2D) -> Result<Self> {
        let n_reco = h.x_axis().n_bins();
        let n_gen = h.y_axis().n_bins();
        let counts = h.matrix();
        if counts.iter().flatten().any(|v| !v.is_finite()) {
            return Err(Error::Validation(format!("response '{}' has non-finite cells", h.name())));
        }

        let mut col_sums = vec![0.0_f64; n_gen];
        for row in &counts {
            for (j, &v) in row.iter().enumerate() {
                col_sums[j] += v;
            }
        }

        let matrix = counts
            .iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .map(|(j, &v)| if col_sums[j] > 0.0 { v / col_sums[j] } else { 0.0 })
                    .collect()
            })
            .collect();

        let purity = (0..n_reco)
            .map(|i| {
                let row_sum: f64 = counts[i].iter().sum();
                if row_sum > 0.0 && i < n_gen { counts[i][i] / row_sum } else { 0.0 }
            })
            .collect();

        let stability = (0..n_gen)
            .map(|j| if col_sums[j] > 0.0 && j < n_reco { counts[j][j] / col_sums[j] } else { 0.0 })
            .collect();

        // Misses are filled at reco = -1 (or global bin 0): the x underflow.
        let efficiency = (0..n_gen)
            .map(|j| {
                let missed = h.content(0, j + 1);
                let total = col_sums[j] + missed;
                if total > 0.0 { col_sums[j] / total } else { 0.0 }
            })
            .collect();

        Ok(Self {
            name: h.name().to_string(),
            reco_bin_edges: h.x_axis().edges().to_vec(),
            gen_bin_edges: h.y_axis().edges().to_vec(),
            matrix,
            purity,
            stability,
            efficiency,
        })
    }
}
