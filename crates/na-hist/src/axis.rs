//! Bin edges shared by all histogram types.

use na_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// A binned axis defined by strictly increasing edges.
///
/// Bin numbering follows the ROOT convention: `0` is the underflow bin,
/// `1..=n` are the in-range bins and `n + 1` is the overflow bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "AxisRecord")]
pub struct Axis {
    edges: Vec<f64>,
}

/// Stored form of an [`Axis`], validated when read back.
#[derive(Deserialize)]
struct AxisRecord {
    edges: Vec<f64>,
}

impl TryFrom<AxisRecord> for Axis {
    type Error = Error;

    fn try_from(record: AxisRecord) -> Result<Self> {
        Self::variable(&record.edges)
    }
}

impl Axis {
    /// `n` equal-width bins spanning `[lo, hi)`.
    pub fn uniform(n: usize, lo: f64, hi: f64) -> Result<Self> {
        if n == 0 {
            return Err(Error::Validation("axis needs at least one bin".into()));
        }
        if !(lo.is_finite() && hi.is_finite()) || lo >= hi {
            return Err(Error::Validation(format!("invalid axis range [{lo}, {hi})")));
        }
        let width = (hi - lo) / n as f64;
        let mut edges: Vec<f64> = (0..n).map(|i| lo + i as f64 * width).collect();
        edges.push(hi);
        Ok(Self { edges })
    }

    /// Variable-width bins from explicit edges (length = n_bins + 1).
    pub fn variable(edges: &[f64]) -> Result<Self> {
        if edges.len() < 2 {
            return Err(Error::Validation(format!(
                "axis needs at least 2 edges, got {}",
                edges.len()
            )));
        }
        if edges.iter().any(|e| !e.is_finite()) {
            return Err(Error::Validation("axis edges must be finite".into()));
        }
        if edges.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::Validation("axis edges must be strictly increasing".into()));
        }
        Ok(Self { edges: edges.to_vec() })
    }

    /// Number of in-range bins.
    pub fn n_bins(&self) -> usize {
        self.edges.len() - 1
    }

    /// Bin edges.
    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// Bin index for `x`, or `None` for NaN.
    pub fn find_bin(&self, x: f64) -> Option<usize> {
        if x.is_nan() {
            return None;
        }
        // Number of edges <= x: 0 below range, n + 1 at or above the last edge.
        Some(self.edges.partition_point(|&e| e <= x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_bin_flows_and_edges() {
        let a = Axis::variable(&[0.0, 1.0, 5.0, 10.0]).unwrap();
        assert_eq!(a.find_bin(-0.1), Some(0));
        assert_eq!(a.find_bin(0.0), Some(1));
        assert_eq!(a.find_bin(0.999), Some(1));
        assert_eq!(a.find_bin(1.0), Some(2));
        assert_eq!(a.find_bin(9.99), Some(3));
        assert_eq!(a.find_bin(10.0), Some(4));
        assert_eq!(a.find_bin(f64::NAN), None);
    }

    #[test]
    fn test_uniform_edges() {
        let a = Axis::uniform(25, 0.0, 2500.0).unwrap();
        assert_eq!(a.n_bins(), 25);
        assert_eq!(a.edges()[1], 100.0);
        assert_eq!(a.edges().last(), Some(&2500.0));
    }

    #[test]
    fn test_invalid_axes_rejected() {
        assert!(Axis::uniform(0, 0.0, 1.0).is_err());
        assert!(Axis::uniform(10, 1.0, 1.0).is_err());
        assert!(Axis::variable(&[1.0]).is_err());
        assert!(Axis::variable(&[0.0, 2.0, 1.0]).is_err());
        assert!(Axis::variable(&[0.0, f64::INFINITY]).is_err());
    }

    #[test]
    fn test_deserialize_validates_edges() {
        let a: Axis = serde_json::from_str(r#"{"edges": [0.0, 1.0, 5.0]}"#).unwrap();
        assert_eq!(a.n_bins(), 2);
        assert!(serde_json::from_str::<Axis>(r#"{"edges": []}"#).is_err());
        assert!(serde_json::from_str::<Axis>(r#"{"edges": [2.0, 1.0]}"#).is_err());
    }
}
