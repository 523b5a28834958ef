//! Analysis categories of the hadronic ttbar selection.
//!
//! A category combines the number of b-tagged jets among (probe, tag)
//! with the rapidity region of the probe: `index = btag * 2 + rapidity`.

use std::fmt;

/// Number of b-tagged jets among probe and tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BtagBucket {
    /// No b-tag.
    Zero = 0,
    /// Exactly one b-tag.
    One = 1,
    /// Both jets b-tagged.
    Two = 2,
}

impl BtagBucket {
    /// Bucket for `n` tagged jets, saturating at two.
    pub fn from_count(n: usize) -> Self {
        match n {
            0 => Self::Zero,
            1 => Self::One,
            _ => Self::Two,
        }
    }
}

/// Rapidity region of the probe jet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RapidityRegion {
    /// `|y| < central_rapidity`.
    Central = 0,
    /// Everything else.
    Forward = 1,
}

impl RapidityRegion {
    /// Region for rapidity `y` with boundary `central_max`.
    pub fn classify(y: f64, central_max: f64) -> Self {
        if y.abs() < central_max { Self::Central } else { Self::Forward }
    }
}

/// One of the six analysis categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnalysisCategory {
    /// b-tag multiplicity bucket.
    pub btag: BtagBucket,
    /// Probe rapidity region.
    pub rapidity: RapidityRegion,
}

impl AnalysisCategory {
    /// Number of categories.
    pub const COUNT: usize = 6;

    /// Category from its parts.
    pub fn new(btag: BtagBucket, rapidity: RapidityRegion) -> Self {
        Self { btag, rapidity }
    }

    /// Dense index in `0..COUNT`.
    pub fn index(self) -> usize {
        self.btag as usize * 2 + self.rapidity as usize
    }

    /// All categories in index order.
    pub fn all() -> impl Iterator<Item = AnalysisCategory> {
        const REGIONS: [RapidityRegion; 2] = [RapidityRegion::Central, RapidityRegion::Forward];
        [BtagBucket::Zero, BtagBucket::One, BtagBucket::Two]
            .into_iter()
            .flat_map(|b| REGIONS.into_iter().map(move |r| Self::new(b, r)))
    }
}

impl fmt::Display for AnalysisCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let region = match self.rapidity {
            RapidityRegion::Central => "cen",
            RapidityRegion::Forward => "fwd",
        };
        write!(f, "{}b{region}", self.btag as usize)
    }
}
