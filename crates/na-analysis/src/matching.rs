//! Angular matching between object collections.

use na_core::{HasP4, LorentzVector};

/// For each object in `objects`, the index of the nearest element of
/// `candidates` within `dr_max` (strict), or `None`.
///
/// Matching is not exclusive: one candidate may be the nearest neighbour
/// of several objects.
pub fn match_object_collection<A: HasP4, B: HasP4>(
    objects: &[A],
    candidates: &[B],
    dr_max: f64,
) -> Vec<Option<usize>> {
    let cand_p4: Vec<LorentzVector> = candidates.iter().map(HasP4::p4).collect();
    objects
        .iter()
        .map(|obj| {
            let p4 = obj.p4();
            cand_p4
                .iter()
                .enumerate()
                .map(|(i, c)| (i, p4.delta_r(c)))
                .filter(|&(_, dr)| dr < dr_max)
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(i, _)| i)
        })
        .collect()
}

/// The first `max_count` subjets (collection order) within `dr_max` of `axis`.
pub fn nearby_subjets<S: HasP4>(
    axis: &LorentzVector,
    subjets: &[S],
    dr_max: f64,
    max_count: usize,
) -> Vec<LorentzVector> {
    subjets.iter().map(HasP4::p4).filter(|s| axis.delta_r(s) < dr_max).take(max_count).collect()
}

/// Sum of the subjets referenced by `idx1`/`idx2`.
///
/// Negative or out-of-range indices count as absent. A second subjet
/// without a first gives no groomed jet.
pub fn groom_from_indices<S: HasP4>(idx1: i32, idx2: i32, subjets: &[S]) -> Option<LorentzVector> {
    let lookup = |idx: i32| usize::try_from(idx).ok().and_then(|i| subjets.get(i)).map(HasP4::p4);
    match (lookup(idx1), lookup(idx2)) {
        (Some(a), Some(b)) => Some(a + b),
        (Some(a), None) => Some(a),
        _ => None,
    }
}
