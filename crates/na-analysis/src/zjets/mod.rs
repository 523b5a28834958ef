//! Z(→μμ)+jet groomed-mass response for unfolding.
//!
//! The event selection is shared by the 1D ([`ZPlusJetsXS`], mass only)
//! and 2D ([`ZPlusJetsXS2D`], pt × mass) modules; they differ only in
//! which histograms the selected jets fill. Histograms are filled without
//! event weights.

mod xs1d;
mod xs2d;

pub use xs1d::ZPlusJetsXS;
pub use xs2d::ZPlusJetsXS2D;

use na_core::{Event, HasP4, LorentzVector, Result};
use na_hist::{Hist1D, HistDir};
use tracing::debug;

use crate::config::ZJetsConfig;
use crate::matching::{groom_from_indices, match_object_collection, nearby_subjets};

/// Detector-level jet-mass bin edges (24 bins).
pub const DETECTOR_MASS_EDGES: [f64; 25] = [
    0.0, 0.5, 1.0, 3.0, 5.0, 7.5, 10.0, 12.5, 15.0, 17.5, 20.0, 22.5, 25.0, 27.5, 30.0, 32.5, 35.0,
    37.5, 40.0, 42.5, 45.0, 47.5, 50.0, 75.0, 100.0,
];

/// Generator-level jet-mass bin edges (12 bins).
pub const GENERATOR_MASS_EDGES: [f64; 13] =
    [0.0, 1.0, 5.0, 10.0, 15.0, 20.0, 25.0, 30.0, 35.0, 40.0, 45.0, 50.0, 100.0];

/// Jet pt edges of the 2D binning (4 bins).
pub const PT_EDGES: [f64; 5] = [200.0, 260.0, 350.0, 460.0, 550.0];

/// Detector bins used for the groomed 1D response.
pub const N_DETECTOR_GROOMED: usize = 18;
/// Generator bins used for the groomed 1D response.
pub const N_GENERATOR_GROOMED: usize = 9;

/// Z and jet control histograms common to both modules.
pub(crate) struct ZControlHists {
    zpt: Hist1D,
    zmass: Hist1D,
    genjetpt: Hist1D,
    recojetpt: Hist1D,
    dr_gen_reco: Hist1D,
    dr_gen_groomed: Hist1D,
}

impl ZControlHists {
    pub(crate) fn book() -> Result<Self> {
        let h = |name: &str, n, lo, hi| Hist1D::new(name, name, n, lo, hi);
        Ok(Self {
            zpt: h("h_zpt", 100, 0.0, 500.0)?,
            zmass: h("h_zmass", 100, 50.0, 150.0)?,
            genjetpt: h("h_genjetpt", 100, 0.0, 500.0)?,
            recojetpt: h("h_recojetpt", 100, 0.0, 500.0)?,
            dr_gen_reco: h("h_drGenReco", 40, 0.0, 0.8)?,
            dr_gen_groomed: h("h_drGenGroomed", 40, 0.0, 0.8)?,
        })
    }

    /// Fill the matched-pair controls.
    pub(crate) fn fill_matched(&mut self, reco: &LorentzVector, truth: &LorentzVector) {
        self.genjetpt.fill(truth.pt());
        self.recojetpt.fill(reco.pt());
        self.dr_gen_reco.fill(reco.delta_r(truth));
    }

    pub(crate) fn write(self, out: &mut HistDir) -> Result<()> {
        out.extend([
            self.zpt,
            self.zmass,
            self.genjetpt,
            self.recojetpt,
            self.dr_gen_reco,
            self.dr_gen_groomed,
        ])
    }
}

/// A selected generator-level jet.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TruthJet {
    pub p4: LorentzVector,
    pub groomed: Option<LorentzVector>,
}

/// A selected reconstructed jet and its generator match.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RecoJet {
    pub p4: LorentzVector,
    pub groomed: Option<LorentzVector>,
    /// Index into [`SelectedEvent::truth`].
    pub matched: Option<usize>,
}

/// Jets of an event that passed the Z selection.
#[derive(Debug, Clone, Default)]
pub(crate) struct SelectedEvent {
    pub truth: Vec<TruthJet>,
    pub reco: Vec<RecoJet>,
}

impl SelectedEvent {
    /// Truth jets not matched by any reco jet, in collection order.
    pub(crate) fn missed(&self) -> impl Iterator<Item = &TruthJet> {
        self.truth
            .iter()
            .enumerate()
            .filter(|(i, _)| !self.reco.iter().any(|r| r.matched == Some(*i)))
            .map(|(_, t)| t)
    }
}

/// Apply the Z+jet selection, filling the Z and grooming controls on the
/// way. `None` rejects the event.
pub(crate) fn select_event(
    config: &ZJetsConfig,
    event: &Event,
    controls: &mut ZControlHists,
) -> Option<SelectedEvent> {
    let truth = if event.is_mc() { select_truth(config, event, controls)? } else { Vec::new() };

    let muons: Vec<LorentzVector> =
        event.muons.iter().filter(|m| m.tight_id).map(HasP4::p4).collect();
    let [m0, m1, ..] = muons.as_slice() else {
        return None;
    };
    let z = *m0 + *m1;
    let [lo, hi] = config.z_mass_window;
    if z.pt() < config.min_zpt || z.mass() < lo || z.mass() > hi {
        return None;
    }
    controls.zpt.fill(z.pt());
    controls.zmass.fill(z.mass());

    let reco_jets: Vec<_> = event
        .fat_jets
        .iter()
        .filter(|j| j.p4().pt() > config.min_jet_pt && j.p4().delta_phi(&z) > config.min_dphi_zjet)
        .collect();
    let truth_p4: Vec<LorentzVector> = truth.iter().map(|t| t.p4).collect();
    let matches = match_object_collection(&reco_jets, &truth_p4, config.match_dr);
    let reco: Vec<RecoJet> = reco_jets
        .iter()
        .zip(matches)
        .map(|(jet, matched)| RecoJet {
            p4: jet.p4(),
            groomed: groom_from_indices(jet.sub_jet_idx1, jet.sub_jet_idx2, &event.sub_jets),
            matched,
        })
        .collect();

    if config.verbose {
        debug!(event = event.event, z_pt = z.pt(), z_mass = z.mass(), "reco Z");
        for (i, r) in reco.iter().enumerate() {
            debug!(
                i,
                pt = r.p4.pt(),
                eta = r.p4.eta(),
                mass = r.p4.mass(),
                sd_mass = r.groomed.map_or(-1.0, |g| g.mass()),
                matched = ?r.matched,
                "reco jet"
            );
        }
    }
    Some(SelectedEvent { truth, reco })
}

fn select_truth(
    config: &ZJetsConfig,
    event: &Event,
    controls: &mut ZControlHists,
) -> Option<Vec<TruthJet>> {
    let [l0, l1, ..] = &event.gen_dressed_leptons[..] else {
        return None;
    };
    if l0.pdg_id.abs() != 13 {
        return None;
    }
    let z = l0.p4() + l1.p4();
    if z.pt() < config.min_zpt * config.gen_zpt_factor {
        return None;
    }

    let min_pt = config.min_jet_pt * config.gen_jet_pt_factor;
    let jets = event
        .gen_jets_ak8
        .iter()
        .map(HasP4::p4)
        .filter(|j| j.pt() > min_pt && j.delta_phi(&z) > config.min_dphi_zjet)
        .map(|p4| {
            let subjets =
                nearby_subjets(&p4, &event.sub_gen_jets_ak8, config.groom_dr, config.max_subjets);
            for s in &subjets {
                controls.dr_gen_groomed.fill(p4.delta_r(s));
            }
            let groomed = (!subjets.is_empty()).then(|| subjets.iter().sum::<LorentzVector>());
            TruthJet { p4, groomed }
        })
        .collect::<Vec<_>>();

    if config.verbose {
        debug!(event = event.event, z_pt = z.pt(), z_mass = z.mass(), "gen Z");
        for (i, t) in jets.iter().enumerate() {
            debug!(
                i,
                pt = t.p4.pt(),
                mass = t.p4.mass(),
                sd_mass = t.groomed.map_or(-1.0, |g| g.mass()),
                "gen jet"
            );
        }
    }
    Some(jets)
}
