//! Event builders shared by the integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use na_core::{Event, FatJet, GenDressedLepton, GenJet, Jet, Muon, SubJet};

pub fn tmp_path(name: &str) -> PathBuf {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    std::env::temp_dir().join(format!("na_analysis_{}_{}_{}", std::process::id(), nanos, name))
}

/// A top-tagged large-radius jet (tau32 = 0.4, m_SD = 170).
pub fn top_jet(pt: f64, eta: f64, phi: f64) -> FatJet {
    FatJet {
        pt,
        eta,
        phi,
        mass: 180.0,
        msoftdrop: Some(170.0),
        tau2: 0.5,
        tau3: 0.2,
        n3b1: 1.5,
        jet_id: 2,
        ..FatJet::default()
    }
}

/// A QCD-like large-radius jet failing the top tag (tau32 = 0.8).
pub fn qcd_jet(pt: f64, eta: f64, phi: f64) -> FatJet {
    FatJet { tau3: 0.4, msoftdrop: Some(60.0), mass: 80.0, ..top_jet(pt, eta, phi) }
}

pub fn ak4(pt: f64, eta: f64, phi: f64) -> Jet {
    Jet { pt, eta, phi, mass: 10.0, jet_id: 2, ..Jet::default() }
}

/// Simulated event with the given fat jets and AK4 jets summing to `ht`.
pub fn hadronic_event(event: u64, fat_jets: Vec<FatJet>, ht: f64) -> Event {
    let jets = vec![ak4(ht / 2.0, 0.2, 0.5), ak4(ht / 2.0, -0.3, -2.6)];
    Event { run: 1, event, fat_jets, jets, ..Event::default() }
}

pub fn tight_muon(pt: f64, eta: f64, phi: f64) -> Muon {
    Muon { pt, eta, phi, mass: 0.105_658, tight_id: true }
}

pub fn gen_muon(pt: f64, eta: f64, phi: f64) -> GenDressedLepton {
    GenDressedLepton { pt, eta, phi, mass: 0.105_658, pdg_id: 13 }
}

/// Z+jet event: a Z along phi = 0 recoiling against one jet at phi = π
/// with two subjets, at reco and (for simulation) generator level.
pub struct ZJetEvent {
    pub event: Event,
}

impl ZJetEvent {
    pub fn new(event: u64) -> Self {
        let ev = Event {
            run: 1,
            event,
            muons: vec![tight_muon(150.0, 0.3, 0.2), tight_muon(100.0, -0.2, -0.3)],
            gen_dressed_leptons: vec![gen_muon(150.0, 0.3, 0.2), gen_muon(100.0, -0.2, -0.3)],
            ..Event::default()
        };
        Self { event: ev }
    }

    /// Add a reco jet with two subjets.
    pub fn with_reco_jet(mut self, pt: f64, eta: f64, phi: f64, mass: f64) -> Self {
        let first = self.event.sub_jets.len() as i32;
        self.event.sub_jets.push(SubJet { pt: pt * 0.6, eta, phi: phi + 0.1, mass: mass * 0.3 });
        self.event.sub_jets.push(SubJet { pt: pt * 0.3, eta, phi: phi - 0.1, mass: mass * 0.2 });
        self.event.fat_jets.push(FatJet {
            pt,
            eta,
            phi,
            mass,
            jet_id: 2,
            sub_jet_idx1: first,
            sub_jet_idx2: first + 1,
            ..FatJet::default()
        });
        self
    }

    /// Add a reco jet without subjets.
    pub fn with_ungroomed_reco_jet(mut self, pt: f64, eta: f64, phi: f64, mass: f64) -> Self {
        self.event.fat_jets.push(FatJet {
            pt,
            eta,
            phi,
            mass,
            jet_id: 2,
            sub_jet_idx1: -1,
            sub_jet_idx2: -1,
            ..FatJet::default()
        });
        self
    }

    /// Add a generator jet with two subjets.
    pub fn with_gen_jet(mut self, pt: f64, eta: f64, phi: f64, mass: f64) -> Self {
        self.event.gen_jets_ak8.push(GenJet { pt, eta, phi, mass });
        let subs = &mut self.event.sub_gen_jets_ak8;
        subs.push(GenJet { pt: pt * 0.6, eta, phi: phi + 0.1, mass: mass * 0.3 });
        subs.push(GenJet { pt: pt * 0.3, eta, phi: phi - 0.1, mass: mass * 0.2 });
        self
    }

    pub fn as_data(mut self) -> Self {
        self.event.run = 300_000;
        self.event.gen_dressed_leptons.clear();
        self.event.gen_jets_ak8.clear();
        self.event.sub_gen_jets_ak8.clear();
        self
    }

    pub fn build(self) -> Event {
        self.event
    }
}
