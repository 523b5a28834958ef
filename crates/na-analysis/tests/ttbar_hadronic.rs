mod common;

use common::{hadronic_event, qcd_jet, tmp_path, top_jet};
use na_analysis::{AnalysisModule, Processor, TTbarConfig, TTbarResHadronic};
use na_core::{Error, Event, FatJet, HasP4, JetVariations};
use na_hist::{HistDir, HistFile, HistObject, Provenance};

fn run(config: TTbarConfig, events: &[Event]) -> HistDir {
    let mut p = Processor::new(TTbarResHadronic::new(config).unwrap());
    p.begin().unwrap();
    p.process(events.iter().cloned().map(Ok)).unwrap();
    p.finish("ttbarres").unwrap().0
}

fn entries(dir: &HistDir, name: &str) -> u64 {
    dir.get_h1(name).unwrap().entries()
}

/// One top-tagged and one anti-tagged jet with equal momentum, both central.
fn anti_tag_events(n: u64) -> Vec<Event> {
    (0..n)
        .map(|i| {
            hadronic_event(i, vec![top_jet(600.0, 0.3, 0.0), qcd_jet(600.0, -0.3, 3.0)], 1400.0)
        })
        .collect()
}

#[test]
fn test_low_ht_fills_only_ht() {
    let mut m = TTbarResHadronic::new(TTbarConfig::default()).unwrap();
    m.begin_job().unwrap();
    let ev = hadronic_event(1, vec![top_jet(600.0, 0.3, 0.0), top_jet(550.0, -0.2, 3.0)], 800.0);
    assert!(!m.analyze(&ev).unwrap());
    let mut dir = HistDir::new("ttbarres");
    m.end_job(&mut dir).unwrap();

    for obj in dir.objects() {
        let HistObject::Hist1d(h) = obj else { continue };
        let expected = u64::from(h.name() == "h_ak4ht_nom");
        assert_eq!(h.entries(), expected, "{}", h.name());
    }
}

#[test]
fn test_too_few_fat_jets_rejected() {
    let mut m = TTbarResHadronic::new(TTbarConfig::default()).unwrap();
    m.begin_job().unwrap();
    let mut failing_id = top_jet(550.0, -0.2, 3.0);
    failing_id.jet_id = 0;
    let ev = hadronic_event(1, vec![top_jet(600.0, 0.3, 0.0), failing_id], 1400.0);
    assert!(!m.analyze(&ev).unwrap());
    let soft = hadronic_event(2, vec![top_jet(600.0, 0.3, 0.0), top_jet(300.0, 0.1, 3.0)], 1400.0);
    assert!(!m.analyze(&soft).unwrap());

    let mut dir = HistDir::new("ttbarres");
    m.end_job(&mut dir).unwrap();
    assert_eq!(entries(&dir, "h_ak4ht_nom"), 0);
}

#[test]
fn test_shifted_variant_rejects_whole_event() {
    let mut m = TTbarResHadronic::new(TTbarConfig::default()).unwrap();
    m.begin_job().unwrap();
    let mut shifted = top_jet(420.0, -0.2, 3.0);
    shifted.variations = JetVariations { pt_jes_down: Some(390.0), ..JetVariations::default() };
    let ev = hadronic_event(1, vec![top_jet(600.0, 0.3, 0.0), shifted], 1400.0);
    assert!(!m.analyze(&ev).unwrap());
    let mut dir = HistDir::new("ttbarres");
    m.end_job(&mut dir).unwrap();

    // Variants before jec_dn pass preselection and fill HT; jec_dn fails on
    // the jet count, so nothing downstream is filled for any variant.
    assert_eq!(entries(&dir, "h_ak4ht_jec_up"), 1);
    assert_eq!(entries(&dir, "h_ak4ht_jec_dn"), 0);
    assert_eq!(entries(&dir, "h_ak8pt_nom"), 0);
    assert_eq!(entries(&dir, "h_mttbar_nom"), 0);
}

#[test]
fn test_variant_weights() {
    let mut ev =
        hadronic_event(1, vec![top_jet(600.0, 0.3, 0.0), top_jet(600.0, -0.3, 3.0)], 1400.0);
    ev.weights.gen_weight = 2.0;
    ev.weights.pu_weight_up = Some(1.5);
    let dir = run(TTbarConfig::default(), &[ev]);
    assert_eq!(dir.get_h1("h_ak4ht_nom").unwrap().integral(), 2.0);
    assert_eq!(dir.get_h1("h_ak4ht_pu_up").unwrap().integral(), 3.0);
    assert_eq!(dir.get_h1("h_ak4ht_jec_up").unwrap().integral(), 2.0);
    // Both jets are top-tagged, so every variant fills m_ttbar.
    assert_eq!(dir.get_h1("h_mttbar_pu_up").unwrap().integral(), 3.0);
    assert_eq!(entries(&dir, "h_ak8pt_nom"), 2);
}

#[test]
fn test_prediction_mode_anti_tag_region() {
    let dir = run(TTbarConfig::default(), &anti_tag_events(60));

    // The probe is tagged exactly when the random assignment picks the
    // top jet as probe; then the tag jet fails and the probe is counted.
    let probes = entries(&dir, "preddist0");
    assert!(probes > 0 && probes < 60, "probes = {probes}");
    assert_eq!(entries(&dir, "predtag0"), probes);
    assert_eq!(entries(&dir, "h_mttbar_nom"), probes);
    for cat in 1..6 {
        assert_eq!(entries(&dir, &format!("preddist{cat}")), 0);
    }

    let mistag = dir.get_h1("mistag0").unwrap();
    let bin = mistag.find_bin(top_jet(600.0, 0.3, 0.0).p4().p());
    assert!((mistag.content(bin) - 1.0).abs() < 1e-12);
}

#[test]
fn test_fixed_seed_is_reproducible() {
    let events = anti_tag_events(40);
    let a = run(TTbarConfig::default(), &events);
    let b = run(TTbarConfig::default(), &events);
    assert_eq!(a, b);
}

#[test]
fn test_signal_mode_applies_mistag_rate() {
    let pred = run(TTbarConfig::default(), &anti_tag_events(60));
    let mut file = HistFile::new(Provenance::default());
    file.add_directory(pred).unwrap();
    let path = tmp_path("pred.json");
    file.write(&path).unwrap();

    let events: Vec<Event> = (0..25)
        .map(|i| {
            hadronic_event(i, vec![top_jet(600.0, 0.3, 0.0), top_jet(600.0, -0.3, 3.0)], 1400.0)
        })
        .collect();
    let dir = run(TTbarConfig::signal(&path), &events);
    let _ = std::fs::remove_file(&path);

    let pd = dir.get_predicted("predJetP0").unwrap();
    assert!(pd.errors_finalized());
    assert_eq!(pd.observed().entries(), 25);
    assert_eq!(pd.taggable().entries(), 25);
    assert!((pd.predicted().integral() - 25.0).abs() < 1e-9);
    assert_eq!(dir.get_predicted("predJetSDMass0").unwrap().observed().entries(), 25);
    assert_eq!(dir.get_predicted("predJetSDRho0").unwrap().taggable().entries(), 25);
    assert_eq!(entries(&dir, "h_mttbar_nom"), 25);
    assert_eq!(entries(&dir, "h_mttbar_jmr_dn"), 25);
    assert!(dir.get("preddist0").is_none());
}

fn write_prediction(name: &str) -> std::path::PathBuf {
    let pred = run(TTbarConfig::default(), &anti_tag_events(10));
    let mut file = HistFile::new(Provenance::default());
    file.add_directory(pred).unwrap();
    let path = tmp_path(name);
    file.write(&path).unwrap();
    path
}

#[test]
fn test_signal_mode_rejects_event_when_tag_fails() {
    let path = write_prediction("pred_reject.json");
    let mut m = TTbarResHadronic::new(TTbarConfig::signal(&path)).unwrap();
    m.begin_job().unwrap();
    let _ = std::fs::remove_file(&path);

    let ev = hadronic_event(1, vec![qcd_jet(600.0, 0.3, 0.0), qcd_jet(600.0, -0.3, 3.0)], 1400.0);
    assert!(!m.analyze(&ev).unwrap());
    let mut dir = HistDir::new("ttbarres");
    m.end_job(&mut dir).unwrap();

    // Preselection passed for every variant, nothing after it was filled.
    for obj in dir.objects() {
        match obj {
            HistObject::Hist1d(h) => {
                let expected = u64::from(h.name().starts_with("h_ak4ht_"));
                assert_eq!(h.entries(), expected, "{}", h.name());
            }
            HistObject::Predicted(pd) => assert_eq!(pd.taggable().entries(), 0, "{}", pd.name()),
            _ => {}
        }
    }
}

#[test]
fn test_signal_mode_accepts_only_fully_tagged_events() {
    let path = write_prediction("pred_mixed.json");
    let mut p = Processor::new(TTbarResHadronic::new(TTbarConfig::signal(&path)).unwrap());
    p.begin().unwrap();
    let _ = std::fs::remove_file(&path);
    p.process(anti_tag_events(30).into_iter().map(Ok)).unwrap();
    let (dir, stats) = p.finish("ttbarres").unwrap();

    // An accepted event had the top jet as tag in every variant, so the
    // probe is always the anti-tagged jet.
    assert_eq!(stats.events_read, 30);
    assert_eq!(entries(&dir, "h_ak4ht_nom"), 30);
    assert_eq!(entries(&dir, "h_ak8pt_nom"), 2 * stats.events_accepted);
    assert_eq!(entries(&dir, "h_ak8pt_jmr_dn"), 2 * stats.events_accepted);
    assert_eq!(entries(&dir, "h_mttbar_nom"), 0);
    let pd = dir.get_predicted("predJetP0").unwrap();
    assert_eq!(pd.observed().entries(), 0);
    assert_eq!(pd.taggable().entries(), stats.events_accepted);
}

/// Two anti-tagged jets: the tag always fails and the probe is never
/// tagged, so every event lands in `preddist<cat>` regardless of the
/// random assignment.
fn qcd_pair_events(n: u64, first: FatJet, second: FatJet) -> Vec<Event> {
    (0..n).map(|i| hadronic_event(i, vec![first.clone(), second.clone()], 1400.0)).collect()
}

fn preddist_entries(dir: &HistDir) -> Vec<u64> {
    (0..6).map(|cat| entries(dir, &format!("preddist{cat}"))).collect()
}

#[test]
fn test_forward_probe_with_one_btag() {
    let mut btagged = qcd_jet(600.0, 1.5, 0.0);
    btagged.max_csvv2 = 0.9;
    let mut light = qcd_jet(600.0, -1.6, 3.0);
    light.max_csvv2 = 0.3;
    let dir = run(TTbarConfig::default(), &qcd_pair_events(12, btagged, light));

    assert_eq!(preddist_entries(&dir), vec![0, 0, 0, 12, 0, 0]);
    assert_eq!(entries(&dir, "predtag3"), 0);
}

#[test]
fn test_central_probe_with_two_btags() {
    let mut a = qcd_jet(600.0, 0.3, 0.0);
    a.max_csvv2 = 0.95;
    let mut b = qcd_jet(600.0, -0.3, 3.0);
    b.max_csvv2 = 0.8;
    let mut c = qcd_jet(500.0, 0.1, 1.5);
    c.max_csvv2 = 0.99;
    let events: Vec<Event> =
        (0..12).map(|i| hadronic_event(i, vec![a.clone(), b.clone(), c.clone()], 1400.0)).collect();
    let dir = run(TTbarConfig::default(), &events);

    // Any probe/tag pair out of three b-tagged jets counts as two b-tags.
    assert_eq!(preddist_entries(&dir), vec![0, 0, 0, 0, 12, 0]);
}

#[test]
fn test_btag_threshold_is_strict() {
    let mut a = qcd_jet(600.0, 0.3, 0.0);
    a.max_csvv2 = 0.7;
    let b = qcd_jet(600.0, -0.3, 3.0);
    let dir = run(TTbarConfig::default(), &qcd_pair_events(5, a, b));
    assert_eq!(preddist_entries(&dir), vec![5, 0, 0, 0, 0, 0]);
}

#[test]
fn test_prediction_fills_nominal_variant_only() {
    let shift = |mut j: FatJet| {
        j.variations = JetVariations { pt_jes_up: Some(750.0), ..JetVariations::default() };
        j
    };
    let (a, b) = (shift(qcd_jet(620.0, 0.3, 0.0)), shift(qcd_jet(620.0, -0.3, 3.0)));
    let events = qcd_pair_events(8, a, b);
    let dir = run(TTbarConfig::default(), &events);

    assert_eq!(preddist_entries(&dir).iter().sum::<u64>(), 8);
    assert_eq!(entries(&dir, "preddist0"), 8);
    let h = dir.get_h1("h_ak8pt_jec_up").unwrap();
    assert_eq!(h.entries(), 16);
    assert_eq!(h.content(h.find_bin(750.0)), 16.0);
    let nom = dir.get_h1("h_ak8pt_nom").unwrap();
    assert_eq!(nom.content(nom.find_bin(620.0)), 16.0);
}

#[test]
fn test_pileup_variants_bracket_nominal() {
    let mut ev =
        hadronic_event(1, vec![top_jet(600.0, 0.3, 0.0), top_jet(600.0, -0.3, 3.0)], 1400.0);
    ev.weights.pu_weight = Some(0.5);
    ev.weights.pu_weight_up = Some(0.55);
    ev.weights.pu_weight_down = Some(0.45);
    let dir = run(TTbarConfig::default(), &[ev]);
    let integral = |name: &str| dir.get_h1(name).unwrap().integral();
    assert_eq!(integral("h_ak4ht_nom"), 0.5);
    assert_eq!(integral("h_ak4ht_pu_up"), 0.55);
    assert_eq!(integral("h_ak4ht_pu_dn"), 0.45);
    assert_eq!(integral("h_ak4ht_jec_up"), 0.5);
}

#[test]
fn test_signal_mode_missing_rates() {
    let mut file = HistFile::new(Provenance::default());
    file.add_directory(HistDir::new("ttbarres")).unwrap();
    let path = tmp_path("empty_pred.json");
    file.write(&path).unwrap();

    let mut m = TTbarResHadronic::new(TTbarConfig::signal(&path)).unwrap();
    let err = m.begin_job().unwrap_err();
    let _ = std::fs::remove_file(&path);
    assert!(matches!(err, Error::NotFound(ref p) if p == "ttbarres/mistag0"), "{err}");
}
