use approx::assert_relative_eq;
use na_hist::{Hist1D, HistDir, HistFile, InputDigest, PredictedDistribution, Provenance};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

fn tmp_path(filename: &str) -> PathBuf {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    let mut p = std::env::temp_dir();
    p.push(format!("na_hist_{}_{}_{}", std::process::id(), nanos, filename));
    p
}

fn provenance() -> Provenance {
    Provenance {
        tool: "nanoana".into(),
        version: "test".into(),
        module: "ttbar_hadronic".into(),
        inputs: vec![InputDigest { path: "a.jsonl".into(), sha256: "00".repeat(32), events: 4 }],
        events_read: 4,
        events_accepted: 4,
    }
}

/// Prediction job writes a mistag rate, a signal job reads it back and
/// weights its probes with it.
#[test]
fn mistag_rate_survives_file_round_trip() {
    let mut preddist = Hist1D::new("preddist0", "preddist0", 30, 0.0, 3000.0).unwrap();
    let mut predtag = Hist1D::new("predtag0", "predtag0", 30, 0.0, 3000.0).unwrap();
    for _ in 0..4 {
        preddist.fill(500.0);
    }
    predtag.fill(500.0);
    let mistag = Hist1D::divide_binomial(&predtag, &preddist, "mistag0", "mistag0").unwrap();

    let mut dir = HistDir::new("ttbarres");
    dir.extend([preddist, predtag, mistag]).unwrap();
    let mut file = HistFile::new(provenance());
    file.add_directory(dir).unwrap();

    let path = tmp_path("pred.json");
    file.write(&path).unwrap();
    let back = HistFile::read(&path).unwrap();
    assert_eq!(back, file);
    assert_eq!(back.provenance.inputs[0].events, 4);

    let rate = back.get_h1("ttbarres/mistag0").unwrap().clone();
    let bin = rate.find_bin(500.0);
    assert_relative_eq!(rate.content(bin), 0.25);
    assert_relative_eq!(rate.error(bin).powi(2), 0.046875, epsilon = 1e-12);

    let mut pred = PredictedDistribution::new(rate, "predJetP0", "p", 30, 0.0, 3000.0).unwrap();
    pred.accumulate(500.0, 500.0, false, 2.0);
    pred.set_calculated_errors();

    let out_bin = pred.predicted().find_bin(500.0);
    assert_relative_eq!(pred.predicted().content(out_bin), 0.5);
    assert_relative_eq!(pred.taggable().content(out_bin), 2.0);
    assert_eq!(pred.observed().integral(), 0.0);
    assert_relative_eq!(pred.uncorrelated_error(out_bin), 0.5);
    assert_relative_eq!(pred.predicted().error(out_bin).powi(2), 0.4375, epsilon = 1e-12);

    let _ = std::fs::remove_file(path);
}

#[test]
fn lookup_errors() {
    let mut file = HistFile::new(provenance());
    file.add_directory(HistDir::new("ttbarres")).unwrap();
    assert!(file.add_directory(HistDir::new("ttbarres")).is_err());
    assert!(matches!(file.get("ttbarres/mistag3"), Err(na_core::Error::NotFound(_))));
    assert!(matches!(file.get("mistag3"), Err(na_core::Error::Validation(_))));
    assert!(HistFile::read(&tmp_path("missing.json")).is_err());
}

/// Rewrite one object field of a written file, as a hand edit would.
fn edit_object(path: &PathBuf, name: &str, field: &str, value: serde_json::Value) {
    let mut v: serde_json::Value = serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap();
    let objects = v["directories"][0]["objects"].as_array_mut().unwrap();
    let obj = objects.iter_mut().find(|o| o["name"] == name).unwrap();
    obj[field] = value;
    std::fs::write(path, serde_json::to_string(&v).unwrap()).unwrap();
}

#[test]
fn inconsistent_file_content_is_a_validation_error() {
    let mut dir = HistDir::new("ttbarres");
    dir.insert(Hist1D::new("mistag0", "mistag0", 30, 0.0, 3000.0).unwrap()).unwrap();
    dir.insert(Hist1D::new("mistag1", "mistag1", 30, 0.0, 3000.0).unwrap()).unwrap();
    let mut file = HistFile::new(provenance());
    file.add_directory(dir).unwrap();

    let cases = [
        ("mistag0", "sumw", serde_json::json!([0.0, 1.0])),
        ("mistag0", "axis", serde_json::json!({"edges": []})),
        ("mistag1", "name", serde_json::json!("mistag0")),
    ];
    for (i, (name, field, value)) in cases.into_iter().enumerate() {
        let path = tmp_path(&format!("edited_{i}.json"));
        file.write(&path).unwrap();
        edit_object(&path, name, field, value);
        let err = HistFile::read(&path).unwrap_err();
        let _ = std::fs::remove_file(&path);
        assert!(matches!(err, na_core::Error::Validation(_)), "case {i}: {err}");
    }

    let path = tmp_path("truncated.json");
    std::fs::write(&path, "{\"provenance\": ").unwrap();
    let err = HistFile::read(&path).unwrap_err();
    let _ = std::fs::remove_file(&path);
    assert!(matches!(err, na_core::Error::Json(_)), "{err}");
}
