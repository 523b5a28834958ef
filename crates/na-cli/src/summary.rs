//! `nanoana summary`: inspect a histogram file.

use anyhow::{Context, Result};
use na_hist::{HistFile, HistObject, ResponseSummary};
use serde_json::{Value, json};
use std::path::Path;

fn describe(dir: &str, obj: &HistObject) -> Value {
    let path = format!("{dir}/{}", obj.name());
    match obj {
        HistObject::Hist1d(h) => json!({
            "path": path,
            "kind": obj.kind(),
            "bins": h.n_bins(),
            "entries": h.entries(),
            "integral": h.integral(),
        }),
        HistObject::Hist2d(h) => json!({
            "path": path,
            "kind": obj.kind(),
            "bins": [h.x_axis().n_bins(), h.y_axis().n_bins()],
            "entries": h.entries(),
            "integral": h.integral(),
        }),
        HistObject::Predicted(p) => json!({
            "path": path,
            "kind": obj.kind(),
            "bins": p.predicted().n_bins(),
            "observed": p.observed().integral(),
            "predicted": p.predicted().integral(),
            "taggable": p.taggable().integral(),
            "errors_finalized": p.errors_finalized(),
        }),
        HistObject::Binning(b) => json!({
            "path": path,
            "kind": obj.kind(),
            "bins": b.n_bins(),
            "distributions": b.distributions().iter().map(|d| d.name()).collect::<Vec<_>>(),
        }),
    }
}

pub fn cmd_summary(input: &Path, response: Option<&str>) -> Result<Value> {
    let file = HistFile::read(input)
        .with_context(|| format!("reading histogram file {}", input.display()))?;

    let objects: Vec<Value> = file
        .directories()
        .iter()
        .flat_map(|d| d.objects().iter().map(move |o| describe(d.name(), o)))
        .collect();

    let mut out = json!({
        "input": input.display().to_string(),
        "provenance": &file.provenance,
        "objects": objects,
    });
    if let Some(path) = response {
        let summary = ResponseSummary::from_hist2d(file.get_h2(path)?)?;
        out["response"] = serde_json::to_value(summary)?;
    }
    Ok(out)
}
