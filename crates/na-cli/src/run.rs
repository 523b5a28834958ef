//! `nanoana run`: job configuration and the file-level event loop.

use anyhow::{Context, Result};
use na_analysis::{AnalysisModule, JsonlEvents, ModuleConfig, Processor};
use na_hist::{HistFile, InputDigest, Provenance};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, Deserialize)]
pub struct JobConfig {
    /// JSON Lines event files, processed in order.
    pub inputs: Vec<PathBuf>,
    /// Histogram output file.
    pub output: PathBuf,
    /// Directory holding the module's objects inside the output file.
    #[serde(default = "default_hist_dir")]
    pub hist_dir: String,
    /// Stop after this many events in total.
    #[serde(default)]
    pub max_events: Option<u64>,
    /// Module selection and parameters.
    pub module: ModuleConfig,
}

fn default_hist_dir() -> String {
    "ttbarres".to_string()
}

pub fn read_job_config(path: &Path) -> Result<JobConfig> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("").to_ascii_lowercase();
    let cfg: JobConfig = if ext == "json" {
        serde_json::from_slice(&bytes)?
    } else {
        // Default: YAML (serde_yaml_ng).
        serde_yaml_ng::from_slice(&bytes)?
    };
    Ok(cfg)
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    h.finalize().iter().map(|b| format!("{b:02x}")).collect()
}

fn sha256_file(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(sha256_hex(&bytes))
}

pub fn cmd_run(
    config_path: &Path,
    max_events: Option<u64>,
    output: Option<&PathBuf>,
) -> Result<serde_json::Value> {
    let job = read_job_config(config_path)?;
    if job.inputs.is_empty() {
        anyhow::bail!("job {} lists no inputs", config_path.display());
    }
    let output = output.cloned().unwrap_or_else(|| job.output.clone());

    let module = job.module.build().context("invalid module configuration")?;
    let mut processor = Processor::new(module).with_max_events(max_events.or(job.max_events));
    processor.begin()?;

    let mut digests = Vec::with_capacity(job.inputs.len());
    for input in &job.inputs {
        if processor.is_full() {
            warn!(input = %input.display(), "event limit reached, skipping input");
            continue;
        }
        let sha256 = sha256_file(input)?;
        let events = JsonlEvents::open(input)?;
        let n = processor
            .process(events)
            .with_context(|| format!("processing {}", input.display()))?;
        info!(input = %input.display(), events = n, "input done");
        digests.push(InputDigest { path: input.display().to_string(), sha256, events: n });
    }

    let module_name = processor.module().name().to_string();
    let (dir, stats) = processor.finish(&job.hist_dir)?;
    let n_objects = dir.len();
    let provenance = Provenance {
        tool: "nanoana".to_string(),
        version: na_core::VERSION.to_string(),
        module: module_name.clone(),
        inputs: digests,
        events_read: stats.events_read,
        events_accepted: stats.events_accepted,
    };
    let mut file = HistFile::new(provenance);
    file.add_directory(dir)?;
    file.write(&output).with_context(|| format!("writing {}", output.display()))?;

    Ok(serde_json::json!({
        "output": output.display().to_string(),
        "module": module_name,
        "hist_dir": job.hist_dir,
        "events_read": stats.events_read,
        "events_accepted": stats.events_accepted,
        "objects": n_objects,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
