//! Histogram output file: named directories of histogram objects.
//!
//! Written as pretty JSON so downstream plotting/unfolding scripts can read
//! it without ROOT. Objects are addressed as `"<dir>/<name>"`.

use std::path::Path;

use na_core::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::binning::UnfoldBinning;
use crate::hist2d::Hist2D;
use crate::histogram::Hist1D;
use crate::predicted::PredictedDistribution;

/// Any object that can be stored in a [`HistDir`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HistObject {
    /// 1D histogram.
    Hist1d(Hist1D),
    /// 2D histogram.
    Hist2d(Hist2D),
    /// Mistag-weighted background prediction.
    Predicted(PredictedDistribution),
    /// Unfolding binning scheme.
    Binning(UnfoldBinning),
}

impl HistObject {
    /// Name of the wrapped object.
    pub fn name(&self) -> &str {
        match self {
            Self::Hist1d(h) => h.name(),
            Self::Hist2d(h) => h.name(),
            Self::Predicted(p) => p.name(),
            Self::Binning(b) => b.name(),
        }
    }

    /// Short kind label, as serialized.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Hist1d(_) => "hist1d",
            Self::Hist2d(_) => "hist2d",
            Self::Predicted(_) => "predicted",
            Self::Binning(_) => "binning",
        }
    }
}

impl From<Hist1D> for HistObject {
    fn from(h: Hist1D) -> Self {
        Self::Hist1d(h)
    }
}

impl From<Hist2D> for HistObject {
    fn from(h: Hist2D) -> Self {
        Self::Hist2d(h)
    }
}

impl From<PredictedDistribution> for HistObject {
    fn from(p: PredictedDistribution) -> Self {
        Self::Predicted(p)
    }
}

impl From<UnfoldBinning> for HistObject {
    fn from(b: UnfoldBinning) -> Self {
        Self::Binning(b)
    }
}

/// A named directory of objects, kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "HistDirRecord")]
pub struct HistDir {
    name: String,
    objects: Vec<HistObject>,
}

/// Stored form of a [`HistDir`]; names are re-checked for uniqueness.
#[derive(Deserialize)]
struct HistDirRecord {
    name: String,
    objects: Vec<HistObject>,
}

impl TryFrom<HistDirRecord> for HistDir {
    type Error = Error;

    fn try_from(r: HistDirRecord) -> Result<Self> {
        let mut dir = HistDir::new(r.name);
        dir.extend(r.objects)?;
        Ok(dir)
    }
}

impl HistDir {
    /// Empty directory.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), objects: Vec::new() }
    }

    /// Directory name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add an object; names must be unique within the directory.
    pub fn insert(&mut self, object: impl Into<HistObject>) -> Result<()> {
        let object = object.into();
        if self.get(object.name()).is_some() {
            return Err(Error::Validation(format!(
                "duplicate object '{}' in directory '{}'",
                object.name(),
                self.name
            )));
        }
        self.objects.push(object);
        Ok(())
    }

    /// Add several objects in order.
    pub fn extend<I, T>(&mut self, objects: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<HistObject>,
    {
        for object in objects {
            self.insert(object)?;
        }
        Ok(())
    }

    /// Look up an object by name.
    pub fn get(&self, name: &str) -> Option<&HistObject> {
        self.objects.iter().find(|o| o.name() == name)
    }

    /// Look up a 1D histogram by name.
    pub fn get_h1(&self, name: &str) -> Result<&Hist1D> {
        match self.get(name) {
            Some(HistObject::Hist1d(h)) => Ok(h),
            Some(other) => Err(wrong_kind(&self.name, name, "hist1d", other)),
            None => Err(Error::NotFound(format!("{}/{name}", self.name))),
        }
    }

    /// Look up a 2D histogram by name.
    pub fn get_h2(&self, name: &str) -> Result<&Hist2D> {
        match self.get(name) {
            Some(HistObject::Hist2d(h)) => Ok(h),
            Some(other) => Err(wrong_kind(&self.name, name, "hist2d", other)),
            None => Err(Error::NotFound(format!("{}/{name}", self.name))),
        }
    }

    /// Look up a background prediction by name.
    pub fn get_predicted(&self, name: &str) -> Result<&PredictedDistribution> {
        match self.get(name) {
            Some(HistObject::Predicted(p)) => Ok(p),
            Some(other) => Err(wrong_kind(&self.name, name, "predicted", other)),
            None => Err(Error::NotFound(format!("{}/{name}", self.name))),
        }
    }

    /// Objects in insertion order.
    pub fn objects(&self) -> &[HistObject] {
        &self.objects
    }

    /// Number of objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the directory holds no objects.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

fn wrong_kind(dir: &str, name: &str, want: &str, got: &HistObject) -> Error {
    Error::Validation(format!("{dir}/{name}: expected {want}, found {}", got.kind()))
}

/// Digest of one input file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputDigest {
    /// Path as given in the job configuration.
    pub path: String,
    /// Hex SHA-256 of the file contents.
    pub sha256: String,
    /// Events read from this file.
    pub events: u64,
}

/// Where a histogram file came from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    /// Producing tool name.
    pub tool: String,
    /// Producing tool version.
    pub version: String,
    /// Analysis module that filled the histograms.
    pub module: String,
    /// Input files in processing order.
    pub inputs: Vec<InputDigest>,
    /// Events handed to the module.
    pub events_read: u64,
    /// Events for which the module returned `true`.
    pub events_accepted: u64,
}

/// A histogram file: provenance plus directories.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "HistFileRecord")]
pub struct HistFile {
    /// Production metadata.
    pub provenance: Provenance,
    directories: Vec<HistDir>,
}

#[derive(Deserialize)]
struct HistFileRecord {
    provenance: Provenance,
    directories: Vec<HistDir>,
}

impl TryFrom<HistFileRecord> for HistFile {
    type Error = Error;

    fn try_from(r: HistFileRecord) -> Result<Self> {
        let mut file = HistFile::new(r.provenance);
        for dir in r.directories {
            file.add_directory(dir)?;
        }
        Ok(file)
    }
}

impl HistFile {
    /// Empty file with the given provenance.
    pub fn new(provenance: Provenance) -> Self {
        Self { provenance, directories: Vec::new() }
    }

    /// Add a directory; names must be unique.
    pub fn add_directory(&mut self, dir: HistDir) -> Result<()> {
        if self.directory(dir.name()).is_some() {
            return Err(Error::Validation(format!("duplicate directory '{}'", dir.name())));
        }
        self.directories.push(dir);
        Ok(())
    }

    /// Look up a directory by name.
    pub fn directory(&self, name: &str) -> Option<&HistDir> {
        self.directories.iter().find(|d| d.name() == name)
    }

    /// All directories.
    pub fn directories(&self) -> &[HistDir] {
        &self.directories
    }

    /// Resolve `"<dir>/<name>"`.
    pub fn get(&self, path: &str) -> Result<&HistObject> {
        let (dir, name) = split_path(path)?;
        self.directory(dir)
            .and_then(|d| d.get(name))
            .ok_or_else(|| Error::NotFound(path.to_string()))
    }

    /// Resolve `"<dir>/<name>"` to a 1D histogram.
    pub fn get_h1(&self, path: &str) -> Result<&Hist1D> {
        let (dir, name) = split_path(path)?;
        self.directory(dir).ok_or_else(|| Error::NotFound(path.to_string()))?.get_h1(name)
    }

    /// Resolve `"<dir>/<name>"` to a 2D histogram.
    pub fn get_h2(&self, path: &str) -> Result<&Hist2D> {
        let (dir, name) = split_path(path)?;
        self.directory(dir).ok_or_else(|| Error::NotFound(path.to_string()))?.get_h2(name)
    }

    /// Write as pretty JSON, creating parent directories as needed.
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        tracing::info!(
            path = %path.display(),
            directories = self.directories.len(),
            "wrote histogram file"
        );
        Ok(())
    }

    /// Read a file written by [`HistFile::write`].
    ///
    /// Well-formed JSON whose content is inconsistent (bad edges, wrong
    /// cell counts, duplicate names) is a [`Error::Validation`].
    pub fn read(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        serde_json::from_slice(&bytes).map_err(|e| {
            if e.is_data() {
                Error::Validation(format!("{}: {e}", path.display()))
            } else {
                Error::Json(e)
            }
        })
    }
}

fn split_path(path: &str) -> Result<(&str, &str)> {
    path.split_once('/')
        .filter(|(d, n)| !d.is_empty() && !n.is_empty())
        .ok_or_else(|| Error::Validation(format!("expected '<dir>/<name>', got '{path}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_dir() -> HistDir {
        let mut dir = HistDir::new("ttbarres");
        let mut h = Hist1D::new("h_ak4ht_nom", "h_ak4ht", 25, 0.0, 2500.0).unwrap();
        h.fill(1200.0);
        dir.insert(h).unwrap();
        dir.insert(Hist2D::with_edges("h_resp", "r", &[0.0, 1.0], &[0.0, 1.0]).unwrap()).unwrap();
        dir
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut dir = sample_dir();
        let dup = Hist1D::new("h_ak4ht_nom", "dup", 1, 0.0, 1.0).unwrap();
        assert!(matches!(dir.insert(dup), Err(Error::Validation(_))));
        assert_eq!(dir.len(), 2);
    }

    #[test]
    fn test_typed_lookup() {
        let dir = sample_dir();
        assert_eq!(dir.get_h1("h_ak4ht_nom").unwrap().entries(), 1);
        assert!(matches!(dir.get_h1("h_resp"), Err(Error::Validation(_))));
        assert!(matches!(dir.get_h2("missing"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_file_path_lookup_and_json_round_trip() {
        let mut file =
            HistFile::new(Provenance { tool: "nanoana".into(), ..Provenance::default() });
        file.add_directory(sample_dir()).unwrap();
        assert!(file.add_directory(HistDir::new("ttbarres")).is_err());

        let json = serde_json::to_string(&file).unwrap();
        let back: HistFile = serde_json::from_str(&json).unwrap();
        assert_eq!(back, file);
        assert_eq!(back.get("ttbarres/h_resp").unwrap().kind(), "hist2d");
        assert!(back.get_h1("ttbarres/h_ak4ht_nom").is_ok());
        assert!(matches!(back.get("ttbarres"), Err(Error::Validation(_))));
        assert!(matches!(back.get("other/h"), Err(Error::NotFound(_))));
    }
}
