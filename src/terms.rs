use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// On-disk layout of the master data file.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterData {
    /// Canonical term -> variant spellings seen in documents.
    #[serde(default)]
    pub standard_terms: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub varied_terms: BTreeMap<String, Vec<String>>,
}

/// Term-mapping dictionary persisted as pretty JSON. Every mutation is
/// written straight back to disk.
#[derive(Debug)]
pub struct TermStore {
    path: PathBuf,
    data: MasterData,
}

impl TermStore {
    /// Load `path`, creating an empty store there if it does not exist.
    pub fn load_or_init(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "creating empty term store");
            let store = TermStore {
                path: path.to_path_buf(),
                data: MasterData::default(),
            };
            store.save()?;
            return Ok(store);
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {:?}", path))?;
        let data = serde_json::from_str(&raw)
            .with_context(|| format!("Malformed term store {:?}", path))?;
        Ok(TermStore {
            path: path.to_path_buf(),
            data,
        })
    }

    pub fn save(&self) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(&self.data)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write {:?}", self.path))?;
        Ok(())
    }

    /// Append `variant` under `standard`. Duplicates are kept.
    pub fn add(&mut self, standard: &str, variant: &str) -> Result<()> {
        self.data
            .standard_terms
            .entry(standard.to_string())
            .or_default()
            .push(variant.to_string());
        self.save()
    }

    /// Remove the first `variant` under `standard`. Returns false, without
    /// touching the file, when there is nothing to remove.
    pub fn remove(&mut self, standard: &str, variant: &str) -> Result<bool> {
        let Some(variants) = self.data.standard_terms.get_mut(standard) else {
            return Ok(false);
        };
        let Some(idx) = variants.iter().position(|v| v == variant) else {
            return Ok(false);
        };
        variants.remove(idx);
        self.save()?;
        Ok(true)
    }

    pub fn variants(&self, standard: &str) -> Option<&[String]> {
        self.data.standard_terms.get(standard).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.data.standard_terms.iter()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
