//! Region / district reference data
//!
//! Loaded once at startup and shared read-only by every conversation.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReferenceError {
    #[error("Failed to read reference file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Malformed reference data: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Region has no districts: {0}")]
    EmptyRegion(String),
}

/// Per-region entry as it appears on disk.
///
/// The public metadata export wraps districts in a `districts` object; a plain
/// name -> id mapping is accepted as well.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RegionEntry {
    Wrapped { districts: BTreeMap<String, u32> },
    Flat(BTreeMap<String, u32>),
}

impl RegionEntry {
    fn into_districts(self) -> BTreeMap<String, u32> {
        match self {
            RegionEntry::Wrapped { districts } | RegionEntry::Flat(districts) => districts,
        }
    }
}

/// Region name -> district name -> district identifier
#[derive(Debug, Clone, Default)]
pub struct ReferenceMap {
    regions: BTreeMap<String, BTreeMap<String, u32>>,
}

impl ReferenceMap {
    /// Load from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ReferenceError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ReferenceError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ReferenceError> {
        let entries: BTreeMap<String, RegionEntry> = serde_json::from_str(raw)?;
        let mut regions = BTreeMap::new();
        for (region, entry) in entries {
            let districts = entry.into_districts();
            if districts.is_empty() {
                return Err(ReferenceError::EmptyRegion(region));
            }
            regions.insert(region, districts);
        }
        Ok(Self { regions })
    }

    #[cfg(test)]
    pub fn from_pairs<'a>(
        data: impl IntoIterator<Item = (&'a str, Vec<(&'a str, u32)>)>,
    ) -> Self {
        let regions = data
            .into_iter()
            .map(|(region, districts)| {
                (
                    region.to_string(),
                    districts
                        .into_iter()
                        .map(|(name, id)| (name.to_string(), id))
                        .collect(),
                )
            })
            .collect();
        Self { regions }
    }

    pub fn region_names(&self) -> Vec<String> {
        self.regions.keys().cloned().collect()
    }

    /// District names under `region`, or `None` for an unknown region
    pub fn district_names(&self, region: &str) -> Option<Vec<String>> {
        self.regions
            .get(region)
            .map(|districts| districts.keys().cloned().collect())
    }

    pub fn districts(&self, region: &str) -> Option<&BTreeMap<String, u32>> {
        self.regions.get(region)
    }

    pub fn district_id(&self, region: &str, district: &str) -> Option<u32> {
        self.regions.get(region)?.get(district).copied()
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }
}
