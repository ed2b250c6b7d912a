//! Sound packs.
//!
//! A pack is a directory with an `openpeon.json` manifest (CESP format):
//!
//! ```json
//! {
//!   "name": "peon",
//!   "categories": {
//!     "task.complete": { "sounds": [{ "file": "sounds/work_complete.wav", "label": "Work complete" }] }
//!   }
//! }
//! ```
//!
//! Manifest categories outside [`SoundCategory`] are ignored. Packs are
//! searched in each configured root as `<root>/<name>/openpeon.json`.

use crate::config::DEFAULT_PACK;
use crate::error::{Error, Result};
use crate::types::SoundCategory;
use serde::Deserialize;
use std::cell::OnceCell;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// Manifest file name inside a pack directory
pub const MANIFEST_FILE: &str = "openpeon.json";

// ============================================
// Raw manifest (serde deserialization)
// ============================================

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawManifest {
    name: Option<String>,
    categories: BTreeMap<String, RawCategory>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawCategory {
    sounds: Vec<RawSound>,
}

#[derive(Debug, Deserialize)]
struct RawSound {
    file: String,
    #[serde(default)]
    label: Option<String>,
}

// ============================================
// Packs
// ============================================

/// One playable sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    /// File name as listed in the manifest (relative to the pack)
    pub file: String,
    /// Human-readable label, if the manifest has one
    pub label: Option<String>,
    /// Absolute path to the audio file
    pub path: PathBuf,
}

/// A loaded pack: samples grouped by category.
#[derive(Debug, Clone)]
pub struct SoundPack {
    pub name: String,
    pub dir: PathBuf,
    samples: HashMap<SoundCategory, Vec<Sample>>,
}

impl SoundPack {
    /// Load a pack from its directory.
    pub fn load(dir: &Path) -> Result<Self> {
        let manifest_path = dir.join(MANIFEST_FILE);
        let content = std::fs::read_to_string(&manifest_path)?;
        let raw: RawManifest = serde_json::from_str(&content)?;

        let dir_name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = raw.name.unwrap_or(dir_name);

        let mut samples: HashMap<SoundCategory, Vec<Sample>> = HashMap::new();
        for (category_name, category) in raw.categories {
            let Ok(sound_category) = category_name.parse::<SoundCategory>() else {
                tracing::debug!(pack = %name, category = %category_name, "Skipping unknown category");
                continue;
            };
            let entries = samples.entry(sound_category).or_default();
            for sound in category.sounds {
                entries.push(Sample {
                    path: dir.join(&sound.file),
                    file: sound.file,
                    label: sound.label,
                });
            }
        }

        Ok(Self {
            name,
            dir: dir.to_path_buf(),
            samples,
        })
    }

    /// Build a pack from already-known samples (for testing and embedding).
    pub fn from_samples(
        name: &str,
        dir: PathBuf,
        samples: impl IntoIterator<Item = (SoundCategory, Vec<Sample>)>,
    ) -> Self {
        Self {
            name: name.to_string(),
            dir,
            samples: samples.into_iter().collect(),
        }
    }

    /// Samples registered for a category (possibly empty)
    pub fn samples(&self, category: SoundCategory) -> &[Sample] {
        self.samples
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

// ============================================
// Sample lookup
// ============================================

/// Samples chosen to serve a category, and which pack they came from.
#[derive(Debug, Clone, Copy)]
pub struct PackSamples<'a> {
    pub pack: &'a str,
    pub samples: &'a [Sample],
}

/// Source of candidate samples for the sample selector.
pub trait SampleCatalog {
    /// Non-empty candidate set for `category`, or [`Error::MissingPackAsset`].
    fn samples_for(&self, category: SoundCategory) -> Result<PackSamples<'_>>;
}

impl SampleCatalog for SoundPack {
    fn samples_for(&self, category: SoundCategory) -> Result<PackSamples<'_>> {
        let samples = self.samples(category);
        if samples.is_empty() {
            return Err(Error::MissingPackAsset {
                pack: self.name.clone(),
                category,
            });
        }
        Ok(PackSamples {
            pack: &self.name,
            samples,
        })
    }
}

/// Lazily loads the active pack, falling back to the bundled default pack.
///
/// Nothing is read from disk until a sample is actually needed, so suppressed
/// events never touch the pack directories.
pub struct PackLibrary {
    roots: Vec<PathBuf>,
    active_name: String,
    active: OnceCell<Option<SoundPack>>,
    fallback: OnceCell<std::result::Result<SoundPack, String>>,
}

impl PackLibrary {
    pub fn new(roots: Vec<PathBuf>, active_name: &str) -> Self {
        Self {
            roots,
            active_name: active_name.to_string(),
            active: OnceCell::new(),
            fallback: OnceCell::new(),
        }
    }

    /// First root containing `<name>/openpeon.json`
    pub fn find_pack_dir(&self, name: &str) -> Option<PathBuf> {
        self.roots
            .iter()
            .map(|root| root.join(name))
            .find(|dir| dir.join(MANIFEST_FILE).is_file())
    }

    fn active(&self) -> Option<&SoundPack> {
        self.active
            .get_or_init(|| {
                let Some(dir) = self.find_pack_dir(&self.active_name) else {
                    tracing::warn!(pack = %self.active_name, "Active pack is not installed");
                    return None;
                };
                match SoundPack::load(&dir) {
                    Ok(pack) => Some(pack),
                    Err(e) => {
                        tracing::warn!(pack = %self.active_name, error = %e, "Failed to load active pack");
                        None
                    }
                }
            })
            .as_ref()
    }

    fn fallback(&self) -> Result<&SoundPack> {
        self.fallback
            .get_or_init(|| {
                let dir = self
                    .find_pack_dir(DEFAULT_PACK)
                    .ok_or_else(|| "pack is not installed".to_string())?;
                SoundPack::load(&dir).map_err(|e| e.to_string())
            })
            .as_ref()
            .map_err(|message| Error::DefaultPackUnavailable {
                pack: DEFAULT_PACK.to_string(),
                message: message.clone(),
            })
    }
}

impl SampleCatalog for PackLibrary {
    /// Samples from the active pack, else from the default pack.
    ///
    /// An installed active pack that lacks the category stays recoverable
    /// even when the default pack can't be loaded; the default pack is only
    /// fatal when nothing else is usable.
    fn samples_for(&self, category: SoundCategory) -> Result<PackSamples<'_>> {
        let mut active_loaded = false;
        if self.active_name != DEFAULT_PACK {
            if let Some(pack) = self.active() {
                if let Ok(found) = pack.samples_for(category) {
                    return Ok(found);
                }
                active_loaded = true;
            }
            tracing::info!(
                pack = %self.active_name,
                category = %category,
                "No samples in active pack, trying default pack"
            );
        }

        let missing = || Error::MissingPackAsset {
            pack: self.active_name.clone(),
            category,
        };

        match self.fallback() {
            Ok(pack) => pack.samples_for(category).map_err(|_| missing()),
            Err(e) if active_loaded => {
                tracing::warn!(error = %e, "Default pack unavailable for fallback");
                Err(missing())
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_pack(root: &Path, name: &str, manifest: &str) {
        let dir = root.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(MANIFEST_FILE), manifest).unwrap();
    }

    const PEON_MANIFEST: &str = r#"{
        "name": "peon",
        "categories": {
            "session.start": {"sounds": [{"file": "ready.wav", "label": "Ready to work?"}]},
            "task.complete": {"sounds": [{"file": "done.wav"}, {"file": "done2.wav"}]},
            "task.error": {"sounds": [{"file": "error.wav"}]}
        }
    }"#;

    #[test]
    fn test_load_manifest() {
        let root = tempdir().unwrap();
        write_pack(root.path(), "peon", PEON_MANIFEST);

        let pack = SoundPack::load(&root.path().join("peon")).unwrap();
        assert_eq!(pack.name, "peon");
        assert_eq!(pack.samples(SoundCategory::TaskComplete).len(), 2);
        assert!(pack.samples(SoundCategory::UserSpam).is_empty());

        let ready = &pack.samples(SoundCategory::SessionStart)[0];
        assert_eq!(ready.label.as_deref(), Some("Ready to work?"));
        assert_eq!(ready.path, root.path().join("peon").join("ready.wav"));
    }

    #[test]
    fn test_pack_catalog_reports_missing_asset() {
        let pack = SoundPack::from_samples("empty", PathBuf::from("/packs/empty"), []);
        let err = pack.samples_for(SoundCategory::InputRequired).unwrap_err();
        assert!(matches!(
            err,
            Error::MissingPackAsset { ref pack, category: SoundCategory::InputRequired } if pack == "empty"
        ));
    }

    #[test]
    fn test_library_uses_active_pack_first() {
        let root = tempdir().unwrap();
        write_pack(root.path(), "peon", PEON_MANIFEST);
        write_pack(
            root.path(),
            "glados",
            r#"{"categories": {"task.complete": {"sounds": [{"file": "cake.wav"}]}}}"#,
        );

        let library = PackLibrary::new(vec![root.path().to_path_buf()], "glados");
        let found = library.samples_for(SoundCategory::TaskComplete).unwrap();
        assert_eq!(found.pack, "glados");
        assert_eq!(found.samples[0].file, "cake.wav");

        // Category missing from glados falls back to peon
        let found = library.samples_for(SoundCategory::SessionStart).unwrap();
        assert_eq!(found.pack, "peon");
    }

    #[test]
    fn test_library_missing_everywhere() {
        let root = tempdir().unwrap();
        write_pack(root.path(), "peon", PEON_MANIFEST);

        let library = PackLibrary::new(vec![root.path().to_path_buf()], "glados");
        let err = library.samples_for(SoundCategory::UserSpam).unwrap_err();
        assert!(matches!(err, Error::MissingPackAsset { ref pack, .. } if pack == "glados"));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_library_default_pack_unavailable_is_fatal() {
        let root = tempdir().unwrap();
        let library = PackLibrary::new(vec![root.path().to_path_buf()], DEFAULT_PACK);
        let err = library.samples_for(SoundCategory::TaskComplete).unwrap_err();
        assert!(matches!(err, Error::DefaultPackUnavailable { .. }));
        assert!(!err.is_recoverable());

        write_pack(root.path(), "broken", "{");
        let library = PackLibrary::new(vec![root.path().to_path_buf()], "broken");
        let err = library.samples_for(SoundCategory::TaskComplete).unwrap_err();
        assert!(matches!(err, Error::DefaultPackUnavailable { .. }));
    }

    #[test]
    fn test_active_pack_gap_without_default_is_recoverable() {
        let root = tempdir().unwrap();
        write_pack(
            root.path(),
            "glados",
            r#"{"categories": {"task.complete": {"sounds": [{"file": "cake.wav"}]}}}"#,
        );

        let library = PackLibrary::new(vec![root.path().to_path_buf()], "glados");
        assert_eq!(
            library.samples_for(SoundCategory::TaskComplete).unwrap().pack,
            "glados"
        );

        let err = library.samples_for(SoundCategory::SessionStart).unwrap_err();
        assert!(matches!(
            err,
            Error::MissingPackAsset { ref pack, category: SoundCategory::SessionStart } if pack == "glados"
        ));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_roots_searched_in_order() {
        let plugin = tempdir().unwrap();
        let user = tempdir().unwrap();
        write_pack(user.path(), "peon", PEON_MANIFEST);
        write_pack(user.path(), "custom", "{}");
        write_pack(plugin.path(), "peon", r#"{"name": "bundled"}"#);

        let library = PackLibrary::new(
            vec![plugin.path().to_path_buf(), user.path().to_path_buf()],
            DEFAULT_PACK,
        );
        assert_eq!(library.find_pack_dir("peon"), Some(plugin.path().join("peon")));
        assert_eq!(library.find_pack_dir("custom"), Some(user.path().join("custom")));
        assert_eq!(library.find_pack_dir("glados"), None);
    }
}
