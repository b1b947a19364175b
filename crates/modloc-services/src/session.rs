use crate::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// Explicit run context: staging layout plus the locale pair. Every pipeline
/// stage takes one of these instead of reaching for ambient state, so a test
/// harness can run several sessions side by side.
#[derive(Debug, Clone)]
pub struct Session {
    root: PathBuf,
    pub source_lang: String,
    pub target_lang: String,
}

impl Session {
    pub fn new(root: &Path, source_lang: &str, target_lang: &str) -> Self {
        Self {
            root: root.to_path_buf(),
            source_lang: source_lang.to_string(),
            target_lang: target_lang.to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Extracted locale files, one subdirectory per archive.
    pub fn mods_dir(&self) -> PathBuf {
        self.root.join("mods")
    }

    /// Target-locale files pulled out of override packs.
    pub fn packs_dir(&self) -> PathBuf {
        self.root.join("packs")
    }

    /// Work files and sidecars produced by the batcher.
    pub fn batch_dir(&self) -> PathBuf {
        self.root.join("pending")
    }

    /// Per-work-file results written by the translation driver.
    pub fn results_dir(&self) -> PathBuf {
        self.root.join("translated")
    }

    /// Consolidated per-path output tree.
    pub fn output_dir(&self) -> PathBuf {
        self.root.join("output")
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.batch_dir().join("index.json")
    }

    /// Record of the archives that survived processing.
    pub fn mods_record_path(&self) -> PathBuf {
        self.mods_dir().join("mods.json")
    }

    pub fn ensure_layout(&self) -> Result<()> {
        for dir in [
            self.mods_dir(),
            self.packs_dir(),
            self.batch_dir(),
            self.results_dir(),
            self.output_dir(),
        ] {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// Drop all staging state. `keep_packs` preserves the extracted override
    /// packs so they can filter the next run without re-loading.
    pub fn clean(&self, keep_packs: bool) -> Result<()> {
        if self.root.exists() {
            if keep_packs {
                for entry in fs::read_dir(&self.root)? {
                    let entry = entry?;
                    if entry.file_name() == "packs" {
                        continue;
                    }
                    let path = entry.path();
                    if path.is_dir() {
                        fs::remove_dir_all(&path)?;
                    } else {
                        fs::remove_file(&path)?;
                    }
                }
            } else {
                fs::remove_dir_all(&self.root)?;
            }
        }
        self.ensure_layout()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn clean_can_keep_packs() -> Result<()> {
        let dir = tempdir()?;
        let session = Session::new(dir.path(), "en_us", "zh_cn");
        session.ensure_layout()?;

        fs::write(session.packs_dir().join("kept.json"), "{}")?;
        fs::write(session.batch_dir().join("stale.json"), "{}")?;

        session.clean(true)?;
        assert!(session.packs_dir().join("kept.json").is_file());
        assert!(!session.batch_dir().join("stale.json").exists());

        session.clean(false)?;
        assert!(!session.packs_dir().join("kept.json").exists());
        assert!(session.batch_dir().is_dir());
        Ok(())
    }
}
