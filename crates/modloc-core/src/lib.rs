use serde::{Deserialize, Serialize};

/// Workspace-wide result alias.
pub type Result<T> = color_eyre::eyre::Result<T>;

/// Key→text mapping read from one locale file. Insertion order is preserved
/// so work files and reassembled outputs keep the order of the source file.
pub type LocaleMap = indexmap::IndexMap<String, String>;

/// One locale resource pulled out of a mod archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LangFileEntry {
    /// Internal archive path, e.g. `assets/foo/lang/en_us.json`.
    pub internal_path: String,
    /// Where the entry was extracted on disk.
    pub extracted_path: std::path::PathBuf,
    /// Locale code taken from the file stem, e.g. `en_us`.
    pub locale: String,
}
