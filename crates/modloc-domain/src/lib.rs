use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// What a cheap entry-name scan of one archive revealed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct InspectReport {
    pub has_lang_files: bool,
    pub has_source_locale: bool,
    pub has_target_locale: bool,
    pub locales: Vec<String>,
}

/// Coverage of the target locale over the source locale inside one archive.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CompletenessReport {
    pub source_keys: usize,
    pub target_keys: usize,
    pub coverage_pct: f64,
    pub is_complete: bool,
}

/// One manifest row: a resource path with its work files and contributors.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ManifestPath {
    pub path: String,
    pub mods: Vec<String>,
    pub split_files: Vec<String>,
}

/// Durable index written once by the batcher and read by both the translation
/// driver and the reassembler. The schema is the resume-compatibility boundary.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Manifest {
    pub paths: Vec<ManifestPath>,
}

/// Per-archive decision counters from the processing stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ProcessStats {
    pub processed: usize,
    pub unreadable: usize,
    pub no_lang_files: usize,
    pub no_source_locale: usize,
    pub already_complete: usize,
    pub partial_target: usize,
    pub no_target: usize,
}

/// Totals from the merge stage, including how much the override packs covered.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct MergeStats {
    pub paths: usize,
    pub source_keys: usize,
    pub resolved_keys: usize,
    pub pending_keys: usize,
    pub overridden_keys: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct TranslateSummary {
    pub total_files: usize,
    pub done_files: usize,
    pub failed_files: usize,
    pub skipped_files: usize,
    pub total_keys: usize,
    pub translated_keys: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct AssembleSummary {
    pub total_paths: usize,
    pub merged_paths: usize,
    pub merged_keys: usize,
    pub missing_files: usize,
    pub package: Option<String>,
}
