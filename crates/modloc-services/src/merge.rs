use crate::overrides::OverrideStore;
use crate::process::ProcessedMod;
use crate::{LocaleMap, Result};
use modloc_archive::resource_path;
use modloc_domain::MergeStats;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Merge result for one resource path across all contributing archives.
///
/// Every source key ends in exactly one of `resolved` (translation already
/// known, via pack override or archive-native target file) or `pending`
/// (queued for the external translator). `resolved` may additionally carry
/// target-only keys that have no source counterpart; those are passed through
/// to the final output untouched.
#[derive(Debug, Clone, Default)]
pub struct MergedPath {
    pub mods: Vec<String>,
    pub source: LocaleMap,
    pub resolved: LocaleMap,
    pub pending: LocaleMap,
}

#[derive(Debug, Default)]
pub struct MergeOutcome {
    pub paths: BTreeMap<String, MergedPath>,
    pub stats: MergeStats,
    /// Keys satisfied by the override store, per contributing archive.
    pub overridden_by_mod: BTreeMap<String, usize>,
}

impl MergeOutcome {
    pub fn has_pending(&self) -> bool {
        self.paths.values().any(|p| !p.pending.is_empty())
    }
}

fn sibling_target_map(
    module: &ProcessedMod,
    source_internal_dir: &str,
    target_lang: &str,
) -> LocaleMap {
    for file in &module.lang_files {
        if file.locale == target_lang && resource_path(&file.internal_path) == source_internal_dir {
            let outcome = modloc_parsers_json::parse_locale_file(&file.extracted_path);
            if outcome.is_degraded() {
                warn!(
                    path = %file.extracted_path.display(),
                    "target locale file failed to parse, treating as empty"
                );
            }
            return outcome.into_map();
        }
    }
    LocaleMap::new()
}

/// Merge every extracted source-locale file into per-path buckets, applying
/// the precedence chain: pack override, then archive-native target text, then
/// queue for translation.
pub fn merge_extracted(
    mods: &[ProcessedMod],
    source_lang: &str,
    target_lang: &str,
    overrides: &OverrideStore,
) -> Result<MergeOutcome> {
    let mut outcome = MergeOutcome::default();

    for module in mods {
        for file in &module.lang_files {
            if file.locale != source_lang {
                continue;
            }
            let parsed = modloc_parsers_json::parse_locale_file(&file.extracted_path);
            if parsed.is_degraded() {
                warn!(
                    path = %file.extracted_path.display(),
                    "source locale file failed to parse, treating as empty"
                );
            }
            let source_map = parsed.into_map();
            let path_key = resource_path(&file.internal_path);
            let target_map = sibling_target_map(module, &path_key, target_lang);
            let override_map = if overrides.is_empty() {
                LocaleMap::new()
            } else {
                overrides.lookup(&path_key)
            };

            let bucket = outcome.paths.entry(path_key).or_default();
            if !bucket.mods.contains(&module.name) {
                bucket.mods.push(module.name.clone());
            }

            for (key, value) in &source_map {
                bucket.source.insert(key.clone(), value.clone());
                if let Some(tr) = override_map.get(key).filter(|v| !v.trim().is_empty()) {
                    bucket.resolved.insert(key.clone(), tr.clone());
                    *outcome
                        .overridden_by_mod
                        .entry(module.name.clone())
                        .or_default() += 1;
                    outcome.stats.overridden_keys += 1;
                } else if target_map.get(key).map_or(true, |v| v.trim().is_empty()) {
                    bucket.pending.insert(key.clone(), value.clone());
                }
            }

            // Archive-native translations are terminal too; carry them into
            // the final mapping without re-queuing, overrides staying on top.
            for (key, value) in &target_map {
                if !value.trim().is_empty() && !bucket.resolved.contains_key(key) {
                    bucket.resolved.insert(key.clone(), value.clone());
                }
            }
        }
    }

    finalize(&mut outcome);
    info!(
        paths = outcome.stats.paths,
        source_keys = outcome.stats.source_keys,
        resolved = outcome.stats.resolved_keys,
        pending = outcome.stats.pending_keys,
        overridden = outcome.stats.overridden_keys,
        "merge complete"
    );
    Ok(outcome)
}

/// Enforce partition disjointness: a key one archive left untranslated may
/// have been resolved by a later archive at the same path.
fn finalize(outcome: &mut MergeOutcome) {
    for bucket in outcome.paths.values_mut() {
        let resolved = &bucket.resolved;
        bucket.pending.retain(|k, _| !resolved.contains_key(k));
    }
    outcome.stats.paths = outcome.paths.len();
    outcome.stats.source_keys = outcome.paths.values().map(|p| p.source.len()).sum();
    outcome.stats.resolved_keys = outcome.paths.values().map(|p| p.resolved.len()).sum();
    outcome.stats.pending_keys = outcome.paths.values().map(|p| p.pending.len()).sum();
}
