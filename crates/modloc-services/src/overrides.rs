use crate::{LocaleMap, Result, Session};
use modloc_archive::{asset_namespace, is_lang_entry, locale_code, resource_path, ArchiveSource, ZipSource};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

/// How a stored pack path relates to a looked-up resource path. Tiers are
/// ordered weakest-first so `Ord` picks the strongest match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchTier {
    /// Both paths mention the same `assets/<namespace>/` segment.
    Namespace,
    /// One path is a suffix of the other.
    Containment,
    Exact,
}

/// Classify one stored path against one resource path. Pack-internal paths
/// rarely line up exactly with mod-internal paths, hence the weaker tiers.
pub fn match_tier(resource: &str, stored: &str) -> Option<MatchTier> {
    if resource == stored {
        return Some(MatchTier::Exact);
    }
    if resource.ends_with(stored) || stored.ends_with(resource) {
        return Some(MatchTier::Containment);
    }
    if let Some(ns) = asset_namespace(resource) {
        if stored.contains(&format!("/assets/{ns}/")) || stored.starts_with(&format!("assets/{ns}/"))
        {
            return Some(MatchTier::Namespace);
        }
    }
    None
}

/// Read-only index of translations supplied by external packs, keyed by
/// normalized resource path. Built once per run, before any archive merge.
#[derive(Debug, Default)]
pub struct OverrideStore {
    by_path: BTreeMap<String, LocaleMap>,
    loaded_packs: usize,
}

impl OverrideStore {
    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }

    pub fn loaded_packs(&self) -> usize {
        self.loaded_packs
    }

    pub fn path_count(&self) -> usize {
        self.by_path.len()
    }

    pub fn entry_count(&self) -> usize {
        self.by_path.values().map(|m| m.len()).sum()
    }

    /// Used by tests and by pack extraction; later insertions win per key.
    pub fn insert(&mut self, path: &str, translations: LocaleMap) {
        let entry = self.by_path.entry(path.to_string()).or_default();
        for (k, v) in translations {
            if !v.trim().is_empty() {
                entry.insert(k, v);
            }
        }
    }

    /// Build the store from zero or more pack archives. Target-locale entries
    /// are extracted under the session's packs dir for inspection; everything
    /// else in a pack is ignored. An unreadable pack is skipped with a
    /// warning.
    pub fn load_packs(session: &Session, packs: &[PathBuf]) -> Result<Self> {
        let mut store = Self::default();
        if packs.is_empty() {
            return Ok(store);
        }
        session.ensure_layout()?;

        for pack_path in packs {
            let pack_name = pack_path
                .file_name()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| pack_path.display().to_string());
            let mut zip = match ZipSource::open(pack_path) {
                Ok(z) => z,
                Err(e) => {
                    warn!(pack = %pack_name, error = %e, "cannot open pack, skipped");
                    continue;
                }
            };
            let entries = match zip.list_entries() {
                Ok(e) => e,
                Err(e) => {
                    warn!(pack = %pack_name, error = %e, "cannot scan pack, skipped");
                    continue;
                }
            };
            let mut extracted_entries = 0usize;
            for name in entries {
                if !is_lang_entry(&name) || locale_code(&name) != Some(session.target_lang.as_str())
                {
                    continue;
                }
                if name.split('/').any(|seg| seg == "..") {
                    warn!(pack = %pack_name, entry = %name, "entry escapes the staging tree, skipped");
                    continue;
                }
                let bytes = match zip.read_entry(&name) {
                    Ok(b) => b,
                    Err(e) => {
                        warn!(pack = %pack_name, entry = %name, error = %e, "cannot read entry");
                        continue;
                    }
                };
                let out_path = session.packs_dir().join(&name);
                if let Some(parent) = out_path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&out_path, &bytes)?;

                let outcome = modloc_parsers_json::parse_locale_bytes(&bytes);
                if outcome.is_degraded() {
                    warn!(pack = %pack_name, entry = %name, "translation entry failed to parse");
                    continue;
                }
                let map = outcome.into_map();
                if map.is_empty() {
                    continue;
                }
                extracted_entries += map.len();
                store.insert(&resource_path(&name), map);
            }
            info!(pack = %pack_name, entries = extracted_entries, "loaded override pack");
            store.loaded_packs += 1;
        }

        info!(
            packs = store.loaded_packs,
            paths = store.path_count(),
            entries = store.entry_count(),
            "override store ready"
        );
        Ok(store)
    }

    /// Stored paths matching `resource`, weakest tier first, lexicographic
    /// within a tier. Exposed separately so the matching contract is testable
    /// on its own.
    pub fn matching_paths(&self, resource: &str) -> Vec<(&str, MatchTier)> {
        let mut matches: Vec<(&str, MatchTier)> = self
            .by_path
            .keys()
            .filter_map(|stored| match_tier(resource, stored).map(|t| (stored.as_str(), t)))
            .collect();
        // BTreeMap iteration already gives lexicographic order within a tier;
        // a stable sort by tier keeps that as the documented tie-break.
        matches.sort_by_key(|&(_, tier)| tier);
        matches
    }

    /// All translations applicable to `resource`. Matches merge weakest tier
    /// first so an exact-path translation always wins a namespace-level one;
    /// within a tier the lexicographically later pack path wins.
    pub fn lookup(&self, resource: &str) -> LocaleMap {
        let mut merged = LocaleMap::new();
        for (stored, _) in self.matching_paths(resource) {
            if let Some(map) = self.by_path.get(stored) {
                for (k, v) in map {
                    merged.insert(k.clone(), v.clone());
                }
            }
        }
        merged
    }
}
