//! Container access for mod archives and translation packs.
//!
//! Locale files follow the `.../lang/<locale>.json` convention; everything
//! else in an archive is ignored. The pipeline only ever talks to the
//! [`ArchiveSource`] trait so the zip coupling stays in this crate.

use modloc_core::{LangFileEntry, LocaleMap, Result};
use modloc_domain::{CompletenessReport, InspectReport};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Target coverage at or above this share of source keys counts as complete.
pub const COMPLETE_COVERAGE_PCT: f64 = 95.0;

const LANG_DIR_MARKER: &str = "/lang/";
const LANG_EXT: &str = ".json";

/// Minimal capability surface over a flat (internal-path, bytes) container.
pub trait ArchiveSource {
    fn list_entries(&mut self) -> Result<Vec<String>>;
    fn read_entry(&mut self, name: &str) -> Result<Vec<u8>>;
}

/// Zip/jar implementation used for mods, translation packs and the output.
pub struct ZipSource {
    archive: zip::ZipArchive<fs::File>,
}

impl ZipSource {
    pub fn open(path: &Path) -> Result<Self> {
        let file = fs::File::open(path)?;
        let archive = zip::ZipArchive::new(file)?;
        Ok(Self { archive })
    }
}

impl ArchiveSource for ZipSource {
    fn list_entries(&mut self) -> Result<Vec<String>> {
        let mut names = Vec::with_capacity(self.archive.len());
        for i in 0..self.archive.len() {
            let entry = self.archive.by_index(i)?;
            if entry.is_file() {
                names.push(entry.name().to_string());
            }
        }
        Ok(names)
    }

    fn read_entry(&mut self, name: &str) -> Result<Vec<u8>> {
        let mut entry = self.archive.by_name(name)?;
        let mut buf = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

/// Entry is a locale file: lives under a `lang/` directory and is JSON.
pub fn is_lang_entry(name: &str) -> bool {
    name.contains(LANG_DIR_MARKER) && name.ends_with(LANG_EXT)
}

/// Locale code of a lang entry, i.e. the file stem (`en_us` from
/// `assets/foo/lang/en_us.json`).
pub fn locale_code(name: &str) -> Option<&str> {
    let base = name.rsplit('/').next()?;
    base.split('.').next().filter(|s| !s.is_empty())
}

/// Directory of a lang entry with separators normalized and no trailing
/// slash; the merge identity across archives.
pub fn resource_path(internal_path: &str) -> String {
    let normalized = internal_path.replace('\\', "/");
    match normalized.rfind('/') {
        Some(idx) => normalized[..idx].trim_end_matches('/').to_string(),
        None => String::new(),
    }
}

/// The `<ns>` of the first `assets/<ns>/` segment, when present.
pub fn asset_namespace(path: &str) -> Option<&str> {
    let rest = path.split("/assets/").nth(1)?;
    rest.split('/').next().filter(|s| !s.is_empty())
}

#[derive(Debug)]
pub enum InspectOutcome {
    /// Corrupt or unopenable archive. Distinct from an archive that simply
    /// has no locale files.
    Unreadable,
    Report(InspectReport),
}

/// Scan entry names only; nothing is extracted or parsed here.
pub fn inspect_source(
    source: &mut dyn ArchiveSource,
    source_lang: &str,
    target_lang: &str,
) -> Result<InspectReport> {
    let mut report = InspectReport::default();
    for name in source.list_entries()? {
        if !is_lang_entry(&name) {
            continue;
        }
        report.has_lang_files = true;
        if let Some(code) = locale_code(&name) {
            if code == source_lang {
                report.has_source_locale = true;
            } else if code == target_lang {
                report.has_target_locale = true;
            }
            if !report.locales.iter().any(|l| l == code) {
                report.locales.push(code.to_string());
            }
        }
    }
    Ok(report)
}

/// Inspect an archive on disk, mapping any read failure to `Unreadable`.
pub fn inspect_archive(path: &Path, source_lang: &str, target_lang: &str) -> InspectOutcome {
    let mut zip = match ZipSource::open(path) {
        Ok(z) => z,
        Err(e) => {
            warn!(archive = %path.display(), error = %e, "cannot open archive");
            return InspectOutcome::Unreadable;
        }
    };
    match inspect_source(&mut zip, source_lang, target_lang) {
        Ok(report) => InspectOutcome::Report(report),
        Err(e) => {
            warn!(archive = %path.display(), error = %e, "cannot scan archive");
            InspectOutcome::Unreadable
        }
    }
}

/// Coverage of `target` keys over `source` keys, in percent. Zero when the
/// source mapping is empty.
pub fn coverage_report(source: &LocaleMap, target: &LocaleMap) -> CompletenessReport {
    let mut report = CompletenessReport {
        source_keys: source.len(),
        target_keys: target.len(),
        ..Default::default()
    };
    if !source.is_empty() {
        let common = source.keys().filter(|k| target.contains_key(*k)).count();
        report.coverage_pct = common as f64 / source.len() as f64 * 100.0;
        report.is_complete = report.coverage_pct >= COMPLETE_COVERAGE_PCT;
    }
    report
}

/// Parse both locale files of one archive and compute coverage. Files that
/// fail to parse degrade to empty mappings, which reads as zero coverage.
pub fn analyze_completeness(
    path: &Path,
    source_lang: &str,
    target_lang: &str,
) -> Result<CompletenessReport> {
    let mut zip = ZipSource::open(path)?;
    let entries = zip.list_entries()?;

    let mut source_entry: Option<&str> = None;
    let mut target_entry: Option<&str> = None;
    for name in &entries {
        if !is_lang_entry(name) {
            continue;
        }
        match locale_code(name) {
            Some(code) if code == source_lang => source_entry = Some(name),
            Some(code) if code == target_lang => target_entry = Some(name),
            _ => {}
        }
    }
    let (Some(src), Some(trg)) = (source_entry, target_entry) else {
        return Ok(CompletenessReport::default());
    };

    let source_map = parse_entry(&mut zip, src);
    let target_map = parse_entry(&mut zip, trg);
    Ok(coverage_report(&source_map, &target_map))
}

fn parse_entry(zip: &mut ZipSource, name: &str) -> LocaleMap {
    match zip.read_entry(name) {
        Ok(bytes) => {
            let outcome = modloc_parsers_json::parse_locale_bytes(&bytes);
            if outcome.is_degraded() {
                warn!(entry = name, "locale entry failed to parse, treating as empty");
            }
            outcome.into_map()
        }
        Err(e) => {
            warn!(entry = name, error = %e, "cannot read locale entry");
            LocaleMap::new()
        }
    }
}

/// Extract source-locale files (and target-locale files when asked) under
/// `dest`, recreating the archive's internal directory structure. A corrupt
/// entry is skipped with a warning and does not abort the rest.
pub fn extract_lang_files(
    path: &Path,
    dest: &Path,
    source_lang: &str,
    target_lang: &str,
    include_target: bool,
) -> Result<Vec<LangFileEntry>> {
    let mut zip = ZipSource::open(path)?;
    let entries = zip.list_entries()?;
    let mut extracted = Vec::new();

    for name in entries {
        if !is_lang_entry(&name) {
            continue;
        }
        let Some(code) = locale_code(&name) else {
            continue;
        };
        let wanted = code == source_lang || (include_target && code == target_lang);
        if !wanted {
            continue;
        }
        if name.split('/').any(|seg| seg == "..") {
            warn!(entry = name, "entry escapes the destination, skipped");
            continue;
        }
        let code = code.to_string();
        match zip.read_entry(&name) {
            Ok(bytes) => {
                let out_path: PathBuf = dest.join(&name);
                if let Some(parent) = out_path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&out_path, bytes)?;
                extracted.push(LangFileEntry {
                    internal_path: name,
                    extracted_path: out_path,
                    locale: code,
                });
            }
            Err(e) => {
                warn!(entry = name, error = %e, "cannot extract locale entry, skipped");
            }
        }
    }
    Ok(extracted)
}
