use crate::{LangFileEntry, Result, Session};
use modloc_archive::{analyze_completeness, extract_lang_files, inspect_archive, InspectOutcome};
use modloc_domain::ProcessStats;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

static BRACKET_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[.*?\]\s*").unwrap());
static UNSAFE_CHAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\-.]").unwrap());

/// Why an archive was or was not taken into the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum ArchiveDecision {
    Unreadable,
    NoLangFiles,
    NoSourceLocale,
    /// Target locale already covers enough of the source; skipped upstream of
    /// extraction.
    AlreadyComplete { coverage_pct: f64 },
    /// Target locale exists but is incomplete; its files are extracted too.
    PartialTarget { coverage_pct: f64 },
    /// No target locale at all; only source files are extracted.
    NoTarget,
}

/// One archive that made it through extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedMod {
    /// Display name (the archive file name); used in the manifest `mods` list.
    pub name: String,
    /// Staging directory holding the extracted files.
    pub staging_dir: PathBuf,
    pub original_path: PathBuf,
    pub lang_files: Vec<LangFileEntry>,
    /// True when the archive carried a partial target locale.
    pub has_partial_target: bool,
}

#[derive(Debug, Default)]
pub struct ProcessReport {
    pub stats: ProcessStats,
    pub decisions: Vec<(String, ArchiveDecision)>,
    pub mods: Vec<ProcessedMod>,
}

/// Shorten an archive name into a filesystem-friendly staging folder name:
/// bracketed prefixes dropped, odd characters replaced, capped at 50 bytes.
pub fn sanitize_folder_name(name: &str) -> String {
    let name = BRACKET_RE.replace_all(name, "");
    let mut name = UNSAFE_CHAR_RE.replace_all(&name, "_").into_owned();
    if name.len() > 50 {
        match name.rfind('.').filter(|&i| i > 0 && name.len() - i <= 5) {
            Some(dot) => {
                let ext = name[dot..].to_string();
                truncate_at_char_boundary(&mut name, 45);
                name.push_str(&ext);
            }
            None => truncate_at_char_boundary(&mut name, 50),
        }
    }
    name
}

/// The unsafe-char regex keeps Unicode word characters, so the cap may land
/// mid-codepoint; back off to the previous boundary.
fn truncate_at_char_boundary(name: &mut String, max: usize) {
    if name.len() <= max {
        return;
    }
    let mut end = max;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    name.truncate(end);
}

fn decide(session: &Session, archive: &Path) -> ArchiveDecision {
    let report = match inspect_archive(archive, &session.source_lang, &session.target_lang) {
        InspectOutcome::Unreadable => return ArchiveDecision::Unreadable,
        InspectOutcome::Report(r) => r,
    };
    if !report.has_lang_files {
        return ArchiveDecision::NoLangFiles;
    }
    if !report.has_source_locale {
        return ArchiveDecision::NoSourceLocale;
    }
    if !report.has_target_locale {
        return ArchiveDecision::NoTarget;
    }
    match analyze_completeness(archive, &session.source_lang, &session.target_lang) {
        Ok(c) if c.is_complete => ArchiveDecision::AlreadyComplete {
            coverage_pct: c.coverage_pct,
        },
        Ok(c) => ArchiveDecision::PartialTarget {
            coverage_pct: c.coverage_pct,
        },
        Err(e) => {
            warn!(archive = %archive.display(), error = %e, "completeness check failed");
            ArchiveDecision::Unreadable
        }
    }
}

/// Inspect, analyze and extract each selected archive. Every skip is counted
/// and reported; nothing here aborts the run.
pub fn process_archives(session: &Session, archives: &[PathBuf]) -> Result<ProcessReport> {
    if archives.is_empty() {
        color_eyre::eyre::bail!("no mod archives selected");
    }
    // Stale work files would satisfy the driver's resume rule for a
    // different workload; start from a clean slate, keeping only the
    // translations extracted from override packs.
    session.clean(true)?;

    let mut report = ProcessReport::default();
    for archive in archives {
        let name = archive
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| archive.display().to_string());
        let decision = decide(session, archive);
        report.decisions.push((name.clone(), decision.clone()));

        let include_target = match decision {
            ArchiveDecision::Unreadable => {
                info!(mod_name = %name, "skipped: unreadable archive");
                report.stats.unreadable += 1;
                continue;
            }
            ArchiveDecision::NoLangFiles => {
                info!(mod_name = %name, "skipped: no locale files");
                report.stats.no_lang_files += 1;
                continue;
            }
            ArchiveDecision::NoSourceLocale => {
                info!(mod_name = %name, "skipped: no source locale file");
                report.stats.no_source_locale += 1;
                continue;
            }
            ArchiveDecision::AlreadyComplete { coverage_pct } => {
                info!(mod_name = %name, coverage_pct, "skipped: target locale already complete");
                report.stats.already_complete += 1;
                continue;
            }
            ArchiveDecision::PartialTarget { coverage_pct } => {
                info!(mod_name = %name, coverage_pct, "processing: target locale incomplete");
                report.stats.partial_target += 1;
                true
            }
            ArchiveDecision::NoTarget => {
                info!(mod_name = %name, "processing: no target locale");
                report.stats.no_target += 1;
                false
            }
        };

        let stem = name.split('.').next().unwrap_or(&name);
        let staging_dir = session.mods_dir().join(sanitize_folder_name(stem));
        let lang_files = extract_lang_files(
            archive,
            &staging_dir,
            &session.source_lang,
            &session.target_lang,
            include_target,
        )?;
        if lang_files.is_empty() {
            warn!(mod_name = %name, "no locale files survived extraction, skipped");
            if staging_dir.exists() {
                fs::remove_dir_all(&staging_dir)?;
            }
            continue;
        }
        info!(mod_name = %name, files = lang_files.len(), "extracted locale files");
        report.stats.processed += 1;
        report.mods.push(ProcessedMod {
            name,
            staging_dir,
            original_path: archive.clone(),
            lang_files,
            has_partial_target: include_target,
        });
    }

    if !report.mods.is_empty() {
        let json = serde_json::to_string_pretty(&report.mods)?;
        fs::write(session.mods_record_path(), json)?;
    }
    Ok(report)
}
