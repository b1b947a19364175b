use crate::batch::read_manifest;
use crate::{LocaleMap, Result, Session};
use modloc_domain::AssembleSummary;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

/// Merge every path's work-file results into one consolidated target-locale
/// file, copy the static extras tree and package everything as a zip.
///
/// The resolved sidecar written by the batcher seeds each path's mapping, so
/// translations that came from packs or from the archives themselves end up
/// in the output without a second merge pass. Missing result files shrink the
/// union and are reported, never fatal.
pub fn assemble(
    session: &Session,
    extras_dir: Option<&Path>,
    package_path: Option<&Path>,
) -> Result<AssembleSummary> {
    let manifest = read_manifest(session)?;
    let output_dir = session.output_dir();
    if output_dir.exists() {
        fs::remove_dir_all(&output_dir)?;
    }
    fs::create_dir_all(&output_dir)?;

    let mut summary = AssembleSummary::default();
    for entry in &manifest.paths {
        summary.total_paths += 1;
        let results_dir = session.results_dir().join(&entry.path);
        let resolved_sidecar = session
            .batch_dir()
            .join(&entry.path)
            .join(format!("{}.json", session.target_lang));

        let mut merged = read_map_if_present(&resolved_sidecar);
        let mut missing: Vec<&str> = Vec::new();
        for file_name in &entry.split_files {
            let file_path = results_dir.join(file_name);
            if !file_path.is_file() {
                missing.push(file_name);
                continue;
            }
            match serde_json::from_slice::<LocaleMap>(&fs::read(&file_path)?) {
                Ok(map) => {
                    for (k, v) in map {
                        merged.insert(k, v);
                    }
                }
                Err(e) => {
                    warn!(file = %file_path.display(), error = %e, "unreadable result file");
                    missing.push(file_name);
                }
            }
        }
        if !missing.is_empty() {
            summary.missing_files += missing.len();
            warn!(
                path = %entry.path,
                missing = missing.len(),
                "result files missing, output will be partial"
            );
            for name in missing.iter().take(5) {
                warn!(file = %name, "  missing result");
            }
            if missing.len() > 5 {
                warn!("  ... and {} more", missing.len() - 5);
            }
        }
        if merged.is_empty() {
            continue;
        }

        let out_file = output_dir
            .join(&entry.path)
            .join(format!("{}.json", session.target_lang));
        if let Some(parent) = out_file.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&out_file, serde_json::to_string_pretty(&merged)?)?;
        summary.merged_paths += 1;
        summary.merged_keys += merged.len();
        info!(path = %entry.path, keys = merged.len(), "merged translations");
    }

    if let Some(extras) = extras_dir {
        copy_extras(extras, &output_dir)?;
    }

    if summary.merged_paths > 0 {
        let package = match package_path {
            Some(p) => p.to_path_buf(),
            None => default_package_path(),
        };
        pack_output(&output_dir, &package)?;
        info!(package = %package.display(), "output packaged");
        summary.package = Some(package.display().to_string());
    }
    Ok(summary)
}

fn read_map_if_present(path: &Path) -> LocaleMap {
    if !path.is_file() {
        return LocaleMap::new();
    }
    match fs::read(path).ok().and_then(|b| serde_json::from_slice(&b).ok()) {
        Some(map) => map,
        None => {
            warn!(file = %path.display(), "unreadable resolved sidecar, ignored");
            LocaleMap::new()
        }
    }
}

/// Pass-through copy of the static asset tree (pack metadata, icons, ...)
/// into the output root.
fn copy_extras(extras: &Path, output_dir: &Path) -> Result<()> {
    if !extras.is_dir() {
        info!(dir = %extras.display(), "no extras directory, skipping copy");
        return Ok(());
    }
    let mut copied = 0usize;
    for entry in WalkDir::new(extras).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry.path().strip_prefix(extras)?;
        let dest = output_dir.join(rel);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(entry.path(), &dest)?;
        copied += 1;
    }
    info!(files = copied, "copied extras into output");
    Ok(())
}

fn default_package_path() -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    PathBuf::from(format!("modloc_{stamp}.zip"))
}

/// Zip the output tree. Entry names always use `/` so the package reads the
/// same on every platform.
pub fn pack_output(output_dir: &Path, package: &Path) -> Result<usize> {
    let file = fs::File::create(package)?;
    let mut zw = zip::ZipWriter::new(file);
    let opts: zip::write::FileOptions =
        zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let mut count = 0usize;
    for entry in WalkDir::new(output_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry.path().strip_prefix(output_dir)?;
        let name = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        zw.start_file(name, opts)?;
        zw.write_all(&fs::read(entry.path())?)?;
        count += 1;
    }
    zw.finish()?;
    Ok(count)
}
