use crate::merge::MergeOutcome;
use crate::{LocaleMap, Result, Session};
use color_eyre::eyre::eyre;
use modloc_domain::{Manifest, ManifestPath};
use std::fs;
use tracing::info;

pub const WORK_FILE_STEM: &str = "to_translate";

/// Slice a mapping into chunks of at most `per_file` entries, preserving
/// insertion order. `ceil(len / per_file)` chunks.
pub fn split_map(map: &LocaleMap, per_file: usize) -> Vec<LocaleMap> {
    assert!(per_file > 0, "batch size must be positive");
    let mut chunks = Vec::new();
    let mut current = LocaleMap::new();
    for (k, v) in map {
        current.insert(k.clone(), v.clone());
        if current.len() == per_file {
            chunks.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Deterministic work file names for a path: a single chunk keeps the bare
/// stem, multiple chunks get 1-based suffixes.
pub fn work_file_names(count: usize) -> Vec<String> {
    match count {
        0 => Vec::new(),
        1 => vec![format!("{WORK_FILE_STEM}.json")],
        n => (1..=n).map(|i| format!("{WORK_FILE_STEM}_{i}.json")).collect(),
    }
}

fn write_pretty_json(path: &std::path::Path, map: &LocaleMap) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(map)?)?;
    Ok(())
}

/// Write work files and sidecars for every merged path and persist the
/// manifest. Paths with nothing pending get sidecars only and are left out of
/// the manifest entirely. Re-running over the same merge outcome produces
/// byte-identical files.
pub fn write_batches(
    session: &Session,
    outcome: &MergeOutcome,
    per_file: usize,
) -> Result<Manifest> {
    if per_file == 0 {
        return Err(eyre!("batch size must be greater than zero"));
    }
    session.ensure_layout()?;
    let mut manifest = Manifest::default();

    for (path, bucket) in &outcome.paths {
        let path_dir = session.batch_dir().join(path);

        // Sidecars: the full merged source text and what is already resolved.
        // The reassembler reads these instead of re-running the merge.
        write_pretty_json(
            &path_dir.join(format!("{}.json", session.source_lang)),
            &bucket.source,
        )?;
        if !bucket.resolved.is_empty() {
            write_pretty_json(
                &path_dir.join(format!("{}.json", session.target_lang)),
                &bucket.resolved,
            )?;
        }

        if bucket.pending.is_empty() {
            continue;
        }
        let chunks = split_map(&bucket.pending, per_file);
        let names = work_file_names(chunks.len());
        for (name, chunk) in names.iter().zip(&chunks) {
            write_pretty_json(&path_dir.join(name), chunk)?;
        }
        info!(
            path = %path,
            keys = bucket.pending.len(),
            files = names.len(),
            "wrote work files"
        );
        manifest.paths.push(ManifestPath {
            path: path.clone(),
            mods: bucket.mods.clone(),
            split_files: names,
        });
    }

    write_manifest(session, &manifest)?;
    Ok(manifest)
}

/// The manifest is the resume boundary; write it atomically so a crash can
/// never leave a half-written index behind.
fn write_manifest(session: &Session, manifest: &Manifest) -> Result<()> {
    let path = session.manifest_path();
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, serde_json::to_string_pretty(manifest)?)?;
    fs::rename(&tmp, &path)?;
    Ok(())
}

/// Load the manifest written by a previous `write_batches` run. A missing
/// manifest is a precondition failure for both the driver and the
/// reassembler.
pub fn read_manifest(session: &Session) -> Result<Manifest> {
    let path = session.manifest_path();
    if !path.is_file() {
        return Err(eyre!(
            "manifest {} not found; run `process` first",
            path.display()
        ));
    }
    let manifest: Manifest = serde_json::from_reader(fs::File::open(&path)?)?;
    Ok(manifest)
}
