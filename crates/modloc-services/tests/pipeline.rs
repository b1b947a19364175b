//! End-to-end pipeline runs over real zip fixtures with a stub collaborator.

use modloc_core::{LocaleMap, Result};
use modloc_services::batch::{read_manifest, write_batches};
use modloc_services::merge::merge_extracted;
use modloc_services::overrides::OverrideStore;
use modloc_services::process::{process_archives, ArchiveDecision};
use modloc_services::translate::{run_driver, Translator};
use modloc_services::{assemble, Session};
use std::cell::RefCell;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::tempdir;

fn write_zip(path: &Path, files: &[(&str, String)]) {
    let file = fs::File::create(path).unwrap();
    let mut zw = zip::ZipWriter::new(file);
    let opts: zip::write::FileOptions = Default::default();
    for (name, body) in files {
        zw.start_file(*name, opts).unwrap();
        zw.write_all(body.as_bytes()).unwrap();
    }
    zw.finish().unwrap();
}

fn lang_json(range: std::ops::Range<usize>) -> String {
    let map: LocaleMap = range
        .map(|i| (format!("key.{i:02}"), format!("Value {i}")))
        .collect();
    serde_json::to_string(&map).unwrap()
}

struct CountingTranslator {
    calls: RefCell<usize>,
}

impl Translator for CountingTranslator {
    fn translate(&self, _instruction: &str, payload: &LocaleMap) -> Result<LocaleMap> {
        *self.calls.borrow_mut() += 1;
        Ok(payload
            .iter()
            .map(|(k, v)| (k.clone(), format!("译:{v}")))
            .collect())
    }
}

/// Archive with 10 source keys and no target locale: all ten get queued, a
/// batch size of 4 yields three work files (4, 4, 2) and the reassembled
/// output has all ten keys.
#[test]
fn untranslated_archive_flows_through_whole_pipeline() -> Result<()> {
    let dir = tempdir()?;
    let jar = dir.path().join("alpha.jar");
    write_zip(&jar, &[("assets/alpha/lang/en_us.json", lang_json(0..10))]);

    let session = Session::new(&dir.path().join("work"), "en_us", "zh_cn");
    let report = process_archives(&session, &[jar])?;
    assert_eq!(report.stats.processed, 1);
    assert_eq!(report.stats.no_target, 1);
    assert!(matches!(report.decisions[0].1, ArchiveDecision::NoTarget));

    let outcome = merge_extracted(&report.mods, "en_us", "zh_cn", &OverrideStore::default())?;
    assert_eq!(outcome.stats.pending_keys, 10);

    let manifest = write_batches(&session, &outcome, 4)?;
    assert_eq!(manifest.paths.len(), 1);
    assert_eq!(manifest.paths[0].split_files.len(), 3);
    assert_eq!(manifest.paths[0].mods, vec!["alpha.jar"]);

    let translator = CountingTranslator { calls: RefCell::new(0) };
    let summary = run_driver(&session, &translator, Duration::ZERO)?;
    assert_eq!(summary.done_files, 3);
    assert_eq!(*translator.calls.borrow(), 3);

    let package = dir.path().join("pack.zip");
    let assembled = assemble::assemble(&session, None, Some(&package))?;
    assert_eq!(assembled.merged_paths, 1);
    assert_eq!(assembled.merged_keys, 10);
    assert!(package.is_file());

    let out: LocaleMap = serde_json::from_slice(&fs::read(
        session.output_dir().join("assets/alpha/lang/zh_cn.json"),
    )?)?;
    assert_eq!(out.len(), 10);
    assert_eq!(out.get("key.03").map(String::as_str), Some("译:Value 3"));
    Ok(())
}

/// Archive whose target locale covers 19 of 20 source keys (95%) is skipped
/// before extraction; no work files appear.
#[test]
fn complete_archive_is_skipped_upstream() -> Result<()> {
    let dir = tempdir()?;
    let jar = dir.path().join("beta.jar");
    write_zip(
        &jar,
        &[
            ("assets/beta/lang/en_us.json", lang_json(0..20)),
            ("assets/beta/lang/zh_cn.json", lang_json(0..19)),
        ],
    );

    let session = Session::new(&dir.path().join("work"), "en_us", "zh_cn");
    let report = process_archives(&session, &[jar])?;
    assert_eq!(report.stats.already_complete, 1);
    assert_eq!(report.stats.processed, 0);
    assert!(report.mods.is_empty());
    assert!(matches!(
        report.decisions[0].1,
        ArchiveDecision::AlreadyComplete { .. }
    ));
    assert!(!session.manifest_path().exists());
    Ok(())
}

/// An override pack supplying 5 of 10 keys halves the queued work, and the
/// override counter reports the filtered amount.
#[test]
fn override_pack_filters_pending_keys() -> Result<()> {
    let dir = tempdir()?;
    let jar = dir.path().join("gamma.jar");
    write_zip(&jar, &[("assets/gamma/lang/en_us.json", lang_json(0..10))]);

    let pack_map: LocaleMap = (0..5)
        .map(|i| (format!("key.{i:02}"), format!("包:{i}")))
        .collect();
    let pack = dir.path().join("pack.zip");
    write_zip(
        &pack,
        &[(
            "assets/gamma/lang/zh_cn.json",
            serde_json::to_string(&pack_map).unwrap(),
        )],
    );

    let session = Session::new(&dir.path().join("work"), "en_us", "zh_cn");
    session.ensure_layout()?;
    let overrides = OverrideStore::load_packs(&session, &[pack])?;
    assert_eq!(overrides.entry_count(), 5);

    let report = process_archives(&session, &[jar])?;
    let outcome = merge_extracted(&report.mods, "en_us", "zh_cn", &overrides)?;
    assert_eq!(outcome.stats.pending_keys, 5);
    assert_eq!(outcome.stats.overridden_keys, 5);
    assert_eq!(outcome.overridden_by_mod.get("gamma.jar"), Some(&5));

    // Overridden keys reach the final output through the resolved sidecar.
    write_batches(&session, &outcome, 40)?;
    let translator = CountingTranslator { calls: RefCell::new(0) };
    run_driver(&session, &translator, Duration::ZERO)?;
    let assembled = assemble::assemble(&session, None, Some(&dir.path().join("out.zip")))?;
    assert_eq!(assembled.merged_keys, 10);
    Ok(())
}

/// Two archives sharing a resource path contribute to one merged entry, and
/// both names land in the manifest.
#[test]
fn shared_resource_path_merges_across_archives() -> Result<()> {
    let dir = tempdir()?;
    let a = dir.path().join("one.jar");
    let b = dir.path().join("two.jar");
    write_zip(&a, &[("assets/shared/lang/en_us.json", lang_json(0..3))]);
    write_zip(&b, &[("assets/shared/lang/en_us.json", lang_json(3..6))]);

    let session = Session::new(&dir.path().join("work"), "en_us", "zh_cn");
    let report = process_archives(&session, &[a, b])?;
    let outcome = merge_extracted(&report.mods, "en_us", "zh_cn", &OverrideStore::default())?;
    let manifest = write_batches(&session, &outcome, 40)?;

    assert_eq!(manifest.paths.len(), 1);
    assert_eq!(manifest.paths[0].mods, vec!["one.jar", "two.jar"]);
    let bucket = &outcome.paths["assets/shared/lang"];
    assert_eq!(bucket.source.len(), 6);
    Ok(())
}

/// Unreadable and lang-less archives are counted separately and neither
/// aborts processing of the archives after them.
#[test]
fn bad_archives_are_counted_and_skipped() -> Result<()> {
    let dir = tempdir()?;
    let broken = dir.path().join("broken.jar");
    fs::write(&broken, b"not a zip at all")?;
    let empty = dir.path().join("empty.jar");
    write_zip(&empty, &[("META-INF/MANIFEST.MF", "Manifest-Version: 1.0".into())]);
    let good = dir.path().join("good.jar");
    write_zip(&good, &[("assets/good/lang/en_us.json", lang_json(0..2))]);

    let session = Session::new(&dir.path().join("work"), "en_us", "zh_cn");
    let archives: Vec<PathBuf> = vec![broken, empty, good];
    let report = process_archives(&session, &archives)?;
    assert_eq!(report.stats.unreadable, 1);
    assert_eq!(report.stats.no_lang_files, 1);
    assert_eq!(report.stats.processed, 1);
    Ok(())
}

/// Processing a different mod set in the same work dir must not inherit the
/// previous run's work files: the driver would treat stale results as done
/// and never translate the new keys.
#[test]
fn reprocessing_clears_previous_run_state() -> Result<()> {
    let dir = tempdir()?;
    let a = dir.path().join("a.jar");
    write_zip(&a, &[("assets/shared/lang/en_us.json", lang_json(0..3))]);
    let b = dir.path().join("b.jar");
    write_zip(&b, &[("assets/shared/lang/en_us.json", lang_json(10..13))]);

    let session = Session::new(&dir.path().join("work"), "en_us", "zh_cn");
    let translator = CountingTranslator { calls: RefCell::new(0) };

    let report = process_archives(&session, &[a])?;
    let outcome = merge_extracted(&report.mods, "en_us", "zh_cn", &OverrideStore::default())?;
    write_batches(&session, &outcome, 40)?;
    run_driver(&session, &translator, Duration::ZERO)?;
    assert_eq!(*translator.calls.borrow(), 1);

    let report = process_archives(&session, &[b])?;
    let outcome = merge_extracted(&report.mods, "en_us", "zh_cn", &OverrideStore::default())?;
    write_batches(&session, &outcome, 40)?;
    let summary = run_driver(&session, &translator, Duration::ZERO)?;
    assert_eq!(summary.skipped_files, 0);
    assert_eq!(*translator.calls.borrow(), 2);

    let out: LocaleMap = serde_json::from_slice(&fs::read(
        session.results_dir().join("assets/shared/lang/to_translate.json"),
    )?)?;
    assert!(out.contains_key("key.10"));
    assert!(!out.contains_key("key.00"));
    Ok(())
}

/// Manifest written by one stage is the exact index the driver resumes from.
#[test]
fn manifest_is_the_resume_boundary() -> Result<()> {
    let dir = tempdir()?;
    let jar = dir.path().join("delta.jar");
    write_zip(&jar, &[("assets/delta/lang/en_us.json", lang_json(0..9))]);

    let session = Session::new(&dir.path().join("work"), "en_us", "zh_cn");
    let report = process_archives(&session, &[jar])?;
    let outcome = merge_extracted(&report.mods, "en_us", "zh_cn", &OverrideStore::default())?;
    write_batches(&session, &outcome, 4)?;

    let manifest = read_manifest(&session)?;
    assert_eq!(manifest.paths[0].split_files.len(), 3);

    // Pre-seed one result by hand; the driver must not re-request it.
    let done = session
        .results_dir()
        .join("assets/delta/lang/to_translate_1.json");
    fs::create_dir_all(done.parent().unwrap())?;
    fs::write(&done, "{\"key.00\": \"done\"}")?;

    let translator = CountingTranslator { calls: RefCell::new(0) };
    let summary = run_driver(&session, &translator, Duration::ZERO)?;
    assert_eq!(summary.skipped_files, 1);
    assert_eq!(*translator.calls.borrow(), 2);
    Ok(())
}
