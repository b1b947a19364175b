use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::io::Write;
use std::path::Path;

fn write_zip(path: &Path, files: &[(&str, &str)]) {
    let file = fs::File::create(path).unwrap();
    let mut zw = zip::ZipWriter::new(file);
    let opts: zip::write::FileOptions = Default::default();
    for (name, body) in files {
        zw.start_file(*name, opts).unwrap();
        zw.write_all(body.as_bytes()).unwrap();
    }
    zw.finish().unwrap();
}

fn modloc(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("modloc").unwrap();
    cmd.current_dir(dir).arg("--no-color");
    cmd
}

#[test]
fn process_extracts_and_writes_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let jar = dir.path().join("mymod.jar");
    write_zip(
        &jar,
        &[(
            "assets/mymod/lang/en_us.json",
            r#"{"item.a": "A", "item.b": "B", "item.c": "C"}"#,
        )],
    );

    modloc(dir.path())
        .args(["process", "--mod"])
        .arg(&jar)
        .args(["--batch-size", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no translation yet"))
        .stdout(predicate::str::contains("Queued 3 key(s)"));

    let manifest_path = dir.path().join("work/pending/index.json");
    assert!(manifest_path.is_file());
    let manifest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&manifest_path).unwrap()).unwrap();
    let paths = manifest["paths"].as_array().unwrap();
    assert_eq!(paths.len(), 1);
    assert_eq!(paths[0]["path"], "assets/mymod/lang");
    assert_eq!(
        paths[0]["split_files"],
        serde_json::json!(["to_translate_1.json", "to_translate_2.json"])
    );
}

#[test]
fn process_skips_complete_archives() {
    let dir = tempfile::tempdir().unwrap();
    let jar = dir.path().join("done.jar");
    write_zip(
        &jar,
        &[
            ("assets/done/lang/en_us.json", r#"{"a": "A", "b": "B"}"#),
            ("assets/done/lang/zh_cn.json", r#"{"a": "甲", "b": "乙"}"#),
        ],
    );

    modloc(dir.path())
        .args(["process", "--mod"])
        .arg(&jar)
        .assert()
        .success()
        .stdout(predicate::str::contains("already translated (100.0%)"))
        .stdout(predicate::str::contains("Nothing to do."));
}

#[test]
fn process_requires_at_least_one_mod() {
    let dir = tempfile::tempdir().unwrap();
    modloc(dir.path())
        .arg("process")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--mod"));
}

#[test]
fn inspect_reports_locales_and_coverage() {
    let dir = tempfile::tempdir().unwrap();
    let jar = dir.path().join("mixed.jar");
    write_zip(
        &jar,
        &[
            ("assets/m/lang/en_us.json", r#"{"a": "A", "b": "B"}"#),
            ("assets/m/lang/zh_cn.json", r#"{"a": "甲"}"#),
        ],
    );

    modloc(dir.path())
        .args(["inspect", "--mod"])
        .arg(&jar)
        .assert()
        .success()
        .stdout(predicate::str::contains("locales: en_us, zh_cn"))
        .stdout(predicate::str::contains("coverage: 50.0%"));
}

#[test]
fn translate_without_config_is_a_clear_failure() {
    let dir = tempfile::tempdir().unwrap();
    modloc(dir.path())
        .arg("translate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing required setting"));
}

#[test]
fn assemble_without_manifest_is_a_clear_failure() {
    let dir = tempfile::tempdir().unwrap();
    modloc(dir.path())
        .arg("assemble")
        .assert()
        .failure()
        .stderr(predicate::str::contains("run `process` first"));
}

#[test]
fn clean_keep_packs_preserves_pack_dir() {
    let dir = tempfile::tempdir().unwrap();
    let packs = dir.path().join("work/packs");
    fs::create_dir_all(&packs).unwrap();
    fs::write(packs.join("kept.json"), "{}").unwrap();
    let pending = dir.path().join("work/pending");
    fs::create_dir_all(&pending).unwrap();
    fs::write(pending.join("stale.json"), "{}").unwrap();

    modloc(dir.path())
        .args(["clean", "--keep-packs"])
        .assert()
        .success();

    assert!(packs.join("kept.json").is_file());
    assert!(!pending.join("stale.json").exists());
}
