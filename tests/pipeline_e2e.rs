//! End-to-end pipeline tests: real zip archives in, repaired zip archives
//! out, one scenario per provider policy that changes anything.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;
use std::process::Command;

use tpfix::fixers::for_provider;
use tpfix::inspect::inspect;
use tpfix::package::Package;
use tpfix::pipeline::{run_pipeline, step};
use tpfix::provider::Provider;
use tpfix::report::{RecordingReporter, StepOutcome};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

fn make_zip(path: &Path, entries: &[(&str, &str)]) {
    let file = File::create(path).expect("create zip");
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default();
    for (entry_name, content) in entries {
        writer.start_file(*entry_name, options).expect("start entry");
        writer.write_all(content.as_bytes()).expect("write entry");
    }
    writer.finish().expect("finish zip");
}

fn zip_entry_names(path: &Path) -> Vec<String> {
    let archive = ZipArchive::new(File::open(path).expect("open zip")).expect("parse zip");
    archive.file_names().map(str::to_string).collect()
}

fn read_zip_entry(path: &Path, entry: &str) -> String {
    let mut archive = ZipArchive::new(File::open(path).expect("open zip")).expect("parse zip");
    let mut content = String::new();
    archive
        .by_name(entry)
        .expect("entry present")
        .read_to_string(&mut content)
        .expect("read entry");
    content
}

fn fix(provider: Provider, source: &Path, dest: &Path) -> RecordingReporter {
    let work_dir = dest.with_extension("work");
    let report = inspect(source).expect("inspect");
    let pkg = Package::extract(source, &work_dir).expect("extract");
    let fixer = for_provider(provider);
    let mut reporter = RecordingReporter::default();
    run_pipeline(fixer.as_ref(), &pkg, &report, dest, &mut reporter).expect("pipeline");
    assert!(!work_dir.exists(), "working directory must be removed");
    reporter
}

const CMF_ENTRY_POINT_XSD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
           xmlns:link="http://www.xbrl.org/2003/linkbase">
  <xs:annotation>
    <xs:appinfo>
      <link:linkbase id="lnk"/>
    </xs:appinfo>
  </xs:annotation>
</xs:schema>"#;

#[test]
fn cmfclci_raw_building_block_becomes_conformant() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = dir.path().join("CMF-CL-CI-2020-01-02.zip");
    // Raw CMF drop: loose files, no top-level dir, no META-INF.
    make_zip(
        &source,
        &[
            ("cl-ci_cor_2020-01-02.xsd", CMF_ENTRY_POINT_XSD),
            ("cl-ci_lab_2020-01-02.xml", "<link:linkbase/>"),
        ],
    );

    let dest = dir.path().join("out/CMF-CL-CI-2020-01-02.zip");
    let reporter = fix(Provider::Cmfclci, &source, &dest);

    assert_eq!(reporter.outcome(step::FIX_META_INF), Some(StepOutcome::Applied));
    assert_eq!(
        reporter.outcome(step::FIX_TOP_LEVEL_DIR),
        Some(StepOutcome::Applied)
    );

    let report = inspect(&dest).expect("inspect output");
    assert!(report.conformant());

    let names = zip_entry_names(&dest);
    assert!(names
        .iter()
        .all(|name| name.starts_with("CMF-CL-CI-2020-01-02/")));
    assert!(names.contains(&"CMF-CL-CI-2020-01-02/META-INF/catalog.xml".to_string()));
    assert!(names.contains(&"CMF-CL-CI-2020-01-02/META-INF/taxonomyPackage.xml".to_string()));
    assert!(names.contains(&"CMF-CL-CI-2020-01-02/files/cl-ci_cor_2020-01-02.xsd".to_string()));
    assert!(names.contains(&"CMF-CL-CI-2020-01-02/files/cl-ci_lab_2020-01-02.xml".to_string()));

    let catalog = read_zip_entry(&dest, "CMF-CL-CI-2020-01-02/META-INF/catalog.xml");
    assert!(catalog.contains(r#"uriStartString="http://www.cmfchile.cl/cl/fr/ci/2020-01-02/""#));
    assert!(catalog.contains(r#"rewritePrefix="../CL-CI-2020/""#));

    let package_xml = read_zip_entry(&dest, "CMF-CL-CI-2020-01-02/META-INF/taxonomyPackage.xml");
    assert!(package_xml.contains("<tp:name>CMF-CL-CI XBRL Taxonomy</tp:name>"));
    assert!(package_xml.contains(
        r#"href="http://www.cmfchile.cl/cl/fr/ci/2020-01-02/files/cl-ci_cor_2020-01-02.xsd""#
    ));
}

const CIPC_LINKBASE: &str = concat!(
    r#"<link:linkbase xmlns:link="http://www.xbrl.org/2003/linkbase" xmlns:xlink="http://www.w3.org/1999/xlink">"#,
    r#"<link:loc xlink:href="../../../def/ifrs/full_ifrs/full_ifrs-cor_2021-03-24.xsd#ifrs_Assets"/>"#,
    r#"</link:linkbase>"#,
);

#[test]
fn cipc_embedded_ifrs_is_dropped_and_references_absolutized() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = dir.path().join("CIPC_2021.zip");
    make_zip(
        &source,
        &[
            ("CIPC_2021/META-INF/catalog.xml", "<catalog/>"),
            ("CIPC_2021/META-INF/taxonomyPackage.xml", "<tp/>"),
            (
                "CIPC_2021/def/ifrs/full_ifrs/full_ifrs-cor_2021-03-24.xsd",
                "<xs:schema/>",
            ),
            ("CIPC_2021/linkbases/lab_full.xml", CIPC_LINKBASE),
        ],
    );

    let dest = dir.path().join("out/CIPC_2021.zip");
    let reporter = fix(Provider::Cipc, &source, &dest);

    // The archive was structurally fine; only restructure applied.
    assert_eq!(reporter.outcome(step::FIX_META_INF), Some(StepOutcome::Skipped));
    assert_eq!(reporter.outcome(step::RESTRUCTURE), Some(StepOutcome::Applied));
    assert_eq!(
        reporter.outcome(step::REGENERATE_CATALOG),
        Some(StepOutcome::NoOp)
    );

    let names = zip_entry_names(&dest);
    assert!(!names.iter().any(|name| name.contains("def/ifrs")));

    let linkbase = read_zip_entry(&dest, "CIPC_2021/linkbases/lab_full.xml");
    assert!(linkbase.contains(
        r#"xlink:href="https://xbrl.ifrs.org/taxonomy/2021-03-24/full_ifrs/full_ifrs-cor_2021-03-24.xsd#ifrs_Assets""#
    ));

    // Published descriptors survive byte-for-byte.
    assert_eq!(read_zip_entry(&dest, "CIPC_2021/META-INF/catalog.xml"), "<catalog/>");
    assert!(inspect(&dest).expect("inspect output").conformant());
}

#[test]
fn eba_conformant_package_round_trips() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = dir.path().join("eba_pkg.zip");
    make_zip(
        &source,
        &[
            ("eba_pkg/META-INF/catalog.xml", "<catalog/>"),
            ("eba_pkg/META-INF/taxonomyPackage.xml", "<tp/>"),
            ("eba_pkg/taxonomy/its.xsd", "<xs:schema/>"),
        ],
    );

    let dest = dir.path().join("out/eba_pkg.zip");
    let reporter = fix(Provider::Eba, &source, &dest);

    assert_eq!(reporter.outcome(step::NORMALIZE_ZIP), Some(StepOutcome::Skipped));
    assert_eq!(reporter.outcome(step::FIX_META_INF), Some(StepOutcome::Skipped));
    assert_eq!(
        reporter.outcome(step::FIX_TOP_LEVEL_DIR),
        Some(StepOutcome::Skipped)
    );
    assert_eq!(reporter.outcome(step::RESTRUCTURE), Some(StepOutcome::NoOp));
    assert_eq!(reporter.outcome(step::REPACKAGE), Some(StepOutcome::Applied));

    let mut names = zip_entry_names(&dest);
    names.retain(|name| !name.ends_with('/'));
    names.sort();
    assert_eq!(
        names,
        vec![
            "eba_pkg/META-INF/catalog.xml".to_string(),
            "eba_pkg/META-INF/taxonomyPackage.xml".to_string(),
            "eba_pkg/taxonomy/its.xsd".to_string(),
        ]
    );
    assert_eq!(read_zip_entry(&dest, "eba_pkg/taxonomy/its.xsd"), "<xs:schema/>");
}

#[test]
fn edinet_buried_layout_is_hoisted_and_described() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = dir.path().join("ALL_20221101.zip");
    make_zip(
        &source,
        &[
            (
                "ALL_20221101/data/taxonomy/jpcrp/2022-11-01/jpcrp_cor.xsd",
                CMF_ENTRY_POINT_XSD,
            ),
            (
                "ALL_20221101/data/samples/2022-11-01/sample.xsd",
                "<xs:schema/>",
            ),
        ],
    );

    let dest = dir.path().join("out/ALL_20221101.zip");
    let reporter = fix(Provider::Edinet, &source, &dest);
    assert_eq!(reporter.outcome(step::RESTRUCTURE), Some(StepOutcome::Applied));

    assert!(inspect(&dest).expect("inspect output").conformant());
    let names = zip_entry_names(&dest);
    assert!(names.contains(&"ALL_20221101/taxonomy/jpcrp/2022-11-01/jpcrp_cor.xsd".to_string()));
    assert!(names.contains(&"ALL_20221101/samples/2022-11-01/sample.xsd".to_string()));
    // The emptied data/ directory must not survive as a dead zip entry.
    assert!(!names.iter().any(|name| name.starts_with("ALL_20221101/data")));

    let catalog = read_zip_entry(&dest, "ALL_20221101/META-INF/catalog.xml");
    assert!(catalog.contains(
        r#"uriStartString="http://disclosure.edinet-fsa.go.jp/taxonomy/jpcrp/2022-11-01/""#
    ));
    let package_xml = read_zip_entry(&dest, "ALL_20221101/META-INF/taxonomyPackage.xml");
    assert!(package_xml.contains("Japanese Financial Service Agency"));
}

#[test]
fn unknown_provider_is_terminal_and_produces_no_output() {
    assert!(Provider::parse("XX").is_err());

    let dir = tempfile::tempdir().expect("tempdir");
    let source = dir.path().join("pkg.zip");
    make_zip(&source, &[("pkg/a.xsd", "<xs:schema/>")]);
    let out = dir.path().join("out/pkg.zip");

    let output = Command::new(env!("CARGO_BIN_EXE_tpfix"))
        .args([
            "fix",
            "--provider",
            "XX",
            "--package",
            source.to_str().expect("utf-8 path"),
            "--out",
            out.to_str().expect("utf-8 path"),
        ])
        .output()
        .expect("run tpfix");
    assert!(!output.status.success());
    assert!(!out.exists());
}

#[test]
fn lowercase_provider_code_is_accepted_by_the_cli() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = dir.path().join("eba_pkg.zip");
    make_zip(
        &source,
        &[
            ("eba_pkg/META-INF/catalog.xml", "<catalog/>"),
            ("eba_pkg/META-INF/taxonomyPackage.xml", "<tp/>"),
        ],
    );
    let out = dir.path().join("out/eba_pkg.zip");

    let output = Command::new(env!("CARGO_BIN_EXE_tpfix"))
        .args([
            "fix",
            "--provider",
            "eba",
            "--package",
            source.to_str().expect("utf-8 path"),
            "--out",
            out.to_str().expect("utf-8 path"),
        ])
        .output()
        .expect("run tpfix");
    assert!(output.status.success());
    assert!(out.exists());
    assert!(inspect(&out).expect("inspect output").conformant());
}

#[test]
fn check_json_output_parses() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = dir.path().join("pkg.zip");
    make_zip(
        &source,
        &[
            ("pkg/META-INF/catalog.xml", "<catalog/>"),
            ("pkg/META-INF/taxonomyPackage.xml", "<tp/>"),
        ],
    );

    let output = Command::new(env!("CARGO_BIN_EXE_tpfix"))
        .args(["check", "--json", "--package", source.to_str().expect("utf-8 path")])
        .output()
        .expect("run tpfix");
    assert!(output.status.success());

    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("valid JSON report");
    assert_eq!(report["is_zip"], true);
    assert_eq!(report["has_single_top_level_dir"], true);
    assert_eq!(report["has_catalog_xml"], true);
}

#[test]
fn raw_payload_is_normalized_into_a_zip_container() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = dir.path().join("notazip.zip");
    fs::write(&source, "plain text payload").expect("write raw payload");

    let dest = dir.path().join("out/notazip.zip");
    let reporter = fix(Provider::Eba, &source, &dest);
    assert_eq!(reporter.outcome(step::NORMALIZE_ZIP), Some(StepOutcome::Applied));
    assert_eq!(
        reporter.outcome(step::FIX_TOP_LEVEL_DIR),
        Some(StepOutcome::Applied)
    );

    let report = inspect(&dest).expect("inspect output");
    assert!(report.is_zip);
    assert!(report.has_single_top_level_dir);
    assert_eq!(
        read_zip_entry(&dest, "notazip/notazip.zip"),
        "plain text payload"
    );
}

#[test]
fn fix_is_idempotent_on_its_own_output() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = dir.path().join("CMF-CL-CI-2020-01-02.zip");
    make_zip(&source, &[("cl-ci_cor_2020-01-02.xsd", CMF_ENTRY_POINT_XSD)]);

    let first = dir.path().join("out/CMF-CL-CI-2020-01-02.zip");
    fix(Provider::Cmfclci, &source, &first);

    let second = dir.path().join("out2/CMF-CL-CI-2020-01-02.zip");
    let reporter = fix(Provider::Cmfclci, &first, &second);

    // Second run warns instead of overwriting the generated descriptors.
    assert_eq!(reporter.warnings.len(), 2);
    assert!(inspect(&second).expect("inspect output").conformant());
}
