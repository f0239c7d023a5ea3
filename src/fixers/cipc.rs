//! CIPC policy: drop the embedded IFRS dependency taxonomy and point every
//! remaining cross-reference at the published absolute URIs. The
//! descriptors shipped by the publisher are already conformant and are
//! kept as is.

use crate::package::{collect_dirs_recursive, collect_files_recursive, Package};
use crate::pipeline::{step, PackageFixer};
use crate::provider::Provider;
use crate::report::{Reporter, StepOutcome};
use crate::rewrite::{rewrite_locator_hrefs, rewrite_schema_locations};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Component, Path, PathBuf};

pub struct CipcFixer;

impl PackageFixer for CipcFixer {
    fn provider(&self) -> Provider {
        Provider::Cipc
    }

    fn restructure(&self, pkg: &Package, reporter: &mut dyn Reporter) -> Result<()> {
        let root = pkg.root()?;
        let mut details = Vec::new();
        if let Some(embedded) = find_embedded_ifrs(&root)? {
            fs::remove_dir_all(&embedded)
                .with_context(|| format!("remove {}", embedded.display()))?;
            details.push("embedded IFRS taxonomy removed".to_string());
        }
        let rewritten = rewrite_references(&root)?;
        details.push(format!("{rewritten} files rewritten"));
        reporter.step(step::RESTRUCTURE, StepOutcome::Applied, &details.join(", "));
        Ok(())
    }

    fn regenerate_catalog(&self, _pkg: &Package, reporter: &mut dyn Reporter) -> Result<()> {
        reporter.step(
            step::REGENERATE_CATALOG,
            StepOutcome::NoOp,
            "catalog.xml kept as published",
        );
        Ok(())
    }

    fn regenerate_package_xml(&self, _pkg: &Package, reporter: &mut dyn Reporter) -> Result<()> {
        reporter.step(
            step::REGENERATE_PACKAGE_XML,
            StepOutcome::NoOp,
            "taxonomyPackage.xml kept as published",
        );
        Ok(())
    }
}

/// First directory below `root` whose path ends in consecutive
/// `def`/`ifrs` components.
fn find_embedded_ifrs(root: &Path) -> Result<Option<PathBuf>> {
    for dir in collect_dirs_recursive(root)? {
        let mut components = dir.components().rev();
        let last = components.next();
        let second_last = components.next();
        if matches!(last, Some(Component::Normal(name)) if name == "ifrs")
            && matches!(second_last, Some(Component::Normal(name)) if name == "def")
        {
            return Ok(Some(dir));
        }
    }
    Ok(None)
}

/// Run the locator pass over every linkbase and the `schemaLocation` pass
/// over every schema, skipping the descriptor files. Returns how many
/// files changed.
fn rewrite_references(root: &Path) -> Result<usize> {
    let mut rewritten = 0usize;
    for path in collect_files_recursive(root)? {
        let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if file_name.contains("catalog") || file_name.contains("taxonomyPackage") {
            continue;
        }
        let fixed = match path.extension().and_then(|ext| ext.to_str()) {
            Some("xml") => {
                let text = fs::read_to_string(&path)
                    .with_context(|| format!("read {}", path.display()))?;
                rewrite_locator_hrefs(&text)
            }
            Some("xsd") => {
                let text = fs::read_to_string(&path)
                    .with_context(|| format!("read {}", path.display()))?;
                rewrite_schema_locations(&text)
            }
            _ => None,
        };
        if let Some(fixed) = fixed {
            fs::write(&path, fixed).with_context(|| format!("write {}", path.display()))?;
            rewritten += 1;
        }
    }
    Ok(rewritten)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::RecordingReporter;

    const LABEL_LINKBASE: &str = concat!(
        r#"<link:linkbase xmlns:link="http://www.xbrl.org/2003/linkbase" xmlns:xlink="http://www.w3.org/1999/xlink">"#,
        r#"<link:loc xlink:href="../../../def/ifrs/full_ifrs/full_ifrs-cor_2021-03-24.xsd#ifrs_Assets"/>"#,
        r#"</link:linkbase>"#,
    );

    fn extracted_package(dir: &Path) -> Package {
        let source = dir.join("CIPC_2021.zip");
        let file = std::fs::File::create(&source).expect("create zip");
        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        for (entry, content) in [
            ("CIPC_2021/META-INF/catalog.xml", "<catalog/>"),
            ("CIPC_2021/META-INF/taxonomyPackage.xml", "<tp/>"),
            (
                "CIPC_2021/def/ifrs/full_ifrs/full_ifrs-cor_2021-03-24.xsd",
                "<xs:schema/>",
            ),
            ("CIPC_2021/linkbases/lab_full.xml", LABEL_LINKBASE),
        ] {
            writer.start_file(entry, options).expect("entry");
            std::io::Write::write_all(&mut writer, content.as_bytes()).expect("write");
        }
        writer.finish().expect("finish");
        Package::extract(&source, &dir.join("CIPC_2021.work")).expect("extract")
    }

    #[test]
    fn restructure_removes_embedded_ifrs_and_absolutizes_references() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pkg = extracted_package(dir.path());
        let mut reporter = RecordingReporter::default();
        CipcFixer.restructure(&pkg, &mut reporter).unwrap();

        let root = pkg.root().unwrap();
        assert!(!root.join("def/ifrs").exists());
        let linkbase = std::fs::read_to_string(root.join("linkbases/lab_full.xml")).unwrap();
        assert!(linkbase.contains(
            r#"xlink:href="https://xbrl.ifrs.org/taxonomy/2021-03-24/full_ifrs/full_ifrs-cor_2021-03-24.xsd#ifrs_Assets""#
        ));
        // descriptors untouched
        let catalog = std::fs::read_to_string(root.join("META-INF/catalog.xml")).unwrap();
        assert_eq!(catalog, "<catalog/>");
        pkg.cleanup().unwrap();
    }
}
