//! EDINET policy: hoist the taxonomy content to the package root and
//! regenerate both descriptors from the resulting layout.

use crate::descriptors::{
    write_catalog_xml, write_taxonomy_package_xml, CatalogRule, PackageMeta, META_INF_DIR,
};
use crate::entrypoints::scan_entry_points;
use crate::package::{collect_dirs_recursive, Package};
use crate::pipeline::{step, PackageFixer};
use crate::provider::Provider;
use crate::report::{Reporter, StepOutcome};
use crate::util::extract_version;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

const EDINET_BASE_URI: &str = "http://disclosure.edinet-fsa.go.jp";

/// Subtrees that EDINET archives bury one or more levels deep and that
/// must live directly under the package root.
const RELOCATED_SUBTREES: [&str; 3] = ["taxonomy", "samples", META_INF_DIR];

pub struct EdinetFixer;

impl PackageFixer for EdinetFixer {
    fn provider(&self) -> Provider {
        Provider::Edinet
    }

    fn restructure(&self, pkg: &Package, reporter: &mut dyn Reporter) -> Result<()> {
        let root = pkg.root()?;
        let mut moved = Vec::new();
        for name in RELOCATED_SUBTREES {
            if let Some(dir) = find_dir_named(&root, name)? {
                let dest = root.join(name);
                let old_parent = dir.parent().map(Path::to_path_buf);
                fs::rename(&dir, &dest).with_context(|| {
                    format!("move {} to {}", dir.display(), dest.display())
                })?;
                if let Some(old_parent) = old_parent {
                    remove_empty_ancestors(&old_parent, &root)?;
                }
                moved.push(name);
            }
        }
        if moved.is_empty() {
            reporter.step(step::RESTRUCTURE, StepOutcome::NoOp, "nothing buried");
        } else {
            reporter.step(
                step::RESTRUCTURE,
                StepOutcome::Applied,
                &format!("moved {} to package root", moved.join(", ")),
            );
        }
        Ok(())
    }

    fn regenerate_catalog(&self, pkg: &Package, reporter: &mut dyn Reporter) -> Result<()> {
        let root = pkg.root()?;
        let mut rules = Vec::new();
        for sample in list_dirs(&root.join("samples"))? {
            rules.push(CatalogRule {
                uri_start: format!("{EDINET_BASE_URI}/samples/{sample}/"),
                rewrite_prefix: format!("../samples/{sample}/"),
            });
        }
        for taxonomy in list_dirs(&root.join("taxonomy"))? {
            for version in list_dirs(&root.join("taxonomy").join(&taxonomy))? {
                rules.push(CatalogRule {
                    uri_start: format!("{EDINET_BASE_URI}/taxonomy/{taxonomy}/{version}/"),
                    rewrite_prefix: format!("../taxonomy/{taxonomy}/{version}/"),
                });
            }
        }
        let written = write_catalog_xml(&root.join(META_INF_DIR), &rules, reporter)?;
        reporter.step(
            step::REGENERATE_CATALOG,
            if written { StepOutcome::Applied } else { StepOutcome::Skipped },
            &format!("{} rewrite rules", rules.len()),
        );
        Ok(())
    }

    fn regenerate_package_xml(&self, pkg: &Package, reporter: &mut dyn Reporter) -> Result<()> {
        let root = pkg.root()?;
        let version = extract_version(pkg.name()).unwrap_or_default().to_string();
        let entry_points = scan_entry_points(&root, EDINET_BASE_URI)?;
        let meta = PackageMeta {
            identifier: format!("{}.zip", pkg.name()),
            name: format!("{}.zip", pkg.name()),
            description: format!(
                "The {} Taxonomy Package provided by the JFSA.",
                pkg.name()
            ),
            version: version.clone(),
            publisher: "Japanese Financial Service Agency".to_string(),
            publisher_url: "https://www.fsa.go.jp/en/".to_string(),
            publication_date: version,
        };
        let written =
            write_taxonomy_package_xml(&root.join(META_INF_DIR), &meta, &entry_points, reporter)?;
        reporter.step(
            step::REGENERATE_PACKAGE_XML,
            if written { StepOutcome::Applied } else { StepOutcome::Skipped },
            &format!("{} entry points", entry_points.len()),
        );
        Ok(())
    }
}

/// Find a directory named `name` anywhere strictly below `root`, skipping
/// one that already sits directly at the root.
fn find_dir_named(root: &Path, name: &str) -> Result<Option<PathBuf>> {
    for dir in collect_dirs_recursive(root)? {
        if dir.file_name().and_then(|n| n.to_str()) != Some(name) {
            continue;
        }
        if dir.parent() == Some(root) {
            continue;
        }
        return Ok(Some(dir));
    }
    Ok(None)
}

/// Remove `dir` and its ancestors up to (not including) `root` while they
/// are empty, so hoisting leaves no dead directories behind.
fn remove_empty_ancestors(dir: &Path, root: &Path) -> Result<()> {
    let mut current = dir.to_path_buf();
    while current != root && current.starts_with(root) {
        let mut entries =
            fs::read_dir(&current).with_context(|| format!("read {}", current.display()))?;
        if entries.next().is_some() {
            break;
        }
        fs::remove_dir(&current)
            .with_context(|| format!("remove {}", current.display()))?;
        let Some(parent) = current.parent() else {
            break;
        };
        current = parent.to_path_buf();
    }
    Ok(())
}

/// Names of the immediate subdirectories of `dir`, sorted; empty when the
/// directory does not exist.
fn list_dirs(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    if !dir.is_dir() {
        return Ok(names);
    }
    for entry in fs::read_dir(dir).with_context(|| format!("read {}", dir.display()))? {
        let entry = entry?;
        if entry.path().is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}
