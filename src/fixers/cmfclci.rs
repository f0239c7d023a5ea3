//! CMF CL-CI policy: regroup the raw building block under a `files/`
//! directory and generate both descriptors from scratch.

use crate::descriptors::{
    write_catalog_xml, write_taxonomy_package_xml, CatalogRule, PackageMeta, META_INF_DIR,
};
use crate::entrypoints::scan_entry_points;
use crate::package::{move_children, Package};
use crate::pipeline::{step, PackageFixer};
use crate::provider::Provider;
use crate::report::{Reporter, StepOutcome};
use crate::util::{extract_version, find_year};
use anyhow::Result;

const CMF_BASE_URI: &str = "http://www.cmfchile.cl/cl/fr/ci";
const FILES_DIR: &str = "files";

pub struct CmfclciFixer;

impl PackageFixer for CmfclciFixer {
    fn provider(&self) -> Provider {
        Provider::Cmfclci
    }

    fn restructure(&self, pkg: &Package, reporter: &mut dyn Reporter) -> Result<()> {
        let root = pkg.root()?;
        move_children(&root, &root.join(FILES_DIR), &[META_INF_DIR, FILES_DIR])?;
        reporter.step(
            step::RESTRUCTURE,
            StepOutcome::Applied,
            &format!("content moved under {FILES_DIR}/"),
        );
        Ok(())
    }

    fn regenerate_catalog(&self, pkg: &Package, reporter: &mut dyn Reporter) -> Result<()> {
        let version = package_version(pkg);
        let year = find_year(&version).unwrap_or_default();
        let rules = [CatalogRule {
            uri_start: format!("{CMF_BASE_URI}/{version}/"),
            rewrite_prefix: format!("../CL-CI-{year}/"),
        }];
        let written = write_catalog_xml(&pkg.root()?.join(META_INF_DIR), &rules, reporter)?;
        reporter.step(
            step::REGENERATE_CATALOG,
            if written { StepOutcome::Applied } else { StepOutcome::Skipped },
            "1 rewrite rule",
        );
        Ok(())
    }

    fn regenerate_package_xml(&self, pkg: &Package, reporter: &mut dyn Reporter) -> Result<()> {
        let root = pkg.root()?;
        let version = package_version(pkg);
        let base_uri = format!("{CMF_BASE_URI}/{version}");
        let entry_points = scan_entry_points(&root, &base_uri)?;

        let mut stem = pkg.name().to_string();
        if !version.is_empty() {
            stem = stem.trim_end_matches(&format!("-{version}")).to_string();
        }
        let year = find_year(&version).unwrap_or_default();
        let meta = PackageMeta {
            identifier: format!("{}.zip", pkg.name()),
            name: format!("{stem} XBRL Taxonomy"),
            description: format!(
                "Expanded IFRS {year} taxonomy with additional Chilean regulations added"
            ),
            version: version.clone(),
            publisher: "Comision para el Mercado Financiero".to_string(),
            publisher_url: "https://www.cmfchile.cl/portal/principal/613/w3-channel.html"
                .to_string(),
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

/// Version token from the archive name; CMF archives carry a full date
/// (`CMF-CL-CI-2020-01-02`), older drops only a year.
fn package_version(pkg: &Package) -> String {
    extract_version(pkg.name()).unwrap_or_default().to_string()
}
