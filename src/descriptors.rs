//! Generation of the two package descriptor files, `catalog.xml` and
//! `taxonomyPackage.xml`.
//!
//! Both are rebuilt deterministically from the current on-disk layout.
//! Regeneration is idempotent: an existing descriptor is left untouched
//! and surfaced as a warning instead of being overwritten.

use crate::entrypoints::EntryPoint;
use crate::report::Reporter;
use anyhow::{Context, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

pub const META_INF_DIR: &str = "META-INF";
pub const CATALOG_FILE: &str = "catalog.xml";
pub const TAXONOMY_PACKAGE_FILE: &str = "taxonomyPackage.xml";

const OASIS_CATALOG_NS: &str = "urn:oasis:names:tc:entity:xmlns:xml:catalog";
const TAXONOMY_PACKAGE_NS: &str = "http://xbrl.org/2016/taxonomy-package";
const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";
const GENERATED_COMMENT: &str =
    " This file and its content have been generated and are not part of the original archive. ";

/// One `rewriteURI` entry for `catalog.xml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRule {
    pub uri_start: String,
    pub rewrite_prefix: String,
}

/// Publisher metadata for `taxonomyPackage.xml`.
#[derive(Debug, Clone)]
pub struct PackageMeta {
    pub identifier: String,
    pub name: String,
    pub description: String,
    pub version: String,
    pub publisher: String,
    pub publisher_url: String,
    pub publication_date: String,
}

/// Write `catalog.xml` under `meta_inf_dir`. Returns `false` (with a
/// warning) when the file already exists. Rules whose normalized
/// `uriStartString` repeats an earlier rule are dropped, so the catalog
/// never carries duplicate rewrite entries.
pub fn write_catalog_xml(
    meta_inf_dir: &Path,
    rules: &[CatalogRule],
    reporter: &mut dyn Reporter,
) -> Result<bool> {
    let target = meta_inf_dir.join(CATALOG_FILE);
    if target.exists() {
        reporter.warn(&format!("'{CATALOG_FILE}' already exists, keeping it"));
        return Ok(false);
    }
    fs::create_dir_all(meta_inf_dir)
        .with_context(|| format!("create {}", meta_inf_dir.display()))?;

    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 4);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    let schema_location = format!("{OASIS_CATALOG_NS} Catalog.xsd");
    let mut root = BytesStart::new("catalog");
    root.push_attribute(("xmlns", OASIS_CATALOG_NS));
    root.push_attribute(("xmlns:xsi", XSI_NS));
    root.push_attribute(("xsi:schemaLocation", schema_location.as_str()));
    writer.write_event(Event::Start(root))?;
    writer.write_event(Event::Comment(BytesText::new(GENERATED_COMMENT)))?;

    let mut seen = BTreeSet::new();
    for rule in rules {
        if !seen.insert(rule.uri_start.trim_end_matches('/').to_string()) {
            continue;
        }
        let mut elem = BytesStart::new("rewriteURI");
        elem.push_attribute(("uriStartString", rule.uri_start.as_str()));
        elem.push_attribute(("rewritePrefix", rule.rewrite_prefix.as_str()));
        writer.write_event(Event::Empty(elem))?;
    }
    writer.write_event(Event::End(BytesEnd::new("catalog")))?;

    fs::write(&target, writer.into_inner())
        .with_context(|| format!("write {}", target.display()))?;
    Ok(true)
}

/// Write `taxonomyPackage.xml` under `meta_inf_dir` from the publisher
/// metadata and the freshly scanned entry points. Returns `false` (with a
/// warning) when the file already exists.
pub fn write_taxonomy_package_xml(
    meta_inf_dir: &Path,
    meta: &PackageMeta,
    entry_points: &[EntryPoint],
    reporter: &mut dyn Reporter,
) -> Result<bool> {
    let target = meta_inf_dir.join(TAXONOMY_PACKAGE_FILE);
    if target.exists() {
        reporter.warn(&format!("'{TAXONOMY_PACKAGE_FILE}' already exists, keeping it"));
        return Ok(false);
    }
    fs::create_dir_all(meta_inf_dir)
        .with_context(|| format!("create {}", meta_inf_dir.display()))?;

    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 4);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    let schema_location =
        format!("{TAXONOMY_PACKAGE_NS} http://xbrl.org/2016/taxonomy-package.xsd");
    let mut root = BytesStart::new("tp:taxonomyPackage");
    root.push_attribute(("xml:lang", "en"));
    root.push_attribute(("xmlns:tp", TAXONOMY_PACKAGE_NS));
    root.push_attribute(("xmlns:xsi", XSI_NS));
    root.push_attribute(("xsi:schemaLocation", schema_location.as_str()));
    writer.write_event(Event::Start(root))?;
    writer.write_event(Event::Comment(BytesText::new(GENERATED_COMMENT)))?;

    write_text_element(&mut writer, "tp:identifier", &meta.identifier)?;
    write_text_element(&mut writer, "tp:name", &meta.name)?;
    write_text_element(&mut writer, "tp:description", &meta.description)?;
    write_text_element(&mut writer, "tp:version", &meta.version)?;
    write_text_element(&mut writer, "tp:publisher", &meta.publisher)?;
    write_text_element(&mut writer, "tp:publisherURL", &meta.publisher_url)?;
    write_text_element(&mut writer, "tp:publicationDate", &meta.publication_date)?;

    writer.write_event(Event::Start(BytesStart::new("tp:entryPoints")))?;
    for entry_point in entry_points {
        writer.write_event(Event::Start(BytesStart::new("tp:entryPoint")))?;
        write_text_element(&mut writer, "tp:name", &entry_point.name)?;
        if let Some(version) = &entry_point.version {
            write_text_element(&mut writer, "tp:version", version)?;
        }
        let mut doc = BytesStart::new("tp:entryPointDocument");
        doc.push_attribute(("href", entry_point.document_uri.as_str()));
        writer.write_event(Event::Empty(doc))?;
        writer.write_event(Event::End(BytesEnd::new("tp:entryPoint")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("tp:entryPoints")))?;
    writer.write_event(Event::End(BytesEnd::new("tp:taxonomyPackage")))?;

    fs::write(&target, writer.into_inner())
        .with_context(|| format!("write {}", target.display()))?;
    Ok(true)
}

fn write_text_element(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}
