//! Archive Inspector: stateless structural predicates over a candidate
//! taxonomy package.
//!
//! Predicates classify defects instead of raising them: a well-formed but
//! non-conformant archive always yields `Ok(false)`. Errors are reserved
//! for paths that do not exist or cannot be read.

use anyhow::{Context, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::reader::NsReader;
use quick_xml::Reader;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::path::Path;
use zip::ZipArchive;

/// Structural facts about a package, computed once per run. The three
/// facts gating the repair pipeline are `is_zip`,
/// `has_single_top_level_dir`, and [`InspectionReport::has_complete_meta_inf`].
#[derive(Debug, Clone, Serialize)]
pub struct InspectionReport {
    pub is_zip: bool,
    pub has_single_top_level_dir: bool,
    pub has_meta_inf: bool,
    pub has_catalog_xml: bool,
    pub has_taxonomy_package_xml: bool,
}

impl InspectionReport {
    /// META-INF directory present with both descriptor files inside.
    pub fn has_complete_meta_inf(&self) -> bool {
        self.has_meta_inf && self.has_catalog_xml && self.has_taxonomy_package_xml
    }

    pub fn conformant(&self) -> bool {
        self.is_zip && self.has_single_top_level_dir && self.has_complete_meta_inf()
    }
}

/// Run every predicate once over the archive.
pub fn inspect(archive: &Path) -> Result<InspectionReport> {
    if !is_zip(archive)? {
        return Ok(InspectionReport {
            is_zip: false,
            has_single_top_level_dir: false,
            has_meta_inf: false,
            has_catalog_xml: false,
            has_taxonomy_package_xml: false,
        });
    }
    Ok(InspectionReport {
        is_zip: true,
        has_single_top_level_dir: has_single_top_level_dir(archive)?,
        has_meta_inf: has_meta_inf(archive)?,
        has_catalog_xml: has_catalog_xml(archive)?,
        has_taxonomy_package_xml: has_taxonomy_package_xml(archive)?,
    })
}

fn open_archive(path: &Path) -> Result<Option<ZipArchive<File>>> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    Ok(ZipArchive::new(file).ok())
}

/// True iff the file's contents parse as a zip container, regardless of
/// its extension.
pub fn is_zip(path: &Path) -> Result<bool> {
    Ok(open_archive(path)?.is_some())
}

/// True iff exactly one name appears at path depth 0 among the archive's
/// entries and that name is a directory.
pub fn has_single_top_level_dir(path: &Path) -> Result<bool> {
    let Some(archive) = open_archive(path)? else {
        return Ok(false);
    };
    let mut top_dirs = BTreeSet::new();
    let mut has_root_file = false;
    for name in archive.file_names() {
        match name.split_once('/') {
            Some((first, _)) => {
                top_dirs.insert(first.to_string());
            }
            None => has_root_file = true,
        }
    }
    Ok(top_dirs.len() == 1 && !has_root_file)
}

/// True iff the archive contains, anywhere, a directory literally named
/// `META-INF`.
pub fn has_meta_inf(path: &Path) -> Result<bool> {
    let Some(archive) = open_archive(path)? else {
        return Ok(false);
    };
    let found = archive
        .file_names()
        .any(|name| name.split('/').any(|component| component == "META-INF"));
    Ok(found)
}

/// True iff the archive contains a `catalog.xml` directly inside a
/// `META-INF` directory.
pub fn has_catalog_xml(path: &Path) -> Result<bool> {
    has_meta_inf_file(path, "catalog.xml")
}

/// True iff the archive contains a `taxonomyPackage.xml` directly inside a
/// `META-INF` directory.
pub fn has_taxonomy_package_xml(path: &Path) -> Result<bool> {
    has_meta_inf_file(path, "taxonomyPackage.xml")
}

fn has_meta_inf_file(path: &Path, file_name: &str) -> Result<bool> {
    let Some(archive) = open_archive(path)? else {
        return Ok(false);
    };
    let found = archive.file_names().any(|name| {
        let components: Vec<&str> = name.split('/').collect();
        components.len() >= 2
            && components[components.len() - 1] == file_name
            && components[components.len() - 2] == "META-INF"
    });
    Ok(found)
}

/// Structural XML-against-XSD check: the document must be well-formed and
/// its root element must match a global element declaration of the schema
/// (local name and target namespace).
///
/// Returns `Ok(false)` for any invalid document, malformed XML, or
/// unusable schema; errors are reserved for unreadable paths.
pub fn validate_xml(schema_path: &Path, xml_path: &Path) -> Result<bool> {
    let schema_text = fs::read_to_string(schema_path)
        .with_context(|| format!("read schema {}", schema_path.display()))?;
    let xml_text =
        fs::read_to_string(xml_path).with_context(|| format!("read {}", xml_path.display()))?;
    let Some(surface) = parse_schema_surface(&schema_text) else {
        return Ok(false);
    };
    let Some((root_ns, root_name)) = document_root(&xml_text) else {
        return Ok(false);
    };
    Ok(surface.target_namespace == root_ns && surface.global_elements.contains(&root_name))
}

struct SchemaSurface {
    target_namespace: Option<String>,
    global_elements: Vec<String>,
}

/// Pull the target namespace and global element names out of an XSD.
/// Returns `None` when the schema is malformed or not a schema document.
fn parse_schema_surface(text: &str) -> Option<SchemaSurface> {
    let mut reader = Reader::from_str(text);
    let mut surface = SchemaSurface {
        target_namespace: None,
        global_elements: Vec::new(),
    };
    let mut depth = 0usize;
    let mut saw_schema_root = false;
    loop {
        match reader.read_event().ok()? {
            Event::Start(e) => {
                collect_schema_element(&e, depth, &mut surface, &mut saw_schema_root);
                depth += 1;
            }
            Event::Empty(e) => {
                collect_schema_element(&e, depth, &mut surface, &mut saw_schema_root);
            }
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Eof => break,
            _ => {}
        }
    }
    saw_schema_root.then_some(surface)
}

fn collect_schema_element(
    e: &BytesStart<'_>,
    depth: usize,
    surface: &mut SchemaSurface,
    saw_schema_root: &mut bool,
) {
    match (depth, e.local_name().as_ref()) {
        (0, b"schema") => {
            *saw_schema_root = true;
            surface.target_namespace = attribute_value(e, b"targetNamespace");
        }
        (1, b"element") => {
            if let Some(name) = attribute_value(e, b"name") {
                surface.global_elements.push(name);
            }
        }
        _ => {}
    }
}

fn attribute_value(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .and_then(|attr| attr.unescape_value().ok())
        .map(|value| value.into_owned())
}

/// Resolve the document's root element (namespace, local name), draining
/// the reader to confirm the document is well-formed. `None` on any parse
/// error.
fn document_root(text: &str) -> Option<(Option<String>, String)> {
    let mut reader = NsReader::from_str(text);
    let root = loop {
        match reader.read_resolved_event().ok()? {
            (resolve, Event::Start(e)) | (resolve, Event::Empty(e)) => {
                let local = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                let ns = match resolve {
                    ResolveResult::Bound(ns) => {
                        Some(String::from_utf8_lossy(ns.as_ref()).into_owned())
                    }
                    _ => None,
                };
                break (ns, local);
            }
            (_, Event::Eof) => return None,
            _ => {}
        }
    };
    loop {
        if let (_, Event::Eof) = reader.read_resolved_event().ok()? {
            return Some(root);
        }
    }
}
