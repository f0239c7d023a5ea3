//! Entry Point Scanner: finds the taxonomy schemas that pull in a
//! linkbase and derives the data `taxonomyPackage.xml` needs for them.

use crate::package::collect_files_recursive;
use crate::util::find_date;
use anyhow::{Context, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fs;
use std::path::{Path, PathBuf};

/// A schema designated as a valid starting point for loading the
/// taxonomy. Produced fresh on every descriptor regeneration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint {
    /// Path relative to the package root.
    pub rel_path: PathBuf,
    /// Human-readable name: file stem with underscores hyphenated.
    pub name: String,
    /// `YYYY-MM-DD` token from the file name, when present.
    pub version: Option<String>,
    /// Published document URI: publisher base joined with `rel_path`.
    pub document_uri: String,
}

/// Scan all `.xsd` files under `root` (excluding the descriptor files)
/// and select the entry points. The result is sorted lexicographically by
/// relative path so the output is deterministic across platforms.
pub fn scan_entry_points(root: &Path, base_uri: &str) -> Result<Vec<EntryPoint>> {
    let mut entry_points = Vec::new();
    for path in collect_files_recursive(root)? {
        if path.extension().and_then(|ext| ext.to_str()) != Some("xsd") {
            continue;
        }
        let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if file_name.contains("catalog") || file_name.contains("taxonomyPackage") {
            continue;
        }
        let text =
            fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
        if !is_entry_point_schema(&text) {
            continue;
        }
        let rel_path = path
            .strip_prefix(root)
            .context("strip package root prefix")?
            .to_path_buf();
        entry_points.push(build_entry_point(rel_path, file_name, base_uri));
    }
    entry_points.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    Ok(entry_points)
}

fn build_entry_point(rel_path: PathBuf, file_name: &str, base_uri: &str) -> EntryPoint {
    let name = file_name.trim_end_matches(".xsd").replace('_', "-");
    let version = find_date(file_name).map(str::to_string);
    let rel_uri = rel_path
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    let document_uri = format!("{}/{rel_uri}", base_uri.trim_end_matches('/'));
    EntryPoint {
        rel_path,
        name,
        version,
        document_uri,
    }
}

/// True when the schema carries a `linkbase` element with `id="lnk"`
/// inside an `appinfo` block, or any `linkbaseRef`. Element names are
/// matched by local name, as the linkbase namespace prefix varies across
/// publishers. Malformed schemas are simply not entry points.
fn is_entry_point_schema(text: &str) -> bool {
    let mut reader = Reader::from_str(text);
    let mut appinfo_depth = 0usize;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if e.local_name().as_ref() == b"appinfo" {
                    appinfo_depth += 1;
                } else if is_entry_marker(&e, appinfo_depth > 0) {
                    return true;
                }
            }
            Ok(Event::Empty(e)) => {
                if is_entry_marker(&e, appinfo_depth > 0) {
                    return true;
                }
            }
            Ok(Event::End(e)) => {
                if e.local_name().as_ref() == b"appinfo" {
                    appinfo_depth = appinfo_depth.saturating_sub(1);
                }
            }
            Ok(Event::Eof) | Err(_) => return false,
            _ => {}
        }
    }
}

fn is_entry_marker(e: &BytesStart<'_>, in_appinfo: bool) -> bool {
    match e.local_name().as_ref() {
        b"linkbaseRef" => true,
        b"linkbase" if in_appinfo => e
            .attributes()
            .flatten()
            .any(|attr| attr.key.as_ref() == b"id" && attr.value.as_ref() == b"lnk"),
        _ => false,
    }
}
