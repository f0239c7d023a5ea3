//! Ordered path-rewrite rules that absolutize relative IFRS taxonomy
//! references.
//!
//! Rules are evaluated most-specific-first (deepest relative prefix before
//! shallower ones) so a deep reference is never partially matched by a
//! shallow rule. A reference matching no rule is left byte-for-byte
//! unchanged.

use crate::util::find_date;
use regex::{Captures, Regex};
use std::sync::OnceLock;

const IFRS_TAXONOMY_BASE: &str = "https://xbrl.ifrs.org/taxonomy";

/// Sub-taxonomies of the IFRS dependency observed in published packages.
const SUB_TAXONOMIES: [&str; 3] = ["full_ifrs", "ifrs_for_smes", "deprecated"];

/// Relative depths of locator references into the embedded `def/ifrs`
/// copy, deepest first.
const LOCATOR_DEPTHS: [&str; 3] = ["../../../../..", "../../../..", "../../.."];

/// Relative depths of `schemaLocation` references, deepest first.
const SCHEMA_DEPTHS: [&str; 2] = ["../../../..", "../.."];

/// Rewrite a locator href into an absolute IFRS dependency URI. The
/// version date is taken from the reference itself; a reference matching
/// no rule, or carrying no date, is left unchanged.
pub fn absolutize_locator(href: &str) -> Option<String> {
    absolutize(href, &LOCATOR_DEPTHS, |depth, sub| {
        href.starts_with(depth) && href.contains(&format!("/def/ifrs/{sub}"))
    })
}

/// Rewrite a `schemaLocation` value into an absolute IFRS dependency URI.
pub fn absolutize_schema_location(value: &str) -> Option<String> {
    absolutize(value, &SCHEMA_DEPTHS, |depth, sub| {
        value.starts_with(&format!("{depth}/def/ifrs/{sub}"))
    })
}

fn absolutize(
    reference: &str,
    depths: &[&str],
    matches: impl Fn(&str, &str) -> bool,
) -> Option<String> {
    for depth in depths {
        for sub in SUB_TAXONOMIES {
            if !matches(depth, sub) {
                continue;
            }
            let date = find_date(reference)?;
            let from = format!("{depth}/def/ifrs");
            let to = format!("{IFRS_TAXONOMY_BASE}/{date}");
            return Some(reference.replacen(&from, &to, 1));
        }
    }
    None
}

/// Residual cleanup: a reference still carrying a bare sub-taxonomy
/// segment behind leading `../` segments (which the absolutize pass did
/// not catch) gets the leading relative segments stripped so it resolves
/// against the new absolute base.
pub fn strip_residual_relative(href: &str) -> Option<String> {
    if !href.starts_with("../") {
        return None;
    }
    let has_bare_segment = SUB_TAXONOMIES
        .iter()
        .any(|sub| href.contains(&format!("/{sub}/")));
    if !has_bare_segment {
        return None;
    }
    let mut rest = href;
    while let Some(stripped) = rest.strip_prefix("../") {
        rest = stripped;
    }
    Some(rest.to_string())
}

fn href_attr() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"xlink:href="([^"]*)""#).expect("static pattern"))
}

fn schema_location_attr() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"schemaLocation="([^"]*)""#).expect("static pattern"))
}

/// Apply both locator passes (absolutize, then residual cleanup) to every
/// `xlink:href` in a linkbase document. Returns the rewritten text only
/// when something changed.
pub fn rewrite_locator_hrefs(xml: &str) -> Option<String> {
    rewrite_attr_values(xml, href_attr(), "xlink:href", |href| {
        absolutize_locator(href).or_else(|| strip_residual_relative(href))
    })
}

/// Apply the schema rules to every `schemaLocation` attribute in a schema
/// document. Returns the rewritten text only when something changed.
pub fn rewrite_schema_locations(xsd: &str) -> Option<String> {
    rewrite_attr_values(
        xsd,
        schema_location_attr(),
        "schemaLocation",
        absolutize_schema_location,
    )
}

fn rewrite_attr_values(
    text: &str,
    attr: &Regex,
    attr_name: &str,
    rule: impl Fn(&str) -> Option<String>,
) -> Option<String> {
    let mut changed = false;
    let rewritten = attr.replace_all(text, |caps: &Captures<'_>| match rule(&caps[1]) {
        Some(fixed) => {
            changed = true;
            format!("{attr_name}=\"{fixed}\"")
        }
        None => caps[0].to_string(),
    });
    changed.then(|| rewritten.into_owned())
}
