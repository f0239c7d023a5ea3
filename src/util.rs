//! Small shared helpers for version and date extraction.

use regex::Regex;
use std::sync::OnceLock;

/// First `YYYY-MM-DD` match in `text`.
pub fn find_date(text: &str) -> Option<&str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\d{4}-\d{2}-\d{2}").expect("static pattern"));
    re.find(text).map(|m| m.as_str())
}

/// First `YYYY-MM` match in `text`.
pub fn find_year_month(text: &str) -> Option<&str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\d{4}-\d{2}").expect("static pattern"));
    re.find(text).map(|m| m.as_str())
}

/// First `YYYY` match in `text`.
pub fn find_year(text: &str) -> Option<&str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\d{4}").expect("static pattern"));
    re.find(text).map(|m| m.as_str())
}

/// Most specific version token present in `text`: a full date, then a
/// year-month pair, then a bare year.
pub fn extract_version(text: &str) -> Option<&str> {
    find_date(text)
        .or_else(|| find_year_month(text))
        .or_else(|| find_year(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_most_specific_version_token() {
        assert_eq!(extract_version("CMF-CL-CI-2020-01-02"), Some("2020-01-02"));
        assert_eq!(extract_version("pkg-2021-07"), Some("2021-07"));
        assert_eq!(extract_version("ALL_20221101"), Some("2022"));
        assert_eq!(extract_version("no-version-here"), None);
    }

    #[test]
    fn finds_date_inside_reference() {
        assert_eq!(
            find_date("../../../def/ifrs/full_ifrs/full_ifrs-cor_2021-03-24.xsd"),
            Some("2021-03-24")
        );
        assert_eq!(find_date("plain.xsd"), None);
    }
}
