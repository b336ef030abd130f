//! Plain-text list format shared by the bundled adapters
//!
//! One entry per line:
//!
//! ```text
//! 1. CITIZEN KANE (1941)
//! #2 The Godfather<TAB>year=1972<TAB>score=9.2<TAB>reviews=1,900,000
//! Avatar (2009)<TAB>gross=$2,923,706,026
//! ```
//!
//! - optional leading rank: `"<n>."`, `"<n>)"` or `"#<n>"`
//! - title, optionally ending in its year
//! - optional tab-separated `key=value` fields: `year`, `rank`, `score`,
//!   `reviews`, `gross`
//!
//! Blank lines and comment lines (`#` followed by whitespace) are skipped.

use crate::types::{AdapterError, RawEntry};
use once_cell::sync::Lazy;
use regex::Regex;

static RANK_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:#\s*(\d{1,5})[.):]?|(\d{1,5})[.)])\s+(\S.*)$").expect("valid rank pattern")
});

/// Parse one line; `None` for blank and comment lines
pub fn parse_line(source_id: &str, line: &str) -> Option<Result<RawEntry, AdapterError>> {
    let line = line.trim();
    if line.is_empty() || is_comment(line) {
        return None;
    }
    Some(parse_entry(source_id, line))
}

/// Parse a whole document, keeping line order
pub fn parse_document(source_id: &str, text: &str) -> Vec<Result<RawEntry, AdapterError>> {
    text.lines()
        .enumerate()
        .filter_map(|(index, line)| {
            parse_line(source_id, line).map(|r| {
                r.map_err(|e| match e {
                    AdapterError::Parse(msg) => {
                        AdapterError::Parse(format!("line {}: {}", index + 1, msg))
                    }
                    other => other,
                })
            })
        })
        .collect()
}

fn is_comment(line: &str) -> bool {
    let mut chars = line.chars();
    chars.next() == Some('#') && chars.next().map_or(true, char::is_whitespace)
}

fn parse_entry(source_id: &str, line: &str) -> Result<RawEntry, AdapterError> {
    let mut fields = line.split('\t');
    let display = fields.next().unwrap_or_default().trim();

    let (rank, title) = match RANK_PREFIX.captures(display) {
        Some(caps) => {
            let digits = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str());
            let rank = digits.map(|d| parse_number::<u32>("rank", d)).transpose()?;
            let title = caps.get(3).map_or(display, |m| m.as_str());
            (rank, title)
        }
        None => (None, display),
    };

    if title.is_empty() {
        return Err(AdapterError::Parse(format!("no title in '{}'", line)));
    }

    let mut entry = RawEntry::new(source_id, title.trim());
    entry.raw_rank = rank;

    for field in fields.map(str::trim).filter(|f| !f.is_empty()) {
        let (key, value) = field
            .split_once('=')
            .ok_or_else(|| AdapterError::Parse(format!("expected key=value, got '{}'", field)))?;
        let value = value.trim();
        match key.trim() {
            "year" => entry.raw_year = Some(value.to_string()),
            "rank" => entry.raw_rank = Some(parse_number("rank", value)?),
            "score" => {
                entry.raw_score = Some(parse_float("score", value.trim_end_matches('%'))?);
            }
            "reviews" => {
                entry.raw_review_count = Some(parse_number("reviews", &strip_grouping(value))?);
            }
            "gross" => {
                let amount = strip_grouping(value.trim_start_matches('$'));
                entry.raw_gross = Some(parse_float("gross", &amount)?);
            }
            other => {
                return Err(AdapterError::Parse(format!("unknown field '{}'", other)));
            }
        }
    }

    Ok(entry)
}

fn strip_grouping(value: &str) -> String {
    value.chars().filter(|c| *c != ',' && *c != '_').collect()
}

fn parse_number<T: std::str::FromStr>(field: &str, value: &str) -> Result<T, AdapterError> {
    value
        .trim()
        .parse()
        .map_err(|_| AdapterError::Parse(format!("invalid {} '{}'", field, value)))
}

fn parse_float(field: &str, value: &str) -> Result<f64, AdapterError> {
    let parsed: f64 = parse_number(field, value)?;
    if parsed.is_finite() {
        Ok(parsed)
    } else {
        Err(AdapterError::Parse(format!("invalid {} '{}'", field, value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(line: &str) -> RawEntry {
        parse_line("test", line).unwrap().unwrap()
    }

    #[test]
    fn test_plain_title() {
        let e = entry("The Godfather (1972)");
        assert_eq!(e.raw_title, "The Godfather (1972)");
        assert_eq!(e.raw_rank, None);
        assert_eq!(e.source_id, "test");
    }

    #[test]
    fn test_rank_prefixes() {
        let e = entry("1. CITIZEN KANE (1941)");
        assert_eq!(e.raw_rank, Some(1));
        assert_eq!(e.raw_title, "CITIZEN KANE (1941)");

        assert_eq!(entry("#12 Jaws (1975)").raw_rank, Some(12));
        assert_eq!(entry("3) Alien (1979)").raw_rank, Some(3));
    }

    #[test]
    fn test_numeric_titles_are_not_ranks() {
        let e = entry("1917 (2019)");
        assert_eq!(e.raw_rank, None);
        assert_eq!(e.raw_title, "1917 (2019)");

        let e = entry("2001: A Space Odyssey (1968)");
        assert_eq!(e.raw_rank, None);
    }

    #[test]
    fn test_metadata_fields() {
        let e = entry("2. Avatar\tyear=2009\tscore=82%\treviews=1,300\tgross=$2,923,706,026");
        assert_eq!(e.raw_rank, Some(2));
        assert_eq!(e.raw_title, "Avatar");
        assert_eq!(e.raw_year.as_deref(), Some("2009"));
        assert_eq!(e.raw_score, Some(82.0));
        assert_eq!(e.raw_review_count, Some(1300));
        assert_eq!(e.raw_gross, Some(2_923_706_026.0));
    }

    #[test]
    fn test_rank_field_overrides_prefix() {
        assert_eq!(entry("1. Jaws (1975)\trank=7").raw_rank, Some(7));
    }

    #[test]
    fn test_blank_and_comment_lines_skipped() {
        assert!(parse_line("test", "   ").is_none());
        assert!(parse_line("test", "# top 100 as of 2020").is_none());
        assert!(parse_line("test", "#").is_none());
    }

    #[test]
    fn test_bad_fields_are_parse_errors() {
        for line in ["Jaws (1975)\tscore=high", "Jaws (1975)\tcolor=blue", "Jaws (1975)\tnokey"] {
            let result = parse_line("test", line).unwrap();
            assert!(matches!(result, Err(AdapterError::Parse(_))), "line {:?}", line);
        }
    }

    #[test]
    fn test_document_keeps_order_and_numbers_errors() {
        let doc = "# header\n1. Alien (1979)\n\nJaws (1975)\tscore=x\n3. Vertigo (1958)\n";

        let parsed = parse_document("afi", doc);

        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[0].as_ref().unwrap().raw_title, "Alien (1979)");
        match &parsed[1] {
            Err(AdapterError::Parse(msg)) => assert!(msg.starts_with("line 4:"), "{}", msg),
            other => panic!("expected parse error, got {:?}", other),
        }
        assert_eq!(parsed[2].as_ref().unwrap().raw_rank, Some(3));
    }
}
