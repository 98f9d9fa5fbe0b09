//! Parsing of cell literals into typed values
//!
//! Cells arrive as loose text; every conversion from text into an integer,
//! float, bool, date or duration goes through this module so inference,
//! encoding and decoding agree on one set of rules.

use chrono::NaiveDateTime;
use regex::Regex;

use crate::error::{Result, SheetCfgError};

static INT_PATTERN: std::sync::LazyLock<Regex> = std::sync::LazyLock::new(|| {
    Regex::new(r"^[+-]?\d+(\.0+)?$").expect("Valid integer literal regex pattern")
});

static FRACTION_PATTERN: std::sync::LazyLock<Regex> = std::sync::LazyLock::new(|| {
    Regex::new(r"\.\d*$").expect("Valid fraction suffix regex pattern")
});

static LIST_SEPARATOR: std::sync::LazyLock<Regex> = std::sync::LazyLock::new(|| {
    Regex::new(r"\s*[;\x{ff1b}]\s*").expect("Valid list separator regex pattern")
});

static DURATION_SEPARATOR: std::sync::LazyLock<Regex> = std::sync::LazyLock::new(|| {
    Regex::new(r"\s*[:\x{ff1a}]\s*").expect("Valid duration separator regex pattern")
});

static DATE_PATTERN: std::sync::LazyLock<Regex> = std::sync::LazyLock::new(|| {
    Regex::new(r"^\d{4}(-\d{2})+ \d{2}(:\d{2})+$").expect("Valid date literal regex pattern")
});

/// Format of date cells
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Whether the text is an integer, allowing a `.0` suffix from numeric cells
#[must_use]
pub fn is_int(v: &str) -> bool {
    INT_PATTERN.is_match(v.trim())
}

/// Parse an integer, dropping any fractional part; empty text is zero
pub fn parse_int(v: &str) -> Result<i128> {
    let v = v.trim();
    if v.is_empty() {
        return Ok(0);
    }
    let whole = FRACTION_PATTERN.replace(v, "");
    let whole = whole.strip_prefix('+').unwrap_or(&*whole);
    whole
        .parse::<i128>()
        .map_err(|_| SheetCfgError::malformed(v, "integer"))
}

/// Parse a float; empty text is zero
pub fn parse_float(v: &str) -> Result<f64> {
    let v = v.trim();
    if v.is_empty() {
        return Ok(0.0);
    }
    v.parse::<f64>()
        .map_err(|_| SheetCfgError::malformed(v, "number"))
}

/// Numbers are true when non-zero, text when it reads `true`
pub fn parse_bool(v: &str) -> Result<bool> {
    let v = v.trim();
    if v.is_empty() {
        return Ok(false);
    }
    if is_int(v) {
        return Ok(parse_int(v)? != 0);
    }
    Ok(v.eq_ignore_ascii_case("true"))
}

/// Drop a trailing `.0` from integral text
#[must_use]
pub fn normalize_int_text(v: &str) -> String {
    let v = v.trim();
    if is_int(v) {
        FRACTION_PATTERN.replace(v, "").into_owned()
    } else {
        v.to_string()
    }
}

/// Split a repeated-field cell on `;` or the full-width `；`
#[must_use]
pub fn split_list(v: &str) -> Vec<String> {
    let v = v.trim();
    if v.is_empty() {
        return Vec::new();
    }
    LIST_SEPARATOR
        .split(v)
        .map(normalize_int_text)
        .collect()
}

/// Parse `YYYY-MM-DD HH:MM:SS` in a zone `time_zone` hours east of UTC into
/// Unix seconds, clamped to the unsigned 32-bit range
pub fn parse_date(v: &str, time_zone: f64) -> Result<u32> {
    let v = v.trim();
    if v.is_empty() {
        return Ok(0);
    }
    if !DATE_PATTERN.is_match(v) {
        return Err(SheetCfgError::malformed(v, "date as YYYY-MM-DD HH:MM:SS"));
    }
    let local = NaiveDateTime::parse_from_str(v, DATE_FORMAT)
        .map_err(|_| SheetCfgError::malformed(v, "date as YYYY-MM-DD HH:MM:SS"))?;
    #[allow(clippy::cast_possible_truncation)]
    let offset = (time_zone * 3600.0).round() as i64;
    let seconds = local.and_utc().timestamp() - offset;
    Ok(clamp_u32(i128::from(seconds)))
}

/// Render Unix seconds back into local date text
#[must_use]
pub fn format_date(seconds: u32, time_zone: f64) -> String {
    #[allow(clippy::cast_possible_truncation)]
    let offset = (time_zone * 3600.0).round() as i64;
    chrono::DateTime::from_timestamp(i64::from(seconds) + offset, 0)
        .map(|d| d.naive_utc().format(DATE_FORMAT).to_string())
        .unwrap_or_default()
}

/// Parse `[[[d:]h:]m:]s` into seconds, clamped to the unsigned 32-bit range
pub fn parse_duration(v: &str) -> Result<u32> {
    const FACTORS: [i128; 4] = [1, 60, 3600, 86400];
    let v = v.trim();
    if v.is_empty() {
        return Ok(0);
    }
    let components = DURATION_SEPARATOR.split(v).collect::<Vec<_>>();
    if components.len() > FACTORS.len() {
        return Err(SheetCfgError::malformed(v, "duration with at most 4 components"));
    }
    let mut total = 0_i128;
    for (component, factor) in components.iter().rev().zip(FACTORS) {
        let n = parse_int(component).map_err(|_| SheetCfgError::malformed(v, "duration"))?;
        total += n * factor;
    }
    Ok(clamp_u32(total))
}

fn clamp_u32(v: i128) -> u32 {
    u32::try_from(v.clamp(0, i128::from(u32::MAX))).unwrap_or(u32::MAX)
}

/// Camel-case an identifier for record type names
///
/// The first letter and every letter after `_` are uppercased; underscores
/// are dropped and other letters keep their case, so `HPMax` stays `HPMax`.
/// With `lower_uppercase`, an all-uppercase name such as a sheet name is
/// lowered first so that `ITEM_LIST` becomes `ItemList`.
#[must_use]
pub fn make_camel(v: &str, lower_uppercase: bool) -> String {
    let v = v.trim();
    let lowered;
    let v = if lower_uppercase && is_all_uppercase(v) {
        lowered = v.to_lowercase();
        lowered.as_str()
    } else {
        v
    };
    let mut name = String::with_capacity(v.len());
    let mut upper_next = true;
    for c in v.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            name.extend(c.to_uppercase());
            upper_next = false;
        } else {
            name.push(c);
        }
    }
    name
}

fn is_all_uppercase(v: &str) -> bool {
    v.chars().any(char::is_uppercase) && !v.chars().any(char::is_lowercase)
}

/// Spreadsheet column label for a zero-based index (`0` is `A`, `27` is `AB`)
#[must_use]
pub fn column_label(mut index: usize) -> String {
    let mut label = Vec::new();
    loop {
        let rem = u8::try_from(index % 26).unwrap_or(0);
        label.push(char::from(b'A' + rem));
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    label.iter().rev().collect()
}

/// Cell reference such as `C3` for a zero-based row and column
#[must_use]
pub fn cell_label(row: usize, col: usize) -> String {
    format!("{}{}", column_label(col), row + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_literals() {
        assert!(is_int("12"));
        assert!(is_int("-3.0"));
        assert!(!is_int("1.5"));
        assert_eq!(parse_int("7.0").unwrap(), 7);
        assert_eq!(parse_int("+9").unwrap(), 9);
        assert_eq!(parse_int("2.75").unwrap(), 2);
        assert_eq!(parse_int("").unwrap(), 0);
        assert!(parse_int("ten").is_err());
    }

    #[test]
    fn test_bool_literals() {
        assert!(parse_bool("1").unwrap());
        assert!(parse_bool("TRUE").unwrap());
        assert!(!parse_bool("0").unwrap());
        assert!(!parse_bool("no").unwrap());
        assert!(!parse_bool("").unwrap());
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list("10;20 ; 30"), vec!["10", "20", "30"]);
        assert_eq!(split_list("a\u{ff1b}b"), vec!["a", "b"]);
        assert_eq!(split_list("1.0;2"), vec!["1", "2"]);
        assert!(split_list("  ").is_empty());
    }

    #[test]
    fn test_date_with_time_zone() {
        assert_eq!(parse_date("1970-01-01 08:00:00", 8.0).unwrap(), 0);
        assert_eq!(parse_date("1970-01-02 00:00:00", 0.0).unwrap(), 86400);
        assert_eq!(parse_date("1960-01-01 00:00:00", 0.0).unwrap(), 0);
        assert!(parse_date("2020/01/01", 8.0).is_err());
        assert!(parse_date("2020-13-01 00:00:00", 8.0).is_err());
    }

    #[test]
    fn test_format_date_inverts_parse() {
        let seconds = parse_date("2021-06-30 12:34:56", 8.0).unwrap();
        assert_eq!(format_date(seconds, 8.0), "2021-06-30 12:34:56");
    }

    #[test]
    fn test_duration() {
        assert_eq!(parse_duration("45").unwrap(), 45);
        assert_eq!(parse_duration("2:30").unwrap(), 150);
        assert_eq!(parse_duration("1:00:00").unwrap(), 3600);
        assert_eq!(parse_duration("1:1:1:1").unwrap(), 86400 + 3600 + 60 + 1);
        assert_eq!(parse_duration("1\u{ff1a}05").unwrap(), 65);
        assert!(parse_duration("1:2:3:4:5").is_err());
    }

    #[test]
    fn test_camel_case() {
        assert_eq!(make_camel("ITEM", true), "Item");
        assert_eq!(make_camel("ITEM_LIST", true), "ItemList");
        assert_eq!(make_camel("HERO_2", true), "Hero2");
        assert_eq!(make_camel("item_list", false), "ItemList");
        assert_eq!(make_camel("reward", false), "Reward");
        assert_eq!(make_camel("HPMax", false), "HPMax");
        assert_eq!(make_camel("max_HP", false), "MaxHP");
        assert_eq!(make_camel("HP", false), "HP");
        assert_eq!(make_camel("hero2x", true), "Hero2x");
    }

    #[test]
    fn test_column_labels() {
        assert_eq!(column_label(0), "A");
        assert_eq!(column_label(25), "Z");
        assert_eq!(column_label(26), "AA");
        assert_eq!(column_label(27), "AB");
        assert_eq!(column_label(701), "ZZ");
        assert_eq!(column_label(702), "AAA");
        assert_eq!(cell_label(1, 2), "C2");
    }
}
