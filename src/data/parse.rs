use std::fs;
use std::io::Cursor;
use std::path::Path;

use anyhow::{Context, Result};
use csv::{Reader, ReaderBuilder, Trim};

const BOM: char = '\u{feff}';

/// Cell spellings that mean "no value" in the upstream exports.
const MISSING: &[&str] = &["", "nan", "none", "null", "n/a", "-", "—", "--"];

fn clean(raw: &str) -> Option<String> {
    let s = raw.trim_start_matches(BOM).trim();
    if MISSING.iter().any(|m| s.eq_ignore_ascii_case(m)) {
        return None;
    }
    let s: String = s
        .chars()
        .filter(|c| *c != ',' && *c != '円' && *c != '倍' && *c != '%' && !c.is_whitespace())
        .collect();
    let s = s.strip_prefix('+').unwrap_or(&s).to_string();
    if s.is_empty() { None } else { Some(s) }
}

/// Parse a numeric cell leniently: `"1,234円"`, `"+2.5"`, `"nan"` -> None.
pub fn parse_number(raw: &str) -> Option<f64> {
    let s = clean(raw)?;
    let v: f64 = s.parse().ok()?;
    v.is_finite().then_some(v)
}

/// Parse a percentage cell; the value stays in percent units (`"+3.5%"` -> 3.5).
pub fn parse_percent(raw: &str) -> Option<f64> {
    parse_number(raw)
}

/// Open a CSV file with the BOM removed, fields trimmed and ragged rows tolerated.
pub fn read_csv_bytes(path: &Path) -> Result<Reader<Cursor<Vec<u8>>>> {
    let mut bytes =
        fs::read(path).with_context(|| format!("failed to open input file: {:?}", path))?;
    if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        bytes.drain(..3);
    }
    Ok(ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .flexible(true)
        .from_reader(Cursor::new(bytes)))
}
