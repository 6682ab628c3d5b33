// Cell cleanup shared by the importer and the lookup validator.
// The register spreadsheet mixes ASCII and Persian-script digits, and share
// counts show up as integers, integral floats ("500.0") or grouped numbers
// ("1,500" / "۱٬۵۰۰"), so everything funnels through here first.

/// Map Persian (U+06F0..U+06F9) and Arabic-Indic (U+0660..U+0669) digits to
/// ASCII `0-9`, leaving every other character untouched.
pub fn normalize_digits(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            '\u{06F0}'..='\u{06F9}' => char::from(b'0' + (c as u32 - 0x06F0) as u8),
            '\u{0660}'..='\u{0669}' => char::from(b'0' + (c as u32 - 0x0660) as u8),
            _ => c,
        })
        .collect()
}

/// Clean a national-code cell: trim and normalize the digit script.
/// Returns `None` for an empty cell. The code stays text: leading zeros are
/// preserved and no length or digit rule is applied at import time.
pub fn clean_code(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(normalize_digits(trimmed))
}

/// Coerce a share-count cell to a non-negative integer.
///
/// Accepts plain integers, integral floats ("500.0", the spreadsheet's
/// favorite rendering of a numeric cell) and grouped digits ("1,500",
/// "۱٬۵۰۰"). Returns `None` for anything else: empty cells, non-numeric
/// text, fractional or negative values.
pub fn parse_share_count(raw: &str) -> Option<i64> {
    let normalized = normalize_digits(raw.trim());
    let cleaned: String = normalized
        .chars()
        .filter(|c| *c != ',' && *c != '\u{066C}')
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let value = match cleaned.parse::<i64>() {
        Ok(n) => n,
        Err(_) => {
            // Numeric cells exported through a float formatter ("500.0").
            let f = cleaned.parse::<f64>().ok()?;
            if !f.is_finite() || f.fract() != 0.0 || f < i64::MIN as f64 || f > i64::MAX as f64 {
                return None;
            }
            f as i64
        }
    };

    if value < 0 {
        return None;
    }
    Some(value)
}
