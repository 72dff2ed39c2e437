/// Trim whitespace + strip outer quotes if present.
pub fn clean_str(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].trim().to_string()
    } else {
        trimmed.to_string()
    }
}

/// Trimmed header text; blank headers get a positional placeholder.
pub fn normalize_header(raw: &str, idx: usize) -> String {
    let cleaned = clean_str(raw);
    if cleaned.is_empty() {
        format!("unnamed_{}", idx)
    } else {
        cleaned
    }
}

/// Coerce a cell to a number. Thousands separators are ignored; anything
/// that still fails to parse, or parses to NaN, is a missing value.
pub fn parse_value(raw: &str) -> Option<f64> {
    let cleaned = clean_str(raw).replace(',', "");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| !v.is_nan())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_str_strips_quotes_and_space() {
        assert_eq!(clean_str("  \" 2024 \"  "), "2024");
        assert_eq!(clean_str("\""), "\"");
        assert_eq!(clean_str("plain"), "plain");
    }

    #[test]
    fn blank_headers_get_placeholders() {
        assert_eq!(normalize_header("  ", 3), "unnamed_3");
        assert_eq!(normalize_header(" 2020 ", 1), "2020");
    }

    #[test]
    fn parse_value_coerces_or_gives_none() {
        assert_eq!(parse_value("1.25"), Some(1.25));
        assert_eq!(parse_value(" -3 "), Some(-3.0));
        assert_eq!(parse_value("1,234.5"), Some(1234.5));
        assert_eq!(parse_value("\"7\""), Some(7.0));
        assert_eq!(parse_value(""), None);
        assert_eq!(parse_value("n/a"), None);
        assert_eq!(parse_value(".."), None);
        assert_eq!(parse_value("NaN"), None);
    }
}
