/// Guess a unit label for `canonical` from its sheet/series text.
/// Returns an empty string when nothing matches; callers keep whatever
/// unit the row already carries in that case.
pub fn infer_units(canonical: &str, text: &str) -> &'static str {
    let t = text.to_lowercase();
    if t.contains("% of gdp") || canonical.ends_with("_gdp") {
        "percent_gdp"
    } else if ["£", " bn", "billion"].iter().any(|k| t.contains(k))
        || canonical.ends_with("_bn_gbp")
    {
        "bn_gbp"
    } else if t.contains("index") || canonical.ends_with("_index") {
        "index"
    } else {
        ""
    }
}
