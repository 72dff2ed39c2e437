// src/config/mapping.rs

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::PipelineError;

/// How `sheet_match` / `series_match` patterns are anchored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Must match starting at the first character.
    #[default]
    Prefix,
    /// Must match the whole string.
    Full,
    /// May match anywhere.
    Search,
}

impl MatchMode {
    pub fn compile(self, pattern: &str) -> Result<Regex, regex::Error> {
        match self {
            MatchMode::Prefix => Regex::new(&format!(r"\A(?:{})", pattern)),
            MatchMode::Full => Regex::new(&format!(r"\A(?:{})\z", pattern)),
            MatchMode::Search => Regex::new(pattern),
        }
    }
}

/// Which ingested field `sheet_match` is tested against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetField {
    #[default]
    Subvariable,
    SourceSeriesId,
}

/// One entry of `mapping.yml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRule {
    pub canonical: String,
    pub source_file: String,
    pub sheet_match: String,
    pub series_match: String,
    #[serde(default)]
    pub match_mode: MatchMode,
    #[serde(default)]
    pub sheet_field: SheetField,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingDocument {
    #[serde(default)]
    pub mappings: Vec<MappingRule>,
}

impl MappingDocument {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| PipelineError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path)
    }

    pub fn parse(text: &str, origin: &Path) -> Result<Self, PipelineError> {
        // an empty document has no rules
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).map_err(|source| PipelineError::ConfigParse {
            path: origin.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"
mappings:
  - canonical: psnd_gdp
    source_file: Aggregates_Detailed_forecast_tables_March_2025.xlsx
    sheet_match: "^1\\.6"
    series_match: "(?i)public sector net debt"
  - canonical: cpi_index
    source_file: mm23.xlsx
    sheet_match: "D7BT"
    series_match: ".*"
    match_mode: search
    sheet_field: source_series_id
"#;

    #[test]
    fn parses_rules_with_defaults() -> anyhow::Result<()> {
        let doc = MappingDocument::parse(DOC, Path::new("mapping.yml"))?;
        assert_eq!(doc.mappings.len(), 2);
        assert_eq!(doc.mappings[0].canonical, "psnd_gdp");
        assert_eq!(doc.mappings[0].match_mode, MatchMode::Prefix);
        assert_eq!(doc.mappings[0].sheet_field, SheetField::Subvariable);
        assert_eq!(doc.mappings[1].match_mode, MatchMode::Search);
        assert_eq!(doc.mappings[1].sheet_field, SheetField::SourceSeriesId);
        Ok(())
    }

    #[test]
    fn missing_field_is_a_config_error() {
        let bad = "mappings:\n  - canonical: x\n    source_file: a.zip\n    sheet_match: s\n";
        let err = MappingDocument::parse(bad, Path::new("mapping.yml")).unwrap_err();
        assert!(matches!(err, PipelineError::ConfigParse { .. }));
        assert!(err.to_string().contains("series_match"));
    }

    #[test]
    fn empty_or_keyless_documents_have_no_rules() -> anyhow::Result<()> {
        assert!(MappingDocument::parse("", Path::new("m.yml"))?.mappings.is_empty());
        assert!(MappingDocument::parse("other: 1\n", Path::new("m.yml"))?
            .mappings
            .is_empty());
        Ok(())
    }

    #[test]
    fn match_modes_anchor_differently() -> anyhow::Result<()> {
        let prefix = MatchMode::Prefix.compile("1\\.6")?;
        assert!(prefix.is_match("1.6 Net debt"));
        assert!(!prefix.is_match("Table 1.6"));

        let full = MatchMode::Full.compile("1\\.6|2\\.1")?;
        assert!(full.is_match("2.1"));
        assert!(!full.is_match("2.10"));

        let search = MatchMode::Search.compile("1\\.6")?;
        assert!(search.is_match("Table 1.6"));
        Ok(())
    }
}
