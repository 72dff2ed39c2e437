use anyhow::{Context, Result};
use csv::ReaderBuilder;
use encoding_rs::WINDOWS_1252;
use std::io::Cursor;

use crate::process::utils::{clean_str, normalize_header};

/// An untyped sheet: a header row plus data rows of raw cell text.
/// An empty string stands for a missing cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    /// Column names from the first row of the sheet, trimmed.
    pub headers: Vec<String>,
    /// Every following row, padded to the header width.
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Build a table from rows of cell text; the first row is the header.
    pub fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = Vec<String>>,
    {
        let mut rows = rows.into_iter();
        let headers: Vec<String> = match rows.next() {
            Some(first) => first
                .iter()
                .enumerate()
                .map(|(i, h)| normalize_header(h, i))
                .collect(),
            None => return Self::default(),
        };

        let mut table = Self::new(headers, Vec::new());
        for row in rows {
            table.push_row(row);
        }
        table
    }

    /// Parse CSV bytes: first record is the header, the rest is data.
    /// Ragged rows are tolerated; short rows are padded and long rows widen
    /// the header with `unnamed_<n>` columns. Fields that are not valid
    /// UTF-8 are read as Windows-1252.
    pub fn from_csv_bytes(data: &[u8]) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(Cursor::new(data));

        let mut rows = Vec::new();
        for (idx, result) in rdr.byte_records().enumerate() {
            let record = result.with_context(|| format!("CSV parse error at record {}", idx))?;
            rows.push(record.iter().map(decode_field).collect::<Vec<String>>());
        }
        Ok(Self::from_rows(rows))
    }

    fn push_row(&mut self, mut row: Vec<String>) {
        while self.headers.len() < row.len() {
            let idx = self.headers.len();
            self.headers.push(normalize_header("", idx));
            for existing in &mut self.rows {
                existing.push(String::new());
            }
        }
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
    }

    /// True when there is nothing to reshape.
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() || self.rows.is_empty()
    }

    /// Drop rows whose cells are all blank, then columns whose data cells are
    /// all blank. Headers do not count as data.
    pub fn drop_empty(&self) -> RawTable {
        let rows: Vec<&Vec<String>> = self
            .rows
            .iter()
            .filter(|r| r.iter().any(|c| !is_blank(c)))
            .collect();

        let keep: Vec<usize> = (0..self.headers.len())
            .filter(|&i| rows.iter().any(|r| r.get(i).is_some_and(|c| !is_blank(c))))
            .collect();

        RawTable {
            headers: keep.iter().map(|&i| self.headers[i].clone()).collect(),
            rows: rows
                .into_iter()
                .map(|r| keep.iter().map(|&i| r[i].clone()).collect())
                .collect(),
        }
    }
}

fn decode_field(bytes: &[u8]) -> String {
    let text = match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => WINDOWS_1252.decode_without_bom_handling(bytes).0.into_owned(),
    };
    match text.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => text,
    }
}

fn is_blank(cell: &str) -> bool {
    clean_str(cell).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_header_and_rows() -> Result<()> {
        let t = RawTable::from_csv_bytes(b" Series ,2020,2021\nGDP,1.5,2.0\nCPI,,3\n")?;
        assert_eq!(t.headers, vec!["Series", "2020", "2021"]);
        assert_eq!(t.rows.len(), 2);
        assert_eq!(t.rows[1], vec!["CPI", "", "3"]);
        Ok(())
    }

    #[test]
    fn ragged_rows_are_padded_and_widened() -> Result<()> {
        let t = RawTable::from_csv_bytes(b"a,b\n1\n1,2,3\n")?;
        assert_eq!(t.headers, vec!["a", "b", "unnamed_2"]);
        assert_eq!(t.rows[0], vec!["1", "", ""]);
        assert_eq!(t.rows[1], vec!["1", "2", "3"]);
        Ok(())
    }

    #[test]
    fn non_utf8_fields_read_as_windows_1252() -> Result<()> {
        let t = RawTable::from_csv_bytes(b"Series,2024\nReceipts \xA3 bn,171\n")?;
        assert_eq!(t.rows.len(), 1);
        assert_eq!(t.rows[0][0], "Receipts \u{a3} bn");
        assert_eq!(t.rows[0][1], "171");
        Ok(())
    }

    #[test]
    fn utf8_bom_is_not_part_of_the_first_header() -> Result<()> {
        let t = RawTable::from_csv_bytes(b"\xEF\xBB\xBFSeries,2024\nGDP,1\n")?;
        assert_eq!(t.headers, vec!["Series", "2024"]);
        Ok(())
    }

    #[test]
    fn from_rows_takes_the_first_row_as_header() {
        let t = RawTable::from_rows(vec![
            vec!["id".to_string(), "".to_string()],
            vec!["a".to_string(), "1".to_string(), "2".to_string()],
        ]);
        assert_eq!(t.headers, vec!["id", "unnamed_1", "unnamed_2"]);
        assert_eq!(t.rows, vec![vec!["a", "1", "2"]]);
        assert!(RawTable::from_rows(Vec::new()).is_empty());
    }

    #[test]
    fn empty_input_is_an_empty_table() -> Result<()> {
        let t = RawTable::from_csv_bytes(b"")?;
        assert!(t.is_empty());
        let header_only = RawTable::from_csv_bytes(b"a,b\n")?;
        assert!(header_only.is_empty());
        Ok(())
    }

    #[test]
    fn drop_empty_removes_blank_rows_and_columns() {
        let t = RawTable::new(
            vec!["id".into(), "blank".into(), "2020".into()],
            vec![
                vec!["x".into(), "".into(), "1".into()],
                vec!["".into(), "  ".into(), "".into()],
                vec!["y".into(), "".into(), "2".into()],
            ],
        );
        let cleaned = t.drop_empty();
        assert_eq!(cleaned.headers, vec!["id", "2020"]);
        assert_eq!(cleaned.rows.len(), 2);
        assert_eq!(cleaned.rows[1], vec!["y", "2"]);
    }

    #[test]
    fn all_blank_table_cleans_to_empty() {
        let t = RawTable::new(
            vec!["a".into(), "b".into()],
            vec![vec!["".into(), "".into()]],
        );
        assert!(t.drop_empty().is_empty());
    }
}
