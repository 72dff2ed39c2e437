// src/process/reshape.rs

use serde::{Deserialize, Serialize};

use crate::period::PeriodHeaders;
use crate::process::raw_table::RawTable;
use crate::process::utils::{clean_str, parse_value};

/// Second-column headers that mark an extra categorical identifier.
pub const IDENTIFIER_VOCABULARY: [&str; 7] = [
    "series",
    "descriptor",
    "description",
    "measure",
    "sector",
    "component",
    "table",
];

/// Column indices split by role. Columns in neither list are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnRoles {
    pub identifiers: Vec<usize>,
    pub measurements: Vec<usize>,
}

/// Decides which columns of a sheet identify a series and which hold
/// per-period measurements, from the headers alone.
pub trait ColumnClassifier {
    fn classify(&self, headers: &[String]) -> ColumnRoles;
}

impl<F> ColumnClassifier for F
where
    F: Fn(&[String]) -> ColumnRoles,
{
    fn classify(&self, headers: &[String]) -> ColumnRoles {
        self(headers)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// First column is the series id, plus the second one when its header is
    /// in [`IDENTIFIER_VOCABULARY`]. Without period headers every remaining
    /// column is melted.
    Leading,
    /// Period headers are measurements; the first `identifiers` other columns
    /// identify the series. Without period headers nothing is melted.
    PeriodSplit,
}

/// Per-document layout, as written in the pipeline config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Layout {
    pub strategy: Strategy,
    pub quarters: bool,
    pub months: bool,
    pub identifiers: usize,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            strategy: Strategy::Leading,
            quarters: true,
            months: true,
            identifiers: 2,
        }
    }
}

impl Layout {
    pub fn period_headers(&self) -> PeriodHeaders {
        PeriodHeaders {
            quarters: self.quarters,
            months: self.months,
        }
    }
}

impl ColumnClassifier for Layout {
    fn classify(&self, headers: &[String]) -> ColumnRoles {
        let periods = self.period_headers();
        match self.strategy {
            Strategy::Leading => {
                if headers.is_empty() {
                    return ColumnRoles::default();
                }
                let mut identifiers = vec![0];
                if headers.len() > 1
                    && IDENTIFIER_VOCABULARY.contains(&headers[1].to_lowercase().as_str())
                {
                    identifiers.push(1);
                }
                let rest: Vec<usize> = (0..headers.len())
                    .filter(|i| !identifiers.contains(i))
                    .collect();
                let period_like: Vec<usize> = rest
                    .iter()
                    .copied()
                    .filter(|&i| periods.matches(&headers[i]))
                    .collect();
                let measurements = if period_like.is_empty() {
                    rest
                } else {
                    period_like
                };
                ColumnRoles {
                    identifiers,
                    measurements,
                }
            }
            Strategy::PeriodSplit => {
                let measurements: Vec<usize> = (0..headers.len())
                    .filter(|&i| periods.matches(&headers[i]))
                    .collect();
                let identifiers = (0..headers.len())
                    .filter(|i| !measurements.contains(i))
                    .take(self.identifiers)
                    .collect();
                ColumnRoles {
                    identifiers,
                    measurements,
                }
            }
        }
    }
}

/// One melted cell.
#[derive(Debug, Clone, PartialEq)]
pub struct LongRow {
    pub identifiers: Vec<String>,
    pub period: String,
    pub value: Option<f64>,
}

impl LongRow {
    /// Value of the first identifier column, empty when the sheet had none.
    pub fn series_id(&self) -> &str {
        self.identifiers.first().map(String::as_str).unwrap_or("")
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LongTable {
    pub id_columns: Vec<String>,
    pub rows: Vec<LongRow>,
}

impl LongTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// Melt a wide sheet into (identifiers, period, value) rows. Rows come out
/// grouped by measurement column, in column order, then in sheet row order.
/// Cells that do not parse as numbers become missing values.
pub fn reshape<C: ColumnClassifier + ?Sized>(table: &RawTable, classifier: &C) -> LongTable {
    if table.is_empty() {
        return LongTable::default();
    }
    // roles pointing past the header are ignored
    let width = table.headers.len();
    let roles = classifier.classify(&table.headers);
    let identifiers: Vec<usize> = roles.identifiers.into_iter().filter(|&i| i < width).collect();
    let measurements: Vec<usize> = roles.measurements.into_iter().filter(|&i| i < width).collect();
    if measurements.is_empty() {
        return LongTable::default();
    }

    fn cell(row: &[String], i: usize) -> &str {
        row.get(i).map(String::as_str).unwrap_or("")
    }

    let mut rows = Vec::with_capacity(measurements.len() * table.rows.len());
    for &m in &measurements {
        let period = table.headers[m].trim().to_string();
        for row in &table.rows {
            rows.push(LongRow {
                identifiers: identifiers.iter().map(|&i| clean_str(cell(row, i))).collect(),
                period: period.clone(),
                value: parse_value(cell(row, m)),
            });
        }
    }

    LongTable {
        id_columns: identifiers.iter().map(|&i| table.headers[i].clone()).collect(),
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn table(h: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable::new(
            headers(h),
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn melts_two_rows_by_two_years_into_four() {
        let t = table(&["id", "2020", "2021"], &[&["a", "1", "2"], &["b", "3", "4"]]);
        let long = reshape(&t, &Layout::default());

        assert_eq!(long.id_columns, vec!["id"]);
        assert_eq!(long.len(), 4);
        let got: Vec<(&str, &str, Option<f64>)> = long
            .rows
            .iter()
            .map(|r| (r.series_id(), r.period.as_str(), r.value))
            .collect();
        assert_eq!(
            got,
            vec![
                ("a", "2020", Some(1.0)),
                ("b", "2020", Some(3.0)),
                ("a", "2021", Some(2.0)),
                ("b", "2021", Some(4.0)),
            ]
        );
    }

    #[test]
    fn non_numeric_cells_become_missing() {
        let t = table(&["id", "2020"], &[&["a", "n/a"], &["b", ""]]);
        let long = reshape(&t, &Layout::default());
        assert_eq!(long.len(), 2);
        assert!(long.rows.iter().all(|r| r.value.is_none()));
    }

    #[test]
    fn empty_table_reshapes_to_empty() {
        let long = reshape(&RawTable::default(), &Layout::default());
        assert!(long.is_empty());
        let cleaned = table(&["id", "2020"], &[&["", ""]]).drop_empty();
        assert!(reshape(&cleaned, &Layout::default()).is_empty());
    }

    #[test]
    fn leading_keeps_vocabulary_second_column() {
        let roles = Layout::default().classify(&headers(&["Code", "Measure", "2020", "Notes"]));
        assert_eq!(roles.identifiers, vec![0, 1]);
        assert_eq!(roles.measurements, vec![2]);

        let roles = Layout::default().classify(&headers(&["Code", "Label", "2020"]));
        assert_eq!(roles.identifiers, vec![0]);
        assert_eq!(roles.measurements, vec![2]);
    }

    #[test]
    fn leading_falls_back_to_all_other_columns() {
        let roles = Layout::default().classify(&headers(&["Item", "Outturn", "Forecast"]));
        assert_eq!(roles.identifiers, vec![0]);
        assert_eq!(roles.measurements, vec![1, 2]);

        let single = Layout::default().classify(&headers(&["Item"]));
        assert!(single.measurements.is_empty());
    }

    #[test]
    fn period_split_takes_first_two_non_period_columns() {
        let layout = Layout {
            strategy: Strategy::PeriodSplit,
            quarters: false,
            ..Layout::default()
        };
        let roles = layout.classify(&headers(&["Title", "CDID", "Unit", "2024-01", "2024Q1", "2024"]));
        assert_eq!(roles.measurements, vec![3, 5]);
        assert_eq!(roles.identifiers, vec![0, 1]);
    }

    #[test]
    fn period_split_without_periods_melts_nothing() {
        let layout = Layout {
            strategy: Strategy::PeriodSplit,
            ..Layout::default()
        };
        let t = table(&["Title", "Value"], &[&["x", "1"]]);
        assert!(reshape(&t, &layout).is_empty());
    }

    #[test]
    fn closures_can_stand_in_for_a_layout() {
        let last_column_only = |h: &[String]| ColumnRoles {
            identifiers: vec![0],
            measurements: vec![h.len() - 1],
        };
        let t = table(&["id", "2020", "2021"], &[&["a", "1", "2"]]);
        let long = reshape(&t, &last_column_only);
        assert_eq!(long.len(), 1);
        assert_eq!(long.rows[0].period, "2021");
        assert_eq!(long.rows[0].value, Some(2.0));
    }

    #[test]
    fn out_of_range_roles_are_ignored() {
        let sloppy = |_: &[String]| ColumnRoles {
            identifiers: vec![0, 7],
            measurements: vec![1, 9],
        };
        let t = table(&["id", "2020"], &[&["a", "1"]]);
        let long = reshape(&t, &sloppy);
        assert_eq!(long.id_columns, vec!["id"]);
        assert_eq!(long.len(), 1);
        assert_eq!(long.rows[0].identifiers, vec!["a"]);
        assert_eq!(long.rows[0].value, Some(1.0));

        let nothing_valid = |_: &[String]| ColumnRoles {
            identifiers: vec![0],
            measurements: vec![5],
        };
        assert!(reshape(&t, &nothing_valid).is_empty());
    }

    #[test]
    fn layout_reads_from_yaml_with_defaults() -> anyhow::Result<()> {
        let layout: Layout = serde_yaml::from_str("strategy: period_split\nquarters: false\n")?;
        assert_eq!(layout.strategy, Strategy::PeriodSplit);
        assert!(!layout.quarters);
        assert!(layout.months);
        assert_eq!(layout.identifiers, 2);
        Ok(())
    }
}
