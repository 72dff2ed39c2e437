use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("reading {}: {source}", path.display())]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("mapping '{canonical}': invalid {field} pattern: {source}")]
    InvalidPattern {
        canonical: String,
        field: &'static str,
        #[source]
        source: regex::Error,
    },

    #[error("release '{0}' is not configured")]
    UnknownRelease(String),

    #[error("pipeline config has no baseline section")]
    MissingBaseline,

    #[error("no rows matched any of the {rules} mapping rules; refine sheet_match/series_match patterns")]
    NoRowsMatched { rules: usize },
}
