pub mod config;
pub mod error;
pub mod history;
pub mod ingest;
pub mod mapping;
pub mod period;
pub mod pipeline;
pub mod process;
pub mod schema;
pub mod store;
