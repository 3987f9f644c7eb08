// Largest Banks ETL - Core Library
// Exposes every pipeline stage for the binary and tests

pub mod config;
pub mod error;
pub mod extract;
pub mod load;
pub mod logger;
pub mod pipeline;
pub mod query;
pub mod rates;
pub mod transform;

// Re-export commonly used types
pub use config::PipelineConfig;
pub use error::{EtlError, Result};
pub use extract::{
    extract, fetch_page, parse_banks_table, records_table,
    BankRecord, ExtractOptions, Extraction, SkippedRow, TableLocator,
};
pub use load::{
    count_rows, open_store, read_csv, validate_table_name, write_csv, write_table,
};
pub use logger::{init_tracing, ProgressLogger};
pub use pipeline::{Pipeline, RunSummary, Stage};
pub use query::{run_named, run_query, AnalyticalQuery, QueryResult};
pub use rates::{download_rates, load_rates, ExchangeRateTable};
pub use transform::{
    enriched_table, round_to_cents, transform, Currency, EnrichedBankRecord,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
