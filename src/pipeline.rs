// 🚀 Pipeline
// rates → extract → transform → CSV → table store → queries, logged per stage

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::extract::{fetch_page, parse_banks_table, records_table};
use crate::load::{open_store, write_csv, write_table};
use crate::logger::ProgressLogger;
use crate::query::{run_named, AnalyticalQuery, QueryResult};
use crate::rates::{download_rates, load_rates};
use crate::transform::{enriched_table, transform};

// ============================================================================
// STAGES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    RateDownload,
    RateLoad,
    PageFetch,
    Extraction,
    Transformation,
    CsvLoad,
    DbLoad,
    Query,
}

impl Stage {
    /// Text used in the progress log ("<label> started" etc.)
    pub fn label(&self) -> &'static str {
        match self {
            Stage::RateDownload => "Exchange rate download",
            Stage::RateLoad => "Exchange rate loading",
            Stage::PageFetch => "Source page fetch",
            Stage::Extraction => "Data extraction",
            Stage::Transformation => "Data transformation",
            Stage::CsvLoad => "Data loading to CSV",
            Stage::DbLoad => "Data loading to database",
            Stage::Query => "Query execution",
        }
    }
}

/// What a completed run produced
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub banks_extracted: usize,
    pub rows_skipped: usize,
    pub rows_written: usize,
    /// Extracted rows, rendered for display
    pub extracted_table: String,
    /// Transformed rows with every currency column, rendered for display
    pub transformed_table: String,
    pub queries: Vec<(AnalyticalQuery, QueryResult)>,
}

// ============================================================================
// PIPELINE
// ============================================================================

pub struct Pipeline {
    config: PipelineConfig,
    logger: ProgressLogger,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let logger = ProgressLogger::new(config.log_path.clone());
        Pipeline { config, logger }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn logger(&self) -> &ProgressLogger {
        &self.logger
    }

    /// Full run: refresh rates, fetch the page, then everything in `process`
    pub fn run(&self) -> Result<RunSummary> {
        self.logger
            .log("Preliminaries complete. Initiating ETL process")?;

        if let Some(url) = &self.config.rates_url {
            self.stage(Stage::RateDownload, || {
                download_rates(url, &self.config.rates_path)
            })?;
        }

        let html = self.stage(Stage::PageFetch, || fetch_page(&self.config.source_url))?;

        self.process(&html)
    }

    /// Every stage after the page fetch, driven by already-fetched HTML
    pub fn process(&self, html: &str) -> Result<RunSummary> {
        let rates = self.stage(Stage::RateLoad, || load_rates(&self.config.rates_path))?;

        let extraction = self.stage(Stage::Extraction, || {
            parse_banks_table(html, &self.config.extract)
        })?;
        for skipped in &extraction.skipped {
            self.logger.log(&format!(
                "Row parsing error: row {}: {}",
                skipped.index, skipped.reason
            ))?;
        }

        let dataset = self.stage(Stage::Transformation, || {
            transform(&extraction.records, &rates)
        })?;

        self.stage(Stage::CsvLoad, || write_csv(&dataset, &self.config.csv_path))?;

        // One connection for the table load and every query; closed on drop
        let (conn, rows_written) = self.stage(Stage::DbLoad, || {
            let mut conn = open_store(&self.config.db_path)?;
            let written = write_table(&mut conn, &self.config.table_name, &dataset)?;
            Ok((conn, written))
        })?;
        let transformed_table = enriched_table(&dataset).to_string();
        drop(dataset);

        let mut queries = Vec::new();
        for query in AnalyticalQuery::standard_set() {
            let result = self.stage(Stage::Query, || {
                run_named(&conn, &self.config.table_name, &query)
            })?;
            queries.push((query, result));
        }

        self.logger.log("Process complete")?;

        Ok(RunSummary {
            banks_extracted: extraction.records.len(),
            rows_skipped: extraction.skipped.len(),
            rows_written,
            extracted_table: records_table(&extraction.records).to_string(),
            transformed_table,
            queries,
        })
    }

    /// Log start, then completion or failure, around one stage
    fn stage<T>(&self, stage: Stage, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let label = stage.label();
        self.logger.log(&format!("{} started", label))?;

        match f() {
            Ok(value) => {
                self.logger.log(&format!("{} completed", label))?;
                tracing::info!(stage = label, "stage completed");
                Ok(value)
            }
            Err(err) => {
                // The stage error is the one worth reporting
                let _ = self.logger.log(&format!("{} failed: {}", label, err));
                tracing::error!(stage = label, error = %err, "stage failed");
                Err(err)
            }
        }
    }
}
