// ⚙️ Pipeline Configuration
// Every path and URL the run touches; defaults are the production constants

use crate::extract::ExtractOptions;
use std::path::PathBuf;

pub const SOURCE_URL: &str =
    "https://web.archive.org/web/20230908091635/https://en.wikipedia.org/wiki/List_of_largest_banks";
pub const RATES_URL: &str = "https://cf-courses-data.s3.us.cloud-object-storage.appdomain.cloud/IBMSkillsNetwork-PY0221EN-Coursera/labs/v2/exchange_rate.csv";
pub const RATES_PATH: &str = "./exchange_rate.csv";
pub const CSV_PATH: &str = "./Largest_banks_data.csv";
pub const DB_PATH: &str = "./Banks.db";
pub const TABLE_NAME: &str = "Largest_banks";
pub const LOG_PATH: &str = "./code_log.txt";

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub source_url: String,
    /// When set, the rates file is re-downloaded before it is loaded
    pub rates_url: Option<String>,
    pub rates_path: PathBuf,
    pub csv_path: PathBuf,
    pub db_path: PathBuf,
    pub table_name: String,
    pub log_path: PathBuf,
    pub extract: ExtractOptions,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            source_url: SOURCE_URL.to_string(),
            rates_url: Some(RATES_URL.to_string()),
            rates_path: PathBuf::from(RATES_PATH),
            csv_path: PathBuf::from(CSV_PATH),
            db_path: PathBuf::from(DB_PATH),
            table_name: TABLE_NAME.to_string(),
            log_path: PathBuf::from(LOG_PATH),
            extract: ExtractOptions::default(),
        }
    }
}

impl PipelineConfig {
    /// Same settings with every local file placed under `dir`
    pub fn rooted_at(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        PipelineConfig {
            rates_path: dir.join("exchange_rate.csv"),
            csv_path: dir.join("Largest_banks_data.csv"),
            db_path: dir.join("Banks.db"),
            log_path: dir.join("code_log.txt"),
            ..PipelineConfig::default()
        }
    }
}
