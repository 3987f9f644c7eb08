// 💱 Exchange Rates
// Reference CSV (Currency,Rate) → read-only lookup table

use crate::error::{EtlError, Result};
use crate::load::write_atomically;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// One row of the reference file
#[derive(Debug, Deserialize)]
struct RateRow {
    #[serde(rename = "Currency")]
    currency: String,

    #[serde(rename = "Rate")]
    rate: f64,
}

/// ExchangeRateTable - currency code → units of that currency per 1 USD
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExchangeRateTable {
    rates: BTreeMap<String, f64>,
}

impl ExchangeRateTable {
    /// Build from (code, rate) pairs, rejecting non-positive or non-finite rates
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut rates = BTreeMap::new();
        for (code, rate) in pairs {
            let code = code.into().trim().to_uppercase();
            if code.is_empty() {
                return Err(EtlError::parse("exchange rate row has an empty currency code"));
            }
            if !rate.is_finite() || rate <= 0.0 {
                return Err(EtlError::parse(format!(
                    "exchange rate for {} must be positive, got {}",
                    code, rate
                )));
            }
            rates.insert(code, rate);
        }
        Ok(ExchangeRateTable { rates })
    }

    /// Rate for a currency code; absent codes are an error, never a default
    pub fn rate(&self, code: &str) -> Result<f64> {
        self.rates
            .get(&code.to_uppercase())
            .copied()
            .ok_or_else(|| EtlError::missing_rate(code))
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    pub fn currencies(&self) -> impl Iterator<Item = &str> {
        self.rates.keys().map(|k| k.as_str())
    }
}

/// Load the reference CSV from disk
pub fn load_rates(path: &Path) -> Result<ExchangeRateTable> {
    let mut rdr = csv::Reader::from_path(path).map_err(|e| EtlError::io(path, e))?;

    let mut pairs = Vec::new();
    for (idx, result) in rdr.deserialize::<RateRow>().enumerate() {
        let row = result.map_err(|e| {
            EtlError::parse(format!(
                "exchange rate file {} line {}: {}",
                path.display(),
                idx + 2,
                e
            ))
        })?;
        pairs.push((row.currency, row.rate));
    }

    ExchangeRateTable::from_pairs(pairs)
}

/// Fetch the reference CSV and store it at `path`
///
/// The previous file stays untouched unless the whole body arrives and is written.
pub fn download_rates(url: &str, path: &Path) -> Result<()> {
    let response = reqwest::blocking::get(url)?.error_for_status()?;
    let body = response.bytes()?;

    write_atomically(path, &body)?;

    tracing::info!(url, bytes = body.len(), path = %path.display(), "exchange rates downloaded");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_file(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_rates() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "exchange_rate.csv",
            "Currency,Rate\nEUR,0.93\nGBP,0.8\nINR,82.95\n",
        );

        let table = load_rates(&path).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.rate("GBP").unwrap(), 0.8);
        assert_eq!(table.rate("eur").unwrap(), 0.93);
        assert_eq!(table.rate("INR").unwrap(), 82.95);
        assert_eq!(table.currencies().collect::<Vec<_>>(), vec!["EUR", "GBP", "INR"]);
    }

    #[test]
    fn test_missing_rate_is_error() {
        let table = ExchangeRateTable::from_pairs([("GBP", 0.8)]).unwrap();
        match table.rate("INR") {
            Err(EtlError::MissingRate { currency }) => assert_eq!(currency, "INR"),
            other => panic!("expected MissingRate, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_non_positive_rate() {
        assert!(ExchangeRateTable::from_pairs([("GBP", 0.0)]).is_err());
        assert!(ExchangeRateTable::from_pairs([("EUR", -1.2)]).is_err());
        assert!(ExchangeRateTable::from_pairs([("INR", f64::NAN)]).is_err());
    }

    #[test]
    fn test_malformed_rate_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "bad.csv", "Currency,Rate\nGBP,abc\n");

        let err = load_rates(&path).unwrap_err();
        assert!(matches!(err, EtlError::Parse { .. }));
    }

    #[test]
    fn test_failed_download_keeps_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let contents = "Currency,Rate\nEUR,0.93\nGBP,0.8\nINR,82.95\n";
        let path = write_file(dir.path(), "exchange_rate.csv", contents);

        let err = download_rates("http://127.0.0.1:1/exchange_rate.csv", &path).unwrap_err();
        assert!(matches!(err, EtlError::Network(_)));

        assert_eq!(fs::read_to_string(&path).unwrap(), contents);
        assert_eq!(load_rates(&path).unwrap().len(), 3);
    }

    #[test]
    fn test_missing_rate_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_rates(&dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, EtlError::Io { .. }));
    }
}
