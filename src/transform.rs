// 🔁 Transformation
// USD market caps → GBP / EUR / INR columns, rounded to cents

use crate::error::Result;
use crate::extract::BankRecord;
use crate::rates::ExchangeRateTable;
use prettytable::{Cell, Row, Table};
use serde::{Deserialize, Serialize};

// ============================================================================
// CURRENCIES
// ============================================================================

/// Currency - the fixed set of target currencies (USD is the base)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    GBP,
    EUR,
    INR,
}

impl Currency {
    pub const ALL: [Currency; 3] = [Currency::GBP, Currency::EUR, Currency::INR];

    /// ISO code, as it appears in the exchange rate file
    pub fn code(&self) -> &'static str {
        match self {
            Currency::GBP => "GBP",
            Currency::EUR => "EUR",
            Currency::INR => "INR",
        }
    }

    /// Column name in the CSV output and the table store
    pub fn column(&self) -> &'static str {
        match self {
            Currency::GBP => "MC_GBP_Billion",
            Currency::EUR => "MC_EUR_Billion",
            Currency::INR => "MC_INR_Billion",
        }
    }
}

// ============================================================================
// ENRICHED RECORD
// ============================================================================

/// Column names in output order
pub const COLUMNS: [&str; 5] = [
    "Name",
    "MC_USD_Billion",
    "MC_GBP_Billion",
    "MC_EUR_Billion",
    "MC_INR_Billion",
];

/// EnrichedBankRecord - a BankRecord plus one converted column per currency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedBankRecord {
    #[serde(rename = "Name")]
    pub name: String,

    #[serde(rename = "MC_USD_Billion")]
    pub mc_usd_billion: f64,

    #[serde(rename = "MC_GBP_Billion")]
    pub mc_gbp_billion: f64,

    #[serde(rename = "MC_EUR_Billion")]
    pub mc_eur_billion: f64,

    #[serde(rename = "MC_INR_Billion")]
    pub mc_inr_billion: f64,
}

impl EnrichedBankRecord {
    /// Market cap in a target currency
    pub fn value_in(&self, currency: Currency) -> f64 {
        match currency {
            Currency::GBP => self.mc_gbp_billion,
            Currency::EUR => self.mc_eur_billion,
            Currency::INR => self.mc_inr_billion,
        }
    }
}

/// Round half away from zero to two decimals
///
/// Market caps are never negative, so this is round-half-up in practice.
pub fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Enrich every record; output order matches input order
///
/// Every rate is resolved before any row is built, so a missing currency
/// fails the whole call.
pub fn transform(
    records: &[BankRecord],
    rates: &ExchangeRateTable,
) -> Result<Vec<EnrichedBankRecord>> {
    let gbp = rates.rate(Currency::GBP.code())?;
    let eur = rates.rate(Currency::EUR.code())?;
    let inr = rates.rate(Currency::INR.code())?;

    let enriched = records
        .iter()
        .map(|r| EnrichedBankRecord {
            name: r.name.clone(),
            mc_usd_billion: r.mc_usd_billion,
            mc_gbp_billion: round_to_cents(r.mc_usd_billion * gbp),
            mc_eur_billion: round_to_cents(r.mc_usd_billion * eur),
            mc_inr_billion: round_to_cents(r.mc_usd_billion * inr),
        })
        .collect();

    Ok(enriched)
}

/// Enriched rows as a printable table, one column per currency
pub fn enriched_table(records: &[EnrichedBankRecord]) -> Table {
    let mut table = Table::new();
    table.set_titles(Row::new(COLUMNS.iter().map(|c| Cell::new(c)).collect()));

    for r in records {
        let mut cells = vec![
            Cell::new(&r.name),
            Cell::new(&r.mc_usd_billion.to_string()),
        ];
        cells.extend(
            Currency::ALL
                .iter()
                .map(|c| Cell::new(&r.value_in(*c).to_string())),
        );
        table.add_row(Row::new(cells));
    }
    table
}
