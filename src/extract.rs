// 🌐 Extraction
// Fetch the "largest banks" page and read its market-cap table
//
// Each <tr> is checked against a fixed shape (rank, name, market cap).
// Rows that don't fit are skipped and reported, never guessed at.

use crate::error::{EtlError, Result};
use prettytable::{Cell, Row, Table};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

// ============================================================================
// CORE TYPES
// ============================================================================

/// BankRecord - one row of the source table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankRecord {
    #[serde(rename = "Name")]
    pub name: String,

    #[serde(rename = "MC_USD_Billion")]
    pub mc_usd_billion: f64,
}

/// How to find the target table in the page
#[derive(Debug, Clone, PartialEq)]
pub enum TableLocator {
    /// First <table> with a header cell containing this text (case-insensitive)
    Header(String),
    /// The n-th <tbody> in the document (0-based)
    Position(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractOptions {
    pub locator: TableLocator,
    /// Rows kept, and the minimum number of valid rows required
    pub limit: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        ExtractOptions {
            locator: TableLocator::Header("market cap".to_string()),
            limit: 10,
        }
    }
}

/// A data row that failed validation
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRow {
    /// Position of the <tr> within the table (0-based)
    pub index: usize,
    pub reason: String,
}

/// Extraction - kept records plus what was dropped on the way
#[derive(Debug, Clone)]
pub struct Extraction {
    pub records: Vec<BankRecord>,
    pub skipped: Vec<SkippedRow>,
}

// ============================================================================
// SELECTORS & PATTERNS
// ============================================================================

static TABLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table").expect("table selector"));
static TBODY_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tbody").expect("tbody selector"));
static TR_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").expect("tr selector"));
static TH_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("th").expect("th selector"));
static TD_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").expect("td selector"));
static A_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").expect("a selector"));

/// Footnote markers such as "[1]" or "[note 2]"
static FOOTNOTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]*\]").expect("footnote regex"));

/// Leading decimal number after "$" and thousands separators are removed
static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+(?:\.\d+)?)").expect("number regex"));

const NAME_COLUMN: usize = 1;
const MARKET_CAP_COLUMN: usize = 2;

// ============================================================================
// FETCH + PARSE
// ============================================================================

/// Blocking GET of the source page
pub fn fetch_page(url: &str) -> Result<String> {
    let response = reqwest::blocking::get(url)?.error_for_status()?;
    let body = response.text()?;
    tracing::debug!(url, bytes = body.len(), "source page fetched");
    Ok(body)
}

/// Fetch and parse in one step
pub fn extract(url: &str, options: &ExtractOptions) -> Result<Extraction> {
    let html = fetch_page(url)?;
    parse_banks_table(&html, options)
}

/// Read the first `options.limit` valid rows of the target table
pub fn parse_banks_table(html: &str, options: &ExtractOptions) -> Result<Extraction> {
    let document = Html::parse_document(html);
    let table = locate_table(&document, &options.locator)?;

    let mut records = Vec::new();
    let mut skipped = Vec::new();

    for (index, row) in table.select(&TR_SEL).enumerate() {
        if records.len() == options.limit {
            break;
        }

        let cells: Vec<ElementRef> = row.select(&TD_SEL).collect();

        // Header rows carry only <th>
        if cells.is_empty() {
            continue;
        }

        match parse_row(&cells) {
            Ok(record) => records.push(record),
            Err(reason) => {
                tracing::warn!(row = index, %reason, "skipping table row");
                skipped.push(SkippedRow { index, reason });
            }
        }
    }

    if records.len() < options.limit {
        return Err(EtlError::parse(format!(
            "expected at least {} bank rows, found {}",
            options.limit,
            records.len()
        )));
    }

    Ok(Extraction { records, skipped })
}

fn locate_table<'a>(document: &'a Html, locator: &TableLocator) -> Result<ElementRef<'a>> {
    match locator {
        TableLocator::Header(needle) => {
            let needle = needle.to_lowercase();
            document
                .select(&TABLE_SEL)
                .find(|table| {
                    table
                        .select(&TH_SEL)
                        .any(|th| cell_text(&th).to_lowercase().contains(&needle))
                })
                .ok_or_else(|| {
                    EtlError::parse(format!("no table with a '{}' header found", needle))
                })
        }
        TableLocator::Position(n) => document
            .select(&TBODY_SEL)
            .nth(*n)
            .ok_or_else(|| EtlError::parse(format!("page has no table body at position {}", n))),
    }
}

fn parse_row(cells: &[ElementRef]) -> std::result::Result<BankRecord, String> {
    if cells.len() <= MARKET_CAP_COLUMN {
        return Err(format!(
            "expected at least {} cells, found {}",
            MARKET_CAP_COLUMN + 1,
            cells.len()
        ));
    }

    let name = bank_name(&cells[NAME_COLUMN]);
    if name.is_empty() {
        return Err("empty bank name".to_string());
    }

    let raw_cap = cell_text(&cells[MARKET_CAP_COLUMN]);
    let mc_usd_billion =
        parse_market_cap(&raw_cap).ok_or_else(|| format!("unparseable market cap '{}'", raw_cap))?;

    Ok(BankRecord {
        name,
        mc_usd_billion,
    })
}

/// The name cell usually holds a flag link followed by the bank link
fn bank_name(cell: &ElementRef) -> String {
    let links: Vec<ElementRef> = cell.select(&A_SEL).collect();

    if links.len() >= 2 {
        let link = &links[1];
        if let Some(title) = link.value().attr("title") {
            let title = title.trim();
            if !title.is_empty() {
                return title.to_string();
            }
        }
        let text = cell_text(link);
        if !text.is_empty() {
            return text;
        }
    }

    cell_text(cell)
}

/// "1,234.5[3]" / "$432.92" / "432.92\n" → number
fn parse_market_cap(text: &str) -> Option<f64> {
    let cleaned = FOOTNOTE_RE.replace_all(text, "");
    let cleaned = cleaned.replace([',', '$'], "");

    let caps = NUMBER_RE.captures(&cleaned)?;
    caps[1].parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Extracted rows as a printable table
pub fn records_table(records: &[BankRecord]) -> Table {
    let mut table = Table::new();
    table.set_titles(Row::new(vec![Cell::new("Name"), Cell::new("MC_USD_Billion")]));

    for r in records {
        table.add_row(Row::new(vec![
            Cell::new(&r.name),
            Cell::new(&r.mc_usd_billion.to_string()),
        ]));
    }
    table
}

/// Text content with whitespace runs collapsed
fn cell_text(el: &ElementRef) -> String {
    el.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
