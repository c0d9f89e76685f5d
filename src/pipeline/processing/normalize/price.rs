use regex::Regex;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::error::{CatalogError, Result};
use crate::types::Table;

/// A currency marker suffix and its exchange rate into the target currency.
#[derive(Debug, Clone)]
pub struct CurrencyMarker {
    marker: String,
    rate: f64,
    amount_pattern: Regex,
}

impl CurrencyMarker {
    pub fn new(marker: &str, rate: f64) -> Result<Self> {
        if marker.is_empty() || !rate.is_finite() || rate <= 0.0 {
            return Err(CatalogError::Config(format!(
                "invalid currency marker '{marker}' with rate {rate}"
            )));
        }
        let amount_pattern = Regex::new(&format!(r"([\d.]+)\s*{}", regex::escape(marker)))
            .map_err(|e| CatalogError::Config(format!("marker '{marker}': {e}")))?;
        Ok(Self {
            marker: marker.to_string(),
            rate,
            amount_pattern,
        })
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }
}

/// Ordered marker → rate table.
///
/// Iteration order is the caller's order and decides which marker wins when
/// a raw price contains more than one of them.
#[derive(Debug, Clone, Default)]
pub struct CurrencyTable {
    markers: Vec<CurrencyMarker>,
}

impl CurrencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_marker(mut self, marker: &str, rate: f64) -> Result<Self> {
        self.markers.push(CurrencyMarker::new(marker, rate)?);
        Ok(self)
    }

    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        pairs
            .into_iter()
            .try_fold(Self::new(), |table, (marker, rate)| table.with_marker(marker, rate))
    }

    pub fn markers(&self) -> &[CurrencyMarker] {
        &self.markers
    }
}

/// What happened to one raw price cell.
#[derive(Debug, Clone, PartialEq)]
pub enum PriceOutcome {
    Converted { amount: f64, marker: String },
    Empty,
    UnknownMarker,
    Unparseable { marker: String },
}

impl PriceOutcome {
    pub fn amount(&self) -> Option<f64> {
        match self {
            PriceOutcome::Converted { amount, .. } => Some(*amount),
            _ => None,
        }
    }
}

pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Classifies a raw price string against the currency table.
///
/// A marker is only considered when it occurs in the text; if its amount
/// pattern does not match, the next marker is tried. A matched amount that
/// fails to parse is final.
pub fn classify_price(raw: Option<&str>, currencies: &CurrencyTable) -> PriceOutcome {
    let raw = match raw.map(str::trim) {
        Some(r) if !r.is_empty() => r,
        _ => return PriceOutcome::Empty,
    };

    for currency in currencies.markers() {
        if !raw.contains(currency.marker()) {
            continue;
        }
        let Some(captures) = currency.amount_pattern.captures(raw) else {
            continue;
        };
        return match captures[1].parse::<f64>() {
            Ok(amount) if amount.is_finite() => PriceOutcome::Converted {
                amount: round_cents(amount * currency.rate()),
                marker: currency.marker().to_string(),
            },
            _ => PriceOutcome::Unparseable {
                marker: currency.marker().to_string(),
            },
        };
    }
    PriceOutcome::UnknownMarker
}

/// Converts a raw price into the target currency, rounded to two decimals.
/// Never guesses a currency: anything not recognized yields `None`.
pub fn normalize_price(raw: Option<&str>, currencies: &CurrencyTable) -> Option<f64> {
    classify_price(raw, currencies).amount()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceReport {
    pub rows: usize,
    pub converted: usize,
    pub empty: usize,
    pub unknown_marker: usize,
    pub unparseable: usize,
    pub per_marker: BTreeMap<String, usize>,
}

/// Writes the converted price of every row into `output_column`.
pub fn convert_price_column(
    table: &mut Table,
    source_column: &str,
    output_column: &str,
    currencies: &CurrencyTable,
) -> PriceReport {
    table.ensure_column(output_column);
    let mut report = PriceReport {
        rows: table.len(),
        ..Default::default()
    };

    for row in table.rows_mut() {
        let outcome = classify_price(row.get(source_column), currencies);
        match &outcome {
            PriceOutcome::Converted { marker, .. } => {
                report.converted += 1;
                *report.per_marker.entry(marker.clone()).or_default() += 1;
            }
            PriceOutcome::Empty => report.empty += 1,
            PriceOutcome::UnknownMarker => {
                debug!(raw = ?row.get(source_column), "price has no known currency marker");
                report.unknown_marker += 1;
            }
            PriceOutcome::Unparseable { marker } => {
                debug!(raw = ?row.get(source_column), marker, "price amount did not parse");
                report.unparseable += 1;
            }
        }
        row.set(output_column, outcome.amount().map(|a| format!("{a:.2}")));
    }

    info!(
        "Prices '{}' -> '{}': {}/{} converted",
        source_column, output_column, report.converted, report.rows
    );
    if report.unknown_marker + report.unparseable > 0 {
        warn!(
            "{} prices with unknown currency marker, {} with unparseable amount",
            report.unknown_marker, report.unparseable
        );
    }
    crate::metrics::normalize::prices_converted(&report);
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Record;

    fn currencies() -> CurrencyTable {
        CurrencyTable::from_pairs([("-409", 43.6), ("-C0A", 50.6)]).unwrap()
    }

    #[test]
    fn test_normalize_price_known_markers() {
        let table = currencies();
        assert_eq!(
            normalize_price(Some("124.95-409"), &table),
            Some(round_cents(124.95 * 43.6))
        );
        assert_eq!(normalize_price(Some("124.95 -409"), &table), Some(5447.82));
        assert_eq!(normalize_price(Some("  89.90 -C0A "), &table), Some(4548.94));
    }

    #[test]
    fn test_normalize_price_never_guesses() {
        let table = currencies();
        assert_eq!(normalize_price(None, &table), None);
        assert_eq!(normalize_price(Some(""), &table), None);
        assert_eq!(normalize_price(Some("not-a-number-409"), &table), None);
        assert_eq!(normalize_price(Some("19.99 -XYZ"), &table), None);
        assert_eq!(normalize_price(Some("19.99"), &table), None);
        assert_eq!(
            classify_price(Some("1.2.3-409"), &table),
            PriceOutcome::Unparseable {
                marker: "-409".to_string()
            }
        );
    }

    #[test]
    fn test_first_marker_in_table_order_wins() {
        let usd_first = currencies();
        let eur_first = CurrencyTable::from_pairs([("-C0A", 50.6), ("-409", 43.6)]).unwrap();
        let raw = Some("10.00-409 / 10.00-C0A");

        assert_eq!(normalize_price(raw, &usd_first), Some(436.0));
        assert_eq!(normalize_price(raw, &eur_first), Some(506.0));
    }

    #[test]
    fn test_marker_without_amount_falls_through_to_next_marker() {
        let table = currencies();
        assert_eq!(normalize_price(Some("n/a-409 12.00-C0A"), &table), Some(607.2));
    }

    #[test]
    fn test_invalid_marker_rejected() {
        assert!(CurrencyMarker::new("", 1.0).is_err());
        assert!(CurrencyMarker::new("-409", 0.0).is_err());
        assert!(CurrencyMarker::new("-409", f64::NAN).is_err());
    }

    #[test]
    fn test_convert_price_column_reports_counts() {
        let rows = vec![
            Record::from_pairs([("ASIN", "A"), ("Price", "10.00-409")]),
            Record::from_pairs([("ASIN", "B"), ("Price", "5.00-C0A")]),
            Record::from_pairs([("ASIN", "C"), ("Price", "5.00 GBP")]),
            Record::from_pairs([("ASIN", "D")]),
        ];
        let mut table = Table::with_rows(vec!["ASIN".into(), "Price".into()], rows);
        let report = convert_price_column(&mut table, "Price", "TL Price", &currencies());

        assert_eq!(report.converted, 2);
        assert_eq!(report.unknown_marker, 1);
        assert_eq!(report.empty, 1);
        assert_eq!(report.per_marker.get("-409"), Some(&1));
        assert!(table.has_column("TL Price"));
        assert_eq!(table.rows()[0].get("TL Price"), Some("436.00"));
        assert_eq!(table.rows()[1].get("TL Price"), Some("253.00"));
        assert_eq!(table.rows()[2].get("TL Price"), None);
    }
}
