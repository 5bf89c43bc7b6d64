use crate::descriptor::Record;
use crate::store::ResultStore;
use chrono::{DateTime, Utc};
use rayon::prelude::{IntoParallelIterator, ParallelIterator};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Output columns, as `source:destination` (destination defaults to the source).
pub const DEFAULT_COLUMNS: [&str; 11] = [
    "symbol:ticker",
    "name",
    "currency",
    "Exchange:exchange",
    "Primary Exchange:primary_exchange",
    "Contract Type:contract_type",
    "Country/Region:country",
    "Closing Price:closing_price",
    "CONID:conid",
    "ISIN:isin",
    "ASSETID:assetid",
];

/// Appended to every table; the time the transform ran.
pub const TIMESTAMP_COLUMN: &str = "timestamp_created_utc";

// copied as-is, never cleaned
const TICKER_COLUMN: &str = "ticker";

/// A `source:destination` column mapping.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnSpec {
    pub source: String,
    pub destination: String,
}

impl FromStr for ColumnSpec {
    type Err = std::convert::Infallible;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let (source, destination) = match spec.split_once(':') {
            Some((source, destination)) => (source, destination),
            None => (spec, spec),
        };
        Ok(Self {
            source: source.to_string(),
            destination: destination.to_string(),
        })
    }
}

/// A single table value.
#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    Null,
    Number(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => f.write_str("None"),
            Cell::Number(n) => write!(f, "{n}"),
            Cell::Text(s) => f.write_str(s),
            Cell::Timestamp(t) => write!(f, "{}", t.format("%Y-%m-%d %H:%M:%S%.6f")),
        }
    }
}

/// The transformed rows, ready to persist. Every row has one cell per column, the last one
/// being [`TIMESTAMP_COLUMN`].
#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
    pub created: DateTime<Utc>,
}

impl Table {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Every cell of `column`, top to bottom.
    pub fn column(&self, column: &str) -> Option<Vec<&Cell>> {
        let index = self.columns.iter().position(|c| c == column)?;
        Some(self.rows.iter().map(|row| &row[index]).collect())
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.columns.join(" | "))?;
        for row in &self.rows {
            let cells: Vec<String> = row.iter().map(Cell::to_string).collect();
            writeln!(f, "{}", cells.join(" | "))?;
        }
        write!(f, "[{} rows x {} columns]", self.rows.len(), self.columns.len())
    }
}

/// Maps merged records onto output columns, cleaning numeric-looking values.
#[derive(Clone, Debug)]
pub struct Transformer {
    columns: Vec<ColumnSpec>,
}

impl Default for Transformer {
    fn default() -> Self {
        Self::new(DEFAULT_COLUMNS)
    }
}

impl Transformer {
    pub fn new<S: AsRef<str>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns
                .into_iter()
                .map(|spec| match spec.as_ref().parse() {
                    Ok(spec) => spec,
                    Err(never) => match never {},
                })
                .collect(),
        }
    }

    pub fn transform(&self, store: &ResultStore) -> Table {
        self.transform_at(store, Utc::now())
    }

    /// Transform with a fixed ingestion timestamp.
    ///
    /// Rows are ordered by dedup key; a record matching none of the columns is dropped.
    pub fn transform_at(&self, store: &ResultStore, created: DateTime<Utc>) -> Table {
        let mut records: Vec<(&String, &Record)> = store.iter().collect();
        records.sort_unstable_by(|a, b| a.0.cmp(b.0));

        let rows: Vec<Vec<Cell>> = records
            .into_par_iter()
            .filter_map(|(_, record)| self.parse_row(record))
            .map(|mut row| {
                row.push(Cell::Timestamp(created));
                row
            })
            .collect();

        let mut columns: Vec<String> = self
            .columns
            .iter()
            .map(|spec| spec.destination.clone())
            .collect();
        columns.push(TIMESTAMP_COLUMN.to_string());

        debug!("transformed {} records into {} rows", store.len(), rows.len());
        Table {
            columns,
            rows,
            created,
        }
    }

    fn parse_row(&self, record: &Record) -> Option<Vec<Cell>> {
        let mut found = false;
        let row: Vec<Cell> = self
            .columns
            .iter()
            .map(|spec| match record.get(&spec.source) {
                None => Cell::Null,
                Some(value) => {
                    found = true;
                    if spec.destination == TICKER_COLUMN {
                        verbatim(value)
                    } else {
                        clean_value(value)
                    }
                }
            })
            .collect();

        found.then_some(row)
    }
}

fn verbatim(value: &Value) -> Cell {
    match value {
        Value::Null => Cell::Null,
        Value::String(s) => Cell::Text(s.clone()),
        other => Cell::Text(other.to_string()),
    }
}

/// Normalise a raw value: missing markers become [`Cell::Null`], numeric-looking strings
/// (thousands separators, percentages, signs, exponents) become [`Cell::Number`], anything else
/// stays text.
pub fn clean_value(value: &Value) -> Cell {
    match value {
        Value::Null => Cell::Null,
        Value::String(s) => clean_text(s),
        Value::Number(n) => clean_text(&n.to_string()),
        other => Cell::Text(other.to_string()),
    }
}

fn clean_text(txt: &str) -> Cell {
    if matches!(txt, "n\\a" | "n/a" | "") {
        return Cell::Null;
    }

    let sanitized: String = txt.chars().filter(|c| !"E.,-+%".contains(*c)).collect();
    if sanitized.is_empty() || !sanitized.chars().all(|c| c.is_ascii_digit()) {
        return Cell::Text(txt.to_string());
    }

    if txt.contains('.') {
        // the exponent is dropped, not applied
        let mantissa = txt.split('E').next().unwrap_or_default();
        let mantissa: String = mantissa.chars().filter(|c| !",+%".contains(*c)).collect();
        return match mantissa.parse::<f64>() {
            Ok(n) => Cell::Number((n * 1000.0).round() / 1000.0),
            Err(_) => Cell::Text(txt.to_string()),
        };
    }

    match sanitized.parse::<f64>() {
        Ok(n) => Cell::Number(n),
        Err(_) => Cell::Text(txt.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::TickerDescriptor;
    use crate::extract::Fields;

    fn store() -> ResultStore {
        let mut store = ResultStore::new();
        let aapl = TickerDescriptor::new("AAPL", "NASDAQ", "http://x/aapl")
            .with("name", "APPLE INC")
            .with("currency", "USD");
        let fields = Fields::from([
            ("Exchange", "NASDAQ, BATS".to_string()),
            ("Primary Exchange", "NASDAQ".to_string()),
            ("Closing Price", "1,189.8456".to_string()),
            ("CONID", "265598".to_string()),
            ("ISIN", "US0378331005".to_string()),
        ]);
        store.insert_first(aapl.key(), aapl.merge(&fields));

        let vod = TickerDescriptor::new("0001", "SEHK", "http://x/vod").with("name", "n/a");
        store.insert_first(vod.key(), vod.merge(&Fields::new()));
        store
    }

    #[test]
    fn column_specs_parse() {
        let spec: ColumnSpec = "Closing Price:closing_price".parse().unwrap();
        assert_eq!(spec.source, "Closing Price");
        assert_eq!(spec.destination, "closing_price");

        let spec: ColumnSpec = "name".parse().unwrap();
        assert_eq!(spec.source, "name");
        assert_eq!(spec.destination, "name");
    }

    #[test]
    fn values_are_cleaned() {
        let s = |v: &str| clean_value(&Value::from(v));
        assert_eq!(s("n/a"), Cell::Null);
        assert_eq!(s("n\\a"), Cell::Null);
        assert_eq!(s(""), Cell::Null);
        assert_eq!(clean_value(&Value::Null), Cell::Null);

        assert_eq!(s("1,234"), Cell::Number(1234.0));
        assert_eq!(s("12%"), Cell::Number(12.0));
        assert_eq!(s("189.84567"), Cell::Number(189.846));
        assert_eq!(s("-1.5%"), Cell::Number(-1.5));
        assert_eq!(s("+2,500.25"), Cell::Number(2500.25));
        assert_eq!(s("1.5E3"), Cell::Number(1.5));

        assert_eq!(s("US0378331005"), Cell::Text("US0378331005".to_string()));
        assert_eq!(s("NASDAQ, BATS"), Cell::Text("NASDAQ, BATS".to_string()));
        assert_eq!(s("."), Cell::Text(".".to_string()));
        assert_eq!(s("1.2.3"), Cell::Text("1.2.3".to_string()));
    }

    #[test]
    fn records_map_onto_columns() {
        let created = Utc::now();
        let table = Transformer::default().transform_at(&store(), created);

        assert_eq!(table.columns.len(), DEFAULT_COLUMNS.len() + 1);
        assert_eq!(table.columns.last().map(String::as_str), Some(TIMESTAMP_COLUMN));
        assert_eq!(table.rows.len(), 2);

        // rows are ordered by dedup key
        let tickers = table.column("ticker").unwrap();
        assert_eq!(tickers[0], &Cell::Text("0001".to_string()));
        assert_eq!(tickers[1], &Cell::Text("AAPL".to_string()));

        let names = table.column("name").unwrap();
        assert_eq!(names[0], &Cell::Null);
        assert_eq!(names[1], &Cell::Text("APPLE INC".to_string()));

        let prices = table.column("closing_price").unwrap();
        assert_eq!(prices[1], &Cell::Number(1189.846));
        assert_eq!(table.column("conid").unwrap()[1], &Cell::Number(265598.0));
        assert_eq!(table.column("assetid").unwrap()[1], &Cell::Null);

        let stamps = table.column(TIMESTAMP_COLUMN).unwrap();
        assert!(stamps.iter().all(|c| **c == Cell::Timestamp(created)));
    }

    #[test]
    fn empty_store_keeps_the_columns() {
        let table = Transformer::default().transform(&ResultStore::new());
        assert!(table.is_empty());
        assert_eq!(table.columns.len(), DEFAULT_COLUMNS.len() + 1);
    }

    #[test]
    fn records_without_matches_are_dropped() {
        let table = Transformer::new(["Closing Price:closing_price"]).transform(&store());
        assert_eq!(table.rows.len(), 1);
    }
}
