use crate::extract::Fields;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A merged output record: every descriptor field, plus whatever was extracted from the page.
pub type Record = Map<String, Value>;

/// One entry of the ticker catalog.
///
/// The catalog stores the exchange under `exch`; every key other than `symbol`, `exch` and `url`
/// (e.g. `name`, `currency`) is carried through untouched in `extra`.
///
/// ```json
/// { "symbol": "AAPL", "exch": "NASDAQ", "url": "https://...", "name": "APPLE INC", "currency": "USD" }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TickerDescriptor {
    pub symbol: String,
    #[serde(rename = "exch")]
    pub exchange: String,
    pub url: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TickerDescriptor {
    pub fn new(symbol: &str, exchange: &str, url: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            exchange: exchange.to_string(),
            url: url.to_string(),
            extra: Map::new(),
        }
    }

    /// Attach a passthrough field.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }

    /// The dedup key, `symbol.exchange`.
    pub fn key(&self) -> String {
        format!("{}.{}", self.symbol, self.exchange)
    }

    /// Merge the descriptor with the extracted fields; extracted fields win on a name clash.
    pub fn merge(&self, fields: &Fields) -> Record {
        let mut record = self.extra.clone();
        record.insert("symbol".to_string(), Value::from(self.symbol.as_str()));
        record.insert("exch".to_string(), Value::from(self.exchange.as_str()));
        record.insert("url".to_string(), Value::from(self.url.as_str()));
        for (name, value) in fields {
            record.insert(name.to_string(), Value::from(value.as_str()));
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_key_joins_symbol_and_exchange() {
        let ticker = TickerDescriptor::new("AAPL", "NASDAQ", "http://x/aapl");
        assert_eq!(ticker.key(), "AAPL.NASDAQ");
    }

    #[test]
    fn catalog_entry_keeps_passthrough_fields() {
        let ticker: TickerDescriptor = serde_json::from_str(
            r#"{"symbol": "VOD", "exch": "LSE", "url": "http://x/vod", "name": "VODAFONE", "currency": "GBP"}"#,
        )
        .unwrap();

        assert_eq!(ticker.exchange, "LSE");
        assert_eq!(ticker.extra.get("name"), Some(&Value::from("VODAFONE")));
        assert_eq!(ticker.extra.get("currency"), Some(&Value::from("GBP")));
        assert!(!ticker.extra.contains_key("exch"));
    }

    #[test]
    fn merge_prefers_extracted_fields() {
        let ticker = TickerDescriptor::new("VOD", "LSE", "http://x/vod").with("ISIN", "stale");
        let fields = Fields::from([("ISIN", "GB00BH4HKS39".to_string())]);

        let record = ticker.merge(&fields);
        assert_eq!(record.get("ISIN"), Some(&Value::from("GB00BH4HKS39")));
        assert_eq!(record.get("symbol"), Some(&Value::from("VOD")));
        assert_eq!(record.get("exch"), Some(&Value::from("LSE")));
        assert_eq!(record.get("url"), Some(&Value::from("http://x/vod")));
    }
}
