use crate::error::ExtractError;
use scraper::{Html, Selector};
use std::collections::BTreeMap;
use tracing::trace;

/// Extracted values, keyed by field name.
pub type Fields = BTreeMap<&'static str, String>;

/// The labels collected from a contract page, in order of precedence.
pub const FIELDS: [&str; 7] = [
    "ASSETID",
    "ISIN",
    "CONID",
    "Closing Price",
    "Contract Type",
    "Exchange",
    "Country/Region",
];

/// Derived from the first entry of the `Exchange` value.
pub const PRIMARY_EXCHANGE: &str = "Primary Exchange";

// labels containing this are links, and can clash with "Exchange"
const SKIP_LABEL: &str = "Website";

lazy_static::lazy_static! {
    static ref ROW: Selector = Selector::parse("tr").expect("valid row selector");
    static ref LABEL: Selector = Selector::parse("th").expect("valid label selector");
    static ref VALUE: Selector = Selector::parse("td").expect("valid value selector");
}

/// Turns fetched page content into [`Fields`].
pub trait Extract: Send + Sync + 'static {
    fn extract(&self, content: &str) -> Result<Fields, ExtractError>;
}

/// The IBKR contract information page: a table of `<tr><th>label</th><td>value</td></tr>` rows.
#[derive(Clone, Copy, Debug, Default)]
pub struct ContractPage;

impl Extract for ContractPage {
    fn extract(&self, content: &str) -> Result<Fields, ExtractError> {
        let document = Html::parse_document(content);
        let rows = document.select(&ROW).map(|row| {
            let label = row
                .select(&LABEL)
                .next()
                .map(|cell| cell.text().collect::<String>());
            let value = row
                .select(&VALUE)
                .next()
                .map(|cell| cell.text().collect::<String>());
            (label, value)
        });

        Ok(extract_rows(rows))
    }
}

/// Match label/value rows against [`FIELDS`].
///
/// A row is skipped when it has no label, no value, or its label mentions `Website`. Otherwise
/// every field name *contained* in the label records the trimmed value; so one row may fill
/// several fields, and a later row overwrites an earlier one. An `Exchange` match also fills
/// [`PRIMARY_EXCHANGE`] with the value's first `", "` separated token.
///
/// ```rust
/// use ibkr_spider::extract::extract_rows;
///
/// let fields = extract_rows([
///     (Some("ISIN"), Some(" US0378331005 ")),
///     (Some("Exchange"), Some("NASDAQ, BATS, IEX")),
/// ]);
/// assert_eq!(fields["ISIN"], "US0378331005");
/// assert_eq!(fields["Primary Exchange"], "NASDAQ");
/// ```
pub fn extract_rows<L, V, I>(rows: I) -> Fields
where
    L: AsRef<str>,
    V: AsRef<str>,
    I: IntoIterator<Item = (Option<L>, Option<V>)>,
{
    let mut fields = Fields::new();
    for (label, value) in rows {
        let Some(label) = label else { continue };
        let label = label.as_ref();
        if label.contains(SKIP_LABEL) {
            continue;
        }
        let Some(value) = value else { continue };
        let value = value.as_ref().trim();

        for field in FIELDS {
            if !label.contains(field) {
                continue;
            }

            trace!("matched \"{label}\" to {field}");
            fields.insert(field, value.to_string());
            if field == "Exchange" {
                let primary = value.split(", ").next().unwrap_or_default();
                fields.insert(PRIMARY_EXCHANGE, primary.to_string());
            }
        }
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <table>
            <tr><th>Symbol</th><td>AAPL</td></tr>
            <tr><th>Exchange</th><td> NASDAQ, BATS, IEX </td></tr>
            <tr><th>Exchange Website</th><td>http://www.nasdaq.com</td></tr>
            <tr><th>Contract Type</th><td>Stock</td></tr>
            <tr><th>Country/Region</th><td>United States</td></tr>
            <tr><th>Closing Price</th><td>189.84</td></tr>
            <tr><th>ASSETID</th><td>AAPL</td></tr>
            <tr><th>ISIN</th><td>US0378331005</td></tr>
            <tr><th>CONID</th><td>265598</td></tr>
            <tr><th>Notes</th></tr>
            <tr><td>orphan value</td></tr>
          </table>
        </body></html>
    "#;

    #[test]
    fn website_row_is_excluded() {
        let fields = extract_rows([
            (Some("ISIN"), Some("US1234")),
            (Some("Website"), Some("http://x")),
        ]);
        assert_eq!(fields, Fields::from([("ISIN", "US1234".to_string())]));
    }

    #[test]
    fn exchange_derives_primary_exchange() {
        let fields = extract_rows([(Some("Exchange"), Some("NASDAQ, USA"))]);
        assert_eq!(fields["Exchange"], "NASDAQ, USA");
        assert_eq!(fields[PRIMARY_EXCHANGE], "NASDAQ");
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn single_exchange_is_its_own_primary() {
        let fields = extract_rows([(Some("Exchange"), Some("LSE"))]);
        assert_eq!(fields[PRIMARY_EXCHANGE], "LSE");
    }

    #[test]
    fn rows_missing_a_cell_are_skipped() {
        let fields = extract_rows([
            (None, Some("US1234")),
            (Some("ISIN"), None::<&str>),
            (Some("CONID"), Some("42")),
        ]);
        assert_eq!(fields, Fields::from([("CONID", "42".to_string())]));
    }

    #[test]
    fn labels_match_by_substring() {
        // "Primary Exchange" contains "Exchange"
        let fields = extract_rows([(Some("Primary Exchange"), Some("NYSE, ARCA"))]);
        assert_eq!(fields["Exchange"], "NYSE, ARCA");
        assert_eq!(fields[PRIMARY_EXCHANGE], "NYSE");

        // one label can fill more than one field
        let fields = extract_rows([(Some("ISIN / CONID"), Some("7"))]);
        assert_eq!(fields["ISIN"], "7");
        assert_eq!(fields["CONID"], "7");
    }

    #[test]
    fn no_matches_is_an_empty_mapping() {
        let fields = extract_rows([(Some("Symbol"), Some("AAPL"))]);
        assert!(fields.is_empty());

        let fields = ContractPage.extract("").unwrap();
        assert!(fields.is_empty());
    }

    #[test]
    fn contract_page_is_parsed() {
        let fields = ContractPage.extract(PAGE).unwrap();

        assert_eq!(fields["Exchange"], "NASDAQ, BATS, IEX");
        assert_eq!(fields[PRIMARY_EXCHANGE], "NASDAQ");
        assert_eq!(fields["Contract Type"], "Stock");
        assert_eq!(fields["Country/Region"], "United States");
        assert_eq!(fields["Closing Price"], "189.84");
        assert_eq!(fields["ASSETID"], "AAPL");
        assert_eq!(fields["ISIN"], "US0378331005");
        assert_eq!(fields["CONID"], "265598");
        assert_eq!(fields.len(), 8);
    }

    #[test]
    fn nested_markup_is_flattened_to_text() {
        let page = "<table><tr><th><b>ISIN</b></th><td><span>US</span>0378331005\n</td></tr></table>";
        let fields = ContractPage.extract(page).unwrap();
        assert_eq!(fields["ISIN"], "US0378331005");
    }
}
