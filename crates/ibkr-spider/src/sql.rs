use crate::error::PersistError;

/// Column types of the output table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SqlType {
    Double,
    Text,
    Timestamp,
}

impl SqlType {
    fn as_sql(self) -> &'static str {
        match self {
            SqlType::Double => "DOUBLE PRECISION",
            SqlType::Text => "TEXT",
            SqlType::Timestamp => "TIMESTAMPTZ",
        }
    }
}

/// `table` or `schema.table`, each part a plain identifier; returned quoted.
pub(crate) fn table_name(table: &str) -> Result<String, PersistError> {
    let parts: Vec<&str> = table.split('.').collect();
    let valid = parts.len() <= 2
        && parts.iter().all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        });

    if !valid {
        return Err(PersistError::InvalidTable(table.to_string()));
    }
    Ok(parts
        .iter()
        .map(|part| quote(part))
        .collect::<Vec<_>>()
        .join("."))
}

pub(crate) fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// `CREATE TABLE IF NOT EXISTS ...` for the given (already quoted) table.
pub(crate) fn create_table(table: &str, columns: &[(String, SqlType)]) -> String {
    let columns: Vec<String> = columns
        .iter()
        .map(|(name, ty)| format!("{} {}", quote(name), ty.as_sql()))
        .collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (\n    {}\n)",
        columns.join(",\n    ")
    )
}

/// `INSERT INTO ... VALUES ($1, ...)` for the given (already quoted) table.
pub(crate) fn insert_row(table: &str, columns: &[(String, SqlType)]) -> String {
    let names: Vec<String> = columns.iter().map(|(name, _)| quote(name)).collect();
    let params: Vec<String> = (1..=columns.len()).map(|i| format!("${i}")).collect();
    format!(
        "INSERT INTO {table} ({}) VALUES ({})",
        names.join(", "),
        params.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_names_are_validated() {
        assert_eq!(table_name("ext4_tickers").unwrap(), "\"ext4_tickers\"");
        assert_eq!(
            table_name("staging.ext4_tickers").unwrap(),
            "\"staging\".\"ext4_tickers\""
        );
        assert!(table_name("").is_err());
        assert!(table_name("a.b.c").is_err());
        assert!(table_name("4tickers").is_err());
        assert!(table_name("tickers; DROP TABLE x").is_err());
    }

    #[test]
    fn statements_are_built() {
        let columns = vec![
            ("ticker".to_string(), SqlType::Text),
            ("closing_price".to_string(), SqlType::Double),
            ("timestamp_created_utc".to_string(), SqlType::Timestamp),
        ];

        assert_eq!(
            create_table("\"t\"", &columns),
            "CREATE TABLE IF NOT EXISTS \"t\" (\n    \"ticker\" TEXT,\n    \"closing_price\" DOUBLE PRECISION,\n    \"timestamp_created_utc\" TIMESTAMPTZ\n)"
        );
        assert_eq!(
            insert_row("\"t\"", &columns),
            "INSERT INTO \"t\" (\"ticker\", \"closing_price\", \"timestamp_created_utc\") VALUES ($1, $2, $3)"
        );
    }
}
