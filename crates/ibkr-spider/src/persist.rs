use crate::error::PersistError;
use crate::http::PgClient;
use crate::sql::{self, SqlType};
use crate::transform::{Cell, Table};
use chrono::{DateTime, Utc};
use deadpool_postgres::{ManagerConfig, Pool, RecyclingMethod, Runtime};
use futures::{stream, StreamExt};
use tokio_postgres::types::{ToSql, Type};
use tokio_postgres::NoTls;
use tracing::{debug, error, trace, warn};

type Param = Box<dyn ToSql + Sync + Send>;

/// Build a connection pool for `url`.
pub fn connect(url: &str) -> anyhow::Result<Pool> {
    trace!("creating postgres connection pool config");
    let mut pg_config = deadpool_postgres::Config::new();
    pg_config.url = Some(url.to_string());
    pg_config.manager = Some(ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    });

    let pool = pg_config.create_pool(Some(Runtime::Tokio1), NoTls)?;
    debug!("postgres connection pool established");
    Ok(pool)
}

/// Write `data` to `table`, creating the table if it doesn't exist yet.
///
/// A new table takes its column types from the data: a column holding only numbers is
/// `DOUBLE PRECISION`, the timestamp column is `TIMESTAMPTZ`, anything else is `TEXT`. Cells are
/// then bound to the types the table actually has, so later runs with a different mix of nulls
/// still fit an existing table. All rows go in one transaction, so a failing row rolls the whole
/// table back. Returns the number of rows inserted.
pub async fn insert_table(
    pg_client: &mut PgClient,
    table: &str,
    data: &Table,
) -> Result<u64, PersistError> {
    let time = std::time::Instant::now();
    let name = sql::table_name(table)?;
    if data.is_empty() {
        debug!("no rows to insert into {table}");
        return Ok(0);
    }

    let columns = column_types(data);
    pg_client
        .batch_execute(&sql::create_table(&name, &columns))
        .await
        .map_err(|err| {
            error!("failed to create {table}, error({err})");
            err
        })?;

    // preprocess pg query as transaction
    let query = pg_client.prepare(&sql::insert_row(&name, &columns)).await?;
    let types = query.params().to_vec();
    let transaction = pg_client.transaction().await?;

    let mut inserted = 0;
    let mut stream = stream::iter(&data.rows);
    while let Some(row) = stream.next().await {
        let params: Vec<Param> = row
            .iter()
            .zip(&data.columns)
            .zip(&types)
            .map(|((cell, column), ty)| bind(column, cell, ty).map(Bound::boxed))
            .collect::<Result<_, _>>()?;
        let params: Vec<&(dyn ToSql + Sync)> = params
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect();

        inserted += transaction.execute(&query, &params).await.map_err(|err| {
            error!("failed to insert row into {table}, error({err})");
            err
        })?;
        trace!("row inserted into {table}");
    }

    transaction.commit().await.map_err(|err| {
        error!("failed to commit transaction for {table}, error({err})");
        err
    })?;

    debug!(
        "{inserted} rows inserted into {table}. {}",
        crate::time_elapsed(time)
    );
    Ok(inserted)
}

pub(crate) fn column_types(data: &Table) -> Vec<(String, SqlType)> {
    data.columns
        .iter()
        .enumerate()
        .map(|(i, column)| (column.clone(), infer(data.rows.iter().map(|row| &row[i]))))
        .collect()
}

// a single non-null kind keeps its type; mixed or all-null columns are TEXT
fn infer<'a>(cells: impl Iterator<Item = &'a Cell>) -> SqlType {
    let mut inferred = None;
    for cell in cells {
        let ty = match cell {
            Cell::Null => continue,
            Cell::Number(_) => SqlType::Double,
            Cell::Text(_) => SqlType::Text,
            Cell::Timestamp(_) => SqlType::Timestamp,
        };
        match inferred {
            None => inferred = Some(ty),
            Some(seen) if seen == ty => {}
            Some(_) => return SqlType::Text,
        }
    }
    inferred.unwrap_or(SqlType::Text)
}

/// A cell converted to the Rust type of its target column.
#[derive(Debug, PartialEq)]
pub(crate) enum Bound {
    Double(Option<f64>),
    Text(Option<String>),
    Timestamp(Option<DateTime<Utc>>),
}

impl Bound {
    fn boxed(self) -> Param {
        match self {
            Bound::Double(v) => Box::new(v),
            Bound::Text(v) => Box::new(v),
            Bound::Timestamp(v) => Box::new(v),
        }
    }
}

// text that isn't a number can't go into a numeric column, and is stored as null
pub(crate) fn bind(column: &str, cell: &Cell, ty: &Type) -> Result<Bound, PersistError> {
    let bound = match *ty {
        Type::FLOAT8 => Bound::Double(match cell {
            Cell::Number(n) => Some(*n),
            Cell::Text(txt) => match txt.trim().parse::<f64>() {
                Ok(n) => Some(n),
                Err(_) => {
                    warn!("column {column} is numeric, storing \"{txt}\" as null");
                    None
                }
            },
            Cell::Null | Cell::Timestamp(_) => None,
        }),
        Type::TIMESTAMPTZ => Bound::Timestamp(match cell {
            Cell::Timestamp(t) => Some(*t),
            _ => None,
        }),
        Type::TEXT | Type::VARCHAR => Bound::Text(match cell {
            Cell::Null => None,
            cell => Some(cell.to_string()),
        }),
        _ => {
            return Err(PersistError::ColumnType {
                column: column.to_string(),
                ty: ty.to_string(),
            })
        }
    };
    Ok(bound)
}
