use crate::ValueHolder;
use futures::{Stream, TryStreamExt};
use keel_core::{Error, Row, RowNames, RowSet};
use tokio_postgres::Statement;

pub(crate) fn row_to_keel_row(row: tokio_postgres::Row) -> keel_core::Result<Row> {
    (0..row.len())
        .map(|i| match row.try_get::<_, ValueHolder>(i) {
            Ok(v) => Ok(v.0),
            Err(e) => {
                let col = &row.columns()[i];
                Err(Error::new(e).context(format!(
                    "Could not deserialize column {} `{}`: {}",
                    i,
                    col.name(),
                    col.type_()
                )))
            }
        })
        .collect::<keel_core::Result<Row>>()
}

pub(crate) fn statement_labels(statement: &Statement) -> RowNames {
    statement
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect()
}

/// Drain the row stream, the labels come from the statement so an empty result keeps its columns.
pub(crate) async fn collect_rows(
    statement: &Statement,
    stream: impl Stream<Item = Result<tokio_postgres::Row, tokio_postgres::Error>>,
) -> keel_core::Result<RowSet> {
    let rows = stream
        .map_err(Error::new)
        .and_then(|row| async move { row_to_keel_row(row) })
        .try_collect::<Vec<_>>()
        .await?;
    Ok(RowSet {
        labels: statement_labels(statement),
        rows,
    })
}
