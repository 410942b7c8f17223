use std::fmt::Display;

use sqlx::postgres::PgRow;
use sqlx::{Encode, FromRow, PgPool, Postgres, Type};

use crate::utils::error::AppError;

/// Fetches a single row or fails with a 404 whose `source.parameter` names
/// the path parameter carrying the unknown value. The query must bind
/// exactly one value (`$1`).
pub async fn safe_query<'q, T, V>(
    pool: &PgPool,
    sql: &'q str,
    value: V,
    entity: &str,
    parameter: &str,
) -> Result<T, AppError>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    V: 'q + Encode<'q, Postgres> + Type<Postgres> + Display + Send,
{
    let shown = value.to_string();
    let row = sqlx::query_as::<Postgres, T>(sql)
        .bind(value)
        .fetch_optional(pool)
        .await?;

    row.ok_or_else(|| missing_row(entity, &shown, parameter))
}

/// The 404 produced when a looked-up row does not exist.
fn missing_row(entity: &str, value: &str, parameter: &str) -> AppError {
    AppError::not_found(parameter, format!("{entity}: {value} not found"))
}
