//! Database module - PostgreSQL source of raw passengers

use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::models::PassengerRow;

/// Create database connection pool
pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(4)
        .acquire_timeout(std::time::Duration::from_secs(10))
        .connect(database_url)
        .await
}

/// Quote a `schema.table` name as a SQL identifier
pub fn quote_table(table: &str) -> Option<String> {
    let parts: Vec<&str> = table.split('.').collect();
    if parts.is_empty() || parts.len() > 2 {
        return None;
    }

    let valid = |p: &&str| !p.is_empty() && p.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !parts.iter().all(valid) {
        return None;
    }

    Some(
        parts
            .iter()
            .map(|p| format!("\"{p}\""))
            .collect::<Vec<_>>()
            .join("."),
    )
}

/// Source columns, cast so loosely typed CSV imports still decode
fn select_sql(quoted_table: &str) -> String {
    format!(
        r#"SELECT
    "PassengerId"::BIGINT          AS passenger_id,
    "Survived"::BIGINT             AS survived,
    "Pclass"::BIGINT               AS pclass,
    "Name"::TEXT                   AS name,
    "Sex"::TEXT                    AS sex,
    "Age"::DOUBLE PRECISION        AS age,
    "SibSp"::BIGINT                AS sib_sp,
    "Parch"::BIGINT                AS parch,
    "Ticket"::TEXT                 AS ticket,
    "Fare"::DOUBLE PRECISION       AS fare,
    "Cabin"::TEXT                  AS cabin,
    "Embarked"::TEXT               AS embarked
FROM {quoted_table}
ORDER BY "PassengerId""#
    )
}

/// Fetch every passenger row
pub async fn fetch_passengers(pool: &PgPool, table: &str) -> Result<Vec<PassengerRow>, sqlx::Error> {
    let quoted = quote_table(table)
        .ok_or_else(|| sqlx::Error::Configuration(format!("invalid source table `{table}`").into()))?;

    let rows = sqlx::query_as::<_, PassengerRow>(&select_sql(&quoted))
        .fetch_all(pool)
        .await?;

    tracing::info!(rows = rows.len(), table, "Fetched source passengers");
    Ok(rows)
}
