//! Row mapping trait and helpers for reducing boilerplate in queries.

use rusqlite::{Connection, OptionalExtension, Row, ToSql};

use crate::models::*;

/// Trait for constructing a type from a database row.
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}

/// Query for a single optional result.
pub fn query_one<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Option<T>> {
    conn.query_row(sql, params, T::from_row)
        .optional()
        .map_err(Into::into)
}

fn json_column(row: &Row, idx: usize) -> rusqlite::Result<serde_json::Value> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

pub const GOAL_COLS: &str = "id, user_id, title, deadline, status, stripe_session_id, payment_method_id, payment_setup_complete, details, created_at, updated_at";

impl FromRow for Goal {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        // Unknown statuses land in GoalStatus::Other
        let status = row
            .get::<_, String>(4)?
            .parse::<GoalStatus>()
            .map_err(|_| {
                rusqlite::Error::InvalidColumnType(4, "status".into(), rusqlite::types::Type::Text)
            })?;

        let details_json: String = row.get(8)?;
        let details = serde_json::from_str(&details_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(Goal {
            id: row.get(0)?,
            user_id: json_column(row, 1)?,
            title: json_column(row, 2)?,
            deadline: json_column(row, 3)?,
            status,
            stripe_session_id: row.get(5)?,
            payment_method_id: row.get(6)?,
            payment_setup_complete: row.get::<_, i32>(7)? != 0,
            details,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }
}
