use chrono::Utc;
use rusqlite::{params, types::Value, Connection};
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

use super::from_row::{query_one, GOAL_COLS};

fn now() -> i64 {
    Utc::now().timestamp()
}

fn gen_id() -> String {
    Uuid::new_v4().to_string()
}

/// Identity fields are stored as canonical JSON text so that equality in SQL
/// is equality of the client's values, type included.
fn json_text(value: &serde_json::Value) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

/// Builder for targeted UPDATE statements keyed by id.
/// Always bumps `updated_at`.
struct UpdateBuilder {
    table: &'static str,
    id: String,
    fields: Vec<(&'static str, Value)>,
}

impl UpdateBuilder {
    fn new(table: &'static str, id: &str) -> Self {
        Self {
            table,
            id: id.to_string(),
            fields: Vec::new(),
        }
    }

    fn set(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.fields.push((column, value.into()));
        self
    }

    /// Returns false when no row matched the id.
    fn execute(mut self, conn: &Connection) -> Result<bool> {
        if self.fields.is_empty() {
            return Ok(false);
        }
        self.fields.push(("updated_at", now().into()));
        let sets: Vec<String> = self
            .fields
            .iter()
            .map(|(col, _)| format!("{} = ?", col))
            .collect();
        let mut values: Vec<Value> = self.fields.into_iter().map(|(_, v)| v).collect();
        values.push(self.id.into());
        let sql = format!("UPDATE {} SET {} WHERE id = ?", self.table, sets.join(", "));
        let affected = conn.execute(&sql, rusqlite::params_from_iter(values))?;
        Ok(affected > 0)
    }
}

// ============ Goals ============

pub fn create_goal(conn: &Connection, input: &CreateGoal) -> Result<Goal> {
    let id = gen_id();
    let now = now();
    let details = serde_json::to_string(&input.details)?;
    let user_id = json_text(&input.user_id)?;
    let title = json_text(&input.title)?;
    let deadline = json_text(&input.deadline)?;

    conn.execute(
        "INSERT INTO goals (id, user_id, title, deadline, status, stripe_session_id, payment_method_id, payment_setup_complete, details, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, 0, ?7, ?8, ?8)",
        params![
            &id,
            &user_id,
            &title,
            &deadline,
            input.status.as_str(),
            &input.stripe_session_id,
            &details,
            now,
        ],
    )?;

    Ok(Goal {
        id,
        user_id: input.user_id.clone(),
        title: input.title.clone(),
        deadline: input.deadline.clone(),
        status: input.status.clone(),
        stripe_session_id: input.stripe_session_id.clone(),
        payment_method_id: None,
        payment_setup_complete: false,
        details: input.details.clone(),
        created_at: now,
        updated_at: now,
    })
}

pub fn get_goal_by_id(conn: &Connection, id: &str) -> Result<Option<Goal>> {
    query_one(
        conn,
        &format!("SELECT {} FROM goals WHERE id = ?1", GOAL_COLS),
        &[&id],
    )
}

/// Oldest goal bound to a checkout session. More than one can only exist if
/// two completions for the same session raced.
pub fn get_goal_by_session(conn: &Connection, session_id: &str) -> Result<Option<Goal>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM goals WHERE stripe_session_id = ?1
             ORDER BY created_at ASC, rowid ASC LIMIT 1",
            GOAL_COLS
        ),
        &[&session_id],
    )
}

/// Newest pending goal matching the user, title and deadline.
pub fn find_pending_goal(conn: &Connection, key: &GoalKey) -> Result<Option<Goal>> {
    let user_id = json_text(&key.user_id)?;
    let title = json_text(&key.title)?;
    let deadline = json_text(&key.deadline)?;
    query_one(
        conn,
        &format!(
            "SELECT {} FROM goals
             WHERE status = 'pending' AND user_id = ?1 AND title = ?2 AND deadline = ?3
             ORDER BY created_at DESC, rowid DESC LIMIT 1",
            GOAL_COLS
        ),
        &[&user_id, &title, &deadline],
    )
}

pub fn update_goal_status(conn: &Connection, id: &str, status: &GoalStatus) -> Result<bool> {
    UpdateBuilder::new("goals", id)
        .set("status", status.as_str().to_string())
        .execute(conn)
}

pub fn set_goal_session(conn: &Connection, id: &str, session_id: &str) -> Result<bool> {
    UpdateBuilder::new("goals", id)
        .set("stripe_session_id", session_id.to_string())
        .execute(conn)
}

pub fn set_goal_payment_method(
    conn: &Connection,
    id: &str,
    payment_method_id: &str,
) -> Result<bool> {
    UpdateBuilder::new("goals", id)
        .set("payment_method_id", payment_method_id.to_string())
        .execute(conn)
}

pub fn mark_goal_payment_setup_complete(conn: &Connection, id: &str) -> Result<bool> {
    UpdateBuilder::new("goals", id)
        .set("payment_setup_complete", 1i64)
        .execute(conn)
}
