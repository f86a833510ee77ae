use async_trait::async_trait;

use crate::error::{AppError, Result, msg};
use crate::models::{CreateGoal, Goal, GoalKey, GoalStatus};

use super::{DbPool, queries};

/// Goal persistence as seen by the completion flow.
///
/// Every mutation is a targeted field update keyed by goal id and fails with
/// `AppError::NotFound` when the id does not exist.
#[async_trait]
pub trait GoalStore: Send + Sync {
    async fn goal(&self, goal_id: &str) -> Result<Option<Goal>>;

    async fn goal_by_session(&self, session_id: &str) -> Result<Option<Goal>>;

    async fn pending_goal(&self, key: &GoalKey) -> Result<Option<Goal>>;

    /// Returns the id of the new goal.
    async fn create_goal(&self, input: &CreateGoal) -> Result<String>;

    async fn set_status(&self, goal_id: &str, status: &GoalStatus) -> Result<()>;

    async fn attach_session(&self, goal_id: &str, session_id: &str) -> Result<()>;

    async fn set_payment_method(&self, goal_id: &str, payment_method_id: &str) -> Result<()>;

    async fn mark_payment_setup_complete(&self, goal_id: &str) -> Result<()>;
}

/// `GoalStore` backed by the pooled SQLite database.
#[derive(Clone)]
pub struct SqliteGoalStore {
    pool: DbPool,
}

impl SqliteGoalStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

fn found(updated: bool) -> Result<()> {
    if updated {
        Ok(())
    } else {
        Err(AppError::NotFound(msg::GOAL_NOT_FOUND.into()))
    }
}

#[async_trait]
impl GoalStore for SqliteGoalStore {
    async fn goal(&self, goal_id: &str) -> Result<Option<Goal>> {
        let conn = self.pool.get()?;
        queries::get_goal_by_id(&conn, goal_id)
    }

    async fn goal_by_session(&self, session_id: &str) -> Result<Option<Goal>> {
        let conn = self.pool.get()?;
        queries::get_goal_by_session(&conn, session_id)
    }

    async fn pending_goal(&self, key: &GoalKey) -> Result<Option<Goal>> {
        let conn = self.pool.get()?;
        queries::find_pending_goal(&conn, key)
    }

    async fn create_goal(&self, input: &CreateGoal) -> Result<String> {
        let conn = self.pool.get()?;
        queries::create_goal(&conn, input).map(|goal| goal.id)
    }

    async fn set_status(&self, goal_id: &str, status: &GoalStatus) -> Result<()> {
        let conn = self.pool.get()?;
        found(queries::update_goal_status(&conn, goal_id, status)?)
    }

    async fn attach_session(&self, goal_id: &str, session_id: &str) -> Result<()> {
        let conn = self.pool.get()?;
        found(queries::set_goal_session(&conn, goal_id, session_id)?)
    }

    async fn set_payment_method(&self, goal_id: &str, payment_method_id: &str) -> Result<()> {
        let conn = self.pool.get()?;
        found(queries::set_goal_payment_method(&conn, goal_id, payment_method_id)?)
    }

    async fn mark_payment_setup_complete(&self, goal_id: &str) -> Result<()> {
        let conn = self.pool.get()?;
        found(queries::mark_goal_payment_setup_complete(&conn, goal_id)?)
    }
}
