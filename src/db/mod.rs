mod from_row;
mod schema;
mod store;
pub mod queries;

pub use schema::init_db;
pub use store::{GoalStore, SqliteGoalStore};

use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::payments::CheckoutSessions;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Application state: the collaborators the handlers call into.
#[derive(Clone)]
pub struct AppState {
    /// Goal records (queries and targeted mutations)
    pub goals: Arc<dyn GoalStore>,
    /// Payment provider checkout-session lookups
    pub checkout: Arc<dyn CheckoutSessions>,
}

pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path);
    Pool::builder().max_size(10).build(manager)
}
