use rusqlite::Connection;

/// Initialize the goals schema
pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        -- Goals (commitments activated through checkout)
        -- user_id, title, deadline: canonical JSON text of the client's values
        -- details: remaining client-supplied fields as a JSON object
        CREATE TABLE IF NOT EXISTS goals (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            title TEXT NOT NULL,
            deadline TEXT NOT NULL,
            status TEXT NOT NULL,
            stripe_session_id TEXT,
            payment_method_id TEXT,
            payment_setup_complete INTEGER NOT NULL DEFAULT 0,
            details TEXT NOT NULL DEFAULT '{}',
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        -- Not UNIQUE: session dedup is a check-then-write in the completion flow
        CREATE INDEX IF NOT EXISTS idx_goals_stripe_session ON goals(stripe_session_id);
        CREATE INDEX IF NOT EXISTS idx_goals_pending_match
            ON goals(user_id, title, deadline) WHERE status = 'pending';
        "#,
    )
}
