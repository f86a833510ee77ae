//! Test utilities and fixtures for Goalkeeper integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use serde_json::Value;
use tower::ServiceExt;

pub use goalkeeper::db::{init_db, queries, AppState, DbPool, GoalStore, SqliteGoalStore};
pub use goalkeeper::error::{AppError, Result};
pub use goalkeeper::handlers;
pub use goalkeeper::models::*;
pub use goalkeeper::payments::{
    CheckoutSession, CheckoutSessions, Expandable, PaymentMethod, SetupIntent,
};

/// Create an in-memory test database pool with schema initialized.
///
/// A single connection: every pooled in-memory connection is its own database.
pub fn setup_test_pool() -> DbPool {
    let manager = SqliteConnectionManager::memory();
    let pool = Pool::builder().max_size(1).build(manager).unwrap();
    {
        let conn = pool.get().unwrap();
        init_db(&conn).unwrap();
    }
    pool
}

/// A collaborator call observed by `RecordingGoalStore`.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    Goal(String),
    GoalBySession(String),
    PendingGoal(GoalKey),
    CreateGoal {
        status: GoalStatus,
        stripe_session_id: Option<String>,
    },
    SetStatus {
        goal_id: String,
        status: GoalStatus,
    },
    AttachSession {
        goal_id: String,
        session_id: String,
    },
    SetPaymentMethod {
        goal_id: String,
        payment_method_id: String,
    },
    MarkPaymentSetupComplete(String),
}

impl StoreCall {
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            StoreCall::Goal(_) | StoreCall::GoalBySession(_) | StoreCall::PendingGoal(_)
        )
    }
}

/// SQLite-backed store that records every call and can be told to fail
/// specific mutations.
pub struct RecordingGoalStore {
    inner: SqliteGoalStore,
    calls: Mutex<Vec<StoreCall>>,
    pub fail_payment_method: AtomicBool,
    pub fail_setup_complete: AtomicBool,
}

impl RecordingGoalStore {
    pub fn new(pool: DbPool) -> Self {
        Self {
            inner: SqliteGoalStore::new(pool),
            calls: Mutex::new(Vec::new()),
            fail_payment_method: AtomicBool::new(false),
            fail_setup_complete: AtomicBool::new(false),
        }
    }

    pub fn pool(&self) -> &DbPool {
        self.inner.pool()
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn mutations(&self) -> Vec<StoreCall> {
        self.calls().into_iter().filter(StoreCall::is_mutation).collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, call: StoreCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl GoalStore for RecordingGoalStore {
    async fn goal(&self, goal_id: &str) -> Result<Option<Goal>> {
        self.record(StoreCall::Goal(goal_id.to_string()));
        self.inner.goal(goal_id).await
    }

    async fn goal_by_session(&self, session_id: &str) -> Result<Option<Goal>> {
        self.record(StoreCall::GoalBySession(session_id.to_string()));
        self.inner.goal_by_session(session_id).await
    }

    async fn pending_goal(&self, key: &GoalKey) -> Result<Option<Goal>> {
        self.record(StoreCall::PendingGoal(key.clone()));
        self.inner.pending_goal(key).await
    }

    async fn create_goal(&self, input: &CreateGoal) -> Result<String> {
        self.record(StoreCall::CreateGoal {
            status: input.status.clone(),
            stripe_session_id: input.stripe_session_id.clone(),
        });
        self.inner.create_goal(input).await
    }

    async fn set_status(&self, goal_id: &str, status: &GoalStatus) -> Result<()> {
        self.record(StoreCall::SetStatus {
            goal_id: goal_id.to_string(),
            status: status.clone(),
        });
        self.inner.set_status(goal_id, status).await
    }

    async fn attach_session(&self, goal_id: &str, session_id: &str) -> Result<()> {
        self.record(StoreCall::AttachSession {
            goal_id: goal_id.to_string(),
            session_id: session_id.to_string(),
        });
        self.inner.attach_session(goal_id, session_id).await
    }

    async fn set_payment_method(&self, goal_id: &str, payment_method_id: &str) -> Result<()> {
        self.record(StoreCall::SetPaymentMethod {
            goal_id: goal_id.to_string(),
            payment_method_id: payment_method_id.to_string(),
        });
        if self.fail_payment_method.load(Ordering::SeqCst) {
            return Err(AppError::Internal("simulated payment method write failure".into()));
        }
        self.inner.set_payment_method(goal_id, payment_method_id).await
    }

    async fn mark_payment_setup_complete(&self, goal_id: &str) -> Result<()> {
        self.record(StoreCall::MarkPaymentSetupComplete(goal_id.to_string()));
        if self.fail_setup_complete.load(Ordering::SeqCst) {
            return Err(AppError::Internal("simulated setup-complete write failure".into()));
        }
        self.inner.mark_payment_setup_complete(goal_id).await
    }
}

/// What the fake payment provider answers with.
#[derive(Debug, Clone)]
pub enum FakeSession {
    WithPaymentMethod(String),
    WithoutPaymentMethod,
    Fail,
}

pub struct FakeCheckout {
    behavior: Mutex<FakeSession>,
    lookups: AtomicUsize,
}

impl FakeCheckout {
    pub fn new(behavior: FakeSession) -> Self {
        Self {
            behavior: Mutex::new(behavior),
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn set(&self, behavior: FakeSession) {
        *self.behavior.lock().unwrap() = behavior;
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CheckoutSessions for FakeCheckout {
    async fn retrieve_checkout_session(&self, session_id: &str) -> Result<CheckoutSession> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let behavior = self.behavior.lock().unwrap().clone();
        match behavior {
            FakeSession::Fail => Err(AppError::Payment("simulated Stripe outage".into())),
            FakeSession::WithoutPaymentMethod => Ok(test_checkout_session(session_id, None)),
            FakeSession::WithPaymentMethod(pm) => Ok(test_checkout_session(session_id, Some(pm))),
        }
    }
}

pub fn test_checkout_session(session_id: &str, payment_method_id: Option<String>) -> CheckoutSession {
    CheckoutSession {
        id: session_id.to_string(),
        mode: Some("setup".to_string()),
        setup_intent: Some(Expandable::Object(Box::new(SetupIntent {
            id: "seti_test".to_string(),
            payment_method: payment_method_id
                .map(|id| Expandable::Object(Box::new(PaymentMethod { id }))),
        }))),
    }
}

/// Test harness: app state plus handles on the fakes behind it.
pub struct TestContext {
    pub state: AppState,
    pub store: Arc<RecordingGoalStore>,
    pub checkout: Arc<FakeCheckout>,
}

impl TestContext {
    pub fn new(behavior: FakeSession) -> Self {
        let store = Arc::new(RecordingGoalStore::new(setup_test_pool()));
        let checkout = Arc::new(FakeCheckout::new(behavior));
        let state = AppState {
            goals: store.clone(),
            checkout: checkout.clone(),
        };
        Self {
            state,
            store,
            checkout,
        }
    }

    pub fn app(&self) -> Router {
        handlers::router().with_state(self.state.clone())
    }

    /// Load a goal directly from the database (not recorded).
    pub fn goal(&self, goal_id: &str) -> Option<Goal> {
        let conn = self.store.pool().get().unwrap();
        queries::get_goal_by_id(&conn, goal_id).unwrap()
    }

    /// Insert a goal directly into the database (not recorded).
    pub fn insert_goal(&self, input: &CreateGoal) -> Goal {
        let conn = self.store.pool().get().unwrap();
        queries::create_goal(&conn, input).expect("Failed to create test goal")
    }

    pub fn insert_pending_goal(
        &self,
        user_id: impl Into<Value>,
        title: impl Into<Value>,
        deadline: impl Into<Value>,
    ) -> Goal {
        self.insert_goal(&pending_goal_input(user_id, title, deadline))
    }
}

pub fn pending_goal_input(
    user_id: impl Into<Value>,
    title: impl Into<Value>,
    deadline: impl Into<Value>,
) -> CreateGoal {
    CreateGoal {
        user_id: user_id.into(),
        title: title.into(),
        deadline: deadline.into(),
        status: GoalStatus::Pending,
        stripe_session_id: None,
        details: serde_json::Map::new(),
    }
}

/// POST a raw body and return the status with the parsed JSON response.
pub async fn post_raw(app: Router, uri: &str, body: impl Into<Body>) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(body.into())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).expect("Response should be valid JSON");
    (status, json)
}

pub async fn complete(app: Router, body: &Value) -> (StatusCode, Value) {
    post_raw(app, "/goals/complete", serde_json::to_vec(body).unwrap()).await
}
