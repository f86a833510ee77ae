//! Checkout completion for goals.
//!
//! A completed checkout session is reconciled with exactly one active goal:
//! an existing goal for the session wins, then a matching pending goal, and
//! only then is a new goal created. Attaching the payment method is
//! best-effort; marking payment setup complete is not.

use axum::{body::Bytes, extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::db::{AppState, GoalStore};
use crate::error::{AppError, Result, msg};
use crate::models::{GoalData, GoalStatus};
use crate::payments::CheckoutSessions;

/// Raw request body. Both fields are checked for presence before their
/// shape, so a missing `sessionId` is a 400 even when `goalData` is malformed.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteGoalRequest {
    #[serde(default)]
    pub session_id: Option<Value>,
    #[serde(default)]
    pub goal_data: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteGoalResponse {
    pub success: bool,
    pub goal_id: String,
    pub already_exists: bool,
}

/// Which lookup produced the goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalResolution {
    /// A goal was already bound to the session; nothing was changed
    AlreadyCompleted,
    /// A pending goal was activated and bound to the session
    ActivatedPending,
    /// No goal matched; a new active goal was created
    Created,
}

#[derive(Debug)]
pub struct GoalCompletion {
    pub goal_id: String,
    pub resolution: GoalResolution,
}

impl GoalCompletion {
    pub fn already_exists(&self) -> bool {
        self.resolution == GoalResolution::AlreadyCompleted
    }
}

impl From<GoalCompletion> for CompleteGoalResponse {
    fn from(completion: GoalCompletion) -> Self {
        Self {
            success: true,
            already_exists: completion.already_exists(),
            goal_id: completion.goal_id,
        }
    }
}

/// Recoverable failure while attaching the payment method. Logged, never fatal.
#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("checkout session lookup failed: {0}")]
    Lookup(#[source] AppError),

    #[error("storing payment method {payment_method_id} failed: {source}")]
    Persist {
        payment_method_id: String,
        #[source]
        source: AppError,
    },
}

/// POST /goals/complete
pub async fn complete_goal(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<CompleteGoalResponse>> {
    let (session_id, goal_data) = parse_request(&body)?;
    let completion = complete_checkout_goal(&state, &session_id, goal_data).await?;

    Ok(Json(completion.into()))
}

/// `null`, `false`, `0` and `""` all count as missing.
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => false,
        Value::Number(n) => n.as_f64() != Some(0.0),
        Value::String(s) => !s.is_empty(),
        Value::Bool(true) | Value::Array(_) | Value::Object(_) => true,
    }
}

/// Only missing fields yield `BadRequest`; anything malformed is an ordinary error.
fn parse_request(body: &[u8]) -> Result<(String, GoalData)> {
    let request: CompleteGoalRequest = serde_json::from_slice(body)?;

    let (Some(session_id), Some(goal_data)) = (
        request.session_id.filter(is_present),
        request.goal_data.filter(is_present),
    ) else {
        return Err(AppError::BadRequest(msg::MISSING_SESSION_OR_GOAL_DATA));
    };

    let session_id = match session_id {
        Value::String(s) => s,
        other => {
            return Err(AppError::Internal(format!(
                "sessionId must be a string, got {}",
                other
            )));
        }
    };
    let goal_data: GoalData = serde_json::from_value(goal_data)?;

    Ok((session_id, goal_data))
}

/// Resolve `session_id` to a single active goal and finish its payment setup.
///
/// The session lookup and the later write are separate round-trips, so two
/// concurrent completions of the same new session can both create a goal.
pub async fn complete_checkout_goal(
    state: &AppState,
    session_id: &str,
    goal_data: GoalData,
) -> Result<GoalCompletion> {
    if let Some(existing) = state.goals.goal_by_session(session_id).await? {
        tracing::info!(
            "Goal already completed for session {}: goal_id={}",
            session_id,
            existing.id
        );
        return Ok(GoalCompletion {
            goal_id: existing.id,
            resolution: GoalResolution::AlreadyCompleted,
        });
    }

    let pending = state.goals.pending_goal(&goal_data.key()).await?;

    let (goal_id, resolution) = match pending {
        Some(goal) => {
            tracing::debug!("Activating pending goal {} for session {}", goal.id, session_id);
            state.goals.set_status(&goal.id, &GoalStatus::Active).await?;
            state.goals.attach_session(&goal.id, session_id).await?;
            (goal.id, GoalResolution::ActivatedPending)
        }
        None => {
            tracing::debug!("No pending goal for session {}, creating one", session_id);
            let goal_id = state
                .goals
                .create_goal(&goal_data.into_active_goal(session_id))
                .await?;
            (goal_id, GoalResolution::Created)
        }
    };

    let payment_method_id = match enrich_payment_method(
        state.goals.as_ref(),
        state.checkout.as_ref(),
        &goal_id,
        session_id,
    )
    .await
    {
        Ok(pm) => pm,
        Err(e) => {
            tracing::warn!("Could not attach payment method to goal {}: {}", goal_id, e);
            None
        }
    };

    state.goals.mark_payment_setup_complete(&goal_id).await?;

    tracing::info!(
        "Goal checkout completed: session={}, goal_id={}, resolution={:?}, payment_method={:?}",
        session_id,
        goal_id,
        resolution,
        payment_method_id
    );

    Ok(GoalCompletion { goal_id, resolution })
}

/// Copy the session's payment method onto the goal.
///
/// `Ok(None)` means the session carried no payment method.
pub async fn enrich_payment_method(
    goals: &dyn GoalStore,
    checkout: &dyn CheckoutSessions,
    goal_id: &str,
    session_id: &str,
) -> std::result::Result<Option<String>, EnrichmentError> {
    let session = checkout
        .retrieve_checkout_session(session_id)
        .await
        .map_err(EnrichmentError::Lookup)?;

    let Some(payment_method_id) = session.payment_method_id() else {
        tracing::debug!(
            "Checkout session {} (mode {:?}) has no payment method",
            session_id,
            session.mode
        );
        return Ok(None);
    };

    goals
        .set_payment_method(goal_id, payment_method_id)
        .await
        .map_err(|source| EnrichmentError::Persist {
            payment_method_id: payment_method_id.to_string(),
            source,
        })?;

    Ok(Some(payment_method_id.to_string()))
}
