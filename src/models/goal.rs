use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use strum::EnumString;

/// Lifecycle state of a goal.
///
/// Only `pending` and `active` are driven by checkout completion. Other
/// states written elsewhere in the system are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum GoalStatus {
    Pending,
    Active,
    #[strum(default)]
    Other(String),
}

impl GoalStatus {
    pub fn as_str(&self) -> &str {
        match self {
            GoalStatus::Pending => "pending",
            GoalStatus::Active => "active",
            GoalStatus::Other(s) => s,
        }
    }
}

impl std::fmt::Display for GoalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for GoalStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// The fields a pending goal is matched on.
///
/// Values are kept exactly as the client sent them, so a numeric deadline
/// only matches the same number and never its string form.
#[derive(Debug, Clone, PartialEq)]
pub struct GoalKey {
    pub user_id: Value,
    pub title: Value,
    pub deadline: Value,
}

impl GoalKey {
    pub fn new(
        user_id: impl Into<Value>,
        title: impl Into<Value>,
        deadline: impl Into<Value>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            title: title.into(),
            deadline: deadline.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: String,
    pub user_id: Value,
    pub title: Value,
    pub deadline: Value,
    pub status: GoalStatus,
    /// Checkout session that activated this goal (at most one goal per session)
    pub stripe_session_id: Option<String>,
    pub payment_method_id: Option<String>,
    /// Set once checkout completes; gates visibility in downstream feeds
    pub payment_setup_complete: bool,
    /// Remaining caller-supplied fields, stored verbatim
    pub details: Map<String, Value>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Fields of `goalData` owned by the completion flow or by the store.
/// Caller-supplied values for these are dropped before creation.
pub const MANAGED_GOAL_FIELDS: &[&str] = &[
    "goalId",
    "_id",
    "id",
    "status",
    "stripeSessionId",
    "paymentMethodId",
    "paymentSetupComplete",
];

/// Goal payload as submitted by the checkout client.
///
/// The three identity fields must be present but may hold any JSON value.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalData {
    pub user_id: Value,
    pub title: Value,
    pub deadline: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GoalData {
    pub fn key(&self) -> GoalKey {
        GoalKey {
            user_id: self.user_id.clone(),
            title: self.title.clone(),
            deadline: self.deadline.clone(),
        }
    }

    /// Builds an active goal bound to `session_id`, dropping managed fields.
    pub fn into_active_goal(self, session_id: &str) -> CreateGoal {
        let mut details = self.extra;
        for field in MANAGED_GOAL_FIELDS {
            details.remove(*field);
        }

        CreateGoal {
            user_id: self.user_id,
            title: self.title,
            deadline: self.deadline,
            status: GoalStatus::Active,
            stripe_session_id: Some(session_id.to_string()),
            details,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateGoal {
    pub user_id: Value,
    pub title: Value,
    pub deadline: Value,
    pub status: GoalStatus,
    pub stripe_session_id: Option<String>,
    pub details: Map<String, Value>,
}
