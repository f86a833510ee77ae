use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::error::{AppError, Result};

use super::CheckoutSessions;

/// Expansion path that inlines the payment method attached by checkout.
const EXPAND_PAYMENT_METHOD: &str = "setup_intent.payment_method";

#[derive(Debug, Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: String,
    api_base: String,
}

impl StripeClient {
    /// `api_base` is `DEFAULT_STRIPE_API_BASE` in production and a local stub in tests.
    pub fn with_api_base(secret_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            secret_key: secret_key.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Fetch a checkout session, expanding `setup_intent.payment_method`.
    pub async fn get_checkout_session(&self, session_id: &str) -> Result<CheckoutSession> {
        // Session ids go straight into the URL path
        if session_id.is_empty()
            || !session_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(AppError::Payment(format!(
                "Invalid checkout session id: {:?}",
                session_id
            )));
        }

        let url = format!("{}/v1/checkout/sessions/{}", self.api_base, session_id);
        let response = self
            .client
            .get(&url)
            .basic_auth(&self.secret_key, None::<&str>)
            .query(&[("expand[]", EXPAND_PAYMENT_METHOD)])
            .send()
            .await
            .map_err(|e| AppError::Payment(format!("Stripe API error: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Payment(format!(
                "Stripe API error ({}): {}",
                status, error_text
            )));
        }

        response
            .json::<CheckoutSession>()
            .await
            .map_err(|e| AppError::Payment(format!("Failed to parse Stripe response: {}", e)))
    }
}

#[async_trait]
impl CheckoutSessions for StripeClient {
    async fn retrieve_checkout_session(&self, session_id: &str) -> Result<CheckoutSession> {
        self.get_checkout_session(session_id).await
    }
}

/// A Stripe field that is either a bare id or, when expanded, the full object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Expandable<T> {
    Id(String),
    Object(Box<T>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub mode: Option<String>, // "setup" for goal checkouts
    #[serde(default)]
    pub setup_intent: Option<Expandable<SetupIntent>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetupIntent {
    pub id: String,
    #[serde(default)]
    pub payment_method: Option<Expandable<PaymentMethod>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentMethod {
    pub id: String,
}

impl CheckoutSession {
    /// Payment method attached through the session's setup intent.
    ///
    /// `None` when the setup intent is missing or was not expanded.
    pub fn payment_method_id(&self) -> Option<&str> {
        match self.setup_intent.as_ref()? {
            Expandable::Id(_) => None,
            Expandable::Object(intent) => match intent.payment_method.as_ref()? {
                Expandable::Id(id) => Some(id),
                Expandable::Object(method) => Some(&method.id),
            },
        }
    }
}
