mod stripe;

pub use stripe::*;

use async_trait::async_trait;

use crate::error::Result;

/// Read access to the payment provider's checkout sessions.
#[async_trait]
pub trait CheckoutSessions: Send + Sync {
    /// Retrieve a checkout session with its setup intent's payment method expanded.
    async fn retrieve_checkout_session(&self, session_id: &str) -> Result<CheckoutSession>;
}
