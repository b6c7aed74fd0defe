//! The fire-event capability: what actually gets called when a job triggers.

use async_trait::async_trait;
use herald_core::config::NotifyConfig;
use serde_json::json;
use tracing::debug;

use crate::error::{NotifyError, Result};

/// Outbound fire-event capability. The engine and dispatcher only know this
/// trait; tests substitute a recording implementation.
#[async_trait]
pub trait NotifySink: Send + Sync {
    /// Generic intent call — one reminder occurrence for `user_id`.
    async fn fire_intent(&self, user_id: &str, intent_name: &str, qualifier: &str)
        -> Result<()>;

    /// Template notification path used by recurring medication reminders.
    async fn fire_template(&self, user_id: &str) -> Result<()>;
}

/// Webhook implementation: POSTs JSON to the messaging API.
pub struct WebhookSink {
    client: reqwest::Client,
    api_base: String,
    phone_number_id: String,
    sender_name: String,
}

impl WebhookSink {
    pub fn new(config: &NotifyConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: config.api_base.clone(),
            phone_number_id: config.phone_number_id.clone(),
            sender_name: config.sender_name.clone(),
        }
    }

    async fn post(&self, path: &str, body: serde_json::Value) -> Result<()> {
        let url = format!("{}{}", self.api_base, path);
        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Delivery {
                status: status.as_u16(),
            });
        }
        debug!(%url, "notification delivered");
        Ok(())
    }
}

#[async_trait]
impl NotifySink for WebhookSink {
    async fn fire_intent(
        &self,
        user_id: &str,
        intent_name: &str,
        qualifier: &str,
    ) -> Result<()> {
        self.post(
            "/intent",
            json!({
                "user_id": user_id,
                "intent_name": intent_name,
                "query_value": qualifier,
                "phone_number_id": self.phone_number_id,
                "user_name": self.sender_name,
            }),
        )
        .await
    }

    async fn fire_template(&self, user_id: &str) -> Result<()> {
        self.post(
            "/template",
            json!({
                "user_id": user_id,
                "phone_number_id": self.phone_number_id,
                "user_name": self.sender_name,
            }),
        )
        .await
    }
}
