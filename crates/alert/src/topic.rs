//! HTTP topic publisher.
//!
//! Posts `{"topic", "title", "message"}` as JSON to the configured
//! endpoint, the publish format understood by ntfy-style notification
//! services.

use std::time::Duration;

use serde::Serialize;

use crate::{Alert, AlertError, AlertFuture, Alerter};

const PUBLISH_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Serialize, PartialEq, Eq)]
struct PublishRequest<'a> {
    topic: &'a str,
    title: &'a str,
    message: &'a str,
}

/// Publishes alerts to a static topic over HTTP.
pub struct TopicAlerter {
    http: reqwest::Client,
    endpoint: String,
    topic: String,
}

impl TopicAlerter {
    pub fn new(endpoint: impl Into<String>, topic: impl Into<String>) -> Result<Self, AlertError> {
        let http = reqwest::Client::builder()
            .timeout(PUBLISH_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            topic: topic.into(),
        })
    }

    fn request<'a>(&'a self, alert: &'a Alert) -> PublishRequest<'a> {
        PublishRequest {
            topic: &self.topic,
            title: &alert.subject,
            message: &alert.body,
        }
    }

    async fn post(&self, alert: &Alert) -> Result<(), AlertError> {
        let resp = self
            .http
            .post(&self.endpoint)
            .json(&self.request(alert))
            .send()
            .await?;
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AlertError::Endpoint {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!(topic = %self.topic, "alert published");
        Ok(())
    }
}

impl Alerter for TopicAlerter {
    fn publish<'a>(&'a self, alert: &'a Alert) -> AlertFuture<'a> {
        Box::pin(self.post(alert))
    }
}
