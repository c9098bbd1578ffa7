use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{DomainEvent, EventSink, Notification};
use crate::store::SchoolStore;

/// Push transport: `(tokens, title, body, data)`.
#[async_trait]
pub trait PushDispatcher: Send + Sync {
    async fn dispatch(&self, tokens: &[String], title: &str, body: &str, data: &Value)
    -> Result<()>;
}

#[derive(Serialize)]
struct PushMessage<'a> {
    to: &'a str,
    title: &'a str,
    body: &'a str,
    data: &'a Value,
    sound: &'static str,
}

/// Posts a JSON array of messages to a push gateway.
pub struct HttpPushDispatcher {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpPushDispatcher {
    pub fn new(endpoint: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build push client")?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl PushDispatcher for HttpPushDispatcher {
    async fn dispatch(
        &self,
        tokens: &[String],
        title: &str,
        body: &str,
        data: &Value,
    ) -> Result<()> {
        let messages: Vec<PushMessage<'_>> = tokens
            .iter()
            .map(|to| PushMessage {
                to,
                title,
                body,
                data,
                sound: "default",
            })
            .collect();

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&messages)
            .send()
            .await
            .context("push gateway unreachable")?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("push gateway returned {status}");
        }
        Ok(())
    }
}

/// Used when no push gateway is configured.
pub struct LogDispatcher;

#[async_trait]
impl PushDispatcher for LogDispatcher {
    async fn dispatch(
        &self,
        tokens: &[String],
        title: &str,
        body: &str,
        _data: &Value,
    ) -> Result<()> {
        info!(recipients = tokens.len(), title, body, "Push notification (no gateway)");
        Ok(())
    }
}

/// Resolves device tokens for each cohort and hands them to the dispatcher on
/// a detached task.
pub struct PushNotifier {
    store: Arc<dyn SchoolStore>,
    dispatcher: Arc<dyn PushDispatcher>,
}

impl PushNotifier {
    pub fn new(store: Arc<dyn SchoolStore>, dispatcher: Arc<dyn PushDispatcher>) -> Self {
        Self { store, dispatcher }
    }
}

impl EventSink for PushNotifier {
    fn emit(&self, event: DomainEvent) {
        let store = self.store.clone();
        let dispatcher = self.dispatcher.clone();
        let event_id = Uuid::new_v4();

        tokio::spawn(async move {
            for note in event.notifications() {
                if let Err(e) = deliver(store.as_ref(), dispatcher.as_ref(), &note).await {
                    warn!(%event_id, event = event.name(), error = %e, "Notification delivery failed");
                }
            }
            debug!(%event_id, event = event.name(), "Notification event processed");
        });
    }
}

async fn deliver(
    store: &dyn SchoolStore,
    dispatcher: &dyn PushDispatcher,
    note: &Notification,
) -> Result<()> {
    let targets = store
        .push_targets(&note.student_ids)
        .await
        .context("failed to resolve push tokens")?;

    let tokens: Vec<String> = targets.into_iter().map(|t| t.token).collect();
    if tokens.is_empty() {
        debug!(title = %note.title, "No registered devices for cohort");
        return Ok(());
    }

    dispatcher
        .dispatch(&tokens, &note.title, &note.body, &note.data)
        .await
}
