use anyhow::{Context, bail};
use futures::StreamExt;
use reqwest::header::ACCEPT;
use serde_json::Value;
use waterwise_codec::{EventStreamDecoder, StoreEvent};

use crate::StoreConfig;

/// REST client for the realtime database holding the reading history.
#[derive(Debug, Clone)]
pub struct RealtimeStore {
    client: reqwest::Client,
    config: StoreConfig,
}

impl RealtimeStore {
    pub fn new(config: StoreConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(client: reqwest::Client, config: StoreConfig) -> Self {
        Self { client, config }
    }

    /// One-shot read of the readings path. `Value::Null` means no data.
    pub async fn fetch(&self) -> anyhow::Result<Value> {
        let url = self.config.endpoint()?;
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .context("failed to reach realtime database")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!("history read failed ({status}): {body}");
        }

        resp.json().await.context("invalid history response")
    }

    /// Streams change events for the readings path into `on_event`.
    ///
    /// Returns `Ok(())` when the server closes the stream; errors from
    /// `on_event` end the stream.
    pub async fn listen<F>(&self, mut on_event: F) -> anyhow::Result<()>
    where
        F: FnMut(StoreEvent) -> anyhow::Result<()>,
    {
        let url = self.config.endpoint()?;
        let resp = self
            .client
            .get(url)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await
            .context("failed to reach realtime database")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!("history stream refused ({status}): {body}");
        }

        info!("history stream open");
        let mut body = resp.bytes_stream();
        let mut decoder = EventStreamDecoder::new();

        while let Some(chunk) = body.next().await {
            let chunk = chunk.context("history stream interrupted")?;
            for sse in decoder.push(&chunk)? {
                match StoreEvent::try_from(sse) {
                    Ok(event) => on_event(event)?,
                    Err(error) => warn!("skipping stream event: {error}"),
                }
            }
        }

        Ok(())
    }
}
