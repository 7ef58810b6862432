use std::time::Duration;

use anyhow::bail;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::{sync::watch, time::sleep};
use waterwise_algos::WeeklyHistoryAggregator;
use waterwise_codec::{SnapshotTree, StoreEvent, decode_snapshot};
use waterwise_types::WeeklySummary;

use crate::{RealtimeStore, display::HistoryView};

/// Keeps the weekly history view in step with the stored readings.
pub struct HistoryListener {
    aggregator: WeeklyHistoryAggregator,
    view: watch::Sender<HistoryView>,
}

impl HistoryListener {
    pub fn new(aggregator: WeeklyHistoryAggregator) -> Self {
        Self {
            aggregator,
            view: watch::Sender::new(HistoryView::Loading),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<HistoryView> {
        self.view.subscribe()
    }

    pub fn view(&self) -> HistoryView {
        self.view.borrow().clone()
    }

    /// Recomputes the summary from the full collection of stored readings.
    ///
    /// Unreadable or empty snapshots leave the current view untouched.
    pub fn apply_snapshot(&self, value: &Value, now: DateTime<Utc>) -> Option<WeeklySummary> {
        let snapshot = match decode_snapshot(value, &self.aggregator.offset()) {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                info!("No moisture history available");
                return None;
            }
            Err(error) => {
                error!("Unreadable moisture history: {error}");
                return None;
            }
        };

        for (key, error) in &snapshot.rejected {
            warn!("Skipping reading {key}: {error}");
        }

        let summary = self.aggregator.summarize(&snapshot.readings, now);
        debug!(
            "History recomputed from {} readings: {} days",
            snapshot.readings.len(),
            summary.daily_averages.len()
        );

        self.view.send_replace(HistoryView::Ready(summary.clone()));
        Some(summary)
    }
}

/// Follows the readings path until `shutdown` flips, re-subscribing after
/// `retry_delay` whenever the stream drops. Each recomputation asks `now` for
/// the current instant.
pub async fn run_history_listener<C>(
    store: &RealtimeStore,
    listener: &HistoryListener,
    retry_delay: Duration,
    now: C,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()>
where
    C: Fn() -> DateTime<Utc>,
{
    loop {
        if *shutdown.borrow() {
            break;
        }

        let mut tree = SnapshotTree::new();
        let stream = store.listen(|event| {
            match event {
                StoreEvent::Cancel(reason) => bail!("history stream cancelled: {reason}"),
                StoreEvent::AuthRevoked(reason) => bail!("history credentials revoked: {reason}"),
                event => {
                    if tree.apply(event)? {
                        listener.apply_snapshot(tree.root(), now());
                    }
                }
            }
            Ok(())
        });

        let result = tokio::select! {
            _ = shutdown.changed() => break,
            result = stream => result,
        };

        match result {
            Ok(()) => warn!("History stream closed by server"),
            Err(error) => error!("History stream failed: {error:#}"),
        }

        tokio::select! {
            _ = shutdown.changed() => break,
            _ = sleep(retry_delay) => {}
        }
    }

    Ok(())
}
