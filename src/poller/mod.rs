//! Background sampling of per-server player counts.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::history::ServerHistories;
use crate::models::ServerTarget;
use crate::query::QueryClient;

/// Handle to the polling task. Dropping it cancels the task.
pub struct Poller {
    token: CancellationToken,
    task: JoinHandle<()>,
    _guard: DropGuard,
}

impl Poller {
    /// Spawn the polling loop. The first poll runs immediately. Polls never
    /// overlap: ticks that come due while a poll is running are skipped.
    pub fn start(
        client: Arc<QueryClient>,
        targets: Vec<ServerTarget>,
        histories: Arc<ServerHistories>,
        interval: Duration,
    ) -> Self {
        let target_count = targets.len();
        // A server silent for a whole window has nothing recent left to show.
        let max_idle = interval.saturating_mul(histories.capacity().try_into().unwrap_or(u32::MAX));
        let token = CancellationToken::new();
        let guard = token.clone().drop_guard();

        let task = tokio::spawn({
            let token = token.clone();
            async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

                loop {
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => break,
                        _ = ticker.tick() => {}
                    }

                    tokio::select! {
                        biased;
                        _ = token.cancelled() => break,
                        snapshots = client.query_all(&targets) => {
                            histories.record(&snapshots);
                            tracing::debug!("Sampled player counts of {} servers", snapshots.len());

                            let pruned = histories.prune_idle(max_idle);
                            if pruned > 0 {
                                tracing::info!("Dropped {} idle server histories", pruned);
                            }
                        }
                    }
                }

                tracing::debug!("Poller task canceled");
            }
        });

        tracing::info!("Polling {} servers every {:?}", target_count, interval);

        Self {
            token,
            task,
            _guard: guard,
        }
    }

    /// Cancel the polling loop and wait for it to finish.
    pub async fn stop(mut self) {
        self.token.cancel();
        if let Err(e) = (&mut self.task).await {
            tracing::warn!("Poller task ended abnormally: {}", e);
        }
    }
}
