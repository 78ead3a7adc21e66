//! 评估后台 Worker
//!
//! 单一评估路径：所有 ingest 请求经 mpsc 通道排队，逐个在 blocking 线程上执行，
//! 上一个完成后才取下一个。通道关闭时自动退出。

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::error::{CoreError, CoreResult};
use super::service::{AchievementService, IngestOutcome};

/// Queued ingest request
pub struct IngestRequest {
    kind: String,
    body: Value,
    received_at: Option<i64>,
    reply: oneshot::Sender<CoreResult<IngestOutcome>>,
}

/// Cloneable sender side of the ingest queue
#[derive(Debug, Clone)]
pub struct IngestHandle {
    tx: mpsc::Sender<IngestRequest>,
}

impl IngestHandle {
    /// Queue an event and wait for its evaluation
    pub async fn ingest(
        &self,
        kind: impl Into<String>,
        body: Value,
        received_at: Option<i64>,
    ) -> CoreResult<IngestOutcome> {
        let (reply, rx) = oneshot::channel();
        let request = IngestRequest {
            kind: kind.into(),
            body,
            received_at,
            reply,
        };

        self.tx
            .send(request)
            .await
            .map_err(|_| CoreError::WorkerUnavailable)?;
        rx.await.map_err(|_| CoreError::WorkerUnavailable)?
    }
}

impl std::fmt::Debug for IngestRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestRequest")
            .field("kind", &self.kind)
            .field("received_at", &self.received_at)
            .finish_non_exhaustive()
    }
}

/// 评估 Worker - the single evaluation path
pub struct IngestWorker {
    service: Arc<AchievementService>,
}

impl IngestWorker {
    pub fn new(service: Arc<AchievementService>) -> Self {
        Self { service }
    }

    /// Spawn the worker on the current runtime
    pub fn spawn(service: Arc<AchievementService>, capacity: usize) -> (IngestHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let worker = Self::new(service);
        let join = tokio::spawn(worker.run(rx));
        (IngestHandle { tx }, join)
    }

    /// 运行 worker（阻塞直到通道关闭）
    pub async fn run(self, mut rx: mpsc::Receiver<IngestRequest>) {
        tracing::info!("Ingest worker started");

        while let Some(request) = rx.recv().await {
            let IngestRequest {
                kind,
                body,
                received_at,
                reply,
            } = request;

            let service = self.service.clone();
            let result = tokio::task::spawn_blocking(move || {
                service.ingest_event(&kind, body, received_at)
            })
            .await
            .unwrap_or_else(|e| {
                tracing::error!("Ingest task panicked: {:?}", e);
                Err(CoreError::WorkerUnavailable)
            });

            match &result {
                Ok(outcome) if !outcome.unlocks.is_empty() => {
                    tracing::info!(
                        sequence = ?outcome.sequence,
                        unlocks = outcome.unlocks.len(),
                        "Event produced unlocks"
                    );
                }
                Ok(_) => {}
                Err(CoreError::Storage(e)) => {
                    tracing::error!(error = %e, "Storage failure while ingesting event");
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Event rejected");
                }
            }

            // Caller may have given up waiting
            let _ = reply.send(result);
        }

        tracing::info!("Ingest channel closed, worker stopping");
    }
}
