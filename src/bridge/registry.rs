// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory registry of transfers started over HTTP.
//!
//! Each transfer runs in its own task with its own [`TransferFlow`]. Progress
//! snapshots are forwarded over a channel into the registry so handlers can
//! read the latest state at any time.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, RwLock};
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use super::flow::{CancelHandle, TransferExecutor, TransferFlow};
use super::types::{ExecutionMode, TransferError, TransferProgress, TransferRequest};

/// Finished transfers older than this are dropped on the next insert.
const DEFAULT_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);

/// Public view of a registered transfer.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TransferRecord {
    pub id: Uuid,
    pub mode: ExecutionMode,
    pub request: TransferRequest,
    pub progress: TransferProgress,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result of a cancel request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CancelOutcome {
    /// Requested before submission; the transfer will stop.
    Accepted,
    /// The source transaction may already be broadcast; the transfer runs on.
    TooLate,
    /// The transfer already reached a terminal state.
    AlreadyFinished,
}

struct Entry {
    record: TransferRecord,
    cancel: CancelHandle,
}

pub struct TransferRegistry {
    executor: Arc<dyn TransferExecutor>,
    transfers: RwLock<HashMap<Uuid, Entry>>,
    retention: Duration,
}

impl TransferRegistry {
    pub fn new(executor: Arc<dyn TransferExecutor>) -> Self {
        Self {
            executor,
            transfers: RwLock::new(HashMap::new()),
            retention: DEFAULT_RETENTION,
        }
    }

    pub fn mode(&self) -> ExecutionMode {
        self.executor.mode()
    }

    /// A fresh flow on the shared executor, for one-off operations.
    pub fn flow(&self) -> TransferFlow {
        TransferFlow::new(self.executor.clone())
    }

    /// Validate `request` and run it in the background.
    pub async fn spawn(
        self: &Arc<Self>,
        request: TransferRequest,
    ) -> Result<TransferRecord, TransferError> {
        request.validate()?;

        let flow = self.flow();
        let now = Utc::now();
        let record = TransferRecord {
            id: Uuid::new_v4(),
            mode: flow.mode(),
            request: request.clone(),
            progress: TransferProgress::default(),
            created_at: now,
            updated_at: now,
        };
        let id = record.id;

        {
            let mut transfers = self.transfers.write().await;
            self.prune(&mut transfers);
            transfers.insert(
                id,
                Entry {
                    record: record.clone(),
                    cancel: flow.cancel_handle(),
                },
            );
        }

        let registry = Arc::clone(self);
        tokio::spawn(async move {
            let (tx, mut rx) = mpsc::unbounded_channel::<TransferProgress>();

            let run = async move {
                flow.start(&request, move |progress| {
                    let _ = tx.send(progress.clone());
                })
                .await
            };
            let forward = async {
                while let Some(progress) = rx.recv().await {
                    registry.update(id, progress).await;
                }
            };

            let (outcome, ()) = tokio::join!(run, forward);
            match outcome {
                Ok(_) => info!(transfer_id = %id, "Registered transfer completed"),
                Err(e) => warn!(transfer_id = %id, error = %e, "Registered transfer failed"),
            }
        });

        info!(transfer_id = %id, mode = ?record.mode, "Transfer registered");
        Ok(record)
    }

    pub async fn get(&self, id: Uuid) -> Option<TransferRecord> {
        self.transfers
            .read()
            .await
            .get(&id)
            .map(|entry| entry.record.clone())
    }

    /// Transfers that have not reached a terminal state.
    pub async fn in_flight(&self) -> usize {
        self.transfers
            .read()
            .await
            .values()
            .filter(|entry| !entry.record.progress.is_terminal())
            .count()
    }

    /// Request cancellation. `None` if the id is unknown.
    pub async fn cancel(&self, id: Uuid) -> Option<CancelOutcome> {
        let transfers = self.transfers.read().await;
        let entry = transfers.get(&id)?;
        let progress = &entry.record.progress;

        // Decided by the submission gate: a live flow publishes step 2 only
        // after the source transaction confirms.
        let outcome = if progress.is_terminal() {
            CancelOutcome::AlreadyFinished
        } else if entry.cancel.cancel() {
            CancelOutcome::Accepted
        } else {
            CancelOutcome::TooLate
        };

        info!(transfer_id = %id, outcome = ?outcome, "Transfer cancel requested");
        Some(outcome)
    }

    async fn update(&self, id: Uuid, progress: TransferProgress) {
        if let Some(entry) = self.transfers.write().await.get_mut(&id) {
            entry.record.progress = progress;
            entry.record.updated_at = Utc::now();
        }
    }

    fn prune(&self, transfers: &mut HashMap<Uuid, Entry>) {
        let Ok(retention) = chrono::Duration::from_std(self.retention) else {
            return;
        };
        let cutoff = Utc::now() - retention;
        transfers.retain(|_, entry| {
            !entry.record.progress.is_terminal() || entry.record.updated_at > cutoff
        });
    }
}
