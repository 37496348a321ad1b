//! # Pending Replies
//!
//! Correlation table bridging `IO_SEND_AND_WAIT` to incoming replies.
//!
//! Flow:
//! 1. The send-and-wait handler calls `register()` before sending
//! 2. The message goes out carrying the process id
//! 3. The inbound listener sees a reply (`seq == -1`) and calls `complete()`
//! 4. The handler awaits the [`ReplyWaiter`] or times out
//!
//! A waiter that is dropped (timeout, aborted flow) removes its entry.

use super::errors::ExecutorError;
use super::message::{Protocol, ProtocolMessage};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, warn};

struct PendingReply {
    sender: oneshot::Sender<ProtocolMessage>,
    created_at: Instant,
    protocol: Protocol,
}

/// Counters for the correlation table.
#[derive(Debug, Default)]
pub struct PendingStats {
    /// Waiters registered
    pub total_registered: AtomicU64,
    /// Replies delivered
    pub total_completed: AtomicU64,
    /// Waiters that timed out
    pub total_timeouts: AtomicU64,
    /// Waiters cancelled or dropped
    pub total_cancelled: AtomicU64,
}

#[derive(Default)]
struct Inner {
    pending: DashMap<String, PendingReply>,
    stats: PendingStats,
}

/// Per-node table of initiators suspended on a reply.
#[derive(Clone, Default)]
pub struct PendingReplies {
    inner: Arc<Inner>,
}

impl PendingReplies {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a waiter for `process_id`. Must happen before the send.
    pub fn register(
        &self,
        process_id: &str,
        protocol: Protocol,
    ) -> Result<ReplyWaiter, ExecutorError> {
        let (tx, rx) = oneshot::channel();
        match self.inner.pending.entry(process_id.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Err(ExecutorError::DuplicateWaiter {
                    process_id: process_id.to_string(),
                })
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(PendingReply {
                    sender: tx,
                    created_at: Instant::now(),
                    protocol,
                });
            }
        }
        self.inner.stats.total_registered.fetch_add(1, Ordering::Relaxed);
        debug!(process_id, %protocol, "[sc-04] registered reply waiter");
        Ok(ReplyWaiter {
            process_id: process_id.to_string(),
            protocol,
            rx,
            inner: Arc::clone(&self.inner),
        })
    }

    /// Deliver a reply to its waiter.
    ///
    /// Returns false if no waiter is registered for the message's process id.
    pub fn complete(&self, message: ProtocolMessage) -> bool {
        let process_id = message.process_id.clone();
        let Some((_, pending)) = self.inner.pending.remove(&process_id) else {
            warn!(process_id, "[sc-04] reply for unknown or expired process");
            return false;
        };
        let elapsed = pending.created_at.elapsed();
        match pending.sender.send(message) {
            Ok(()) => {
                self.inner.stats.total_completed.fetch_add(1, Ordering::Relaxed);
                debug!(
                    process_id,
                    protocol = %pending.protocol,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "[sc-04] delivered reply"
                );
                true
            }
            Err(_) => {
                self.inner.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Drop the waiter for `process_id`, if any.
    pub fn cancel(&self, process_id: &str) -> bool {
        if self.inner.pending.remove(process_id).is_some() {
            self.inner.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Whether a waiter is registered for `process_id`.
    pub fn is_pending(&self, process_id: &str) -> bool {
        self.inner.pending.contains_key(process_id)
    }

    /// Number of registered waiters.
    pub fn pending_count(&self) -> usize {
        self.inner.pending.len()
    }

    /// Counters.
    pub fn stats(&self) -> &PendingStats {
        &self.inner.stats
    }
}

/// Receiving half of a registered waiter.
pub struct ReplyWaiter {
    process_id: String,
    protocol: Protocol,
    rx: oneshot::Receiver<ProtocolMessage>,
    inner: Arc<Inner>,
}

impl ReplyWaiter {
    /// Wait up to `timeout` for the reply. No retry on timeout.
    pub async fn wait(mut self, timeout: Duration) -> Result<ProtocolMessage, ExecutorError> {
        match tokio::time::timeout(timeout, &mut self.rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(ExecutorError::ReplyChannelClosed {
                process_id: self.process_id.clone(),
            }),
            Err(_) => {
                self.inner.stats.total_timeouts.fetch_add(1, Ordering::Relaxed);
                warn!(
                    process_id = %self.process_id,
                    protocol = %self.protocol,
                    "[sc-04] timed out waiting for reply"
                );
                Err(ExecutorError::Timeout {
                    secs: timeout.as_secs(),
                    protocol: self.protocol,
                    process_id: self.process_id.clone(),
                })
            }
        }
    }
}

impl Drop for ReplyWaiter {
    fn drop(&mut self) {
        self.inner.pending.remove(&self.process_id);
    }
}
