//! Recording transport for tests
//!
//! Captures every outbound message instead of delivering it, and can be
//! switched to fail every send to exercise failure tallies.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use retreat_ops::services::{MessageTransport, OutboundMessage};
use retreat_ops::utils::errors::{OpsError, Result};

#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<OutboundMessage>>,
    fail_all: AtomicBool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent send fail.
    pub fn fail_all(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait]
impl MessageTransport for RecordingTransport {
    async fn send(&self, message: &OutboundMessage) -> Result<()> {
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(OpsError::Transport("simulated failure".to_string()));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}
