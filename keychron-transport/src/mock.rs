//! In-memory transport for tests
//!
//! `ScriptedTransport` hands every sent report to a handler closure and queues
//! whatever it returns as the next input report. Stateful device simulators
//! capture their state behind a mutex inside the closure.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::TransportError;
use crate::protocol::REPORT_SIZE;
use crate::types::{TransportDeviceInfo, TransportType};
use crate::Transport;

type Handler = Box<dyn Fn(&[u8]) -> Option<Vec<u8>> + Send + Sync>;

/// Transport that answers requests through a closure
pub struct ScriptedTransport {
    handler: Handler,
    pending: Mutex<VecDeque<Vec<u8>>>,
    sent: Mutex<Vec<Vec<u8>>>,
    disconnected: AtomicBool,
    info: TransportDeviceInfo,
}

impl ScriptedTransport {
    /// Create a transport; returning `None` from the handler simulates silence
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&[u8]) -> Option<Vec<u8>> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            pending: Mutex::new(VecDeque::new()),
            sent: Mutex::new(Vec::new()),
            disconnected: AtomicBool::new(false),
            info: TransportDeviceInfo {
                vid: 0x3434,
                pid: 0x0B10,
                transport_type: TransportType::Virtual,
                device_path: "mock".into(),
                serial: None,
                product_name: Some("Scripted Keyboard".into()),
            },
        }
    }

    /// Make every subsequent send fail with `Disconnected`
    pub fn disconnect(&self) {
        self.disconnected.store(true, Ordering::SeqCst);
    }

    /// All reports sent so far
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().clone()
    }

    /// Number of reports sent so far
    pub fn request_count(&self) -> usize {
        self.sent.lock().len()
    }

    /// Forget recorded requests
    pub fn clear_sent(&self) {
        self.sent.lock().clear();
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send_report(&self, report: &[u8]) -> Result<(), TransportError> {
        if self.disconnected.load(Ordering::SeqCst) {
            return Err(TransportError::Disconnected);
        }
        let mut padded = vec![0u8; REPORT_SIZE];
        let len = report.len().min(REPORT_SIZE);
        padded[..len].copy_from_slice(&report[..len]);

        self.sent.lock().push(padded.clone());
        if let Some(mut resp) = (self.handler)(&padded) {
            if resp.len() < REPORT_SIZE {
                resp.resize(REPORT_SIZE, 0);
            }
            self.pending.lock().push_back(resp);
        }
        Ok(())
    }

    async fn read_report(&self, _timeout_ms: u32) -> Result<Vec<u8>, TransportError> {
        self.pending
            .lock()
            .pop_front()
            .ok_or(TransportError::Timeout)
    }

    fn device_info(&self) -> &TransportDeviceInfo {
        &self.info
    }

    async fn is_connected(&self) -> bool {
        !self.disconnected.load(Ordering::SeqCst)
    }

    async fn close(&self) -> Result<(), TransportError> {
        Ok(())
    }
}
