//! Raw report transport. The protocol engine only ever needs three
//! operations from the OS HID stack: send a 65 byte feature report,
//! receive one back, and read whatever input report is pending. Keeping
//! that behind a trait keeps the protocol code testable without
//! hardware.

pub mod hid;

use thiserror::Error;

/// Size of a feature report on the wire, including the report page byte.
pub const FEATURE_REPORT_SIZE: usize = 65;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("hid error: {0}")]
    Hid(#[from] hidapi::HidError),
    #[error("invalid device path: {0}")]
    InvalidPath(String),
    #[error("device '{0}' is not a Steam Controller")]
    NotSteamController(String),
    #[error("device reset is not supported by this transport")]
    ResetUnsupported,
    #[error("{0}")]
    Other(String),
}

/// One discoverable controller endpoint: an opaque device path plus
/// whether it is a wireless dongle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionInfo {
    pub path: String,
    pub wireless: bool,
}

/// Raw report transport for one controller device. A transport handle is
/// exclusively owned by one controller session; dropping it releases the
/// device.
pub trait Transport {
    /// Send one feature report.
    fn send_feature(&mut self, report: &[u8; FEATURE_REPORT_SIZE]) -> Result<(), TransportError>;

    /// Receive one feature report into `report`.
    fn recv_feature(&mut self, report: &mut [u8; FEATURE_REPORT_SIZE])
        -> Result<(), TransportError>;

    /// Read a pending input report without blocking. Returns the number
    /// of bytes read; 0 means no report was pending.
    fn read_input(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;

    /// Whether [`Transport::reset`] can actually reset the device.
    fn supports_reset(&self) -> bool {
        false
    }

    /// Hard device reset (e.g. a USB port reset), used as an escalation
    /// when feature report writes keep failing.
    fn reset(&mut self) -> Result<(), TransportError> {
        Err(TransportError::ResetUnsupported)
    }
}

/// An in-memory transport with queued reads and a write history.
pub mod mock {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use super::{Transport, TransportError, FEATURE_REPORT_SIZE};

    #[derive(Default)]
    struct Inner {
        feature_responses: VecDeque<[u8; FEATURE_REPORT_SIZE]>,
        input_reports: VecDeque<Vec<u8>>,
        sent: Vec<[u8; FEATURE_REPORT_SIZE]>,
        failing_sends: usize,
        fail_all_sends: bool,
        resettable: bool,
        resets: usize,
    }

    /// Clones share the same queues, so a test can keep a handle while
    /// the session owns another.
    #[derive(Clone, Default)]
    pub struct MockTransport {
        inner: Arc<Mutex<Inner>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// A transport whose sends always fail.
        pub fn failing() -> Self {
            let transport = Self::default();
            transport.lock().fail_all_sends = true;
            transport
        }

        /// Fail the next `count` send calls before recovering.
        pub fn fail_next_sends(&self, count: usize) {
            self.lock().failing_sends = count;
        }

        /// Advertise and count the reset capability.
        pub fn with_reset(self) -> Self {
            self.lock().resettable = true;
            self
        }

        /// Queue a response for `recv_feature`.
        pub fn queue_feature_response(&self, report: [u8; FEATURE_REPORT_SIZE]) {
            self.lock().feature_responses.push_back(report);
        }

        /// Queue a raw input report for `read_input`.
        pub fn queue_input(&self, bytes: &[u8]) {
            self.lock().input_reports.push_back(bytes.to_vec());
        }

        /// Every feature report sent so far, in order.
        pub fn sent(&self) -> Vec<[u8; FEATURE_REPORT_SIZE]> {
            self.lock().sent.clone()
        }

        pub fn reset_count(&self) -> usize {
            self.lock().resets
        }

        fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
            self.inner.lock().unwrap_or_else(|e| e.into_inner())
        }
    }

    impl Transport for MockTransport {
        fn send_feature(
            &mut self,
            report: &[u8; FEATURE_REPORT_SIZE],
        ) -> Result<(), TransportError> {
            let mut inner = self.lock();
            if inner.fail_all_sends {
                return Err(TransportError::Other("simulated send failure".into()));
            }
            if inner.failing_sends > 0 {
                inner.failing_sends -= 1;
                return Err(TransportError::Other("simulated send failure".into()));
            }
            inner.sent.push(*report);
            Ok(())
        }

        fn recv_feature(
            &mut self,
            report: &mut [u8; FEATURE_REPORT_SIZE],
        ) -> Result<(), TransportError> {
            match self.lock().feature_responses.pop_front() {
                Some(response) => {
                    *report = response;
                    Ok(())
                }
                None => Err(TransportError::Other("no queued response".into())),
            }
        }

        fn read_input(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
            match self.lock().input_reports.pop_front() {
                Some(bytes) => {
                    let len = bytes.len().min(buf.len());
                    buf[..len].copy_from_slice(&bytes[..len]);
                    Ok(len)
                }
                None => Ok(0),
            }
        }

        fn supports_reset(&self) -> bool {
            self.lock().resettable
        }

        fn reset(&mut self) -> Result<(), TransportError> {
            let mut inner = self.lock();
            if !inner.resettable {
                return Err(TransportError::ResetUnsupported);
            }
            inner.resets += 1;
            Ok(())
        }
    }
}
