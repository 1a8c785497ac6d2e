//! Feature report exchange. Many commands silently fail while the
//! controller radio or USB interface is busy, so every set/get goes
//! through a bounded retry loop, and responses are matched against the
//! requested feature id to weed out stale frames.

use std::time::Duration;

use thiserror::Error;

use crate::transport::{Transport, TransportError, FEATURE_REPORT_SIZE};

use super::hid_report::FeatureReport;

/// How often and how patiently a feature report is retried.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 50,
            backoff: Duration::from_micros(500),
        }
    }
}

/// Sleep seam for the retry loops, so tests can count delays instead of
/// waiting them out.
pub trait Delay {
    fn delay(&mut self, duration: Duration);
}

/// Delay by blocking the current thread.
#[derive(Debug, Default)]
pub struct ThreadDelay;

impl Delay for ThreadDelay {
    fn delay(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("feature report {feature_id:#04x} not sent after {attempts} attempts")]
    SendExhausted {
        feature_id: u8,
        attempts: usize,
        #[source]
        source: TransportError,
    },
    #[error("no response for feature report {feature_id:#04x} after {attempts} attempts")]
    RecvExhausted { feature_id: u8, attempts: usize },
}

/// Performs the set/get feature report protocol over an abstract
/// transport.
pub struct FeatureExchange<T: Transport> {
    transport: T,
    retry: RetryPolicy,
    delay: Box<dyn Delay>,
}

impl<T: Transport> FeatureExchange<T> {
    pub fn new(transport: T) -> Self {
        Self::with_policy(transport, RetryPolicy::default(), Box::new(ThreadDelay))
    }

    pub fn with_policy(transport: T, retry: RetryPolicy, delay: Box<dyn Delay>) -> Self {
        Self {
            transport,
            retry,
            delay,
        }
    }

    /// The underlying transport, e.g. for input report reads.
    pub fn transport(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Send a feature report, retrying on transport failure. A transport
    /// that supports it gets one hard reset after the first failure.
    pub fn send(&mut self, report: &FeatureReport) -> Result<(), ExchangeError> {
        let buf = report.pack();
        let attempts = self.retry.max_attempts.max(1);
        let mut last_error = None;
        for attempt in 0..attempts {
            match self.transport.send_feature(&buf) {
                Ok(()) => return Ok(()),
                Err(err) => {
                    log::trace!(
                        "send of feature report {:#04x} failed (attempt {}): {err}",
                        report.feature_id,
                        attempt + 1
                    );
                    if attempt == 0 && self.transport.supports_reset() {
                        log::warn!(
                            "feature report {:#04x} send failed, resetting device",
                            report.feature_id
                        );
                        if let Err(reset_err) = self.transport.reset() {
                            log::warn!("device reset failed: {reset_err}");
                        }
                    }
                    last_error = Some(err);
                }
            }
            if attempt + 1 < attempts {
                self.delay.delay(self.retry.backoff);
            }
        }
        // The loop only falls through after at least one failure.
        let source =
            last_error.unwrap_or_else(|| TransportError::Other("no attempts made".into()));
        Err(ExchangeError::SendExhausted {
            feature_id: report.feature_id,
            attempts,
            source,
        })
    }

    /// Request the response for `template`. The template is written
    /// first (most commands only produce a response after the request
    /// report has been set), then receive is polled until a report with
    /// the matching feature id arrives. Mismatched frames are stale
    /// responses to earlier commands and are silently discarded.
    pub fn get(&mut self, template: &FeatureReport) -> Result<FeatureReport, ExchangeError> {
        self.send(template)?;

        let attempts = self.retry.max_attempts.max(1);
        let mut buf = [0; FEATURE_REPORT_SIZE];
        for attempt in 0..attempts {
            match self.transport.recv_feature(&mut buf) {
                Ok(()) => {
                    let report = FeatureReport::unpack(&buf);
                    if report.feature_id == template.feature_id {
                        return Ok(report);
                    }
                    log::trace!(
                        "discarding stale feature report {:#04x} while waiting for {:#04x}",
                        report.feature_id,
                        template.feature_id
                    );
                }
                Err(err) => {
                    log::trace!(
                        "receive of feature report {:#04x} failed (attempt {}): {err}",
                        template.feature_id,
                        attempt + 1
                    );
                    if attempt + 1 < attempts {
                        self.delay.delay(self.retry.backoff);
                    }
                }
            }
        }
        Err(ExchangeError::RecvExhausted {
            feature_id: template.feature_id,
            attempts,
        })
    }
}
