//! Development OTP channel

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tracing::info;

use wg_core::domain::entities::OtpChannel;
use wg_core::errors::DomainError;
use wg_core::services::otp::OtpDelivery;
use wg_shared::validation::mask_email;

/// Logs that a code was sent. The code itself is never written anywhere.
#[derive(Debug, Default)]
pub struct LoggingOtpDelivery {
    sent: AtomicUsize,
}

impl LoggingOtpDelivery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of codes "sent" so far
    pub fn sent_count(&self) -> usize {
        self.sent.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl OtpDelivery for LoggingOtpDelivery {
    fn channel(&self) -> OtpChannel {
        OtpChannel::Email
    }

    async fn send(&self, destination: &str, _code: &str) -> Result<(), DomainError> {
        self.sent.fetch_add(1, Ordering::Relaxed);
        info!(destination = %mask_email(destination), "OTP delivery simulated");
        Ok(())
    }
}
