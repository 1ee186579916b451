//! Twilio SMS delivery
//!
//! Posts to the Messages API with basic auth. Retries server errors and
//! rate limiting with exponential backoff; client errors fail immediately.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use wg_core::domain::entities::OtpChannel;
use wg_core::errors::DomainError;
use wg_core::services::otp::OtpDelivery;
use wg_shared::validation::mask_phone;

use crate::InfrastructureError;

const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";

/// Twilio configuration
#[derive(Debug, Clone)]
pub struct TwilioConfig {
    /// Twilio Account SID
    pub account_sid: String,
    /// Twilio Auth Token
    pub auth_token: String,
    /// From phone number (must be a Twilio phone number)
    pub from_number: String,
    /// Maximum attempts per message
    pub max_retries: u32,
    /// Initial retry delay in milliseconds
    pub retry_delay_ms: u64,
    /// Timeout for API requests in seconds
    pub request_timeout_secs: u64,
    pub api_base: String,
}

impl TwilioConfig {
    pub fn new(account_sid: String, auth_token: String, from_number: String) -> Self {
        Self {
            account_sid,
            auth_token,
            from_number,
            max_retries: 3,
            retry_delay_ms: 1000,
            request_timeout_secs: 10,
            api_base: TWILIO_API_BASE.to_string(),
        }
    }

    pub fn messages_url(&self) -> String {
        format!(
            "{}/Accounts/{}/Messages.json",
            self.api_base.trim_end_matches('/'),
            self.account_sid
        )
    }

    pub fn authorization_header(&self) -> String {
        let credentials = format!("{}:{}", self.account_sid, self.auth_token);
        format!("Basic {}", STANDARD.encode(credentials))
    }
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    sid: String,
}

pub struct TwilioOtpDelivery {
    client: reqwest::Client,
    config: TwilioConfig,
}

impl TwilioOtpDelivery {
    pub fn new(config: TwilioConfig) -> Result<Self, InfrastructureError> {
        if config.account_sid.is_empty() || config.auth_token.is_empty() {
            return Err(InfrastructureError::Config(
                "Twilio account SID and auth token are required".to_string(),
            ));
        }
        if !config.from_number.starts_with('+') {
            return Err(InfrastructureError::Config(
                "Twilio from number must be in E.164 format (starting with '+')".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        info!(from = %mask_phone(&config.from_number), "Twilio OTP delivery initialized");
        Ok(Self { client, config })
    }

    /// Send one SMS, returning the message SID
    async fn send_with_retry(&self, to: &str, body: &str) -> Result<String, InfrastructureError> {
        let mut attempts = 0;
        let mut delay = Duration::from_millis(self.config.retry_delay_ms);

        loop {
            attempts += 1;
            debug!(to = %mask_phone(to), attempt = attempts, "Sending OTP SMS");

            let response = self
                .client
                .post(self.config.messages_url())
                .header(reqwest::header::AUTHORIZATION, self.config.authorization_header())
                .form(&[("To", to), ("From", self.config.from_number.as_str()), ("Body", body)])
                .send()
                .await;

            let retryable = match response {
                Ok(resp) if resp.status().is_success() => {
                    let message: MessageResponse = resp.json().await?;
                    info!(to = %mask_phone(to), sid = %message.sid, "OTP SMS sent");
                    return Ok(message.sid);
                }
                Ok(resp) => {
                    let status = resp.status();
                    error!(status = status.as_u16(), attempt = attempts, "Twilio rejected OTP SMS");
                    if status.is_client_error() && status != reqwest::StatusCode::TOO_MANY_REQUESTS {
                        return Err(InfrastructureError::Delivery(format!(
                            "Twilio returned {}",
                            status
                        )));
                    }
                    format!("Twilio returned {}", status)
                }
                Err(e) => {
                    error!(error = %e, attempt = attempts, "Twilio request failed");
                    e.to_string()
                }
            };

            if attempts >= self.config.max_retries {
                return Err(InfrastructureError::Delivery(format!(
                    "Failed to send SMS after {} attempts: {}",
                    attempts, retryable
                )));
            }

            warn!(delay_ms = delay.as_millis() as u64, "Retrying OTP SMS");
            tokio::time::sleep(delay).await;
            delay = delay.saturating_mul(2);
        }
    }
}

#[async_trait]
impl OtpDelivery for TwilioOtpDelivery {
    fn channel(&self) -> OtpChannel {
        OtpChannel::Sms
    }

    async fn send(&self, destination: &str, code: &str) -> Result<(), DomainError> {
        let body = format!("Your WardGate verification code is {}. It expires in 5 minutes.", code);
        self.send_with_retry(destination, &body).await?;
        Ok(())
    }
}

impl std::fmt::Debug for TwilioOtpDelivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioOtpDelivery")
            .field("account_sid", &self.config.account_sid)
            .field("from_number", &mask_phone(&self.config.from_number))
            .finish_non_exhaustive()
    }
}
