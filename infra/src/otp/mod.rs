//! OTP challenges and delivery channels.
//!
//! - **InMemoryOtpChallengeService**: code generation, attempt tracking and trusted OTP sessions
//! - **LoggingOtpDelivery**: development channel; logs a masked destination, never the code
//! - **TwilioOtpDelivery**: SMS through the Twilio Messages API

mod challenge;
mod logging;
mod twilio;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use wg_core::services::otp::OtpDelivery;
use wg_shared::OtpDeliveryConfig;

use crate::InfrastructureError;

pub use challenge::{InMemoryOtpChallengeService, OtpChallengeSettings};
pub use logging::LoggingOtpDelivery;
pub use twilio::{TwilioConfig, TwilioOtpDelivery};

/// Build the delivery channel selected in configuration
pub fn create_otp_delivery(
    config: &OtpDeliveryConfig,
) -> Result<Arc<dyn OtpDelivery>, InfrastructureError> {
    match config {
        OtpDeliveryConfig::Log => Ok(Arc::new(LoggingOtpDelivery::new())),
        OtpDeliveryConfig::Twilio {
            account_sid,
            auth_token,
            from_number,
        } => {
            let twilio = TwilioOtpDelivery::new(TwilioConfig::new(
                account_sid.clone(),
                auth_token.clone(),
                from_number.clone(),
            ))?;
            Ok(Arc::new(twilio))
        }
    }
}
