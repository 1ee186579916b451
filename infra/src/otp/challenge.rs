//! In-memory OTP challenge service

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::{Rng, RngCore};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use wg_core::domain::entities::{
    hash_secret, OtpChallenge, OtpChannel, OtpCheck, OtpDispatch, TrustedOtpSession, UserRecord,
};
use wg_core::errors::{AuthError, DomainError};
use wg_core::services::otp::{OtpChallengeService, OtpDelivery};
use wg_shared::OtpConfig;

/// Code and session parameters
#[derive(Debug, Clone)]
pub struct OtpChallengeSettings {
    pub code_length: usize,
    pub code_ttl: Duration,
    pub max_attempts: u32,
    pub trusted_session_ttl: Duration,
}

impl Default for OtpChallengeSettings {
    fn default() -> Self {
        Self::from(&OtpConfig::default())
    }
}

impl From<&OtpConfig> for OtpChallengeSettings {
    fn from(config: &OtpConfig) -> Self {
        Self {
            code_length: config.code_length.clamp(4, 10),
            code_ttl: Duration::seconds(config.expiry_seconds),
            max_attempts: config.max_attempts.max(1),
            trusted_session_ttl: Duration::seconds(config.trusted_session_ttl_seconds),
        }
    }
}

#[derive(Debug)]
struct TrustedEntry {
    subject_id: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct OtpState {
    challenges: HashMap<String, OtpChallenge>,
    /// Keyed by SHA-256 of the trusted session token
    trusted: HashMap<String, TrustedEntry>,
}

/// Pending challenges and trusted OTP sessions held in process memory
pub struct InMemoryOtpChallengeService {
    delivery: Arc<dyn OtpDelivery>,
    settings: OtpChallengeSettings,
    state: Mutex<OtpState>,
}

impl InMemoryOtpChallengeService {
    pub fn new(delivery: Arc<dyn OtpDelivery>, settings: OtpChallengeSettings) -> Self {
        Self {
            delivery,
            settings,
            state: Mutex::new(OtpState::default()),
        }
    }

    pub fn settings(&self) -> &OtpChallengeSettings {
        &self.settings
    }

    pub fn pending_challenges(&self) -> usize {
        self.lock().challenges.len()
    }

    pub fn trusted_sessions(&self) -> usize {
        self.lock().trusted.len()
    }

    /// Drop expired challenges and trusted sessions
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut state = self.lock();
        let before = state.challenges.len() + state.trusted.len();
        state.challenges.retain(|_, c| !c.is_expired_at(now));
        state.trusted.retain(|_, t| t.expires_at > now);
        let removed = before - (state.challenges.len() + state.trusted.len());
        if removed > 0 {
            debug!(removed, "Purged expired OTP challenges and sessions");
        }
        removed
    }

    /// Periodically purge expired entries until the handle is aborted
    pub fn spawn_sweeper(self: &Arc<Self>, every: std::time::Duration) -> JoinHandle<()> {
        let service = Arc::clone(self);
        info!(interval_secs = every.as_secs(), "Starting OTP challenge sweeper");
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                service.purge_expired(Utc::now());
            }
        })
    }

    pub fn validate_at(
        &self,
        subject_id: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<TrustedOtpSession, DomainError> {
        let mut state = self.lock();

        let Some(challenge) = state.challenges.get_mut(subject_id) else {
            return Err(AuthError::OtpExpired.into());
        };

        match challenge.check(code, now) {
            OtpCheck::Accepted => {
                let session = TrustedOtpSession {
                    token: challenge.resolve(generate_session_token()).to_string(),
                    expires_at: now + self.settings.trusted_session_ttl,
                };
                state.challenges.remove(subject_id);
                state.trusted.insert(
                    hash_secret(&session.token),
                    TrustedEntry {
                        subject_id: subject_id.to_string(),
                        expires_at: session.expires_at,
                    },
                );
                info!(subject = subject_id, "OTP accepted");
                Ok(session)
            }
            OtpCheck::Rejected { attempts_remaining } => {
                debug!(subject = subject_id, attempts_remaining, "OTP rejected");
                Err(AuthError::InvalidOtp { attempts_remaining }.into())
            }
            OtpCheck::Expired => {
                state.challenges.remove(subject_id);
                Err(AuthError::OtpExpired.into())
            }
            OtpCheck::Exhausted => {
                state.challenges.remove(subject_id);
                warn!(subject = subject_id, "OTP attempts exhausted, challenge discarded");
                Err(AuthError::OtpAttemptsExhausted.into())
            }
        }
    }

    pub fn has_valid_session_at(&self, subject_id: &str, session_token: &str, now: DateTime<Utc>) -> bool {
        let state = self.lock();
        state
            .trusted
            .get(&hash_secret(session_token))
            .is_some_and(|entry| entry.subject_id == subject_id && entry.expires_at > now)
    }

    #[cfg(test)]
    pub(crate) fn pending_code(&self, subject_id: &str) -> Option<String> {
        self.lock().challenges.get(subject_id).map(|c| c.code.clone())
    }

    fn destination<'a>(&self, user: &'a UserRecord) -> Result<&'a str, DomainError> {
        match self.delivery.channel() {
            OtpChannel::Email => Ok(user.email.as_str()),
            OtpChannel::Sms => user
                .phone
                .as_deref()
                .filter(|p| !p.trim().is_empty())
                .ok_or_else(|| DomainError::Validation {
                    message: "No phone number on file for SMS delivery".to_string(),
                }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, OtpState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl OtpChallengeService for InMemoryOtpChallengeService {
    fn check_destination(&self, user: &UserRecord) -> Result<(), DomainError> {
        self.destination(user).map(|_| ())
    }

    async fn generate_and_send(&self, user: &UserRecord) -> Result<OtpDispatch, DomainError> {
        let destination = self.destination(user)?;
        let subject_id = user.id.to_string();
        let code = generate_code(self.settings.code_length);
        let challenge = OtpChallenge::new(
            subject_id.clone(),
            code.clone(),
            Utc::now(),
            self.settings.code_ttl,
            self.settings.max_attempts,
        );

        // Lock is not held across delivery
        self.delivery.send(destination, &code).await?;

        let dispatch = OtpDispatch {
            subject_id: subject_id.clone(),
            expires_at: challenge.expires_at,
            channel: self.delivery.channel(),
        };
        if self.lock().challenges.insert(subject_id.clone(), challenge).is_some() {
            debug!(subject = %subject_id, "Previous OTP challenge replaced");
        }
        Ok(dispatch)
    }

    async fn validate(&self, subject_id: &str, code: &str) -> Result<TrustedOtpSession, DomainError> {
        self.validate_at(subject_id, code, Utc::now())
    }

    async fn has_valid_session(&self, subject_id: &str, session_token: &str) -> Result<bool, DomainError> {
        Ok(self.has_valid_session_at(subject_id, session_token, Utc::now()))
    }

    async fn invalidate(&self, subject_id: &str) -> Result<(), DomainError> {
        self.lock().challenges.remove(subject_id);
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryOtpChallengeService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryOtpChallengeService")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Numeric code from the OS RNG
pub(crate) fn generate_code(length: usize) -> String {
    let mut rng = OsRng;
    (0..length)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

fn generate_session_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
