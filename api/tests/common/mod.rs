//! Shared fixtures for the HTTP tests
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use wg_api::app::{AppState, Collaborators};
use wg_core::domain::entities::{
    hash_secret, AdminLevel, LocationCodes, OtpChannel, RoleCode, UserRecord,
};
use wg_core::errors::DomainError;
use wg_core::services::otp::OtpDelivery;
use wg_infra::{InMemoryAuditSink, InMemoryCredentialStore, OtpChallengeSettings};
use wg_shared::{ApiKeyConfig, AppConfig};

pub const PASSWORD: &str = "correct horse battery";
pub const API_KEY: &str = "reporting-service-key";
pub const WARD_EMAIL: &str = "ward@example.gov";
pub const PROVINCE_EMAIL: &str = "province@example.gov";

/// Keeps the last code so a test can answer the challenge
#[derive(Default)]
pub struct CapturingDelivery {
    last_code: Mutex<Option<String>>,
}

impl CapturingDelivery {
    pub fn last_code(&self) -> String {
        self.last_code
            .lock()
            .unwrap()
            .clone()
            .expect("no code was sent")
    }
}

#[async_trait]
impl OtpDelivery for CapturingDelivery {
    fn channel(&self) -> OtpChannel {
        OtpChannel::Email
    }

    async fn send(&self, _destination: &str, code: &str) -> Result<(), DomainError> {
        *self.last_code.lock().unwrap() = Some(code.to_string());
        Ok(())
    }
}

pub struct TestContext {
    pub state: AppState,
    pub delivery: Arc<CapturingDelivery>,
    pub audit: Arc<InMemoryAuditSink>,
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.login_attempts.max_attempts = 3;
    config.auth.api_keys = vec![ApiKeyConfig {
        name: String::from("reporting"),
        key_sha256: hash_secret(API_KEY),
        role_code: String::from("viewer"),
        admin_level: String::from("district"),
        province_code: Some(String::from("P1")),
        district_code: Some(String::from("D7")),
        municipal_code: None,
        ward_code: None,
    }];
    config
}

pub fn ward_admin() -> UserRecord {
    UserRecord::new(
        WARD_EMAIL,
        bcrypt::hash(PASSWORD, 4).unwrap(),
        RoleCode::new("ward_admin"),
        AdminLevel::Ward,
        LocationCodes {
            province_code: Some(String::from("P1")),
            district_code: Some(String::from("D7")),
            municipal_code: Some(String::from("M3")),
            ward_code: Some(String::from("W12")),
        },
    )
}

pub fn province_admin() -> UserRecord {
    UserRecord::new(
        PROVINCE_EMAIL,
        bcrypt::hash(PASSWORD, 4).unwrap(),
        RoleCode::new("province_admin"),
        AdminLevel::Province,
        LocationCodes {
            province_code: Some(String::from("P1")),
            ..LocationCodes::default()
        },
    )
}

/// State over in-memory backends with the admission dispatcher running.
/// Must be called inside an async runtime.
pub fn context_with(config: AppConfig) -> TestContext {
    let delivery = Arc::new(CapturingDelivery::default());
    let audit = Arc::new(InMemoryAuditSink::new());
    let credentials = Arc::new(InMemoryCredentialStore::with_users(vec![
        ward_admin(),
        province_admin(),
    ]));

    let collaborators = Collaborators::in_memory(
        credentials,
        delivery.clone(),
        OtpChallengeSettings::from(&config.auth.otp),
    )
    .with_audit_sink(audit.clone());

    let state = AppState::assemble(&config, collaborators).unwrap();
    state.spawn_background(Duration::from_secs(60), Duration::from_millis(5));

    TestContext {
        state,
        delivery,
        audit,
    }
}

pub fn context() -> TestContext {
    context_with(test_config())
}
