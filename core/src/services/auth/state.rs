//! Login state machine

use serde::Serialize;
use tracing::info;

use crate::errors::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoginState {
    Unauthenticated,
    CredentialsOk,
    ChallengePending,
    Authenticated,
    /// Challenge failed; only a fresh login leaves this state
    Locked,
}

impl LoginState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoginState::Unauthenticated => "UNAUTHENTICATED",
            LoginState::CredentialsOk => "CREDENTIALS_OK",
            LoginState::ChallengePending => "CHALLENGE_PENDING",
            LoginState::Authenticated => "AUTHENTICATED",
            LoginState::Locked => "LOCKED",
        }
    }

    pub fn can_transition_to(self, next: LoginState) -> bool {
        use LoginState::*;
        matches!(
            (self, next),
            (Unauthenticated, CredentialsOk)
                | (CredentialsOk, Authenticated)
                | (CredentialsOk, ChallengePending)
                | (ChallengePending, Authenticated)
                | (ChallengePending, Locked)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, LoginState::Authenticated | LoginState::Locked)
    }
}

/// One login attempt moving through `LoginState`
#[derive(Debug)]
pub(crate) struct LoginFlow {
    subject: String,
    state: LoginState,
}

impl LoginFlow {
    pub(crate) fn start(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            state: LoginState::Unauthenticated,
        }
    }

    /// Pick up a flow that stopped at a pending challenge
    pub(crate) fn resume_challenge(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            state: LoginState::ChallengePending,
        }
    }

    pub(crate) fn state(&self) -> LoginState {
        self.state
    }

    pub(crate) fn identify(&mut self, subject: impl Into<String>) {
        self.subject = subject.into();
    }

    pub(crate) fn advance(&mut self, next: LoginState) -> Result<(), DomainError> {
        if !self.state.can_transition_to(next) {
            return Err(DomainError::internal(format!(
                "Illegal login transition {} -> {}",
                self.state.as_str(),
                next.as_str()
            )));
        }
        info!(
            subject = %self.subject,
            from = self.state.as_str(),
            to = next.as_str(),
            "Login state changed"
        );
        self.state = next;
        Ok(())
    }
}
