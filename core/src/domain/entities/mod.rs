//! Domain entities representing core business objects.

pub mod audit;
pub mod login_attempt;
pub mod otp;
pub mod session;
pub mod token;
pub mod user;


pub use audit::{AuditEvent, AuditEventType};
pub use login_attempt::LoginAttemptRecord;
pub use otp::{OtpChallenge, OtpChannel, OtpCheck, OtpDispatch, TrustedOtpSession};
pub use session::{hash_secret, ClientInfo, SessionRecord};
pub use token::{Claims, SESSION_TOKEN_TTL_HOURS};
pub use user::{
    AccountStatus, AdminLevel, AuthenticatedIdentity, LocationCodes, RoleCode, UserRecord,
    SUPERUSER_ROLE,
};
