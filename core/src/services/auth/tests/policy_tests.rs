use wg_shared::{ApiKeyConfig, MfaPolicyConfig, MfaRule};

use crate::domain::entities::{hash_secret, AdminLevel, RoleCode};
use crate::services::auth::{ApiKeyRegistry, LoginState, MfaPolicy};

#[test]
fn test_default_mfa_policy() {
    let policy = MfaPolicy::default();

    assert!(policy.requires_mfa(AdminLevel::Ward, &RoleCode::superuser()));
    assert!(policy.requires_mfa(AdminLevel::National, &RoleCode::new("national_admin")));
    assert!(policy.requires_mfa(AdminLevel::Province, &RoleCode::new("province_admin")));
    assert!(!policy.requires_mfa(AdminLevel::Ward, &RoleCode::new("ward_admin")));
    assert!(!policy.requires_mfa(AdminLevel::District, &RoleCode::new("district_admin")));
}

#[test]
fn test_most_specific_mfa_rule_wins() {
    let config = MfaPolicyConfig {
        rules: vec![
            MfaRule {
                admin_level: Some("ward".into()),
                role_code: None,
                required: true,
            },
            MfaRule {
                admin_level: Some("ward".into()),
                role_code: Some("viewer".into()),
                required: false,
            },
        ],
        default_required: false,
    };
    let policy = MfaPolicy::try_from(&config).unwrap();

    assert!(policy.requires_mfa(AdminLevel::Ward, &RoleCode::new("ward_admin")));
    assert!(!policy.requires_mfa(AdminLevel::Ward, &RoleCode::new("viewer")));
    assert!(!policy.requires_mfa(AdminLevel::District, &RoleCode::new("district_admin")));
}

#[test]
fn test_unknown_level_in_mfa_rule_is_rejected() {
    let config = MfaPolicyConfig {
        rules: vec![MfaRule {
            admin_level: Some("galaxy".into()),
            role_code: None,
            required: true,
        }],
        default_required: false,
    };
    assert!(MfaPolicy::try_from(&config).is_err());
}

fn api_key(name: &str, key: &str) -> ApiKeyConfig {
    ApiKeyConfig {
        name: name.into(),
        key_sha256: hash_secret(key).to_uppercase(),
        role_code: "viewer".into(),
        admin_level: "province".into(),
        province_code: Some("P1".into()),
        district_code: None,
        municipal_code: None,
        ward_code: None,
    }
}

#[test]
fn test_api_key_registry_matches_digest() {
    let registry =
        ApiKeyRegistry::try_from([api_key("reports", "k-one"), api_key("sync", "k-two")].as_slice()).unwrap();

    let principal = registry.authenticate("k-two").unwrap();
    assert_eq!(principal.name, "sync");
    assert_eq!(principal.identity.subject_id, "api-key:sync");
    assert_eq!(principal.identity.admin_level, AdminLevel::Province);

    assert!(registry.authenticate("k-three").is_none());
    assert!(registry.authenticate("").is_none());
}

#[test]
fn test_api_key_with_bad_digest_is_rejected() {
    let mut config = api_key("broken", "x");
    config.key_sha256 = "abc".into();
    assert!(ApiKeyRegistry::try_from([config].as_slice()).is_err());
}

#[test]
fn test_login_state_transitions() {
    use LoginState::*;

    assert!(Unauthenticated.can_transition_to(CredentialsOk));
    assert!(CredentialsOk.can_transition_to(ChallengePending));
    assert!(CredentialsOk.can_transition_to(Authenticated));
    assert!(ChallengePending.can_transition_to(Authenticated));
    assert!(ChallengePending.can_transition_to(Locked));

    assert!(!Unauthenticated.can_transition_to(Authenticated));
    assert!(!Locked.can_transition_to(Authenticated));
    assert!(!Authenticated.can_transition_to(ChallengePending));
    assert!(Locked.is_terminal());
}
