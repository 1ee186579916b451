use chrono::{Duration, Utc};

use crate::cache::RedisSessionRegistry;

#[test]
fn test_key_layout() {
    assert_eq!(
        RedisSessionRegistry::session_key("wardgate", "abc"),
        "wardgate:session:abc"
    );
    assert_eq!(
        RedisSessionRegistry::index_key("wardgate", "u-1"),
        "wardgate:user_sessions:u-1"
    );
}

#[test]
fn test_remaining_seconds_never_zero() {
    let now = Utc::now();
    assert_eq!(RedisSessionRegistry::remaining_seconds(now + Duration::hours(24), now), 86_400);
    assert_eq!(RedisSessionRegistry::remaining_seconds(now - Duration::seconds(5), now), 1);
}
