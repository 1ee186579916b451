use crate::otp::{create_otp_delivery, TwilioConfig, TwilioOtpDelivery};
use wg_core::domain::entities::OtpChannel;
use wg_shared::OtpDeliveryConfig;

fn config() -> TwilioConfig {
    TwilioConfig::new("AC123".into(), "secret".into(), "+15005550006".into())
}

#[test]
fn test_messages_url_and_auth_header() {
    let config = config();
    assert_eq!(
        config.messages_url(),
        "https://api.twilio.com/2010-04-01/Accounts/AC123/Messages.json"
    );
    // base64("AC123:secret")
    assert_eq!(config.authorization_header(), "Basic QUMxMjM6c2VjcmV0");
}

#[test]
fn test_from_number_must_be_e164() {
    let mut config = config();
    config.from_number = "15005550006".into();
    assert!(TwilioOtpDelivery::new(config).is_err());
}

#[test]
fn test_factory_selects_channel() {
    let log = create_otp_delivery(&OtpDeliveryConfig::Log).unwrap();
    assert_eq!(log.channel(), OtpChannel::Email);

    let sms = create_otp_delivery(&OtpDeliveryConfig::Twilio {
        account_sid: "AC123".into(),
        auth_token: "secret".into(),
        from_number: "+15005550006".into(),
    })
    .unwrap();
    assert_eq!(sms.channel(), OtpChannel::Sms);
}
