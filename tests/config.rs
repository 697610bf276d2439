use std::time::Duration;

use freshservice_report::ReportError;
use freshservice_report::config::{ApiKey, DEFAULT_IP_FIELD, DEFAULT_OS_FIELD, ServiceConfig};
use freshservice_report::model::{Asset, value_to_text};
use freshservice_report::source::HttpAssetSource;
use freshservice_report::throttle::ThrottlePolicy;
use serde_json::json;

#[test]
fn domain_builds_the_api_root() {
    let config = ServiceConfig::for_domain("acme", ApiKey::new("secret")).expect("valid config");
    assert_eq!(config.base_url(), "https://acme.freshservice.com/api/v2/");
    assert_eq!(
        config.endpoint("/assets/143"),
        "https://acme.freshservice.com/api/v2/assets/143"
    );
    assert_eq!(config.throttle, ThrottlePolicy::default());
    assert_eq!(config.os_field, DEFAULT_OS_FIELD);
    assert_eq!(config.ip_field, DEFAULT_IP_FIELD);
}

#[test]
fn base_url_is_normalised_with_a_trailing_slash() {
    let config = ServiceConfig::with_base_url("http://localhost:8080/api/v2", ApiKey::new("k"))
        .expect("valid config");
    assert_eq!(config.endpoint("departments/4"), "http://localhost:8080/api/v2/departments/4");
}

#[test]
fn empty_api_key_is_rejected() {
    let error = ServiceConfig::for_domain("acme", ApiKey::new("  ")).expect_err("invalid");
    assert!(matches!(error, ReportError::Config(_)));
}

#[test]
fn domain_must_be_a_bare_subdomain() {
    assert!(ServiceConfig::for_domain("", ApiKey::new("k")).is_err());
    assert!(ServiceConfig::for_domain("acme/evil", ApiKey::new("k")).is_err());
}

#[test]
fn api_key_is_redacted_from_debug_output() {
    let config =
        ServiceConfig::for_domain("acme", ApiKey::new("top-secret")).expect("valid config");
    let printed = format!("{config:?}");
    assert!(!printed.contains("top-secret"));
    assert!(printed.contains("REDACTED"));
}

#[test]
fn http_source_keeps_the_configuration() {
    let mut config = ServiceConfig::for_domain("acme", ApiKey::new("k")).expect("valid config");
    config.timeout = Duration::from_secs(5);
    let source = HttpAssetSource::new(config).expect("client built");
    assert_eq!(source.config().timeout, Duration::from_secs(5));
}

#[test]
fn asset_payload_tolerates_nulls_and_reads_type_fields() {
    let asset: Asset = serde_json::from_value(json!({
        "id": 9001,
        "display_id": 143,
        "name": "ASSET-143",
        "department_id": null,
        "location_id": 3,
        "type_fields": {
            "os_23001176139": "Windows 11",
            "computer_ip_address_23001176139": null
        }
    }))
    .expect("asset parsed");

    assert_eq!(asset.department_id, None);
    assert_eq!(asset.location_id, Some(3));
    assert_eq!(asset.type_field(DEFAULT_OS_FIELD), Some("Windows 11".into()));
    assert_eq!(asset.type_field(DEFAULT_IP_FIELD), None);
}

#[test]
fn cell_text_unquotes_strings() {
    assert_eq!(value_to_text(&json!("x")), "x");
    assert_eq!(value_to_text(&json!(4)), "4");
    assert_eq!(value_to_text(&json!(null)), "");
    assert_eq!(value_to_text(&json!(true)), "true");
}
