//! Integration tests for the wire format
//!
//! Fixtures mirror documents as providers and the discovery server send them.

use chrono::{Duration, TimeZone, Utc};
use libvpnsession::entity::*;
use libvpnsession::serializer::*;
use libvpnsession::{FormatError, TtlCache};
use serde_json::json;

const DISCOVERY_DOCUMENT: &str = r#"{
    "version": 1,
    "authorization_endpoint": "https://demo.eduvpn.nl/portal/_oauth/authorize",
    "api": {
        "create_config": "https://demo.eduvpn.nl/portal/api.php/create_config",
        "profile_list": "https://demo.eduvpn.nl/portal/api.php/profile_list",
        "system_messages": "https://demo.eduvpn.nl/portal/api.php/system_messages"
    }
}"#;

const INSTANCES_DOCUMENT: &str = r#"{
    "version": 1,
    "instances": [
        {
            "base_uri": "https://demo.eduvpn.nl/",
            "display_name": "Demo",
            "logo_uri": "https://static.eduvpn.nl/demo.png"
        },
        {
            "base_uri": "https://vpn.example.org/",
            "display_name": "Example"
        }
    ]
}"#;

#[test]
fn test_discovery_document_fixture() {
    let value = parse_document(DISCOVERY_DOCUMENT).unwrap();
    let api = deserialize_discovered_api(&value).unwrap();

    assert_eq!(api.version, 1);
    assert_eq!(api.profile_list_api, "https://demo.eduvpn.nl/portal/api.php/profile_list");
    assert_eq!(
        api.system_messages_api.as_deref(),
        Some("https://demo.eduvpn.nl/portal/api.php/system_messages")
    );
    assert_eq!(api.user_messages_api, None);

    // Absent optional endpoints are omitted, not written as null
    let out = serialize_discovered_api(&api);
    assert!(out["api"].get("user_messages").is_none());
    assert_eq!(deserialize_discovered_api(&out).unwrap(), api);
}

#[test]
fn test_instance_list_fixture() {
    let value = parse_document(INSTANCES_DOCUMENT).unwrap();
    let list = deserialize_instance_list(&value).unwrap();

    assert_eq!(list.instances.len(), 2);
    assert_eq!(list.instances[1].logo_uri, None);
    assert!(list.find("https://demo.eduvpn.nl/").is_some());

    let out = serialize_instance_list(&list);
    assert!(out["instances"][1].get("logo_uri").is_none());
    assert_eq!(deserialize_instance_list(&out).unwrap(), list);
}

#[test]
fn test_instance_list_rejects_version_2() {
    let value = json!({ "version": 2, "instances": [] });
    let err = deserialize_instance_list(&value).unwrap_err();
    assert!(matches!(err, FormatError::UnsupportedVersion(2)));
}

#[test]
fn test_profile_list_fixture() {
    let value = json!({
        "data": {
            "profile_list": [
                { "display_name": "Internet", "profile_id": "internet", "two_factor": false },
                { "display_name": "Office", "profile_id": "office", "two_factor": true }
            ]
        }
    });
    let profiles = deserialize_profile_list(&value).unwrap();
    assert_eq!(profiles, vec![
        Profile::new("Internet", "internet", false),
        Profile::new("Office", "office", true),
    ]);
    assert_eq!(serialize_profile_list(&profiles), value);
}

#[test]
fn test_profile_missing_field_is_named() {
    let value = json!({ "data": { "profile_list": [ { "display_name": "Internet", "two_factor": false } ] } });
    let err = deserialize_profile_list(&value).unwrap_err();
    assert_eq!(err.to_string(), "'profile_id' key missing");
}

#[test]
fn test_message_list_fixture() {
    let value = json!({
        "data": {
            "messages": [
                {
                    "date": "2017-03-02T12:00:00Z",
                    "type": "maintenance",
                    "start": "2017-03-05T08:00:00Z",
                    "end": "2017-03-05T10:00:00Z"
                },
                { "date": "2017-03-01T09:30:00Z", "type": "motd", "content": "hello" },
                { "date": "2017-03-01T09:30:00Z", "type": "notification", "content": "Upgrade done" }
            ]
        }
    });

    let messages = deserialize_message_list(&value).unwrap();
    assert_eq!(messages.len(), 2);

    match &messages[0] {
        Message::Maintenance(m) => {
            assert_eq!(m.start, Utc.with_ymd_and_hms(2017, 3, 5, 8, 0, 0).unwrap());
            assert_eq!(m.end - m.start, Duration::hours(2));
        }
        other => panic!("expected maintenance, got {:?}", other),
    }
    match &messages[1] {
        Message::Notification(n) => assert_eq!(n.content, "Upgrade done"),
        other => panic!("expected notification, got {:?}", other),
    }

    let out = serialize_message_list(&messages);
    assert_eq!(out["data"]["messages"][0]["date"], "2017-03-02T12:00:00Z");
    assert_eq!(deserialize_message_list(&out).unwrap(), messages);
}

#[test]
fn test_saved_lists_round_trip() {
    let instance = Instance::new("https://demo.eduvpn.nl/", "Demo", None);
    let profile = Profile::new("Internet", "internet", false);

    let tokens = vec![SavedToken::new(instance.clone(), "abc123")];
    assert_eq!(deserialize_saved_token_list(&serialize_saved_token_list(&tokens)).unwrap(), tokens);

    let saved = vec![SavedProfile::new(instance.clone(), profile, "0b4c2b3e")];
    let value = serialize_saved_profile_list(&saved);
    assert_eq!(value["data"][0]["provider"]["base_uri"], "https://demo.eduvpn.nl/");
    assert_eq!(deserialize_saved_profile_list(&value).unwrap(), saved);

    let expiry = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
    let pairs = vec![SavedKeyPair::new(instance, KeyPair::new("CERT", "KEY").with_expiry(expiry))];
    let value = serialize_saved_key_pair_list(&pairs);
    assert_eq!(value["data"][0]["key_pair"]["expiry_time_millis"], expiry.timestamp_millis());
    assert_eq!(deserialize_saved_key_pair_list(&value).unwrap(), pairs);
}

#[test]
fn test_ttl_cache_keeps_insertion_time() {
    let api = deserialize_discovered_api(&parse_document(DISCOVERY_DOCUMENT).unwrap()).unwrap();
    let now = Utc::now();

    let mut cache = TtlCache::new(60);
    cache.put_at("https://fresh.example/", api.clone(), now);
    cache.put_at("https://stale.example/", api.clone(), now - Duration::seconds(120));

    let value = serialize_discovered_api_ttl_cache(&cache);
    assert_eq!(value["purge_after_seconds"], 60);

    let restored = deserialize_discovered_api_ttl_cache(&value).unwrap();
    assert_eq!(restored.len(), 2);
    assert_eq!(restored.get_at("https://fresh.example/", now), Some(&api));
    // Staleness survives persistence
    assert_eq!(restored.get_at("https://stale.example/", now), None);
    assert_eq!(restored.get_entries(), cache.get_entries());
}

#[test]
fn test_settings_fixture() {
    let value = json!({ "use_custom_tabs": false, "force_tcp": true });
    let settings = deserialize_app_settings(&value).unwrap();
    assert!(settings.force_tcp);
    assert_eq!(serialize_app_settings(&settings), value);

    let err = deserialize_app_settings(&json!({ "use_custom_tabs": "yes", "force_tcp": true })).unwrap_err();
    assert!(matches!(err, FormatError::WrongType { .. }));
}

#[test]
fn test_malformed_json_is_format_error() {
    let err = parse_document("{\"version\": 1,").unwrap_err();
    assert!(matches!(err, FormatError::Json(_)));
}

#[test]
fn test_discovered_api_optional_endpoints() {
    let base = DiscoveredApi::new(
        "https://demo.eduvpn.nl/portal/_oauth/authorize",
        "https://demo.eduvpn.nl/portal/api.php/create_config",
        "https://demo.eduvpn.nl/portal/api.php/profile_list",
    );
    let variants = [
        base.clone(),
        base.clone().with_system_messages("https://demo.eduvpn.nl/portal/api.php/system_messages"),
        base.clone().with_user_messages("https://demo.eduvpn.nl/portal/api.php/user_messages"),
        base.with_system_messages("https://demo.eduvpn.nl/portal/api.php/system_messages")
            .with_user_messages("https://demo.eduvpn.nl/portal/api.php/user_messages"),
    ];

    for api in variants {
        let value = serialize_discovered_api(&api);
        assert_eq!(value["api"].get("system_messages").is_some(), api.system_messages_api.is_some());
        assert_eq!(value["api"].get("user_messages").is_some(), api.user_messages_api.is_some());
        assert_eq!(deserialize_discovered_api(&value).unwrap(), api);
    }
}

#[test]
fn test_key_pair_optional_expiry() {
    let without = KeyPair::new("CERT", "KEY");
    let value = serialize_key_pair(&without);
    assert!(value.get("expiry_time_millis").is_none());
    assert_eq!(deserialize_key_pair(&value).unwrap(), without);

    let with = KeyPair::new("CERT", "KEY").with_expiry(Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap());
    assert_eq!(deserialize_key_pair(&serialize_key_pair(&with)).unwrap(), with);

    let explicit_null = json!({ "certificate": "CERT", "private_key": "KEY", "expiry_time_millis": null });
    assert_eq!(deserialize_key_pair(&explicit_null).unwrap(), without);
}

#[test]
fn test_key_pair_expiry_wrong_type() {
    let value = json!({ "certificate": "CERT", "private_key": "KEY", "expiry_time_millis": "tomorrow" });
    let err = deserialize_key_pair(&value).unwrap_err();
    assert!(matches!(err, FormatError::WrongType { ref field, .. } if field == "expiry_time_millis"));
}

#[test]
fn test_extreme_key_pair_expiry_is_usable() {
    let value = json!({ "certificate": "CERT", "private_key": "KEY", "expiry_time_millis": i64::MIN });
    let pair = deserialize_key_pair(&value).unwrap();
    assert_eq!(pair.validity_at(Utc::now()), Some(CertValidity::Expired));
}

#[test]
fn test_persisted_cache_with_huge_ttl() {
    let api = deserialize_discovered_api(&parse_document(DISCOVERY_DOCUMENT).unwrap()).unwrap();
    let value = json!({
        "purge_after_seconds": i64::MAX,
        "data": [
            { "entry_date": 0, "key": "https://demo.eduvpn.nl/", "discovered_api": serialize_discovered_api(&api) }
        ]
    });

    let mut cache = deserialize_discovered_api_ttl_cache(&value).unwrap();
    assert_eq!(cache.get("https://demo.eduvpn.nl/"), Some(&api));
    assert_eq!(cache.purge(), 0);
    assert_eq!(serialize_discovered_api_ttl_cache(&cache), value);
}
