//! JSON (de)serialization of entities
//!
//! Every wire shape the client reads or writes is defined here, both for
//! documents fetched from providers and for blobs kept in preferences.
//! Deserialization is strict: a missing or wrongly typed required key, or a
//! `version` other than 1, is a [`FormatError`]. Nothing is defaulted.
//!
//! | Entity             | Shape                                                                 |
//! |--------------------|-----------------------------------------------------------------------|
//! | Profile            | `{display_name, profile_id, two_factor}`                              |
//! | Instance           | `{base_uri, display_name, logo_uri?}`                                 |
//! | InstanceList       | `{version: 1, instances: [Instance]}`                                 |
//! | DiscoveredApi      | `{version: 1, authorization_endpoint, api: {create_config, profile_list, system_messages?, user_messages?}}` |
//! | Message list       | `{data: {messages: [{date, type, start?, end?, content?}]}}`          |
//! | SavedToken list    | `{data: [{instance, access_token}]}`                                  |
//! | SavedProfile list  | `{data: [{provider, profile, profile_uuid}]}`                         |
//! | SavedKeyPair list  | `{data: [{instance, key_pair: {certificate, private_key, expiry_time_millis?}}]}` |
//! | TTL cache          | `{purge_after_seconds, data: [{entry_date, key, discovered_api}]}`    |
//! | Settings           | `{use_custom_tabs, force_tcp}`                                        |

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use tracing::warn;

use crate::cache::TtlCache;
use crate::entity::{
    DiscoveredApi, Instance, InstanceList, KeyPair, Maintenance, Message, Notification,
    Profile, SavedKeyPair, SavedProfile, SavedToken, Settings,
};
use crate::error::FormatError;

/// Date format used by the provider API, always UTC
pub const API_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

type FormatResult<T> = Result<T, FormatError>;

/// Parse raw text into a JSON tree
pub fn parse_document(text: &str) -> FormatResult<Value> {
    Ok(serde_json::from_str(text)?)
}

// === Profiles ===

pub fn serialize_profile(profile: &Profile) -> Value {
    json!({
        "display_name": profile.display_name,
        "profile_id": profile.profile_id,
        "two_factor": profile.two_factor,
    })
}

pub fn deserialize_profile(value: &Value) -> FormatResult<Profile> {
    let obj = as_object(value, "profile")?;
    Ok(Profile {
        display_name: required_str(obj, "display_name")?,
        profile_id: required_str(obj, "profile_id")?,
        two_factor: required_bool(obj, "two_factor")?,
    })
}

pub fn serialize_profile_list(profiles: &[Profile]) -> Value {
    let list: Vec<Value> = profiles.iter().map(serialize_profile).collect();
    json!({ "data": { "profile_list": list } })
}

/// Deserialize the `{data: {profile_list: [...]}}` response of a provider
pub fn deserialize_profile_list(value: &Value) -> FormatResult<Vec<Profile>> {
    let root = as_object(value, "root")?;
    let data = required_object(root, "data")?;
    required_array(data, "profile_list")?
        .iter()
        .map(deserialize_profile)
        .collect()
}

// === Instances ===

pub fn serialize_instance(instance: &Instance) -> Value {
    let mut obj = Map::new();
    obj.insert("base_uri".to_string(), json!(instance.base_uri));
    obj.insert("display_name".to_string(), json!(instance.display_name));
    if let Some(logo_uri) = &instance.logo_uri {
        obj.insert("logo_uri".to_string(), json!(logo_uri));
    }
    Value::Object(obj)
}

pub fn deserialize_instance(value: &Value) -> FormatResult<Instance> {
    let obj = as_object(value, "instance")?;
    Ok(Instance {
        base_uri: required_str(obj, "base_uri")?,
        display_name: required_str(obj, "display_name")?,
        logo_uri: optional_str(obj, "logo_uri")?,
    })
}

pub fn serialize_instance_list(list: &InstanceList) -> Value {
    let instances: Vec<Value> = list.instances.iter().map(serialize_instance).collect();
    json!({
        "version": list.version,
        "instances": instances,
    })
}

/// Deserialize a provider list; only version 1 is accepted
pub fn deserialize_instance_list(value: &Value) -> FormatResult<InstanceList> {
    let obj = as_object(value, "root")?;
    let version = required_version(obj, InstanceList::SUPPORTED_VERSION)?;
    let instances = required_array(obj, "instances")?
        .iter()
        .map(deserialize_instance)
        .collect::<FormatResult<Vec<_>>>()?;
    Ok(InstanceList { version, instances })
}

// === Discovery ===

pub fn serialize_discovered_api(api: &DiscoveredApi) -> Value {
    let mut endpoints = Map::new();
    endpoints.insert("create_config".to_string(), json!(api.create_config_api));
    endpoints.insert("profile_list".to_string(), json!(api.profile_list_api));
    if let Some(system_messages) = &api.system_messages_api {
        endpoints.insert("system_messages".to_string(), json!(system_messages));
    }
    if let Some(user_messages) = &api.user_messages_api {
        endpoints.insert("user_messages".to_string(), json!(user_messages));
    }
    json!({
        "version": api.version,
        "authorization_endpoint": api.authorization_endpoint,
        "api": endpoints,
    })
}

/// Deserialize a discovery document; only version 1 is accepted
pub fn deserialize_discovered_api(value: &Value) -> FormatResult<DiscoveredApi> {
    let obj = as_object(value, "root")?;
    let version = required_version(obj, DiscoveredApi::SUPPORTED_VERSION)?;
    let authorization_endpoint = required_str(obj, "authorization_endpoint")?;
    let api = required_object(obj, "api")?;
    Ok(DiscoveredApi {
        version,
        authorization_endpoint,
        create_config_api: required_str(api, "create_config")?,
        profile_list_api: required_str(api, "profile_list")?,
        system_messages_api: optional_str(api, "system_messages")?,
        user_messages_api: optional_str(api, "user_messages")?,
    })
}

// === Messages ===

pub fn serialize_message_list(messages: &[Message]) -> Value {
    let list: Vec<Value> = messages
        .iter()
        .map(|message| {
            let mut obj = Map::new();
            obj.insert("date".to_string(), json!(format_date(message.date())));
            obj.insert("type".to_string(), json!(message.type_tag()));
            match message {
                Message::Maintenance(m) => {
                    obj.insert("start".to_string(), json!(format_date(m.start)));
                    obj.insert("end".to_string(), json!(format_date(m.end)));
                }
                Message::Notification(n) => {
                    obj.insert("content".to_string(), json!(n.content));
                }
            }
            Value::Object(obj)
        })
        .collect();
    json!({ "data": { "messages": list } })
}

/// Deserialize a message list, dropping entries of unknown type
pub fn deserialize_message_list(value: &Value) -> FormatResult<Vec<Message>> {
    let root = as_object(value, "root")?;
    let data = required_object(root, "data")?;
    let mut result = Vec::new();
    for item in required_array(data, "messages")? {
        let obj = as_object(item, "message")?;
        let date = required_date(obj, "date")?;
        let message_type = required_str(obj, "type")?;
        match message_type.as_str() {
            "maintenance" => result.push(Message::Maintenance(Maintenance {
                date,
                start: required_date(obj, "start")?,
                end: required_date(obj, "end")?,
            })),
            "notification" => result.push(Message::Notification(Notification {
                date,
                content: required_str(obj, "content")?,
            })),
            other => warn!("Unknown message type: {}", other),
        }
    }
    Ok(result)
}

// === Saved tokens ===

pub fn serialize_saved_token_list(tokens: &[SavedToken]) -> Value {
    let list: Vec<Value> = tokens
        .iter()
        .map(|token| {
            json!({
                "instance": serialize_instance(&token.instance),
                "access_token": token.access_token,
            })
        })
        .collect();
    json!({ "data": list })
}

pub fn deserialize_saved_token_list(value: &Value) -> FormatResult<Vec<SavedToken>> {
    let root = as_object(value, "root")?;
    required_array(root, "data")?
        .iter()
        .map(|item| {
            let obj = as_object(item, "data")?;
            Ok(SavedToken {
                instance: deserialize_instance(required_value(obj, "instance")?)?,
                access_token: required_str(obj, "access_token")?,
            })
        })
        .collect()
}

// === Saved profiles ===

pub fn serialize_saved_profile_list(profiles: &[SavedProfile]) -> Value {
    let list: Vec<Value> = profiles
        .iter()
        .map(|saved| {
            json!({
                "provider": serialize_instance(&saved.instance),
                "profile": serialize_profile(&saved.profile),
                "profile_uuid": saved.profile_uuid,
            })
        })
        .collect();
    json!({ "data": list })
}

pub fn deserialize_saved_profile_list(value: &Value) -> FormatResult<Vec<SavedProfile>> {
    let root = as_object(value, "root")?;
    required_array(root, "data")?
        .iter()
        .map(|item| {
            let obj = as_object(item, "data")?;
            Ok(SavedProfile {
                instance: deserialize_instance(required_value(obj, "provider")?)?,
                profile: deserialize_profile(required_value(obj, "profile")?)?,
                profile_uuid: required_str(obj, "profile_uuid")?,
            })
        })
        .collect()
}

// === Saved key pairs ===

pub fn serialize_key_pair(key_pair: &KeyPair) -> Value {
    let mut obj = Map::new();
    obj.insert("certificate".to_string(), json!(key_pair.certificate));
    obj.insert("private_key".to_string(), json!(key_pair.private_key));
    if let Some(expiry) = key_pair.expiry_time_millis {
        obj.insert("expiry_time_millis".to_string(), json!(expiry));
    }
    Value::Object(obj)
}

pub fn deserialize_key_pair(value: &Value) -> FormatResult<KeyPair> {
    let obj = as_object(value, "key_pair")?;
    let expiry_time_millis = match obj.get("expiry_time_millis") {
        None | Some(Value::Null) => None,
        Some(v) => Some(
            v.as_i64()
                .ok_or_else(|| FormatError::wrong_type("expiry_time_millis", "an integer"))?,
        ),
    };
    Ok(KeyPair {
        certificate: required_str(obj, "certificate")?,
        private_key: required_str(obj, "private_key")?,
        expiry_time_millis,
    })
}

pub fn serialize_saved_key_pair_list(key_pairs: &[SavedKeyPair]) -> Value {
    let list: Vec<Value> = key_pairs
        .iter()
        .map(|saved| {
            json!({
                "instance": serialize_instance(&saved.instance),
                "key_pair": serialize_key_pair(&saved.key_pair),
            })
        })
        .collect();
    json!({ "data": list })
}

pub fn deserialize_saved_key_pair_list(value: &Value) -> FormatResult<Vec<SavedKeyPair>> {
    let root = as_object(value, "root")?;
    required_array(root, "data")?
        .iter()
        .map(|item| {
            let obj = as_object(item, "data")?;
            Ok(SavedKeyPair {
                instance: deserialize_instance(required_value(obj, "instance")?)?,
                key_pair: deserialize_key_pair(required_value(obj, "key_pair")?)?,
            })
        })
        .collect()
}

// === Discovery cache ===

pub fn serialize_discovered_api_ttl_cache(cache: &TtlCache<DiscoveredApi>) -> Value {
    let data: Vec<Value> = cache
        .get_entries()
        .iter()
        .map(|(key, (entry_date, api))| {
            json!({
                "entry_date": entry_date.timestamp_millis(),
                "key": key,
                "discovered_api": serialize_discovered_api(api),
            })
        })
        .collect();
    json!({
        "purge_after_seconds": cache.purge_after_seconds(),
        "data": data,
    })
}

/// Rebuild a discovery cache with the persisted insertion times
pub fn deserialize_discovered_api_ttl_cache(value: &Value) -> FormatResult<TtlCache<DiscoveredApi>> {
    let root = as_object(value, "root")?;
    let purge_after_seconds = required_i64(root, "purge_after_seconds")?;
    let mut entries = HashMap::new();
    for item in required_array(root, "data")? {
        let obj = as_object(item, "data")?;
        let millis = required_i64(obj, "entry_date")?;
        let entry_date = DateTime::from_timestamp_millis(millis)
            .ok_or_else(|| FormatError::TimestampOutOfRange("entry_date".to_string()))?;
        let key = required_str(obj, "key")?;
        let api = deserialize_discovered_api(required_value(obj, "discovered_api")?)?;
        entries.insert(key, (entry_date, api));
    }
    Ok(TtlCache::with_entries(entries, purge_after_seconds))
}

// === Settings ===

pub fn serialize_app_settings(settings: &Settings) -> Value {
    json!({
        "use_custom_tabs": settings.use_custom_tabs,
        "force_tcp": settings.force_tcp,
    })
}

pub fn deserialize_app_settings(value: &Value) -> FormatResult<Settings> {
    let obj = as_object(value, "settings")?;
    Ok(Settings {
        use_custom_tabs: required_bool(obj, "use_custom_tabs")?,
        force_tcp: required_bool(obj, "force_tcp")?,
    })
}

// === Helper functions ===

fn format_date(date: DateTime<Utc>) -> String {
    date.format(API_DATE_FORMAT).to_string()
}

fn as_object<'a>(value: &'a Value, what: &str) -> FormatResult<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| FormatError::wrong_type(what, "an object"))
}

fn required_value<'a>(obj: &'a Map<String, Value>, key: &str) -> FormatResult<&'a Value> {
    match obj.get(key) {
        None | Some(Value::Null) => Err(FormatError::missing(key)),
        Some(value) => Ok(value),
    }
}

fn required_object<'a>(obj: &'a Map<String, Value>, key: &str) -> FormatResult<&'a Map<String, Value>> {
    as_object(required_value(obj, key)?, key)
}

fn required_array<'a>(obj: &'a Map<String, Value>, key: &str) -> FormatResult<&'a Vec<Value>> {
    required_value(obj, key)?
        .as_array()
        .ok_or_else(|| FormatError::wrong_type(key, "an array"))
}

fn required_str(obj: &Map<String, Value>, key: &str) -> FormatResult<String> {
    required_value(obj, key)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| FormatError::wrong_type(key, "a string"))
}

fn optional_str(obj: &Map<String, Value>, key: &str) -> FormatResult<Option<String>> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(FormatError::wrong_type(key, "a string")),
    }
}

fn required_bool(obj: &Map<String, Value>, key: &str) -> FormatResult<bool> {
    required_value(obj, key)?
        .as_bool()
        .ok_or_else(|| FormatError::wrong_type(key, "a boolean"))
}

fn required_i64(obj: &Map<String, Value>, key: &str) -> FormatResult<i64> {
    required_value(obj, key)?
        .as_i64()
        .ok_or_else(|| FormatError::wrong_type(key, "an integer"))
}

fn required_version(obj: &Map<String, Value>, supported: i64) -> FormatResult<i64> {
    let version = required_i64(obj, "version")?;
    if version != supported {
        return Err(FormatError::UnsupportedVersion(version));
    }
    Ok(version)
}

fn required_date(obj: &Map<String, Value>, key: &str) -> FormatResult<DateTime<Utc>> {
    let text = required_str(obj, key)?;
    NaiveDateTime::parse_from_str(&text, API_DATE_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|source| FormatError::InvalidDate {
            field: key.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_profile_list_requires_data() {
        let err = deserialize_profile_list(&json!({ "profile_list": [] })).unwrap_err();
        assert!(matches!(err, FormatError::MissingField(ref f) if f == "data"));

        let err = deserialize_profile_list(&json!({ "data": {} })).unwrap_err();
        assert!(matches!(err, FormatError::MissingField(ref f) if f == "profile_list"));
    }

    #[test]
    fn test_profile_rejects_wrong_type() {
        let value = json!({ "display_name": "Internet", "profile_id": "internet", "two_factor": "no" });
        let err = deserialize_profile(&value).unwrap_err();
        assert!(matches!(err, FormatError::WrongType { ref field, .. } if field == "two_factor"));
    }

    #[test]
    fn test_instance_without_logo() {
        let value = json!({ "base_uri": "https://vpn.example.org/", "display_name": "Example" });
        let instance = deserialize_instance(&value).unwrap();
        assert_eq!(instance.logo_uri, None);
        assert_eq!(serialize_instance(&instance), value);
    }

    #[test]
    fn test_instance_list_version_guard() {
        let value = json!({ "version": 2, "instances": [] });
        let err = deserialize_instance_list(&value).unwrap_err();
        assert!(matches!(err, FormatError::UnsupportedVersion(2)));

        let err = deserialize_instance_list(&json!({ "instances": [] })).unwrap_err();
        assert!(matches!(err, FormatError::MissingField(ref f) if f == "version"));
    }

    #[test]
    fn test_discovered_api_requires_endpoints() {
        let value = json!({
            "version": 1,
            "authorization_endpoint": "https://vpn.example.org/authorize",
            "api": { "create_config": "https://vpn.example.org/api/create_config" }
        });
        let err = deserialize_discovered_api(&value).unwrap_err();
        assert!(matches!(err, FormatError::MissingField(ref f) if f == "profile_list"));
    }

    #[test]
    fn test_discovered_api_version_guard() {
        let value = json!({
            "version": 3,
            "authorization_endpoint": "a",
            "api": { "create_config": "b", "profile_list": "c" }
        });
        assert!(matches!(
            deserialize_discovered_api(&value),
            Err(FormatError::UnsupportedVersion(3))
        ));
    }

    #[test]
    fn test_message_list_notification() {
        let value = json!({ "data": { "messages": [
            { "date": "2020-01-01T00:00:00Z", "type": "notification", "content": "hi" }
        ]}});
        let messages = deserialize_message_list(&value).unwrap();
        assert_eq!(
            messages,
            vec![Message::Notification(Notification {
                date: Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
                content: "hi".to_string(),
            })]
        );
    }

    #[test]
    fn test_message_list_skips_unknown_type() {
        let value = json!({ "data": { "messages": [
            { "date": "2020-01-01T00:00:00Z", "type": "unknown" },
            { "date": "2020-01-02T00:00:00Z", "type": "maintenance",
              "start": "2020-01-03T08:00:00Z", "end": "2020-01-03T10:00:00Z" }
        ]}});
        let messages = deserialize_message_list(&value).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].type_tag(), "maintenance");
    }

    #[test]
    fn test_message_list_rejects_bad_date() {
        let value = json!({ "data": { "messages": [
            { "date": "01/01/2020", "type": "notification", "content": "hi" }
        ]}});
        let err = deserialize_message_list(&value).unwrap_err();
        assert!(matches!(err, FormatError::InvalidDate { ref field, .. } if field == "date"));
    }

    #[test]
    fn test_settings_strict() {
        let err = deserialize_app_settings(&json!({ "use_custom_tabs": true })).unwrap_err();
        assert!(matches!(err, FormatError::MissingField(ref f) if f == "force_tcp"));
    }

    #[test]
    fn test_parse_document_reports_json_error() {
        assert!(matches!(parse_document("{\"data\":"), Err(FormatError::Json(_))));
    }
}
