//! Integration tests for file-backed preferences and the session context

use libvpnsession::entity::*;
use libvpnsession::preferences::{FilePreferenceStore, PreferenceStore, Preferences, KEY_APP_SETTINGS};
use libvpnsession::vpn::OpenVpnProfileStore;
use libvpnsession::{SessionConfig, SessionContext, VpnError};
use serde_json::json;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

fn file_prefs(dir: &TempDir) -> Preferences {
    Preferences::new(Arc::new(FilePreferenceStore::new(dir.path())))
}

fn demo_instance() -> Instance {
    Instance::new("https://demo.eduvpn.nl/", "Demo", Some("https://static.eduvpn.nl/demo.png".to_string()))
}

#[tokio::test]
async fn test_file_store_round_trip() {
    let dir = TempDir::new().unwrap();
    let store = FilePreferenceStore::new(dir.path().join("state"));

    assert_eq!(store.get("app_settings").await.unwrap(), None);
    assert!(store.keys().await.unwrap().is_empty());

    store.set("app_settings", json!({ "use_custom_tabs": true, "force_tcp": false })).await.unwrap();
    store.set("current_profile", json!({ "display_name": "x", "profile_id": "x", "two_factor": false })).await.unwrap();

    assert!(dir.path().join("state/app_settings.json").exists());
    assert_eq!(store.keys().await.unwrap(), vec!["app_settings", "current_profile"]);

    store.remove("app_settings").await.unwrap();
    store.remove("app_settings").await.unwrap();
    assert_eq!(store.get("app_settings").await.unwrap(), None);
}

#[tokio::test]
async fn test_file_store_rejects_path_keys() {
    let dir = TempDir::new().unwrap();
    let store = FilePreferenceStore::new(dir.path());
    let err = store.get("../secrets").await.unwrap_err();
    assert!(matches!(err, VpnError::InvalidParameter(_)));
}

#[tokio::test]
async fn test_corrupt_file_is_format_error() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(format!("{}.json", KEY_APP_SETTINGS)), "{ not json").unwrap();

    let err = file_prefs(&dir).app_settings().await.unwrap_err();
    assert!(matches!(err, VpnError::Format(_)));
}

#[tokio::test]
async fn test_preferences_survive_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let prefs = file_prefs(&dir);
        prefs.store_app_settings(&Settings { use_custom_tabs: false, force_tcp: true }).await.unwrap();
        prefs.store_token(SavedToken::new(demo_instance(), "token-1")).await.unwrap();
        prefs
            .store_key_pair(SavedKeyPair::new(demo_instance(), KeyPair::new("CERT", "KEY")))
            .await
            .unwrap();
        prefs.store_current_instance(&demo_instance()).await.unwrap();
    }

    let prefs = file_prefs(&dir);
    assert!(prefs.app_settings().await.unwrap().force_tcp);
    assert_eq!(
        prefs.token_for(&demo_instance()).await.unwrap().map(|t| t.access_token),
        Some("token-1".to_string())
    );
    assert_eq!(prefs.current_instance().await.unwrap(), Some(demo_instance()));

    prefs.remove_key_pairs(&demo_instance()).await.unwrap();
    assert!(prefs.key_pair_for(&demo_instance()).await.unwrap().is_none());

    prefs.clear_current_selection().await.unwrap();
    assert_eq!(prefs.current_instance().await.unwrap(), None);
}

#[tokio::test]
async fn test_session_context_on_disk() {
    let dir = TempDir::new().unwrap();
    let mut config = SessionConfig::default();
    config.paths.state_dir = dir.path().to_path_buf();
    config.defaults.discovery_cache_ttl_secs = 3600;

    let api = DiscoveredApi::new(
        "https://demo.eduvpn.nl/portal/_oauth/authorize",
        "https://demo.eduvpn.nl/portal/api.php/create_config",
        "https://demo.eduvpn.nl/portal/api.php/profile_list",
    );

    let ctx = SessionContext::load(config.clone(), file_prefs(&dir), Arc::new(OpenVpnProfileStore::new()))
        .await
        .unwrap();
    ctx.cache_discovered_api("https://demo.eduvpn.nl/", api.clone()).await.unwrap();
    let saved = ctx
        .import_profile(
            &demo_instance(),
            &Profile::new("Internet", "internet", false),
            "client\nremote demo.eduvpn.nl 1194 udp\nremote demo.eduvpn.nl 443 tcp\n",
        )
        .await
        .unwrap();

    let reopened = SessionContext::load(config, file_prefs(&dir), Arc::new(OpenVpnProfileStore::new()))
        .await
        .unwrap();
    assert_eq!(reopened.discovered_api("https://demo.eduvpn.nl/").await, Some(api));
    assert_eq!(reopened.discovery_cache_snapshot().await.purge_after_seconds(), 3600);

    let found = reopened
        .find_saved_profile_for(&Profile::new("Internet", "internet", false))
        .await
        .unwrap();
    assert_eq!(found, Some(saved));
    // The engine profile lives in memory only
    assert!(reopened.find_current_config().await.unwrap().is_none());
}
