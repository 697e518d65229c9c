//! Persisted client state
//!
//! Every persisted value is a JSON document stored under a key. The
//! [`PreferenceStore`] trait is the blob store, [`Preferences`] gives typed
//! access on top of it using the wire shapes from [`crate::serializer`].

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::cache::TtlCache;
use crate::entity::{DiscoveredApi, Instance, Profile, SavedKeyPair, SavedProfile, SavedToken, Settings};
use crate::error::{VpnError, VpnResult};
use crate::serializer;
use crate::validation;

pub const KEY_APP_SETTINGS: &str = "app_settings";
pub const KEY_SAVED_TOKENS: &str = "saved_tokens";
pub const KEY_SAVED_PROFILES: &str = "saved_profiles";
pub const KEY_SAVED_KEY_PAIRS: &str = "saved_key_pairs";
pub const KEY_DISCOVERED_API_CACHE: &str = "discovered_api_cache";
pub const KEY_CURRENT_INSTANCE: &str = "current_instance";
pub const KEY_CURRENT_PROFILE: &str = "current_profile";

/// Key/value store for JSON documents
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn get(&self, key: &str) -> VpnResult<Option<Value>>;

    async fn set(&self, key: &str, value: Value) -> VpnResult<()>;

    /// Removing an absent key is not an error
    async fn remove(&self, key: &str) -> VpnResult<()>;

    /// All stored keys, sorted
    async fn keys(&self) -> VpnResult<Vec<String>>;
}

/// In-memory store, lost when dropped
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    values: RwLock<HashMap<String, Value>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PreferenceStore for MemoryPreferenceStore {
    async fn get(&self, key: &str) -> VpnResult<Option<Value>> {
        validation::validate_preference_key(key)?;
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> VpnResult<()> {
        validation::validate_preference_key(key)?;
        self.values.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> VpnResult<()> {
        validation::validate_preference_key(key)?;
        self.values.write().await.remove(key);
        Ok(())
    }

    async fn keys(&self) -> VpnResult<Vec<String>> {
        let mut keys: Vec<String> = self.values.read().await.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

/// Store keeping one `<key>.json` file per document in a directory
#[derive(Debug, Clone)]
pub struct FilePreferenceStore {
    dir: PathBuf,
}

impl FilePreferenceStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> VpnResult<PathBuf> {
        validation::validate_preference_key(key)?;
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

#[async_trait]
impl PreferenceStore for FilePreferenceStore {
    async fn get(&self, key: &str) -> VpnResult<Option<Value>> {
        let path = self.path_for(key)?;
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serializer::parse_document(&content)?))
    }

    async fn set(&self, key: &str, value: Value) -> VpnResult<()> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        let content = serde_json::to_string_pretty(&value)?;
        // Write then rename so readers never see a partial document
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &path).await?;

        debug!("Stored preference {} at {:?}", key, path);
        Ok(())
    }

    async fn remove(&self, key: &str) -> VpnResult<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn keys(&self) -> VpnResult<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            if let Some(key) = name.to_str().and_then(|n| n.strip_suffix(".json")) {
                keys.push(key.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }
}

/// Typed accessors over a [`PreferenceStore`]
#[derive(Clone)]
pub struct Preferences {
    store: Arc<dyn PreferenceStore>,
}

impl Preferences {
    pub fn new(store: Arc<dyn PreferenceStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn PreferenceStore> {
        &self.store
    }

    // === Settings ===

    /// Stored settings, or the defaults when none were saved
    pub async fn app_settings(&self) -> VpnResult<Settings> {
        match self.store.get(KEY_APP_SETTINGS).await? {
            Some(value) => Ok(serializer::deserialize_app_settings(&value)?),
            None => Ok(Settings::default()),
        }
    }

    pub async fn store_app_settings(&self, settings: &Settings) -> VpnResult<()> {
        self.store
            .set(KEY_APP_SETTINGS, serializer::serialize_app_settings(settings))
            .await
    }

    // === Tokens ===

    pub async fn saved_tokens(&self) -> VpnResult<Vec<SavedToken>> {
        match self.store.get(KEY_SAVED_TOKENS).await? {
            Some(value) => Ok(serializer::deserialize_saved_token_list(&value)?),
            None => Ok(Vec::new()),
        }
    }

    pub async fn store_saved_tokens(&self, tokens: &[SavedToken]) -> VpnResult<()> {
        self.store
            .set(KEY_SAVED_TOKENS, serializer::serialize_saved_token_list(tokens))
            .await
    }

    /// Save a token, replacing any other token for the same instance
    pub async fn store_token(&self, token: SavedToken) -> VpnResult<()> {
        let mut tokens = self.saved_tokens().await?;
        tokens.retain(|t| t.instance.base_uri != token.instance.base_uri);
        tokens.push(token);
        self.store_saved_tokens(&tokens).await
    }

    pub async fn token_for(&self, instance: &Instance) -> VpnResult<Option<SavedToken>> {
        Ok(self
            .saved_tokens()
            .await?
            .into_iter()
            .find(|t| t.instance.base_uri == instance.base_uri))
    }

    /// Forget the token for an instance. Returns whether one was removed.
    pub async fn remove_token(&self, instance: &Instance) -> VpnResult<bool> {
        let mut tokens = self.saved_tokens().await?;
        let before = tokens.len();
        tokens.retain(|t| t.instance.base_uri != instance.base_uri);
        if tokens.len() == before {
            return Ok(false);
        }
        self.store_saved_tokens(&tokens).await?;
        Ok(true)
    }

    // === Profiles ===

    pub async fn saved_profiles(&self) -> VpnResult<Vec<SavedProfile>> {
        match self.store.get(KEY_SAVED_PROFILES).await? {
            Some(value) => Ok(serializer::deserialize_saved_profile_list(&value)?),
            None => Ok(Vec::new()),
        }
    }

    pub async fn store_saved_profiles(&self, profiles: &[SavedProfile]) -> VpnResult<()> {
        self.store
            .set(KEY_SAVED_PROFILES, serializer::serialize_saved_profile_list(profiles))
            .await
    }

    // === Key pairs ===

    pub async fn saved_key_pairs(&self) -> VpnResult<Vec<SavedKeyPair>> {
        match self.store.get(KEY_SAVED_KEY_PAIRS).await? {
            Some(value) => Ok(serializer::deserialize_saved_key_pair_list(&value)?),
            None => Ok(Vec::new()),
        }
    }

    /// Save a key pair, replacing any other key pair for the same instance
    pub async fn store_key_pair(&self, key_pair: SavedKeyPair) -> VpnResult<()> {
        let mut pairs = self.saved_key_pairs().await?;
        pairs.retain(|p| p.instance.base_uri != key_pair.instance.base_uri);
        pairs.push(key_pair);
        self.store
            .set(KEY_SAVED_KEY_PAIRS, serializer::serialize_saved_key_pair_list(&pairs))
            .await
    }

    pub async fn key_pair_for(&self, instance: &Instance) -> VpnResult<Option<SavedKeyPair>> {
        Ok(self
            .saved_key_pairs()
            .await?
            .into_iter()
            .find(|p| p.instance.base_uri == instance.base_uri))
    }

    /// Drop key material for an instance, forcing a new one on the next connect
    pub async fn remove_key_pairs(&self, instance: &Instance) -> VpnResult<()> {
        let mut pairs = self.saved_key_pairs().await?;
        pairs.retain(|p| p.instance.base_uri != instance.base_uri);
        self.store
            .set(KEY_SAVED_KEY_PAIRS, serializer::serialize_saved_key_pair_list(&pairs))
            .await
    }

    // === Discovery cache ===

    pub async fn discovered_api_cache(&self) -> VpnResult<Option<TtlCache<DiscoveredApi>>> {
        match self.store.get(KEY_DISCOVERED_API_CACHE).await? {
            Some(value) => Ok(Some(serializer::deserialize_discovered_api_ttl_cache(&value)?)),
            None => Ok(None),
        }
    }

    pub async fn store_discovered_api_cache(&self, cache: &TtlCache<DiscoveredApi>) -> VpnResult<()> {
        self.store
            .set(
                KEY_DISCOVERED_API_CACHE,
                serializer::serialize_discovered_api_ttl_cache(cache),
            )
            .await
    }

    // === Current selection ===

    pub async fn current_instance(&self) -> VpnResult<Option<Instance>> {
        match self.store.get(KEY_CURRENT_INSTANCE).await? {
            Some(value) => Ok(Some(serializer::deserialize_instance(&value)?)),
            None => Ok(None),
        }
    }

    pub async fn store_current_instance(&self, instance: &Instance) -> VpnResult<()> {
        self.store
            .set(KEY_CURRENT_INSTANCE, serializer::serialize_instance(instance))
            .await
    }

    pub async fn current_profile(&self) -> VpnResult<Option<Profile>> {
        match self.store.get(KEY_CURRENT_PROFILE).await? {
            Some(value) => Ok(Some(serializer::deserialize_profile(&value)?)),
            None => Ok(None),
        }
    }

    pub async fn store_current_profile(&self, profile: &Profile) -> VpnResult<()> {
        self.store
            .set(KEY_CURRENT_PROFILE, serializer::serialize_profile(profile))
            .await
    }

    pub async fn clear_current_selection(&self) -> VpnResult<()> {
        self.store.remove(KEY_CURRENT_INSTANCE).await?;
        self.store.remove(KEY_CURRENT_PROFILE).await
    }
}

/// One-line summary of a stored document, checked against the shape its key implies
pub fn describe_document(key: &str, value: &Value) -> VpnResult<String> {
    let text = match key {
        KEY_APP_SETTINGS => {
            let s = serializer::deserialize_app_settings(value)?;
            format!("use_custom_tabs={} force_tcp={}", s.use_custom_tabs, s.force_tcp)
        }
        KEY_SAVED_TOKENS => format!("{} saved token(s)", serializer::deserialize_saved_token_list(value)?.len()),
        KEY_SAVED_PROFILES => format!(
            "{} saved profile(s)",
            serializer::deserialize_saved_profile_list(value)?.len()
        ),
        KEY_SAVED_KEY_PAIRS => format!(
            "{} saved key pair(s)",
            serializer::deserialize_saved_key_pair_list(value)?.len()
        ),
        KEY_DISCOVERED_API_CACHE => format!(
            "{} cached discovery result(s)",
            serializer::deserialize_discovered_api_ttl_cache(value)?.len()
        ),
        KEY_CURRENT_INSTANCE => serializer::deserialize_instance(value)?.base_uri,
        KEY_CURRENT_PROFILE => serializer::deserialize_profile(value)?.profile_id,
        other => return Err(VpnError::NotFound(format!("no document kind for key {}", other))),
    };
    Ok(text)
}
