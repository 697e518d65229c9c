//! Session context
//!
//! Owns the state shared by one client session: preferences, the discovery
//! cache and the profile importer.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::cache::TtlCache;
use crate::config::SessionConfig;
use crate::entity::{DiscoveredApi, Instance, Profile, SavedProfile};
use crate::error::VpnResult;
use crate::preferences::Preferences;
use crate::vpn::{ImportedProfile, ProfileImporter};

pub struct SessionContext {
    config: SessionConfig,
    preferences: Preferences,
    discovery_cache: Mutex<TtlCache<DiscoveredApi>>,
    importer: Arc<dyn ProfileImporter>,
}

impl SessionContext {
    /// Build a context, restoring the persisted discovery cache if present
    pub async fn load(
        config: SessionConfig,
        preferences: Preferences,
        importer: Arc<dyn ProfileImporter>,
    ) -> VpnResult<Self> {
        let cache = match preferences.discovered_api_cache().await? {
            Some(cache) => {
                info!("Restored discovery cache with {} entries", cache.len());
                cache
            }
            None => TtlCache::new(config.defaults.discovery_cache_ttl_secs),
        };

        Ok(Self {
            config,
            preferences,
            discovery_cache: Mutex::new(cache),
            importer,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    // === Discovery cache ===

    /// Cache a discovery result for an instance and persist the cache
    pub async fn cache_discovered_api(&self, base_uri: &str, api: DiscoveredApi) -> VpnResult<()> {
        let mut cache = self.discovery_cache.lock().await;
        let mut updated = cache.clone();
        updated.put(base_uri, api);
        self.preferences.store_discovered_api_cache(&updated).await?;
        *cache = updated;
        Ok(())
    }

    /// Cached discovery result, if still fresh
    pub async fn discovered_api(&self, base_uri: &str) -> Option<DiscoveredApi> {
        self.discovery_cache.lock().await.get(base_uri).cloned()
    }

    /// Drop expired discovery results. Returns how many were removed.
    pub async fn purge_discovery_cache(&self) -> VpnResult<usize> {
        let mut cache = self.discovery_cache.lock().await;
        let removed = cache.purge();
        if removed > 0 {
            self.preferences.store_discovered_api_cache(&cache).await?;
        }
        Ok(removed)
    }

    pub async fn discovery_cache_snapshot(&self) -> TtlCache<DiscoveredApi> {
        self.discovery_cache.lock().await.clone()
    }

    // === Profiles ===

    /// Import a provider config for a profile and remember it as the only
    /// saved profile. Key material saved for the instance is embedded.
    pub async fn import_profile(
        &self,
        instance: &Instance,
        profile: &Profile,
        config: &str,
    ) -> VpnResult<SavedProfile> {
        let key_pair = self
            .preferences
            .key_pair_for(instance)
            .await?
            .map(|saved| saved.key_pair);
        if key_pair.is_none() {
            warn!("No key pair saved for {}, importing config as is", instance.base_uri);
        }

        let preferred_name = format!("{} - {}", instance.display_name, profile.display_name);
        let imported = self
            .importer
            .import_config(config, Some(preferred_name), key_pair)
            .await?;

        let saved = SavedProfile::new(instance.clone(), profile.clone(), imported.uuid);
        self.preferences
            .store_saved_profiles(std::slice::from_ref(&saved))
            .await?;
        self.preferences.store_current_instance(instance).await?;
        self.preferences.store_current_profile(profile).await?;

        info!("Saved profile {} for {}", saved.profile_uuid, instance.base_uri);
        Ok(saved)
    }

    /// Saved profile matching `profile`, if any
    pub async fn find_saved_profile_for(&self, profile: &Profile) -> VpnResult<Option<SavedProfile>> {
        Ok(self
            .preferences
            .saved_profiles()
            .await?
            .into_iter()
            .find(|saved| saved.profile.profile_id == profile.profile_id))
    }

    /// Engine profile for the current profile, present only when it was the
    /// most recently imported one
    pub async fn find_current_config(&self) -> VpnResult<Option<ImportedProfile>> {
        let Some(profile) = self.preferences.current_profile().await? else {
            return Ok(None);
        };
        match self.find_saved_profile_for(&profile).await? {
            Some(saved) => Ok(self.importer.find_profile(&saved.profile_uuid).await),
            None => Ok(None),
        }
    }
}
