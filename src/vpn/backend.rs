use async_trait::async_trait;

use crate::entity::KeyPair;
use crate::error::VpnResult;

/// Handle to a profile held by the tunnel engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedProfile {
    pub uuid: String,
    pub name: String,
}

/// Turns a provider-issued OpenVPN config into an engine profile
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileImporter: Send + Sync {
    /// Import a config, optionally completing it with client key material.
    /// Previously imported profiles are replaced.
    async fn import_config(
        &self,
        config: &str,
        preferred_name: Option<String>,
        key_pair: Option<KeyPair>,
    ) -> VpnResult<ImportedProfile>;

    /// Find an imported profile by its UUID
    async fn find_profile(&self, uuid: &str) -> Option<ImportedProfile>;
}

/// Control channel to the running tunnel engine
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EngineControl: Send + Sync {
    /// Ask the engine to tear the tunnel down
    async fn stop_vpn(&self) -> VpnResult<()>;
}
