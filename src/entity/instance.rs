//! VPN providers and the credentials scoped to them

/// A single VPN service provider endpoint
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Instance {
    /// Base URI, unique per provider
    pub base_uri: String,
    pub display_name: String,
    pub logo_uri: Option<String>,
}

impl Instance {
    pub fn new(
        base_uri: impl Into<String>,
        display_name: impl Into<String>,
        logo_uri: Option<String>,
    ) -> Self {
        Self {
            base_uri: base_uri.into(),
            display_name: display_name.into(),
            logo_uri,
        }
    }
}

/// Versioned list of providers as published by the discovery server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceList {
    pub version: i64,
    pub instances: Vec<Instance>,
}

impl InstanceList {
    /// The only list version this client understands
    pub const SUPPORTED_VERSION: i64 = 1;

    pub fn new(instances: Vec<Instance>) -> Self {
        Self {
            version: Self::SUPPORTED_VERSION,
            instances,
        }
    }

    /// Find a provider by its base URI
    pub fn find(&self, base_uri: &str) -> Option<&Instance> {
        self.instances.iter().find(|i| i.base_uri == base_uri)
    }
}

/// Access token obtained for one provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedToken {
    pub instance: Instance,
    pub access_token: String,
}

impl SavedToken {
    pub fn new(instance: Instance, access_token: impl Into<String>) -> Self {
        Self {
            instance,
            access_token: access_token.into(),
        }
    }
}
