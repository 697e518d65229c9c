//! API endpoints learned during discovery

/// Endpoints a provider publishes in its discovery document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredApi {
    pub version: i64,
    pub authorization_endpoint: String,
    pub create_config_api: String,
    pub profile_list_api: String,
    pub system_messages_api: Option<String>,
    pub user_messages_api: Option<String>,
}

impl DiscoveredApi {
    /// The only discovery document version this client understands
    pub const SUPPORTED_VERSION: i64 = 1;

    pub fn new(
        authorization_endpoint: impl Into<String>,
        create_config_api: impl Into<String>,
        profile_list_api: impl Into<String>,
    ) -> Self {
        Self {
            version: Self::SUPPORTED_VERSION,
            authorization_endpoint: authorization_endpoint.into(),
            create_config_api: create_config_api.into(),
            profile_list_api: profile_list_api.into(),
            system_messages_api: None,
            user_messages_api: None,
        }
    }

    pub fn with_system_messages(mut self, api: impl Into<String>) -> Self {
        self.system_messages_api = Some(api.into());
        self
    }

    pub fn with_user_messages(mut self, api: impl Into<String>) -> Self {
        self.user_messages_api = Some(api.into());
        self
    }
}
