//! Connectable profiles offered by a provider

use super::instance::Instance;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub display_name: String,
    /// Unique within the owning instance
    pub profile_id: String,
    pub two_factor: bool,
}

impl Profile {
    pub fn new(display_name: impl Into<String>, profile_id: impl Into<String>, two_factor: bool) -> Self {
        Self {
            display_name: display_name.into(),
            profile_id: profile_id.into(),
            two_factor,
        }
    }
}

/// The user-selected profile bound to an imported engine profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedProfile {
    pub instance: Instance,
    pub profile: Profile,
    /// UUID of the profile held by the tunnel engine
    pub profile_uuid: String,
}

impl SavedProfile {
    pub fn new(instance: Instance, profile: Profile, profile_uuid: impl Into<String>) -> Self {
        Self {
            instance,
            profile,
            profile_uuid: profile_uuid.into(),
        }
    }
}
