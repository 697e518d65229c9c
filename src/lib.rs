//! vpnsession - VPN client session core
//!
//! Async library providing the state model of a VPN client:
//! - Provider entities (instances, profiles, tokens, key pairs, messages)
//! - JSON wire format for provider documents and persisted state
//! - TTL cache for discovery results
//! - Connection status tracking for an external OpenVPN engine
//! - Profile import and persisted preferences
//!
//! The tunnel engine, the authorization flow and the UI are external and
//! reached through the traits in [`vpn`], [`interface`] and [`preferences`].

pub mod error;
pub mod validation;
pub mod config;
pub mod entity;
pub mod cache;
pub mod serializer;
pub mod interface;
pub mod preferences;
pub mod vpn;
pub mod context;

// Re-export commonly used types
pub use error::{FormatError, VpnError, VpnResult};
pub use config::SessionConfig;
pub use cache::TtlCache;
pub use entity::{
    CertValidity, DiscoveredApi, Instance, InstanceList, KeyPair, Maintenance, Message,
    Notification, Profile, SavedKeyPair, SavedProfile, SavedToken, Settings,
};
pub use interface::{AddressLookup, InterfaceController};
pub use preferences::{FilePreferenceStore, MemoryPreferenceStore, PreferenceStore, Preferences};
pub use vpn::{
    ConnectionInfoListener, ConnectionInfoSubscription, ConnectionMetadata, ConnectionStatusAdapter,
    EngineControl, EngineLevel, EngineUpdate, ProfileImporter, VpnStatus,
};
pub use context::SessionContext;
