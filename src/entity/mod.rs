//! Domain entities exchanged with discovery servers and kept in preferences
//!
//! These are plain value types. Wire format knowledge lives in
//! [`crate::serializer`], not here.

pub mod discovery;
pub mod instance;
pub mod key_pair;
pub mod message;
pub mod profile;
pub mod settings;

pub use discovery::DiscoveredApi;
pub use instance::{Instance, InstanceList, SavedToken};
pub use key_pair::{CertValidity, KeyPair, SavedKeyPair};
pub use message::{Maintenance, Message, Notification};
pub use profile::{Profile, SavedProfile};
pub use settings::Settings;
