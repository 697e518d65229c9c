//! VPN session module
//!
//! Glue between the client core and the external OpenVPN engine.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────┐
//! │   OpenVPN engine (external)        │
//! └──────┬──────────────────▲──────────┘
//!        │ status, bytes     │ import, stop
//!        ▼                   │
//! ┌──────────────┐   ┌──────────────────┐
//! │   Status     │   │  Profile store   │
//! │   adapter    │   │  (one profile)   │
//! └──────┬───────┘   └──────────────────┘
//!        │ broadcast / listener subscription
//!        ▼
//!     observers
//! ```
//!
//! The engine is reached only through the [`ProfileImporter`] and
//! [`EngineControl`] traits; status and byte counters are pushed into the
//! [`ConnectionStatusAdapter`].
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use libvpnsession::interface::InterfaceController;
//! use libvpnsession::vpn::{ConnectionStatusAdapter, EngineLevel, EngineUpdate};
//!
//! # async fn demo() {
//! let adapter = ConnectionStatusAdapter::new(Arc::new(InterfaceController::new()));
//! let mut statuses = adapter.subscribe();
//!
//! adapter.update_state(EngineUpdate::new(EngineLevel::Connected)).await;
//! println!("now {}", statuses.recv().await.unwrap());
//! # }
//! ```

pub mod adapter;
pub mod backend;
pub mod common;
pub mod openvpn;
pub mod status;

pub use adapter::{
    ConnectionInfoListener, ConnectionInfoSubscription, ConnectionMetadata, ConnectionStatusAdapter,
    EngineUpdate,
};
pub use backend::{EngineControl, ImportedProfile, ProfileImporter};
pub use common::{parse_ips_from_log_message, TunnelAddresses};
pub use openvpn::{LaunchOptions, OpenVpnProfileStore, RemoteConnection};
pub use status::{EngineLevel, VpnStatus};
