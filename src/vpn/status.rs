//! Engine status levels and the coarse status shown to users

use std::fmt;
use std::str::FromStr;

use crate::error::VpnError;

/// Fine-grained state reported by the OpenVPN engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineLevel {
    Start,
    ConnectingNoServerReplyYet,
    ConnectingServerReplied,
    Connected,
    VpnPaused,
    AuthFailed,
    NoNetwork,
    NotConnected,
    WaitingForUserInput,
    Unknown,
}

impl EngineLevel {
    /// Name used by the engine on its status stream
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineLevel::Start => "LEVEL_START",
            EngineLevel::ConnectingNoServerReplyYet => "LEVEL_CONNECTING_NO_SERVER_REPLY_YET",
            EngineLevel::ConnectingServerReplied => "LEVEL_CONNECTING_SERVER_REPLIED",
            EngineLevel::Connected => "LEVEL_CONNECTED",
            EngineLevel::VpnPaused => "LEVEL_VPNPAUSED",
            EngineLevel::AuthFailed => "LEVEL_AUTH_FAILED",
            EngineLevel::NoNetwork => "LEVEL_NONETWORK",
            EngineLevel::NotConnected => "LEVEL_NOTCONNECTED",
            EngineLevel::WaitingForUserInput => "LEVEL_WAITING_FOR_USER_INPUT",
            EngineLevel::Unknown => "UNKNOWN_LEVEL",
        }
    }
}

impl FromStr for EngineLevel {
    type Err = VpnError;

    /// Unrecognized names mean the engine is newer than this build
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LEVEL_START" => Ok(EngineLevel::Start),
            "LEVEL_CONNECTING_NO_SERVER_REPLY_YET" => Ok(EngineLevel::ConnectingNoServerReplyYet),
            "LEVEL_CONNECTING_SERVER_REPLIED" => Ok(EngineLevel::ConnectingServerReplied),
            "LEVEL_CONNECTED" => Ok(EngineLevel::Connected),
            "LEVEL_VPNPAUSED" => Ok(EngineLevel::VpnPaused),
            "LEVEL_AUTH_FAILED" => Ok(EngineLevel::AuthFailed),
            "LEVEL_NONETWORK" => Ok(EngineLevel::NoNetwork),
            "LEVEL_NOTCONNECTED" => Ok(EngineLevel::NotConnected),
            "LEVEL_WAITING_FOR_USER_INPUT" => Ok(EngineLevel::WaitingForUserInput),
            "UNKNOWN_LEVEL" => Ok(EngineLevel::Unknown),
            other => Err(VpnError::EngineInternal(other.to_string())),
        }
    }
}

impl fmt::Display for EngineLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection status as presented to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VpnStatus {
    Disconnected,
    Connecting,
    Connected,
    Paused,
    Failed,
}

impl VpnStatus {
    pub fn description(&self) -> &'static str {
        match self {
            VpnStatus::Disconnected => "Disconnected",
            VpnStatus::Connecting => "Connecting...",
            VpnStatus::Connected => "Connected",
            VpnStatus::Paused => "Paused",
            VpnStatus::Failed => "Failed",
        }
    }
}

impl fmt::Display for VpnStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

impl From<EngineLevel> for VpnStatus {
    fn from(level: EngineLevel) -> Self {
        // No wildcard arm: a new engine level must be mapped here to build.
        match level {
            EngineLevel::Start
            | EngineLevel::ConnectingNoServerReplyYet
            | EngineLevel::ConnectingServerReplied => VpnStatus::Connecting,
            EngineLevel::Connected => VpnStatus::Connected,
            EngineLevel::VpnPaused => VpnStatus::Paused,
            EngineLevel::AuthFailed => VpnStatus::Failed,
            EngineLevel::NoNetwork
            | EngineLevel::NotConnected
            | EngineLevel::WaitingForUserInput
            | EngineLevel::Unknown => VpnStatus::Disconnected,
        }
    }
}
