//! OpenVPN profile store
//!
//! Parses provider-issued OpenVPN configs into profiles and keeps the one
//! most recently imported.

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use super::backend::{ImportedProfile, ProfileImporter};
use crate::entity::{KeyPair, Settings};
use crate::error::{VpnError, VpnResult};
use crate::validation;

const DEFAULT_PORT: u16 = 1194;

/// One `remote` entry of a profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConnection {
    pub host: String,
    pub port: u16,
    pub use_udp: bool,
    pub enabled: bool,
}

/// A parsed OpenVPN profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenVpnProfile {
    pub uuid: String,
    pub name: String,
    pub connections: Vec<RemoteConnection>,
    /// Complete config text, including appended key material
    pub config: String,
    pub has_inline_cert: bool,
    pub has_inline_key: bool,
}

impl OpenVpnProfile {
    fn handle(&self) -> ImportedProfile {
        ImportedProfile {
            uuid: self.uuid.clone(),
            name: self.name.clone(),
        }
    }
}

/// What to hand to the engine when connecting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOptions {
    pub uuid: String,
    pub connections: Vec<RemoteConnection>,
}

impl LaunchOptions {
    pub fn enabled_connections(&self) -> impl Iterator<Item = &RemoteConnection> {
        self.connections.iter().filter(|c| c.enabled)
    }
}

/// Profile store holding at most one imported profile
pub struct OpenVpnProfileStore {
    profile: RwLock<Option<OpenVpnProfile>>,
}

impl OpenVpnProfileStore {
    pub fn new() -> Self {
        Self {
            profile: RwLock::new(None),
        }
    }

    /// The currently imported profile, if any
    pub async fn current(&self) -> Option<OpenVpnProfile> {
        self.profile.read().await.clone()
    }

    /// Launch options for a profile, honoring the force-TCP setting.
    ///
    /// The stored profile is left untouched.
    pub async fn launch_options(&self, uuid: &str, settings: &Settings) -> VpnResult<LaunchOptions> {
        let guard = self.profile.read().await;
        let profile = guard
            .as_ref()
            .filter(|p| p.uuid == uuid)
            .ok_or_else(|| VpnError::NotFound(format!("profile {}", uuid)))?;

        info!("Preparing profile {} (force TCP: {})", uuid, settings.force_tcp);
        let connections = profile
            .connections
            .iter()
            .cloned()
            .map(|mut c| {
                if c.use_udp {
                    c.enabled = !settings.force_tcp;
                }
                c
            })
            .collect();

        Ok(LaunchOptions {
            uuid: profile.uuid.clone(),
            connections,
        })
    }
}

impl Default for OpenVpnProfileStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProfileImporter for OpenVpnProfileStore {
    async fn import_config(
        &self,
        config: &str,
        preferred_name: Option<String>,
        key_pair: Option<KeyPair>,
    ) -> VpnResult<ImportedProfile> {
        let config = match key_pair {
            Some(key_pair) => {
                debug!("Adding saved key pair to the config");
                append_key_pair(config, &key_pair)
            }
            None => config.to_string(),
        };

        let parsed = parse_ovpn_config(&config)?;
        let name = preferred_name
            .or_else(|| parsed.connections.first().map(|c| c.host.clone()))
            .unwrap_or_else(|| "OpenVPN profile".to_string());

        let profile = OpenVpnProfile {
            uuid: Uuid::new_v4().to_string(),
            name,
            connections: parsed.connections,
            config,
            has_inline_cert: parsed.has_inline_cert,
            has_inline_key: parsed.has_inline_key,
        };
        let handle = profile.handle();

        let mut slot = self.profile.write().await;
        if let Some(old) = slot.replace(profile) {
            debug!("Replaced previously imported profile {}", old.uuid);
        }
        info!("Added and saved profile with UUID: {}", handle.uuid);
        Ok(handle)
    }

    async fn find_profile(&self, uuid: &str) -> Option<ImportedProfile> {
        self.profile
            .read()
            .await
            .as_ref()
            .filter(|p| p.uuid == uuid)
            .map(OpenVpnProfile::handle)
    }
}

/// Append client certificate and key as inline blocks
pub fn append_key_pair(config: &str, key_pair: &KeyPair) -> String {
    format!(
        "{}\n<cert>\n{}\n</cert>\n\n<key>\n{}\n</key>\n",
        config, key_pair.certificate, key_pair.private_key
    )
}

#[derive(Debug, Default)]
struct ParsedConfig {
    connections: Vec<RemoteConnection>,
    has_inline_cert: bool,
    has_inline_key: bool,
}

/// Parse the parts of an OpenVPN config the client cares about
fn parse_ovpn_config(content: &str) -> VpnResult<ParsedConfig> {
    let mut parsed = ParsedConfig::default();
    let mut default_proto_udp = true;
    let mut default_port = DEFAULT_PORT;
    // (host, port, explicit protocol)
    let mut remotes: Vec<(String, Option<u16>, Option<bool>)> = Vec::new();
    let mut inline_block: Option<String> = None;

    for (lineno, line) in content.lines().enumerate() {
        let line = line.trim();

        if let Some(tag) = &inline_block {
            if line == format!("</{}>", tag) {
                inline_block = None;
            }
            continue;
        }

        // Skip comments and empty lines
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(tag) = line.strip_prefix('<').and_then(|l| l.strip_suffix('>')) {
            if tag.starts_with('/') {
                return Err(VpnError::ProfileImport(format!(
                    "line {}: unexpected closing tag {}",
                    lineno + 1,
                    line
                )));
            }
            match tag {
                "cert" => parsed.has_inline_cert = true,
                "key" => parsed.has_inline_key = true,
                _ => {}
            }
            inline_block = Some(tag.to_string());
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        let key = parts[0].to_lowercase().replace('-', "_");

        match (key.as_str(), parts.len()) {
            ("remote", 2..=4) => {
                let port = match parts.get(2) {
                    Some(p) => Some(parse_port(p, lineno)?),
                    None => None,
                };
                let udp = match parts.get(3) {
                    Some(p) => Some(parse_proto(p, lineno)?),
                    None => None,
                };
                validation::validate_hostname(parts[1])
                    .map_err(|e| VpnError::ProfileImport(format!("line {}: {}", lineno + 1, e)))?;
                remotes.push((parts[1].to_string(), port, udp));
            }
            ("remote", _) => {
                return Err(VpnError::ProfileImport(format!("line {}: malformed remote", lineno + 1)));
            }
            ("proto", 2) => default_proto_udp = parse_proto(parts[1], lineno)?,
            ("port", 2) => default_port = parse_port(parts[1], lineno)?,
            _ => {}
        }
    }

    if let Some(tag) = inline_block {
        return Err(VpnError::ProfileImport(format!("unterminated <{}> block", tag)));
    }
    if remotes.is_empty() {
        return Err(VpnError::ProfileImport("no remote specified".to_string()));
    }

    parsed.connections = remotes
        .into_iter()
        .map(|(host, port, udp)| RemoteConnection {
            host,
            port: port.unwrap_or(default_port),
            use_udp: udp.unwrap_or(default_proto_udp),
            enabled: true,
        })
        .collect();

    Ok(parsed)
}

fn parse_port(value: &str, lineno: usize) -> VpnResult<u16> {
    value
        .parse::<u16>()
        .map_err(|_| VpnError::ProfileImport(format!("line {}: invalid port {}", lineno + 1, value)))
}

/// Returns true for UDP protocols
fn parse_proto(value: &str, lineno: usize) -> VpnResult<bool> {
    match value.to_lowercase().as_str() {
        "udp" | "udp4" | "udp6" => Ok(true),
        "tcp" | "tcp4" | "tcp6" | "tcp-client" | "tcp4-client" | "tcp6-client" => Ok(false),
        other => Err(VpnError::ProfileImport(format!(
            "line {}: invalid protocol {}",
            lineno + 1,
            other
        ))),
    }
}
