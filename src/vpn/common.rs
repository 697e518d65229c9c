use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use tracing::debug;

/// Number of comma separated fields in the engine's "connected" log line
const LOG_LINE_FIELDS: usize = 7;
const LOG_LINE_IPV4_FIELD: usize = 1;
const LOG_LINE_IPV6_FIELD: usize = 6;

/// Addresses assigned to this client by the VPN server
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TunnelAddresses {
    pub ipv4: Option<Ipv4Addr>,
    pub ipv6: Option<Ipv6Addr>,
}

impl TunnelAddresses {
    pub fn is_empty(&self) -> bool {
        self.ipv4.is_none() && self.ipv6.is_none()
    }

    /// Pick the tunnel addresses out of an interface address list.
    /// When several of one family are present the last one wins.
    pub fn from_interface_addresses(addresses: &[IpAddr]) -> Self {
        addresses.iter().fold(Self::default(), |mut acc, addr| {
            match addr {
                IpAddr::V4(v4) => acc.ipv4 = Some(*v4),
                IpAddr::V6(v6) => acc.ipv6 = Some(*v6),
            }
            acc
        })
    }
}

impl fmt::Display for TunnelAddresses {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn or_dash<T: fmt::Display>(v: &Option<T>) -> String {
            v.as_ref().map(|a| a.to_string()).unwrap_or_else(|| "-".to_string())
        }
        write!(f, "IPv4: {}, IPv6: {}", or_dash(&self.ipv4), or_dash(&self.ipv6))
    }
}

/// Parse the tunnel addresses from an engine log line.
///
/// The line must have exactly seven comma separated fields. Field 1 holds
/// the IPv4 and field 6 the IPv6 address, an empty field means absent.
/// Returns `None` when the line does not have that shape.
pub fn parse_ips_from_log_message(message: &str) -> Option<TunnelAddresses> {
    if message.is_empty() {
        return None;
    }

    let fields: Vec<&str> = message.split(',').collect();
    if fields.len() != LOG_LINE_FIELDS {
        debug!("Log line has {} fields, expected {}", fields.len(), LOG_LINE_FIELDS);
        return None;
    }

    Some(TunnelAddresses {
        ipv4: parse_field(fields[LOG_LINE_IPV4_FIELD]),
        ipv6: parse_field(fields[LOG_LINE_IPV6_FIELD].split('%').next().unwrap_or_default()),
    })
}

fn parse_field<T: std::str::FromStr>(field: &str) -> Option<T> {
    let field = field.trim();
    if field.is_empty() {
        return None;
    }
    match field.parse() {
        Ok(addr) => Some(addr),
        Err(_) => {
            debug!("Ignoring unparsable address '{}' in log line", field);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_log_line() {
        let addrs = parse_ips_from_log_message("SUCCESS,10.8.0.2,,,,,fd00:4242::1002").unwrap();
        assert_eq!(addrs.ipv4, Some(Ipv4Addr::new(10, 8, 0, 2)));
        assert_eq!(addrs.ipv6, Some("fd00:4242::1002".parse().unwrap()));
    }

    #[test]
    fn test_parse_log_line_empty_ipv6() {
        let addrs = parse_ips_from_log_message("SUCCESS,10.8.0.2,,,,,").unwrap();
        assert_eq!(addrs.ipv4, Some(Ipv4Addr::new(10, 8, 0, 2)));
        assert_eq!(addrs.ipv6, None);
    }

    #[test]
    fn test_parse_log_line_wrong_shape() {
        assert!(parse_ips_from_log_message("").is_none());
        assert!(parse_ips_from_log_message("SUCCESS,10.8.0.2").is_none());
        assert!(parse_ips_from_log_message("a,b,c,d,e,f,g,h").is_none());
    }

    #[test]
    fn test_ipv6_is_lowercased() {
        let addrs = parse_ips_from_log_message("SUCCESS,,,,,,FD00::ABCD").unwrap();
        assert_eq!(addrs.ipv6.unwrap().to_string(), "fd00::abcd");
    }

    #[test]
    fn test_from_interface_addresses() {
        let list: Vec<IpAddr> = vec![
            "10.8.0.2".parse().unwrap(),
            "fd00::2".parse().unwrap(),
            "fe80::1".parse().unwrap(),
        ];
        let addrs = TunnelAddresses::from_interface_addresses(&list);
        assert_eq!(addrs.ipv4, Some(Ipv4Addr::new(10, 8, 0, 2)));
        assert_eq!(addrs.ipv6, Some("fe80::1".parse().unwrap()));
        assert!(TunnelAddresses::from_interface_addresses(&[]).is_empty());
    }
}
