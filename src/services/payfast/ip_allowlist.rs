use std::net::IpAddr;

use axum::http::HeaderMap;
use ipnet::IpNet;

/// Source ranges PayFast sends notifications from.
const PAYFAST_NETWORKS: &[&str] = &[
    "197.97.145.144/28",
    "41.74.179.192/27",
    "102.216.36.0/28",
    "102.216.36.128/28",
    "144.126.193.139/32",
];

/// Parse a single address or a CIDR block.
pub fn parse_network(entry: &str) -> Result<IpNet, String> {
    let entry = entry.trim();
    if let Ok(network) = entry.parse::<IpNet>() {
        return Ok(network);
    }
    entry
        .parse::<IpAddr>()
        .map(IpNet::from)
        .map_err(|_| format!("'{}' is neither an IP address nor a CIDR block", entry))
}

#[derive(Debug, Clone)]
pub struct IpAllowList {
    networks: Vec<IpNet>,
}

impl IpAllowList {
    /// The gateway's published ranges plus any configured extras.
    pub fn payfast(extra: &[IpNet]) -> Self {
        let mut networks: Vec<IpNet> = PAYFAST_NETWORKS
            .iter()
            .filter_map(|n| n.parse().ok())
            .collect();
        networks.extend_from_slice(extra);
        Self { networks }
    }

    pub fn contains(&self, ip: IpAddr) -> bool {
        let ip = canonical(ip);
        self.networks.iter().any(|network| network.contains(&ip))
    }
}

/// Caller address: first `X-Forwarded-For` hop, then `X-Real-IP`, then the
/// socket peer.
pub fn client_ip(headers: &HeaderMap, peer: Option<IpAddr>) -> Option<IpAddr> {
    if let Some(ip) = headers
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|first| first.trim().parse().ok())
    {
        return Some(ip);
    }

    if let Some(ip) = headers
        .get("X-Real-IP")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
    {
        return Some(ip);
    }

    peer
}

// IPv4-mapped IPv6 peers would otherwise never match the IPv4 ranges.
fn canonical(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4).unwrap_or(ip),
        v4 => v4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_published_ranges() {
        let list = IpAllowList::payfast(&[]);

        assert!(list.contains("197.97.145.144".parse().unwrap()));
        assert!(list.contains("197.97.145.159".parse().unwrap()));
        assert!(!list.contains("197.97.145.160".parse().unwrap()));
        assert!(list.contains("41.74.179.223".parse().unwrap()));
        assert!(list.contains("102.216.36.140".parse().unwrap()));
        assert!(list.contains("144.126.193.139".parse().unwrap()));
        assert!(!list.contains("144.126.193.140".parse().unwrap()));
        assert!(!list.contains("127.0.0.1".parse().unwrap()));
    }

    #[test]
    fn test_ipv4_mapped_peer() {
        let list = IpAllowList::payfast(&[]);
        assert!(list.contains("::ffff:197.97.145.150".parse().unwrap()));
    }

    #[test]
    fn test_extra_entries() {
        let extra = vec![
            parse_network("10.0.0.7").unwrap(),
            parse_network("192.168.1.0/24").unwrap(),
        ];
        let list = IpAllowList::payfast(&extra);

        assert!(list.contains("10.0.0.7".parse().unwrap()));
        assert!(list.contains("192.168.1.200".parse().unwrap()));
        assert!(parse_network("not-an-ip").is_err());
    }

    #[test]
    fn test_client_ip_precedence() {
        let peer = Some("10.1.1.1".parse().unwrap());

        let mut headers = HeaderMap::new();
        headers.insert(
            "X-Forwarded-For",
            HeaderValue::from_static("197.97.145.145, 10.0.0.1"),
        );
        headers.insert("X-Real-IP", HeaderValue::from_static("41.74.179.200"));
        assert_eq!(
            client_ip(&headers, peer),
            Some("197.97.145.145".parse().unwrap())
        );

        headers.remove("X-Forwarded-For");
        assert_eq!(
            client_ip(&headers, peer),
            Some("41.74.179.200".parse().unwrap())
        );

        assert_eq!(client_ip(&HeaderMap::new(), peer), peer);
        assert_eq!(client_ip(&HeaderMap::new(), None), None);
    }
}
