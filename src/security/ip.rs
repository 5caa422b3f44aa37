//! Public/non-public IP classification.
//!
//! The list is fail-closed: anything that is not plainly global unicast is
//! treated as non-public.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use serde::Serialize;

/// Address family of a resolved address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressFamily {
    Ipv4,
    Ipv6,
}

/// An address produced by the guard's DNS step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedAddress {
    pub ip: IpAddr,
    pub family: AddressFamily,
}

impl From<IpAddr> for ResolvedAddress {
    fn from(ip: IpAddr) -> Self {
        let family = match ip {
            IpAddr::V4(_) => AddressFamily::Ipv4,
            IpAddr::V6(_) => AddressFamily::Ipv6,
        };
        Self { ip, family }
    }
}

/// Returns `true` only for global unicast addresses.
pub fn is_public_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_public_ipv4(v4),
        IpAddr::V6(v6) => is_public_ipv6(v6),
    }
}

fn is_public_ipv4(ip: Ipv4Addr) -> bool {
    let o = ip.octets();
    // This-network 0.0.0.0/8
    if o[0] == 0 {
        return false;
    }
    // Private 10.0.0.0/8
    if o[0] == 10 {
        return false;
    }
    // Shared address space (CGNAT) 100.64.0.0/10
    if o[0] == 100 && (o[1] & 0xc0) == 64 {
        return false;
    }
    // Loopback 127.0.0.0/8
    if o[0] == 127 {
        return false;
    }
    // Link-local 169.254.0.0/16 (cloud metadata lives here)
    if o[0] == 169 && o[1] == 254 {
        return false;
    }
    // Private 172.16.0.0/12
    if o[0] == 172 && (16..=31).contains(&o[1]) {
        return false;
    }
    // IETF protocol assignments 192.0.0.0/24, TEST-NET-1 192.0.2.0/24
    if o[0] == 192 && o[1] == 0 && (o[2] == 0 || o[2] == 2) {
        return false;
    }
    // Private 192.168.0.0/16
    if o[0] == 192 && o[1] == 168 {
        return false;
    }
    // Benchmarking 198.18.0.0/15
    if o[0] == 198 && (o[1] & 0xfe) == 18 {
        return false;
    }
    // TEST-NET-2 198.51.100.0/24, TEST-NET-3 203.0.113.0/24
    if (o[0] == 198 && o[1] == 51 && o[2] == 100) || (o[0] == 203 && o[1] == 0 && o[2] == 113) {
        return false;
    }
    // Multicast 224.0.0.0/4
    if (224..=239).contains(&o[0]) {
        return false;
    }
    // Reserved 240.0.0.0/4, including broadcast
    if o[0] >= 240 {
        return false;
    }
    true
}

fn is_public_ipv6(ip: Ipv6Addr) -> bool {
    let s = ip.segments();
    // :: unspecified, ::1 loopback
    if ip.is_unspecified() || ip.is_loopback() {
        return false;
    }
    // ::ffff:0:0/96 IPv4-mapped
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_public_ipv4(v4);
    }
    // ::/96 IPv4-compatible (deprecated)
    if s[..6] == [0, 0, 0, 0, 0, 0] {
        let embedded = Ipv4Addr::new(
            (s[6] >> 8) as u8,
            s[6] as u8,
            (s[7] >> 8) as u8,
            s[7] as u8,
        );
        return is_public_ipv4(embedded);
    }
    // 64:ff9b::/96 NAT64; the embedded target is unknowable from here
    if s[0] == 0x64 && s[1] == 0xff9b && s[2..6] == [0, 0, 0, 0] {
        return false;
    }
    // 100::/64 discard-only
    if s[0] == 0x100 && s[1..4] == [0, 0, 0] {
        return false;
    }
    // 2001:db8::/32 documentation
    if s[0] == 0x2001 && s[1] == 0x0db8 {
        return false;
    }
    // fc00::/7 unique-local
    if (s[0] & 0xfe00) == 0xfc00 {
        return false;
    }
    // fe80::/10 link-local
    if (s[0] & 0xffc0) == 0xfe80 {
        return false;
    }
    // fec0::/10 site-local (deprecated)
    if (s[0] & 0xffc0) == 0xfec0 {
        return false;
    }
    // ff00::/8 multicast
    if s[0] & 0xff00 == 0xff00 {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_ipv4() {
        assert!(is_public_ipv4(Ipv4Addr::new(8, 8, 8, 8)));
        assert!(is_public_ipv4(Ipv4Addr::new(1, 1, 1, 1)));
        assert!(is_public_ipv4(Ipv4Addr::new(93, 184, 216, 34)));
        assert!(is_public_ipv4(Ipv4Addr::new(100, 128, 0, 1)));
        assert!(is_public_ipv4(Ipv4Addr::new(172, 32, 0, 1)));
    }

    #[test]
    fn test_private_ipv4() {
        assert!(!is_public_ipv4(Ipv4Addr::new(0, 0, 0, 0)));
        assert!(!is_public_ipv4(Ipv4Addr::new(127, 0, 0, 1)));
        assert!(!is_public_ipv4(Ipv4Addr::new(10, 0, 0, 1)));
        assert!(!is_public_ipv4(Ipv4Addr::new(100, 64, 0, 1)));
        assert!(!is_public_ipv4(Ipv4Addr::new(100, 127, 255, 255)));
        assert!(!is_public_ipv4(Ipv4Addr::new(172, 16, 0, 1)));
        assert!(!is_public_ipv4(Ipv4Addr::new(172, 31, 255, 255)));
        assert!(!is_public_ipv4(Ipv4Addr::new(192, 168, 1, 1)));
        assert!(!is_public_ipv4(Ipv4Addr::new(169, 254, 169, 254)));
        assert!(!is_public_ipv4(Ipv4Addr::new(192, 0, 0, 8)));
        assert!(!is_public_ipv4(Ipv4Addr::new(192, 0, 2, 1)));
        assert!(!is_public_ipv4(Ipv4Addr::new(198, 18, 0, 1)));
        assert!(!is_public_ipv4(Ipv4Addr::new(198, 19, 255, 1)));
        assert!(!is_public_ipv4(Ipv4Addr::new(198, 51, 100, 7)));
        assert!(!is_public_ipv4(Ipv4Addr::new(203, 0, 113, 1)));
        assert!(!is_public_ipv4(Ipv4Addr::new(224, 0, 0, 1)));
        assert!(!is_public_ipv4(Ipv4Addr::new(255, 255, 255, 255)));
    }

    #[test]
    fn test_public_ipv6() {
        assert!(is_public_ipv6(Ipv6Addr::new(
            0x2607, 0xf8b0, 0x4004, 0x800, 0, 0, 0, 0x200e
        )));
        assert!(is_public_ipv6(Ipv6Addr::new(0x2606, 0x4700, 0, 0, 0, 0, 0, 0x1111)));
    }

    #[test]
    fn test_private_ipv6() {
        assert!(!is_public_ipv6(Ipv6Addr::UNSPECIFIED));
        assert!(!is_public_ipv6(Ipv6Addr::LOCALHOST));
        assert!(!is_public_ipv6(Ipv6Addr::new(0xfc00, 0, 0, 0, 0, 0, 0, 1)));
        assert!(!is_public_ipv6(Ipv6Addr::new(0xfd12, 0x3456, 0, 0, 0, 0, 0, 1)));
        assert!(!is_public_ipv6(Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 1)));
        assert!(!is_public_ipv6(Ipv6Addr::new(0xfec0, 0, 0, 0, 0, 0, 0, 1)));
        assert!(!is_public_ipv6(Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0, 0, 1)));
        assert!(!is_public_ipv6(Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1)));
        assert!(!is_public_ipv6(Ipv6Addr::new(0x100, 0, 0, 0, 0, 0, 0, 1)));
        assert!(!is_public_ipv6(Ipv6Addr::new(0x64, 0xff9b, 0, 0, 0, 0, 0x0a00, 1)));
    }

    #[test]
    fn test_ipv4_embedded_in_ipv6() {
        // ::ffff:127.0.0.1 and ::ffff:169.254.169.254
        assert!(!is_public_ip("::ffff:127.0.0.1".parse().unwrap()));
        assert!(!is_public_ip("::ffff:a9fe:a9fe".parse().unwrap()));
        assert!(is_public_ip("::ffff:8.8.8.8".parse().unwrap()));
        // IPv4-compatible form
        assert!(!is_public_ip("::10.0.0.1".parse().unwrap()));
    }

    #[test]
    fn test_resolved_address_family() {
        let v4 = ResolvedAddress::from("1.1.1.1".parse::<IpAddr>().unwrap());
        assert_eq!(v4.family, AddressFamily::Ipv4);
        let v6 = ResolvedAddress::from("2606:4700::1111".parse::<IpAddr>().unwrap());
        assert_eq!(v6.family, AddressFamily::Ipv6);
    }
}
