//! Published CDN edge ranges.
//!
//! Used to flag A/AAAA answers that point at a CDN edge rather than at the
//! origin. Ranges are the providers' published lists; they drift slowly, so
//! a stale entry only costs an unflagged answer.

use std::net::IpAddr;

use super::ProviderRef;

/// One CIDR block owned by a CDN provider.
#[derive(Debug, Clone, Copy)]
pub struct CdnRange {
    pub provider_id: &'static str,
    pub provider_name: &'static str,
    pub network: &'static str,
    pub prefix_len: u8,
}

const fn range(
    provider_id: &'static str,
    provider_name: &'static str,
    network: &'static str,
    prefix_len: u8,
) -> CdnRange {
    CdnRange {
        provider_id,
        provider_name,
        network,
        prefix_len,
    }
}

const CLOUDFLARE: (&str, &str) = ("cloudflare", "Cloudflare");
const FASTLY: (&str, &str) = ("fastly", "Fastly");
const CLOUDFRONT: (&str, &str) = ("cloudfront", "Amazon CloudFront");

static CDN_RANGES: &[CdnRange] = &[
    range(CLOUDFLARE.0, CLOUDFLARE.1, "173.245.48.0", 20),
    range(CLOUDFLARE.0, CLOUDFLARE.1, "103.21.244.0", 22),
    range(CLOUDFLARE.0, CLOUDFLARE.1, "103.22.200.0", 22),
    range(CLOUDFLARE.0, CLOUDFLARE.1, "103.31.4.0", 22),
    range(CLOUDFLARE.0, CLOUDFLARE.1, "141.101.64.0", 18),
    range(CLOUDFLARE.0, CLOUDFLARE.1, "108.162.192.0", 18),
    range(CLOUDFLARE.0, CLOUDFLARE.1, "190.93.240.0", 20),
    range(CLOUDFLARE.0, CLOUDFLARE.1, "188.114.96.0", 20),
    range(CLOUDFLARE.0, CLOUDFLARE.1, "197.234.240.0", 22),
    range(CLOUDFLARE.0, CLOUDFLARE.1, "198.41.128.0", 17),
    range(CLOUDFLARE.0, CLOUDFLARE.1, "162.158.0.0", 15),
    range(CLOUDFLARE.0, CLOUDFLARE.1, "104.16.0.0", 13),
    range(CLOUDFLARE.0, CLOUDFLARE.1, "104.24.0.0", 14),
    range(CLOUDFLARE.0, CLOUDFLARE.1, "172.64.0.0", 13),
    range(CLOUDFLARE.0, CLOUDFLARE.1, "131.0.72.0", 22),
    range(CLOUDFLARE.0, CLOUDFLARE.1, "2400:cb00::", 32),
    range(CLOUDFLARE.0, CLOUDFLARE.1, "2606:4700::", 32),
    range(CLOUDFLARE.0, CLOUDFLARE.1, "2803:f800::", 32),
    range(CLOUDFLARE.0, CLOUDFLARE.1, "2405:b500::", 32),
    range(CLOUDFLARE.0, CLOUDFLARE.1, "2405:8100::", 32),
    range(CLOUDFLARE.0, CLOUDFLARE.1, "2a06:98c0::", 29),
    range(CLOUDFLARE.0, CLOUDFLARE.1, "2c0f:f248::", 32),
    range(FASTLY.0, FASTLY.1, "151.101.0.0", 16),
    range(FASTLY.0, FASTLY.1, "199.232.0.0", 16),
    range(FASTLY.0, FASTLY.1, "146.75.0.0", 17),
    range(FASTLY.0, FASTLY.1, "2a04:4e40::", 32),
    range(FASTLY.0, FASTLY.1, "2a04:4e42::", 32),
    range(CLOUDFRONT.0, CLOUDFRONT.1, "13.32.0.0", 15),
    range(CLOUDFRONT.0, CLOUDFRONT.1, "13.224.0.0", 14),
    range(CLOUDFRONT.0, CLOUDFRONT.1, "18.64.0.0", 14),
    range(CLOUDFRONT.0, CLOUDFRONT.1, "52.84.0.0", 15),
    range(CLOUDFRONT.0, CLOUDFRONT.1, "54.230.0.0", 16),
    range(CLOUDFRONT.0, CLOUDFRONT.1, "2600:9000::", 28),
];

impl CdnRange {
    /// Whether `ip` falls inside this block. Mixed families never match.
    pub fn contains(&self, ip: IpAddr) -> bool {
        let Ok(network) = self.network.parse::<IpAddr>() else {
            return false;
        };
        match (network, ip) {
            (IpAddr::V4(net), IpAddr::V4(addr)) => {
                prefix_matches(u32::from(net).into(), u32::from(addr).into(), self.prefix_len, 32)
            }
            (IpAddr::V6(net), IpAddr::V6(addr)) => {
                prefix_matches(u128::from(net), u128::from(addr), self.prefix_len, 128)
            }
            _ => false,
        }
    }
}

fn prefix_matches(network: u128, addr: u128, prefix_len: u8, width: u32) -> bool {
    let prefix_len = u32::from(prefix_len).min(width);
    if prefix_len == 0 {
        return true;
    }
    let shift = width - prefix_len;
    (network >> shift) == (addr >> shift)
}

/// Returns the CDN provider that owns `ip`, if any.
pub fn match_cdn_address(ip: IpAddr) -> Option<ProviderRef> {
    CDN_RANGES
        .iter()
        .find(|r| r.contains(ip))
        .map(|r| ProviderRef::new(r.provider_id, r.provider_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_all_ranges_parse() {
        for r in CDN_RANGES {
            assert!(r.network.parse::<IpAddr>().is_ok(), "{}", r.network);
        }
    }

    #[test]
    fn test_cloudflare_v4_and_v6() {
        assert_eq!(match_cdn_address(ip("104.21.5.7")).unwrap().id, "cloudflare");
        assert_eq!(
            match_cdn_address(ip("2606:4700:3033::6815:3e1")).unwrap().id,
            "cloudflare"
        );
    }

    #[test]
    fn test_fastly() {
        assert_eq!(match_cdn_address(ip("151.101.1.69")).unwrap().id, "fastly");
    }

    #[test]
    fn test_range_boundaries() {
        // 104.16.0.0/13 spans 104.16.0.0 - 104.23.255.255
        assert!(match_cdn_address(ip("104.23.255.255")).is_some());
        // 104.24.0.0/14 is also Cloudflare; 104.28.0.0 is not
        assert!(match_cdn_address(ip("104.28.0.1")).is_none());
    }

    #[test]
    fn test_origin_address_is_not_flagged() {
        assert!(match_cdn_address(ip("93.184.216.34")).is_none());
        assert!(match_cdn_address(ip("2001:4860:4860::8888")).is_none());
    }
}
