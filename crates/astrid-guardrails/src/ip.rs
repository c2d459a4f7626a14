//! Private/internal IP detection, including non-standard IPv4 literal
//! forms (decimal, octal, hex, 1/2/3-part dotted) and IPv6 edge cases
//! (spec §4.9).

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Whether `ip` belongs to a private, loopback, link-local, unique-local,
/// or otherwise non-publicly-routable range, per spec §4.9's explicit
/// range list. IPv4-mapped/compatible IPv6 forms are recursed into their
/// IPv4 equivalent.
#[must_use]
pub fn is_private(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_private_v4(v4),
        IpAddr::V6(v6) => {
            if let Some(mapped) = v6.to_ipv4_mapped() {
                return is_private_v4(mapped);
            }
            if let Some(mapped) = v6.to_ipv4() {
                if v6.segments()[..6] == [0, 0, 0, 0, 0, 0xffff] || v6.segments()[..5] == [0, 0, 0, 0, 0] {
                    return is_private_v4(mapped);
                }
            }
            is_private_v6(v6)
        },
    }
}

fn is_private_v4(ip: Ipv4Addr) -> bool {
    let o = ip.octets();
    ip.is_loopback() // 127/8
        || ip.is_unspecified()
        || ip.is_broadcast()
        || o[0] == 0 // 0/8
        || o[0] == 10 // 10/8
        || (o[0] == 172 && (16..=31).contains(&o[1])) // 172.16-31/12
        || (o[0] == 192 && o[1] == 168) // 192.168/16
        || (o[0] == 169 && o[1] == 254) // 169.254/16
        || (o[0] == 100 && (64..=127).contains(&o[1])) // 100.64-127/10 (CGNAT)
}

fn is_private_v6(ip: Ipv6Addr) -> bool {
    let s = ip.segments();
    ip.is_loopback()
        || ip.is_unspecified()
        || (s[0] & 0xffc0) == 0xfe80 // fe80::/10 link-local
        || (s[0] & 0xfe00) == 0xfc00 // fc00::/7 unique-local
        || s[0] == 0xfec0 // fec0::/10 site-local (deprecated but still blocked)
}

/// Decode a non-standard IPv4 literal host (decimal 32-bit, octal/hex
/// octets, or 1/2/3-part dotted forms like `10.1`, `10.0.1`) into an
/// [`Ipv4Addr`], if `host` parses as one of those shapes. Returns `None`
/// for anything that looks like a normal dotted-quad or hostname (callers
/// should fall back to the standard parser / DNS for those).
#[must_use]
pub fn decode_unusual_ipv4_literal(host: &str) -> Option<Ipv4Addr> {
    if host.is_empty() || !host.chars().all(|c| c.is_ascii_hexdigit() || matches!(c, '.' | 'x' | 'X')) {
        return None;
    }
    let parts: Vec<&str> = host.split('.').collect();
    if parts.len() > 4 || parts.is_empty() {
        return None;
    }
    let mut values = Vec::with_capacity(parts.len());
    for part in &parts {
        values.push(parse_numeric_part(part)?);
    }
    match values.len() {
        1 => Some(Ipv4Addr::from(u32_from(values[0])?)),
        2 => {
            let a = u8::try_from(values[0]).ok()?;
            let rest = u32_from(values[1])? & 0x00ff_ffff;
            Some(Ipv4Addr::new(a, ((rest >> 16) & 0xff) as u8, ((rest >> 8) & 0xff) as u8, (rest & 0xff) as u8))
        },
        3 => {
            let a = u8::try_from(values[0]).ok()?;
            let b = u8::try_from(values[1]).ok()?;
            let rest = u32_from(values[2])? & 0xffff;
            Some(Ipv4Addr::new(a, b, ((rest >> 8) & 0xff) as u8, (rest & 0xff) as u8))
        },
        4 => Some(Ipv4Addr::new(
            u8::try_from(values[0]).ok()?,
            u8::try_from(values[1]).ok()?,
            u8::try_from(values[2]).ok()?,
            u8::try_from(values[3]).ok()?,
        )),
        _ => None,
    }
}

fn u32_from(v: u64) -> Option<u32> {
    u32::try_from(v).ok()
}

fn parse_numeric_part(part: &str) -> Option<u64> {
    if let Some(hex) = part.strip_prefix("0x").or_else(|| part.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).ok();
    }
    if part.len() > 1 && part.starts_with('0') && part.chars().all(|c| c.is_ascii_digit()) {
        return u64::from_str_radix(part, 8).ok();
    }
    part.parse::<u64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn rejects_rfc1918_and_loopback() {
        assert!(is_private(IpAddr::from_str("10.0.0.1").unwrap()));
        assert!(is_private(IpAddr::from_str("127.0.0.1").unwrap()));
        assert!(is_private(IpAddr::from_str("192.168.1.1").unwrap()));
        assert!(is_private(IpAddr::from_str("169.254.169.254").unwrap()));
        assert!(is_private(IpAddr::from_str("172.20.0.5").unwrap()));
        assert!(is_private(IpAddr::from_str("100.64.0.1").unwrap()));
    }

    #[test]
    fn allows_public_v4() {
        assert!(!is_private(IpAddr::from_str("8.8.8.8").unwrap()));
        assert!(!is_private(IpAddr::from_str("1.1.1.1").unwrap()));
    }

    #[test]
    fn rejects_ipv6_ranges() {
        assert!(is_private(IpAddr::from_str("::1").unwrap()));
        assert!(is_private(IpAddr::from_str("fe80::1").unwrap()));
        assert!(is_private(IpAddr::from_str("fc00::1").unwrap()));
        assert!(is_private(IpAddr::from_str("fd12::1").unwrap()));
    }

    #[test]
    fn rejects_ipv4_mapped_ipv6() {
        assert!(is_private(IpAddr::from_str("::ffff:127.0.0.1").unwrap()));
        assert!(is_private(IpAddr::from_str("::ffff:10.0.0.1").unwrap()));
    }

    #[test]
    fn decodes_decimal_literal() {
        // 2130706433 == 127.0.0.1
        assert_eq!(decode_unusual_ipv4_literal("2130706433"), Some(Ipv4Addr::new(127, 0, 0, 1)));
    }

    #[test]
    fn decodes_octal_literal() {
        // 0177.0.0.1 == 127.0.0.1 (leading zero octets are octal)
        assert_eq!(decode_unusual_ipv4_literal("0177.0.0.1"), Some(Ipv4Addr::new(127, 0, 0, 1)));
    }

    #[test]
    fn decodes_hex_literal() {
        assert_eq!(decode_unusual_ipv4_literal("0x7f.0.0.1"), Some(Ipv4Addr::new(127, 0, 0, 1)));
    }

    #[test]
    fn decodes_two_part_form() {
        // 127.1 == 127.0.0.1
        assert_eq!(decode_unusual_ipv4_literal("127.1"), Some(Ipv4Addr::new(127, 0, 0, 1)));
    }
}
