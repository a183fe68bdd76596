//! Exclusion rule matching.
//!
//! Tests a classified IOC against the layered exclusion set (built-in and
//! custom). Matching semantics per exclusion type:
//!
//! - `ip` / `cidr`: numeric containment; the candidate network (a bare IP is
//!   a /32 or /128) must be fully contained within the exclusion network.
//!   IPv4 and IPv6 never cross-match.
//! - `domain`: exact match, or the candidate is a strict subdomain of the
//!   exclusion value (suffix on a dot boundary, so `example.com` blocks
//!   `sub.example.com` but not `notexample.com`).
//! - `wildcard` (`*.foo.com`): matches `foo.com` itself and any subdomain.
//!
//! Hash-type IOCs are never subject to exclusion. First match of any rule
//! blocks; built-in vs custom ordering does not affect the outcome.

use std::net::IpAddr;
use std::str::FromStr;

use ipnet::IpNet;

use crate::classify::is_valid_domain;
use crate::model::{Exclusion, ExclusionType, IocType};

/// Test a candidate against every rule, returning the first match.
///
/// The matched rule is returned so callers can name it in error messages.
pub fn check<'a>(
    exclusions: &'a [Exclusion],
    value: &str,
    ioc_type: IocType,
) -> Option<&'a Exclusion> {
    exclusions
        .iter()
        .find(|excl| matches(excl, value, ioc_type))
}

/// Does a single exclusion rule cover the given candidate?
pub fn matches(excl: &Exclusion, value: &str, ioc_type: IocType) -> bool {
    if ioc_type.is_hash() {
        return false;
    }
    match excl.excl_type {
        ExclusionType::Ip | ExclusionType::Cidr => {
            let Some(rule_net) = parse_net(&excl.value) else {
                return false;
            };
            let Some(cand_net) = candidate_net(value, ioc_type) else {
                return false;
            };
            // IpNet::contains is family-aware: a v4 rule never matches a
            // v6 candidate and vice versa.
            rule_net.contains(&cand_net)
        }
        ExclusionType::Domain => {
            let Some(cand_base) = candidate_base_domain(value, ioc_type) else {
                return false;
            };
            domain_covers(&excl.value, cand_base)
        }
        ExclusionType::Wildcard => {
            let Some(rule_base) = excl.value.strip_prefix("*.") else {
                return false;
            };
            let Some(cand_base) = candidate_base_domain(value, ioc_type) else {
                return false;
            };
            domain_covers(rule_base, cand_base)
        }
    }
}

/// Detect the pattern type of a proposed exclusion value, or None if the
/// value is not a usable pattern.
pub fn detect_exclusion_type(value: &str) -> Option<ExclusionType> {
    let value = value.trim();
    if value.parse::<IpAddr>().is_ok() {
        return Some(ExclusionType::Ip);
    }
    if value.contains('/') && IpNet::from_str(value).is_ok() {
        return Some(ExclusionType::Cidr);
    }
    if let Some(base) = value.strip_prefix("*.") {
        if is_valid_domain(base) {
            return Some(ExclusionType::Wildcard);
        }
        return None;
    }
    // Domain exclusions are looser than domain IOCs: a bare label like
    // "com" is a valid TLD exclusion.
    if is_valid_domain(value) || is_bare_label(value) {
        return Some(ExclusionType::Domain);
    }
    None
}

fn is_bare_label(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= 63
        && value.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
        && !value.starts_with('-')
        && !value.ends_with('-')
        && !value.bytes().all(|b| b.is_ascii_digit())
}

/// Candidate IOC as a network for containment tests.
fn candidate_net(value: &str, ioc_type: IocType) -> Option<IpNet> {
    match ioc_type {
        IocType::Ip => Some(IpNet::from(value.parse::<IpAddr>().ok()?)),
        IocType::Cidr => IpNet::from_str(value).ok(),
        _ => None,
    }
}

/// Exclusion value as a network: a bare IP becomes its host network.
fn parse_net(value: &str) -> Option<IpNet> {
    if let Ok(addr) = value.parse::<IpAddr>() {
        return Some(IpNet::from(addr));
    }
    IpNet::from_str(value).ok()
}

/// The domain a candidate is compared by: wildcards compare by their base.
fn candidate_base_domain(value: &str, ioc_type: IocType) -> Option<&str> {
    match ioc_type {
        IocType::Domain => Some(value),
        IocType::Wildcard => value.strip_prefix("*."),
        _ => None,
    }
}

/// Exact match or strict subdomain on a dot boundary.
fn domain_covers(base: &str, candidate: &str) -> bool {
    if candidate == base {
        return true;
    }
    candidate
        .strip_suffix(base)
        .is_some_and(|prefix| prefix.ends_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Exclusion;
    use chrono::Utc;

    fn excl(id: i64, value: &str, excl_type: ExclusionType, reason: &str) -> Exclusion {
        Exclusion {
            id,
            value: value.to_string(),
            excl_type,
            reason: Some(reason.to_string()),
            is_builtin: false,
            created_at: Utc::now(),
        }
    }

    fn rules() -> Vec<Exclusion> {
        vec![
            excl(1, "com", ExclusionType::Domain, "TLD"),
            excl(2, "10.0.0.0/8", ExclusionType::Cidr, "RFC1918"),
            excl(3, "evil.com", ExclusionType::Domain, "takedown pending"),
            excl(4, "*.internal.corp", ExclusionType::Wildcard, "internal"),
            excl(5, "198.51.100.7", ExclusionType::Ip, "sinkhole"),
        ]
    }

    #[test]
    fn cidr_contains_ip() {
        let rules = rules();
        assert_eq!(check(&rules, "10.1.2.3", IocType::Ip).unwrap().id, 2);
        assert!(check(&rules, "11.1.2.3", IocType::Ip).is_none());
    }

    #[test]
    fn cidr_contains_subnet() {
        let rules = rules();
        // containment is transitive: 10.20.0.0/16 is inside 10.0.0.0/8
        assert_eq!(check(&rules, "10.20.0.0/16", IocType::Cidr).unwrap().id, 2);
        // a wider network is not contained
        assert!(check(&rules, "10.0.0.0/7", IocType::Cidr).is_none());
    }

    #[test]
    fn families_never_cross_match() {
        let rules = vec![excl(1, "10.0.0.0/8", ExclusionType::Cidr, "v4")];
        assert!(check(&rules, "::a00:1", IocType::Ip).is_none());
    }

    #[test]
    fn ip_rule_is_host_network() {
        let rules = rules();
        assert_eq!(check(&rules, "198.51.100.7", IocType::Ip).unwrap().id, 5);
        assert!(check(&rules, "198.51.100.8", IocType::Ip).is_none());
        // the /32 candidate form of the same host is still contained
        assert_eq!(
            check(&rules, "198.51.100.7/32", IocType::Cidr).unwrap().id,
            5
        );
    }

    #[test]
    fn domain_rule_blocks_exact_and_subdomains() {
        let rules = rules();
        assert_eq!(check(&rules, "evil.com", IocType::Domain).unwrap().id, 3);
        assert_eq!(check(&rules, "sub.evil.com", IocType::Domain).unwrap().id, 3);
        assert!(check(&rules, "notevil.org", IocType::Domain).is_none());
    }

    #[test]
    fn domain_rule_suffix_respects_dot_boundary() {
        let rules = vec![excl(1, "example.com", ExclusionType::Domain, "test")];
        assert!(check(&rules, "notexample.com", IocType::Domain).is_none());
        assert!(check(&rules, "a.example.com", IocType::Domain).is_some());
    }

    #[test]
    fn tld_rule_blocks_everything_under_it() {
        let rules = vec![excl(1, "com", ExclusionType::Domain, "TLD")];
        assert!(check(&rules, "com", IocType::Domain).is_some());
        assert!(check(&rules, "anything.com", IocType::Domain).is_some());
        assert!(check(&rules, "anything.org", IocType::Domain).is_none());
    }

    #[test]
    fn wildcard_rule_matches_base_and_subdomains() {
        let rules = rules();
        assert_eq!(
            check(&rules, "internal.corp", IocType::Domain).unwrap().id,
            4
        );
        assert_eq!(
            check(&rules, "server.internal.corp", IocType::Domain)
                .unwrap()
                .id,
            4
        );
        assert!(check(&rules, "externalinternal.corp", IocType::Domain).is_none());
    }

    #[test]
    fn wildcard_candidate_compared_by_base() {
        let rules = vec![excl(1, "evil.com", ExclusionType::Domain, "test")];
        assert!(check(&rules, "*.evil.com", IocType::Wildcard).is_some());
        assert!(check(&rules, "*.safe.com", IocType::Wildcard).is_none());
    }

    #[test]
    fn hashes_are_never_excluded() {
        // even a rule that textually equals the hash cannot match
        let rules = vec![excl(
            1,
            "d41d8cd98f00b204e9800998ecf8427e",
            ExclusionType::Domain,
            "test",
        )];
        assert!(check(&rules, "d41d8cd98f00b204e9800998ecf8427e", IocType::Md5).is_none());
    }

    #[test]
    fn detect_type_of_patterns() {
        assert_eq!(detect_exclusion_type("192.0.2.1"), Some(ExclusionType::Ip));
        assert_eq!(
            detect_exclusion_type("10.0.0.0/8"),
            Some(ExclusionType::Cidr)
        );
        assert_eq!(
            detect_exclusion_type("*.internal.corp"),
            Some(ExclusionType::Wildcard)
        );
        assert_eq!(
            detect_exclusion_type("example.com"),
            Some(ExclusionType::Domain)
        );
        assert_eq!(detect_exclusion_type("com"), Some(ExclusionType::Domain));
        assert_eq!(detect_exclusion_type("not a pattern!"), None);
        assert_eq!(detect_exclusion_type(""), None);
    }
}
