//! IOC classification: raw string to canonical value + type.
//!
//! Classification runs an ordered list of matchers, first match wins. The
//! order matters because the representations overlap: a bare IP must not be
//! read as a degenerate domain, and a hash must not be read as a hostname.
//!
//! Precedence: hash (md5/sha1/sha256) -> CIDR -> IP -> wildcard -> domain.
//!
//! Classification is total over strings: every non-empty input either
//! classifies into exactly one type or fails with a reason suitable for
//! surfacing to a user or an LLM caller. The returned value is canonical
//! (lowercased domains and hashes, normalized IPv6 text, CIDR host bits
//! zeroed) and is the form used for uniqueness comparison.

use std::net::IpAddr;
use std::str::FromStr;

use ipnet::IpNet;

use crate::model::IocType;

/// A successfully classified IOC: canonical value plus detected type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub value: String,
    pub ioc_type: IocType,
}

/// Classification failure. Not retried; reported verbatim to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassifyError {
    #[error("value cannot be empty")]
    Empty,
    #[error("'{0}' is not a valid IP address, CIDR, domain, wildcard, or hash")]
    InvalidFormat(String),
}

/// A single typed matcher in the classification pipeline.
///
/// Matchers are evaluated in a fixed precedence order; each either claims
/// the value (returning its canonical form) or passes.
trait Matcher: Sync {
    fn try_match(&self, value: &str) -> Option<Classified>;
}

struct HashMatcher;
struct CidrMatcher;
struct IpMatcher;
struct WildcardMatcher;
struct DomainMatcher;

impl Matcher for HashMatcher {
    fn try_match(&self, value: &str) -> Option<Classified> {
        let ioc_type = match value.len() {
            32 => IocType::Md5,
            40 => IocType::Sha1,
            64 => IocType::Sha256,
            _ => return None,
        };
        if !value.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        Some(Classified {
            value: value.to_ascii_lowercase(),
            ioc_type,
        })
    }
}

impl Matcher for CidrMatcher {
    fn try_match(&self, value: &str) -> Option<Classified> {
        if !value.contains('/') {
            return None;
        }
        let net = IpNet::from_str(value).ok()?;
        // Canonical form zeroes the host bits: 10.1.2.3/8 -> 10.0.0.0/8.
        Some(Classified {
            value: net.trunc().to_string(),
            ioc_type: IocType::Cidr,
        })
    }
}

impl Matcher for IpMatcher {
    fn try_match(&self, value: &str) -> Option<Classified> {
        let addr: IpAddr = value.parse().ok()?;
        // Display normalizes IPv6 to its single compact lowercase form.
        Some(Classified {
            value: addr.to_string(),
            ioc_type: IocType::Ip,
        })
    }
}

impl Matcher for WildcardMatcher {
    fn try_match(&self, value: &str) -> Option<Classified> {
        let base = value.strip_prefix("*.")?;
        if !is_valid_domain(base) {
            return None;
        }
        Some(Classified {
            value: value.to_ascii_lowercase(),
            ioc_type: IocType::Wildcard,
        })
    }
}

impl Matcher for DomainMatcher {
    fn try_match(&self, value: &str) -> Option<Classified> {
        if !is_valid_domain(value) {
            return None;
        }
        Some(Classified {
            value: value.to_ascii_lowercase(),
            ioc_type: IocType::Domain,
        })
    }
}

static MATCHERS: &[&dyn Matcher] = &[
    &HashMatcher,
    &CidrMatcher,
    &IpMatcher,
    &WildcardMatcher,
    &DomainMatcher,
];

/// Classify a raw string into a canonical IOC value and type.
///
/// Input is trimmed first; empty or whitespace-only input is rejected.
///
/// # Errors
///
/// Returns [`ClassifyError`] if the value does not match any known IOC shape.
pub fn classify(raw: &str) -> Result<Classified, ClassifyError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(ClassifyError::Empty);
    }
    for matcher in MATCHERS {
        if let Some(classified) = matcher.try_match(value) {
            return Ok(classified);
        }
    }
    Err(ClassifyError::InvalidFormat(value.to_string()))
}

/// Syntactic domain validation.
///
/// Labels are alphanumeric/hyphen, 1-63 chars, no leading/trailing hyphen.
/// At least two labels; the final label (TLD) must be alphabetic and at
/// least two chars. Total length capped at 253 per RFC 1035.
pub(crate) fn is_valid_domain(value: &str) -> bool {
    if value.len() > 253 || value.is_empty() {
        return false;
    }
    let labels: Vec<&str> = value.split('.').collect();
    if labels.len() < 2 {
        return false;
    }
    for label in &labels {
        if label.is_empty() || label.len() > 63 {
            return false;
        }
        if !label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-') {
            return false;
        }
        if label.starts_with('-') || label.ends_with('-') {
            return false;
        }
    }
    let tld = labels[labels.len() - 1];
    tld.len() >= 2 && tld.bytes().all(|b| b.is_ascii_alphabetic())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn classify_ok(raw: &str) -> Classified {
        classify(raw).unwrap()
    }

    #[test]
    fn classifies_ipv4() {
        let c = classify_ok("192.0.2.7");
        assert_eq!(c.ioc_type, IocType::Ip);
        assert_eq!(c.value, "192.0.2.7");
    }

    #[test]
    fn classifies_ipv6_and_normalizes() {
        let c = classify_ok("2001:0DB8:0000:0000:0000:0000:0000:0001");
        assert_eq!(c.ioc_type, IocType::Ip);
        assert_eq!(c.value, "2001:db8::1");
    }

    #[test]
    fn classifies_cidr() {
        let c = classify_ok("203.0.113.0/24");
        assert_eq!(c.ioc_type, IocType::Cidr);
        assert_eq!(c.value, "203.0.113.0/24");
    }

    #[test]
    fn cidr_host_bits_are_zeroed() {
        let c = classify_ok("10.1.2.3/8");
        assert_eq!(c.ioc_type, IocType::Cidr);
        assert_eq!(c.value, "10.0.0.0/8");
    }

    #[test]
    fn rejects_cidr_with_invalid_prefix() {
        assert!(classify("10.0.0.0/33").is_err());
        assert!(classify("2001:db8::/129").is_err());
    }

    #[test]
    fn classifies_domain_lowercased() {
        let c = classify_ok("Example.COM");
        assert_eq!(c.ioc_type, IocType::Domain);
        assert_eq!(c.value, "example.com");
    }

    #[test]
    fn classifies_subdomain() {
        assert_eq!(classify_ok("deep.sub.example.com").ioc_type, IocType::Domain);
    }

    #[test]
    fn classifies_wildcard() {
        let c = classify_ok("*.badsite.com");
        assert_eq!(c.ioc_type, IocType::Wildcard);
        assert_eq!(c.value, "*.badsite.com");
    }

    #[test]
    fn wildcard_requires_valid_base() {
        assert!(classify("*.").is_err());
        assert!(classify("*.-bad.com").is_err());
        assert!(classify("*.nodots").is_err());
    }

    #[test]
    fn classifies_hashes_by_length() {
        let md5 = "d41d8cd98f00b204e9800998ecf8427e";
        let sha1 = "da39a3ee5e6b4b0d3255bfef95601890afd80709";
        let sha256 = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";
        assert_eq!(classify_ok(md5).ioc_type, IocType::Md5);
        assert_eq!(classify_ok(sha1).ioc_type, IocType::Sha1);
        assert_eq!(classify_ok(sha256).ioc_type, IocType::Sha256);
    }

    #[test]
    fn hash_is_lowercased() {
        let c = classify_ok("D41D8CD98F00B204E9800998ECF8427E");
        assert_eq!(c.value, "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(c.ioc_type, IocType::Md5);
    }

    #[test]
    fn hash_wrong_length_or_charset_rejected() {
        // 31 chars: too short for md5, not a valid domain either
        assert!(classify("d41d8cd98f00b204e9800998ecf8427").is_err());
        // 'g' is not hex and the string has no dots
        assert!(classify("g41d8cd98f00b204e9800998ecf8427e").is_err());
    }

    #[test]
    fn trims_whitespace() {
        assert_eq!(classify_ok("  example.com  ").value, "example.com");
    }

    #[test]
    fn rejects_empty_and_garbage() {
        assert!(matches!(classify(""), Err(ClassifyError::Empty)));
        assert!(matches!(classify("   "), Err(ClassifyError::Empty)));
        assert!(matches!(
            classify("not a domain!"),
            Err(ClassifyError::InvalidFormat(_))
        ));
        assert!(classify("http://example.com/path").is_err());
        assert!(classify("-leading.com").is_err());
        assert!(classify("trailing-.com").is_err());
        assert!(classify("example.c").is_err());
        assert!(classify("example.123").is_err());
    }

    #[test]
    fn bare_ip_is_not_a_domain() {
        // Numeric TLD shape means an IPv4 literal can never fall through
        // to the domain matcher, but check the precedence anyway.
        assert_eq!(classify_ok("8.8.8.8").ioc_type, IocType::Ip);
    }

    proptest! {
        // Classification is total: never panics, any string either
        // classifies or errors.
        #[test]
        fn classify_is_total(s in ".{0,300}") {
            let _ = classify(&s);
        }

        // Canonicalization is idempotent: re-classifying a canonical value
        // yields the same type and the same value.
        #[test]
        fn canonicalization_is_idempotent(s in "[a-zA-Z0-9.*/:-]{1,80}") {
            if let Ok(first) = classify(&s) {
                let second = classify(&first.value).expect("canonical value must classify");
                prop_assert_eq!(first.ioc_type, second.ioc_type);
                prop_assert_eq!(first.value, second.value);
            }
        }
    }
}
