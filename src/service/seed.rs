//! Built-in exclusion seeding.
//!
//! Guards against the classic operational accident: someone pastes a log
//! line and blocks `com`, an RFC1918 range, or localhost on a production
//! firewall. Seeded once, on first startup against an empty rule table.

use tracing::info;

use crate::model::ExclusionType;
use crate::store::{exclusions, Store};

use super::ServiceResult;

/// Rules present in every deployment. Marked built-in, so they cannot be
/// removed through any interface.
const BUILTIN_EXCLUSIONS: &[(&str, ExclusionType, &str)] = &[
    ("com", ExclusionType::Domain, "top-level domain"),
    ("org", ExclusionType::Domain, "top-level domain"),
    ("net", ExclusionType::Domain, "top-level domain"),
    ("edu", ExclusionType::Domain, "top-level domain"),
    ("gov", ExclusionType::Domain, "top-level domain"),
    ("io", ExclusionType::Domain, "top-level domain"),
    ("co", ExclusionType::Domain, "top-level domain"),
    ("10.0.0.0/8", ExclusionType::Cidr, "RFC1918 private range"),
    ("172.16.0.0/12", ExclusionType::Cidr, "RFC1918 private range"),
    ("192.168.0.0/16", ExclusionType::Cidr, "RFC1918 private range"),
    ("127.0.0.0/8", ExclusionType::Cidr, "loopback range"),
    ("localhost", ExclusionType::Domain, "loopback host"),
];

/// Seed the built-in rules if none exist yet. Returns the number inserted
/// (zero on every startup after the first).
///
/// # Errors
///
/// Propagates storage errors.
pub fn seed_builtin_exclusions(store: &Store) -> ServiceResult<usize> {
    let inserted = store.transaction(|tx| {
        if exclusions::builtin_count(tx)? > 0 {
            return Ok(0);
        }
        for (value, excl_type, reason) in BUILTIN_EXCLUSIONS {
            exclusions::insert(tx, value, *excl_type, Some(reason), true)?;
        }
        Ok(BUILTIN_EXCLUSIONS.len())
    })?;
    if inserted > 0 {
        info!(count = inserted, "seeded built-in exclusions");
    }
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{ioc, ServiceError};
    use crate::store::Store;

    #[test]
    fn seeds_once() {
        let store = Store::memory().unwrap();
        assert_eq!(
            seed_builtin_exclusions(&store).unwrap(),
            BUILTIN_EXCLUSIONS.len()
        );
        assert_eq!(seed_builtin_exclusions(&store).unwrap(), 0);
        let total = store
            .with(crate::store::exclusions::total_count)
            .unwrap();
        assert_eq!(total as usize, BUILTIN_EXCLUSIONS.len());
    }

    #[test]
    fn seeded_rules_block_submissions() {
        let store = Store::memory().unwrap();
        seed_builtin_exclusions(&store).unwrap();
        let err = ioc::add_ioc(&store, "192.168.1.50", &[], None, "test").unwrap_err();
        assert!(matches!(err, ServiceError::ExclusionBlocked { .. }));
        // TLD rules suffix-match, so any .com domain is refused
        let err = ioc::add_ioc(&store, "evil.com", &[], None, "test").unwrap_err();
        assert!(matches!(err, ServiceError::ExclusionBlocked { .. }));
    }

    #[test]
    fn builtins_cannot_be_removed() {
        let store = Store::memory().unwrap();
        seed_builtin_exclusions(&store).unwrap();
        let err = crate::service::exclusion::remove(&store, "com", "test").unwrap_err();
        assert!(matches!(err, ServiceError::BuiltinProtected(_)));
    }
}
