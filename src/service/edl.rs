//! EDL rendering: the plaintext list a firewall actually pulls.
//!
//! One canonical value per line, lexicographically sorted, trailing
//! newline. An empty list renders as an empty body. The output is a pure
//! function of the list's membership set.

use crate::store::{lists, Store};

use super::ServiceResult;

/// Render a list's EDL body, or `None` for an unknown slug.
pub fn render(store: &Store, slug: &str) -> ServiceResult<Option<String>> {
    let values = store.with(|conn| {
        let Some(list) = lists::get_by_slug(conn, slug)? else {
            return Ok(None);
        };
        Ok(Some(lists::edl_values(conn, list.id)?))
    })?;
    Ok(values.map(|values| {
        let mut body = String::with_capacity(values.iter().map(|v| v.len() + 1).sum());
        for value in &values {
            body.push_str(value);
            body.push('\n');
        }
        body
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ListType;
    use crate::service::{ioc, list};
    use crate::store::Store;

    fn seeded_store() -> (Store, String) {
        let store = Store::memory().unwrap();
        let created = list::create(&store, "Block IPs", None, ListType::Ip, &[]).unwrap();
        (store, created.slug)
    }

    #[test]
    fn renders_sorted_with_trailing_newline() {
        let (store, slug) = seeded_store();
        let slugs = vec![slug.clone()];
        ioc::add_ioc(&store, "9.9.9.9", &slugs, None, "test").unwrap();
        ioc::add_ioc(&store, "1.2.3.4", &slugs, None, "test").unwrap();
        let body = render(&store, &slug).unwrap().unwrap();
        assert_eq!(body, "1.2.3.4\n9.9.9.9\n");
    }

    #[test]
    fn empty_list_renders_empty_body() {
        let (store, slug) = seeded_store();
        assert_eq!(render(&store, &slug).unwrap().unwrap(), "");
    }

    #[test]
    fn unknown_slug_is_none() {
        let store = Store::memory().unwrap();
        assert!(render(&store, "nope").unwrap().is_none());
    }

    #[test]
    fn emitted_lines_reclassify_to_themselves() {
        let store = Store::memory().unwrap();
        let created = list::create(&store, "Mixed Feed", None, ListType::Mixed, &[]).unwrap();
        let slugs = vec![created.slug.clone()];
        for raw in ["EVIL.Example.COM", "198.51.100.20/30", "*.Bad.Example", "1.2.3.4"] {
            ioc::add_ioc(&store, raw, &slugs, None, "test").unwrap();
        }
        let body = render(&store, &created.slug).unwrap().unwrap();
        for line in body.lines() {
            let classified = crate::classify::classify(line).unwrap();
            assert_eq!(classified.value, line, "canonical form is a fixed point");
        }
    }

    #[test]
    fn output_is_stable_across_calls() {
        let (store, slug) = seeded_store();
        let slugs = vec![slug.clone()];
        ioc::add_ioc(&store, "10.1.0.0/16", &slugs, None, "test").unwrap();
        let a = render(&store, &slug).unwrap().unwrap();
        let b = render(&store, &slug).unwrap().unwrap();
        assert_eq!(a, b);
    }
}
