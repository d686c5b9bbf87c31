//! Property-based tests using proptest
//!
//! These tests verify resource ID parsing, cache key layout and the
//! response cache using randomized inputs.

use aks_gateway::azure::{cache_key, AzureCache, CacheValue, ResourceIdentifier, ResponseCache};
use proptest::prelude::*;

/// A single path segment: no slashes, never empty
fn arb_segment() -> impl Strategy<Value = String> {
    "[A-Za-z0-9][A-Za-z0-9._-]{0,30}"
}

fn arb_provider() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Microsoft.Network".to_string()),
        Just("Microsoft.ContainerService".to_string()),
        Just("Microsoft.Storage".to_string()),
    ]
}

/// Top-level or nested canonical resource IDs with their parts
fn arb_resource_id() -> impl Strategy<Value = (String, [String; 5], Option<(String, String)>)> {
    (
        arb_segment(),
        arb_segment(),
        arb_provider(),
        arb_segment(),
        arb_segment(),
        proptest::option::of((arb_segment(), arb_segment())),
    )
        .prop_map(|(sub, rg, provider, kind, name, nested)| {
            let mut id = format!(
                "/subscriptions/{}/resourceGroups/{}/providers/{}/{}/{}",
                sub, rg, provider, kind, name
            );
            if let Some((child, child_name)) = &nested {
                id.push_str(&format!("/{}/{}", child, child_name));
            }
            (id, [sub, rg, provider, kind, name], nested)
        })
}

proptest! {
    /// Every canonical ID parses back into the parts it was built from
    #[test]
    fn canonical_ids_parse_into_their_parts((id, parts, nested) in arb_resource_id()) {
        let parsed = ResourceIdentifier::parse(&id).unwrap();
        let [sub, rg, provider, kind, name] = parts;

        prop_assert_eq!(parsed.subscription_id, sub);
        prop_assert_eq!(parsed.resource_group, rg);
        prop_assert_eq!(parsed.provider, provider);
        prop_assert_eq!(parsed.resource_type, kind);
        prop_assert_eq!(parsed.resource_name, name);
        prop_assert_eq!(
            parsed.sub_resource_type.zip(parsed.sub_resource_name),
            nested
        );
        prop_assert_eq!(parsed.full_id, id);
    }

    /// Surrounding whitespace is ignored
    #[test]
    fn whitespace_is_trimmed((id, _, _) in arb_resource_id(), pad in "[ \t\n]{0,3}") {
        let padded = format!("{}{}{}", pad, id, pad);
        let parsed = ResourceIdentifier::parse(&padded).unwrap();
        prop_assert_eq!(parsed.full_id, id);
    }

    /// Dropping the last segment of a nested ID leaves a malformed one
    #[test]
    fn ten_segments_are_rejected((id, _, nested) in arb_resource_id()) {
        prop_assume!(nested.is_some());
        let cut = &id[..id.rfind('/').unwrap()];
        prop_assert!(ResourceIdentifier::parse(cut).is_err());
    }

    /// Anything with too few segments is rejected
    #[test]
    fn short_ids_are_rejected(parts in prop::collection::vec(arb_segment(), 0..8)) {
        let id = format!("/{}", parts.join("/"));
        prop_assert!(ResourceIdentifier::parse(&id).is_err());
    }

    /// Collection tokens are case-sensitive
    #[test]
    fn wrong_case_tokens_are_rejected((id, _, _) in arb_resource_id()) {
        let bad = id.replacen("/resourceGroups/", "/resourcegroups/", 1);
        prop_assert!(ResourceIdentifier::parse(&bad).is_err());
    }

    /// Parsing never panics on arbitrary input
    #[test]
    fn parse_never_panics(input in ".{0,200}") {
        let _ = ResourceIdentifier::parse(&input);
    }

    /// A nested ID's parent is the top-level ID it starts with
    #[test]
    fn parent_is_prefix((id, _, nested) in arb_resource_id()) {
        let parsed = ResourceIdentifier::parse(&id).unwrap();
        match nested {
            Some(_) => {
                let parent = parsed.parent().unwrap();
                prop_assert!(id.starts_with(&parent.full_id));
                prop_assert!(parent.sub_resource_type.is_none());
            }
            None => prop_assert!(parsed.parent().is_none()),
        }
    }

    /// Keys for distinct subjects never collide under one prefix
    #[test]
    fn cache_keys_are_distinct(a in arb_segment(), b in arb_segment()) {
        prop_assume!(a != b);
        prop_assert_ne!(cache_key("subnet-nsg", &a), cache_key("subnet-nsg", &b));
        prop_assert!(cache_key("subnet-nsg", &a).starts_with("subnet-nsg:"));
    }
}

mod cache_properties {
    use super::*;

    proptest! {
        /// The last write for a key wins; deleted keys read as missing
        #[test]
        fn last_write_wins(
            key in arb_segment(),
            values in prop::collection::vec(arb_segment(), 1..10),
        ) {
            let cache = AzureCache::default();
            tokio_test::block_on(async {
                for v in &values {
                    cache.set(&key, CacheValue::ResourceId(v.clone())).await;
                }
                let got = cache.get(&key).await.and_then(CacheValue::into_resource_id);
                assert_eq!(got.as_ref(), values.last());

                cache.delete(&key).await;
                assert!(cache.get(&key).await.is_none());
            });
        }
    }
}
