//! Property-based tests for critical validation and generation logic.
//!
//! Uses `proptest` to verify invariants across many random inputs.

#![allow(clippy::expect_used)]

use proptest::prelude::*;

use ec2_k3s::domain::OwnerTag;
use ec2_k3s::domain::instance::sanitize_user;
use ec2_k3s::domain::kubeconfig::rewrite_server_host;

/// Kubeconfig-like text assembled from realistic fragments.
fn kubeconfig_text() -> impl Strategy<Value = String> {
    let fragment = prop::sample::select(vec![
        "apiVersion: v1\n",
        "clusters:\n- cluster:\n",
        "    server: https://",
        "127.0.0.1",
        "localhost",
        ":6443\n",
        "  name: default\n",
        "    certificate-authority-data: LS0tLS1CRUdJTg==\n",
        "users:\n- name: default\n",
    ]);
    prop::collection::vec(fragment, 0..24).prop_map(|parts| parts.concat())
}

fn public_ip() -> impl Strategy<Value = String> {
    (1u8..=254, prop::sample::select(vec!["203.0.113", "198.51.100", "54.12.200"]))
        .prop_map(|(host, net)| format!("{net}.{host}"))
}

// ============================================================================
// rewrite_server_host() property tests
// ============================================================================

proptest! {
    /// Rewriting twice gives the same result as rewriting once.
    #[test]
    fn prop_rewrite_is_idempotent(text in kubeconfig_text(), ip in public_ip()) {
        let once = rewrite_server_host(&text, &ip).expect("rewrite");
        let twice = rewrite_server_host(&once, &ip).expect("rewrite");
        prop_assert_eq!(once, twice);
    }

    /// No loopback host survives the rewrite.
    #[test]
    fn prop_rewrite_removes_loopback(text in kubeconfig_text(), ip in public_ip()) {
        let out = rewrite_server_host(&text, &ip).expect("rewrite");
        prop_assert!(!out.contains("127.0.0.1"));
        prop_assert!(!out.contains("localhost"));
    }

    /// Text without loopback hosts is returned unchanged.
    #[test]
    fn prop_rewrite_leaves_other_text_alone(text in "[a-z :/\n-]{0,200}", ip in public_ip()) {
        prop_assume!(!text.contains("localhost"));
        let out = rewrite_server_host(&text, &ip).expect("rewrite");
        prop_assert_eq!(out, text);
    }
}

#[test]
fn test_rewrite_refuses_loopback_target() {
    assert!(rewrite_server_host("server: https://127.0.0.1:6443", "127.0.0.1").is_err());
    assert!(rewrite_server_host("server: https://127.0.0.1:6443", "0.0.0.0").is_err());
    assert!(rewrite_server_host("server: https://127.0.0.1:6443", "not-an-ip").is_err());
}

// ============================================================================
// OwnerTag property tests
// ============================================================================

proptest! {
    /// Generated tags always parse back, for any local account name.
    #[test]
    fn prop_generated_owner_tag_round_trips(user in "\\PC{0,64}") {
        let tag = OwnerTag::generate(&user);
        let parsed = OwnerTag::parse(tag.as_str()).expect("generated tag must parse");
        prop_assert_eq!(parsed.user(), sanitize_user(&user));
        prop_assert_eq!(&parsed, &tag);
    }

    /// Tags carrying path or shell metacharacters are rejected.
    #[test]
    fn prop_owner_tag_rejects_metacharacters(
        prefix in "[a-z]{1,8}",
        bad in prop::sample::select(vec!["/", "..", " ", "$", ";", "`", "*"]),
    ) {
        let value = format!("{prefix}{bad}-0123456789abcdef");
        prop_assert!(OwnerTag::parse(&value).is_err());
    }
}

#[test]
fn test_owner_tags_are_unique() {
    let tags: std::collections::HashSet<_> = (0..100)
        .map(|_| OwnerTag::generate("alice").as_str().to_string())
        .collect();
    assert_eq!(tags.len(), 100, "duplicate owner tags generated");
}
