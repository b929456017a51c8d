//! Property-based tests for the lossy path encoding.
//!
//! The encoding is many-to-one, so a general round-trip property does not
//! hold. These tests pin down the subset where decoding is exact and check
//! that the functions never panic on arbitrary input.

use claude_stitch::pathcode::{decode_encoded_id, encode_path, looks_encoded};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    /// Encoding and decoding never panic on arbitrary strings.
    #[test]
    fn encode_decode_never_panic(input in ".*") {
        let _ = encode_path(&input);
        let _ = decode_encoded_id(&input);
        let _ = looks_encoded(&input);
    }

    /// Every encoded id starts with a hyphen and contains no slashes.
    #[test]
    fn encoded_form_is_well_shaped(input in ".*") {
        let encoded = encode_path(&input);
        prop_assert!(encoded.starts_with('-'));
        prop_assert!(!encoded.contains('/'));
        prop_assert!(!encoded.contains('_'));
    }

    /// For absolute paths whose segments contain neither hyphens nor
    /// underscores, decode is the exact inverse of encode.
    #[test]
    fn round_trip_exact_for_unambiguous_paths(
        segments in prop::collection::vec("[a-z][a-z0-9]{0,11}", 1..6)
    ) {
        let path = format!("/{}", segments.join("/"));
        let encoded = encode_path(&path);
        prop_assert_eq!(decode_encoded_id(&encoded), path);
    }

    /// Decoding any encoded id yields an absolute path with no empty
    /// segments.
    #[test]
    fn decoded_paths_are_absolute_and_clean(input in "-[a-zA-Z0-9-]{1,40}") {
        let decoded = decode_encoded_id(&input);
        prop_assert!(decoded.starts_with('/'));
        prop_assert!(!decoded.contains("//"));
    }

    /// Two distinct unambiguous paths never collide.
    #[test]
    fn unambiguous_paths_do_not_collide(
        a in prop::collection::vec("[a-z]{1,8}", 1..4),
        b in prop::collection::vec("[a-z]{1,8}", 1..4)
    ) {
        let pa = format!("/{}", a.join("/"));
        let pb = format!("/{}", b.join("/"));
        prop_assume!(pa != pb);
        prop_assert_ne!(encode_path(&pa), encode_path(&pb));
    }
}
