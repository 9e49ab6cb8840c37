//! Property-based tests for location and fragment handling.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all possible inputs.

#[cfg(test)]
mod proptest_tests {
    use crate::merge::{escape_segment, parse_fragment, pointer, unescape_segment};
    use crate::path::{normalize, resolve};
    use proptest::prelude::*;

    // ============================================================================
    // normalize property tests
    // ============================================================================

    proptest! {
        /// Property: normalize is idempotent
        #[test]
        fn normalize_is_idempotent(path in "[a-z./]{0,40}") {
            let once = normalize(&path);
            prop_assert_eq!(normalize(&once), once.clone());
        }

        /// Property: normalized paths never contain `.` or empty segments
        #[test]
        fn normalize_drops_dot_and_empty_segments(path in "[a-z]{1,4}(/(\\.|[a-z]{1,4}|)){0,8}") {
            let result = normalize(&path);
            if result != "." {
                for segment in result.split('/') {
                    prop_assert!(segment != "." && !segment.is_empty(), "bad segment in '{}'", result);
                }
            }
        }

        /// Property: `..` only survives as a leading run of a relative path
        #[test]
        fn normalize_keeps_parent_segments_leading(path in "(\\.\\./|[a-z]{1,3}/){0,8}[a-z]{1,3}") {
            let result = normalize(&path);
            let first_named = result.split('/').position(|s| s != "..");
            if let Some(first) = first_named {
                prop_assert!(result.split('/').skip(first).all(|s| s != ".."));
            }
        }
    }

    // ============================================================================
    // resolve property tests
    // ============================================================================

    proptest! {
        /// Property: a target reached through `dir/../` resolves to the same key
        #[test]
        fn resolve_ignores_detours(dir in "[a-z]{1,8}", file in "[a-z]{1,8}\\.yaml") {
            let direct = resolve(&file, "specs", "").unwrap();
            let detour = resolve(&format!("{}/../{}", dir, file), "specs", "").unwrap();
            prop_assert_eq!(direct.key, detour.key);
        }

        /// Property: resolving relative to a nested directory matches joining by hand
        #[test]
        fn resolve_relative_matches_manual_join(
            a in "[a-z]{1,6}",
            b in "[a-z]{1,6}",
            c in "[a-z]{1,6}",
        ) {
            let location = resolve(&format!("../{}/d.yaml#/foo", c), ".", &format!("{}/{}", a, b)).unwrap();
            prop_assert_eq!(location.key, format!("{}/{}/d.yaml", a, c));
            prop_assert_eq!(location.directory, format!("{}/{}", a, c));
            prop_assert_eq!(location.fragment.as_deref(), Some("/foo"));
        }

        /// Property: the fragment is carried through untouched
        #[test]
        fn resolve_keeps_fragment(fragment in "(/[A-Za-z0-9_~]{1,8}){1,4}") {
            let location = resolve(&format!("a.yaml#{}", fragment), ".", "").unwrap();
            prop_assert_eq!(location.fragment, Some(fragment));
        }
    }

    // ============================================================================
    // fragment escaping property tests
    // ============================================================================

    proptest! {
        /// Property: escaping then unescaping a key returns the key
        #[test]
        fn escape_segment_inverts(key in "[a-z~/{}]{0,20}") {
            prop_assert_eq!(unescape_segment(&escape_segment(&key)), key);
        }

        /// Property: escaped segments never contain `/`
        #[test]
        fn escape_segment_removes_slashes(key in ".*") {
            prop_assert!(!escape_segment(&key).contains('/'));
        }

        /// Property: a pointer built from segments parses back to them
        #[test]
        fn pointer_parses_back(segments in prop::collection::vec("[a-z~/]{1,6}", 1..5)) {
            let text = pointer(&segments);
            prop_assert_eq!(parse_fragment(&text[1..]), segments);
        }
    }
}
