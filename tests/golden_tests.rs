//! Golden tests - fixture-based tests that lock expected behavior
//!
//! Remote keys and content types are what browsers and CDNs see; any change
//! here changes deployed URLs or headers and should be deliberate.
//!
//! Run with: cargo test --test golden_tests

use serde::Deserialize;
use std::fs;

// ============================================================================
// KEY MAPPING GOLDEN TESTS
// ============================================================================

mod key_mapping_golden {
    use super::*;
    use minio_deploy::sync::map_key;

    #[derive(Debug, Deserialize)]
    struct TestCase {
        name: String,
        relative_path: String,
        prefix: String,
        expected: String,
    }

    #[derive(Debug, Deserialize)]
    struct Fixture {
        test_cases: Vec<TestCase>,
    }

    #[test]
    fn test_key_mapping_golden() {
        let fixture_path = concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/tests/fixtures/key_mapping.json"
        );
        let content =
            fs::read_to_string(fixture_path).expect("Failed to read key_mapping.json fixture");
        let fixture: Fixture =
            serde_json::from_str(&content).expect("Failed to parse fixture JSON");

        for case in fixture.test_cases {
            assert_eq!(
                map_key(&case.relative_path, &case.prefix),
                case.expected,
                "Case '{}'",
                case.name
            );
        }
    }
}

// ============================================================================
// CONTENT TYPE GOLDEN TESTS
// ============================================================================

mod content_type_golden {
    use super::*;
    use minio_deploy::sync::content_type_for;

    #[derive(Debug, Deserialize)]
    struct TestCase {
        path: String,
        expected: String,
    }

    #[derive(Debug, Deserialize)]
    struct Fixture {
        test_cases: Vec<TestCase>,
    }

    #[test]
    fn test_content_types_golden() {
        let fixture_path = concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/tests/fixtures/content_types.json"
        );
        let content =
            fs::read_to_string(fixture_path).expect("Failed to read content_types.json fixture");
        let fixture: Fixture =
            serde_json::from_str(&content).expect("Failed to parse fixture JSON");

        for case in fixture.test_cases {
            assert_eq!(
                content_type_for(&case.path),
                case.expected,
                "Path '{}'",
                case.path
            );
        }
    }
}
