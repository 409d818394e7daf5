//! Property-based tests for sprint label normalization.
//!
//! Uses proptest to verify that:
//! - Integer and decimal sprint numbers survive any surrounding text
//! - Case does not matter
//! - Labels without digits never yield a sprint
//! - Normalizing an already normalized label is a no-op

use proptest::prelude::*;
use tracing::info;

use jira_snapshot::tagging::get_sprint;

/// Initialize test logging for proptest
fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_test_writer()
        .try_init();
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 100,
        ..Default::default()
    })]

    /// Property: "<board> Sprint N <suffix>" normalizes to "sprint N"
    #[test]
    fn integer_sprint_extracted(
        board in "[A-Za-z]{1,12}",
        number in 0u32..10_000u32,
        suffix in "[A-Za-z ()-]{0,16}",
    ) {
        init_test_logging();

        let label = format!("{board} Sprint {number} {suffix}");
        info!("proptest_integer_sprint: label={label}");

        prop_assert_eq!(get_sprint(&label), Some(format!("sprint {number}")));
    }

    /// Property: decimal sprint numbers keep both parts
    #[test]
    fn decimal_sprint_extracted(
        major in 0u32..1000u32,
        minor in 0u32..100u32,
        suffix in "[A-Za-z ()-]{0,16}",
    ) {
        init_test_logging();

        let label = format!("Board Sprint {major}.{minor} {suffix}");
        info!("proptest_decimal_sprint: label={label}");

        prop_assert_eq!(get_sprint(&label), Some(format!("sprint {major}.{minor}")));
    }

    /// Property: the keyword matches in any case, with or without a space
    #[test]
    fn keyword_case_insensitive(
        number in 0u32..500u32,
        upper in any::<bool>(),
        spaced in any::<bool>(),
    ) {
        init_test_logging();

        let keyword = if upper { "SPRINT" } else { "Sprint" };
        let gap = if spaced { " " } else { "" };
        let label = format!("{keyword}{gap}{number}");

        prop_assert_eq!(get_sprint(&label), Some(format!("sprint {number}")));
    }

    /// Property: labels without digits never produce a sprint
    #[test]
    fn no_digits_no_sprint(label in "[A-Za-z .()-]{0,40}") {
        init_test_logging();

        prop_assert_eq!(get_sprint(&label), None);
    }

    /// Property: normalization is idempotent
    #[test]
    fn normalization_idempotent(label in "[A-Za-z0-9 .()-]{0,40}") {
        init_test_logging();

        if let Some(normalized) = get_sprint(&label) {
            info!("proptest_idempotent: label={label} normalized={normalized}");
            prop_assert_eq!(get_sprint(&normalized), Some(normalized.clone()));
        }
    }
}
