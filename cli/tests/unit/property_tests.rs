//! Property-based tests for scoring and rendering invariants.
//!
//! Uses `proptest` to verify invariants across many random inputs.

use chrono::Utc;
use proptest::prelude::*;

use ndt_ops::domain::artifacts::{EnvFile, parse_env_file};
use ndt_ops::domain::check::{CheckResult, CheckStatus};
use ndt_ops::domain::report::{OverallStatus, score};

fn arb_status() -> impl Strategy<Value = CheckStatus> {
    prop_oneof![
        Just(CheckStatus::Ok),
        Just(CheckStatus::Warning),
        Just(CheckStatus::Failure),
    ]
}

fn result(status: CheckStatus) -> CheckResult {
    CheckResult {
        check: "prop",
        status,
        message: String::new(),
        remediation_attempted: false,
        remediation_succeeded: None,
    }
}

proptest! {
    /// Counts always match the statuses and the overall verdict follows them.
    #[test]
    fn prop_score_counts_and_verdict(statuses in prop::collection::vec(arb_status(), 0..20)) {
        let results: Vec<CheckResult> = statuses.iter().copied().map(result).collect();
        let report = score(results, Utc::now());

        let failures = statuses.iter().filter(|s| **s == CheckStatus::Failure).count();
        let warnings = statuses.iter().filter(|s| **s == CheckStatus::Warning).count();
        prop_assert_eq!(report.issue_count, failures);
        prop_assert_eq!(report.warning_count, warnings);
        prop_assert_eq!(report.results.len(), statuses.len());

        let expected = if failures > 0 {
            OverallStatus::Unhealthy
        } else if warnings > 0 {
            OverallStatus::Degraded
        } else {
            OverallStatus::Healthy
        };
        prop_assert_eq!(report.overall_status, expected);
        prop_assert_eq!(report.overall_status.exit_code(), u8::from(failures > 0));
    }

    /// Any printable value survives rendering and parsing the environment file.
    #[test]
    fn prop_env_values_survive_quoting(value in "[ -~]{0,40}") {
        let mut env = EnvFile::default();
        env.push("NDT_VALUE", value.clone());
        let parsed = parse_env_file(&env.render());
        prop_assert_eq!(parsed, vec![("NDT_VALUE".to_string(), value)]);
    }
}
