#![allow(dead_code)]

use proptest::prelude::*;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// Class folder keys in the `<letter>-<label>` shape.
pub fn class_key_strategy() -> impl Strategy<Value = String> {
    ("[A-Z]", "[a-z]{1,12}").prop_map(|(prefix, label)| format!("{prefix}-{label}"))
}

/// Box fractions accepted by the centered estimator.
pub fn fraction_strategy() -> impl Strategy<Value = f64> {
    (1u32..=1000).prop_map(|n| f64::from(n) / 1000.0)
}
