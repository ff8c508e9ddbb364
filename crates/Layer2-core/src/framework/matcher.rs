//! Fingerprint Matcher
//!
//! Decides which framework is responsible for which requested test.

use forkrun_foundation::{Fingerprint, TestDefinition};

/// Whether a framework-declared fingerprint satisfies a requested one.
///
/// Same variant and every field equal. Mixed variants never match.
pub fn matches(declared: &Fingerprint, requested: &Fingerprint) -> bool {
    match (declared, requested) {
        (
            Fingerprint::Subclass {
                is_module: m1,
                super_class_name: s1,
            },
            Fingerprint::Subclass {
                is_module: m2,
                super_class_name: s2,
            },
        ) => m1 == m2 && s1 == s2,
        (
            Fingerprint::Annotated {
                is_module: m1,
                annotation_name: a1,
            },
            Fingerprint::Annotated {
                is_module: m2,
                annotation_name: a2,
            },
        ) => m1 == m2 && a1 == a2,
        _ => false,
    }
}

/// Targets for one framework.
///
/// Declared fingerprints form the outer loop and requested tests the inner
/// one, so a test matched by two declared fingerprints appears twice.
pub fn select_targets<'a>(
    declared: &[Fingerprint],
    tests: &'a [TestDefinition],
) -> Vec<&'a TestDefinition> {
    declared
        .iter()
        .flat_map(|fp| tests.iter().filter(move |test| matches(fp, &test.fingerprint)))
        .collect()
}
