//! Library integration tests.

use arteval::compare::metrics::{cosine, jaccard_set, min_max, pearson};
use arteval::compare::{align_by_reference, similarity_threshold, AlignPolicy, LabeledValues};
use arteval::oracle::{build_report, EvalContext};
use arteval::requirements::{
    FailCheck, Requirement, SemanticVersion, VersionCheck, VersionCompare,
};
use arteval::shell::CommandLine;
use arteval::ArtevalError;

#[test]
fn error_types_are_public() {
    let err = ArtevalError::invalid("timeout must be > 0");
    assert!(err.to_string().contains("timeout"));
}

#[test]
fn result_type_alias_is_public() {
    fn test_fn() -> arteval::Result<()> {
        Ok(())
    }
    assert!(test_fn().is_ok());
}

#[test]
fn cosine_of_self_and_negation() {
    let a = [0.5, -1.5, 3.0, 7.25];
    let neg: Vec<f64> = a.iter().map(|x| -x).collect();
    assert!((cosine(&a, &a).unwrap() - 1.0).abs() < 1e-12);
    assert!((cosine(&a, &neg).unwrap() + 1.0).abs() < 1e-12);
}

#[test]
fn jaccard_is_symmetric_and_reflexive() {
    let a = [1.0, 2.0, 5.0];
    let b = [2.0, 5.0, 9.0, 11.0];
    assert_eq!(jaccard_set(&a, &b).unwrap(), jaccard_set(&b, &a).unwrap());
    assert_eq!(jaccard_set(&a, &a).unwrap(), 1.0);
}

#[test]
fn min_max_and_pearson_edge_cases() {
    assert_eq!(min_max(&[0.0, 0.0], &[0.0, 0.0]).unwrap(), 1.0);
    assert!(min_max(&[-1.0], &[1.0]).is_err());
    assert!(pearson(&[1.0], &[1.0]).is_err());
}

#[test]
fn elementwise_threshold_examples() {
    let pass = similarity_threshold(&[1.0, 2.0], &[1.0, 2.0], 1.0, 1e-12).unwrap();
    assert!(pass.iter().all(|c| c.result));

    let fail = similarity_threshold(&[0.5], &[1.0], 0.9, 1e-12).unwrap();
    assert!(!fail[0].result);
}

#[test]
fn label_alignment_names_missing_label() {
    let reference: LabeledValues = [("a", 1.0), ("b", 2.0)].into_iter().collect();
    let observed: LabeledValues = [("a", 1.0)].into_iter().collect();
    let err = align_by_reference(&observed, &reference, AlignPolicy::Superset, 10).unwrap_err();
    assert!(err.to_string().contains('b'));
}

#[test]
fn report_classifies_required_and_optional_failures() {
    let report = build_report(
        || {
            Ok(vec![
                Requirement::new("required", FailCheck::new("broken"))?,
                Requirement::new("optional", FailCheck::new("missing docs"))?.optional(true),
            ])
        },
        &EvalContext::new("integration"),
    );
    assert!(!report.ok);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.outcomes.len(), 2);
}

#[cfg(unix)]
#[test]
fn version_check_with_capture_pattern() {
    let output = CommandLine::argv(["printf", "go1.22.3 linux/amd64\n"]).unwrap();
    let ctx = EvalContext::new("integration");

    let pass = VersionCheck::new(output.clone(), SemanticVersion::new(1, 22, 0))
        .compare(VersionCompare::Geq)
        .version_regex(r"go(\d+\.\d+(?:\.\d+)?)")
        .unwrap()
        .evaluate(&ctx);
    assert!(pass.ok, "{}", pass.message);

    let fail = VersionCheck::new(output, SemanticVersion::new(1, 23, 0))
        .version_regex(r"go(\d+\.\d+(?:\.\d+)?)")
        .unwrap()
        .evaluate(&ctx);
    assert!(!fail.ok);
    assert_eq!(fail.message, "version 1.22.3 does not satisfy >= 1.23.0");
}
