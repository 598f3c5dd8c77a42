use std::fs;
use std::path::{Path, PathBuf};

use asr_metrics::{
    EvaluationOutput, Granularity, MetricsConfig, MetricsError, MetricsEvaluatorBuilder,
    TextInput, ZeroLengthPolicy,
};
use libtest_mimic::{Arguments, Failed, Trial};
use serde::Deserialize;

const SUITE_NAME: &str = "measures_reference";
const FIXTURE_PATH: &str = "test-data/measures_reference.json";
const TOLERANCE: f64 = 1e-12;

#[derive(Debug, Deserialize)]
struct Fixture {
    cases: Vec<ReferenceCase>,
}

#[derive(Debug, Deserialize)]
struct ReferenceCase {
    name: String,
    granularity: Granularity,
    #[serde(default)]
    policy: ZeroLengthPolicy,
    reference: TextInput,
    hypothesis: TextInput,
    expected: Expected,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Expected {
    error_rate: Option<f64>,
    mer: Option<f64>,
    wil: Option<f64>,
    wip: Option<f64>,
    hits: Option<usize>,
    substitutions: Option<usize>,
    deletions: Option<usize>,
    insertions: Option<usize>,
    error: Option<ExpectedError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ExpectedError {
    Arity,
    Domain,
}

fn main() {
    let args = Arguments::from_args();
    let repo_root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));

    let fixture = match load_fixture(&repo_root.join(FIXTURE_PATH)) {
        Ok(fixture) => fixture,
        Err(err) => {
            run_setup_failure(&args, err);
            return;
        }
    };
    if fixture.cases.is_empty() {
        run_setup_failure(&args, format!("No reference cases found in {FIXTURE_PATH}."));
        return;
    }

    let tests = fixture
        .cases
        .into_iter()
        .map(|case| {
            let test_name = format!("{SUITE_NAME}::{}::{}", case.granularity.as_str(), case.name);
            Trial::test(test_name, move || run_reference_case(&case).map_err(Failed::from))
        })
        .collect();
    libtest_mimic::run(&args, tests).exit();
}

fn run_setup_failure(args: &Arguments, message: String) {
    let test = Trial::test(format!("{SUITE_NAME}::setup"), move || {
        Err(Failed::from(message.clone()))
    });
    libtest_mimic::run(args, vec![test]).exit();
}

fn load_fixture(path: &Path) -> Result<Fixture, String> {
    let data = fs::read_to_string(path)
        .map_err(|err| format!("Failed to read fixture '{}': {err}", path.display()))?;
    serde_json::from_str(&data)
        .map_err(|err| format!("Failed to parse fixture '{}': {err}", path.display()))
}

fn run_reference_case(case: &ReferenceCase) -> Result<(), String> {
    let config = MetricsConfig {
        granularity: case.granularity,
        ..MetricsConfig::default()
    };
    let evaluator = MetricsEvaluatorBuilder::new(config)
        .with_zero_length_policy(case.policy)
        .build()
        .map_err(|err| format!("build evaluator: {err}"))?;

    let result = evaluator
        .evaluate(case.reference.clone(), case.hypothesis.clone())
        .and_then(|output| output.error_rate().map(|rate| (output, rate)));

    match (result, case.expected.error) {
        (Ok((output, rate)), None) => check_values(&case.expected, &output, rate),
        (Ok((_, rate)), Some(expected)) => Err(format!(
            "expected {expected:?} error, got error rate {rate}"
        )),
        (Err(err), None) => Err(format!("unexpected error: {err}")),
        (Err(err), Some(expected)) => {
            let matches = matches!(
                (&err, expected),
                (MetricsError::Arity { .. }, ExpectedError::Arity)
                    | (MetricsError::Domain { .. }, ExpectedError::Domain)
            );
            if matches {
                Ok(())
            } else {
                Err(format!("expected {expected:?} error, got: {err}"))
            }
        }
    }
}

fn check_values(expected: &Expected, output: &EvaluationOutput, rate: f64) -> Result<(), String> {
    let mut failures = Vec::new();
    check_f64(&mut failures, "error_rate", expected.error_rate, rate);

    if expected.mer.is_some() || expected.wil.is_some() || expected.wip.is_some() {
        let measures = output
            .measures()
            .map_err(|err| format!("measures undefined: {err}"))?;
        check_f64(&mut failures, "mer", expected.mer, measures.mer);
        check_f64(&mut failures, "wil", expected.wil, measures.wil);
        check_f64(&mut failures, "wip", expected.wip, measures.wip);
    }

    let counts = output.corpus.counts;
    check_count(&mut failures, "hits", expected.hits, counts.hits);
    check_count(
        &mut failures,
        "substitutions",
        expected.substitutions,
        counts.substitutions,
    );
    check_count(&mut failures, "deletions", expected.deletions, counts.deletions);
    check_count(&mut failures, "insertions", expected.insertions, counts.insertions);

    if failures.is_empty() {
        Ok(())
    } else {
        Err(failures.join("; "))
    }
}

fn check_f64(failures: &mut Vec<String>, label: &str, expected: Option<f64>, actual: f64) {
    if let Some(expected) = expected {
        if (expected - actual).abs() > TOLERANCE {
            failures.push(format!("{label}: expected {expected}, got {actual}"));
        }
    }
}

fn check_count(failures: &mut Vec<String>, label: &str, expected: Option<usize>, actual: usize) {
    if let Some(expected) = expected {
        if expected != actual {
            failures.push(format!("{label}: expected {expected}, got {actual}"));
        }
    }
}
