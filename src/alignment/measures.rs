use serde::{Deserialize, Serialize};

use crate::error::MetricsError;
use crate::types::EditCounts;

/// What an error rate evaluates to when the reference has no tokens.
///
/// WIP and WIL are always defined and ignore the policy.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "lowercase")]
pub enum ZeroLengthPolicy {
    /// Fail with [`MetricsError::Domain`].
    #[default]
    Strict,
    /// Clamp the denominator to at least 1.
    Lenient,
    /// Return the given value (for example `f64::INFINITY`) when the reference
    /// is empty and the hypothesis is not. Two empty inputs give `0.0`.
    Sentinel(#[serde(with = "float_repr")] f64),
}

/// JSON has no literal for non-finite numbers, so `inf`, `-inf` and `nan`
/// are written as strings. Finite values stay plain numbers.
pub(crate) mod float_repr {
    use serde::de::{self, Deserialize, Deserializer};
    use serde::{Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else if value.is_nan() {
            serializer.serialize_str("nan")
        } else if value.is_sign_positive() {
            serializer.serialize_str("inf")
        } else {
            serializer.serialize_str("-inf")
        }
    }

    #[derive(serde::Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(value) => Ok(value),
            Repr::Text(text) => text
                .trim()
                .parse::<f64>()
                .map_err(|_| de::Error::custom(format!("expected a number or inf/-inf/nan, got {text:?}"))),
        }
    }

    struct FloatRepr(f64);

    impl Serialize for FloatRepr {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serialize(&self.0, serializer)
        }
    }

    pub mod option {
        use serde::Serializer;

        pub fn serialize<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
            match value {
                Some(value) => serializer.serialize_some(&super::FloatRepr(*value)),
                None => serializer.serialize_none(),
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Wer,
    Mer,
    Wil,
    Wip,
    Cer,
}

impl MetricKind {
    pub const ALL: [MetricKind; 5] = [Self::Wer, Self::Mer, Self::Wil, Self::Wip, Self::Cer];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Wer => "wer",
            Self::Mer => "mer",
            Self::Wil => "wil",
            Self::Wip => "wip",
            Self::Cer => "cer",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricResult {
    pub kind: MetricKind,
    #[serde(serialize_with = "float_repr::serialize")]
    pub value: f64,
}

/// Word-level metrics derived from one set of counts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measures {
    #[serde(with = "float_repr")]
    pub wer: f64,
    #[serde(with = "float_repr")]
    pub mer: f64,
    pub wil: f64,
    pub wip: f64,
}

impl Measures {
    pub fn from_counts(counts: &EditCounts, policy: ZeroLengthPolicy) -> Result<Self, MetricsError> {
        Ok(Self {
            wer: wer(counts, policy)?,
            mer: mer(counts, policy)?,
            wil: wil(counts),
            wip: wip(counts),
        })
    }

    pub fn results(&self) -> [MetricResult; 4] {
        [
            MetricResult {
                kind: MetricKind::Wer,
                value: self.wer,
            },
            MetricResult {
                kind: MetricKind::Mer,
                value: self.mer,
            },
            MetricResult {
                kind: MetricKind::Wil,
                value: self.wil,
            },
            MetricResult {
                kind: MetricKind::Wip,
                value: self.wip,
            },
        ]
    }
}

/// `(S + D + I) / (H + S + D)`. Not capped at 1.
pub fn wer(counts: &EditCounts, policy: ZeroLengthPolicy) -> Result<f64, MetricsError> {
    error_rate("wer", counts, counts.reference_len(), policy)
}

/// Identical to [`wer`]; expects counts over character tokens.
pub fn cer(counts: &EditCounts, policy: ZeroLengthPolicy) -> Result<f64, MetricsError> {
    error_rate("cer", counts, counts.reference_len(), policy)
}

/// `(S + D + I) / (H + S + D + I)`, always in `[0, 1]`.
pub fn mer(counts: &EditCounts, policy: ZeroLengthPolicy) -> Result<f64, MetricsError> {
    error_rate("mer", counts, counts.hits + counts.errors(), policy)
}

/// `(H / len(ref)) * (H / len(hyp))`, or 0 when either side is empty.
pub fn wip(counts: &EditCounts) -> f64 {
    let ref_len = counts.reference_len();
    let hyp_len = counts.hypothesis_len();
    if ref_len == 0 || hyp_len == 0 {
        return 0.0;
    }
    let hits = counts.hits as f64;
    (hits / ref_len as f64) * (hits / hyp_len as f64)
}

pub fn wil(counts: &EditCounts) -> f64 {
    1.0 - wip(counts)
}

pub fn compute_metric(
    kind: MetricKind,
    counts: &EditCounts,
    policy: ZeroLengthPolicy,
) -> Result<MetricResult, MetricsError> {
    let value = match kind {
        MetricKind::Wer => wer(counts, policy)?,
        MetricKind::Mer => mer(counts, policy)?,
        MetricKind::Wil => wil(counts),
        MetricKind::Wip => wip(counts),
        MetricKind::Cer => cer(counts, policy)?,
    };
    Ok(MetricResult { kind, value })
}

fn error_rate(
    metric: &'static str,
    counts: &EditCounts,
    denominator: usize,
    policy: ZeroLengthPolicy,
) -> Result<f64, MetricsError> {
    let errors = counts.errors();
    if counts.reference_len() == 0 {
        match policy {
            ZeroLengthPolicy::Strict => {
                return Err(MetricsError::domain(
                    metric,
                    format!(
                        "reference is empty ({} hypothesis tokens); select a lenient or sentinel zero-length policy",
                        counts.hypothesis_len()
                    ),
                ));
            }
            ZeroLengthPolicy::Sentinel(value) => {
                tracing::warn!(metric, value, "empty reference, returning sentinel");
                return Ok(if errors == 0 { 0.0 } else { value });
            }
            ZeroLengthPolicy::Lenient => {
                tracing::warn!(metric, "empty reference, clamping denominator");
            }
        }
    }
    Ok(errors as f64 / denominator.max(1) as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    fn counts(hits: usize, substitutions: usize, deletions: usize, insertions: usize) -> EditCounts {
        EditCounts {
            hits,
            substitutions,
            deletions,
            insertions,
        }
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < EPS,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn single_deletion_scenario() {
        let c = counts(3, 0, 1, 0);
        assert_close(wer(&c, ZeroLengthPolicy::Strict).unwrap(), 0.25);
        assert_close(mer(&c, ZeroLengthPolicy::Strict).unwrap(), 0.25);
        assert_close(wip(&c), 0.75 * 1.0);
        assert_close(wil(&c), 0.25);
    }

    #[test]
    fn identical_input_is_perfect() {
        let m = Measures::from_counts(&counts(5, 0, 0, 0), ZeroLengthPolicy::Strict).unwrap();
        assert_eq!(
            m,
            Measures {
                wer: 0.0,
                mer: 0.0,
                wil: 0.0,
                wip: 1.0,
            }
        );
    }

    #[test]
    fn known_values_from_mer_wil_paper() {
        // (counts, wer, mer, wil)
        let cases = [
            (counts(1, 0, 0, 3), 3.0, 0.75, 0.75),
            (counts(1, 1, 1, 0), 2.0 / 3.0, 2.0 / 3.0, 5.0 / 6.0),
            (counts(0, 1, 0, 0), 1.0, 1.0, 1.0),
            (counts(0, 1, 0, 1), 2.0, 1.0, 1.0),
        ];
        for (c, expected_wer, expected_mer, expected_wil) in cases {
            let m = Measures::from_counts(&c, ZeroLengthPolicy::Strict).unwrap();
            assert_close(m.wer, expected_wer);
            assert_close(m.mer, expected_mer);
            assert_close(m.wil, expected_wil);
            assert_close(m.wip, 1.0 - expected_wil);
        }
    }

    #[test]
    fn wer_is_not_capped() {
        let c = counts(0, 1, 0, 9);
        assert_close(wer(&c, ZeroLengthPolicy::Strict).unwrap(), 10.0);
        assert!(mer(&c, ZeroLengthPolicy::Strict).unwrap() <= 1.0);
    }

    #[test]
    fn empty_reference_strict_is_domain_error() {
        let c = counts(0, 0, 0, 1);
        for kind in [MetricKind::Wer, MetricKind::Mer, MetricKind::Cer] {
            let err = compute_metric(kind, &c, ZeroLengthPolicy::Strict).unwrap_err();
            assert!(matches!(err, MetricsError::Domain { metric, .. } if metric == kind.as_str()));
        }
        // Information metrics stay defined.
        assert_close(compute_metric(MetricKind::Wip, &c, ZeroLengthPolicy::Strict).unwrap().value, 0.0);
        assert_close(compute_metric(MetricKind::Wil, &c, ZeroLengthPolicy::Strict).unwrap().value, 1.0);
    }

    #[test]
    fn empty_reference_lenient_clamps_denominator() {
        let c = counts(0, 0, 0, 1);
        assert_close(wer(&c, ZeroLengthPolicy::Lenient).unwrap(), 1.0);
        assert_close(mer(&c, ZeroLengthPolicy::Lenient).unwrap(), 1.0);
        let empty = EditCounts::default();
        assert_close(wer(&empty, ZeroLengthPolicy::Lenient).unwrap(), 0.0);
        assert_close(mer(&empty, ZeroLengthPolicy::Lenient).unwrap(), 0.0);
    }

    #[test]
    fn empty_reference_sentinel_returns_value() {
        let c = counts(0, 0, 0, 1);
        let policy = ZeroLengthPolicy::Sentinel(f64::INFINITY);
        assert_eq!(wer(&c, policy).unwrap(), f64::INFINITY);
        assert_eq!(cer(&c, policy).unwrap(), f64::INFINITY);
        assert_eq!(wer(&EditCounts::default(), policy).unwrap(), 0.0);
    }

    #[test]
    fn both_empty_information_metrics() {
        let empty = EditCounts::default();
        assert_close(wip(&empty), 0.0);
        assert_close(wil(&empty), 1.0);
    }

    #[test]
    fn policy_deserializes_from_json() {
        let strict: ZeroLengthPolicy = serde_json::from_str(r#"{"mode": "strict"}"#).unwrap();
        assert_eq!(strict, ZeroLengthPolicy::Strict);
        let sentinel: ZeroLengthPolicy =
            serde_json::from_str(r#"{"mode": "sentinel", "value": 1e9}"#).unwrap();
        assert_eq!(sentinel, ZeroLengthPolicy::Sentinel(1e9));
    }

    #[test]
    fn infinite_sentinel_round_trips_through_json() {
        let policy = ZeroLengthPolicy::Sentinel(f64::INFINITY);
        let json = serde_json::to_string(&policy).unwrap();
        assert_eq!(json, r#"{"mode":"sentinel","value":"inf"}"#);
        let back: ZeroLengthPolicy = serde_json::from_str(&json).unwrap();
        assert_eq!(back, policy);

        let finite = serde_json::to_string(&ZeroLengthPolicy::Sentinel(2.5)).unwrap();
        assert_eq!(finite, r#"{"mode":"sentinel","value":2.5}"#);

        let negative: ZeroLengthPolicy =
            serde_json::from_str(r#"{"mode": "sentinel", "value": "-inf"}"#).unwrap();
        assert_eq!(negative, ZeroLengthPolicy::Sentinel(f64::NEG_INFINITY));
        assert!(serde_json::from_str::<ZeroLengthPolicy>(r#"{"mode": "sentinel", "value": "lots"}"#).is_err());
    }

    #[test]
    fn infinite_measures_serialize_as_strings() {
        let measures = Measures {
            wer: f64::INFINITY,
            mer: f64::INFINITY,
            wil: 1.0,
            wip: 0.0,
        };
        let value = serde_json::to_value(measures).unwrap();
        assert_eq!(value["wer"], "inf");
        assert_eq!(value["wip"], 0.0);
        let back: Measures = serde_json::from_value(value).unwrap();
        assert_eq!(back, measures);

        let result = serde_json::to_value(MetricResult {
            kind: MetricKind::Wer,
            value: f64::INFINITY,
        })
        .unwrap();
        assert_eq!(result["value"], "inf");
    }
}
