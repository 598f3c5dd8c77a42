use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("invalid configuration: {message}")]
    Configuration { message: String },
    #[error("reference and hypothesis counts differ: {references} references vs {hypotheses} hypotheses")]
    Arity {
        references: usize,
        hypotheses: usize,
    },
    #[error("{metric} is undefined: {message}")]
    Domain {
        metric: &'static str,
        message: String,
    },
    #[error("I/O error while {context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON parse error while {context}: {source}")]
    Json {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl MetricsError {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub(crate) fn arity(references: usize, hypotheses: usize) -> Self {
        Self::Arity {
            references,
            hypotheses,
        }
    }

    pub(crate) fn domain(metric: &'static str, message: impl Into<String>) -> Self {
        Self::Domain {
            metric,
            message: message.into(),
        }
    }

    pub(crate) fn io(context: &'static str, source: std::io::Error) -> Self {
        Self::Io { context, source }
    }

    pub(crate) fn json(context: &'static str, source: serde_json::Error) -> Self {
        Self::Json { context, source }
    }
}
