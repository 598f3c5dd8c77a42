use std::collections::BTreeSet;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::MetricsError;
use crate::types::{Granularity, TokenSequence};

const PUNCTUATION_PATTERN: &str = r"\p{P}";
const KALDI_NON_WORD_PATTERN: &str = r"[<\[][^>\]]*[>\]]";
const ASCII_WHITESPACE: [char; 6] = [' ', '\t', '\n', '\r', '\x0b', '\x0c'];

/// Ordered rewrite table; specific words come before the general suffixes.
const CONTRACTIONS: [(&str, &str); 11] = [
    ("won't", "will not"),
    ("can't", "can not"),
    ("let's", "let us"),
    ("n't", " not"),
    ("'re", " are"),
    ("'s", " is"),
    ("'d", " would"),
    ("'ll", " will"),
    ("'t", " not"),
    ("'ve", " have"),
    ("'m", " am"),
];

fn default_delimiter() -> String {
    " ".to_string()
}

fn default_true() -> bool {
    true
}

/// One normalization step.
///
/// Text transforms run on raw sentences, exactly one segmentation transform
/// turns sentences into tokens, and token transforms run on the tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Transform {
    Lowercase,
    Uppercase,
    /// Removes Unicode punctuation (general category `P*`).
    StripPunctuation,
    ExpandCommonContractions,
    RemoveMultipleSpaces,
    StripLeadingTrailingSpace,
    RemoveWhitespace {
        #[serde(default)]
        replace_by_space: bool,
    },
    /// Removes markers such as `<unk>` or `[noise]`.
    RemoveKaldiNonWords,
    RemoveSpecificWords {
        words: Vec<String>,
    },
    /// Whole-word literal replacements, applied in order.
    SubstituteWords {
        substitutions: Vec<(String, String)>,
    },
    /// Regex replacements, applied in order.
    SubstituteRegexes {
        substitutions: Vec<(String, String)>,
    },
    RemoveEmptyStrings,
    ReduceToSingleSentence {
        #[serde(default = "default_delimiter")]
        delimiter: String,
    },
    /// Splits on whitespace, or on `delimiter` when given; empty pieces are dropped.
    SplitIntoWords {
        #[serde(default)]
        delimiter: Option<String>,
    },
    SplitIntoCharacters {
        #[serde(default = "default_true")]
        include_whitespace: bool,
    },
    /// Maps every token outside `vocabulary` to `sentinel`.
    ReduceToUniqueTokens {
        vocabulary: BTreeSet<String>,
        sentinel: String,
    },
    /// Drops every token outside `vocabulary`.
    ReduceToCommonVocabulary {
        vocabulary: BTreeSet<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Text,
    Segment,
    Token,
}

impl Transform {
    pub fn split_into_words() -> Self {
        Self::SplitIntoWords { delimiter: None }
    }

    pub fn split_into_characters() -> Self {
        Self::SplitIntoCharacters {
            include_whitespace: true,
        }
    }

    pub fn reduce_to_single_sentence() -> Self {
        Self::ReduceToSingleSentence {
            delimiter: default_delimiter(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Lowercase => "lowercase",
            Self::Uppercase => "uppercase",
            Self::StripPunctuation => "strip-punctuation",
            Self::ExpandCommonContractions => "expand-common-contractions",
            Self::RemoveMultipleSpaces => "remove-multiple-spaces",
            Self::StripLeadingTrailingSpace => "strip-leading-trailing-space",
            Self::RemoveWhitespace { .. } => "remove-whitespace",
            Self::RemoveKaldiNonWords => "remove-kaldi-non-words",
            Self::RemoveSpecificWords { .. } => "remove-specific-words",
            Self::SubstituteWords { .. } => "substitute-words",
            Self::SubstituteRegexes { .. } => "substitute-regexes",
            Self::RemoveEmptyStrings => "remove-empty-strings",
            Self::ReduceToSingleSentence { .. } => "reduce-to-single-sentence",
            Self::SplitIntoWords { .. } => "split-into-words",
            Self::SplitIntoCharacters { .. } => "split-into-characters",
            Self::ReduceToUniqueTokens { .. } => "reduce-to-unique-tokens",
            Self::ReduceToCommonVocabulary { .. } => "reduce-to-common-vocabulary",
        }
    }

    fn stage(&self) -> Stage {
        match self {
            Self::SplitIntoWords { .. } | Self::SplitIntoCharacters { .. } => Stage::Segment,
            Self::ReduceToUniqueTokens { .. } | Self::ReduceToCommonVocabulary { .. } => {
                Stage::Token
            }
            _ => Stage::Text,
        }
    }
}

#[derive(Debug, Clone)]
enum TextStep {
    Lowercase,
    Uppercase,
    Replace(Vec<(Regex, String)>),
    ExpandContractions,
    CollapseWhitespace,
    Strip,
    RemoveWhitespace { replace_by_space: bool },
    RemoveEmptyStrings,
    JoinSentences { delimiter: String },
}

#[derive(Debug, Clone)]
enum Segmenter {
    Words { delimiter: Option<String> },
    Characters { include_whitespace: bool },
}

#[derive(Debug, Clone)]
enum TokenStep {
    MapOutOfVocabulary {
        vocabulary: BTreeSet<String>,
        sentinel: String,
    },
    KeepVocabulary {
        vocabulary: BTreeSet<String>,
    },
}

/// Validated, compiled transform chain.
///
/// Construction checks the stage order and compiles every regex, so a
/// `Pipeline` value never fails while transforming text. Tokenizing still
/// requires a segmentation transform.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "Vec<Transform>", into = "Vec<Transform>")]
pub struct Pipeline {
    transforms: Vec<Transform>,
    text_steps: Vec<TextStep>,
    segmenter: Option<Segmenter>,
    token_steps: Vec<TokenStep>,
}

impl Pipeline {
    pub fn new(transforms: Vec<Transform>) -> Result<Self, MetricsError> {
        let mut text_steps = Vec::new();
        let mut segmenter = None;
        let mut token_steps = Vec::new();

        for (idx, transform) in transforms.iter().enumerate() {
            match (transform.stage(), segmenter.is_some()) {
                (Stage::Text, true) => {
                    return Err(MetricsError::configuration(format!(
                        "text transform '{}' at position {idx} follows the segmentation transform",
                        transform.name()
                    )));
                }
                (Stage::Segment, true) => {
                    return Err(MetricsError::configuration(format!(
                        "second segmentation transform '{}' at position {idx}",
                        transform.name()
                    )));
                }
                (Stage::Token, false) => {
                    return Err(MetricsError::configuration(format!(
                        "token transform '{}' at position {idx} must follow a segmentation transform",
                        transform.name()
                    )));
                }
                _ => {}
            }

            match transform {
                Transform::SplitIntoWords { delimiter } => {
                    if delimiter.as_deref() == Some("") {
                        return Err(MetricsError::configuration(
                            "split-into-words delimiter must not be empty",
                        ));
                    }
                    segmenter = Some(Segmenter::Words {
                        delimiter: delimiter.clone(),
                    });
                }
                Transform::SplitIntoCharacters { include_whitespace } => {
                    segmenter = Some(Segmenter::Characters {
                        include_whitespace: *include_whitespace,
                    });
                }
                Transform::ReduceToUniqueTokens {
                    vocabulary,
                    sentinel,
                } => token_steps.push(TokenStep::MapOutOfVocabulary {
                    vocabulary: vocabulary.clone(),
                    sentinel: sentinel.clone(),
                }),
                Transform::ReduceToCommonVocabulary { vocabulary } => {
                    token_steps.push(TokenStep::KeepVocabulary {
                        vocabulary: vocabulary.clone(),
                    })
                }
                text => text_steps.push(compile_text_step(text)?),
            }
        }

        tracing::debug!(
            transforms = transforms.len(),
            segmenting = segmenter.is_some(),
            "normalization pipeline compiled"
        );

        Ok(Self {
            transforms,
            text_steps,
            segmenter,
            token_steps,
        })
    }

    pub fn identity() -> Self {
        Self {
            transforms: Vec::new(),
            text_steps: Vec::new(),
            segmenter: None,
            token_steps: Vec::new(),
        }
    }

    /// `remove-multiple-spaces`, `strip-leading-trailing-space`, `split-into-words`.
    pub fn word_default() -> Self {
        Self {
            transforms: vec![
                Transform::RemoveMultipleSpaces,
                Transform::StripLeadingTrailingSpace,
                Transform::split_into_words(),
            ],
            text_steps: vec![TextStep::CollapseWhitespace, TextStep::Strip],
            segmenter: Some(Segmenter::Words { delimiter: None }),
            token_steps: Vec::new(),
        }
    }

    /// `strip-leading-trailing-space`, `split-into-characters`.
    pub fn character_default() -> Self {
        Self {
            transforms: vec![
                Transform::StripLeadingTrailingSpace,
                Transform::split_into_characters(),
            ],
            text_steps: vec![TextStep::Strip],
            segmenter: Some(Segmenter::Characters {
                include_whitespace: true,
            }),
            token_steps: Vec::new(),
        }
    }

    /// Case-folded, punctuation-free word pipeline with contractions expanded.
    pub fn word_normalized() -> Result<Self, MetricsError> {
        Self::new(vec![
            Transform::Lowercase,
            Transform::ExpandCommonContractions,
            Transform::StripPunctuation,
            Transform::RemoveMultipleSpaces,
            Transform::StripLeadingTrailingSpace,
            Transform::split_into_words(),
        ])
    }

    pub fn for_granularity(granularity: Granularity) -> Self {
        match granularity {
            Granularity::Word => Self::word_default(),
            Granularity::Character => Self::character_default(),
        }
    }

    pub fn transforms(&self) -> &[Transform] {
        &self.transforms
    }

    pub fn is_segmenting(&self) -> bool {
        self.segmenter.is_some()
    }

    pub fn granularity(&self) -> Option<Granularity> {
        self.segmenter.as_ref().map(|segmenter| match segmenter {
            Segmenter::Words { .. } => Granularity::Word,
            Segmenter::Characters { .. } => Granularity::Character,
        })
    }

    /// Runs the text transforms only. The sentence count may shrink when the
    /// pipeline removes empty strings or joins sentences.
    pub fn normalize_text(&self, sentences: &[String]) -> Vec<String> {
        let mut current = sentences.to_vec();
        for step in &self.text_steps {
            current = apply_text_step(step, current);
        }
        current
    }

    /// Normalizes and segments every sentence into a token sequence.
    ///
    /// Non-empty input never yields zero sequences: when filtering or joining
    /// leaves no sentence, the result is a single empty sequence.
    pub fn tokenize(&self, sentences: &[String]) -> Result<Vec<TokenSequence>, MetricsError> {
        let segmenter = self.segmenter.as_ref().ok_or_else(|| {
            MetricsError::configuration(
                "pipeline has no segmentation transform (split-into-words or split-into-characters)",
            )
        })?;

        let normalized = self.normalize_text(sentences);
        if normalized.is_empty() && !sentences.is_empty() {
            return Ok(vec![TokenSequence::new()]);
        }
        Ok(normalized
            .iter()
            .map(|sentence| self.reduce_tokens(segment(segmenter, sentence)))
            .collect())
    }

    /// Tokenizes a single string; sentences produced by joining or dropped by
    /// filtering collapse into one (possibly empty) sequence.
    pub fn tokenize_str(&self, text: &str) -> Result<TokenSequence, MetricsError> {
        Ok(self
            .tokenize(&[text.to_string()])?
            .into_iter()
            .flatten()
            .collect())
    }

    /// Inverse of segmentation: joins tokens with the segmentation delimiter.
    pub fn detokenize(&self, tokens: &[String]) -> String {
        match &self.segmenter {
            Some(Segmenter::Characters { .. }) => tokens.concat(),
            Some(Segmenter::Words {
                delimiter: Some(delimiter),
            }) => tokens.join(delimiter),
            _ => tokens.join(" "),
        }
    }

    fn reduce_tokens(&self, mut tokens: TokenSequence) -> TokenSequence {
        for step in &self.token_steps {
            tokens = match step {
                TokenStep::MapOutOfVocabulary {
                    vocabulary,
                    sentinel,
                } => tokens
                    .into_iter()
                    .map(|token| {
                        if vocabulary.contains(&token) {
                            token
                        } else {
                            sentinel.clone()
                        }
                    })
                    .collect(),
                TokenStep::KeepVocabulary { vocabulary } => tokens
                    .into_iter()
                    .filter(|token| vocabulary.contains(token))
                    .collect(),
            };
        }
        tokens
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::word_default()
    }
}

impl TryFrom<Vec<Transform>> for Pipeline {
    type Error = MetricsError;

    fn try_from(transforms: Vec<Transform>) -> Result<Self, Self::Error> {
        Self::new(transforms)
    }
}

impl From<Pipeline> for Vec<Transform> {
    fn from(pipeline: Pipeline) -> Self {
        pipeline.transforms
    }
}

fn compile(pattern: &str) -> Result<Regex, MetricsError> {
    Regex::new(pattern)
        .map_err(|e| MetricsError::configuration(format!("invalid pattern '{pattern}': {e}")))
}

fn compile_text_step(transform: &Transform) -> Result<TextStep, MetricsError> {
    Ok(match transform {
        Transform::Lowercase => TextStep::Lowercase,
        Transform::Uppercase => TextStep::Uppercase,
        Transform::StripPunctuation => {
            TextStep::Replace(vec![(compile(PUNCTUATION_PATTERN)?, String::new())])
        }
        Transform::ExpandCommonContractions => TextStep::ExpandContractions,
        Transform::RemoveMultipleSpaces => TextStep::CollapseWhitespace,
        Transform::StripLeadingTrailingSpace => TextStep::Strip,
        Transform::RemoveWhitespace { replace_by_space } => TextStep::RemoveWhitespace {
            replace_by_space: *replace_by_space,
        },
        Transform::RemoveKaldiNonWords => {
            TextStep::Replace(vec![(compile(KALDI_NON_WORD_PATTERN)?, String::new())])
        }
        Transform::RemoveSpecificWords { words } => TextStep::Replace(
            words
                .iter()
                .map(|word| Ok((whole_word_regex(word)?, " ".to_string())))
                .collect::<Result<_, MetricsError>>()?,
        ),
        Transform::SubstituteWords { substitutions } => TextStep::Replace(
            substitutions
                .iter()
                .map(|(word, replacement)| Ok((whole_word_regex(word)?, replacement.clone())))
                .collect::<Result<_, MetricsError>>()?,
        ),
        Transform::SubstituteRegexes { substitutions } => TextStep::Replace(
            substitutions
                .iter()
                .map(|(pattern, replacement)| Ok((compile(pattern)?, replacement.clone())))
                .collect::<Result<_, MetricsError>>()?,
        ),
        Transform::RemoveEmptyStrings => TextStep::RemoveEmptyStrings,
        Transform::ReduceToSingleSentence { delimiter } => TextStep::JoinSentences {
            delimiter: delimiter.clone(),
        },
        other => {
            return Err(MetricsError::configuration(format!(
                "'{}' is not a text transform",
                other.name()
            )))
        }
    })
}

fn whole_word_regex(word: &str) -> Result<Regex, MetricsError> {
    compile(&format!(r"\b{}\b", regex::escape(word)))
}

fn apply_text_step(step: &TextStep, sentences: Vec<String>) -> Vec<String> {
    match step {
        TextStep::RemoveEmptyStrings => sentences
            .into_iter()
            .filter(|s| !s.trim().is_empty())
            .collect(),
        TextStep::JoinSentences { delimiter } => {
            let kept: Vec<String> = sentences.into_iter().filter(|s| !s.is_empty()).collect();
            if kept.is_empty() {
                Vec::new()
            } else {
                vec![kept.join(delimiter)]
            }
        }
        per_sentence => sentences
            .into_iter()
            .map(|s| apply_to_sentence(per_sentence, s))
            .collect(),
    }
}

fn apply_to_sentence(step: &TextStep, sentence: String) -> String {
    match step {
        TextStep::Lowercase => sentence.to_lowercase(),
        TextStep::Uppercase => sentence.to_uppercase(),
        TextStep::Replace(rules) => rules.iter().fold(sentence, |acc, (regex, replacement)| {
            regex.replace_all(&acc, replacement.as_str()).into_owned()
        }),
        TextStep::ExpandContractions => expand_contractions(&sentence),
        TextStep::CollapseWhitespace => collapse_whitespace_runs(&sentence),
        TextStep::Strip => sentence.trim().to_string(),
        TextStep::RemoveWhitespace { replace_by_space } => {
            let replacement = if *replace_by_space { " " } else { "" };
            sentence.replace(&ASCII_WHITESPACE[..], replacement)
        }
        TextStep::RemoveEmptyStrings | TextStep::JoinSentences { .. } => sentence,
    }
}

pub fn expand_contractions(text: &str) -> String {
    CONTRACTIONS
        .iter()
        .fold(text.to_string(), |acc, (contracted, expanded)| {
            acc.replace(contracted, expanded)
        })
}

/// Replaces every run of two or more whitespace characters with one space.
/// A lone whitespace character is kept as is.
fn collapse_whitespace_runs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending = String::new();
    for c in text.chars() {
        if c.is_whitespace() {
            pending.push(c);
            continue;
        }
        flush_whitespace(&mut out, &mut pending);
        out.push(c);
    }
    flush_whitespace(&mut out, &mut pending);
    out
}

fn flush_whitespace(out: &mut String, pending: &mut String) {
    if pending.chars().nth(1).is_some() {
        out.push(' ');
    } else {
        out.push_str(pending);
    }
    pending.clear();
}

fn segment(segmenter: &Segmenter, sentence: &str) -> TokenSequence {
    match segmenter {
        Segmenter::Words { delimiter: None } => {
            sentence.split_whitespace().map(str::to_string).collect()
        }
        Segmenter::Words {
            delimiter: Some(delimiter),
        } => sentence
            .split(delimiter.as_str())
            .filter(|w| !w.is_empty())
            .map(str::to_string)
            .collect(),
        Segmenter::Characters { include_whitespace } => sentence
            .chars()
            .filter(|c| *include_whitespace || !c.is_whitespace())
            .map(String::from)
            .collect(),
    }
}
