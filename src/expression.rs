//! Expression vocabularies.
//!
//! Label files store an index into a fixed vocabulary; a subset of that
//! vocabulary is accepted into the prepared dataset. Both are plain values
//! so stages can be driven with any vocabulary.

use std::collections::BTreeSet;

/// CK+ expression names in label-index order.
pub const CK_PLUS_EXPRESSIONS: [&str; 8] = [
    "Neutral",
    "Anger",
    "Contempt",
    "Disgust",
    "Fear",
    "Happiness",
    "Sadness",
    "Surprise",
];

/// CK+ expressions kept in the prepared dataset (Neutral and Contempt are excluded).
pub const CK_PLUS_ACCEPTED: [&str; 6] = [
    "Anger",
    "Disgust",
    "Fear",
    "Happiness",
    "Sadness",
    "Surprise",
];

/// Ordered list of expression names addressed by label index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    names: Vec<String>,
}

impl Vocabulary {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn ck_plus() -> Self {
        Self::new(CK_PLUS_EXPRESSIONS)
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// Resolves a label file body: a float, truncated toward zero to an index.
    pub fn name_for_code(&self, raw: &str) -> Option<&str> {
        let value: f64 = raw.trim().parse().ok()?;
        let index = value.trunc();
        // NaN fails this comparison as well
        if !(index >= 0.0) {
            return None;
        }
        self.name(index as usize)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::ck_plus()
    }
}

/// Expressions a sample may carry to survive filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedExpressions {
    names: BTreeSet<String>,
}

impl AcceptedExpressions {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn ck_plus() -> Self {
        Self::new(CK_PLUS_ACCEPTED)
    }

    pub fn contains(&self, expression: &str) -> bool {
        self.names.contains(expression)
    }
}

impl Default for AcceptedExpressions {
    fn default() -> Self {
        Self::ck_plus()
    }
}
