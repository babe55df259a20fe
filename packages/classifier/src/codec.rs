//! Bidirectional mapping between case type labels and dense class codes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A label or code outside the fitted vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The label was never seen at fit time.
    #[error("Unknown label '{label}'")]
    UnknownLabel {
        /// The unseen label.
        label: String,
    },

    /// The code is out of range for the fitted classes.
    #[error("Unknown class code {code} (codec has {n_classes} classes)")]
    UnknownCode {
        /// The out-of-range code.
        code: usize,
        /// Number of fitted classes.
        n_classes: usize,
    },
}

/// Label encoder with classes in sorted order.
///
/// The code of a label is its index in [`LabelCodec::classes`], so codes are
/// stable for a given vocabulary regardless of the order labels were seen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelCodec {
    classes: Vec<String>,
}

impl LabelCodec {
    /// Fits the codec to the distinct values of `labels`.
    #[must_use]
    pub fn fit<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut classes: Vec<String> = labels
            .into_iter()
            .map(|l| l.as_ref().to_string())
            .collect();
        classes.sort();
        classes.dedup();
        Self { classes }
    }

    /// Returns the code for `label`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::UnknownLabel`] if `label` was not fitted.
    pub fn encode(&self, label: &str) -> Result<usize, CodecError> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(label))
            .map_err(|_| CodecError::UnknownLabel {
                label: label.to_string(),
            })
    }

    /// Encodes every label, failing on the first unknown one.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::UnknownLabel`] for the first unseen label.
    pub fn encode_all<'a>(
        &self,
        labels: impl IntoIterator<Item = &'a str>,
    ) -> Result<Vec<usize>, CodecError> {
        labels.into_iter().map(|l| self.encode(l)).collect()
    }

    /// Returns the label for `code`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::UnknownCode`] if `code` is out of range.
    pub fn decode(&self, code: usize) -> Result<&str, CodecError> {
        self.classes
            .get(code)
            .map(String::as_str)
            .ok_or(CodecError::UnknownCode {
                code,
                n_classes: self.classes.len(),
            })
    }

    /// The fitted classes, in code order.
    #[must_use]
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Number of fitted classes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.classes.len()
    }

    /// Whether no class was fitted.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classes_are_sorted_and_unique() {
        let codec = LabelCodec::fit(["Tráfico", "Furto", "Assalto", "Furto"]);
        assert_eq!(codec.classes(), ["Assalto", "Furto", "Tráfico"]);
        assert_eq!(codec.encode("Assalto").unwrap(), 0);
        assert_eq!(codec.encode("Tráfico").unwrap(), 2);
    }

    #[test]
    fn decode_inverts_encode() {
        let codec = LabelCodec::fit(["Furto", "Assalto", "Violência Doméstica", "Tráfico"]);
        for label in codec.classes() {
            let code = codec.encode(label).unwrap();
            assert_eq!(codec.decode(code).unwrap(), label);
        }
    }

    #[test]
    fn unseen_label_is_an_error() {
        let codec = LabelCodec::fit(["Furto"]);
        assert_eq!(
            codec.encode("Homicídio"),
            Err(CodecError::UnknownLabel {
                label: "Homicídio".to_string()
            })
        );
        assert!(codec.encode_all(["Furto", "Roubo"]).is_err());
        assert_eq!(codec.classes(), ["Furto"]);
    }

    #[test]
    fn out_of_range_code_is_an_error() {
        let codec = LabelCodec::fit(["Furto"]);
        assert_eq!(
            codec.decode(3),
            Err(CodecError::UnknownCode {
                code: 3,
                n_classes: 1
            })
        );
    }
}
