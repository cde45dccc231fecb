use crate::features::error::EncodingError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

/// A fitted mapping between condition labels and integer codes.
///
/// Codes follow the sorted label order, so fitting the same set of labels
/// always gives the same codes. Once fitted the mapping never changes; a model
/// trained against one encoder must be decoded with that same encoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Builds the vocabulary from every distinct label.
    ///
    /// # Arguments
    /// * `labels`: The labels to fit on; duplicates and order do not matter.
    ///
    /// # Returns
    /// The fitted encoder, or [`EncodingError::EmptyVocabulary`] when `labels` is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use hourcast::LabelEncoder;
    ///
    /// let encoder = LabelEncoder::fit(["Overcast", "Clear sky", "Overcast"])?;
    /// assert_eq!(encoder.classes(), ["Clear sky", "Overcast"]);
    /// assert_eq!(encoder.transform("Overcast")?, 1);
    /// assert!(encoder.transform("Fog").is_err());
    /// # Ok::<(), hourcast::EncodingError>(())
    /// ```
    pub fn fit<I, S>(labels: I) -> Result<Self, EncodingError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let classes: BTreeSet<String> = labels
            .into_iter()
            .map(|label| label.as_ref().to_string())
            .collect();
        if classes.is_empty() {
            return Err(EncodingError::EmptyVocabulary);
        }
        Ok(Self {
            classes: classes.into_iter().collect(),
        })
    }

    /// Code of `label`; [`EncodingError::UnseenLabel`] if it was not fitted on.
    pub fn transform(&self, label: &str) -> Result<i64, EncodingError> {
        self.classes
            .binary_search_by(|class| class.as_str().cmp(label))
            .map(|idx| idx as i64)
            .map_err(|_| EncodingError::UnseenLabel(label.to_string()))
    }

    pub fn inverse_transform(&self, code: i64) -> Result<&str, EncodingError> {
        usize::try_from(code)
            .ok()
            .and_then(|idx| self.classes.get(idx))
            .map(String::as_str)
            .ok_or(EncodingError::UnknownCode {
                code,
                classes: self.classes.len(),
            })
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Maps classifier output back to condition labels through the shared encoder.
#[derive(Debug, Clone)]
pub struct LabelDecoder {
    encoder: Arc<LabelEncoder>,
}

impl LabelDecoder {
    pub fn new(encoder: Arc<LabelEncoder>) -> Self {
        Self { encoder }
    }

    pub fn decode(&self, code: i64) -> Result<String, EncodingError> {
        self.encoder.inverse_transform(code).map(str::to_string)
    }

    pub fn decode_all(&self, codes: &[i64]) -> Result<Vec<String>, EncodingError> {
        codes.iter().map(|code| self.decode(*code)).collect()
    }

    pub fn encoder(&self) -> &Arc<LabelEncoder> {
        &self.encoder
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoder() -> LabelEncoder {
        LabelEncoder::fit(["Overcast", "Clear sky", "Slight rain", "Overcast"]).unwrap()
    }

    #[test]
    fn codes_follow_sorted_labels() {
        let encoder = encoder();
        assert_eq!(encoder.classes(), ["Clear sky", "Overcast", "Slight rain"]);
        assert_eq!(encoder.transform("Clear sky"), Ok(0));
        assert_eq!(encoder.transform("Slight rain"), Ok(2));
        assert_eq!(encoder.inverse_transform(1), Ok("Overcast"));
    }

    #[test]
    fn unseen_label_is_an_error() {
        assert_eq!(
            encoder().transform("Thunderstorm"),
            Err(EncodingError::UnseenLabel("Thunderstorm".to_string()))
        );
    }

    #[test]
    fn decoder_rejects_codes_outside_vocabulary() {
        let decoder = LabelDecoder::new(Arc::new(encoder()));
        assert_eq!(decoder.decode(2), Ok("Slight rain".to_string()));
        assert_eq!(
            decoder.decode(3),
            Err(EncodingError::UnknownCode { code: 3, classes: 3 })
        );
        assert!(decoder.decode(-1).is_err());
        assert_eq!(
            decoder.decode_all(&[0, 1]).unwrap(),
            vec!["Clear sky".to_string(), "Overcast".to_string()]
        );
    }

    #[test]
    fn empty_fit_is_rejected() {
        let labels: [&str; 0] = [];
        assert_eq!(LabelEncoder::fit(labels), Err(EncodingError::EmptyVocabulary));
    }
}
