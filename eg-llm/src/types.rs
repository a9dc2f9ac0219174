use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedbackKind {
    Praise,
    Suggestion,
}

/// One praise/suggestion annotation referencing a fragment of the user's answer.
///
/// Field names on the wire (`type`, `original`, `comment`) follow the JSON
/// schema the evaluation prompt asks the model to produce, and are also what
/// the web client renders, so they stay as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackItem {
    #[serde(rename = "type")]
    pub kind: FeedbackKind,
    #[serde(rename = "original")]
    pub excerpt: String,
    pub comment: String,
}

/// Structured quality assessment of one user translation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub score: u8,
    pub corrected_sentence: String,
    #[serde(rename = "feedback_summary")]
    pub summary: String,
    #[serde(rename = "detailed_feedback", default)]
    pub items: Vec<FeedbackItem>,
}

impl Feedback {
    /// Shape checks serde cannot express: score range and the mandatory
    /// corrected sentence.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.score > 100 {
            return Err(crate::error::LlmError::Parse(format!(
                "score {} out of range 0..=100",
                self.score
            )));
        }
        if self.corrected_sentence.trim().is_empty() {
            return Err(crate::error::LlmError::Parse(
                "corrected_sentence is empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feedback_item_uses_wire_field_names() {
        let item = FeedbackItem {
            kind: FeedbackKind::Suggestion,
            excerpt: "he go".to_string(),
            comment: "use 'goes' with 'he'".to_string(),
        };
        let json = serde_json::to_value(&item).expect("serialize");
        assert_eq!(json["type"], "Suggestion");
        assert_eq!(json["original"], "he go");
        assert_eq!(json["comment"], "use 'goes' with 'he'");
    }

    #[test]
    fn validate_rejects_out_of_range_score() {
        let feedback = Feedback {
            score: 101,
            corrected_sentence: "ok".to_string(),
            summary: "ok".to_string(),
            items: vec![],
        };
        assert!(feedback.validate().is_err());
    }

    #[test]
    fn validate_rejects_blank_corrected_sentence() {
        let feedback = Feedback {
            score: 80,
            corrected_sentence: "   ".to_string(),
            summary: "ok".to_string(),
            items: vec![],
        };
        assert!(feedback.validate().is_err());
    }
}
