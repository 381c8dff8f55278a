//! Deterministic parsing of LLM replies and customer confirmations.

use helpdesk_core::domain::sales::{SalesField, SalesFields};
use helpdesk_core::flows::FlowType;
use serde_json::Value;

/// Labels checked in this order; the first one found in the reply wins. Matching is
/// case-sensitive, so "technical" alone does not classify.
const CLASSIFICATION_LABELS: [(&str, FlowType); 3] = [
    ("Technical", FlowType::Technical),
    ("Feature", FlowType::Feature),
    ("Sales", FlowType::Sales),
];

pub fn parse_classification(reply: &str) -> Option<FlowType> {
    CLASSIFICATION_LABELS
        .iter()
        .find(|(label, _)| reply.contains(label))
        .map(|(_, flow)| *flow)
}

/// YES/NO judgments count as YES whenever the uppercased reply contains `YES`.
pub fn is_affirmative_verdict(reply: &str) -> bool {
    reply.trim().to_uppercase().contains("YES")
}

pub fn customer_confirmed(message: &str) -> bool {
    message.to_lowercase().contains("yes")
}

/// Substring match, so "not", "know" and "nothing" also count as a decline.
pub fn customer_declined(message: &str) -> bool {
    message.to_lowercase().contains("no")
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExtractionOutcome {
    Parsed(SalesFields),
    /// The reply was not JSON; fields come from the message heuristic.
    Heuristic(SalesFields),
    /// The reply was JSON but not an object.
    Unusable,
}

impl ExtractionOutcome {
    pub fn into_fields(self) -> SalesFields {
        match self {
            Self::Parsed(fields) | Self::Heuristic(fields) => fields,
            Self::Unusable => SalesFields::default(),
        }
    }
}

pub fn parse_extraction(reply: &str, message: &str) -> ExtractionOutcome {
    let value = match serde_json::from_str::<Value>(reply) {
        Ok(value) => value,
        Err(_) => return ExtractionOutcome::Heuristic(heuristic_fields(message)),
    };

    let Some(object) = value.as_object() else {
        return ExtractionOutcome::Unusable;
    };

    let mut fields = SalesFields::default();
    for field in SalesField::ORDER {
        let text = match object.get(field.key()) {
            Some(Value::String(text)) => text.trim().to_string(),
            Some(Value::Number(number)) => number.to_string(),
            _ => String::new(),
        };
        fields.set_if_empty(field, &text);
    }
    ExtractionOutcome::Parsed(fields)
}

/// A lone alphabetic word is taken as a name; the whole message always becomes the query.
pub fn heuristic_fields(message: &str) -> SalesFields {
    let trimmed = message.trim();
    let looks_like_name = !trimmed.is_empty() && trimmed.chars().all(char::is_alphabetic);

    SalesFields {
        name: if looks_like_name { message.to_string() } else { String::new() },
        sales_query: message.to_string(),
        ..SalesFields::default()
    }
}

#[cfg(test)]
mod tests {
    use helpdesk_core::flows::FlowType;

    use super::{
        customer_confirmed, customer_declined, heuristic_fields, is_affirmative_verdict,
        parse_classification, parse_extraction, ExtractionOutcome,
    };

    #[test]
    fn classification_prefers_technical_then_feature_then_sales() {
        assert_eq!(parse_classification("Technical"), Some(FlowType::Technical));
        assert_eq!(parse_classification("Feature request"), Some(FlowType::Feature));
        assert_eq!(parse_classification("Classification: Sales."), Some(FlowType::Sales));
        assert_eq!(parse_classification("Sales or Feature"), Some(FlowType::Feature));
        assert_eq!(parse_classification("Technical / Sales"), Some(FlowType::Technical));
        assert_eq!(parse_classification("Unknown"), None);
        assert_eq!(parse_classification(""), None);
    }

    #[test]
    fn classification_labels_are_case_sensitive() {
        assert_eq!(parse_classification("technical"), None);
        assert_eq!(parse_classification("SALES"), None);
        assert_eq!(parse_classification("feature, maybe Sales"), Some(FlowType::Sales));
    }

    #[test]
    fn verdicts_look_for_yes_anywhere() {
        assert!(is_affirmative_verdict("YES"));
        assert!(is_affirmative_verdict(" yes."));
        assert!(!is_affirmative_verdict("NO"));
        assert!(!is_affirmative_verdict(""));
    }

    #[test]
    fn confirmations_use_substring_matching() {
        assert!(customer_confirmed("Yes, that fixed it"));
        assert!(customer_declined("No luck"));
        assert!(customer_declined("I don't know"));
        assert!(!customer_declined("still broken"));
    }

    #[test]
    fn extraction_reads_json_object_and_trims_values() {
        let outcome = parse_extraction(
            r#"{"name": " John ", "company": "Acme Inc", "team_size": 10, "sales_query": "need sales info"}"#,
            "ignored",
        );
        let ExtractionOutcome::Parsed(fields) = outcome else {
            panic!("expected parsed fields");
        };
        assert_eq!(fields.name, "John");
        assert_eq!(fields.company, "Acme Inc");
        assert_eq!(fields.team_size, "10");
        assert_eq!(fields.sales_query, "need sales info");
    }

    #[test]
    fn extraction_missing_keys_default_to_empty() {
        let fields = parse_extraction(r#"{"company": "Google"}"#, "My company is Google").into_fields();
        assert_eq!(fields.company, "Google");
        assert!(fields.name.is_empty());
        assert!(fields.sales_query.is_empty());
    }

    #[test]
    fn non_json_reply_falls_back_to_heuristic() {
        let outcome = parse_extraction("Sure! Here are the fields", "Anmol");
        assert_eq!(
            outcome,
            ExtractionOutcome::Heuristic(heuristic_fields("Anmol"))
        );
        let fields = outcome.into_fields();
        assert_eq!(fields.name, "Anmol");
        assert_eq!(fields.sales_query, "Anmol");
    }

    #[test]
    fn heuristic_rejects_names_with_spaces_or_digits() {
        let fields = heuristic_fields("John Smith");
        assert!(fields.name.is_empty());
        assert_eq!(fields.sales_query, "John Smith");
        assert!(heuristic_fields("team of 10").name.is_empty());
    }

    #[test]
    fn json_array_is_unusable() {
        assert_eq!(parse_extraction("[1, 2]", "hi"), ExtractionOutcome::Unusable);
        assert!(ExtractionOutcome::Unusable.into_fields().first_missing().is_some());
    }
}
