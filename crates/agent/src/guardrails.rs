use crate::replies;

pub const END_PHRASES: [&str; 9] = [
    "thank you",
    "thanks",
    "got it",
    "okay",
    "that's all",
    "no more",
    "appreciate it",
    "done",
    "resolved",
];

/// Why a conversation is being handed to a human.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EscalationReason {
    NegativeSentiment,
    Unclassified,
    AttemptsExhausted,
    TechnicalSentiment,
    AnswerUnavailable,
    NoKnowledgeBaseMatch,
    ComplexSalesInquiry,
}

impl EscalationReason {
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::NegativeSentiment => "negative_sentiment",
            Self::Unclassified => "unclassified_request",
            Self::AttemptsExhausted => "technical_attempts_exhausted",
            Self::TechnicalSentiment => "technical_negative_sentiment",
            Self::AnswerUnavailable => "technical_answer_unavailable",
            Self::NoKnowledgeBaseMatch => "knowledge_base_miss",
            Self::ComplexSalesInquiry => "complex_sales_inquiry",
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NegativeSentiment => replies::SENTIMENT_ESCALATION,
            Self::Unclassified => replies::UNCLASSIFIED,
            Self::AttemptsExhausted | Self::TechnicalSentiment | Self::AnswerUnavailable => {
                replies::TECHNICAL_ESCALATION
            }
            Self::NoKnowledgeBaseMatch => replies::TECHNICAL_NO_SOLUTION,
            Self::ComplexSalesInquiry => replies::SALES_COMPLEX,
        }
    }

    /// Queue the escalation is routed to.
    pub fn handoff_team(&self) -> &'static str {
        match self {
            Self::NegativeSentiment | Self::Unclassified => "support",
            Self::AttemptsExhausted
            | Self::TechnicalSentiment
            | Self::AnswerUnavailable
            | Self::NoKnowledgeBaseMatch => "technical",
            Self::ComplexSalesInquiry => "sales",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardrailDecision {
    Continue,
    EndSession { user_message: &'static str },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuardrailPolicy {
    end_phrases: Vec<String>,
}

impl Default for GuardrailPolicy {
    fn default() -> Self {
        Self::with_end_phrases(END_PHRASES)
    }
}

impl GuardrailPolicy {
    pub fn with_end_phrases<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { end_phrases: phrases.into_iter().map(|phrase| phrase.into().to_lowercase()).collect() }
    }

    pub fn should_end_session(&self, message: &str) -> bool {
        let normalized = message.to_lowercase();
        self.end_phrases.iter().any(|phrase| normalized.contains(phrase.as_str()))
    }

    pub fn evaluate(&self, message: &str) -> GuardrailDecision {
        if self.should_end_session(message) {
            GuardrailDecision::EndSession { user_message: replies::CLOSING }
        } else {
            GuardrailDecision::Continue
        }
    }
}
