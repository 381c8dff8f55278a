use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowType {
    Technical,
    Sales,
    Feature,
}

impl FlowType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Technical => "technical",
            Self::Sales => "sales",
            Self::Feature => "feature",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowState {
    New,
    AwaitingFeedback,
    Collecting,
    Resolved,
    Escalated,
    Complete,
    Logged,
    Closed,
}

impl FlowState {
    /// Terminal states never carry a progress record past the current turn.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved | Self::Escalated | Self::Complete | Self::Closed)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowEvent {
    SolutionProposed,
    CustomerConfirmed,
    AttemptsExhausted,
    SentimentEscalated,
    KnowledgeBaseMiss,
    AnswerUnavailable,
    ComplexInquiry,
    FieldsPending,
    FieldsCollected,
    RequestLogged,
    DetailsAppended,
    ConversationEnded,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FlowContext {
    pub missing_required_fields: Vec<String>,
    pub attempts: u32,
}

impl FlowContext {
    pub fn with_attempts(attempts: u32) -> Self {
        Self { attempts, ..Self::default() }
    }

    pub fn with_missing_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { missing_required_fields: fields.into_iter().map(Into::into).collect(), attempts: 0 }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub flow: FlowType,
    pub from: FlowState,
    pub to: FlowState,
    pub event: FlowEvent,
}
