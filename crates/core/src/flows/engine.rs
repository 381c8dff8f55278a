use thiserror::Error;

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::flows::states::{FlowContext, FlowEvent, FlowState, FlowType, TransitionOutcome};

/// Failed follow-ups tolerated before a technical issue is handed to a human.
pub const MAX_TECHNICAL_ATTEMPTS: u32 = 2;

pub trait FlowDefinition {
    fn flow_type(&self) -> FlowType;
    fn transition(
        &self,
        current: FlowState,
        event: &FlowEvent,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError>;
}

#[derive(Clone, Debug, Default)]
pub struct TechnicalFlow;

#[derive(Clone, Debug, Default)]
pub struct SalesFlow;

#[derive(Clone, Debug, Default)]
pub struct FeatureFlow;

impl FlowDefinition for TechnicalFlow {
    fn flow_type(&self) -> FlowType {
        FlowType::Technical
    }

    fn transition(
        &self,
        current: FlowState,
        event: &FlowEvent,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        transition_technical(current, event, context)
    }
}

impl FlowDefinition for SalesFlow {
    fn flow_type(&self) -> FlowType {
        FlowType::Sales
    }

    fn transition(
        &self,
        current: FlowState,
        event: &FlowEvent,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        transition_sales(current, event, context)
    }
}

impl FlowDefinition for FeatureFlow {
    fn flow_type(&self) -> FlowType {
        FlowType::Feature
    }

    fn transition(
        &self,
        current: FlowState,
        event: &FlowEvent,
        _context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        transition_feature(current, event)
    }
}

pub struct FlowEngine<F> {
    flow: F,
}

impl<F> FlowEngine<F>
where
    F: FlowDefinition,
{
    pub fn new(flow: F) -> Self {
        Self { flow }
    }

    pub fn flow_type(&self) -> FlowType {
        self.flow.flow_type()
    }

    pub fn apply(
        &self,
        current: FlowState,
        event: &FlowEvent,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        self.flow.transition(current, event, context)
    }

    pub fn apply_with_audit<S>(
        &self,
        current: FlowState,
        event: &FlowEvent,
        context: &FlowContext,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<TransitionOutcome, FlowTransitionError>
    where
        S: AuditSink + ?Sized,
    {
        let result = self.apply(current, event, context);
        match &result {
            Ok(outcome) => {
                sink.emit(
                    AuditEvent::new(
                        audit,
                        "flow.transition_applied",
                        AuditCategory::Flow,
                        AuditOutcome::Success,
                    )
                    .with_metadata("flow", outcome.flow.as_str())
                    .with_metadata("from", format!("{:?}", outcome.from))
                    .with_metadata("to", format!("{:?}", outcome.to))
                    .with_metadata("event", format!("{:?}", outcome.event)),
                );
            }
            Err(error) => {
                sink.emit(
                    AuditEvent::new(
                        audit,
                        "flow.transition_rejected",
                        AuditCategory::Flow,
                        AuditOutcome::Rejected,
                    )
                    .with_metadata("flow", self.flow_type().as_str())
                    .with_metadata("error", error.to_string()),
                );
            }
        }
        result
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowTransitionError {
    #[error("missing required fields before transition from {state:?}: {missing_fields:?}")]
    MissingRequiredFields { state: FlowState, missing_fields: Vec<String> },
    #[error("technical escalation requires {required} attempts, only {attempts} recorded")]
    AttemptsRemaining { attempts: u32, required: u32 },
    #[error("invalid {flow:?} transition from {state:?} using event {event:?}")]
    InvalidTransition { flow: FlowType, state: FlowState, event: FlowEvent },
}

fn invalid(flow: FlowType, state: FlowState, event: &FlowEvent) -> FlowTransitionError {
    FlowTransitionError::InvalidTransition { flow, state, event: event.clone() }
}

fn outcome(flow: FlowType, from: FlowState, to: FlowState, event: &FlowEvent) -> TransitionOutcome {
    TransitionOutcome { flow, from, to, event: event.clone() }
}

fn transition_technical(
    current: FlowState,
    event: &FlowEvent,
    context: &FlowContext,
) -> Result<TransitionOutcome, FlowTransitionError> {
    use FlowEvent::{
        AnswerUnavailable, AttemptsExhausted, ConversationEnded, CustomerConfirmed,
        KnowledgeBaseMiss, SentimentEscalated, SolutionProposed,
    };
    use FlowState::{AwaitingFeedback, Closed, Escalated, New, Resolved};

    let flow = FlowType::Technical;
    let to = match (current, event) {
        (New | AwaitingFeedback, SolutionProposed) => AwaitingFeedback,
        (AwaitingFeedback, CustomerConfirmed) => Resolved,
        (New | AwaitingFeedback, AttemptsExhausted) => {
            if context.attempts < MAX_TECHNICAL_ATTEMPTS {
                return Err(FlowTransitionError::AttemptsRemaining {
                    attempts: context.attempts,
                    required: MAX_TECHNICAL_ATTEMPTS,
                });
            }
            Escalated
        }
        (New | AwaitingFeedback, SentimentEscalated | KnowledgeBaseMiss | AnswerUnavailable) => {
            Escalated
        }
        (state, ConversationEnded) if !state.is_terminal() => Closed,
        _ => return Err(invalid(flow, current, event)),
    };

    Ok(outcome(flow, current, to, event))
}

fn transition_sales(
    current: FlowState,
    event: &FlowEvent,
    context: &FlowContext,
) -> Result<TransitionOutcome, FlowTransitionError> {
    use FlowEvent::{ComplexInquiry, ConversationEnded, FieldsCollected, FieldsPending};
    use FlowState::{Closed, Collecting, Complete, Escalated, New};

    let flow = FlowType::Sales;
    let to = match (current, event) {
        (New, ComplexInquiry) => Escalated,
        (New | Collecting, FieldsPending) => {
            if context.missing_required_fields.is_empty() {
                return Err(invalid(flow, current, event));
            }
            Collecting
        }
        (New | Collecting, FieldsCollected) => {
            if !context.missing_required_fields.is_empty() {
                return Err(FlowTransitionError::MissingRequiredFields {
                    state: current,
                    missing_fields: context.missing_required_fields.clone(),
                });
            }
            Complete
        }
        (state, ConversationEnded) if !state.is_terminal() => Closed,
        _ => return Err(invalid(flow, current, event)),
    };

    Ok(outcome(flow, current, to, event))
}

fn transition_feature(
    current: FlowState,
    event: &FlowEvent,
) -> Result<TransitionOutcome, FlowTransitionError> {
    use FlowEvent::{ConversationEnded, DetailsAppended, RequestLogged};
    use FlowState::{Closed, Logged, New};

    let flow = FlowType::Feature;
    let to = match (current, event) {
        (New, RequestLogged) | (Logged, DetailsAppended) => Logged,
        (state, ConversationEnded) if !state.is_terminal() => Closed,
        _ => return Err(invalid(flow, current, event)),
    };

    Ok(outcome(flow, current, to, event))
}
