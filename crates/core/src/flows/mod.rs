pub mod engine;
pub mod states;

pub use engine::{
    FeatureFlow, FlowDefinition, FlowEngine, FlowTransitionError, SalesFlow, TechnicalFlow,
    MAX_TECHNICAL_ATTEMPTS,
};
pub use states::{FlowContext, FlowEvent, FlowState, FlowType, TransitionOutcome};
