pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod records;

pub use audit::{
    AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink,
    TracingAuditSink,
};
pub use domain::knowledge::{KbDocument, KbMetadata, KbSearchResult, KnowledgeEntry};
pub use domain::sales::{SalesField, SalesFields, SalesProgress};
pub use domain::session::{
    FeatureProgress, FlowProgress, Role, Session, SessionId, TechnicalProgress, Turn,
};
pub use errors::{ApplicationError, InterfaceError};
pub use flows::{FlowEngine, FlowEvent, FlowState, FlowTransitionError, FlowType};
pub use records::{FileRecordSink, InMemoryRecordSink, RecordError, RecordSink};
