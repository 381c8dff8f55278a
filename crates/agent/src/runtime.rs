use std::sync::Arc;

use helpdesk_core::audit::{
    AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink, TracingAuditSink,
};
use helpdesk_core::config::RecordsConfig;
use helpdesk_core::domain::session::{FlowProgress, Session, SessionId, Turn};
use helpdesk_core::flows::{
    FeatureFlow, FlowContext, FlowDefinition, FlowEngine, FlowEvent, FlowState, FlowType,
    SalesFlow, TechnicalFlow, TransitionOutcome,
};
use helpdesk_core::records::{FileRecordSink, RecordSink};

use crate::analysis::Analyst;
use crate::guardrails::{EscalationReason, GuardrailDecision, GuardrailPolicy};
use crate::knowledge::KnowledgeBase;
use crate::llm::LlmClient;
use crate::prompts::{PromptError, PromptLibrary};
use crate::session_store::SessionStore;
use crate::{feature, sales, technical};

/// Turns of history the classifier sees, current message included.
pub const CLASSIFICATION_HISTORY_TURNS: usize = 3;
/// Turns of history given to technical answer generation.
pub const TECHNICAL_HISTORY_TURNS: usize = 4;

/// Whether a handler starts a fresh flow or continues the session's existing one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlowStart {
    New,
    Continue,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordKind {
    SalesLead,
    FeatureRequest,
}

impl RecordKind {
    fn as_str(&self) -> &'static str {
        match self {
            Self::SalesLead => "sales_lead",
            Self::FeatureRequest => "feature_request",
        }
    }
}

/// The two append-only logs the flows write to.
#[derive(Clone)]
pub struct RecordBook {
    pub sales: Arc<dyn RecordSink>,
    pub features: Arc<dyn RecordSink>,
}

impl RecordBook {
    pub fn new(sales: Arc<dyn RecordSink>, features: Arc<dyn RecordSink>) -> Self {
        Self { sales, features }
    }

    pub fn from_config(config: &RecordsConfig) -> Self {
        Self::new(
            Arc::new(FileRecordSink::new(&config.sales_log_path)),
            Arc::new(FileRecordSink::new(&config.feature_log_path)),
        )
    }

    fn sink(&self, kind: RecordKind) -> Arc<dyn RecordSink> {
        match kind {
            RecordKind::SalesLead => Arc::clone(&self.sales),
            RecordKind::FeatureRequest => Arc::clone(&self.features),
        }
    }
}

/// Collaborators a flow handler needs for one turn.
pub(crate) struct TurnServices<'a> {
    pub analyst: &'a Analyst,
    pub knowledge: &'a KnowledgeBase,
    records: &'a RecordBook,
    audit_sink: &'a dyn AuditSink,
    audit: AuditContext,
    pub context_documents: usize,
}

impl TurnServices<'_> {
    /// Applies a transition, logging rather than failing when the table rejects it.
    pub fn transition<F>(
        &self,
        engine: &FlowEngine<F>,
        from: FlowState,
        event: FlowEvent,
        context: &FlowContext,
    ) -> Option<TransitionOutcome>
    where
        F: FlowDefinition,
    {
        match engine.apply_with_audit(from, &event, context, self.audit_sink, &self.audit) {
            Ok(outcome) => {
                tracing::debug!(
                    event_name = "flow.transition_applied",
                    correlation_id = %self.audit.correlation_id,
                    flow = outcome.flow.as_str(),
                    from = ?outcome.from,
                    to = ?outcome.to,
                    "flow transition applied"
                );
                Some(outcome)
            }
            Err(error) => {
                tracing::warn!(
                    event_name = "flow.transition_rejected",
                    correlation_id = %self.audit.correlation_id,
                    flow = engine.flow_type().as_str(),
                    error = %error,
                    "flow transition rejected"
                );
                None
            }
        }
    }

    pub fn escalate(&self, reason: EscalationReason) -> String {
        tracing::info!(
            event_name = "chat.escalated",
            correlation_id = %self.audit.correlation_id,
            reason_code = reason.reason_code(),
            team = reason.handoff_team(),
            "conversation escalated to a human"
        );
        self.audit_sink.emit(
            AuditEvent::new(
                &self.audit,
                "chat.escalated",
                AuditCategory::Escalation,
                AuditOutcome::Success,
            )
            .with_metadata("reason_code", reason.reason_code())
            .with_metadata("team", reason.handoff_team()),
        );
        reason.user_message().to_string()
    }

    /// Appends to a log on the blocking pool. Failures are logged and never change the reply.
    pub async fn record(&self, kind: RecordKind, content: &str) {
        let sink = self.records.sink(kind);
        let target = sink.describe();
        let content = content.to_owned();
        let appended = tokio::task::spawn_blocking(move || sink.append(&content))
            .await
            .map_err(|error| error.to_string())
            .and_then(|result| result.map_err(|error| error.to_string()));

        let outcome = match appended {
            Ok(()) => {
                tracing::info!(
                    event_name = "records.appended",
                    correlation_id = %self.audit.correlation_id,
                    kind = kind.as_str(),
                    target = %target,
                    "record appended"
                );
                AuditOutcome::Success
            }
            Err(error) => {
                tracing::error!(
                    event_name = "records.append_failed",
                    correlation_id = %self.audit.correlation_id,
                    kind = kind.as_str(),
                    target = %target,
                    error = %error,
                    "failed to append record"
                );
                AuditOutcome::Failed
            }
        };
        self.audit_sink.emit(
            AuditEvent::new(&self.audit, "records.appended", AuditCategory::Records, outcome)
                .with_metadata("kind", kind.as_str()),
        );
    }
}

/// Routes each customer message through termination, escalation, flow continuation and
/// classification, in that order.
pub struct AgentRuntime {
    sessions: SessionStore,
    analyst: Analyst,
    knowledge: KnowledgeBase,
    records: RecordBook,
    guardrails: GuardrailPolicy,
    audit_sink: Arc<dyn AuditSink>,
    context_documents: usize,
}

impl AgentRuntime {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        knowledge: KnowledgeBase,
        records: RecordBook,
    ) -> Result<Self, PromptError> {
        Ok(Self {
            sessions: SessionStore::default(),
            analyst: Analyst::new(llm, PromptLibrary::new()?),
            knowledge,
            records,
            guardrails: GuardrailPolicy::default(),
            audit_sink: Arc::new(TracingAuditSink),
            context_documents: 3,
        })
    }

    pub fn with_guardrails(mut self, guardrails: GuardrailPolicy) -> Self {
        self.guardrails = guardrails;
        self
    }

    pub fn with_audit_sink(mut self, audit_sink: Arc<dyn AuditSink>) -> Self {
        self.audit_sink = audit_sink;
        self
    }

    pub fn with_context_documents(mut self, context_documents: usize) -> Self {
        self.context_documents = context_documents;
        self
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub async fn handle_message(
        &self,
        session_id: &SessionId,
        message: &str,
        correlation_id: &str,
    ) -> String {
        let message = message.trim();
        let handle = self.sessions.handle(session_id);
        let mut session = handle.lock().await;
        session.record_turn(Turn::user(message));

        let services = TurnServices {
            analyst: &self.analyst,
            knowledge: &self.knowledge,
            records: &self.records,
            audit_sink: self.audit_sink.as_ref(),
            audit: AuditContext::new(Some(session_id.clone()), correlation_id, "router"),
            context_documents: self.context_documents,
        };
        let reply = self.route(&services, &mut session, message).await;

        session.record_turn(Turn::assistant(reply.clone()));
        tracing::info!(
            event_name = "chat.turn_completed",
            session_id = %session_id,
            correlation_id = %correlation_id,
            active_flow = session.active_flow().map(|flow| flow.as_str()).unwrap_or("none"),
            turns = session.turns().len(),
            "chat turn handled"
        );
        reply
    }

    async fn route(
        &self,
        services: &TurnServices<'_>,
        session: &mut Session,
        message: &str,
    ) -> String {
        if let GuardrailDecision::EndSession { user_message } = self.guardrails.evaluate(message) {
            if let Some(progress) = session.clear_progress() {
                close_flow(services, &progress);
            }
            return user_message.to_string();
        }

        if self.analyst.is_negative_sentiment(message).await {
            return services.escalate(EscalationReason::NegativeSentiment);
        }

        if let Some(flow) = session.active_flow() {
            return dispatch(services, session, message, flow, FlowStart::Continue).await;
        }

        let classified = self
            .analyst
            .classify(session.recent_turns(CLASSIFICATION_HISTORY_TURNS), message)
            .await;
        match classified {
            Some(flow) => dispatch(services, session, message, flow, FlowStart::New).await,
            None => services.escalate(EscalationReason::Unclassified),
        }
    }
}

async fn dispatch(
    services: &TurnServices<'_>,
    session: &mut Session,
    message: &str,
    flow: FlowType,
    start: FlowStart,
) -> String {
    match flow {
        FlowType::Technical => technical::handle(services, session, message, start).await,
        FlowType::Sales => sales::handle(services, session, message, start).await,
        FlowType::Feature => feature::handle(services, session, message, start).await,
    }
}

fn close_flow(services: &TurnServices<'_>, progress: &FlowProgress) {
    let context = FlowContext::default();
    let event = FlowEvent::ConversationEnded;
    match progress {
        FlowProgress::Technical(progress) => {
            services.transition(&FlowEngine::new(TechnicalFlow), progress.state, event, &context)
        }
        FlowProgress::Sales(progress) => {
            services.transition(&FlowEngine::new(SalesFlow), progress.state, event, &context)
        }
        FlowProgress::Feature(progress) => {
            services.transition(&FlowEngine::new(FeatureFlow), progress.state, event, &context)
        }
    };
}
