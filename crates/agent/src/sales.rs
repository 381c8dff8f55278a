use helpdesk_core::domain::sales::SalesProgress;
use helpdesk_core::domain::session::{FlowProgress, Session};
use helpdesk_core::flows::{FlowContext, FlowEngine, FlowEvent, FlowState, SalesFlow};

use crate::guardrails::EscalationReason;
use crate::replies;
use crate::runtime::{FlowStart, RecordKind, TurnServices};

pub(crate) async fn handle(
    services: &TurnServices<'_>,
    session: &mut Session,
    message: &str,
    start: FlowStart,
) -> String {
    let engine = FlowEngine::new(SalesFlow);
    let existing = match session.clear_progress() {
        Some(FlowProgress::Sales(progress)) if start == FlowStart::Continue => Some(progress),
        _ => None,
    };

    let mut progress = match existing {
        Some(progress) => progress,
        None => {
            if services.analyst.is_complex_sales_inquiry(message).await {
                services.transition(
                    &engine,
                    FlowState::New,
                    FlowEvent::ComplexInquiry,
                    &FlowContext::default(),
                );
                return services.escalate(EscalationReason::ComplexSalesInquiry);
            }
            SalesProgress::default()
        }
    };

    let extracted = services.analyst.extract_sales_fields(message).await;
    match progress.apply_turn(&extracted, message) {
        Some(field) => {
            let missing = progress.fields.missing();
            let context = FlowContext::with_missing_fields(missing.iter().map(|field| field.key()));
            if let Some(outcome) =
                services.transition(&engine, progress.state, FlowEvent::FieldsPending, &context)
            {
                progress.state = outcome.to;
            }
            tracing::debug!(
                event_name = "sales.field_prompted",
                field = field.key(),
                missing = missing.len(),
                "prompting for sales field"
            );
            progress.mark_prompted(field);
            session.begin(FlowProgress::Sales(progress));
            field.prompt().to_string()
        }
        None => {
            services.transition(
                &engine,
                progress.state,
                FlowEvent::FieldsCollected,
                &FlowContext::default(),
            );
            let fields = &progress.fields;
            services.record(RecordKind::SalesLead, &fields.to_log_entry()).await;
            replies::sales_recorded(&fields.name, &fields.company, &fields.team_size)
        }
    }
}
