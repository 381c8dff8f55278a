use helpdesk_core::domain::session::{FlowProgress, Session};
use helpdesk_core::flows::{FeatureFlow, FlowContext, FlowEngine, FlowEvent, FlowState};

use crate::replies;
use crate::runtime::{FlowStart, RecordKind, TurnServices};

/// Logs the request and clears the record in the same turn, so follow-ups start a new flow.
pub(crate) async fn handle(
    services: &TurnServices<'_>,
    session: &mut Session,
    message: &str,
    start: FlowStart,
) -> String {
    let engine = FlowEngine::new(FeatureFlow);
    let existing = match session.clear_progress() {
        Some(FlowProgress::Feature(progress)) if start == FlowStart::Continue => Some(progress),
        _ => None,
    };

    match existing {
        None => {
            services
                .record(RecordKind::FeatureRequest, &format!("Feature Request: {message}"))
                .await;
            services.transition(
                &engine,
                FlowState::New,
                FlowEvent::RequestLogged,
                &FlowContext::default(),
            );
            replies::FEATURE_LOGGED.to_string()
        }
        Some(mut progress) => {
            progress.append_details(message);
            services.transition(
                &engine,
                progress.state,
                FlowEvent::DetailsAppended,
                &FlowContext::default(),
            );
            tracing::debug!(
                event_name = "feature.details_appended",
                description_len = progress.description.len(),
                "feature request details appended"
            );
            replies::FEATURE_UPDATED.to_string()
        }
    }
}
