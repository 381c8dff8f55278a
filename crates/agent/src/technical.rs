use helpdesk_core::domain::session::{FlowProgress, Session, TechnicalProgress};
use helpdesk_core::flows::{
    FlowContext, FlowEngine, FlowEvent, TechnicalFlow, MAX_TECHNICAL_ATTEMPTS,
};

use crate::conversation::{customer_confirmed, customer_declined};
use crate::guardrails::EscalationReason;
use crate::replies;
use crate::runtime::{FlowStart, TurnServices, TECHNICAL_HISTORY_TURNS};

/// One turn of the technical-support flow.
///
/// A new issue is answered from the knowledge base straight away. Follow-ups either confirm
/// the fix, count as a failed attempt, or ask again; the knowledge base is always searched
/// with the customer's original issue.
pub(crate) async fn handle(
    services: &TurnServices<'_>,
    session: &mut Session,
    message: &str,
    start: FlowStart,
) -> String {
    let engine = FlowEngine::new(TechnicalFlow);
    let mut progress = match session.clear_progress() {
        Some(FlowProgress::Technical(progress)) if start == FlowStart::Continue => progress,
        _ => TechnicalProgress::new(message),
    };

    if start == FlowStart::Continue {
        if customer_confirmed(message) {
            progress.resolved = true;
            services.transition(
                &engine,
                progress.state,
                FlowEvent::CustomerConfirmed,
                &FlowContext::with_attempts(progress.attempts),
            );
            tracing::info!(
                event_name = "technical.resolved",
                attempts = progress.attempts,
                "technical issue resolved"
            );
            return replies::TECHNICAL_RESOLVED.to_string();
        }
        if customer_declined(message) {
            progress.attempts += 1;
        }
    }

    let context = FlowContext::with_attempts(progress.attempts);
    if progress.attempts >= MAX_TECHNICAL_ATTEMPTS {
        services.transition(&engine, progress.state, FlowEvent::AttemptsExhausted, &context);
        return services.escalate(EscalationReason::AttemptsExhausted);
    }
    if services.analyst.is_negative_sentiment(message).await {
        services.transition(&engine, progress.state, FlowEvent::SentimentEscalated, &context);
        return services.escalate(EscalationReason::TechnicalSentiment);
    }

    let results = services.knowledge.search(&progress.issue).await;
    if results.is_empty() {
        services.transition(&engine, progress.state, FlowEvent::KnowledgeBaseMiss, &context);
        return services.escalate(EscalationReason::NoKnowledgeBaseMatch);
    }

    let answer = services
        .analyst
        .technical_answer(
            session.recent_turns(TECHNICAL_HISTORY_TURNS),
            results.top(services.context_documents),
        )
        .await;
    match answer {
        Ok(answer) => {
            if let Some(outcome) =
                services.transition(&engine, progress.state, FlowEvent::SolutionProposed, &context)
            {
                progress.state = outcome.to;
            }
            progress.attempts += 1;
            session.begin(FlowProgress::Technical(progress));
            answer
        }
        Err(error) => {
            tracing::warn!(
                event_name = "technical.answer_failed",
                error = %error,
                "technical answer generation failed"
            );
            services.transition(&engine, progress.state, FlowEvent::AnswerUnavailable, &context);
            services.escalate(EscalationReason::AnswerUnavailable)
        }
    }
}
