use crate::error::Result;
use crate::gateway::{CompletionGateway, CompletionOptions};
use crate::session::Session;
use tokio::sync::mpsc::UnboundedSender;

/// Progress of a single chat turn, for whoever renders it.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnEvent {
    TextDelta(String),
    Complete { text: String },
    Error(String),
}

/// Run one user turn against the gateway.
///
/// The user prompt is appended first. The assistant reply is appended on
/// success; on failure an `Error: ...` assistant message is appended
/// instead and the error is returned, so the history always ends with an
/// assistant turn.
pub async fn run_turn(
    session: &mut Session,
    gateway: &CompletionGateway,
    prompt: impl Into<String>,
    options: &CompletionOptions,
    events: &UnboundedSender<TurnEvent>,
) -> Result<String> {
    session.add_user_message(prompt);
    let history = session.snapshot();

    let result = gateway
        .complete_stream(&history, options, |delta| {
            let _ = events.send(TurnEvent::TextDelta(delta.to_string()));
        })
        .await;

    match result {
        Ok(text) => {
            session.add_assistant_message(text.clone());
            let _ = events.send(TurnEvent::Complete { text: text.clone() });
            Ok(text)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Completion failed");
            session.add_assistant_message(format!("Error: {e}"));
            let _ = events.send(TurnEvent::Error(e.to_string()));
            Err(e)
        }
    }
}
