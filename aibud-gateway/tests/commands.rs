//! `/ai` commands issued while a chat turn is generating.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use aibud_core::{Config, Notice, ProviderKind, Reply, Secrets, Settings, TemplateSet};
use aibud_gateway::discord::commands::{
    AiCommand, CommandResponder, CommandResponse, run_command,
};
use aibud_gateway::{AppState, CompletionProvider, CompletionRequest, ProviderError};
use tokio::sync::Notify;

/// Holds every completion until the test releases it.
#[derive(Default)]
struct GatedProvider {
    started: Notify,
    release: Notify,
}

#[async_trait::async_trait]
impl CompletionProvider for GatedProvider {
    fn name(&self) -> &str {
        "gated"
    }

    async fn complete(&self, _request: &CompletionRequest) -> Result<String, ProviderError> {
        self.started.notify_one();
        self.release.notified().await;
        Ok("finally".to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    Acknowledged,
    Delivered(CommandResponse),
}

#[derive(Default)]
struct RecordingResponder {
    events: Mutex<Vec<Event>>,
    acknowledged: Notify,
}

impl RecordingResponder {
    fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl CommandResponder for RecordingResponder {
    async fn acknowledge(&self) {
        self.events.lock().unwrap().push(Event::Acknowledged);
        self.acknowledged.notify_one();
    }

    async fn deliver(&self, response: CommandResponse) {
        self.events.lock().unwrap().push(Event::Delivered(response));
    }
}

fn app_state(provider: Arc<dyn CompletionProvider>) -> Arc<AppState> {
    let mut settings = Settings::default();
    settings.provider.kind = ProviderKind::Ollama;
    let config = Config::from_parts(Secrets::default(), settings).unwrap();
    Arc::new(AppState::new(&config, provider))
}

#[tokio::test]
async fn test_command_is_acknowledged_while_reply_is_generating() {
    let provider = Arc::new(GatedProvider::default());
    let state = app_state(provider.clone());

    let chat = {
        let state = Arc::clone(&state);
        tokio::spawn(async move { state.chat.respond("hi", 1, "Ana").await })
    };
    provider.started.notified().await;

    let responder = Arc::new(RecordingResponder::default());
    let command = {
        let state = Arc::clone(&state);
        let responder = Arc::clone(&responder);
        tokio::spawn(async move {
            run_command(&state, 1, AiCommand::Reset, responder.as_ref()).await;
        })
    };

    tokio::time::timeout(Duration::from_secs(1), responder.acknowledged.notified())
        .await
        .expect("command should be acknowledged while the record is busy");
    assert_eq!(responder.events(), vec![Event::Acknowledged]);

    provider.release.notify_one();
    assert_eq!(chat.await.unwrap(), Reply::Text("finally".to_string()));
    command.await.unwrap();

    assert_eq!(
        responder.events(),
        vec![
            Event::Acknowledged,
            Event::Delivered(CommandResponse::Notice(Notice::success("Conversation reset"))),
        ]
    );

    // The reset ran after the turn finished, so the turn did not survive it
    let handle = state.registry().get_or_create(1).await;
    let fresh = TemplateSet::builtin().unwrap();
    assert_eq!(handle.lock().await.active_transcript(), fresh.get("normal").unwrap());
}

#[tokio::test]
async fn test_set_model_reports_configured_label() {
    let state = app_state(Arc::new(GatedProvider::default()));
    let responder = RecordingResponder::default();

    run_command(&state, 5, AiCommand::SetModel("curie".to_string()), &responder).await;
    run_command(&state, 5, AiCommand::SetModel("curie".to_string()), &responder).await;

    assert_eq!(
        responder.events(),
        vec![
            Event::Acknowledged,
            Event::Delivered(CommandResponse::Notice(Notice::success(
                "Model set to GPT3-Curie\nThe conversation has been reset",
            ))),
            Event::Acknowledged,
            Event::Delivered(CommandResponse::Notice(Notice::info(
                "Model already set to GPT3-Curie",
            ))),
        ]
    );
}

#[tokio::test]
async fn test_help_needs_no_record() {
    let state = app_state(Arc::new(GatedProvider::default()));
    let responder = RecordingResponder::default();

    run_command(&state, 9, AiCommand::Help, &responder).await;

    assert_eq!(
        responder.events(),
        vec![Event::Acknowledged, Event::Delivered(CommandResponse::Help)]
    );
    assert!(state.registry().is_empty().await);
}
