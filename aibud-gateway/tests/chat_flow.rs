//! End-to-end chat turns against a scripted completion backend.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use aibud_core::{
    NoticeKind, RecordDefaults, Reply, ServerRegistry, SetOutcome, Settings, TemplateSet,
};
use aibud_gateway::{
    ChatError, ChatOptions, ChatService, CompletionProvider, CompletionRequest, ProviderError,
};
use tokio::sync::Barrier;

/// Returns queued replies in order and records every request.
#[derive(Default)]
struct ScriptedProvider {
    replies: std::sync::Mutex<VecDeque<Result<String, ProviderError>>>,
    requests: std::sync::Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    fn with_replies(replies: Vec<Result<String, ProviderError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: std::sync::Mutex::new(replies.into()),
            requests: std::sync::Mutex::default(),
        })
    }

    fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl CompletionProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("ok".to_string()))
    }
}

fn service_with(provider: Arc<dyn CompletionProvider>, options: ChatOptions) -> ChatService {
    let templates = Arc::new(TemplateSet::builtin().unwrap());
    let registry = ServerRegistry::new(
        templates,
        RecordDefaults {
            template: "normal".to_string(),
            model: "davinci".to_string(),
        },
    );
    ChatService::new(registry, provider, options)
}

fn service(provider: Arc<dyn CompletionProvider>) -> ChatService {
    service_with(provider, ChatOptions::from_settings(&Settings::default()))
}

async fn active_transcript(service: &ChatService, server_id: u64) -> String {
    let handle = service.registry().get_or_create(server_id).await;
    let record = handle.lock().await;
    record.active_transcript().to_string()
}

#[tokio::test]
async fn test_successful_turn_appends_both_sides() {
    let provider = ScriptedProvider::with_replies(vec![Ok("  Doing great!  \n".to_string())]);
    let chat = service(provider.clone());

    let reply = chat.respond("!ai   how are   you?", 1, "Ana").await;
    assert_eq!(reply, Reply::Text("Doing great!".to_string()));

    let requests = provider.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].model, "davinci");
    assert!(requests[0].prompt.ends_with("Ana: how are you?\nAiBud: "));

    let transcript = active_transcript(&chat, 1).await;
    assert!(transcript.ends_with("Ana: how are you?\nAiBud: Doing great!\n"));
    assert!(!transcript.contains("You:"));
}

#[tokio::test]
async fn test_empty_input_skips_backend() {
    let provider = ScriptedProvider::with_replies(vec![]);
    let chat = service(provider.clone());

    let err = chat.generate("!ai  \n\t ", 1, "Ana").await.unwrap_err();
    assert!(matches!(err, ChatError::EmptyInput));
    assert!(provider.requests().is_empty());

    let reply = chat.respond("", 1, "Ana").await;
    assert_eq!(reply.as_notice().map(|n| n.kind), Some(NoticeKind::Warning));
}

#[tokio::test]
async fn test_empty_response_keeps_user_turn() {
    let provider = ScriptedProvider::with_replies(vec![Ok(" \n ".to_string())]);
    let chat = service(provider.clone());

    let reply = chat.respond("hello", 1, "Ana").await;
    let notice = reply.as_notice().unwrap();
    assert_eq!(notice.kind, NoticeKind::Warning);
    assert_eq!(notice.message, "Empty response received from the completion engine");

    let transcript = active_transcript(&chat, 1).await;
    assert!(transcript.ends_with("Ana: hello\nAiBud: "));
}

#[tokio::test]
async fn test_backend_failure_is_not_rolled_back() {
    let provider = ScriptedProvider::with_replies(vec![
        Err(ProviderError::ApiError {
            status: 500,
            message: "overloaded".to_string(),
        }),
        Ok("Back again".to_string()),
    ]);
    let chat = service(provider.clone());

    let reply = chat.respond("hello", 1, "Ana").await;
    assert_eq!(reply.as_notice().map(|n| n.kind), Some(NoticeKind::Error));
    assert!(active_transcript(&chat, 1).await.ends_with("Ana: hello\nAiBud: "));

    // The dangling bot label stays in front of the next user turn
    chat.respond("hello?", 1, "Ana").await;
    let requests = provider.requests();
    assert!(requests[1].prompt.ends_with("Ana: hello\nAiBud: Ana: hello?\nAiBud: "));
}

#[tokio::test]
async fn test_placeholder_uses_first_speaker_only() {
    let provider = ScriptedProvider::with_replies(vec![]);
    let chat = service(provider.clone());

    chat.respond("first", 7, "Ana").await;
    chat.respond("second", 7, "Ben").await;

    let requests = provider.requests();
    let prompt = &requests[1].prompt;
    assert!(prompt.contains("Ana: Hey AiBud"));
    assert!(!prompt.contains("Ben: Hey AiBud"));
    assert!(prompt.ends_with("Ben: second\nAiBud: "));

    // Every template was rewritten, not just the active one
    let registry = chat.registry();
    assert_eq!(
        registry.set_template(7, "street").await.unwrap(),
        SetOutcome::Changed
    );
    assert!(active_transcript(&chat, 7).await.contains("Ana: Yo AiBud"));
}

#[tokio::test]
async fn test_set_model_resets_conversation() {
    let provider = ScriptedProvider::with_replies(vec![]);
    let chat = service(provider.clone());

    chat.respond("hi", 3, "Ana").await;
    assert_eq!(
        chat.registry().set_model(3, "curie").await.unwrap(),
        SetOutcome::Changed
    );

    let fresh = TemplateSet::builtin().unwrap();
    assert_eq!(active_transcript(&chat, 3).await, fresh.get("normal").unwrap());

    chat.respond("hello", 3, "Ben").await;
    let requests = provider.requests();
    assert_eq!(requests[1].model, "curie");
    assert!(requests[1].prompt.contains("Ben: Hey AiBud"));
}

#[tokio::test]
async fn test_servers_are_isolated() {
    let provider = ScriptedProvider::with_replies(vec![]);
    let chat = service(provider.clone());

    chat.respond("only here", 1, "Ana").await;

    assert!(active_transcript(&chat, 1).await.contains("only here"));
    assert!(!active_transcript(&chat, 2).await.contains("only here"));
}

#[tokio::test]
async fn test_truncation_keeps_description_line() {
    let provider = ScriptedProvider::with_replies(vec![]);
    let mut options = ChatOptions::from_settings(&Settings::default());
    options.char_limit = 80;
    let chat = service_with(provider.clone(), options);

    for i in 0..5 {
        chat.respond(&format!("message number {i}"), 1, "Ana").await;
    }

    let fresh = TemplateSet::builtin().unwrap();
    let description = fresh.get("normal").unwrap().lines().next().unwrap();

    let requests = provider.requests();
    let last = &requests[4].prompt;
    assert!(last.starts_with(description));
    assert!(!last.contains("message number 0"));
    assert!(last.ends_with("Ana: message number 4\nAiBud: "));
}

/// Counts overlapping calls; each call sleeps so overlaps are observable.
#[derive(Default)]
struct SlowProvider {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

#[async_trait::async_trait]
impl CompletionProvider for SlowProvider {
    fn name(&self) -> &str {
        "slow"
    }

    async fn complete(&self, _request: &CompletionRequest) -> Result<String, ProviderError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok("done".to_string())
    }
}

#[tokio::test]
async fn test_same_server_turns_do_not_interleave() {
    let provider = Arc::new(SlowProvider::default());
    let chat = Arc::new(service(provider.clone()));

    let tasks: Vec<_> = (0..4)
        .map(|i| {
            let chat = Arc::clone(&chat);
            tokio::spawn(async move { chat.respond(&format!("msg {i}"), 1, "Ana").await })
        })
        .collect();
    for task in tasks {
        assert_eq!(task.await.unwrap(), Reply::Text("done".to_string()));
    }

    assert_eq!(provider.max_in_flight.load(Ordering::SeqCst), 1);

    // Each user turn is directly followed by its own bot turn
    let transcript = active_transcript(&chat, 1).await;
    assert_eq!(transcript.matches("\nAiBud: done\n").count(), 4);
    assert!(!transcript.contains("AiBud: Ana:"));
}

/// Blocks until two calls are in flight at once.
struct RendezvousProvider {
    barrier: Barrier,
}

#[async_trait::async_trait]
impl CompletionProvider for RendezvousProvider {
    fn name(&self) -> &str {
        "rendezvous"
    }

    async fn complete(&self, _request: &CompletionRequest) -> Result<String, ProviderError> {
        self.barrier.wait().await;
        Ok("met".to_string())
    }
}

#[tokio::test]
async fn test_different_servers_run_concurrently() {
    let provider = Arc::new(RendezvousProvider {
        barrier: Barrier::new(2),
    });
    let chat = Arc::new(service(provider));

    let first = {
        let chat = Arc::clone(&chat);
        tokio::spawn(async move { chat.respond("hi", 1, "Ana").await })
    };
    let second = {
        let chat = Arc::clone(&chat);
        tokio::spawn(async move { chat.respond("hi", 2, "Ben").await })
    };

    let joined = tokio::time::timeout(Duration::from_secs(5), async {
        (first.await.unwrap(), second.await.unwrap())
    })
    .await
    .expect("servers should not block each other");

    assert_eq!(joined.0, Reply::Text("met".to_string()));
    assert_eq!(joined.1, Reply::Text("met".to_string()));
}

/// In-memory sink for formatted log output.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<std::sync::Mutex<Vec<u8>>>);

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_conversation_text_stays_out_of_info_logs() {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let provider = ScriptedProvider::with_replies(vec![Ok("a private answer".to_string())]);
    let chat = service(provider);
    chat.respond("my private question", 1, "Ana").await;

    let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
    assert!(output.contains("Generating reply"));
    assert!(!output.contains("my private question"));
    assert!(!output.contains("a private answer"));
}
