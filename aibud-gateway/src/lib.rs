pub mod chat;
pub mod discord;
pub mod providers;
pub mod state;

pub use chat::{ChatError, ChatOptions, ChatService};
pub use providers::provider::{CompletionProvider, CompletionRequest, ProviderError};
pub use state::AppState;
