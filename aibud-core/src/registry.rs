//! Registry of server records.
//!
//! Each record sits behind its own async mutex. Holding a record's guard is
//! the per-server critical section: a chat turn keeps it across the
//! completion call, so two messages for the same server are answered one
//! after the other while other servers proceed independently.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use crate::server::{RecordDefaults, ServerId, ServerRecord, SetOutcome, StateError};
use crate::templates::TemplateSet;

/// Shared handle to one server's record.
pub type RecordHandle = Arc<Mutex<ServerRecord>>;

/// Keyed store of [`ServerRecord`]s, created lazily on first use.
pub struct ServerRegistry {
    templates: Arc<TemplateSet>,
    defaults: RecordDefaults,
    servers: Mutex<HashMap<ServerId, RecordHandle>>,
}

impl ServerRegistry {
    pub fn new(templates: Arc<TemplateSet>, defaults: RecordDefaults) -> Self {
        Self {
            templates,
            defaults,
            servers: Mutex::new(HashMap::new()),
        }
    }

    pub fn templates(&self) -> &TemplateSet {
        &self.templates
    }

    /// Return the record for `server_id`, creating it if needed.
    pub async fn get_or_create(&self, server_id: ServerId) -> RecordHandle {
        let mut servers = self.servers.lock().await;
        let handle = servers.entry(server_id).or_insert_with(|| {
            info!(
                server_id,
                template = %self.defaults.template,
                model = %self.defaults.model,
                "Created server record"
            );
            Arc::new(Mutex::new(ServerRecord::new(
                server_id,
                Arc::clone(&self.templates),
                &self.defaults,
            )))
        });
        Arc::clone(handle)
    }

    /// Number of servers seen so far.
    pub async fn len(&self) -> usize {
        self.servers.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.servers.lock().await.is_empty()
    }

    /// Restore the server's transcripts; selections are kept.
    pub async fn reset(&self, server_id: ServerId) {
        let handle = self.get_or_create(server_id).await;
        handle.lock().await.reset();
    }

    pub async fn set_template(
        &self,
        server_id: ServerId,
        name: &str,
    ) -> Result<SetOutcome, StateError> {
        if name.is_empty() {
            return Err(StateError::InvalidInput("personality"));
        }
        let handle = self.get_or_create(server_id).await;
        let mut record = handle.lock().await;
        record.set_template(name)
    }

    pub async fn set_model(&self, server_id: ServerId, name: &str) -> Result<SetOutcome, StateError> {
        if name.is_empty() {
            return Err(StateError::InvalidInput("model"));
        }
        let handle = self.get_or_create(server_id).await;
        let mut record = handle.lock().await;
        record.set_model(name)
    }
}
