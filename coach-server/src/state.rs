//! Shared application state for the feedback server.

use std::sync::Arc;

use coach::io::alert::WebhookNotifier;
use coach::orchestrate::Orchestrator;

/// Shared state accessible from all request handlers.
///
/// Generic over the orchestrator's collaborators so handlers can be driven
/// with scripted doubles.
pub struct AppState<G, V> {
    pub orchestrator: Arc<Orchestrator<G, V>>,
    /// Operator alerts; `None` when no webhook is configured.
    pub notifier: Option<Arc<WebhookNotifier>>,
}

impl<G, V> AppState<G, V> {
    pub fn new(orchestrator: Orchestrator<G, V>) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            notifier: None,
        }
    }

    pub fn with_notifier(mut self, notifier: Option<WebhookNotifier>) -> Self {
        self.notifier = notifier.map(Arc::new);
        self
    }
}

impl<G, V> Clone for AppState<G, V> {
    fn clone(&self) -> Self {
        Self {
            orchestrator: Arc::clone(&self.orchestrator),
            notifier: self.notifier.clone(),
        }
    }
}
