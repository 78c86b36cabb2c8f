//! Catalog loader: one fetch plus a fallback timer per activation.

use crate::source::CatalogSource;
use crate::state::{Event, Message};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

/// How long the list waits for live data before showing placeholders.
pub const DEFAULT_FALLBACK_AFTER: Duration = Duration::from_secs(2);

/// An active loader for the list view.
///
/// Emits `CatalogRequested` immediately, then the fetch outcome and the
/// fallback timer as two independent messages. Dropping the loader cancels
/// both, so a torn-down list view receives nothing further.
pub struct CatalogLoader {
    generation: u64,
    fetch: JoinHandle<()>,
    fallback: JoinHandle<()>,
}

impl CatalogLoader {
    pub fn activate<S: CatalogSource>(
        runtime: &Handle,
        source: Arc<S>,
        generation: u64,
        fallback_after: Duration,
        tx: UnboundedSender<Message>,
    ) -> Self {
        tracing::debug!(generation, "activating catalog loader");
        let _ = tx.send(Message::Catalog {
            generation,
            event: Event::CatalogRequested,
        });

        let fetch_tx = tx.clone();
        let fetch = runtime.spawn(async move {
            let event = match source.fetch_catalog().await {
                Ok(catalog) => {
                    tracing::info!(generation, apps = catalog.len(), "catalog loaded");
                    Event::CatalogLoaded(catalog)
                }
                Err(e) => {
                    tracing::warn!(generation, error = %e, "error fetching apps");
                    Event::CatalogFailed
                }
            };
            let _ = fetch_tx.send(Message::Catalog { generation, event });
        });

        let fallback = runtime.spawn(async move {
            tokio::time::sleep(fallback_after).await;
            tracing::debug!(generation, "fallback timer fired");
            let _ = tx.send(Message::Catalog {
                generation,
                event: Event::FallbackElapsed,
            });
        });

        Self {
            generation,
            fetch,
            fallback,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for CatalogLoader {
    fn drop(&mut self) {
        self.fallback.abort();
        self.fetch.abort();
    }
}
