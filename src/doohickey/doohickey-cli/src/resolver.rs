//! Detail resolver: finds one application by its routed identifier.

use crate::source::CatalogSource;
use crate::state::Message;
use doohickey_catalog::{Application, Catalog};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

/// Why a detail view has nothing to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DetailError {
    #[error("App not found")]
    NotFound,
    #[error("Error loading app details")]
    LoadFailure,
}

/// What a detail view currently displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailStatus {
    Loading,
    Ready(Application),
    Failed(DetailError),
}

/// Percent-encode an application name for use in a route.
pub fn encode_identifier(name: &str) -> String {
    urlencoding::encode(name).into_owned()
}

/// Decode a routed identifier back into an application name.
///
/// Returns `None` when the decoded bytes are not valid UTF-8.
pub fn decode_identifier(identifier: &str) -> Option<String> {
    urlencoding::decode(identifier).ok().map(|name| name.into_owned())
}

/// Look up a routed identifier in a catalog snapshot. First match wins.
pub fn lookup(catalog: &Catalog, identifier: &str) -> Result<Application, DetailError> {
    let name = decode_identifier(identifier).ok_or(DetailError::NotFound)?;
    catalog.find(&name).cloned().ok_or(DetailError::NotFound)
}

/// Fetch a fresh catalog and resolve `identifier` against it.
pub async fn resolve<S: CatalogSource>(source: &S, identifier: &str) -> DetailStatus {
    let catalog = match source.fetch_catalog().await {
        Ok(catalog) => catalog,
        Err(e) => {
            tracing::warn!(error = %e, identifier, "failed to load app details");
            return DetailStatus::Failed(DetailError::LoadFailure);
        }
    };

    match lookup(&catalog, identifier) {
        Ok(app) => {
            tracing::debug!(name = %app.name, "resolved app details");
            DetailStatus::Ready(app)
        }
        Err(e) => {
            tracing::info!(identifier, "no app matches identifier");
            DetailStatus::Failed(e)
        }
    }
}

/// Resolve in the background and report the result tagged with `generation`.
///
/// The task is never cancelled; the receiver drops results whose generation
/// no longer matches the detail view on screen.
pub fn spawn_resolve<S: CatalogSource>(
    runtime: &Handle,
    source: Arc<S>,
    identifier: String,
    generation: u64,
    tx: UnboundedSender<Message>,
) -> JoinHandle<()> {
    runtime.spawn(async move {
        let status = resolve(source.as_ref(), &identifier).await;
        let _ = tx.send(Message::Detail { generation, status });
    })
}
