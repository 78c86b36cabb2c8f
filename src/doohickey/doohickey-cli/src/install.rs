//! Install trigger: fire-and-forget install requests.

use crate::source::{CatalogSource, SourceError};
use crate::state::{Event, Message};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

/// Request an install and return the raw outcome.
pub async fn request_install<S: CatalogSource>(source: &S, name: &str) -> Result<(), SourceError> {
    tracing::info!(name, "requesting install");
    let result = source.trigger_install(name).await;
    if let Err(e) = &result {
        tracing::warn!(name, error = %e, "install request failed");
    }
    result
}

/// Request an install and translate the outcome into a view-state event.
pub async fn trigger_install<S: CatalogSource>(source: &S, name: &str) -> Event {
    match request_install(source, name).await {
        Ok(()) => Event::InstallSucceeded {
            name: name.to_string(),
        },
        Err(_) => Event::InstallFailed {
            name: name.to_string(),
        },
    }
}

/// Run [`trigger_install`] in the background. No retry, no cancellation.
pub fn spawn_install<S: CatalogSource>(
    runtime: &Handle,
    source: Arc<S>,
    name: String,
    tx: UnboundedSender<Message>,
) -> JoinHandle<()> {
    runtime.spawn(async move {
        let event = trigger_install(source.as_ref(), &name).await;
        let _ = tx.send(Message::Install(event));
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{ViewState, reduce};
    use crate::test_utils::{FakeSource, catalog_of};

    #[tokio::test]
    async fn success_becomes_notice() {
        let source = FakeSource::with_catalog(catalog_of(&[("A", "a")]));
        let event = trigger_install(&source, "A").await;
        assert_eq!(event, Event::InstallSucceeded { name: "A".into() });
        assert_eq!(source.installed(), vec!["A".to_string()]);
    }

    #[tokio::test]
    async fn failure_surfaces_message_and_keeps_catalog() {
        let source = FakeSource::with_catalog(catalog_of(&[("A", "a")])).failing_install("A");
        let before = reduce(
            ViewState::default(),
            Event::CatalogLoaded(catalog_of(&[("A", "a")])),
        );

        let event = trigger_install(&source, "A").await;
        let after = reduce(before.clone(), event);

        assert!(after.error.as_deref().unwrap().contains("A"));
        assert_eq!(after.apps, before.apps);
    }

    #[tokio::test]
    async fn raw_name_is_passed_through() {
        let source = FakeSource::with_catalog(catalog_of(&[]));
        trigger_install(&source, "Note Pad+").await;
        assert_eq!(source.installed(), vec!["Note Pad+".to_string()]);
    }

    #[tokio::test]
    async fn spawned_install_reports_through_channel() {
        let source = Arc::new(FakeSource::with_catalog(catalog_of(&[])).failing_install("B"));
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        spawn_install(&Handle::current(), source, "B".to_string(), tx)
            .await
            .unwrap();

        match rx.recv().await {
            Some(Message::Install(event)) => {
                assert_eq!(event, Event::InstallFailed { name: "B".into() })
            }
            other => panic!("unexpected message {other:?}"),
        }
    }
}
