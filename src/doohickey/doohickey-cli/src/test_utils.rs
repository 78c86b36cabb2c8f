//! Shared fakes for unit tests.

use crate::source::{CatalogSource, SourceError};
use doohickey_catalog::{Application, Catalog};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// In-memory catalog source with a configurable response delay.
///
/// `catalog: None` makes every fetch fail with a 500 status; installs fail
/// for names listed in `failing_installs`.
pub(crate) struct FakeSource {
    pub delay: Duration,
    pub catalog: Option<Catalog>,
    pub failing_installs: Vec<String>,
    fetches: AtomicUsize,
    installs: Mutex<Vec<String>>,
}

impl FakeSource {
    pub fn with_catalog(catalog: Catalog) -> Self {
        Self {
            delay: Duration::ZERO,
            catalog: Some(catalog),
            failing_installs: Vec::new(),
            fetches: AtomicUsize::new(0),
            installs: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            catalog: None,
            ..Self::with_catalog(Catalog::default())
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing_install(mut self, name: &str) -> Self {
        self.failing_installs.push(name.to_string());
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn installed(&self) -> Vec<String> {
        self.installs.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

fn server_error(path: &str) -> SourceError {
    SourceError::Status {
        url: format!("fake://{path}"),
        status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl CatalogSource for FakeSource {
    async fn fetch_catalog(&self) -> Result<Catalog, SourceError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.catalog.clone().ok_or_else(|| server_error("apps.json"))
    }

    async fn trigger_install(&self, name: &str) -> Result<(), SourceError> {
        self.installs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(name.to_string());
        if self.failing_installs.iter().any(|n| n == name) {
            return Err(server_error(&format!("install/{name}")));
        }
        Ok(())
    }
}

/// Build a catalog of bare entries with the given names and descriptions.
pub(crate) fn catalog_of(entries: &[(&str, &str)]) -> Catalog {
    Catalog::new(
        entries
            .iter()
            .map(|(name, description)| Application {
                name: name.to_string(),
                description: description.to_string(),
                ..Default::default()
            })
            .collect(),
    )
}
