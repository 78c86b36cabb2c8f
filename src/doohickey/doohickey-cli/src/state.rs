//! View state and the reducer that updates it.
//!
//! Every change to [`ViewState`] goes through [`reduce`]: loader completions,
//! install outcomes and user actions all arrive as [`Event`]s on the UI
//! thread, so the state needs no locking.

use crate::resolver::DetailStatus;
use doohickey_catalog::Catalog;

/// Shown when the catalog cannot be fetched.
pub const LOAD_FAILURE_MESSAGE: &str = "Error fetching apps.";

pub fn install_error_message(name: &str) -> String {
    format!("Error installing {name}")
}

pub fn install_notice_message(name: &str) -> String {
    format!("Installing {name}...")
}

/// Presentation theme. Starts light and is never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

/// Which completion last populated `apps`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CatalogOrigin {
    /// Nothing has arrived yet (or the fetch failed before the fallback).
    #[default]
    Pending,
    /// A real fetch result.
    Live,
    /// The built-in placeholder catalog.
    Fallback,
}

/// In-memory UI state for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub loading: bool,
    pub error: Option<String>,
    /// Confirmation of a successful install request.
    pub notice: Option<String>,
    pub theme: Theme,
    pub apps: Catalog,
    pub origin: CatalogOrigin,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            loading: true,
            error: None,
            notice: None,
            theme: Theme::default(),
            apps: Catalog::default(),
            origin: CatalogOrigin::default(),
        }
    }
}

/// Something that happened which may change the view state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The catalog loader was activated.
    CatalogRequested,
    CatalogLoaded(Catalog),
    CatalogFailed,
    /// The fallback timer fired.
    FallbackElapsed,
    InstallSucceeded { name: String },
    InstallFailed { name: String },
    OpenUrlFailed { url: String },
    DismissError,
    DismissNotice,
    ToggleTheme,
}

/// Apply one event, producing the next state.
///
/// Precedence between the two loader completions: a live catalog always
/// replaces whatever is shown, while the fallback only fills an empty list.
pub fn reduce(state: ViewState, event: Event) -> ViewState {
    match event {
        Event::CatalogRequested => ViewState {
            loading: true,
            ..state
        },
        Event::CatalogLoaded(apps) => ViewState {
            loading: false,
            apps,
            origin: CatalogOrigin::Live,
            ..state
        },
        Event::CatalogFailed => {
            // A failure is not data: keep placeholders that are already up.
            let (apps, origin) = match state.origin {
                CatalogOrigin::Fallback => (state.apps, CatalogOrigin::Fallback),
                _ => (Catalog::default(), CatalogOrigin::Pending),
            };
            ViewState {
                loading: false,
                error: Some(LOAD_FAILURE_MESSAGE.to_string()),
                apps,
                origin,
                ..state
            }
        }
        Event::FallbackElapsed if state.apps.is_empty() => ViewState {
            apps: Catalog::fallback(),
            origin: CatalogOrigin::Fallback,
            ..state
        },
        Event::FallbackElapsed => state,
        Event::InstallSucceeded { name } => ViewState {
            notice: Some(install_notice_message(&name)),
            ..state
        },
        Event::InstallFailed { name } => ViewState {
            error: Some(install_error_message(&name)),
            ..state
        },
        Event::OpenUrlFailed { url } => ViewState {
            error: Some(format!("Could not open {url}")),
            ..state
        },
        Event::DismissError => ViewState {
            error: None,
            ..state
        },
        Event::DismissNotice => ViewState {
            notice: None,
            ..state
        },
        Event::ToggleTheme => ViewState {
            theme: state.theme.toggled(),
            ..state
        },
    }
}

/// Messages sent from background tasks to the UI loop.
#[derive(Debug)]
pub enum Message {
    /// A catalog loader event, tagged with the activation that produced it.
    Catalog { generation: u64, event: Event },
    /// A detail resolution, tagged with the detail view that requested it.
    Detail { generation: u64, status: DetailStatus },
    /// An install outcome. Applies regardless of the current view.
    Install(Event),
}

#[cfg(test)]
mod tests {
    use super::*;
    use doohickey_catalog::Application;

    fn catalog(names: &[&str]) -> Catalog {
        Catalog::new(
            names
                .iter()
                .map(|name| Application {
                    name: name.to_string(),
                    ..Default::default()
                })
                .collect(),
        )
    }

    fn apply(events: impl IntoIterator<Item = Event>) -> ViewState {
        events.into_iter().fold(ViewState::default(), reduce)
    }

    #[test]
    fn initial_state() {
        let state = ViewState::default();
        assert!(state.loading);
        assert_eq!(state.error, None);
        assert_eq!(state.theme, Theme::Light);
        assert!(state.apps.is_empty());
    }

    #[test]
    fn fetch_success_replaces_apps_and_clears_loading() {
        let state = apply([Event::CatalogRequested, Event::CatalogLoaded(catalog(&["A"]))]);
        assert!(!state.loading);
        assert_eq!(state.apps, catalog(&["A"]));
        assert_eq!(state.origin, CatalogOrigin::Live);
    }

    #[test]
    fn fetch_failure_sets_error_and_empties_apps() {
        let state = apply([Event::CatalogRequested, Event::CatalogFailed]);
        assert!(!state.loading);
        assert_eq!(state.error.as_deref(), Some(LOAD_FAILURE_MESSAGE));
        assert!(state.apps.is_empty());
    }

    #[test]
    fn failure_on_reload_discards_previous_live_catalog() {
        let state = apply([
            Event::CatalogLoaded(catalog(&["A"])),
            Event::CatalogRequested,
            Event::CatalogFailed,
        ]);
        assert!(state.apps.is_empty());
    }

    #[test]
    fn fallback_fills_empty_list() {
        let state = apply([Event::CatalogRequested, Event::FallbackElapsed]);
        assert_eq!(state.apps, Catalog::fallback());
        assert_eq!(state.origin, CatalogOrigin::Fallback);
        assert!(state.loading, "fetch has not resolved yet");
    }

    #[test]
    fn fallback_never_overwrites_live_data() {
        let state = apply([
            Event::CatalogRequested,
            Event::CatalogLoaded(catalog(&["A"])),
            Event::FallbackElapsed,
        ]);
        assert_eq!(state.apps, catalog(&["A"]));
        assert_eq!(state.origin, CatalogOrigin::Live);
    }

    #[test]
    fn live_data_overwrites_fallback() {
        let state = apply([
            Event::CatalogRequested,
            Event::FallbackElapsed,
            Event::CatalogLoaded(catalog(&["A"])),
        ]);
        assert_eq!(state.apps, catalog(&["A"]));
        assert_eq!(state.origin, CatalogOrigin::Live);
    }

    #[test]
    fn fallback_after_failure_fills_list_and_keeps_error() {
        let state = apply([Event::CatalogRequested, Event::CatalogFailed, Event::FallbackElapsed]);
        assert_eq!(state.apps, Catalog::fallback());
        assert_eq!(state.error.as_deref(), Some(LOAD_FAILURE_MESSAGE));
    }

    #[test]
    fn fallback_fills_empty_live_catalog() {
        let state = apply([
            Event::CatalogRequested,
            Event::CatalogLoaded(Catalog::default()),
            Event::FallbackElapsed,
        ]);
        assert_eq!(state.apps, Catalog::fallback());
        assert!(!state.loading);
    }

    #[test]
    fn reload_keeps_live_list_and_skips_fallback() {
        let state = apply([Event::CatalogLoaded(catalog(&["A"])), Event::CatalogRequested]);
        assert!(state.loading);
        assert_eq!(state.apps, catalog(&["A"]));

        let state = reduce(state, Event::FallbackElapsed);
        assert_eq!(state.apps, catalog(&["A"]));
        assert_eq!(state.origin, CatalogOrigin::Live);

        let state = reduce(state, Event::CatalogLoaded(catalog(&["B"])));
        assert_eq!(state.apps, catalog(&["B"]));
        assert!(!state.loading);
    }

    #[test]
    fn failure_after_fallback_keeps_placeholders() {
        let state = apply([Event::CatalogRequested, Event::FallbackElapsed, Event::CatalogFailed]);
        assert_eq!(state.apps, Catalog::fallback());
        assert!(state.error.is_some());
    }

    #[test]
    fn install_failure_mentions_name_and_keeps_catalog() {
        let before = apply([Event::CatalogLoaded(catalog(&["A", "B"]))]);
        let after = reduce(before.clone(), Event::InstallFailed { name: "A".into() });
        assert!(after.error.as_deref().unwrap().contains('A'));
        assert_eq!(after.apps, before.apps);
        assert_eq!(after.loading, before.loading);
    }

    #[test]
    fn install_success_sets_notice() {
        let state = apply([Event::InstallSucceeded { name: "A".into() }]);
        assert_eq!(state.notice.as_deref(), Some("Installing A..."));
        assert_eq!(state.error, None);
    }

    #[test]
    fn latest_error_wins() {
        let state = apply([
            Event::CatalogFailed,
            Event::InstallFailed { name: "A".into() },
            Event::InstallFailed { name: "B".into() },
        ]);
        assert_eq!(state.error.as_deref(), Some("Error installing B"));
    }

    #[test]
    fn dismissing_absent_error_is_noop() {
        let before = ViewState::default();
        let after = reduce(before.clone(), Event::DismissError);
        assert_eq!(after, before);
    }

    #[test]
    fn dismissing_present_error_clears_it() {
        let state = apply([Event::CatalogFailed, Event::DismissError]);
        assert_eq!(state.error, None);
        let state = reduce(state, Event::DismissError);
        assert_eq!(state.error, None);
    }

    #[test]
    fn dismiss_notice_leaves_error() {
        let state = apply([
            Event::InstallSucceeded { name: "A".into() },
            Event::InstallFailed { name: "B".into() },
            Event::DismissNotice,
        ]);
        assert_eq!(state.notice, None);
        assert!(state.error.is_some());
    }

    #[test]
    fn theme_toggles_back_and_forth() {
        let state = apply([Event::ToggleTheme]);
        assert_eq!(state.theme, Theme::Dark);
        let state = reduce(state, Event::ToggleTheme);
        assert_eq!(state.theme, Theme::Light);
    }
}
