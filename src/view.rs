//! State machine behind the equipment screen.
//!
//! `Loading -> Ready | Empty | Failed`. `Empty` and `Failed` offer an action that
//! goes back through `Loading`; `Ready` can refresh while keeping the current sheet
//! on screen. Only one fetch runs at a time, and results that arrive after
//! `unmount()` are dropped.

use crate::loader::{EquipmentLoader, LoadError};
use crate::models::AssignedItem;
use crate::normalize::{NormalizeOptions, normalize_with};
use crate::presentation::{
    EquipmentSheet, MSG_LOAD_FAILED, MSG_NO_ITEMS, MSG_NO_RECORD, ViewAction,
};
use crate::store::DocumentStore;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyReason {
    /// No document matched the player
    NoRecord,
    /// A document exists but lists nothing
    NoItems,
}

impl EmptyReason {
    pub fn message(self) -> &'static str {
        match self {
            EmptyReason::NoRecord => MSG_NO_RECORD,
            EmptyReason::NoItems => MSG_NO_ITEMS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ViewState {
    Loading,
    Ready {
        items: Vec<AssignedItem>,
        sheet: EquipmentSheet,
        refreshing: bool,
    },
    Empty {
        reason: EmptyReason,
        /// Header of the record, when there is one
        sheet: Option<EquipmentSheet>,
    },
    Failed {
        message: String,
        retryable: bool,
    },
}

impl ViewState {
    /// Action button shown with this state, if any.
    ///
    /// A failure that would repeat on the same data (ambiguous or malformed
    /// record, bad player id) offers a refresh instead of a retry.
    pub fn action(&self) -> Option<ViewAction> {
        match self {
            ViewState::Loading | ViewState::Ready { .. } => None,
            ViewState::Empty { .. } => Some(ViewAction::Refresh),
            ViewState::Failed {
                retryable: true, ..
            } => Some(ViewAction::Retry),
            ViewState::Failed {
                retryable: false, ..
            } => Some(ViewAction::Refresh),
        }
    }

    pub fn items(&self) -> &[AssignedItem] {
        match self {
            ViewState::Ready { items, .. } => items,
            _ => &[],
        }
    }
}

/// Flat status flags for callers that do not match on `ViewState`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewStatus {
    pub loading: bool,
    pub refreshing: bool,
    pub error: Option<String>,
    pub empty: bool,
    pub item_count: usize,
}

impl From<&ViewState> for ViewStatus {
    fn from(state: &ViewState) -> Self {
        match state {
            ViewState::Loading => ViewStatus {
                loading: true,
                refreshing: false,
                error: None,
                empty: false,
                item_count: 0,
            },
            ViewState::Ready {
                items, refreshing, ..
            } => ViewStatus {
                loading: false,
                refreshing: *refreshing,
                error: None,
                empty: false,
                item_count: items.len(),
            },
            ViewState::Empty { .. } => ViewStatus {
                loading: false,
                refreshing: false,
                error: None,
                empty: true,
                item_count: 0,
            },
            ViewState::Failed { message, .. } => ViewStatus {
                loading: false,
                refreshing: false,
                error: Some(message.clone()),
                empty: false,
                item_count: 0,
            },
        }
    }
}

/// What happened to a fetch request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Result published
    Applied,
    /// Another fetch was in flight, or the view is gone
    Skipped,
    /// Fetch finished after unmount; result dropped
    Discarded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Mount,
    Retry,
    Refresh,
}

/// Held for the duration of one fetch. Clears the in-flight flag however the
/// fetch future ends; if it is dropped before publishing (timeout, `select!`,
/// aborted task) the placeholder state it left behind is settled so the view
/// can be retried.
struct InFlight<'a> {
    flag: &'a AtomicBool,
    mounted: &'a AtomicBool,
    state: &'a watch::Sender<ViewState>,
    settled: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
        if self.settled || !self.mounted.load(Ordering::Acquire) {
            return;
        }
        warn!("equipment fetch cancelled before completing");
        self.state.send_if_modified(|state| match state {
            ViewState::Loading => {
                *state = ViewState::Failed {
                    message: MSG_LOAD_FAILED.to_string(),
                    retryable: true,
                };
                true
            }
            ViewState::Ready { refreshing, .. } if *refreshing => {
                *refreshing = false;
                true
            }
            _ => false,
        });
    }
}

pub struct EquipmentView<S: ?Sized> {
    loader: EquipmentLoader<S>,
    player_id: String,
    options: NormalizeOptions,
    state: watch::Sender<ViewState>,
    in_flight: AtomicBool,
    mounted: AtomicBool,
}

impl<S: DocumentStore + ?Sized> EquipmentView<S> {
    pub fn new(
        loader: EquipmentLoader<S>,
        player_id: impl Into<String>,
        options: NormalizeOptions,
    ) -> Self {
        let (state, _) = watch::channel(ViewState::Loading);
        Self {
            loader,
            player_id: player_id.into(),
            options,
            state,
            in_flight: AtomicBool::new(false),
            mounted: AtomicBool::new(true),
        }
    }

    pub fn player_id(&self) -> &str {
        &self.player_id
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> ViewState {
        self.state.borrow().clone()
    }

    pub fn status(&self) -> ViewStatus {
        ViewStatus::from(&*self.state.borrow())
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Initial fetch when the screen opens
    pub async fn load(&self) -> FetchOutcome {
        self.run_fetch(Trigger::Mount).await
    }

    /// Start over from `Loading`; what was on screen is cleared
    pub async fn retry(&self) -> FetchOutcome {
        self.run_fetch(Trigger::Retry).await
    }

    /// Re-fetch keeping the current sheet visible until the new result lands
    pub async fn refresh(&self) -> FetchOutcome {
        self.run_fetch(Trigger::Refresh).await
    }

    /// The screen is gone: freeze state and drop any result still on its way
    pub fn unmount(&self) {
        self.mounted.store(false, Ordering::Release);
    }

    async fn run_fetch(&self, trigger: Trigger) -> FetchOutcome {
        if !self.mounted.load(Ordering::Acquire) {
            return FetchOutcome::Skipped;
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(player_id = %self.player_id, ?trigger, "fetch already in flight, ignoring");
            return FetchOutcome::Skipped;
        }
        let mut guard = InFlight {
            flag: &self.in_flight,
            mounted: &self.mounted,
            state: &self.state,
            settled: false,
        };

        self.state.send_modify(|state| {
            let previous = std::mem::replace(state, ViewState::Loading);
            if let (Trigger::Refresh, ViewState::Ready { items, sheet, .. }) = (trigger, previous) {
                *state = ViewState::Ready {
                    items,
                    sheet,
                    refreshing: true,
                };
            }
        });

        let result = self.loader.fetch(&self.player_id).await;
        let next = self.resolve(result);
        guard.settled = true;
        drop(guard);

        if !self.mounted.load(Ordering::Acquire) {
            debug!(player_id = %self.player_id, "view unmounted, discarding late result");
            return FetchOutcome::Discarded;
        }

        self.state.send_replace(next);
        FetchOutcome::Applied
    }

    fn resolve(&self, result: Result<crate::models::EquipmentRecord, LoadError>) -> ViewState {
        match result {
            Ok(record) => {
                let items = normalize_with(&record, &self.options);
                let sheet = EquipmentSheet::build(&record, &items);
                if items.is_empty() {
                    ViewState::Empty {
                        reason: EmptyReason::NoItems,
                        sheet: Some(sheet),
                    }
                } else {
                    info!(player_id = %self.player_id, count = items.len(), "equipment ready");
                    ViewState::Ready {
                        items,
                        sheet,
                        refreshing: false,
                    }
                }
            }
            Err(LoadError::NotFound { .. }) => ViewState::Empty {
                reason: EmptyReason::NoRecord,
                sheet: None,
            },
            Err(e) => ViewState::Failed {
                message: e.user_message().to_string(),
                retryable: e.is_retryable(),
            },
        }
    }
}
