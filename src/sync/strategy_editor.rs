use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::debounce::Debouncer;
use crate::models::{StrategyDocument, StrategyPayload};
use crate::store::{StoreError, TradeStore};

pub const AUTOSAVE_DELAY: Duration = Duration::from_millis(2000);

#[derive(Debug, Default)]
struct EditorState {
    id: Option<String>,
    strategy: String,
    notes: String,
    last_saved: Option<DateTime<Utc>>,
    saving: bool,
    revision: u64,
    saved_revision: u64,
}

/// Editor for the singleton strategy/notes document.
///
/// Edits only touch the local draft and restart the autosave timer; the
/// draft is written once edits pause for [`AUTOSAVE_DELAY`]. The first save
/// inserts the row, later saves update it by id. Saves never overlap.
#[derive(Clone)]
pub struct StrategyEditor {
    store: Arc<dyn TradeStore>,
    state: Arc<Mutex<EditorState>>,
    save_lock: Arc<tokio::sync::Mutex<()>>,
    debouncer: Debouncer,
}

impl StrategyEditor {
    pub fn new(store: Arc<dyn TradeStore>) -> Self {
        Self::with_delay(store, AUTOSAVE_DELAY)
    }

    pub fn with_delay(store: Arc<dyn TradeStore>, delay: Duration) -> Self {
        Self {
            store,
            state: Arc::new(Mutex::new(EditorState::default())),
            save_lock: Arc::new(tokio::sync::Mutex::new(())),
            debouncer: Debouncer::new(delay),
        }
    }

    fn state(&self) -> MutexGuard<'_, EditorState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Loads the stored document into the draft. An empty table leaves the
    /// draft blank. Loading never schedules a save.
    pub async fn load(&self) -> Result<(), StoreError> {
        let doc = self.store.fetch_strategy().await.inspect_err(|e| {
            log::error!("Error fetching strategy: {}", e);
        })?;

        let mut state = self.state();
        match doc {
            Some(doc) => {
                state.strategy = doc.strategy.unwrap_or_default();
                state.notes = doc.notes.unwrap_or_default();
                state.last_saved = doc.updated_at;
                state.id = Some(doc.id);
            }
            None => log::info!("No strategy document stored yet"),
        }
        state.saved_revision = state.revision;
        Ok(())
    }

    pub fn strategy(&self) -> String {
        self.state().strategy.clone()
    }

    pub fn notes(&self) -> String {
        self.state().notes.clone()
    }

    pub fn id(&self) -> Option<String> {
        self.state().id.clone()
    }

    pub fn last_saved(&self) -> Option<DateTime<Utc>> {
        self.state().last_saved
    }

    pub fn is_saving(&self) -> bool {
        self.state().saving
    }

    pub fn has_unsaved_changes(&self) -> bool {
        let state = self.state();
        state.revision != state.saved_revision
    }

    pub fn edit_strategy(&self, text: impl Into<String>) {
        {
            let mut state = self.state();
            state.strategy = text.into();
            state.revision += 1;
        }
        self.schedule_save();
    }

    pub fn edit_notes(&self, text: impl Into<String>) {
        {
            let mut state = self.state();
            state.notes = text.into();
            state.revision += 1;
        }
        self.schedule_save();
    }

    fn schedule_save(&self) {
        let editor = self.clone();
        self.debouncer.schedule(async move {
            // failure is logged inside; the draft stays for the next edit
            let _ = editor.save_pending().await;
        });
    }

    /// Cancels the waiting timer and saves the draft now if it has changes.
    pub async fn flush(&self) -> Result<Option<StrategyDocument>, StoreError> {
        self.debouncer.cancel();
        self.save_pending().await
    }

    /// Saves the draft if it changed since the last successful save.
    async fn save_pending(&self) -> Result<Option<StrategyDocument>, StoreError> {
        let _guard = self.save_lock.lock().await;

        let (id, payload, revision) = {
            let mut state = self.state();
            if state.revision == state.saved_revision {
                return Ok(None);
            }
            state.saving = true;
            (
                state.id.clone(),
                StrategyPayload {
                    strategy: state.strategy.clone(),
                    notes: state.notes.clone(),
                    updated_at: Utc::now(),
                },
                state.revision,
            )
        };
        let saved_at = payload.updated_at;

        let result = match &id {
            Some(id) => self.store.update_strategy(id, payload).await,
            None => self.store.insert_strategy(payload).await,
        };

        let mut state = self.state();
        state.saving = false;
        match result {
            Ok(doc) => {
                state.id = Some(doc.id.clone());
                state.last_saved = Some(saved_at);
                state.saved_revision = revision;
                log::info!("Strategy saved at {}", saved_at.format("%H:%M:%S"));
                Ok(Some(doc))
            }
            Err(e) => {
                log::error!("Error saving strategy: {}", e);
                Err(e)
            }
        }
    }
}
