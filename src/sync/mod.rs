pub mod debounce;
pub mod strategy_editor;

pub use debounce::Debouncer;
pub use strategy_editor::{StrategyEditor, AUTOSAVE_DELAY};
