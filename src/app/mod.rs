//! Application-level modules for the viewer.

mod app_state;
mod application_coordinator;
mod settings_coordinator;

pub use app_state::{AppState, PanelMode};
pub use application_coordinator::ApplicationCoordinator;
pub use settings_coordinator::SettingsCoordinator;
