//! Viewer settings persistence.
//!
//! Settings are stored in eframe's persistent storage as JSON strings, one
//! key per setting.

use serde::{Deserialize, Serialize};

pub struct SettingsCoordinator;

impl SettingsCoordinator {
    /// Loads a setting, falling back to `default` when it is missing or does
    /// not parse.
    pub fn load_setting_or<T>(storage: Option<&dyn eframe::Storage>, key: &str, default: T) -> T
    where
        T: for<'de> Deserialize<'de>,
    {
        let stored = storage.and_then(|storage| storage.get_string(key));
        match stored.map(|json| serde_json::from_str(&json)) {
            Some(Ok(value)) => value,
            Some(Err(err)) => {
                tracing::warn!(key, %err, "ignoring unreadable setting");
                default
            }
            None => default,
        }
    }

    /// Stores a setting and flushes the storage.
    pub fn save_setting<T>(storage: &mut dyn eframe::Storage, key: &str, value: &T)
    where
        T: Serialize,
    {
        match serde_json::to_string(value) {
            Ok(json) => {
                storage.set_string(key, json);
                storage.flush();
            }
            Err(err) => tracing::warn!(key, %err, "failed to serialize setting"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::PanelMode;
    use eframe::Storage;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MockStorage {
        data: HashMap<String, String>,
    }

    impl Storage for MockStorage {
        fn get_string(&self, key: &str) -> Option<String> {
            self.data.get(key).cloned()
        }

        fn set_string(&mut self, key: &str, value: String) {
            self.data.insert(key.to_string(), value);
        }

        fn flush(&mut self) {}
    }

    #[test]
    fn test_panel_mode_round_trip() {
        let mut storage = MockStorage::default();
        SettingsCoordinator::save_setting(&mut storage, "panel_mode", &PanelMode::Tree);

        let loaded = SettingsCoordinator::load_setting_or(Some(&storage), "panel_mode", PanelMode::List);
        assert_eq!(loaded, PanelMode::Tree);
    }

    #[test]
    fn test_missing_or_corrupt_setting_uses_default() {
        let mut storage = MockStorage::default();
        assert_eq!(
            SettingsCoordinator::load_setting_or(Some(&storage), "panel_mode", PanelMode::List),
            PanelMode::List
        );

        storage.set_string("panel_mode", "\"Sideways\"".to_string());
        assert_eq!(
            SettingsCoordinator::load_setting_or(Some(&storage), "panel_mode", PanelMode::Tree),
            PanelMode::Tree
        );
        assert_eq!(SettingsCoordinator::load_setting_or(None, "panel_mode", 7u32), 7);
    }
}
