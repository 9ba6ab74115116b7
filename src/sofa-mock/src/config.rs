use serde::{Deserialize, Serialize};

use crate::store::{field_view, MockStore};

/// Settings for the standalone mock server binary
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MockConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Directory for the JSON log file; empty disables file logging
    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    /// Views keyed on one document field, registered for every database
    #[serde(default)]
    pub views: Vec<FieldViewConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FieldViewConfig {
    pub design: String,
    pub view: String,
    /// Document field emitted as the row key
    pub key: String,
}

fn default_bind() -> String {
    "127.0.0.1:5984".to_string()
}

fn default_log_dir() -> String {
    "./logs".to_string()
}

impl MockConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: MockConfig = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Empty store with the configured views registered
    pub fn store(&self) -> MockStore {
        let mut store = MockStore::new();
        for view in &self.views {
            store.register_view(&view.design, &view.view, field_view(&view.key));
        }
        store
    }
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            log_dir: default_log_dir(),
            views: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_config_defaults() {
        let config: MockConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.bind, "127.0.0.1:5984");
        assert_eq!(config.log_dir, "./logs");
        assert!(config.views.is_empty());
    }

    #[test]
    fn test_configured_views_are_registered() {
        let config: MockConfig = serde_json::from_str(
            r#"{"views": [{"design": "app", "view": "by_name", "key": "name"}]}"#,
        )
        .unwrap();

        let mut store = config.store();
        store.create_database("tests").unwrap();
        store.put_document("tests", "doc1", json!({"name": "a"})).unwrap();

        let rows = store.query_view("tests", "app", "by_name", None, None).unwrap();
        assert_eq!(rows.rows.len(), 1);
        assert_eq!(rows.rows[0].key, json!("a"));
    }
}
