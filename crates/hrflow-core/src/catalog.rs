use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::CatalogConfig;

/// One kind of automated action an Automated node can reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionSpec {
    /// Catalog id stored in `AutomatedData::action`.
    pub id: String,
    /// Human-readable name shown in the simulation log.
    pub label: String,
    #[serde(default)]
    pub description: String,
    /// Parameter names in declaration order.
    #[serde(default)]
    pub params: Vec<String>,
}

impl ActionSpec {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        description: impl Into<String>,
        params: &[&str],
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: description.into(),
            params: params.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// Registry of automated actions, kept in registration order.
#[derive(Debug, Clone, Default)]
pub struct ActionCatalog {
    actions: Vec<ActionSpec>,
}

impl ActionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with the stock HR actions.
    pub fn with_builtins() -> Self {
        let mut catalog = Self::new();
        catalog.register(ActionSpec::new(
            "send_email",
            "Send Email",
            "Send automated email notification",
            &["to", "subject", "body", "template"],
        ));
        catalog.register(ActionSpec::new(
            "generate_doc",
            "Generate Document",
            "Generate and store document",
            &["template", "recipient", "data_source"],
        ));
        catalog.register(ActionSpec::new(
            "update_hr_system",
            "Update HR System",
            "Update employee records in HR system",
            &["employee_id", "field", "value", "effective_date"],
        ));
        catalog.register(ActionSpec::new(
            "send_notification",
            "Send Notification",
            "Send notification via various channels",
            &["channel", "message", "recipients"],
        ));
        catalog.register(ActionSpec::new(
            "create_task",
            "Create Task",
            "Create follow-up task",
            &["assignee", "title", "description", "due_date"],
        ));
        catalog.register(ActionSpec::new(
            "update_status",
            "Update Status",
            "Update workflow status",
            &["status", "message", "notify_users"],
        ));
        catalog
    }

    /// Build the catalog described by the `[catalog]` config section.
    pub fn from_config(config: &CatalogConfig) -> Self {
        let mut catalog = if config.include_builtins {
            Self::with_builtins()
        } else {
            Self::new()
        };
        for spec in &config.actions {
            catalog.register(spec.clone());
        }
        catalog
    }

    /// Register an action. An existing entry with the same id is replaced
    /// in place.
    pub fn register(&mut self, spec: ActionSpec) {
        match self.actions.iter_mut().find(|a| a.id == spec.id) {
            Some(existing) => {
                debug!(action = %spec.id, "Replacing catalog entry");
                *existing = spec;
            }
            None => self.actions.push(spec),
        }
    }

    pub fn get(&self, id: &str) -> Option<&ActionSpec> {
        self.actions.iter().find(|a| a.id == id)
    }

    pub fn label(&self, id: &str) -> Option<&str> {
        self.get(id).map(|a| a.label.as_str())
    }

    pub fn list(&self) -> &[ActionSpec] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins() {
        let catalog = ActionCatalog::with_builtins();
        assert_eq!(catalog.len(), 6);
        assert_eq!(catalog.label("generate_doc"), Some("Generate Document"));
        assert_eq!(
            catalog.get("send_email").unwrap().params,
            vec!["to", "subject", "body", "template"]
        );
        assert!(catalog.get("launch_rocket").is_none());
    }

    #[test]
    fn test_register_replaces_in_place() {
        let mut catalog = ActionCatalog::with_builtins();
        catalog.register(ActionSpec::new("send_email", "Email (SMTP)", "", &["to"]));
        assert_eq!(catalog.len(), 6);
        assert_eq!(catalog.list()[0].label, "Email (SMTP)");
        assert_eq!(catalog.list()[0].params, vec!["to"]);
    }

    #[test]
    fn test_from_config() {
        let config = CatalogConfig {
            include_builtins: false,
            actions: vec![ActionSpec::new("provision_laptop", "Provision Laptop", "", &["model"])],
        };
        let catalog = ActionCatalog::from_config(&config);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.label("provision_laptop"), Some("Provision Laptop"));
        assert!(catalog.get("send_email").is_none());
    }
}
