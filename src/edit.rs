use std::path::Path;

use serde_json::{Map, Value};
use tracing::debug;

use hrflow_graph::{parse_document, to_json, GraphStore};

/// Read a workflow document into a store.
pub fn load(path: &Path) -> anyhow::Result<GraphStore> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("cannot read {}: {}", path.display(), e))?;
    let doc = parse_document(&text)?;
    Ok(GraphStore::from_document(&doc)?)
}

/// Export the store back to `path`.
pub fn save(path: &Path, store: &GraphStore) -> anyhow::Result<()> {
    let mut json = to_json(&store.to_document())?;
    json.push('\n');
    std::fs::write(path, json)?;
    debug!(path = %path.display(), nodes = store.nodes().len(), "Workflow saved");
    Ok(())
}

/// Turn `key=value` arguments into an attribute patch.
///
/// Values are read as JSON when they parse (`48`, `true`, `{"to": "x"}`),
/// otherwise taken as plain strings.
pub fn parse_assignments(pairs: &[String]) -> anyhow::Result<Map<String, Value>> {
    let mut patch = Map::new();
    for pair in pairs {
        let Some((key, raw)) = pair.split_once('=') else {
            anyhow::bail!("expected key=value, got '{}'", pair);
        };
        let key = key.trim();
        if key.is_empty() {
            anyhow::bail!("missing attribute name in '{}'", pair);
        }
        let value =
            serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        patch.insert(key.to_string(), value);
    }
    Ok(patch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_json_and_plain_values() {
        let patch = parse_assignments(&args(&[
            "assignee=Alice",
            "autoApproveThreshold=48",
            "notifyUsers=true",
            "params={\"to\": \"hr@example.com\"}",
        ]))
        .unwrap();
        assert_eq!(patch["assignee"], json!("Alice"));
        assert_eq!(patch["autoApproveThreshold"], json!(48));
        assert_eq!(patch["notifyUsers"], json!(true));
        assert_eq!(patch["params"], json!({"to": "hr@example.com"}));
    }

    #[test]
    fn test_value_may_contain_equals() {
        let patch = parse_assignments(&args(&["description=a=b"])).unwrap();
        assert_eq!(patch["description"], json!("a=b"));
    }

    #[test]
    fn test_empty_value_is_empty_string() {
        let patch = parse_assignments(&args(&["assignee="])).unwrap();
        assert_eq!(patch["assignee"], json!(""));
    }

    #[test]
    fn test_malformed_pairs_rejected() {
        assert!(parse_assignments(&args(&["assignee"])).is_err());
        assert!(parse_assignments(&args(&["=Alice"])).is_err());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flow.json");

        let mut store = GraphStore::new("Offboarding");
        let task = store.add_node(hrflow_core::types::NodeKind::Task, None);
        save(&path, &store).unwrap();

        let loaded = load(&path).unwrap();
        assert_eq!(loaded.name(), "Offboarding");
        assert_eq!(loaded.workflow_id(), store.workflow_id());
        assert_eq!(loaded.nodes(), &[task][..]);
    }

    #[test]
    fn test_load_missing_file() {
        let err = load(Path::new("/nonexistent/flow.json")).unwrap_err();
        assert!(err.to_string().contains("cannot read"));
    }
}
