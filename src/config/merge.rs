//! Layered configuration merge.
//!
//! Layers are applied in order: built-in defaults, the config file, then
//! command-line overrides. Tables merge key by key; any other value in a later
//! layer replaces the earlier one.

use serde_json::Value;

/// Merge `overlay` on top of `base`.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// Merge layers in order; the last layer has the highest precedence.
pub fn merge_layers(layers: Vec<Value>) -> Value {
    layers
        .into_iter()
        .fold(Value::Object(serde_json::Map::new()), deep_merge)
}

/// Convert a parsed TOML document into a JSON value for merging.
pub fn toml_to_json(toml: toml::Value) -> Value {
    match toml {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(arr) => Value::Array(arr.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cli_overrides_file_value() {
        let file = json!({"settings": {"versions_to_keep": 3, "emerge_module_rebuild": true}});
        let cli = json!({"settings": {"versions_to_keep": 1}});
        let result = deep_merge(file, cli);

        assert_eq!(result["settings"]["versions_to_keep"], 1);
        assert_eq!(result["settings"]["emerge_module_rebuild"], true);
    }

    #[test]
    fn test_defaults_fill_missing_keys() {
        let defaults = json!({"settings": {"local_version": "gentoo"}});
        let file = json!({
            "paths": {"install_path": "/boot"},
            "settings": {"versions_to_keep": 2}
        });
        let result = merge_layers(vec![defaults, file]);

        assert_eq!(result["paths"]["install_path"], "/boot");
        assert_eq!(result["settings"]["local_version"], "gentoo");
        assert_eq!(result["settings"]["versions_to_keep"], 2);
    }

    #[test]
    fn test_file_overrides_default() {
        let defaults = json!({"settings": {"local_version": "gentoo"}});
        let file = json!({"settings": {"local_version": "dist"}});
        let result = merge_layers(vec![defaults, file, json!({})]);

        assert_eq!(result["settings"]["local_version"], "dist");
    }

    #[test]
    fn test_merge_no_layers_is_empty_table() {
        assert_eq!(merge_layers(Vec::new()), json!({}));
    }

    #[test]
    fn test_toml_to_json() {
        let doc: toml::Value = toml::from_str(
            r#"
            [paths]
            install_path = "/boot"

            [settings]
            versions_to_keep = 2
            regenerate_grub_config = false
            "#,
        )
        .unwrap();

        let value = toml_to_json(doc);
        assert_eq!(value["paths"]["install_path"], "/boot");
        assert_eq!(value["settings"]["versions_to_keep"], 2);
        assert_eq!(value["settings"]["regenerate_grub_config"], false);
    }
}
