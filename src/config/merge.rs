//! Option layer merge logic
//!
//! Option names are flat dotted keys, so a layer is a single JSON object:
//! - Keys present in a later layer replace earlier values entirely
//! - Arrays REPLACE (no concatenation)
//! - `null` resets the key to "unset" (e.g. `native.c.flags`)

use serde_json::{Map, Value};

/// One layer of option values keyed by option name.
pub type OptionLayer = Map<String, Value>;

/// Merge layers in order (first is base, last has highest precedence).
pub fn merge_layers<'a, I>(layers: I) -> OptionLayer
where
    I: IntoIterator<Item = &'a OptionLayer>,
{
    let mut merged = OptionLayer::new();
    for layer in layers {
        for (key, value) in layer {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

/// Effective options for one target: global values overridden per target.
pub fn merge_options(global: &OptionLayer, overrides: &OptionLayer) -> OptionLayer {
    merge_layers([global, overrides])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn layer(value: Value) -> OptionLayer {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn test_override_wins() {
        let global = layer(json!({"native.compilers": "gcc"}));
        let target = layer(json!({"native.compilers": "clang"}));
        let merged = merge_options(&global, &target);
        assert_eq!(merged["native.compilers"], "clang");
    }

    #[test]
    fn test_arrays_replace() {
        let global = layer(json!({"native.cxx.flags": ["-O2", "-Wall"]}));
        let target = layer(json!({"native.cxx.flags": ["-O0"]}));
        let merged = merge_options(&global, &target);
        assert_eq!(merged["native.cxx.flags"], json!(["-O0"]));
    }

    #[test]
    fn test_untouched_keys_preserved() {
        let global = layer(json!({"native.libs": ["m"], "native.include": ["inc"]}));
        let target = layer(json!({"native.libs": ["pthread"]}));
        let merged = merge_options(&global, &target);
        assert_eq!(merged["native.include"], json!(["inc"]));
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_null_resets() {
        let global = layer(json!({"native.c.flags": ["-std=c99"]}));
        let target = layer(json!({"native.c.flags": null}));
        assert!(merge_options(&global, &target)["native.c.flags"].is_null());
    }

    #[test]
    fn test_merge_layers_order() {
        let builtin = layer(json!({"native.compilers": "gcc", "native.libs": []}));
        let file = layer(json!({"native.compilers": "clang"}));
        let api = layer(json!({"native.libs": ["z"]}));

        let merged = merge_layers([&builtin, &file, &api]);
        assert_eq!(merged["native.compilers"], "clang");
        assert_eq!(merged["native.libs"], json!(["z"]));
    }

    #[test]
    fn test_merge_does_not_mutate_inputs() {
        let global = layer(json!({"native.libs": ["m"]}));
        let target = layer(json!({"native.libs": ["z"]}));
        let _ = merge_options(&global, &target);
        assert_eq!(global["native.libs"], json!(["m"]));
    }
}
