//! Field resolution for irregularly shaped backend items.
//!
//! Backend records do not follow a strict schema: the display field may be
//! `display_name`, `name`, or `title`; child collections are recognized by a
//! key suffix rather than a fixed name. The heuristics live here, behind pure
//! functions, so they can be unit-tested and swapped for a schema-driven
//! resolver later.

use serde_json::Value;
use std::collections::BTreeMap;

use crate::{Item, Level};

/// Keys that hold identifiers, never display text. Compared after
/// normalization, so underscores are already stripped.
const ID_KEYS: [&str; 4] = ["uiid", "uuid", "id", "parentuiid"];

const DISPLAY_KEYS: [&str; 4] = ["display_name", "displayName", "name", "title"];

/// Pick the display name: a well-known display key first, else the first
/// string-valued field that is not an identifier, else empty.
pub fn resolve_display(obj: &Value) -> String {
    let Some(map) = obj.as_object() else {
        return String::new();
    };
    for key in DISPLAY_KEYS {
        if let Some(s) = map.get(key).and_then(Value::as_str) {
            if !s.is_empty() {
                return s.to_string();
            }
        }
    }
    map.iter()
        .find(|(k, v)| {
            v.as_str().is_some_and(|s| !s.is_empty())
                && !ID_KEYS.contains(&normalize_key(k).as_str())
                && normalize_key(k) != "description"
        })
        .and_then(|(_, v)| v.as_str())
        .unwrap_or_default()
        .to_string()
}

pub fn resolve_description(obj: &Value) -> String {
    obj.get("description")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Lowercase and strip underscores, so `high_level_requirements` and
/// `highLevelRequirements` compare equal.
fn normalize_key(key: &str) -> String {
    key.to_lowercase().replace('_', "")
}

/// True when `key` names a child collection of `level`.
pub fn relation_matches(key: &str, level: Level) -> bool {
    normalize_key(key).ends_with(level.relation_suffix())
}

/// All child collections on an item: keys ending in a hierarchy suffix whose
/// value is an array of objects.
pub fn child_relations(obj: &Value) -> Vec<(String, Vec<Value>)> {
    let Some(map) = obj.as_object() else {
        return vec![];
    };
    let levels = [Level::Flow, Level::HighLevel, Level::TestCase];
    map.iter()
        .filter(|(key, value)| {
            let is_collection = value
                .as_array()
                .is_some_and(|a| a.iter().all(Value::is_object));
            is_collection && levels.iter().any(|l| relation_matches(key, *l))
        })
        .map(|(key, value)| (key.clone(), value.as_array().cloned().unwrap_or_default()))
        .collect()
}

/// Among an item's relations, pick the one feeding `level`, preferring a key
/// that carries the level's marker ("high"/"low") when several match.
pub fn select_relation<'a>(
    children: &'a BTreeMap<String, Vec<Item>>,
    level: Level,
) -> Option<&'a Vec<Item>> {
    let mut fallback = None;
    for (key, items) in children {
        if !relation_matches(key, level) {
            continue;
        }
        match level.relation_marker() {
            Some(marker) if normalize_key(key).contains(marker) => return Some(items),
            Some(_) => fallback = fallback.or(Some(items)),
            None => return Some(items),
        }
    }
    fallback
}

impl Item {
    /// Lenient projection of one backend record. `position` is the 0-based
    /// index within the containing collection, used when the record carries
    /// no sequence number of its own.
    pub fn from_value(value: &Value, position: usize) -> Item {
        let uiid = value
            .get("uiid")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let parent_uiid = value
            .get("parent_uiid")
            .or_else(|| value.get("parentUiid"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let sequence_number = value
            .get("sequence_number")
            .or_else(|| value.get("sequenceNumber"))
            .and_then(Value::as_u64)
            .unwrap_or(position as u64 + 1) as u32;

        let mut children = BTreeMap::new();
        for (relation, raw_children) in child_relations(value) {
            let items = raw_children
                .iter()
                .enumerate()
                .map(|(i, v)| Item::from_value(v, i))
                .collect();
            children.insert(relation, items);
        }

        Item {
            uiid,
            parent_uiid,
            display_name: resolve_display(value),
            description: resolve_description(value),
            sequence_number,
            children,
            raw: value.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn display_prefers_well_known_keys() {
        let v = json!({"uiid": "u1", "name": "Login", "title": "ignored"});
        assert_eq!(resolve_display(&v), "Login");
        let v = json!({"display_name": "Checkout", "name": "ignored"});
        assert_eq!(resolve_display(&v), "Checkout");
    }

    #[test]
    fn display_falls_back_to_first_string_field() {
        let v = json!({"uiid": "u1", "summary": "Search products", "weight": 3});
        assert_eq!(resolve_display(&v), "Search products");
    }

    #[test]
    fn display_never_picks_an_identifier() {
        let v = json!({"uiid": "u1", "parent_uiid": "u0"});
        assert_eq!(resolve_display(&v), "");
    }

    #[test]
    fn description_defaults_to_empty() {
        assert_eq!(resolve_description(&json!({"name": "x"})), "");
        assert_eq!(
            resolve_description(&json!({"description": "does things"})),
            "does things"
        );
    }

    #[test]
    fn relation_matching_tolerates_casing() {
        assert!(relation_matches("high_level_requirements", Level::HighLevel));
        assert!(relation_matches("highLevelRequirements", Level::HighLevel));
        assert!(relation_matches("testCases", Level::TestCase));
        assert!(relation_matches("flows", Level::Flow));
        assert!(!relation_matches("steps", Level::HighLevel));
    }

    #[test]
    fn select_relation_prefers_marker_match() {
        let item = Item::from_value(
            &json!({
                "uiid": "f1",
                "name": "Flow",
                "low_level_requirements": [{"uiid": "l1", "name": "llr"}],
                "high_level_requirements": [{"uiid": "h1", "name": "hlr"}]
            }),
            0,
        );
        let picked = select_relation(&item.children, Level::HighLevel).unwrap();
        assert_eq!(picked[0].uiid, "h1");
        let picked = select_relation(&item.children, Level::LowLevel).unwrap();
        assert_eq!(picked[0].uiid, "l1");
    }

    #[test]
    fn from_value_sequences_by_position_when_absent() {
        let item = Item::from_value(&json!({"uiid": "a", "name": "x"}), 4);
        assert_eq!(item.sequence_number, 5);
        let item = Item::from_value(&json!({"uiid": "a", "sequence_number": 2}), 4);
        assert_eq!(item.sequence_number, 2);
    }

    #[test]
    fn from_value_collects_nested_children() {
        let item = Item::from_value(
            &json!({
                "uiid": "f1",
                "name": "Signup",
                "high_level_requirements": [
                    {"uiid": "h1", "parent_uiid": "f1", "name": "Form",
                     "low_level_requirements": [
                         {"uiid": "l1", "parent_uiid": "h1", "name": "Validate email"}
                     ]}
                ]
            }),
            0,
        );
        let hlrs = &item.children["high_level_requirements"];
        assert_eq!(hlrs.len(), 1);
        assert_eq!(hlrs[0].children["low_level_requirements"][0].uiid, "l1");
    }
}
