//! Build-request assembly for the "build feature" action.
//!
//! The build/agent service sits behind a persistent bidirectional connection
//! owned by the caller; this module only assembles the payload: the resolved
//! ancestor chain (flow → high-level → low-level requirement) plus every
//! test case sharing the low-level requirement.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::builder::top_level_items;
use crate::{fields, Item, Level};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RequirementRef {
    pub uiid: String,
    pub display_name: String,
    pub description: String,
}

impl RequirementRef {
    fn of(item: &Item) -> RequirementRef {
        RequirementRef {
            uiid: item.uiid.clone(),
            display_name: item.display_name.clone(),
            description: item.description.clone(),
        }
    }
}

/// The structured request handed to the build service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BuildRequest {
    pub project_uiid: String,
    pub flow: RequirementRef,
    pub high_level: RequirementRef,
    pub low_level: RequirementRef,
    pub test_cases: Vec<RequirementRef>,
}

/// Walk the tree for the low-level requirement with `llr_uiid` and bundle
/// its ancestor chain and sibling test cases. `None` when the uiid does not
/// resolve.
pub fn assemble_build_request(
    tree: &Value,
    project_uiid: &str,
    llr_uiid: &str,
) -> Option<BuildRequest> {
    for flow in top_level_items(tree) {
        for high in children_of(&flow, Level::HighLevel) {
            for low in children_of(high, Level::LowLevel) {
                if low.uiid != llr_uiid {
                    continue;
                }
                let test_cases = children_of(low, Level::TestCase)
                    .iter()
                    .map(|t| RequirementRef::of(t))
                    .collect();
                return Some(BuildRequest {
                    project_uiid: project_uiid.to_string(),
                    flow: RequirementRef::of(&flow),
                    high_level: RequirementRef::of(high),
                    low_level: RequirementRef::of(low),
                    test_cases,
                });
            }
        }
    }
    None
}

fn children_of(item: &Item, level: Level) -> &[Item] {
    fields::select_relation(&item.children, level)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tree() -> Value {
        json!({
            "uiid": "proj-1",
            "flows": [{
                "uiid": "f1", "parent_uiid": "proj-1", "name": "Checkout",
                "description": "Buy things",
                "high_level_requirements": [{
                    "uiid": "h1", "parent_uiid": "f1", "name": "Payment",
                    "low_level_requirements": [{
                        "uiid": "l1", "parent_uiid": "h1", "name": "Charge card",
                        "test_cases": [
                            {"uiid": "t1", "parent_uiid": "l1", "name": "Valid card"},
                            {"uiid": "t2", "parent_uiid": "l1", "name": "Declined card"},
                        ],
                    }],
                }],
            }]
        })
    }

    #[test]
    fn resolves_the_full_ancestor_chain() {
        let req = assemble_build_request(&tree(), "proj-1", "l1").unwrap();
        assert_eq!(req.project_uiid, "proj-1");
        assert_eq!(req.flow.uiid, "f1");
        assert_eq!(req.flow.display_name, "Checkout");
        assert_eq!(req.high_level.uiid, "h1");
        assert_eq!(req.low_level.uiid, "l1");
        let names: Vec<&str> = req.test_cases.iter().map(|t| t.display_name.as_str()).collect();
        assert_eq!(names, vec!["Valid card", "Declined card"]);
    }

    #[test]
    fn unknown_llr_resolves_to_none() {
        assert!(assemble_build_request(&tree(), "proj-1", "l9").is_none());
    }

    #[test]
    fn llr_without_test_cases_still_builds() {
        let tree = json!({
            "uiid": "proj-1",
            "flows": [{
                "uiid": "f1", "parent_uiid": "proj-1", "name": "Flow",
                "high_level_requirements": [{
                    "uiid": "h1", "parent_uiid": "f1", "name": "HLR",
                    "low_level_requirements": [
                        {"uiid": "l1", "parent_uiid": "h1", "name": "LLR"}
                    ],
                }],
            }]
        });
        let req = assemble_build_request(&tree, "proj-1", "l1").unwrap();
        assert!(req.test_cases.is_empty());
    }
}
