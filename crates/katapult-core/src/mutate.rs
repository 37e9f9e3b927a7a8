use serde::Serialize;

use crate::{AttributeValue, Attributes, NewAttributes, Node};

/// How new attributes are applied to a matched node.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Operation {
    #[default]
    Add,
    Update,
    Remove,
    /// Any other tag. Nodes are left out of the results entirely.
    Other(String),
}

impl Operation {
    pub fn as_str(&self) -> &str {
        match self {
            Operation::Add => "add",
            Operation::Update => "update",
            Operation::Remove => "remove",
            Operation::Other(tag) => tag,
        }
    }
}

impl From<&str> for Operation {
    fn from(tag: &str) -> Self {
        match tag {
            "add" => Operation::Add,
            "update" => Operation::Update,
            "remove" => Operation::Remove,
            other => Operation::Other(other.to_string()),
        }
    }
}

/// Request body for the upstream node update call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchBody {
    AddAttributes(NewAttributes),
    /// The node's full attribute map after the update, not a partial patch.
    Attributes(Attributes),
    RemoveAttributes(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PatchOutcome {
    Patch(PatchBody),
    /// Nothing to send; the node is reported as it is.
    Unchanged,
    /// Unknown operation; the node is dropped from the results.
    Skipped,
}

pub fn build_patch(node: &Node, new_attributes: &NewAttributes, operation: &Operation) -> PatchOutcome {
    match operation {
        Operation::Add => PatchOutcome::Patch(PatchBody::AddAttributes(new_attributes.clone())),
        Operation::Update => update_patch(node, new_attributes),
        Operation::Remove => remove_patch(node, new_attributes),
        Operation::Other(_) => PatchOutcome::Skipped,
    }
}

/// Overwrites attributes the node already has. Instance-maps get the new
/// value under every instance id; keys the node lacks are ignored.
fn update_patch(node: &Node, new_attributes: &NewAttributes) -> PatchOutcome {
    let mut merged = node.attributes.clone().unwrap_or_default();
    let mut applied = 0usize;

    for (key, value) in new_attributes.iter() {
        let Some(existing) = merged.get_mut(key) else {
            continue;
        };
        match *existing {
            AttributeValue::InstanceMap(ref mut instances) => {
                for slot in instances.values_mut() {
                    *slot = value.clone();
                }
            }
            AttributeValue::Scalar(_) => *existing = AttributeValue::from(value.clone()),
        }
        applied += 1;
    }

    if applied == 0 {
        PatchOutcome::Unchanged
    } else {
        PatchOutcome::Patch(PatchBody::Attributes(merged))
    }
}

fn remove_patch(node: &Node, new_attributes: &NewAttributes) -> PatchOutcome {
    let present: Vec<String> = new_attributes
        .keys()
        .filter(|key| node.attribute(key).is_some())
        .cloned()
        .collect();

    if present.is_empty() {
        PatchOutcome::Unchanged
    } else {
        PatchOutcome::Patch(PatchBody::RemoveAttributes(present))
    }
}
