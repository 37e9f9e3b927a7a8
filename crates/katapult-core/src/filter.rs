use serde_json::Value;

use crate::{AttributeFilter, AttributeValue, Node};

/// True when every filter entry equals the node's resolved attribute value.
///
/// Entries are checked in filter order and the first mismatch ends the check.
/// A missing attribute never matches, whatever the required value.
pub fn matches(node: &Node, filters: &AttributeFilter) -> bool {
    filters.iter().all(|(key, required)| {
        node.attribute(key)
            .and_then(AttributeValue::resolve)
            .is_some_and(|value| strict_equals(value, required))
    })
}

/// Keeps the nodes that match `filters`, in their original order.
pub fn filter_nodes(nodes: Vec<Node>, filters: &AttributeFilter) -> Vec<Node> {
    nodes
        .into_iter()
        .filter(|node| matches(node, filters))
        .collect()
}

/// Equality without type coercion: `"1"` is not `1`, but `1` is `1.0`.
/// Arrays and objects are never equal to anything.
pub fn strict_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Value::String(a), Value::String(b)) => a == b,
        _ => false,
    }
}
