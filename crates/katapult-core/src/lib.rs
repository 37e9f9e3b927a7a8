pub mod filter;
pub mod mutate;
pub mod photos;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub use filter::{filter_nodes, matches};
pub use mutate::{build_patch, Operation, PatchBody, PatchOutcome};
pub use photos::{join, JoinedPhoto, NodeWithPhotos, PhotoMetadata};

// --- Types (matching the upstream /api/v3 payloads) ---

/// A single attribute on a node.
///
/// Upstream stores multi-instance attributes (several annotators recording a
/// value for the same attribute) as an object keyed by an opaque instance id.
/// Any JSON object is treated as an instance-map; everything else is a scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    InstanceMap(Map<String, Value>),
    Scalar(Value),
}

impl AttributeValue {
    /// The value filters compare against.
    ///
    /// An instance-map resolves to the value under its first instance id in
    /// upstream order; later instances are not consulted. An empty map
    /// resolves to nothing.
    pub fn resolve(&self) -> Option<&Value> {
        match self {
            AttributeValue::InstanceMap(instances) => instances.values().next(),
            AttributeValue::Scalar(value) => Some(value),
        }
    }
}

impl From<Value> for AttributeValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(instances) => AttributeValue::InstanceMap(instances),
            other => AttributeValue::Scalar(other),
        }
    }
}

pub type Attributes = BTreeMap<String, AttributeValue>;

/// A node record as returned by the upstream node listing.
///
/// Fields the relay does not interpret are kept in `extra` so a node can be
/// handed back to the caller the way it was received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Attributes>,
    /// Associated photo ids as keys; the values carry no meaning here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photos: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Node {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            latitude: None,
            longitude: None,
            attributes: None,
            photos: None,
            extra: Map::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes
            .get_or_insert_with(Attributes::new)
            .insert(key.into(), AttributeValue::from(value.into()));
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.as_ref()?.get(key)
    }
}

/// The `data` field of a node listing.
///
/// Upstream returns either an array of nodes or an object keyed by node id;
/// both are flattened into a list, keyed objects in their received order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeCollection(pub Vec<Node>);

impl NodeCollection {
    pub fn into_nodes(self) -> Vec<Node> {
        self.0
    }
}

impl<'de> Deserialize<'de> for NodeCollection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Shape {
            List(Vec<Node>),
            Keyed(Map<String, Value>),
        }

        match Shape::deserialize(deserializer)? {
            Shape::List(nodes) => Ok(NodeCollection(nodes)),
            Shape::Keyed(by_id) => by_id
                .into_iter()
                .map(|(_, node)| serde_json::from_value(node))
                .collect::<Result<Vec<Node>, _>>()
                .map(NodeCollection)
                .map_err(serde::de::Error::custom),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub filename: Option<String>,
    /// Unix seconds.
    #[serde(default)]
    pub date_taken: Option<f64>,
    #[serde(default)]
    pub camera_model: Option<Value>,
    #[serde(default)]
    pub image_width: Option<Value>,
    #[serde(default)]
    pub image_height: Option<Value>,
    #[serde(default)]
    pub orientation: Option<Value>,
    #[serde(default)]
    pub uploaded_by: Option<Value>,
}

/// Attribute name to required value. Entries are checked in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeFilter(Map<String, Value>);

impl AttributeFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, required: impl Into<Value>) -> Self {
        self.insert(key, required);
        self
    }

    /// Sets the required value for `key`. A repeated key keeps its original
    /// position and takes the newer value.
    pub fn insert(&mut self, key: impl Into<String>, required: impl Into<Value>) {
        self.0.insert(key.into(), required.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Attribute name to new value, as supplied by the caller of a mutation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NewAttributes(Map<String, Value>);

impl NewAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
