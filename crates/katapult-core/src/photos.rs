use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::{Attributes, Node, Photo};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeWithPhotos {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    pub attributes: Attributes,
    pub photos: Vec<JoinedPhoto>,
    pub total_photos: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinedPhoto {
    pub photo_id: String,
    pub name: Option<String>,
    /// ISO-8601 UTC with millisecond precision.
    pub date: Option<String>,
    pub associated: bool,
    pub metadata: PhotoMetadata,
}

/// Copied verbatim from the photo record; absent fields are omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PhotoMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orientation: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploaded_by: Option<Value>,
}

/// Attaches to each node the photos listed in its `photos` map.
///
/// Photo ids with no matching record still produce an entry, with null
/// name and date and empty metadata. When two records share an id the
/// first one wins.
pub fn join(nodes: Vec<Node>, photos: &[Photo]) -> Vec<NodeWithPhotos> {
    let mut by_id: HashMap<&str, &Photo> = HashMap::with_capacity(photos.len());
    for photo in photos {
        by_id.entry(photo.id.as_str()).or_insert(photo);
    }

    nodes
        .into_iter()
        .map(|node| {
            let joined: Vec<JoinedPhoto> = node
                .photos
                .iter()
                .flat_map(|ids| ids.keys())
                .map(|photo_id| joined_photo(photo_id, by_id.get(photo_id.as_str()).copied()))
                .collect();

            NodeWithPhotos {
                id: node.id,
                latitude: node.latitude,
                longitude: node.longitude,
                attributes: node.attributes.unwrap_or_default(),
                total_photos: joined.len(),
                photos: joined,
            }
        })
        .collect()
}

fn joined_photo(photo_id: &str, photo: Option<&Photo>) -> JoinedPhoto {
    let Some(photo) = photo else {
        return JoinedPhoto {
            photo_id: photo_id.to_string(),
            name: None,
            date: None,
            associated: true,
            metadata: PhotoMetadata::default(),
        };
    };

    JoinedPhoto {
        photo_id: photo_id.to_string(),
        name: photo.filename.clone().filter(|name| !name.is_empty()),
        date: photo.date_taken.and_then(iso_date),
        associated: true,
        metadata: PhotoMetadata {
            camera: photo.camera_model.clone(),
            width: photo.image_width.clone(),
            height: photo.image_height.clone(),
            orientation: photo.orientation.clone(),
            uploaded_by: photo.uploaded_by.clone(),
        },
    }
}

/// Renders unix seconds as `YYYY-MM-DDTHH:MM:SS.sssZ`. Zero counts as unset.
fn iso_date(date_taken: f64) -> Option<String> {
    if date_taken == 0.0 || !date_taken.is_finite() {
        return None;
    }
    // Sub-millisecond fractions are truncated toward zero.
    let millis = (date_taken * 1000.0) as i64;
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|instant| instant.to_rfc3339_opts(SecondsFormat::Millis, true))
}
