mod common;

use axum::http::StatusCode;
use common::{start, FakeUpstream, API_KEY};
use serde_json::{json, Value};

#[tokio::test]
async fn photos_are_joined_onto_nodes() {
    let nodes = json!([
        {"id": "n1", "latitude": 40.5, "longitude": -111.9,
         "attributes": {"node_type": "pole"},
         "photos": {"p1": true, "p-missing": true}},
        {"id": "n2", "attributes": {"node_type": "span"}}
    ]);
    let photos = json!([
        {"id": "p1", "date_taken": 1700000000, "filename": "a.jpg",
         "camera_model": "Pixel 7", "image_width": 4032, "image_height": 3024},
        {"id": "p-unused", "date_taken": 0, "filename": "b.jpg"}
    ]);
    let harness = start(FakeUpstream::with_nodes(nodes).photos(photos)).await;

    let response = harness
        .client
        .post(harness.url("/get_nodes_with_photos"))
        .query(&[("api_key", API_KEY), ("job_id", "-Njob")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();

    assert_eq!(
        body,
        json!({
            "data": [
                {
                    "id": "n1",
                    "latitude": 40.5,
                    "longitude": -111.9,
                    "attributes": {"node_type": "pole"},
                    "photos": [
                        {
                            "photoId": "p1",
                            "name": "a.jpg",
                            "date": "2023-11-14T22:13:20.000Z",
                            "associated": true,
                            "metadata": {"camera": "Pixel 7", "width": 4032, "height": 3024}
                        },
                        {
                            "photoId": "p-missing",
                            "name": null,
                            "date": null,
                            "associated": true,
                            "metadata": {}
                        }
                    ],
                    "total_photos": 2
                },
                {
                    "id": "n2",
                    "attributes": {"node_type": "span"},
                    "photos": [],
                    "total_photos": 0
                }
            ],
            "total": 2,
            "job_id": "-Njob"
        })
    );

    let mut paths: Vec<_> = harness.calls().into_iter().map(|c| c.path).collect();
    paths.sort();
    assert_eq!(paths, ["/jobs/-Njob/nodes", "/jobs/-Njob/photos"]);
}

#[tokio::test]
async fn photo_listing_rejection_fails_the_request() {
    let harness = start(
        FakeUpstream::with_nodes(json!([{"id": "n1", "photos": {"p1": true}}]))
            .reject_photos(StatusCode::SERVICE_UNAVAILABLE),
    )
    .await;

    let response = harness
        .client
        .post(harness.url("/get_nodes_with_photos"))
        .query(&[("api_key", API_KEY), ("job_id", "-Njob")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.text().await.unwrap(), "Photo service unavailable");
}

#[tokio::test]
async fn job_id_is_required() {
    let harness = start(FakeUpstream::with_nodes(json!([]))).await;

    let response = harness
        .client
        .post(harness.url("/get_nodes_with_photos"))
        .query(&[("api_key", API_KEY)])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.text().await.unwrap(),
        "Missing required parameters: api_key and job_id"
    );
    assert!(harness.calls().is_empty());
}
