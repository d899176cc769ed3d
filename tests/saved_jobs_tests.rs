mod common;

use axum::http::StatusCode;
use common::{insert_job, JobSeed, TestApp};
use jobportal::entities::saved_job;
use sea_orm::{EntityTrait, PaginatorTrait};
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn save_then_unsave_round_trip() {
    let app = TestApp::new().await;
    let job = insert_job(&app.db, JobSeed { title: "Rust Engineer", ..Default::default() }).await;

    let (status, body) = app.patch(&format!("/jobs/{}/save", job.id), Some("seeker"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["saved_users"], json!(["seeker"]));

    let (status, body) = app.patch(&format!("/jobs/{}/unsave", job.id), Some("seeker"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["saved_users"], json!([]));
}

#[tokio::test]
async fn saving_twice_is_harmless() {
    let app = TestApp::new().await;
    let job = insert_job(&app.db, JobSeed::default()).await;
    let uri = format!("/jobs/{}/save", job.id);

    app.patch(&uri, Some("seeker"), None).await;
    let (status, body) = app.patch(&uri, Some("seeker"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Job already saved");
    assert_eq!(saved_job::Entity::find().count(&app.db).await.unwrap(), 1);
}

#[tokio::test]
async fn concurrent_saves_by_different_users_are_all_kept() {
    let app = TestApp::new().await;
    let job = insert_job(&app.db, JobSeed::default()).await;
    let uri = format!("/jobs/{}/save", job.id);

    let (a, b, c) = tokio::join!(
        app.patch(&uri, Some("ann"), None),
        app.patch(&uri, Some("bob"), None),
        app.patch(&uri, Some("cid"), None),
    );
    assert!([a.0, b.0, c.0].iter().all(|s| *s == StatusCode::OK));

    let (_, body) = app.get(&format!("/jobs/{}", job.id), None).await;
    let mut users: Vec<String> = body["job"]["saved_users"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u.as_str().unwrap().to_string())
        .collect();
    users.sort();
    assert_eq!(users, vec!["ann", "bob", "cid"]);
}

#[tokio::test]
async fn unsave_requires_a_saved_job() {
    let app = TestApp::new().await;
    let job = insert_job(&app.db, JobSeed::default()).await;

    let (status, body) = app.patch(&format!("/jobs/{}/unsave", job.id), Some("seeker"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid request: Job is not saved");
}

#[tokio::test]
async fn saving_needs_identity_and_an_existing_job() {
    let app = TestApp::new().await;
    let job = insert_job(&app.db, JobSeed::default()).await;

    let (status, _) = app.patch(&format!("/jobs/{}/save", job.id), None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.patch(&format!("/jobs/{}/save", Uuid::new_v4()), Some("seeker"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
