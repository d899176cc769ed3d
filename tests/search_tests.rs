mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::{insert_category, insert_job, titles, JobSeed, TestApp};
use jobportal::search::{self, JobFilter};
use sea_orm::{ConnectionTrait, Statement};

#[tokio::test]
async fn only_published_jobs_are_listed() {
    let app = TestApp::new().await;
    insert_job(&app.db, JobSeed { title: "Rust Engineer", ..Default::default() }).await;
    insert_job(
        &app.db,
        JobSeed { title: "Draft Engineer", is_published: false, ..Default::default() },
    )
    .await;

    for uri in [
        "/jobs",
        "/jobs?title=engineer",
        "/jobs?createdAtFilter=today",
        "/jobs?createdAtFilter=lastWeek",
        "/jobs?workMode=",
    ] {
        let (status, body) = app.get(uri, None).await;
        assert_eq!(status, StatusCode::OK, "{}", uri);
        assert!(
            body.as_array().unwrap().iter().all(|job| job["is_published"] == true),
            "{}",
            uri
        );
        assert!(!titles(&body).contains(&"Draft Engineer".to_string()), "{}", uri);
    }
}

#[tokio::test]
async fn no_filters_returns_all_published_newest_first() {
    let app = TestApp::new().await;
    let now = Utc::now();
    insert_job(&app.db, JobSeed { title: "Old", created_at: now - Duration::days(3), ..Default::default() }).await;
    insert_job(&app.db, JobSeed { title: "New", created_at: now, ..Default::default() }).await;
    insert_job(&app.db, JobSeed { title: "Mid", created_at: now - Duration::days(1), ..Default::default() }).await;

    let (status, body) = app.get("/jobs", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(titles(&body), vec!["New", "Mid", "Old"]);
}

#[tokio::test]
async fn title_matches_substring_in_any_case() {
    let app = TestApp::new().await;
    insert_job(&app.db, JobSeed { title: "Senior Engineer", ..Default::default() }).await;
    insert_job(&app.db, JobSeed { title: "ENGINEERING Lead", ..Default::default() }).await;
    insert_job(&app.db, JobSeed { title: "Product Designer", ..Default::default() }).await;

    let (_, body) = app.get("/jobs?title=engineer", None).await;
    let mut found = titles(&body);
    found.sort();
    assert_eq!(found, vec!["ENGINEERING Lead", "Senior Engineer"]);
}

#[tokio::test]
async fn title_match_folds_non_ascii_capitals() {
    let app = TestApp::new().await;
    insert_job(&app.db, JobSeed { title: "INGÉNIEUR Logiciel", ..Default::default() }).await;
    insert_job(&app.db, JobSeed { title: "Designer", ..Default::default() }).await;

    for uri in ["/jobs?title=ing%C3%A9nieur", "/jobs?title=ING%C3%89NIEUR", "/jobs?title=logiciel"] {
        let (status, body) = app.get(uri, None).await;
        assert_eq!(status, StatusCode::OK, "{}", uri);
        assert_eq!(titles(&body), vec!["INGÉNIEUR Logiciel"], "{}", uri);
    }
}

#[tokio::test]
async fn title_wildcards_match_literally() {
    let app = TestApp::new().await;
    insert_job(&app.db, JobSeed { title: "100% Remote", ..Default::default() }).await;
    insert_job(&app.db, JobSeed { title: "1000 Remote", ..Default::default() }).await;

    let (_, body) = app.get("/jobs?title=100%25", None).await;
    assert_eq!(titles(&body), vec!["100% Remote"]);
}

#[tokio::test]
async fn comma_separated_facets_restrict_to_listed_values() {
    let app = TestApp::new().await;
    insert_job(&app.db, JobSeed { title: "A", work_mode: Some("remote"), shift_timing: Some("full-time"), ..Default::default() }).await;
    insert_job(&app.db, JobSeed { title: "B", work_mode: Some("hybrid"), shift_timing: Some("contract"), ..Default::default() }).await;
    insert_job(&app.db, JobSeed { title: "C", work_mode: Some("office"), shift_timing: Some("full-time"), ..Default::default() }).await;
    insert_job(&app.db, JobSeed { title: "D", ..Default::default() }).await;

    let (_, body) = app.get("/jobs?workMode=remote,hybrid", None).await;
    let jobs = body.as_array().unwrap();
    assert_eq!(jobs.len(), 2);
    assert!(jobs.iter().all(|job| ["remote", "hybrid"].contains(&job["work_mode"].as_str().unwrap())));

    let (_, body) = app.get("/jobs?workMode=remote,office&shiftTiming=full-time", None).await;
    let mut found = titles(&body);
    found.sort();
    assert_eq!(found, vec!["A", "C"]);

    let (_, body) = app.get("/jobs?yearsOfExperience=5", None).await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn this_month_excludes_older_jobs() {
    let app = TestApp::new().await;
    let now = Utc::now();
    insert_job(&app.db, JobSeed { title: "Fresh", created_at: now, ..Default::default() }).await;
    insert_job(&app.db, JobSeed { title: "Stale", created_at: now - Duration::days(40), ..Default::default() }).await;

    let (_, body) = app.get("/jobs?createdAtFilter=thisMonth", None).await;
    assert_eq!(titles(&body), vec!["Fresh"]);
}

#[tokio::test]
async fn unrecognized_date_bucket_imposes_no_bound() {
    let app = TestApp::new().await;
    insert_job(&app.db, JobSeed { title: "Ancient", created_at: Utc::now() - Duration::days(900), ..Default::default() }).await;

    let (status, body) = app.get("/jobs?createdAtFilter=lastDecade", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(titles(&body), vec!["Ancient"]);
}

#[tokio::test]
async fn category_filter_and_bad_category_id() {
    let app = TestApp::new().await;
    let design = insert_category(&app.db, "UI/UX Design").await;
    insert_job(&app.db, JobSeed { title: "Designer", category_id: Some(design.id), ..Default::default() }).await;
    insert_job(&app.db, JobSeed { title: "Accountant", ..Default::default() }).await;

    let (_, body) = app.get(&format!("/jobs?categoryId={}", design.id), None).await;
    assert_eq!(titles(&body), vec!["Designer"]);
    assert_eq!(body[0]["category"]["name"], "UI/UX Design");

    let (status, body) = app.get("/jobs?categoryId=not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("categoryId"));
}

#[tokio::test]
async fn saved_jobs_filter_needs_a_caller() {
    let app = TestApp::new().await;
    let kept = insert_job(&app.db, JobSeed { title: "Kept", ..Default::default() }).await;
    insert_job(&app.db, JobSeed { title: "Other", ..Default::default() }).await;

    let (status, _) = app.patch(&format!("/jobs/{}/save", kept.id), Some("seeker"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get("/jobs?savedJobs=true", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!([]));

    let (_, body) = app.get("/jobs?savedJobs=true", Some("seeker")).await;
    assert_eq!(titles(&body), vec!["Kept"]);
    assert_eq!(body[0]["saved_users"], serde_json::json!(["seeker"]));

    let (_, body) = app.get("/jobs?savedJobs=true", Some("someone-else")).await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn repeated_searches_are_identical() {
    let app = TestApp::new().await;
    let created_at = Utc::now() - Duration::hours(2);
    // Same timestamp on purpose; the id tie-break keeps the order stable
    for title in ["One", "Two", "Three"] {
        insert_job(&app.db, JobSeed { title, created_at, work_mode: Some("remote"), ..Default::default() }).await;
    }

    let (_, first) = app.get("/jobs?workMode=remote&createdAtFilter=lastWeek", None).await;
    let (_, second) = app.get("/jobs?workMode=remote&createdAtFilter=lastWeek", None).await;
    assert_eq!(first.as_array().unwrap().len(), 3);
    assert_eq!(first, second);
}

#[tokio::test]
async fn persistence_failure_yields_empty_list() {
    let app = TestApp::new().await;
    insert_job(&app.db, JobSeed { title: "Rust Engineer", ..Default::default() }).await;

    let backend = app.db.get_database_backend();
    app.db
        .execute(Statement::from_string(backend, "DROP TABLE jobs"))
        .await
        .unwrap();

    let jobs = search::get_jobs(&app.db, &JobFilter::default(), None).await;
    assert!(jobs.is_empty());

    let (status, body) = app.get("/jobs?title=engineer", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn malformed_query_value_is_a_json_error() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/jobs?savedJobs=1", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid request:"), "{}", body);
}
