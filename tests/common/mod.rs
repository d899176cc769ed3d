#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{DateTime, Utc};
use http_body_util::BodyExt;
use jobportal::{
    auth::{AuthKeys, Claims},
    config::AuthSettings,
    create_app,
    entities::{category, company, job},
    ai::{AiError, TextGenerator},
    mail::{MailError, MailSender, OutgoingMail},
    storage::{FileStorage, StorageError},
    AppState,
};
use jsonwebtoken::{encode, EncodingKey, Header};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex, Once};
use tower::ServiceExt;
use uuid::Uuid;

pub const JWT_SECRET: &str = "integration-test-secret";

// For initializing tracing once
static INIT: Once = Once::new();

pub fn setup() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

/// Fresh in-memory SQLite database with the schema applied.
pub async fn test_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    // Every pooled connection would otherwise get its own empty database
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options).await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    db
}

pub fn token_for(user_id: &str) -> String {
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (Utc::now().timestamp() + 3600) as usize,
        iss: None,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

/// Storage fake that records every key it is asked to delete.
#[derive(Default)]
pub struct RecordingStorage {
    pub deleted: Mutex<Vec<String>>,
    pub fail: bool,
}

#[async_trait]
impl FileStorage for RecordingStorage {
    async fn delete_files(&self, keys: &[String]) -> Result<(), StorageError> {
        if self.fail {
            return Err(StorageError::Rejected {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        self.deleted.lock().unwrap().extend(keys.iter().cloned());
        Ok(())
    }
}

/// Mail fake that keeps sent messages in memory.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<OutgoingMail>>,
    pub fail: bool,
}

#[async_trait]
impl MailSender for RecordingMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        if self.fail {
            return Err(MailError::Transport("connection refused".to_string()));
        }
        self.sent.lock().unwrap().push(mail);
        Ok(())
    }
}

/// Model fake that records prompts and answers with a canned reply.
#[derive(Default)]
pub struct RecordingGenerator {
    pub prompts: Mutex<Vec<String>>,
    pub reply: String,
    pub fail: bool,
}

impl RecordingGenerator {
    pub fn replying(reply: &str) -> Self {
        Self { reply: reply.to_string(), ..Default::default() }
    }
}

#[async_trait]
impl TextGenerator for RecordingGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, AiError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.fail {
            return Err(AiError::Rejected { status: 403, body: "API key not valid".to_string() });
        }
        Ok(self.reply.clone())
    }
}

pub struct TestApp {
    pub db: DatabaseConnection,
    pub storage: Arc<RecordingStorage>,
    pub mailer: Arc<RecordingMailer>,
    pub generator: Arc<RecordingGenerator>,
    pub router: Router,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_fakes(RecordingStorage::default(), RecordingMailer::default()).await
    }

    pub async fn with_fakes(storage: RecordingStorage, mailer: RecordingMailer) -> Self {
        Self::build(storage, mailer, RecordingGenerator::default()).await
    }

    pub async fn with_generator(generator: RecordingGenerator) -> Self {
        Self::build(RecordingStorage::default(), RecordingMailer::default(), generator).await
    }

    async fn build(storage: RecordingStorage, mailer: RecordingMailer, generator: RecordingGenerator) -> Self {
        setup();
        let db = test_db().await;
        let storage = Arc::new(storage);
        let mailer = Arc::new(mailer);
        let generator = Arc::new(generator);
        let state = AppState {
            db: db.clone(),
            auth: Arc::new(AuthKeys::new(&AuthSettings {
                jwt_secret: JWT_SECRET.to_string(),
                issuer: None,
            })),
            storage: storage.clone(),
            mailer: mailer.clone(),
            generator: generator.clone(),
        };
        Self {
            db,
            storage,
            mailer,
            generator,
            router: create_app(state),
        }
    }

    /// Sends a request as `user` (anonymous when `None`) and returns the
    /// status with the body parsed as JSON, or as a JSON string otherwise.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        user: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(user_id) = user {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token_for(user_id)));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str, user: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::GET, uri, user, None).await
    }

    pub async fn post(&self, uri: &str, user: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, user, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, user: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        self.send(Method::PATCH, uri, user, body).await
    }

    pub async fn delete(&self, uri: &str, user: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, user, None).await
    }
}

/// Row values for a job inserted straight into the database.
pub struct JobSeed {
    pub user_id: &'static str,
    pub title: &'static str,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub image_url: Option<&'static str>,
    pub shift_timing: Option<&'static str>,
    pub work_mode: Option<&'static str>,
    pub years_of_experience: Option<&'static str>,
    pub category_id: Option<Uuid>,
    pub company_id: Option<Uuid>,
}

impl Default for JobSeed {
    fn default() -> Self {
        Self {
            user_id: "poster",
            title: "Untitled",
            is_published: true,
            created_at: Utc::now(),
            image_url: None,
            shift_timing: None,
            work_mode: None,
            years_of_experience: None,
            category_id: None,
            company_id: None,
        }
    }
}

pub async fn insert_job(db: &DatabaseConnection, seed: JobSeed) -> job::Model {
    job::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(seed.user_id.to_string()),
        title: Set(seed.title.to_string()),
        description: Set(String::new()),
        short_description: Set(String::new()),
        image_url: Set(seed.image_url.map(str::to_string)),
        is_published: Set(seed.is_published),
        tags: Set(json!([])),
        hourly_rate: Set(None),
        shift_timing: Set(seed.shift_timing.map(str::to_string)),
        work_mode: Set(seed.work_mode.map(str::to_string)),
        years_of_experience: Set(seed.years_of_experience.map(str::to_string)),
        category_id: Set(seed.category_id),
        company_id: Set(seed.company_id),
        created_at: Set(seed.created_at),
        updated_at: Set(seed.created_at),
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn insert_category(db: &DatabaseConnection, name: &str) -> category::Model {
    category::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn insert_company(db: &DatabaseConnection, user_id: &str, name: &str) -> company::Model {
    let now = Utc::now();
    company::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id.to_string()),
        name: Set(name.to_string()),
        description: Set(String::new()),
        logo: Set(String::new()),
        cover_image: Set(String::new()),
        mail: Set(String::new()),
        website: Set(String::new()),
        linked_in: Set(String::new()),
        address_line_1: Set(String::new()),
        address_line_2: Set(String::new()),
        city: Set(String::new()),
        state: Set(String::new()),
        zipcode: Set(String::new()),
        overview: Set(String::new()),
        why_join_us: Set(String::new()),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .unwrap()
}

pub fn titles(body: &Value) -> Vec<String> {
    body.as_array()
        .unwrap()
        .iter()
        .map(|job| job["title"].as_str().unwrap().to_string())
        .collect()
}
