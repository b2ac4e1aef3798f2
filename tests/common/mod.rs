//! Common test utilities for E2E tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use academy::error::AppError;
use academy::storage::ObjectStore;
use academy::{AppState, config};
use async_trait::async_trait;
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::TcpListener;

pub const ADMIN_EMAIL: &str = "admin@inst.example";
pub const PASSWORD: &str = "correct horse battery";

/// Object store keeping everything in memory
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<String, (Vec<u8>, String)>>,
}

impl MemoryStore {
    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn upload(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String, AppError> {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (data, content_type.to_string()));
        Ok(key.to_string())
    }

    async fn create_signed_url(&self, key: &str, ttl: Duration) -> Result<String, AppError> {
        if !self.contains(key) {
            return Err(AppError::Storage(format!("no such key: {key}")));
        }
        Ok(format!(
            "https://assets.test.example.com/{key}?expires={}",
            ttl.as_secs()
        ))
    }

    async fn remove(&self, keys: &[String]) -> Result<(), AppError> {
        let mut objects = self.objects.lock().unwrap();
        for key in keys {
            objects.remove(key);
        }
        Ok(())
    }
}

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

pub fn test_config(db_path: std::path::PathBuf) -> config::AppConfig {
    config::AppConfig {
        server: config::ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0, // Let OS assign port
            domain: "test.example.com".to_string(),
            protocol: "https".to_string(),
        },
        database: config::DatabaseConfig { path: db_path },
        storage: config::StorageConfig {
            bucket: "test-assets".to_string(),
            endpoint: "https://test-account.r2.cloudflarestorage.com".to_string(),
            region: "auto".to_string(),
            access_key_id: "test-key".to_string(),
            secret_access_key: "test-secret".to_string(),
            signed_url_ttl_seconds: 86_400,
            max_image_bytes: 2 * 1024 * 1024,
            max_video_bytes: 8 * 1024 * 1024,
        },
        auth: config::AuthConfig {
            session_secret: "test-secret-key-32-bytes-long!!!".to_string(),
            session_max_age: 604_800,
            sign_in_max_attempts: 3,
            sign_in_window_seconds: 60,
        },
        admin: config::AdminConfig {
            email: ADMIN_EMAIL.to_string(),
        },
        notifications: config::NotificationConfig { ttl_seconds: 600 },
        ai: config::AiConfig::default(),
        logging: config::LoggingConfig {
            level: "info".to_string(),
            format: "pretty".to_string(),
        },
    }
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test server after adjusting the default test configuration
    pub async fn with_config(adjust: impl FnOnce(&mut config::AppConfig)) -> Self {
        // Create temporary directory for test database
        let temp_dir = TempDir::new().unwrap();
        let mut config = test_config(temp_dir.path().join("test.db"));
        adjust(&mut config);

        let store = Arc::new(MemoryStore::default());
        let state = AppState::with_storage(config, store.clone()).await.unwrap();

        // Create HTTP client
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = academy::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait a bit for server to start
        tokio::time::sleep(Duration::from_millis(100)).await;

        Self {
            addr: addr_str,
            state,
            store,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Sign up through the API and return the bearer token
    pub async fn sign_up(&self, email: &str, name: &str) -> String {
        let response = self
            .client
            .post(self.url("/api/auth/sign_up"))
            .json(&json!({ "email": email, "password": PASSWORD, "name": name }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200, "sign up for {email} failed");
        let body: Value = response.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }

    pub async fn admin_token(&self) -> String {
        self.sign_up(ADMIN_EMAIL, "Admin").await
    }

    /// Create a course through the admin API
    pub async fn create_course(&self, admin_token: &str, id: &str, title: &str) -> Value {
        let response = self
            .client
            .post(self.url("/api/admin/courses"))
            .bearer_auth(admin_token)
            .json(&json!({
                "id": id,
                "title": title,
                "description": "<p>An introduction.</p>",
                "instructor": "Ada Lovelace",
                "duration": "6 weeks",
                "level": "Beginner",
                "price": 0,
                "tags": ["intro"],
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201, "creating course {id} failed");
        response.json().await.unwrap()
    }

    pub async fn get_json(&self, path: &str, token: &str) -> (u16, Value) {
        let response = self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap_or(Value::Null))
    }

    pub async fn post_json(&self, path: &str, token: &str, body: Value) -> (u16, Value) {
        let response = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap_or(Value::Null))
    }
}
