//! Shared scaffolding for the integration tests: an in-memory `Repository`, state builders,
//! token helpers and a small multipart body writer.
#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use chrono::Utc;
use newsdesk::{
    AppConfig, AppState, MockStorageService, create_router,
    auth::issue_token,
    models::{
        Category, ClearSummary, NewNews, NewUser, News, NewsChanges, NewsItem, Role, User,
        UserCredentials,
    },
    repository::{RepoResult, Repository, RepositoryError, RepositoryState},
    storage::StorageState,
};
use serde_json::Value;
use std::{
    path::PathBuf,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};
use tower::ServiceExt;

// --- In-memory Repository ---

#[derive(Default)]
struct Tables {
    next_id: i64,
    users: Vec<(User, String)>,
    categories: Vec<Category>,
    news: Vec<News>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn item(&self, news: &News) -> NewsItem {
        NewsItem {
            id: news.id,
            title: news.title.clone(),
            content: news.content.clone(),
            image_url: news.image_url.clone(),
            category_id: news.category_id,
            category_name: news
                .category_id
                .and_then(|id| self.categories.iter().find(|c| c.id == id))
                .map(|c| c.name.clone()),
            created_by: news.created_by,
            publisher: self
                .users
                .iter()
                .find(|(u, _)| u.id == news.created_by)
                .map(|(u, _)| u.username.clone()),
            view_count: news.views,
            created_at: news.created_at,
            updated_at: news.updated_at,
        }
    }

    fn items<'a>(&self, news: impl Iterator<Item = &'a News>) -> Vec<NewsItem> {
        let mut items: Vec<NewsItem> = news.map(|n| self.item(n)).collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        items
    }
}

/// InMemoryRepository
///
/// Mirrors the Postgres constraints the handlers rely on: unique usernames and category names,
/// and the foreign keys from news to categories and users.
#[derive(Default)]
pub struct InMemoryRepository {
    tables: Mutex<Tables>,
    /// When set, every insert/update fails like a lost database connection.
    pub fail_writes: AtomicBool,
}

impl InMemoryRepository {
    fn tables(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_writable(&self) -> RepoResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn news_count(&self) -> usize {
        self.tables().news.len()
    }

    pub fn category_count(&self) -> usize {
        self.tables().categories.len()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn find_credentials(&self, username: &str) -> RepoResult<Option<UserCredentials>> {
        Ok(self
            .tables()
            .users
            .iter()
            .find(|(u, _)| u.username == username)
            .map(|(u, hash)| UserCredentials {
                id: u.id,
                username: u.username.clone(),
                password_hash: hash.clone(),
                role: u.role,
            }))
    }

    async fn list_users(&self) -> RepoResult<Vec<User>> {
        let mut users: Vec<User> = self.tables().users.iter().map(|(u, _)| u.clone()).collect();
        users.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(users)
    }

    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        self.check_writable()?;
        let mut tables = self.tables();
        if tables.users.iter().any(|(u, _)| u.username == user.username) {
            return Err(RepositoryError::UniqueViolation);
        }
        let created = User {
            id: tables.next_id(),
            username: user.username,
            role: user.role,
            created_at: Utc::now(),
        };
        tables.users.push((created.clone(), user.password_hash));
        Ok(created)
    }

    async fn delete_user(&self, id: i64) -> RepoResult<bool> {
        let mut tables = self.tables();
        if tables.news.iter().any(|n| n.created_by == id)
            || tables.categories.iter().any(|c| c.created_by == Some(id))
        {
            return Err(RepositoryError::ForeignKeyViolation);
        }
        let before = tables.users.len();
        tables.users.retain(|(u, _)| u.id != id);
        Ok(tables.users.len() < before)
    }

    async fn list_categories(&self) -> RepoResult<Vec<Category>> {
        let mut categories = self.tables().categories.clone();
        categories.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(categories)
    }

    async fn get_category(&self, id: i64) -> RepoResult<Option<Category>> {
        Ok(self.tables().categories.iter().find(|c| c.id == id).cloned())
    }

    async fn find_category_by_name(
        &self,
        name: &str,
        exclude_id: Option<i64>,
    ) -> RepoResult<Option<Category>> {
        Ok(self
            .tables()
            .categories
            .iter()
            .find(|c| c.name == name && Some(c.id) != exclude_id)
            .cloned())
    }

    async fn create_category(
        &self,
        name: &str,
        image_url: Option<String>,
        created_by: i64,
    ) -> RepoResult<Category> {
        self.check_writable()?;
        let mut tables = self.tables();
        if tables.categories.iter().any(|c| c.name == name) {
            return Err(RepositoryError::UniqueViolation);
        }
        let category = Category {
            id: tables.next_id(),
            name: name.to_string(),
            image_url,
            created_by: Some(created_by),
            created_at: Utc::now(),
        };
        tables.categories.push(category.clone());
        Ok(category)
    }

    async fn update_category(
        &self,
        id: i64,
        name: &str,
        image_url: Option<String>,
    ) -> RepoResult<Option<Category>> {
        self.check_writable()?;
        let mut tables = self.tables();
        if tables.categories.iter().any(|c| c.name == name && c.id != id) {
            return Err(RepositoryError::UniqueViolation);
        }
        Ok(tables.categories.iter_mut().find(|c| c.id == id).map(|c| {
            c.name = name.to_string();
            c.image_url = image_url;
            c.clone()
        }))
    }

    async fn delete_category(&self, id: i64) -> RepoResult<bool> {
        let mut tables = self.tables();
        if tables.news.iter().any(|n| n.category_id == Some(id)) {
            return Err(RepositoryError::ForeignKeyViolation);
        }
        let before = tables.categories.len();
        tables.categories.retain(|c| c.id != id);
        Ok(tables.categories.len() < before)
    }

    async fn count_news_in_category(&self, category_id: i64) -> RepoResult<i64> {
        Ok(self
            .tables()
            .news
            .iter()
            .filter(|n| n.category_id == Some(category_id))
            .count() as i64)
    }

    async fn list_news(&self) -> RepoResult<Vec<NewsItem>> {
        let tables = self.tables();
        Ok(tables.items(tables.news.iter()))
    }

    async fn list_news_by_author(&self, user_id: i64) -> RepoResult<Vec<NewsItem>> {
        let tables = self.tables();
        Ok(tables.items(tables.news.iter().filter(|n| n.created_by == user_id)))
    }

    async fn view_news(&self, id: i64) -> RepoResult<Option<NewsItem>> {
        let mut tables = self.tables();
        let Some(news) = tables.news.iter_mut().find(|n| n.id == id) else {
            return Ok(None);
        };
        news.views += 1;
        let news = news.clone();
        Ok(Some(tables.item(&news)))
    }

    async fn get_news(&self, id: i64) -> RepoResult<Option<News>> {
        Ok(self.tables().news.iter().find(|n| n.id == id).cloned())
    }

    async fn create_news(&self, news: NewNews) -> RepoResult<News> {
        self.check_writable()?;
        let mut tables = self.tables();
        if let Some(category_id) = news.category_id {
            if !tables.categories.iter().any(|c| c.id == category_id) {
                return Err(RepositoryError::ForeignKeyViolation);
            }
        }
        let now = Utc::now();
        let created = News {
            id: tables.next_id(),
            title: news.title,
            content: news.content,
            image_url: news.image_url,
            category_id: news.category_id,
            created_by: news.created_by,
            views: 0,
            created_at: now,
            updated_at: now,
        };
        tables.news.push(created.clone());
        Ok(created)
    }

    async fn update_news(&self, id: i64, changes: NewsChanges) -> RepoResult<Option<News>> {
        self.check_writable()?;
        let mut tables = self.tables();
        Ok(tables.news.iter_mut().find(|n| n.id == id).map(|n| {
            n.title = changes.title;
            n.content = changes.content;
            n.image_url = changes.image_url;
            n.category_id = changes.category_id;
            n.updated_at = Utc::now();
            n.clone()
        }))
    }

    async fn delete_news(&self, id: i64) -> RepoResult<bool> {
        let mut tables = self.tables();
        let before = tables.news.len();
        tables.news.retain(|n| n.id != id);
        Ok(tables.news.len() < before)
    }

    async fn clear_content(&self) -> RepoResult<ClearSummary> {
        let mut tables = self.tables();
        let summary = ClearSummary {
            news_deleted: tables.news.len() as u64,
            categories_deleted: tables.categories.len() as u64,
        };
        tables.news.clear();
        tables.categories.clear();
        Ok(summary)
    }
}

// --- App Scaffolding ---

/// Everything a test needs to drive the router and inspect the side effects.
pub struct TestApp {
    pub state: AppState,
    pub repo: Arc<InMemoryRepository>,
    pub storage: MockStorageService,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_storage(MockStorageService::new())
    }

    pub fn with_storage(storage: MockStorageService) -> Self {
        let repo = Arc::new(InMemoryRepository::default());
        let mut config = AppConfig::default();
        // Never point a test at the real upload directory.
        config.upload_dir = scratch_dir("uploads");

        let state = AppState {
            repo: repo.clone() as RepositoryState,
            storage: Arc::new(storage.clone()) as StorageState,
            config,
        };

        Self {
            state,
            repo,
            storage,
        }
    }

    pub fn router(&self) -> Router {
        create_router(self.state.clone())
    }

    /// Inserts a user directly. The stored hash is a placeholder; use `seed_user_with_password`
    /// for login tests.
    pub async fn seed_user(&self, username: &str, role: Role) -> UserCredentials {
        self.insert_user(username, "not-a-real-hash".to_string(), role)
            .await
    }

    pub async fn seed_user_with_password(
        &self,
        username: &str,
        password: &str,
        role: Role,
    ) -> UserCredentials {
        let hash = newsdesk::auth::hash_password(password).unwrap();
        self.insert_user(username, hash, role).await
    }

    async fn insert_user(&self, username: &str, hash: String, role: Role) -> UserCredentials {
        let user = self
            .repo
            .create_user(NewUser {
                username: username.to_string(),
                password_hash: hash.clone(),
                role,
            })
            .await
            .unwrap();
        UserCredentials {
            id: user.id,
            username: user.username,
            password_hash: hash,
            role: user.role,
        }
    }

    pub async fn seed_category(&self, name: &str, owner: &UserCredentials) -> Category {
        self.repo.create_category(name, None, owner.id).await.unwrap()
    }

    pub async fn seed_news(
        &self,
        title: &str,
        category_id: Option<i64>,
        owner: &UserCredentials,
    ) -> News {
        self.repo
            .create_news(NewNews {
                title: title.to_string(),
                content: format!("{title} body"),
                image_url: None,
                category_id,
                created_by: owner.id,
            })
            .await
            .unwrap()
    }

    pub fn token_for(&self, user: &UserCredentials) -> String {
        issue_token(&self.state.config.jwt_secret, user).unwrap()
    }

    /// Sends one request through a fresh router and returns the status and JSON body
    /// (`Value::Null` for non-JSON bodies).
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }
}

/// A unique, not yet created directory under the system temp dir.
pub fn scratch_dir(prefix: &str) -> PathBuf {
    std::env::temp_dir().join(format!("newsdesk-{prefix}-{}", uuid::Uuid::new_v4()))
}

// --- Request Builders ---

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    with_token(Request::builder().method("GET").uri(uri), token)
        .body(Body::empty())
        .unwrap()
}

pub fn delete(uri: &str, token: Option<&str>) -> Request<Body> {
    with_token(Request::builder().method("DELETE").uri(uri), token)
        .body(Body::empty())
        .unwrap()
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    with_token(Request::builder().method(method).uri(uri), token)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn multipart(
    method: &str,
    uri: &str,
    token: Option<&str>,
    form: MultipartBody,
) -> Request<Body> {
    let (content_type, body) = form.finish();
    with_token(Request::builder().method(method).uri(uri), token)
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap()
}

fn with_token(
    builder: axum::http::request::Builder,
    token: Option<&str>,
) -> axum::http::request::Builder {
    match token {
        Some(token) => builder.header(header::AUTHORIZATION, format!("Bearer {token}")),
        None => builder,
    }
}

const BOUNDARY: &str = "newsdesk-test-boundary";

/// MultipartBody
///
/// Minimal `multipart/form-data` writer for text fields and one file part.
#[derive(Default)]
pub struct MultipartBody {
    body: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, content_type: &str, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// A small PNG-typed file in the `image` field.
    pub fn png(self) -> Self {
        self.file("image", "cover.png", "image/png", &[0x89, b'P', b'N', b'G'])
    }

    pub fn finish(mut self) -> (String, Vec<u8>) {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        (format!("multipart/form-data; boundary={BOUNDARY}"), self.body)
    }
}
