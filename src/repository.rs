use crate::models::{
    Category, ClearSummary, NewNews, NewUser, News, NewsChanges, NewsItem, User, UserCredentials,
};
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use thiserror::Error;

/// RepositoryError
///
/// Persistence failures. Constraint violations are split out so handlers can report them as
/// conflicts; everything else is an opaque database fault.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("unique constraint violated")]
    UniqueViolation,
    #[error("foreign key constraint violated")]
    ForeignKeyViolation,
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            if db_err.is_unique_violation() {
                return RepositoryError::UniqueViolation;
            }
            if db_err.is_foreign_key_violation() {
                return RepositoryError::ForeignKeyViolation;
            }
        }
        RepositoryError::Database(err)
    }
}

pub type RepoResult<T> = Result<T, RepositoryError>;

/// Repository Trait
///
/// The abstract contract for all persistence operations. Handlers only see this trait, so the
/// Postgres implementation can be swapped for an in-memory one in tests.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn find_credentials(&self, username: &str) -> RepoResult<Option<UserCredentials>>;
    async fn list_users(&self) -> RepoResult<Vec<User>>;
    async fn create_user(&self, user: NewUser) -> RepoResult<User>;
    /// Returns false when no user has this id.
    async fn delete_user(&self, id: i64) -> RepoResult<bool>;

    // --- Categories ---
    /// Newest first.
    async fn list_categories(&self) -> RepoResult<Vec<Category>>;
    async fn get_category(&self, id: i64) -> RepoResult<Option<Category>>;
    /// Exact, case-sensitive name lookup, optionally ignoring one id (the category being renamed).
    async fn find_category_by_name(
        &self,
        name: &str,
        exclude_id: Option<i64>,
    ) -> RepoResult<Option<Category>>;
    async fn create_category(
        &self,
        name: &str,
        image_url: Option<String>,
        created_by: i64,
    ) -> RepoResult<Category>;
    async fn update_category(
        &self,
        id: i64,
        name: &str,
        image_url: Option<String>,
    ) -> RepoResult<Option<Category>>;
    async fn delete_category(&self, id: i64) -> RepoResult<bool>;
    async fn count_news_in_category(&self, category_id: i64) -> RepoResult<i64>;

    // --- News ---
    /// Every article, newest first, with category name and publisher.
    async fn list_news(&self) -> RepoResult<Vec<NewsItem>>;
    async fn list_news_by_author(&self, user_id: i64) -> RepoResult<Vec<NewsItem>>;
    /// Increments the view counter and returns the article with the incremented count.
    async fn view_news(&self, id: i64) -> RepoResult<Option<NewsItem>>;
    /// Plain read without side effects, used for authorization checks.
    async fn get_news(&self, id: i64) -> RepoResult<Option<News>>;
    async fn create_news(&self, news: NewNews) -> RepoResult<News>;
    async fn update_news(&self, id: i64, changes: NewsChanges) -> RepoResult<Option<News>>;
    async fn delete_news(&self, id: i64) -> RepoResult<bool>;

    /// Removes every article and then every category, atomically.
    async fn clear_content(&self) -> RepoResult<ClearSummary>;
}

/// RepositoryState
///
/// The type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The concrete implementation of `Repository` backed by a Postgres connection pool.
#[derive(Clone)]
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const NEWS_ITEM_SELECT: &str = r#"
    SELECT
        n.id, n.title, n.content, n.image_url, n.category_id,
        c.name AS category_name,
        n.created_by,
        u.username AS publisher,
        n.views AS view_count,
        n.created_at, n.updated_at
    FROM news n
    LEFT JOIN categories c ON n.category_id = c.id
    LEFT JOIN users u ON n.created_by = u.id
"#;

const NEWS_COLUMNS: &str =
    "id, title, content, image_url, category_id, created_by, views, created_at, updated_at";

#[async_trait]
impl Repository for PostgresRepository {
    async fn find_credentials(&self, username: &str) -> RepoResult<Option<UserCredentials>> {
        let user = sqlx::query_as::<_, UserCredentials>(
            "SELECT id, username, password_hash, role FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn list_users(&self) -> RepoResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            "SELECT id, username, role, created_at FROM users ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let created = sqlx::query_as::<_, User>(
            r#"INSERT INTO users (username, password_hash, role)
               VALUES ($1, $2, $3)
               RETURNING id, username, role, created_at"#,
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn delete_user(&self, id: i64) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_categories(&self) -> RepoResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, name, image_url, created_by, created_at FROM categories ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    async fn get_category(&self, id: i64) -> RepoResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT id, name, image_url, created_by, created_at FROM categories WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(category)
    }

    async fn find_category_by_name(
        &self,
        name: &str,
        exclude_id: Option<i64>,
    ) -> RepoResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            r#"SELECT id, name, image_url, created_by, created_at
               FROM categories
               WHERE name = $1 AND ($2::BIGINT IS NULL OR id <> $2)"#,
        )
        .bind(name)
        .bind(exclude_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(category)
    }

    async fn create_category(
        &self,
        name: &str,
        image_url: Option<String>,
        created_by: i64,
    ) -> RepoResult<Category> {
        let category = sqlx::query_as::<_, Category>(
            r#"INSERT INTO categories (name, image_url, created_by)
               VALUES ($1, $2, $3)
               RETURNING id, name, image_url, created_by, created_at"#,
        )
        .bind(name)
        .bind(image_url)
        .bind(created_by)
        .fetch_one(&self.pool)
        .await?;
        Ok(category)
    }

    async fn update_category(
        &self,
        id: i64,
        name: &str,
        image_url: Option<String>,
    ) -> RepoResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            r#"UPDATE categories SET name = $2, image_url = $3
               WHERE id = $1
               RETURNING id, name, image_url, created_by, created_at"#,
        )
        .bind(id)
        .bind(name)
        .bind(image_url)
        .fetch_optional(&self.pool)
        .await?;
        Ok(category)
    }

    async fn delete_category(&self, id: i64) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_news_in_category(&self, category_id: i64) -> RepoResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM news WHERE category_id = $1")
            .bind(category_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn list_news(&self) -> RepoResult<Vec<NewsItem>> {
        let query = format!("{NEWS_ITEM_SELECT} ORDER BY n.created_at DESC, n.id DESC");
        let news = sqlx::query_as::<_, NewsItem>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(news)
    }

    async fn list_news_by_author(&self, user_id: i64) -> RepoResult<Vec<NewsItem>> {
        let query =
            format!("{NEWS_ITEM_SELECT} WHERE n.created_by = $1 ORDER BY n.created_at DESC, n.id DESC");
        let news = sqlx::query_as::<_, NewsItem>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(news)
    }

    /// view_news
    ///
    /// The increment and the read happen in one statement (a data-modifying CTE), so concurrent
    /// readers each add exactly one view and each see their own increment.
    async fn view_news(&self, id: i64) -> RepoResult<Option<NewsItem>> {
        let news = sqlx::query_as::<_, NewsItem>(
            r#"
            WITH bumped AS (
                UPDATE news SET views = views + 1 WHERE id = $1
                RETURNING id, title, content, image_url, category_id, created_by, views, created_at, updated_at
            )
            SELECT
                b.id, b.title, b.content, b.image_url, b.category_id,
                c.name AS category_name,
                b.created_by,
                u.username AS publisher,
                b.views AS view_count,
                b.created_at, b.updated_at
            FROM bumped b
            LEFT JOIN categories c ON b.category_id = c.id
            LEFT JOIN users u ON b.created_by = u.id
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(news)
    }

    async fn get_news(&self, id: i64) -> RepoResult<Option<News>> {
        let query = format!("SELECT {NEWS_COLUMNS} FROM news WHERE id = $1");
        let news = sqlx::query_as::<_, News>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(news)
    }

    async fn create_news(&self, news: NewNews) -> RepoResult<News> {
        let query = format!(
            r#"INSERT INTO news (title, content, image_url, category_id, created_by)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING {NEWS_COLUMNS}"#
        );
        let created = sqlx::query_as::<_, News>(&query)
            .bind(news.title)
            .bind(news.content)
            .bind(news.image_url)
            .bind(news.category_id)
            .bind(news.created_by)
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }

    async fn update_news(&self, id: i64, changes: NewsChanges) -> RepoResult<Option<News>> {
        let query = format!(
            r#"UPDATE news
               SET title = $2, content = $3, image_url = $4, category_id = $5, updated_at = NOW()
               WHERE id = $1
               RETURNING {NEWS_COLUMNS}"#
        );
        let updated = sqlx::query_as::<_, News>(&query)
            .bind(id)
            .bind(changes.title)
            .bind(changes.content)
            .bind(changes.image_url)
            .bind(changes.category_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(updated)
    }

    async fn delete_news(&self, id: i64) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM news WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear_content(&self) -> RepoResult<ClearSummary> {
        let mut tx = self.pool.begin().await?;
        // News first: it references categories.
        let news = sqlx::query("DELETE FROM news").execute(&mut *tx).await?;
        let categories = sqlx::query("DELETE FROM categories")
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(ClearSummary {
            news_deleted: news.rows_affected(),
            categories_deleted: categories.rows_affected(),
        })
    }
}
