//! Repository layer for database operations

pub mod books;

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Sqlite,
};

use crate::{
    config::DatabaseConfig,
    error::AppResult,
    models::book::{Book, NewBook, UpdateBook},
};

/// Table definition applied at startup. `AUTOINCREMENT` keeps ids from
/// ever being handed out twice.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS books (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    author TEXT NOT NULL,
    isbn TEXT NOT NULL UNIQUE,
    publication_year INTEGER NOT NULL,
    available BOOLEAN NOT NULL DEFAULT 1
)
"#;

/// CRUD primitives over book storage
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookStore: Send + Sync {
    /// Insert a new book; the storage assigns its id
    async fn save(&self, book: &NewBook) -> AppResult<Book>;

    /// All books ordered by ascending id
    async fn find_all(&self) -> AppResult<Vec<Book>>;

    async fn find_by_id(&self, id: i64) -> AppResult<Option<Book>>;

    async fn find_by_isbn(&self, isbn: &str) -> AppResult<Option<Book>>;

    /// Write the supplied fields; `None` when no book has this id
    async fn update(&self, id: i64, data: &UpdateBook) -> AppResult<Option<Book>>;

    /// Whether a row was actually removed
    async fn delete(&self, id: i64) -> AppResult<bool>;

    /// Round-trip to the storage engine
    async fn ping(&self) -> AppResult<()>;
}

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Sqlite>,
    pub books: books::BooksRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self {
            books: books::BooksRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create the books table if it does not exist yet
    pub async fn init_schema(&self) -> AppResult<()> {
        sqlx::query(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }
}

/// Open a connection pool for the configured database, creating the file if needed.
pub async fn connect(config: &DatabaseConfig) -> Result<Pool<Sqlite>, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(&config.url)?.create_if_missing(true);

    pool_options(config).connect_with(options).await
}

fn pool_options(config: &DatabaseConfig) -> SqlitePoolOptions {
    // Every connection to `:memory:` opens its own private database, which
    // vanishes when that connection is closed.
    if config.url.contains(":memory:") {
        return SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    }

    SqlitePoolOptions::new().max_connections(config.max_connections)
}

#[cfg(test)]
pub(crate) async fn in_memory() -> Repository {
    let pool = connect(&DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
    })
    .await
    .unwrap();
    let repository = Repository::new(pool);
    repository.init_schema().await.unwrap();
    repository
}
