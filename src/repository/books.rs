//! Books repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Sqlite};

use super::BookStore;
use crate::{
    error::{AppError, AppResult},
    models::book::{Book, NewBook, UpdateBook},
};

const BOOK_COLUMNS: &str = "id, title, author, isbn, publication_year, available";

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Sqlite>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookStore for BooksRepository {
    async fn save(&self, book: &NewBook) -> AppResult<Book> {
        let query = format!(
            r#"
            INSERT INTO books (title, author, isbn, publication_year, available)
            VALUES (?, ?, ?, ?, ?)
            RETURNING {}
            "#,
            BOOK_COLUMNS
        );

        sqlx::query_as::<_, Book>(&query)
            .bind(&book.title)
            .bind(&book.author)
            .bind(&book.isbn)
            .bind(book.publication_year)
            .bind(book.available)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                // Lost the race against a concurrent insert of the same ISBN
                sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                    AppError::Conflict(format!("ISBN {} is already registered", book.isbn))
                }
                other => AppError::Database(other),
            })
    }

    async fn find_all(&self) -> AppResult<Vec<Book>> {
        let query = format!("SELECT {} FROM books ORDER BY id ASC", BOOK_COLUMNS);
        let rows = sqlx::query_as::<_, Book>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<Book>> {
        let query = format!("SELECT {} FROM books WHERE id = ?", BOOK_COLUMNS);
        let row = sqlx::query_as::<_, Book>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_by_isbn(&self, isbn: &str) -> AppResult<Option<Book>> {
        let query = format!("SELECT {} FROM books WHERE isbn = ?", BOOK_COLUMNS);
        let row = sqlx::query_as::<_, Book>(&query)
            .bind(isbn)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn update(&self, id: i64, data: &UpdateBook) -> AppResult<Option<Book>> {
        if data.is_empty() {
            return self.find_by_id(id).await;
        }

        let mut sets: Vec<&str> = Vec::new();

        macro_rules! add_field {
            ($field:expr, $name:literal) => {
                if $field.is_some() {
                    sets.push(concat!($name, " = ?"));
                }
            };
        }

        add_field!(data.title, "title");
        add_field!(data.author, "author");
        add_field!(data.publication_year, "publication_year");
        add_field!(data.available, "available");

        let query = format!(
            "UPDATE books SET {} WHERE id = ? RETURNING {}",
            sets.join(", "),
            BOOK_COLUMNS
        );

        let mut builder = sqlx::query_as::<_, Book>(&query);

        macro_rules! bind_field {
            ($field:expr) => {
                if let Some(ref val) = $field {
                    builder = builder.bind(val);
                }
            };
        }

        bind_field!(data.title);
        bind_field!(data.author);
        bind_field!(data.publication_year);
        bind_field!(data.available);

        let row = builder.bind(id).fetch_optional(&self.pool).await?;
        Ok(row)
    }

    async fn delete(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
