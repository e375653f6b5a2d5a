//! Catalog management service

use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, CreateBook, UpdateBook},
    repository::BookStore,
};

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn BookStore>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn BookStore>) -> Self {
        Self { store }
    }

    /// Validate and insert a new book, refusing a known ISBN.
    ///
    /// The lookup and the insert are separate statements, so two concurrent
    /// creates can both pass the lookup; the UNIQUE constraint on `isbn`
    /// then turns the loser's insert into a conflict as well.
    pub async fn create_book(&self, data: CreateBook) -> AppResult<Book> {
        let book = data.into_new_book().map_err(AppError::Validation)?;

        if self.store.find_by_isbn(&book.isbn).await?.is_some() {
            return Err(AppError::Conflict(
                "ISBN is already registered".to_string(),
            ));
        }

        let created = self.store.save(&book).await?;
        tracing::info!("Catalog create: book id={} isbn={}", created.id, created.isbn);
        Ok(created)
    }

    pub async fn list_books(&self) -> AppResult<Vec<Book>> {
        self.store.find_all().await
    }

    pub async fn get_book(&self, id: i64) -> AppResult<Book> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Book not found".to_string()))
    }

    /// Merge `data` into the stored book. The merged record must still pass
    /// validation before anything is written.
    pub async fn update_book(&self, id: i64, data: UpdateBook) -> AppResult<Book> {
        let mut merged = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Book not found for update".to_string()))?;
        data.apply_to(&mut merged);

        let errors = merged.validate();
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }

        let updated = self
            .store
            .update(id, &data)
            .await?
            .ok_or_else(|| AppError::NotFound("Book not found for update".to_string()))?;
        tracing::info!("Catalog update: book id={}", id);
        Ok(updated)
    }

    pub async fn delete_book(&self, id: i64) -> AppResult<()> {
        if !self.store.delete(id).await? {
            return Err(AppError::NotFound("Book not found for deletion".to_string()));
        }
        tracing::info!("Catalog delete: book id={}", id);
        Ok(())
    }

    /// Check that the storage engine answers
    pub async fn ping(&self) -> AppResult<()> {
        self.store.ping().await
    }
}
