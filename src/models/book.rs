//! Book model, request payloads and self-validation.

use chrono::{Datelike, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

pub const MIN_TITLE_LEN: usize = 2;
pub const MIN_AUTHOR_LEN: usize = 3;
pub const MIN_PUBLICATION_YEAR: i32 = 1000;

static ISBN_13: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{13}$").unwrap());

/// Stored book record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    /// 13 digits, hyphens removed
    pub isbn: String,
    pub publication_year: i32,
    pub available: bool,
}

impl Book {
    /// Re-check a stored or merged record against the creation rules.
    pub fn validate(&self) -> Vec<String> {
        self.validate_for_year(current_year())
    }

    pub fn validate_for_year(&self, current_year: i32) -> Vec<String> {
        validate_fields(
            Some(&self.title),
            Some(&self.author),
            Some(&self.isbn),
            Some(self.publication_year),
            current_year,
        )
    }
}

/// Create book request.
///
/// Every field is optional on the wire, and a value of the wrong JSON type
/// reads as absent, so that [`CreateBook::validate`] reports it under its
/// rule together with the other failures.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBook {
    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub author: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    #[schema(example = "978-0441172719")]
    pub isbn: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub publication_year: Option<i32>,
    /// Defaults to `true`
    #[serde(default, deserialize_with = "lenient")]
    pub available: Option<bool>,
}

/// Read any JSON value, keeping it only when it has the expected type.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

impl CreateBook {
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        isbn: impl Into<String>,
        publication_year: i32,
    ) -> Self {
        Self {
            title: Some(title.into()),
            author: Some(author.into()),
            isbn: Some(isbn.into()),
            publication_year: Some(publication_year),
            available: None,
        }
    }

    pub fn available(mut self, available: bool) -> Self {
        self.available = Some(available);
        self
    }

    /// Collect every rule violation, in rule order. Empty means valid.
    pub fn validate(&self) -> Vec<String> {
        self.validate_for_year(current_year())
    }

    pub fn validate_for_year(&self, current_year: i32) -> Vec<String> {
        validate_fields(
            self.title.as_deref(),
            self.author.as_deref(),
            self.isbn.as_deref(),
            self.publication_year,
            current_year,
        )
    }

    /// Turn a valid request into the record to persist, applying defaults.
    pub fn into_new_book(self) -> Result<NewBook, Vec<String>> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(errors);
        }

        match (self.title, self.author, self.isbn, self.publication_year) {
            (Some(title), Some(author), Some(isbn), Some(publication_year)) => Ok(NewBook {
                title: title.trim().to_string(),
                author: author.trim().to_string(),
                isbn: normalize_isbn(&isbn),
                publication_year,
                available: self.available.unwrap_or(true),
            }),
            _ => Err(vec!["Missing required fields".to_string()]),
        }
    }
}

/// A validated book ready to be inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub publication_year: i32,
    pub available: bool,
}

/// Update book request. `isbn` is immutable and therefore absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBook {
    pub title: Option<String>,
    pub author: Option<String>,
    pub publication_year: Option<i32>,
    pub available: Option<bool>,
}

impl UpdateBook {
    /// Build an update from a raw JSON object, rejecting any `isbn` key
    /// whatever its value.
    pub fn from_payload(payload: Map<String, Value>) -> AppResult<Self> {
        if payload.contains_key("isbn") {
            return Err(AppError::BadRequest("ISBN cannot be changed".to_string()));
        }

        let mut update: UpdateBook = serde_json::from_value(Value::Object(payload))
            .map_err(|e| AppError::Validation(vec![format!("Invalid field value: {}", e)]))?;
        update.title = update.title.map(|t| t.trim().to_string());
        update.author = update.author.map(|a| a.trim().to_string());
        Ok(update)
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.publication_year.is_none()
            && self.available.is_none()
    }

    /// Merge the supplied fields over `book`; absent fields stay untouched.
    pub fn apply_to(&self, book: &mut Book) {
        if let Some(ref title) = self.title {
            book.title = title.clone();
        }
        if let Some(ref author) = self.author {
            book.author = author.clone();
        }
        if let Some(year) = self.publication_year {
            book.publication_year = year;
        }
        if let Some(available) = self.available {
            book.available = available;
        }
    }
}

/// Strip hyphens from an ISBN.
pub fn normalize_isbn(isbn: &str) -> String {
    isbn.replace('-', "")
}

pub fn current_year() -> i32 {
    Utc::now().year()
}

fn validate_fields(
    title: Option<&str>,
    author: Option<&str>,
    isbn: Option<&str>,
    publication_year: Option<i32>,
    current_year: i32,
) -> Vec<String> {
    let mut errors = Vec::new();

    if title.map_or(true, |t| t.trim().chars().count() < MIN_TITLE_LEN) {
        errors.push(format!("Title must be at least {} characters long", MIN_TITLE_LEN));
    }

    if author.map_or(true, |a| a.trim().chars().count() < MIN_AUTHOR_LEN) {
        errors.push(format!("Author must be at least {} characters long", MIN_AUTHOR_LEN));
    }

    if isbn.map_or(true, |i| !ISBN_13.is_match(&normalize_isbn(i))) {
        errors.push("ISBN must have 13 digits".to_string());
    }

    if publication_year.map_or(true, |y| !(MIN_PUBLICATION_YEAR..=current_year).contains(&y)) {
        errors.push(format!(
            "Publication year must be between {} and {}",
            MIN_PUBLICATION_YEAR, current_year
        ));
    }

    errors
}
