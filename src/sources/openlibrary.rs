//! Open Library source: book search, ISBN lookup, authors and subjects.

use serde_json::{json, Value};
use std::time::Duration;

use crate::models::Record;
use crate::sources::{
    error_record, sentinel, Adapter, ClientError, ClientOptions, Endpoint, ErrorMode,
    SourceCapabilities,
};
use crate::utils::{into_record, map_array, pick};

const OPEN_LIBRARY_BASE: &str = "https://openlibrary.org";
const USER_AGENT: &str = "research-clients-openlibrary/1.0";

/// Subjects kept per search hit
const SUBJECTS_PER_BOOK: usize = 5;

#[derive(Debug, Clone)]
pub struct OpenLibraryClient {
    endpoint: Endpoint,
}

impl OpenLibraryClient {
    pub fn new(options: ClientOptions) -> Result<Self, ClientError> {
        let endpoint = options
            .endpoint(OPEN_LIBRARY_BASE, Duration::from_secs(30))?
            .with_header("User-Agent", USER_AGENT);
        Ok(Self { endpoint })
    }

    /// Full-text search over titles, authors and ISBNs
    pub async fn search_books(&self, query: &str, limit: usize) -> Result<Record, ClientError> {
        tracing::info!("Searching Open Library: {}", query);

        let request = self
            .endpoint
            .get("/search.json")
            .query("q", query)
            .query("limit", limit);

        let outcome = self.endpoint.fetch_json(&request).await.and_then(|data| {
            into_record(json!({
                "query": query,
                "num_found": data.get("numFound").cloned().unwrap_or(json!(0)),
                "books": map_array(&data, "/docs", book_summary),
            }))
        });

        sentinel("openlibrary", "search_books", outcome)
    }

    /// Edition details for an ISBN-10 or ISBN-13
    pub async fn get_book_by_isbn(&self, isbn: &str) -> Result<Record, ClientError> {
        let bibkey = format!("ISBN:{}", isbn.replace('-', "").trim());
        tracing::info!("Looking up {}", bibkey);

        let request = self
            .endpoint
            .get("/api/books")
            .query("bibkeys", &bibkey)
            .query("format", "json")
            .query("jscmd", "data");

        let outcome = self.endpoint.fetch_json(&request).await.and_then(|data| {
            let book = match data.get(&bibkey) {
                Some(book) if book.as_object().is_some_and(|b| !b.is_empty()) => book,
                _ => return Ok(error_record("Book not found")),
            };
            into_record(json!({
                "title": pick(book, "/title"),
                "authors": map_array(book, "/authors", |a| pick(a, "/name")),
                "publish_date": pick(book, "/publish_date"),
                "publishers": map_array(book, "/publishers", |p| pick(p, "/name")),
                "number_of_pages": pick(book, "/number_of_pages"),
                "subjects": map_array(book, "/subjects", |s| pick(s, "/name")),
                "cover": pick(book, "/cover/large"),
                "url": pick(book, "/url"),
            }))
        });

        sentinel("openlibrary", "get_book_by_isbn", outcome)
    }

    /// Author record; accepts `OL23919A` or `/authors/OL23919A`
    pub async fn get_author(&self, author_key: &str) -> Result<Record, ClientError> {
        let key = if author_key.starts_with("/authors/") {
            author_key.to_string()
        } else {
            format!("/authors/{}", author_key)
        };

        let request = self.endpoint.get(&format!("{}.json", key));
        let outcome = self.endpoint.fetch_json(&request).await.and_then(|data| {
            // bio is either a plain string or {"type": ..., "value": ...}
            let bio = match data.get("bio") {
                Some(Value::Object(bio)) => bio.get("value").cloned().unwrap_or(Value::Null),
                Some(bio) => bio.clone(),
                None => Value::Null,
            };
            into_record(json!({
                "name": pick(&data, "/name"),
                "birth_date": pick(&data, "/birth_date"),
                "death_date": pick(&data, "/death_date"),
                "bio": bio,
                "photo": pick(&data, "/photos/0"),
                "wikipedia": pick(&data, "/wikipedia"),
                "key": pick(&data, "/key"),
            }))
        });

        sentinel("openlibrary", "get_author", outcome)
    }

    /// Works filed under a subject slug such as `science_fiction`
    pub async fn get_subjects(&self, subject: &str, limit: usize) -> Result<Record, ClientError> {
        let request = self
            .endpoint
            .get(&format!("/subjects/{}.json", subject))
            .query("limit", limit);

        let outcome = self.endpoint.fetch_json(&request).await.and_then(|data| {
            into_record(json!({
                "subject": subject,
                "work_count": data.get("work_count").cloned().unwrap_or(json!(0)),
                "books": map_array(&data, "/works", |work| json!({
                    "title": pick(work, "/title"),
                    "authors": map_array(work, "/authors", |a| pick(a, "/name")),
                    "first_publish_year": pick(work, "/first_publish_year"),
                    "key": pick(work, "/key"),
                    "cover_id": pick(work, "/cover_id"),
                })),
            }))
        });

        sentinel("openlibrary", "get_subjects", outcome)
    }
}

fn book_summary(doc: &Value) -> Value {
    let list = |key: &str| doc.get(key).cloned().unwrap_or(json!([]));
    let subjects: Vec<Value> = doc
        .get("subject")
        .and_then(Value::as_array)
        .map(|s| s.iter().take(SUBJECTS_PER_BOOK).cloned().collect())
        .unwrap_or_default();

    json!({
        "title": pick(doc, "/title"),
        "author": list("author_name"),
        "first_publish_year": pick(doc, "/first_publish_year"),
        "isbn": list("isbn"),
        "publisher": list("publisher"),
        "language": list("language"),
        "subject": subjects,
        "key": pick(doc, "/key"),
        "cover_id": pick(doc, "/cover_i"),
    })
}

impl Adapter for OpenLibraryClient {
    fn id(&self) -> &'static str {
        "openlibrary"
    }

    fn name(&self) -> &'static str {
        "Open Library"
    }

    fn error_mode(&self) -> ErrorMode {
        ErrorMode::Sentinel
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::SEARCH | SourceCapabilities::LOOKUP
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::is_error_record;
    use crate::transport::{MockTransport, TransportError};
    use std::sync::Arc;

    fn client(mock: Arc<MockTransport>) -> OpenLibraryClient {
        OpenLibraryClient::new(ClientOptions::new().transport(mock)).unwrap()
    }

    #[tokio::test]
    async fn test_search_books_keeps_five_subjects() {
        let mock = Arc::new(MockTransport::new());
        mock.respond_json(
            "https://openlibrary.org/search.json",
            200,
            json!({
                "numFound": 1,
                "docs": [{
                    "title": "Dune",
                    "author_name": ["Frank Herbert"],
                    "first_publish_year": 1965,
                    "subject": ["a", "b", "c", "d", "e", "f", "g"],
                    "key": "/works/OL893415W",
                    "cover_i": 11481354
                }]
            }),
        );

        let result = client(mock).search_books("dune", 10).await.unwrap();
        assert_eq!(result["num_found"], 1);
        let book = &result["books"][0];
        assert_eq!(book["author"], json!(["Frank Herbert"]));
        assert_eq!(book["subject"], json!(["a", "b", "c", "d", "e"]));
        assert_eq!(book["isbn"], json!([]));
    }

    #[tokio::test]
    async fn test_book_by_isbn() {
        let mock = Arc::new(MockTransport::new());
        mock.respond_json(
            "https://openlibrary.org/api/books",
            200,
            json!({
                "ISBN:9780441013593": {
                    "title": "Dune",
                    "authors": [{ "name": "Frank Herbert", "url": "https://openlibrary.org/authors/OL79034A" }],
                    "publishers": [{ "name": "Ace Books" }],
                    "number_of_pages": 528,
                    "cover": { "large": "https://covers.openlibrary.org/b/id/1-L.jpg" }
                }
            }),
        );

        let result = client(mock.clone()).get_book_by_isbn("978-0441013593").await.unwrap();
        assert_eq!(result["authors"], json!(["Frank Herbert"]));
        assert_eq!(result["publishers"], json!(["Ace Books"]));
        assert_eq!(result["subjects"], json!([]));
        assert_eq!(
            mock.last_request().unwrap().query_value("bibkeys"),
            Some("ISBN:9780441013593")
        );
    }

    #[tokio::test]
    async fn test_unknown_isbn() {
        let mock = Arc::new(MockTransport::new());
        mock.respond_json("https://openlibrary.org/api/books", 200, json!({}));

        let result = client(mock).get_book_by_isbn("0000000000").await.unwrap();
        assert_eq!(result, error_record("Book not found"));
    }

    #[tokio::test]
    async fn test_author_bio_shapes() {
        let mock = Arc::new(MockTransport::new());
        mock.respond_json(
            "https://openlibrary.org/authors/OL23919A.json",
            200,
            json!({
                "name": "J. K. Rowling",
                "bio": { "type": "/type/text", "value": "British author." },
                "photos": [5543033],
                "key": "/authors/OL23919A"
            }),
        );
        mock.respond_json(
            "https://openlibrary.org/authors/OL1A.json",
            200,
            json!({ "name": "Plain", "bio": "Short bio." }),
        );

        let openlibrary = client(mock);
        let rowling = openlibrary.get_author("OL23919A").await.unwrap();
        assert_eq!(rowling["bio"], "British author.");
        assert_eq!(rowling["photo"], 5543033);

        let plain = openlibrary.get_author("/authors/OL1A").await.unwrap();
        assert_eq!(plain["bio"], "Short bio.");
        assert_eq!(plain["photo"], Value::Null);
    }

    #[tokio::test]
    async fn test_subjects_failure_is_sentinel() {
        let mock = Arc::new(MockTransport::new());
        mock.fail(
            "https://openlibrary.org/subjects/",
            TransportError::Connect("refused".to_string()),
        );

        let result = client(mock).get_subjects("science_fiction", 5).await.unwrap();
        assert!(is_error_record(&result));
    }
}
