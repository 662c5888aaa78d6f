use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

use crate::error::Result;
use crate::extractor::ExtractionResult;

/// Persistence collaborator for extracted stories.
///
/// Only the pipeline mutates the store during a run; lookups and writes are
/// synchronous.
pub trait StoryStore {
    fn contains_url(&self, url: &str) -> Result<bool>;

    /// Persist a record and return its id.
    fn insert(&mut self, result: &ExtractionResult) -> Result<String>;

    fn delete(&mut self, id: &str) -> Result<()>;
}

/// A persisted story row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredStory {
    pub id: String,
    pub crawled_at: String,
    #[serde(flatten)]
    pub result: ExtractionResult,
}

/// SQLite-backed story store
pub struct SqliteStoryStore {
    conn: Connection,
}

impl SqliteStoryStore {
    /// Open (or create) the database and initialize the schema
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Create an in-memory database (for testing and dry runs)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS stories (
                id TEXT PRIMARY KEY,
                url TEXT NOT NULL UNIQUE,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                author TEXT,
                domain TEXT NOT NULL,
                word_count INTEGER NOT NULL,
                crawled_at TEXT NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_stories_domain ON stories(domain)",
            [],
        )?;

        Ok(())
    }

    pub fn get_by_url(&self, url: &str) -> Result<Option<StoredStory>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, url, title, content, author, domain, word_count, crawled_at
             FROM stories
             WHERE url = ?1",
        )?;

        let story = stmt
            .query_row([url], |row| {
                let content: String = row.get(3)?;
                Ok(StoredStory {
                    id: row.get(0)?,
                    crawled_at: row.get(7)?,
                    result: ExtractionResult {
                        url: row.get(1)?,
                        title: row.get(2)?,
                        degenerate: content.is_empty(),
                        content,
                        author: row.get(4)?,
                        domain: row.get(5)?,
                        word_count: row.get::<_, i64>(6)? as usize,
                    },
                })
            })
            .optional()?;

        Ok(story)
    }

    pub fn count(&self) -> Result<usize> {
        let total: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM stories", [], |row| row.get(0))?;
        Ok(total as usize)
    }
}

impl StoryStore for SqliteStoryStore {
    fn contains_url(&self, url: &str) -> Result<bool> {
        let found = self
            .conn
            .query_row("SELECT 1 FROM stories WHERE url = ?1", [url], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    fn insert(&mut self, result: &ExtractionResult) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO stories
            (id, url, title, content, author, domain, word_count, crawled_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                id,
                result.url,
                result.title,
                result.content,
                result.author,
                result.domain,
                result.word_count as i64,
                chrono::Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(id)
    }

    fn delete(&mut self, id: &str) -> Result<()> {
        self.conn.execute("DELETE FROM stories WHERE id = ?1", [id])?;
        log::debug!("Deleted story: {}", id);
        Ok(())
    }
}

/// In-process store for tests and `--dry-run`
#[derive(Debug, Default)]
pub struct MemoryStoryStore {
    stories: Vec<StoredStory>,
}

impl MemoryStoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed URLs that should count as already stored.
    pub fn with_urls<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut store = Self::new();
        for url in urls {
            let url = url.into();
            store.stories.push(StoredStory {
                id: Uuid::new_v4().to_string(),
                crawled_at: chrono::Utc::now().to_rfc3339(),
                result: ExtractionResult {
                    domain: crate::utils::domain_of_str(&url),
                    url,
                    title: crate::title::UNTITLED.to_string(),
                    content: String::new(),
                    author: None,
                    word_count: 0,
                    degenerate: true,
                },
            });
        }
        store
    }

    pub fn stories(&self) -> &[StoredStory] {
        &self.stories
    }

    pub fn len(&self) -> usize {
        self.stories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stories.is_empty()
    }
}

impl StoryStore for MemoryStoryStore {
    fn contains_url(&self, url: &str) -> Result<bool> {
        Ok(self.stories.iter().any(|s| s.result.url == url))
    }

    fn insert(&mut self, result: &ExtractionResult) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        self.stories.push(StoredStory {
            id: id.clone(),
            crawled_at: chrono::Utc::now().to_rfc3339(),
            result: result.clone(),
        });
        Ok(id)
    }

    fn delete(&mut self, id: &str) -> Result<()> {
        self.stories.retain(|s| s.id != id);
        Ok(())
    }
}
