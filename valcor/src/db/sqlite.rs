//! SQLite-backed reference implementation of the corpus store.
//!
//! SQLite has no built-in `REGEXP`; a scalar function backed by the regex
//! crate is registered on every connection, with an LRU cache so the handful
//! of partition patterns is compiled once per connection, not per row.

use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::{Arc, Mutex};

use lru::LruCache;
use regex::Regex;
use rusqlite::functions::FunctionFlags;
use rusqlite::types::{ToSql, ValueRef};
use rusqlite::Connection;
use valcor_core::sql::{Statement, Value};

use crate::db::{CorpusStore, Field, Row};
use crate::errors::Result;

const REGEX_CACHE_SIZE: usize = 64;

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<SqliteStore> {
        Self::wrap(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<SqliteStore> {
        Self::wrap(Connection::open_in_memory()?)
    }

    fn wrap(conn: Connection) -> Result<SqliteStore> {
        register_regexp(&conn)?;
        Ok(SqliteStore { conn })
    }

    /// Direct access to the connection, for corpus loading and tests. The
    /// engine itself only reads through [`CorpusStore::rows`].
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Create the corpus tables if they do not exist yet.
    pub fn create_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS sentences (
                sent_id             TEXT PRIMARY KEY,
                text                TEXT,
                transliterated_text TEXT,
                translated_text     TEXT
            );
            CREATE TABLE IF NOT EXISTS words (
                sent_id  TEXT NOT NULL,
                token_id INTEGER NOT NULL,
                form     TEXT,
                feat     TEXT,
                gloss    TEXT,
                head_id  INTEGER,
                dep_rel  TEXT,
                pos      TEXT,
                PRIMARY KEY (sent_id, token_id)
            );
            CREATE TABLE IF NOT EXISTS verbs (
                sent_id       TEXT NOT NULL,
                token_id      INTEGER NOT NULL,
                lemma         TEXT,
                translit_verb TEXT,
                gloss         TEXT,
                url           TEXT,
                VerbForm      TEXT,
                Aspect        TEXT,
                \"Case\"      TEXT,
                Connegative   TEXT,
                Mood          TEXT,
                Number        TEXT,
                Person        TEXT,
                Tense         TEXT,
                Voice         TEXT,
                PRIMARY KEY (sent_id, token_id)
            );
            CREATE TABLE IF NOT EXISTS arguments (
                sent_id              TEXT NOT NULL,
                head_id              INTEGER NOT NULL,
                token_id             INTEGER NOT NULL,
                dep_rel              TEXT,
                lemma                TEXT,
                translit_lemma       TEXT,
                case_value           TEXT,
                translit_dep_lemma   TEXT,
                cdep_token_id        INTEGER,
                second_cdep_token_id INTEGER,
                fdep_token_id        INTEGER,
                PRIMARY KEY (sent_id, head_id, token_id)
            );
            CREATE INDEX IF NOT EXISTS idx_verbs_lemma ON verbs (lemma);
            CREATE INDEX IF NOT EXISTS idx_verbs_translit ON verbs (translit_verb);
            CREATE INDEX IF NOT EXISTS idx_arguments_head ON arguments (sent_id, head_id);
            ",
        )?;
        Ok(())
    }
}

impl CorpusStore for SqliteStore {
    fn rows(&self, statement: &Statement) -> Result<Vec<Row>> {
        trace!("store query: {}", statement.sql);
        let mut stmt = self.conn.prepare(&statement.sql)?;

        let named: Vec<(String, rusqlite::types::Value)> = statement
            .params
            .iter()
            .map(|(name, value)| {
                let v = match value {
                    Value::Text(t) => rusqlite::types::Value::Text(t.clone()),
                    Value::Integer(i) => rusqlite::types::Value::Integer(*i),
                };
                (format!(":{}", name), v)
            })
            .collect();
        let bound: Vec<(&str, &dyn ToSql)> = named
            .iter()
            .map(|(n, v)| (n.as_str(), v as &dyn ToSql))
            .collect();

        let column_count = stmt.column_count();
        let mut rows = stmt.query(bound.as_slice())?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut fields = Vec::with_capacity(column_count);
            for idx in 0..column_count {
                let field = match row.get_ref(idx)? {
                    ValueRef::Null => Field::Null,
                    ValueRef::Integer(i) => Field::Integer(i),
                    ValueRef::Real(f) => Field::Text(f.to_string()),
                    ValueRef::Text(t) => Field::Text(String::from_utf8_lossy(t).into_owned()),
                    ValueRef::Blob(_) => Field::Null,
                };
                fields.push(field);
            }
            out.push(Row(fields));
        }
        Ok(out)
    }
}

fn register_regexp(conn: &Connection) -> Result<()> {
    let cache: Arc<Mutex<LruCache<String, Regex>>> = Arc::new(Mutex::new(LruCache::new(
        NonZeroUsize::new(REGEX_CACHE_SIZE).unwrap_or(NonZeroUsize::MIN),
    )));

    conn.create_scalar_function(
        "regexp",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        move |ctx| {
            let pattern = ctx.get::<String>(0)?;
            let haystack = match ctx.get::<Option<String>>(1)? {
                Some(h) => h,
                None => return Ok(false),
            };
            let mut cache = cache
                .lock()
                .map_err(|e| rusqlite::Error::UserFunctionError(e.to_string().into()))?;
            if let Some(re) = cache.get(&pattern) {
                return Ok(re.is_match(&haystack));
            }
            let re = Regex::new(&pattern)
                .map_err(|e| rusqlite::Error::UserFunctionError(Box::new(e)))?;
            let matched = re.is_match(&haystack);
            cache.put(pattern, re);
            Ok(matched)
        },
    )?;
    Ok(())
}
