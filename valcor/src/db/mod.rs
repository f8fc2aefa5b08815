//! The store boundary and the query layers built on top of it.
//!
//! The corpus lives in an external relational store that the engine treats
//! as a read-only shared resource: no locks, no transactions, no write path.
//! The engine composes [`Statement`]s (SQL text plus named parameters) and
//! hands them to a [`CorpusStore`]; any engine supporting equality, `IN`,
//! `LIKE`, one regex-style predicate, `GROUP BY`/`COUNT(DISTINCT …)` and a
//! CTE-style intermediate aggregation suffices.

use valcor_core::sql::Statement;

use crate::errors::{Result, ValcorError};

pub mod assemble;
pub mod compose;
pub mod facets;
pub mod paginate;
pub mod sqlite;

/// One column value of a result row.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Null,
    Integer(i64),
    Text(String),
}

/// One result row, indexed positionally in select-list order.
#[derive(Debug, Clone, PartialEq)]
pub struct Row(pub Vec<Field>);

impl Row {
    pub fn text(&self, index: usize) -> Option<&str> {
        match self.0.get(index) {
            Some(Field::Text(t)) => Some(t.as_str()),
            _ => None,
        }
    }

    pub fn integer(&self, index: usize) -> Option<i64> {
        match self.0.get(index) {
            Some(Field::Integer(i)) => Some(*i),
            // Stores are free to return counts as text.
            Some(Field::Text(t)) => t.parse().ok(),
            _ => None,
        }
    }

    pub fn require_text(&self, index: usize) -> Result<&str> {
        match self.0.get(index) {
            Some(Field::Text(t)) => Ok(t.as_str()),
            Some(_) => Err(ValcorError::UnexpectedFieldType { index }),
            None => Err(ValcorError::MissingField { index }),
        }
    }

    pub fn require_integer(&self, index: usize) -> Result<i64> {
        match self.0.get(index) {
            Some(Field::Integer(i)) => Ok(*i),
            Some(Field::Text(t)) => t
                .parse()
                .map_err(|_| ValcorError::UnexpectedFieldType { index }),
            Some(Field::Null) => Err(ValcorError::UnexpectedFieldType { index }),
            None => Err(ValcorError::MissingField { index }),
        }
    }
}

/// Read-only access to the corpus store.
///
/// Implementations execute one statement per call; the engine keeps the
/// number of calls bounded (sentence assembly issues a fixed number of
/// batched queries for a whole page, never one query per sentence).
pub trait CorpusStore {
    fn rows(&self, statement: &Statement) -> Result<Vec<Row>>;
}

/// Collect the first column of every row as text, dropping NULLs.
pub fn text_column(rows: &[Row]) -> Vec<String> {
    rows.iter()
        .filter_map(|r| r.text(0).map(str::to_string))
        .collect()
}
