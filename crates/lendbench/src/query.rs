//! The four benchmark queries and their result rows.
//!
//! Every backend answers the same questions in its own query language:
//!
//! 1. borrowers whose name starts with a pattern (case-insensitive, sorted)
//! 2. per-borrower borrow counts for one genre
//! 3. the most borrowed books
//! 4. the full borrowing history of borrowers active since a date
//!
//! Joins follow inner-join semantics: transactions that point at a missing
//! book or borrower are left out of the output.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Query selector, tagged by its number in the results table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QueryId {
    /// Query 1.
    NamePrefix,
    /// Query 2.
    GenreBorrowCounts,
    /// Query 3.
    TopBooks,
    /// Query 4.
    ActiveBorrowerHistory,
}

impl QueryId {
    /// All queries in suite order.
    pub const ALL: [QueryId; 4] = [
        QueryId::NamePrefix,
        QueryId::GenreBorrowCounts,
        QueryId::TopBooks,
        QueryId::ActiveBorrowerHistory,
    ];

    /// Query number (1 to 4).
    pub fn number(&self) -> u8 {
        match self {
            QueryId::NamePrefix => 1,
            QueryId::GenreBorrowCounts => 2,
            QueryId::TopBooks => 3,
            QueryId::ActiveBorrowerHistory => 4,
        }
    }

    /// Look up a query by number.
    pub fn from_number(number: u8) -> Option<Self> {
        QueryId::ALL.into_iter().find(|q| q.number() == number)
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Query{}", self.number())
    }
}

impl FromStr for QueryId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let digits = s
            .strip_prefix("Query")
            .or_else(|| s.strip_prefix("query"))
            .unwrap_or(s);
        digits
            .trim()
            .parse::<u8>()
            .ok()
            .and_then(QueryId::from_number)
            .ok_or_else(|| Error::Config(format!("unknown query '{}' (expected 1 to 4)", s)))
    }
}

/// Default genre for query 2.
pub const DEFAULT_GENRE: &str = "Fiction";

/// Default lower bound on borrow dates for query 4.
pub const DEFAULT_SINCE: &str = "2022-01-01";

/// Query parameters shared by every backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParams {
    /// Prefix matched against borrower names (query 1).
    pub name_pattern: String,
    /// Genre counted in query 2.
    pub genre: String,
    /// Earliest borrow date counted in query 4 (`YYYY-MM-DD`).
    pub since: String,
    /// Borrowers need strictly more recent borrows than this (query 4).
    pub min_borrows: i64,
    /// Number of books returned by query 3.
    pub top_n: usize,
}

impl QueryParams {
    pub fn new(name_pattern: impl Into<String>) -> Self {
        Self {
            name_pattern: name_pattern.into(),
            ..Self::default()
        }
    }

    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = genre.into();
        self
    }

    pub fn with_since(mut self, since: impl Into<String>) -> Self {
        self.since = since.into();
        self
    }
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            name_pattern: String::new(),
            genre: DEFAULT_GENRE.to_string(),
            since: DEFAULT_SINCE.to_string(),
            min_borrows: 2,
            top_n: 5,
        }
    }
}

/// Borrow count for one borrower (query 2).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct BorrowCount {
    pub name: String,
    pub count: i64,
}

/// Borrow count for one book (query 3).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct TitleCount {
    pub title: String,
    pub count: i64,
}

/// One lending in a borrower's history (query 4).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct HistoryEntry {
    pub name: String,
    pub title: String,
    pub borrow_date: String,
    pub return_date: String,
}

/// Fully materialized query output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "rows", rename_all = "snake_case")]
pub enum QueryRows {
    Names(Vec<String>),
    BorrowCounts(Vec<BorrowCount>),
    TopBooks(Vec<TitleCount>),
    History(Vec<HistoryEntry>),
}

impl QueryRows {
    /// Number of rows returned.
    pub fn len(&self) -> usize {
        match self {
            QueryRows::Names(rows) => rows.len(),
            QueryRows::BorrowCounts(rows) => rows.len(),
            QueryRows::TopBooks(rows) => rows.len(),
            QueryRows::History(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sort outputs whose order no query defines, for comparison across backends.
    pub fn normalized(mut self) -> Self {
        match &mut self {
            QueryRows::Names(rows) => rows.sort(),
            QueryRows::BorrowCounts(rows) => rows.sort(),
            QueryRows::History(rows) => rows.sort(),
            QueryRows::TopBooks(_) => {}
        }
        self
    }
}

/// Case-insensitive prefix test used by query 1.
pub fn matches_prefix(name: &str, pattern: &str) -> bool {
    name.to_lowercase().starts_with(&pattern.to_lowercase())
}

/// Escape `%`, `_` and `\` for a SQL `LIKE ... ESCAPE '\'` pattern.
pub fn like_prefix(pattern: &str) -> String {
    let mut escaped = String::with_capacity(pattern.len() + 1);
    for ch in pattern.to_lowercase().chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

/// Escape regex metacharacters for an anchored prefix regex.
pub fn regex_prefix(pattern: &str) -> String {
    let mut escaped = String::with_capacity(pattern.len() + 1);
    escaped.push('^');
    for ch in pattern.chars() {
        if "\\.+*?()|[]{}^$".contains(ch) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
