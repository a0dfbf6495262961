//! Cassandra backend.
//!
//! Talks CQL through the `scylla` driver, which also works against Apache
//! Cassandra. CQL has no joins or cross-partition aggregation, so each query
//! fetches whole tables and joins them in process. Enable with
//! `--features cassandra`.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use scylla::cql_to_rust::FromRow;
use scylla::serialize::row::SerializeRow;
use scylla::{Session, SessionBuilder};
use tokio::runtime::Runtime;

use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::query::{
    matches_prefix, BorrowCount, HistoryEntry, QueryId, QueryParams, QueryRows, TitleCount,
};

use super::{Backend, BackendKind, LoadSummary};

const BACKEND: &str = "Cassandra";
const KEYSPACE: &str = "library";

const SCHEMA: [&str; 4] = [
    "CREATE KEYSPACE IF NOT EXISTS library \
     WITH replication = {'class': 'SimpleStrategy', 'replication_factor': 1}",
    "CREATE TABLE IF NOT EXISTS library.books (\
     book_id bigint PRIMARY KEY, title text, author text, year int, genre text)",
    "CREATE TABLE IF NOT EXISTS library.borrowers (\
     borrower_id bigint PRIMARY KEY, name text, email text)",
    "CREATE TABLE IF NOT EXISTS library.transactions (\
     transaction_id bigint PRIMARY KEY, book_id bigint, borrower_id bigint, \
     borrow_date text, return_date text)",
];

/// Cassandra backend for benchmarks.
pub struct CassandraBackend {
    session: Session,
    rt: Runtime,
}

impl CassandraBackend {
    /// Connect to a contact point such as `127.0.0.1:9042`.
    pub fn connect(node: &str) -> Result<Self> {
        let rt = Runtime::new()?;
        let session = rt
            .block_on(SessionBuilder::new().known_node(node).build())
            .map_err(backend_error)?;

        let backend = Self { session, rt };
        backend.setup_schema()?;
        Ok(backend)
    }

    fn setup_schema(&self) -> Result<()> {
        self.rt.block_on(async {
            for statement in SCHEMA {
                self.session
                    .query_unpaged(statement, ())
                    .await
                    .map_err(backend_error)?;
            }
            self.session
                .use_keyspace(KEYSPACE, false)
                .await
                .map_err(backend_error)
        })
    }

    /// Run an unpaged `SELECT` and decode every row.
    fn select<R: FromRow>(&self, cql: &str, values: impl SerializeRow) -> Result<Vec<R>> {
        self.rt.block_on(async {
            let result = self
                .session
                .query_unpaged(cql, values)
                .await
                .map_err(backend_error)?;
            result
                .rows_typed::<R>()
                .map_err(backend_error)?
                .collect::<std::result::Result<Vec<R>, _>>()
                .map_err(backend_error)
        })
    }

    fn book_titles(&self) -> Result<HashMap<i64, String>> {
        Ok(self
            .select::<(i64, String)>("SELECT book_id, title FROM books", ())?
            .into_iter()
            .collect())
    }

    fn borrower_names(&self) -> Result<HashMap<i64, String>> {
        Ok(self
            .select::<(i64, String)>("SELECT borrower_id, name FROM borrowers", ())?
            .into_iter()
            .collect())
    }

    fn names_with_prefix(&self, pattern: &str) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .select::<(String,)>("SELECT name FROM borrowers", ())?
            .into_iter()
            .map(|(name,)| name)
            .filter(|name| matches_prefix(name, pattern))
            .collect();
        names.sort();
        Ok(names)
    }

    fn genre_borrow_counts(&self, genre: &str) -> Result<Vec<BorrowCount>> {
        let books: HashSet<i64> = self
            .select::<(i64,)>(
                "SELECT book_id FROM books WHERE genre = ? ALLOW FILTERING",
                (genre,),
            )?
            .into_iter()
            .map(|(id,)| id)
            .collect();

        let mut counts: HashMap<i64, i64> = HashMap::new();
        for (book_id, borrower_id) in
            self.select::<(i64, i64)>("SELECT book_id, borrower_id FROM transactions", ())?
        {
            if books.contains(&book_id) {
                *counts.entry(borrower_id).or_insert(0) += 1;
            }
        }

        let names = self.borrower_names()?;
        Ok(counts
            .into_iter()
            .filter_map(|(borrower_id, count)| {
                names.get(&borrower_id).map(|name| BorrowCount {
                    name: name.clone(),
                    count,
                })
            })
            .collect())
    }

    fn top_books(&self, top_n: usize) -> Result<Vec<TitleCount>> {
        let mut frequency: HashMap<i64, i64> = HashMap::new();
        for (book_id,) in self.select::<(i64,)>("SELECT book_id FROM transactions", ())? {
            *frequency.entry(book_id).or_insert(0) += 1;
        }

        let mut ranked: Vec<(i64, i64)> = frequency.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        let titles = self.book_titles()?;
        Ok(ranked
            .into_iter()
            .filter_map(|(book_id, count)| {
                titles.get(&book_id).map(|title| TitleCount {
                    title: title.clone(),
                    count,
                })
            })
            .take(top_n)
            .collect())
    }

    fn active_borrower_history(&self, since: &str, min_borrows: i64) -> Result<Vec<HistoryEntry>> {
        let transactions = self.select::<(i64, i64, String, String)>(
            "SELECT borrower_id, book_id, borrow_date, return_date FROM transactions",
            (),
        )?;

        let mut recent: BTreeMap<i64, i64> = BTreeMap::new();
        for (borrower_id, _, borrow_date, _) in &transactions {
            if borrow_date.as_str() >= since {
                *recent.entry(*borrower_id).or_insert(0) += 1;
            }
        }

        let names = self.borrower_names()?;
        let titles = self.book_titles()?;
        let mut entries = Vec::new();
        for (borrower_id, book_id, borrow_date, return_date) in transactions {
            if recent.get(&borrower_id).copied().unwrap_or(0) <= min_borrows {
                continue;
            }
            if let (Some(name), Some(title)) = (names.get(&borrower_id), titles.get(&book_id)) {
                entries.push(HistoryEntry {
                    name: name.clone(),
                    title: title.clone(),
                    borrow_date,
                    return_date,
                });
            }
        }
        Ok(entries)
    }
}

impl Backend for CassandraBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Cassandra
    }

    fn load(&mut self, dataset: &Dataset) -> Result<LoadSummary> {
        let session = &self.session;
        self.rt.block_on(async {
            for table in ["books", "borrowers", "transactions"] {
                session
                    .query_unpaged(format!("TRUNCATE {}", table), ())
                    .await
                    .map_err(backend_error)?;
            }

            let insert = session
                .prepare(
                    "INSERT INTO books (book_id, title, author, year, genre) \
                     VALUES (?, ?, ?, ?, ?)",
                )
                .await
                .map_err(backend_error)?;
            for b in &dataset.books {
                session
                    .execute_unpaged(
                        &insert,
                        (
                            b.book_id,
                            b.title.as_str(),
                            b.author.as_str(),
                            b.year,
                            b.genre.as_str(),
                        ),
                    )
                    .await
                    .map_err(backend_error)?;
            }

            let insert = session
                .prepare("INSERT INTO borrowers (borrower_id, name, email) VALUES (?, ?, ?)")
                .await
                .map_err(backend_error)?;
            for b in &dataset.borrowers {
                session
                    .execute_unpaged(&insert, (b.borrower_id, b.name.as_str(), b.email.as_str()))
                    .await
                    .map_err(backend_error)?;
            }

            let insert = session
                .prepare(
                    "INSERT INTO transactions \
                     (transaction_id, book_id, borrower_id, borrow_date, return_date) \
                     VALUES (?, ?, ?, ?, ?)",
                )
                .await
                .map_err(backend_error)?;
            for t in &dataset.transactions {
                session
                    .execute_unpaged(
                        &insert,
                        (
                            t.transaction_id,
                            t.book_id,
                            t.borrower_id,
                            t.borrow_date.as_str(),
                            t.return_date.as_str(),
                        ),
                    )
                    .await
                    .map_err(backend_error)?;
            }
            Ok::<_, Error>(())
        })?;

        Ok(LoadSummary::from(dataset))
    }

    fn run_query(&mut self, query: QueryId, params: &QueryParams) -> Result<QueryRows> {
        Ok(match query {
            QueryId::NamePrefix => QueryRows::Names(self.names_with_prefix(&params.name_pattern)?),
            QueryId::GenreBorrowCounts => {
                QueryRows::BorrowCounts(self.genre_borrow_counts(&params.genre)?)
            }
            QueryId::TopBooks => QueryRows::TopBooks(self.top_books(params.top_n)?),
            QueryId::ActiveBorrowerHistory => QueryRows::History(
                self.active_borrower_history(&params.since, params.min_borrows)?,
            ),
        })
    }
}

fn backend_error(e: impl fmt::Display) -> Error {
    Error::backend(BACKEND, e)
}
