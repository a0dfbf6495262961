//! SQLite backend.
//!
//! Embedded relational store running the same SQL as the MySQL backend.
//! Useful as a baseline and for running the suite without any server.

use rusqlite::functions::FunctionFlags;
use rusqlite::{params, Connection};

use crate::dataset::Dataset;
use crate::error::Result;
use crate::query::{
    like_prefix, BorrowCount, HistoryEntry, QueryId, QueryParams, QueryRows, TitleCount,
};

use super::sql;
use super::{Backend, BackendKind, LoadSummary};

/// SQLite backend for benchmarks.
pub struct SqliteBackend {
    conn: Connection,
}

impl SqliteBackend {
    /// Open an in-memory database.
    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    /// Open `target`, which is a file path or `:memory:`.
    pub fn open(target: &str) -> Result<Self> {
        if target.is_empty() || target == ":memory:" {
            return Self::in_memory();
        }
        Self::with_connection(Connection::open(target)?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        register_functions(&conn)?;
        let backend = Self { conn };
        backend.setup_schema()?;
        Ok(backend)
    }

    /// Create the library tables (books, borrowers, transactions).
    fn setup_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS books (
                book_id INTEGER PRIMARY KEY,
                title TEXT NOT NULL,
                author TEXT NOT NULL,
                year INTEGER NOT NULL,
                genre TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS borrowers (
                borrower_id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS transactions (
                transaction_id INTEGER PRIMARY KEY,
                book_id INTEGER NOT NULL,
                borrower_id INTEGER NOT NULL,
                borrow_date TEXT NOT NULL,
                return_date TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_transactions_book ON transactions(book_id);
            CREATE INDEX IF NOT EXISTS idx_transactions_borrower ON transactions(borrower_id);
            CREATE INDEX IF NOT EXISTS idx_books_genre ON books(genre);
            "#,
        )?;
        Ok(())
    }
}

/// Register `unicode_lower(text)`, a lower-casing that folds every script
/// the way the in-process backends do. SQLite's own `LOWER` is ASCII-only.
fn register_functions(conn: &Connection) -> Result<()> {
    conn.create_scalar_function(
        "unicode_lower",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| Ok(ctx.get::<String>(0)?.to_lowercase()),
    )?;
    Ok(())
}

impl Backend for SqliteBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Sqlite
    }

    fn load(&mut self, dataset: &Dataset) -> Result<LoadSummary> {
        let tx = self.conn.transaction()?;
        tx.execute_batch(
            "DELETE FROM transactions; DELETE FROM borrowers; DELETE FROM books;",
        )?;

        {
            let mut stmt = tx.prepare(sql::INSERT_BOOK)?;
            for book in &dataset.books {
                stmt.execute(params![
                    book.book_id,
                    &book.title,
                    &book.author,
                    book.year,
                    &book.genre
                ])?;
            }

            let mut stmt = tx.prepare(sql::INSERT_BORROWER)?;
            for borrower in &dataset.borrowers {
                stmt.execute(params![borrower.borrower_id, &borrower.name, &borrower.email])?;
            }

            let mut stmt = tx.prepare(sql::INSERT_TRANSACTION)?;
            for t in &dataset.transactions {
                stmt.execute(params![
                    t.transaction_id,
                    t.book_id,
                    t.borrower_id,
                    &t.borrow_date,
                    &t.return_date
                ])?;
            }
        }

        tx.commit()?;
        Ok(LoadSummary::from(dataset))
    }

    fn run_query(&mut self, query: QueryId, params: &QueryParams) -> Result<QueryRows> {
        let rows = match query {
            QueryId::NamePrefix => {
                let mut stmt = self.conn.prepare_cached(sql::NAME_PREFIX)?;
                let names = stmt
                    .query_map(params![like_prefix(&params.name_pattern)], |row| row.get(0))?
                    .collect::<rusqlite::Result<Vec<String>>>()?;
                QueryRows::Names(names)
            }
            QueryId::GenreBorrowCounts => {
                let mut stmt = self.conn.prepare_cached(sql::GENRE_BORROW_COUNTS)?;
                let counts = stmt
                    .query_map(params![&params.genre], |row| {
                        Ok(BorrowCount {
                            name: row.get(0)?,
                            count: row.get(1)?,
                        })
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                QueryRows::BorrowCounts(counts)
            }
            QueryId::TopBooks => {
                let mut stmt = self.conn.prepare_cached(sql::TOP_BOOKS)?;
                let top = stmt
                    .query_map(params![params.top_n as i64], |row| {
                        Ok(TitleCount {
                            title: row.get(0)?,
                            count: row.get(1)?,
                        })
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                QueryRows::TopBooks(top)
            }
            QueryId::ActiveBorrowerHistory => {
                let mut stmt = self.conn.prepare_cached(sql::ACTIVE_BORROWER_HISTORY)?;
                let history = stmt
                    .query_map(params![&params.since, params.min_borrows], |row| {
                        Ok(HistoryEntry {
                            name: row.get(0)?,
                            title: row.get(1)?,
                            borrow_date: row.get(2)?,
                            return_date: row.get(3)?,
                        })
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                QueryRows::History(history)
            }
        };
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Book, Borrower, Transaction};

    fn tiny_dataset() -> Dataset {
        let book = |id: i64, title: &str, genre: &str| Book {
            book_id: id,
            title: title.to_string(),
            author: "A. Writer".to_string(),
            year: 2000,
            genre: genre.to_string(),
        };
        let borrower = |id: i64, name: &str| Borrower {
            borrower_id: id,
            name: name.to_string(),
            email: format!("b{}@example.com", id),
        };
        let tx = |id: i64, book: i64, borrower: i64, date: &str| Transaction {
            transaction_id: id,
            book_id: book,
            borrower_id: borrower,
            borrow_date: date.to_string(),
            return_date: date.to_string(),
        };

        Dataset {
            books: vec![
                book(1, "Dune", "Fiction"),
                book(2, "Cosmos", "Science"),
                book(3, "Emma", "Fiction"),
            ],
            borrowers: vec![
                borrower(1, "Jane Roe"),
                borrower(2, "john Smith"),
                borrower(3, "Mary Jones"),
            ],
            transactions: vec![
                tx(1, 1, 1, "2022-03-01"),
                tx(2, 3, 1, "2022-04-01"),
                tx(3, 2, 1, "2023-01-01"),
                tx(4, 1, 2, "2021-05-01"),
                tx(5, 1, 3, "2022-06-01"),
                // book 9 does not exist
                tx(6, 9, 1, "2021-01-01"),
            ],
        }
    }

    fn loaded() -> SqliteBackend {
        let mut backend = SqliteBackend::in_memory().unwrap();
        backend.load(&tiny_dataset()).unwrap();
        backend
    }

    #[test]
    fn test_load_counts_and_reload_replaces() {
        let mut backend = SqliteBackend::in_memory().unwrap();
        let summary = backend.load(&tiny_dataset()).unwrap();
        assert_eq!(summary.total(), 12);

        backend.load(&tiny_dataset()).unwrap();
        let books: i64 = backend
            .conn
            .query_row("SELECT COUNT(*) FROM books", [], |row| row.get(0))
            .unwrap();
        assert_eq!(books, 3);
    }

    #[test]
    fn test_name_prefix_is_case_insensitive() {
        let mut backend = loaded();
        let rows = backend
            .run_query(QueryId::NamePrefix, &QueryParams::new("J"))
            .unwrap();
        assert_eq!(
            rows,
            QueryRows::Names(vec!["Jane Roe".to_string(), "john Smith".to_string()])
        );
    }

    #[test]
    fn test_name_prefix_folds_non_ascii() {
        let mut backend = SqliteBackend::in_memory().unwrap();
        let mut dataset = tiny_dataset();
        dataset.borrowers.push(Borrower {
            borrower_id: 4,
            name: "Élodie Martin".to_string(),
            email: "b4@example.com".to_string(),
        });
        backend.load(&dataset).unwrap();

        for pattern in ["é", "É", "élo"] {
            let rows = backend
                .run_query(QueryId::NamePrefix, &QueryParams::new(pattern))
                .unwrap();
            assert_eq!(rows, QueryRows::Names(vec!["Élodie Martin".to_string()]));
        }

        let lowered: String = backend
            .conn
            .query_row("SELECT unicode_lower('ÅSA Öberg')", [], |row| row.get(0))
            .unwrap();
        assert_eq!(lowered, "åsa öberg");
    }

    #[test]
    fn test_names_sort_by_code_point() {
        let mut backend = SqliteBackend::in_memory().unwrap();
        let mut dataset = tiny_dataset();
        dataset.borrowers.push(Borrower {
            borrower_id: 4,
            name: "jack Hill".to_string(),
            email: "b4@example.com".to_string(),
        });
        backend.load(&dataset).unwrap();

        let rows = backend
            .run_query(QueryId::NamePrefix, &QueryParams::new("j"))
            .unwrap();
        assert_eq!(
            rows,
            QueryRows::Names(vec![
                "Jane Roe".to_string(),
                "jack Hill".to_string(),
                "john Smith".to_string()
            ])
        );
        assert!(sql::NAME_PREFIX_MYSQL.trim_end().ends_with("ORDER BY name COLLATE utf8mb4_bin"));
    }

    #[test]
    fn test_genre_counts() {
        let mut backend = loaded();
        let rows = backend
            .run_query(QueryId::GenreBorrowCounts, &QueryParams::new(""))
            .unwrap()
            .normalized();
        assert_eq!(
            rows,
            QueryRows::BorrowCounts(vec![
                BorrowCount {
                    name: "Jane Roe".to_string(),
                    count: 2
                },
                BorrowCount {
                    name: "Mary Jones".to_string(),
                    count: 1
                },
                BorrowCount {
                    name: "john Smith".to_string(),
                    count: 1
                },
            ])
        );
    }

    #[test]
    fn test_top_books_breaks_ties_by_id() {
        let mut backend = loaded();
        let rows = backend
            .run_query(QueryId::TopBooks, &QueryParams::new(""))
            .unwrap();
        let titles: Vec<_> = match rows {
            QueryRows::TopBooks(rows) => rows.into_iter().map(|r| (r.title, r.count)).collect(),
            other => panic!("unexpected rows: {:?}", other),
        };
        assert_eq!(
            titles,
            vec![
                ("Dune".to_string(), 3),
                ("Cosmos".to_string(), 1),
                ("Emma".to_string(), 1)
            ]
        );
    }

    #[test]
    fn test_history_lists_all_borrows_of_active_borrowers() {
        let mut backend = loaded();
        let rows = backend
            .run_query(QueryId::ActiveBorrowerHistory, &QueryParams::new(""))
            .unwrap();
        // Jane has three borrows since 2022; the one for the missing book is dropped
        assert_eq!(rows.len(), 3);
        match rows {
            QueryRows::History(entries) => {
                assert!(entries.iter().all(|e| e.name == "Jane Roe"));
            }
            other => panic!("unexpected rows: {:?}", other),
        }
    }
}
