//! Key-value backend.
//!
//! Records are stored as hashes under `book:<id>`, `borrower:<id>` and
//! `transaction:<id>`. The store offers no joins or aggregation, so every
//! query scans key prefixes and joins across hash keys in process. The join
//! logic is written once against [`HashStore`] and shared by Redis and the
//! in-memory store.

use std::collections::{BTreeMap, HashMap};

use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::query::{
    matches_prefix, BorrowCount, HistoryEntry, QueryId, QueryParams, QueryRows, TitleCount,
};

use super::{Backend, BackendKind, LoadSummary};

/// Key prefixes, including the separator.
pub const BOOK_PREFIX: &str = "book:";
pub const BORROWER_PREFIX: &str = "borrower:";
pub const TRANSACTION_PREFIX: &str = "transaction:";

/// Hashes written per batch during a load.
const LOAD_BATCH: usize = 1_000;

/// Field/value pairs of one hash.
pub type Fields = Vec<(&'static str, String)>;

/// Minimal hash-oriented store interface.
pub trait HashStore {
    /// Which backend the store represents.
    fn kind(&self) -> BackendKind;

    /// Remove every key.
    fn flush(&mut self) -> Result<()>;

    /// Write a batch of hashes.
    fn put_hashes(&mut self, entries: &[(String, Fields)]) -> Result<()>;

    /// All keys starting with `prefix`.
    fn scan_keys(&mut self, prefix: &str) -> Result<Vec<String>>;

    /// Every field of the hash at `key`; empty when the key is missing.
    fn get_hash(&mut self, key: &str) -> Result<HashMap<String, String>>;
}

/// In-process [`HashStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    hashes: BTreeMap<String, HashMap<String, String>>,
}

impl MemoryStore {
    /// Number of stored hashes.
    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

impl HashStore for MemoryStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    fn flush(&mut self) -> Result<()> {
        self.hashes.clear();
        Ok(())
    }

    fn put_hashes(&mut self, entries: &[(String, Fields)]) -> Result<()> {
        for (key, fields) in entries {
            let hash = self.hashes.entry(key.clone()).or_default();
            for (field, value) in fields {
                hash.insert((*field).to_string(), value.clone());
            }
        }
        Ok(())
    }

    fn scan_keys(&mut self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .hashes
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect())
    }

    fn get_hash(&mut self, key: &str) -> Result<HashMap<String, String>> {
        Ok(self.hashes.get(key).cloned().unwrap_or_default())
    }
}

/// Benchmark backend over any [`HashStore`].
pub struct KeyValueBackend<S> {
    store: S,
}

impl<S: HashStore> KeyValueBackend<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Access the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    fn names_with_prefix(&mut self, pattern: &str) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for key in self.store.scan_keys(BORROWER_PREFIX)? {
            let borrower = self.store.get_hash(&key)?;
            let name = field(&borrower, "name");
            if matches_prefix(name, pattern) {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn genre_borrow_counts(&mut self, genre: &str) -> Result<Vec<BorrowCount>> {
        let mut genre_cache: HashMap<String, Option<String>> = HashMap::new();
        let mut counts: HashMap<String, i64> = HashMap::new();

        for key in self.store.scan_keys(TRANSACTION_PREFIX)? {
            let tx = self.store.get_hash(&key)?;
            let book_id = field(&tx, "book_id").to_string();
            let book_genre = match genre_cache.get(&book_id) {
                Some(cached) => cached.clone(),
                None => {
                    let book = self.store.get_hash(&format!("{}{}", BOOK_PREFIX, book_id))?;
                    let found = book.get("genre").cloned();
                    genre_cache.insert(book_id, found.clone());
                    found
                }
            };
            if book_genre.as_deref() == Some(genre) {
                *counts.entry(field(&tx, "borrower_id").to_string()).or_insert(0) += 1;
            }
        }

        let mut results = Vec::new();
        for key in self.store.scan_keys(BORROWER_PREFIX)? {
            let borrower_id = &key[BORROWER_PREFIX.len()..];
            if let Some(&count) = counts.get(borrower_id) {
                let borrower = self.store.get_hash(&key)?;
                results.push(BorrowCount {
                    name: field(&borrower, "name").to_string(),
                    count,
                });
            }
        }
        Ok(results)
    }

    fn top_books(&mut self, top_n: usize) -> Result<Vec<TitleCount>> {
        let mut frequency: HashMap<i64, i64> = HashMap::new();
        for key in self.store.scan_keys(TRANSACTION_PREFIX)? {
            let tx = self.store.get_hash(&key)?;
            *frequency.entry(parse_id(&tx, "book_id")?).or_insert(0) += 1;
        }

        let mut ranked: Vec<(i64, i64)> = frequency.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        let mut top = Vec::with_capacity(top_n);
        for (book_id, count) in ranked {
            if top.len() == top_n {
                break;
            }
            let book = self.store.get_hash(&format!("{}{}", BOOK_PREFIX, book_id))?;
            if let Some(title) = book.get("title") {
                top.push(TitleCount {
                    title: title.clone(),
                    count,
                });
            }
        }
        Ok(top)
    }

    fn active_borrower_history(&mut self, since: &str, min_borrows: i64) -> Result<Vec<HistoryEntry>> {
        let mut recent: BTreeMap<i64, i64> = BTreeMap::new();
        let mut history: HashMap<i64, Vec<HashMap<String, String>>> = HashMap::new();

        for key in self.store.scan_keys(TRANSACTION_PREFIX)? {
            let tx = self.store.get_hash(&key)?;
            let borrower_id = parse_id(&tx, "borrower_id")?;
            if field(&tx, "borrow_date") >= since {
                *recent.entry(borrower_id).or_insert(0) += 1;
            }
            history.entry(borrower_id).or_default().push(tx);
        }

        let mut entries = Vec::new();
        for (borrower_id, count) in recent {
            if count <= min_borrows {
                continue;
            }
            let borrower = self
                .store
                .get_hash(&format!("{}{}", BORROWER_PREFIX, borrower_id))?;
            let Some(name) = borrower.get("name") else {
                continue;
            };

            for tx in history.get(&borrower_id).map(Vec::as_slice).unwrap_or_default() {
                let book = self
                    .store
                    .get_hash(&format!("{}{}", BOOK_PREFIX, field(tx, "book_id")))?;
                if let Some(title) = book.get("title") {
                    entries.push(HistoryEntry {
                        name: name.clone(),
                        title: title.clone(),
                        borrow_date: field(tx, "borrow_date").to_string(),
                        return_date: field(tx, "return_date").to_string(),
                    });
                }
            }
        }
        Ok(entries)
    }
}

impl<S: HashStore> Backend for KeyValueBackend<S> {
    fn kind(&self) -> BackendKind {
        self.store.kind()
    }

    fn load(&mut self, dataset: &Dataset) -> Result<LoadSummary> {
        self.store.flush()?;
        tracing::debug!(backend = %self.kind(), "store flushed");

        let books = dataset.books.iter().map(|b| {
            (
                format!("{}{}", BOOK_PREFIX, b.book_id),
                vec![
                    ("book_id", b.book_id.to_string()),
                    ("title", b.title.clone()),
                    ("author", b.author.clone()),
                    ("year", b.year.to_string()),
                    ("genre", b.genre.clone()),
                ],
            )
        });
        self.put_batched(books)?;

        let borrowers = dataset.borrowers.iter().map(|b| {
            (
                format!("{}{}", BORROWER_PREFIX, b.borrower_id),
                vec![
                    ("borrower_id", b.borrower_id.to_string()),
                    ("name", b.name.clone()),
                    ("email", b.email.clone()),
                ],
            )
        });
        self.put_batched(borrowers)?;

        let transactions = dataset.transactions.iter().map(|t| {
            (
                format!("{}{}", TRANSACTION_PREFIX, t.transaction_id),
                vec![
                    ("transaction_id", t.transaction_id.to_string()),
                    ("book_id", t.book_id.to_string()),
                    ("borrower_id", t.borrower_id.to_string()),
                    ("borrow_date", t.borrow_date.clone()),
                    ("return_date", t.return_date.clone()),
                ],
            )
        });
        self.put_batched(transactions)?;

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

impl<S: HashStore> KeyValueBackend<S> {
    fn put_batched(&mut self, entries: impl Iterator<Item = (String, Fields)>) -> Result<()> {
        let mut batch = Vec::with_capacity(LOAD_BATCH);
        for entry in entries {
            batch.push(entry);
            if batch.len() == LOAD_BATCH {
                self.store.put_hashes(&batch)?;
                batch.clear();
            }
        }
        if !batch.is_empty() {
            self.store.put_hashes(&batch)?;
        }
        Ok(())
    }
}

fn field<'a>(hash: &'a HashMap<String, String>, name: &str) -> &'a str {
    hash.get(name).map(String::as_str).unwrap_or_default()
}

fn parse_id(hash: &HashMap<String, String>, name: &str) -> Result<i64> {
    let raw = field(hash, name);
    raw.parse()
        .map_err(|_| Error::InvalidData(format!("{} is not an integer: '{}'", name, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::SqliteBackend;
    use crate::dataset::generator::{generate, GeneratorConfig};
    use chrono::NaiveDate;

    fn dataset() -> Dataset {
        generate(
            &GeneratorConfig::new(60, 50, 400)
                .with_seed(11)
                .with_reference_date(NaiveDate::from_ymd_opt(2023, 3, 1).unwrap()),
        )
    }

    #[test]
    fn test_memory_store_scan() {
        let mut store = MemoryStore::default();
        store
            .put_hashes(&[
                ("book:1".to_string(), vec![("title", "A".to_string())]),
                ("book:2".to_string(), vec![("title", "B".to_string())]),
                ("borrower:1".to_string(), vec![("name", "C".to_string())]),
            ])
            .unwrap();

        assert_eq!(store.scan_keys(BOOK_PREFIX).unwrap(), vec!["book:1", "book:2"]);
        assert_eq!(store.get_hash("borrower:1").unwrap()["name"], "C");
        assert!(store.get_hash("borrower:9").unwrap().is_empty());

        store.flush().unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_writes_one_hash_per_record() {
        let data = dataset();
        let mut backend = KeyValueBackend::new(MemoryStore::default());
        let summary = backend.load(&data).unwrap();

        assert_eq!(summary.total(), data.len());
        assert_eq!(backend.store().len(), data.len());
        assert_eq!(backend.kind(), BackendKind::Memory);
    }

    #[test]
    fn test_matches_relational_results() {
        let mut data = dataset();
        // dangling references, as produced by independently sampled subsets
        data.books.retain(|b| b.book_id % 7 != 0);
        data.borrowers.retain(|b| b.borrower_id % 9 != 0);

        let mut kv = KeyValueBackend::new(MemoryStore::default());
        kv.load(&data).unwrap();
        let mut sqlite = SqliteBackend::in_memory().unwrap();
        sqlite.load(&data).unwrap();

        let params = QueryParams::new("m");
        for query in QueryId::ALL {
            let expected = sqlite.run_query(query, &params).unwrap().normalized();
            let actual = kv.run_query(query, &params).unwrap().normalized();
            assert_eq!(actual, expected, "{} differs", query);
        }
    }

    #[test]
    fn test_non_ascii_names_match_relational_results() {
        let mut data = dataset();
        for (borrower, name) in data
            .borrowers
            .iter_mut()
            .zip(["Élodie Martin", "élise Roux", "Øystein Berg", "Ödön Kiss"])
        {
            borrower.name = name.to_string();
        }

        let mut kv = KeyValueBackend::new(MemoryStore::default());
        kv.load(&data).unwrap();
        let mut sqlite = SqliteBackend::in_memory().unwrap();
        sqlite.load(&data).unwrap();

        for pattern in ["é", "É", "Élo", "ø", "ÖD"] {
            let params = QueryParams::new(pattern);
            let expected = sqlite.run_query(QueryId::NamePrefix, &params).unwrap();
            let actual = kv.run_query(QueryId::NamePrefix, &params).unwrap();
            assert!(!expected.is_empty(), "no match for {}", pattern);
            assert_eq!(actual.normalized(), expected.normalized(), "{} differs", pattern);
        }
    }

    #[test]
    fn test_top_books_skips_missing_books() {
        let mut data = dataset();
        let mut kv = KeyValueBackend::new(MemoryStore::default());
        kv.load(&data).unwrap();
        let before = kv.run_query(QueryId::TopBooks, &QueryParams::default()).unwrap();

        data.books.clear();
        kv.load(&data).unwrap();
        let after = kv.run_query(QueryId::TopBooks, &QueryParams::default()).unwrap();

        assert_eq!(before.len(), 5);
        assert!(after.is_empty());
    }
}
