//! MongoDB backend.
//!
//! One collection per record type in the `library` database. Joins are
//! `$lookup` stages; an `$unwind` after each lookup drops documents whose
//! referenced record is missing. Enable with `--features mongodb`.

use std::future::Future;

use futures::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::{Client, Collection, Database, IndexModel};
use tokio::runtime::Runtime;

use crate::dataset::{Book, Borrower, Dataset, Transaction};
use crate::error::{Error, Result};
use crate::query::{
    regex_prefix, BorrowCount, HistoryEntry, QueryId, QueryParams, QueryRows, TitleCount,
};

use super::{Backend, BackendKind, LoadSummary};

const BACKEND: &str = "MongoDB";
const DATABASE: &str = "library";

/// MongoDB backend for benchmarks.
pub struct MongoBackend {
    db: Database,
    rt: Runtime,
}

impl MongoBackend {
    /// Connect to `uri`, e.g. `mongodb://localhost:27017/`.
    pub fn connect(uri: &str) -> Result<Self> {
        let rt = Runtime::new()?;
        let client = rt
            .block_on(Client::with_uri_str(uri))
            .map_err(|e| Error::backend(BACKEND, e))?;
        Ok(Self {
            db: client.database(DATABASE),
            rt,
        })
    }

    fn block_on<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = mongodb::error::Result<T>>,
    {
        self.rt
            .block_on(fut)
            .map_err(|e| Error::backend(BACKEND, e))
    }

    fn documents(&self, name: &str) -> Collection<Document> {
        self.db.collection(name)
    }

    fn aggregate(&self, collection: &str, pipeline: Vec<Document>) -> Result<Vec<Document>> {
        let coll = self.documents(collection);
        self.block_on(async move {
            let cursor = coll.aggregate(pipeline).await?;
            cursor.try_collect().await
        })
    }
}

impl Backend for MongoBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::MongoDb
    }

    fn load(&mut self, dataset: &Dataset) -> Result<LoadSummary> {
        let books: Collection<Book> = self.db.collection("books");
        let borrowers: Collection<Borrower> = self.db.collection("borrowers");
        let transactions: Collection<Transaction> = self.db.collection("transactions");

        self.block_on(async {
            books.delete_many(doc! {}).await?;
            borrowers.delete_many(doc! {}).await?;
            transactions.delete_many(doc! {}).await?;

            // insert_many rejects an empty batch
            if !dataset.books.is_empty() {
                books.insert_many(&dataset.books).await?;
            }
            if !dataset.borrowers.is_empty() {
                borrowers.insert_many(&dataset.borrowers).await?;
            }
            if !dataset.transactions.is_empty() {
                transactions.insert_many(&dataset.transactions).await?;
            }

            books
                .create_index(IndexModel::builder().keys(doc! { "book_id": 1 }).build())
                .await?;
            borrowers
                .create_index(IndexModel::builder().keys(doc! { "borrower_id": 1 }).build())
                .await?;
            transactions
                .create_index(IndexModel::builder().keys(doc! { "borrower_id": 1 }).build())
                .await?;
            Ok(())
        })?;

        Ok(LoadSummary::from(dataset))
    }

    fn run_query(&mut self, query: QueryId, params: &QueryParams) -> Result<QueryRows> {
        let rows = match query {
            QueryId::NamePrefix => {
                let borrowers = self.documents("borrowers");
                let filter = doc! {
                    "name": { "$regex": regex_prefix(&params.name_pattern), "$options": "i" }
                };
                let docs: Vec<Document> = self.block_on(async move {
                    let cursor = borrowers
                        .find(filter)
                        .projection(doc! { "_id": 0, "name": 1 })
                        .sort(doc! { "name": 1 })
                        .await?;
                    cursor.try_collect().await
                })?;
                QueryRows::Names(
                    docs.iter()
                        .map(|d| get_string(d, "name"))
                        .collect::<Result<_>>()?,
                )
            }
            QueryId::GenreBorrowCounts => {
                let pipeline = vec![
                    lookup("books", "book_id", "book_id", "book"),
                    doc! { "$unwind": "$book" },
                    doc! { "$match": { "book.genre": params.genre.as_str() } },
                    doc! { "$group": { "_id": "$borrower_id", "borrow_count": { "$sum": 1 } } },
                    lookup("borrowers", "_id", "borrower_id", "borrower"),
                    doc! { "$unwind": "$borrower" },
                    doc! { "$project": { "_id": 0, "name": "$borrower.name", "borrow_count": 1 } },
                ];
                QueryRows::BorrowCounts(
                    self.aggregate("transactions", pipeline)?
                        .iter()
                        .map(|d| {
                            Ok(BorrowCount {
                                name: get_string(d, "name")?,
                                count: get_count(d, "borrow_count")?,
                            })
                        })
                        .collect::<Result<_>>()?,
                )
            }
            QueryId::TopBooks => {
                let pipeline = vec![
                    doc! { "$group": { "_id": "$book_id", "borrow_count": { "$sum": 1 } } },
                    doc! { "$sort": { "borrow_count": -1, "_id": 1 } },
                    lookup("books", "_id", "book_id", "book"),
                    doc! { "$unwind": "$book" },
                    doc! { "$limit": params.top_n as i64 },
                    doc! { "$project": { "_id": 0, "title": "$book.title", "borrow_count": 1 } },
                ];
                QueryRows::TopBooks(
                    self.aggregate("transactions", pipeline)?
                        .iter()
                        .map(|d| {
                            Ok(TitleCount {
                                title: get_string(d, "title")?,
                                count: get_count(d, "borrow_count")?,
                            })
                        })
                        .collect::<Result<_>>()?,
                )
            }
            QueryId::ActiveBorrowerHistory => {
                let pipeline = vec![
                    doc! { "$match": { "borrow_date": { "$gte": params.since.as_str() } } },
                    doc! { "$group": { "_id": "$borrower_id", "recent": { "$sum": 1 } } },
                    doc! { "$match": { "recent": { "$gt": params.min_borrows } } },
                    lookup("borrowers", "_id", "borrower_id", "borrower"),
                    doc! { "$unwind": "$borrower" },
                    lookup("transactions", "_id", "borrower_id", "history"),
                    doc! { "$unwind": "$history" },
                    lookup("books", "history.book_id", "book_id", "book"),
                    doc! { "$unwind": "$book" },
                    doc! { "$project": {
                        "_id": 0,
                        "name": "$borrower.name",
                        "title": "$book.title",
                        "borrow_date": "$history.borrow_date",
                        "return_date": "$history.return_date",
                    } },
                ];
                QueryRows::History(
                    self.aggregate("transactions", pipeline)?
                        .iter()
                        .map(|d| {
                            Ok(HistoryEntry {
                                name: get_string(d, "name")?,
                                title: get_string(d, "title")?,
                                borrow_date: get_string(d, "borrow_date")?,
                                return_date: get_string(d, "return_date")?,
                            })
                        })
                        .collect::<Result<_>>()?,
                )
            }
        };
        Ok(rows)
    }
}

fn lookup(from: &str, local: &str, foreign: &str, as_field: &str) -> Document {
    doc! {
        "$lookup": {
            "from": from,
            "localField": local,
            "foreignField": foreign,
            "as": as_field,
        }
    }
}

fn get_string(doc: &Document, key: &str) -> Result<String> {
    doc.get_str(key)
        .map(str::to_string)
        .map_err(|e| Error::backend(BACKEND, format!("{}: {}", key, e)))
}

// $sum yields Int32 until the count overflows it.
fn get_count(doc: &Document, key: &str) -> Result<i64> {
    match doc.get(key) {
        Some(Bson::Int32(n)) => Ok(i64::from(*n)),
        Some(Bson::Int64(n)) => Ok(*n),
        other => Err(Error::backend(
            BACKEND,
            format!("{}: expected integer, found {:?}", key, other),
        )),
    }
}
