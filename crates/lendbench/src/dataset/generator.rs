//! Synthetic dataset generation.
//!
//! Output is deterministic for a given seed and reference date, so every
//! backend sees byte-identical input across runs.

use chrono::{Duration, Local, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use super::{Book, Borrower, Dataset, Transaction, GENRES};

const FIRST_NAMES: [&str; 32] = [
    "James", "Mary", "John", "Patricia", "Robert", "Jennifer", "Michael", "Linda", "William",
    "Elizabeth", "David", "Barbara", "Richard", "Susan", "Joseph", "Jessica", "Thomas", "Sarah",
    "Charles", "Karen", "Christopher", "Nancy", "Daniel", "Lisa", "Matthew", "Betty", "Anthony",
    "Sandra", "Mark", "Ashley", "Steven", "Kimberly",
];

const LAST_NAMES: [&str; 24] = [
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis", "Rodriguez",
    "Martinez", "Hernandez", "Lopez", "Gonzalez", "Wilson", "Anderson", "Thomas", "Taylor",
    "Moore", "Jackson", "Martin", "Lee", "Perez", "Thompson", "White",
];

const WORDS: [&str; 40] = [
    "river", "shadow", "garden", "silent", "empire", "winter", "letter", "forgotten", "city",
    "night", "ocean", "stone", "secret", "journey", "last", "golden", "house", "storm", "crown",
    "memory", "north", "broken", "light", "island", "war", "quiet", "mountain", "road", "glass",
    "fire", "song", "hidden", "blue", "summer", "orchard", "iron", "lantern", "distant", "tide",
    "harbor",
];

/// Oldest and newest publication years.
const YEAR_RANGE: (i32, i32) = (1900, 2023);

/// Borrow dates fall within this many days before the reference date.
const BORROW_WINDOW_DAYS: i64 = 730;

/// Generator settings.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub books: usize,
    pub borrowers: usize,
    pub transactions: usize,
    pub seed: u64,
    /// Latest possible borrow or return date.
    pub reference_date: NaiveDate,
}

impl GeneratorConfig {
    pub fn new(books: usize, borrowers: usize, transactions: usize) -> Self {
        Self {
            books,
            borrowers,
            transactions,
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = date;
        self
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            books: 1_000,
            borrowers: 1_000,
            transactions: 2_000,
            seed: 12345,
            reference_date: Local::now().date_naive(),
        }
    }
}

/// Generate a full dataset.
pub fn generate(config: &GeneratorConfig) -> Dataset {
    let mut rng = StdRng::seed_from_u64(config.seed);

    let books = generate_books(&mut rng, config.books);
    let borrowers = generate_borrowers(&mut rng, config.borrowers);
    let transactions = generate_transactions(
        &mut rng,
        config.transactions,
        config.books,
        config.borrowers,
        config.reference_date,
    );

    Dataset {
        books,
        borrowers,
        transactions,
    }
}

fn generate_books(rng: &mut StdRng, count: usize) -> Vec<Book> {
    (0..count)
        .map(|i| Book {
            book_id: i as i64 + 1,
            title: sentence(rng, 4),
            author: person_name(rng).0,
            year: rng.gen_range(YEAR_RANGE.0..=YEAR_RANGE.1),
            genre: pick(rng, &GENRES).to_string(),
        })
        .collect()
}

fn generate_borrowers(rng: &mut StdRng, count: usize) -> Vec<Borrower> {
    (0..count)
        .map(|i| {
            let (name, first, last) = person_name(rng);
            // the numeric part keeps addresses unique
            let email = format!(
                "{}.{}{}@example.com",
                first.to_lowercase(),
                last.to_lowercase(),
                i + 1
            );
            Borrower {
                borrower_id: i as i64 + 1,
                name,
                email,
            }
        })
        .collect()
}

fn generate_transactions(
    rng: &mut StdRng,
    count: usize,
    book_count: usize,
    borrower_count: usize,
    reference_date: NaiveDate,
) -> Vec<Transaction> {
    if book_count == 0 || borrower_count == 0 {
        return Vec::new();
    }

    (0..count)
        .map(|i| {
            let days_back = rng.gen_range(0..=BORROW_WINDOW_DAYS);
            let borrow_date = reference_date - Duration::days(days_back);
            let return_date = borrow_date + Duration::days(rng.gen_range(0..=days_back));

            Transaction {
                transaction_id: i as i64 + 1,
                book_id: rng.gen_range(1..=book_count as i64),
                borrower_id: rng.gen_range(1..=borrower_count as i64),
                borrow_date: borrow_date.format("%Y-%m-%d").to_string(),
                return_date: return_date.format("%Y-%m-%d").to_string(),
            }
        })
        .collect()
}

/// Returns `(full name, first, last)`.
fn person_name(rng: &mut StdRng) -> (String, &'static str, &'static str) {
    let first = pick(rng, &FIRST_NAMES);
    let last = pick(rng, &LAST_NAMES);
    (format!("{} {}", first, last), first, last)
}

fn sentence(rng: &mut StdRng, words: usize) -> String {
    let mut text = (0..words)
        .map(|_| pick(rng, &WORDS))
        .collect::<Vec<_>>()
        .join(" ");
    if let Some(first) = text.get(0..1).map(str::to_uppercase) {
        text.replace_range(0..1, &first);
    }
    text.push('.');
    text
}

fn pick<'a>(rng: &mut StdRng, items: &[&'a str]) -> &'a str {
    items.choose(rng).copied().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GeneratorConfig {
        GeneratorConfig::new(50, 40, 200)
            .with_seed(7)
            .with_reference_date(NaiveDate::from_ymd_opt(2024, 6, 30).unwrap())
    }

    #[test]
    fn test_counts_and_ids() {
        let dataset = generate(&config());

        assert_eq!(dataset.books.len(), 50);
        assert_eq!(dataset.borrowers.len(), 40);
        assert_eq!(dataset.transactions.len(), 200);
        assert_eq!(dataset.books[0].book_id, 1);
        assert_eq!(dataset.borrowers[39].borrower_id, 40);
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(generate(&config()), generate(&config()));
        assert_ne!(generate(&config()), generate(&config().with_seed(8)));
    }

    #[test]
    fn test_field_ranges() {
        let dataset = generate(&config());

        for book in &dataset.books {
            assert!((1900..=2023).contains(&book.year));
            assert!(GENRES.contains(&book.genre.as_str()));
            assert_eq!(book.title.split(' ').count(), 4);
            assert!(book.title.ends_with('.'));
        }

        let mut emails: Vec<_> = dataset.borrowers.iter().map(|b| &b.email).collect();
        emails.sort();
        emails.dedup();
        assert_eq!(emails.len(), dataset.borrowers.len());

        for tx in &dataset.transactions {
            assert!((1..=50).contains(&tx.book_id));
            assert!((1..=40).contains(&tx.borrower_id));
            assert!(tx.borrow_date.as_str() >= "2022-07-01");
            assert!(tx.borrow_date <= tx.return_date);
            assert!(tx.return_date.as_str() <= "2024-06-30");
        }
    }

    #[test]
    fn test_no_transactions_without_books() {
        let dataset = generate(&GeneratorConfig::new(0, 10, 100));
        assert!(dataset.transactions.is_empty());
    }
}
