//! SQL text shared by the relational backends.
//!
//! Placeholders are positional `?`, which both SQLite and MySQL accept.

/// Query 1 for SQLite. Binds the escaped, lower-cased `LIKE` prefix.
///
/// The built-in `LOWER` only folds ASCII, so names go through the
/// `unicode_lower` function the SQLite backend registers on its connection.
pub const NAME_PREFIX: &str = "
    SELECT name
    FROM borrowers
    WHERE unicode_lower(name) LIKE ? ESCAPE '\\'
    ORDER BY name";

/// Query 1 for MySQL, where backslash is already the `LIKE` escape and
/// cannot appear bare inside a string literal. Names sort by code point, not
/// by the column's case-insensitive collation.
pub const NAME_PREFIX_MYSQL: &str = "
    SELECT name
    FROM borrowers
    WHERE LOWER(name) LIKE ?
    ORDER BY name COLLATE utf8mb4_bin";

/// Query 2. Binds the genre.
pub const GENRE_BORROW_COUNTS: &str = "
    SELECT br.name, COUNT(*) AS borrow_count
    FROM borrowers br
    JOIN transactions t ON br.borrower_id = t.borrower_id
    JOIN books b ON t.book_id = b.book_id
    WHERE b.genre = ?
    GROUP BY br.borrower_id, br.name";

/// Query 3. Binds the row limit.
pub const TOP_BOOKS: &str = "
    SELECT b.title, COUNT(*) AS borrow_count
    FROM books b
    JOIN transactions t ON b.book_id = t.book_id
    GROUP BY b.book_id, b.title
    ORDER BY borrow_count DESC, b.book_id ASC
    LIMIT ?";

/// Query 4. Binds the `since` date and the borrow threshold.
pub const ACTIVE_BORROWER_HISTORY: &str = "
    SELECT br.name, b.title, t.borrow_date, t.return_date
    FROM borrowers br
    JOIN transactions t ON br.borrower_id = t.borrower_id
    JOIN books b ON t.book_id = b.book_id
    WHERE br.borrower_id IN (
        SELECT borrower_id
        FROM transactions
        WHERE borrow_date >= ?
        GROUP BY borrower_id
        HAVING COUNT(*) > ?
    )";

/// Query 4 for MySQL, formatting `DATE` columns back to `YYYY-MM-DD`.
pub const ACTIVE_BORROWER_HISTORY_MYSQL: &str = "
    SELECT br.name, b.title,
           DATE_FORMAT(t.borrow_date, '%Y-%m-%d') AS borrow_date,
           DATE_FORMAT(t.return_date, '%Y-%m-%d') AS return_date
    FROM borrowers br
    JOIN transactions t ON br.borrower_id = t.borrower_id
    JOIN books b ON t.book_id = b.book_id
    WHERE br.borrower_id IN (
        SELECT borrower_id
        FROM transactions
        WHERE borrow_date >= ?
        GROUP BY borrower_id
        HAVING COUNT(*) > ?
    )";

pub const INSERT_BOOK: &str =
    "INSERT INTO books (book_id, title, author, year, genre) VALUES (?, ?, ?, ?, ?)";

pub const INSERT_BORROWER: &str =
    "INSERT INTO borrowers (borrower_id, name, email) VALUES (?, ?, ?)";

pub const INSERT_TRANSACTION: &str = "INSERT INTO transactions \
     (transaction_id, book_id, borrower_id, borrow_date, return_date) VALUES (?, ?, ?, ?, ?)";
