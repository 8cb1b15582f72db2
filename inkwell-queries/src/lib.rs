use std::collections::HashMap;

use chrono::{DateTime, Utc};
use dataloader::{cached::Loader, BatchFn};
use inkwell_common::{
    models::{BookReview, Bookshelf, BookshelfGrouping, Catalog, Tone},
    Conf, Context as _, Report,
};
use sqlx::sqlite::SqlitePoolOptions;

pub use sqlx::SqlitePool as Pool;

#[tracing::instrument(skip(conf), err)]
pub async fn init_database_connection(conf: &Conf) -> Result<Pool, Report> {
    let pool = SqlitePoolOptions::new().connect(&conf.database).await?;

    Ok(pool)
}

#[derive(sqlx::FromRow)]
struct IdRow {
    id: i64,
}

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: i64,
    title: String,
    author_first_name: String,
    author_last_name: String,
    my_rating: i64,
    average_rating: f64,
    number_of_pages: Option<i64>,
    original_publication_year: Option<i64>,
    date_read: DateTime<Utc>,
    my_review: Option<String>,
    has_review_content: Option<bool>,
    searchable_string: Option<String>,
    cover_image_id: Option<i64>,
}

#[derive(sqlx::FromRow)]
struct BookshelfRow {
    id: i64,
    name: String,
    display_name: Option<String>,
    display: Option<bool>,
}

impl From<BookshelfRow> for Bookshelf {
    fn from(row: BookshelfRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            display_name: row.display_name,
            display: row.display,
        }
    }
}

#[derive(sqlx::FromRow)]
struct GroupingRow {
    id: i64,
    name: String,
    display_name: Option<String>,
    is_genre_based: bool,
}

#[derive(sqlx::FromRow)]
struct ToneRow {
    id: i64,
    name: String,
    description: Option<String>,
    parent_id: Option<i64>,
}

impl From<ToneRow> for Tone {
    fn from(row: ToneRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            parent_id: row.parent_id,
        }
    }
}

/// A review as rebuilt from its row, alongside the derived values the row
/// had stored for it.
struct StoredReview {
    review: BookReview,
    searchable_string: Option<String>,
    has_review_content: Option<bool>,
}

impl StoredReview {
    fn is_stale(&self) -> bool {
        self.searchable_string.as_deref() != Some(self.review.searchable_string())
            || self.has_review_content != Some(self.review.has_review_content())
    }
}

impl ReviewRow {
    fn into_stored(self, bookshelves: Vec<Bookshelf>, tones: Vec<Tone>) -> StoredReview {
        let mut review = BookReview::new(
            self.id,
            self.title,
            self.author_first_name,
            self.author_last_name,
            self.date_read,
        )
        .with_bookshelves(bookshelves);

        review.set_review(self.my_review);
        review.my_rating = self.my_rating.clamp(0, 5) as u8;
        review.average_rating = self.average_rating;
        review.number_of_pages = self.number_of_pages.and_then(|pages| u32::try_from(pages).ok());
        review.original_publication_year = self
            .original_publication_year
            .and_then(|year| i32::try_from(year).ok());
        review.cover_image_id = self.cover_image_id;
        review.tones = tones;

        StoredReview {
            review,
            searchable_string: self.searchable_string,
            has_review_content: self.has_review_content,
        }
    }
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

macro_rules! loader {
    ($name:ident, $row:ty => $entity:ty, $select:expr) => {
        struct $name {
            pool: Pool,
        }

        #[async_trait::async_trait]
        impl BatchFn<i64, $entity> for $name {
            #[tracing::instrument(skip(self))]
            async fn load(&mut self, keys: &[i64]) -> HashMap<i64, $entity> {
                if keys.is_empty() {
                    return HashMap::new();
                }

                let sql = format!("{} WHERE id IN ({})", $select, placeholders(keys.len()));

                let mut query = sqlx::query_as::<_, $row>(&sql);
                for key in keys {
                    query = query.bind(*key);
                }

                match query.fetch_all(&self.pool).await {
                    Ok(rows) => rows
                        .into_iter()
                        .map(|row| (row.id, <$entity>::from(row)))
                        .collect(),
                    Err(err) => {
                        tracing::error!(err = ?err, "unable to load entities");

                        HashMap::new()
                    }
                }
            }
        }
    };
}

loader!(BookshelfLoader, BookshelfRow => Bookshelf, "SELECT id, name, display_name, display FROM bookshelves");
loader!(ToneLoader, ToneRow => Tone, "SELECT id, name, description, parent_id FROM tones");

pub struct Loaders {
    bookshelf: Loader<i64, Bookshelf, BookshelfLoader>,
    tone: Loader<i64, Tone, ToneLoader>,
}

impl Loaders {
    pub fn new(pool: Pool) -> Self {
        Self {
            bookshelf: Loader::new(BookshelfLoader { pool: pool.clone() }),
            tone: Loader::new(ToneLoader { pool }),
        }
    }
}

macro_rules! load {
    ($pool:ident, $loaders:ident . $loader:ident, $query:expr, $id:expr) => {{
        let ids = sqlx::query_as::<_, IdRow>($query)
            .bind($id)
            .fetch_all($pool)
            .await?
            .into_iter()
            .map(|row| row.id)
            .collect::<Vec<i64>>();

        let mut entities = $loaders
            .$loader
            .try_load_many(ids.clone())
            .await
            .with_context(|| format!("unable to resolve {} {:?}", stringify!($loader), ids))?;

        ids.into_iter()
            .filter_map(|id| entities.remove(&id))
            .collect::<Vec<_>>()
    }};
}

#[rustfmt::skip]
async fn load_reviews(pool: &Pool, loaders: &Loaders) -> Result<Vec<StoredReview>, Report> {
    let rows = sqlx::query_as::<_, ReviewRow>(
        "SELECT id, title, author_first_name, author_last_name, my_rating, average_rating, \
         number_of_pages, original_publication_year, date_read, my_review, has_review_content, \
         searchable_string, cover_image_id \
         FROM book_reviews ORDER BY date_read DESC, id",
    )
    .fetch_all(pool)
    .await?;

    let mut reviews = Vec::with_capacity(rows.len());

    for row in rows {
        let id = row.id;

        let bookshelves = load!(pool, loaders.bookshelf, "SELECT link.bookshelf_id AS id FROM book_review_bookshelves link JOIN bookshelves ON bookshelves.id = link.bookshelf_id WHERE link.book_review_id = ? ORDER BY link.bookshelf_id", id);
        let tones = load!(pool, loaders.tone, "SELECT link.tone_id AS id FROM book_review_tones link JOIN tones ON tones.id = link.tone_id WHERE link.book_review_id = ? ORDER BY link.tone_id", id);

        reviews.push(row.into_stored(bookshelves, tones));
    }

    Ok(reviews)
}

/// Reads every review with its bookshelves and tones, along with the full
/// bookshelf, grouping and tone lists.
///
/// Reviews come back newest read first, ties broken by id.
#[rustfmt::skip]
#[tracing::instrument(skip(pool), err)]
pub async fn load_catalog(pool: &Pool) -> Result<Catalog, Report> {
    let loaders = Loaders::new(pool.clone());

    let reviews = load_reviews(pool, &loaders)
        .await?
        .into_iter()
        .map(|stored| stored.review)
        .collect::<Vec<_>>();

    let bookshelves = sqlx::query_as::<_, BookshelfRow>("SELECT id, name, display_name, display FROM bookshelves ORDER BY name")
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(Bookshelf::from)
        .collect();

    let grouping_rows = sqlx::query_as::<_, GroupingRow>("SELECT id, name, display_name, is_genre_based FROM bookshelf_groupings ORDER BY name")
        .fetch_all(pool)
        .await?;

    let mut groupings = Vec::with_capacity(grouping_rows.len());
    for row in grouping_rows {
        let id = row.id;
        let bookshelves = load!(pool, loaders.bookshelf, "SELECT link.bookshelf_id AS id FROM bookshelf_grouping_bookshelves link JOIN bookshelves ON bookshelves.id = link.bookshelf_id WHERE link.bookshelf_grouping_id = ? ORDER BY link.bookshelf_id", id);

        groupings.push(BookshelfGrouping {
            id: row.id,
            name: row.name,
            display_name: row.display_name,
            is_genre_based: row.is_genre_based,
            bookshelves,
        });
    }

    let tones = sqlx::query_as::<_, ToneRow>("SELECT id, name, description, parent_id FROM tones ORDER BY name")
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(Tone::from)
        .collect();

    tracing::debug!(reviews = reviews.len(), groupings = groupings.len(), "loaded catalog");

    Ok(Catalog {
        reviews,
        bookshelves,
        groupings,
        tones,
    })
}

/// Recomputes the stored `searchable_string` and `has_review_content` of
/// every review, returning how many rows were out of date.
#[tracing::instrument(skip(pool), err)]
pub async fn refresh_searchable_strings(pool: &Pool) -> Result<u64, Report> {
    let loaders = Loaders::new(pool.clone());

    let stored = load_reviews(pool, &loaders).await?;

    let mut trans = pool.begin().await?;
    let mut changed = 0;

    for entry in stored.iter().filter(|entry| entry.is_stale()) {
        tracing::debug!(review_id = %entry.review.id, "refreshing searchable string");

        changed += sqlx::query(
            "UPDATE book_reviews SET searchable_string = ?, has_review_content = ? WHERE id = ?",
        )
        .bind(entry.review.searchable_string())
        .bind(entry.review.has_review_content())
        .bind(entry.review.id)
        .execute(&mut trans)
        .await?
        .rows_affected();
    }

    trans.commit().await?;

    Ok(changed)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;

    use super::*;

    const SCHEMA: &[&str] = &[
        "CREATE TABLE bookshelves (id INTEGER PRIMARY KEY, name TEXT NOT NULL UNIQUE, display_name TEXT, display BOOLEAN)",
        "CREATE TABLE bookshelf_groupings (id INTEGER PRIMARY KEY, name TEXT NOT NULL UNIQUE, display_name TEXT, is_genre_based BOOLEAN NOT NULL)",
        "CREATE TABLE bookshelf_grouping_bookshelves (bookshelf_grouping_id INTEGER NOT NULL, bookshelf_id INTEGER NOT NULL)",
        "CREATE TABLE tones (id INTEGER PRIMARY KEY, name TEXT NOT NULL UNIQUE, description TEXT, parent_id INTEGER)",
        "CREATE TABLE book_reviews (id INTEGER PRIMARY KEY, title TEXT NOT NULL, author_first_name TEXT NOT NULL, author_last_name TEXT NOT NULL, my_rating INTEGER NOT NULL, average_rating REAL NOT NULL, number_of_pages INTEGER, original_publication_year INTEGER, date_read TEXT NOT NULL, my_review TEXT, has_review_content BOOLEAN, searchable_string TEXT, cover_image_id INTEGER)",
        "CREATE TABLE book_review_bookshelves (book_review_id INTEGER NOT NULL, bookshelf_id INTEGER NOT NULL)",
        "CREATE TABLE book_review_tones (book_review_id INTEGER NOT NULL, tone_id INTEGER NOT NULL)",
        "INSERT INTO bookshelves VALUES (1, 'favorites', NULL, NULL), (2, 'high-fantasy', 'High Fantasy', 1), (3, 'to-read', NULL, 0)",
        "INSERT INTO bookshelf_groupings VALUES (1, 'Fantasy', NULL, 1)",
        "INSERT INTO bookshelf_grouping_bookshelves VALUES (1, 2)",
        "INSERT INTO tones VALUES (1, 'dark', NULL, NULL), (2, 'grim', 'Unrelenting', 1)",
        "INSERT INTO book_review_bookshelves VALUES (1, 2), (1, 1), (2, 3), (3, 2)",
        "INSERT INTO book_review_tones VALUES (1, 2), (3, 1)",
    ];

    struct Seed {
        id: i64,
        title: &'static str,
        author: (&'static str, &'static str),
        read: (i32, u32, u32),
        review: Option<&'static str>,
        has_review_content: bool,
        searchable_string: &'static str,
    }

    const REVIEWS: &[Seed] = &[
        Seed {
            id: 1,
            title: "The Hobbit",
            author: ("J.R.R.", "Tolkien"),
            read: (2024, 1, 5),
            review: Some("<p>Loved it</p>"),
            has_review_content: true,
            searchable_string: "the hobbit j.r.r. tolkien favorites high-fantasy",
        },
        Seed {
            id: 2,
            title: "Dune",
            author: ("Frank", "Herbert"),
            read: (2024, 3, 1),
            review: None,
            has_review_content: false,
            searchable_string: "stale",
        },
        Seed {
            id: 3,
            title: "Earthsea",
            author: ("Ursula", "Le Guin"),
            read: (2024, 3, 1),
            review: Some("  "),
            has_review_content: true,
            searchable_string: "",
        },
    ];

    async fn pool() -> Pool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await.unwrap();
        }

        for seed in REVIEWS {
            let (year, month, day) = seed.read;
            let read = Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap();

            sqlx::query(
                "INSERT INTO book_reviews (id, title, author_first_name, author_last_name, my_rating, average_rating, \
                 number_of_pages, date_read, my_review, has_review_content, searchable_string) \
                 VALUES (?, ?, ?, ?, 4, 4.25, 310, ?, ?, ?, ?)",
            )
            .bind(seed.id)
            .bind(seed.title)
            .bind(seed.author.0)
            .bind(seed.author.1)
            .bind(read)
            .bind(seed.review)
            .bind(seed.has_review_content)
            .bind(seed.searchable_string)
            .execute(&pool)
            .await
            .unwrap();
        }

        pool
    }

    #[tokio::test]
    async fn test_load_catalog() {
        let pool = pool().await;

        let catalog = load_catalog(&pool).await.unwrap();

        let ids = catalog.reviews.iter().map(|review| review.id).collect::<Vec<_>>();
        assert_eq!(ids, [2, 3, 1]);

        let hobbit = &catalog.reviews[2];
        assert_eq!(hobbit.bookshelves().len(), 2);
        assert_eq!(hobbit.bookshelves()[1].label(), "High Fantasy");
        assert_eq!(hobbit.searchable_string(), "the hobbit j.r.r. tolkien favorites high-fantasy");
        assert_eq!(hobbit.tones[0].name, "grim");
        assert_eq!(hobbit.my_rating, 4);
        assert_eq!(hobbit.number_of_pages, Some(310));
        assert!(hobbit.has_review_content());

        let earthsea = &catalog.reviews[1];
        assert!(!earthsea.has_review_content());
        assert_eq!(earthsea.searchable_string(), "earthsea ursula le guin high-fantasy");

        let names = catalog
            .bookshelves
            .iter()
            .map(|shelf| shelf.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, ["favorites", "high-fantasy", "to-read"]);
        assert_eq!(catalog.bookshelves[2].display, Some(false));

        assert_eq!(catalog.groupings.len(), 1);
        assert!(catalog.groupings[0].is_genre_based);
        assert!(catalog.groupings[0].contains_shelf("high-fantasy"));

        assert_eq!(catalog.tones.len(), 2);
        assert_eq!(catalog.tones[1].parent_id, Some(1));
    }

    #[tokio::test]
    async fn test_refresh_searchable_strings() {
        let pool = pool().await;

        assert_eq!(refresh_searchable_strings(&pool).await.unwrap(), 2);
        assert_eq!(refresh_searchable_strings(&pool).await.unwrap(), 0);

        let row = sqlx::query_as::<_, (String, bool)>(
            "SELECT searchable_string, has_review_content FROM book_reviews WHERE id = 3",
        )
        .fetch_one(&pool)
        .await
        .unwrap();

        assert_eq!(row.0, "earthsea ursula le guin high-fantasy");
        assert!(!row.1);
    }

    #[tokio::test]
    async fn test_dangling_links_are_skipped() {
        let pool = pool().await;

        sqlx::query("INSERT INTO book_review_bookshelves VALUES (1, 7)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO book_review_tones VALUES (1, 9)")
            .execute(&pool)
            .await
            .unwrap();

        let catalog = load_catalog(&pool).await.unwrap();

        let hobbit = &catalog.reviews[2];
        assert_eq!(hobbit.bookshelves().len(), 2);
        assert_eq!(hobbit.tones.len(), 1);

        assert_eq!(refresh_searchable_strings(&pool).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_loader_failure_is_an_error() {
        let pool = pool().await;

        sqlx::query("ALTER TABLE bookshelves DROP COLUMN display")
            .execute(&pool)
            .await
            .unwrap();

        assert!(load_catalog(&pool).await.is_err());
        assert!(refresh_searchable_strings(&pool).await.is_err());
    }

    #[tokio::test]
    async fn test_empty_catalog() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        for statement in &SCHEMA[..7] {
            sqlx::query(statement).execute(&pool).await.unwrap();
        }

        let catalog = load_catalog(&pool).await.unwrap();

        assert!(catalog.reviews.is_empty());
        assert!(catalog.bookshelves.is_empty());
        assert_eq!(refresh_searchable_strings(&pool).await.unwrap(), 0);
    }
}
