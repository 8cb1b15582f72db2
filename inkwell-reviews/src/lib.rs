pub mod filter;
pub mod shelves;
pub mod tones;

use chrono::{DateTime, Utc};
use inkwell_common::{
    models::{BookReview, Bookshelf, BookshelfGrouping, Catalog, Tone},
    Conf, Report,
};

pub use crate::filter::{filter_reviews, matches_search_term, ReviewQuery};

/// Shelf shown when browsing without any other selection.
pub const DEFAULT_SHELF: &str = "favorites";

#[derive(Debug, serde::Serialize)]
pub struct ReviewCard<'c> {
    pub id: i64,
    pub title: &'c str,
    pub author_first_name: &'c str,
    pub author_last_name: &'c str,
    pub title_by_author: String,
    pub my_rating: u8,
    pub average_rating: f64,
    pub number_of_pages: Option<u32>,
    pub original_publication_year: Option<i32>,
    pub date_read: DateTime<Utc>,
    pub my_review: Option<&'c str>,
    pub searchable_string: &'c str,
    pub has_review_content: bool,
    pub preview_text: String,
    pub reading_time_minutes: u32,
    pub cover_image_id: Option<i64>,
    pub bookshelves: &'c [Bookshelf],
    pub tones: &'c [Tone],
}

impl<'c> From<&'c BookReview> for ReviewCard<'c> {
    fn from(review: &'c BookReview) -> Self {
        Self {
            id: review.id,
            title: review.title(),
            author_first_name: review.author_first_name(),
            author_last_name: review.author_last_name(),
            title_by_author: review.title_by_author(),
            my_rating: review.my_rating,
            average_rating: review.average_rating,
            number_of_pages: review.number_of_pages,
            original_publication_year: review.original_publication_year,
            date_read: review.date_read,
            my_review: review.my_review(),
            searchable_string: review.searchable_string(),
            has_review_content: review.has_review_content(),
            preview_text: review.preview_text(),
            reading_time_minutes: review.reading_time_minutes(),
            cover_image_id: review.cover_image_id,
            bookshelves: review.bookshelves(),
            tones: &review.tones,
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct BookReviewsView<'c> {
    pub all_bookshelves: Vec<&'c Bookshelf>,
    pub all_bookshelf_groupings: Vec<&'c BookshelfGrouping>,
    pub search_term: Option<String>,
    pub selected_shelf: Option<String>,
    pub selected_grouping: Option<String>,
    pub show_recent_only: bool,
    pub use_custom_mappings: bool,
    pub num_hits: usize,
    pub book_reviews: Vec<ReviewCard<'c>>,
}

/// Builds the review listing for a query.
///
/// With a search term every review is a candidate and the full shelf and
/// grouping lists are returned. Without one only reviews that have review
/// text are listed, the shelf panel follows the custom mappings, and the
/// favorites shelf is picked when nothing else is selected.
pub fn browse<'c>(catalog: &'c Catalog, query: &ReviewQuery) -> BookReviewsView<'c> {
    if query.search_term().is_some() {
        let hits = filter_reviews(&catalog.reviews, &catalog.groupings, query);

        tracing::debug!(hits = hits.len(), "searched reviews");

        let mut all_bookshelves = catalog.bookshelves.iter().collect::<Vec<_>>();
        all_bookshelves.sort_by(|a, b| a.label().cmp(b.label()));

        return BookReviewsView {
            all_bookshelves,
            all_bookshelf_groupings: shelves::sorted_groupings(&catalog.groupings),
            search_term: query.search_term().map(|term| term.trim().to_string()),
            selected_shelf: query.shelf().map(str::to_string),
            selected_grouping: query.grouping().map(str::to_string),
            show_recent_only: query.show_recent_only,
            use_custom_mappings: false,
            num_hits: hits.len(),
            book_reviews: hits.into_iter().map(ReviewCard::from).collect(),
        };
    }

    let mut query = query.clone();
    if query.shelf().is_none() && query.grouping().is_none() && !query.show_recent_only {
        query.selected_shelf = Some(DEFAULT_SHELF.to_string());
    }

    let use_custom_mappings = shelves::uses_custom_mappings(&catalog.bookshelves);

    let hits = filter_reviews(
        catalog.reviews.iter().filter(|review| review.has_review_content()),
        &catalog.groupings,
        &query,
    );

    tracing::debug!(hits = hits.len(), "browsed reviews");

    BookReviewsView {
        all_bookshelves: shelves::visible_bookshelves(&catalog.bookshelves, &catalog.groupings),
        all_bookshelf_groupings: if use_custom_mappings {
            shelves::sorted_groupings(&catalog.groupings)
        } else {
            Vec::new()
        },
        search_term: None,
        selected_shelf: query.shelf().map(str::to_string),
        selected_grouping: query.grouping().map(str::to_string),
        show_recent_only: query.show_recent_only,
        use_custom_mappings,
        num_hits: hits.len(),
        book_reviews: hits.into_iter().map(ReviewCard::from).collect(),
    }
}

#[tracing::instrument(skip(conf), err)]
pub async fn run(conf: &Conf, query: ReviewQuery) -> Result<(), Report> {
    let pool = inkwell_queries::init_database_connection(conf).await?;

    let catalog = inkwell_queries::load_catalog(&pool).await?;

    let tones = tones::ToneTree::new(catalog.tones.clone())?;

    tracing::info!(
        reviews = catalog.reviews.len(),
        root_tones = tones.roots().len(),
        "loaded catalog"
    );

    let view = browse(&catalog, &query);

    println!("{}", serde_json::to_string_pretty(&view)?);

    Ok(())
}

#[tracing::instrument(skip(conf), err)]
pub async fn reindex(conf: &Conf) -> Result<(), Report> {
    let pool = inkwell_queries::init_database_connection(conf).await?;

    let changed = inkwell_queries::refresh_searchable_strings(&pool).await?;

    tracing::info!(changed = %changed, "refreshed searchable strings");

    Ok(())
}
