use chrono::{DateTime, Utc};

use crate::text;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Story {
    pub title: String,
    pub subtitle: String,
    pub preview_text: String,
    pub image_url: String,
    pub category: String,
    pub read_more_url: String,
}

impl Story {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[derive(serde::Serialize)]
pub struct StoryGroup {
    pub title: String,
    pub stories: Vec<Story>,
}

#[derive(Clone, Debug, Default)]
#[derive(serde::Serialize)]
pub struct StoriesViewModel {
    pub stories: Vec<Story>,
    pub story_groups: Vec<StoryGroup>,
    pub category: String,
    pub no_stories_message: Option<String>,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Bookshelf {
    pub id: i64,
    pub name: String,
    pub display_name: Option<String>,
    pub display: Option<bool>,
}

impl Bookshelf {
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct BookshelfGrouping {
    pub id: i64,
    pub name: String,
    pub display_name: Option<String>,
    pub is_genre_based: bool,
    pub bookshelves: Vec<Bookshelf>,
}

impl BookshelfGrouping {
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    pub fn contains_shelf(&self, name: &str) -> bool {
        self.bookshelves.iter().any(|shelf| shelf.name == name)
    }
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Tone {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<i64>,
}

/// Everything the review pages work from, loaded once per request.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    pub reviews: Vec<BookReview>,
    pub bookshelves: Vec<Bookshelf>,
    pub groupings: Vec<BookshelfGrouping>,
    pub tones: Vec<Tone>,
}

/// A reviewed book.
///
/// `searchable_string` and `has_review_content` are derived from the other
/// fields; the fields they depend on are only changed through setters so the
/// two never go stale.
#[derive(Clone, Debug, PartialEq)]
#[derive(serde::Serialize)]
pub struct BookReview {
    pub id: i64,
    title: String,
    author_first_name: String,
    author_last_name: String,
    pub my_rating: u8,
    pub average_rating: f64,
    pub number_of_pages: Option<u32>,
    pub original_publication_year: Option<i32>,
    pub date_read: DateTime<Utc>,
    my_review: Option<String>,
    has_review_content: bool,
    bookshelves: Vec<Bookshelf>,
    pub tones: Vec<Tone>,
    pub cover_image_id: Option<i64>,
    searchable_string: String,
}

impl BookReview {
    pub fn new(
        id: i64,
        title: impl Into<String>,
        author_first_name: impl Into<String>,
        author_last_name: impl Into<String>,
        date_read: DateTime<Utc>,
    ) -> Self {
        let mut review = Self {
            id,
            title: title.into(),
            author_first_name: author_first_name.into(),
            author_last_name: author_last_name.into(),
            my_rating: 0,
            average_rating: 0.0,
            number_of_pages: None,
            original_publication_year: None,
            date_read,
            my_review: None,
            has_review_content: false,
            bookshelves: Vec::new(),
            tones: Vec::new(),
            cover_image_id: None,
            searchable_string: String::new(),
        };

        review.refresh_searchable_string();

        review
    }

    pub fn with_bookshelves(mut self, bookshelves: Vec<Bookshelf>) -> Self {
        self.set_bookshelves(bookshelves);
        self
    }

    pub fn with_review(mut self, review: impl Into<String>) -> Self {
        self.set_review(Some(review.into()));
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn author_first_name(&self) -> &str {
        &self.author_first_name
    }

    pub fn author_last_name(&self) -> &str {
        &self.author_last_name
    }

    pub fn my_review(&self) -> Option<&str> {
        self.my_review.as_deref()
    }

    pub fn has_review_content(&self) -> bool {
        self.has_review_content
    }

    pub fn bookshelves(&self) -> &[Bookshelf] {
        &self.bookshelves
    }

    pub fn searchable_string(&self) -> &str {
        &self.searchable_string
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.refresh_searchable_string();
    }

    pub fn set_author(&mut self, first_name: impl Into<String>, last_name: impl Into<String>) {
        self.author_first_name = first_name.into();
        self.author_last_name = last_name.into();
        self.refresh_searchable_string();
    }

    pub fn set_bookshelves(&mut self, bookshelves: Vec<Bookshelf>) {
        self.bookshelves = bookshelves;
        self.refresh_searchable_string();
    }

    pub fn set_review(&mut self, review: Option<String>) {
        self.has_review_content = review
            .as_deref()
            .map(|review| !review.trim().is_empty())
            .unwrap_or(false);
        self.my_review = review;
    }

    pub fn has_bookshelf(&self, name: &str) -> bool {
        self.bookshelves.iter().any(|shelf| shelf.name == name)
    }

    pub fn title_by_author(&self) -> String {
        format!(
            "{} by {} {}",
            self.title, self.author_first_name, self.author_last_name
        )
        .trim()
        .to_string()
    }

    pub fn preview_text(&self) -> String {
        self.my_review
            .as_deref()
            .map(text::preview_text)
            .unwrap_or_default()
    }

    pub fn reading_time_minutes(&self) -> u32 {
        self.my_review
            .as_deref()
            .map(text::reading_time_minutes)
            .unwrap_or(0)
    }

    fn refresh_searchable_string(&mut self) {
        let parts = [
            self.title.as_str(),
            self.author_first_name.as_str(),
            self.author_last_name.as_str(),
        ];

        self.searchable_string = parts
            .into_iter()
            .chain(self.bookshelves.iter().map(|shelf| shelf.name.as_str()))
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
    }
}
