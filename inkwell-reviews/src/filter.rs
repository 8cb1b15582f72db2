use inkwell_common::models::{BookReview, BookshelfGrouping};

/// Search terms with fewer non-whitespace characters match nothing.
pub const MIN_SEARCH_TERM_LENGTH: usize = 3;

/// Size of the "recently read" listing.
pub const RECENT_LIMIT: usize = 10;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[derive(serde::Deserialize)]
pub struct ReviewQuery {
    pub search_term: Option<String>,
    pub selected_shelf: Option<String>,
    pub selected_grouping: Option<String>,
    #[serde(default)]
    pub show_recent_only: bool,
}

impl ReviewQuery {
    /// Any non-empty term counts as a search, even one too short to match.
    pub fn search_term(&self) -> Option<&str> {
        non_empty(self.search_term.as_deref())
    }

    pub fn shelf(&self) -> Option<&str> {
        non_empty(self.selected_shelf.as_deref())
    }

    pub fn grouping(&self) -> Option<&str> {
        non_empty(self.selected_grouping.as_deref())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.is_empty())
}

/// Case-insensitive substring match against the review's searchable string.
pub fn matches_search_term(review: &BookReview, term: &str) -> bool {
    let term = term.trim();

    if term.chars().filter(|c| !c.is_whitespace()).count() < MIN_SEARCH_TERM_LENGTH {
        return false;
    }

    review
        .searchable_string()
        .to_lowercase()
        .contains(&term.to_lowercase())
}

/// Applies every filter present in `query` (they are ANDed together).
///
/// Results keep the order of `reviews` unless `show_recent_only` is set, in
/// which case they are ordered by `date_read`, newest first, and cut to
/// [`RECENT_LIMIT`].
pub fn filter_reviews<'c, I>(
    reviews: I,
    groupings: &[BookshelfGrouping],
    query: &ReviewQuery,
) -> Vec<&'c BookReview>
where
    I: IntoIterator<Item = &'c BookReview>,
{
    let search_term = query.search_term();
    let shelf = query.shelf();

    // an unknown grouping name leaves this empty, so nothing matches
    let grouping_shelves = query.grouping().map(|name| {
        groupings
            .iter()
            .filter(|grouping| grouping.name == name)
            .flat_map(|grouping| grouping.bookshelves.iter())
            .map(|shelf| shelf.name.as_str())
            .collect::<Vec<_>>()
    });

    let mut results = reviews
        .into_iter()
        .filter(|review| search_term.map_or(true, |term| matches_search_term(review, term)))
        .filter(|review| shelf.map_or(true, |shelf| review.has_bookshelf(shelf)))
        .filter(|review| {
            grouping_shelves.as_ref().map_or(true, |names| {
                names.iter().any(|name| review.has_bookshelf(name))
            })
        })
        .collect::<Vec<_>>();

    if query.show_recent_only {
        results.sort_by(|a, b| b.date_read.cmp(&a.date_read));
        results.truncate(RECENT_LIMIT);
    }

    results
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone as _, Utc};
    use inkwell_common::models::Bookshelf;

    use super::*;

    fn shelf(name: &str) -> Bookshelf {
        Bookshelf {
            id: name.len() as i64,
            name: name.to_string(),
            display_name: None,
            display: None,
        }
    }

    fn review(id: i64, title: &str, author: (&str, &str), shelves: &[&str]) -> BookReview {
        let read = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(id);

        BookReview::new(id, title, author.0, author.1, read)
            .with_bookshelves(shelves.iter().map(|name| shelf(name)).collect())
    }

    fn catalog() -> Vec<BookReview> {
        vec![
            review(1, "1984", ("George", "Orwell"), &["favorites", "sf-classics"]),
            review(2, "Tenth of December", ("George", "Saunders"), &["featured"]),
            review(3, "The Left Hand of Darkness", ("Ursula", "Le Guin"), &["sf-classics"]),
            review(4, "The Lord of the Rings", ("J.R.R.", "Tolkien"), &["favorites", "high-fantasy", "featured"]),
            review(5, "The Odyssey", ("", "Homer"), &["ancient-greek"]),
        ]
    }

    fn groupings() -> Vec<BookshelfGrouping> {
        vec![
            BookshelfGrouping {
                id: 1,
                name: "Science Fiction".to_string(),
                display_name: None,
                is_genre_based: true,
                bookshelves: vec![shelf("sf-classics"), shelf("space-opera")],
            },
            BookshelfGrouping {
                id: 2,
                name: "Fantasy".to_string(),
                display_name: None,
                is_genre_based: true,
                bookshelves: vec![shelf("high-fantasy")],
            },
        ]
    }

    fn ids(results: &[&BookReview]) -> Vec<i64> {
        results.iter().map(|review| review.id).collect()
    }

    fn search(term: &str) -> ReviewQuery {
        ReviewQuery {
            search_term: Some(term.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_no_filters_keeps_everything_in_order() {
        let reviews = catalog();
        let results = filter_reviews(&reviews, &groupings(), &ReviewQuery::default());

        assert_eq!(ids(&results), [1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_search_is_case_insensitive_substring() {
        let reviews = catalog();

        assert_eq!(ids(&filter_reviews(&reviews, &groupings(), &search("GEORGE"))), [1, 2]);
        assert_eq!(ids(&filter_reviews(&reviews, &groupings(), &search("ursula"))), [3]);
        assert_eq!(ids(&filter_reviews(&reviews, &groupings(), &search("featured"))), [2, 4]);
        assert_eq!(ids(&filter_reviews(&reviews, &groupings(), &search("lord of the"))), [4]);
    }

    #[test]
    fn test_short_search_terms_match_nothing() {
        let reviews = catalog();

        for term in ["t", "th", "  th  ", "a b", " \t\n\r "] {
            assert!(
                filter_reviews(&reviews, &groupings(), &search(term)).is_empty(),
                "{:?} should not match",
                term
            );
        }
    }

    #[test]
    fn test_whitespace_search_term_is_still_a_search() {
        let query = search(" \t ");

        assert_eq!(query.search_term(), Some(" \t "));
        assert_eq!(ReviewQuery::default().search_term(), None);
        assert_eq!(search("").search_term(), None);
    }

    #[test]
    fn test_search_term_is_trimmed() {
        let reviews = catalog();

        assert_eq!(ids(&filter_reviews(&reviews, &groupings(), &search("  1984 "))), [1]);
    }

    #[test]
    fn test_shelf_filter() {
        let reviews = catalog();
        let query = ReviewQuery {
            selected_shelf: Some("favorites".to_string()),
            ..Default::default()
        };

        assert_eq!(ids(&filter_reviews(&reviews, &groupings(), &query)), [1, 4]);
    }

    #[test]
    fn test_search_and_shelf_combine() {
        let reviews = catalog();
        let query = ReviewQuery {
            search_term: Some("george".to_string()),
            selected_shelf: Some("favorites".to_string()),
            ..Default::default()
        };

        assert_eq!(ids(&filter_reviews(&reviews, &groupings(), &query)), [1]);
    }

    #[test]
    fn test_grouping_filter() {
        let reviews = catalog();
        let query = ReviewQuery {
            selected_grouping: Some("Science Fiction".to_string()),
            ..Default::default()
        };

        assert_eq!(ids(&filter_reviews(&reviews, &groupings(), &query)), [1, 3]);
    }

    #[test]
    fn test_unknown_names_match_nothing() {
        let reviews = catalog();

        let shelf = ReviewQuery {
            selected_shelf: Some("no-such-shelf".to_string()),
            ..Default::default()
        };
        assert!(filter_reviews(&reviews, &groupings(), &shelf).is_empty());

        let grouping = ReviewQuery {
            selected_grouping: Some("History".to_string()),
            ..Default::default()
        };
        assert!(filter_reviews(&reviews, &groupings(), &grouping).is_empty());
    }

    #[test]
    fn test_empty_strings_are_not_filters() {
        let reviews = catalog();
        let query = ReviewQuery {
            search_term: Some(String::new()),
            selected_shelf: Some(String::new()),
            selected_grouping: Some(String::new()),
            show_recent_only: false,
        };

        assert_eq!(filter_reviews(&reviews, &groupings(), &query).len(), 5);
    }

    #[test]
    fn test_recent_orders_newest_first_after_filters() {
        let reviews = catalog();
        let query = ReviewQuery {
            selected_shelf: Some("sf-classics".to_string()),
            show_recent_only: true,
            ..Default::default()
        };

        assert_eq!(ids(&filter_reviews(&reviews, &groupings(), &query)), [3, 1]);
    }

    #[test]
    fn test_recent_caps_results() {
        let reviews = (1..=25)
            .map(|id| review(id, &format!("Book {}", id), ("A", "Writer"), &["favorites"]))
            .collect::<Vec<_>>();
        let query = ReviewQuery {
            show_recent_only: true,
            ..Default::default()
        };

        let results = filter_reviews(&reviews, &[], &query);

        assert_eq!(results.len(), RECENT_LIMIT);
        assert_eq!(results[0].id, 25);
        assert!(results
            .windows(2)
            .all(|pair| pair[0].date_read >= pair[1].date_read));
    }

    #[test]
    fn test_recent_ties_keep_input_order() {
        let read = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let reviews = vec![
            BookReview::new(7, "First", "A", "B", read),
            BookReview::new(3, "Second", "A", "B", read),
        ];
        let query = ReviewQuery {
            show_recent_only: true,
            ..Default::default()
        };

        assert_eq!(ids(&filter_reviews(&reviews, &[], &query)), [7, 3]);
    }

    #[test]
    fn test_repeated_calls_are_deterministic() {
        let reviews = catalog();
        let query = search("the");

        let first = ids(&filter_reviews(&reviews, &groupings(), &query));
        let second = ids(&filter_reviews(&reviews, &groupings(), &query));

        assert_eq!(first, second);
    }
}
