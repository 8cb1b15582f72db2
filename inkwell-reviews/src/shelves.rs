use std::collections::HashSet;

use inkwell_common::models::{Bookshelf, BookshelfGrouping};

/// Custom mappings are in effect as soon as any bookshelf carries an
/// explicit display flag.
pub fn uses_custom_mappings(bookshelves: &[Bookshelf]) -> bool {
    bookshelves.iter().any(|shelf| shelf.display.is_some())
}

/// Bookshelves listed on their own in the filter panel.
///
/// With custom mappings only shelves marked for display that are not part
/// of a grouping are listed, otherwise every shelf is.
pub fn visible_bookshelves<'c>(
    bookshelves: &'c [Bookshelf],
    groupings: &[BookshelfGrouping],
) -> Vec<&'c Bookshelf> {
    let mut visible = if uses_custom_mappings(bookshelves) {
        let grouped = groupings
            .iter()
            .flat_map(|grouping| grouping.bookshelves.iter())
            .map(|shelf| shelf.id)
            .collect::<HashSet<_>>();

        bookshelves
            .iter()
            .filter(|shelf| shelf.display == Some(true) && !grouped.contains(&shelf.id))
            .collect::<Vec<_>>()
    } else {
        bookshelves.iter().collect::<Vec<_>>()
    };

    visible.sort_by(|a, b| a.label().cmp(b.label()));

    visible
}

pub fn sorted_groupings(groupings: &[BookshelfGrouping]) -> Vec<&BookshelfGrouping> {
    let mut sorted = groupings.iter().collect::<Vec<_>>();

    sorted.sort_by(|a, b| a.label().cmp(b.label()));

    sorted
}
