use std::collections::HashMap;

use inkwell_common::models::{StoriesViewModel, Story, StoryGroup};
use once_cell::sync::Lazy;
use regex::Regex;

// "<prefix> - <suffix>", e.g. "The Legend of Elsbeth - Chapter 1"
static DELIMITER_SERIES: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.+)\s+-\s+(.+)$").unwrap());

// "<prefix> (<part>/<total>)", e.g. "The Wife and the Terrorist (1/4)"
static FRACTIONAL_SERIES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+)\s+\(([0-9]+)/([0-9]+)\)$").unwrap());

/// What a story title says about the series it belongs to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SeriesPattern {
    Delimiter { prefix: String },
    Fractional { prefix: String, total: u64 },
    None,
}

impl SeriesPattern {
    fn key(&self) -> Option<SeriesKey> {
        match self {
            SeriesPattern::Delimiter { prefix } => Some(SeriesKey {
                prefix: prefix.to_lowercase(),
                total: None,
            }),
            SeriesPattern::Fractional { prefix, total } => Some(SeriesKey {
                prefix: prefix.to_lowercase(),
                total: Some(*total),
            }),
            SeriesPattern::None => None,
        }
    }

    fn group_title(&self) -> String {
        match self {
            SeriesPattern::Delimiter { prefix } => prefix.clone(),
            SeriesPattern::Fractional { prefix, total } => {
                format!("{} (Series of {})", prefix, total)
            }
            SeriesPattern::None => String::new(),
        }
    }
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
struct SeriesKey {
    prefix: String,
    total: Option<u64>,
}

pub fn match_delimiter(title: &str) -> SeriesPattern {
    let prefix = DELIMITER_SERIES
        .captures(title)
        .and_then(|caps| caps.get(1))
        .map(|prefix| prefix.as_str().trim())
        .filter(|prefix| !prefix.is_empty());

    match prefix {
        Some(prefix) => SeriesPattern::Delimiter {
            prefix: prefix.to_string(),
        },
        None => SeriesPattern::None,
    }
}

pub fn match_fractional(title: &str) -> SeriesPattern {
    let caps = match FRACTIONAL_SERIES.captures(title) {
        Some(caps) => caps,
        None => return SeriesPattern::None,
    };

    let prefix = caps[1].trim();
    let total = caps[3].parse::<u64>().ok().filter(|total| *total > 0);

    match total {
        Some(total) if !prefix.is_empty() => SeriesPattern::Fractional {
            prefix: prefix.to_string(),
            total,
        },
        _ => SeriesPattern::None,
    }
}

/// Value of the first run of ASCII digits in the title.
///
/// A run too large for a `u64` counts as no number.
pub fn extract_number_from_title(title: &str) -> Option<u64> {
    let start = title.find(|c: char| c.is_ascii_digit())?;
    let rest = &title[start..];
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());

    rest[..end].parse().ok()
}

/// Orders the parts of a series.
///
/// Titles with a number come first in ascending numeric order, the rest
/// follow in ordinal title order. Both sorts are stable.
pub fn sort_stories_in_group(stories: Vec<Story>) -> Vec<Story> {
    let (mut numbered, mut unnumbered): (Vec<_>, Vec<_>) = stories
        .into_iter()
        .map(|story| (extract_number_from_title(&story.title), story))
        .partition(|(number, _)| number.is_some());

    numbered.sort_by_key(|(number, _)| *number);
    unnumbered.sort_by(|(_, a), (_, b)| a.title.cmp(&b.title));

    numbered
        .into_iter()
        .chain(unnumbered)
        .map(|(_, story)| story)
        .collect()
}

/// Splits stories into standalone stories and series groups.
///
/// Delimiter series are collected first; stories taken by one are not
/// looked at again for fractional series. Groups need at least two members
/// and come out in order of first appearance. Standalone stories keep
/// their relative order.
pub fn group_similar_stories(stories: Vec<Story>) -> (Vec<Story>, Vec<StoryGroup>) {
    let mut slots = stories.into_iter().map(Some).collect::<Vec<_>>();
    let mut groups = Vec::new();

    collect_groups(&mut slots, &mut groups, match_delimiter);
    collect_groups(&mut slots, &mut groups, match_fractional);

    let remaining = slots.into_iter().flatten().collect();

    (remaining, groups)
}

/// Groups `stories` into `view`, replacing its story lists.
pub fn group_into_view(stories: Vec<Story>, view: &mut StoriesViewModel) {
    let (remaining, groups) = group_similar_stories(stories);

    tracing::debug!(
        standalone = remaining.len(),
        groups = groups.len(),
        "grouped stories"
    );

    view.stories = remaining;
    view.story_groups = groups;
}

fn collect_groups(
    slots: &mut [Option<Story>],
    groups: &mut Vec<StoryGroup>,
    matcher: fn(&str) -> SeriesPattern,
) {
    let mut found: Vec<(String, Vec<usize>)> = Vec::new();
    let mut positions: HashMap<SeriesKey, usize> = HashMap::new();

    for (index, slot) in slots.iter().enumerate() {
        let story = match slot {
            Some(story) => story,
            None => continue,
        };

        let pattern = matcher(&story.title);
        let key = match pattern.key() {
            Some(key) => key,
            None => continue,
        };

        if let Some(position) = positions.get(&key) {
            found[*position].1.push(index);
            continue;
        }

        positions.insert(key, found.len());
        found.push((pattern.group_title(), vec![index]));
    }

    for (title, members) in found {
        if members.len() < 2 {
            continue;
        }

        let stories = members
            .into_iter()
            .filter_map(|index| slots[index].take())
            .collect();

        groups.push(StoryGroup {
            title,
            stories: sort_stories_in_group(stories),
        });
    }
}
