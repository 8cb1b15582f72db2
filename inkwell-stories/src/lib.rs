pub mod grouping;
pub mod source;
mod utils;

use inkwell_common::{models::StoriesViewModel, text, Conf, Report};

use crate::source::{MockStories, StorySource, SubstackClient};

pub use crate::grouping::{
    extract_number_from_title, group_into_view, group_similar_stories, match_delimiter,
    match_fractional, sort_stories_in_group, SeriesPattern,
};

/// Categories that have stories behind them.
pub const STORY_CATEGORIES: [&str; 3] = ["Fantasy", "Science Fiction", "Modern Fiction"];

/// Turns a url slug such as `science-fiction` into `Science Fiction`.
pub fn display_category(slug: &str) -> String {
    text::title_case(slug.replace('-', " ").trim())
}

pub fn known_category(category: &str) -> Option<&'static str> {
    STORY_CATEGORIES
        .iter()
        .copied()
        .find(|known| known.eq_ignore_ascii_case(category.trim()))
}

#[tracing::instrument(skip(source), err)]
pub async fn build_stories_view<S>(
    source: &S,
    category: &str,
) -> Result<StoriesViewModel, Report>
where
    S: StorySource + ?Sized,
{
    let mut view = StoriesViewModel {
        category: category.to_string(),
        ..Default::default()
    };

    if category.trim().is_empty() {
        view.no_stories_message = Some("Please select a category to view stories.".to_string());

        return Ok(view);
    }

    let known = match known_category(category) {
        Some(known) => known,
        None => {
            tracing::warn!("unknown story category");

            view.no_stories_message =
                Some(format!("No stories found in the category '{}'.", category));

            return Ok(view);
        }
    };

    let stories = source.stories(known).await?;

    tracing::info!(count = stories.len(), "fetched stories");

    group_into_view(stories, &mut view);

    Ok(view)
}

#[tracing::instrument(skip(conf), err)]
pub async fn run(conf: &Conf, category: &str) -> Result<(), Report> {
    let source: Box<dyn StorySource> = match conf.substack.as_deref() {
        Some(base) => Box::new(SubstackClient::new(base, conf.story_limit)?),
        None => {
            tracing::info!("no publication configured, using sample stories");

            Box::new(MockStories::sample())
        }
    };

    let view = build_stories_view(source.as_ref(), &display_category(category)).await?;

    println!("{}", serde_json::to_string_pretty(&view)?);

    Ok(())
}
