use inkwell_common::{err, models::Story, Context as _, Report, Uri};

use crate::utils;

/// Where stories come from. The grouper only sees the list it returns.
#[async_trait::async_trait]
pub trait StorySource: Send + Sync {
    async fn stories(&self, category: &str) -> Result<Vec<Story>, Report>;
}

/// Fixed in-memory stories, used when no publication is configured.
pub struct MockStories {
    stories: Vec<Story>,
}

impl MockStories {
    pub fn new(stories: Vec<Story>) -> Self {
        Self { stories }
    }

    pub fn sample() -> Self {
        fn story(title: &str, subtitle: &str, category: &str, slug: &str) -> Story {
            Story {
                title: title.to_string(),
                subtitle: subtitle.to_string(),
                preview_text: String::new(),
                image_url: "/images/optimized/story icon.webp".to_string(),
                category: category.to_string(),
                read_more_url: format!("/stories/{}", slug),
            }
        }

        Self::new(vec![
            story("The Last Starship", "A journey beyond the stars", "Science Fiction", "the-last-starship"),
            story("Neural Interface", "When minds and machines merge", "Science Fiction", "neural-interface"),
            story("Martian Colony (2/2)", "Alien skies", "Science Fiction", "martian-colony-2"),
            story("Martian Colony (1/2)", "Born under alien skies", "Science Fiction", "martian-colony-1"),
            story("Dragon's Breath", "The forgotten kingdom awakens", "Fantasy", "dragons-breath"),
            story("The Legend of Elsbeth - Chapter 2", "The tower", "Fantasy", "elsbeth-2"),
            story("The Legend of Elsbeth - Chapter 1", "The oath", "Fantasy", "elsbeth-1"),
            story("City Lights", "Finding yourself in the urban jungle", "Modern Fiction", "city-lights"),
        ])
    }
}

#[async_trait::async_trait]
impl StorySource for MockStories {
    async fn stories(&self, category: &str) -> Result<Vec<Story>, Report> {
        Ok(self
            .stories
            .iter()
            .filter(|story| story.category.eq_ignore_ascii_case(category))
            .cloned()
            .collect())
    }
}

#[derive(Debug, serde::Deserialize)]
struct Post {
    title: Option<String>,
    subtitle: Option<String>,
    description: Option<String>,
    cover_image: Option<String>,
    canonical_url: Option<String>,
}

impl Post {
    fn into_story(self, category: &str) -> Story {
        Story {
            title: self.title.unwrap_or_default(),
            subtitle: self.subtitle.unwrap_or_default(),
            preview_text: self.description.unwrap_or_default(),
            image_url: self.cover_image.unwrap_or_default(),
            category: category.to_string(),
            read_more_url: self.canonical_url.unwrap_or_default(),
        }
    }
}

#[derive(serde::Serialize)]
struct ArchiveQuery<'q> {
    sort: &'static str,
    search: &'q str,
    offset: usize,
    limit: usize,
}

/// Reads posts from a Substack publication archive, one page at a time.
pub struct SubstackClient {
    base: Uri,
    page_size: usize,
    limit: Option<usize>,
}

impl SubstackClient {
    pub const PAGE_SIZE: usize = 15;

    pub fn new(base: &str, limit: Option<usize>) -> Result<Self, Report> {
        let base = Uri::try_from(base.trim_end_matches('/'))
            .with_context(|| format!("invalid publication url `{}`", base))?;

        if base.scheme().is_none() || base.authority().is_none() {
            return Err(err!("publication url `{}` must be absolute", base));
        }

        Ok(Self {
            base,
            page_size: Self::PAGE_SIZE,
            limit,
        })
    }

    fn page_url(&self, category: &str, offset: usize) -> Result<Uri, Report> {
        let query = serde_urlencoded::to_string(&ArchiveQuery {
            sort: "new",
            search: category,
            offset,
            limit: self.page_size,
        })?;

        let url = format!("{}/api/v1/archive?{}", self.base.to_string().trim_end_matches('/'), query);

        Uri::try_from(url.as_str()).with_context(|| format!("invalid archive url `{}`", url))
    }
}

#[async_trait::async_trait]
impl StorySource for SubstackClient {
    #[tracing::instrument(skip(self), err)]
    async fn stories(&self, category: &str) -> Result<Vec<Story>, Report> {
        let mut stories = Vec::new();
        let mut offset = 0;

        loop {
            let url = self.page_url(category, offset)?;

            let body = utils::req(&url).await?;
            let posts: Vec<Post> = serde_json::from_str(&body)
                .with_context(|| format!("unable to read archive page `{}`", url))?;

            let received = posts.len();
            tracing::debug!(offset = offset, received = received, "read archive page");

            stories.extend(posts.into_iter().map(|post| post.into_story(category)));

            if let Some(limit) = self.limit {
                if stories.len() >= limit {
                    stories.truncate(limit);
                    break;
                }
            }

            if received < self.page_size {
                break;
            }

            offset += self.page_size;

            utils::pause().await?;
        }

        Ok(stories)
    }
}
