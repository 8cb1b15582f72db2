pub mod models;
pub mod text;

pub use color_eyre::{
    eyre::{bail, eyre as err, Context, Report},
    install,
};
pub use http::Uri;

#[twelf::config]
pub struct Conf {
    /// SQLite connection URI for the book review catalog
    pub database: String,

    /// Base URL of the Substack publication serving stories
    pub substack: Option<String>,

    /// Maximum number of stories fetched per category
    pub story_limit: Option<usize>,
}
