mod verbose;

use clap::{FromArgMatches as _, IntoApp as _, Parser, Subcommand};
use tracing_error::ErrorLayer;
use tracing_subscriber::{prelude::*, EnvFilter, Registry};
use twelf::Layer;

use inkwell_common::{text::clean_search_term, Conf};
use inkwell_reviews::ReviewQuery;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Cli {
    #[clap(flatten)]
    verbose: verbose::Verbosity,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List a category's stories with series collected into groups
    Stories { category: String },
    /// Browse or search the book reviews
    Reviews {
        /// Match against title, author and bookshelf names (at least 3 characters)
        #[clap(long)]
        search: Option<String>,
        /// Only reviews on this bookshelf
        #[clap(long)]
        shelf: Option<String>,
        /// Only reviews on a bookshelf of this grouping
        #[clap(long)]
        grouping: Option<String>,
        /// The ten most recently read matches
        #[clap(long)]
        recent: bool,
    },
    /// Recompute the stored search strings of every review
    Reindex,
}

/// Builds the review query from the command line, cleaning the search term.
///
/// A term that cleans down to nothing is kept as typed so it still searches
/// (and matches nothing) instead of falling back to browsing.
fn review_query(
    search: Option<String>,
    shelf: Option<String>,
    grouping: Option<String>,
    recent: bool,
) -> ReviewQuery {
    let search_term = search.map(|term| {
        let cleaned = clean_search_term(term.as_str());

        if cleaned.is_empty() {
            term
        } else {
            cleaned
        }
    });

    ReviewQuery {
        search_term,
        selected_shelf: shelf,
        selected_grouping: grouping,
        show_recent_only: recent,
    }
}

#[tokio::main]
async fn main() -> Result<(), inkwell_common::Report> {
    inkwell_common::install()?;

    let matches = Cli::command().args(&Conf::clap_args()).get_matches();
    let cli = Cli::from_arg_matches(&matches)?;
    let conf = Conf::with_layers(&[
        Layer::Json("inkwell.json".into()),
        Layer::Toml("inkwell.toml".into()),
        Layer::Env(Some("INKWELL_".to_string())),
        Layer::Clap(matches),
    ])?;

    let subscriber = Registry::default()
        .with(ErrorLayer::default())
        .with(tracing_subscriber::fmt::Layer::default())
        .with(EnvFilter::from_default_env().add_directive(cli.verbose.log_level_filter().into()));

    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Stories { category } => inkwell_stories::run(&conf, &category).await?,
        Commands::Reviews {
            search,
            shelf,
            grouping,
            recent,
        } => {
            let query = review_query(search, shelf, grouping, recent);

            inkwell_reviews::run(&conf, query).await?
        }
        Commands::Reindex => inkwell_reviews::reindex(&conf).await?,
    }

    Ok(())
}
