//! Anime discovery CLI.
//!
//! A thin front end over the slot controllers: each subcommand drives one
//! controller and prints the resulting view model.

use anime_discovery::api::{Aired, Anime, Club, Manga, MediaKind, Searchable};
use anime_discovery::{
    DetailSession, JikanClient, Listing, ListingController, ListingFilter, RankingCache,
    RankingCategory, RankingOptions, Record, SearchController, SearchOptions, SharedSource,
    SlotState, SortOrder,
};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use shared::{Config, SearchMode};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Collection {
    Anime,
    Manga,
    Club,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search a collection by keyword
    Search {
        query: String,
        #[arg(short, long, value_enum, default_value = "anime")]
        kind: Collection,
        /// Number of result pages to load
        #[arg(short, long, default_value_t = 1)]
        pages: u32,
    },
    /// Show a top anime ranking
    Top {
        /// top, airing, upcoming, bypopularity or favorite
        category: Option<String>,
    },
    /// Browse a collection with filters
    Browse {
        #[arg(short, long, value_enum, default_value = "anime")]
        kind: Collection,
        #[arg(short, long)]
        query: Option<String>,
        /// Comma separated genre ids
        #[arg(short, long, value_delimiter = ',')]
        genres: Vec<u32>,
        /// Media type, e.g. tv, movie, manga
        #[arg(short = 't', long = "type")]
        media_type: Option<String>,
        #[arg(long)]
        order_by: Option<String>,
        /// Sort descending
        #[arg(long)]
        desc: bool,
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
    /// Show an anime with optional sub-resources
    Anime {
        id: u32,
        #[arg(long)]
        reviews: bool,
        #[arg(long)]
        recommendations: bool,
        #[arg(long)]
        videos: bool,
    },
    /// Show a manga with optional sub-resources
    Manga {
        id: u32,
        #[arg(long)]
        reviews: bool,
        #[arg(long)]
        recommendations: bool,
    },
    /// Show a club and a page of its members
    Club {
        id: u32,
        #[arg(long, default_value_t = 1)]
        members_page: u32,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = Config::from_file(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Initialize logging
    let mut log_config = shared::logging::from_settings(&config.logging, "anime-discovery");
    if args.verbose {
        log_config.default_level = tracing::Level::DEBUG;
    }
    shared::logging::init(log_config)?;

    info!(config_file = %args.config.display(), "Loaded configuration");

    let client = JikanClient::from_config(&config.api).context("Failed to create Jikan client")?;
    let source: SharedSource = Arc::new(client);

    match args.command {
        Command::Search { query, kind, pages } => {
            // The CLI submits explicitly, there is no keystroke stream to debounce
            let options = SearchOptions {
                mode: SearchMode::Manual,
                ..SearchOptions::from_config(&config.search)
            };
            match kind {
                Collection::Anime => search::<Anime>(source, options, &query, pages).await,
                Collection::Manga => search::<Manga>(source, options, &query, pages).await,
                Collection::Club => search::<Club>(source, options, &query, pages).await,
            }
        }
        Command::Top { category } => {
            let mut options = RankingOptions::from_config(&config.ranking)?;
            if let Some(category) = category {
                options.default_category = category.parse::<RankingCategory>()?;
            }
            top(source, options).await
        }
        Command::Browse {
            kind,
            query,
            genres,
            media_type,
            order_by,
            desc,
            page,
        } => {
            let filter = ListingFilter {
                query: query.unwrap_or_default(),
                genres,
                media_type,
                sort: order_by.as_ref().map(|_| {
                    if desc {
                        SortOrder::Desc
                    } else {
                        SortOrder::Asc
                    }
                }),
                order_by,
            };
            let page_size = config.listing.page_size;
            match kind {
                Collection::Anime => browse::<Anime>(source, filter, page_size, page).await,
                Collection::Manga => browse::<Manga>(source, filter, page_size, page).await,
                Collection::Club => browse::<Club>(source, filter, page_size, page).await,
            }
        }
        Command::Anime {
            id,
            reviews,
            recommendations,
            videos,
        } => {
            let detail = DetailSession::new(source);
            wait(detail.load_anime(id)).await?;
            let anime = expect_entity(detail.anime(id), "anime", id)?;
            println!("{} [{}]", anime.title, anime.mal_id);
            if let Some(score) = anime.score {
                println!("  score: {:.2}", score);
            }
            if let Some(started) = anime.aired.as_ref().and_then(Aired::started_on) {
                println!("  aired: {}", started.format("%b %-d, %Y"));
            }
            if let Some(synopsis) = &anime.synopsis {
                println!("  {}", synopsis);
            }

            if reviews {
                wait(detail.load_reviews(MediaKind::Anime, id, 1)).await?;
                print_listing("Reviews", &detail.reviews(MediaKind::Anime, id))?;
            }
            if recommendations {
                wait(detail.load_recommendations(MediaKind::Anime, id)).await?;
                print_records("Recommendations", &detail.recommendations(MediaKind::Anime, id))?;
            }
            if videos {
                wait(detail.load_videos(id)).await?;
                print_records("Videos", &detail.videos(id))?;
            }
            Ok(())
        }
        Command::Manga {
            id,
            reviews,
            recommendations,
        } => {
            let detail = DetailSession::new(source);
            wait(detail.load_manga(id)).await?;
            let manga = expect_entity(detail.manga(id), "manga", id)?;
            println!("{} [{}]", manga.title, manga.mal_id);
            if let Some(synopsis) = &manga.synopsis {
                println!("  {}", synopsis);
            }

            if reviews {
                wait(detail.load_reviews(MediaKind::Manga, id, 1)).await?;
                print_listing("Reviews", &detail.reviews(MediaKind::Manga, id))?;
            }
            if recommendations {
                wait(detail.load_recommendations(MediaKind::Manga, id)).await?;
                print_records("Recommendations", &detail.recommendations(MediaKind::Manga, id))?;
            }
            Ok(())
        }
        Command::Club { id, members_page } => {
            let detail = DetailSession::new(source);
            wait(detail.load_club(id)).await?;
            let club = expect_entity(detail.club(id), "club", id)?;
            println!("{} [{}]", club.name, club.mal_id);

            wait(detail.load_members(id, members_page)).await?;
            print_listing("Members", &detail.members(id))
        }
    }
}

async fn search<R: Searchable>(
    source: SharedSource,
    options: SearchOptions,
    query: &str,
    pages: u32,
) -> Result<()> {
    let search = SearchController::<R>::new(source, options);
    let Some(handle) = search.search_for(query) else {
        bail!("Search query is empty");
    };
    wait(handle).await?;

    for _ in 1..pages {
        match search.load_more() {
            Some(handle) => wait(handle).await?,
            None => break,
        }
    }

    print_listing(&format!("Results for \"{}\"", query.trim()), &search.state())
}

async fn top(source: SharedSource, options: RankingOptions) -> Result<()> {
    let category = options.default_category;
    let ranking = RankingCache::new(source, options);
    let state = ranking.settled(category).await;
    print_records(&format!("Top anime ({})", category), &state)
}

async fn browse<R: Searchable>(
    source: SharedSource,
    filter: ListingFilter,
    page_size: u32,
    page: u32,
) -> Result<()> {
    let listing = ListingController::<R>::new(source, filter, page_size);
    let Some(handle) = listing.go_to_page(page) else {
        bail!("Pages start at 1");
    };
    wait(handle).await?;
    print_listing(&format!("Page {}", listing.current_page()), &listing.state())
}

async fn wait(handle: JoinHandle<()>) -> Result<()> {
    handle.await.context("Request task failed")
}

fn expect_entity<T>(state: SlotState<Option<T>>, what: &str, id: u32) -> Result<T> {
    if let Some(error) = state.error {
        bail!("Failed to load {} {}: {}", what, id, error);
    }
    state
        .data
        .with_context(|| format!("{} {} is missing required fields", what, id))
}

fn print_records<R: Record>(title: &str, state: &SlotState<Vec<R>>) -> Result<()> {
    if let Some(error) = &state.error {
        bail!("{}: {}", title, error);
    }
    println!("{} ({})", title, state.data.len());
    for record in &state.data {
        println!("  {:>8}  {}", record.id().to_string(), record.display_name());
    }
    Ok(())
}

fn print_listing<R: Record>(title: &str, state: &SlotState<Listing<R>>) -> Result<()> {
    if let Some(error) = &state.error {
        bail!("{}: {}", title, error);
    }
    let pagination = &state.data.pagination;
    println!(
        "{} ({} shown, page {} of {})",
        title,
        state.data.len(),
        pagination.current_page,
        pagination.total_pages
    );
    for record in &state.data.items {
        println!("  {:>8}  {}", record.id().to_string(), record.display_name());
    }
    if pagination.has_next_page {
        println!("  ...");
    }
    Ok(())
}
