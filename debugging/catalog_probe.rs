//! Query the catalog through the same client the server uses and print the mapped views.
//! Usage:
//!   cargo run --bin catalog_probe -- popular [page]
//!   cargo run --bin catalog_probe -- search <query> [page]
//!   cargo run --bin catalog_probe -- movie <tmdb_id>
//! Requires TMDB_API_TOKEN in the environment (.env supported).

use anyhow::{anyhow, Context, Result};
use cineshelf::config::Config;
use cineshelf::models::{Movie, PagedResult};
use cineshelf::tmdb::{ImageUrls, TmdbApi, TmdbClient};
use cineshelf::views::{format_runtime, MovieCard};
use dotenvy::dotenv;
use serde_json::json;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Command {
    Popular,
    Search,
    Movie,
}

impl FromStr for Command {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "popular" => Ok(Command::Popular),
            "search" => Ok(Command::Search),
            "movie" => Ok(Command::Movie),
            _ => Err(anyhow!("command must be 'popular', 'search' or 'movie'")),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args: Vec<String> = env::args().skip(1).collect();
    let Some(first) = args.first() else {
        eprintln!("Usage: cargo run --bin catalog_probe -- popular [page]");
        eprintln!("       cargo run --bin catalog_probe -- search <query> [page]");
        eprintln!("       cargo run --bin catalog_probe -- movie <tmdb_id>");
        return Err(anyhow!("missing command"));
    };
    let command = Command::from_str(first)?;

    let config = Config::from_env()?;
    let client = TmdbClient::new(&config)?;
    let images = ImageUrls::new(&config.image_base_url);

    match command {
        Command::Popular => {
            let page = parse_page(args.get(1))?;
            let result = client.popular_movies(page).await?;
            print_page(&result, &images);
        }
        Command::Search => {
            let query = args
                .get(1)
                .ok_or_else(|| anyhow!("missing search query"))?;
            let page = parse_page(args.get(2))?;
            let result = client.search_movies(query, page).await?;
            print_page(&result, &images);
        }
        Command::Movie => {
            let id: u64 = args
                .get(1)
                .ok_or_else(|| anyhow!("missing tmdb id"))?
                .parse()
                .context("tmdb id must be a positive integer")?;
            let details = client.movie_details(id).await?;
            let out = json!({
                "id": details.movie.id,
                "title": details.movie.title,
                "tagline": details.tagline,
                "status": details.status,
                "runtime": details.runtime.and_then(format_runtime),
                "genres": details.genres.iter().map(|g| g.name.clone()).collect::<Vec<_>>(),
                "companies": details
                    .production_companies
                    .iter()
                    .map(|c| c.name.clone())
                    .collect::<Vec<_>>(),
                "poster": images.poster_url(details.movie.poster_path.as_deref()),
                "backdrop": images.backdrop_url(details.movie.backdrop_path.as_deref()),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }

    Ok(())
}

fn parse_page(arg: Option<&String>) -> Result<u32> {
    match arg {
        Some(p) => p.parse().context("page must be a positive integer"),
        None => Ok(1),
    }
}

fn print_page(result: &PagedResult<Movie>, images: &ImageUrls) {
    println!(
        "page {}/{} ({} results)",
        result.page, result.total_pages, result.total_results
    );
    for movie in &result.results {
        let card = MovieCard::new(movie, false, images);
        println!(
            "{:>8}  {:<40} {:>4}  {:.1}  {}",
            card.id,
            card.title,
            card.year.as_deref().unwrap_or("----"),
            card.rating,
            card.poster_url
        );
    }
}
