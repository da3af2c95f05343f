//! Reddit research harvester
//!
//! Collects subreddit search results and complete comment trees through the
//! Reddit OAuth API, staying inside the API rate limit, and writes them as
//! CSV and JSON files for the analysis notebook.

mod api;
mod core;
mod export;
mod harvest;
mod models;

use crate::api::endpoints::SortBy;
use crate::core::client::RedditClient;
use crate::core::config::{Config, Credentials};
use crate::core::constants::kind;
use crate::core::logging::init_logging;
use crate::export::{COMMENT_COLUMNS, CsvExporter, POST_COLUMNS, write_raw_json};
use crate::core::fetcher::Fetcher;
use crate::harvest::{
    DEFAULT_NUM_RESULTS, HarvestPlan, collect_comments, collect_posts, get_comments, search_posts,
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

#[derive(Debug, Parser)]
#[command(name = "sm-research", version, about = "Rate-limited Reddit harvester for social media research")]
struct Cli {
    /// Configuration file (defaults to sm-research.toml when present)
    #[arg(long, env = "CONFIG_PATH", global = true)]
    config: Option<PathBuf>,

    /// Credential file holding CLIENT_ID and SECRET_ID
    #[arg(long, global = true)]
    keys: Option<PathBuf>,

    /// Logging level (debug, info, warning, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Search one subreddit and export the matching posts
    Search {
        #[arg(long)]
        subreddit: String,
        #[arg(long)]
        query: String,
        /// Number of posts to collect
        #[arg(long, default_value_t = DEFAULT_NUM_RESULTS)]
        limit: usize,
        #[arg(long, value_enum, default_value_t = SortBy::New)]
        sort: SortBy,
        #[arg(long, default_value = "posts.csv")]
        out: PathBuf,
        /// Also write the raw post objects as JSON
        #[arg(long)]
        raw: Option<PathBuf>,
    },

    /// Export every comment of a post, or of one comment thread
    Comments {
        /// Post id, with or without the t3_ prefix
        #[arg(long)]
        post: String,
        /// Restrict to the thread under this comment
        #[arg(long)]
        comment: Option<String>,
        #[arg(long, default_value = "comments.csv")]
        out: PathBuf,
        /// Also write the raw comment objects as JSON
        #[arg(long)]
        raw: Option<PathBuf>,
    },

    /// Search several subreddits and queries, then collect all comments
    Harvest {
        #[arg(long = "subreddit", required = true)]
        subreddits: Vec<String>,
        #[arg(long = "query", required = true)]
        queries: Vec<String>,
        /// Posts to collect per (subreddit, query) pair
        #[arg(long, default_value_t = DEFAULT_NUM_RESULTS)]
        limit: usize,
        #[arg(long, value_enum, default_value_t = SortBy::New)]
        sort: SortBy,
        /// Output directory (defaults to output.directory from the config)
        #[arg(long)]
        out_dir: Option<PathBuf>,
        /// Also write posts.json and comments.json
        #[arg(long)]
        raw: bool,
    },
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration Error: {:#}", e);
            std::process::exit(1);
        }
    };

    init_logging(cli.log_level.as_deref().unwrap_or(&config.log_level));
    for notice in &config.notices {
        warn!("{}", notice);
    }

    if let Err(e) = run(cli, config).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: Config) -> Result<()> {
    let keys_path = cli.keys.clone().unwrap_or_else(|| config.keys_path.clone());
    let credentials = Credentials::resolve(&keys_path)?;

    print_startup_banner(&config, &keys_path);

    let client = RedditClient::connect(&config, credentials)
        .await
        .context("Failed to authenticate with Reddit")?;
    let exporter = CsvExporter::new(config.utc_offset_hours, &config.web_base_url)?;

    match cli.command {
        Command::Search {
            subreddit,
            query,
            limit,
            sort,
            out,
            raw,
        } => {
            let posts = search_posts(&client, &subreddit, &query, limit, sort).await?;
            let rows = exporter.write_file(&out, &posts, POST_COLUMNS)?;
            if let Some(raw) = raw {
                write_raw_json(&raw, &posts)?;
            }
            println!("{} posts written to {}", rows, out.display());
        }
        Command::Comments {
            post,
            comment,
            out,
            raw,
        } => {
            let post_id = post.strip_prefix(kind::LINK_PREFIX).unwrap_or(&post);
            let comment_id = comment
                .as_deref()
                .map(|c| c.strip_prefix(kind::COMMENT_PREFIX).unwrap_or(c));
            let comments = get_comments(&client, post_id, comment_id).await?;
            let rows = exporter.write_file(&out, &comments, COMMENT_COLUMNS)?;
            if let Some(raw) = raw {
                write_raw_json(&raw, &comments)?;
            }
            println!("{} comments written to {}", rows, out.display());
        }
        Command::Harvest {
            subreddits,
            queries,
            limit,
            sort,
            out_dir,
            raw,
        } => {
            let out_dir = out_dir.unwrap_or_else(|| config.output_dir.clone());
            let plan = HarvestPlan {
                subreddits,
                queries,
                num_results: limit,
                sort,
            };
            run_harvest(&client, &exporter, &plan, &out_dir, raw).await?;
        }
    }

    Ok(())
}

/// Run both harvest phases into `out_dir`
///
/// Posts are written as soon as the search phase ends, so a failure while
/// collecting comments does not lose them.
async fn run_harvest(
    fetcher: &dyn Fetcher,
    exporter: &CsvExporter,
    plan: &HarvestPlan,
    out_dir: &Path,
    raw: bool,
) -> Result<()> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let found = collect_posts(fetcher, plan).await?;
    let post_rows = exporter.write_file(out_dir.join("posts.csv"), &found.posts, POST_COLUMNS)?;
    if raw {
        write_raw_json(out_dir.join("posts.json"), &found.posts)?;
    }
    info!(rows = post_rows, "Posts written to {}", out_dir.display());

    let collected = collect_comments(fetcher, &found.posts)
        .await
        .with_context(|| format!("Comment phase failed; posts are saved in {}", out_dir.display()))?;
    let comment_rows =
        exporter.write_file(out_dir.join("comments.csv"), &collected.comments, COMMENT_COLUMNS)?;
    if raw {
        write_raw_json(out_dir.join("comments.json"), &collected.comments)?;
    }

    println!("✅ Harvest complete in {}", out_dir.display());
    println!("   Posts: {}", post_rows);
    println!("   Posts matched by several queries: {}", found.duplicate_posts);
    println!("   Comments: {}", comment_rows);
    if !collected.skipped_posts.is_empty() {
        println!("   Posts skipped (unavailable): {}", collected.skipped_posts.join(", "));
    }
    Ok(())
}

/// Print startup banner with configuration
fn print_startup_banner(config: &Config, keys_path: &Path) {
    println!("🚀 sm-research v{}", env!("CARGO_PKG_VERSION"));
    println!("✅ Configuration loaded successfully");
    println!("   API Base URL: {}", config.api_base_url);
    println!("   Keys File: {}", keys_path.display());
    println!(
        "   Rate Limit: {} requests / {}s",
        config.max_requests,
        config.window.as_secs()
    );
    println!("   Request Timeout: {}s", config.request_timeout);
    println!("   Timestamp Offset: UTC{:+}", config.utc_offset_hours);
    println!();
}
