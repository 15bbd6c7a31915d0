//! Post commands: `list`, `show`, `complete`, `delete`.
//!
//! Each goes through the running server's API when one is up, otherwise
//! straight to the store.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use poststage::app::connect;
use poststage::config::Config;
use poststage::lifecycle::state_at;
use poststage::post::Post;

/// Width of the title column in `list` output.
const TITLE_WIDTH: usize = 40;

pub async fn list(config: &Config, json: bool) -> Result<()> {
    let access = connect(config).await?;
    let posts = access.list().await?;
    let now = access.now();

    if json {
        let out = serde_json::to_string_pretty(&posts).context("Failed to serialize posts")?;
        println!("{out}");
    } else if posts.is_empty() {
        println!("No posts");
    } else {
        println!("{:<32} {:<10} {:<20} TITLE", "ID", "STATE", "EXPIRES");
        for post in &posts {
            println!(
                "{:<32} {:<10} {:<20} {}",
                post.id,
                state_at(post, now).to_string(),
                post.expires_at.format("%Y-%m-%d %H:%M").to_string(),
                truncate(&post.title, TITLE_WIDTH)
            );
        }
    }
    Ok(())
}

pub async fn show(config: &Config, id: &str) -> Result<()> {
    let access = connect(config).await?;
    let post = access.get(id).await?;
    print_post(&post, access.now(), &config.base_url());
    Ok(())
}

pub async fn complete(config: &Config, id: &str) -> Result<()> {
    let access = connect(config).await?;
    let expires_at = access.complete(id).await?;
    println!("Completed {id}; expires {}", expires_at.to_rfc3339());
    Ok(())
}

pub async fn delete(config: &Config, id: &str) -> Result<()> {
    let access = connect(config).await?;
    let deleted = access.delete(id).await?;
    if deleted == 0 {
        println!("Nothing stored for {id}");
    } else {
        println!("Deleted {deleted} object(s) for {id}");
    }
    Ok(())
}

fn print_post(post: &Post, now: DateTime<Utc>, base_url: &str) {
    println!("{}", post.title);
    println!("  id:       {}", post.id);
    println!("  state:    {}", state_at(post, now));
    println!("  created:  {}", post.created_at.to_rfc3339());
    println!("  expires:  {}", post.expires_at.to_rfc3339());
    if let Some(completed_at) = post.completed_at {
        println!("  completed: {}", completed_at.to_rfc3339());
    }
    println!("  preview:  {base_url}/post/{}", post.id);
    if !post.hashtags.is_empty() {
        println!("  hashtags: {}", post.hashtags.join(" "));
    }
    for (i, url) in post.images.iter().enumerate() {
        println!("  image {}:  {url}", i + 1);
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let cut: String = s.chars().take(max.saturating_sub(3)).collect();
    format!("{cut}...")
}
