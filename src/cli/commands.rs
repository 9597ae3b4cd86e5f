use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::app::{AppContext, Result};
use crate::cache::CacheStats;

/// Outcome of a forced refresh.
#[derive(Debug, Serialize)]
pub struct RefreshReport {
    pub generation: u64,
    pub items: usize,
    pub fetched_at: DateTime<Utc>,
    pub stats: CacheStats,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub async fn latest(ctx: &AppContext, n: Option<usize>) -> Result<()> {
    print_json(&ctx.query.latest(n).await?)
}

pub async fn search(ctx: &AppContext, query: &str, limit: Option<usize>) -> Result<()> {
    print_json(&ctx.query.search(query, limit).await?)
}

pub async fn get(ctx: &AppContext, id: &str) -> Result<()> {
    print_json(&ctx.query.get(id).await?)
}

pub async fn categories(ctx: &AppContext) -> Result<()> {
    print_json(&ctx.query.categories().await?)
}

pub async fn refresh(ctx: &AppContext) -> Result<()> {
    print_json(&refresh_report(ctx).await?)
}

async fn refresh_report(ctx: &AppContext) -> Result<RefreshReport> {
    let snapshot = ctx.cache.refresh().await?;
    Ok(RefreshReport {
        generation: snapshot.generation(),
        items: snapshot.len(),
        fetched_at: snapshot.fetched_at(),
        stats: ctx.cache.stats(),
    })
}
