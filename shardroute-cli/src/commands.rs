use anyhow::{anyhow, Result};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use serde::Serialize;
use shardroute_core::{CancellationToken, Shard, ShardCluster};
use shardroute_types::Bucket;
use sqlx::postgres::PgArguments;
use sqlx::PgPool;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Serialize)]
struct Location {
    key: String,
    bucket: u32,
    schema: String,
    shard: Option<String>,
}

#[derive(Debug, Serialize)]
struct ShardSummary {
    shard: String,
    buckets: Vec<u32>,
}

pub fn locate(cluster: &ShardCluster, keys: &[String], json: bool) -> Result<()> {
    let locations: Vec<Location> = keys
        .iter()
        .map(|key| {
            let bucket = cluster.bucket_of(key);
            Location {
                key: key.clone(),
                bucket: bucket.get(),
                schema: bucket.schema_name(),
                shard: cluster.shard_for_bucket(bucket).ok().map(|shard| shard.dsn().redacted()),
            }
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&locations)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Key", "Bucket", "Schema", "Shard"]);

    for location in &locations {
        let shard = match &location.shard {
            Some(dsn) => Cell::new(dsn),
            None => Cell::new("unassigned").fg(Color::Red),
        };
        table.add_row(vec![
            Cell::new(&location.key),
            Cell::new(location.bucket),
            Cell::new(&location.schema),
            shard,
        ]);
    }

    println!("{table}");
    Ok(())
}

pub fn list_shards(cluster: &ShardCluster, json: bool) -> Result<()> {
    let grouped = buckets_by_shard(cluster);

    if json {
        let summaries: Vec<ShardSummary> = grouped
            .iter()
            .map(|(shard, buckets)| ShardSummary {
                shard: shard.dsn().redacted(),
                buckets: buckets.iter().map(|bucket| bucket.get()).collect(),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["#", "Shard", "Buckets", "Count"]);

    for (index, (shard, buckets)) in grouped.iter().enumerate() {
        let count = if buckets.is_empty() {
            Cell::new(0).fg(Color::Yellow)
        } else {
            Cell::new(buckets.len())
        };
        table.add_row(vec![
            Cell::new(index + 1),
            Cell::new(shard.dsn().redacted()),
            Cell::new(compact_ranges(buckets)),
            count,
        ]);
    }

    println!("{table}");
    println!(
        "{} shards, {} buckets",
        cluster.shard_count().to_string().bold(),
        cluster.bucket_count().to_string().bold()
    );
    Ok(())
}

/// Construction already probed every shard, so reaching this point means
/// each one answered.
pub fn ping(cluster: &ShardCluster) {
    for shard in cluster.shards() {
        println!("{} {}", "✓".green(), shard.dsn().redacted());
    }
    println!("{}", format!("All {} shards reachable", cluster.shard_count()).green());
}

pub async fn exec(
    cluster: &ShardCluster,
    cancel: &CancellationToken,
    sql: &str,
    per_shard: bool,
) -> Result<()> {
    let affected = Arc::new(AtomicU64::new(0));

    if per_shard {
        info!(shards = cluster.shard_count(), "Executing statement once per shard");
        cluster
            .for_each_shard(cancel, |cancel, shard| {
                let sql = sql.to_string();
                let affected = Arc::clone(&affected);
                async move {
                    let result = tokio::select! {
                        result = sqlx::query(&sql).execute(shard.pool()) => result?,
                        () = cancel.cancelled() => return Err(anyhow!("cancelled before completion")),
                    };
                    debug!(shard = %shard.dsn(), rows = result.rows_affected(), "Statement done");
                    affected.fetch_add(result.rows_affected(), Ordering::Relaxed);
                    Ok::<(), anyhow::Error>(())
                }
            })
            .await?;
    } else {
        info!(buckets = cluster.bucket_count(), "Executing statement once per bucket");
        cluster
            .for_each_bucket(cancel, |cancel, pool| {
                let sql = sql.to_string();
                let affected = Arc::clone(&affected);
                async move {
                    let result = tokio::select! {
                        result = pool.execute(&sql, PgArguments::default()) => result?,
                        () = cancel.cancelled() => return Err(anyhow!("cancelled before completion")),
                    };
                    debug!(schema = pool.schema(), rows = result.rows_affected(), "Statement done");
                    affected.fetch_add(result.rows_affected(), Ordering::Relaxed);
                    Ok::<(), anyhow::Error>(())
                }
            })
            .await?;
    }

    let targets = if per_shard { cluster.shard_count() } else { cluster.bucket_count() };
    println!(
        "{} {} targets, {} rows affected",
        "✓".green(),
        targets,
        affected.load(Ordering::Relaxed)
    );
    Ok(())
}

fn buckets_by_shard(cluster: &ShardCluster) -> Vec<(Shard<PgPool>, Vec<Bucket>)> {
    let mut grouped: Vec<(Shard<PgPool>, Vec<Bucket>)> =
        cluster.shards().into_iter().map(|shard| (shard, Vec::new())).collect();

    for bucket in cluster.buckets() {
        let Ok(owner) = cluster.shard_for_bucket(bucket) else {
            continue;
        };
        if let Some((_, buckets)) = grouped.iter_mut().find(|(shard, _)| shard.same_pool(owner)) {
            buckets.push(bucket);
        }
    }

    grouped
}

/// Renders ascending buckets as runs, e.g. `1-3, 7, 9-10`.
fn compact_ranges(buckets: &[Bucket]) -> String {
    let mut runs: Vec<(u32, u32)> = Vec::new();
    for bucket in buckets.iter().map(|bucket| bucket.get()) {
        if let Some((_, end)) = runs.last_mut() {
            if end.checked_add(1) == Some(bucket) {
                *end = bucket;
                continue;
            }
        }
        runs.push((bucket, bucket));
    }

    if runs.is_empty() {
        return "-".to_string();
    }

    runs.iter()
        .map(|&(start, end)| if start == end { start.to_string() } else { format!("{start}-{end}") })
        .collect::<Vec<_>>()
        .join(", ")
}
