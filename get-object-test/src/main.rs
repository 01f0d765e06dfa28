use std::sync::Arc;

use anyhow::Context;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use clap::Parser;
use data_shield::transform::REDACTED_KEYS;
use data_shield::wiring::object_lambda_access_point_arn;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio::time::Instant;

#[derive(Default)]
struct Stats {
    success_count: usize,
    error_count: usize,
    leak_count: usize,
    total_latency_ms: f64,
}

#[derive(Parser, Debug)]
#[command(name = "get-object-test")]
#[command(about = "Read objects through an S3 Object Lambda access point and check redaction")]
struct Args {
    /// Object Lambda access point ARN, or its name when --account is given
    access_point: String,

    /// Object keys to read (picked at random per request)
    #[arg(long = "key", required = true)]
    keys: Vec<String>,

    /// Account that owns the access point, used to build the ARN from a name
    #[arg(long)]
    account: Option<String>,

    /// Number of iterations to run
    #[arg(long, default_value = "100")]
    iters: usize,

    /// Number of parallel threads
    #[arg(long, default_value = "1")]
    threads: usize,
}

fn resolve_access_point(
    access_point: &str,
    account: Option<&str>,
    region: Option<&str>,
) -> anyhow::Result<String> {
    if access_point.starts_with("arn:") {
        return Ok(access_point.to_string());
    }
    let account = account.context("--account is required when passing an access point name")?;
    let region = region.context("no AWS region configured")?;
    Ok(object_lambda_access_point_arn(region, account, access_point))
}

/// Returns the redacted keys that made it through the transformation.
fn leaked_keys(body: &[u8]) -> anyhow::Result<Vec<&'static str>> {
    let object: Map<String, Value> =
        serde_json::from_slice(body).context("response body is not a JSON object")?;
    Ok(REDACTED_KEYS
        .iter()
        .copied()
        .filter(|key| object.contains_key(*key))
        .collect())
}

async fn get_object(client: &Client, access_point_arn: &str, key: &str) -> anyhow::Result<Vec<u8>> {
    let response = client
        .get_object()
        .bucket(access_point_arn)
        .key(key)
        .send()
        .await
        .with_context(|| format!("GetObject {key} failed"))?;

    let body = response
        .body
        .collect()
        .await
        .context("failed to read response body")?;
    Ok(body.into_bytes().to_vec())
}

async fn run_requests(
    client: Arc<Client>,
    access_point_arn: Arc<String>,
    keys: Arc<Vec<String>>,
    thread_id: usize,
    start: usize,
    end: usize,
    total: usize,
    stats: Arc<Mutex<Stats>>,
) {
    let mut rng = StdRng::from_entropy();

    for i in start..=end {
        let Some(key) = keys.choose(&mut rng) else {
            return;
        };

        let started = Instant::now();
        let result = get_object(&client, &access_point_arn, key)
            .await
            .and_then(|body| leaked_keys(&body).map(|leaked| (body.len(), leaked)));
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

        match result {
            Ok((size, leaked)) => {
                {
                    let mut stats = stats.lock().await;
                    stats.success_count += 1;
                    stats.total_latency_ms += latency_ms;
                    if !leaked.is_empty() {
                        stats.leak_count += 1;
                    }
                }

                if leaked.is_empty() {
                    println!(
                        "[Thread {}: {}/{}] {} => {} bytes in {:.3}ms",
                        thread_id, i, total, key, size, latency_ms
                    );
                } else {
                    println!(
                        "[Thread {}: {}/{}] {} => LEAKED {:?}",
                        thread_id, i, total, key, leaked
                    );
                }
            }
            Err(e) => {
                {
                    let mut stats = stats.lock().await;
                    stats.error_count += 1;
                }

                eprintln!(
                    "[Thread {}: {}/{}] Error reading {}: {:#}",
                    thread_id, i, total, key, e
                );
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    anyhow::ensure!(args.threads > 0, "--threads must be at least 1");

    let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let access_point_arn = resolve_access_point(
        &args.access_point,
        args.account.as_deref(),
        config.region().map(|r| r.as_ref()),
    )?;

    println!(
        "Running {} GetObject requests against {} across {} thread(s)",
        args.iters, access_point_arn, args.threads
    );

    let client = Arc::new(Client::new(&config));
    let access_point_arn = Arc::new(access_point_arn);
    let keys = Arc::new(args.keys);
    let stats = Arc::new(Mutex::new(Stats::default()));

    let iters_per_thread = args.iters / args.threads;
    let remainder = args.iters % args.threads;

    let mut tasks = JoinSet::new();

    let mut start = 1;
    for t in 1..=args.threads {
        let count = if t == args.threads {
            iters_per_thread + remainder
        } else {
            iters_per_thread
        };
        if count == 0 {
            continue;
        }
        let end = start + count - 1;

        let client = Arc::clone(&client);
        let access_point_arn = Arc::clone(&access_point_arn);
        let keys = Arc::clone(&keys);
        let stats = Arc::clone(&stats);
        let total = args.iters;

        tasks.spawn(async move {
            run_requests(client, access_point_arn, keys, t, start, end, total, stats).await;
        });

        start = end + 1;
    }

    while let Some(result) = tasks.join_next().await {
        if let Err(e) = result {
            eprintln!("Task failed: {}", e);
        }
    }

    let stats = stats.lock().await;
    println!("Completed {} requests", args.iters);
    println!();
    println!("Results:");
    println!("  Success: {}", stats.success_count);
    println!("  Errors:  {}", stats.error_count);
    println!("  Leaks:   {}", stats.leak_count);
    if stats.success_count > 0 {
        let avg_latency = stats.total_latency_ms / stats.success_count as f64;
        println!("  Avg latency: {:.3}ms", avg_latency);
    }

    anyhow::ensure!(stats.leak_count == 0, "redacted keys were returned to the caller");
    Ok(())
}
