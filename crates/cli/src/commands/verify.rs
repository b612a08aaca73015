//! Verify that commit events flow from a subscribe endpoint
//!
//! Connects a collector, prints each commit as it arrives, and succeeds
//! once the expected number of commit events has been observed. An empty
//! ops array on a commit is the exact regression this command exists to
//! catch, so it is called out loudly.

use std::time::Duration;

use clap::Args;
use colored::Colorize;
use tokio::time::Instant;

use skywatch_client::Deployment;
use skywatch_stream::{Collector, CollectorConfig, StreamEvent};

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Verify the relay's merged stream instead of the origin server
    #[arg(long)]
    pub relay: bool,

    /// Explicit subscribe URL, overriding deployment selection
    #[arg(long)]
    pub url: Option<String>,

    /// Number of commit events that proves the stream is live
    #[arg(long, default_value = "6")]
    pub expect: usize,

    /// Resume cursor
    #[arg(long, default_value = "0")]
    pub cursor: u64,

    /// Give up after this many seconds
    #[arg(long, default_value = "10")]
    pub timeout_secs: u64,
}

pub async fn execute(args: VerifyArgs, deployment: &Deployment) -> anyhow::Result<bool> {
    let endpoint = args.url.clone().unwrap_or_else(|| {
        if args.relay {
            deployment.relay_subscribe_url()
        } else {
            deployment.pds_subscribe_url()
        }
    });
    let label = if args.relay { "relay" } else { "origin" };

    println!("Connecting to {} stream at {}...", label, endpoint.cyan());

    let collector = Collector::new(
        CollectorConfig::new(endpoint.as_str())
            .cursor(args.cursor)
            .connect_timeout(Duration::from_secs(args.timeout_secs)),
    );
    collector.start().await?;

    let deadline = Instant::now() + Duration::from_secs(args.timeout_secs);
    let mut printed = 0usize;
    let mut commits = 0usize;

    let verified = loop {
        let snapshot = collector.buffer().snapshot();
        for event in &snapshot[printed..] {
            if let StreamEvent::Commit(commit) = event {
                commits += 1;
                println!("\n=== Event {} (seq {}) ===", commits, commit.seq);
                println!("Repo: {}", commit.did);
                println!("Rev: {}", commit.rev);
                println!("Ops count: {}", commit.ops.len());
                if commit.ops.is_empty() {
                    println!("{}", "WARNING: ops array is EMPTY!".yellow());
                } else {
                    println!("Ops: {}", serde_json::to_string_pretty(&commit.ops)?);
                }
            }
        }
        printed = snapshot.len();

        if commits >= args.expect {
            break true;
        }
        if Instant::now() >= deadline || collector.ensure_live().is_err() {
            break false;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    };

    collector.stop().await;

    if verified {
        println!("\n{} Verified {} {} events.", "✓".green(), commits, label);
    } else {
        println!(
            "\n{} Timeout reached. Saw {} {} events (expected {}).",
            "✗".red(),
            commits,
            label,
            args.expect
        );
    }
    Ok(verified)
}
