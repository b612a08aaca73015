//! Inspect one commit by sequence number

use std::time::Duration;

use clap::Args;
use colored::Colorize;

use skywatch_client::Deployment;
use skywatch_stream::{Collector, CollectorConfig};

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Sequence number to wait for
    #[arg(long)]
    pub seq: u64,

    /// Inspect the relay's stream instead of the origin server
    #[arg(long)]
    pub relay: bool,

    /// Give up after this many seconds
    #[arg(long, default_value = "5")]
    pub timeout_secs: u64,
}

pub async fn execute(args: InspectArgs, deployment: &Deployment) -> anyhow::Result<bool> {
    let endpoint = if args.relay {
        deployment.relay_subscribe_url()
    } else {
        deployment.pds_subscribe_url()
    };

    // replay from just before the requested sequence number
    let collector = Collector::new(
        CollectorConfig::new(endpoint.as_str())
            .cursor(args.seq.saturating_sub(1))
            .connect_timeout(Duration::from_secs(args.timeout_secs)),
    );
    collector.start().await?;

    let seq = args.seq;
    let found = collector
        .buffer()
        .wait_for(Duration::from_secs(args.timeout_secs), |e| e.seq() == seq)
        .await;

    let result = if found {
        let matches = collector.buffer().filter(|e| e.seq() == seq);
        match matches.first().and_then(|e| e.as_commit()) {
            Some(commit) => {
                println!("\n=== Seq {} Event Details ===", seq);
                println!("Repo: {}", commit.did);
                println!("Rev: {}", commit.rev);
                println!("Ops: {}", serde_json::to_string_pretty(&commit.ops)?);
                println!("Since: {:?}", commit.since);
                println!("Prev: {:?}", commit.prev);
                true
            }
            None => {
                println!("{} Seq {} is not a commit event", "⚠".yellow(), seq);
                false
            }
        }
    } else {
        println!("{} Timeout waiting for seq {}", "✗".red(), seq);
        false
    };

    collector.stop().await;
    Ok(result)
}
