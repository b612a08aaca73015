//! Raw binary frame census
//!
//! Consumes the low-level binary stream directly, decodes only the CBOR
//! header of each frame, and reports how many frames of each type were
//! seen. Useful against server implementations whose payloads this tooling
//! cannot (and does not need to) interpret. Malformed frames are logged
//! and skipped.

use std::collections::BTreeMap;
use std::time::Duration;

use clap::Args;
use colored::Colorize;
use futures_util::StreamExt;
use tokio::time::Instant;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::Message;
use tracing::debug;

use skywatch_stream::frame;

#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Subscribe URL of the binary stream
    #[arg(long)]
    pub url: String,

    /// Stop after this many decodable frames
    #[arg(long, default_value = "100")]
    pub limit: usize,

    /// Give up after this many seconds
    #[arg(long, default_value = "30")]
    pub timeout_secs: u64,
}

pub async fn execute(args: ProbeArgs) -> anyhow::Result<bool> {
    println!("Connecting to {}...", args.url.cyan());
    let (mut socket, _response) = connect_async(args.url.as_str()).await?;
    println!("{} Connected", "✓".green());

    let deadline = Instant::now() + Duration::from_secs(args.timeout_secs);
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut seen = 0usize;

    let complete = loop {
        let frame = tokio::select! {
            frame = socket.next() => frame,
            _ = tokio::time::sleep_until(deadline) => {
                println!("{}", "Timeout reached".yellow());
                break false;
            }
        };

        match frame {
            Some(Ok(Message::Binary(bytes))) => match frame::decode_header(&bytes) {
                Ok(header) => {
                    seen += 1;
                    *counts.entry(header.label().to_string()).or_insert(0) += 1;
                    println!("Frame {}: {}", seen, header.label());
                    if seen >= args.limit {
                        break true;
                    }
                }
                Err(e) => debug!(error = %e, "skipping undecodable frame"),
            },
            Some(Ok(Message::Close(_))) | None => {
                println!("{}", "Connection closed".yellow());
                break false;
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                println!("{} Transport error: {e}", "✗".red());
                break false;
            }
        }
    };

    let _ = socket.close(None).await;

    println!("\n=== Frame Type Summary ({seen} frames) ===");
    for (label, count) in &counts {
        println!("{label}: {count}");
    }

    Ok(complete)
}
