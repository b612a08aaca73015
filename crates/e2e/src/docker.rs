//! Container restart orchestration
//!
//! A pure external side effect with no contract beyond best effort plus a
//! fixed grace period. The reconnection scenario uses it to force the
//! origin server offline mid-stream; the harness's own correctness
//! guarantees do not depend on what happens inside the container.

use std::time::Duration;

use tokio::process::Command;
use tracing::info;

use crate::error::{E2eError, E2eResult};

/// Pause between stop and start, matching the deployment's restart cadence.
const STOP_GRACE: Duration = Duration::from_secs(2);
/// Wait after start for the service to come back up.
const HEALTH_GRACE: Duration = Duration::from_secs(10);

/// Restart the first running container whose name contains `name_fragment`.
pub async fn restart_container(name_fragment: &str) -> E2eResult<()> {
    let output = Command::new("docker")
        .args(["ps", "--format", "{{.Names}}"])
        .output()
        .await?;
    if !output.status.success() {
        return Err(E2eError::Container(format!(
            "docker ps failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let names = String::from_utf8_lossy(&output.stdout);
    let container = names
        .lines()
        .find(|name| name.contains(name_fragment))
        .ok_or_else(|| {
            E2eError::Container(format!("no running container matching '{name_fragment}'"))
        })?
        .to_string();

    info!(%container, "stopping container");
    docker(&["stop", &container]).await?;
    tokio::time::sleep(STOP_GRACE).await;

    info!(%container, "starting container");
    docker(&["start", &container]).await?;

    info!(%container, grace_secs = HEALTH_GRACE.as_secs(), "waiting for container to be healthy");
    tokio::time::sleep(HEALTH_GRACE).await;

    Ok(())
}

async fn docker(args: &[&str]) -> E2eResult<()> {
    let output = Command::new("docker").args(args).output().await?;
    if !output.status.success() {
        return Err(E2eError::Container(format!(
            "docker {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(())
}
