//! Status command - show usage of a running heap server.

use anyhow::{Context, Result, bail};
use rheap_core::HeapStats;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct StatusResponse {
    uptime_seconds: u64,
    heap: HeapStats,
}

/// Run the status command.
pub async fn run(host: &str, port: u16) -> Result<()> {
    let url = format!("http://{}:{}/api/v1/status", host, port);
    tracing::debug!(url = %url, "Querying server status");

    let response = reqwest::get(&url)
        .await
        .with_context(|| format!("Failed to reach rheap server at {}:{}", host, port))?;

    if !response.status().is_success() {
        bail!("Server returned {}", response.status());
    }

    let status: StatusResponse = response
        .json()
        .await
        .context("Unexpected status response")?;

    print!("{}", render(&status));
    Ok(())
}

fn render(status: &StatusResponse) -> String {
    let heap = &status.heap;
    let mut out = String::new();
    out.push_str("rheap server status\n");
    out.push_str("===================\n\n");
    out.push_str(&format!("Uptime:         {}s\n", status.uptime_seconds));
    out.push_str(&format!("Arena:          {} bytes\n", heap.total_size));
    out.push_str(&format!(
        "Used:           {} bytes in {} blocks\n",
        heap.used_bytes, heap.used_blocks
    ));
    out.push_str(&format!(
        "Free:           {} bytes ({} gap, {:.1}% fragmented)\n",
        heap.free_bytes, heap.gap_bytes, heap.fragmentation_percentage
    ));
    out.push_str(&format!("High water:     {}\n", heap.high_water));
    out.push_str(&format!("Pending sweep:  {}\n", heap.pending_sweep));
    out.push_str(&format!("Compactions:    {}\n", heap.compactions));
    out
}
