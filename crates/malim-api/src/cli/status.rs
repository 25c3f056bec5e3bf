//! Storefront status dashboard and effective configuration.

use anyhow::Result;
use console::style;

use malim_core::cart::{Cart, CartRepository};
use malim_core::catalog::SnapshotStore;

use super::catalog::format_price;
use crate::state::AppState;

/// Display the status dashboard.
///
/// Shows the local snapshot, the cart and where things are stored. Only
/// local state is read; nothing here touches the network.
pub async fn status(state: &AppState, json: bool) -> Result<()> {
    let snapshot = state.snapshots.load_snapshot().await.unwrap_or_else(|err| {
        tracing::warn!(error = %err, "failed to read catalog snapshot");
        None
    });
    let cart = Cart::from_items(state.cart_repo.load().await.unwrap_or_default());
    let ttl = state.config.catalog.snapshot_ttl();
    let fresh = snapshot
        .as_ref()
        .map(|s| s.is_fresh(chrono::Utc::now(), ttl))
        .unwrap_or(false);

    if json {
        let status = serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "data_dir": state.data_dir.display().to_string(),
            "snapshot": snapshot.as_ref().map(|s| serde_json::json!({
                "taken_at": s.timestamp,
                "products": s.products.len(),
                "fresh": fresh,
            })),
            "cart": {
                "lines": cart.items().len(),
                "total_items": cart.total_items(),
                "total_price": cart.total_price(),
            },
            "assistant_endpoint": state.config.assistant.endpoint,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Malim v{}",
        style("✿").magenta().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!();

    println!("  {}", style("── Catalog ──").dim());
    match &snapshot {
        Some(s) => {
            println!("  Snapshot: {} products", style(s.products.len()).bold());
            println!(
                "  Taken:    {} {}",
                s.timestamp.format("%Y-%m-%d %H:%M UTC"),
                if fresh {
                    style("(fresh)").green()
                } else {
                    style("(expired)").yellow()
                }
            );
        }
        None => println!("  Snapshot: {}", style("none").dim()),
    }
    println!();

    println!("  {}", style("── Cart ──").dim());
    println!("  Items: {}", style(cart.total_items()).bold());
    if !cart.is_empty() {
        println!("  Total: {}", style(format_price(cart.total_price())).green());
    }
    println!();

    println!("  {}", style("── System ──").dim());
    println!("  Data dir:  {}", style(state.data_dir.display()).dim());
    println!("  Database:  {}", style("SQLite (WAL mode)").dim());
    println!("  Assistant: {}", style(&state.config.assistant.endpoint).dim());
    println!();

    Ok(())
}

/// Print the effective configuration. API keys are masked.
pub fn show_config(state: &AppState, json: bool) -> Result<()> {
    let mut config = state.config.clone();
    if config.firestore.api_key.is_some() {
        config.firestore.api_key = Some(mask());
    }
    if !config.auth.api_key.is_empty() {
        config.auth.api_key = mask();
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        println!(
            "{}",
            style(format!("# {}", state.data_dir.join("config.toml").display())).dim()
        );
        print!("{}", toml::to_string_pretty(&config)?);
    }
    Ok(())
}

fn mask() -> String {
    "********".to_string()
}
