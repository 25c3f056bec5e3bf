//! Catalog CLI commands: list, show, refresh, clear.

use std::time::Duration;

use anyhow::{Context, Result};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use malim_core::catalog::{CatalogQuery, CatalogSort};
use malim_types::catalog::{Product, StockStatus};
use malim_types::error::CatalogError;

use crate::state::{AppState, ConcreteProductCache};

/// How long a cold start waits for the first catalog delivery.
const FIRST_SYNC_TIMEOUT: Duration = Duration::from_secs(30);

/// List published products, optionally filtered and sorted.
///
/// # Examples
///
/// ```bash
/// malim catalog list --category vestidos --sort price-asc
/// malim catalog list --search rojo --offers
/// ```
pub async fn list_products(
    state: &AppState,
    category: Option<String>,
    search: Option<String>,
    offers: bool,
    sort: &str,
    json: bool,
) -> Result<()> {
    let sort: CatalogSort = sort.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    let query = CatalogQuery {
        search,
        category,
        offers_only: offers,
        sort,
    };

    let mut cache = state.product_cache()?;
    load_catalog(&mut cache).await?;
    let products = query.apply(cache.products());

    if json {
        println!("{}", serde_json::to_string_pretty(&products)?);
        return Ok(());
    }

    if products.is_empty() {
        println!();
        println!("  {} No products match.", style("i").blue().bold());
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("ID").fg(Color::White),
        Cell::new("Name").fg(Color::White),
        Cell::new("Category").fg(Color::White),
        Cell::new("Price").fg(Color::White),
        Cell::new("Colors").fg(Color::White),
        Cell::new("Stock").fg(Color::White),
    ]);

    for product in &products {
        table.add_row(vec![
            Cell::new(&product.id).fg(Color::DarkGrey),
            Cell::new(&product.name).fg(Color::Cyan),
            Cell::new(&product.category),
            price_cell(product),
            Cell::new(product.color_names().join(", ")),
            stock_cell(StockStatus::from_stock(product.total_stock())),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} product{}",
        style(products.len()).bold(),
        if products.len() == 1 { "" } else { "s" }
    );
    print_sync_footer(&cache);
    println!();

    Ok(())
}

/// Show one product with its variants and per-size stock.
pub async fn show_product(state: &AppState, id: &str, json: bool) -> Result<()> {
    let mut cache = state.product_cache()?;
    // Snapshot only: a missing entry falls through to a single point read.
    cache.initialize().await;
    cache.unsubscribe();

    let product = cache
        .fetch_by_id(id)
        .await
        .map_err(|err| lookup_error(id, err))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&product)?);
        return Ok(());
    }

    println!();
    println!("  {}", style(&product.name).cyan().bold());
    println!();
    println!("  {}  {}", style("ID:").bold(), style(&product.id).dim());
    println!("  {}  {}", style("Category:").bold(), product.category);
    if product.has_offer() {
        println!(
            "  {}  {} {} ({}% off)",
            style("Price:").bold(),
            style(format_price(product.discounted_price())).green().bold(),
            style(format_price(product.public_price)).dim(),
            product.offer_percentage
        );
    } else {
        println!(
            "  {}  {}",
            style("Price:").bold(),
            style(format_price(product.public_price)).bold()
        );
    }
    if let Some(details) = &product.short_details {
        println!();
        println!("  {details}");
    }
    println!();

    for variant in &product.variants {
        println!(
            "  {} {} {}",
            style("●").bold(),
            style(&variant.color_name).bold(),
            style(&variant.hex_color).dim()
        );
        if variant.sizes.is_empty() {
            println!("      {}", style("one size").dim());
        }
        for size in &variant.sizes {
            let status = StockStatus::from_stock(size.stock);
            println!(
                "      {:<6} {}  {}",
                size.size,
                styled_stock(status),
                style(&size.variant_sku).dim()
            );
        }
    }
    println!();

    Ok(())
}

/// Reload the full published collection, bypassing the snapshot.
pub async fn refresh_catalog(state: &AppState, json: bool) -> Result<()> {
    let mut cache = state.product_cache()?;

    let spinner = spinner("Refreshing catalog...");
    let result = cache.refresh().await;
    spinner.finish_and_clear();
    let count = result.context("catalog refresh failed")?;

    if json {
        let out = serde_json::json!({
            "products": count,
            "synced_at": cache.state().last_synced_at(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Catalog refreshed: {} published product{}",
        style("✓").green().bold(),
        style(count).bold(),
        if count == 1 { "" } else { "s" }
    );
    println!();
    Ok(())
}

/// Remove the persisted snapshot; the next start waits for a full sync.
pub async fn clear_snapshot(state: &AppState, json: bool) -> Result<()> {
    state.snapshots.clear().await?;

    if json {
        println!("{}", serde_json::json!({ "cleared": true }));
        return Ok(());
    }
    println!();
    println!("  {} Catalog snapshot removed", style("✓").green().bold());
    println!();
    Ok(())
}

/// Hydrate the cache and make sure it holds a collection to show.
///
/// A fresh snapshot is used as is. A cold start waits for the first live
/// delivery. The subscription is closed afterwards either way.
pub async fn load_catalog(cache: &mut ConcreteProductCache) -> Result<()> {
    cache.initialize().await;

    if cache.state().is_empty() {
        let spinner = spinner("Loading catalog...");
        let waited = tokio::time::timeout(FIRST_SYNC_TIMEOUT, cache.wait_for_update()).await;
        spinner.finish_and_clear();
        if waited.is_err() {
            tracing::warn!(timeout_secs = FIRST_SYNC_TIMEOUT.as_secs(), "no catalog delivery before timeout");
        }
    } else {
        cache.sync_pending().await;
    }
    cache.unsubscribe();

    if cache.state().is_empty() {
        if let Some(err) = cache.state().error() {
            anyhow::bail!("could not load the catalog: {err}");
        }
    }
    Ok(())
}

pub fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

pub fn format_price(amount: f64) -> String {
    format!("${amount:.2}")
}

fn price_cell(product: &Product) -> Cell {
    if product.has_offer() {
        Cell::new(format!(
            "{} (-{}%)",
            format_price(product.discounted_price()),
            product.offer_percentage
        ))
        .fg(Color::Green)
    } else {
        Cell::new(format_price(product.public_price))
    }
}

fn stock_cell(status: StockStatus) -> Cell {
    let color = match status {
        StockStatus::InStock => Color::Green,
        StockStatus::Low(_) => Color::Yellow,
        StockStatus::OutOfStock => Color::DarkGrey,
    };
    Cell::new(status.label()).fg(color)
}

fn styled_stock(status: StockStatus) -> console::StyledObject<String> {
    let label = status.label();
    match status {
        StockStatus::InStock => style(label).green(),
        StockStatus::Low(_) => style(label).yellow(),
        StockStatus::OutOfStock => style(label).dim(),
    }
}

fn print_sync_footer(cache: &ConcreteProductCache) {
    let state = cache.state();
    if let Some(err) = state.error() {
        println!("  {} {}", style("!").yellow().bold(), style(err).yellow());
    }
    if let Some(synced) = state.last_synced_at() {
        println!(
            "  {}",
            style(format!("synced {}", synced.format("%Y-%m-%d %H:%M UTC"))).dim()
        );
    }
}

/// Turn a failed product lookup into a user-facing error.
///
/// Missing, unpublished and undecodable products read as "not available";
/// anything else means the catalog itself could not be reached.
pub(crate) fn lookup_error(id: &str, err: CatalogError) -> anyhow::Error {
    if err.is_missing() {
        anyhow::anyhow!("product '{id}' is not available")
    } else {
        anyhow::Error::new(err).context(format!("could not look up product '{id}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(600.0), "$600.00");
        assert_eq!(format_price(449.5), "$449.50");
    }

    #[test]
    fn test_lookup_error_missing_product() {
        let err = lookup_error("P1", CatalogError::NotAvailable("P1".into()));
        assert_eq!(err.to_string(), "product 'P1' is not available");
        assert!(err.downcast_ref::<CatalogError>().is_none());
    }

    #[test]
    fn test_lookup_error_unreachable_catalog() {
        let err = lookup_error("P1", CatalogError::SyncFailure("offline".into()));
        assert_eq!(err.to_string(), "could not look up product 'P1'");
        assert_eq!(
            err.downcast_ref::<CatalogError>(),
            Some(&CatalogError::SyncFailure("offline".into()))
        );
    }
}
