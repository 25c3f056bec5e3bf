//! Cart CLI commands: list, add, update, remove, clear.
//!
//! Every mutation loads the stored cart, applies the change through
//! [`Cart`] and saves the whole cart back.

use anyhow::{Context, Result};
use comfy_table::{Cell, CellAlignment, Color, ContentArrangement, Table, presets};
use console::style;

use malim_core::cart::{Cart, CartChange, CartRepository};

use super::catalog::{format_price, lookup_error};
use crate::state::AppState;

async fn load_cart(state: &AppState) -> Result<Cart> {
    let items = state.cart_repo.load().await.context("failed to load the cart")?;
    Ok(Cart::from_items(items))
}

async fn save_cart(state: &AppState, cart: &Cart) -> Result<()> {
    state
        .cart_repo
        .save(cart.items())
        .await
        .context("failed to save the cart")
}

/// Print the cart as a table with totals.
pub async fn list_cart(state: &AppState, json: bool) -> Result<()> {
    let cart = load_cart(state).await?;

    if json {
        let out = serde_json::json!({
            "items": cart.items(),
            "total_items": cart.total_items(),
            "total_price": cart.total_price(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if cart.is_empty() {
        println!();
        println!(
            "  {} Your cart is empty. Add something with: {}",
            style("i").blue().bold(),
            style("malim cart add <id> --color <color>").yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("SKU").fg(Color::White),
        Cell::new("Product").fg(Color::White),
        Cell::new("Color").fg(Color::White),
        Cell::new("Size").fg(Color::White),
        Cell::new("Qty").fg(Color::White),
        Cell::new("Subtotal").fg(Color::White),
    ]);

    for item in cart.items() {
        table.add_row(vec![
            Cell::new(&item.variant_sku).fg(Color::DarkGrey),
            Cell::new(&item.name).fg(Color::Cyan),
            Cell::new(&item.color),
            Cell::new(item.size.as_deref().unwrap_or("-")),
            Cell::new(item.quantity).set_alignment(CellAlignment::Right),
            Cell::new(format_price(item.line_total())).set_alignment(CellAlignment::Right),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} item{}  {}  {}",
        style(cart.total_items()).bold(),
        if cart.total_items() == 1 { "" } else { "s" },
        style("Total:").bold(),
        style(format_price(cart.total_price())).green().bold()
    );
    println!();

    Ok(())
}

/// Add a product variant, looking the product up in the catalog.
pub async fn add_to_cart(
    state: &AppState,
    product_id: &str,
    color: &str,
    size: Option<&str>,
    qty: u32,
    json: bool,
) -> Result<()> {
    let mut cache = state.product_cache()?;
    cache.initialize().await;
    cache.unsubscribe();
    let product = cache
        .fetch_by_id(product_id)
        .await
        .map_err(|err| lookup_error(product_id, err))?;

    let line = Cart::line_for(&product, color, size, qty)?;
    let sku = line.variant_sku.clone();

    let mut cart = load_cart(state).await?;
    let change = cart.add(line)?;
    save_cart(state, &cart).await?;
    tracing::info!(variant_sku = %sku, ?change, "cart line added");

    report(&cart, &sku, change, json)
}

pub async fn update_quantity(state: &AppState, sku: &str, qty: u32, json: bool) -> Result<()> {
    let mut cart = load_cart(state).await?;
    let change = cart.update_quantity(sku, qty)?;
    save_cart(state, &cart).await?;

    report(&cart, sku, change, json)
}

pub async fn remove_from_cart(state: &AppState, sku: &str, json: bool) -> Result<()> {
    let mut cart = load_cart(state).await?;
    cart.remove(sku)?;
    save_cart(state, &cart).await?;

    report(&cart, sku, CartChange::Removed, json)
}

pub async fn clear_cart(state: &AppState, json: bool) -> Result<()> {
    state.cart_repo.clear().await.context("failed to clear the cart")?;

    if json {
        println!("{}", serde_json::json!({ "cleared": true }));
        return Ok(());
    }
    println!();
    println!("  {} Cart emptied", style("✓").green().bold());
    println!();
    Ok(())
}

fn report(cart: &Cart, sku: &str, change: CartChange, json: bool) -> Result<()> {
    if json {
        let out = serde_json::json!({
            "sku": sku,
            "quantity": cart.get(sku).map(|i| i.quantity).unwrap_or(0),
            "total_items": cart.total_items(),
            "total_price": cart.total_price(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let message = match change {
        CartChange::Added => format!("Added {}", style(sku).cyan()),
        CartChange::QuantityIncreased { quantity } | CartChange::Updated { quantity } => {
            format!("{} now has quantity {}", style(sku).cyan(), style(quantity).bold())
        }
        CartChange::Removed => format!("Removed {}", style(sku).cyan()),
    };
    println!();
    println!("  {} {message}", style("✓").green().bold());
    println!(
        "  {}",
        style(format!(
            "{} item(s), total {}",
            cart.total_items(),
            format_price(cart.total_price())
        ))
        .dim()
    );
    println!();
    Ok(())
}
