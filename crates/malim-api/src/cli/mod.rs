//! CLI command definitions and dispatch for the `malim` binary.
//!
//! Uses clap derive macros for argument parsing. Commands are grouped by
//! noun (e.g., `malim catalog list`, `malim cart add`).

pub mod cart;
pub mod catalog;
pub mod chat;
pub mod status;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Browse the Malim boutique, manage your cart and talk to Mia, the style assistant.
#[derive(Parser)]
#[command(name = "malim", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export tracing spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true, env = "MALIM_OTEL")]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Browse the published catalog.
    Catalog {
        #[command(subcommand)]
        action: CatalogCommand,
    },

    /// Manage the shopping cart.
    Cart {
        #[command(subcommand)]
        action: CartCommand,
    },

    /// Chat with the style assistant.
    Chat,

    /// Show the effective configuration.
    Config,

    /// Storefront status dashboard.
    Status,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum CatalogCommand {
    /// List published products.
    #[command(alias = "ls")]
    List {
        /// Only products in this category.
        #[arg(short, long)]
        category: Option<String>,

        /// Search name, category and description.
        #[arg(short, long)]
        search: Option<String>,

        /// Only products with an active offer.
        #[arg(long)]
        offers: bool,

        /// Sort order: newest, price-asc, price-desc, name.
        #[arg(long, default_value = "newest")]
        sort: String,
    },

    /// Show details of a product.
    Show {
        /// Product id.
        id: String,
    },

    /// Reload the whole catalog and update the local snapshot.
    Refresh,

    /// Discard the local catalog snapshot.
    Clear,
}

#[derive(Subcommand)]
pub enum CartCommand {
    /// List cart items.
    #[command(alias = "ls")]
    List,

    /// Add a product variant to the cart.
    Add {
        /// Product id.
        product_id: String,

        /// Color name of the variant.
        #[arg(long)]
        color: String,

        /// Size, required when the variant has sizes.
        #[arg(long)]
        size: Option<String>,

        /// Quantity to add.
        #[arg(long, default_value = "1")]
        qty: u32,
    },

    /// Set the quantity of a cart line (0 removes it).
    Update {
        /// Variant SKU of the line.
        sku: String,

        /// New quantity.
        qty: u32,
    },

    /// Remove a line from the cart.
    #[command(alias = "rm")]
    Remove {
        /// Variant SKU of the line.
        sku: String,
    },

    /// Empty the cart.
    Clear,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        <Cli as clap::CommandFactory>::command().debug_assert();
    }

    #[test]
    fn parses_cart_add() {
        let cli = Cli::try_parse_from([
            "malim", "cart", "add", "MAL-VES-ROJ-001", "--color", "Rojo", "--size", "M", "--qty", "2",
        ])
        .unwrap();
        match cli.command {
            Commands::Cart {
                action:
                    CartCommand::Add {
                        product_id,
                        color,
                        size,
                        qty,
                    },
            } => {
                assert_eq!(product_id, "MAL-VES-ROJ-001");
                assert_eq!(color, "Rojo");
                assert_eq!(size.as_deref(), Some("M"));
                assert_eq!(qty, 2);
            }
            _ => panic!("expected cart add"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["malim", "catalog", "list", "--offers", "--json", "-vv"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(
            cli.command,
            Commands::Catalog {
                action: CatalogCommand::List { offers: true, .. }
            }
        ));
    }
}
