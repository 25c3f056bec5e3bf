//! Malim storefront CLI entry point.
//!
//! Binary name: `malim`
//!
//! Parses CLI arguments, initializes tracing, the data directory and the
//! local database, then dispatches to the appropriate command handler.

mod cli;
mod state;

use clap::Parser;
use clap_complete::generate;

use cli::{CartCommand, CatalogCommand, Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up tracing based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,malim=debug",
        _ => "trace",
    };
    malim_observe::tracing_setup::init_tracing(filter, cli.otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "malim", &mut std::io::stdout());
        return Ok(());
    }

    let state = AppState::init().await?;

    let result = run(&state, cli).await;
    malim_observe::tracing_setup::shutdown_tracing();
    result
}

async fn run(state: &AppState, cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Catalog { action } => match action {
            CatalogCommand::List {
                category,
                search,
                offers,
                sort,
            } => {
                cli::catalog::list_products(state, category, search, offers, &sort, cli.json).await?;
            }
            CatalogCommand::Show { id } => {
                cli::catalog::show_product(state, &id, cli.json).await?;
            }
            CatalogCommand::Refresh => {
                cli::catalog::refresh_catalog(state, cli.json).await?;
            }
            CatalogCommand::Clear => {
                cli::catalog::clear_snapshot(state, cli.json).await?;
            }
        },

        Commands::Cart { action } => match action {
            CartCommand::List => cli::cart::list_cart(state, cli.json).await?,
            CartCommand::Add {
                product_id,
                color,
                size,
                qty,
            } => {
                cli::cart::add_to_cart(state, &product_id, &color, size.as_deref(), qty, cli.json)
                    .await?;
            }
            CartCommand::Update { sku, qty } => {
                cli::cart::update_quantity(state, &sku, qty, cli.json).await?;
            }
            CartCommand::Remove { sku } => cli::cart::remove_from_cart(state, &sku, cli.json).await?,
            CartCommand::Clear => cli::cart::clear_cart(state, cli.json).await?,
        },

        Commands::Chat => {
            cli::chat::loop_runner::run_chat_loop(state).await?;
        }

        Commands::Config => {
            cli::status::show_config(state, cli.json)?;
        }

        Commands::Status => {
            cli::status::status(state, cli.json).await?;
        }

        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}
