//! Odoo bridge CLI - Operator tools for the credit bridge.
//!
//! # Usage
//!
//! ```bash
//! # Verify the configured Odoo service account can log in
//! odoo-bridge auth
//!
//! # Run a credit check without going through HTTP
//! odoo-bridge check-credit -e ext-42 -c 900 -i 150.00
//! ```
//!
//! # Commands
//!
//! - `auth` - Authenticate against Odoo
//! - `check-credit` - Run a credit check and print the decision as JSON
//!
//! Both commands read the same environment as the server.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "odoo-bridge")]
#[command(author, version, about = "Odoo credit bridge CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Authenticate against Odoo with the configured service account
    Auth,
    /// Run a credit check for a customer
    CheckCredit {
        /// Storefront customer id
        #[arg(short, long)]
        external_id: String,

        /// Odoo partner id the customer claims
        #[arg(short, long)]
        company: String,

        /// Requested amount
        #[arg(short, long)]
        importe: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Auth => commands::auth::run().await?,
        Commands::CheckCredit {
            external_id,
            company,
            importe,
        } => commands::check_credit::run(&external_id, &company, &importe).await?,
    }
    Ok(())
}
