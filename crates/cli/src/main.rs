//! Bazaar CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront migrations (schema + session table)
//! bz-cli migrate
//!
//! # Create a manager account
//! bz-cli user create -u alice -e alice@example.com -p 'long password' -r manager
//!
//! # Change an existing account's role
//! bz-cli user role alice admin
//!
//! # File uncategorized products by keyword
//! bz-cli categories assign
//!
//! # Print products with their categories
//! bz-cli categories debug
//!
//! # Empty the media directory and recreate its layout
//! bz-cli media clean
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "bz-cli")]
#[command(author, version, about = "Bazaar CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Manage user accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Category maintenance
    Categories {
        #[command(subcommand)]
        action: CategoriesAction,
    },
    /// Uploaded media maintenance
    Media {
        #[command(subcommand)]
        action: MediaAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new account
    Create {
        /// Login name
        #[arg(short, long)]
        username: String,

        /// Contact email
        #[arg(short, long)]
        email: String,

        /// Password (at least 8 characters)
        #[arg(short, long, env = "BAZAAR_USER_PASSWORD", hide_env_values = true)]
        password: String,

        /// Role (`user`, `manager`, `admin`)
        #[arg(short, long, default_value = "user")]
        role: String,
    },
    /// Change the role of an existing account
    Role {
        /// Login name
        username: String,

        /// New role (`user`, `manager`, `admin`)
        role: String,
    },
}

#[derive(Subcommand)]
enum CategoriesAction {
    /// Assign categories to uncategorized products by name keywords
    Assign,
    /// Print every product with its category, and all categories
    Debug,
}

#[derive(Subcommand)]
enum MediaAction {
    /// Delete all uploads and recreate the directory layout
    Clean {
        /// Media root (defaults to `STOREFRONT_MEDIA_ROOT` or `media`)
        #[arg(long)]
        root: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::User { action } => match action {
            UserAction::Create {
                username,
                email,
                password,
                role,
            } => {
                commands::user::create(&username, &email, &password, &role).await?;
            }
            UserAction::Role { username, role } => {
                commands::user::set_role(&username, &role).await?;
            }
        },
        Commands::Categories { action } => match action {
            CategoriesAction::Assign => commands::categories::assign().await?,
            CategoriesAction::Debug => commands::categories::debug().await?,
        },
        Commands::Media { action } => match action {
            MediaAction::Clean { root } => commands::media::clean(root).await?,
        },
    }
    Ok(())
}
