//! Activity console CLI - migrations and admin bootstrap.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! console-cli migrate
//!
//! # Create the first super admin
//! console-cli admin create -e dean@uni.ac.th -n "Dean" -r super_admin
//!
//! # Invite an admin for one department
//! console-cli admin invite -e staff@uni.ac.th -r viewer -d science --days 7
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use activity_console_core::{AdminDepartment, AdminRole};

mod commands;

#[derive(Parser)]
#[command(name = "console-cli")]
#[command(author, version, about = "Activity console CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage admin users
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new admin user directly
    Create {
        /// Admin email address
        #[arg(short, long)]
        email: String,

        /// Admin display name
        #[arg(short, long)]
        name: String,

        /// Admin role (`viewer`, `moderator`, `department_admin`, `super_admin`)
        #[arg(short, long, default_value = "super_admin")]
        role: AdminRole,

        /// Department key, Thai label or English name (ignored for `super_admin`)
        #[arg(short, long)]
        department: Option<AdminDepartment>,
    },
    /// Invite a new admin and print the accept link
    Invite {
        /// Email address to invite
        #[arg(short, long)]
        email: String,

        /// Admin role (`viewer`, `moderator`, `department_admin`, `super_admin`)
        #[arg(short, long)]
        role: AdminRole,

        /// Department key, Thai label or English name (ignored for `super_admin`)
        #[arg(short, long)]
        department: Option<AdminDepartment>,

        /// Days until the invite expires
        #[arg(long, default_value_t = 7)]
        days: i64,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::Create {
                email,
                name,
                role,
                department,
            } => {
                commands::admin::create_user(&email, &name, role, department).await?;
            }
            AdminAction::Invite {
                email,
                role,
                department,
                days,
            } => {
                commands::admin::create_invite(&email, role, department, days).await?;
            }
        },
    }
    Ok(())
}
