//! CLI module for Roster
//!
//! Provides commands:
//! - `migrate`, `doctor`: schema setup and diagnostics
//! - `bootstrap-admin`, `token`: out-of-band operator access
//! - `sign-up`, `sign-in`: account entry
//! - `points`, `users`: ledger and roster operations as the user behind `--token`
//!
//! Every service call prints its reply envelope as JSON on stdout.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use roster_core::{Reply, Role, SignUp, Store};

use crate::app::{App, AppConfig};

pub mod doctor;
pub mod points;
pub mod users;

/// Roster CLI
#[derive(Parser, Debug)]
#[command(name = "roster")]
#[command(about = "Unit roster and merit/demerit points ledger")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Session token of the acting user
#[derive(Args, Debug, Clone)]
pub struct TokenArg {
    /// Session token (from `sign-in` or `token`)
    #[arg(long, env = "ROSTER_TOKEN", hide_env_values = true, global = true)]
    pub token: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create or upgrade the database schema
    Migrate,
    /// Print the resolved configuration and check the database
    Doctor,
    /// Grant Admin to an existing user and verify them
    BootstrapAdmin {
        /// Service number
        sn: String,
    },
    /// Issue a session token for an existing user
    Token {
        /// Service number
        sn: String,
    },
    /// Register a new user (pending review)
    SignUp {
        /// Service number (YY-NNNNN or YY-NNNNNNNN)
        sn: String,
        /// Display name
        name: String,
        /// enlisted or cadre
        role: Role,
        #[arg(long, env = "ROSTER_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Authenticate and print a session token
    SignIn {
        /// Service number
        sn: String,
        #[arg(long, env = "ROSTER_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Merit/demerit ledger
    Points {
        #[command(flatten)]
        auth: TokenArg,
        #[command(subcommand)]
        command: points::PointsCommand,
    },
    /// User administration
    Users {
        #[command(flatten)]
        auth: TokenArg,
        #[command(subcommand)]
        command: users::UsersCommand,
    },
}

/// Run the CLI command
pub async fn run(cli: Cli, config: AppConfig) -> anyhow::Result<()> {
    let Some(command) = cli.command else {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        cmd.print_help()?;
        println!();
        return Ok(());
    };

    if let Commands::Doctor = command {
        return doctor::run(config).await;
    }

    let app = App::open(config).await?;
    match command {
        Commands::Migrate => {
            app.store.migrate().await.context("Migration failed")?;
            println!("✅ Schema up to date ({})", app.config.database.path);
            Ok(())
        }
        Commands::BootstrapAdmin { sn } => print_reply(app.roster.bootstrap_admin(&sn).await),
        Commands::Token { sn } => print_reply(app.roster.issue_token(&sn).await),
        Commands::SignUp {
            sn,
            name,
            role,
            password,
        } => print_reply(
            app.roster
                .sign_up(SignUp {
                    sn,
                    password,
                    name,
                    role,
                })
                .await,
        ),
        Commands::SignIn { sn, password } => print_reply(app.roster.sign_in(&sn, &password).await),
        Commands::Points { auth, command } => points::run(&app, &auth, command).await,
        Commands::Users { auth, command } => users::run(&app, &auth, command).await,
        // Runs before the store is opened
        Commands::Doctor => Ok(()),
    }
}

/// Print the reply envelope; a failed reply exits non-zero
pub(crate) fn print_reply<T: Serialize>(result: roster_core::Result<T>) -> anyhow::Result<()> {
    let reply = Reply::from_result(result);
    println!(
        "{}",
        serde_json::to_string_pretty(&reply).context("Failed to serialize reply")?
    );
    if !reply.is_success() {
        std::process::exit(1);
    }
    Ok(())
}
