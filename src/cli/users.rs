//! `roster users` subcommands

use clap::Subcommand;
use serde::Serialize;

use roster_core::{Actor, ActorSummary};

use super::{print_reply, TokenArg};
use crate::app::App;

#[derive(Subcommand, Debug)]
pub enum UsersCommand {
    /// Reviewed users, matching a service number exactly or a name by substring
    List {
        /// Service number or part of a name
        query: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Sign-ups awaiting review
    Unverified,
    /// Approve, or with `--reject`, reject a sign-up
    Verify {
        /// Service number
        sn: String,
        #[arg(long)]
        reject: bool,
    },
    /// Soft-delete, or with `--restore`, restore a user
    Delete {
        /// Service number
        sn: String,
        #[arg(long)]
        restore: bool,
    },
    /// Replace a user's permissions (no tokens clears them)
    Permissions {
        /// Service number
        sn: String,
        /// Permission tokens, e.g. GiveMeritPoint ViewPoint
        permissions: Vec<String>,
    },
    /// Reset a user's password and print the temporary one
    ResetPassword {
        /// Service number
        sn: String,
    },
    /// Change your own password
    Password {
        #[arg(long)]
        old: String,
        #[arg(long)]
        new: String,
        #[arg(long)]
        confirm: String,
    },
    /// Exchange your token for a fresh one
    Refresh,
}

#[derive(Debug, Serialize)]
struct Users<T> {
    users: Vec<T>,
}

#[derive(Debug, Serialize)]
struct Permissions {
    permissions: Vec<String>,
}

#[derive(Debug, Serialize)]
struct TemporaryPassword {
    password: String,
}

/// Run a users subcommand as the user behind `auth`
pub async fn run(app: &App, auth: &TokenArg, command: UsersCommand) -> anyhow::Result<()> {
    let actor = app.actor(auth.token.as_deref());
    let actor = actor.as_ref();

    match command {
        UsersCommand::List { query, page } => print_reply(
            app.roster
                .list_actors(actor, query.as_deref(), page)
                .await
                .map(|users| Users::<Actor> { users }),
        ),
        UsersCommand::Unverified => print_reply(
            app.roster
                .list_unverified(actor)
                .await
                .map(|users| Users::<ActorSummary> { users }),
        ),
        UsersCommand::Verify { sn, reject } => {
            print_reply(app.roster.verify_actor(actor, &sn, !reject).await)
        }
        UsersCommand::Delete { sn, restore } => {
            print_reply(app.roster.delete_actor(actor, &sn, !restore).await)
        }
        UsersCommand::Permissions { sn, permissions } => print_reply(
            app.roster
                .update_permissions(actor, &sn, &permissions)
                .await
                .map(|set| Permissions {
                    permissions: set.to_strings(),
                }),
        ),
        UsersCommand::ResetPassword { sn } => print_reply(
            app.roster
                .reset_password(actor, &sn)
                .await
                .map(|password| TemporaryPassword { password }),
        ),
        UsersCommand::Password { old, new, confirm } => {
            let sn = actor.map(|a| a.sn.as_str()).unwrap_or_default();
            print_reply(
                app.roster
                    .change_password(actor, sn, &old, &new, &confirm)
                    .await,
            )
        }
        UsersCommand::Refresh => print_reply(app.roster.refresh_token(actor).await),
    }
}
