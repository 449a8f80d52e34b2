//! `roster points` subcommands

use chrono::{Local, NaiveDate};
use clap::Subcommand;
use serde::Serialize;
use uuid::Uuid;

use roster_core::{
    parse_point_value, Actor, ActorSummary, Grant, GrantDecision, GrantRequest, PointTemplate,
    Redemption,
};

use super::{print_reply, TokenArg};
use crate::app::App;

#[derive(Subcommand, Debug)]
pub enum PointsCommand {
    /// Merit, demerit, spent and available points (default: yourself)
    Summary {
        /// Service number
        sn: Option<String>,
    },
    /// Request points from a cadre (enlisted) or award them to an enlisted user (cadre)
    Grant {
        /// Service number of the giver (requests) or receiver (awards)
        counterparty: String,
        /// Points; negative values are demerits
        #[arg(allow_hyphen_values = true)]
        value: String,
        /// Reason for the grant
        reason: String,
        /// Day the points were earned (default: today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Approve, or with `--reject`, reject a pending request addressed to you
    Verify {
        /// Grant id
        id: Uuid,
        /// Reject with this reason instead of approving
        #[arg(long)]
        reject: Option<String>,
    },
    /// Withdraw a pending request you filed
    Delete {
        /// Grant id
        id: Uuid,
    },
    /// Spend points on behalf of an enlisted user
    Redeem {
        /// Service number of the enlisted user
        sn: String,
        /// Points to spend
        value: i64,
        /// What the points were spent on
        reason: String,
    },
    /// Requests waiting for your decision
    Pending,
    /// Grant history, newest first (default: yourself)
    History {
        /// Service number
        sn: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Redemptions debited from a user (default: yourself)
    Redemptions {
        /// Service number
        sn: Option<String>,
    },
    /// Show one grant
    Show {
        /// Grant id
        id: Uuid,
    },
    /// Cadre who can be asked for points
    Givers {
        /// Service number or part of a name
        query: Option<String>,
    },
    /// Enlisted users who can be awarded points
    Receivers {
        /// Service number or part of a name
        query: Option<String>,
    },
    /// Preset grant reasons, shared ones first
    Templates,
    /// Add a preset grant reason
    AddTemplate {
        /// Reason text
        reason: String,
        /// Unit the template belongs to (default: shared by every unit)
        #[arg(long)]
        unit: Option<String>,
        /// Suggested merit points
        #[arg(long)]
        merit: Option<i64>,
        /// Suggested demerit points, as a negative number
        #[arg(long, allow_hyphen_values = true)]
        demerit: Option<i64>,
    },
}

#[derive(Debug, Serialize)]
struct Grants {
    grants: Vec<Grant>,
}

#[derive(Debug, Serialize)]
struct Redemptions {
    redemptions: Vec<Redemption>,
}

#[derive(Debug, Serialize)]
struct Templates {
    templates: Vec<PointTemplate>,
}

#[derive(Debug, Serialize)]
struct Candidates {
    users: Vec<ActorSummary>,
}

/// Run a points subcommand as the user behind `auth`
pub async fn run(app: &App, auth: &TokenArg, command: PointsCommand) -> anyhow::Result<()> {
    let actor = app.actor(auth.token.as_deref());
    let actor = actor.as_ref();
    let own_sn = || actor.map(|a| a.sn.clone()).unwrap_or_default();

    match command {
        PointsCommand::Summary { sn } => {
            let sn = sn.unwrap_or_else(own_sn);
            print_reply(app.ledger.view_summary(actor, &sn).await)
        }
        PointsCommand::Grant {
            counterparty,
            value,
            reason,
            date,
        } => {
            let given_at = date.unwrap_or_else(|| Local::now().date_naive());
            print_reply(grant(app, actor, counterparty, &value, reason, given_at).await)
        }
        PointsCommand::Verify { id, reject } => {
            let decision = match reject {
                Some(reason) => GrantDecision::Reject(reason),
                None => GrantDecision::Approve,
            };
            print_reply(app.ledger.verify_grant(actor, id, decision).await)
        }
        PointsCommand::Delete { id } => print_reply(app.ledger.delete_grant(actor, id).await),
        PointsCommand::Redeem { sn, value, reason } => {
            print_reply(app.ledger.redeem_points(actor, &sn, value, &reason).await)
        }
        PointsCommand::Pending => print_reply(
            app.ledger
                .pending_grants(actor)
                .await
                .map(|grants| Grants { grants }),
        ),
        PointsCommand::History { sn, page } => {
            let sn = sn.unwrap_or_else(own_sn);
            print_reply(
                app.ledger
                    .list_grants(actor, &sn, page)
                    .await
                    .map(|grants| Grants { grants }),
            )
        }
        PointsCommand::Redemptions { sn } => {
            let sn = sn.unwrap_or_else(own_sn);
            print_reply(
                app.ledger
                    .list_redemptions(actor, &sn)
                    .await
                    .map(|redemptions| Redemptions { redemptions }),
            )
        }
        PointsCommand::Show { id } => print_reply(app.ledger.fetch_grant(actor, id).await),
        PointsCommand::Givers { query } => print_reply(
            app.roster
                .search_givers(actor, query.as_deref())
                .await
                .map(|users| Candidates { users }),
        ),
        PointsCommand::Receivers { query } => print_reply(
            app.roster
                .search_receivers(actor, query.as_deref())
                .await
                .map(|users| Candidates { users }),
        ),
        PointsCommand::Templates => print_reply(
            app.ledger
                .list_point_templates(actor)
                .await
                .map(|templates| Templates { templates }),
        ),
        PointsCommand::AddTemplate {
            reason,
            unit,
            merit,
            demerit,
        } => {
            let added = match PointTemplate::new(unit.as_deref(), &reason, merit, demerit) {
                Ok(template) => app.ledger.add_point_template(actor, template).await,
                Err(e) => Err(e),
            };
            print_reply(added)
        }
    }
}

async fn grant(
    app: &App,
    actor: Option<&Actor>,
    counterparty: String,
    value: &str,
    reason: String,
    given_at: NaiveDate,
) -> roster_core::Result<Grant> {
    let request = GrantRequest {
        value: parse_point_value(value)?,
        counterparty_sn: Some(counterparty),
        reason,
        given_at,
    };
    app.ledger.create_grant(actor, request).await
}
