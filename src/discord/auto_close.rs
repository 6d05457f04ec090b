// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::context::BotContext;
use super::tickets::close::{CloseOutcome, close_ticket};
use crate::discord::utils::responses::AUTO_CLOSE_REASON;
use crate::model::{GuildConfig, Ticket};
use crate::schema::{guild_configs, tickets};
use crate::settings;
use chrono::{DateTime, TimeDelta, Utc};
use diesel::prelude::*;
use miette::IntoDiagnostic;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};

const AUTO_CLOSE_CHECK_INTERVAL: Duration = Duration::from_secs(600);

/// Whether a ticket has gone without activity for longer than the given number of hours
pub fn is_inactive(last_activity: DateTime<Utc>, now: DateTime<Utc>, inactive_hours: u32) -> bool {
	now.signed_duration_since(last_activity) >= TimeDelta::hours(i64::from(inactive_hours))
}

/// Periodically closes tickets that have been inactive too long, for guilds with auto-close enabled
pub async fn run_auto_close(ctx: BotContext) {
	let mut check_interval = interval(AUTO_CLOSE_CHECK_INTERVAL);
	check_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
	loop {
		check_interval.tick().await;
		if let Err(error) = close_inactive_tickets(&ctx).await {
			tracing::error!(source = ?error, "Failed to check for inactive tickets");
		}
	}
}

async fn close_inactive_tickets(ctx: &BotContext) -> miette::Result<()> {
	let (configs, open_tickets) = {
		let mut db_connection = ctx.db_connection_pool.get().into_diagnostic()?;
		let configs: Vec<GuildConfig> = guild_configs::table.load(&mut db_connection).into_diagnostic()?;
		let open_tickets: Vec<Ticket> = tickets::table
			.filter(tickets::closed.eq(false))
			.load(&mut db_connection)
			.into_diagnostic()?;
		(configs, open_tickets)
	};

	let auto_close = &ctx.config.tickets.auto_close;
	let inactive_hours_by_guild: HashMap<i64, u32> = configs
		.iter()
		.filter_map(|config| {
			let guild_settings = config.settings();
			let enabled = guild_settings.get_setting(settings::AUTO_CLOSE_ENABLED, auto_close.enabled);
			let inactive_hours =
				guild_settings.get_setting(settings::AUTO_CLOSE_INACTIVE_HOURS, auto_close.inactive_hours);
			enabled.then_some((config.guild_id, inactive_hours))
		})
		.collect();

	let now = Utc::now();
	for ticket in open_tickets {
		let Some(inactive_hours) = inactive_hours_by_guild.get(&ticket.guild) else {
			continue;
		};
		if !is_inactive(ticket.last_activity, now, *inactive_hours) {
			continue;
		}
		match close_ticket(ctx, ticket.get_channel(), ctx.bot_user_id, AUTO_CLOSE_REASON).await {
			Ok(CloseOutcome::Closed) => tracing::info!(ticket = %ticket.id, "Automatically closed inactive ticket"),
			Ok(_) => (),
			Err(error) => tracing::warn!(source = ?error, ticket = %ticket.id, "Failed to automatically close ticket"),
		}
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::TimeZone;

	#[test]
	fn tickets_become_inactive_after_the_configured_hours() {
		let last_activity = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
		let just_before = last_activity + TimeDelta::hours(72) - TimeDelta::seconds(1);
		let at_limit = last_activity + TimeDelta::hours(72);
		assert!(!is_inactive(last_activity, just_before, 72));
		assert!(is_inactive(last_activity, at_limit, 72));
	}

	#[test]
	fn zero_hours_closes_immediately() {
		let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
		assert!(is_inactive(now, now, 0));
	}
}
