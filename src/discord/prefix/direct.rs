// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::PrefixCommand;
use crate::discord::context::BotContext;
use crate::discord::tickets::create::create_ticket;
use crate::discord::tickets::open_tickets_for_user;
use crate::discord::utils::responses::{LIST_TICKETS_FAILED, NO_ACTIVE_TICKETS};
use crate::discord::utils::timestamp::format_created_at;
use crate::model::Ticket;
use miette::IntoDiagnostic;
use std::fmt::Write;
use twilight_model::channel::message::Message;

/// Handles a prefixed command sent to the bot by DM. Unknown commands are ignored.
pub async fn handle_direct_command(
	ctx: &BotContext,
	message: &Message,
	command: PrefixCommand<'_>,
) -> miette::Result<()> {
	match command.name.as_str() {
		"tickets" | "list" => list_tickets(ctx, message).await,
		"new" => {
			let server_filter = (!command.rest.is_empty()).then_some(command.rest);
			create_ticket(ctx, message, server_filter).await
		}
		"help" => {
			ctx.http_client
				.create_message(message.channel_id)
				.reply(message.id)
				.content(&direct_help(&ctx.config.prefix))
				.await
				.into_diagnostic()?;
			Ok(())
		}
		_ => Ok(()),
	}
}

async fn list_tickets(ctx: &BotContext, message: &Message) -> miette::Result<()> {
	let open_tickets = ctx
		.db_connection_pool
		.get()
		.into_diagnostic()
		.and_then(|mut db_connection| open_tickets_for_user(&mut db_connection, message.author.id).into_diagnostic());
	let content = match open_tickets {
		Ok(open_tickets) if open_tickets.is_empty() => String::from(NO_ACTIVE_TICKETS),
		Ok(open_tickets) => format_ticket_list(&open_tickets, |ticket| {
			ctx.guild_name(ticket.get_guild())
				.unwrap_or_else(|| String::from("Unknown Server"))
		}),
		Err(error) => {
			tracing::error!(source = ?error, user = %message.author.id, "Failed to list tickets");
			String::from(LIST_TICKETS_FAILED)
		}
	};
	ctx.http_client
		.create_message(message.channel_id)
		.reply(message.id)
		.content(&content)
		.await
		.into_diagnostic()?;
	Ok(())
}

/// Lists a user's open tickets, which should already be sorted newest first
pub fn format_ticket_list(open_tickets: &[Ticket], guild_name: impl Fn(&Ticket) -> String) -> String {
	let mut list = format!("You have {} active ticket(s):\n\n", open_tickets.len());
	for ticket in open_tickets {
		let _ = writeln!(list, "• Server: **{}**", guild_name(ticket));
		let _ = writeln!(list, "Created: {}", format_created_at(&ticket.created_at));
		if let Some(topic) = &ticket.topic {
			let _ = writeln!(list, "Topic: {}", topic);
		}
		list.push('\n');
	}
	list.push_str("To continue an existing conversation, just reply to this message with any text.");
	list.push_str("\nTo start a new ticket, please specify the server if you are in multiple servers with this bot.");
	list
}

pub fn direct_help(prefix: &str) -> String {
	format!(
		"Send me a message to open a ticket with the staff of a server we share. Anything else you send goes to your open ticket, and replying to a staff message sends your reply to that ticket.\n\n`{prefix}tickets` or `{prefix}list`: List your open tickets\n`{prefix}new [server name]`: Open a ticket with another server\n`{prefix}help`: Show this message"
	)
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::{TimeZone, Utc};

	fn ticket(guild: i64, topic: Option<&str>, day: u32) -> Ticket {
		let created_at = Utc.with_ymd_and_hms(2025, 3, day, 15, 4, 0).unwrap();
		Ticket {
			id: format!("ticket{}", guild),
			guild,
			channel: 100 + guild,
			with_user: 7,
			closed: false,
			created_at,
			last_activity: created_at,
			topic: topic.map(String::from),
			closed_at: None,
			closed_by: None,
			close_reason: None,
		}
	}

	#[test]
	fn ticket_list_matches_expected_layout() {
		let tickets = [ticket(2, Some("Ban appeal"), 9), ticket(1, None, 2)];
		let list = format_ticket_list(&tickets, |ticket| format!("Server {}", ticket.guild));
		let expected = "You have 2 active ticket(s):\n\n\
			• Server: **Server 2**\nCreated: Mar 9, 2025 at 3:04 PM\nTopic: Ban appeal\n\n\
			• Server: **Server 1**\nCreated: Mar 2, 2025 at 3:04 PM\n\n\
			To continue an existing conversation, just reply to this message with any text.\n\
			To start a new ticket, please specify the server if you are in multiple servers with this bot.";
		assert_eq!(list, expected);
	}

	#[test]
	fn help_uses_the_configured_prefix() {
		let help = direct_help("!");
		assert!(help.contains("`!tickets`"));
		assert!(help.contains("`!new [server name]`"));
	}
}
