// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::PrefixCommand;
use crate::discord::context::BotContext;
use crate::discord::state::close::{
	CLOSE_CONFIRMATION_WINDOW, CloseConfirmation, add_confirmation, close_confirmation_components,
	expire_confirmation, set_confirmation_message,
};
use crate::discord::state::subscriptions::Subscriptions;
use crate::discord::tickets::close::{close_ticket, report_close_outcome};
use crate::discord::tickets::open_ticket_for_channel;
use crate::discord::tickets::relay::relay_staff_message;
use crate::discord::utils::embeds::{EmbedStyle, close_confirmation_embed};
use crate::discord::utils::responses::{CLOSE_TIMED_OUT, CLOSING_TICKET, DEFAULT_CLOSE_REASON, NOT_AN_ACTIVE_TICKET};
use crate::model::{GuildConfig, Ticket};
use crate::schema::tickets;
use crate::settings;
use diesel::prelude::*;
use miette::IntoDiagnostic;
use std::sync::Arc;
use tokio::sync::RwLock;
use twilight_http::client::Client;
use twilight_model::channel::message::Message;
use twilight_model::id::Id;
use twilight_model::id::marker::ChannelMarker;
use type_map::concurrent::TypeMap;

/// Handles a prefixed command sent by staff in a ticket channel. Unknown commands are ignored.
pub async fn handle_staff_command(
	ctx: &BotContext,
	message: &Message,
	guild_config: &GuildConfig,
	command: PrefixCommand<'_>,
) -> miette::Result<()> {
	let needs_ticket = matches!(
		command.name.as_str(),
		"close" | "reply" | "subscribe" | "unsubscribe" | "topic"
	);
	if !needs_ticket {
		if command.name == "help" {
			reply(&ctx.http_client, message, &staff_help(&ctx.config.prefix)).await?;
		}
		return Ok(());
	}

	let ticket = {
		let mut db_connection = ctx.db_connection_pool.get().into_diagnostic()?;
		open_ticket_for_channel(&mut db_connection, message.channel_id).into_diagnostic()?
	};
	let Some(ticket) = ticket else {
		reply(&ctx.http_client, message, NOT_AN_ACTIVE_TICKET).await?;
		return Ok(());
	};

	match command.name.as_str() {
		"close" => handle_close(ctx, message, guild_config, close_reason(command.rest)).await,
		"reply" => {
			if command.rest.is_empty() && message.attachments.is_empty() {
				let usage = format!("Usage: `{}reply <message>`", ctx.config.prefix);
				reply(&ctx.http_client, message, &usage).await?;
				return Ok(());
			}
			relay_staff_message(ctx, message, &ticket, command.rest).await
		}
		"subscribe" => {
			let newly_subscribed = {
				let mut state = ctx.bot_state.write().await;
				let subscriptions = state.entry::<Subscriptions>().or_insert_with(Subscriptions::default);
				subscriptions.subscribe(message.channel_id, message.author.id)
			};
			let content = if newly_subscribed {
				"You'll be mentioned when the user sends a message in this ticket."
			} else {
				"You're already subscribed to this ticket."
			};
			reply(&ctx.http_client, message, content).await
		}
		"unsubscribe" => {
			let was_subscribed = {
				let mut state = ctx.bot_state.write().await;
				state
					.get_mut::<Subscriptions>()
					.is_some_and(|subscriptions| subscriptions.unsubscribe(message.channel_id, message.author.id))
			};
			let content = if was_subscribed {
				"You won't be mentioned for new messages in this ticket anymore."
			} else {
				"You aren't subscribed to this ticket."
			};
			reply(&ctx.http_client, message, content).await
		}
		"topic" => set_topic(ctx, message, &ticket, command.rest).await,
		_ => Ok(()),
	}
}

fn close_reason(rest: &str) -> &str {
	let reason = rest.trim();
	if reason.is_empty() { DEFAULT_CLOSE_REASON } else { reason }
}

async fn reply(http_client: &Client, message: &Message, content: &str) -> miette::Result<()> {
	http_client
		.create_message(message.channel_id)
		.reply(message.id)
		.content(content)
		.await
		.into_diagnostic()?;
	Ok(())
}

async fn handle_close(
	ctx: &BotContext,
	message: &Message,
	guild_config: &GuildConfig,
	reason: &str,
) -> miette::Result<()> {
	let confirmation_required = guild_config
		.settings()
		.get_setting(settings::CLOSE_CONFIRMATION, ctx.config.tickets.close_confirmation);

	if !confirmation_required {
		reply(&ctx.http_client, message, CLOSING_TICKET).await?;
		let outcome = close_ticket(ctx, message.channel_id, message.author.id, reason).await;
		return report_close_outcome(&ctx.http_client, message.channel_id, outcome).await;
	}

	let style = EmbedStyle::for_guild(&ctx.config, Some(guild_config));
	let embed = close_confirmation_embed(&style, reason).into_diagnostic()?;
	let confirmation_id = cuid2::create_id();
	add_confirmation(
		&ctx.bot_state,
		confirmation_id.clone(),
		CloseConfirmation {
			channel: message.channel_id,
			requested_by: message.author.id,
			reason: reason.to_string(),
			message: None,
		},
	)
	.await;

	let components = close_confirmation_components(&confirmation_id, false);
	let embeds = [embed];
	let confirmation_message = ctx
		.http_client
		.create_message(message.channel_id)
		.reply(message.id)
		.embeds(&embeds)
		.components(&components)
		.await
		.into_diagnostic()?
		.model()
		.await
		.into_diagnostic()?;
	set_confirmation_message(&ctx.bot_state, &confirmation_id, confirmation_message.id).await;

	tokio::spawn(time_out_confirmation(
		Arc::clone(&ctx.http_client),
		Arc::clone(&ctx.bot_state),
		confirmation_id,
		message.channel_id,
	));

	Ok(())
}

async fn time_out_confirmation(
	http_client: Arc<Client>,
	bot_state: Arc<RwLock<TypeMap>>,
	confirmation_id: String,
	channel_id: Id<ChannelMarker>,
) {
	let Some(confirmation) = expire_confirmation(bot_state, confirmation_id, CLOSE_CONFIRMATION_WINDOW).await else {
		return;
	};
	let Some(confirmation_message) = confirmation.message else {
		return;
	};
	let result = http_client
		.update_message(channel_id, confirmation_message)
		.content(Some(CLOSE_TIMED_OUT))
		.embeds(Some(&[]))
		.components(Some(&[]))
		.await;
	if let Err(error) = result {
		tracing::warn!(source = ?error, "Failed to mark close confirmation as timed out");
	}
}

async fn set_topic(ctx: &BotContext, message: &Message, ticket: &Ticket, topic: &str) -> miette::Result<()> {
	let new_topic = (!topic.is_empty()).then_some(topic);
	{
		let mut db_connection = ctx.db_connection_pool.get().into_diagnostic()?;
		diesel::update(tickets::table.find(&ticket.id))
			.set(tickets::topic.eq(new_topic))
			.execute(&mut db_connection)
			.into_diagnostic()?;
	}
	let content = match new_topic {
		Some(topic) => format!("Ticket topic set to: {}", topic),
		None => String::from("Ticket topic cleared."),
	};
	reply(&ctx.http_client, message, &content).await
}

pub fn staff_help(prefix: &str) -> String {
	format!(
		"Messages sent in this channel are relayed to the ticket's user.\n\n`{prefix}close [reason]`: Close the ticket\n`{prefix}reply <message>`: Send a message to the user\n`{prefix}subscribe`: Get mentioned when the user sends a message\n`{prefix}unsubscribe`: Stop getting mentioned for this ticket\n`{prefix}topic [topic]`: Set or clear the ticket's topic\n`{prefix}help`: Show this message"
	)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn staff_help_lists_every_command() {
		let help = staff_help("=");
		for command in ["close", "reply", "subscribe", "unsubscribe", "topic", "help"] {
			assert!(help.contains(&format!("`={}", command)), "missing {}", command);
		}
	}

	#[test]
	fn close_without_a_reason_uses_the_default() {
		assert_eq!(close_reason(""), "No reason provided");
		assert_eq!(close_reason("   "), "No reason provided");
	}

	#[test]
	fn close_reason_is_kept() {
		assert_eq!(close_reason("resolved in voice chat"), "resolved in voice chat");
	}
}
