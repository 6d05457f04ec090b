// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The ticket lifecycle: opening tickets from DMs, relaying messages in both directions, and closing tickets.

use super::context::BotContext;
use crate::model::{GuildConfig, Ticket, TicketMessage, database_id_from_discord_id};
use crate::schema::{guild_configs, ticket_messages, tickets};
use crate::settings;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use miette::IntoDiagnostic;
use twilight_http::client::Client;
use twilight_http::request::channel::reaction::RequestReactionType;
use twilight_model::channel::message::Message;
use twilight_model::channel::message::embed::Embed;
use twilight_model::http::attachment::Attachment;
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, MessageMarker, UserMarker};

pub mod close;
pub mod create;
pub mod relay;
pub mod transcript;

pub const DELIVERED_REACTION: &str = "✅";

pub fn guild_config(db_connection: &mut PgConnection, guild_id: Id<GuildMarker>) -> QueryResult<Option<GuildConfig>> {
	guild_configs::table
		.find(database_id_from_discord_id(guild_id.get()))
		.first(db_connection)
		.optional()
}

pub fn open_ticket_for_channel(
	db_connection: &mut PgConnection,
	channel_id: Id<ChannelMarker>,
) -> QueryResult<Option<Ticket>> {
	tickets::table
		.filter(
			tickets::channel
				.eq(database_id_from_discord_id(channel_id.get()))
				.and(tickets::closed.eq(false)),
		)
		.first(db_connection)
		.optional()
}

/// Gets the user's open tickets, most recently created first
pub fn open_tickets_for_user(db_connection: &mut PgConnection, user_id: Id<UserMarker>) -> QueryResult<Vec<Ticket>> {
	tickets::table
		.filter(
			tickets::with_user
				.eq(database_id_from_discord_id(user_id.get()))
				.and(tickets::closed.eq(false)),
		)
		.order(tickets::created_at.desc())
		.load(db_connection)
}

/// Records a relayed message for the transcript and bumps the ticket's activity time
pub fn record_ticket_message(
	db_connection: &mut PgConnection,
	ticket: &Ticket,
	author: Id<UserMarker>,
	from_staff: bool,
	body: &str,
	source_message: Id<MessageMarker>,
	relayed_message: Option<Id<MessageMarker>>,
	send_time: DateTime<Utc>,
) -> QueryResult<()> {
	let ticket_message = TicketMessage {
		id: cuid2::create_id(),
		ticket: ticket.id.clone(),
		author: database_id_from_discord_id(author.get()),
		from_staff,
		send_time,
		body: body.to_string(),
		source_message: database_id_from_discord_id(source_message.get()),
		relayed_message: relayed_message.map(|id| database_id_from_discord_id(id.get())),
	};
	db_connection.transaction(|db_connection| {
		diesel::insert_into(ticket_messages::table)
			.values(ticket_message)
			.execute(db_connection)?;
		diesel::update(tickets::table.find(&ticket.id))
			.set(tickets::last_activity.eq(send_time))
			.execute(db_connection)?;
		Ok(())
	})
}

pub fn attachment_urls(message: &Message) -> Vec<String> {
	message
		.attachments
		.iter()
		.map(|attachment| attachment.url.clone())
		.collect()
}

/// Sends embeds to a user by DM, returning the sent message
pub async fn send_direct_message(
	http_client: &Client,
	user_id: Id<UserMarker>,
	embeds: &[Embed],
) -> miette::Result<Message> {
	let channel = http_client
		.create_private_channel(user_id)
		.await
		.into_diagnostic()?
		.model()
		.await
		.into_diagnostic()?;
	let message = http_client
		.create_message(channel.id)
		.embeds(embeds)
		.await
		.into_diagnostic()?
		.model()
		.await
		.into_diagnostic()?;
	Ok(message)
}

/// Marks a message as relayed. Failing to react isn't worth failing the relay over, so errors are only logged.
pub async fn react_delivered(http_client: &Client, channel_id: Id<ChannelMarker>, message_id: Id<MessageMarker>) {
	let reaction = RequestReactionType::Unicode {
		name: DELIVERED_REACTION,
	};
	if let Err(error) = http_client.create_reaction(channel_id, message_id, &reaction).await {
		tracing::debug!(source = ?error, "Failed to react to a relayed message");
	}
}

/// Posts an entry to the guild's log channel, if it has one and logging is enabled
pub async fn log_ticket_event(
	ctx: &BotContext,
	guild_config: &GuildConfig,
	embed: Embed,
	attachment: Option<Attachment>,
) -> miette::Result<()> {
	let logs_enabled = guild_config
		.settings()
		.get_setting(settings::LOGS_ENABLED, ctx.config.tickets.logs_enabled);
	let Some(log_channel) = guild_config.get_log_channel() else {
		return Ok(());
	};
	if !logs_enabled {
		return Ok(());
	}

	let embeds = [embed];
	let attachments: Vec<Attachment> = attachment.into_iter().collect();
	ctx.http_client
		.create_message(log_channel)
		.embeds(&embeds)
		.attachments(&attachments)
		.await
		.into_diagnostic()?;
	Ok(())
}
