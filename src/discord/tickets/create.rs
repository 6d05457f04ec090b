// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::{guild_config, log_ticket_event, open_tickets_for_user, record_ticket_message, send_direct_message};
use crate::discord::context::BotContext;
use crate::discord::interactions::MAX_INTERACTION_WAIT_TIME;
use crate::discord::state::cooldowns::{CooldownKind, remaining_seconds};
use crate::discord::state::create_ticket::{
	GuildChoice, InitialTicketMessage, PendingTicketCreation, PendingTicketCreations, guild_select_components,
};
use crate::discord::utils::embeds::{EmbedStyle, ticket_created_embed, ticket_log_embed, ticket_opened_embed};
use crate::discord::utils::permissions::{ticket_channel_name, ticket_channel_overwrites};
use crate::discord::utils::responses::{
	NO_MODMAIL_SERVERS, TICKET_CREATION_EXPIRED, TICKET_CREATION_FAILED, already_open_message, cooldown_message,
	max_open_tickets_message,
};
use crate::discord::utils::timestamp::timestamp_from_datetime;
use crate::discord::utils::users::{is_guild_member, member_display_name};
use crate::model::{GuildConfig, Ticket, database_id_from_discord_id};
use crate::schema::{guild_configs, tickets};
use crate::settings;
use chrono::Utc;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DbError};
use miette::IntoDiagnostic;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::sleep;
use twilight_http::client::Client;
use twilight_http::request::AuditLogReason;
use twilight_mention::fmt::Mention;
use twilight_model::channel::ChannelType;
use twilight_model::channel::message::{AllowedMentions, Message, MentionType};
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GuildMarker};
use twilight_model::user::User;
use type_map::concurrent::TypeMap;

/// Opens a new ticket for the author of a DM.
///
/// If `server_filter` is set, only servers whose name contains it (ignoring case) are considered.
pub async fn create_ticket(ctx: &BotContext, message: &Message, server_filter: Option<&str>) -> miette::Result<()> {
	let user = &message.author;

	if let Err(remaining) = ctx.check_cooldown(CooldownKind::NewTicket, user.id).await {
		ctx.http_client
			.create_message(message.channel_id)
			.reply(message.id)
			.content(&cooldown_message(remaining_seconds(remaining)))
			.await
			.into_diagnostic()?;
		return Ok(());
	}

	let (open_tickets, configs) = {
		let mut db_connection = ctx.db_connection_pool.get().into_diagnostic()?;
		let open_tickets = open_tickets_for_user(&mut db_connection, user.id).into_diagnostic()?;
		let configs: Vec<GuildConfig> = guild_configs::table.load(&mut db_connection).into_diagnostic()?;
		(open_tickets, configs)
	};

	let max_open_tickets = ctx.config.tickets.max_open_tickets;
	if open_tickets.len() >= max_open_tickets as usize {
		ctx.reset_cooldown(CooldownKind::NewTicket, user.id).await;
		ctx.http_client
			.create_message(message.channel_id)
			.reply(message.id)
			.content(&max_open_tickets_message(max_open_tickets))
			.await
			.into_diagnostic()?;
		return Ok(());
	}

	let server_filter = server_filter.map(str::to_lowercase);
	let mut candidates: Vec<GuildChoice> = Vec::new();
	for config in configs {
		if open_tickets.iter().any(|ticket| ticket.guild == config.guild_id) {
			continue;
		}
		if open_ticket_block(&open_tickets, &config, max_open_tickets).is_some() {
			continue;
		}
		let guild_id = config.get_guild_id();
		let name = ctx
			.guild_name(guild_id)
			.unwrap_or_else(|| String::from("Unknown Server"));
		if let Some(filter) = &server_filter {
			if !name.to_lowercase().contains(filter.as_str()) {
				continue;
			}
		}
		match is_guild_member(&ctx.http_client, guild_id, user.id).await {
			Ok(true) => candidates.push(GuildChoice { guild_id, name }),
			Ok(false) => (),
			Err(error) => {
				tracing::warn!(source = ?error, guild = %guild_id, "Couldn't check membership for ticket creation")
			}
		}
	}

	let first_message = InitialTicketMessage {
		id: message.id,
		content: message.content.clone(),
		attachment_urls: super::attachment_urls(message),
	};

	match candidates.len() {
		0 => {
			ctx.reset_cooldown(CooldownKind::NewTicket, user.id).await;
			ctx.http_client
				.create_message(message.channel_id)
				.reply(message.id)
				.content(NO_MODMAIL_SERVERS)
				.await
				.into_diagnostic()?;
			Ok(())
		}
		1 => {
			let guild_id = candidates[0].guild_id;
			let result = open_ticket(ctx, guild_id, user, message.channel_id, &first_message).await;
			if result.is_err() {
				ctx.reset_cooldown(CooldownKind::NewTicket, user.id).await;
				if let Err(error) = ctx
					.http_client
					.create_message(message.channel_id)
					.content(TICKET_CREATION_FAILED)
					.await
				{
					tracing::warn!(source = ?error, user = %user.id, "Failed to report ticket creation failure");
				}
			}
			result
		}
		_ => prompt_for_guild(ctx, message, first_message, candidates).await,
	}
}

async fn prompt_for_guild(
	ctx: &BotContext,
	message: &Message,
	first_message: InitialTicketMessage,
	candidates: Vec<GuildChoice>,
) -> miette::Result<()> {
	let create_id = cuid2::create_id();
	let components = guild_select_components(&create_id, &candidates);

	{
		let mut state = ctx.bot_state.write().await;
		let pending_creations = state
			.entry::<PendingTicketCreations>()
			.or_insert_with(PendingTicketCreations::default);
		let pending = PendingTicketCreation {
			user: message.author.id,
			dm_channel: message.channel_id,
			first_message,
			candidates,
			prompt_message: None,
		};
		pending_creations.states.insert(create_id.clone(), pending);
	}

	let prompt = ctx
		.http_client
		.create_message(message.channel_id)
		.reply(message.id)
		.content("You share several servers with me that accept modmail tickets. Which one is this message for?")
		.components(&components)
		.await
		.into_diagnostic()?
		.model()
		.await
		.into_diagnostic()?;

	{
		let mut state = ctx.bot_state.write().await;
		if let Some(pending) = state
			.get_mut::<PendingTicketCreations>()
			.and_then(|pending_creations| pending_creations.states.get_mut(&create_id))
		{
			pending.prompt_message = Some(prompt.id);
		}
	}

	tokio::spawn(expire_create(
		Arc::clone(&ctx.http_client),
		Arc::clone(&ctx.bot_state),
		create_id,
	));

	Ok(())
}

async fn expire_create(http_client: Arc<Client>, bot_state: Arc<RwLock<TypeMap>>, create_id: String) {
	sleep(MAX_INTERACTION_WAIT_TIME).await;
	let pending = {
		let mut state = bot_state.write().await;
		state
			.get_mut::<PendingTicketCreations>()
			.and_then(|pending_creations| pending_creations.states.remove(&create_id))
	};
	let Some(pending) = pending else {
		return;
	};
	let Some(prompt_message) = pending.prompt_message else {
		return;
	};
	let result = http_client
		.update_message(pending.dm_channel, prompt_message)
		.content(Some(TICKET_CREATION_EXPIRED))
		.components(Some(&[]))
		.await;
	if let Err(error) = result {
		tracing::warn!(source = ?error, "Failed to mark ticket server selection as expired");
	}
}

/// Why a user can't open another ticket in a guild
#[derive(Debug, Eq, PartialEq)]
enum OpenTicketBlock {
	AlreadyOpenInGuild,
	/// The user has reached the lower of the global and the guild's ticket limit
	TooManyOpen(u32),
}

fn open_ticket_block(
	open_tickets: &[Ticket],
	guild_config: &GuildConfig,
	max_open_tickets: u32,
) -> Option<OpenTicketBlock> {
	if open_tickets.iter().any(|ticket| ticket.guild == guild_config.guild_id) {
		return Some(OpenTicketBlock::AlreadyOpenInGuild);
	}
	let guild_max_open_tickets: u32 = guild_config
		.settings()
		.get_setting(settings::MAX_OPEN_TICKETS, max_open_tickets);
	let limit = max_open_tickets.min(guild_max_open_tickets);
	if open_tickets.len() >= limit as usize {
		return Some(OpenTicketBlock::TooManyOpen(limit));
	}
	None
}

/// Creates the ticket channel and record in a guild and lets the user know.
///
/// The user's open tickets are checked again first, since a server selection may be answered long after it was
/// offered.
pub async fn open_ticket(
	ctx: &BotContext,
	guild_id: Id<GuildMarker>,
	user: &User,
	dm_channel: Id<ChannelMarker>,
	first_message: &InitialTicketMessage,
) -> miette::Result<()> {
	let (guild_config, open_tickets) = {
		let mut db_connection = ctx.db_connection_pool.get().into_diagnostic()?;
		let guild_config = guild_config(&mut db_connection, guild_id).into_diagnostic()?;
		let open_tickets = open_tickets_for_user(&mut db_connection, user.id).into_diagnostic()?;
		(guild_config, open_tickets)
	};
	let Some(guild_config) = guild_config else {
		ctx.http_client
			.create_message(dm_channel)
			.content(NO_MODMAIL_SERVERS)
			.await
			.into_diagnostic()?;
		return Ok(());
	};
	let guild_name = ctx
		.guild_name(guild_id)
		.unwrap_or_else(|| String::from("Unknown Server"));

	if let Some(block) = open_ticket_block(&open_tickets, &guild_config, ctx.config.tickets.max_open_tickets) {
		ctx.reset_cooldown(CooldownKind::NewTicket, user.id).await;
		let content = match block {
			OpenTicketBlock::AlreadyOpenInGuild => already_open_message(&guild_name),
			OpenTicketBlock::TooManyOpen(limit) => max_open_tickets_message(limit),
		};
		ctx.http_client
			.create_message(dm_channel)
			.content(&content)
			.await
			.into_diagnostic()?;
		return Ok(());
	}
	let style = EmbedStyle::for_guild(&ctx.config, Some(&guild_config));

	let user_name = match member_display_name(&ctx.http_client, guild_id, user.id).await {
		Ok(name) => name,
		Err(_) => user.global_name.clone().unwrap_or_else(|| user.name.clone()),
	};

	let channel_name = ticket_channel_name(&user.name);
	let channel_topic = format!("Modmail ticket for {} ({})", user.name, user.id);
	let overwrites = ticket_channel_overwrites(guild_id, guild_config.get_staff_role(), ctx.bot_user_id);
	let mut create_channel = ctx
		.http_client
		.create_guild_channel(guild_id, &channel_name)
		.kind(ChannelType::GuildText)
		.topic(&channel_topic)
		.permission_overwrites(&overwrites);
	if let Some(category) = guild_config.get_modmail_category() {
		create_channel = create_channel.parent_id(category);
	}
	let channel = create_channel
		.reason("Opened modmail ticket")
		.await
		.into_diagnostic()?
		.model()
		.await
		.into_diagnostic()?;

	let now = Utc::now();
	let ticket = Ticket {
		id: cuid2::create_id(),
		guild: guild_config.guild_id,
		channel: database_id_from_discord_id(channel.id.get()),
		with_user: database_id_from_discord_id(user.id.get()),
		closed: false,
		created_at: now,
		last_activity: now,
		topic: None,
		closed_at: None,
		closed_by: None,
		close_reason: None,
	};

	let insert_result = {
		let mut db_connection = ctx.db_connection_pool.get().into_diagnostic()?;
		diesel::insert_into(tickets::table)
			.values(&ticket)
			.execute(&mut db_connection)
	};
	match insert_result {
		Ok(_) => (),
		Err(DbError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
			// Another message from the same user opened a ticket in this guild first.
			tracing::info!(guild = %guild_id, user = %user.id, "Discarding duplicate ticket channel");
			if let Err(error) = ctx
				.http_client
				.delete_channel(channel.id)
				.reason("Duplicate modmail ticket")
				.await
			{
				tracing::warn!(source = ?error, channel = %channel.id, "Failed to delete duplicate ticket channel");
			}
			ctx.http_client
				.create_message(dm_channel)
				.content(&already_open_message(&guild_name))
				.await
				.into_diagnostic()?;
			return Ok(());
		}
		Err(error) => {
			if let Err(error) = ctx
				.http_client
				.delete_channel(channel.id)
				.reason("Failed to open modmail ticket")
				.await
			{
				tracing::warn!(source = ?error, channel = %channel.id, "Failed to delete channel of unopened ticket");
			}
			return Err(error).into_diagnostic();
		}
	}

	let timestamp = timestamp_from_datetime(&now).into_diagnostic()?;
	let opened_embed = ticket_opened_embed(
		&style,
		&user_name,
		user.id,
		&first_message.content,
		&first_message.attachment_urls,
		timestamp,
	)
	.into_diagnostic()?;
	let staff_role = guild_config.get_staff_role();
	let allowed_mentions = AllowedMentions {
		parse: Vec::<MentionType>::new(),
		replied_user: false,
		roles: vec![staff_role],
		users: Vec::new(),
	};
	let opened_embeds = [opened_embed];
	let staff_message = ctx
		.http_client
		.create_message(channel.id)
		.content(&staff_role.mention().to_string())
		.embeds(&opened_embeds)
		.allowed_mentions(Some(&allowed_mentions))
		.await
		.into_diagnostic()?
		.model()
		.await
		.into_diagnostic()?;

	{
		let mut db_connection = ctx.db_connection_pool.get().into_diagnostic()?;
		record_ticket_message(
			&mut db_connection,
			&ticket,
			user.id,
			false,
			&first_message.content,
			first_message.id,
			Some(staff_message.id),
			now,
		)
		.into_diagnostic()?;
	}

	let created_embed = ticket_created_embed(&style, &guild_name).into_diagnostic()?;
	if let Err(error) = send_direct_message(&ctx.http_client, user.id, &[created_embed]).await {
		tracing::warn!(source = ?error, user = %user.id, "Failed to confirm ticket creation to user");
	}

	let log_embed = ticket_log_embed(
		&style,
		"Ticket Opened",
		user.id,
		&[("Channel", format!("<#{}>", channel.id))],
		timestamp,
	)
	.into_diagnostic()?;
	if let Err(error) = log_ticket_event(ctx, &guild_config, log_embed, None).await {
		tracing::warn!(source = ?error, guild = %guild_id, "Failed to log ticket creation");
	}

	tracing::info!(guild = %guild_id, user = %user.id, ticket = %ticket.id, "Opened ticket");
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::TimeZone;
	use serde_json::json;

	fn config_for(guild_id: i64, settings: serde_json::Value) -> GuildConfig {
		GuildConfig {
			guild_id,
			staff_role: 5,
			modmail_category: None,
			log_channel: None,
			settings,
		}
	}

	fn open_ticket_in(guild: i64) -> Ticket {
		let created_at = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
		Ticket {
			id: format!("ticket-{}", guild),
			guild,
			channel: guild + 100,
			with_user: 3,
			closed: false,
			created_at,
			last_activity: created_at,
			topic: None,
			closed_at: None,
			closed_by: None,
			close_reason: None,
		}
	}

	#[test]
	fn a_guild_with_room_is_open() {
		let open_tickets = vec![open_ticket_in(1)];
		assert_eq!(open_ticket_block(&open_tickets, &config_for(2, json!({})), 3), None);
	}

	#[test]
	fn a_second_ticket_in_the_same_guild_is_blocked() {
		let open_tickets = vec![open_ticket_in(1)];
		assert_eq!(
			open_ticket_block(&open_tickets, &config_for(1, json!({})), 3),
			Some(OpenTicketBlock::AlreadyOpenInGuild)
		);
	}

	#[test]
	fn tickets_opened_since_the_selection_count_against_the_limit() {
		let open_tickets = vec![open_ticket_in(1), open_ticket_in(2)];
		assert_eq!(
			open_ticket_block(&open_tickets, &config_for(3, json!({})), 2),
			Some(OpenTicketBlock::TooManyOpen(2))
		);
	}

	#[test]
	fn the_guild_limit_applies_when_lower() {
		let open_tickets = vec![open_ticket_in(1)];
		let config = config_for(2, json!({ "tickets": { "maxOpenTickets": 1 } }));
		assert_eq!(open_ticket_block(&open_tickets, &config, 3), Some(OpenTicketBlock::TooManyOpen(1)));
	}
}
