// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::context::BotContext;
use super::prefix::direct::handle_direct_command;
use super::prefix::guild::handle_guild_command;
use super::prefix::parse_prefix_command;
use super::prefix::staff::handle_staff_command;
use super::tickets::create::create_ticket;
use super::tickets::relay::{relay_staff_message, relay_user_message};
use super::tickets::{guild_config, open_ticket_for_channel};
use super::utils::permissions::is_ticket_channel_name;
use super::utils::responses::{NOT_SET_UP_FOR_GUILD, missing_staff_role_message};
use miette::IntoDiagnostic;
use twilight_mention::fmt::Mention;
use twilight_model::channel::message::Message;
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, RoleMarker};

pub async fn handle_message(ctx: &BotContext, message: &Message) -> miette::Result<()> {
	if message.author.bot || message.author.id == ctx.bot_user_id {
		return Ok(());
	}

	match message.guild_id {
		None => handle_direct_message(ctx, message).await,
		Some(guild_id) => {
			if is_ticket_channel(ctx, message.channel_id).await? {
				handle_ticket_channel_message(ctx, message, guild_id).await
			} else {
				match parse_prefix_command(&message.content, &ctx.config.prefix) {
					Some(command) => handle_guild_command(ctx, message, command).await,
					None => Ok(()),
				}
			}
		}
	}
}

async fn handle_direct_message(ctx: &BotContext, message: &Message) -> miette::Result<()> {
	if let Some(command) = parse_prefix_command(&message.content, &ctx.config.prefix) {
		return handle_direct_command(ctx, message, command).await;
	}

	if relay_user_message(ctx, message).await? {
		return Ok(());
	}
	create_ticket(ctx, message, None).await
}

/// Checks the channel name, using the cache where possible
async fn is_ticket_channel(ctx: &BotContext, channel_id: Id<ChannelMarker>) -> miette::Result<bool> {
	let cached_name = ctx
		.cache
		.channel(channel_id)
		.map(|channel| channel.name.clone());
	let name = match cached_name {
		Some(name) => name,
		None => {
			let channel = ctx
				.http_client
				.channel(channel_id)
				.await
				.into_diagnostic()?
				.model()
				.await
				.into_diagnostic()?;
			channel.name
		}
	};
	Ok(name.as_deref().is_some_and(is_ticket_channel_name))
}

async fn handle_ticket_channel_message(
	ctx: &BotContext,
	message: &Message,
	guild_id: Id<GuildMarker>,
) -> miette::Result<()> {
	let guild_config = {
		let mut db_connection = ctx.db_connection_pool.get().into_diagnostic()?;
		guild_config(&mut db_connection, guild_id).into_diagnostic()?
	};
	let Some(guild_config) = guild_config else {
		tracing::error!(guild = %guild_id, "No configuration found for guild");
		ctx.http_client
			.create_message(message.channel_id)
			.reply(message.id)
			.content(NOT_SET_UP_FOR_GUILD)
			.await
			.into_diagnostic()?;
		return Ok(());
	};

	let staff_role = guild_config.get_staff_role();
	if !has_role(message, staff_role) {
		ctx.http_client
			.create_message(message.channel_id)
			.reply(message.id)
			.content(&missing_staff_role_message(staff_role.mention()))
			.await
			.into_diagnostic()?;
		return Ok(());
	}

	if let Some(command) = parse_prefix_command(&message.content, &ctx.config.prefix) {
		return handle_staff_command(ctx, message, &guild_config, command).await;
	}

	let ticket = {
		let mut db_connection = ctx.db_connection_pool.get().into_diagnostic()?;
		open_ticket_for_channel(&mut db_connection, message.channel_id).into_diagnostic()?
	};
	let Some(ticket) = ticket else {
		tracing::debug!(channel = %message.channel_id, "Message in a ticket channel with no open ticket");
		return Ok(());
	};
	relay_staff_message(ctx, message, &ticket, &message.content).await
}

fn has_role(message: &Message, role: Id<RoleMarker>) -> bool {
	message
		.member
		.as_ref()
		.is_some_and(|member| member.roles.contains(&role))
}
