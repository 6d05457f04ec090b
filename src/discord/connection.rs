// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::auto_close::run_auto_close;
use super::commands::{command_definitions, route_command};
use super::context::BotContext;
use super::incoming_messages::handle_message;
use super::interactions::route_interaction;
use super::tickets::close::{CloseOutcome, close_for_deleted_channel};
use super::tickets::open_ticket_for_channel;
use crate::config::ConfigDocument;
use crate::database::DbPool;
use miette::IntoDiagnostic;
use std::sync::Arc;
use tokio::sync::RwLock;
use twilight_cache_inmemory::{DefaultInMemoryCache, ResourceType};
use twilight_gateway::{ConfigBuilder, EventTypeFlags, Intents, Shard, ShardId, StreamExt};
use twilight_http::client::Client;
use twilight_model::application::interaction::InteractionData;
use twilight_model::gateway::event::Event;
use twilight_model::gateway::payload::outgoing::update_presence::UpdatePresencePayload;
use twilight_model::gateway::presence::{ActivityType, MinimalActivity, Status};
use twilight_model::id::Id;
use twilight_model::id::marker::ChannelMarker;
use type_map::concurrent::TypeMap;

pub fn set_up_client(config: &ConfigDocument) -> Arc<Client> {
	Arc::new(Client::new(config.discord_token.clone()))
}

pub async fn run_bot(
	db_connection_pool: DbPool,
	config: Arc<ConfigDocument>,
	http_client: Arc<Client>,
) -> miette::Result<()> {
	let intents = Intents::GUILDS
		| Intents::GUILD_MEMBERS
		| Intents::GUILD_MESSAGES
		| Intents::DIRECT_MESSAGES
		| Intents::MESSAGE_CONTENT;

	let activity = MinimalActivity {
		kind: ActivityType::Playing,
		name: config.status.clone(),
		url: None,
	};
	let presence = UpdatePresencePayload::new(vec![activity.into()], false, None, Status::Online).into_diagnostic()?;
	let shard_config = ConfigBuilder::new(config.discord_token.clone(), intents)
		.presence(presence)
		.build();
	let mut shard = Shard::with_config(ShardId::ONE, shard_config);

	let cache = DefaultInMemoryCache::builder()
		.resource_types(ResourceType::GUILD | ResourceType::CHANNEL)
		.build();

	let application_id = {
		let application_response = http_client.current_user_application().await.into_diagnostic()?;
		application_response.model().await.into_diagnostic()?.id
	};
	let bot_user_id = {
		let user_response = http_client.current_user().await.into_diagnostic()?;
		user_response.model().await.into_diagnostic()?.id
	};

	{
		let interaction_client = http_client.interaction(application_id);
		let commands = command_definitions();
		interaction_client
			.set_global_commands(&commands)
			.await
			.into_diagnostic()?;
	}

	let ctx = BotContext {
		http_client,
		application_id,
		bot_user_id,
		db_connection_pool,
		bot_state: Arc::new(RwLock::new(TypeMap::new())),
		cache: Arc::new(cache),
		config,
	};

	tokio::spawn(run_auto_close(ctx.clone()));

	while let Some(event) = shard.next_event(EventTypeFlags::all()).await {
		let event = match event {
			Ok(event) => event,
			Err(error) => {
				tracing::warn!(source = ?error, "error receiving event");
				continue;
			}
		};
		ctx.cache.update(&event);

		tokio::spawn(handle_event(event, ctx.clone()));
	}

	Ok(())
}

async fn handle_event(event: Event, ctx: BotContext) {
	let event_result = handle_event_route(event, &ctx).await;
	if let Err(error) = event_result {
		tracing::error!(source = ?error, "An error occurred handling a gateway event");
	}
}

async fn handle_event_route(event: Event, ctx: &BotContext) -> miette::Result<()> {
	tracing::debug!("Incoming gateway message: {:?}", event);
	match event {
		Event::InteractionCreate(interaction) => match &interaction.data {
			Some(InteractionData::ApplicationCommand(command_data)) => {
				route_command(ctx, &interaction, command_data).await?;
			}
			Some(InteractionData::MessageComponent(interaction_data)) => {
				route_interaction(ctx, &interaction, interaction_data).await?;
			}
			_ => (),
		},
		Event::MessageCreate(message) => handle_message(ctx, &message).await?,
		Event::ChannelDelete(channel) => handle_channel_delete(ctx, channel.id).await?,
		Event::Ready(ready) => {
			tracing::info!(user = %ready.user.name, guilds = ready.guilds.len(), "Discord gateway is ready");
		}
		_ => (),
	}
	Ok(())
}

/// Closes the ticket for a staff channel someone deleted by hand
async fn handle_channel_delete(ctx: &BotContext, channel_id: Id<ChannelMarker>) -> miette::Result<()> {
	let ticket = {
		let mut db_connection = ctx.db_connection_pool.get().into_diagnostic()?;
		open_ticket_for_channel(&mut db_connection, channel_id).into_diagnostic()?
	};
	if ticket.is_none() {
		return Ok(());
	}
	match close_for_deleted_channel(ctx, channel_id).await {
		Ok(CloseOutcome::Closed) => tracing::info!(channel = %channel_id, "Closed ticket for deleted channel"),
		Ok(_) => (),
		Err(error) => return Err(error).into_diagnostic(),
	}
	Ok(())
}
