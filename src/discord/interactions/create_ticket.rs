// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::discord::context::BotContext;
use crate::discord::state::cooldowns::CooldownKind;
use crate::discord::state::create_ticket::PendingTicketCreations;
use crate::discord::tickets::create::open_ticket;
use crate::discord::utils::responses::{TICKET_CREATION_EXPIRED, TICKET_CREATION_FAILED};
use miette::{IntoDiagnostic, bail};
use twilight_model::application::interaction::message_component::MessageComponentInteractionData;
use twilight_model::gateway::payload::incoming::InteractionCreate;
use twilight_model::http::interaction::{InteractionResponse, InteractionResponseType};
use twilight_model::id::Id;
use twilight_model::id::marker::GuildMarker;
use twilight_util::builder::InteractionResponseDataBuilder;

pub async fn route_create_ticket_interaction(
	ctx: &BotContext,
	interaction: &InteractionCreate,
	interaction_data: &MessageComponentInteractionData,
	custom_id_path: &[String],
) -> miette::Result<()> {
	let Some(create_id) = custom_id_path.get(1) else {
		bail!("Invalid custom ID for ticket creation (parts: {:?})", custom_id_path);
	};
	match custom_id_path.get(2).map(|s| s.as_str()) {
		Some("select_guild") => handle_guild_selection(ctx, interaction, interaction_data, create_id).await,
		_ => bail!("Invalid custom ID for ticket creation (parts: {:?})", custom_id_path),
	}
}

async fn update_prompt(ctx: &BotContext, interaction: &InteractionCreate, content: String) -> miette::Result<()> {
	let response = InteractionResponseDataBuilder::new()
		.content(content)
		.components(Vec::new())
		.build();
	let response = InteractionResponse {
		kind: InteractionResponseType::UpdateMessage,
		data: Some(response),
	};
	ctx.http_client
		.interaction(ctx.application_id)
		.create_response(interaction.id, &interaction.token, &response)
		.await
		.into_diagnostic()?;
	Ok(())
}

async fn handle_guild_selection(
	ctx: &BotContext,
	interaction: &InteractionCreate,
	interaction_data: &MessageComponentInteractionData,
	create_id: &str,
) -> miette::Result<()> {
	let Some(user) = interaction.author() else {
		bail!("Ticket creation interaction has no user");
	};
	let Some(selected) = interaction_data.values.first() else {
		bail!("Server selection for ticket creation has no value");
	};
	let guild_id: u64 = selected.parse().into_diagnostic()?;
	let Some(guild_id) = Id::<GuildMarker>::new_checked(guild_id) else {
		bail!("Server selection for ticket creation has an invalid server ID: {}", selected);
	};

	let pending = {
		let mut state = ctx.bot_state.write().await;
		let pending_creations = state.get_mut::<PendingTicketCreations>();
		match pending_creations {
			Some(pending_creations) => {
				let belongs_to_user = pending_creations
					.states
					.get(create_id)
					.is_some_and(|pending| pending.user == user.id);
				if belongs_to_user {
					pending_creations.states.remove(create_id)
				} else {
					None
				}
			}
			None => None,
		}
	};
	let Some(pending) = pending else {
		return update_prompt(ctx, interaction, String::from(TICKET_CREATION_EXPIRED)).await;
	};
	let Some(choice) = pending.choice(guild_id) else {
		bail!("User selected a server that wasn't offered for ticket creation: {}", guild_id);
	};

	update_prompt(ctx, interaction, format!("Opening a ticket with **{}**...", choice.name)).await?;

	let result = open_ticket(ctx, guild_id, user, pending.dm_channel, &pending.first_message).await;
	if result.is_err() {
		ctx.reset_cooldown(CooldownKind::NewTicket, user.id).await;
		if let Err(error) = ctx
			.http_client
			.create_message(pending.dm_channel)
			.content(TICKET_CREATION_FAILED)
			.await
		{
			tracing::warn!(source = ?error, user = %user.id, "Failed to report ticket creation failure");
		}
	}
	result
}
