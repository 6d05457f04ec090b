// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::context::BotContext;
use miette::{IntoDiagnostic, bail};
use std::time::Duration;
use twilight_model::application::interaction::message_component::MessageComponentInteractionData;
use twilight_model::channel::message::MessageFlags;
use twilight_model::gateway::payload::incoming::InteractionCreate;
use twilight_model::http::interaction::{InteractionResponse, InteractionResponseType};
use twilight_util::builder::InteractionResponseDataBuilder;

mod close;
mod create_ticket;

/// How long a multi-step interaction is kept waiting for the user
pub const MAX_INTERACTION_WAIT_TIME: Duration = Duration::from_secs(900);

pub async fn route_interaction(
	ctx: &BotContext,
	interaction: &InteractionCreate,
	interaction_data: &MessageComponentInteractionData,
) -> miette::Result<()> {
	let custom_id_path: Vec<String> = interaction_data.custom_id.split('/').map(|s| s.to_string()).collect();

	match custom_id_path.first().map(|s| s.as_str()) {
		Some("close") => close::route_close_interaction(ctx, interaction, &custom_id_path).await,
		Some("create_ticket") => {
			create_ticket::route_create_ticket_interaction(ctx, interaction, interaction_data, &custom_id_path).await
		}
		_ => bail!(
			"Unexpected interaction encountered: {}\n{:?}",
			interaction_data.custom_id,
			interaction_data
		),
	}
}

async fn respond_ephemeral(ctx: &BotContext, interaction: &InteractionCreate, content: &str) -> miette::Result<()> {
	let response = InteractionResponseDataBuilder::new()
		.content(content)
		.flags(MessageFlags::EPHEMERAL)
		.build();
	let response = InteractionResponse {
		kind: InteractionResponseType::ChannelMessageWithSource,
		data: Some(response),
	};
	ctx.http_client
		.interaction(ctx.application_id)
		.create_response(interaction.id, &interaction.token, &response)
		.await
		.into_diagnostic()?;
	Ok(())
}
