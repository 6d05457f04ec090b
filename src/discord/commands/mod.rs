// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::context::BotContext;
use miette::{IntoDiagnostic, bail};
use twilight_model::application::command::Command;
use twilight_model::application::interaction::application_command::CommandData;
use twilight_model::channel::message::MessageFlags;
use twilight_model::gateway::payload::incoming::InteractionCreate;
use twilight_model::http::interaction::{InteractionResponse, InteractionResponseType};
use twilight_util::builder::InteractionResponseDataBuilder;

mod settings;
mod setup;

pub fn command_definitions() -> Vec<Command> {
	vec![setup::command_definition(), settings::command_definition()]
}

pub async fn route_command(
	ctx: &BotContext,
	interaction: &InteractionCreate,
	command_data: &CommandData,
) -> miette::Result<()> {
	match command_data.name.as_str() {
		"setup" => setup::handle_command(ctx, interaction, command_data).await,
		"settings" => settings::handle_command(ctx, interaction, command_data).await,
		_ => bail!("Unknown command encountered: {}\n{:?}", command_data.name, command_data),
	}
}

/// Responds to a command with a message only the user who ran it can see
async fn respond_ephemeral(ctx: &BotContext, interaction: &InteractionCreate, content: String) -> miette::Result<()> {
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
