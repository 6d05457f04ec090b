// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::PrefixCommand;
use crate::discord::context::BotContext;
use crate::discord::state::cooldowns::{CooldownKind, remaining_seconds};
use crate::discord::utils::responses::{COMMAND_FAILED, cooldown_message};
use miette::IntoDiagnostic;
use twilight_model::channel::message::Message;

/// Handles a prefixed command in a guild channel that isn't a ticket channel
pub async fn handle_guild_command(
	ctx: &BotContext,
	message: &Message,
	command: PrefixCommand<'_>,
) -> miette::Result<()> {
	let content = match command.name.as_str() {
		"help" => guild_help(&ctx.config.prefix),
		_ => return Ok(()),
	};

	if let Err(remaining) = ctx.check_cooldown(CooldownKind::Command, message.author.id).await {
		ctx.http_client
			.create_message(message.channel_id)
			.reply(message.id)
			.content(&cooldown_message(remaining_seconds(remaining)))
			.await
			.into_diagnostic()?;
		return Ok(());
	}

	let result = ctx
		.http_client
		.create_message(message.channel_id)
		.reply(message.id)
		.content(&content)
		.await;
	if let Err(error) = result {
		tracing::error!(source = ?error, command = %command.name, "Error executing command");
		ctx.http_client
			.create_message(message.channel_id)
			.content(COMMAND_FAILED)
			.await
			.into_diagnostic()?;
	}
	Ok(())
}

pub fn guild_help(prefix: &str) -> String {
	format!(
		"I relay direct messages between users and staff. To contact the staff of this server, send me a direct message.\n\nStaff work with tickets in `modmail-` channels; use `{prefix}help` in one of those channels for ticket commands. Administrators can use `/setup` to set the bot up and `/settings` to adjust it."
	)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn guild_help_mentions_setup() {
		let help = guild_help("=");
		assert!(help.contains("`/setup`"));
		assert!(help.contains("`=help`"));
	}
}
