// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::respond_ephemeral;
use crate::discord::context::BotContext;
use crate::model::{GuildConfig, database_id_from_discord_id};
use crate::schema::guild_configs;
use diesel::prelude::*;
use miette::{IntoDiagnostic, bail};
use serde_json::json;
use twilight_mention::fmt::Mention;
use twilight_model::application::command::{Command, CommandType};
use twilight_model::application::interaction::InteractionContextType;
use twilight_model::application::interaction::application_command::{CommandData, CommandOptionValue};
use twilight_model::channel::ChannelType;
use twilight_model::gateway::payload::incoming::InteractionCreate;
use twilight_model::guild::Permissions;
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, RoleMarker};
use twilight_util::builder::command::{ChannelBuilder, CommandBuilder, RoleBuilder};

pub fn command_definition() -> Command {
	let staff_role_option = RoleBuilder::new("staff_role", "The role given to staff who handle modmail tickets")
		.required(true)
		.build();
	let category_option = ChannelBuilder::new("category", "The category in which to create ticket channels")
		.channel_types([ChannelType::GuildCategory])
		.build();
	let log_channel_option = ChannelBuilder::new("log_channel", "The channel to which ticket events are logged")
		.channel_types([ChannelType::GuildText])
		.build();

	CommandBuilder::new("setup", "Set up modmail for your server", CommandType::ChatInput)
		.contexts([InteractionContextType::Guild])
		.default_member_permissions(Permissions::MANAGE_GUILD)
		.option(staff_role_option)
		.option(category_option)
		.option(log_channel_option)
		.build()
}

pub async fn handle_command(
	ctx: &BotContext,
	interaction: &InteractionCreate,
	command_data: &CommandData,
) -> miette::Result<()> {
	let Some(guild_id) = interaction.guild_id else {
		bail!("Setup command was used outside of a guild");
	};

	let mut staff_role: Option<Id<RoleMarker>> = None;
	let mut category: Option<Id<ChannelMarker>> = None;
	let mut log_channel: Option<Id<ChannelMarker>> = None;
	for option in command_data.options.iter() {
		match (option.name.as_str(), &option.value) {
			("staff_role", CommandOptionValue::Role(role)) => staff_role = Some(*role),
			("category", CommandOptionValue::Channel(channel)) => category = Some(*channel),
			("log_channel", CommandOptionValue::Channel(channel)) => log_channel = Some(*channel),
			_ => bail!("Unexpected option for `/setup`: {}\n{:?}", option.name, option.value),
		}
	}
	let Some(staff_role) = staff_role else {
		bail!("Command data is malformed; expected `/setup` to have required option `staff_role`");
	};

	let new_config = GuildConfig {
		guild_id: database_id_from_discord_id(guild_id.get()),
		staff_role: database_id_from_discord_id(staff_role.get()),
		modmail_category: category.map(|channel| database_id_from_discord_id(channel.get())),
		log_channel: log_channel.map(|channel| database_id_from_discord_id(channel.get())),
		settings: json!({}),
	};

	let db_result = ctx
		.db_connection_pool
		.get()
		.into_diagnostic()
		.and_then(|mut db_connection| {
			diesel::insert_into(guild_configs::table)
				.values(&new_config)
				.on_conflict(guild_configs::guild_id)
				.do_update()
				.set((
					guild_configs::staff_role.eq(new_config.staff_role),
					guild_configs::modmail_category.eq(new_config.modmail_category),
					guild_configs::log_channel.eq(new_config.log_channel),
				))
				.execute(&mut db_connection)
				.into_diagnostic()
		});

	let content = match db_result {
		Ok(_) => {
			tracing::info!(guild = %guild_id, "Set up modmail for guild");
			setup_summary(staff_role, category, log_channel)
		}
		Err(error) => {
			tracing::error!(source = ?error, guild = %guild_id, "Failed to save guild setup");
			String::from("An internal error caused the setup to fail.")
		}
	};
	respond_ephemeral(ctx, interaction, content).await
}

fn setup_summary(
	staff_role: Id<RoleMarker>,
	category: Option<Id<ChannelMarker>>,
	log_channel: Option<Id<ChannelMarker>>,
) -> String {
	let category = match category {
		Some(category) => category.mention().to_string(),
		None => String::from("none (ticket channels are created at the top of the server)"),
	};
	let log_channel = match log_channel {
		Some(channel) => channel.mention().to_string(),
		None => String::from("none (ticket events aren't logged)"),
	};
	format!(
		"Modmail is set up!\nStaff role: {}\nTicket category: {}\nLog channel: {}\nUse `/settings` to adjust how tickets work.",
		staff_role.mention(),
		category,
		log_channel
	)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn summary_shows_what_was_set() {
		let summary = setup_summary(Id::new(5), Some(Id::new(6)), None);
		assert_eq!(
			summary,
			"Modmail is set up!\nStaff role: <@&5>\nTicket category: <#6>\nLog channel: none (ticket events aren't logged)\nUse `/settings` to adjust how tickets work."
		);
	}
}
