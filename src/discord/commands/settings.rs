// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::respond_ephemeral;
use crate::discord::context::BotContext;
use crate::discord::tickets::guild_config;
use crate::discord::utils::responses::NOT_SET_UP_FOR_GUILD;
use crate::model::GuildConfig;
use crate::schema::guild_configs;
use crate::settings::{KNOWN_KEYS, parse_setting_value};
use diesel::prelude::*;
use miette::{IntoDiagnostic, bail};
use serde_json::Value;
use twilight_model::application::command::{Command, CommandType};
use twilight_model::application::interaction::InteractionContextType;
use twilight_model::application::interaction::application_command::{
	CommandData, CommandDataOption, CommandOptionValue,
};
use twilight_model::gateway::payload::incoming::InteractionCreate;
use twilight_model::guild::Permissions;
use twilight_util::builder::command::{CommandBuilder, StringBuilder, SubCommandBuilder};

const MAX_SETTING_DISPLAY_CHARS: usize = 1800;

pub fn command_definition() -> Command {
	let get_key_option = StringBuilder::new("key", "The setting to look up, like `tickets.closeConfirmation`")
		.required(true)
		.build();
	let set_key_option = StringBuilder::new("key", "The setting to change, like `tickets.closeConfirmation`")
		.required(true)
		.build();
	let value_option = StringBuilder::new("value", "The new value, as JSON (anything else is stored as text)")
		.required(true)
		.build();

	let get_subcommand = SubCommandBuilder::new("get", "Gets the value of a setting")
		.option(get_key_option)
		.build();
	let set_subcommand = SubCommandBuilder::new("set", "Changes the value of a setting")
		.option(set_key_option)
		.option(value_option)
		.build();

	CommandBuilder::new(
		"settings",
		"View or modify modmail settings for your server",
		CommandType::ChatInput,
	)
	.contexts([InteractionContextType::Guild])
	.default_member_permissions(Permissions::MANAGE_GUILD)
	.option(get_subcommand)
	.option(set_subcommand)
	.build()
}

pub async fn handle_command(
	ctx: &BotContext,
	interaction: &InteractionCreate,
	command_data: &CommandData,
) -> miette::Result<()> {
	let Some(guild_id) = interaction.guild_id else {
		bail!("Settings command was used outside of a guild");
	};
	let Some(subcommand) = command_data.options.first() else {
		bail!("Settings command invoked with no subcommand");
	};
	let CommandOptionValue::SubCommand(options) = &subcommand.value else {
		bail!("Command data is malformed; expected `/settings {}` to be a subcommand", subcommand.name);
	};

	let config = {
		let mut db_connection = ctx.db_connection_pool.get().into_diagnostic()?;
		guild_config(&mut db_connection, guild_id).into_diagnostic()?
	};
	let Some(config) = config else {
		return respond_ephemeral(ctx, interaction, String::from(NOT_SET_UP_FOR_GUILD)).await;
	};

	let Some(key) = string_option(options, "key") else {
		bail!("Command data is malformed; expected `/settings {}` to have required option `key`", subcommand.name);
	};

	match subcommand.name.as_str() {
		"get" => {
			let settings = config.settings();
			respond_ephemeral(ctx, interaction, describe_setting(key, settings.get_raw(key))).await
		}
		"set" => {
			let Some(value) = string_option(options, "value") else {
				bail!("Command data is malformed; expected `/settings set` to have required option `value`");
			};
			set_setting(ctx, interaction, &config, key, value).await
		}
		_ => bail!("Unknown settings subcommand encountered: {}\n{:?}", subcommand.name, subcommand),
	}
}

fn string_option<'a>(options: &'a [CommandDataOption], name: &str) -> Option<&'a str> {
	options.iter().find_map(|option| match &option.value {
		CommandOptionValue::String(value) if option.name == name => Some(value.as_str()),
		_ => None,
	})
}

async fn set_setting(
	ctx: &BotContext,
	interaction: &InteractionCreate,
	config: &GuildConfig,
	key: &str,
	value: &str,
) -> miette::Result<()> {
	if key.is_empty() || key.split('.').any(str::is_empty) {
		return respond_ephemeral(ctx, interaction, format!("`{}` isn't a valid setting key.", key)).await;
	}

	let value = parse_setting_value(value);
	let mut settings = config.settings();
	settings.set_setting(key, value.clone());

	let db_result = ctx
		.db_connection_pool
		.get()
		.into_diagnostic()
		.and_then(|mut db_connection| {
			diesel::update(guild_configs::table.find(config.guild_id))
				.set(guild_configs::settings.eq(settings.into_value()))
				.execute(&mut db_connection)
				.into_diagnostic()
		});

	let content = match db_result {
		Ok(_) => {
			tracing::info!(guild = config.guild_id, key, "Updated guild setting");
			let mut content = format!("Updated `{}` to `{}`.", key, display_value(&value));
			if !KNOWN_KEYS.contains(&key) {
				content.push_str("\nNote: this isn't a setting the bot uses, so it won't have any effect.");
			}
			content
		}
		Err(error) => {
			tracing::error!(source = ?error, "Failed to update a guild setting");
			String::from("An internal error caused the update to fail.")
		}
	};
	respond_ephemeral(ctx, interaction, content).await
}

fn display_value(value: &Value) -> String {
	let display = value.to_string();
	if display.chars().count() > MAX_SETTING_DISPLAY_CHARS {
		let mut shortened: String = display.chars().take(MAX_SETTING_DISPLAY_CHARS).collect();
		shortened.push('…');
		shortened
	} else {
		display
	}
}

fn describe_setting(key: &str, value: Option<&Value>) -> String {
	match value {
		Some(value) if !value.is_null() => format!("`{}` is set to `{}`.", key, display_value(value)),
		_ => format!("`{}` isn't set, so the default is used.", key),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn set_values_are_shown_as_json() {
		assert_eq!(
			describe_setting("tickets.closeConfirmation", Some(&json!(false))),
			"`tickets.closeConfirmation` is set to `false`."
		);
		assert_eq!(
			describe_setting("appearance.embedColor", Some(&json!("#ff0000"))),
			"`appearance.embedColor` is set to `\"#ff0000\"`."
		);
	}

	#[test]
	fn unset_values_mention_the_default() {
		assert_eq!(
			describe_setting("tickets.anonymousStaff", None),
			"`tickets.anonymousStaff` isn't set, so the default is used."
		);
		assert_eq!(
			describe_setting("tickets.anonymousStaff", Some(&Value::Null)),
			"`tickets.anonymousStaff` isn't set, so the default is used."
		);
	}

	#[test]
	fn long_values_are_shortened() {
		let value = json!("a".repeat(3000));
		assert_eq!(display_value(&value).chars().count(), MAX_SETTING_DISPLAY_CHARS + 1);
	}
}
