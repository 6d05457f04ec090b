// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::config::{ConfigDocument, DEFAULT_EMBED_COLOR};
use crate::model::GuildConfig;
use crate::settings::{self, GuildSettings};
use twilight_mention::fmt::Mention;
use twilight_model::channel::message::embed::Embed;
use twilight_model::id::Id;
use twilight_model::id::marker::UserMarker;
use twilight_model::util::datetime::Timestamp;
use twilight_util::builder::embed::{EmbedAuthorBuilder, EmbedBuilder, EmbedFieldBuilder, EmbedFooterBuilder};
use twilight_validate::embed::EmbedValidationError;

/// Kept below Discord's 4096 character description limit so the whole embed stays under the total limit
const MAX_DESCRIPTION_CHARS: usize = 4000;
const MAX_FIELD_CHARS: usize = 1024;
const EMPTY_MESSAGE: &str = "*(no text content)*";

/// Colour and footer applied to every embed the bot sends on behalf of a guild
#[derive(Clone, Debug)]
pub struct EmbedStyle {
	pub color: u32,
	pub footer: String,
}

impl EmbedStyle {
	pub fn for_guild(config: &ConfigDocument, guild_config: Option<&GuildConfig>) -> Self {
		let settings = guild_config.map(GuildConfig::settings).unwrap_or_default();
		Self {
			color: embed_color(config, &settings),
			footer: config.footer.clone(),
		}
	}

	fn builder(&self) -> EmbedBuilder {
		EmbedBuilder::new()
			.color(self.color)
			.footer(EmbedFooterBuilder::new(self.footer.clone()).build())
	}
}

/// Parses a hex colour like `#94f7f1`. Any number of leading `#` characters is accepted.
pub fn parse_embed_color(color: &str) -> Option<u32> {
	let hex = color.trim().trim_start_matches('#');
	if hex.len() != 6 {
		return None;
	}
	u32::from_str_radix(hex, 16).ok()
}

/// Gets the embed colour for a guild: its own setting if valid, then the configured colour, then the built-in one.
pub fn embed_color(config: &ConfigDocument, settings: &GuildSettings) -> u32 {
	let guild_color: Option<String> = settings.get_setting(settings::EMBED_COLOR, None);
	guild_color
		.as_deref()
		.and_then(parse_embed_color)
		.or_else(|| parse_embed_color(&config.embed_color))
		.or_else(|| parse_embed_color(DEFAULT_EMBED_COLOR))
		.unwrap_or_default()
}

/// Shortens text to at most `max_chars` characters, marking the cut with an ellipsis.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
	if text.chars().count() <= max_chars {
		return text.to_string();
	}
	let mut truncated: String = text.chars().take(max_chars.saturating_sub(1)).collect();
	truncated.push('…');
	truncated
}

fn message_description(content: &str) -> String {
	if content.trim().is_empty() {
		String::from(EMPTY_MESSAGE)
	} else {
		truncate_chars(content, MAX_DESCRIPTION_CHARS)
	}
}

fn with_attachments(mut embed: EmbedBuilder, attachment_urls: &[String]) -> EmbedBuilder {
	if !attachment_urls.is_empty() {
		let attachments = truncate_chars(&attachment_urls.join("\n"), MAX_FIELD_CHARS);
		embed = embed.field(EmbedFieldBuilder::new("Attachments", attachments).build());
	}
	embed
}

/// The embed posted in the staff channel for a message from the ticket's user
pub fn user_relay_embed(
	style: &EmbedStyle,
	author_name: &str,
	content: &str,
	attachment_urls: &[String],
	timestamp: Timestamp,
) -> Result<Embed, EmbedValidationError> {
	let embed = style
		.builder()
		.author(EmbedAuthorBuilder::new(author_name).build())
		.description(message_description(content))
		.timestamp(timestamp);
	Ok(with_attachments(embed, attachment_urls).validate()?.build())
}

/// The embed sent to the user for a staff reply
pub fn staff_relay_embed(
	style: &EmbedStyle,
	author_name: &str,
	guild_name: &str,
	content: &str,
	attachment_urls: &[String],
	timestamp: Timestamp,
) -> Result<Embed, EmbedValidationError> {
	let embed = style
		.builder()
		.author(EmbedAuthorBuilder::new(format!("{} ({})", author_name, guild_name)).build())
		.description(message_description(content))
		.timestamp(timestamp);
	Ok(with_attachments(embed, attachment_urls).validate()?.build())
}

/// The first embed in a newly created ticket channel
pub fn ticket_opened_embed(
	style: &EmbedStyle,
	user_name: &str,
	user_id: Id<UserMarker>,
	content: &str,
	attachment_urls: &[String],
	timestamp: Timestamp,
) -> Result<Embed, EmbedValidationError> {
	let embed = style
		.builder()
		.title("New Ticket")
		.author(EmbedAuthorBuilder::new(user_name).build())
		.description(message_description(content))
		.field(EmbedFieldBuilder::new("User", user_id.mention().to_string()).inline().build())
		.field(EmbedFieldBuilder::new("User ID", user_id.to_string()).inline().build())
		.timestamp(timestamp);
	Ok(with_attachments(embed, attachment_urls).validate()?.build())
}

/// Lets the user know their ticket reached the staff of a server
pub fn ticket_created_embed(style: &EmbedStyle, guild_name: &str) -> Result<Embed, EmbedValidationError> {
	Ok(style
		.builder()
		.title("Ticket Created")
		.description(format!(
			"Your message has been sent to the staff of **{}**. They'll reply here as soon as they can.\nAnything else you send me will be added to this ticket.",
			guild_name
		))
		.validate()?
		.build())
}

/// Lets the user know their ticket has been closed
pub fn ticket_closed_embed(style: &EmbedStyle, guild_name: &str, reason: &str) -> Result<Embed, EmbedValidationError> {
	Ok(style
		.builder()
		.title("Ticket Closed")
		.description(format!(
			"Your ticket with **{}** has been closed.\n\n**Reason:** {}\n\nSend me another message if you need to open a new ticket.",
			guild_name,
			truncate_chars(reason, MAX_FIELD_CHARS)
		))
		.validate()?
		.build())
}

pub fn close_confirmation_embed(style: &EmbedStyle, reason: &str) -> Result<Embed, EmbedValidationError> {
	let footer = format!("{} • This confirmation will expire in 30 seconds", style.footer);
	Ok(EmbedBuilder::new()
		.color(style.color)
		.title("Close Ticket?")
		.description(format!(
			"Are you sure you want to close this ticket?\n\n**Reason:** {}",
			truncate_chars(reason, MAX_FIELD_CHARS)
		))
		.footer(EmbedFooterBuilder::new(footer).build())
		.validate()?
		.build())
}

/// An entry for the guild's ticket log channel
pub fn ticket_log_embed(
	style: &EmbedStyle,
	title: &str,
	user_id: Id<UserMarker>,
	details: &[(&str, String)],
	timestamp: Timestamp,
) -> Result<Embed, EmbedValidationError> {
	let mut embed = style
		.builder()
		.title(title)
		.field(EmbedFieldBuilder::new("User", format!("{} ({})", user_id.mention(), user_id)).build())
		.timestamp(timestamp);
	for (name, value) in details {
		embed = embed.field(EmbedFieldBuilder::new(*name, truncate_chars(value, MAX_FIELD_CHARS)).build());
	}
	Ok(embed.validate()?.build())
}

#[cfg(test)]
mod tests {
	use super::*;

	fn style() -> EmbedStyle {
		EmbedStyle {
			color: 0x94f7f1,
			footer: String::from("Made by @childeetos"),
		}
	}

	#[test]
	fn colors_parse_with_any_number_of_hashes() {
		assert_eq!(parse_embed_color("#94f7f1"), Some(0x94f7f1));
		assert_eq!(parse_embed_color("##94f7f1"), Some(0x94f7f1));
		assert_eq!(parse_embed_color("ff0000"), Some(0xff0000));
		assert_eq!(parse_embed_color("#fff"), None);
		assert_eq!(parse_embed_color("#zzzzzz"), None);
	}

	#[test]
	fn truncation_counts_characters() {
		assert_eq!(truncate_chars("short", 10), "short");
		assert_eq!(truncate_chars("ééééé", 3), "éé…");
	}

	#[test]
	fn empty_messages_get_a_placeholder() {
		let timestamp = Timestamp::from_secs(1_700_000_000).unwrap();
		let embed = user_relay_embed(&style(), "someone", "  ", &[], timestamp).unwrap();
		assert_eq!(embed.description.as_deref(), Some(EMPTY_MESSAGE));
		assert!(embed.fields.is_empty());
	}

	#[test]
	fn attachments_are_listed() {
		let timestamp = Timestamp::from_secs(1_700_000_000).unwrap();
		let urls = vec![
			String::from("https://cdn.example/a.png"),
			String::from("https://cdn.example/b.png"),
		];
		let embed = staff_relay_embed(&style(), "Staff", "Test Server", "See these", &urls, timestamp).unwrap();
		assert_eq!(embed.author.map(|author| author.name), Some(String::from("Staff (Test Server)")));
		let field = embed.fields.first().unwrap();
		assert_eq!(field.name, "Attachments");
		assert_eq!(field.value, "https://cdn.example/a.png\nhttps://cdn.example/b.png");
	}

	#[test]
	fn long_messages_still_validate() {
		let timestamp = Timestamp::from_secs(1_700_000_000).unwrap();
		let content = "a".repeat(5000);
		let embed = user_relay_embed(&style(), "someone", &content, &[], timestamp).unwrap();
		assert_eq!(embed.description.map(|description| description.chars().count()), Some(4000));
	}

	#[test]
	fn confirmation_mentions_reason_and_expiry() {
		let embed = close_confirmation_embed(&style(), "No reason provided").unwrap();
		assert_eq!(embed.title.as_deref(), Some("Close Ticket?"));
		assert!(embed.description.unwrap().ends_with("**Reason:** No reason provided"));
		assert_eq!(
			embed.footer.map(|footer| footer.text),
			Some(String::from(
				"Made by @childeetos • This confirmation will expire in 30 seconds"
			))
		);
	}

	#[test]
	fn users_are_mentioned_in_ticket_embeds() {
		let timestamp = Timestamp::from_secs(1_700_000_000).unwrap();
		let opened = ticket_opened_embed(&style(), "someone", Id::new(42), "hello", &[], timestamp).unwrap();
		assert_eq!(opened.fields[0].value, "<@42>");

		let details = [("Closed By", String::from("<@7>"))];
		let logged = ticket_log_embed(&style(), "Ticket Closed", Id::new(42), &details, timestamp).unwrap();
		assert_eq!(logged.fields[0].value, "<@42> (42)");
		assert_eq!(logged.fields[1].value, "<@7>");
	}
}
