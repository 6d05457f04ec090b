// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::schema::{guild_configs, ticket_messages, tickets};
use crate::settings::GuildSettings;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, RoleMarker, UserMarker};

/// A guild that's using the bot and its modmail configuration.
#[derive(Clone, Debug, Insertable, Queryable)]
#[diesel(table_name = guild_configs)]
pub struct GuildConfig {
	/// The ID of the guild in question.
	///
	/// To get a Discord-facing version of this more easily, use [Self::get_guild_id].
	pub guild_id: i64,
	/// The ID of the role all staff have. Only members with this role may use ticket channels.
	///
	/// To get a Discord-facing version of this more easily, use [Self::get_staff_role].
	pub staff_role: i64,
	/// The ID of the category under which ticket channels are created.
	/// If no category is set, ticket channels are created at the top level of the guild.
	///
	/// To get a Discord-facing version of this more easily, use [Self::get_modmail_category].
	pub modmail_category: Option<i64>,
	/// The ID of the channel to which ticket events and transcripts are logged.
	/// If the feature is disabled, no ID will be entered.
	///
	/// To get a Discord-facing version of this more easily, use [Self::get_log_channel].
	pub log_channel: Option<i64>,
	/// The guild's settings document. Read it through [Self::settings].
	pub settings: serde_json::Value,
}

impl GuildConfig {
	/// Gets the Discord-facing guild information.
	///
	/// For the raw database representation, use [Self::guild_id].
	pub fn get_guild_id(&self) -> Id<GuildMarker> {
		Id::new(discord_id_from_database_id(self.guild_id))
	}

	/// Gets the role that all staff have.
	///
	/// For the raw database representation, use [Self::staff_role].
	pub fn get_staff_role(&self) -> Id<RoleMarker> {
		Id::new(discord_id_from_database_id(self.staff_role))
	}

	/// Gets the category in which ticket channels are created, if one is set.
	///
	/// For the raw database representation, use [Self::modmail_category].
	pub fn get_modmail_category(&self) -> Option<Id<ChannelMarker>> {
		self.modmail_category
			.map(|database_id| Id::new(discord_id_from_database_id(database_id)))
	}

	/// Gets the channel to which ticket events are logged.
	/// If the feature is disabled, no channel will be returned.
	///
	/// For the raw database representation, use [Self::log_channel].
	pub fn get_log_channel(&self) -> Option<Id<ChannelMarker>> {
		self.log_channel
			.map(|database_id| Id::new(discord_id_from_database_id(database_id)))
	}

	pub fn settings(&self) -> GuildSettings {
		GuildSettings::new(self.settings.clone())
	}
}

/// The database representation of a ticket
#[derive(Clone, Debug, Insertable, Queryable)]
pub struct Ticket {
	/// Ticket's ID
	pub id: String,
	/// The ID of the guild the ticket is with.
	///
	/// To get a Discord-facing version of this more easily, use [Self::get_guild].
	pub guild: i64,
	/// The ID of the staff channel created in the guild for this ticket.
	///
	/// To get a Discord-facing version of this more easily, use [Self::get_channel].
	pub channel: i64,
	/// The ID of the user with whom staff is having the discussion.
	///
	/// To get a Discord-facing version of this more easily, use [Self::get_with_user].
	pub with_user: i64,
	/// Whether the ticket has been closed
	pub closed: bool,
	pub created_at: DateTime<Utc>,
	/// The last time a message was relayed in either direction
	pub last_activity: DateTime<Utc>,
	pub topic: Option<String>,
	pub closed_at: Option<DateTime<Utc>>,
	/// The ID of the user who closed the ticket. For automatically closed tickets, this is the bot.
	pub closed_by: Option<i64>,
	pub close_reason: Option<String>,
}

impl Ticket {
	/// The guild the ticket is with.
	///
	/// For the raw database representation, use [Self::guild].
	pub fn get_guild(&self) -> Id<GuildMarker> {
		Id::new(discord_id_from_database_id(self.guild))
	}

	/// The staff channel for the ticket.
	///
	/// For the raw database representation, use [Self::channel].
	pub fn get_channel(&self) -> Id<ChannelMarker> {
		Id::new(discord_id_from_database_id(self.channel))
	}

	/// The user with whom staff is having the discussion.
	///
	/// For the raw database representation, use [Self::with_user].
	pub fn get_with_user(&self) -> Id<UserMarker> {
		Id::new(discord_id_from_database_id(self.with_user))
	}
}

/// A message relayed through a ticket, kept for the ticket transcript
#[derive(Debug, Insertable, Queryable)]
pub struct TicketMessage {
	pub id: String,
	pub ticket: String,
	pub author: i64,
	/// Whether the message was sent by staff (as opposed to the ticket's user)
	pub from_staff: bool,
	pub send_time: DateTime<Utc>,
	pub body: String,
	/// The message as it was originally sent (in the user's DMs or the staff channel)
	pub source_message: i64,
	/// The copy of the message the bot posted on the other side, if relaying succeeded
	pub relayed_message: Option<i64>,
}

/// Converts an ID used with Discord (unsigned) to an ID for Postgres use (signed)
pub fn database_id_from_discord_id(discord_id: u64) -> i64 {
	discord_id as i64
}

/// Converts an ID retrieved from the database (signed) to an ID for use with Discord (unsigned)
pub fn discord_id_from_database_id(database_id: i64) -> u64 {
	database_id as u64
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn id_conversion_preserves_high_bit() {
		let discord_id = u64::MAX - 5;
		let database_id = database_id_from_discord_id(discord_id);
		assert!(database_id < 0);
		assert_eq!(discord_id_from_database_id(database_id), discord_id);
	}
}
