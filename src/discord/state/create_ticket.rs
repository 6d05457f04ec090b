// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::HashMap;
use twilight_model::channel::message::component::{ActionRow, Component, SelectMenu, SelectMenuOption, SelectMenuType};
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, MessageMarker, UserMarker};

/// Discord's limit on select menu options
pub const MAX_GUILD_CHOICES: usize = 25;

#[derive(Debug, Default)]
pub struct PendingTicketCreations {
	pub states: HashMap<String, PendingTicketCreation>,
}

/// A ticket the user started in DMs while sharing several modmail servers with the bot, waiting on them to pick one
#[derive(Debug)]
pub struct PendingTicketCreation {
	pub user: Id<UserMarker>,
	pub dm_channel: Id<ChannelMarker>,
	/// The message the user sent that opens the ticket
	pub first_message: InitialTicketMessage,
	/// Servers the user may open the ticket with
	pub candidates: Vec<GuildChoice>,
	/// The message with the server selection menu, once it's been sent
	pub prompt_message: Option<Id<MessageMarker>>,
}

#[derive(Clone, Debug)]
pub struct InitialTicketMessage {
	pub id: Id<MessageMarker>,
	pub content: String,
	pub attachment_urls: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct GuildChoice {
	pub guild_id: Id<GuildMarker>,
	pub name: String,
}

impl PendingTicketCreation {
	pub fn choice(&self, guild_id: Id<GuildMarker>) -> Option<&GuildChoice> {
		self.candidates.iter().find(|choice| choice.guild_id == guild_id)
	}
}

pub fn guild_select_components(create_id: &str, candidates: &[GuildChoice]) -> Vec<Component> {
	let options: Vec<SelectMenuOption> = candidates
		.iter()
		.take(MAX_GUILD_CHOICES)
		.map(|choice| SelectMenuOption {
			default: false,
			description: None,
			emoji: None,
			label: choice.name.clone(),
			value: choice.guild_id.get().to_string(),
		})
		.collect();
	let select_menu = SelectMenu {
		channel_types: None,
		custom_id: format!("create_ticket/{}/select_guild", create_id),
		default_values: None,
		disabled: false,
		kind: SelectMenuType::Text,
		max_values: None,
		min_values: None,
		options: Some(options),
		placeholder: Some(String::from("Server")),
	};
	vec![Component::ActionRow(ActionRow {
		components: vec![Component::SelectMenu(select_menu)],
	})]
}

#[cfg(test)]
mod tests {
	use super::*;

	fn choices(count: u64) -> Vec<GuildChoice> {
		(1..=count)
			.map(|id| GuildChoice {
				guild_id: Id::new(id),
				name: format!("Server {}", id),
			})
			.collect()
	}

	#[test]
	fn select_menu_lists_each_server() {
		let components = guild_select_components("xyz", &choices(2));
		let Some(Component::ActionRow(row)) = components.first() else {
			panic!("expected an action row");
		};
		let Some(Component::SelectMenu(menu)) = row.components.first() else {
			panic!("expected a select menu");
		};
		assert_eq!(menu.custom_id, "create_ticket/xyz/select_guild");
		let values: Vec<&str> = menu
			.options
			.iter()
			.flatten()
			.map(|option| option.value.as_str())
			.collect();
		assert_eq!(values, vec!["1", "2"]);
	}

	#[test]
	fn select_menu_is_capped() {
		let components = guild_select_components("xyz", &choices(40));
		let Some(Component::ActionRow(row)) = components.first() else {
			panic!("expected an action row");
		};
		let Some(Component::SelectMenu(menu)) = row.components.first() else {
			panic!("expected a select menu");
		};
		assert_eq!(menu.options.as_ref().map(Vec::len), Some(MAX_GUILD_CHOICES));
	}

	#[test]
	fn choice_lookup_only_accepts_candidates() {
		let pending = PendingTicketCreation {
			user: Id::new(1),
			dm_channel: Id::new(2),
			first_message: InitialTicketMessage {
				id: Id::new(3),
				content: String::from("Hello"),
				attachment_urls: Vec::new(),
			},
			candidates: choices(2),
			prompt_message: None,
		};
		assert!(pending.choice(Id::new(2)).is_some());
		assert!(pending.choice(Id::new(9)).is_none());
	}
}
