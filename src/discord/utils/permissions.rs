// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use twilight_model::channel::permission_overwrite::{PermissionOverwrite, PermissionOverwriteType};
use twilight_model::guild::Permissions;
use twilight_model::id::Id;
use twilight_model::id::marker::{GuildMarker, RoleMarker, UserMarker};

/// Prefix for the names of ticket channels. Messages in channels with other names are never treated as ticket traffic.
pub const TICKET_CHANNEL_PREFIX: &str = "modmail-";

/// What staff (and the bot) need to work in a ticket channel
pub fn ticket_channel_permissions() -> Permissions {
	Permissions::VIEW_CHANNEL
		| Permissions::READ_MESSAGE_HISTORY
		| Permissions::SEND_MESSAGES
		| Permissions::EMBED_LINKS
		| Permissions::ATTACH_FILES
		| Permissions::ADD_REACTIONS
}

/// Permission overwrites for a new ticket channel: hidden from everyone but staff and the bot
pub fn ticket_channel_overwrites(
	guild_id: Id<GuildMarker>,
	staff_role: Id<RoleMarker>,
	bot_user: Id<UserMarker>,
) -> Vec<PermissionOverwrite> {
	let everyone_role: Id<RoleMarker> = guild_id.cast();
	vec![
		PermissionOverwrite {
			allow: Permissions::empty(),
			deny: Permissions::VIEW_CHANNEL,
			id: everyone_role.cast(),
			kind: PermissionOverwriteType::Role,
		},
		PermissionOverwrite {
			allow: ticket_channel_permissions(),
			deny: Permissions::empty(),
			id: staff_role.cast(),
			kind: PermissionOverwriteType::Role,
		},
		PermissionOverwrite {
			allow: ticket_channel_permissions() | Permissions::MANAGE_CHANNELS,
			deny: Permissions::empty(),
			id: bot_user.cast(),
			kind: PermissionOverwriteType::Member,
		},
	]
}

/// Builds a channel name for a user's ticket. Discord lowercases text channel names and only keeps a limited
/// character set, so the name is normalized the same way to keep it recognizable.
pub fn ticket_channel_name(username: &str) -> String {
	let mut normalized = String::new();
	for character in username.chars().flat_map(char::to_lowercase) {
		if character.is_alphanumeric() || character == '_' || character == '-' {
			normalized.push(character);
		} else if !normalized.ends_with('-') {
			normalized.push('-');
		}
	}
	let normalized = normalized.trim_matches('-');
	let normalized = if normalized.is_empty() { "user" } else { normalized };
	let name: String = format!("{}{}", TICKET_CHANNEL_PREFIX, normalized);
	name.chars().take(100).collect()
}

pub fn is_ticket_channel_name(name: &str) -> bool {
	name.starts_with(TICKET_CHANNEL_PREFIX)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn channel_names_are_normalized() {
		assert_eq!(ticket_channel_name("Childe"), "modmail-childe");
		assert_eq!(ticket_channel_name("some user.name"), "modmail-some-user-name");
		assert_eq!(ticket_channel_name("..."), "modmail-user");
		assert!(is_ticket_channel_name(&ticket_channel_name("anyone")));
	}

	#[test]
	fn long_names_fit_the_channel_limit() {
		let name = ticket_channel_name(&"a".repeat(200));
		assert_eq!(name.chars().count(), 100);
	}

	#[test]
	fn everyone_is_denied_and_staff_allowed() {
		let overwrites = ticket_channel_overwrites(Id::new(1), Id::new(2), Id::new(3));
		assert_eq!(overwrites.len(), 3);
		assert_eq!(overwrites[0].id.get(), 1);
		assert_eq!(overwrites[0].deny, Permissions::VIEW_CHANNEL);
		assert!(overwrites[0].allow.is_empty());
		assert_eq!(overwrites[1].id.get(), 2);
		assert!(overwrites[1].allow.contains(Permissions::SEND_MESSAGES));
		assert!(overwrites[1].deny.is_empty());
		assert_eq!(overwrites[2].kind, PermissionOverwriteType::Member);
		assert!(overwrites[2].allow.contains(Permissions::MANAGE_CHANNELS));
	}
}
