// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fmt;

pub const NOT_SET_UP_FOR_GUILD: &str =
	"Error: Bot has not been set up. Please ask an administrator to run the /setup command.";
pub const NOT_AN_ACTIVE_TICKET: &str =
	"Error: This channel is not an active ticket or the ticket could not be found in the database.";
pub const NO_ACTIVE_TICKETS: &str = "You don't have any active tickets. Just send me a message to create a new one!";
pub const LIST_TICKETS_FAILED: &str = "There was an error retrieving your tickets. Please try again later.";
pub const COMMAND_FAILED: &str = "There was an error trying to execute that command!";
pub const CLOSING_TICKET: &str = "Closing ticket...";
pub const CLOSE_CANCELED: &str = "Ticket close canceled.";
pub const CLOSE_TIMED_OUT: &str = "Ticket close canceled - confirmation timed out.";
pub const ALREADY_CLOSED: &str = "This ticket has already been closed by someone else.";
pub const DUPLICATE_CLOSE: &str = "Continuing with ticket closure...";
pub const TICKET_CLOSED: &str = "Ticket closed. This channel will be deleted in a few seconds.";
pub const CLOSE_FAILED: &str = "An error occurred while closing the ticket.";
pub const DEFAULT_CLOSE_REASON: &str = "No reason provided";
pub const AUTO_CLOSE_REASON: &str = "Automatically closed due to inactivity";
pub const CHANNEL_DELETED_REASON: &str = "Ticket channel was deleted";
pub const TICKET_CREATION_FAILED: &str =
	"Your ticket couldn't be created right now. Please try again in a little while.";
pub const TICKET_CREATION_EXPIRED: &str = "Ticket creation expired. Send your message again to start over.";
pub const NO_MODMAIL_SERVERS: &str =
	"I couldn't find a server we share that accepts modmail tickets, so your message wasn't sent.";
pub const USER_DELIVERY_FAILED: &str =
	"The message couldn't be delivered to the user. They may have left the server or closed their DMs.";

pub fn missing_staff_role_message(role_mention: impl fmt::Display) -> String {
	format!(
		"You do not have permission to use this channel. You need the {} role.",
		role_mention
	)
}

pub fn cooldown_message(seconds: u64) -> String {
	let unit = if seconds == 1 { "second" } else { "seconds" };
	format!("You're doing that too fast! Please wait {} {} and try again.", seconds, unit)
}

pub fn already_open_message(guild_name: &str) -> String {
	format!(
		"You already have an open ticket with **{}**. Anything you send me will be added to it.",
		guild_name
	)
}

pub fn max_open_tickets_message(max_open_tickets: u32) -> String {
	format!(
		"You already have the maximum number of open tickets ({}). Please wait for one of them to be closed.",
		max_open_tickets
	)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn cooldown_message_pluralizes() {
		assert_eq!(
			cooldown_message(1),
			"You're doing that too fast! Please wait 1 second and try again."
		);
		assert_eq!(
			cooldown_message(60),
			"You're doing that too fast! Please wait 60 seconds and try again."
		);
	}

	#[test]
	fn staff_role_message_includes_role() {
		assert_eq!(
			missing_staff_role_message("<@&5>"),
			"You do not have permission to use this channel. You need the <@&5> role."
		);
	}
}
