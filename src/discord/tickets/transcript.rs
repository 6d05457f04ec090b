// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::model::{Ticket, TicketMessage, discord_id_from_database_id};
use std::fmt::Write;

const TRANSCRIPT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Renders a closed ticket's messages as a plain text transcript
pub fn format_transcript(ticket: &Ticket, guild_name: &str, messages: &[TicketMessage]) -> String {
	let mut transcript = String::new();
	let _ = writeln!(transcript, "Modmail transcript for ticket {}", ticket.id);
	let _ = writeln!(transcript, "Server: {}", guild_name);
	let _ = writeln!(transcript, "User: {}", ticket.get_with_user());
	let _ = writeln!(transcript, "Opened: {}", ticket.created_at.format(TRANSCRIPT_TIME_FORMAT));
	if let Some(closed_at) = &ticket.closed_at {
		let _ = writeln!(transcript, "Closed: {}", closed_at.format(TRANSCRIPT_TIME_FORMAT));
	}
	if let Some(reason) = &ticket.close_reason {
		let _ = writeln!(transcript, "Close reason: {}", reason);
	}
	if let Some(topic) = &ticket.topic {
		let _ = writeln!(transcript, "Topic: {}", topic);
	}
	transcript.push('\n');

	for message in messages {
		let side = if message.from_staff { "Staff" } else { "User" };
		let _ = writeln!(
			transcript,
			"[{}] {} {}:",
			message.send_time.format(TRANSCRIPT_TIME_FORMAT),
			side,
			discord_id_from_database_id(message.author)
		);
		for line in message.body.lines() {
			let _ = writeln!(transcript, "    {}", line);
		}
		transcript.push('\n');
	}

	transcript
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::{TimeZone, Utc};

	fn ticket() -> Ticket {
		let opened = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
		Ticket {
			id: String::from("ticket1"),
			guild: 10,
			channel: 20,
			with_user: 30,
			closed: true,
			created_at: opened,
			last_activity: opened,
			topic: Some(String::from("Appeal")),
			closed_at: Some(Utc.with_ymd_and_hms(2025, 6, 1, 13, 30, 0).unwrap()),
			closed_by: Some(40),
			close_reason: Some(String::from("Resolved")),
		}
	}

	fn message(from_staff: bool, author: i64, body: &str, minute: u32) -> TicketMessage {
		TicketMessage {
			id: format!("message{}", minute),
			ticket: String::from("ticket1"),
			author,
			from_staff,
			send_time: Utc.with_ymd_and_hms(2025, 6, 1, 12, minute, 0).unwrap(),
			body: body.to_string(),
			source_message: 1,
			relayed_message: None,
		}
	}

	#[test]
	fn transcript_has_header_and_messages_in_order() {
		let messages = [
			message(false, 30, "Hello\nI need help", 1),
			message(true, 40, "Sure, what's up?", 2),
		];
		let transcript = format_transcript(&ticket(), "Dainsleif Mains", &messages);
		let expected = "Modmail transcript for ticket ticket1\n\
			Server: Dainsleif Mains\n\
			User: 30\n\
			Opened: 2025-06-01 12:00:00 UTC\n\
			Closed: 2025-06-01 13:30:00 UTC\n\
			Close reason: Resolved\n\
			Topic: Appeal\n\
			\n\
			[2025-06-01 12:01:00 UTC] User 30:\n    Hello\n    I need help\n\n\
			[2025-06-01 12:02:00 UTC] Staff 40:\n    Sure, what's up?\n\n";
		assert_eq!(transcript, expected);
	}

	#[test]
	fn empty_ticket_still_has_header() {
		let transcript = format_transcript(&ticket(), "Server", &[]);
		assert!(transcript.starts_with("Modmail transcript for ticket ticket1\n"));
		assert!(transcript.ends_with("Topic: Appeal\n\n"));
	}
}
