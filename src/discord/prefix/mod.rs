// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Text commands that start with the configured prefix

pub mod direct;
pub mod guild;
pub mod staff;

#[derive(Debug, Eq, PartialEq)]
pub struct PrefixCommand<'a> {
	/// The command name, lowercased
	pub name: String,
	pub args: Vec<&'a str>,
	/// Everything after the command name, with its whitespace and line breaks kept
	pub rest: &'a str,
}

/// Splits a prefixed message into its command name and arguments. Returns `None` when the message doesn't start with
/// the prefix or has nothing after it.
pub fn parse_prefix_command<'a>(content: &'a str, prefix: &str) -> Option<PrefixCommand<'a>> {
	if prefix.is_empty() {
		return None;
	}
	let body = content.strip_prefix(prefix)?.trim_start();
	let name_end = body.find(char::is_whitespace).unwrap_or(body.len());
	let (name, rest) = body.split_at(name_end);
	if name.is_empty() {
		return None;
	}
	let rest = rest.trim();
	Some(PrefixCommand {
		name: name.to_lowercase(),
		args: rest.split_whitespace().collect(),
		rest,
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn commands_are_split_and_lowercased() {
		let command = parse_prefix_command("=Close  spam   and abuse", "=").unwrap();
		assert_eq!(command.name, "close");
		assert_eq!(command.args, vec!["spam", "and", "abuse"]);
		assert_eq!(command.rest, "spam   and abuse");
	}

	#[test]
	fn unprefixed_messages_are_not_commands() {
		assert_eq!(parse_prefix_command("hello there", "="), None);
		assert_eq!(parse_prefix_command("=", "="), None);
		assert_eq!(parse_prefix_command("=   ", "="), None);
	}

	#[test]
	fn multi_character_prefixes_work() {
		let command = parse_prefix_command("mm!list", "mm!").unwrap();
		assert_eq!(command.name, "list");
		assert!(command.args.is_empty());
		assert_eq!(command.rest, "");
	}

	#[test]
	fn reply_text_keeps_line_breaks() {
		let command = parse_prefix_command("=reply Hi!\nSecond line", "=").unwrap();
		assert_eq!(command.name, "reply");
		assert_eq!(command.rest, "Hi!\nSecond line");
	}

	#[test]
	fn space_after_prefix_is_allowed() {
		let command = parse_prefix_command("= tickets", "=").unwrap();
		assert_eq!(command.name, "tickets");
	}
}
