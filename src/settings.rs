// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-guild settings stored as a JSON document alongside the guild configuration.
//!
//! Settings are read by dotted key (for example `tickets.closeConfirmation`). Any missing key, or any value that
//! doesn't have the expected shape, resolves to the default the caller passes in, so a guild that never changed a
//! setting gets the bot-wide configuration.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

pub const CLOSE_CONFIRMATION: &str = "tickets.closeConfirmation";
pub const TRANSCRIPTS: &str = "tickets.transcripts";
pub const LOGS_ENABLED: &str = "tickets.logsEnabled";
pub const MAX_OPEN_TICKETS: &str = "tickets.maxOpenTickets";
pub const AUTO_CLOSE_ENABLED: &str = "tickets.autoClose.enabled";
pub const AUTO_CLOSE_INACTIVE_HOURS: &str = "tickets.autoClose.inactiveHours";
pub const ANONYMOUS_STAFF: &str = "tickets.anonymousStaff";
pub const EMBED_COLOR: &str = "appearance.embedColor";

/// The settings keys the bot reads. Others can be stored but have no effect.
pub const KNOWN_KEYS: [&str; 8] = [
	CLOSE_CONFIRMATION,
	TRANSCRIPTS,
	LOGS_ENABLED,
	MAX_OPEN_TICKETS,
	AUTO_CLOSE_ENABLED,
	AUTO_CLOSE_INACTIVE_HOURS,
	ANONYMOUS_STAFF,
	EMBED_COLOR,
];

#[derive(Clone, Debug, Default, PartialEq)]
pub struct GuildSettings(pub Value);

impl GuildSettings {
	pub fn new(document: Value) -> Self {
		Self(document)
	}

	pub fn into_value(self) -> Value {
		self.0
	}

	/// Looks up the raw value at a dotted key.
	pub fn get_raw(&self, key: &str) -> Option<&Value> {
		let mut current = &self.0;
		for segment in key.split('.') {
			current = current.as_object()?.get(segment)?;
		}
		Some(current)
	}

	/// Gets the setting at the dotted key, falling back to `default` if it's unset or malformed.
	pub fn get_setting<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
		match self.get_raw(key) {
			Some(Value::Null) | None => default,
			Some(value) => serde_json::from_value(value.clone()).unwrap_or(default),
		}
	}

	/// Sets the setting at the dotted key. Intermediate values that aren't objects are replaced by objects.
	pub fn set_setting(&mut self, key: &str, value: Value) {
		let segments: Vec<&str> = key.split('.').collect();
		let Some((last, parents)) = segments.split_last() else {
			return;
		};

		let mut current = &mut self.0;
		for segment in parents {
			if !current.is_object() {
				*current = Value::Object(Map::new());
			}
			let Some(map) = current.as_object_mut() else {
				return;
			};
			current = map
				.entry(segment.to_string())
				.or_insert_with(|| Value::Object(Map::new()));
		}
		if !current.is_object() {
			*current = Value::Object(Map::new());
		}
		if let Some(map) = current.as_object_mut() {
			map.insert(last.to_string(), value);
		}
	}
}

/// Parses a value entered by a user for a setting. Anything that isn't valid JSON is stored as a string.
pub fn parse_setting_value(input: &str) -> Value {
	serde_json::from_str(input).unwrap_or_else(|_| Value::String(input.to_string()))
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn missing_keys_use_default() {
		let settings = GuildSettings::new(json!({}));
		assert!(settings.get_setting(CLOSE_CONFIRMATION, true));
		assert_eq!(settings.get_setting(AUTO_CLOSE_INACTIVE_HOURS, 72u32), 72);
	}

	#[test]
	fn nested_keys_are_read() {
		let settings = GuildSettings::new(json!({
			"tickets": { "closeConfirmation": false, "autoClose": { "inactiveHours": 12 } }
		}));
		assert!(!settings.get_setting(CLOSE_CONFIRMATION, true));
		assert_eq!(settings.get_setting(AUTO_CLOSE_INACTIVE_HOURS, 72u32), 12);
	}

	#[test]
	fn malformed_values_use_default() {
		let settings = GuildSettings::new(json!({ "tickets": { "closeConfirmation": "sometimes" } }));
		assert!(settings.get_setting(CLOSE_CONFIRMATION, true));

		let settings = GuildSettings::new(json!({ "tickets": 4 }));
		assert!(!settings.get_setting(LOGS_ENABLED, false));
	}

	#[test]
	fn set_creates_intermediate_objects() {
		let mut settings = GuildSettings::default();
		settings.set_setting(AUTO_CLOSE_ENABLED, json!(false));
		assert_eq!(settings.0, json!({ "tickets": { "autoClose": { "enabled": false } } }));
		assert!(!settings.get_setting(AUTO_CLOSE_ENABLED, true));
	}

	#[test]
	fn set_keeps_sibling_values() {
		let mut settings = GuildSettings::new(json!({ "tickets": { "transcripts": false } }));
		settings.set_setting(CLOSE_CONFIRMATION, json!(false));
		assert_eq!(
			settings.0,
			json!({ "tickets": { "transcripts": false, "closeConfirmation": false } })
		);
	}

	#[test]
	fn set_replaces_scalar_intermediates() {
		let mut settings = GuildSettings::new(json!({ "appearance": "blue" }));
		settings.set_setting(EMBED_COLOR, json!("#ff0000"));
		assert_eq!(settings.get_setting(EMBED_COLOR, String::new()), "#ff0000");
	}

	#[test]
	fn user_values_parse_as_json_or_string() {
		assert_eq!(parse_setting_value("true"), json!(true));
		assert_eq!(parse_setting_value("48"), json!(48));
		assert_eq!(parse_setting_value("#94f7f1"), json!("#94f7f1"));
	}
}
