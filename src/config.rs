// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use kdl::{KdlDocument, KdlNode, KdlValue};
use miette::{Diagnostic, IntoDiagnostic};
use thiserror::Error;
use tokio::fs::read_to_string;

pub const DEFAULT_PREFIX: &str = "=";
pub const DEFAULT_EMBED_COLOR: &str = "#94f7f1";
pub const DEFAULT_FOOTER: &str = "Made by @childeetos";
pub const DEFAULT_STATUS: &str = "Playing tag with Cacucu";

pub async fn parse_config(config_path: &str) -> miette::Result<ConfigDocument> {
	let config_file_contents = read_to_string(config_path).await.into_diagnostic()?;
	let config = parse_config_str(&config_file_contents)?;
	Ok(config)
}

pub fn parse_config_str(contents: &str) -> miette::Result<ConfigDocument> {
	let document: KdlDocument = contents.parse()?;
	Ok(ConfigDocument::from_document(&document)?)
}

#[derive(Debug, Diagnostic, Error, PartialEq)]
pub enum ConfigError {
	#[error("the required configuration value `{0}` is missing")]
	#[diagnostic(code(modmail::config::missing))]
	Missing(String),
	#[error("the configuration value `{node}` must be {expected}")]
	#[diagnostic(code(modmail::config::wrong_type))]
	WrongType { node: String, expected: &'static str },
}

#[derive(Debug)]
pub struct ConfigDocument {
	pub discord_token: String,
	pub prefix: String,
	pub embed_color: String,
	pub footer: String,
	pub status: String,
	pub database: DatabaseConfig,
	pub cooldowns: CooldownsConfig,
	pub tickets: TicketsConfig,
}

#[derive(Debug)]
pub struct DatabaseConfig {
	pub host: String,
	pub port: Option<u16>,
	pub username: String,
	pub password: String,
	pub database: String,
}

/// Cooldown windows, all in seconds
#[derive(Debug)]
pub struct CooldownsConfig {
	pub commands: u64,
	pub new_ticket: u64,
	pub ticket_message: u64,
	pub staff_response: u64,
}

impl Default for CooldownsConfig {
	fn default() -> Self {
		Self {
			commands: 3,
			new_ticket: 60,
			ticket_message: 2,
			staff_response: 1,
		}
	}
}

#[derive(Debug)]
pub struct TicketsConfig {
	pub close_confirmation: bool,
	pub transcripts: bool,
	pub logs_enabled: bool,
	pub max_open_tickets: u32,
	pub auto_close: AutoCloseConfig,
}

impl Default for TicketsConfig {
	fn default() -> Self {
		Self {
			close_confirmation: true,
			transcripts: true,
			logs_enabled: true,
			max_open_tickets: 3,
			auto_close: AutoCloseConfig::default(),
		}
	}
}

#[derive(Debug)]
pub struct AutoCloseConfig {
	pub enabled: bool,
	pub inactive_hours: u32,
}

impl Default for AutoCloseConfig {
	fn default() -> Self {
		Self {
			enabled: true,
			inactive_hours: 72,
		}
	}
}

/// A config value type that can be read from a single KDL value
trait ConfigValue: Sized {
	const EXPECTED: &'static str;

	fn from_kdl(value: &KdlValue) -> Option<Self>;
}

impl ConfigValue for String {
	const EXPECTED: &'static str = "a string";

	fn from_kdl(value: &KdlValue) -> Option<Self> {
		value.as_string().map(String::from)
	}
}

impl ConfigValue for bool {
	const EXPECTED: &'static str = "a boolean";

	fn from_kdl(value: &KdlValue) -> Option<Self> {
		value.as_bool()
	}
}

macro_rules! integer_config_value {
	($($integer:ty),*) => {
		$(
			impl ConfigValue for $integer {
				const EXPECTED: &'static str = concat!("an integer that fits in ", stringify!($integer));

				fn from_kdl(value: &KdlValue) -> Option<Self> {
					value.as_integer().and_then(|value| <$integer>::try_from(value).ok())
				}
			}
		)*
	};
}

integer_config_value!(u16, u32, u64);

/// One level of the config document, remembering its path for error messages
struct Section<'a> {
	path: &'static str,
	document: Option<&'a KdlDocument>,
}

impl<'a> Section<'a> {
	fn child(&self, name: &'static str, path: &'static str) -> Section<'a> {
		Section {
			path,
			document: self
				.document
				.and_then(|document| document.get(name))
				.and_then(|node| node.children()),
		}
	}

	fn node(&self, name: &str) -> Option<&'a KdlNode> {
		self.document.and_then(|document| document.get(name))
	}

	fn node_path(&self, name: &str) -> String {
		if self.path.is_empty() {
			name.to_string()
		} else {
			format!("{}.{}", self.path, name)
		}
	}

	/// Reads the first argument of the named child node
	fn optional<T: ConfigValue>(&self, name: &str) -> Result<Option<T>, ConfigError> {
		let value = self
			.node(name)
			.and_then(|node| node.entries().iter().find(|entry| entry.name().is_none()))
			.map(|entry| entry.value());
		self.convert(value, name)
	}

	fn required<T: ConfigValue>(&self, name: &str) -> Result<T, ConfigError> {
		self.optional(name)?
			.ok_or_else(|| ConfigError::Missing(self.node_path(name)))
	}

	fn or<T: ConfigValue>(&self, name: &str, default: T) -> Result<T, ConfigError> {
		Ok(self.optional(name)?.unwrap_or(default))
	}

	/// Reads a property of the named child node
	fn property_or<T: ConfigValue>(&self, node: &str, property: &str, default: T) -> Result<T, ConfigError> {
		let value = self.node(node).and_then(|node| node.get(property));
		Ok(self
			.convert(value, &format!("{}.{}", node, property))?
			.unwrap_or(default))
	}

	fn convert<T: ConfigValue>(&self, value: Option<&KdlValue>, name: &str) -> Result<Option<T>, ConfigError> {
		match value {
			Some(value) => T::from_kdl(value).map(Some).ok_or_else(|| ConfigError::WrongType {
				node: self.node_path(name),
				expected: T::EXPECTED,
			}),
			None => Ok(None),
		}
	}
}

impl ConfigDocument {
	fn from_document(document: &KdlDocument) -> Result<Self, ConfigError> {
		let root = Section {
			path: "",
			document: Some(document),
		};
		let prefix = root.or("prefix", String::from(DEFAULT_PREFIX))?;
		if prefix.is_empty() {
			return Err(ConfigError::WrongType {
				node: String::from("prefix"),
				expected: "a non-empty string",
			});
		}

		if root.node("database").is_none() {
			return Err(ConfigError::Missing(String::from("database")));
		}
		let database = root.child("database", "database");
		let database = DatabaseConfig {
			host: database.required("host")?,
			port: database.optional("port")?,
			username: database.required("username")?,
			password: database.required("password")?,
			database: database.required("database")?,
		};

		let cooldowns = root.child("cooldowns", "cooldowns");
		let cooldown_defaults = CooldownsConfig::default();
		let cooldowns = CooldownsConfig {
			commands: cooldowns.or("commands", cooldown_defaults.commands)?,
			new_ticket: cooldowns.or("new_ticket", cooldown_defaults.new_ticket)?,
			ticket_message: cooldowns.or("ticket_message", cooldown_defaults.ticket_message)?,
			staff_response: cooldowns.or("staff_response", cooldown_defaults.staff_response)?,
		};

		let tickets = root.child("tickets", "tickets");
		let ticket_defaults = TicketsConfig::default();
		let auto_close = AutoCloseConfig {
			enabled: tickets.property_or("auto_close", "enabled", ticket_defaults.auto_close.enabled)?,
			inactive_hours: tickets.property_or(
				"auto_close",
				"inactive_hours",
				ticket_defaults.auto_close.inactive_hours,
			)?,
		};
		if auto_close.inactive_hours == 0 {
			return Err(ConfigError::WrongType {
				node: String::from("tickets.auto_close.inactive_hours"),
				expected: "at least 1",
			});
		}
		let tickets = TicketsConfig {
			close_confirmation: tickets.or("close_confirmation", ticket_defaults.close_confirmation)?,
			transcripts: tickets.or("transcripts", ticket_defaults.transcripts)?,
			logs_enabled: tickets.or("logs_enabled", ticket_defaults.logs_enabled)?,
			max_open_tickets: tickets.or("max_open_tickets", ticket_defaults.max_open_tickets)?,
			auto_close,
		};

		Ok(Self {
			discord_token: root.required("discord_token")?,
			prefix,
			embed_color: root.or("embed_color", String::from(DEFAULT_EMBED_COLOR))?,
			footer: root.or("footer", String::from(DEFAULT_FOOTER))?,
			status: root.or("status", String::from(DEFAULT_STATUS))?,
			database,
			cooldowns,
			tickets,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const MINIMAL: &str = r#"
discord_token "token-value"
database {
	host "localhost"
	username "modmail"
	password "hunter2"
	database "modmail"
}
"#;

	fn parse_document(contents: &str) -> Result<ConfigDocument, ConfigError> {
		let document: KdlDocument = contents.parse().unwrap();
		ConfigDocument::from_document(&document)
	}

	#[test]
	fn minimal_config_uses_defaults() {
		let config = parse_config_str(MINIMAL).unwrap();
		assert_eq!(config.discord_token, "token-value");
		assert_eq!(config.prefix, "=");
		assert_eq!(config.embed_color, DEFAULT_EMBED_COLOR);
		assert_eq!(config.database.port, None);
		assert_eq!(config.cooldowns.new_ticket, 60);
		assert_eq!(config.cooldowns.staff_response, 1);
		assert!(config.tickets.close_confirmation);
		assert_eq!(config.tickets.max_open_tickets, 3);
		assert_eq!(config.tickets.auto_close.inactive_hours, 72);
	}

	#[test]
	fn overrides_are_read() {
		let contents = format!(
			"{}\n{}",
			MINIMAL,
			r#"
prefix "!"
cooldowns {
	new_ticket 120
}
tickets {
	close_confirmation #false
	max_open_tickets 1
	auto_close enabled=#false inactive_hours=24
}
"#
		);
		let config = parse_config_str(&contents).unwrap();
		assert_eq!(config.prefix, "!");
		assert_eq!(config.cooldowns.new_ticket, 120);
		assert_eq!(config.cooldowns.commands, 3);
		assert!(!config.tickets.close_confirmation);
		assert!(config.tickets.transcripts);
		assert_eq!(config.tickets.max_open_tickets, 1);
		assert!(!config.tickets.auto_close.enabled);
		assert_eq!(config.tickets.auto_close.inactive_hours, 24);
	}

	#[test]
	fn port_is_read() {
		let contents = MINIMAL.replace("host \"localhost\"", "host \"localhost\"\n\tport 5433");
		assert_eq!(parse_document(&contents).unwrap().database.port, Some(5433));
	}

	#[test]
	fn missing_token_is_reported() {
		let error = parse_document("database { host \"localhost\"; username \"u\"; password \"p\"; database \"d\"; }")
			.unwrap_err();
		assert_eq!(error, ConfigError::Missing(String::from("discord_token")));
	}

	#[test]
	fn missing_nested_database_value_names_the_path() {
		let error = parse_document("discord_token \"t\"\ndatabase { host \"localhost\"; }").unwrap_err();
		assert_eq!(error, ConfigError::Missing(String::from("database.username")));
	}

	#[test]
	fn wrong_type_is_reported() {
		let error = parse_document(&format!("{}\ncooldowns {{ commands \"three\"; }}", MINIMAL)).unwrap_err();
		assert!(matches!(error, ConfigError::WrongType { node, .. } if node == "cooldowns.commands"));
	}

	#[test]
	fn out_of_range_port_is_reported() {
		let contents = MINIMAL.replace("host \"localhost\"", "host \"localhost\"\n\tport 70000");
		let error = parse_document(&contents).unwrap_err();
		assert!(matches!(error, ConfigError::WrongType { node, .. } if node == "database.port"));
	}

	#[test]
	fn wrong_property_type_names_the_property() {
		let error = parse_document(&format!("{}\ntickets {{ auto_close enabled=\"yes\"; }}", MINIMAL)).unwrap_err();
		assert!(matches!(error, ConfigError::WrongType { node, .. } if node == "tickets.auto_close.enabled"));
	}

	#[test]
	fn zero_inactive_hours_is_rejected() {
		let error = parse_document(&format!("{}\ntickets {{ auto_close inactive_hours=0; }}", MINIMAL)).unwrap_err();
		assert!(matches!(error, ConfigError::WrongType { node, .. } if node == "tickets.auto_close.inactive_hours"));
	}
}
