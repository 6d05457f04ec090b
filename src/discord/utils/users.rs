// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use miette::Diagnostic;
use thiserror::Error;
use twilight_http::client::Client;
use twilight_http::error::{Error as HttpError, ErrorType};
use twilight_http::response::{DeserializeBodyError, StatusCode};
use twilight_model::channel::message::Message;
use twilight_model::id::Id;
use twilight_model::id::marker::{GuildMarker, UserMarker};

/// Error data for getting user/member data
#[derive(Debug, Diagnostic, Error)]
pub enum UserDataError {
	#[error("HTTP error: {0}")]
	Http(#[from] HttpError),
	#[error("deserialization error: {0}")]
	Deserialize(#[from] DeserializeBodyError),
}

/// Checks whether the user is a member of the guild
pub async fn is_guild_member(
	http_client: &Client,
	guild_id: Id<GuildMarker>,
	user_id: Id<UserMarker>,
) -> Result<bool, UserDataError> {
	match http_client.guild_member(guild_id, user_id).await {
		Ok(_) => Ok(true),
		Err(error) => {
			if let ErrorType::Response { status, .. } = error.kind() {
				if *status == StatusCode::NOT_FOUND || *status == StatusCode::FORBIDDEN {
					return Ok(false);
				}
			}
			Err(error.into())
		}
	}
}

/// Gets the display name of a user in a guild, falling back to their global name and then their username
pub async fn member_display_name(
	http_client: &Client,
	guild_id: Id<GuildMarker>,
	user_id: Id<UserMarker>,
) -> Result<String, UserDataError> {
	let member_response = http_client.guild_member(guild_id, user_id).await?;
	let member = member_response.model().await?;
	Ok(member.nick.or(member.user.global_name).unwrap_or(member.user.name))
}

/// Gets the name to show for the author of a message, preferring their server nickname where the message has one
pub fn message_author_name(message: &Message) -> String {
	message
		.member
		.as_ref()
		.and_then(|member| member.nick.clone())
		.or_else(|| message.author.global_name.clone())
		.unwrap_or_else(|| message.author.name.clone())
}
