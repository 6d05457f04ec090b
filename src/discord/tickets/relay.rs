// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::close::close_for_deleted_channel;
use super::{
	attachment_urls, guild_config, open_tickets_for_user, react_delivered, record_ticket_message, send_direct_message,
};
use crate::discord::context::BotContext;
use crate::discord::state::close::ClosingTickets;
use crate::discord::state::cooldowns::{CooldownKind, remaining_seconds};
use crate::discord::state::subscriptions::Subscriptions;
use crate::discord::utils::embeds::{EmbedStyle, staff_relay_embed, user_relay_embed};
use crate::discord::utils::responses::{USER_DELIVERY_FAILED, cooldown_message};
use crate::discord::utils::timestamp::datetime_from_timestamp;
use crate::discord::utils::users::message_author_name;
use crate::model::{Ticket, database_id_from_discord_id};
use crate::schema::ticket_messages;
use crate::settings;
use chrono::Utc;
use diesel::prelude::*;
use miette::IntoDiagnostic;
use twilight_http::error::{Error as HttpError, ErrorType};
use twilight_http::response::StatusCode;
use twilight_mention::fmt::Mention;
use twilight_model::channel::message::{AllowedMentions, Message, MentionType};
use twilight_model::id::Id;
use twilight_model::id::marker::UserMarker;

const ANONYMOUS_STAFF_NAME: &str = "Staff";
const TICKET_CLOSING_MESSAGE: &str =
	"This ticket is being closed, so your message wasn't sent. Send it again in a moment to open a new ticket.";

fn is_not_found(error: &HttpError) -> bool {
	matches!(error.kind(), ErrorType::Response { status, .. } if *status == StatusCode::NOT_FOUND)
}

/// Picks which of the user's open tickets a DM belongs to. A reply to a relayed staff message goes to that message's
/// ticket; anything else goes to the most recently active ticket.
fn choose_ticket(open_tickets: Vec<Ticket>, replied_ticket: Option<&str>) -> Option<Ticket> {
	if let Some(replied_ticket) = replied_ticket {
		if let Some(ticket) = open_tickets.iter().find(|ticket| ticket.id == replied_ticket) {
			return Some(ticket.clone());
		}
	}
	open_tickets.into_iter().max_by_key(|ticket| ticket.last_activity)
}

fn subscriber_mentions(subscribers: &[Id<UserMarker>]) -> String {
	subscribers
		.iter()
		.map(|user| user.mention().to_string())
		.collect::<Vec<_>>()
		.join(" ")
}

/// Relays a DM from a user to the staff channel of one of their open tickets.
///
/// Returns whether a ticket took the message. `false` means the user has no usable open ticket and a new one should
/// be created for the message.
pub async fn relay_user_message(ctx: &BotContext, message: &Message) -> miette::Result<bool> {
	let (open_tickets, replied_ticket) = {
		let mut db_connection = ctx.db_connection_pool.get().into_diagnostic()?;
		let open_tickets = open_tickets_for_user(&mut db_connection, message.author.id).into_diagnostic()?;
		let replied_ticket: Option<String> = match message.reference.as_ref().and_then(|reference| reference.message_id)
		{
			Some(referenced_message) => ticket_messages::table
				.filter(
					ticket_messages::relayed_message.eq(Some(database_id_from_discord_id(referenced_message.get()))),
				)
				.select(ticket_messages::ticket)
				.first(&mut db_connection)
				.optional()
				.into_diagnostic()?,
			None => None,
		};
		(open_tickets, replied_ticket)
	};

	let Some(ticket) = choose_ticket(open_tickets, replied_ticket.as_deref()) else {
		return Ok(false);
	};
	let staff_channel = ticket.get_channel();

	let (is_closing, subscribers) = {
		let state = ctx.bot_state.read().await;
		let is_closing = state
			.get::<ClosingTickets>()
			.is_some_and(|closing| closing.is_closing(staff_channel));
		let subscribers = state
			.get::<Subscriptions>()
			.map(|subscriptions| subscriptions.subscribers(staff_channel))
			.unwrap_or_default();
		(is_closing, subscribers)
	};
	if is_closing {
		ctx.http_client
			.create_message(message.channel_id)
			.reply(message.id)
			.content(TICKET_CLOSING_MESSAGE)
			.await
			.into_diagnostic()?;
		return Ok(true);
	}

	if let Err(remaining) = ctx.check_cooldown(CooldownKind::TicketMessage, message.author.id).await {
		ctx.http_client
			.create_message(message.channel_id)
			.reply(message.id)
			.content(&cooldown_message(remaining_seconds(remaining)))
			.await
			.into_diagnostic()?;
		return Ok(true);
	}

	let guild_config = {
		let mut db_connection = ctx.db_connection_pool.get().into_diagnostic()?;
		guild_config(&mut db_connection, ticket.get_guild()).into_diagnostic()?
	};
	let style = EmbedStyle::for_guild(&ctx.config, guild_config.as_ref());
	let urls = attachment_urls(message);
	let embed = user_relay_embed(
		&style,
		&message_author_name(message),
		&message.content,
		&urls,
		message.timestamp,
	)
	.into_diagnostic()?;
	let embeds = [embed];

	let mentions = subscriber_mentions(&subscribers);
	let allowed_mentions = AllowedMentions {
		parse: Vec::<MentionType>::new(),
		replied_user: false,
		roles: Vec::new(),
		users: subscribers,
	};
	let mut relay = ctx
		.http_client
		.create_message(staff_channel)
		.embeds(&embeds)
		.allowed_mentions(Some(&allowed_mentions));
	if !mentions.is_empty() {
		relay = relay.content(&mentions);
	}

	let relayed_message = match relay.await {
		Ok(response) => response.model().await.into_diagnostic()?,
		Err(error) if is_not_found(&error) => {
			// The staff channel was deleted without the ticket being closed
			tracing::info!(ticket = %ticket.id, "Ticket channel is gone; closing the ticket");
			match close_for_deleted_channel(ctx, staff_channel).await {
				Ok(outcome) => tracing::debug!(ticket = %ticket.id, ?outcome, "Closed ticket with a missing channel"),
				Err(error) => return Err(error).into_diagnostic(),
			}
			ctx.reset_cooldown(CooldownKind::TicketMessage, message.author.id).await;
			return Ok(false);
		}
		Err(error) => return Err(error).into_diagnostic(),
	};

	react_delivered(&ctx.http_client, message.channel_id, message.id).await;

	let send_time = datetime_from_timestamp(&message.timestamp).unwrap_or_else(Utc::now);
	let mut db_connection = ctx.db_connection_pool.get().into_diagnostic()?;
	record_ticket_message(
		&mut db_connection,
		&ticket,
		message.author.id,
		false,
		&message.content,
		message.id,
		Some(relayed_message.id),
		send_time,
	)
	.into_diagnostic()?;

	Ok(true)
}

/// Relays a staff message from a ticket channel to the ticket's user
pub async fn relay_staff_message(
	ctx: &BotContext,
	message: &Message,
	ticket: &Ticket,
	content: &str,
) -> miette::Result<()> {
	if let Err(remaining) = ctx.check_cooldown(CooldownKind::StaffResponse, message.author.id).await {
		ctx.http_client
			.create_message(message.channel_id)
			.reply(message.id)
			.content(&cooldown_message(remaining_seconds(remaining)))
			.await
			.into_diagnostic()?;
		return Ok(());
	}

	let guild_config = {
		let mut db_connection = ctx.db_connection_pool.get().into_diagnostic()?;
		guild_config(&mut db_connection, ticket.get_guild()).into_diagnostic()?
	};
	let anonymous = guild_config
		.as_ref()
		.is_some_and(|config| config.settings().get_setting(settings::ANONYMOUS_STAFF, false));
	let author_name = if anonymous {
		String::from(ANONYMOUS_STAFF_NAME)
	} else {
		message_author_name(message)
	};
	let guild_name = ctx
		.guild_name(ticket.get_guild())
		.unwrap_or_else(|| String::from("Unknown Server"));
	let style = EmbedStyle::for_guild(&ctx.config, guild_config.as_ref());
	let urls = attachment_urls(message);
	let embed = staff_relay_embed(&style, &author_name, &guild_name, content, &urls, message.timestamp)
		.into_diagnostic()?;

	let relayed_message = match send_direct_message(&ctx.http_client, ticket.get_with_user(), &[embed]).await {
		Ok(relayed_message) => relayed_message,
		Err(error) => {
			tracing::info!(source = ?error, ticket = %ticket.id, "Couldn't relay staff message to user");
			ctx.http_client
				.create_message(message.channel_id)
				.reply(message.id)
				.content(USER_DELIVERY_FAILED)
				.await
				.into_diagnostic()?;
			return Ok(());
		}
	};

	react_delivered(&ctx.http_client, message.channel_id, message.id).await;

	let send_time = datetime_from_timestamp(&message.timestamp).unwrap_or_else(Utc::now);
	let mut db_connection = ctx.db_connection_pool.get().into_diagnostic()?;
	record_ticket_message(
		&mut db_connection,
		ticket,
		message.author.id,
		true,
		content,
		message.id,
		Some(relayed_message.id),
		send_time,
	)
	.into_diagnostic()?;

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::{Duration, TimeZone};

	fn ticket(id: &str, hours_since_activity: i64) -> Ticket {
		let base = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
		Ticket {
			id: id.to_string(),
			guild: 1,
			channel: 2,
			with_user: 3,
			closed: false,
			created_at: base,
			last_activity: base - Duration::hours(hours_since_activity),
			topic: None,
			closed_at: None,
			closed_by: None,
			close_reason: None,
		}
	}

	#[test]
	fn replies_go_to_the_replied_ticket() {
		let tickets = vec![ticket("recent", 1), ticket("older", 10)];
		let chosen = choose_ticket(tickets, Some("older")).unwrap();
		assert_eq!(chosen.id, "older");
	}

	#[test]
	fn other_messages_go_to_the_most_recently_active_ticket() {
		let tickets = vec![ticket("older", 10), ticket("recent", 1)];
		assert_eq!(choose_ticket(tickets.clone(), None).unwrap().id, "recent");
		assert_eq!(choose_ticket(tickets, Some("closed-ticket")).unwrap().id, "recent");
	}

	#[test]
	fn no_open_tickets_means_no_ticket() {
		assert!(choose_ticket(Vec::new(), None).is_none());
	}

	#[test]
	fn subscribers_are_mentioned_in_order() {
		assert_eq!(subscriber_mentions(&[Id::new(5), Id::new(7)]), "<@5> <@7>");
		assert_eq!(subscriber_mentions(&[]), "");
	}
}
