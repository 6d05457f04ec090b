// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::transcript::format_transcript;
use super::{guild_config, log_ticket_event, send_direct_message};
use crate::discord::context::BotContext;
use crate::discord::state::close::ClosingTickets;
use crate::discord::state::subscriptions::Subscriptions;
use crate::discord::utils::embeds::{EmbedStyle, ticket_closed_embed, ticket_log_embed};
use crate::discord::utils::responses::{
	ALREADY_CLOSED, CHANNEL_DELETED_REASON, CLOSE_FAILED, DUPLICATE_CLOSE, TICKET_CLOSED,
};
use crate::discord::utils::timestamp::timestamp_from_datetime;
use crate::model::{GuildConfig, Ticket, TicketMessage, database_id_from_discord_id};
use crate::schema::{ticket_messages, tickets};
use crate::settings;
use chrono::Utc;
use diesel::prelude::*;
use diesel::r2d2::PoolError;
use miette::{Diagnostic, IntoDiagnostic};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use twilight_http::client::Client;
use twilight_http::request::AuditLogReason;
use twilight_mention::fmt::Mention;
use twilight_model::http::attachment::Attachment;
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, UserMarker};

/// How long a closed ticket's channel stays around before it's deleted
pub const CHANNEL_DELETE_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Eq, PartialEq)]
pub enum CloseOutcome {
	Closed,
	/// Someone else closed the ticket first
	AlreadyClosed,
	/// A close for the same channel was already in progress
	DuplicateClose,
}

#[derive(Debug, Diagnostic, Error)]
pub enum CloseError {
	#[error("couldn't get a database connection: {0}")]
	Pool(#[from] PoolError),
	#[error("database error: {0}")]
	Database(#[from] diesel::result::Error),
}

/// Closes the open ticket for a channel.
///
/// Only one close per channel runs at a time, and only one close can ever mark the ticket closed; the rest get
/// [CloseOutcome::DuplicateClose] or [CloseOutcome::AlreadyClosed]. Once the ticket is closed, the follow-up work
/// (transcript, notifying the user, logging, deleting the channel) doesn't change the outcome if it fails.
pub async fn close_ticket(
	ctx: &BotContext,
	channel_id: Id<ChannelMarker>,
	closed_by: Id<UserMarker>,
	reason: &str,
) -> Result<CloseOutcome, CloseError> {
	{
		let mut state = ctx.bot_state.write().await;
		let closing = state.entry::<ClosingTickets>().or_insert_with(ClosingTickets::default);
		if !closing.begin(channel_id) {
			return Ok(CloseOutcome::DuplicateClose);
		}
	}

	let result = mark_closed(ctx, channel_id, closed_by, reason);

	if let Ok(Some((ticket, guild_config))) = &result {
		finish_close(ctx, ticket, guild_config.as_ref(), closed_by, reason).await;
	}

	{
		let mut state = ctx.bot_state.write().await;
		if let Some(closing) = state.get_mut::<ClosingTickets>() {
			closing.finish(channel_id);
		}
	}

	match result? {
		Some(_) => Ok(CloseOutcome::Closed),
		None => Ok(CloseOutcome::AlreadyClosed),
	}
}

/// Closes the ticket of a staff channel that no longer exists
pub async fn close_for_deleted_channel(
	ctx: &BotContext,
	channel_id: Id<ChannelMarker>,
) -> Result<CloseOutcome, CloseError> {
	close_ticket(ctx, channel_id, ctx.bot_user_id, CHANNEL_DELETED_REASON).await
}

fn mark_closed(
	ctx: &BotContext,
	channel_id: Id<ChannelMarker>,
	closed_by: Id<UserMarker>,
	reason: &str,
) -> Result<Option<(Ticket, Option<GuildConfig>)>, CloseError> {
	let mut db_connection = ctx.db_connection_pool.get()?;
	let ticket: Option<Ticket> = diesel::update(
		tickets::table.filter(
			tickets::channel
				.eq(database_id_from_discord_id(channel_id.get()))
				.and(tickets::closed.eq(false)),
		),
	)
	.set((
		tickets::closed.eq(true),
		tickets::closed_at.eq(Some(Utc::now())),
		tickets::closed_by.eq(Some(database_id_from_discord_id(closed_by.get()))),
		tickets::close_reason.eq(Some(reason)),
	))
	.get_result(&mut db_connection)
	.optional()?;

	let Some(ticket) = ticket else {
		return Ok(None);
	};
	let guild_config = guild_config(&mut db_connection, ticket.get_guild())?;
	Ok(Some((ticket, guild_config)))
}

async fn finish_close(
	ctx: &BotContext,
	ticket: &Ticket,
	guild_config: Option<&GuildConfig>,
	closed_by: Id<UserMarker>,
	reason: &str,
) {
	let guild_name = ctx
		.guild_name(ticket.get_guild())
		.unwrap_or_else(|| String::from("Unknown Server"));
	let style = EmbedStyle::for_guild(&ctx.config, guild_config);

	match ticket_closed_embed(&style, &guild_name, reason) {
		Ok(embed) => {
			if let Err(error) = send_direct_message(&ctx.http_client, ticket.get_with_user(), &[embed]).await {
				tracing::warn!(source = ?error, ticket = %ticket.id, "Failed to notify user of ticket close");
			}
		}
		Err(error) => tracing::error!(source = ?error, "Failed to build ticket closed embed"),
	}

	if let Some(guild_config) = guild_config {
		if let Err(error) = log_close(ctx, ticket, guild_config, &guild_name, &style, closed_by, reason).await {
			tracing::warn!(source = ?error, ticket = %ticket.id, "Failed to log ticket close");
		}
	}

	{
		let mut state = ctx.bot_state.write().await;
		if let Some(subscriptions) = state.get_mut::<Subscriptions>() {
			subscriptions.clear(ticket.get_channel());
		}
	}

	tokio::spawn(delete_ticket_channel(Arc::clone(&ctx.http_client), ticket.get_channel()));

	tracing::info!(ticket = %ticket.id, closed_by = %closed_by, "Closed ticket");
}

async fn log_close(
	ctx: &BotContext,
	ticket: &Ticket,
	guild_config: &GuildConfig,
	guild_name: &str,
	style: &EmbedStyle,
	closed_by: Id<UserMarker>,
	reason: &str,
) -> miette::Result<()> {
	let transcripts_enabled = guild_config
		.settings()
		.get_setting(settings::TRANSCRIPTS, ctx.config.tickets.transcripts);
	let transcript = if transcripts_enabled {
		let messages: Vec<TicketMessage> = {
			let mut db_connection = ctx.db_connection_pool.get().into_diagnostic()?;
			ticket_messages::table
				.filter(ticket_messages::ticket.eq(&ticket.id))
				.order(ticket_messages::send_time.asc())
				.load(&mut db_connection)
				.into_diagnostic()?
		};
		let transcript = format_transcript(ticket, guild_name, &messages);
		Some(Attachment::from_bytes(
			format!("transcript-{}.txt", ticket.id),
			transcript.into_bytes(),
			0,
		))
	} else {
		None
	};

	let timestamp = timestamp_from_datetime(&Utc::now()).into_diagnostic()?;
	let embed = ticket_log_embed(
		style,
		"Ticket Closed",
		ticket.get_with_user(),
		&[
			("Closed By", closed_by.mention().to_string()),
			("Reason", reason.to_string()),
			("Messages", String::from(if transcript.is_some() { "Transcript attached" } else { "Not saved" })),
		],
		timestamp,
	)
	.into_diagnostic()?;
	log_ticket_event(ctx, guild_config, embed, transcript).await
}

async fn delete_ticket_channel(http_client: Arc<Client>, channel_id: Id<ChannelMarker>) {
	sleep(CHANNEL_DELETE_DELAY).await;
	if let Err(error) = http_client
		.delete_channel(channel_id)
		.reason("Modmail ticket closed")
		.await
	{
		tracing::debug!(source = ?error, channel = %channel_id, "Failed to delete closed ticket channel");
	}
}

pub fn close_outcome_message(outcome: &Result<CloseOutcome, CloseError>) -> &'static str {
	match outcome {
		Ok(CloseOutcome::Closed) => TICKET_CLOSED,
		Ok(CloseOutcome::AlreadyClosed) => ALREADY_CLOSED,
		Ok(CloseOutcome::DuplicateClose) => DUPLICATE_CLOSE,
		Err(_) => CLOSE_FAILED,
	}
}

/// Tells staff in the ticket channel how their close went
pub async fn report_close_outcome(
	http_client: &Client,
	channel_id: Id<ChannelMarker>,
	outcome: Result<CloseOutcome, CloseError>,
) -> miette::Result<()> {
	if let Err(error) = &outcome {
		tracing::error!(source = ?error, channel = %channel_id, "Failed to close ticket");
	}
	http_client
		.create_message(channel_id)
		.content(close_outcome_message(&outcome))
		.await
		.into_diagnostic()?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::parse_config_str;

	fn offline_context() -> BotContext {
		let config = parse_config_str(
			r#"
discord_token "token"
database {
	host "127.0.0.1"
	port 1
	username "modmail"
	password "modmail"
	database "modmail"
}
"#,
		)
		.unwrap();
		BotContext::offline(config)
	}

	async fn is_closing(ctx: &BotContext, channel_id: Id<ChannelMarker>) -> bool {
		ctx.bot_state
			.read()
			.await
			.get::<ClosingTickets>()
			.is_some_and(|closing| closing.is_closing(channel_id))
	}

	#[tokio::test]
	async fn deleted_channel_close_defers_to_a_close_in_progress() {
		let ctx = offline_context();
		let channel_id = Id::new(10);
		ctx.bot_state
			.write()
			.await
			.entry::<ClosingTickets>()
			.or_insert_with(ClosingTickets::default)
			.begin(channel_id);

		let outcome = close_for_deleted_channel(&ctx, channel_id).await.unwrap();
		assert_eq!(outcome, CloseOutcome::DuplicateClose);
		assert!(is_closing(&ctx, channel_id).await);
	}

	#[tokio::test]
	async fn failed_close_releases_the_channel() {
		let ctx = offline_context();
		let channel_id = Id::new(11);

		let outcome = close_for_deleted_channel(&ctx, channel_id).await;
		assert!(matches!(outcome, Err(CloseError::Pool(_))));
		assert!(!is_closing(&ctx, channel_id).await);
	}

	#[test]
	fn closed_tickets_report_the_pending_delete() {
		assert_eq!(
			close_outcome_message(&Ok(CloseOutcome::Closed)),
			"Ticket closed. This channel will be deleted in a few seconds."
		);
	}

	#[test]
	fn losing_a_close_race_is_reported() {
		assert_eq!(
			close_outcome_message(&Ok(CloseOutcome::AlreadyClosed)),
			"This ticket has already been closed by someone else."
		);
		assert_eq!(
			close_outcome_message(&Ok(CloseOutcome::DuplicateClose)),
			"Continuing with ticket closure..."
		);
	}

	#[test]
	fn close_errors_get_a_generic_message() {
		let outcome = Err(CloseError::Database(diesel::result::Error::NotFound));
		assert_eq!(close_outcome_message(&outcome), "An error occurred while closing the ticket.");
	}
}
