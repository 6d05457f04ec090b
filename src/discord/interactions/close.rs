// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::respond_ephemeral;
use crate::discord::context::BotContext;
use crate::discord::state::close::{ConfirmationClaim, claim_confirmation, close_confirmation_components};
use crate::discord::tickets::close::{close_ticket, report_close_outcome};
use crate::discord::utils::responses::{CLOSE_CANCELED, CLOSING_TICKET};
use miette::{IntoDiagnostic, bail};
use twilight_model::gateway::payload::incoming::InteractionCreate;
use twilight_model::http::interaction::{InteractionResponse, InteractionResponseType};
use twilight_util::builder::InteractionResponseDataBuilder;

const CONFIRMATION_EXPIRED: &str = "This close confirmation has expired.";
const NOT_REQUESTER: &str = "Only the staff member who asked to close this ticket can answer this.";

pub async fn route_close_interaction(
	ctx: &BotContext,
	interaction: &InteractionCreate,
	custom_id_path: &[String],
) -> miette::Result<()> {
	let Some(confirmation_id) = custom_id_path.get(1) else {
		bail!("Invalid custom ID for ticket close (parts: {:?})", custom_id_path);
	};
	let confirm = match custom_id_path.get(2).map(|s| s.as_str()) {
		Some("confirm") => true,
		Some("cancel") => false,
		_ => bail!("Invalid custom ID for ticket close (parts: {:?})", custom_id_path),
	};
	let Some(user) = interaction.author_id() else {
		bail!("Close confirmation interaction has no user");
	};

	let confirmation = match claim_confirmation(&ctx.bot_state, confirmation_id, user).await {
		ConfirmationClaim::Claimed(confirmation) => confirmation,
		ConfirmationClaim::NotRequester => return respond_ephemeral(ctx, interaction, NOT_REQUESTER).await,
		ConfirmationClaim::Missing => return respond_ephemeral(ctx, interaction, CONFIRMATION_EXPIRED).await,
	};

	let response = InteractionResponseDataBuilder::new()
		.components(close_confirmation_components(confirmation_id, true))
		.build();
	let response = InteractionResponse {
		kind: InteractionResponseType::UpdateMessage,
		data: Some(response),
	};
	let update_result = ctx
		.http_client
		.interaction(ctx.application_id)
		.create_response(interaction.id, &interaction.token, &response)
		.await;
	if let Err(error) = update_result {
		tracing::warn!(source = ?error, "Failed to disable close confirmation buttons");
	}

	if !confirm {
		ctx.http_client
			.create_message(confirmation.channel)
			.content(CLOSE_CANCELED)
			.await
			.into_diagnostic()?;
		return Ok(());
	}

	ctx.http_client
		.create_message(confirmation.channel)
		.content(CLOSING_TICKET)
		.await
		.into_diagnostic()?;
	let outcome = close_ticket(ctx, confirmation.channel, user, &confirmation.reason).await;
	report_close_outcome(&ctx.http_client, confirmation.channel, outcome).await
}
