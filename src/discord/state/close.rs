// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::sleep;
use twilight_model::channel::message::component::{ActionRow, Button, ButtonStyle, Component};
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, MessageMarker, UserMarker};
use type_map::concurrent::TypeMap;

pub const CLOSE_CONFIRMATION_WINDOW: Duration = Duration::from_secs(30);

/// Ticket channels for which a close is currently being carried out
#[derive(Debug, Default)]
pub struct ClosingTickets {
	channels: HashSet<Id<ChannelMarker>>,
}

impl ClosingTickets {
	/// Marks the channel as closing. Returns `false` if a close is already in progress for it.
	pub fn begin(&mut self, channel: Id<ChannelMarker>) -> bool {
		self.channels.insert(channel)
	}

	pub fn finish(&mut self, channel: Id<ChannelMarker>) {
		self.channels.remove(&channel);
	}

	pub fn is_closing(&self, channel: Id<ChannelMarker>) -> bool {
		self.channels.contains(&channel)
	}
}

#[derive(Debug, Default)]
pub struct CloseConfirmations {
	pub states: HashMap<String, CloseConfirmation>,
}

#[derive(Clone, Debug)]
pub struct CloseConfirmation {
	pub channel: Id<ChannelMarker>,
	pub requested_by: Id<UserMarker>,
	pub reason: String,
	/// The message holding the confirmation buttons, once it's been sent
	pub message: Option<Id<MessageMarker>>,
}

#[derive(Debug)]
pub enum ConfirmationClaim {
	Claimed(CloseConfirmation),
	/// Someone other than the staff member who asked to close pressed a button
	NotRequester,
	/// The confirmation expired or was already answered
	Missing,
}

pub async fn add_confirmation(bot_state: &RwLock<TypeMap>, confirmation_id: String, confirmation: CloseConfirmation) {
	let mut state = bot_state.write().await;
	let confirmations = state
		.entry::<CloseConfirmations>()
		.or_insert_with(CloseConfirmations::default);
	confirmations.states.insert(confirmation_id, confirmation);
}

pub async fn set_confirmation_message(bot_state: &RwLock<TypeMap>, confirmation_id: &str, message: Id<MessageMarker>) {
	let mut state = bot_state.write().await;
	if let Some(confirmation) = state
		.get_mut::<CloseConfirmations>()
		.and_then(|confirmations| confirmations.states.get_mut(confirmation_id))
	{
		confirmation.message = Some(message);
	}
}

/// Takes the confirmation for the user who pressed a button. Only the first press from the requester claims it.
pub async fn claim_confirmation(
	bot_state: &RwLock<TypeMap>,
	confirmation_id: &str,
	user: Id<UserMarker>,
) -> ConfirmationClaim {
	let mut state = bot_state.write().await;
	let Some(confirmations) = state.get_mut::<CloseConfirmations>() else {
		return ConfirmationClaim::Missing;
	};
	match confirmations.states.get(confirmation_id) {
		Some(confirmation) if confirmation.requested_by != user => ConfirmationClaim::NotRequester,
		Some(_) => match confirmations.states.remove(confirmation_id) {
			Some(confirmation) => ConfirmationClaim::Claimed(confirmation),
			None => ConfirmationClaim::Missing,
		},
		None => ConfirmationClaim::Missing,
	}
}

/// Waits out the confirmation window, then removes the confirmation if nobody answered it. Returns the confirmation
/// only if it timed out.
pub async fn expire_confirmation(
	bot_state: Arc<RwLock<TypeMap>>,
	confirmation_id: String,
	window: Duration,
) -> Option<CloseConfirmation> {
	sleep(window).await;
	let mut state = bot_state.write().await;
	state
		.get_mut::<CloseConfirmations>()
		.and_then(|confirmations| confirmations.states.remove(&confirmation_id))
}

pub fn close_confirmation_components(confirmation_id: &str, disabled: bool) -> Vec<Component> {
	let confirm_button = Button {
		custom_id: Some(format!("close/{}/confirm", confirmation_id)),
		disabled,
		emoji: None,
		label: Some(String::from("Close Ticket")),
		style: ButtonStyle::Danger,
		url: None,
		sku_id: None,
	};
	let cancel_button = Button {
		custom_id: Some(format!("close/{}/cancel", confirmation_id)),
		disabled,
		emoji: None,
		label: Some(String::from("Cancel")),
		style: ButtonStyle::Secondary,
		url: None,
		sku_id: None,
	};
	vec![Component::ActionRow(ActionRow {
		components: vec![Component::Button(confirm_button), Component::Button(cancel_button)],
	})]
}

#[cfg(test)]
mod tests {
	use super::*;

	fn confirmation(requested_by: u64) -> CloseConfirmation {
		CloseConfirmation {
			channel: Id::new(100),
			requested_by: Id::new(requested_by),
			reason: String::from("Resolved"),
			message: None,
		}
	}

	#[test]
	fn second_close_of_a_channel_is_a_duplicate() {
		let mut closing = ClosingTickets::default();
		assert!(closing.begin(Id::new(5)));
		assert!(!closing.begin(Id::new(5)));
		assert!(closing.begin(Id::new(6)));
		closing.finish(Id::new(5));
		assert!(!closing.is_closing(Id::new(5)));
		assert!(closing.begin(Id::new(5)));
	}

	#[tokio::test]
	async fn only_requester_claims_and_only_once() {
		let bot_state = RwLock::new(TypeMap::new());
		add_confirmation(&bot_state, String::from("abc"), confirmation(1)).await;

		assert!(matches!(
			claim_confirmation(&bot_state, "abc", Id::new(2)).await,
			ConfirmationClaim::NotRequester
		));
		assert!(matches!(
			claim_confirmation(&bot_state, "abc", Id::new(1)).await,
			ConfirmationClaim::Claimed(claimed) if claimed.reason == "Resolved"
		));
		assert!(matches!(
			claim_confirmation(&bot_state, "abc", Id::new(1)).await,
			ConfirmationClaim::Missing
		));
	}

	#[tokio::test]
	async fn message_id_is_recorded() {
		let bot_state = RwLock::new(TypeMap::new());
		add_confirmation(&bot_state, String::from("abc"), confirmation(1)).await;
		set_confirmation_message(&bot_state, "abc", Id::new(900)).await;
		let ConfirmationClaim::Claimed(claimed) = claim_confirmation(&bot_state, "abc", Id::new(1)).await else {
			panic!("confirmation should be claimable");
		};
		assert_eq!(claimed.message, Some(Id::new(900)));
	}

	#[tokio::test(start_paused = true)]
	async fn unanswered_confirmation_expires() {
		let bot_state = Arc::new(RwLock::new(TypeMap::new()));
		add_confirmation(&bot_state, String::from("abc"), confirmation(1)).await;

		let expiry = tokio::spawn(expire_confirmation(
			Arc::clone(&bot_state),
			String::from("abc"),
			CLOSE_CONFIRMATION_WINDOW,
		));
		let expired = expiry.await.unwrap();
		assert!(expired.is_some());
		assert!(matches!(
			claim_confirmation(&bot_state, "abc", Id::new(1)).await,
			ConfirmationClaim::Missing
		));
	}

	#[tokio::test(start_paused = true)]
	async fn answered_confirmation_does_not_expire() {
		let bot_state = Arc::new(RwLock::new(TypeMap::new()));
		add_confirmation(&bot_state, String::from("abc"), confirmation(1)).await;

		let expiry = tokio::spawn(expire_confirmation(
			Arc::clone(&bot_state),
			String::from("abc"),
			CLOSE_CONFIRMATION_WINDOW,
		));
		assert!(matches!(
			claim_confirmation(&bot_state, "abc", Id::new(1)).await,
			ConfirmationClaim::Claimed(_)
		));
		assert!(expiry.await.unwrap().is_none());
	}

	#[test]
	fn components_carry_the_confirmation_id() {
		let components = close_confirmation_components("abc", true);
		let Some(Component::ActionRow(row)) = components.first() else {
			panic!("expected an action row");
		};
		let custom_ids: Vec<Option<String>> = row
			.components
			.iter()
			.map(|component| match component {
				Component::Button(button) => {
					assert!(button.disabled);
					button.custom_id.clone()
				}
				_ => None,
			})
			.collect();
		assert_eq!(
			custom_ids,
			vec![
				Some(String::from("close/abc/confirm")),
				Some(String::from("close/abc/cancel"))
			]
		);
	}
}
