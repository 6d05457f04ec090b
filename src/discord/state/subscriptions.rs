// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::{BTreeSet, HashMap};
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, UserMarker};

/// Staff members who asked to be pinged when a ticket's user sends a message, by ticket channel.
///
/// Subscriptions only live in memory; they're lost on restart.
#[derive(Debug, Default)]
pub struct Subscriptions {
	channels: HashMap<Id<ChannelMarker>, BTreeSet<Id<UserMarker>>>,
}

impl Subscriptions {
	/// Subscribes the user to the channel. Returns `false` if they were already subscribed.
	pub fn subscribe(&mut self, channel: Id<ChannelMarker>, user: Id<UserMarker>) -> bool {
		self.channels.entry(channel).or_default().insert(user)
	}

	/// Unsubscribes the user from the channel. Returns `false` if they weren't subscribed.
	pub fn unsubscribe(&mut self, channel: Id<ChannelMarker>, user: Id<UserMarker>) -> bool {
		let Some(subscribers) = self.channels.get_mut(&channel) else {
			return false;
		};
		let removed = subscribers.remove(&user);
		if subscribers.is_empty() {
			self.channels.remove(&channel);
		}
		removed
	}

	pub fn subscribers(&self, channel: Id<ChannelMarker>) -> Vec<Id<UserMarker>> {
		self.channels
			.get(&channel)
			.map(|subscribers| subscribers.iter().copied().collect())
			.unwrap_or_default()
	}

	pub fn clear(&mut self, channel: Id<ChannelMarker>) {
		self.channels.remove(&channel);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn subscribe_is_idempotent() {
		let mut subscriptions = Subscriptions::default();
		assert!(subscriptions.subscribe(Id::new(10), Id::new(1)));
		assert!(!subscriptions.subscribe(Id::new(10), Id::new(1)));
		assert_eq!(subscriptions.subscribers(Id::new(10)), vec![Id::new(1)]);
	}

	#[test]
	fn subscribers_are_per_channel() {
		let mut subscriptions = Subscriptions::default();
		subscriptions.subscribe(Id::new(10), Id::new(2));
		subscriptions.subscribe(Id::new(10), Id::new(1));
		subscriptions.subscribe(Id::new(11), Id::new(3));
		assert_eq!(subscriptions.subscribers(Id::new(10)), vec![Id::new(1), Id::new(2)]);
		assert_eq!(subscriptions.subscribers(Id::new(11)), vec![Id::new(3)]);
		assert!(subscriptions.subscribers(Id::new(12)).is_empty());
	}

	#[test]
	fn unsubscribe_reports_membership() {
		let mut subscriptions = Subscriptions::default();
		assert!(!subscriptions.unsubscribe(Id::new(10), Id::new(1)));
		subscriptions.subscribe(Id::new(10), Id::new(1));
		assert!(subscriptions.unsubscribe(Id::new(10), Id::new(1)));
		assert!(subscriptions.subscribers(Id::new(10)).is_empty());
	}

	#[test]
	fn clear_drops_all_subscribers() {
		let mut subscriptions = Subscriptions::default();
		subscriptions.subscribe(Id::new(10), Id::new(1));
		subscriptions.subscribe(Id::new(10), Id::new(2));
		subscriptions.clear(Id::new(10));
		assert!(subscriptions.subscribers(Id::new(10)).is_empty());
	}
}
