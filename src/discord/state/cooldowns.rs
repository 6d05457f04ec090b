// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::config::CooldownsConfig;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use twilight_model::id::Id;
use twilight_model::id::marker::UserMarker;

/// Number of tracked uses after which expired entries are swept out
const PRUNE_THRESHOLD: usize = 1024;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum CooldownKind {
	/// Prefixed commands used in a guild
	Command,
	/// Opening a new ticket from DMs
	NewTicket,
	/// A user sending a message into an open ticket
	TicketMessage,
	/// A staff member relaying a message to the ticket's user
	StaffResponse,
}

impl CooldownKind {
	pub fn window(&self, config: &CooldownsConfig) -> Duration {
		let seconds = match self {
			Self::Command => config.commands,
			Self::NewTicket => config.new_ticket,
			Self::TicketMessage => config.ticket_message,
			Self::StaffResponse => config.staff_response,
		};
		Duration::from_secs(seconds)
	}
}

#[derive(Clone, Copy, Debug)]
struct RecordedUse {
	at: Instant,
	window: Duration,
}

#[derive(Debug, Default)]
pub struct Cooldowns {
	last_used: HashMap<(CooldownKind, Id<UserMarker>), RecordedUse>,
}

impl Cooldowns {
	/// Checks whether the user may perform the action at `now`. If they may, the use is recorded. If they're still
	/// within the cooldown window, the time remaining is returned and the recorded use is left unchanged.
	pub fn check_and_touch(
		&mut self,
		kind: CooldownKind,
		user: Id<UserMarker>,
		window: Duration,
		now: Instant,
	) -> Result<(), Duration> {
		if let Some(last_used) = self.last_used.get(&(kind, user)) {
			let elapsed = now.saturating_duration_since(last_used.at);
			if elapsed < window {
				return Err(window - elapsed);
			}
		}

		if self.last_used.len() >= PRUNE_THRESHOLD {
			self.prune(now);
		}
		self.last_used.insert((kind, user), RecordedUse { at: now, window });
		Ok(())
	}

	/// Forgets the user's last use, so the next attempt passes regardless of the window
	pub fn reset(&mut self, kind: CooldownKind, user: Id<UserMarker>) {
		self.last_used.remove(&(kind, user));
	}

	/// Drops uses whose own window has passed
	fn prune(&mut self, now: Instant) {
		self.last_used
			.retain(|_, last_used| now.saturating_duration_since(last_used.at) < last_used.window);
	}
}

/// Formats the remaining cooldown in whole seconds, rounding up so users never see "0 seconds"
pub fn remaining_seconds(remaining: Duration) -> u64 {
	let seconds = remaining.as_secs();
	if remaining.subsec_nanos() > 0 { seconds + 1 } else { seconds }
}

#[cfg(test)]
mod tests {
	use super::*;

	const WINDOW: Duration = Duration::from_secs(2);

	#[test]
	fn first_use_passes() {
		let mut cooldowns = Cooldowns::default();
		let now = Instant::now();
		assert!(
			cooldowns
				.check_and_touch(CooldownKind::TicketMessage, Id::new(1), WINDOW, now)
				.is_ok()
		);
	}

	#[test]
	fn use_within_window_reports_remaining_without_extending() {
		let mut cooldowns = Cooldowns::default();
		let user = Id::new(1);
		let start = Instant::now();
		cooldowns
			.check_and_touch(CooldownKind::TicketMessage, user, WINDOW, start)
			.unwrap();

		let remaining = cooldowns
			.check_and_touch(CooldownKind::TicketMessage, user, WINDOW, start + Duration::from_millis(500))
			.unwrap_err();
		assert_eq!(remaining, Duration::from_millis(1500));

		// The rejected attempt didn't reset the window, so the original window still governs.
		assert!(
			cooldowns
				.check_and_touch(CooldownKind::TicketMessage, user, WINDOW, start + WINDOW)
				.is_ok()
		);
	}

	#[test]
	fn kinds_and_users_are_independent() {
		let mut cooldowns = Cooldowns::default();
		let now = Instant::now();
		cooldowns
			.check_and_touch(CooldownKind::NewTicket, Id::new(1), WINDOW, now)
			.unwrap();
		assert!(
			cooldowns
				.check_and_touch(CooldownKind::TicketMessage, Id::new(1), WINDOW, now)
				.is_ok()
		);
		assert!(
			cooldowns
				.check_and_touch(CooldownKind::NewTicket, Id::new(2), WINDOW, now)
				.is_ok()
		);
		assert!(
			cooldowns
				.check_and_touch(CooldownKind::NewTicket, Id::new(1), WINDOW, now)
				.is_err()
		);
	}

	#[test]
	fn reset_clears_the_window() {
		let mut cooldowns = Cooldowns::default();
		let user = Id::new(7);
		let now = Instant::now();
		cooldowns
			.check_and_touch(CooldownKind::NewTicket, user, WINDOW, now)
			.unwrap();
		cooldowns.reset(CooldownKind::NewTicket, user);
		assert!(
			cooldowns
				.check_and_touch(CooldownKind::NewTicket, user, WINDOW, now)
				.is_ok()
		);
	}

	#[test]
	fn sweeping_keeps_uses_inside_their_own_window() {
		let mut cooldowns = Cooldowns::default();
		let user = Id::new(1);
		let new_ticket_window = Duration::from_secs(300);
		let start = Instant::now();
		cooldowns
			.check_and_touch(CooldownKind::NewTicket, user, new_ticket_window, start)
			.unwrap();
		for other_user in 2..(PRUNE_THRESHOLD as u64 + 2) {
			cooldowns
				.check_and_touch(CooldownKind::TicketMessage, Id::new(other_user), WINDOW, start)
				.unwrap();
		}

		let later = start + Duration::from_secs(120);
		cooldowns
			.check_and_touch(CooldownKind::TicketMessage, Id::new(1), WINDOW, later)
			.unwrap();
		assert!(cooldowns.last_used.len() < PRUNE_THRESHOLD);

		let remaining = cooldowns
			.check_and_touch(CooldownKind::NewTicket, user, new_ticket_window, later)
			.unwrap_err();
		assert_eq!(remaining, Duration::from_secs(180));
	}

	#[test]
	fn windows_come_from_config() {
		let config = CooldownsConfig::default();
		assert_eq!(CooldownKind::NewTicket.window(&config), Duration::from_secs(60));
		assert_eq!(CooldownKind::StaffResponse.window(&config), Duration::from_secs(1));
	}

	#[test]
	fn remaining_rounds_up() {
		assert_eq!(remaining_seconds(Duration::from_millis(1500)), 2);
		assert_eq!(remaining_seconds(Duration::from_secs(3)), 3);
	}
}
