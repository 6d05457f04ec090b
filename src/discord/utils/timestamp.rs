// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use chrono::{DateTime, TimeZone, Utc};
use twilight_model::util::datetime::{Timestamp, TimestampParseError};

/// Gets the [DateTime] object for a timestamp from Discord. If any failures occur in the conversion, returns `None`.
pub fn datetime_from_timestamp(timestamp: &Timestamp) -> Option<DateTime<Utc>> {
	let micros = timestamp.as_micros();
	Utc.timestamp_micros(micros).single()
}

/// Gets a Discord [Timestamp] for a [DateTime].
pub fn timestamp_from_datetime(datetime: &DateTime<Utc>) -> Result<Timestamp, TimestampParseError> {
	Timestamp::from_micros(datetime.timestamp_micros())
}

/// Formats a ticket's creation time for users, e.g. `Mar 5, 2024 at 2:07 PM`.
pub fn format_created_at(datetime: &DateTime<Utc>) -> String {
	datetime.format("%b %-d, %Y at %-I:%M %p").to_string()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn created_at_matches_listing_format() {
		let datetime = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 0).unwrap();
		assert_eq!(format_created_at(&datetime), "Mar 5, 2024 at 2:07 PM");

		let datetime = Utc.with_ymd_and_hms(2023, 12, 25, 0, 30, 0).unwrap();
		assert_eq!(format_created_at(&datetime), "Dec 25, 2023 at 12:30 AM");
	}

	#[test]
	fn timestamps_convert_both_ways() {
		let datetime = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 0).unwrap();
		let timestamp = timestamp_from_datetime(&datetime).unwrap();
		assert_eq!(datetime_from_timestamp(&timestamp), Some(datetime));
	}
}
