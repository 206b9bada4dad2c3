//! ISO-8601 timestamps as grafana sends them in `startsAt`.
//!
//! Accepted are calendar dates in extended (`2024-06-01`) and basic
//! (`20240601`) form and extended week dates (`2024-W22-6`), optionally
//! followed by `T`, `t` or a space and a time of `hh[:mm[:ss[.f]]]` or
//! `hh[mm[ss[.f]]]`. The fraction may use `.` or `,`. An offset is `Z` or
//! `±hh[:mm[:ss]]` / `±hh[mm[ss]]`; without one the time is taken as UTC.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, SecondsFormat};
use serde::{de, Deserialize, Deserializer};
use thiserror::Error;

/// date layouts chrono can parse for us, basic calendar dates are handled
/// separately because `%Y` doesn't stop after four digits
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%G-W%V-%u"];

/// `startsAt` could not be understood as an ISO-8601 timestamp
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("`{0}` is not an ISO-8601 timestamp")]
pub struct InvalidTimestamp(String);

#[derive(Clone, Debug, PartialEq, Eq)]
/// point in time as sent by grafana together with its textual form
pub struct Timestamp {
	/// RFC 3339 text, the payload text itself if it already was RFC 3339
	text: String,
	instant: DateTime<FixedOffset>,
}

impl Timestamp {
	/// Parses an ISO-8601 timestamp. Values without an offset are taken as UTC.
	///
	/// # Arguments
	///
	/// * `text` - the timestamp, e.g. `2024-06-01T12:00:00+00:00`
	pub fn parse(text: &str) -> Result<Self, InvalidTimestamp> {
		if let Ok(instant) = DateTime::parse_from_rfc3339(text) {
			return Ok(Self { text: text.to_owned(), instant });
		}

		let instant = parse_iso8601(text).ok_or_else(|| InvalidTimestamp(text.to_owned()))?;

		Ok(Self { text: instant.to_rfc3339_opts(SecondsFormat::AutoSi, true), instant })
	}

	/// whole seconds since the unix epoch, fractions truncated toward zero
	pub fn epoch_seconds(&self) -> i64 {
		let seconds = self.instant.timestamp();

		// timestamp() floors, which is one second off before 1970
		if seconds < 0 && self.instant.timestamp_subsec_nanos() > 0 {
			seconds + 1
		} else {
			seconds
		}
	}

	pub fn as_str(&self) -> &str {
		self.text.as_str()
	}
}

impl<'de> Deserialize<'de> for Timestamp {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let text = String::deserialize(deserializer)?;
		Timestamp::parse(&text).map_err(de::Error::custom)
	}
}

fn parse_iso8601(text: &str) -> Option<DateTime<FixedOffset>> {
	let (date, time) = match text.find(|c: char| matches!(c, 'T' | 't' | ' ')) {
		Some(index) => (&text[..index], Some(&text[index + 1..])),
		None => (text, None),
	};

	let date = parse_date(date)?;

	let Some(time) = time else {
		return Some(date.and_hms_opt(0, 0, 0)?.and_utc().fixed_offset());
	};

	let (time, offset) = split_offset(time)?;
	let time = parse_time(time)?;

	match offset {
		Some(offset) => date.and_time(time).and_local_timezone(offset).single(),
		None => Some(date.and_time(time).and_utc().fixed_offset()),
	}
}

fn parse_date(date: &str) -> Option<NaiveDate> {
	if date.len() == 8 && date.bytes().all(|b| b.is_ascii_digit()) {
		let year = date[..4].parse().ok()?;
		let month = date[4..6].parse().ok()?;
		let day = date[6..].parse().ok()?;

		return NaiveDate::from_ymd_opt(year, month, day);
	}

	DATE_FORMATS
		.iter()
		.find_map(|format| NaiveDate::parse_from_str(date, format).ok())
}

/// splits a trailing `Z` or `±hh...` offset off a time
fn split_offset(time: &str) -> Option<(&str, Option<FixedOffset>)> {
	if let Some(time) = time.strip_suffix(|c: char| matches!(c, 'Z' | 'z')) {
		return Some((time, FixedOffset::east_opt(0)));
	}

	let Some(index) = time.find(|c: char| matches!(c, '+' | '-')) else {
		return Some((time, None));
	};

	let (time, offset) = time.split_at(index);
	let (sign, fields) = offset.split_at(1);
	let (fields, _) = clock_fields(fields)?;

	let [hours, minutes, seconds] = fields;
	if hours > 23 || minutes > 59 || seconds > 59 {
		return None;
	}

	let seconds = i32::try_from(hours * 3600 + minutes * 60 + seconds).ok()?;
	let offset = match sign {
		"-" => FixedOffset::west_opt(seconds),
		_ => FixedOffset::east_opt(seconds),
	}?;

	Some((time, Some(offset)))
}

fn parse_time(time: &str) -> Option<NaiveTime> {
	let (clock, fraction) = match time.find(|c: char| matches!(c, '.' | ',')) {
		Some(index) => (&time[..index], Some(&time[index + 1..])),
		None => (time, None),
	};

	let ([hour, minute, second], count) = clock_fields(clock)?;

	let nanos = match fraction {
		// only seconds may carry a fraction
		Some(fraction) if count == 3 => fraction_nanos(fraction)?,
		Some(_) => return None,
		None => 0,
	};

	NaiveTime::from_hms_nano_opt(hour, minute, second, nanos)
}

/// Splits `hh[:mm[:ss]]` or `hh[mm[ss]]` into hours, minutes and seconds.
/// Returns the fields, missing ones set to 0, and how many were present.
fn clock_fields(text: &str) -> Option<([u32; 3], usize)> {
	if !text.is_ascii() {
		return None;
	}

	let groups: Vec<&str> = if text.contains(':') {
		text.split(':').collect()
	} else {
		if text.len() % 2 != 0 {
			return None;
		}

		(0..text.len()).step_by(2).map(|i| &text[i..i + 2]).collect()
	};

	if groups.is_empty() || groups.len() > 3 {
		return None;
	}

	let mut fields = [0; 3];
	for (field, group) in fields.iter_mut().zip(&groups) {
		if group.len() != 2 || !group.bytes().all(|b| b.is_ascii_digit()) {
			return None;
		}

		*field = group.parse().ok()?;
	}

	Some((fields, groups.len()))
}

/// nanoseconds of a decimal fraction, digits past the ninth are dropped
fn fraction_nanos(digits: &str) -> Option<u32> {
	if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
		return None;
	}

	let digits = &digits[..digits.len().min(9)];
	let scale = 10u32.pow(9 - digits.len() as u32);

	Some(digits.parse::<u32>().ok()? * scale)
}
