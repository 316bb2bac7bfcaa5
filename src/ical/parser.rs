//! A module to parse ICS feed documents

use std::error::Error;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use ical::parser::ical::component::IcalEvent;

use crate::error::StoreError;
use crate::event::{Event, EventId};
use crate::settings::FEED_EVENT_COLOR;

/// Parse an ICS feed document into [`Event`]s.
///
/// The document must contain at least one parseable calendar component, otherwise this fails with [`StoreError::MalformedFeed`]. Individual entries that miss a required property (or carry an unreadable date) are skipped with a warning rather than aborting the whole parse: for a read-only feed, partial data beats no data.
///
/// This has no side effects: parsing the same document twice yields the same events.
pub fn parse(content: &str) -> Result<Vec<Event>, StoreError> {
    let reader = ical::IcalParser::new(content.as_bytes());

    let mut events = Vec::new();
    let mut seen_calendar = false;
    for calendar in reader {
        let calendar = match calendar {
            Err(err) => {
                if seen_calendar {
                    log::warn!("Ignoring an unparseable trailing calendar component: {}", err);
                    break;
                }
                return Err(StoreError::MalformedFeed(err.to_string()));
            },
            Ok(calendar) => calendar,
        };
        seen_calendar = true;

        for entry in &calendar.events {
            match event_from_entry(entry) {
                Err(err) => log::warn!("Skipping a malformed feed entry: {}", err),
                Ok(event) => events.push(event),
            }
        }
    }

    if seen_calendar == false {
        return Err(StoreError::MalformedFeed("no calendar component found".into()));
    }

    Ok(events)
}

/// Map a single VEVENT into the internal representation.
///
/// The feed in this domain only carries whole-day holidays, so every entry is marked `all_day`.
fn event_from_entry(entry: &IcalEvent) -> Result<Event, Box<dyn Error>> {
    let mut uid = None;
    let mut summary = None;
    let mut start = None;
    let mut end = None;
    for prop in &entry.properties {
        match prop.name.as_str() {
            "UID" => uid = prop.value.clone(),
            "SUMMARY" => summary = prop.value.clone(),
            "DTSTART" => start = prop.value.clone(),
            "DTEND" => end = prop.value.clone(),
            _ => continue,
        }
    }

    let uid = match uid {
        Some(uid) => uid,
        None => return Err("missing UID".into()),
    };
    let summary = match summary {
        Some(summary) => summary,
        None => return Err(format!("missing SUMMARY for entry {}", uid).into()),
    };
    let start = match start {
        Some(start) => parse_instant(&start)?,
        None => return Err(format!("missing DTSTART for entry {}", uid).into()),
    };
    let end = match end {
        Some(end) => Some(parse_instant(&end)?),
        None => None,
    };

    let color = FEED_EVENT_COLOR.lock().unwrap().to_hex_string();
    Ok(Event::new(EventId::feed(&uid), summary, start, end, true, color))
}

/// Parse the date forms the format emits: `YYYYMMDD`, `YYYYMMDDTHHMMSS` and `YYYYMMDDTHHMMSSZ`.
/// Naive values are taken as UTC.
fn parse_instant(value: &str) -> Result<DateTime<Utc>, Box<dyn Error>> {
    let value = value.trim_end_matches('Z');
    if value.len() == 8 {
        let date = NaiveDate::parse_from_str(value, "%Y%m%d")?;
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }

    let date_time = NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S")?;
    Ok(date_time.and_utc())
}
