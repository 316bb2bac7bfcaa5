//! A module to build ICS documents

use chrono::{DateTime, Utc};
use ics::properties::{DtEnd, DtStart, Summary};
use ics::ICalendar;

use crate::event::Event;
use crate::settings::{ORG_NAME, PRODUCT_NAME};

fn ical_product_id() -> String {
    format!("-//{}//{}//EN", ORG_NAME.lock().unwrap().as_str(), PRODUCT_NAME.lock().unwrap().as_str())
}

/// Render events as a VCALENDAR document.
///
/// This is how user events leave the dashboard (e.g. to be imported into a regular calendar app). Whole-day events get date-only stamps, the others get full date-times.
pub fn build_document<'a, I>(events: I) -> String
where
    I: IntoIterator<Item = &'a Event>,
{
    let mut calendar = ICalendar::new("2.0", ical_product_id());

    for event in events {
        let mut entry = ics::Event::new(event.id().as_str().to_string(), format_date_time(&event.start()));
        entry.push(Summary::new(event.title().to_string()));
        if event.all_day() {
            entry.push(DtStart::new(format_date(&event.start())));
        } else {
            entry.push(DtStart::new(format_date_time(&event.start())));
        }
        match event.end() {
            None => (),
            Some(end) if event.all_day() => entry.push(DtEnd::new(format_date(&end))),
            Some(end) => entry.push(DtEnd::new(format_date_time(&end))),
        }
        calendar.add_event(entry);
    }

    calendar.to_string()
}

fn format_date_time(dt: &DateTime<Utc>) -> String {
    dt.format("%Y%m%dT%H%M%SZ").to_string()
}

fn format_date(dt: &DateTime<Utc>) -> String {
    dt.format("%Y%m%d").to_string()
}
