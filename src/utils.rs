//! Some utility functions

use crate::event::{Event, Provenance};

/// A debug utility that pretty-prints an event list
pub fn print_event_list(events: &[&Event]) {
    for event in events {
        print_event(event);
    }
}

pub fn print_event(event: &Event) {
    let provenance = match event.provenance() {
        Provenance::Feed => "=",
        Provenance::Local => "+",
    };
    let whole_day = if event.all_day() { "◷" } else { " " };
    println!("    {}{} {}\t{}\t{}", provenance, whole_day, event.start().format("%Y-%m-%d"), event.title(), event.id());
}
