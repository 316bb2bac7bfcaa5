//! Support for library configuration options

use std::sync::{Arc, Mutex};

use csscolorparser::Color;
use once_cell::sync::Lazy;

/// Part of the ProdID string that describes the organization (example of a ProdID string: `-//ABC Corporation//My Product//EN`).
/// Feel free to override it when initing this library.
pub static ORG_NAME: Lazy<Arc<Mutex<String>>> = Lazy::new(|| Arc::new(Mutex::new("My organization".to_string())));

/// Part of the ProdID string that describes the product name (example of a ProdID string: `-//ABC Corporation//My Product//EN`).
/// Feel free to override it when initing this library.
pub static PRODUCT_NAME: Lazy<Arc<Mutex<String>>> = Lazy::new(|| Arc::new(Mutex::new("KioskCalendar".to_string())));

/// The color the calendar widget paints feed events with.
/// Feel free to override it when initing this library.
pub static FEED_EVENT_COLOR: Lazy<Arc<Mutex<Color>>> = Lazy::new(|| Arc::new(Mutex::new(
    csscolorparser::parse("#414833").unwrap(/* this cannot panic since the literal is a valid CSS color */)
)));

/// The color the calendar widget paints user events with.
/// Feel free to override it when initing this library.
pub static LOCAL_EVENT_COLOR: Lazy<Arc<Mutex<Color>>> = Lazy::new(|| Arc::new(Mutex::new(
    csscolorparser::parse("#936639").unwrap(/* this cannot panic since the literal is a valid CSS color */)
)));
