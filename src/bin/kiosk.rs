use std::path::Path;

use kiosk_calendar::client::Client;
use kiosk_calendar::storage::FileStore;
use kiosk_calendar::CalendarStore;

const FEED_URL: &str = "https://example.com/calendarifestius_es.ics";
const STORAGE_FOLDER: &str = "kiosk_storage";
const STORAGE_KEY: &str = "userEvents";


#[tokio::main]
async fn main() {
    env_logger::init();

    let url = FEED_URL.parse().unwrap();
    let storage = FileStore::new(Path::new(STORAGE_FOLDER));
    let mut store = CalendarStore::new(Client::new(), storage, url, String::from(STORAGE_KEY));

    if let Err(err) = store.load().await {
        log::error!("Unable to load the calendar: {}", err);
        return;
    }

    println!("---- current events ----");
    kiosk_calendar::utils::print_event_list(&store.events());
}
