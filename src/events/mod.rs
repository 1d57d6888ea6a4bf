pub mod models;
mod reconcile;

pub use models::{Checkin, Event, EventUpdate, EventUpdateInput};
pub use reconcile::{add_or_update_event, event_key};
