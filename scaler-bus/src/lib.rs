pub mod bus;
pub mod topics;

pub use bus::{next_json, publish_json, InProcessBus, MessageBus, Subscription};
