pub mod availability;
pub mod slots;

pub use availability::AvailabilityService;
pub use slots::{block_slots, collect_slots};
