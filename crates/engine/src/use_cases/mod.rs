pub mod availability;
pub mod booking;
pub mod lifecycle;

pub use availability::GetAvailability;
pub use booking::{BookSlot, BookingError};
pub use lifecycle::{CleanupSlots, CleanupStats, ProvisionWindow};
