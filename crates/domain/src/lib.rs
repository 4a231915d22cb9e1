pub mod booking;
pub mod entities;
pub mod error;
pub mod ids;
pub mod slot_time;

pub use booking::BookingRequest;
pub use entities::{AvailableSlot, Holder, Snapshot};
pub use error::DomainError;
pub use ids::{SlotId, UnitId};
pub use slot_time::SlotTime;
