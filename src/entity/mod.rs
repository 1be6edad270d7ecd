mod audit;
mod business;
mod campaign;
mod slot;

pub use audit::{AuditAction, AuditLogEntry, EntityKind};
pub use business::{Business, Stage};
pub use campaign::Campaign;
pub use slot::{CreatorSlot, Deliverables, SlotRole, SlotStatus};
