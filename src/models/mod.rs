mod plan;
mod session;

pub use plan::PlannedCategory;
pub use session::{OutboxEntry, SessionRecord};
