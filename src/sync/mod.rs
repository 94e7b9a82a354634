mod coordinator;
mod drain;
mod host;
mod remote;

pub use coordinator::{DeliveryOutcome, SyncCoordinator};
pub use drain::{drain_outbox, DrainReport};
pub use host::{BackgroundSync, NoSyncHost, SyncHost};
pub use remote::{HttpRemote, RemoteSink, SendError};
