// Workflow event bus
//
// Mutating services publish here after a successful write; the sync layer listens and
// re-queries the store.

pub mod publisher;

pub use publisher::{EventPublisher, PublishError, PublishedEvent};
