// Local case cache kept consistent with the store's change feed

pub mod layer;

pub use layer::{SyncHandle, SyncLayer};
