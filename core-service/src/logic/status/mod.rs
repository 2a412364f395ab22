//! Engine status snapshot

mod collect;

pub use collect::collect;
