pub mod item;
pub mod snapshot;

pub use item::{ItemError, PressItem, PressItemBuilder, SOURCE};
pub use snapshot::Snapshot;
