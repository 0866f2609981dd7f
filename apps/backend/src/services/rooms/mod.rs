//! Room orchestration: one actor task per room behind a registry of handles.

mod actor;
pub mod commands;
pub mod record;
pub mod registry;
pub mod timers;

pub use commands::RoomSnapshot;
pub use record::{ChatMessage, PlayerSlot, RoomStatus, RoomView};
pub use registry::{RoomDeps, RoomHandle, RoomRegistry};
