//! Synchronization core of a room session: the message log and its reducer,
//! presence, remote cursors and typing signals. Nothing here performs I/O;
//! the caller drives it with intents, inbound frames, timer ticks and write
//! results, and executes the effects it returns.

pub mod cursor;
pub mod debounce;
pub mod notice;
pub mod presence;
pub mod reconcile;
pub mod room;
pub mod store;
pub mod typing;

pub use notice::Notice;
pub use reconcile::{Ack, RollbackPolicy, Write, WriteOp};
pub use room::{CoreConfig, Effects, Intent, RoomCore, RoomSnapshot};
