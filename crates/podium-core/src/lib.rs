//! # Podium Core
//!
//! Foundation types for the Podium game-server controller.
//!
//! This crate owns everything that does not depend on live controller state:
//!
//! - **Data model**: players, maps and medal thresholds ([`PlayerInfo`], [`MapInfo`], [`Medals`])
//! - **Events**: the closed set of typed server events ([`ServerEvent`]) and the
//!   pure [`translate`] function that produces them from raw notifications
//! - **Transport boundary**: the [`Transport`] trait, [`Notification`] and the
//!   in-process [`LoopbackTransport`]
//! - **Storage port**: [`Storage`] / [`Collection`] with memory and JSON-file backends
//! - **Errors**: one `thiserror` enum per concern
//!
//! ```text
//! ┌───────────┐  Notification   ┌───────────┐  ServerEvent   ┌────────────┐
//! │ Transport │───────────────▶│ translate │──────────────▶│ Dispatcher │
//! └───────────┘                 └───────────┘                └────────────┘
//!       ▲                                                         │
//!       └──────────────────── Transport::call ────────────────────┘
//! ```

pub mod error;
pub mod event;
pub mod model;
pub mod storage;
pub mod transport;

pub use error::{
    RpcError, RpcResult, StorageError, StorageResult, TransportError, TransportResult,
    TranslateError, TranslateResult,
};
pub use event::{ServerEvent, names, translate, unwrap_script_callback};
pub use model::{Medal, Medals, MapInfo, MapStruct, PlayerInfo, PlayerRanking, PlayerStruct};
pub use storage::{
    Collection, Document, JsonFileStorage, MemoryStorage, Storage, UpdateOutcome, document,
};
pub use transport::{
    BoxedTransport, LoopbackTransport, Notification, NotificationStream, RecordedCall, Transport,
};

/// Prelude for common imports.
pub mod prelude {
    pub use super::error::*;
    pub use super::event::*;
    pub use super::model::*;
    pub use super::storage::{Collection, Document, Storage, document};
    pub use super::transport::{BoxedTransport, Notification, Transport};
}
