//! # Core Runtime
//!
//! Shared runtime infrastructure for the IPTV platform core:
//!
//! - **Event bus** (`events`): typed broadcast events connecting the sync
//!   coordinator, the catalog store, and the playback controller to hosts
//! - **Logging** (`logging`): `tracing-subscriber` bootstrap
//! - **Errors** (`error`): runtime-level error type

pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
pub use events::{
    CatalogEvent, CoreEvent, EventBus, EventSeverity, PlaybackEvent, SyncEvent,
    DEFAULT_EVENT_BUFFER_SIZE,
};
pub use logging::{init_logging, LogFormat, LoggingConfig};
