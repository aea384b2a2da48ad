//! User-Facing Notice Sink
//!
//! The core surfaces sync progress and playback-recovery messages as short
//! transient strings. How they are rendered (toast, banner, TV overlay) is
//! a host concern; the core only needs somewhere to put them.

/// Transient user-visible message sink.
///
/// Implementations must not block: the controller calls this from async
/// recovery paths. Hosts typically forward into a channel.
pub trait NoticeSink: Send + Sync {
    /// Surface a transient message to the user.
    fn notify(&self, message: &str);
}

/// A sink that drops every notice. Useful for tests and headless runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNoticeSink;

impl NoticeSink for NullNoticeSink {
    fn notify(&self, _message: &str) {}
}
