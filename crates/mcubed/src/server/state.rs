//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::access::AccessController;
use crate::codec::Codec;

/// The controller type the server runs against.
pub type Controller = AccessController<Box<dyn Codec>>;

/// Application state shared across all request handlers.
///
/// The controller sits behind a single async mutex: each request holds it for
/// its whole authorize → query/mutate → save cycle, so requests are applied
/// one at a time and every save writes a consistent image.
///
/// Saves are synchronous file writes made on the worker thread while the lock
/// is held. Key stretching happens once, when the codec loads, never inside a
/// request.
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<Mutex<Controller>>,
}

impl AppState {
    pub fn new(controller: Controller) -> Self {
        Self {
            controller: Arc::new(Mutex::new(controller)),
        }
    }
}

#[cfg(test)]
impl Default for AppState {
    /// An empty in-memory database, suitable for tests.
    fn default() -> Self {
        let codec: Box<dyn Codec> = Box::new(crate::codec::memory::MemoryCodec::new());
        Self::new(AccessController::open(codec).expect("in-memory load cannot fail"))
    }
}
