//! The world store: the game-state collaborator every query and periodic
//! update reads from.
//!
//! Store methods are synchronous and may block (chunk scans, locks inside
//! the game server). The hub therefore never calls them on a runtime
//! worker thread: every call goes through [`run_blocking`], which moves it
//! onto Tokio's blocking pool.

use std::sync::Arc;

use crossplay_protocol::{BlockDescriptor, PlayerSnapshot, WorldSnapshot};

/// Errors reported by a [`WorldStore`].
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// The world (or dimension) is not loaded.
    #[error("world {0} is not available")]
    Unavailable(String),

    /// The store could not answer the query.
    #[error("world query failed: {0}")]
    Query(String),

    /// The blocking task running the query panicked or was cancelled.
    #[error("world query task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Read access to the live game world.
///
/// Implementations must be safe to call from several blocking-pool threads
/// at once. Coordinates are passed through exactly as clients sent them;
/// the store decides what out-of-range or inverted regions mean.
pub trait WorldStore: Send + Sync + 'static {
    /// Every block in the square of chunks `radius` chunks around the
    /// chunk column at (`center_x`, `center_z`).
    fn chunk_blocks(
        &self,
        center_x: i32,
        center_z: i32,
        radius: i32,
    ) -> Result<Vec<BlockDescriptor>, WorldError>;

    /// Every block in the box spanned by the two corners, as given.
    fn area_blocks(
        &self,
        x1: i32,
        y1: i32,
        z1: i32,
        x2: i32,
        y2: i32,
        z2: i32,
    ) -> Result<Vec<BlockDescriptor>, WorldError>;

    /// Every online player.
    fn players(&self) -> Result<Vec<PlayerSnapshot>, WorldError>;

    /// Metadata of the main world.
    fn world_snapshot(&self) -> Result<WorldSnapshot, WorldError>;
}

/// Runs one store call on the blocking pool.
///
/// A panic inside the call surfaces as [`WorldError::Task`].
pub(crate) async fn run_blocking<T, F>(
    store: &Arc<dyn WorldStore>,
    query: F,
) -> Result<T, WorldError>
where
    T: Send + 'static,
    F: FnOnce(&dyn WorldStore) -> Result<T, WorldError> + Send + 'static,
{
    let store = Arc::clone(store);
    tokio::task::spawn_blocking(move || query(store.as_ref())).await?
}
