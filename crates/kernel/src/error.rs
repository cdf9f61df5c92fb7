use regionworld_common::{EntityId, PositionError};
use regionworld_stream::{KeyError, RegionKey};

use crate::factory::FactoryError;
use crate::region::RegionError;

/// Errors surfaced by [`World`](crate::World) operations.
///
/// Queries against regions that have not streamed in are not errors; they
/// return empty results.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    #[error("invalid position: {0}")]
    InvalidPosition(#[from] PositionError),
    #[error("character factory failed: {0}")]
    Factory(#[from] FactoryError),
    #[error("region {key} failed to encode")]
    Encode {
        key: RegionKey,
        #[source]
        source: RegionError,
    },
    #[error("saved region key ({column}, {row}) is invalid")]
    BadKey {
        column: String,
        row: String,
        #[source]
        source: KeyError,
    },
    #[error("saved region ({column}, {row}) is malformed")]
    MalformedRegion {
        column: String,
        row: String,
        #[source]
        source: RegionError,
    },
    #[error("save lists region {0} more than once")]
    DuplicateRegion(RegionKey),
    #[error("entity {0:?} is already in the world")]
    DuplicateEntity(EntityId),
    #[error("world would hold {count} player entities")]
    DuplicatePlayer { count: usize },
}
