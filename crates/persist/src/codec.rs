//! JSON text form of a [`WorldSave`].

use regionworld_kernel::{CharacterFactory, RegionGenerator, World, WorldError, WorldSave};

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("save text is not valid JSON for a world save: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    World(#[from] WorldError),
}

pub fn to_json_string(save: &WorldSave) -> Result<String, CodecError> {
    Ok(serde_json::to_string(save)?)
}

pub fn from_json_str(text: &str) -> Result<WorldSave, CodecError> {
    Ok(serde_json::from_str(text)?)
}

/// Serialize the whole world to its JSON save text.
pub fn serialize_world<G, F>(world: &World<G, F>) -> Result<String, CodecError>
where
    G: RegionGenerator,
    F: CharacterFactory,
{
    to_json_string(&world.serialize()?)
}

/// Replace `world` with the one described by `text`. On error the world is
/// unchanged.
pub fn load_from_serialized<G, F>(world: &mut World<G, F>, text: &str) -> Result<(), CodecError>
where
    G: RegionGenerator,
    F: CharacterFactory,
{
    let save = from_json_str(text)?;
    world.load(&save)?;
    tracing::debug!(bytes = text.len(), "world loaded from text");
    Ok(())
}
