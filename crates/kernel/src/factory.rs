use crate::entity::{Entity, PLAYER_KIND, Vitals};

/// Kind of the auxiliary entity placed in the origin region on reset.
pub const SENTINEL_KIND: &str = "sentinel";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FactoryError {
    #[error("unknown character kind: {0}")]
    UnknownKind(String),
    #[error("factory built a {built:?} when asked for a {requested:?}")]
    WrongKind { requested: String, built: String },
}

/// Builds entities by kind name. New entities start at the origin.
pub trait CharacterFactory {
    fn create(&mut self, kind: &str) -> Result<Entity, FactoryError>;
}

/// Knows the player and the sentinel.
#[derive(Debug, Clone, Default)]
pub struct DefaultCharacterFactory;

impl CharacterFactory for DefaultCharacterFactory {
    fn create(&mut self, kind: &str) -> Result<Entity, FactoryError> {
        let vitals = match kind {
            PLAYER_KIND => Vitals::full(100),
            SENTINEL_KIND => Vitals::full(50),
            other => return Err(FactoryError::UnknownKind(other.to_owned())),
        };
        Ok(Entity::new(kind, vitals))
    }
}
