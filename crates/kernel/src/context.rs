use regionworld_stream::StreamConfig;

use crate::camera::{Camera, Viewport};

/// Everything a [`World`](crate::World) is built from.
///
/// Collaborators are handed over explicitly at construction; nothing is
/// looked up through global state.
#[derive(Debug, Clone)]
pub struct WorldContext<G, F> {
    pub camera: Camera,
    pub generator: G,
    pub characters: F,
    pub stream: StreamConfig,
}

impl<G, F> WorldContext<G, F> {
    pub fn new(generator: G, characters: F) -> Self {
        Self {
            camera: Camera::default(),
            generator,
            characters,
            stream: StreamConfig::default(),
        }
    }

    pub fn with_stream(mut self, stream: StreamConfig) -> Self {
        self.stream = stream;
        self
    }

    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.camera = Camera::new(viewport);
        self
    }
}
