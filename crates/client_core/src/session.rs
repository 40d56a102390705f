use shared::error::ListError;
use tracing::warn;

use crate::{
    controller::{ListController, RenderSink},
    record::Record,
};

/// Answers whether the operator may open list screens.
pub trait SessionGate: Send + Sync {
    fn is_authenticated(&self) -> bool;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionFlag(pub bool);

impl SessionGate for SessionFlag {
    fn is_authenticated(&self) -> bool {
        self.0
    }
}

/// Builds an empty controller for a screen, or refuses when the session is closed.
pub fn open_screen<T, S, G>(
    gate: &G,
    page_size: usize,
    fallback: Vec<T>,
    sink: S,
) -> Result<ListController<T, S>, ListError>
where
    T: Record,
    S: RenderSink<T>,
    G: SessionGate + ?Sized,
{
    if !gate.is_authenticated() {
        warn!(screen = T::KIND, "screen refused: session not authenticated");
        return Err(ListError::Unauthenticated);
    }
    Ok(ListController::new(page_size, fallback, sink))
}
