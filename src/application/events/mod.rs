//! Event bus - typed events fanned out to subscribed listeners

pub mod bot_started;
pub mod interaction_created;

pub use bot_started::BotStarted;
pub use interaction_created::InteractionCreated;

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;

use crate::application::errors::BotError;

/// Marker for values that can be emitted on the bus
pub trait Event: Send + Sync + 'static {
    /// Name used in logs
    const NAME: &'static str;
}

/// Reacts to one event type
#[async_trait]
pub trait Listener<E: Event>: Send + Sync {
    async fn handle(&self, event: &E) -> Result<(), BotError>;
}

/// Event emitter.
///
/// Listeners run in subscription order. A failing listener is logged and
/// does not prevent the others from running.
#[derive(Default)]
pub struct Emitter {
    // Values are `Arc<dyn Listener<E>>` keyed by `TypeId::of::<E>()`.
    listeners: RwLock<HashMap<TypeId, Vec<Box<dyn Any + Send + Sync>>>>,
}

impl Emitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a listener to events of type `E`
    pub fn on<E, L>(&self, listener: L)
    where
        E: Event,
        L: Listener<E> + 'static,
    {
        let listener: Arc<dyn Listener<E>> = Arc::new(listener);
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(TypeId::of::<E>())
            .or_default()
            .push(Box::new(listener));
        tracing::debug!("Listener subscribed to {}", E::NAME);
    }

    pub fn listener_count<E: Event>(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&TypeId::of::<E>())
            .map_or(0, Vec::len)
    }

    /// Dispatch an event, returning how many listeners handled it successfully
    pub async fn emit<E: Event>(&self, event: E) -> usize {
        let listeners: Vec<Arc<dyn Listener<E>>> = {
            let map = self.listeners.read().unwrap_or_else(PoisonError::into_inner);
            match map.get(&TypeId::of::<E>()) {
                Some(list) => list
                    .iter()
                    .filter_map(|l| l.downcast_ref::<Arc<dyn Listener<E>>>().cloned())
                    .collect(),
                None => {
                    tracing::trace!("No listeners for {}", E::NAME);
                    return 0;
                }
            }
        };

        let mut handled = 0;
        for listener in listeners {
            match listener.handle(&event).await {
                Ok(()) => handled += 1,
                Err(e) => tracing::error!(event = E::NAME, "Listener failed: {}", e),
            }
        }
        handled
    }
}
