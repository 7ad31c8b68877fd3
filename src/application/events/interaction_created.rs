use std::sync::Arc;

use super::Event;
use crate::domain::entities::Interaction;
use crate::domain::traits::Bot;

/// Emitted for every interaction the client receives
#[derive(Clone)]
pub struct InteractionCreated {
    pub interaction: Interaction,
    pub client: Arc<dyn Bot>,
}

impl InteractionCreated {
    pub fn new(interaction: Interaction, client: Arc<dyn Bot>) -> Self {
        Self { interaction, client }
    }
}

impl Event for InteractionCreated {
    const NAME: &'static str = "interaction:created";
}
