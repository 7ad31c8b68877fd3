use std::sync::Arc;

use super::Event;
use crate::domain::traits::Bot;

/// Emitted once the chat client reports it is connected and ready
#[derive(Clone)]
pub struct BotStarted {
    pub client: Arc<dyn Bot>,
}

impl BotStarted {
    pub fn new(client: Arc<dyn Bot>) -> Self {
        Self { client }
    }
}

impl Event for BotStarted {
    const NAME: &'static str = "bot:started";
}
