//! Interaction handling - middleware pipeline in front of the command service

pub mod dispatcher;
pub mod middleware;
pub mod parser;

pub use dispatcher::{InteractionDispatcher, RATE_LIMITED_REPLY};
pub use middleware::{LoggingMiddleware, Middleware, MiddlewareChain, RateLimitMiddleware};
pub use parser::InteractionParser;
