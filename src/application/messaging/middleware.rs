//! Middleware system for interaction processing pipeline

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::domain::entities::Interaction;

/// Context passed through middleware chain
#[derive(Debug, Clone)]
pub struct Context {
    pub interaction: Interaction,
    pub channel_id: Option<String>,
    pub user_id: Option<String>,
    pub data: HashMap<String, String>,
}

impl Context {
    pub fn new(interaction: Interaction) -> Self {
        let channel_id = interaction.channel_id.clone();
        let user_id = interaction.user.as_ref().map(|u| u.id.clone());

        Self {
            interaction,
            channel_id,
            user_id,
            data: HashMap::new(),
        }
    }

    /// Get data from context
    pub fn get(&self, key: &str) -> Option<&String> {
        self.data.get(key)
    }

    /// Set data in context
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.data.insert(key.into(), value.into());
    }

    fn label(&self) -> &str {
        self.channel_id.as_deref().unwrap_or("-")
    }
}

/// Middleware trait - processors that can intercept and modify interaction handling
pub trait Middleware: Send + Sync {
    /// Process an interaction and optionally modify the context
    fn process(&self, ctx: Context, next: Next) -> MiddlewareResult;
}

/// Result of middleware processing
pub type MiddlewareResult = Result<Context, MiddlewareError>;

/// Final handler run after all middleware
pub type Endpoint = Arc<dyn Fn(Context) -> MiddlewareResult + Send + Sync>;

/// Middleware errors
#[derive(Debug, Clone)]
pub enum MiddlewareError {
    /// Stop processing and reply with the message
    Blocked(String),
    /// Rate limited
    RateLimited { retry_after: Duration },
    /// Command handler failed
    Failed(String),
    /// Internal error
    Internal(String),
}

impl std::fmt::Display for MiddlewareError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MiddlewareError::Blocked(msg) => write!(f, "Blocked: {}", msg),
            MiddlewareError::RateLimited { retry_after } => {
                write!(f, "Rate limited, retry after {:?}", retry_after)
            }
            MiddlewareError::Failed(msg) => write!(f, "Handler failed: {}", msg),
            MiddlewareError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for MiddlewareError {}

/// Next middleware in chain
#[derive(Clone)]
pub struct Next {
    remaining: Arc<[Arc<dyn Middleware>]>,
    endpoint: Endpoint,
}

impl Next {
    pub fn new(middlewares: Vec<Arc<dyn Middleware>>, endpoint: Endpoint) -> Self {
        Self {
            remaining: middlewares.into(),
            endpoint,
        }
    }

    /// Process remaining middleware, then the endpoint
    pub fn run(self, ctx: Context) -> MiddlewareResult {
        match self.remaining.split_first() {
            Some((first, rest)) => {
                let next = Next {
                    remaining: rest.to_vec().into(),
                    endpoint: Arc::clone(&self.endpoint),
                };
                first.process(ctx, next)
            }
            None => (self.endpoint)(ctx),
        }
    }
}

/// Middleware chain builder
pub struct MiddlewareChain {
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self {
            middlewares: Vec::new(),
        }
    }

    pub fn add<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    pub fn build(self) -> Vec<Arc<dyn Middleware>> {
        self.middlewares
    }
}

impl Default for MiddlewareChain {
    fn default() -> Self {
        Self::new()
    }
}

/// Rate limit middleware
pub struct RateLimitMiddleware {
    requests: Mutex<HashMap<String, Vec<Instant>>>,
    max_requests: u32,
    window: Duration,
}

impl RateLimitMiddleware {
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            requests: Mutex::new(HashMap::new()),
            max_requests,
            window: Duration::from_secs(window_secs),
        }
    }

    fn check_rate_limit(&self, key: &str) -> Result<(), MiddlewareError> {
        let mut requests = self.requests.lock()
            .map_err(|_| MiddlewareError::Internal("Lock poisoned".to_string()))?;

        let now = Instant::now();

        // Drop requests outside the window, and keys with none left
        requests.retain(|_, times| {
            times.retain(|&t| now.duration_since(t) < self.window);
            !times.is_empty()
        });

        let times = requests.entry(key.to_string()).or_default();

        if times.len() >= self.max_requests as usize {
            let retry_after = times.first()
                .map(|t| self.window.saturating_sub(now.duration_since(*t)))
                .unwrap_or(self.window);

            return Err(MiddlewareError::RateLimited { retry_after });
        }

        times.push(now);
        Ok(())
    }
}

#[cfg(test)]
impl RateLimitMiddleware {
    fn tracked_keys(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }
}

impl Middleware for RateLimitMiddleware {
    fn process(&self, ctx: Context, next: Next) -> MiddlewareResult {
        // Rate limit by user, falling back to channel
        let key = ctx.user_id.clone()
            .or_else(|| ctx.channel_id.clone())
            .unwrap_or_default();

        self.check_rate_limit(&key)?;

        next.run(ctx)
    }
}

/// Logging middleware for debugging
pub struct LoggingMiddleware;

impl Middleware for LoggingMiddleware {
    fn process(&self, ctx: Context, next: Next) -> MiddlewareResult {
        let label = ctx.label().to_string();
        let command = ctx.interaction.command_name().unwrap_or("[non-command]").to_string();

        tracing::debug!("[{}] /{} ({})", label, command, ctx.interaction.kind.as_str());

        let result = next.run(ctx);

        match &result {
            Ok(_) => {
                tracing::debug!("[{}] /{} processed OK", label, command);
            }
            Err(e) => {
                tracing::warn!("[{}] /{} error: {}", label, command, e);
            }
        }

        result
    }
}
