// API Middleware
//
// Ingress layers applied to every route: per-client rate limiting, CORS and
// the panic catcher.

pub mod cors;
pub mod panic;
pub mod rate_limit;

// Re-export commonly used items
pub use cors::cors_layer;
pub use panic::{handle_panic, UNHANDLED_ERROR};
pub use rate_limit::{client_rate_limit_middleware, RateLimitState, RATE_LIMIT_EXCEEDED};
