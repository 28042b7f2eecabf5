//! Health probe handling.
//!
//! # Data Flow
//! ```text
//! Registry probe GET /{health_path}
//!     → interceptor.rs decides Intercept | Forward
//!     → Intercept: 200, empty body, backend never contacted
//!     → Forward: request continues to the dispatcher like any other
//! ```

pub mod interceptor;

pub use interceptor::{Decision, HealthInterceptor};
