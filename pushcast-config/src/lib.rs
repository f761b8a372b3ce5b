//! Server configuration for pushcast.
//!
//! Variables come from the process environment, optionally seeded from a
//! `.env` file, and are validated as a whole before the server starts.

pub mod env;
pub mod error;
pub mod settings;
pub mod validation;

pub use env::EnvLoader;
pub use error::{ConfigError, Result};
pub use settings::{DEFAULT_CORS_ORIGINS, ServerConfig};
pub use validation::{Checks, Validate};
