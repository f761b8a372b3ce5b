//! Environment and `.env` loading.

use crate::{ConfigError, Result};
use std::collections::HashMap;
use std::env;
use std::path::Path;

/// Environment variable loader
///
/// Keys are returned lower-cased, so `MAX_TOKENS` becomes `max_tokens`.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvLoader;

impl EnvLoader {
    /// Load a `.env` file into the process environment.
    ///
    /// With no path, a `.env` in the working directory (or a parent) is used
    /// when present and silently skipped otherwise. An explicit path must exist.
    /// Variables already set in the environment are never overridden.
    pub fn load_dotenv(&self, path: Option<&Path>) -> Result<()> {
        match path {
            Some(path) => {
                dotenvy::from_path(path).map_err(|e| ConfigError::Dotenv {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
            }
            None => {
                dotenvy::dotenv().ok();
            }
        }
        Ok(())
    }

    /// Load all environment variables
    pub fn load(&self) -> HashMap<String, String> {
        self.collect(env::vars())
    }

    /// Normalize a set of variables the same way [`load`](Self::load) does.
    pub fn collect<I>(&self, vars: I) -> HashMap<String, String>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        vars.into_iter().map(|(key, value)| (key.to_lowercase(), value)).collect()
    }
}
