//! Settings validation.

use std::fmt::Display;

use crate::{ConfigError, Result};

/// Implemented by settings that can check their own bounds.
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Collects every violated rule so a misconfigured process reports all of
/// its problems at once.
#[derive(Debug, Default)]
pub struct Checks {
    problems: Vec<String>,
}

impl Checks {
    pub fn new() -> Self {
        Self::default()
    }

    /// `value` has at least one non-whitespace character.
    pub fn present(&mut self, key: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.problems.push(format!("{key} must not be empty"));
        }
        self
    }

    /// `min <= value <= max`.
    pub fn within<T>(&mut self, key: &str, value: T, min: T, max: T) -> &mut Self
    where
        T: PartialOrd + Display,
    {
        if value < min || value > max {
            self.problems
                .push(format!("{key} must be between {min} and {max}, got {value}"));
        }
        self
    }

    /// `value` is an http(s) origin such as `http://localhost:3000`.
    pub fn origin(&mut self, key: &str, value: &str) -> &mut Self {
        let rest = value
            .strip_prefix("http://")
            .or_else(|| value.strip_prefix("https://"));
        match rest {
            Some(host) if !host.is_empty() && !host.contains('/') => {}
            _ => self
                .problems
                .push(format!("{key} entry {value:?} is not an http(s) origin")),
        }
        self
    }

    /// Violations recorded so far.
    pub fn problems(&self) -> &[String] {
        &self.problems
    }

    /// `Ok` when no rule was violated.
    pub fn finish(&self) -> Result<()> {
        if self.problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(self.problems.join("; ")))
        }
    }
}
