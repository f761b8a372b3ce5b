//! In-memory registry of destination tokens.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use pushcast_log::redact;
use pushcast_push::{DeliveryOutcome, DeliveryStatus};
use tracing::{debug, info, warn};

use crate::{CoreError, Registration, RegistryStats, Result, TokenRecord, TokenSummary};

/// Source of "now" for record timestamps.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Owns every known destination token and its lifecycle metadata.
///
/// A single mutex guards the whole map; every operation holds it for the
/// duration of one call, so operations are linearizable.
pub struct TokenRegistry {
    inner: Mutex<Inner>,
    max_tokens: usize,
    clock: Clock,
}

struct Inner {
    records: HashMap<String, TokenRecord>,
    next_seq: u64,
}

impl TokenRegistry {
    /// Create an empty registry that evicts inactive tokens once `max_tokens`
    /// records are held.
    pub fn new(max_tokens: usize) -> Self {
        Self::with_clock(max_tokens, Arc::new(Utc::now))
    }

    /// Create with a custom clock.
    pub fn with_clock(max_tokens: usize, clock: Clock) -> Self {
        info!(max_tokens, "Initializing token registry");
        Self {
            inner: Mutex::new(Inner {
                records: HashMap::new(),
                next_seq: 0,
            }),
            max_tokens,
            clock,
        }
    }

    /// Register `token`, or refresh it if already known.
    ///
    /// A refresh updates `last_active` and reactivates the record. A new
    /// token is inserted after evicting every inactive record if the
    /// registry is at capacity.
    pub fn register(&self, token: &str) -> Result<Registration> {
        if token.is_empty() {
            return Err(CoreError::InvalidInput("Invalid token provided".to_string()));
        }

        let now = (self.clock)();
        let mut inner = self.inner.lock();

        if let Some(record) = inner.records.get_mut(token) {
            record.last_active = now;
            record.is_active = true;
            info!(token = %redact(token), "Updated existing token");
            return Ok(Registration {
                is_new: false,
                total_count: inner.records.len(),
            });
        }

        if inner.records.len() >= self.max_tokens {
            let before = inner.records.len();
            inner.records.retain(|_, record| record.is_active);
            let evicted = before - inner.records.len();
            info!(evicted, "Cleaned up inactive tokens");

            if inner.records.len() >= self.max_tokens {
                warn!(
                    size = inner.records.len(),
                    max_tokens = self.max_tokens,
                    "Registry over capacity with no inactive tokens to evict"
                );
            }
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner
            .records
            .insert(token.to_string(), TokenRecord::new(now, seq));
        info!(token = %redact(token), "Registered new token");

        Ok(Registration {
            is_new: true,
            total_count: inner.records.len(),
        })
    }

    /// Remove `token`. Returns whether a record was removed.
    pub fn unregister(&self, token: &str) -> bool {
        let removed = self.inner.lock().records.remove(token).is_some();
        if removed {
            info!(token = %redact(token), "Removed token");
        } else {
            info!(token = %redact(token), "Attempted to remove non-existent token");
        }
        removed
    }

    /// Snapshot of the tokens currently marked active, in no particular order.
    pub fn list_active(&self) -> Vec<String> {
        self.inner
            .lock()
            .records
            .iter()
            .filter(|(_, record)| record.is_active)
            .map(|(token, _)| token.clone())
            .collect()
    }

    /// Apply delivery outcomes to the matching records.
    ///
    /// Outcomes for tokens no longer registered are ignored. A terminal
    /// failure (`Unregistered`, `InvalidArgument`) deactivates the record.
    pub fn record_results(&self, outcomes: &[DeliveryOutcome]) {
        let now = (self.clock)();
        let mut inner = self.inner.lock();

        for outcome in outcomes {
            let Some(record) = inner.records.get_mut(&outcome.token) else {
                debug!(token = %redact(&outcome.token), "Outcome for unknown token ignored");
                continue;
            };

            match &outcome.status {
                DeliveryStatus::Delivered { .. } => {
                    record.successful_sends += 1;
                    record.last_active = now;
                }
                DeliveryStatus::Failed { kind, .. } => {
                    record.failed_sends += 1;
                    if kind.is_terminal() && record.is_active {
                        record.is_active = false;
                        warn!(
                            token = %redact(&outcome.token),
                            kind = %kind,
                            "Marked token as inactive"
                        );
                    }
                }
            }
        }
    }

    /// Aggregate counts over all records.
    pub fn stats(&self) -> RegistryStats {
        let inner = self.inner.lock();
        let mut stats = RegistryStats {
            total: inner.records.len(),
            ..RegistryStats::default()
        };

        for record in inner.records.values() {
            if record.is_active {
                stats.active += 1;
            }
            stats.total_success += record.successful_sends;
            stats.total_failure += record.failed_sends;
        }
        stats.inactive = stats.total - stats.active;

        stats
    }

    /// Record metadata in registration order, with tokens replaced by
    /// `token_1`, `token_2`, ….
    pub fn snapshot(&self) -> Vec<TokenSummary> {
        let inner = self.inner.lock();
        let mut records: Vec<&TokenRecord> = inner.records.values().collect();
        records.sort_by_key(|record| record.seq);

        records
            .into_iter()
            .enumerate()
            .map(|(i, record)| TokenSummary {
                id: format!("token_{}", i + 1),
                registered_at: record.registered_at,
                last_active: record.last_active,
                successful_sends: record.successful_sends,
                failed_sends: record.failed_sends,
                is_active: record.is_active,
            })
            .collect()
    }

    /// Copy of the record for `token`, if registered.
    pub fn get(&self, token: &str) -> Option<TokenRecord> {
        self.inner.lock().records.get(token).cloned()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.inner.lock().records.len()
    }

    /// Whether the registry holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
