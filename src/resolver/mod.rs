//! Name resolution: maps a user-supplied name pattern onto running
//! instances.
//!
//! Matching is a case-sensitive prefix match on the name tag. When several
//! instances match, an exact name-tag match wins; otherwise every candidate
//! is returned for the caller to present.

use thiserror::Error;
use tracing::debug;

use crate::inventory::{Instance, Inventory, InventoryError, NameFilter, RegionScope};

/// Outcome of resolving a pattern.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ResolutionResult {
    /// No running instance matches.
    Empty,
    /// Exactly one instance was selected.
    Unique(Instance),
    /// Several instances remain; sorted by region then identifier.
    Ambiguous(Vec<Instance>),
}

/// Errors raised while resolving a pattern to a single instance.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ResolveError {
    /// Raised when the pattern is empty or whitespace.
    #[error("invalid instance name: {reason}")]
    InvalidQuery {
        /// Why the pattern was rejected.
        reason: String,
    },
    /// Raised when no running instance matches.
    #[error("no running instance named {pattern:?} in {scope}")]
    NoMatch {
        /// Pattern as typed.
        pattern: String,
        /// Scope that was searched.
        scope: RegionScope,
    },
    /// Raised when several running instances match.
    #[error("{pattern:?} matches {} running instances", candidates.len())]
    AmbiguousMatch {
        /// Pattern as typed.
        pattern: String,
        /// Matching instances, sorted by region then identifier.
        candidates: Vec<Instance>,
    },
    /// Raised when the inventory cannot be queried.
    #[error(transparent)]
    InventoryUnavailable(#[from] InventoryError),
}

/// Resolves names against an [`Inventory`] within a fixed scope.
#[derive(Clone, Debug)]
pub struct InstanceResolver<I: Inventory> {
    inventory: I,
    scope: RegionScope,
}

impl<I: Inventory> InstanceResolver<I> {
    /// Creates a resolver querying `scope`.
    pub const fn new(inventory: I, scope: RegionScope) -> Self {
        Self { inventory, scope }
    }

    /// Resolves `pattern` to zero, one, or several running instances.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::InvalidQuery`] for a blank pattern and
    /// [`ResolveError::InventoryUnavailable`] when the query fails.
    pub fn resolve(&self, pattern: &str) -> Result<ResolutionResult, ResolveError> {
        if pattern.trim().is_empty() {
            return Err(ResolveError::InvalidQuery {
                reason: String::from("instance name must not be empty"),
            });
        }

        let mut candidates = self.running_with_prefix(pattern)?;
        debug!(pattern, count = candidates.len(), scope = %self.scope, "resolved candidates");

        if candidates.len() > 1 {
            let exact: Vec<Instance> = candidates
                .iter()
                .filter(|instance| instance.has_exact_name(pattern))
                .cloned()
                .collect();
            if !exact.is_empty() {
                candidates = exact;
            }
        }

        let mut remaining = candidates.into_iter();
        Ok(match (remaining.next(), remaining.next()) {
            (None, _) => ResolutionResult::Empty,
            (Some(only), None) => ResolutionResult::Unique(only),
            (Some(first), Some(second)) => {
                let mut all = vec![first, second];
                all.extend(remaining);
                ResolutionResult::Ambiguous(all)
            }
        })
    }

    /// Resolves `pattern` to exactly one instance.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::NoMatch`] or [`ResolveError::AmbiguousMatch`]
    /// when the pattern does not identify a single instance, plus any error
    /// from [`InstanceResolver::resolve`].
    pub fn resolve_one(&self, pattern: &str) -> Result<Instance, ResolveError> {
        match self.resolve(pattern)? {
            ResolutionResult::Unique(instance) => Ok(instance),
            ResolutionResult::Empty => Err(ResolveError::NoMatch {
                pattern: pattern.to_owned(),
                scope: self.scope.clone(),
            }),
            ResolutionResult::Ambiguous(candidates) => Err(ResolveError::AmbiguousMatch {
                pattern: pattern.to_owned(),
                candidates,
            }),
        }
    }

    /// Lists running named instances whose name starts with `prefix`. An
    /// empty prefix lists every named instance.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::InventoryUnavailable`] when the query fails.
    pub fn list(&self, prefix: &str) -> Result<Vec<Instance>, ResolveError> {
        self.running_with_prefix(prefix)
    }

    fn running_with_prefix(&self, prefix: &str) -> Result<Vec<Instance>, ResolveError> {
        let filter = NameFilter::prefix(prefix);
        let mut instances: Vec<Instance> = self
            .inventory
            .query_instances(&self.scope, &filter)?
            .into_iter()
            .filter(|instance| instance.is_running() && filter.matches(instance))
            .collect();
        instances.sort_by(|left, right| {
            left.region
                .cmp(&right.region)
                .then_with(|| left.id.cmp(&right.id))
        });
        Ok(instances)
    }
}
