//! Shell completion of instance names.
//!
//! Completion runs inside the user's shell prompt, so it never fails: every
//! error is logged at debug level and produces no candidates.

use std::collections::BTreeSet;

use tracing::debug;

use crate::inventory::{Inventory, NameFilter, RegionScope};

/// Produces completion candidates from an [`Inventory`].
#[derive(Clone, Debug)]
pub struct CompletionService<I: Inventory> {
    inventory: I,
    scope: RegionScope,
}

impl<I: Inventory> CompletionService<I> {
    /// Creates a service querying `scope`. The inventory should already be
    /// bounded by the completion timeout.
    pub const fn new(inventory: I, scope: RegionScope) -> Self {
        Self { inventory, scope }
    }

    /// Returns the sorted, de-duplicated names of running instances that
    /// start with `word`. A `user@` prefix is carried onto every candidate.
    #[must_use]
    pub fn complete_names(&self, word: &str) -> Vec<String> {
        let (user_prefix, partial) = match word.split_once('@') {
            Some((user, rest)) => (format!("{user}@"), rest),
            None => (String::new(), word),
        };

        let filter = NameFilter::prefix(partial);
        let instances = match self.inventory.query_instances(&self.scope, &filter) {
            Ok(found) => found,
            Err(err) => {
                debug!(error = %err, word, "completion query failed");
                return Vec::new();
            }
        };

        let names: BTreeSet<&str> = instances
            .iter()
            .filter(|instance| instance.is_running())
            .flat_map(|instance| instance.name_tags.iter())
            .map(String::as_str)
            .filter(|name| name.starts_with(partial))
            .collect();

        names
            .into_iter()
            .map(|name| format!("{user_prefix}{name}"))
            .collect()
    }
}
