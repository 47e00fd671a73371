//! BDD step definitions for resolution and completion behaviour.

use ec2ssh::{
    CompletionService, InstanceResolver, InstanceState, InventoryError, ResolveError,
};
use rstest_bdd_macros::{given, then, when};

use super::test_helpers::{ResolutionContext, scope, split_list};

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("assertion failed: {0}")]
    Assertion(String),
}

#[given("a running instance \"{name}\" with id \"{id}\"")]
fn running_instance(
    resolution_context: ResolutionContext,
    name: String,
    id: String,
) -> ResolutionContext {
    resolution_context.add_instance(name.trim(), id.trim(), InstanceState::Running);
    resolution_context
}

#[given("a stopped instance \"{name}\" with id \"{id}\"")]
fn stopped_instance(
    resolution_context: ResolutionContext,
    name: String,
    id: String,
) -> ResolutionContext {
    resolution_context.add_instance(name.trim(), id.trim(), InstanceState::Stopped);
    resolution_context
}

#[given("the inventory rejects credentials")]
fn inventory_rejects(resolution_context: ResolutionContext) -> ResolutionContext {
    resolution_context
        .failure
        .replace(Some(InventoryError::Rejected(String::from(
            "Unable to locate credentials",
        ))));
    resolution_context
}

#[given("the inventory times out")]
fn inventory_times_out(resolution_context: ResolutionContext) -> ResolutionContext {
    resolution_context
        .failure
        .replace(Some(InventoryError::Timeout(String::from(
            "aws timed out after 3000ms",
        ))));
    resolution_context
}

#[when("I resolve \"{pattern}\"")]
fn resolve_pattern(resolution_context: ResolutionContext, pattern: String) -> ResolutionContext {
    let resolver = InstanceResolver::new(resolution_context.inventory(), scope());
    resolution_context
        .outcome
        .replace(Some(resolver.resolve_one(&pattern)));
    resolution_context
}

#[when("I complete \"{word}\"")]
fn complete_word(resolution_context: ResolutionContext, word: String) -> ResolutionContext {
    let service = CompletionService::new(resolution_context.inventory(), scope());
    resolution_context
        .candidates
        .replace(Some(service.complete_names(&word)));
    resolution_context
}

#[then("the resolution selects \"{id}\"")]
fn resolution_selects(resolution_context: &ResolutionContext, id: String) -> Result<(), StepError> {
    match resolution_context.outcome.borrow().as_ref() {
        Some(Ok(instance)) if instance.id == id => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected {id} to be selected, got {other:?}"
        ))),
    }
}

#[then("the resolution is ambiguous between \"{ids}\"")]
fn resolution_is_ambiguous(
    resolution_context: &ResolutionContext,
    ids: String,
) -> Result<(), StepError> {
    let expected = split_list(&ids);
    match resolution_context.outcome.borrow().as_ref() {
        Some(Err(ResolveError::AmbiguousMatch { candidates, .. })) => {
            let found: Vec<String> = candidates.iter().map(|c| c.id.clone()).collect();
            if found == expected {
                Ok(())
            } else {
                Err(StepError::Assertion(format!(
                    "expected candidates {expected:?}, got {found:?}"
                )))
            }
        }
        other => Err(StepError::Assertion(format!(
            "expected an ambiguous match, got {other:?}"
        ))),
    }
}

#[then("no instance matches")]
fn no_instance_matches(resolution_context: &ResolutionContext) -> Result<(), StepError> {
    match resolution_context.outcome.borrow().as_ref() {
        Some(Err(ResolveError::NoMatch { .. })) => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected no match, got {other:?}"
        ))),
    }
}

#[then("the inventory is unavailable")]
fn inventory_unavailable(resolution_context: &ResolutionContext) -> Result<(), StepError> {
    match resolution_context.outcome.borrow().as_ref() {
        Some(Err(ResolveError::InventoryUnavailable(InventoryError::Rejected(_)))) => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected a rejected inventory query, got {other:?}"
        ))),
    }
}

#[then("the candidates are \"{names}\"")]
fn candidates_are(resolution_context: &ResolutionContext, names: String) -> Result<(), StepError> {
    let expected = split_list(&names);
    match resolution_context.candidates.borrow().as_ref() {
        Some(found) if *found == expected => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected candidates {expected:?}, got {other:?}"
        ))),
    }
}

#[then("no candidates are offered")]
fn no_candidates(resolution_context: &ResolutionContext) -> Result<(), StepError> {
    match resolution_context.candidates.borrow().as_ref() {
        Some(found) if found.is_empty() => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected no candidates, got {other:?}"
        ))),
    }
}
