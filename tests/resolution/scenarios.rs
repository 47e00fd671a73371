//! BDD scenarios for resolution and completion.

use rstest_bdd_macros::scenario;

use super::test_helpers::{ResolutionContext, resolution_context};

#[scenario(
    path = "tests/features/resolve.feature",
    name = "Select the single running instance with a matching prefix"
)]
fn scenario_unique_prefix(resolution_context: ResolutionContext) {
    let _ = resolution_context;
}

#[scenario(
    path = "tests/features/resolve.feature",
    name = "Reject a prefix shared by several running instances"
)]
fn scenario_ambiguous_prefix(resolution_context: ResolutionContext) {
    let _ = resolution_context;
}

#[scenario(
    path = "tests/features/resolve.feature",
    name = "Prefer an exact name over longer prefix matches"
)]
fn scenario_exact_name_wins(resolution_context: ResolutionContext) {
    let _ = resolution_context;
}

#[scenario(
    path = "tests/features/resolve.feature",
    name = "Ignore instances that are not running"
)]
fn scenario_not_running(resolution_context: ResolutionContext) {
    let _ = resolution_context;
}

#[scenario(
    path = "tests/features/resolve.feature",
    name = "Surface inventory failures"
)]
fn scenario_inventory_failure(resolution_context: ResolutionContext) {
    let _ = resolution_context;
}

#[scenario(
    path = "tests/features/completion.feature",
    name = "Offer running names that share the typed prefix"
)]
fn scenario_complete_prefix(resolution_context: ResolutionContext) {
    let _ = resolution_context;
}

#[scenario(
    path = "tests/features/completion.feature",
    name = "Keep the login prefix on every candidate"
)]
fn scenario_complete_login_prefix(resolution_context: ResolutionContext) {
    let _ = resolution_context;
}

#[scenario(
    path = "tests/features/completion.feature",
    name = "Stay silent when the inventory times out"
)]
fn scenario_complete_timeout(resolution_context: ResolutionContext) {
    let _ = resolution_context;
}
