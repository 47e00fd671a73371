//! Unit tests for the inventory module.

use super::*;
use crate::aws::AwsCli;
use crate::test_support::{ScriptedRunner, describe_instances_json, describe_regions_json};
use rstest::{fixture, rstest};

#[fixture]
fn runner() -> ScriptedRunner {
    ScriptedRunner::new()
}

fn inventory(runner: &ScriptedRunner) -> Ec2Inventory<ScriptedRunner> {
    Ec2Inventory::new(AwsCli::new("aws", None, runner.clone()), DEFAULT_NAME_TAG)
}

#[rstest]
#[case("web", "web*")]
#[case("", "*")]
#[case("a*b", "a\\*b*")]
#[case("what?", "what\\?*")]
#[case("back\\slash", "back\\\\slash*")]
fn tag_pattern_escapes_wildcards(#[case] prefix: &str, #[case] expected: &str) {
    assert_eq!(NameFilter::prefix(prefix).to_tag_pattern(), expected);
}

#[rstest]
#[case("running", InstanceState::Running)]
#[case("stopped", InstanceState::Stopped)]
#[case("shutting-down", InstanceState::ShuttingDown)]
#[case("rebooting", InstanceState::Other(String::from("rebooting")))]
fn provider_states_map_to_enum(#[case] raw: &str, #[case] expected: InstanceState) {
    let state = InstanceState::from_provider(raw);
    assert_eq!(state, expected);
    assert_eq!(state.as_str(), raw);
}

#[test]
fn arn_requires_owner() {
    let instance = Instance::new("i-1", "us-east-1");
    assert_eq!(instance.arn(), None);
    assert_eq!(
        instance.with_owner("123456789012").arn().as_deref(),
        Some("arn:aws:ec2:us-east-1:123456789012:instance/i-1")
    );
}

#[test]
fn any_address_skips_blank_public_address() {
    let instance = Instance::new("i-1", "us-east-1")
        .with_public_address("  ")
        .with_private_address("10.0.0.1");
    assert_eq!(instance.any_address(), Some("10.0.0.1"));
}

#[rstest]
fn query_parses_reservations_and_tags(runner: ScriptedRunner) {
    runner.push_output(
        Some(0),
        describe_instances_json(
            "123456789012",
            &[Instance::new("i-1", "ignored")
                .with_name("web-1")
                .with_public_address("54.0.0.1")
                .with_private_address("10.0.0.1")
                .with_platform("Linux/UNIX")],
        ),
        "",
    );

    let instances = inventory(&runner)
        .query_instances(
            &RegionScope::Region(String::from("us-east-1")),
            &NameFilter::prefix("web"),
        )
        .expect("query should succeed");

    assert_eq!(
        instances,
        vec![
            Instance::new("i-1", "us-east-1")
                .with_name("web-1")
                .with_public_address("54.0.0.1")
                .with_private_address("10.0.0.1")
                .with_platform("Linux/UNIX")
                .with_owner("123456789012")
        ]
    );
}

#[rstest]
fn query_sends_tag_and_state_filters(runner: ScriptedRunner) {
    runner.push_output(Some(0), describe_instances_json("1", &[]), "");

    inventory(&runner)
        .query_instances(
            &RegionScope::Region(String::from("eu-west-1")),
            &NameFilter::prefix("db"),
        )
        .expect("query should succeed");

    let invocation = runner.invocations().pop().expect("one invocation");
    let command = invocation.command_string();
    assert!(command.starts_with("aws ec2 describe-instances --filters "), "{command}");
    assert!(command.contains("\"Name\":\"tag:Name\""), "{command}");
    assert!(command.contains("\"Values\":[\"db*\"]"), "{command}");
    assert!(command.contains("\"Values\":[\"running\"]"), "{command}");
    assert!(command.ends_with("--output json --region eu-west-1"), "{command}");
}

#[rstest]
fn all_regions_queries_each_region(runner: ScriptedRunner) {
    runner.push_output(Some(0), describe_regions_json(&["us-west-2", "eu-west-1"]), "");
    runner.push_output(
        Some(0),
        describe_instances_json("1", &[Instance::new("i-eu", "x").with_name("web")]),
        "",
    );
    runner.push_output(
        Some(0),
        describe_instances_json("1", &[Instance::new("i-us", "x").with_name("web")]),
        "",
    );

    let instances = inventory(&runner)
        .query_instances(&RegionScope::AllRegions, &NameFilter::prefix("web"))
        .expect("query should succeed");

    let located: Vec<(&str, &str)> = instances
        .iter()
        .map(|instance| (instance.id.as_str(), instance.region.as_str()))
        .collect();
    assert_eq!(located, vec![("i-eu", "eu-west-1"), ("i-us", "us-west-2")]);
}

#[rstest]
fn credential_failures_are_rejected_queries(runner: ScriptedRunner) {
    runner.push_output(Some(253), "", "Unable to locate credentials");

    let err = inventory(&runner)
        .query_instances(
            &RegionScope::Region(String::from("us-east-1")),
            &NameFilter::prefix("web"),
        )
        .expect_err("query should fail");

    assert!(
        matches!(err, InventoryError::Rejected(ref message) if message.contains("credentials")),
        "unexpected error: {err}"
    );
}

#[rstest]
fn missing_cli_is_unreachable(runner: ScriptedRunner) {
    let err = inventory(&runner)
        .query_instances(
            &RegionScope::Region(String::from("us-east-1")),
            &NameFilter::prefix("web"),
        )
        .expect_err("query should fail without scripted output");

    assert!(matches!(err, InventoryError::Unreachable(_)), "unexpected error: {err}");
}

#[rstest]
fn timeouts_map_to_timeout_variant(runner: ScriptedRunner) {
    runner.push_timeout(3000);

    let err = inventory(&runner)
        .query_instances(
            &RegionScope::Region(String::from("us-east-1")),
            &NameFilter::prefix("web"),
        )
        .expect_err("query should time out");

    assert!(matches!(err, InventoryError::Timeout(_)), "unexpected error: {err}");
}
