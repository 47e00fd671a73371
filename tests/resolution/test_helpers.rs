//! Shared fixtures and helpers for resolution BDD scenarios.

use std::cell::RefCell;
use std::rc::Rc;

use ec2ssh::test_support::FakeInventory;
use ec2ssh::{Instance, InstanceState, InventoryError, RegionScope, ResolveError};
use rstest::fixture;

pub const TEST_REGION: &str = "us-east-1";

#[derive(Clone, Debug, Default)]
pub struct ResolutionContext {
    pub instances: Rc<RefCell<Vec<Instance>>>,
    pub failure: Rc<RefCell<Option<InventoryError>>>,
    pub outcome: Rc<RefCell<Option<Result<Instance, ResolveError>>>>,
    pub candidates: Rc<RefCell<Option<Vec<String>>>>,
}

impl ResolutionContext {
    pub fn add_instance(&self, name: &str, id: &str, state: InstanceState) {
        self.instances.borrow_mut().push(
            Instance::new(id, TEST_REGION)
                .with_name(name)
                .with_state(state)
                .with_public_address("203.0.113.10"),
        );
    }

    pub fn inventory(&self) -> FakeInventory {
        let inventory = FakeInventory::new(self.instances.borrow().clone());
        if let Some(error) = self.failure.borrow().clone() {
            inventory.fail_with(error);
        }
        inventory
    }
}

#[fixture]
pub fn resolution_context() -> ResolutionContext {
    ResolutionContext::default()
}

pub fn scope() -> RegionScope {
    RegionScope::Region(String::from(TEST_REGION))
}

pub fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_owned)
        .collect()
}
