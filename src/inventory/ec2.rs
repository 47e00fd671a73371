//! EC2 inventory backed by `aws ec2 describe-instances`.

use std::ffi::OsString;

use serde_json::json;
use tracing::debug;

use super::types::{DescribeInstancesOutput, DescribeRegionsOutput, Ec2Instance};
use super::{Instance, InstanceState, Inventory, InventoryError, NameFilter, RegionScope};
use crate::aws::AwsCli;
use crate::process::CommandRunner;

/// Tag key holding the human-friendly instance name.
pub const DEFAULT_NAME_TAG: &str = "Name";

/// Queries running EC2 instances by name tag through the AWS CLI.
#[derive(Clone, Debug)]
pub struct Ec2Inventory<R: CommandRunner> {
    aws: AwsCli<R>,
    name_tag: String,
}

impl<R: CommandRunner> Ec2Inventory<R> {
    /// Creates an inventory that matches instances on the `name_tag` key.
    pub fn new(aws: AwsCli<R>, name_tag: impl Into<String>) -> Self {
        Self {
            aws,
            name_tag: name_tag.into(),
        }
    }

    /// Lists the regions enabled for the caller's account.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError`] when the CLI fails or its output cannot be
    /// parsed.
    pub fn list_regions(&self) -> Result<Vec<String>, InventoryError> {
        let output: DescribeRegionsOutput =
            self.aws
                .run_json("ec2", "describe-regions", None, &[], "regions")?;
        let mut regions: Vec<String> = output
            .regions
            .into_iter()
            .map(|region| region.region_name)
            .collect();
        regions.sort();
        Ok(regions)
    }

    fn describe_instances(
        &self,
        region: &str,
        filter: &NameFilter,
    ) -> Result<Vec<Instance>, InventoryError> {
        let args = vec![
            OsString::from("--filters"),
            OsString::from(self.filters_json(filter)),
        ];
        let output: DescribeInstancesOutput =
            self.aws
                .run_json("ec2", "describe-instances", Some(region), &args, "instances")?;

        let instances: Vec<Instance> = output
            .reservations
            .into_iter()
            .flat_map(|reservation| {
                let owner = reservation.owner_id;
                reservation
                    .instances
                    .into_iter()
                    .map(move |raw| (owner.clone(), raw))
            })
            .map(|(owner, raw)| self.to_instance(region, owner, raw))
            .collect();
        debug!(region, count = instances.len(), "described instances");
        Ok(instances)
    }

    fn filters_json(&self, filter: &NameFilter) -> String {
        json!([
            {
                "Name": format!("tag:{}", self.name_tag),
                "Values": [filter.to_tag_pattern()],
            },
            {
                "Name": "instance-state-name",
                "Values": ["running"],
            },
        ])
        .to_string()
    }

    fn to_instance(&self, region: &str, owner_id: Option<String>, raw: Ec2Instance) -> Instance {
        let name_tags = raw
            .tags
            .into_iter()
            .filter(|tag| tag.key == self.name_tag)
            .map(|tag| tag.value)
            .collect();
        let state = raw.state.map_or_else(
            || InstanceState::Other(String::from("unknown")),
            |state| InstanceState::from_provider(&state.name),
        );

        Instance {
            id: raw.instance_id,
            name_tags,
            public_address: raw.public_ip_address,
            private_address: raw.private_ip_address,
            state,
            region: region.to_owned(),
            owner_id,
            platform_details: raw.platform_details,
        }
    }
}

impl<R: CommandRunner> Inventory for Ec2Inventory<R> {
    fn query_instances(
        &self,
        scope: &RegionScope,
        filter: &NameFilter,
    ) -> Result<Vec<Instance>, InventoryError> {
        let regions = match scope {
            RegionScope::Region(name) => vec![name.clone()],
            RegionScope::AllRegions => self.list_regions()?,
        };

        let mut instances = Vec::new();
        for region in &regions {
            instances.extend(self.describe_instances(region, filter)?);
        }
        Ok(instances)
    }
}
