//! Wire types for `aws ec2` JSON output.

use serde::Deserialize;

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub(super) struct DescribeInstancesOutput {
    #[serde(default)]
    pub(super) reservations: Vec<Reservation>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub(super) struct Reservation {
    #[serde(default)]
    pub(super) owner_id: Option<String>,
    #[serde(default)]
    pub(super) instances: Vec<Ec2Instance>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub(super) struct Ec2Instance {
    pub(super) instance_id: String,
    #[serde(default)]
    pub(super) state: Option<Ec2State>,
    #[serde(default)]
    pub(super) public_ip_address: Option<String>,
    #[serde(default)]
    pub(super) private_ip_address: Option<String>,
    #[serde(default)]
    pub(super) platform_details: Option<String>,
    #[serde(default)]
    pub(super) tags: Vec<Ec2Tag>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub(super) struct Ec2State {
    pub(super) name: String,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub(super) struct Ec2Tag {
    pub(super) key: String,
    #[serde(default)]
    pub(super) value: String,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub(super) struct DescribeRegionsOutput {
    #[serde(default)]
    pub(super) regions: Vec<Ec2Region>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub(super) struct Ec2Region {
    pub(super) region_name: String,
}
