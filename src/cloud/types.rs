//! # Wire Types
//!
//! Request and response bodies of the cloud API, plus [`Title`], the
//! `region/model` pair that names one purchasable offer.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("failed to parse region from '{0}'")]
    Region(String),
    #[error("'/' not found in '{0}'")]
    MissingSlash(String),
    #[error("empty model in '{0}'")]
    EmptyModel(String),
}

/// Region codes the API knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Region {
    AsiaNortheast1,
    AsiaNortheast2,
    AsiaSouth1,
    AustraliaEast1,
    EuropeCentral1,
    MeWest1,
    TestEast1,
    TestWest1,
    UsEast1,
    UsEast2,
    UsEast3,
    UsMidwest1,
    UsMidwest2,
    UsSouth1,
    UsSouth2,
    UsSouth3,
    UsWest1,
    UsWest2,
    UsWest3,
}

const REGION_CODES: [(Region, &str); 19] = [
    (Region::AsiaNortheast1, "asia-northeast-1"),
    (Region::AsiaNortheast2, "asia-northeast-2"),
    (Region::AsiaSouth1, "asia-south-1"),
    (Region::AustraliaEast1, "australia-east-1"),
    (Region::EuropeCentral1, "europe-central-1"),
    (Region::MeWest1, "me-west-1"),
    (Region::TestEast1, "test-east-1"),
    (Region::TestWest1, "test-west-1"),
    (Region::UsEast1, "us-east-1"),
    (Region::UsEast2, "us-east-2"),
    (Region::UsEast3, "us-east-3"),
    (Region::UsMidwest1, "us-midwest-1"),
    (Region::UsMidwest2, "us-midwest-2"),
    (Region::UsSouth1, "us-south-1"),
    (Region::UsSouth2, "us-south-2"),
    (Region::UsSouth3, "us-south-3"),
    (Region::UsWest1, "us-west-1"),
    (Region::UsWest2, "us-west-2"),
    (Region::UsWest3, "us-west-3"),
];

impl Region {
    pub fn as_str(self) -> &'static str {
        REGION_CODES
            .iter()
            .find(|(r, _)| *r == self)
            .map_or("", |(_, code)| *code)
    }
}

impl FromStr for Region {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        REGION_CODES
            .iter()
            .find(|(_, code)| *code == s)
            .map(|(r, _)| *r)
            .ok_or_else(|| ParseError::Region(s.to_string()))
    }
}

impl TryFrom<String> for Region {
    type Error = ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Region> for String {
    fn from(r: Region) -> Self {
        r.as_str().to_string()
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Active,
    Booting,
    Terminated,
    Terminating,
    Unhealthy,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Active => "active",
            Status::Booting => "booting",
            Status::Terminated => "terminated",
            Status::Terminating => "terminating",
            Status::Unhealthy => "unhealthy",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionDescription {
    pub name: Region,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceTypeSpecs {
    #[serde(default)]
    pub gpus: u32,
    #[serde(default)]
    pub memory_gib: u32,
    #[serde(default)]
    pub storage_gib: u32,
    #[serde(default)]
    pub vcpus: u32,
}

/// An instance type with its hourly price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceQuote {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub gpu_description: String,
    pub price_cents_per_hour: u32,
    #[serde(default)]
    pub specs: InstanceTypeSpecs,
}

impl InstanceQuote {
    /// Price formatted as dollars per hour, e.g. `$1.29/hr`.
    pub fn price(&self) -> String {
        format!(
            "${}.{:02}/hr",
            self.price_cents_per_hour / 100,
            self.price_cents_per_hour % 100
        )
    }
}

/// One entry of the instance-types listing.
#[derive(Debug, Clone, Deserialize)]
pub struct InstanceTypesItem {
    pub instance_type: InstanceQuote,
    #[serde(default)]
    pub regions_with_capacity_available: Vec<RegionDescription>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub private_ip: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
    pub status: Status,
    pub region: RegionDescription,
    #[serde(rename = "instance_type")]
    pub quote: InstanceQuote,
    #[serde(default)]
    pub ssh_key_names: Vec<String>,
    #[serde(default)]
    pub file_system_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SshKey {
    pub id: String,
    pub name: String,
    pub public_key: String,
}

/// Body of a launch request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaunchRequest {
    pub region_name: Region,
    pub instance_type_name: String,
    pub ssh_key_names: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub file_system_names: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_data: Option<String>,
}

impl LaunchRequest {
    pub fn new(title: &Title, ssh_key_names: Vec<String>) -> Self {
        Self {
            region_name: title.region(),
            instance_type_name: title.model().to_string(),
            ssh_key_names,
            file_system_names: Vec::new(),
            name: None,
            user_data: None,
        }
    }
}

/// The `region/model` name of one offer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Title {
    region: Region,
    model: String,
}

impl Title {
    pub fn new(region: Region, model: impl Into<String>) -> Self {
        Self {
            region,
            model: model.into(),
        }
    }

    pub fn region(&self) -> Region {
        self.region
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl fmt::Display for Title {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.region, self.model)
    }
}

impl FromStr for Title {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (region, model) = s
            .split_once('/')
            .ok_or_else(|| ParseError::MissingSlash(s.to_string()))?;
        if model.is_empty() {
            return Err(ParseError::EmptyModel(s.to_string()));
        }
        Ok(Self::new(region.parse()?, model))
    }
}

impl Ord for Title {
    fn cmp(&self, other: &Self) -> Ordering {
        self.region
            .as_str()
            .cmp(other.region.as_str())
            .then_with(|| self.model.cmp(&other.model))
    }
}

impl PartialOrd for Title {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
