//! Deployment environment definitions.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

pub const ACCOUNT_KEY: &str = "ACCOUNT_ID";
pub const REGION_KEY: &str = "REGION";

/// AWS partitions a region can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Partition {
    Aws,
    AwsCn,
    AwsUsGov,
}

impl Partition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Partition::Aws => "aws",
            Partition::AwsCn => "aws-cn",
            Partition::AwsUsGov => "aws-us-gov",
        }
    }

    /// Derive the partition from a region name.
    pub fn for_region(region: &str) -> Self {
        if region.starts_with("cn-") {
            Partition::AwsCn
        } else if region.starts_with("us-gov-") {
            Partition::AwsUsGov
        } else {
            Partition::Aws
        }
    }
}

impl std::str::FromStr for Partition {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        match s {
            "aws" => Ok(Partition::Aws),
            "aws-cn" => Ok(Partition::AwsCn),
            "aws-us-gov" => Ok(Partition::AwsUsGov),
            other => Err(CoreError::invalid("partition", format!("unknown partition '{}'", other))),
        }
    }
}

impl std::fmt::Display for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Target account and region for one synthesis run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub account: String,
    pub region: String,
}

impl Environment {
    /// Create a validated environment.
    pub fn new(account: impl Into<String>, region: impl Into<String>) -> CoreResult<Self> {
        let account = account.into();
        let region = region.into();

        if !Regex::new(r"^\d{12}$")?.is_match(&account) {
            return Err(CoreError::invalid(
                ACCOUNT_KEY,
                format!("'{}' is not a 12-digit account id", account),
            ));
        }

        if !Regex::new(r"^[a-z]{2}(-gov|-iso[a-z]?)?-[a-z]+-\d+$")?.is_match(&region) {
            return Err(CoreError::invalid(
                REGION_KEY,
                format!("'{}' is not a region name", region),
            ));
        }

        Ok(Self { account, region })
    }

    pub fn partition(&self) -> Partition {
        Partition::for_region(&self.region)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "aws://{}/{}", self.account, self.region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_display() {
        let env = Environment::new("123456789012", "eu-central-1").unwrap();
        assert_eq!(env.to_string(), "aws://123456789012/eu-central-1");
        assert_eq!(env.partition(), Partition::Aws);
    }

    #[test]
    fn test_environment_rejects_short_account() {
        let err = Environment::new("1234", "us-east-1").unwrap_err();
        assert!(err.to_string().contains(ACCOUNT_KEY));
    }

    #[test]
    fn test_environment_rejects_bad_region() {
        let err = Environment::new("123456789012", "Frankfurt").unwrap_err();
        assert!(err.to_string().contains(REGION_KEY));
    }

    #[test]
    fn test_partition_for_region() {
        assert_eq!(Partition::for_region("cn-north-1"), Partition::AwsCn);
        assert_eq!(Partition::for_region("us-gov-west-1"), Partition::AwsUsGov);
        assert_eq!(Partition::for_region("us-east-1"), Partition::Aws);
        assert_eq!("aws-cn".parse::<Partition>().unwrap(), Partition::AwsCn);
        assert_eq!("aws-us-gov".parse::<Partition>().unwrap(), Partition::AwsUsGov);
        assert!(matches!(
            "aws-mars".parse::<Partition>(),
            Err(CoreError::InvalidConfig { .. })
        ));
    }
}
