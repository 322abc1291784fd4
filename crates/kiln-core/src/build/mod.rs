//! Build orchestration domain types.

mod progress;
mod roster;

pub use progress::{BuildPhase, BuildProgress};
pub use roster::{
    AgentDescriptor, AgentRole, AgentStatus, MASTER_AGENT_ID, ROSTER_SIZE, Roster,
};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::KilnError;
use crate::file::FileRecord;

/// A concrete build target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Web,
    Android,
    Ios,
}

impl Platform {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Android => "android",
            Self::Ios => "ios",
        }
    }

    /// Roster id of the agent that compiles this platform.
    pub fn build_agent_id(self) -> u8 {
        match self {
            Self::Web => 10,
            Self::Android => 11,
            Self::Ios => 12,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The platform selection a build is requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformTarget {
    #[default]
    Web,
    Android,
    Ios,
    All,
}

impl PlatformTarget {
    /// Concrete platforms in build order.
    pub fn platforms(self) -> Vec<Platform> {
        match self {
            Self::Web => vec![Platform::Web],
            Self::Android => vec![Platform::Android],
            Self::Ios => vec![Platform::Ios],
            Self::All => vec![Platform::Web, Platform::Android, Platform::Ios],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Android => "android",
            Self::Ios => "ios",
            Self::All => "all",
        }
    }
}

impl fmt::Display for PlatformTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlatformTarget {
    type Err = KilnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "web" => Ok(Self::Web),
            "android" => Ok(Self::Android),
            "ios" => Ok(Self::Ios),
            "all" => Ok(Self::All),
            other => Err(KilnError::config(format!("unknown platform: {other}"))),
        }
    }
}

/// Readiness of one platform's build output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildStatus {
    Ready,
}

/// Deliverable for one platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildOutput {
    pub platform: Platform,
    pub files: Vec<FileRecord>,
    pub status: BuildStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_expands_in_order() {
        assert_eq!(
            PlatformTarget::All.platforms(),
            [Platform::Web, Platform::Android, Platform::Ios]
        );
        assert_eq!(PlatformTarget::Ios.platforms(), [Platform::Ios]);
    }

    #[test]
    fn test_platform_target_parsing() {
        assert_eq!("ALL".parse::<PlatformTarget>().unwrap(), PlatformTarget::All);
        assert!("windows".parse::<PlatformTarget>().is_err());
    }
}
