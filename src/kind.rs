//! Entity kinds known to the application catalog.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! entity_kinds {
    ($($variant:ident => $name:literal,)+) => {
        /// Which persisted table a request targets. Each kind has exactly one
        /// definition in a resolved catalog.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum EntityKind {
            $(
                #[serde(rename = $name)]
                $variant,
            )+
        }

        impl EntityKind {
            pub const ALL: &'static [EntityKind] = &[$(EntityKind::$variant,)+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(EntityKind::$variant => $name,)+
                }
            }
        }
    };
}

entity_kinds! {
    ComputeResource => "ComputeResource",
    StorageResource => "StorageResource",
    HostAlias => "HostAlias",
    HostIpAddress => "HostIpAddress",
    BatchQueue => "BatchQueue",
    ComputeResourceFileSystem => "ComputeResourceFileSystem",
    JobSubmissionInterface => "JobSubmissionInterface",
    DataMovementInterface => "DataMovementInterface",
    ResourceJobManager => "ResourceJobManager",
    JobManagerCommand => "JobManagerCommand",
    SshJobSubmission => "SshJobSubmission",
    ScpDataMovement => "ScpDataMovement",
    GridftpDataMovement => "GridftpDataMovement",
    GridftpEndpoint => "GridftpEndpoint",
    GsisshSubmission => "GsisshSubmission",
    GsisshExport => "GsisshExport",
    SshSubmission => "SshSubmission",
    JobSubmissionProtocol => "JobSubmissionProtocol",
    ApplicationModule => "ApplicationModule",
    ApplicationDeployment => "ApplicationDeployment",
    PreJobCommand => "PreJobCommand",
    PostJobCommand => "PostJobCommand",
    LibraryPrependPath => "LibraryPrependPath",
    LibraryAppendPath => "LibraryAppendPath",
    AppEnvironment => "AppEnvironment",
    ApplicationInterface => "ApplicationInterface",
    AppModuleMapping => "AppModuleMapping",
    ApplicationInput => "ApplicationInput",
    ApplicationOutput => "ApplicationOutput",
    Workflow => "Workflow",
    WorkflowOutput => "WorkflowOutput",
    GatewayProfile => "GatewayProfile",
    UserResourceProfile => "UserResourceProfile",
    ComputeResourcePreference => "ComputeResourcePreference",
    UserComputeResourcePreference => "UserComputeResourcePreference",
    StoragePreference => "StoragePreference",
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = ConfigError;

    /// Case-insensitive; `_` and `-` are ignored, so `compute_resource` parses too.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded = fold(s);
        EntityKind::ALL
            .iter()
            .copied()
            .find(|k| fold(k.as_str()) == folded)
            .ok_or_else(|| ConfigError::UnknownKind(s.to_string()))
    }
}

fn fold(s: &str) -> String {
    s.chars()
        .filter(|c| *c != '_' && *c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
