//! Closed catalog of bridge commands.
//!
//! Each variant maps to one command name and a typed parameter struct.
//! Parameter field names are the daemon's (`snake_case`).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::Result;

/// Every command the bridge accepts.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// `heartbeat`
    Heartbeat,
    /// `run`
    Run(RunParams),
    /// `_run`: direct model invocation, bypassing the package's entry point.
    RunInternal(InternalRunParams),
    /// `result`
    Result(ResultParams),
    /// `package.install`
    PackageInstall(PackageSpec),
    /// `package.fetch`
    PackageFetch(PackageSpec),
    /// `package.activate`
    PackageActivate(PackageRef),
    /// `package.deactivate`
    PackageDeactivate(PackageRef),
    /// `package.remove`
    PackageRemove(PackageRef),
    /// `package.list`
    PackageList,
    /// `bridge.get_daemon`
    GetDaemon,
}

impl Command {
    /// Wire name of the command.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Heartbeat => "heartbeat",
            Self::Run(_) => "run",
            Self::RunInternal(_) => "_run",
            Self::Result(_) => "result",
            Self::PackageInstall(_) => "package.install",
            Self::PackageFetch(_) => "package.fetch",
            Self::PackageActivate(_) => "package.activate",
            Self::PackageDeactivate(_) => "package.deactivate",
            Self::PackageRemove(_) => "package.remove",
            Self::PackageList => "package.list",
            Self::GetDaemon => "bridge.get_daemon",
        }
    }

    /// Parameters object sent with the command.
    pub fn params(&self) -> Result<Value> {
        let value = match self {
            Self::Heartbeat | Self::PackageList | Self::GetDaemon => Value::Object(Map::new()),
            Self::Run(p) => serde_json::to_value(p)?,
            Self::RunInternal(p) => serde_json::to_value(p)?,
            Self::Result(p) => serde_json::to_value(p)?,
            Self::PackageInstall(p) | Self::PackageFetch(p) => serde_json::to_value(p)?,
            Self::PackageActivate(p) | Self::PackageDeactivate(p) | Self::PackageRemove(p) => {
                serde_json::to_value(p)?
            }
        };
        Ok(value)
    }
}

/// Parameters for `run`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunParams {
    /// Target entry point, e.g. `package/function`.
    pub target: String,
    /// Arguments passed through to the target.
    pub params: Map<String, Value>,
}

/// Parameters for `_run`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InternalRunParams {
    /// Package that owns the model.
    pub target_package: String,
    /// Model inside the package.
    pub target_model: String,
    /// Model inputs, typically tensors.
    pub params: Map<String, Value>,
}

/// Parameters for `result`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultParams {
    /// Content hash of a stored result.
    pub result_hash: String,
}

/// Where to install or fetch a package from.
///
/// Exactly which source fields are required is decided by the daemon; unset
/// fields are omitted from the wire.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSpec {
    /// Package name in the configured index.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Path to a package spec file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specfile: Option<String>,
    /// Path to a local package archive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub localfile: Option<String>,
    /// Remote package archive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Expected archive hash.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_hash: Option<String>,
}

impl PackageSpec {
    /// Spec naming a package from the index.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Spec pointing at a remote archive.
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    /// Attach the expected archive hash.
    #[must_use]
    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.package_hash = Some(hash.into());
        self
    }
}

/// An installed package, optionally pinned to a version.
///
/// `version` is always sent; `null` lets the daemon pick.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRef {
    /// Package name.
    pub name: String,
    /// Package version.
    pub version: Option<String>,
}

impl PackageRef {
    /// Build a reference from borrowed parts.
    pub fn new(name: impl Into<String>, version: Option<&str>) -> Self {
        Self {
            name: name.into(),
            version: version.map(str::to_owned),
        }
    }
}

/// A stored-result reference as it appears inside daemon results.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    /// Content key of the stored result.
    pub file_ref: String,
}
