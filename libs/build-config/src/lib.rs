//! Build descriptor for the smart-contract toolchain: which local network to
//! deploy to and which compiler to build with.
//!
//! The descriptor has no behavior of its own. It is loaded from JSON, checked
//! against the shape the toolchain expects, and rendered as the JavaScript
//! module the toolchain reads.

use std::{collections::BTreeMap, fmt::Display, path::Path, str::FromStr};

use serde::{Deserialize, Serialize};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid build config: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

/// Name of the network the toolchain uses when none is given.
pub const DEVELOPMENT_NETWORK: &str = "development";

/// Top-level build descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    pub networks: BTreeMap<String, Network>,
    pub compilers: Compilers,
}

impl Default for BuildConfig {
    /// A local test chain on its default port, accepting any network ID,
    /// built with solc 0.5.16 and the optimizer at 200 runs.
    fn default() -> Self {
        Self {
            networks: BTreeMap::from([(DEVELOPMENT_NETWORK.to_owned(), Network::default())]),
            compilers: Compilers::default(),
        }
    }
}

impl FromStr for BuildConfig {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }
}

impl BuildConfig {
    /// Read a descriptor from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!("loading build config from {}", path.display());
        std::fs::read_to_string(path)?.parse()
    }

    /// Check the descriptor against the shape the toolchain expects,
    /// reporting every problem found.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        if self.networks.is_empty() {
            problems.push("at least one network is required".to_owned());
        }

        for (name, network) in &self.networks {
            if network.host.trim().is_empty() {
                problems.push(format!("network {name}: host must not be empty"));
            }
            if network.port == 0 {
                problems.push(format!("network {name}: port must not be 0"));
            }
        }

        let solc = &self.compilers.solc;
        if !is_semver(&solc.version) {
            problems.push(format!(
                "compiler version {:?} must look like MAJOR.MINOR.PATCH",
                solc.version
            ));
        }
        let optimizer = &solc.settings.optimizer;
        if optimizer.enabled && optimizer.runs == 0 {
            problems.push("optimizer runs must be greater than 0 when enabled".to_owned());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(Error::Invalid(problems))
        }
    }

    /// Render as the JavaScript module the toolchain loads.
    pub fn to_module_string(&self) -> Result<String> {
        Ok(format!(
            "module.exports = {};\n",
            serde_json::to_string_pretty(self)?
        ))
    }

    #[must_use]
    pub fn network(&self, name: &str) -> Option<&Network> {
        self.networks.get(name)
    }
}

/// Where to reach a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    pub host: String,
    pub port: u16,
    pub network_id: NetworkId,
}

impl Default for Network {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 7545,
            network_id: NetworkId::Any,
        }
    }
}

/// The chain's network ID, or `"*"` to match whatever the chain reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "NetworkIdRepr", into = "NetworkIdRepr")]
pub enum NetworkId {
    Any,
    Id(u64),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum NetworkIdRepr {
    Id(u64),
    Text(String),
}

impl TryFrom<NetworkIdRepr> for NetworkId {
    type Error = String;

    fn try_from(value: NetworkIdRepr) -> std::result::Result<Self, Self::Error> {
        match value {
            NetworkIdRepr::Id(id) => Ok(Self::Id(id)),
            NetworkIdRepr::Text(text) => text.parse(),
        }
    }
}

impl From<NetworkId> for NetworkIdRepr {
    fn from(value: NetworkId) -> Self {
        match value {
            NetworkId::Any => Self::Text("*".to_owned()),
            NetworkId::Id(id) => Self::Id(id),
        }
    }
}

impl FromStr for NetworkId {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "*" => Ok(Self::Any),
            id => id
                .parse()
                .map(Self::Id)
                .map_err(|_| format!("network_id must be \"*\" or an integer, got {id:?}")),
        }
    }
}

impl Display for NetworkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Any => write!(f, "*"),
            Self::Id(id) => write!(f, "{id}"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Compilers {
    pub solc: Solc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Solc {
    /// Must match the `pragma` of the contracts being built.
    pub version: String,
    #[serde(default)]
    pub settings: SolcSettings,
}

impl Default for Solc {
    fn default() -> Self {
        Self {
            version: "0.5.16".to_owned(),
            settings: SolcSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolcSettings {
    #[serde(default)]
    pub optimizer: Optimizer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Optimizer {
    pub enabled: bool,
    pub runs: u32,
}

impl Default for Optimizer {
    fn default() -> Self {
        Self {
            enabled: true,
            runs: 200,
        }
    }
}

fn is_semver(version: &str) -> bool {
    let parts: Vec<&str> = version.split('.').collect();
    parts.len() == 3
        && parts
            .iter()
            .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()))
}
