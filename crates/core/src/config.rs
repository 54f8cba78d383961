use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

use crate::Error;

pub const MAINNET_MAGIC: u64 = 764824073;
pub const PREPROD_MAGIC: u64 = 1;
pub const PREVIEW_MAGIC: u64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Preprod,
    Preview,
    Custom(u64),
}

impl Network {
    pub fn magic(&self) -> u64 {
        match self {
            Network::Mainnet => MAINNET_MAGIC,
            Network::Preprod => PREPROD_MAGIC,
            Network::Preview => PREVIEW_MAGIC,
            Network::Custom(x) => *x,
        }
    }

    /// The network id carried in address headers.
    pub fn network_id(&self) -> u8 {
        match self {
            Network::Mainnet => 1,
            Network::Custom(x) if *x == MAINNET_MAGIC => 1,
            _ => 0,
        }
    }

    pub fn from_magic(magic: u64) -> Self {
        match magic {
            MAINNET_MAGIC => Network::Mainnet,
            PREPROD_MAGIC => Network::Preprod,
            PREVIEW_MAGIC => Network::Preview,
            x => Network::Custom(x),
        }
    }

    pub fn blockfrost_url(&self) -> Option<&'static str> {
        match self {
            Network::Mainnet => Some("https://cardano-mainnet.blockfrost.io/api/v0"),
            Network::Preprod => Some("https://cardano-preprod.blockfrost.io/api/v0"),
            Network::Preview => Some("https://cardano-preview.blockfrost.io/api/v0"),
            Network::Custom(_) => None,
        }
    }

    pub fn maestro_url(&self) -> Option<&'static str> {
        match self {
            Network::Mainnet => Some("https://mainnet.gomaestro-api.org/v1"),
            Network::Preprod => Some("https://preprod.gomaestro-api.org/v1"),
            Network::Preview => Some("https://preview.gomaestro-api.org/v1"),
            Network::Custom(_) => None,
        }
    }
}

impl Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Network::Mainnet => f.write_str("mainnet"),
            Network::Preprod => f.write_str("preprod"),
            Network::Preview => f.write_str("preview"),
            Network::Custom(x) => write!(f, "custom({x})"),
        }
    }
}

impl FromStr for Network {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "preprod" => Ok(Network::Preprod),
            "preview" => Ok(Network::Preview),
            other => other
                .parse::<u64>()
                .map(Network::from_magic)
                .map_err(|_| Error::InvalidInput(format!("unknown network `{s}`"))),
        }
    }
}

fn default_network() -> Network {
    Network::Mainnet
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockfrostConfig {
    #[serde(default = "default_network")]
    pub network: Network,

    pub project_id: String,

    pub base_url: Option<String>,

    /// Submission endpoints tried, in order, before the main API.
    #[serde(default)]
    pub submit_endpoints: Vec<String>,
}

impl BlockfrostConfig {
    /// The configured URL, with the `/v0` suffix restored for hosted
    /// endpoints, or the network default.
    pub fn resolved_base_url(&self) -> Result<String, Error> {
        match &self.base_url {
            Some(url) => {
                let url = url.trim_end_matches('/');

                if url.contains("blockfrost.io") && !url.ends_with("/v0") {
                    Ok(format!("{url}/v0"))
                } else {
                    Ok(url.to_string())
                }
            }
            None => self
                .network
                .blockfrost_url()
                .map(String::from)
                .ok_or_else(|| {
                    Error::InvalidInput(format!(
                        "no default blockfrost url for network {}",
                        self.network
                    ))
                }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaestroConfig {
    #[serde(default = "default_network")]
    pub network: Network,

    pub api_key: String,

    pub base_url: Option<String>,
}

impl MaestroConfig {
    pub fn resolved_base_url(&self) -> Result<String, Error> {
        match &self.base_url {
            Some(url) => Ok(url.trim_end_matches('/').to_string()),
            None => self
                .network
                .maestro_url()
                .map(String::from)
                .ok_or_else(|| {
                    Error::InvalidInput(format!(
                        "maestro does not serve network {}",
                        self.network
                    ))
                }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KupmiosConfig {
    pub kupo_url: String,

    pub ogmios_url: String,

    #[serde(default = "default_network")]
    pub network: Network,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UtxorpcConfig {
    pub url: String,

    pub api_key: Option<String>,

    #[serde(default = "default_network")]
    pub network: Network,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderConfig {
    Blockfrost(BlockfrostConfig),
    Maestro(MaestroConfig),
    Kupmios(KupmiosConfig),
    Utxorpc(UtxorpcConfig),
}

impl ProviderConfig {
    pub fn network(&self) -> Network {
        match self {
            ProviderConfig::Blockfrost(x) => x.network,
            ProviderConfig::Maestro(x) => x.network,
            ProviderConfig::Kupmios(x) => x.network,
            ProviderConfig::Utxorpc(x) => x.network,
        }
    }
}

#[serde_as]
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct LoggingConfig {
    #[serde_as(as = "DisplayFromStr")]
    pub max_level: tracing::Level,

    #[serde(default)]
    pub include_reqwest: bool,

    #[serde(default)]
    pub include_tonic: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            max_level: tracing::Level::INFO,
            include_reqwest: Default::default(),
            include_tonic: Default::default(),
        }
    }
}
