//
// SPDX-License-Identifier: MIT
//
// Typed, externally-supplied configuration. Parsing argv or the
// environment is out of scope for this crate: a CLI collaborator
// decodes its own sources and hands us a `RawConfig` (deserialized via
// `serde_json`, matching the JSON already used elsewhere in this
// ecosystem) which we validate into an immutable `Config`.

use std::net::{Ipv4Addr, Ipv6Addr};

use serde::Deserialize;

use crate::error::ConfigError;
use crate::packet::consts::{DEFAULT_HOLDTIME, DEFAULT_RETX_THRESH};
use crate::packet::{AdjacencyType, AreaAddr, LanId, SystemId};

// Textual form accepted from the CLI collaborator, prior to validation.
#[derive(Clone, Debug, Deserialize)]
pub struct RawConfig {
    pub area_address: String,
    pub system_id: String,
    pub lan_id: String,
    pub interface: RawInterfaceConfig,
    #[serde(default)]
    pub cleartext_password: Option<String>,
    #[serde(default)]
    pub holdtime: Option<u16>,
    #[serde(default)]
    pub retx_thresh: Option<u16>,
    #[serde(default)]
    pub capture_prefix: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RawInterfaceConfig {
    pub device: String,
    pub adjacency_type: RawAdjacencyType,
    #[serde(default)]
    pub ipv4_addrs: Vec<String>,
    #[serde(default)]
    pub ipv6_addrs: Vec<String>,
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RawAdjacencyType {
    L1,
    L2,
    PointToPoint,
}

// Validated, immutable configuration the instance runs with for its
// entire lifetime.
#[derive(Clone, Debug)]
pub struct Config {
    pub area_address: AreaAddr,
    pub system_id: SystemId,
    pub lan_id: LanId,
    pub interface: InterfaceConfig,
    pub cleartext_password: Option<String>,
    pub holdtime: u16,
    pub retx_thresh: u16,
    pub capture_prefix: Option<String>,
}

#[derive(Clone, Debug)]
pub struct InterfaceConfig {
    pub device: String,
    pub adjacency_type: AdjacencyType,
    pub ipv4_addrs: Vec<Ipv4Addr>,
    pub ipv6_addrs: Vec<Ipv6Addr>,
}

impl Config {
    // Convenience entry point for a CLI collaborator that has already
    // reduced argv/environment down to a JSON document; parsing and
    // validation still happen in one pure, fallible step.
    pub fn from_json(data: &str) -> Result<Config, ConfigError> {
        let raw: RawConfig = serde_json::from_str(data)
            .map_err(|error| ConfigError::Malformed(error.to_string()))?;
        Config::from_raw(raw)
    }

    pub fn from_raw(raw: RawConfig) -> Result<Config, ConfigError> {
        let area_address = parse_area_address(&raw.area_address)?;
        let system_id = parse_system_id(&raw.system_id)?;
        let lan_id = parse_lan_id(&raw.lan_id)?;

        let ipv4_addrs = raw
            .interface
            .ipv4_addrs
            .iter()
            .map(|s| {
                s.parse::<Ipv4Addr>()
                    .map_err(|_| ConfigError::InvalidIpAddr(s.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let ipv6_addrs = raw
            .interface
            .ipv6_addrs
            .iter()
            .map(|s| {
                s.parse::<Ipv6Addr>()
                    .map_err(|_| ConfigError::InvalidIpAddr(s.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        if ipv4_addrs.is_empty() && ipv6_addrs.is_empty() {
            return Err(ConfigError::NoIpAddr);
        }

        Ok(Config {
            area_address,
            system_id,
            lan_id,
            interface: InterfaceConfig {
                device: raw.interface.device,
                adjacency_type: raw.interface.adjacency_type.into(),
                ipv4_addrs,
                ipv6_addrs,
            },
            cleartext_password: raw.cleartext_password,
            holdtime: raw.holdtime.unwrap_or(DEFAULT_HOLDTIME),
            retx_thresh: raw.retx_thresh.unwrap_or(DEFAULT_RETX_THRESH),
            capture_prefix: raw.capture_prefix,
        })
    }
}

impl From<RawAdjacencyType> for AdjacencyType {
    fn from(raw: RawAdjacencyType) -> AdjacencyType {
        match raw {
            RawAdjacencyType::L1 => AdjacencyType::L1,
            RawAdjacencyType::L2 => AdjacencyType::L2,
            RawAdjacencyType::PointToPoint => AdjacencyType::PointToPoint,
        }
    }
}

// Parses a hex-dotted System ID ("0000.0000.0001") into 6 raw bytes.
fn parse_system_id(text: &str) -> Result<SystemId, ConfigError> {
    let bytes = parse_hex_dotted(text)?;
    let bytes: [u8; 6] = bytes
        .try_into()
        .map_err(|_| ConfigError::InvalidIpAddr(text.to_string()))?;
    Ok(SystemId::from(bytes))
}

// Parses a hex-dotted LAN ID ("0000.0000.0001.01"): 6-byte system ID
// followed by a 1-byte pseudonode id.
fn parse_lan_id(text: &str) -> Result<LanId, ConfigError> {
    let bytes = parse_hex_dotted(text)?;
    let bytes: [u8; 7] = bytes
        .try_into()
        .map_err(|_| ConfigError::InvalidIpAddr(text.to_string()))?;
    Ok(LanId::from(bytes))
}

// Parses a hex-dotted Area Address ("49.0001"), 1..20 bytes.
fn parse_area_address(text: &str) -> Result<AreaAddr, ConfigError> {
    let bytes = parse_hex_dotted(text)?;
    if bytes.is_empty() || bytes.len() > AreaAddr::MAX_LEN as usize {
        return Err(ConfigError::InvalidIpAddr(text.to_string()));
    }
    Ok(AreaAddr::from(bytes.as_slice()))
}

fn parse_hex_dotted(text: &str) -> Result<Vec<u8>, ConfigError> {
    let digits: String = text.chars().filter(|c| *c != '.').collect();
    if digits.len() % 2 != 0 || digits.is_empty() {
        return Err(ConfigError::InvalidIpAddr(text.to_string()));
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|_| ConfigError::InvalidIpAddr(text.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_missing_ip_address() {
        let raw = RawConfig {
            area_address: "49.0001".to_string(),
            system_id: "0000.0000.0001".to_string(),
            lan_id: "0000.0000.0001.01".to_string(),
            interface: RawInterfaceConfig {
                device: "eth0".to_string(),
                adjacency_type: RawAdjacencyType::L1,
                ipv4_addrs: vec![],
                ipv6_addrs: vec![],
            },
            cleartext_password: None,
            holdtime: None,
            retx_thresh: None,
            capture_prefix: None,
        };
        assert!(matches!(
            Config::from_raw(raw),
            Err(ConfigError::NoIpAddr)
        ));
    }

    #[test]
    fn parses_valid_config() {
        let raw = RawConfig {
            area_address: "49.0001".to_string(),
            system_id: "0000.0000.0001".to_string(),
            lan_id: "0000.0000.0001.01".to_string(),
            interface: RawInterfaceConfig {
                device: "eth0".to_string(),
                adjacency_type: RawAdjacencyType::L1,
                ipv4_addrs: vec!["192.0.2.1".to_string()],
                ipv6_addrs: vec![],
            },
            cleartext_password: None,
            holdtime: None,
            retx_thresh: None,
            capture_prefix: None,
        };
        let config = Config::from_raw(raw).unwrap();
        assert_eq!(config.holdtime, DEFAULT_HOLDTIME);
        assert_eq!(config.interface.ipv4_addrs.len(), 1);
    }
}
