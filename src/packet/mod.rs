//
// SPDX-License-Identifier: MIT
//

pub mod checksum;
pub mod consts;
pub mod error;
pub mod pdu;
pub mod tlv;

use std::fmt::Write as _;

use bytes::{Buf, BufMut, Bytes, BytesMut, TryGetError};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

// Represents an IS-IS adjacency type, keyed in the FSM by the integer
// values used on the wire / in the original adjacency map key.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[derive(Deserialize, Serialize)]
pub enum AdjacencyType {
    L1 = 1,
    L2 = 2,
    PointToPoint = 3,
}

// Represents an IS-IS Area Address (1..20 bytes).
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
pub struct AreaAddr(SmallVec<[u8; 20]>);

// Represents an IS-IS System ID.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
pub struct SystemId([u8; 6]);

// Represents an IS-IS LAN ID.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
pub struct LanId {
    pub system_id: SystemId,
    pub pseudonode: u8,
}

// Represents an IS-IS LSP ID.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
pub struct LspId {
    pub system_id: SystemId,
    pub pseudonode: u8,
    pub fragment: u8,
}

// ===== impl AdjacencyType =====

impl AdjacencyType {
    // Maps a decoded PDU type to the adjacency-type key ("k" in the
    // original source) used to index the adjacency map.
    pub fn from_pdu_type(pdu_type: consts::PduType) -> Option<AdjacencyType> {
        match pdu_type {
            consts::PduType::HelloLanL1 => Some(AdjacencyType::L1),
            consts::PduType::HelloLanL2 => Some(AdjacencyType::L2),
            consts::PduType::HelloP2P => Some(AdjacencyType::PointToPoint),
            _ => None,
        }
    }
}

impl std::fmt::Display for AdjacencyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdjacencyType::L1 => write!(f, "L1"),
            AdjacencyType::L2 => write!(f, "L2"),
            AdjacencyType::PointToPoint => write!(f, "point-to-point"),
        }
    }
}

// ===== impl AreaAddr =====

impl AreaAddr {
    pub const MAX_LEN: u8 = 20;

    pub fn new(bytes: SmallVec<[u8; 20]>) -> Self {
        AreaAddr(bytes)
    }
}

impl AsRef<[u8]> for AreaAddr {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<&[u8]> for AreaAddr {
    fn from(bytes: &[u8]) -> AreaAddr {
        AreaAddr(SmallVec::from_slice(bytes))
    }
}

// ===== impl SystemId =====

impl SystemId {
    pub fn decode(buf: &mut Bytes) -> Result<Self, TryGetError> {
        let mut system_id = [0; 6];
        buf.try_copy_to_slice(&mut system_id)?;
        Ok(SystemId(system_id))
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_slice(&self.0);
    }

    // Hex-dotted form used in logging, e.g. "0000.0000.0001".
    pub fn to_hex_dotted(&self) -> String {
        let mut s = String::with_capacity(14);
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 && i % 2 == 0 {
                s.push('.');
            }
            let _ = write!(s, "{byte:02x}");
        }
        s
    }
}

impl AsRef<[u8]> for SystemId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 6]> for SystemId {
    fn from(bytes: [u8; 6]) -> SystemId {
        SystemId(bytes)
    }
}

// ===== impl LanId =====

impl LanId {
    pub fn decode(buf: &mut Bytes) -> Result<Self, TryGetError> {
        let mut bytes = [0; 7];
        buf.try_copy_to_slice(&mut bytes)?;
        Ok(Self::from(bytes))
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        self.system_id.encode(buf);
        buf.put_u8(self.pseudonode);
    }
}

impl From<[u8; 7]> for LanId {
    fn from(bytes: [u8; 7]) -> LanId {
        LanId {
            system_id: SystemId::from([
                bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5],
            ]),
            pseudonode: bytes[6],
        }
    }
}

impl From<(SystemId, u8)> for LanId {
    fn from(components: (SystemId, u8)) -> LanId {
        LanId {
            system_id: components.0,
            pseudonode: components.1,
        }
    }
}

// ===== impl LspId =====

impl LspId {
    pub fn decode(buf: &mut Bytes) -> Result<Self, TryGetError> {
        let mut bytes = [0; 8];
        buf.try_copy_to_slice(&mut bytes)?;
        Ok(Self::from(bytes))
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        self.system_id.encode(buf);
        buf.put_u8(self.pseudonode);
        buf.put_u8(self.fragment);
    }

    // Canonicalized string form used as the LSDB map key, per the data
    // model's "sysid.pseudonode-fragment" convention.
    pub fn to_key_string(&self) -> String {
        format!(
            "{}.{:02x}-{:02x}",
            self.system_id.to_hex_dotted(),
            self.pseudonode,
            self.fragment
        )
    }
}

impl From<[u8; 8]> for LspId {
    fn from(bytes: [u8; 8]) -> LspId {
        LspId {
            system_id: SystemId::from([
                bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5],
            ]),
            pseudonode: bytes[6],
            fragment: bytes[7],
        }
    }
}

impl From<(SystemId, u8, u8)> for LspId {
    fn from(components: (SystemId, u8, u8)) -> LspId {
        LspId {
            system_id: components.0,
            pseudonode: components.1,
            fragment: components.2,
        }
    }
}

impl std::fmt::Display for LspId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_key_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lsp_id_key_string() {
        let id = LspId::from([0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x07]);
        assert_eq!(id.to_key_string(), "0000.0000.0001.00-07");
    }

}
