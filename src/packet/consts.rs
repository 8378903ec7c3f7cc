//
// SPDX-License-Identifier: MIT
//

use bitflags::bitflags;
use num_derive::{FromPrimitive, ToPrimitive};
use serde::{Deserialize, Serialize};

pub const NLPID_ISIS: u8 = 0x83;
pub const VERSION_PROTO_EXT: u8 = 1;
pub const VERSION: u8 = 1;
pub const SYSTEM_ID_LEN: u8 = 6;

// Frame-level constants (LLC header, no SNAP).
pub const LLC_DSAP: u8 = 0xFE;
pub const LLC_SSAP: u8 = 0xFE;
pub const LLC_CTRL: u8 = 0x03;

pub const PACKET_BUF_LEN: usize = 1514;
pub const HELLO_PAYLOAD_LEN: u16 = 1500;

pub const DEFAULT_HOLDTIME: u16 = 10;
pub const DEFAULT_RETX_THRESH: u16 = 3;

// IS-IS PDU types.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[derive(FromPrimitive, ToPrimitive)]
#[derive(Deserialize, Serialize)]
pub enum PduType {
    HelloLanL1 = 15,
    HelloLanL2 = 16,
    HelloP2P = 17,
    LspL1 = 18,
    LspL2 = 20,
    CsnpL1 = 24,
    CsnpL2 = 25,
    PsnpL1 = 26,
    PsnpL2 = 27,
}

// IS-IS top-level TLV types recognized by this speaker.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[derive(FromPrimitive, ToPrimitive)]
#[derive(Deserialize, Serialize)]
pub enum TlvType {
    AreaAddress = 1,
    LspIisNeighbor = 2,
    EsNeighbor = 3,
    IihIisNeighbor = 6,
    Padding = 8,
    LspEntries = 9,
    Authentication = 10,
    TeIsNeighbor = 22,
    Ipv4InternalReach = 128,
    ProtocolsSupported = 129,
    Ipv4ExternalReach = 130,
    Ipv4IfAddr = 132,
    TeIpReach = 135,
    DynamicHostname = 137,
    Restart = 211,
    MtIsNeighbor = 222,
    MultipleTopologies = 229,
    Ipv6IfAddr = 232,
    MtIpReach = 235,
    Ipv6IpReach = 236,
    MtIpv6IpReach = 237,
    ThreeWayHello = 240,
}

// Sub-TLVs nested inside TE IS Neighbor (22) / TE IP Reach (135) / MT
// variants (222, 235, 236, 237).
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[derive(FromPrimitive, ToPrimitive)]
#[derive(Deserialize, Serialize)]
pub enum SubTlvType {
    AdminGroup = 3,
    Ipv4IntfAddr = 6,
    Ipv4NbrAddr = 8,
    MaxLinkBwidth = 9,
    MaxResLinkBwidth = 10,
    UnresBwidth = 11,
    TeDefaultMetric = 18,
}

// IS-IS Authentication Type Codes.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[derive(FromPrimitive, ToPrimitive)]
#[derive(Deserialize, Serialize)]
pub enum AuthenticationType {
    ClearText = 1,
}

// LSP flags/bits field. Bit layout per the LSP fixed header: bit7
// partition-repair, bits 6..3 attached flags, bit2 LSPDBOL, bits 1..0
// IS-type.
bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    #[derive(Deserialize, Serialize)]
    #[serde(transparent)]
    pub struct LspBits: u8 {
        const PARTITION_REPAIR = 0x80;
        const ATT_ERROR        = 0x40;
        const ATT_EXPENSE      = 0x20;
        const ATT_DELAY        = 0x10;
        const ATT_DEFAULT      = 0x08;
        const LSPDBOL          = 0x04;
        const IS_TYPE_HIGH     = 0x02;
        const IS_TYPE_LOW      = 0x01;
    }
}

impl LspBits {
    pub const IS_TYPE_L1: u8 = 0b01;
    pub const IS_TYPE_L1L2: u8 = 0b11;

    pub fn is_type(&self) -> u8 {
        self.bits() & 0b11
    }
}
