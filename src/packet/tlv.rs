//
// SPDX-License-Identifier: MIT
//
// TLV grammar: a flat sequence of `(type:u8, length:u8, value)` records.
// Unknown TLVs and unknown sub-TLVs are preserved verbatim rather than
// rejected, so a single unrecognized field never fails the parent PDU.

use std::net::{Ipv4Addr, Ipv6Addr};

use bytes::{Buf, BufMut, Bytes, BytesMut};
use num_traits::{FromPrimitive, ToPrimitive};

use crate::packet::consts::{AuthenticationType, SubTlvType, TlvType};
use crate::packet::error::{EncodeError, EncodeResult, TlvDecodeError};
use crate::packet::{AreaAddr, LspId, SystemId};

const TLV_HDR_LEN: usize = 2;
const TLV_MAX_LEN: usize = 255;

// One decoded TLV. Variants mirror the table in the TLV codec
// component design; unrecognized types are preserved opaquely.
#[derive(Clone, Debug, PartialEq)]
pub enum Tlv {
    AreaAddress(Vec<AreaAddr>),
    LspIisNeighbor {
        is_virtual: bool,
        neighbors: Vec<IsNeighborEntry>,
    },
    EsNeighbor {
        metric: [u8; 4],
        neighbors: Vec<[u8; 6]>,
    },
    IihIisNeighbor(Vec<[u8; 6]>),
    Padding(usize),
    LspEntries(Vec<LspEntry>),
    Authentication {
        auth_type: u8,
        value: Bytes,
    },
    TeIsNeighbor(Vec<TeNeighborEntry>),
    Ipv4InternalReach(Vec<Ipv4ReachEntry>),
    ProtocolsSupported(Vec<u8>),
    Ipv4ExternalReach(Vec<Ipv4ReachEntry>),
    Ipv4IfAddr(Vec<Ipv4Addr>),
    TeIpReach(Vec<TeIpReachEntry>),
    DynamicHostname(String),
    Restart {
        flags: u8,
        holdingtime: u16,
        restarting_neighbor_id: Bytes,
    },
    MtIsNeighbor {
        mtid: u16,
        neighbors: Vec<TeNeighborEntry>,
    },
    MultipleTopologies(Vec<MtEntry>),
    Ipv6IfAddr(Vec<Ipv6Addr>),
    MtIpReach {
        mtid: u16,
        entries: Vec<TeIpReachEntry>,
    },
    Ipv6IpReach(Ipv6ReachEntry),
    MtIpv6IpReach {
        mtid: u16,
        entries: Vec<Ipv6ReachEntry>,
    },
    ThreeWayHello(ThreeWayHello),
    Unknown { tlv_type: u8, value: Bytes },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct IsNeighborEntry {
    pub default_metric: u8,
    pub delay_metric: u8,
    pub expense_metric: u8,
    pub error_metric: u8,
    pub neighbor_id: [u8; 7],
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LspEntry {
    pub lifetime: u16,
    pub lsp_id: LspId,
    pub seq_no: u32,
    pub checksum: u16,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TeNeighborEntry {
    pub neighbor_id: [u8; 7],
    pub metric: u32,
    pub subtlvs: Vec<SubTlv>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Ipv4ReachEntry {
    pub metric: [u8; 4],
    pub address: Ipv4Addr,
    pub mask: Ipv4Addr,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TeIpReachEntry {
    pub metric: u32,
    pub up_down: bool,
    pub has_subtlvs: bool,
    pub prefix_len: u8,
    pub prefix: Ipv4Addr,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Ipv6ReachEntry {
    pub metric: u32,
    pub up_down: bool,
    pub external: bool,
    pub has_subtlvs: bool,
    pub prefix_len: u8,
    pub prefix: Ipv6Addr,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MtEntry {
    pub overload: bool,
    pub attached: bool,
    pub mtid: u16,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ThreeWayState {
    Up,
    Initializing,
    Down,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ThreeWayHello {
    pub state: ThreeWayState,
    pub local_circuit_id: Option<u32>,
    pub neighbor_sysid: Option<SystemId>,
    pub neighbor_local_circuit_id: Option<u32>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SubTlv {
    AdminGroup(u32),
    Ipv4IntfAddr(Ipv4Addr),
    Ipv4NbrAddr(Ipv4Addr),
    MaxLinkBwidth([u8; 4]),
    MaxResLinkBwidth([u8; 4]),
    UnresBwidth([[u8; 4]; 8]),
    TeDefaultMetric([u8; 3]),
    Unknown { stlv_type: u8, len: u8 },
}

// ===== impl ThreeWayState =====

impl ThreeWayState {
    fn from_wire(value: u8) -> Option<ThreeWayState> {
        match value {
            0 => Some(ThreeWayState::Up),
            1 => Some(ThreeWayState::Initializing),
            2 => Some(ThreeWayState::Down),
            _ => None,
        }
    }

    fn to_wire(self) -> u8 {
        match self {
            ThreeWayState::Up => 0,
            ThreeWayState::Initializing => 1,
            ThreeWayState::Down => 2,
        }
    }

    // rx -> tx mapping used by the point-to-point adjacency FSM.
    pub fn next_tx(received: Option<ThreeWayState>) -> ThreeWayState {
        match received {
            None => ThreeWayState::Up,
            Some(ThreeWayState::Down) => ThreeWayState::Initializing,
            Some(ThreeWayState::Initializing) => ThreeWayState::Up,
            Some(ThreeWayState::Up) => ThreeWayState::Up,
        }
    }
}

// ===== decode =====

// Decodes the flat TLV sequence from `buf` until exhausted. Per-TLV
// failures are logged and the offending TLV is skipped; they never
// abort the rest of the PDU.
pub fn decode_tlvs(buf: &mut Bytes) -> Vec<Tlv> {
    let mut tlvs = Vec::new();
    while buf.remaining() >= TLV_HDR_LEN {
        let tlv_type = buf.get_u8();
        let tlv_len = buf.get_u8() as usize;
        if buf.remaining() < tlv_len {
            TlvDecodeError::ReadOutOfBounds.log();
            break;
        }
        let mut value = buf.copy_to_bytes(tlv_len);
        match decode_one(tlv_type, tlv_len, &mut value) {
            Ok(tlv) => tlvs.push(tlv),
            Err(error) => error.log(),
        }
    }
    tlvs
}

fn decode_one(
    tlv_type: u8,
    tlv_len: usize,
    value: &mut Bytes,
) -> Result<Tlv, TlvDecodeError> {
    let Some(known) = TlvType::from_u8(tlv_type) else {
        return Ok(Tlv::Unknown {
            tlv_type,
            value: value.clone(),
        });
    };

    let tlv = match known {
        TlvType::AreaAddress => {
            let mut areas = Vec::new();
            while value.has_remaining() {
                let len = value.try_get_u8()? as usize;
                if value.remaining() < len {
                    return Err(TlvDecodeError::ReadOutOfBounds);
                }
                let bytes = value.copy_to_bytes(len);
                areas.push(AreaAddr::from(bytes.as_ref()));
            }
            Tlv::AreaAddress(areas)
        }
        TlvType::LspIisNeighbor => {
            let is_virtual = value.try_get_u8()? != 0;
            let mut neighbors = Vec::new();
            while value.remaining() >= 11 {
                neighbors.push(IsNeighborEntry {
                    default_metric: value.try_get_u8()?,
                    delay_metric: value.try_get_u8()?,
                    expense_metric: value.try_get_u8()?,
                    error_metric: value.try_get_u8()?,
                    neighbor_id: get_array_7(value)?,
                });
            }
            Tlv::LspIisNeighbor {
                is_virtual,
                neighbors,
            }
        }
        TlvType::EsNeighbor => {
            let mut metric = [0u8; 4];
            value.try_copy_to_slice(&mut metric)?;
            let mut neighbors = Vec::new();
            while value.remaining() >= 6 {
                neighbors.push(get_array_6(value)?);
            }
            Tlv::EsNeighbor { metric, neighbors }
        }
        TlvType::IihIisNeighbor => {
            let mut macs = Vec::new();
            while value.remaining() >= 6 {
                macs.push(get_array_6(value)?);
            }
            Tlv::IihIisNeighbor(macs)
        }
        TlvType::Padding => Tlv::Padding(tlv_len),
        TlvType::LspEntries => {
            let mut entries = Vec::new();
            while value.remaining() >= 16 {
                let lifetime = value.try_get_u16()?;
                let lsp_id = LspId::decode(value)?;
                let seq_no = value.try_get_u32()?;
                let checksum = value.try_get_u16()?;
                entries.push(LspEntry {
                    lifetime,
                    lsp_id,
                    seq_no,
                    checksum,
                });
            }
            Tlv::LspEntries(entries)
        }
        TlvType::Authentication => {
            if value.remaining() < 1 {
                return Err(TlvDecodeError::InvalidLength(tlv_len as u8));
            }
            let auth_type = value.try_get_u8()?;
            Tlv::Authentication {
                auth_type,
                value: value.clone(),
            }
        }
        TlvType::TeIsNeighbor => {
            Tlv::TeIsNeighbor(decode_te_neighbors(value)?)
        }
        TlvType::Ipv4InternalReach => {
            Tlv::Ipv4InternalReach(decode_ipv4_reach(value)?)
        }
        TlvType::ProtocolsSupported => {
            Tlv::ProtocolsSupported(value.to_vec())
        }
        TlvType::Ipv4ExternalReach => {
            Tlv::Ipv4ExternalReach(decode_ipv4_reach(value)?)
        }
        TlvType::Ipv4IfAddr => {
            let mut addrs = Vec::new();
            while value.remaining() >= 4 {
                addrs.push(Ipv4Addr::from(value.try_get_u32()?));
            }
            Tlv::Ipv4IfAddr(addrs)
        }
        TlvType::TeIpReach => Tlv::TeIpReach(decode_te_ip_reach(value)?),
        TlvType::DynamicHostname => {
            Tlv::DynamicHostname(
                String::from_utf8_lossy(value.as_ref()).into_owned(),
            )
        }
        TlvType::Restart => {
            if value.remaining() < 3 {
                return Err(TlvDecodeError::InvalidLength(tlv_len as u8));
            }
            let flags = value.try_get_u8()?;
            let holdingtime = value.try_get_u16()?;
            let restarting_neighbor_id = value.clone();
            Tlv::Restart {
                flags,
                holdingtime,
                restarting_neighbor_id,
            }
        }
        TlvType::MtIsNeighbor => {
            if value.remaining() < 2 {
                return Err(TlvDecodeError::InvalidLength(tlv_len as u8));
            }
            let mtid = value.try_get_u16()? & 0x0FFF;
            let neighbors = decode_te_neighbors(value)?;
            Tlv::MtIsNeighbor { mtid, neighbors }
        }
        TlvType::MultipleTopologies => {
            let mut entries = Vec::new();
            while value.remaining() >= 2 {
                let raw = value.try_get_u16()?;
                entries.push(MtEntry {
                    overload: raw & 0x8000 != 0,
                    attached: raw & 0x4000 != 0,
                    mtid: raw & 0x0FFF,
                });
            }
            Tlv::MultipleTopologies(entries)
        }
        TlvType::Ipv6IfAddr => {
            let mut addrs = Vec::new();
            while value.remaining() >= 16 {
                addrs.push(get_ipv6(value)?);
            }
            Tlv::Ipv6IfAddr(addrs)
        }
        TlvType::MtIpReach => {
            if value.remaining() < 2 {
                return Err(TlvDecodeError::InvalidLength(tlv_len as u8));
            }
            let mtid = value.try_get_u16()?;
            let entries = decode_te_ip_reach(value)?;
            Tlv::MtIpReach { mtid, entries }
        }
        TlvType::Ipv6IpReach => {
            Tlv::Ipv6IpReach(decode_ipv6_reach_entry(value)?)
        }
        TlvType::MtIpv6IpReach => {
            if value.remaining() < 2 {
                return Err(TlvDecodeError::InvalidLength(tlv_len as u8));
            }
            let mtid = value.try_get_u16()?;
            let mut entries = Vec::new();
            while value.remaining() >= 6 {
                entries.push(decode_ipv6_reach_entry(value)?);
            }
            Tlv::MtIpv6IpReach { mtid, entries }
        }
        TlvType::ThreeWayHello => {
            if value.remaining() < 1 {
                return Err(TlvDecodeError::InvalidLength(tlv_len as u8));
            }
            let state_byte = value.try_get_u8()?;
            let state = ThreeWayState::from_wire(state_byte)
                .ok_or(TlvDecodeError::InvalidLength(tlv_len as u8))?;
            let local_circuit_id = if tlv_len >= 5 {
                Some(value.try_get_u32()?)
            } else {
                None
            };
            let neighbor_sysid = if tlv_len >= 11 {
                Some(SystemId::decode(value)?)
            } else {
                None
            };
            let neighbor_local_circuit_id = if tlv_len >= 15 {
                Some(value.try_get_u32()?)
            } else {
                None
            };
            Tlv::ThreeWayHello(ThreeWayHello {
                state,
                local_circuit_id,
                neighbor_sysid,
                neighbor_local_circuit_id,
            })
        }
    };
    Ok(tlv)
}

fn decode_te_neighbors(
    value: &mut Bytes,
) -> Result<Vec<TeNeighborEntry>, TlvDecodeError> {
    let mut entries = Vec::new();
    while value.remaining() >= 11 {
        let neighbor_id = get_array_7(value)?;
        let metric = get_u24(value)?;
        let sublen = value.try_get_u8()? as usize;
        if value.remaining() < sublen {
            return Err(TlvDecodeError::ReadOutOfBounds);
        }
        let mut subbuf = value.copy_to_bytes(sublen);
        let subtlvs = decode_subtlvs(&mut subbuf)?;
        entries.push(TeNeighborEntry {
            neighbor_id,
            metric,
            subtlvs,
        });
    }
    Ok(entries)
}

fn decode_ipv4_reach(
    value: &mut Bytes,
) -> Result<Vec<Ipv4ReachEntry>, TlvDecodeError> {
    let mut entries = Vec::new();
    while value.remaining() >= 12 {
        let mut metric = [0u8; 4];
        value.try_copy_to_slice(&mut metric)?;
        let address = Ipv4Addr::from(value.try_get_u32()?);
        let mask = Ipv4Addr::from(value.try_get_u32()?);
        entries.push(Ipv4ReachEntry {
            metric,
            address,
            mask,
        });
    }
    Ok(entries)
}

fn decode_te_ip_reach(
    value: &mut Bytes,
) -> Result<Vec<TeIpReachEntry>, TlvDecodeError> {
    let mut entries = Vec::new();
    while value.remaining() >= 5 {
        let metric = value.try_get_u32()?;
        let control = value.try_get_u8()?;
        let up_down = control & 0x80 != 0;
        let has_subtlvs = control & 0x40 != 0;
        let prefix_len = control & 0x3F;
        let nbytes = prefix_len.div_ceil(8) as usize;
        if value.remaining() < nbytes {
            return Err(TlvDecodeError::ReadOutOfBounds);
        }
        let mut octets = [0u8; 4];
        value.copy_to_slice(&mut octets[..nbytes]);
        if has_subtlvs {
            let sublen = value.try_get_u8()? as usize;
            if value.remaining() < sublen {
                return Err(TlvDecodeError::ReadOutOfBounds);
            }
            value.advance(sublen);
        }
        entries.push(TeIpReachEntry {
            metric,
            up_down,
            has_subtlvs,
            prefix_len,
            prefix: Ipv4Addr::from(octets),
        });
    }
    Ok(entries)
}

fn decode_ipv6_reach_entry(
    value: &mut Bytes,
) -> Result<Ipv6ReachEntry, TlvDecodeError> {
    if value.remaining() < 6 {
        return Err(TlvDecodeError::ReadOutOfBounds);
    }
    let metric = value.try_get_u32()?;
    let control = value.try_get_u8()?;
    let up_down = control & 0x80 != 0;
    let external = control & 0x40 != 0;
    let has_subtlvs = control & 0x20 != 0;
    let prefix_len = value.try_get_u8()?;
    let nbytes = prefix_len.div_ceil(8) as usize;
    if value.remaining() < nbytes {
        return Err(TlvDecodeError::ReadOutOfBounds);
    }
    let mut octets = [0u8; 16];
    value.copy_to_slice(&mut octets[..nbytes]);
    if has_subtlvs {
        let sublen = value.try_get_u8()? as usize;
        if value.remaining() < sublen {
            return Err(TlvDecodeError::ReadOutOfBounds);
        }
        value.advance(sublen);
    }
    Ok(Ipv6ReachEntry {
        metric,
        up_down,
        external,
        has_subtlvs,
        prefix_len,
        prefix: Ipv6Addr::from(octets),
    })
}

fn decode_subtlvs(buf: &mut Bytes) -> Result<Vec<SubTlv>, TlvDecodeError> {
    let mut subtlvs = Vec::new();
    while buf.remaining() >= 2 {
        let stlv_type = buf.try_get_u8()?;
        let stlv_len = buf.try_get_u8()?;
        if buf.remaining() < stlv_len as usize {
            return Err(TlvDecodeError::ReadOutOfBounds);
        }
        let mut value = buf.copy_to_bytes(stlv_len as usize);
        let subtlv = match SubTlvType::from_u8(stlv_type) {
            Some(SubTlvType::AdminGroup) if stlv_len == 4 => {
                SubTlv::AdminGroup(value.try_get_u32()?)
            }
            Some(SubTlvType::Ipv4IntfAddr) if stlv_len == 4 => {
                SubTlv::Ipv4IntfAddr(Ipv4Addr::from(value.try_get_u32()?))
            }
            Some(SubTlvType::Ipv4NbrAddr) if stlv_len == 4 => {
                SubTlv::Ipv4NbrAddr(Ipv4Addr::from(value.try_get_u32()?))
            }
            Some(SubTlvType::MaxLinkBwidth) if stlv_len == 4 => {
                let mut b = [0u8; 4];
                value.try_copy_to_slice(&mut b)?;
                SubTlv::MaxLinkBwidth(b)
            }
            Some(SubTlvType::MaxResLinkBwidth) if stlv_len == 4 => {
                let mut b = [0u8; 4];
                value.try_copy_to_slice(&mut b)?;
                SubTlv::MaxResLinkBwidth(b)
            }
            Some(SubTlvType::UnresBwidth) if stlv_len == 32 => {
                let mut bws = [[0u8; 4]; 8];
                for bw in &mut bws {
                    value.try_copy_to_slice(bw)?;
                }
                SubTlv::UnresBwidth(bws)
            }
            Some(SubTlvType::TeDefaultMetric) if stlv_len == 3 => {
                let mut b = [0u8; 3];
                value.try_copy_to_slice(&mut b)?;
                SubTlv::TeDefaultMetric(b)
            }
            _ => SubTlv::Unknown {
                stlv_type,
                len: stlv_len,
            },
        };
        subtlvs.push(subtlv);
    }
    Ok(subtlvs)
}

fn get_array_6(buf: &mut Bytes) -> Result<[u8; 6], TlvDecodeError> {
    let mut out = [0u8; 6];
    buf.try_copy_to_slice(&mut out)?;
    Ok(out)
}

fn get_array_7(buf: &mut Bytes) -> Result<[u8; 7], TlvDecodeError> {
    let mut out = [0u8; 7];
    buf.try_copy_to_slice(&mut out)?;
    Ok(out)
}

fn get_u24(buf: &mut Bytes) -> Result<u32, TlvDecodeError> {
    if buf.remaining() < 3 {
        return Err(TlvDecodeError::ReadOutOfBounds);
    }
    let b0 = buf.try_get_u8()? as u32;
    let b1 = buf.try_get_u8()? as u32;
    let b2 = buf.try_get_u8()? as u32;
    Ok((b0 << 16) | (b1 << 8) | b2)
}

fn get_ipv6(buf: &mut Bytes) -> Result<Ipv6Addr, TlvDecodeError> {
    let mut out = [0u8; 16];
    buf.try_copy_to_slice(&mut out)?;
    Ok(Ipv6Addr::from(out))
}

// ===== encode =====

// Encodes a single TLV, splitting LSPEntries into groups of 15 entries
// as required by the encoding policy. Returns the number of wire TLVs
// emitted.
pub fn encode_tlv(tlv: &Tlv, buf: &mut BytesMut) -> EncodeResult<()> {
    match tlv {
        Tlv::AreaAddress(areas) => {
            let mut value = BytesMut::new();
            for area in areas {
                value.put_u8(area.as_ref().len() as u8);
                value.put_slice(area.as_ref());
            }
            put_tlv(buf, TlvType::AreaAddress as u8, &value)
        }
        Tlv::LspIisNeighbor {
            is_virtual,
            neighbors,
        } => {
            let mut value = BytesMut::new();
            value.put_u8(*is_virtual as u8);
            for n in neighbors {
                value.put_u8(n.default_metric);
                value.put_u8(n.delay_metric);
                value.put_u8(n.expense_metric);
                value.put_u8(n.error_metric);
                value.put_slice(&n.neighbor_id);
            }
            put_tlv(buf, TlvType::LspIisNeighbor as u8, &value)
        }
        Tlv::EsNeighbor { metric, neighbors } => {
            let mut value = BytesMut::new();
            value.put_slice(metric);
            for n in neighbors {
                value.put_slice(n);
            }
            put_tlv(buf, TlvType::EsNeighbor as u8, &value)
        }
        Tlv::IihIisNeighbor(macs) => {
            let mut value = BytesMut::new();
            for mac in macs {
                value.put_slice(mac);
            }
            put_tlv(buf, TlvType::IihIisNeighbor as u8, &value)
        }
        Tlv::Padding(len) => encode_padding(buf, *len),
        Tlv::LspEntries(entries) => {
            for chunk in entries.chunks(15) {
                let mut value = BytesMut::new();
                for e in chunk {
                    value.put_u16(e.lifetime);
                    e.lsp_id.encode(&mut value);
                    value.put_u32(e.seq_no);
                    value.put_u16(e.checksum);
                }
                put_tlv(buf, TlvType::LspEntries as u8, &value)?;
            }
            Ok(())
        }
        Tlv::Authentication { auth_type, value } => {
            let mut v = BytesMut::with_capacity(1 + value.len());
            v.put_u8(*auth_type);
            v.put_slice(value);
            put_tlv(buf, TlvType::Authentication as u8, &v)
        }
        Tlv::ProtocolsSupported(nlpids) => {
            put_tlv(buf, TlvType::ProtocolsSupported as u8, nlpids)
        }
        Tlv::Ipv4IfAddr(addrs) => {
            let mut value = BytesMut::new();
            for a in addrs {
                value.put_u32(u32::from(*a));
            }
            put_tlv(buf, TlvType::Ipv4IfAddr as u8, &value)
        }
        Tlv::DynamicHostname(name) => {
            put_tlv(buf, TlvType::DynamicHostname as u8, name.as_bytes())
        }
        Tlv::MultipleTopologies(entries) => {
            let mut value = BytesMut::new();
            for e in entries {
                let mut raw = e.mtid & 0x0FFF;
                if e.overload {
                    raw |= 0x8000;
                }
                if e.attached {
                    raw |= 0x4000;
                }
                value.put_u16(raw);
            }
            put_tlv(buf, TlvType::MultipleTopologies as u8, &value)
        }
        Tlv::Ipv6IfAddr(addrs) => {
            let mut value = BytesMut::new();
            for a in addrs {
                value.put_slice(&a.octets());
            }
            put_tlv(buf, TlvType::Ipv6IfAddr as u8, &value)
        }
        Tlv::ThreeWayHello(twh) => {
            let mut value = BytesMut::new();
            value.put_u8(twh.state.to_wire());
            if let Some(lcid) = twh.local_circuit_id {
                value.put_u32(lcid);
            }
            if let Some(sysid) = &twh.neighbor_sysid {
                sysid.encode(&mut value);
            }
            if let Some(nlcid) = twh.neighbor_local_circuit_id {
                value.put_u32(nlcid);
            }
            put_tlv(buf, TlvType::ThreeWayHello as u8, &value)
        }
        Tlv::Ipv4InternalReach(_)
        | Tlv::Ipv4ExternalReach(_)
        | Tlv::TeIsNeighbor(_)
        | Tlv::TeIpReach(_)
        | Tlv::Restart { .. }
        | Tlv::MtIsNeighbor { .. }
        | Tlv::MtIpReach { .. }
        | Tlv::Ipv6IpReach(_)
        | Tlv::MtIpv6IpReach { .. } => {
            // Not originated by this passive speaker (it never speaks
            // routing reachability of its own); encoding support exists
            // only for the TLVs this speaker actually transmits.
            Err(EncodeError::UnknownTlvType(tlv.type_code()))
        }
        Tlv::Unknown { tlv_type, value } => put_tlv(buf, *tlv_type, value),
    }
}

pub fn encode_tlvs(tlvs: &[Tlv], buf: &mut BytesMut) -> EncodeResult<()> {
    for tlv in tlvs {
        encode_tlv(tlv, buf)?;
    }
    Ok(())
}

fn put_tlv(buf: &mut BytesMut, tlv_type: u8, value: &[u8]) -> EncodeResult<()> {
    if value.len() > TLV_MAX_LEN {
        return Err(EncodeError::ValueTooLong {
            tlv_type,
            len: value.len(),
        });
    }
    buf.put_u8(tlv_type);
    buf.put_u8(value.len() as u8);
    buf.put_slice(value);
    Ok(())
}

// Fills `target_len - buf.len()` bytes with Padding TLVs: repeated
// maximum-length (257-octet) units followed by one final, shorter
// padding TLV. A no-op if the buffer already meets the target length.
pub fn pad_to(buf: &mut BytesMut, target_len: usize) {
    const MAX_PAD_UNIT: usize = 257;
    while buf.len() < target_len {
        let remaining = target_len - buf.len();
        if remaining >= MAX_PAD_UNIT {
            buf.put_u8(TlvType::Padding as u8);
            buf.put_u8(TLV_MAX_LEN as u8);
            buf.put_bytes(0, TLV_MAX_LEN);
        } else {
            let value_len = remaining - TLV_HDR_LEN;
            buf.put_u8(TlvType::Padding as u8);
            buf.put_u8(value_len as u8);
            buf.put_bytes(0, value_len);
        }
    }
}

fn encode_padding(buf: &mut BytesMut, len: usize) -> EncodeResult<()> {
    put_tlv(buf, TlvType::Padding as u8, &vec![0u8; len])
}

impl Tlv {
    fn type_code(&self) -> u8 {
        match self {
            Tlv::AreaAddress(..) => TlvType::AreaAddress as u8,
            Tlv::LspIisNeighbor { .. } => TlvType::LspIisNeighbor as u8,
            Tlv::EsNeighbor { .. } => TlvType::EsNeighbor as u8,
            Tlv::IihIisNeighbor(..) => TlvType::IihIisNeighbor as u8,
            Tlv::Padding(..) => TlvType::Padding as u8,
            Tlv::LspEntries(..) => TlvType::LspEntries as u8,
            Tlv::Authentication { .. } => TlvType::Authentication as u8,
            Tlv::TeIsNeighbor(..) => TlvType::TeIsNeighbor as u8,
            Tlv::Ipv4InternalReach(..) => TlvType::Ipv4InternalReach as u8,
            Tlv::ProtocolsSupported(..) => TlvType::ProtocolsSupported as u8,
            Tlv::Ipv4ExternalReach(..) => TlvType::Ipv4ExternalReach as u8,
            Tlv::Ipv4IfAddr(..) => TlvType::Ipv4IfAddr as u8,
            Tlv::TeIpReach(..) => TlvType::TeIpReach as u8,
            Tlv::DynamicHostname(..) => TlvType::DynamicHostname as u8,
            Tlv::Restart { .. } => TlvType::Restart as u8,
            Tlv::MtIsNeighbor { .. } => TlvType::MtIsNeighbor as u8,
            Tlv::MultipleTopologies(..) => TlvType::MultipleTopologies as u8,
            Tlv::Ipv6IfAddr(..) => TlvType::Ipv6IfAddr as u8,
            Tlv::MtIpReach { .. } => TlvType::MtIpReach as u8,
            Tlv::Ipv6IpReach(..) => TlvType::Ipv6IpReach as u8,
            Tlv::MtIpv6IpReach { .. } => TlvType::MtIpv6IpReach as u8,
            Tlv::ThreeWayHello(..) => TlvType::ThreeWayHello as u8,
            Tlv::Unknown { tlv_type, .. } => *tlv_type,
        }
    }
}

// AuthenticationType is retained only as a round-trip helper for
// configuration validation (the speaker only ever sends type 1).
pub fn auth_type_cleartext() -> u8 {
    AuthenticationType::ClearText
        .to_u8()
        .expect("ClearText fits in a u8")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padding_fills_exact_target() {
        let mut buf = BytesMut::new();
        buf.put_slice(&[0u8; 10]);
        pad_to(&mut buf, 1514);
        assert_eq!(buf.len(), 1514);
    }

    #[test]
    fn padding_noop_when_already_at_target() {
        let mut buf = BytesMut::new();
        buf.put_slice(&[0u8; 1514]);
        pad_to(&mut buf, 1514);
        assert_eq!(buf.len(), 1514);
    }

    #[test]
    fn lsp_entries_tlv_round_trips() {
        let entries: Vec<LspEntry> = (0..3)
            .map(|i| LspEntry {
                lifetime: 1200,
                lsp_id: LspId::from([0, 0, 0, 0, 0, i as u8, 0, 0]),
                seq_no: 7,
                checksum: 0x1234,
            })
            .collect();
        let tlv = Tlv::LspEntries(entries.clone());
        let mut buf = BytesMut::new();
        encode_tlv(&tlv, &mut buf).unwrap();
        let mut bytes = buf.freeze();
        let decoded = decode_tlvs(&mut bytes);
        assert_eq!(decoded, vec![Tlv::LspEntries(entries)]);
    }

    #[test]
    fn lsp_entries_split_into_groups_of_15() {
        let entries: Vec<LspEntry> = (0..20)
            .map(|i| LspEntry {
                lifetime: 1200,
                lsp_id: LspId::from([0, 0, 0, 0, 0, i as u8, 0, 0]),
                seq_no: 1,
                checksum: 0,
            })
            .collect();
        let tlv = Tlv::LspEntries(entries);
        let mut buf = BytesMut::new();
        encode_tlv(&tlv, &mut buf).unwrap();
        let mut bytes = buf.freeze();
        let decoded = decode_tlvs(&mut bytes);
        assert_eq!(decoded.len(), 2);
    }

    #[test]
    fn unknown_tlv_preserved_opaquely() {
        let mut buf = BytesMut::new();
        buf.put_u8(250);
        buf.put_u8(3);
        buf.put_slice(&[1, 2, 3]);
        let mut bytes = buf.freeze();
        let decoded = decode_tlvs(&mut bytes);
        assert_eq!(
            decoded,
            vec![Tlv::Unknown {
                tlv_type: 250,
                value: Bytes::from_static(&[1, 2, 3]),
            }]
        );
    }

    #[test]
    fn three_way_hello_short_form() {
        let twh = ThreeWayHello {
            state: ThreeWayState::Down,
            local_circuit_id: None,
            neighbor_sysid: None,
            neighbor_local_circuit_id: None,
        };
        let mut buf = BytesMut::new();
        encode_tlv(&Tlv::ThreeWayHello(twh), &mut buf).unwrap();
        let mut bytes = buf.freeze();
        let decoded = decode_tlvs(&mut bytes);
        assert_eq!(decoded, vec![Tlv::ThreeWayHello(twh)]);
    }

    #[test]
    fn three_way_state_transition_table() {
        assert_eq!(
            ThreeWayState::next_tx(Some(ThreeWayState::Down)),
            ThreeWayState::Initializing
        );
        assert_eq!(
            ThreeWayState::next_tx(Some(ThreeWayState::Initializing)),
            ThreeWayState::Up
        );
        assert_eq!(
            ThreeWayState::next_tx(Some(ThreeWayState::Up)),
            ThreeWayState::Up
        );
        assert_eq!(ThreeWayState::next_tx(None), ThreeWayState::Up);
    }

    #[test]
    fn te_ip_reach_prefix_byte_counts() {
        for (plen, expected_bytes) in [(0u8, 0usize), (1, 1), (8, 1), (32, 4)]
        {
            let mut value = BytesMut::new();
            value.put_u32(10);
            value.put_u8(plen); // control byte: no up/down, no subtlv
            value.put_bytes(0xAA, expected_bytes);
            let mut bytes = value.freeze();
            let entries = decode_te_ip_reach(&mut bytes).unwrap();
            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0].prefix_len, plen);
        }
    }
}
