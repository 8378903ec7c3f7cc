//
// SPDX-License-Identifier: MIT
//
// Per-neighbor FSM: ingests decoded Hellos, maintains adjacency state,
// and builds the cached outbound Hello each adjacency retransmits on
// its own schedule.

use std::collections::HashMap;

use bytes::{Bytes, BytesMut};

use crate::config::Config;
use crate::debug::Debug;
use crate::network::{MacAddr, MulticastAddr};
use crate::packet::consts::{self, PduType};
use crate::packet::error::EncodeResult;
use crate::packet::pdu::{FrameHeader, Hello, HelloVariant};
use crate::packet::tlv::{self, MtEntry, Tlv, ThreeWayHello, ThreeWayState};
use crate::packet::{AdjacencyType, SystemId};

// ISO-assigned NLPID values advertised in the Protocols Supported TLV.
const NLPID_IPV4: u8 = 0xCC;
const NLPID_IPV6: u8 = 0x8E;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AdjacencyState {
    Down,
    Initializing,
    Up,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AdjacencyEvent {
    HelloOneWayRcvd,
    HelloTwoWayRcvd,
    HoldtimeExpired,
    LinkDown,
    Kill,
}

#[derive(Debug)]
pub struct Adjacency {
    pub mac: MacAddr,
    pub adjacency_type: AdjacencyType,
    pub system_id: SystemId,
    pub state: AdjacencyState,
    pub holdtime: u16,
    pub holdtimer: u16,
    pub rtx_at: u16,
    pub cached_hello: Bytes,
}

pub type AdjacencyKey = (MacAddr, AdjacencyType);
pub type AdjacencyMap = HashMap<AdjacencyKey, Adjacency>;

impl Adjacency {
    fn new(
        mac: MacAddr,
        adjacency_type: AdjacencyType,
        system_id: SystemId,
        state: AdjacencyState,
        holdtime: u16,
        cached_hello: Bytes,
    ) -> Adjacency {
        let adj = Adjacency {
            mac,
            adjacency_type,
            system_id,
            state,
            holdtime,
            holdtimer: holdtime,
            // Forces an immediate send at the next event-loop tick.
            rtx_at: 0,
            cached_hello,
        };
        Debug::AdjacencyCreate(&adj).log();
        adj
    }

    fn state_change(&mut self, new_state: AdjacencyState, event: AdjacencyEvent) {
        if self.state == new_state {
            return;
        }
        Debug::AdjacencyStateChange(self, new_state, event).log();
        self.state = new_state;
    }

    // Refreshes holdtimer/retransmit bookkeeping and the cached Hello
    // on receipt of a fresh Hello from this peer. Every refresh zeroes
    // the retransmit countdown so the updated Hello goes out promptly.
    fn refresh(&mut self, holdtime: u16, cached_hello: Bytes) {
        self.holdtime = holdtime;
        self.holdtimer = holdtime;
        self.rtx_at = 0;
        self.cached_hello = cached_hello;
    }
}

impl Drop for Adjacency {
    fn drop(&mut self) {
        Debug::AdjacencyDelete(self).log();
    }
}

// ===== Hello ingestion =====

// Processes a decoded Hello: creates or refreshes the adjacency keyed
// by `(src_mac, adjacency_type)` and rebuilds its cached outbound
// Hello. The rebuilt Hello is sent by the event loop once this
// adjacency's retransmit countdown comes due, not synchronously here.
pub fn on_hello(
    map: &mut AdjacencyMap,
    config: &Config,
    local_mac: MacAddr,
    src_mac: MacAddr,
    hello: &Hello,
) -> EncodeResult<()> {
    let Some(adjacency_type) = AdjacencyType::from_pdu_type(hello.pdu_type) else {
        return Ok(());
    };
    let key = (src_mac, adjacency_type);
    let exists = map.contains_key(&key);

    let (new_state, event, three_way_tx) = match adjacency_type {
        AdjacencyType::L1 | AdjacencyType::L2 => {
            if exists {
                (AdjacencyState::Up, AdjacencyEvent::HelloTwoWayRcvd, None)
            } else {
                (
                    AdjacencyState::Initializing,
                    AdjacencyEvent::HelloOneWayRcvd,
                    None,
                )
            }
        }
        AdjacencyType::PointToPoint => {
            let rx = hello.tlvs.iter().find_map(|tlv| match tlv {
                Tlv::ThreeWayHello(twh) => Some(twh.state),
                _ => None,
            });
            let tx = ThreeWayState::next_tx(rx);
            let state = match tx {
                ThreeWayState::Down => AdjacencyState::Down,
                ThreeWayState::Initializing => AdjacencyState::Initializing,
                ThreeWayState::Up => AdjacencyState::Up,
            };
            let event = if rx.is_none() {
                AdjacencyEvent::HelloOneWayRcvd
            } else {
                AdjacencyEvent::HelloTwoWayRcvd
            };
            (state, event, Some(tx))
        }
    };

    let dst_mac = destination_mac(adjacency_type, src_mac);
    let peer_macs = lan_peer_macs(map, adjacency_type, src_mac);
    let cached_hello = build_hello_frame(
        config,
        local_mac,
        dst_mac,
        adjacency_type,
        &peer_macs,
        three_way_tx,
    )?;

    match map.get_mut(&key) {
        Some(adj) => {
            adj.state_change(new_state, event);
            adj.refresh(hello.holdtime, cached_hello);
        }
        None => {
            let adj = Adjacency::new(
                src_mac,
                adjacency_type,
                hello.source_id,
                new_state,
                hello.holdtime,
                cached_hello,
            );
            map.insert(key, adj);
        }
    }
    Ok(())
}

// Every MAC currently holding an adjacency at `adjacency_type`,
// including `src_mac` itself — the IIH IS Neighbor TLV reports
// everyone heard on this LAN, not just previously-known peers.
fn lan_peer_macs(
    map: &AdjacencyMap,
    adjacency_type: AdjacencyType,
    src_mac: MacAddr,
) -> Vec<MacAddr> {
    if adjacency_type == AdjacencyType::PointToPoint {
        return Vec::new();
    }
    let mut macs: Vec<MacAddr> = map
        .keys()
        .filter(|(_, t)| *t == adjacency_type)
        .map(|(mac, _)| *mac)
        .collect();
    if !macs.contains(&src_mac) {
        macs.push(src_mac);
    }
    macs
}

fn destination_mac(adjacency_type: AdjacencyType, peer_mac: MacAddr) -> MacAddr {
    match adjacency_type {
        AdjacencyType::L1 => MulticastAddr::AllL1Iss.as_mac(),
        AdjacencyType::L2 => MulticastAddr::AllL2Iss.as_mac(),
        AdjacencyType::PointToPoint => peer_mac,
    }
}

// ===== retransmission =====

// Debits `elapsed` seconds from every adjacency's holdtimer and
// retransmit countdown. Adjacencies whose holdtimer reaches zero are
// reaped (`AdjacencyEvent::HoldtimeExpired`); adjacencies whose
// retransmit countdown falls to or below `retx_thresh` have their
// cached Hello returned for (re)transmission and their countdown
// reset to the full holdtimer.
pub fn tick(map: &mut AdjacencyMap, elapsed: u16, retx_thresh: u16) -> Vec<(MacAddr, Bytes)> {
    map.retain(|_, adj| {
        adj.holdtimer = adj.holdtimer.saturating_sub(elapsed);
        if adj.holdtimer == 0 {
            adj.state_change(AdjacencyState::Down, AdjacencyEvent::HoldtimeExpired);
            return false;
        }
        true
    });

    let mut due = Vec::new();
    for adj in map.values_mut() {
        adj.rtx_at = adj.rtx_at.saturating_sub(elapsed);
        if adj.rtx_at <= retx_thresh {
            due.push((adj.mac, adj.cached_hello.clone()));
            adj.rtx_at = adj.holdtime;
        }
    }
    due
}

// ===== outbound Hello construction =====

fn protocols_supported(config: &Config) -> Vec<u8> {
    let mut nlpids = Vec::new();
    if !config.interface.ipv4_addrs.is_empty() {
        nlpids.push(NLPID_IPV4);
    }
    if !config.interface.ipv6_addrs.is_empty() {
        nlpids.push(NLPID_IPV6);
    }
    nlpids
}

fn common_tlvs(config: &Config) -> Vec<Tlv> {
    let mut tlvs = Vec::new();
    if let Some(password) = &config.cleartext_password {
        tlvs.push(Tlv::Authentication {
            auth_type: tlv::auth_type_cleartext(),
            value: Bytes::copy_from_slice(password.as_bytes()),
        });
    }
    let protocols = protocols_supported(config);
    if !protocols.is_empty() {
        tlvs.push(Tlv::ProtocolsSupported(protocols));
    }
    tlvs.push(Tlv::AreaAddress(vec![config.area_address.clone()]));
    if !config.interface.ipv4_addrs.is_empty() {
        tlvs.push(Tlv::Ipv4IfAddr(config.interface.ipv4_addrs.clone()));
    }
    if !config.interface.ipv6_addrs.is_empty() {
        tlvs.push(Tlv::Ipv6IfAddr(config.interface.ipv6_addrs.clone()));
    }
    tlvs.push(Tlv::MultipleTopologies(vec![
        MtEntry {
            overload: false,
            attached: false,
            mtid: 0,
        },
        MtEntry {
            overload: false,
            attached: false,
            mtid: 2,
        },
    ]));
    tlvs
}

fn build_hello(
    config: &Config,
    adjacency_type: AdjacencyType,
    peer_macs: &[MacAddr],
    three_way_tx: Option<ThreeWayState>,
) -> Hello {
    let mut tlvs = common_tlvs(config);
    let variant = match adjacency_type {
        AdjacencyType::L1 | AdjacencyType::L2 => {
            tlvs.push(Tlv::IihIisNeighbor(peer_macs.iter().map(|mac| mac.0).collect()));
            HelloVariant::Lan {
                priority: 0,
                lan_id: config.lan_id,
            }
        }
        AdjacencyType::PointToPoint => {
            let state = three_way_tx.unwrap_or(ThreeWayState::Up);
            tlvs.push(Tlv::ThreeWayHello(ThreeWayHello {
                state,
                local_circuit_id: None,
                neighbor_sysid: None,
                neighbor_local_circuit_id: None,
            }));
            HelloVariant::PointToPoint {
                local_circuit_id: 1,
            }
        }
    };
    let pdu_type = match adjacency_type {
        AdjacencyType::L1 => PduType::HelloLanL1,
        AdjacencyType::L2 => PduType::HelloLanL2,
        AdjacencyType::PointToPoint => PduType::HelloP2P,
    };
    Hello {
        pdu_type,
        // Always L1+L2: this speaker never restricts its circuit type.
        circuit_type: 0b11,
        source_id: config.system_id,
        holdtime: config.holdtime,
        variant,
        tlvs,
    }
}

// Builds a complete, frame-ready, 1514-byte Hello (frame header + LLC
// + IS-IS payload + padding) addressed to `dst_mac`.
pub fn build_hello_frame(
    config: &Config,
    local_mac: MacAddr,
    dst_mac: MacAddr,
    adjacency_type: AdjacencyType,
    peer_macs: &[MacAddr],
    three_way_tx: Option<ThreeWayState>,
) -> EncodeResult<Bytes> {
    let hello = build_hello(config, adjacency_type, peer_macs, three_way_tx);
    let pdu_bytes = hello.encode()?;

    let mut frame = BytesMut::new();
    let header = FrameHeader {
        dst_mac: dst_mac.0,
        src_mac: local_mac.0,
        length: consts::HELLO_PAYLOAD_LEN,
    };
    header.encode(&mut frame);
    frame.extend_from_slice(&pdu_bytes);
    tlv::pad_to(&mut frame, consts::PACKET_BUF_LEN);
    Ok(frame.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, RawAdjacencyType, RawConfig, RawInterfaceConfig};
    use crate::packet::pdu::Pdu;
    use crate::packet::LanId;

    fn sample_config(adjacency_type: RawAdjacencyType) -> Config {
        let raw = RawConfig {
            area_address: "49.0001".to_string(),
            system_id: "0200.0000.0001".to_string(),
            lan_id: "0200.0000.0001.01".to_string(),
            interface: RawInterfaceConfig {
                device: "eth0".to_string(),
                adjacency_type,
                ipv4_addrs: vec!["192.0.2.1".to_string()],
                ipv6_addrs: vec![],
            },
            cleartext_password: None,
            holdtime: None,
            retx_thresh: None,
            capture_prefix: None,
        };
        Config::from_raw(raw).unwrap()
    }

    fn lan_hello(holdtime: u16) -> Hello {
        Hello {
            pdu_type: PduType::HelloLanL1,
            circuit_type: 0b11,
            source_id: SystemId::from([2, 0, 0, 0, 0, 1]),
            holdtime,
            variant: HelloVariant::Lan {
                priority: 0,
                lan_id: LanId::from((SystemId::from([2, 0, 0, 0, 0, 1]), 1)),
            },
            tlvs: vec![],
        }
    }

    #[test]
    fn lan_hello_creates_initializing_adjacency() {
        let config = sample_config(RawAdjacencyType::L1);
        let mut map = AdjacencyMap::new();
        let local_mac = MacAddr([0x02, 0, 0, 0, 0, 0x10]);
        let src_mac = MacAddr([0x02, 0, 0, 0, 0, 0x01]);

        on_hello(&mut map, &config, local_mac, src_mac, &lan_hello(30)).unwrap();

        let adj = map.get(&(src_mac, AdjacencyType::L1)).unwrap();
        assert_eq!(adj.state, AdjacencyState::Initializing);
        assert_eq!(adj.cached_hello.len(), consts::PACKET_BUF_LEN);

        let pdu = Pdu::decode(adj.cached_hello.slice(FrameHeader::LEN..)).unwrap();
        match pdu {
            Pdu::Hello(hello) => assert!(hello
                .tlvs
                .iter()
                .any(|tlv| matches!(tlv, Tlv::IihIisNeighbor(macs) if macs.contains(&src_mac.0)))),
            _ => panic!("expected Hello"),
        }
    }

    #[test]
    fn second_lan_hello_brings_adjacency_up() {
        let config = sample_config(RawAdjacencyType::L1);
        let mut map = AdjacencyMap::new();
        let local_mac = MacAddr([0x02, 0, 0, 0, 0, 0x10]);
        let src_mac = MacAddr([0x02, 0, 0, 0, 0, 0x01]);

        on_hello(&mut map, &config, local_mac, src_mac, &lan_hello(30)).unwrap();
        on_hello(&mut map, &config, local_mac, src_mac, &lan_hello(30)).unwrap();

        let adj = map.get(&(src_mac, AdjacencyType::L1)).unwrap();
        assert_eq!(adj.state, AdjacencyState::Up);
    }

    #[test]
    fn pp_hello_with_down_state_replies_initializing() {
        let config = sample_config(RawAdjacencyType::PointToPoint);
        let mut map = AdjacencyMap::new();
        let local_mac = MacAddr([0x02, 0, 0, 0, 0, 0x10]);
        let src_mac = MacAddr([0x02, 0, 0, 0, 0, 0x02]);
        let hello = Hello {
            pdu_type: PduType::HelloP2P,
            circuit_type: 0b11,
            source_id: SystemId::from([2, 0, 0, 0, 0, 2]),
            holdtime: 30,
            variant: HelloVariant::PointToPoint {
                local_circuit_id: 1,
            },
            tlvs: vec![Tlv::ThreeWayHello(ThreeWayHello {
                state: ThreeWayState::Down,
                local_circuit_id: None,
                neighbor_sysid: None,
                neighbor_local_circuit_id: None,
            })],
        };

        on_hello(&mut map, &config, local_mac, src_mac, &hello).unwrap();

        let adj = map.get(&(src_mac, AdjacencyType::PointToPoint)).unwrap();
        assert_eq!(adj.state, AdjacencyState::Initializing);

        let pdu = Pdu::decode(adj.cached_hello.slice(FrameHeader::LEN..)).unwrap();
        match pdu {
            Pdu::Hello(hello) => {
                let tx = hello.tlvs.iter().find_map(|tlv| match tlv {
                    Tlv::ThreeWayHello(twh) => Some(twh.state),
                    _ => None,
                });
                assert_eq!(tx, Some(ThreeWayState::Initializing));
            }
            _ => panic!("expected Hello"),
        }
    }

    #[test]
    fn retransmit_tick_resets_countdown() {
        let config = sample_config(RawAdjacencyType::L1);
        let mut map = AdjacencyMap::new();
        let local_mac = MacAddr([0x02, 0, 0, 0, 0, 0x10]);
        let src_mac = MacAddr([0x02, 0, 0, 0, 0, 0x01]);

        on_hello(&mut map, &config, local_mac, src_mac, &lan_hello(10)).unwrap();
        // Flush the immediate post-creation retransmit.
        assert_eq!(tick(&mut map, 0, 3).len(), 1);

        let due = tick(&mut map, 7, 3);
        assert_eq!(due.len(), 1);
        let adj = map.get(&(src_mac, AdjacencyType::L1)).unwrap();
        assert_eq!(adj.rtx_at, 10);
    }

    #[test]
    fn holdtimer_expiry_removes_adjacency() {
        let config = sample_config(RawAdjacencyType::L1);
        let mut map = AdjacencyMap::new();
        let local_mac = MacAddr([0x02, 0, 0, 0, 0, 0x10]);
        let src_mac = MacAddr([0x02, 0, 0, 0, 0, 0x01]);

        on_hello(&mut map, &config, local_mac, src_mac, &lan_hello(10)).unwrap();
        tick(&mut map, 10, 3);
        assert!(map.is_empty());
    }
}
