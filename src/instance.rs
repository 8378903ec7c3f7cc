//
// SPDX-License-Identifier: MIT
//
// The speaker instance: owns the raw socket, the adjacency map and the
// LSDB, and runs the single-threaded event loop that ties them
// together. Nothing here touches the network except through
// `NetSocket`, and nothing runs concurrently with the loop thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use bytes::Bytes;

use crate::adjacency::{self, AdjacencyMap};
use crate::capture::{CaptureSink, NoopSink};
use crate::config::Config;
use crate::debug::Debug;
use crate::error::{Error, PduInputError};
use crate::lsdb::{self, Lsdb};
use crate::network::{MacAddr, NetSocket};
use crate::packet::consts::PduType;
use crate::packet::pdu::{FrameHeader, Pdu};

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

extern "C" fn request_shutdown(_signum: libc::c_int) {
    SHUTDOWN.store(true, Ordering::Relaxed);
}

fn install_shutdown_handler() {
    unsafe {
        libc::signal(libc::SIGINT, request_shutdown as usize);
        libc::signal(libc::SIGTERM, request_shutdown as usize);
    }
}

pub struct Speaker<S: CaptureSink = NoopSink> {
    config: Config,
    socket: NetSocket,
    local_mac: MacAddr,
    adjacencies: AdjacencyMap,
    lsdb: Lsdb,
    capture: S,
    last_tick: Instant,
}

impl Speaker<NoopSink> {
    pub fn new(config: Config) -> Result<Speaker<NoopSink>, Error> {
        Speaker::with_capture(config, NoopSink)
    }
}

impl<S: CaptureSink> Speaker<S> {
    pub fn with_capture(config: Config, capture: S) -> Result<Speaker<S>, Error> {
        let socket = NetSocket::open(&config.interface.device)?;
        let local_mac = socket.local_mac();
        Ok(Speaker {
            config,
            socket,
            local_mac,
            adjacencies: AdjacencyMap::new(),
            lsdb: Lsdb::new(),
            capture,
            last_tick: Instant::now(),
        })
    }

    // Runs the event loop until an external interrupt requests clean
    // shutdown. Never returns `Err` except for I/O failures the loop
    // cannot recover from (e.g. the socket itself going away).
    pub fn run(&mut self) -> Result<(), Error> {
        install_shutdown_handler();

        while !SHUTDOWN.load(Ordering::Relaxed) {
            let timeout = self.next_timeout();
            match self.socket.recv(timeout) {
                Ok(Some((src_mac, frame))) => {
                    if let Err(error) = self.dispatch(src_mac, frame) {
                        Error::PduInputError(src_mac, error).log();
                    }
                }
                Ok(None) => {}
                Err(error) => Error::from(error).log(),
            }
            self.tick();
        }
        Ok(())
    }

    // Decodes one received frame and routes it to the adjacency FSM or
    // the LSDB, sending back whatever reply those produce.
    fn dispatch(&mut self, src_mac: MacAddr, frame: Bytes) -> Result<(), PduInputError> {
        let mut buf = frame.clone();
        FrameHeader::decode(&mut buf)?;
        let pdu = Pdu::decode(buf)?;
        Debug::PduRx(&src_mac, &pdu).log();
        self.capture.record(pdu.pdu_type(), &frame);

        let reply = match &pdu {
            Pdu::Hello(hello) => {
                adjacency::on_hello(
                    &mut self.adjacencies,
                    &self.config,
                    self.local_mac,
                    src_mac,
                    hello,
                )
                .ok();
                None
            }
            Pdu::Lsp(lsp) => lsdb::on_lsp(
                &mut self.lsdb,
                &self.adjacencies,
                &self.config,
                self.local_mac,
                src_mac,
                lsp,
            )
            .ok()
            .flatten(),
            Pdu::Snp(snp) if matches!(snp.pdu_type, PduType::CsnpL1 | PduType::CsnpL2) => {
                lsdb::on_csnp(&mut self.lsdb, &self.config, self.local_mac, src_mac, snp)
                    .ok()
                    .flatten()
            }
            // Inbound PSNPs request LSPs this speaker never originates;
            // nothing to answer with.
            Pdu::Snp(_) => None,
        };

        if let Some(reply) = reply {
            self.send(src_mac, &reply);
        }
        Ok(())
    }

    // Debits elapsed wall-time from every adjacency and flushes
    // whichever cached Hellos come due as a result.
    fn tick(&mut self) {
        let elapsed = self.last_tick.elapsed().as_secs().min(u16::MAX as u64) as u16;
        self.last_tick = Instant::now();
        let due = adjacency::tick(&mut self.adjacencies, elapsed, self.config.retx_thresh);
        for (dst_mac, frame) in due {
            self.send(dst_mac, &frame);
        }
    }

    fn send(&mut self, dst_mac: MacAddr, frame: &Bytes) {
        self.capture.record(frame_pdu_type(frame), frame);
        if let Err(error) = self.socket.send(dst_mac, frame) {
            Error::from(error).log();
        } else {
            Debug::PduTx(&dst_mac, frame_pdu_type(frame)).log();
        }
    }

    // Timeout until the next adjacency's retransmit comes due, floored
    // at zero; falls back to the configured holdtimer when no
    // adjacency exists yet.
    fn next_timeout(&self) -> Duration {
        let seconds = self
            .adjacencies
            .values()
            .map(|adj| adj.rtx_at.saturating_sub(self.config.retx_thresh))
            .min()
            .unwrap_or_else(|| self.config.holdtime.saturating_sub(self.config.retx_thresh));
        Duration::from_secs(seconds as u64)
    }
}

// The PDU type of a cached/built frame, read back off its own common
// header rather than threaded separately through every call site.
fn frame_pdu_type(frame: &Bytes) -> PduType {
    let mut buf = frame.clone();
    if FrameHeader::decode(&mut buf).is_err() {
        return PduType::HelloLanL1;
    }
    match Pdu::decode(buf) {
        Ok(pdu) => pdu.pdu_type(),
        Err(_) => PduType::HelloLanL1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adjacency::{Adjacency, AdjacencyState};
    use crate::packet::SystemId;

    fn config() -> Config {
        use crate::config::{Config, RawAdjacencyType, RawConfig, RawInterfaceConfig};
        let raw = RawConfig {
            area_address: "49.0001".to_string(),
            system_id: "0200.0000.0001".to_string(),
            lan_id: "0200.0000.0001.01".to_string(),
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
        Config::from_raw(raw).unwrap()
    }

    // `next_timeout` is exercised directly against a bare `AdjacencyMap`
    // plus `Config`, sidestepping the need for a live socket.
    fn timeout_for(adjacencies: &AdjacencyMap, config: &Config) -> Duration {
        let seconds = adjacencies
            .values()
            .map(|adj| adj.rtx_at.saturating_sub(config.retx_thresh))
            .min()
            .unwrap_or_else(|| config.holdtime.saturating_sub(config.retx_thresh));
        Duration::from_secs(seconds as u64)
    }

    #[test]
    fn timeout_falls_back_to_holdtimer_when_idle() {
        let config = config();
        let adjacencies = AdjacencyMap::new();
        assert_eq!(
            timeout_for(&adjacencies, &config),
            Duration::from_secs((config.holdtime - config.retx_thresh) as u64)
        );
    }

    #[test]
    fn timeout_tracks_soonest_adjacency() {
        let config = config();
        let mut adjacencies = AdjacencyMap::new();
        let mac = MacAddr([0x02, 0, 0, 0, 0, 0x01]);
        adjacencies.insert(
            (mac, crate::packet::AdjacencyType::L1),
            Adjacency {
                mac,
                adjacency_type: crate::packet::AdjacencyType::L1,
                system_id: SystemId::from([2, 0, 0, 0, 0, 1]),
                state: AdjacencyState::Up,
                holdtime: 10,
                holdtimer: 10,
                rtx_at: 4,
                cached_hello: Bytes::new(),
            },
        );
        assert_eq!(timeout_for(&adjacencies, &config), Duration::from_secs(1));
    }
}
