//
// SPDX-License-Identifier: MIT
//
// Link-state database: a flat map of summary records keyed by the
// canonical LSP ID string. This speaker never originates LSPs or
// floods on its own initiative — it only tracks what it has heard and
// answers CSNP/LSP traffic with PSNPs.

use std::collections::HashMap;

use bytes::{Bytes, BytesMut};

use crate::adjacency::AdjacencyMap;
use crate::config::Config;
use crate::debug::Debug;
use crate::network::MacAddr;
use crate::packet::checksum::ChecksumOutcome;
use crate::packet::consts::PduType;
use crate::packet::error::EncodeResult;
use crate::packet::pdu::{FrameHeader, Lsp, Snp};
use crate::packet::tlv::{self, LspEntry, Tlv};
use crate::packet::{AdjacencyType, LanId};

// Summary fields tracked for one LSP ID. `placeholder` distinguishes a
// record created only because a CSNP mentioned an ID we haven't
// actually received, so a later real LSP with `seq_no == 0` is never
// mistaken for "still unseen".
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LspRecord {
    pub lifetime: u16,
    pub seq_no: u32,
    pub checksum: u16,
    pub placeholder: bool,
}

pub type Lsdb = HashMap<String, LspRecord>;

// Handles a received LSP: verifies its checksum (already computed by
// the decoder), records or refreshes its summary, and — if a
// point-to-point adjacency exists with the sender — builds a
// single-entry PSNP acknowledgement for it.
pub fn on_lsp(
    lsdb: &mut Lsdb,
    adjacencies: &AdjacencyMap,
    config: &Config,
    local_mac: MacAddr,
    src_mac: MacAddr,
    lsp: &Lsp,
) -> EncodeResult<Option<Bytes>> {
    let outcome = lsp.checksum_outcome();
    if !outcome.is_valid() && outcome != ChecksumOutcome::NoChecksum {
        Debug::LspChecksumFailure(lsp, outcome).log();
    }

    lsdb.insert(
        lsp.lsp_id.to_key_string(),
        LspRecord {
            lifetime: lsp.rem_lifetime,
            seq_no: lsp.seq_no,
            checksum: lsp.checksum,
            placeholder: false,
        },
    );
    Debug::LspInstall(lsp).log();

    let has_pp_adjacency = adjacencies
        .keys()
        .any(|(mac, t)| *mac == src_mac && *t == AdjacencyType::PointToPoint);
    if !has_pp_adjacency {
        return Ok(None);
    }

    let ack = LspEntry {
        lifetime: lsp.rem_lifetime,
        lsp_id: lsp.lsp_id,
        seq_no: lsp.seq_no,
        checksum: lsp.checksum,
    };
    let frame = build_psnp_frame(config, local_mac, src_mac, psnp_type_for(lsp.pdu_type), vec![ack])?;
    Ok(Some(frame))
}

// Handles a received CSNP: diffs its summarized entries against the
// local LSDB and requests anything missing or stale via a batched
// PSNP. Per RFC 1195, a PSNP *request* entry carries zeroed
// lifetime/seq_no/checksum — only the LSP ID identifies what's wanted;
// non-zero fields (as built by `on_lsp`) mean acknowledgement instead.
pub fn on_csnp(
    lsdb: &mut Lsdb,
    config: &Config,
    local_mac: MacAddr,
    src_mac: MacAddr,
    snp: &Snp,
) -> EncodeResult<Option<Bytes>> {
    let mut requested = Vec::new();
    for tlv in &snp.tlvs {
        let Tlv::LspEntries(entries) = tlv else {
            continue;
        };
        for entry in entries {
            let key = entry.lsp_id.to_key_string();
            let stale = match lsdb.get(&key) {
                None => true,
                Some(record) => entry.seq_no > record.seq_no || entry.checksum != record.checksum,
            };
            if !stale {
                continue;
            }
            lsdb.entry(key).or_insert(LspRecord {
                lifetime: 0,
                seq_no: 0,
                checksum: 0,
                placeholder: true,
            });
            requested.push(LspEntry {
                lifetime: 0,
                lsp_id: entry.lsp_id,
                seq_no: 0,
                checksum: 0,
            });
        }
    }

    if requested.is_empty() {
        return Ok(None);
    }

    let frame = build_psnp_frame(config, local_mac, src_mac, psnp_type_for(snp.pdu_type), requested)?;
    Ok(Some(frame))
}

fn psnp_type_for(pdu_type: PduType) -> PduType {
    match pdu_type {
        PduType::LspL1 | PduType::CsnpL1 | PduType::PsnpL1 => PduType::PsnpL1,
        _ => PduType::PsnpL2,
    }
}

// Builds a frame-ready PSNP. Unlike outbound Hellos, SNP frames carry
// their true length rather than being padded to the maximum.
fn build_psnp_frame(
    config: &Config,
    local_mac: MacAddr,
    dst_mac: MacAddr,
    pdu_type: PduType,
    entries: Vec<LspEntry>,
) -> EncodeResult<Bytes> {
    let mut tlvs = Vec::new();
    if let Some(password) = &config.cleartext_password {
        tlvs.push(Tlv::Authentication {
            auth_type: tlv::auth_type_cleartext(),
            value: Bytes::copy_from_slice(password.as_bytes()),
        });
    }
    // `encode_tlv` splits this into groups of 15 entries per TLV.
    tlvs.push(Tlv::LspEntries(entries));

    let snp = Snp {
        pdu_type,
        source_id: LanId::from((config.system_id, 0)),
        summary_range: None,
        tlvs,
    };
    let pdu_bytes = snp.encode()?;

    let mut frame = BytesMut::new();
    let header = FrameHeader {
        dst_mac: dst_mac.0,
        src_mac: local_mac.0,
        // The 802.3 length field covers the LLC control bytes plus the
        // PDU, not the MAC addresses that precede it (see
        // `adjacency::build_hello_frame`'s fixed 1500 = 3 + 1497).
        length: (3 + pdu_bytes.len()) as u16,
    };
    header.encode(&mut frame);
    frame.extend_from_slice(&pdu_bytes);
    Ok(frame.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::consts::PduType as PT;
    use crate::packet::pdu::Pdu;
    use crate::packet::LspId;

    fn config() -> Config {
        use crate::config::{Config, RawAdjacencyType, RawConfig, RawInterfaceConfig};
        let raw = RawConfig {
            area_address: "49.0001".to_string(),
            system_id: "0200.0000.0001".to_string(),
            lan_id: "0200.0000.0001.01".to_string(),
            interface: RawInterfaceConfig {
                device: "eth0".to_string(),
                adjacency_type: RawAdjacencyType::PointToPoint,
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

    fn sample_lsp(seq_no: u32) -> Lsp {
        let mut raw = BytesMut::new();
        raw.extend_from_slice(&[0u8; 12]); // common header placeholder bytes
        Lsp {
            pdu_type: PT::LspL2,
            pdu_len: 12,
            rem_lifetime: 1200,
            lsp_id: LspId::from([2, 0, 0, 0, 0, 2, 0, 0]),
            seq_no,
            checksum: 0,
            bits: Default::default(),
            tlvs: vec![],
            raw: raw.freeze(),
        }
    }

    #[test]
    fn lsp_receipt_acks_over_pp_adjacency() {
        let config = config();
        let mut lsdb = Lsdb::new();
        let mut adjacencies = AdjacencyMap::new();
        let local_mac = MacAddr([0x02, 0, 0, 0, 0, 0x10]);
        let src_mac = MacAddr([0x02, 0, 0, 0, 0, 0x02]);
        crate::adjacency::on_hello(
            &mut adjacencies,
            &config,
            local_mac,
            src_mac,
            &crate::packet::pdu::Hello {
                pdu_type: PT::HelloP2P,
                circuit_type: 0b11,
                source_id: crate::packet::SystemId::from([2, 0, 0, 0, 0, 2]),
                holdtime: 30,
                variant: crate::packet::pdu::HelloVariant::PointToPoint {
                    local_circuit_id: 1,
                },
                tlvs: vec![],
            },
        )
        .unwrap();

        let lsp = sample_lsp(7);
        let frame = on_lsp(&mut lsdb, &adjacencies, &config, local_mac, src_mac, &lsp)
            .unwrap()
            .expect("expected PSNP ack");

        assert_eq!(
            lsdb.get(&lsp.lsp_id.to_key_string()),
            Some(&LspRecord {
                lifetime: 1200,
                seq_no: 7,
                checksum: 0,
                placeholder: false,
            })
        );

        let pdu = Pdu::decode(frame.slice(FrameHeader::LEN..)).unwrap();
        match pdu {
            Pdu::Snp(snp) => {
                assert_eq!(snp.pdu_type, PT::PsnpL2);
                let entries: Vec<_> = snp
                    .tlvs
                    .iter()
                    .filter_map(|t| match t {
                        Tlv::LspEntries(e) => Some(e.clone()),
                        _ => None,
                    })
                    .flatten()
                    .collect();
                assert_eq!(entries, vec![LspEntry {
                    lifetime: 1200,
                    lsp_id: lsp.lsp_id,
                    seq_no: 7,
                    checksum: 0,
                }]);
            }
            _ => panic!("expected Snp"),
        }
    }

    #[test]
    fn csnp_gap_requests_stale_entry() {
        let config = config();
        let mut lsdb = Lsdb::new();
        let local_mac = MacAddr([0x02, 0, 0, 0, 0, 0x10]);
        let src_mac = MacAddr([0x02, 0, 0, 0, 0, 0x02]);
        let lsp_id = LspId::from([2, 0, 0, 0, 0, 2, 0, 0]);
        lsdb.insert(
            lsp_id.to_key_string(),
            LspRecord {
                lifetime: 1200,
                seq_no: 8,
                checksum: 0xABCD,
                placeholder: false,
            },
        );

        let snp = Snp {
            pdu_type: PT::CsnpL2,
            source_id: LanId::from((crate::packet::SystemId::from([2, 0, 0, 0, 0, 2]), 0)),
            summary_range: Some((lsp_id, lsp_id)),
            tlvs: vec![Tlv::LspEntries(vec![LspEntry {
                lifetime: 1200,
                lsp_id,
                seq_no: 10,
                checksum: 0x1234,
            }])],
        };

        let frame = on_csnp(&mut lsdb, &config, local_mac, src_mac, &snp)
            .unwrap()
            .expect("expected PSNP request");

        let pdu = Pdu::decode(frame.slice(FrameHeader::LEN..)).unwrap();
        match pdu {
            Pdu::Snp(snp) => {
                let entries: Vec<_> = snp
                    .tlvs
                    .iter()
                    .filter_map(|t| match t {
                        Tlv::LspEntries(e) => Some(e.clone()),
                        _ => None,
                    })
                    .flatten()
                    .collect();
                assert_eq!(
                    entries,
                    vec![LspEntry {
                        lifetime: 0,
                        lsp_id,
                        seq_no: 0,
                        checksum: 0,
                    }]
                );
            }
            _ => panic!("expected Snp"),
        }
    }

    #[test]
    fn csnp_up_to_date_requests_nothing() {
        let config = config();
        let mut lsdb = Lsdb::new();
        let local_mac = MacAddr([0x02, 0, 0, 0, 0, 0x10]);
        let src_mac = MacAddr([0x02, 0, 0, 0, 0, 0x02]);
        let lsp_id = LspId::from([2, 0, 0, 0, 0, 2, 0, 0]);
        lsdb.insert(
            lsp_id.to_key_string(),
            LspRecord {
                lifetime: 1200,
                seq_no: 10,
                checksum: 0x1234,
                placeholder: false,
            },
        );

        let snp = Snp {
            pdu_type: PT::CsnpL2,
            source_id: LanId::from((crate::packet::SystemId::from([2, 0, 0, 0, 0, 2]), 0)),
            summary_range: Some((lsp_id, lsp_id)),
            tlvs: vec![Tlv::LspEntries(vec![LspEntry {
                lifetime: 1200,
                lsp_id,
                seq_no: 10,
                checksum: 0x1234,
            }])],
        };

        assert!(on_csnp(&mut lsdb, &config, local_mac, src_mac, &snp)
            .unwrap()
            .is_none());
    }
}
