//
// SPDX-License-Identifier: MIT
//
// Frame (MAC + LLC) and IS-IS common header plus per-PDU-type fixed
// headers for Hello (LAN & point-to-point), LSP, CSNP and PSNP.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use num_traits::{FromPrimitive, ToPrimitive};

use crate::packet::checksum::{self, ChecksumOutcome};
use crate::packet::consts::{self, LspBits, PduType};
use crate::packet::error::{DecodeError, DecodeResult, EncodeResult};
use crate::packet::tlv::{self, Tlv};
use crate::packet::{LanId, LspId, SystemId};

// ===== frame header =====

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FrameHeader {
    pub dst_mac: [u8; 6],
    pub src_mac: [u8; 6],
    pub length: u16,
}

impl FrameHeader {
    pub const LEN: usize = 17;

    pub fn decode(buf: &mut Bytes) -> DecodeResult<FrameHeader> {
        if buf.remaining() < Self::LEN {
            return Err(DecodeError::ReadOutOfBounds);
        }
        let mut dst_mac = [0u8; 6];
        buf.copy_to_slice(&mut dst_mac);
        let mut src_mac = [0u8; 6];
        buf.copy_to_slice(&mut src_mac);
        let length = buf.get_u16();
        let dsap = buf.get_u8();
        let ssap = buf.get_u8();
        let ctrl = buf.get_u8();
        if (dsap, ssap, ctrl)
            != (consts::LLC_DSAP, consts::LLC_SSAP, consts::LLC_CTRL)
        {
            return Err(DecodeError::Llc);
        }
        Ok(FrameHeader {
            dst_mac,
            src_mac,
            length,
        })
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_slice(&self.dst_mac);
        buf.put_slice(&self.src_mac);
        buf.put_u16(self.length);
        buf.put_u8(consts::LLC_DSAP);
        buf.put_u8(consts::LLC_SSAP);
        buf.put_u8(consts::LLC_CTRL);
    }
}

// ===== common header =====

struct CommonHeader {
    hdr_len: u8,
    msg_type: PduType,
}

impl CommonHeader {
    const LEN: usize = 8;

    fn decode(buf: &mut Bytes) -> DecodeResult<CommonHeader> {
        if buf.remaining() < Self::LEN {
            return Err(DecodeError::ReadOutOfBounds);
        }
        let nlpid = buf.get_u8();
        if nlpid != consts::NLPID_ISIS {
            return Err(DecodeError::Llc);
        }
        let hdr_len = buf.get_u8();
        let _version_proto_id = buf.get_u8();
        let _reserved = buf.get_u8();
        let msg_type_raw = buf.get_u8();
        let _version = buf.get_u8();
        let _eco = buf.get_u8();
        let _user_eco = buf.get_u8();
        let msg_type = PduType::from_u8(msg_type_raw)
            .ok_or(DecodeError::UnknownPduType(msg_type_raw))?;
        Ok(CommonHeader { hdr_len, msg_type })
    }

    fn encode(buf: &mut BytesMut, msg_type: PduType, hdr_len: u8) {
        buf.put_u8(consts::NLPID_ISIS);
        buf.put_u8(hdr_len);
        buf.put_u8(consts::VERSION_PROTO_EXT);
        buf.put_u8(0);
        buf.put_u8(msg_type.to_u8().expect("PduType fits in a u8"));
        buf.put_u8(consts::VERSION);
        buf.put_u8(0);
        buf.put_u8(0);
    }
}

// ===== Hello =====

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HelloVariant {
    Lan { priority: u8, lan_id: LanId },
    PointToPoint { local_circuit_id: u8 },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Hello {
    pub pdu_type: PduType,
    pub circuit_type: u8,
    pub source_id: SystemId,
    pub holdtime: u16,
    pub variant: HelloVariant,
    pub tlvs: Vec<Tlv>,
}

impl Hello {
    // Total fixed-header length (common header + per-variant fields up
    // to the start of the TLV sequence).
    fn variant_header_len(variant: &HelloVariant) -> u8 {
        match variant {
            // common(8) + circuit(1) + src_id(6) + holdtime(2) +
            // pdu_len(2) + priority(1) + lan_id(7)
            HelloVariant::Lan { .. } => 27,
            // common(8) + circuit(1) + src_id(6) + holdtime(2) +
            // pdu_len(2) + local_circuit_id(1)
            HelloVariant::PointToPoint { .. } => 20,
        }
    }

    fn decode(
        pdu_type: PduType,
        hdr_len: u8,
        buf: &mut Bytes,
    ) -> DecodeResult<Hello> {
        if buf.remaining() < 11 {
            return Err(DecodeError::ReadOutOfBounds);
        }
        let circuit_type = buf.get_u8();
        let source_id = SystemId::decode(buf)?;
        let holdtime = buf.get_u16();
        let pdu_len = buf.get_u16();
        let variant = match pdu_type {
            PduType::HelloLanL1 | PduType::HelloLanL2 => {
                if buf.remaining() < 8 {
                    return Err(DecodeError::ReadOutOfBounds);
                }
                let priority = buf.get_u8() & 0x7F;
                let lan_id = LanId::decode(buf)?;
                HelloVariant::Lan { priority, lan_id }
            }
            PduType::HelloP2P => {
                if buf.remaining() < 1 {
                    return Err(DecodeError::ReadOutOfBounds);
                }
                let local_circuit_id = buf.get_u8();
                HelloVariant::PointToPoint { local_circuit_id }
            }
            _ => unreachable!("caller dispatches only Hello PDU types"),
        };
        let _ = hdr_len;
        let _ = pdu_len;
        let tlvs = tlv::decode_tlvs(buf);
        Ok(Hello {
            pdu_type,
            circuit_type,
            source_id,
            holdtime,
            variant,
            tlvs,
        })
    }

    pub fn encode(&self) -> EncodeResult<BytesMut> {
        let mut body = BytesMut::new();
        body.put_u8(self.circuit_type);
        self.source_id.encode(&mut body);
        body.put_u16(self.holdtime);
        // pdu_len is back-patched once the full length is known.
        let pdu_len_pos = body.len();
        body.put_u16(0);
        match self.variant {
            HelloVariant::Lan { priority, lan_id } => {
                body.put_u8(priority & 0x7F);
                lan_id.encode(&mut body);
            }
            HelloVariant::PointToPoint { local_circuit_id } => {
                body.put_u8(local_circuit_id);
            }
        }
        tlv::encode_tlvs(&self.tlvs, &mut body)?;

        let hdr_len = Self::variant_header_len(&self.variant);
        let mut pdu = BytesMut::new();
        CommonHeader::encode(&mut pdu, self.pdu_type, hdr_len);
        pdu.put_slice(&body);

        let pdu_len = pdu.len() as u16;
        pdu[CommonHeader::LEN + pdu_len_pos..CommonHeader::LEN + pdu_len_pos + 2]
            .copy_from_slice(&pdu_len.to_be_bytes());
        Ok(pdu)
    }
}

// ===== LSP =====

#[derive(Clone, Debug, PartialEq)]
pub struct Lsp {
    pub pdu_type: PduType,
    // The on-wire PDU length, i.e. how much of `raw` is real IS-IS
    // content as opposed to NIC/LLC padding trailing it. Bounds the
    // checksum-covered region; `raw.len()` alone cannot be used for
    // that since short LSPs are routinely padded out by the sender.
    pub pdu_len: u16,
    pub rem_lifetime: u16,
    pub lsp_id: LspId,
    pub seq_no: u32,
    pub checksum: u16,
    pub bits: LspBits,
    pub tlvs: Vec<Tlv>,
    // Raw PDU bytes starting right after the frame header (i.e. at the
    // common header's NLPID byte), kept around for checksum
    // verification which operates on the undecoded wire form.
    pub raw: Bytes,
}

impl Lsp {
    fn decode(
        pdu_type: PduType,
        buf: &mut Bytes,
        raw: Bytes,
    ) -> DecodeResult<Lsp> {
        if buf.remaining() < 19 {
            return Err(DecodeError::ReadOutOfBounds);
        }
        let pdu_len = buf.get_u16();
        let rem_lifetime = buf.get_u16();
        let lsp_id = LspId::decode(buf)?;
        let seq_no = buf.get_u32();
        let checksum = buf.get_u16();
        let bits = LspBits::from_bits_truncate(buf.get_u8());

        // Checksum verification runs over the undecoded wire form. The
        // covered region starts at offset 12 of the PDU payload (LSP
        // ID, right after Remaining Lifetime, which is excluded since
        // it counts down without invalidating the signature) with the
        // check field at offset 24, and ends at the decoded `pdu_len`
        // rather than `raw.len()` — `raw` may run past `pdu_len` into
        // NIC padding on short LSPs, which would otherwise poison the
        // Fletcher running sums.
        let outcome = checksum::verify(
            &raw,
            12,
            (pdu_len as usize).saturating_sub(12),
            checksum,
            24,
        );

        let tlvs = if outcome.is_valid() || outcome == ChecksumOutcome::NoChecksum
        {
            tlv::decode_tlvs(buf)
        } else {
            Vec::new()
        };

        Ok(Lsp {
            pdu_type,
            pdu_len,
            rem_lifetime,
            lsp_id,
            seq_no,
            checksum,
            bits,
            tlvs,
            raw,
        })
    }

    // Whether the checksum recorded on this LSP validates against its
    // raw wire bytes (see `ChecksumOutcome` for the distinguishable
    // failure modes; this collapses them to pass/fail for LSDB
    // supersession purposes).
    pub fn checksum_outcome(&self) -> ChecksumOutcome {
        checksum::verify(
            &self.raw,
            12,
            (self.pdu_len as usize).saturating_sub(12),
            self.checksum,
            24,
        )
    }
}

// ===== CSNP / PSNP =====

#[derive(Clone, Debug, PartialEq)]
pub struct Snp {
    pub pdu_type: PduType,
    pub source_id: LanId,
    // Present only for CSNP: the (start, end) LSP ID range summarized.
    pub summary_range: Option<(LspId, LspId)>,
    pub tlvs: Vec<Tlv>,
}

impl Snp {
    fn decode(pdu_type: PduType, buf: &mut Bytes) -> DecodeResult<Snp> {
        if buf.remaining() < 9 {
            return Err(DecodeError::ReadOutOfBounds);
        }
        let _pdu_len = buf.get_u16();
        let source_id = LanId::decode(buf)?;
        let summary_range = match pdu_type {
            PduType::CsnpL1 | PduType::CsnpL2 => {
                if buf.remaining() < 16 {
                    return Err(DecodeError::ReadOutOfBounds);
                }
                let start = LspId::decode(buf)?;
                let end = LspId::decode(buf)?;
                Some((start, end))
            }
            _ => None,
        };
        let tlvs = tlv::decode_tlvs(buf);
        Ok(Snp {
            pdu_type,
            source_id,
            summary_range,
            tlvs,
        })
    }

    pub fn encode(&self) -> EncodeResult<BytesMut> {
        let mut body = BytesMut::new();
        let pdu_len_pos = body.len();
        body.put_u16(0);
        self.source_id.encode(&mut body);
        if let Some((start, end)) = &self.summary_range {
            start.encode(&mut body);
            end.encode(&mut body);
        }
        tlv::encode_tlvs(&self.tlvs, &mut body)?;

        let hdr_len = match self.pdu_type {
            // common(8) + pdu_len(2) + source_id(7) + start(8) + end(8)
            PduType::CsnpL1 | PduType::CsnpL2 => 33,
            // common(8) + pdu_len(2) + source_id(7)
            _ => 17,
        };
        let mut pdu = BytesMut::new();
        CommonHeader::encode(&mut pdu, self.pdu_type, hdr_len);
        pdu.put_slice(&body);

        let pdu_len = pdu.len() as u16;
        pdu[CommonHeader::LEN + pdu_len_pos..CommonHeader::LEN + pdu_len_pos + 2]
            .copy_from_slice(&pdu_len.to_be_bytes());
        Ok(pdu)
    }
}

// ===== Pdu =====

#[derive(Clone, Debug, PartialEq)]
pub enum Pdu {
    Hello(Hello),
    Lsp(Lsp),
    Snp(Snp),
}

impl Pdu {
    pub fn pdu_type(&self) -> PduType {
        match self {
            Pdu::Hello(hello) => hello.pdu_type,
            Pdu::Lsp(lsp) => lsp.pdu_type,
            Pdu::Snp(snp) => snp.pdu_type,
        }
    }

    // Decodes the IS-IS payload that follows the frame header (i.e.
    // the common header onward). `raw` must start at the same offset
    // and is retained on `Lsp` for checksum verification.
    pub fn decode(mut raw: Bytes) -> DecodeResult<Pdu> {
        let payload = raw.clone();
        let common = CommonHeader::decode(&mut raw)?;
        let pdu = match common.msg_type {
            PduType::HelloLanL1 | PduType::HelloLanL2 | PduType::HelloP2P => {
                Pdu::Hello(Hello::decode(
                    common.msg_type,
                    common.hdr_len,
                    &mut raw,
                )?)
            }
            PduType::LspL1 | PduType::LspL2 => {
                Pdu::Lsp(Lsp::decode(common.msg_type, &mut raw, payload)?)
            }
            PduType::CsnpL1
            | PduType::CsnpL2
            | PduType::PsnpL1
            | PduType::PsnpL2 => {
                Pdu::Snp(Snp::decode(common.msg_type, &mut raw)?)
            }
        };
        Ok(pdu)
    }

    pub fn encode(&self) -> EncodeResult<BytesMut> {
        match self {
            Pdu::Hello(hello) => hello.encode(),
            Pdu::Snp(snp) => snp.encode(),
            Pdu::Lsp(_) => {
                // This speaker never originates LSPs of its own
                // (out of scope); only decoding is required.
                unimplemented!(
                    "LSP origination is out of scope for this speaker"
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_hello_lan() -> Hello {
        Hello {
            pdu_type: PduType::HelloLanL1,
            circuit_type: 0b11,
            source_id: SystemId::from([0x02, 0, 0, 0, 0, 1]),
            holdtime: 30,
            variant: HelloVariant::Lan {
                priority: 0,
                lan_id: LanId::from((SystemId::from([0x02, 0, 0, 0, 0, 1]), 1)),
            },
            tlvs: vec![Tlv::IihIisNeighbor(vec![[0x02, 0, 0, 0, 0, 1]])],
        }
    }

    #[test]
    fn hello_lan_round_trips() {
        let hello = sample_hello_lan();
        let encoded = hello.encode().unwrap().freeze();
        let decoded = Pdu::decode(encoded).unwrap();
        match decoded {
            Pdu::Hello(decoded) => assert_eq!(decoded, hello),
            _ => panic!("expected Hello"),
        }
    }

    #[test]
    fn psnp_round_trips() {
        let snp = Snp {
            pdu_type: PduType::PsnpL2,
            source_id: LanId::from((SystemId::from([1, 2, 3, 4, 5, 6]), 0)),
            summary_range: None,
            tlvs: vec![Tlv::LspEntries(vec![tlv::LspEntry {
                lifetime: 1200,
                lsp_id: LspId::from([1, 2, 3, 4, 5, 6, 0, 0]),
                seq_no: 7,
                checksum: 0xABCD,
            }])],
        };
        let encoded = snp.encode().unwrap().freeze();
        let decoded = Pdu::decode(encoded).unwrap();
        match decoded {
            Pdu::Snp(decoded) => assert_eq!(decoded, snp),
            _ => panic!("expected Snp"),
        }
    }

    #[test]
    fn frame_header_rejects_wrong_llc() {
        let mut buf = BytesMut::new();
        buf.put_slice(&[0u8; 12]);
        buf.put_u16(100);
        buf.put_u8(0xAA);
        buf.put_u8(0xFE);
        buf.put_u8(0x03);
        let mut bytes = buf.freeze();
        assert!(matches!(
            FrameHeader::decode(&mut bytes),
            Err(DecodeError::Llc)
        ));
    }
}
