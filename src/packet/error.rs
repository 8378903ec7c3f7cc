//
// SPDX-License-Identifier: MIT
//

use bytes::TryGetError;
use tracing::warn;

pub type DecodeResult<T> = Result<T, DecodeError>;
pub type TlvDecodeResult<T> = Result<T, TlvDecodeError>;
pub type EncodeResult<T> = Result<T, EncodeError>;

// IS-IS message decoding errors.
#[derive(Debug)]
pub enum DecodeError {
    ReadOutOfBounds,
    // Frame (LLC) header mismatch — maps to the original source's
    // `LLCExc`.
    Llc,
    UnknownPduType(u8),
    InvalidPduLength(u16),
}

// IS-IS TLV decoding errors. Individual TLV failures never abort the
// whole PDU: the offending TLV is logged and skipped.
#[derive(Debug)]
pub enum TlvDecodeError {
    ReadOutOfBounds,
    InvalidLength(u8),
}

// Errors that can occur while building an outbound PDU. Maps to the
// original source's `VLenFieldExc`.
#[derive(Debug)]
pub enum EncodeError {
    ValueTooLong { tlv_type: u8, len: usize },
    UnknownTlvType(u8),
}

// ===== impl DecodeError =====

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::ReadOutOfBounds => {
                write!(f, "attempt to read out of bounds")
            }
            DecodeError::Llc => {
                write!(f, "LLC header mismatch")
            }
            DecodeError::UnknownPduType(pdu_type) => {
                write!(f, "unknown PDU type: {pdu_type}")
            }
            DecodeError::InvalidPduLength(pdu_len) => {
                write!(f, "invalid PDU length: {pdu_len}")
            }
        }
    }
}

impl std::error::Error for DecodeError {}

impl From<TryGetError> for DecodeError {
    fn from(_error: TryGetError) -> DecodeError {
        DecodeError::ReadOutOfBounds
    }
}

// ===== impl TlvDecodeError =====

impl TlvDecodeError {
    pub fn log(&self) {
        warn!("{}", self);
    }
}

impl std::fmt::Display for TlvDecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TlvDecodeError::ReadOutOfBounds => {
                write!(f, "attempt to read out of bounds")
            }
            TlvDecodeError::InvalidLength(tlv_len) => {
                write!(f, "invalid length: {tlv_len}")
            }
        }
    }
}

impl std::error::Error for TlvDecodeError {}

impl From<TryGetError> for TlvDecodeError {
    fn from(_error: TryGetError) -> TlvDecodeError {
        TlvDecodeError::ReadOutOfBounds
    }
}

// ===== impl EncodeError =====

impl std::fmt::Display for EncodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EncodeError::ValueTooLong { tlv_type, len } => {
                write!(f, "TLV type {tlv_type} value too long: {len} bytes")
            }
            EncodeError::UnknownTlvType(tlv_type) => {
                write!(f, "attempt to encode unknown TLV type: {tlv_type}")
            }
        }
    }
}

impl std::error::Error for EncodeError {}
