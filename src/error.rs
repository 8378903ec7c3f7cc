//
// SPDX-License-Identifier: MIT
//

use tracing::{error, warn};

use crate::network::MacAddr;
use crate::packet::consts::PduType;
use crate::packet::error::DecodeError;

// Crate-level errors: everything that can go wrong at the loop/dispatch
// level, as opposed to `packet::error`'s pure codec-level errors.
#[derive(Debug)]
pub enum Error {
    IoError(IoError),
    ConfigError(ConfigError),
    PduInputError(MacAddr, PduInputError),
}

// I/O errors from the raw layer-2 socket.
#[derive(Debug)]
pub enum IoError {
    SocketError(std::io::Error),
    BindError(std::io::Error),
    RecvError(std::io::Error),
    RecvMissingSourceAddr,
    SendError(std::io::Error),
}

// Errors surfaced while decoding and dispatching a received frame.
// Distinct from `packet::error::TlvDecodeError`, which never escapes
// the TLV loop.
#[derive(Debug)]
pub enum PduInputError {
    DecodeError(DecodeError),
    UnexpectedPduType(PduType),
}

// Configuration validation errors. Fail construction fast; never
// surfaced once the instance is running.
#[derive(Debug)]
pub enum ConfigError {
    NoIpAddr,
    InvalidIpAddr(String),
    Malformed(String),
}

// ===== impl Error =====

impl Error {
    pub fn log(&self) {
        match self {
            Error::IoError(error) => error.log(),
            Error::ConfigError(error) => error.log(),
            Error::PduInputError(source, error) => {
                warn!(%source, "{error}");
            }
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::IoError(error) => error.fmt(f),
            Error::ConfigError(error) => error.fmt(f),
            Error::PduInputError(..) => write!(f, "failed to decode packet"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(error) => Some(error),
            Error::ConfigError(error) => Some(error),
            _ => None,
        }
    }
}

impl From<IoError> for Error {
    fn from(error: IoError) -> Error {
        Error::IoError(error)
    }
}

impl From<ConfigError> for Error {
    fn from(error: ConfigError) -> Error {
        Error::ConfigError(error)
    }
}

// ===== impl IoError =====

impl IoError {
    pub fn log(&self) {
        match self {
            IoError::SocketError(error) | IoError::BindError(error) => {
                error!(error = %with_source(error), "{self}");
            }
            IoError::RecvError(error) | IoError::SendError(error) => {
                warn!(error = %with_source(error), "{self}");
            }
            IoError::RecvMissingSourceAddr => {
                warn!("{self}");
            }
        }
    }
}

impl std::fmt::Display for IoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IoError::SocketError(..) => write!(f, "failed to create raw socket"),
            IoError::BindError(..) => write!(f, "failed to bind raw socket"),
            IoError::RecvError(..) => write!(f, "failed to receive packet"),
            IoError::RecvMissingSourceAddr => {
                write!(f, "failed to retrieve source address from received packet")
            }
            IoError::SendError(..) => write!(f, "failed to send packet"),
        }
    }
}

impl std::error::Error for IoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IoError::SocketError(error)
            | IoError::BindError(error)
            | IoError::RecvError(error)
            | IoError::SendError(error) => Some(error),
            IoError::RecvMissingSourceAddr => None,
        }
    }
}

// ===== impl PduInputError =====

impl std::fmt::Display for PduInputError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PduInputError::DecodeError(error) => error.fmt(f),
            PduInputError::UnexpectedPduType(pdu_type) => {
                write!(f, "unexpected PDU type: {pdu_type:?}")
            }
        }
    }
}

impl From<DecodeError> for PduInputError {
    fn from(error: DecodeError) -> PduInputError {
        PduInputError::DecodeError(error)
    }
}

// ===== impl ConfigError =====

impl ConfigError {
    fn log(&self) {
        error!("{self}");
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NoIpAddr => {
                write!(f, "no usable IP address configured on the interface")
            }
            ConfigError::InvalidIpAddr(text) => {
                write!(f, "invalid IP address: {text}")
            }
            ConfigError::Malformed(reason) => {
                write!(f, "malformed configuration: {reason}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ===== helper functions =====

fn with_source<E: std::error::Error>(error: E) -> String {
    if let Some(source) = error.source() {
        format!("{error} ({})", with_source(source))
    } else {
        error.to_string()
    }
}
