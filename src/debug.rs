//
// SPDX-License-Identifier: MIT
//

use tracing::{debug, debug_span};

use crate::adjacency::{Adjacency, AdjacencyEvent, AdjacencyState};
use crate::network::MacAddr;
use crate::packet::checksum::ChecksumOutcome;
use crate::packet::consts::PduType;
use crate::packet::pdu::{Lsp, Pdu};

// IS-IS debug messages.
#[derive(Debug)]
pub enum Debug<'a> {
    // Network
    PduRx(&'a MacAddr, &'a Pdu),
    PduTx(&'a MacAddr, PduType),
    // Adjacencies
    AdjacencyCreate(&'a Adjacency),
    AdjacencyStateChange(&'a Adjacency, AdjacencyState, AdjacencyEvent),
    AdjacencyDelete(&'a Adjacency),
    // LSDB
    LspInstall(&'a Lsp),
    LspChecksumFailure(&'a Lsp, ChecksumOutcome),
}

impl Debug<'_> {
    pub fn log(&self) {
        match self {
            Debug::PduRx(src, pdu) => {
                debug_span!("network").in_scope(|| {
                    debug!(%src, ?pdu, "{self}");
                })
            }
            Debug::PduTx(dst, pdu_type) => {
                debug_span!("network").in_scope(|| {
                    debug!(%dst, ?pdu_type, "{self}");
                })
            }
            Debug::AdjacencyCreate(adj) => {
                debug_span!("adjacency", system_id = %adj.system_id.to_hex_dotted())
                    .in_scope(|| {
                        debug!("{self}");
                    })
            }
            Debug::AdjacencyStateChange(adj, new_state, event) => {
                debug_span!("adjacency", system_id = %adj.system_id.to_hex_dotted())
                    .in_scope(|| {
                        debug!(?new_state, ?event, "{self}");
                    })
            }
            Debug::AdjacencyDelete(adj) => {
                debug_span!("adjacency", system_id = %adj.system_id.to_hex_dotted())
                    .in_scope(|| {
                        debug!("{self}");
                    })
            }
            Debug::LspInstall(lsp) => {
                debug!(lsp_id = %lsp.lsp_id, seq_no = %lsp.seq_no, "{self}");
            }
            Debug::LspChecksumFailure(lsp, outcome) => {
                debug!(lsp_id = %lsp.lsp_id, %outcome, "{self}");
            }
        }
    }
}

impl std::fmt::Display for Debug<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Debug::PduRx(..) | Debug::PduTx(..) => write!(f, "PDU"),
            Debug::AdjacencyCreate(..) => write!(f, "adjacency created"),
            Debug::AdjacencyStateChange(..) => write!(f, "adjacency state change"),
            Debug::AdjacencyDelete(..) => write!(f, "adjacency deleted"),
            Debug::LspInstall(..) => write!(f, "installing LSP"),
            Debug::LspChecksumFailure(..) => write!(f, "LSP checksum verification failed"),
        }
    }
}
