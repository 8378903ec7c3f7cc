//
// SPDX-License-Identifier: MIT
//
// Capture sink: the external MRT-format collaborator's attach point.
// This crate only ever emits `(pdu_type, bytes)` records; the file
// format behind the sink is out of scope.

use bytes::Bytes;

use crate::packet::consts::PduType;

pub trait CaptureSink {
    fn record(&mut self, pdu_type: PduType, bytes: &Bytes);
}

// Used when no capture output was configured.
#[derive(Debug, Default)]
pub struct NoopSink;

impl CaptureSink for NoopSink {
    fn record(&mut self, _pdu_type: PduType, _bytes: &Bytes) {}
}
