//! NAS PDU trace dumps

use log::{log_enabled, trace, Level};

use crate::primitive::UeId;

const DUMP_LINE_LEN: usize = 16;

/// Hex dump of a NAS PDU at trace level
pub fn nas_log_dump(label: &str, ue_id: UeId, data: &[u8]) {
    if !log_enabled!(Level::Trace) {
        return;
    }

    trace!("[ue_id={}] {} ({} bytes)", ue_id, label, data.len());
    for (i, line) in data.chunks(DUMP_LINE_LEN).enumerate() {
        trace!("  {:04x}: {}", i * DUMP_LINE_LEN, hex::encode(line));
    }
}
