//! Best-effort detection of executable program metadata.
//!
//! The real decision of whether a transaction is executable belongs to the
//! external executor, which fully parses the embedded program envelope. The
//! indexer only needs a cheap classifier when deciding whether an execution
//! failure should cascade to descendants: if the raw bytes still look like a
//! code transaction, downstream genuinely depended on executing it.

/// The envelope marker for program metadata: an unspendable output script
/// beginning `OP_FALSE OP_RETURN` followed by a 3-byte push of the protocol
/// tag.
const ENVELOPE_MARKER: &[u8] = &[0x00, 0x6a, 0x03, b'j', b'i', b'g'];

/// Whether the raw transaction bytes appear to carry an executable program
/// envelope. False positives are tolerable — they only widen a failure
/// cascade — so this scans for the marker rather than fully parsing outputs.
pub fn appears_executable(bytes: &[u8]) -> bool {
    bytes
        .windows(ENVELOPE_MARKER.len())
        .any(|w| w == ENVELOPE_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_marker_anywhere() {
        let mut bytes = vec![0xde, 0xad];
        bytes.extend_from_slice(ENVELOPE_MARKER);
        bytes.extend_from_slice(&[0xbe, 0xef]);
        assert!(appears_executable(&bytes));
    }

    #[test]
    fn plain_payment_is_not_executable() {
        assert!(!appears_executable(&[0x01, 0x00, 0x6a, 0x02, b'j', b'i']));
        assert!(!appears_executable(&[]));
    }
}
