//
// SPDX-License-Identifier: MIT
//
// ISO/IEC 8473 Fletcher-style checksum used to validate LSPs. The
// algorithm (including its block size and position-compensation
// trick) intentionally mirrors the original reference implementation
// rather than a textbook Fletcher-16, since on-wire LSPs must verify
// against whatever algorithm produced them in the field.

const MAX_BLOCK_LEN: usize = 5803;

// Outcome of a checksum verification attempt.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ChecksumOutcome {
    NoChecksum,
    DataMissing,
    Incorrect,
    Ok,
}

impl ChecksumOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, ChecksumOutcome::Ok)
    }
}

impl std::fmt::Display for ChecksumOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChecksumOutcome::NoChecksum => write!(f, "no checksum"),
            ChecksumOutcome::DataMissing => write!(f, "data missing"),
            ChecksumOutcome::Incorrect => write!(f, "incorrect"),
            ChecksumOutcome::Ok => write!(f, "ok"),
        }
    }
}

// Verifies `checksum` against the region `data[offset..offset+length]`,
// with the two checksum octets themselves located at `offset_check`
// (absolute, within `data`).
pub fn verify(
    data: &[u8],
    offset: usize,
    length: usize,
    checksum: u16,
    offset_check: usize,
) -> ChecksumOutcome {
    if checksum == 0 {
        return ChecksumOutcome::NoChecksum;
    }

    let available_len = data.len().saturating_sub(offset);
    let Some(offset_check) = offset_check.checked_sub(offset) else {
        return ChecksumOutcome::DataMissing;
    };
    if available_len < length || offset_check + 2 > length {
        return ChecksumOutcome::DataMissing;
    }

    let init_len = length as i64;
    let buf = &data[offset..];
    let mut block = offset_check / MAX_BLOCK_LEN;

    let mut p = 0usize;
    let mut c0: i64 = 0;
    let mut c1: i64 = 0;
    let mut length = length;
    let mut discard = false;

    while length != 0 {
        let mut seglen = length;
        if block == 0 {
            seglen = offset_check % MAX_BLOCK_LEN;
            discard = true;
        } else if seglen > MAX_BLOCK_LEN {
            seglen = MAX_BLOCK_LEN;
        }
        block = block.wrapping_sub(1);

        for _ in 0..seglen {
            c0 += buf[p] as i64;
            c1 += c0;
            p += 1;
        }

        if discard {
            p += 2;
            c1 += 2 * c0;
            length -= 2;
            discard = false;
        }

        c0 %= 255;
        c1 %= 255;

        length -= seglen;
    }

    let factor = (init_len - offset_check as i64) * c0;
    let mut x = factor - c0 - c1;
    let mut y = c1 - factor;

    if x < 0 {
        x -= 1;
    }
    if y > 0 {
        y += 1;
    }

    x = x.rem_euclid(255);
    y = y.rem_euclid(255);

    if x == 0 {
        x = 0xFF;
    }
    if y == 0 {
        y = 0x01;
    }

    let result = ((x << 8) | (y & 0xFF)) as u16;
    if result != checksum {
        ChecksumOutcome::Incorrect
    } else {
        ChecksumOutcome::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_checksum_is_not_verified() {
        let data = [0u8; 16];
        assert_eq!(
            verify(&data, 0, 10, 0, 4),
            ChecksumOutcome::NoChecksum
        );
    }

    #[test]
    fn short_buffer_reports_data_missing() {
        let data = [0u8; 4];
        assert_eq!(
            verify(&data, 0, 10, 0x1234, 4),
            ChecksumOutcome::DataMissing
        );
    }

    #[test]
    fn checksum_roundtrip_single_byte_payload() {
        // Build a tiny buffer where bytes [0..2] are the checksum field
        // itself (zeroed for computation), verify that recomputing and
        // writing the resulting checksum back makes verification pass.
        let mut data = vec![0x01, 0x00, 0x00, 0x05];
        let computed = compute_for_test(&data, 0, data.len(), 0);
        data[2] = (computed >> 8) as u8;
        data[3] = (computed & 0xFF) as u8;
        let outcome = verify(&data, 0, data.len(), computed, 2);
        assert_eq!(outcome, ChecksumOutcome::Ok);
    }

    // Test-only helper computing the checksum value that `verify` would
    // accept, by running the same algorithm with the check bytes
    // treated as absent (mirrors how an encoder would derive the value
    // to place on the wire).
    fn compute_for_test(
        data: &[u8],
        offset: usize,
        length: usize,
        offset_check: usize,
    ) -> u16 {
        // Any nonzero placeholder triggers verification; try candidate
        // checksums until `verify` reports something other than a
        // mismatch is impossible without re-deriving x/y directly, so
        // instead run the core loop once with a zeroed check field and
        // derive x/y exactly as `verify` does.
        let available_len = data.len().saturating_sub(offset);
        let offset_check = offset_check - offset;
        assert!(available_len >= length && offset_check + 2 <= length);

        let init_len = length as i64;
        let buf = &data[offset..];
        let mut block = offset_check / MAX_BLOCK_LEN;
        let mut p = 0usize;
        let mut c0: i64 = 0;
        let mut c1: i64 = 0;
        let mut length = length;
        let mut discard = false;

        while length != 0 {
            let mut seglen = length;
            if block == 0 {
                seglen = offset_check % MAX_BLOCK_LEN;
                discard = true;
            } else if seglen > MAX_BLOCK_LEN {
                seglen = MAX_BLOCK_LEN;
            }
            block = block.wrapping_sub(1);

            for _ in 0..seglen {
                c0 += buf[p] as i64;
                c1 += c0;
                p += 1;
            }

            if discard {
                p += 2;
                c1 += 2 * c0;
                length -= 2;
                discard = false;
            }

            c0 %= 255;
            c1 %= 255;
            length -= seglen;
        }

        let factor = (init_len - offset_check as i64) * c0;
        let mut x = factor - c0 - c1;
        let mut y = c1 - factor;
        if x < 0 {
            x -= 1;
        }
        if y > 0 {
            y += 1;
        }
        x = x.rem_euclid(255);
        y = y.rem_euclid(255);
        if x == 0 {
            x = 0xFF;
        }
        if y == 0 {
            y = 0x01;
        }
        ((x << 8) | (y & 0xFF)) as u16
    }
}
