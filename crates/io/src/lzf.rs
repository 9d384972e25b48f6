//! LZF block decompression as used by `DATA binary_compressed`.
//!
//! A block is a sequence of control bytes. `ctrl < 32` starts a literal run of
//! `ctrl + 1` bytes. Otherwise the top three bits hold a back-reference length
//! (`7` means an extra length byte follows) and the low five bits plus the next
//! byte hold the distance minus one.

use crate::PcdError;

pub fn decompress(input: &[u8], expected_len: usize) -> Result<Vec<u8>, PcdError> {
    // a 3-byte back-reference expands to at most 264 bytes
    let mut out = Vec::with_capacity(expected_len.min(input.len().saturating_mul(88)));
    let mut ip = 0;

    while ip < input.len() {
        let ctrl = input[ip] as usize;
        ip += 1;

        if ctrl < 32 {
            let run = ctrl + 1;
            let literal = input
                .get(ip..ip + run)
                .ok_or_else(|| PcdError::Compressed("literal run past end of input".into()))?;
            out.extend_from_slice(literal);
            ip += run;
        } else {
            let mut len = ctrl >> 5;
            if len == 7 {
                len += *input
                    .get(ip)
                    .ok_or_else(|| PcdError::Compressed("missing length byte".into()))?
                    as usize;
                ip += 1;
            }
            let low = *input
                .get(ip)
                .ok_or_else(|| PcdError::Compressed("missing distance byte".into()))?
                as usize;
            ip += 1;

            let distance = ((ctrl & 0x1f) << 8) + low + 1;
            if distance > out.len() {
                return Err(PcdError::Compressed(format!(
                    "back-reference {} bytes behind a {}-byte output",
                    distance,
                    out.len()
                )));
            }
            // Source and destination may overlap; copy byte by byte.
            let start = out.len() - distance;
            for k in 0..len + 2 {
                let b = out[start + k];
                out.push(b);
            }
        }

        if out.len() > expected_len {
            return Err(PcdError::Compressed(format!(
                "output exceeds declared size {}",
                expected_len
            )));
        }
    }

    if out.len() != expected_len {
        return Err(PcdError::Compressed(format!(
            "decompressed {} bytes, header declared {}",
            out.len(),
            expected_len
        )));
    }
    Ok(out)
}

/// Encodes `input` as literal runs only. Valid LZF, no compression.
#[cfg(test)]
pub(crate) fn encode_literal(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len() + input.len() / 32 + 1);
    for chunk in input.chunks(32) {
        out.push((chunk.len() - 1) as u8);
        out.extend_from_slice(chunk);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_then_backref() {
        let block = [2, b'a', b'b', b'c', 0b0010_0000, 2];
        assert_eq!(decompress(&block, 6).unwrap(), b"abcabc");
    }

    #[test]
    fn overlapping_backref_repeats_run() {
        // "a" then copy 8 bytes from distance 1
        let block = [0, b'a', 6 << 5, 0];
        assert_eq!(decompress(&block, 9).unwrap(), vec![b'a'; 9]);
    }

    #[test]
    fn long_backref_uses_extra_length_byte() {
        // len 7 + 3 = 10, +2 = 12 bytes from distance 2
        let block = [1, b'x', b'y', 7 << 5, 3, 1];
        let out = decompress(&block, 14).unwrap();
        assert_eq!(out, b"xyxyxyxyxyxyxy");
    }

    #[test]
    fn rejects_reference_before_start() {
        let block = [0, b'a', 1 << 5, 4];
        assert!(matches!(decompress(&block, 4), Err(PcdError::Compressed(_))));
    }

    #[test]
    fn rejects_truncated_literal() {
        assert!(decompress(&[4, 1, 2], 5).is_err());
    }

    #[test]
    fn rejects_size_mismatch() {
        assert!(decompress(&[1, 1, 2], 3).is_err());
    }

    #[test]
    fn literal_encoding_roundtrips() {
        let data: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        assert_eq!(decompress(&encode_literal(&data), data.len()).unwrap(), data);
    }
}
