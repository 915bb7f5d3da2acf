use crate::error::{ErrorContext, ErrorKind, Res};

/// Every 16384th 32-bit word (0-based index congruent to `0x3FFF mod 0x4000`)
/// is padding inserted by the container format and must be skipped.
const PADDING_STRIDE: usize = 0x4000;
const PADDING_RESIDUE: usize = PADDING_STRIDE - 1;

/// Presents a compressed byte range as a stream of bits consumed MSB-first
/// within each 32-bit little-endian word.
///
/// Internally a 64-bit window holds the next bits to examine: the top 32
/// bits are the "head" returned by `peek`, the bottom 32 are the "tail"
/// that gets slid into place as the head drains.
pub(crate) struct BitStream<'a> {
    data: &'a [u8],
    /// Index (in 32-bit words) of the next word to pull from `data`.
    word_cursor: usize,
    /// Left-aligned window; valid bits occupy the top `bits_available` bits.
    bits: u64,
    bits_available: u32,
}

impl<'a> BitStream<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        BitStream {
            data,
            word_cursor: 0,
            bits: 0,
            bits_available: 0,
        }
    }

    /// Returns the top `n` bits of the window without consuming them.
    pub fn peek(&mut self, n: u32) -> Res<u32> {
        self.need(n)?;
        Ok((self.bits >> (64 - n)) as u32)
    }

    /// Consumes `n` bits, refilling the tail if the window runs low.
    pub fn drop(&mut self, n: u32) -> Res<()> {
        self.need(n)?;
        if n > self.bits_available {
            return self.raise(
                ErrorKind::TruncatedInput,
                format!(
                    "dropping {} bits but only {} available",
                    n, self.bits_available
                ),
            );
        }
        self.bits <<= n;
        self.bits_available -= n;
        if self.bits_available < 32 {
            self.pull_word()?;
        }
        Ok(())
    }

    /// Convenience for `peek(n)` followed by `drop(n)`.
    pub fn take(&mut self, n: u32) -> Res<u32> {
        let v = self.peek(n)?;
        self.drop(n)?;
        Ok(v)
    }

    fn need(&mut self, n: u32) -> Res<()> {
        if self.bits_available < n {
            self.pull_word()?;
        }
        Ok(())
    }

    fn pull_word(&mut self) -> Res<()> {
        let idx = self.next_word_index();
        let word = self.read_word_at(idx)?;
        let shift = 32 - self.bits_available;
        self.bits |= (word as u64) << shift;
        self.bits_available += 32;
        Ok(())
    }

    /// Advances `word_cursor` past the current position, applying the
    /// block-boundary padding-skip rule, and returns the word index to read.
    fn next_word_index(&mut self) -> usize {
        let mut idx = self.word_cursor;
        if idx % PADDING_STRIDE == PADDING_RESIDUE {
            log::debug!("skipping padding word at index {}", idx);
            idx += 1;
        }
        self.word_cursor = idx + 1;
        idx
    }

    fn read_word_at(&self, idx: usize) -> Res<u32> {
        let start = idx * 4;
        match self.data.get(start..start + 4) {
            Some(bytes) => Ok(u32::from_le_bytes(bytes.try_into().expect("len 4"))),
            None => self.raise(
                ErrorKind::TruncatedInput,
                format!("word {} (byte {}) past end of compressed input", idx, start),
            ),
        }
    }
}

impl ErrorContext for BitStream<'_> {
    fn describe(&self) -> Option<String> {
        Some(format!(
            "word_cursor={}, bits_available={}",
            self.word_cursor, self.bits_available
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(ws: &[u32]) -> Vec<u8> {
        ws.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    #[test_log::test]
    fn peek_is_idempotent() {
        let data = words(&[0x12345678]);
        let mut bs = BitStream::new(&data);
        let a = bs.peek(8).unwrap();
        let b = bs.peek(8).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, 0x12);
    }

    #[test_log::test]
    fn peek_then_drop_consumes_exactly_n_bits() {
        let data = words(&[0x12345678]);
        let mut bs = BitStream::new(&data);
        assert_eq!(bs.peek(4).unwrap(), 0x1);
        bs.drop(4).unwrap();
        assert_eq!(bs.peek(4).unwrap(), 0x2);
        bs.drop(4).unwrap();
        assert_eq!(bs.peek(8).unwrap(), 0x34);
    }

    #[test_log::test]
    fn crosses_word_boundary() {
        let data = words(&[0xAABBCCDD, 0x11223344]);
        let mut bs = BitStream::new(&data);
        bs.drop(28).unwrap();
        // 4 bits left of the first word (0xD) followed by the top of the second.
        assert_eq!(bs.peek(4).unwrap(), 0xD);
        bs.drop(4).unwrap();
        assert_eq!(bs.peek(8).unwrap(), 0x11);
    }

    #[test_log::test]
    fn skips_padding_word_at_stride() {
        let mut ws = vec![0u32; PADDING_STRIDE + 1];
        ws[PADDING_RESIDUE] = 0xDEADBEEF; // must be skipped
        ws[PADDING_STRIDE] = 0xCAFEBABE; // read in its place
        let data = words(&ws);
        let mut bs = BitStream::new(&data);
        for _ in 0..PADDING_RESIDUE {
            bs.drop(32).unwrap();
        }
        assert_eq!(bs.peek(32).unwrap(), 0xCAFEBABE);
    }

    #[test_log::test]
    fn truncated_input_is_an_error() {
        let data = words(&[0x1]);
        let mut bs = BitStream::new(&data);
        bs.drop(32).unwrap();
        assert!(bs.peek(1).is_err());
    }
}
