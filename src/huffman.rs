use crate::bitstream::BitStream;
use crate::error::{ErrorContext, ErrorKind, NullContext, Res};

/// Largest symbol value a literal/length table may describe (§4.4).
pub(crate) const MAX_SYMBOL_VALUE: usize = 285;
/// Longest canonical code length this codec emits.
const MAX_CODE_LENGTH: u8 = 31;
/// Codes at or below this length get a direct lookup instead of the linear
/// length-slot scan.
const FAST_BITS: u32 = 8;

#[derive(Clone, Copy, Default)]
struct FastEntry {
    symbol: u16,
    length: u8,
}

/// One length at which at least one canonical code is assigned.
struct LengthSlot {
    length: u8,
    /// Exclusive upper bound of the left-aligned 32-bit code range covered
    /// by this length, i.e. `(last_code + 1) << (32 - length)`.
    base: u64,
    /// Exclusive end index of this length's symbols within `symbols`.
    offset: u32,
}

/// A canonical Huffman decoder built from `(symbol, code_length)` pairs.
///
/// Short codes (`length <= 8`) resolve through `fast_table` in one lookup;
/// longer codes fall back to a linear scan over `slots`, which holds one
/// entry per length that is actually used, in ascending order.
pub(crate) struct CanonicalHuffman {
    symbols: Vec<u16>,
    slots: Vec<LengthSlot>,
    fast_table: Box<[FastEntry; 1 << FAST_BITS]>,
}

impl CanonicalHuffman {
    /// Builds a decoder from `(symbol, length)` pairs. Symbols that share a
    /// length are assigned codes in the order their *last* occurrence was
    /// inserted: the caller's `build_pairs` helper (§4.4) accumulates runs
    /// head-of-list, so this just walks the input once per length.
    pub fn build(pairs: &[(u16, u8)]) -> Res<Self> {
        let mut by_length: Vec<Vec<u16>> = (0..=MAX_CODE_LENGTH).map(|_| Vec::new()).collect();
        for &(symbol, length) in pairs {
            if length == 0 || length > MAX_CODE_LENGTH {
                return NullContext.raise(
                    ErrorKind::InvalidTable,
                    format!("symbol {} has invalid code length {}", symbol, length),
                );
            }
            by_length[length as usize].insert(0, symbol);
        }

        let mut symbols = Vec::with_capacity(pairs.len());
        let mut slots = Vec::new();
        let mut code: u64 = 0;
        for length in 1..=MAX_CODE_LENGTH {
            let group = &by_length[length as usize];
            if !group.is_empty() {
                symbols.extend_from_slice(group);
                code += group.len() as u64;
                slots.push(LengthSlot {
                    length,
                    base: code << (32 - length as u32),
                    offset: symbols.len() as u32,
                });
            }
            code <<= 1;
        }

        let mut fast_table = Box::new([FastEntry::default(); 1 << FAST_BITS]);
        let mut first_code_at_offset = 0u32;
        for slot in &slots {
            if slot.length <= FAST_BITS as u8 {
                let count = slot.offset - first_code_at_offset;
                let threshold = (slot.base >> (32 - slot.length as u32)) as u32;
                let first_code = threshold - count;
                let step = 1u32 << (FAST_BITS as u8 - slot.length);
                for i in 0..count {
                    let code = first_code + i;
                    let prefix_base = (code << (FAST_BITS as u8 - slot.length)) as usize;
                    let symbol = symbols[(first_code_at_offset + i) as usize];
                    for p in prefix_base..prefix_base + step as usize {
                        fast_table[p] = FastEntry {
                            symbol,
                            length: slot.length,
                        };
                    }
                }
            }
            first_code_at_offset = slot.offset;
        }

        Ok(CanonicalHuffman {
            symbols,
            slots,
            fast_table,
        })
    }

    pub fn decode_symbol(&self, bits: &mut BitStream) -> Res<u16> {
        if self.slots.is_empty() {
            return NullContext
                .raise(ErrorKind::InvalidTable, "decoding from an empty Huffman table");
        }

        let prefix8 = bits.peek(FAST_BITS)? as usize;
        let fast = self.fast_table[prefix8];
        if fast.length != 0 {
            bits.drop(fast.length as u32)?;
            return Ok(fast.symbol);
        }

        let peek32 = bits.peek(32)? as u64;
        for slot in &self.slots {
            if slot.length as u32 <= FAST_BITS {
                continue;
            }
            if peek32 < slot.base {
                let shift = 32 - slot.length as u32;
                let threshold = slot.base >> shift;
                let code = peek32 >> shift;
                let idx = slot.offset as u64 - (threshold - code);
                bits.drop(slot.length as u32)?;
                return Ok(self.symbols[idx as usize]);
            }
        }
        NullContext.raise(
            ErrorKind::InvalidTable,
            format!("no canonical code matches prefix {:08x}", peek32),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_canonical(pairs: &[(u16, u8)]) -> Vec<(u16, u32, u8)> {
        // Mirrors `CanonicalHuffman::build`'s code assignment so tests can
        // construct a bitstream for a known symbol sequence.
        let mut by_length: Vec<Vec<u16>> = (0..=31u8).map(|_| Vec::new()).collect();
        for &(symbol, length) in pairs {
            by_length[length as usize].insert(0, symbol);
        }
        let mut code = 0u32;
        let mut out = Vec::new();
        for length in 1..=31u8 {
            for &symbol in &by_length[length as usize] {
                out.push((symbol, code, length));
                code += 1;
            }
            code <<= 1;
        }
        out
    }

    struct BitWriter {
        bits: Vec<bool>,
    }

    impl BitWriter {
        fn new() -> Self {
            BitWriter { bits: Vec::new() }
        }
        fn push(&mut self, value: u32, length: u8) {
            for i in (0..length).rev() {
                self.bits.push((value >> i) & 1 == 1);
            }
        }
        fn into_words(mut self) -> Vec<u8> {
            while self.bits.len() % 32 != 0 {
                self.bits.push(false);
            }
            let mut out = Vec::new();
            for chunk in self.bits.chunks(32) {
                let mut word = 0u32;
                for (i, b) in chunk.iter().enumerate() {
                    if *b {
                        word |= 1 << (31 - i);
                    }
                }
                out.extend_from_slice(&word.to_le_bytes());
            }
            out
        }
    }

    #[test_log::test]
    fn round_trips_a_small_alphabet() {
        let pairs = vec![(b'A' as u16, 1u8), (b'B' as u16, 2), (b'C' as u16, 2)];
        let codes = encode_canonical(&pairs);
        let huff = CanonicalHuffman::build(&pairs).unwrap();

        let sequence = [b'A' as u16, b'C' as u16, b'B' as u16, b'A' as u16];
        let mut writer = BitWriter::new();
        for &sym in &sequence {
            let (_, code, length) = codes.iter().find(|(s, _, _)| *s == sym).unwrap();
            writer.push(*code, *length);
        }
        let data = writer.into_words();
        let mut bits = BitStream::new(&data);
        for &expected in &sequence {
            assert_eq!(huff.decode_symbol(&mut bits).unwrap(), expected);
        }
    }

    #[test_log::test]
    fn round_trips_codes_longer_than_eight_bits() {
        // 9 symbols at length 9 forces the slow (>8 bit) path.
        let pairs: Vec<(u16, u8)> = (0..9u16).map(|s| (s, 9u8)).collect();
        let codes = encode_canonical(&pairs);
        let huff = CanonicalHuffman::build(&pairs).unwrap();
        let mut writer = BitWriter::new();
        for &(sym, code, length) in &codes {
            writer.push(code, length);
            let _ = sym;
        }
        let data = writer.into_words();
        let mut bits = BitStream::new(&data);
        for &(sym, _, _) in &codes {
            assert_eq!(huff.decode_symbol(&mut bits).unwrap(), sym);
        }
    }

    #[test_log::test]
    fn empty_table_is_an_error() {
        let huff = CanonicalHuffman::build(&[]).unwrap();
        let data = [0u8; 4];
        let mut bits = BitStream::new(&data);
        assert!(huff.decode_symbol(&mut bits).is_err());
    }
}
