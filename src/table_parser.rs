use crate::bitstream::BitStream;
use crate::error::{ErrorContext, ErrorKind, NullContext, Res};
use crate::huffman::{CanonicalHuffman, MAX_SYMBOL_VALUE};
use crate::static_table::static_decoder;

/// Parses a run-length-encoded Huffman table description (§4.4) from the
/// bit stream, using the static decoder to decode the descriptor symbols,
/// and builds a fresh [`CanonicalHuffman`] from the collected pairs.
pub(crate) fn parse_table(bits: &mut BitStream) -> Res<CanonicalHuffman> {
    let ctx = NullContext;
    let alphabet_size = bits.take(16)? as usize;
    if alphabet_size > MAX_SYMBOL_VALUE {
        return ctx.raise(
            ErrorKind::InvalidTable,
            format!(
                "table alphabet size {} exceeds maximum of {}",
                alphabet_size, MAX_SYMBOL_VALUE
            ),
        );
    }

    let static_decoder = static_decoder();
    let mut pairs = Vec::new();
    let mut r: i32 = alphabet_size as i32 - 1;
    while r >= 0 {
        let descriptor = static_decoder.decode_symbol(bits)?;
        let code_length = (descriptor & 0x1F) as u8;
        let run = ((descriptor >> 5) + 1) as i32;
        if code_length == 0 {
            r -= run;
        } else {
            for _ in 0..run {
                if r < 0 {
                    break;
                }
                pairs.push((r as u16, code_length));
                r -= 1;
            }
        }
    }

    log::debug!(
        "parsed table: alphabet_size={}, {} codes assigned",
        alphabet_size, pairs.len()
    );
    CanonicalHuffman::build(&pairs)
}
