use crate::bitstream::BitStream;
use crate::block::decode_block;
use crate::error::Res;

/// Decompresses a raw inflate-codec stream (§4.6).
///
/// `max_output_size`, when set, caps the allocation regardless of what the
/// stream's declared size claims, so a corrupt or hostile header cannot
/// force an unbounded allocation.
pub fn decompress(data: &[u8], max_output_size: Option<usize>) -> Res<Vec<u8>> {
    let mut bits = BitStream::new(data);

    // Stream magic: identifies the codec but carries no decode-time meaning.
    bits.take(32)?;

    let declared_size = bits.take(32)? as usize;
    let declared_size = match max_output_size {
        Some(cap) => declared_size.min(cap),
        None => declared_size,
    };

    bits.take(4)?;
    let write_size_const_add = bits.take(4)? + 1;

    log::debug!(
        "declared_size={}, write_size_const_add={}",
        declared_size, write_size_const_add
    );

    let mut out = vec![0u8; declared_size];
    let mut out_pos = 0usize;

    while out_pos < declared_size {
        decode_block(
            &mut bits,
            &mut out,
            &mut out_pos,
            declared_size,
            write_size_const_add,
        )
        .map_err(|e| {
            log::error!("block decode failed at out_pos={}: {}", out_pos, e);
            e
        })?;
    }

    Ok(out)
}
