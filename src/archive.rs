use std::io::{Read, Seek, SeekFrom};

use crate::error::{ErrorContext, ErrorKind, Res, WithContext};
use crate::inflate;

const MFT_MAGIC: [u8; 4] = [0x4D, 0x66, 0x74, 0x1A];
/// The MFT entry whose payload is the file_id/base_id lookup table, not a
/// regular file (§6.1). Entry 0 is reserved and never populated.
const MFT_ENTRY_INDEX_NUM: usize = 2;

#[derive(Debug, Clone)]
pub struct DatHeader {
    pub version: u8,
    pub identifier: [u8; 3],
    pub header_size: u32,
    pub unknown_1: u32,
    pub chunk_size: u32,
    pub crc: u32,
    pub unknown_2: u32,
    pub mft_offset: u64,
    pub mft_size: u32,
    pub flags: u32,
}

#[derive(Debug, Clone)]
pub struct MftHeader {
    pub identifier: [u8; 4],
    pub unknown: u64,
    pub num_entries: u32,
    pub unknown_2: u32,
    pub unknown_3: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct MftEntry {
    pub offset: u64,
    pub size: u32,
    pub compression_flag: u16,
    pub entry_flag: u16,
    pub counter: u32,
    pub crc: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct MftIndexEntry {
    pub file_id: u32,
    pub base_id: u32,
}

/// A parsed DAT container: header, MFT, and the file_id/base_id lookup it
/// carries at `MFT_ENTRY_INDEX_NUM` (§6.1).
pub struct DatArchive<R> {
    reader: R,
    pub header: DatHeader,
    pub mft_header: MftHeader,
    /// Indexed by MFT record number; entry 0 is reserved and always absent.
    entries: Vec<Option<MftEntry>>,
    index: Vec<MftIndexEntry>,
}

impl<R: Read + Seek> DatArchive<R> {
    pub fn open(reader: R) -> Res<Self> {
        Self::open_inner(reader).map_err(|e| {
            log::error!("failed to open DAT archive: {}", e);
            e
        })
    }

    fn open_inner(mut reader: R) -> Res<Self> {
        let header = read_dat_header(&mut reader)?;
        log::debug!("DAT header: {:?}", header);

        reader
            .seek(SeekFrom::Start(header.mft_offset))
            .at(&ArchiveContext)?;
        let mft_header = read_mft_header(&mut reader)?;

        let mut entries = Vec::with_capacity(mft_header.num_entries as usize);
        entries.push(None);
        for _ in 1..mft_header.num_entries {
            entries.push(Some(read_mft_entry(&mut reader)?));
        }

        let index_entry = match entries.get(MFT_ENTRY_INDEX_NUM).and_then(|e| *e) {
            Some(e) => e,
            None => {
                return ArchiveContext.raise(
                    ErrorKind::BadArchiveHeader,
                    format!(
                        "MFT has no record {} to hold the index table",
                        MFT_ENTRY_INDEX_NUM
                    ),
                )
            }
        };

        let index = read_index(&mut reader, &index_entry)?;

        Ok(DatArchive {
            reader,
            header,
            mft_header,
            entries,
            index,
        })
    }

    pub fn entry(&self, record: u32) -> Option<&MftEntry> {
        self.entries.get(record as usize).and_then(|e| e.as_ref())
    }

    pub fn index_entries(&self) -> &[MftIndexEntry] {
        &self.index
    }

    /// Looks up `id` against either `file_id` or `base_id` in the index
    /// (§6.1, §9: the two fields are matched interchangeably), then reads
    /// and, if flagged, decompresses the MFT record at the matched
    /// `base_id`.
    pub fn extract(&mut self, id: u32) -> Res<Vec<u8>> {
        self.extract_inner(id).map_err(|e| {
            log::error!("failed to extract id {}: {}", id, e);
            e
        })
    }

    fn extract_inner(&mut self, id: u32) -> Res<Vec<u8>> {
        let matched = self
            .index
            .iter()
            .find(|e| e.file_id == id || e.base_id == id);
        let matched = match matched {
            Some(m) => *m,
            None => {
                return ArchiveContext.raise(
                    ErrorKind::BadArchiveHeader,
                    format!("no MFT index entry for id {}", id),
                )
            }
        };

        let entry = match self.entry(matched.base_id) {
            Some(e) => *e,
            None => {
                return ArchiveContext.raise(
                    ErrorKind::BadArchiveHeader,
                    format!("MFT record {} referenced by index is absent", matched.base_id),
                )
            }
        };
        log::debug!("id {} resolved to MFT record {}: {:?}", id, matched.base_id, entry);

        self.reader
            .seek(SeekFrom::Start(entry.offset))
            .at(&ArchiveContext)?;
        let mut raw = vec![0u8; entry.size as usize];
        self.reader.read_exact(&mut raw).at(&ArchiveContext)?;

        if entry.compression_flag != 0 {
            inflate::decompress(&raw, None)
        } else {
            Ok(raw)
        }
    }
}

fn read_dat_header<R: Read>(r: &mut R) -> Res<DatHeader> {
    let version = read_u8(r)?;
    let identifier = read_bytes3(r)?;
    let header_size = read_u32(r)?;
    let unknown_1 = read_u32(r)?;
    let chunk_size = read_u32(r)?;
    let crc = read_u32(r)?;
    let unknown_2 = read_u32(r)?;
    let mft_offset = read_u64(r)?;
    let mft_size = read_u32(r)?;
    let flags = read_u32(r)?;
    Ok(DatHeader {
        version,
        identifier,
        header_size,
        unknown_1,
        chunk_size,
        crc,
        unknown_2,
        mft_offset,
        mft_size,
        flags,
    })
}

fn read_mft_header<R: Read>(r: &mut R) -> Res<MftHeader> {
    let identifier = read_bytes4(r)?;
    if identifier != MFT_MAGIC {
        return ArchiveContext.raise(
            ErrorKind::BadArchiveHeader,
            format!("MFT magic mismatch: {:02X?}", identifier),
        );
    }
    let unknown = read_u64(r)?;
    let num_entries = read_u32(r)?;
    let unknown_2 = read_u32(r)?;
    let unknown_3 = read_u32(r)?;
    Ok(MftHeader {
        identifier,
        unknown,
        num_entries,
        unknown_2,
        unknown_3,
    })
}

fn read_mft_entry<R: Read>(r: &mut R) -> Res<MftEntry> {
    Ok(MftEntry {
        offset: read_u64(r)?,
        size: read_u32(r)?,
        compression_flag: read_u16(r)?,
        entry_flag: read_u16(r)?,
        counter: read_u32(r)?,
        crc: read_u32(r)?,
    })
}

/// Reads the file_id/base_id lookup table at the MFT index entry's offset.
/// The entry's `size` is a byte count, not an entry count; each record is
/// two `u32`s.
fn read_index<R: Read + Seek>(r: &mut R, entry: &MftEntry) -> Res<Vec<MftIndexEntry>> {
    r.seek(SeekFrom::Start(entry.offset)).at(&ArchiveContext)?;
    let num_index_entries = entry.size as usize / 8;
    let mut out = Vec::with_capacity(num_index_entries);
    for _ in 0..num_index_entries {
        out.push(MftIndexEntry {
            file_id: read_u32(r)?,
            base_id: read_u32(r)?,
        });
    }
    Ok(out)
}

fn read_u8<R: Read>(r: &mut R) -> Res<u8> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf).at(&ArchiveContext)?;
    Ok(buf[0])
}

fn read_u16<R: Read>(r: &mut R) -> Res<u16> {
    let mut buf = [0u8; 2];
    r.read_exact(&mut buf).at(&ArchiveContext)?;
    Ok(u16::from_le_bytes(buf))
}

fn read_u32<R: Read>(r: &mut R) -> Res<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf).at(&ArchiveContext)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64<R: Read>(r: &mut R) -> Res<u64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf).at(&ArchiveContext)?;
    Ok(u64::from_le_bytes(buf))
}

fn read_bytes3<R: Read>(r: &mut R) -> Res<[u8; 3]> {
    let mut buf = [0u8; 3];
    r.read_exact(&mut buf).at(&ArchiveContext)?;
    Ok(buf)
}

fn read_bytes4<R: Read>(r: &mut R) -> Res<[u8; 4]> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf).at(&ArchiveContext)?;
    Ok(buf)
}

struct ArchiveContext;
impl ErrorContext for ArchiveContext {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn build_minimal_archive(num_files: u32, compress: bool, payload: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();

        // --- DAT header ---
        buf.push(1); // version
        buf.extend_from_slice(&[0, 0, 0]); // identifier
        buf.extend_from_slice(&0u32.to_le_bytes()); // header_size
        buf.extend_from_slice(&0u32.to_le_bytes()); // unknown_1
        buf.extend_from_slice(&0u32.to_le_bytes()); // chunk_size
        buf.extend_from_slice(&0u32.to_le_bytes()); // crc
        buf.extend_from_slice(&0u32.to_le_bytes()); // unknown_2
        let mft_offset_pos = buf.len();
        buf.extend_from_slice(&0u64.to_le_bytes()); // mft_offset, patched below
        buf.extend_from_slice(&0u32.to_le_bytes()); // mft_size
        buf.extend_from_slice(&0u32.to_le_bytes()); // flags

        let mft_offset = buf.len() as u64;
        buf.extend_from_slice(&MFT_MAGIC);
        buf.extend_from_slice(&0u64.to_le_bytes()); // unknown
        // num_entries covers records 0..=num_files+1 inclusive of the index slot.
        let num_entries = num_files + MFT_ENTRY_INDEX_NUM as u32 + 1;
        buf.extend_from_slice(&num_entries.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());

        // Reserve space for MFT records 1..num_entries; fill in after we know offsets.
        let records_pos = buf.len();
        for _ in 1..num_entries {
            buf.extend_from_slice(&[0u8; 8 + 4 + 2 + 2 + 4 + 4]);
        }

        // Payload for record MFT_ENTRY_INDEX_NUM+1 (the only data file).
        let data_record_offset = buf.len() as u64;
        buf.extend_from_slice(payload);

        // Index table occupies the index slot's own payload region.
        let index_offset = buf.len() as u64;
        buf.extend_from_slice(&1u32.to_le_bytes()); // file_id
        buf.extend_from_slice(&(MFT_ENTRY_INDEX_NUM as u32 + 1).to_le_bytes()); // base_id

        // Patch MFT records now that offsets are known.
        let mut cursor = records_pos;
        for record_index in 1..num_entries {
            let (offset, size, compression_flag) = if record_index as usize == MFT_ENTRY_INDEX_NUM
            {
                (index_offset, 8u32, 0u16)
            } else if record_index as usize == MFT_ENTRY_INDEX_NUM + 1 {
                (data_record_offset, payload.len() as u32, compress as u16)
            } else {
                (0, 0, 0)
            };
            buf[cursor..cursor + 8].copy_from_slice(&offset.to_le_bytes());
            buf[cursor + 8..cursor + 12].copy_from_slice(&size.to_le_bytes());
            buf[cursor + 12..cursor + 14].copy_from_slice(&compression_flag.to_le_bytes());
            cursor += 8 + 4 + 2 + 2 + 4 + 4;
        }

        buf[mft_offset_pos..mft_offset_pos + 8].copy_from_slice(&mft_offset.to_le_bytes());

        buf
    }

    #[test_log::test]
    fn opens_and_extracts_an_uncompressed_entry() {
        let payload = b"hello archive";
        let data = build_minimal_archive(1, false, payload);
        let mut archive = DatArchive::open(Cursor::new(data)).unwrap();
        let out = archive.extract(1).unwrap();
        assert_eq!(out, payload);
    }

    #[test_log::test]
    fn unknown_id_is_an_error() {
        let payload = b"hello archive";
        let data = build_minimal_archive(1, false, payload);
        let mut archive = DatArchive::open(Cursor::new(data)).unwrap();
        assert!(archive.extract(999).is_err());
    }

    #[test_log::test]
    fn rejects_bad_mft_magic() {
        let mut data = build_minimal_archive(1, false, b"x");
        // Corrupt the MFT identifier bytes.
        let header = read_dat_header(&mut Cursor::new(&data[..])).unwrap();
        let pos = header.mft_offset as usize;
        data[pos] = 0;
        assert!(DatArchive::open(Cursor::new(data)).is_err());
    }
}
