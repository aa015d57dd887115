//! Stream header: the 96-bit prefix written once, before any frame (§6).

use std::io::{Read, Write};

use crate::bitstream::{InputBitStream, OutputBitStream};
use crate::config::{
    BLOCK_SIZE_ALIGNMENT, MAGIC, MAX_BLOCK_SIZE, MIN_BLOCK_SIZE, STREAM_VERSION,
};
use crate::entropy::EntropyCodecId;
use crate::error::{KanziError, Result};

/// Parsed stream header. `block_size` and the transform/entropy ids are
/// exactly what the rest of the pipeline needs to reconstruct its per-block
/// state; `checksum` gates whether frames carry a trailing XXH32.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamHeader {
    pub version: u8,
    pub checksum: bool,
    pub entropy: EntropyCodecId,
    pub transform: u16,
    pub block_size: u32,
}

impl StreamHeader {
    pub fn new(checksum: bool, entropy: EntropyCodecId, transform: u16, block_size: u32) -> Result<Self> {
        if block_size < MIN_BLOCK_SIZE || block_size > MAX_BLOCK_SIZE {
            return Err(KanziError::BlockSize(format!(
                "block_size {block_size} out of range [{MIN_BLOCK_SIZE}..={MAX_BLOCK_SIZE}]"
            )));
        }
        if block_size % BLOCK_SIZE_ALIGNMENT != 0 {
            return Err(KanziError::BlockSize(format!(
                "block_size {block_size} is not a multiple of {BLOCK_SIZE_ALIGNMENT}"
            )));
        }
        Ok(StreamHeader {
            version: STREAM_VERSION,
            checksum,
            entropy,
            transform,
            block_size,
        })
    }

    pub fn write<W: Write>(&self, bs: &mut OutputBitStream<W>) -> Result<()> {
        bs.write_bits(MAGIC as u64, 32)?;
        bs.write_bits(self.version as u64, 7)?;
        bs.write_bits(self.checksum as u64, 1)?;
        bs.write_bits(self.entropy.id() as u64, 5)?;
        bs.write_bits(self.transform as u64, 16)?;
        bs.write_bits((self.block_size / BLOCK_SIZE_ALIGNMENT) as u64, 26)?;
        bs.write_bits(0, 9)?;
        Ok(())
    }

    pub fn read<R: Read>(bs: &mut InputBitStream<R>) -> Result<Self> {
        let magic = bs.read_bits(32)? as u32;
        if magic != MAGIC {
            return Err(KanziError::InvalidStream(format!(
                "bad magic: expected {MAGIC:#010x}, found {magic:#010x}"
            )));
        }
        let version = bs.read_bits(7)? as u8;
        if version != STREAM_VERSION {
            return Err(KanziError::StreamVersion(version));
        }
        let checksum = bs.read_bits(1)? != 0;
        let entropy = EntropyCodecId::from_id(bs.read_bits(5)? as u8)?;
        let transform = bs.read_bits(16)? as u16;
        let block_size = (bs.read_bits(26)? as u32) * BLOCK_SIZE_ALIGNMENT;
        let _reserved = bs.read_bits(9)?;
        if block_size < MIN_BLOCK_SIZE || block_size > MAX_BLOCK_SIZE {
            return Err(KanziError::BlockSize(format!(
                "decoded block_size {block_size} out of range"
            )));
        }
        Ok(StreamHeader {
            version,
            checksum,
            entropy,
            transform,
            block_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trips_header_fields() {
        let header = StreamHeader::new(true, EntropyCodecId::Fpaq, 0x1234, 1 << 16).unwrap();
        let mut buf = Vec::new();
        {
            let mut bs = OutputBitStream::new(&mut buf);
            header.write(&mut bs).unwrap();
            bs.close().unwrap();
        }
        assert_eq!(buf.len(), 12);
        let mut bs = InputBitStream::new(Cursor::new(buf));
        let decoded = StreamHeader::read(&mut bs).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut buf = vec![0u8; 12];
        buf[0] = 0xFF;
        let mut bs = InputBitStream::new(Cursor::new(buf));
        assert!(StreamHeader::read(&mut bs).is_err());
    }

    #[test]
    fn rejects_out_of_range_block_size() {
        assert!(StreamHeader::new(false, EntropyCodecId::None, 0, 15).is_err());
        assert!(StreamHeader::new(false, EntropyCodecId::None, 0, 17).is_err());
    }
}
