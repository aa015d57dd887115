//! Bit-oriented reader/writer pair wrapping a byte-oriented transport.
//!
//! MSB-first: bits are packed into a `u64` accumulator that drains in
//! 8-byte chunks, generalising the classic fixed-32-bit-window bitstream
//! design to an arbitrary accumulator width over a generic `Read`/`Write`
//! transport instead of a borrowed `&[u8]`.

mod reader;
mod writer;

pub use reader::InputBitStream;
pub use writer::OutputBitStream;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trips_arbitrary_bit_widths() {
        let mut buf = Vec::new();
        {
            let mut w = OutputBitStream::new(&mut buf);
            w.write_bits(0b101, 3).unwrap();
            w.write_bits(0xDEAD_BEEF, 32).unwrap();
            w.write_bit(1).unwrap();
            w.write_bits(0, 1).unwrap();
            w.write_bits(u64::MAX, 64).unwrap();
            w.close().unwrap();
        }
        let mut r = InputBitStream::new(Cursor::new(buf));
        assert_eq!(r.read_bits(3).unwrap(), 0b101);
        assert_eq!(r.read_bits(32).unwrap(), 0xDEAD_BEEF);
        assert_eq!(r.read_bit().unwrap(), 1);
        assert_eq!(r.read_bits(1).unwrap(), 0);
        assert_eq!(r.read_bits(64).unwrap(), u64::MAX);
    }

    #[test]
    fn tracks_written_and_read_bit_counts() {
        let mut buf = Vec::new();
        {
            let mut w = OutputBitStream::new(&mut buf);
            w.write_bits(7, 3).unwrap();
            w.write_bits(1, 1).unwrap();
            assert_eq!(w.written(), 4);
            w.close().unwrap();
        }
        let mut r = InputBitStream::new(Cursor::new(buf));
        r.read_bits(4).unwrap();
        assert_eq!(r.read(), 4);
    }

    #[test]
    fn partial_final_byte_is_zero_padded() {
        let mut buf = Vec::new();
        {
            let mut w = OutputBitStream::new(&mut buf);
            w.write_bits(0b11, 2).unwrap();
            w.close().unwrap();
        }
        assert_eq!(buf.len(), 1);
        assert_eq!(buf[0], 0b1100_0000);
    }

    #[test]
    fn write_after_close_fails() {
        let mut buf = Vec::new();
        let mut w = OutputBitStream::new(&mut buf);
        w.close().unwrap();
        assert!(w.write_bits(1, 1).is_err());
    }

    #[test]
    fn read_past_eof_fails() {
        let buf = vec![0xFFu8];
        let mut r = InputBitStream::new(Cursor::new(buf));
        r.read_bits(8).unwrap();
        assert!(r.read_bits(8).is_err());
    }
}
