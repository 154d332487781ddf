//! Bit-addressed I/O over a growable byte buffer.
//!
//! The save file packs fields at arbitrary bit offsets, little-endian within
//! each byte: bit 0 of byte 0 is bit index 0, bit 7 of byte 0 is bit index 7,
//! bit 0 of byte 1 is bit index 8, and so on. Every higher layer (items,
//! modifiers) addresses this buffer by bit index rather than byte index.

/// A mutable, growable, bit-addressed buffer.
///
/// `BitCursor` owns its storage as a flat `Vec<bool>` (one entry per bit)
/// rather than packing eagerly into bytes, because item decoding inserts and
/// deletes bit runs in the middle of the buffer whenever a rarity block is
/// resized (see `ItemCodec::change_rarity`). Packing happens once, in
/// `to_bytes`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BitCursor {
    bits: Vec<bool>,
}

impl BitCursor {
    /// Build a cursor from raw bytes, expanding each byte into 8 bits, LSB-first.
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut bits = Vec::with_capacity(data.len() * 8);
        for byte in data {
            for i in 0..8 {
                bits.push((byte >> i) & 1 == 1);
            }
        }
        Self { bits }
    }

    /// Total number of bits currently stored.
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// True if the cursor holds no bits.
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Read `width` bits starting at `offset`, LSB-first, as an unsigned integer.
    ///
    /// A width of 0 always returns 0. Widths up to 64 are supported; wider
    /// reads (multi-character strings) must be done char-by-char by the
    /// caller, as the spec requires.
    pub fn read_uint(&self, offset: usize, width: usize) -> u64 {
        if width == 0 {
            return 0;
        }
        let mut value: u64 = 0;
        for i in 0..width {
            let bit = self.bits.get(offset + i).copied().unwrap_or(false);
            if bit {
                value |= 1 << i;
            }
        }
        value
    }

    /// Read a single bit as a `bool`.
    pub fn read_bit(&self, offset: usize) -> bool {
        self.bits.get(offset).copied().unwrap_or(false)
    }

    /// Overwrite `width` bits starting at `offset` with `value`, truncated to `width` bits.
    ///
    /// The buffer must already be at least `offset + width` bits long;
    /// overwriting never grows the buffer (growth only happens through
    /// `insert_bits`/`push_bits`).
    pub fn write_uint(&mut self, offset: usize, width: usize, value: u64) {
        if width == 0 {
            return;
        }
        for i in 0..width {
            let bit = (value >> i) & 1 == 1;
            self.bits[offset + i] = bit;
        }
    }

    /// Overwrite a single bit.
    pub fn write_bit(&mut self, offset: usize, value: bool) {
        self.bits[offset] = value;
    }

    /// Insert the given bits at `offset`, shifting everything from `offset` onward to the right.
    pub fn insert_bits(&mut self, offset: usize, bits: &[bool]) {
        for (i, bit) in bits.iter().enumerate() {
            self.bits.insert(offset + i, *bit);
        }
    }

    /// Insert `width` bits decoded LSB-first from `value` at `offset`.
    pub fn insert_uint(&mut self, offset: usize, width: usize, value: u64) {
        if width == 0 {
            return;
        }
        let bits: Vec<bool> = (0..width).map(|i| (value >> i) & 1 == 1).collect();
        self.insert_bits(offset, &bits);
    }

    /// Delete `width` bits starting at `offset`, shifting everything after left.
    pub fn delete_bits(&mut self, offset: usize, width: usize) {
        if width == 0 {
            return;
        }
        self.bits.drain(offset..offset + width);
    }

    /// Append bits to the end of the buffer.
    pub fn push_bits(&mut self, bits: &[bool]) {
        self.bits.extend_from_slice(bits);
    }

    /// Append `width` bits decoded LSB-first from `value`.
    pub fn push_uint(&mut self, width: usize, value: u64) {
        if width == 0 {
            return;
        }
        for i in 0..width {
            self.bits.push((value >> i) & 1 == 1);
        }
    }

    /// Append another cursor's bits wholesale.
    pub fn push_cursor(&mut self, other: &BitCursor) {
        self.bits.extend_from_slice(&other.bits);
    }

    /// Insert another cursor's bits at `offset`, shifting everything from
    /// `offset` onward to the right. Used to splice an encoded modifier's
    /// bits into an item's modifier list.
    pub fn insert_cursor_bits(&mut self, offset: usize, other: &BitCursor) {
        for (i, bit) in other.bits.iter().enumerate() {
            self.bits.insert(offset + i, *bit);
        }
    }

    /// Push `false` bits until the buffer reaches `target_len` bits. A
    /// no-op (never truncates) if already at or past `target_len`.
    pub fn pad_to(&mut self, target_len: usize) {
        while self.bits.len() < target_len {
            self.bits.push(false);
        }
    }

    /// Pad with `false` bits up to `target_index`, then push `value` as the
    /// bit at `target_index`. Convenience for building test fixtures field
    /// by field in declaration order.
    pub fn push_bit_pad_to(&mut self, target_index: usize, value: bool) {
        self.pad_to(target_index);
        self.bits.push(value);
    }

    /// Pack the bits into bytes, padding the final byte with zero bits.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.bits.len().div_ceil(8));
        for chunk in self.bits.chunks(8) {
            let mut byte = 0u8;
            for (i, bit) in chunk.iter().enumerate() {
                if *bit {
                    byte |= 1 << i;
                }
            }
            out.push(byte);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_bytes() {
        let data = [0x4A, 0x4D, 0xFF, 0x00];
        let cursor = BitCursor::from_bytes(&data);
        assert_eq!(cursor.len(), 32);
        assert_eq!(cursor.to_bytes(), data);
    }

    #[test]
    fn reads_lsb_first() {
        // 0b0000_0101 -> bit0=1, bit1=0, bit2=1
        let cursor = BitCursor::from_bytes(&[0b0000_0101]);
        assert_eq!(cursor.read_uint(0, 3), 0b101);
        assert_eq!(cursor.read_uint(0, 1), 1);
        assert_eq!(cursor.read_bit(1), false);
        assert_eq!(cursor.read_bit(2), true);
    }

    #[test]
    fn write_uint_overwrites_in_place() {
        let mut cursor = BitCursor::from_bytes(&[0x00]);
        cursor.write_uint(2, 3, 0b111);
        assert_eq!(cursor.to_bytes(), [0b0001_1100]);
    }

    #[test]
    fn zero_width_is_noop() {
        let mut cursor = BitCursor::from_bytes(&[0xAB]);
        assert_eq!(cursor.read_uint(3, 0), 0);
        cursor.write_uint(3, 0, 0xFF);
        assert_eq!(cursor.to_bytes(), [0xAB]);
    }

    #[test]
    fn insert_and_delete_shift_downstream_bits() {
        let mut cursor = BitCursor::from_bytes(&[0b1111_0000]);
        cursor.insert_bits(4, &[true, true]);
        assert_eq!(cursor.len(), 10);
        assert_eq!(cursor.read_uint(0, 4), 0);
        assert_eq!(cursor.read_uint(4, 2), 0b11);
        assert_eq!(cursor.read_uint(6, 4), 0b1111);

        cursor.delete_bits(4, 2);
        assert_eq!(cursor.len(), 8);
        assert_eq!(cursor.to_bytes(), [0b1111_0000]);
    }

    #[test]
    fn push_uint_appends_lsb_first() {
        let mut cursor = BitCursor::default();
        cursor.push_uint(9, 0x1FF);
        assert_eq!(cursor.len(), 9);
        assert_eq!(cursor.read_uint(0, 9), 0x1FF);
    }
}
