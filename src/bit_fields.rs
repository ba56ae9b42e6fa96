use crate::endian_aware_io::Integer;

fn mask(count: u32) -> u64 {
    if count >= 64 {
        u64::MAX
    } else {
        (1u64 << count) - 1
    }
}

/// Returns the `count` bits of `value` starting at bit `offset` (LSB first).
pub fn extract_bits(value: u64, count: u32, offset: u32) -> u64 {
    value.checked_shr(offset).unwrap_or(0) & mask(count)
}

/// Returns `bits` with the `count`-bit field at `offset` replaced by the low
/// `count` bits of `value`.
pub fn set_bits(bits: u64, value: u64, count: u32, offset: u32) -> u64 {
    let field = mask(count).checked_shl(offset).unwrap_or(0);
    let shifted = (value & mask(count)).checked_shl(offset).unwrap_or(0);
    (bits & !field) | (shifted & field)
}

/// Sequential view over the bit fields of one packed integer.
///
/// Fields are laid out from the least significant bit upwards in the order
/// they are declared.
pub struct BitFields {
    bits: u64,
    position: u32,
    reading: bool,
}

impl BitFields {
    pub fn reader(bits: u64) -> Self {
        BitFields {
            bits,
            position: 0,
            reading: true,
        }
    }

    pub fn writer() -> Self {
        BitFields {
            bits: 0,
            position: 0,
            reading: false,
        }
    }

    pub fn bits(&self) -> u64 {
        self.bits
    }

    pub fn position(&self) -> u32 {
        self.position
    }

    pub fn field<T: Integer>(&mut self, value: &mut T, count: u32) {
        if self.reading {
            *value = T::from_bits(extract_bits(self.bits, count, self.position));
        } else {
            self.bits = set_bits(self.bits, value.to_bits(), count, self.position);
        }
        self.position += count;
    }

    pub fn flag(&mut self, value: &mut bool) {
        let mut raw = *value as u8;
        self.field(&mut raw, 1);
        *value = raw != 0;
    }

    pub fn skip(&mut self, count: u32) {
        self.position += count;
    }
}
