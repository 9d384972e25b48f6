use crate::FieldType;

/// A value type that can be read from and written to a field slot.
///
/// Slots are little-endian. Reading converts between numeric kinds, so an
/// `f32` view works over a `U2` intensity and a `u32` view over an `F4`
/// label; integer targets truncate and saturate like `as` casts.
pub trait Scalar: Copy + PartialEq + std::fmt::Debug {
    /// Decodes one element; `bytes.len()` is the field size.
    fn decode(bytes: &[u8], ty: FieldType) -> Self;

    /// Encodes one element into `out`; `out.len()` is the field size.
    fn encode(self, out: &mut [u8], ty: FieldType);
}

#[inline]
fn read_unsigned(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf[..bytes.len()].copy_from_slice(bytes);
    u64::from_le_bytes(buf)
}

#[inline]
fn read_signed(bytes: &[u8]) -> i64 {
    let shift = 64 - 8 * bytes.len() as u32;
    ((read_unsigned(bytes) << shift) as i64) >> shift
}

#[inline]
fn read_float(bytes: &[u8]) -> f64 {
    match bytes.len() {
        4 => f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
        _ => {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(&bytes[..8]);
            f64::from_le_bytes(buf)
        }
    }
}

#[inline]
fn write_int(value: u64, out: &mut [u8]) {
    let len = out.len();
    out.copy_from_slice(&value.to_le_bytes()[..len]);
}

#[inline]
fn write_float(value: f64, out: &mut [u8]) {
    match out.len() {
        4 => out.copy_from_slice(&(value as f32).to_le_bytes()),
        _ => out.copy_from_slice(&value.to_le_bytes()),
    }
}

impl Scalar for f32 {
    #[inline]
    fn decode(bytes: &[u8], ty: FieldType) -> Self {
        match ty {
            // Direct path keeps NaN payloads bit-exact.
            FieldType::Float if bytes.len() == 4 => {
                f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
            }
            FieldType::Float => read_float(bytes) as f32,
            FieldType::Unsigned => read_unsigned(bytes) as f32,
            FieldType::Signed => read_signed(bytes) as f32,
        }
    }

    #[inline]
    fn encode(self, out: &mut [u8], ty: FieldType) {
        match ty {
            FieldType::Float => write_float(self as f64, out),
            FieldType::Unsigned => write_int(self as u64, out),
            FieldType::Signed => write_int(self as i64 as u64, out),
        }
    }
}

impl Scalar for u32 {
    #[inline]
    fn decode(bytes: &[u8], ty: FieldType) -> Self {
        match ty {
            FieldType::Float => read_float(bytes) as u32,
            FieldType::Unsigned => read_unsigned(bytes) as u32,
            FieldType::Signed => read_signed(bytes) as u32,
        }
    }

    #[inline]
    fn encode(self, out: &mut [u8], ty: FieldType) {
        match ty {
            FieldType::Float => write_float(self as f64, out),
            FieldType::Unsigned | FieldType::Signed => write_int(self as u64, out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_values_sign_extend() {
        let bytes = (-3i16).to_le_bytes();
        assert_eq!(f32::decode(&bytes, FieldType::Signed), -3.0);
        let bytes = (-1i8).to_le_bytes();
        assert_eq!(f32::decode(&bytes, FieldType::Signed), -1.0);
    }

    #[test]
    fn u32_roundtrips_through_every_integer_width() {
        for size in [1usize, 2, 4, 8] {
            let mut slot = vec![0u8; size];
            42u32.encode(&mut slot, FieldType::Unsigned);
            assert_eq!(u32::decode(&slot, FieldType::Unsigned), 42);
        }
    }

    #[test]
    fn f32_reads_double_fields() {
        let bytes = 1.25f64.to_le_bytes();
        assert_eq!(f32::decode(&bytes, FieldType::Float), 1.25);
        let mut slot = [0u8; 8];
        (-7.5f32).encode(&mut slot, FieldType::Float);
        assert_eq!(f64::from_le_bytes(slot), -7.5);
    }

    #[test]
    fn nan_payload_survives_f32_decode() {
        let bits = 0x7fc0_1234u32;
        let decoded = f32::decode(&bits.to_le_bytes(), FieldType::Float);
        assert_eq!(decoded.to_bits(), bits);
    }
}
