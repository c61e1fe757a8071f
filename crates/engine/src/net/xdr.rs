//! XDR (RFC 1832) encoding of the fixed-width numbers that make up the wire
//! format. Everything narrower than 32 bits still occupies a full 4-byte unit;
//! 64-bit integers and doubles occupy 8 bytes. All values are big-endian.

pub const XDR_UNIT: usize = 4;
pub const XDR_UNIT2: usize = 8;

/// A value with a fixed XDR representation.
pub trait Xdr: Sized + Copy {
    type Encoded: AsRef<[u8]>;

    fn encode(self) -> Self::Encoded;
    fn decode(bytes: Self::Encoded) -> Self;
}

impl Xdr for u8 {
    type Encoded = [u8; XDR_UNIT];

    fn encode(self) -> Self::Encoded {
        (self as u32).to_be_bytes()
    }

    fn decode(bytes: Self::Encoded) -> Self {
        u32::from_be_bytes(bytes) as u8
    }
}

impl Xdr for u16 {
    type Encoded = [u8; XDR_UNIT];

    fn encode(self) -> Self::Encoded {
        (self as u32).to_be_bytes()
    }

    fn decode(bytes: Self::Encoded) -> Self {
        u32::from_be_bytes(bytes) as u16
    }
}

impl Xdr for u32 {
    type Encoded = [u8; XDR_UNIT];

    fn encode(self) -> Self::Encoded {
        self.to_be_bytes()
    }

    fn decode(bytes: Self::Encoded) -> Self {
        u32::from_be_bytes(bytes)
    }
}

impl Xdr for i32 {
    type Encoded = [u8; XDR_UNIT];

    fn encode(self) -> Self::Encoded {
        self.to_be_bytes()
    }

    fn decode(bytes: Self::Encoded) -> Self {
        i32::from_be_bytes(bytes)
    }
}

impl Xdr for f32 {
    type Encoded = [u8; XDR_UNIT];

    fn encode(self) -> Self::Encoded {
        self.to_bits().to_be_bytes()
    }

    fn decode(bytes: Self::Encoded) -> Self {
        f32::from_bits(u32::from_be_bytes(bytes))
    }
}

impl Xdr for u64 {
    type Encoded = [u8; XDR_UNIT2];

    fn encode(self) -> Self::Encoded {
        self.to_be_bytes()
    }

    fn decode(bytes: Self::Encoded) -> Self {
        u64::from_be_bytes(bytes)
    }
}

impl Xdr for f64 {
    type Encoded = [u8; XDR_UNIT2];

    fn encode(self) -> Self::Encoded {
        self.to_bits().to_be_bytes()
    }

    fn decode(bytes: Self::Encoded) -> Self {
        f64::from_bits(u64::from_be_bytes(bytes))
    }
}

// Slice accessors. Callers are responsible for bounds; the packet validator
// guarantees the header and position payload are present before any of these
// run on inbound data.

#[inline]
pub fn read_u32(buf: &[u8], offset: usize) -> u32 {
    let mut unit = [0u8; XDR_UNIT];
    unit.copy_from_slice(&buf[offset..offset + XDR_UNIT]);
    u32::decode(unit)
}

#[inline]
pub fn write_u32(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + XDR_UNIT].copy_from_slice(&value.encode());
}

#[inline]
pub fn read_f32(buf: &[u8], offset: usize) -> f32 {
    let mut unit = [0u8; XDR_UNIT];
    unit.copy_from_slice(&buf[offset..offset + XDR_UNIT]);
    f32::decode(unit)
}

#[inline]
pub fn write_f32(buf: &mut [u8], offset: usize, value: f32) {
    buf[offset..offset + XDR_UNIT].copy_from_slice(&value.encode());
}

#[inline]
pub fn read_f64(buf: &[u8], offset: usize) -> f64 {
    let mut unit = [0u8; XDR_UNIT2];
    unit.copy_from_slice(&buf[offset..offset + XDR_UNIT2]);
    f64::decode(unit)
}

#[inline]
pub fn write_f64(buf: &mut [u8], offset: usize, value: f64) {
    buf[offset..offset + XDR_UNIT2].copy_from_slice(&value.encode());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_narrow_values_use_full_unit() {
        assert_eq!(0xABu8.encode(), [0, 0, 0, 0xAB]);
        assert_eq!(0x1234u16.encode(), [0, 0, 0x12, 0x34]);
        assert_eq!(u8::decode([0, 0, 0, 0xAB]), 0xAB);
    }

    #[test]
    fn test_big_endian_layout() {
        assert_eq!(0x46474653u32.encode(), *b"FGFS");
        assert_eq!(1.0f64.encode(), [0x3F, 0xF0, 0, 0, 0, 0, 0, 0]);
        assert_eq!((-1i32).encode(), [0xFF; 4]);
    }

    #[test]
    fn test_round_trip_edge_values() {
        for v in [0u32, 1, 0x0001_0001, u32::MAX] {
            assert_eq!(u32::decode(v.encode()), v);
        }
        for v in [0u64, 1, u64::MAX] {
            assert_eq!(u64::decode(v.encode()), v);
        }
        for v in [0u16, 1, u16::MAX] {
            assert_eq!(u16::decode(v.encode()), v);
        }
        for v in [0.0f32, -0.0, 1.5, f32::MIN_POSITIVE, f32::MAX, f32::INFINITY] {
            assert_eq!(f32::decode(v.encode()).to_bits(), v.to_bits());
        }
        for v in [0.0f64, -6378137.0, 4_001_234.125, f64::MAX, f64::NEG_INFINITY] {
            assert_eq!(f64::decode(v.encode()).to_bits(), v.to_bits());
        }
        assert!(f64::decode(f64::NAN.encode()).is_nan());
    }

    #[test]
    fn test_slice_accessors() {
        let mut buf = [0u8; 16];
        write_u32(&mut buf, 0, 7);
        write_f32(&mut buf, 4, -2.5);
        write_f64(&mut buf, 8, 1234.5);
        assert_eq!(read_u32(&buf, 0), 7);
        assert_eq!(read_f32(&buf, 4), -2.5);
        assert_eq!(read_f64(&buf, 8), 1234.5);
    }
}
