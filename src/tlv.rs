use core::num::NonZeroU32;

use alloc::vec::Vec;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VarNumError {
    Truncated,
    NonMinimalEncoding,
    InvalidValue,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DecodeError {
    BadType(VarNumError),
    BadLength { typ: NonZeroU32, err: VarNumError },
    TruncatedValue { typ: NonZeroU32, len: usize },
}

impl DecodeError {
    /// Whether the error could be resolved by receiving more bytes.
    /// Anything else means the byte stream has lost TLV framing.
    pub fn needs_more_bytes(&self) -> bool {
        matches!(
            self,
            DecodeError::BadType(VarNumError::Truncated)
                | DecodeError::BadLength {
                    err: VarNumError::Truncated,
                    ..
                }
                | DecodeError::TruncatedValue { .. }
        )
    }
}

pub trait Write {
    type Error;
    fn write(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;
}

impl Write for Vec<u8> {
    type Error = core::convert::Infallible;

    fn write(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        self.extend_from_slice(bytes);
        Ok(())
    }
}

pub trait Encode {
    fn encoded_len(&self) -> usize;
    fn encode<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), W::Error>;

    fn to_vec(&self) -> Vec<u8>
    where
        Self: Sized,
    {
        let mut buf = Vec::with_capacity(self.encoded_len());
        match self.encode(&mut buf) {
            Ok(()) => buf,
            Err(never) => match never {},
        }
    }
}

/// A borrowed view of one type-length-value element.
#[derive(Copy, Clone, Debug)]
pub struct Tlv<'a> {
    pub typ: NonZeroU32,
    pub val: &'a [u8],
}

impl<'a> Tlv<'a> {
    // Protocol evolution rule: an unrecognised critical type invalidates
    // the whole packet, a non-critical one is skipped.
    pub fn is_critical(&self) -> bool {
        let typ = self.typ.get();
        typ < 32 || typ & 1 == 1
    }

    /// Reads the value as an NDN non-negative integer (1, 2, 4 or 8
    /// big-endian bytes).
    pub fn val_as_u64(&self) -> Option<u64> {
        match self.val.len() {
            1 => Some(self.val[0] as u64),
            2 => Some(u16::from_be_bytes(self.val.try_into().ok()?) as u64),
            4 => Some(u32::from_be_bytes(self.val.try_into().ok()?) as u64),
            8 => Some(u64::from_be_bytes(self.val.try_into().ok()?)),
            _ => None,
        }
    }

    pub fn try_decode(bytes: &'a [u8]) -> Result<(Tlv<'a>, usize), DecodeError> {
        let mut cursor = 0;

        let typ: u32 = read_var_num(bytes, &mut cursor)
            .map_err(DecodeError::BadType)?
            .try_into()
            .map_err(|_| DecodeError::BadType(VarNumError::InvalidValue))?;
        let typ =
            NonZeroU32::new(typ).ok_or(DecodeError::BadType(VarNumError::InvalidValue))?;

        let len: usize = read_var_num(bytes, &mut cursor)
            .map_err(|err| DecodeError::BadLength { typ, err })?
            .try_into()
            .map_err(|_| DecodeError::BadLength {
                typ,
                err: VarNumError::InvalidValue,
            })?;

        if bytes.len() - cursor < len {
            return Err(DecodeError::TruncatedValue { typ, len });
        }

        let val = &bytes[cursor..(cursor + len)];
        Ok((Tlv { typ, val }, cursor + len))
    }
}

/// Iterates the consecutive TLV elements of `bytes`, stopping after the
/// first error.
pub fn iter_tlvs(bytes: &[u8]) -> TlvIter<'_> {
    TlvIter {
        bytes,
        offset: 0,
        failed: false,
    }
}

pub struct TlvIter<'a> {
    bytes: &'a [u8],
    offset: usize,
    failed: bool,
}

impl<'a> Iterator for TlvIter<'a> {
    type Item = Result<Tlv<'a>, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.bytes.len() {
            return None;
        }
        match Tlv::try_decode(&self.bytes[self.offset..]) {
            Ok((tlv, consumed)) => {
                self.offset += consumed;
                Some(Ok(tlv))
            }
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

fn read_var_num(bytes: &[u8], cursor: &mut usize) -> Result<u64, VarNumError> {
    let first = *bytes.get(*cursor).ok_or(VarNumError::Truncated)?;
    *cursor += 1;

    let extra = match first {
        0..=252 => return Ok(first as u64),
        253 => 2,
        254 => 4,
        255 => 8,
    };

    if bytes.len() - *cursor < extra {
        return Err(VarNumError::Truncated);
    }
    let mut val = 0u64;
    for b in &bytes[*cursor..(*cursor + extra)] {
        val = (val << 8) | (*b as u64);
    }
    *cursor += extra;

    let minimal = match extra {
        2 => val > 252,
        4 => val > 65535,
        _ => val > 4294967295,
    };
    if minimal {
        Ok(val)
    } else {
        Err(VarNumError::NonMinimalEncoding)
    }
}

// The variable-length number used for TLV types and lengths.
impl Encode for u64 {
    fn encoded_len(&self) -> usize {
        if *self <= 252 {
            1
        } else if *self <= 65535 {
            3
        } else if *self <= 4294967295 {
            5
        } else {
            9
        }
    }

    fn encode<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), W::Error> {
        if *self <= 252 {
            writer.write(&[*self as u8])
        } else if *self <= 65535 {
            writer.write(&[253])?;
            writer.write(&(*self as u16).to_be_bytes())
        } else if *self <= 4294967295 {
            writer.write(&[254])?;
            writer.write(&(*self as u32).to_be_bytes())
        } else {
            writer.write(&[255])?;
            writer.write(&self.to_be_bytes())
        }
    }
}

impl<'a> Encode for Tlv<'a> {
    fn encoded_len(&self) -> usize {
        let l = self.val.len();
        (self.typ.get() as u64).encoded_len() + (l as u64).encoded_len() + l
    }

    fn encode<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), W::Error> {
        (self.typ.get() as u64).encode(writer)?;
        (self.val.len() as u64).encode(writer)?;
        writer.write(self.val)
    }
}

/// Width of `value` as an NDN non-negative integer.
pub fn unsigned_val_len(value: u64) -> usize {
    if value <= 0xFF {
        1
    } else if value <= 0xFFFF {
        2
    } else if value <= 0xFFFF_FFFF {
        4
    } else {
        8
    }
}

pub fn encode_unsigned_val<W: Write + ?Sized>(value: u64, writer: &mut W) -> Result<(), W::Error> {
    match unsigned_val_len(value) {
        1 => writer.write(&[value as u8]),
        2 => writer.write(&(value as u16).to_be_bytes()),
        4 => writer.write(&(value as u32).to_be_bytes()),
        _ => writer.write(&value.to_be_bytes()),
    }
}

/// Total length of a TLV holding a non-negative integer value.
pub fn unsigned_tlv_len(typ: u32, value: u64) -> usize {
    let l = unsigned_val_len(value);
    (typ as u64).encoded_len() + (l as u64).encoded_len() + l
}

pub fn encode_unsigned_tlv<W: Write + ?Sized>(
    typ: u32,
    value: u64,
    writer: &mut W,
) -> Result<(), W::Error> {
    (typ as u64).encode(writer)?;
    (unsigned_val_len(value) as u64).encode(writer)?;
    encode_unsigned_val(value, writer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_var_num_widths() {
        for v in 0u64..=252 {
            assert_eq!(v.encoded_len(), 1);
        }
        assert_eq!(253u64.encoded_len(), 3);
        assert_eq!(65535u64.encoded_len(), 3);
        assert_eq!(65536u64.encoded_len(), 5);
        assert_eq!(4294967295u64.encoded_len(), 5);
        assert_eq!(4294967296u64.encoded_len(), 9);
    }

    #[test]
    fn test_var_num_round_trip() {
        for v in [0u64, 1, 252, 253, 254, 65535, 65536, u32::MAX as u64, u64::MAX] {
            let buf = v.to_vec();
            assert_eq!(buf.len(), v.encoded_len());
            let mut cursor = 0;
            assert_eq!(read_var_num(&buf, &mut cursor), Ok(v));
            assert_eq!(cursor, buf.len());
        }
    }

    #[test]
    fn test_var_num_non_minimal() {
        // 252 must be a single byte, not the 253-prefixed form.
        let mut cursor = 0;
        assert_eq!(
            read_var_num(&[253, 0, 252], &mut cursor),
            Err(VarNumError::NonMinimalEncoding)
        );
        let mut cursor = 0;
        assert_eq!(
            read_var_num(&[254, 0, 0, 255, 255], &mut cursor),
            Err(VarNumError::NonMinimalEncoding)
        );
    }

    #[test]
    fn test_var_num_truncated() {
        let mut cursor = 0;
        assert_eq!(read_var_num(&[], &mut cursor), Err(VarNumError::Truncated));
        let mut cursor = 0;
        assert_eq!(
            read_var_num(&[253, 1], &mut cursor),
            Err(VarNumError::Truncated)
        );
    }

    #[test]
    fn test_tlv_decode() {
        let bytes = [6u8, 3, b'a', b'b', b'c', 8, 0];
        let (tlv, consumed) = Tlv::try_decode(&bytes).unwrap();
        assert_eq!(tlv.typ.get(), 6);
        assert_eq!(tlv.val, b"abc");
        assert_eq!(consumed, 5);

        let (tlv, consumed) = Tlv::try_decode(&bytes[5..]).unwrap();
        assert_eq!(tlv.typ.get(), 8);
        assert_eq!(tlv.val, b"");
        assert_eq!(consumed, 2);
    }

    #[test]
    fn test_tlv_decode_errors() {
        assert!(matches!(
            Tlv::try_decode(&[]),
            Err(DecodeError::BadType(VarNumError::Truncated))
        ));
        assert!(matches!(
            Tlv::try_decode(&[0, 1]),
            Err(DecodeError::BadType(VarNumError::InvalidValue))
        ));
        let err = Tlv::try_decode(&[6, 10, 1, 2]).unwrap_err();
        assert!(matches!(err, DecodeError::TruncatedValue { len: 10, .. }));
        assert!(err.needs_more_bytes());

        let err = Tlv::try_decode(&[6, 253, 0, 1, 0]).unwrap_err();
        assert!(!err.needs_more_bytes());
    }

    #[test]
    fn test_tlv_encode_round_trip() {
        let tlv = Tlv {
            typ: NonZeroU32::new(21).unwrap(),
            val: b"hello",
        };
        let buf = tlv.to_vec();
        assert_eq!(buf.len(), tlv.encoded_len());
        let (decoded, consumed) = Tlv::try_decode(&buf).unwrap();
        assert_eq!(consumed, buf.len());
        assert_eq!(decoded.typ.get(), 21);
        assert_eq!(decoded.val, b"hello");
    }

    #[test]
    fn test_is_critical() {
        let mk = |typ| Tlv {
            typ: NonZeroU32::new(typ).unwrap(),
            val: &[],
        };
        assert!(mk(7).is_critical());
        assert!(mk(31).is_critical());
        assert!(mk(33).is_critical()); // odd
        assert!(!mk(32).is_critical());
        assert!(!mk(100).is_critical());
    }

    #[test]
    fn test_unsigned_val() {
        for (v, len) in [(0u64, 1), (255, 1), (256, 2), (65535, 2), (65536, 4), (u32::MAX as u64, 4), (u32::MAX as u64 + 1, 8)] {
            assert_eq!(unsigned_val_len(v), len);
            let mut buf = Vec::new();
            let _ = encode_unsigned_val(v, &mut buf);
            assert_eq!(buf.len(), len);
            let tlv = Tlv {
                typ: NonZeroU32::new(12).unwrap(),
                val: &buf,
            };
            assert_eq!(tlv.val_as_u64(), Some(v));
        }
    }
}
