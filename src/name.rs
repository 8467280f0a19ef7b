use core::{cmp::Ordering, fmt, num::NonZeroU16};

use alloc::{boxed::Box, vec::Vec};

use crate::tlv::{iter_tlvs, Encode, Tlv, Write};

/// One owned name component: a type code and an opaque byte string.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct NameComponent {
    pub typ: NonZeroU16,
    pub bytes: Box<[u8]>,
}

impl NameComponent {
    pub const TYPE_GENERIC: u16 = 8;
    pub const TYPE_IMPLICIT_SHA256: u16 = 1;
    pub const TYPE_PARAMETER_SHA256: u16 = 2;

    pub fn new(typ: u16, bytes: &[u8]) -> Option<Self> {
        Some(Self {
            typ: NonZeroU16::new(typ)?,
            bytes: Box::from(bytes),
        })
    }

    pub fn generic(bytes: &[u8]) -> Self {
        Self {
            typ: NonZeroU16::new(Self::TYPE_GENERIC).unwrap(),
            bytes: Box::from(bytes),
        }
    }

    fn as_tlv(&self) -> Tlv<'_> {
        Tlv {
            typ: self.typ.into(),
            val: &self.bytes,
        }
    }
}

impl fmt::Debug for NameComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_escaped(f, &self.bytes)
    }
}

/// A hierarchical name: an ordered sequence of owned components.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Name {
    components: Vec<NameComponent>,
}

impl Name {
    pub const TLV_TYPE: u32 = 7;

    pub fn new() -> Self {
        Self {
            components: Vec::new(),
        }
    }

    /// Appends a generic component, copying `bytes`.
    pub fn append(&mut self, bytes: &[u8]) -> &mut Self {
        self.components.push(NameComponent::generic(bytes));
        self
    }

    pub fn append_component(&mut self, component: NameComponent) -> &mut Self {
        self.components.push(component);
        self
    }

    /// Builder form of [`Name::append`].
    pub fn appending(mut self, bytes: &[u8]) -> Self {
        self.append(bytes);
        self
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&NameComponent> {
        self.components.get(index)
    }

    pub fn components(&self) -> core::slice::Iter<'_, NameComponent> {
        self.components.iter()
    }

    /// True iff every component of `self` equals the corresponding
    /// leading component of `other`. An empty name is a prefix of
    /// every name, including itself.
    pub fn is_prefix_of(&self, other: &Name) -> bool {
        if self.components.len() > other.components.len() {
            return false;
        }
        self.components
            .iter()
            .zip(other.components.iter())
            .all(|(a, b)| a == b)
    }

    /// Decodes the inner bytes of a name TLV.
    pub fn try_decode(inner_bytes: &[u8]) -> Option<Self> {
        let mut components = Vec::new();
        for entry in iter_tlvs(inner_bytes) {
            let tlv = entry.ok()?;
            let typ: NonZeroU16 = u16::try_from(tlv.typ.get()).ok()?.try_into().ok()?;
            components.push(NameComponent {
                typ,
                bytes: Box::from(tlv.val),
            });
        }
        Some(Name { components })
    }

    /// Parses an NDN URI such as `/a/b` or `/%C1.M.S.localhost/ndnd`.
    /// Every parsed component is generic; empty segments are skipped.
    pub fn from_uri(uri: &str) -> Option<Self> {
        let mut name = Name::new();
        for segment in uri.split('/') {
            if segment.is_empty() {
                continue;
            }
            name.append(&percent_decode(segment)?);
        }
        Some(name)
    }

    fn inner_len(&self) -> usize {
        self.components.iter().map(|c| c.as_tlv().encoded_len()).sum()
    }
}

impl Encode for Name {
    fn encoded_len(&self) -> usize {
        let inner = self.inner_len();
        (Name::TLV_TYPE as u64).encoded_len() + (inner as u64).encoded_len() + inner
    }

    fn encode<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), W::Error> {
        (Name::TLV_TYPE as u64).encode(writer)?;
        (self.inner_len() as u64).encode(writer)?;
        for component in &self.components {
            component.as_tlv().encode(writer)?;
        }
        Ok(())
    }
}

// Total order used only for display determinism and tests: component
// count first, then componentwise comparison. Matching never relies on it.
impl Ord for Name {
    fn cmp(&self, other: &Self) -> Ordering {
        self.components
            .len()
            .cmp(&other.components.len())
            .then_with(|| self.components.cmp(&other.components))
    }
}

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.components.is_empty() {
            return f.write_str("/");
        }
        for component in &self.components {
            f.write_str("/")?;
            write_escaped(f, &component.bytes)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

fn write_escaped(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    for &b in bytes {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'+' | b'-' | b'.' | b'_' | b'~' => {
                f.write_str(core::str::from_utf8(&[b]).unwrap_or("?"))?
            }
            _ => write!(f, "%{:02X}", b)?,
        }
    }
    Ok(())
}

fn percent_decode(segment: &str) -> Option<Vec<u8>> {
    let bytes = segment.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if bytes.len() - i < 3 {
                return None;
            }
            let hex = core::str::from_utf8(&bytes[i + 1..i + 3]).ok()?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Some(out)
}
