use alloc::{boxed::Box, string::String, vec::Vec};

use crate::{
    name::{Name, NameComponent},
    sign::Signer,
    tlv::{
        encode_unsigned_tlv, iter_tlvs, unsigned_tlv_len, Encode, Tlv, Write,
    },
};

const TLV_TYPE_CAN_BE_PREFIX: u32 = 33;
const TLV_TYPE_MUST_BE_FRESH: u32 = 18;
const TLV_TYPE_NONCE: u32 = 10;
const TLV_TYPE_SCOPE: u32 = 11;
const TLV_TYPE_INTEREST_LIFETIME: u32 = 12;
const TLV_TYPE_HOP_LIMIT: u32 = 34;

const TLV_TYPE_META_INFO: u32 = 20;
const TLV_TYPE_CONTENT: u32 = 21;
const TLV_TYPE_SIGNATURE_INFO: u32 = 22;
const TLV_TYPE_SIGNATURE_VALUE: u32 = 23;

const TLV_TYPE_CONTENT_TYPE: u32 = 24;
const TLV_TYPE_FRESHNESS_PERIOD: u32 = 25;
const TLV_TYPE_FINAL_BLOCK_ID: u32 = 26;

const TLV_TYPE_SIGNATURE_TYPE: u32 = 27;
const TLV_TYPE_KEY_LOCATOR: u32 = 28;
const TLV_TYPE_KEY_DIGEST: u32 = 29;

const TLV_TYPE_FORWARDING_ENTRY_ACTION: u32 = 131;
const TLV_TYPE_FORWARDING_ENTRY_FACE_ID: u32 = 132;
const TLV_TYPE_FORWARDING_ENTRY_FLAGS: u32 = 138;

/// A request for named content.
///
/// Only the name takes part in reply matching; the remaining fields are
/// carried for the forwarder.
#[derive(Clone, Debug)]
pub struct Interest {
    pub name: Name,
    pub can_be_prefix: bool,
    pub must_be_fresh: bool,
    pub nonce: Option<[u8; 4]>,
    pub scope: Option<u64>,
    /// `None` means the sender left the lifetime unspecified.
    pub lifetime_ms: Option<u64>,
    pub hop_limit: Option<u8>,
}

impl Interest {
    pub const TLV_TYPE: u32 = 5;

    pub fn new(name: Name) -> Self {
        Self {
            name,
            can_be_prefix: false,
            must_be_fresh: false,
            nonce: None,
            scope: None,
            lifetime_ms: None,
            hop_limit: None,
        }
    }

    /// A reply with `name` satisfies this interest iff the interest's
    /// name is a prefix of it.
    pub fn matches_name(&self, name: &Name) -> bool {
        self.name.is_prefix_of(name)
    }

    /// Decodes the inner bytes of an interest TLV. Unknown non-critical
    /// field types are skipped; an unknown critical type rejects the
    /// whole packet.
    pub fn try_decode(inner_bytes: &[u8]) -> Option<Self> {
        let mut tlvs = iter_tlvs(inner_bytes);

        let name_tlv = tlvs.next()?.ok()?;
        if name_tlv.typ.get() != Name::TLV_TYPE {
            return None; // Name must be the first TLV
        }
        let mut interest = Interest::new(Name::try_decode(name_tlv.val)?);

        for entry in tlvs {
            let tlv = entry.ok()?;
            match tlv.typ.get() {
                TLV_TYPE_CAN_BE_PREFIX => interest.can_be_prefix = true,
                TLV_TYPE_MUST_BE_FRESH => interest.must_be_fresh = true,
                TLV_TYPE_NONCE => interest.nonce = Some(tlv.val.try_into().ok()?),
                TLV_TYPE_SCOPE => interest.scope = Some(tlv.val_as_u64()?),
                TLV_TYPE_INTEREST_LIFETIME => interest.lifetime_ms = Some(tlv.val_as_u64()?),
                TLV_TYPE_HOP_LIMIT => {
                    if tlv.val.len() != 1 {
                        return None;
                    }
                    interest.hop_limit = Some(tlv.val[0]);
                }
                _ => {
                    if tlv.is_critical() {
                        return None;
                    }
                }
            }
        }

        Some(interest)
    }

    fn inner_len(&self) -> usize {
        let mut len = self.name.encoded_len();
        if self.can_be_prefix {
            len += 2;
        }
        if self.must_be_fresh {
            len += 2;
        }
        if self.nonce.is_some() {
            len += 6;
        }
        if let Some(scope) = self.scope {
            len += unsigned_tlv_len(TLV_TYPE_SCOPE, scope);
        }
        if let Some(lifetime) = self.lifetime_ms {
            len += unsigned_tlv_len(TLV_TYPE_INTEREST_LIFETIME, lifetime);
        }
        if self.hop_limit.is_some() {
            len += 3;
        }
        len
    }
}

impl Encode for Interest {
    fn encoded_len(&self) -> usize {
        let inner = self.inner_len();
        (Self::TLV_TYPE as u64).encoded_len() + (inner as u64).encoded_len() + inner
    }

    fn encode<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), W::Error> {
        (Self::TLV_TYPE as u64).encode(writer)?;
        (self.inner_len() as u64).encode(writer)?;
        self.name.encode(writer)?;
        if self.can_be_prefix {
            writer.write(&[TLV_TYPE_CAN_BE_PREFIX as u8, 0])?;
        }
        if self.must_be_fresh {
            writer.write(&[TLV_TYPE_MUST_BE_FRESH as u8, 0])?;
        }
        if let Some(nonce) = &self.nonce {
            writer.write(&[TLV_TYPE_NONCE as u8, 4])?;
            writer.write(nonce)?;
        }
        if let Some(scope) = self.scope {
            encode_unsigned_tlv(TLV_TYPE_SCOPE, scope, writer)?;
        }
        if let Some(lifetime) = self.lifetime_ms {
            encode_unsigned_tlv(TLV_TYPE_INTEREST_LIFETIME, lifetime, writer)?;
        }
        if let Some(hop_limit) = self.hop_limit {
            writer.write(&[TLV_TYPE_HOP_LIMIT as u8, 1, hop_limit])?;
        }
        Ok(())
    }
}

/// A reply carrying named, signed content.
#[derive(Clone, Debug)]
pub struct Data {
    pub name: Name,
    pub meta_info: Option<MetaInfo>,
    pub content: Option<Box<[u8]>>,
    pub signature_info: SignatureInfo,
    pub signature_value: Box<[u8]>,
}

impl Data {
    pub const TLV_TYPE: u32 = 6;

    pub fn new(name: Name) -> Self {
        Self {
            name,
            meta_info: None,
            content: None,
            signature_info: SignatureInfo {
                signature_type: SignatureType::DigestSha256,
                key_locator: None,
            },
            signature_value: Vec::new().into_boxed_slice(),
        }
    }

    /// Decodes the inner bytes of a data TLV. Both signature parts are
    /// required; unknown non-critical types are skipped.
    pub fn try_decode(inner_bytes: &[u8]) -> Option<Self> {
        let mut tlvs = iter_tlvs(inner_bytes);

        let name_tlv = tlvs.next()?.ok()?;
        if name_tlv.typ.get() != Name::TLV_TYPE {
            return None;
        }
        let name = Name::try_decode(name_tlv.val)?;

        let mut meta_info = None;
        let mut content = None;
        let mut signature_info = None;
        let mut signature_value = None;

        for entry in tlvs {
            let tlv = entry.ok()?;
            match tlv.typ.get() {
                TLV_TYPE_META_INFO => meta_info = Some(MetaInfo::try_decode(tlv.val)?),
                TLV_TYPE_CONTENT => content = Some(Box::from(tlv.val)),
                TLV_TYPE_SIGNATURE_INFO => {
                    signature_info = Some(SignatureInfo::try_decode(tlv.val)?)
                }
                TLV_TYPE_SIGNATURE_VALUE => signature_value = Some(Box::from(tlv.val)),
                _ => {
                    if tlv.is_critical() {
                        return None;
                    }
                }
            }
        }

        Some(Data {
            name,
            meta_info,
            content,
            signature_info: signature_info?,
            signature_value: signature_value?,
        })
    }

    /// The bytes covered by the signature: everything from the name up
    /// to and including the signature info.
    pub fn signed_portion(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.signed_portion_len());
        let _: Result<(), core::convert::Infallible> = (|| {
            self.name.encode(&mut buf)?;
            if let Some(meta_info) = &self.meta_info {
                meta_info.encode(&mut buf)?;
            }
            if let Some(content) = &self.content {
                Tlv {
                    typ: (TLV_TYPE_CONTENT).try_into().unwrap(),
                    val: content,
                }
                .encode(&mut buf)?;
            }
            self.signature_info.encode(&mut buf)
        })();
        buf
    }

    /// Fills in the signature type and value using `signer`.
    pub fn sign_with<S: Signer>(&mut self, signer: &mut S, key_id: &[u8]) {
        self.signature_info.signature_type = signer.signature_type();
        let portion = self.signed_portion();
        self.signature_value = signer.sign(&portion, key_id).into_boxed_slice();
    }

    fn signed_portion_len(&self) -> usize {
        let mut len = self.name.encoded_len();
        if let Some(meta_info) = &self.meta_info {
            len += meta_info.encoded_len();
        }
        if let Some(content) = &self.content {
            len += Tlv {
                typ: (TLV_TYPE_CONTENT).try_into().unwrap(),
                val: content,
            }
            .encoded_len();
        }
        len + self.signature_info.encoded_len()
    }

    fn inner_len(&self) -> usize {
        self.signed_portion_len()
            + Tlv {
                typ: (TLV_TYPE_SIGNATURE_VALUE).try_into().unwrap(),
                val: &self.signature_value,
            }
            .encoded_len()
    }
}

impl Encode for Data {
    fn encoded_len(&self) -> usize {
        let inner = self.inner_len();
        (Self::TLV_TYPE as u64).encoded_len() + (inner as u64).encoded_len() + inner
    }

    fn encode<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), W::Error> {
        (Self::TLV_TYPE as u64).encode(writer)?;
        (self.inner_len() as u64).encode(writer)?;
        self.name.encode(writer)?;
        if let Some(meta_info) = &self.meta_info {
            meta_info.encode(writer)?;
        }
        if let Some(content) = &self.content {
            Tlv {
                typ: (TLV_TYPE_CONTENT).try_into().unwrap(),
                val: content,
            }
            .encode(writer)?;
        }
        self.signature_info.encode(writer)?;
        Tlv {
            typ: (TLV_TYPE_SIGNATURE_VALUE).try_into().unwrap(),
            val: &self.signature_value,
        }
        .encode(writer)
    }
}

#[derive(Clone, Debug, Default)]
pub struct MetaInfo {
    pub content_type: Option<ContentType>,
    pub freshness_period_ms: Option<u64>,
    pub final_block_id: Option<NameComponent>,
}

impl MetaInfo {
    pub fn try_decode(inner_bytes: &[u8]) -> Option<Self> {
        let mut meta_info = MetaInfo::default();
        for entry in iter_tlvs(inner_bytes) {
            let tlv = entry.ok()?;
            match tlv.typ.get() {
                TLV_TYPE_CONTENT_TYPE => {
                    meta_info.content_type = Some(tlv.val_as_u64()?.into())
                }
                TLV_TYPE_FRESHNESS_PERIOD => {
                    meta_info.freshness_period_ms = Some(tlv.val_as_u64()?)
                }
                TLV_TYPE_FINAL_BLOCK_ID => {
                    let inner = iter_tlvs(tlv.val).next()?.ok()?;
                    let typ = u16::try_from(inner.typ.get()).ok()?;
                    meta_info.final_block_id = NameComponent::new(typ, inner.val);
                }
                _ => {}
            }
        }
        Some(meta_info)
    }

    fn inner_len(&self) -> usize {
        let mut len = 0;
        if let Some(content_type) = self.content_type {
            len += unsigned_tlv_len(TLV_TYPE_CONTENT_TYPE, content_type.into());
        }
        if let Some(freshness) = self.freshness_period_ms {
            len += unsigned_tlv_len(TLV_TYPE_FRESHNESS_PERIOD, freshness);
        }
        if let Some(final_block_id) = &self.final_block_id {
            let component = Tlv {
                typ: final_block_id.typ.into(),
                val: &final_block_id.bytes,
            };
            let inner = component.encoded_len();
            len += (TLV_TYPE_FINAL_BLOCK_ID as u64).encoded_len()
                + (inner as u64).encoded_len()
                + inner;
        }
        len
    }
}

impl Encode for MetaInfo {
    fn encoded_len(&self) -> usize {
        let inner = self.inner_len();
        (TLV_TYPE_META_INFO as u64).encoded_len() + (inner as u64).encoded_len() + inner
    }

    fn encode<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), W::Error> {
        (TLV_TYPE_META_INFO as u64).encode(writer)?;
        (self.inner_len() as u64).encode(writer)?;
        if let Some(content_type) = self.content_type {
            encode_unsigned_tlv(TLV_TYPE_CONTENT_TYPE, content_type.into(), writer)?;
        }
        if let Some(freshness) = self.freshness_period_ms {
            encode_unsigned_tlv(TLV_TYPE_FRESHNESS_PERIOD, freshness, writer)?;
        }
        if let Some(final_block_id) = &self.final_block_id {
            let component = Tlv {
                typ: final_block_id.typ.into(),
                val: &final_block_id.bytes,
            };
            (TLV_TYPE_FINAL_BLOCK_ID as u64).encode(writer)?;
            (component.encoded_len() as u64).encode(writer)?;
            component.encode(writer)?;
        }
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ContentType {
    Blob,
    Key,
    Link,
    Nack,
    Other(u64),
}

impl From<u64> for ContentType {
    fn from(value: u64) -> Self {
        match value {
            0 => Self::Blob,
            1 => Self::Key,
            2 => Self::Link,
            3 => Self::Nack,
            u => Self::Other(u),
        }
    }
}

impl From<ContentType> for u64 {
    fn from(value: ContentType) -> Self {
        match value {
            ContentType::Blob => 0,
            ContentType::Key => 1,
            ContentType::Link => 2,
            ContentType::Nack => 3,
            ContentType::Other(u) => u,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SignatureInfo {
    pub signature_type: SignatureType,
    pub key_locator: Option<KeyLocator>,
}

impl SignatureInfo {
    pub fn try_decode(inner_bytes: &[u8]) -> Option<Self> {
        let mut tlvs = iter_tlvs(inner_bytes);

        let signature_type_tlv = tlvs.next()?.ok()?;
        if signature_type_tlv.typ.get() != TLV_TYPE_SIGNATURE_TYPE {
            return None;
        }
        let signature_type = signature_type_tlv.val_as_u64()?.into();

        let mut key_locator = None;
        if let Some(entry) = tlvs.next() {
            let tlv = entry.ok()?;
            if tlv.typ.get() == TLV_TYPE_KEY_LOCATOR {
                key_locator = Some(KeyLocator::try_decode(tlv.val)?);
            }
        }

        Some(Self {
            signature_type,
            key_locator,
        })
    }

    fn inner_len(&self) -> usize {
        let mut len = unsigned_tlv_len(TLV_TYPE_SIGNATURE_TYPE, self.signature_type.into());
        if let Some(key_locator) = &self.key_locator {
            let inner = key_locator.inner_len();
            len += (TLV_TYPE_KEY_LOCATOR as u64).encoded_len()
                + (inner as u64).encoded_len()
                + inner;
        }
        len
    }
}

impl Encode for SignatureInfo {
    fn encoded_len(&self) -> usize {
        let inner = self.inner_len();
        (TLV_TYPE_SIGNATURE_INFO as u64).encoded_len() + (inner as u64).encoded_len() + inner
    }

    fn encode<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), W::Error> {
        (TLV_TYPE_SIGNATURE_INFO as u64).encode(writer)?;
        (self.inner_len() as u64).encode(writer)?;
        encode_unsigned_tlv(TLV_TYPE_SIGNATURE_TYPE, self.signature_type.into(), writer)?;
        if let Some(key_locator) = &self.key_locator {
            (TLV_TYPE_KEY_LOCATOR as u64).encode(writer)?;
            (key_locator.inner_len() as u64).encode(writer)?;
            key_locator.encode_inner(writer)?;
        }
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SignatureType {
    DigestSha256,
    Sha256WithRsa,
    Sha256WithEcdsa,
    HmacWithSha256,
    Ed25519,
    Other(u64),
}

impl From<u64> for SignatureType {
    fn from(value: u64) -> Self {
        match value {
            0 => Self::DigestSha256,
            1 => Self::Sha256WithRsa,
            3 => Self::Sha256WithEcdsa,
            4 => Self::HmacWithSha256,
            5 => Self::Ed25519,
            u => Self::Other(u),
        }
    }
}

impl From<SignatureType> for u64 {
    fn from(value: SignatureType) -> Self {
        match value {
            SignatureType::DigestSha256 => 0,
            SignatureType::Sha256WithRsa => 1,
            SignatureType::Sha256WithEcdsa => 3,
            SignatureType::HmacWithSha256 => 4,
            SignatureType::Ed25519 => 5,
            SignatureType::Other(u) => u,
        }
    }
}

/// Identifies the signing key: either by name or by the digest of the
/// signer's public key.
#[derive(Clone, Debug)]
pub enum KeyLocator {
    Name(Name),
    KeyDigest(Box<[u8]>),
}

impl KeyLocator {
    pub fn try_decode(inner_bytes: &[u8]) -> Option<Self> {
        let tlv = iter_tlvs(inner_bytes).next()?.ok()?;
        match tlv.typ.get() {
            Name::TLV_TYPE => Some(Self::Name(Name::try_decode(tlv.val)?)),
            TLV_TYPE_KEY_DIGEST => Some(Self::KeyDigest(Box::from(tlv.val))),
            _ => None,
        }
    }

    fn inner_len(&self) -> usize {
        match self {
            Self::Name(name) => name.encoded_len(),
            Self::KeyDigest(digest) => Tlv {
                typ: (TLV_TYPE_KEY_DIGEST).try_into().unwrap(),
                val: digest,
            }
            .encoded_len(),
        }
    }

    fn encode_inner<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), W::Error> {
        match self {
            Self::Name(name) => name.encode(writer),
            Self::KeyDigest(digest) => Tlv {
                typ: (TLV_TYPE_KEY_DIGEST).try_into().unwrap(),
                val: digest,
            }
            .encode(writer),
        }
    }
}

/// Flag bits carried in a prefix-registration request.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ForwardingFlags {
    pub active: bool,
    pub child_inherit: bool,
    pub advertise: bool,
    pub last: bool,
    pub capture: bool,
    pub local: bool,
    pub tap: bool,
    pub capture_ok: bool,
}

impl Default for ForwardingFlags {
    fn default() -> Self {
        Self {
            active: true,
            child_inherit: true,
            advertise: false,
            last: false,
            capture: false,
            local: false,
            tap: false,
            capture_ok: false,
        }
    }
}

impl ForwardingFlags {
    pub fn bits(&self) -> u64 {
        let mut bits = 0;
        for (set, bit) in [
            (self.active, 1),
            (self.child_inherit, 2),
            (self.advertise, 4),
            (self.last, 8),
            (self.capture, 16),
            (self.local, 32),
            (self.tap, 64),
            (self.capture_ok, 128),
        ] {
            if set {
                bits |= bit;
            }
        }
        bits
    }

    pub fn from_bits(bits: u64) -> Self {
        Self {
            active: bits & 1 != 0,
            child_inherit: bits & 2 != 0,
            advertise: bits & 4 != 0,
            last: bits & 8 != 0,
            capture: bits & 16 != 0,
            local: bits & 32 != 0,
            tap: bits & 64 != 0,
            capture_ok: bits & 128 != 0,
        }
    }
}

/// The payload of a legacy prefix-registration request.
#[derive(Clone, Debug)]
pub struct ForwardingEntry {
    pub action: String,
    pub prefix: Name,
    /// `None` asks the forwarder to use the requesting connection.
    pub face_id: Option<u64>,
    pub flags: ForwardingFlags,
    pub freshness_period_ms: Option<u64>,
}

impl ForwardingEntry {
    pub const TLV_TYPE: u32 = 129;

    pub fn try_decode(inner_bytes: &[u8]) -> Option<Self> {
        let mut action = None;
        let mut prefix = None;
        let mut face_id = None;
        let mut flags = None;
        let mut freshness_period_ms = None;

        for entry in iter_tlvs(inner_bytes) {
            let tlv = entry.ok()?;
            match tlv.typ.get() {
                TLV_TYPE_FORWARDING_ENTRY_ACTION => {
                    action = Some(core::str::from_utf8(tlv.val).ok()?.into())
                }
                Name::TLV_TYPE => prefix = Some(Name::try_decode(tlv.val)?),
                TLV_TYPE_FORWARDING_ENTRY_FACE_ID => face_id = Some(tlv.val_as_u64()?),
                TLV_TYPE_FORWARDING_ENTRY_FLAGS => {
                    flags = Some(ForwardingFlags::from_bits(tlv.val_as_u64()?))
                }
                TLV_TYPE_FRESHNESS_PERIOD => freshness_period_ms = Some(tlv.val_as_u64()?),
                _ => {}
            }
        }

        Some(Self {
            action: action?,
            prefix: prefix?,
            face_id,
            flags: flags.unwrap_or_default(),
            freshness_period_ms,
        })
    }

    fn inner_len(&self) -> usize {
        let mut len = Tlv {
            typ: (TLV_TYPE_FORWARDING_ENTRY_ACTION).try_into().unwrap(),
            val: self.action.as_bytes(),
        }
        .encoded_len();
        len += self.prefix.encoded_len();
        if let Some(face_id) = self.face_id {
            len += unsigned_tlv_len(TLV_TYPE_FORWARDING_ENTRY_FACE_ID, face_id);
        }
        len += unsigned_tlv_len(TLV_TYPE_FORWARDING_ENTRY_FLAGS, self.flags.bits());
        if let Some(freshness) = self.freshness_period_ms {
            len += unsigned_tlv_len(TLV_TYPE_FRESHNESS_PERIOD, freshness);
        }
        len
    }
}

impl Encode for ForwardingEntry {
    fn encoded_len(&self) -> usize {
        let inner = self.inner_len();
        (Self::TLV_TYPE as u64).encoded_len() + (inner as u64).encoded_len() + inner
    }

    fn encode<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), W::Error> {
        (Self::TLV_TYPE as u64).encode(writer)?;
        (self.inner_len() as u64).encode(writer)?;
        Tlv {
            typ: (TLV_TYPE_FORWARDING_ENTRY_ACTION).try_into().unwrap(),
            val: self.action.as_bytes(),
        }
        .encode(writer)?;
        self.prefix.encode(writer)?;
        if let Some(face_id) = self.face_id {
            encode_unsigned_tlv(TLV_TYPE_FORWARDING_ENTRY_FACE_ID, face_id, writer)?;
        }
        encode_unsigned_tlv(TLV_TYPE_FORWARDING_ENTRY_FLAGS, self.flags.bits(), writer)?;
        if let Some(freshness) = self.freshness_period_ms {
            encode_unsigned_tlv(TLV_TYPE_FRESHNESS_PERIOD, freshness, writer)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_outer(bytes: &[u8]) -> (u32, Vec<u8>) {
        let (tlv, consumed) = Tlv::try_decode(bytes).unwrap();
        assert_eq!(consumed, bytes.len());
        (tlv.typ.get(), tlv.val.to_vec())
    }

    #[test]
    fn test_interest_round_trip() {
        let mut interest = Interest::new(Name::from_uri("/a/b").unwrap());
        interest.can_be_prefix = true;
        interest.must_be_fresh = true;
        interest.nonce = Some([1, 2, 3, 4]);
        interest.scope = Some(1);
        interest.lifetime_ms = Some(4000);
        interest.hop_limit = Some(5);

        let wire = interest.to_vec();
        assert_eq!(wire.len(), interest.encoded_len());

        let (typ, inner) = decode_outer(&wire);
        assert_eq!(typ, Interest::TLV_TYPE);
        let decoded = Interest::try_decode(&inner).unwrap();
        assert_eq!(decoded.name, interest.name);
        assert!(decoded.can_be_prefix);
        assert!(decoded.must_be_fresh);
        assert_eq!(decoded.nonce, Some([1, 2, 3, 4]));
        assert_eq!(decoded.scope, Some(1));
        assert_eq!(decoded.lifetime_ms, Some(4000));
        assert_eq!(decoded.hop_limit, Some(5));
    }

    #[test]
    fn test_interest_minimal() {
        let interest = Interest::new(Name::from_uri("/x").unwrap());
        let wire = interest.to_vec();
        let (typ, inner) = decode_outer(&wire);
        assert_eq!(typ, Interest::TLV_TYPE);
        let decoded = Interest::try_decode(&inner).unwrap();
        assert_eq!(decoded.lifetime_ms, None);
        assert_eq!(decoded.scope, None);
        assert!(!decoded.can_be_prefix);
    }

    #[test]
    fn test_interest_unknown_fields() {
        let name = Name::from_uri("/x").unwrap();
        let mut inner = name.to_vec();
        // Type 100 is non-critical (even, >= 32) and must be skipped.
        inner.extend_from_slice(&[100, 1, 0xAA]);
        assert!(Interest::try_decode(&inner).is_some());

        // Type 99 is critical (odd) and must reject the packet.
        let mut inner = name.to_vec();
        inner.extend_from_slice(&[99, 1, 0xAA]);
        assert!(Interest::try_decode(&inner).is_none());

        // Name must come first.
        let inner = [10u8, 4, 1, 2, 3, 4];
        assert!(Interest::try_decode(&inner).is_none());
    }

    #[test]
    fn test_interest_matching() {
        let interest = Interest::new(Name::from_uri("/a/b").unwrap());
        assert!(interest.matches_name(&Name::from_uri("/a/b").unwrap()));
        assert!(interest.matches_name(&Name::from_uri("/a/b/c").unwrap()));
        assert!(!interest.matches_name(&Name::from_uri("/a").unwrap()));
        assert!(!interest.matches_name(&Name::from_uri("/a/x").unwrap()));
    }

    #[test]
    fn test_data_round_trip() {
        let mut data = Data::new(Name::from_uri("/a/b").unwrap());
        data.meta_info = Some(MetaInfo {
            content_type: Some(ContentType::Blob),
            freshness_period_ms: Some(1000),
            final_block_id: None,
        });
        data.content = Some(Box::from(b"payload".as_slice()));
        data.signature_info.key_locator =
            Some(KeyLocator::KeyDigest(Box::from([7u8; 32].as_slice())));

        let wire = data.to_vec();
        assert_eq!(wire.len(), data.encoded_len());

        let (typ, inner) = decode_outer(&wire);
        assert_eq!(typ, Data::TLV_TYPE);
        let decoded = Data::try_decode(&inner).unwrap();
        assert_eq!(decoded.name, data.name);
        assert_eq!(decoded.content.as_deref(), Some(b"payload".as_slice()));
        let meta = decoded.meta_info.unwrap();
        assert_eq!(meta.content_type, Some(ContentType::Blob));
        assert_eq!(meta.freshness_period_ms, Some(1000));
        assert_eq!(
            decoded.signature_info.signature_type,
            SignatureType::DigestSha256
        );
        match decoded.signature_info.key_locator {
            Some(KeyLocator::KeyDigest(digest)) => assert_eq!(digest.as_ref(), &[7u8; 32]),
            other => panic!("unexpected key locator {other:?}"),
        }
    }

    #[test]
    fn test_data_empty_signature() {
        // The legacy registration payload: empty RSA signature value.
        let mut data = Data::new(Name::new());
        data.signature_info.signature_type = SignatureType::Sha256WithRsa;
        data.content = Some(Box::from(b"entry".as_slice()));

        let wire = data.to_vec();
        let (_, inner) = decode_outer(&wire);
        let decoded = Data::try_decode(&inner).unwrap();
        assert_eq!(
            decoded.signature_info.signature_type,
            SignatureType::Sha256WithRsa
        );
        assert!(decoded.signature_value.is_empty());
    }

    #[test]
    fn test_data_requires_signature() {
        let name = Name::from_uri("/a").unwrap();
        let inner = name.to_vec();
        assert!(Data::try_decode(&inner).is_none());
    }

    #[test]
    fn test_key_locator_name_form() {
        let locator = KeyLocator::Name(Name::from_uri("/keys/alice").unwrap());
        let info = SignatureInfo {
            signature_type: SignatureType::Sha256WithRsa,
            key_locator: Some(locator),
        };
        let wire = info.to_vec();
        let (typ, inner) = decode_outer(&wire);
        assert_eq!(typ, 22);
        let decoded = SignatureInfo::try_decode(&inner).unwrap();
        match decoded.key_locator {
            Some(KeyLocator::Name(name)) => {
                assert_eq!(name, Name::from_uri("/keys/alice").unwrap())
            }
            other => panic!("unexpected key locator {other:?}"),
        }
    }

    #[test]
    fn test_forwarding_entry_round_trip() {
        let entry = ForwardingEntry {
            action: "selfreg".into(),
            prefix: Name::from_uri("/app/prefix").unwrap(),
            face_id: None,
            flags: ForwardingFlags::default(),
            freshness_period_ms: None,
        };

        let wire = entry.to_vec();
        assert_eq!(wire.len(), entry.encoded_len());
        let (typ, inner) = decode_outer(&wire);
        assert_eq!(typ, ForwardingEntry::TLV_TYPE);
        let decoded = ForwardingEntry::try_decode(&inner).unwrap();
        assert_eq!(decoded.action, "selfreg");
        assert_eq!(decoded.prefix, entry.prefix);
        assert_eq!(decoded.face_id, None);
        assert_eq!(decoded.flags, ForwardingFlags::default());
        assert_eq!(decoded.freshness_period_ms, None);
    }

    #[test]
    fn test_forwarding_flags_bits() {
        let flags = ForwardingFlags::default();
        assert_eq!(flags.bits(), 3); // active | child_inherit
        assert_eq!(ForwardingFlags::from_bits(3), flags);

        let mut flags = ForwardingFlags::default();
        flags.capture = true;
        flags.tap = true;
        assert_eq!(ForwardingFlags::from_bits(flags.bits()), flags);
    }

    #[cfg(feature = "sha2")]
    #[test]
    fn test_sign_with_digest_signer() {
        use crate::platform::sha::Sha256Signer;
        use sha2::{Digest, Sha256};

        let mut data = Data::new(Name::from_uri("/a").unwrap());
        data.content = Some(Box::from(b"hello".as_slice()));
        data.sign_with(&mut Sha256Signer::new(), b"");

        assert_eq!(data.signature_info.signature_type, SignatureType::DigestSha256);
        let expected: [u8; 32] = Sha256::digest(data.signed_portion()).into();
        assert_eq!(data.signature_value.as_ref(), &expected);
    }
}
