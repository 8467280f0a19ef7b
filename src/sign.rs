use alloc::vec::Vec;

use crate::packet::SignatureType;

/// Produces signature values for outgoing data packets.
///
/// The engine itself never signs anything (prefix registration sends the
/// historical empty signature); this seam exists for producer
/// applications building replies.
pub trait Signer {
    /// The signature type code written into the packet.
    fn signature_type(&self) -> SignatureType;

    /// Signs `input` with the key identified by `key_id`. Signers that
    /// hold a single key may ignore `key_id`.
    fn sign(&mut self, input: &[u8], key_id: &[u8]) -> Vec<u8>;
}
