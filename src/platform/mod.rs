#[cfg(all(feature = "std", not(target_arch = "wasm32")))]
mod native;

#[cfg(all(feature = "std", not(target_arch = "wasm32")))]
pub use native::*;

#[cfg(all(feature = "std", not(target_arch = "wasm32")))]
pub type DefaultNode = crate::node::Node<
    native::clock::MonotonicClock,
    native::tcp::TcpTransport,
    crate::node::InertMetrics,
>;

/// A node over TCP to `addr`; forwarders conventionally listen on
/// `127.0.0.1:6363`.
#[cfg(all(feature = "std", not(target_arch = "wasm32")))]
pub fn tcp_node(addr: &str) -> DefaultNode {
    crate::node::Node::new(
        native::clock::MonotonicClock::new(),
        native::tcp::TcpTransport::new(addr),
        crate::node::InertMetrics,
    )
}

#[cfg(feature = "sha2")]
pub mod sha {
    use alloc::vec::Vec;

    use sha2::{Digest, Sha256};

    use crate::packet::SignatureType;
    use crate::sign::Signer;

    /// The classic digest "signature": the SHA-256 of the signed
    /// portion, with no key involved.
    pub struct Sha256Signer {
        inner: Sha256,
    }

    impl Sha256Signer {
        pub fn new() -> Self {
            Self {
                inner: Sha256::new(),
            }
        }
    }

    impl Default for Sha256Signer {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Signer for Sha256Signer {
        fn signature_type(&self) -> SignatureType {
            SignatureType::DigestSha256
        }

        fn sign(&mut self, input: &[u8], _key_id: &[u8]) -> Vec<u8> {
            self.inner.reset();
            self.inner.update(input);
            self.inner.finalize_reset().to_vec()
        }
    }
}
