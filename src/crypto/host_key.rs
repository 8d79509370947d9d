use std::fmt::Debug;

/// Imports the host key blob a server sends in its reply.
pub trait HostKeyVerifier: Debug + Send + Sync {
    /// Parse a public host key blob.
    fn import(&self, blob: &[u8]) -> Result<Box<dyn ImportedHostKey>, String>;
}

/// A peer host key ready to check the signature over the exchange hash.
pub trait ImportedHostKey: Debug + Send + Sync {
    /// Verify `signature` (an SSH signature blob) over `message`.
    fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), String>;
}

/// The server's own host key.
pub trait HostKeySigner: Debug + Send + Sync {
    /// Public key blob sent as `K_S`.
    fn public_blob(&self) -> Vec<u8>;

    /// Sign `message` and return an SSH signature blob.
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, String>;
}
