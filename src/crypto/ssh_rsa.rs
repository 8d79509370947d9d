//! ssh-rsa host keys with rsa-sha2-256 signatures (RFC 8332).

use std::fmt;

use nom::error::{Error as NomError, ErrorKind};
use nom::{Err, IResult};
use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::pkcs8::DecodePrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use signature::{SignatureEncoding, Signer, Verifier};

use super::host_key::{HostKeySigner, HostKeyVerifier, ImportedHostKey};
use crate::buffer::Buf;
use crate::message::string;
use crate::Error;

const SSH_RSA: &[u8] = b"ssh-rsa";
const RSA_SHA2_256: &[u8] = b"rsa-sha2-256";

/// Imports ssh-rsa host key blobs.
#[derive(Debug, Default, Clone, Copy)]
pub struct RsaHostKeyVerifier;

impl HostKeyVerifier for RsaHostKeyVerifier {
    fn import(&self, blob: &[u8]) -> Result<Box<dyn ImportedHostKey>, String> {
        let (_, (e, n)) =
            parse_public_blob(blob).map_err(|_| "Invalid ssh-rsa host key blob".to_string())?;

        let key = RsaPublicKey::new(
            rsa::BigUint::from_bytes_be(n),
            rsa::BigUint::from_bytes_be(e),
        )
        .map_err(|e| format!("Invalid ssh-rsa host key: {}", e))?;

        Ok(Box::new(RsaHostKey { key }))
    }
}

/// `string "ssh-rsa", mpint e, mpint n`
fn parse_public_blob(input: &[u8]) -> IResult<&[u8], (&[u8], &[u8])> {
    let (rest, name) = string(input)?;
    if name != SSH_RSA {
        return Err(Err::Failure(NomError::new(input, ErrorKind::Tag)));
    }
    let (rest, e) = string(rest)?;
    let (rest, n) = string(rest)?;
    Ok((rest, (e, n)))
}

/// `string algorithm, string signature`
fn parse_signature_blob(input: &[u8]) -> IResult<&[u8], (&[u8], &[u8])> {
    let (rest, name) = string(input)?;
    let (rest, sig) = string(rest)?;
    Ok((rest, (name, sig)))
}

/// An imported ssh-rsa public key.
#[derive(Debug, Clone)]
pub struct RsaHostKey {
    key: RsaPublicKey,
}

impl ImportedHostKey for RsaHostKey {
    fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), String> {
        let (_, (name, sig)) = parse_signature_blob(signature)
            .map_err(|_| "Invalid signature blob".to_string())?;

        if name != RSA_SHA2_256 {
            return Err(format!(
                "Unsupported signature algorithm {}",
                String::from_utf8_lossy(name)
            ));
        }

        let sig = Signature::try_from(sig).map_err(|e| e.to_string())?;
        VerifyingKey::<Sha256>::new(self.key.clone())
            .verify(message, &sig)
            .map_err(|_| "Signature verification failed".to_string())
    }
}

/// Server side ssh-rsa host key.
pub struct RsaHostKeySigner {
    key: SigningKey<Sha256>,
    public_blob: Vec<u8>,
}

impl RsaHostKeySigner {
    pub fn new(private_key: RsaPrivateKey) -> Self {
        let public = private_key.to_public_key();

        let mut blob = Buf::new();
        blob.put_string(SSH_RSA);
        blob.put_mpint_bytes(&public.e().to_bytes_be());
        blob.put_mpint_bytes(&public.n().to_bytes_be());

        RsaHostKeySigner {
            key: SigningKey::<Sha256>::new(private_key),
            public_blob: blob.into_vec(),
        }
    }

    /// Load a PKCS#8 PEM encoded RSA private key.
    pub fn from_pkcs8_pem(pem: &str) -> Result<Self, Error> {
        let key = RsaPrivateKey::from_pkcs8_pem(pem)
            .map_err(|e| Error::HostKey(format!("Failed to load RSA key: {}", e)))?;
        Ok(Self::new(key))
    }
}

impl HostKeySigner for RsaHostKeySigner {
    fn public_blob(&self) -> Vec<u8> {
        self.public_blob.clone()
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, String> {
        let sig = self.key.try_sign(message).map_err(|e| e.to_string())?;

        let mut blob = Buf::new();
        blob.put_string(RSA_SHA2_256);
        blob.put_string(&sig.to_vec());
        Ok(blob.into_vec())
    }
}

impl fmt::Debug for RsaHostKeySigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaHostKeySigner")
            .field("public_blob", &self.public_blob.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod test {
    use once_cell::sync::Lazy;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    static KEY: Lazy<RsaPrivateKey> = Lazy::new(|| {
        let mut rng = StdRng::seed_from_u64(1);
        RsaPrivateKey::new(&mut rng, 1024).expect("generate rsa key")
    });

    #[test]
    fn sign_and_verify() {
        let signer = RsaHostKeySigner::new(KEY.clone());
        let blob = signer.public_blob();

        let imported = RsaHostKeyVerifier.import(&blob).unwrap();
        let sig = signer.sign(b"exchange hash").unwrap();

        assert!(imported.verify(b"exchange hash", &sig).is_ok());
        assert!(imported.verify(b"another hash", &sig).is_err());
    }

    #[test]
    fn public_blob_layout() {
        let signer = RsaHostKeySigner::new(KEY.clone());
        let blob = signer.public_blob();
        assert_eq!(&blob[..4], &[0, 0, 0, 7]);
        assert_eq!(&blob[4..11], b"ssh-rsa");
    }

    #[test]
    fn wrong_key_type_is_rejected() {
        let mut blob = Buf::new();
        blob.put_string(b"ssh-ed25519");
        blob.put_string(&[0u8; 32]);
        assert!(RsaHostKeyVerifier.import(&blob).is_err());
    }

    #[test]
    fn unsupported_signature_algorithm() {
        let signer = RsaHostKeySigner::new(KEY.clone());
        let imported = RsaHostKeyVerifier.import(&signer.public_blob()).unwrap();

        let mut sig = Buf::new();
        sig.put_string(b"ssh-rsa");
        sig.put_string(&[1, 2, 3]);
        let err = imported.verify(b"hash", &sig).unwrap_err();
        assert!(err.contains("Unsupported"));
    }
}
