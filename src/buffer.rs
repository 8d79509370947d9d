//! Output buffers and SSH wire encoders.
//!
//! [`Buf`] wraps `Vec<u8>` and knows how to append the SSH binary data types
//! (RFC 4251 section 5) that the group exchange messages are built from.

use std::fmt;
use std::ops::{Deref, DerefMut};

use num_bigint::BigUint;

use crate::Error;

/// Growable buffer used for every outbound message and for hash input.
#[derive(Default, Clone, PartialEq, Eq)]
pub struct Buf(Vec<u8>);

impl Buf {
    /// Create a new empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty buffer with room for `capacity` bytes.
    ///
    /// Allocation failure is reported instead of aborting the process.
    pub fn try_with_capacity(capacity: usize) -> Result<Self, Error> {
        let mut v = Vec::new();
        v.try_reserve_exact(capacity)
            .map_err(|_| Error::Allocation)?;
        Ok(Buf(v))
    }

    /// Push a single byte onto the buffer.
    pub fn push(&mut self, byte: u8) {
        self.0.push(byte);
    }

    /// Append an SSH `uint32`.
    pub fn put_u32(&mut self, v: u32) {
        self.0.extend_from_slice(&v.to_be_bytes());
    }

    /// Append an SSH `string`: a `uint32` length followed by the bytes.
    pub fn put_string(&mut self, data: &[u8]) {
        self.put_u32(data.len() as u32);
        self.0.extend_from_slice(data);
    }

    /// Append a non-negative SSH `mpint`.
    pub fn put_mpint(&mut self, v: &BigUint) {
        self.put_mpint_bytes(&v.to_bytes_be());
    }

    /// Append a non-negative SSH `mpint` given as unsigned big endian bytes.
    ///
    /// Leading zeros are stripped, and a single zero byte is prepended when
    /// the most significant bit is set so the value does not read as negative.
    /// Zero is encoded as an empty string.
    pub fn put_mpint_bytes(&mut self, v: &[u8]) {
        let first = v.iter().position(|b| *b != 0).unwrap_or(v.len());
        let v = &v[first..];

        let pad = v.first().map(|b| b & 0x80 != 0).unwrap_or(false);
        let len = v.len() + pad as usize;

        self.put_u32(len as u32);
        if pad {
            self.0.push(0);
        }
        self.0.extend_from_slice(v);
    }

    /// Convert the buffer into the underlying `Vec<u8>`.
    pub fn into_vec(mut self) -> Vec<u8> {
        std::mem::take(&mut self.0)
    }
}

impl Deref for Buf {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Buf {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl AsRef<[u8]> for Buf {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Buf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buf").field("len", &self.0.len()).finish()
    }
}
