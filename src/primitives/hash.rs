//! SHA3 hashing and the one-byte-magic KDF used throughout the ratchet.

use sha3::{Digest, Sha3_256, Sha3_512};

/// `SHA3-256(data)`.
pub fn sha3_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha3_256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// `SHA3-512(data)`.
pub fn sha3_512(data: &[u8]) -> [u8; 64] {
    let mut hasher = Sha3_512::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// `SHA3-512(a || b)`, avoiding an intermediate concatenated allocation.
pub fn sha3_512_concat(a: &[u8], b: &[u8]) -> [u8; 64] {
    let mut hasher = Sha3_512::new();
    hasher.update(a);
    hasher.update(b);
    hasher.finalize().into()
}

/// `KDF(magic, key, outlen) = SHA3-256(magic || key)[..outlen]`, outlen <= 32.
pub fn kdf_256(magic: u8, key: &[u8], outlen: usize) -> Vec<u8> {
    debug_assert!(outlen <= 32);
    let mut hasher = Sha3_256::new();
    hasher.update([magic]);
    hasher.update(key);
    let digest: [u8; 32] = hasher.finalize().into();
    digest[..outlen].to_vec()
}

/// `KDF(magic, key, outlen) = SHA3-512(magic || key)[..outlen]`, outlen <= 64.
pub fn kdf_512(magic: u8, key: &[u8], outlen: usize) -> Vec<u8> {
    debug_assert!(outlen <= 64);
    let mut hasher = Sha3_512::new();
    hasher.update([magic]);
    hasher.update(key);
    let digest: [u8; 64] = hasher.finalize().into();
    digest[..outlen].to_vec()
}

/// `KDF(magic, key, 32)` fixed-size variant used for the two chain seeds
/// and the root key, all of which are exactly one hash-width.
pub fn kdf_256_fixed(magic: u8, key: &[u8]) -> [u8; 32] {
    let mut hasher = Sha3_256::new();
    hasher.update([magic]);
    hasher.update(key);
    hasher.finalize().into()
}

/// `KDF(magic, key, 64)` fixed-size variant.
pub fn kdf_512_fixed(magic: u8, key: &[u8]) -> [u8; 64] {
    let mut hasher = Sha3_512::new();
    hasher.update([magic]);
    hasher.update(key);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha3_512_is_64_bytes_and_deterministic() {
        let a = sha3_512(b"hello");
        let b = sha3_512(b"hello");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn kdf_is_domain_separated() {
        let key = [7u8; 64];
        let a = kdf_256_fixed(0x01, &key);
        let b = kdf_256_fixed(0x02, &key);
        assert_ne!(a, b);
    }

    #[test]
    fn concat_matches_manual_concat() {
        let a = b"abc";
        let b = b"defg";
        let mut joined = Vec::new();
        joined.extend_from_slice(a);
        joined.extend_from_slice(b);
        assert_eq!(sha3_512_concat(a, b), sha3_512(&joined));
    }
}
