use aes::Aes128;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit, generic_array::GenericArray};

use crate::error::ShortenerError;

/// Size of one AES block; user ids are generated to fill it exactly.
pub const BLOCK_LEN: usize = 16;

/// Turns a user id into an opaque client-held token and back.
pub trait IdentitySealer: Send + Sync {
    fn seal(&self, id: &str) -> Result<String, ShortenerError>;

    /// Fails with `InvalidToken` for anything `seal` could not have produced.
    fn open(&self, token: &str) -> Result<String, ShortenerError>;
}

/// One AES-128 block, no IV, hex encoded.
///
/// Deterministic: the same id always seals to the same token.
#[derive(Clone)]
pub struct AesBlockSealer {
    cipher: Aes128,
}

impl AesBlockSealer {
    pub fn new(key: [u8; BLOCK_LEN]) -> Self {
        Self {
            cipher: Aes128::new(&GenericArray::from(key)),
        }
    }
}

impl IdentitySealer for AesBlockSealer {
    fn seal(&self, id: &str) -> Result<String, ShortenerError> {
        let bytes = id.as_bytes();
        if bytes.len() != BLOCK_LEN {
            return Err(ShortenerError::InvalidIdentity {
                expected: BLOCK_LEN,
                actual: bytes.len(),
            });
        }
        let mut block = GenericArray::clone_from_slice(bytes);
        self.cipher.encrypt_block(&mut block);
        Ok(hex::encode(block))
    }

    fn open(&self, token: &str) -> Result<String, ShortenerError> {
        let raw = hex::decode(token).map_err(|_| ShortenerError::InvalidToken)?;
        if raw.len() != BLOCK_LEN {
            return Err(ShortenerError::InvalidToken);
        }
        let mut block = GenericArray::clone_from_slice(&raw);
        self.cipher.decrypt_block(&mut block);
        String::from_utf8(block.to_vec()).map_err(|_| ShortenerError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn sealer() -> AesBlockSealer {
        AesBlockSealer::new(Config::default().identity_key_bytes().unwrap())
    }

    #[test]
    fn seal_then_open_returns_id() {
        let s = sealer();
        let token = s.seal("abcdefghijklmnop").unwrap();
        assert_eq!(token.len(), BLOCK_LEN * 2);
        assert_eq!(s.open(&token).unwrap(), "abcdefghijklmnop");
    }

    #[test]
    fn sealing_is_deterministic() {
        let s = sealer();
        assert_eq!(
            s.seal("AAAAAAAAAAAAAAAA").unwrap(),
            s.seal("AAAAAAAAAAAAAAAA").unwrap()
        );
    }

    #[test]
    fn different_keys_give_different_tokens() {
        let a = sealer();
        let b = AesBlockSealer::new([7u8; BLOCK_LEN]);
        assert_ne!(
            a.seal("abcdefghijklmnop").unwrap(),
            b.seal("abcdefghijklmnop").unwrap()
        );
    }

    #[test]
    fn seal_rejects_wrong_length() {
        assert!(matches!(
            sealer().seal("short"),
            Err(ShortenerError::InvalidIdentity { actual: 5, .. })
        ));
    }

    #[test]
    fn open_rejects_bad_hex_and_wrong_length() {
        let s = sealer();
        assert!(matches!(s.open("zz"), Err(ShortenerError::InvalidToken)));
        assert!(matches!(s.open("00ff"), Err(ShortenerError::InvalidToken)));
        assert!(matches!(s.open(""), Err(ShortenerError::InvalidToken)));
    }
}
