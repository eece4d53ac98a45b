use rand::Rng;

/// Alphabet shared by short codes and user ids.
pub const ALPHABET: &[u8; 62] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ1234567890";

pub const SHORT_LEN: usize = 5;
pub const USER_ID_LEN: usize = 16;

/// Draw `len` characters uniformly, with replacement, from [`ALPHABET`].
///
/// Collisions are possible and are not detected here.
pub fn generate(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect()
}

/// A fresh 5-character short code.
pub fn short() -> String {
    generate(SHORT_LEN)
}

/// A fresh 16-character user id; exactly one cipher block wide.
pub fn user_id() -> String {
    generate(USER_ID_LEN)
}
