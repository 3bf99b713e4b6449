use rand::{thread_rng, Rng};

/// Length of generated paste ids.
pub const ID_LEN: usize = 10;

const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";

/// Generate a random URL-safe paste id.
///
/// No uniqueness check is done; with 60 bits of entropy a collision is left to
/// surface as an insert failure.
pub fn generate_id() -> String {
    let mut rng = thread_rng();
    (0..ID_LEN)
        .map(|_| char::from(ALPHABET[rng.gen_range(0..ALPHABET.len())]))
        .collect()
}
