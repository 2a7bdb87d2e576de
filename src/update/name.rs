// ABOUTME: Throwaway names for containers about to be superseded.
// ABOUTME: 32 letters drawn uniformly from a 52-letter alphabet.

use rand::Rng;

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Length of a generated name.
pub const NAME_LEN: usize = 32;

/// A random, Docker-compatible container name.
///
/// Collisions are not checked; the name space is about 5.7e55.
pub fn random_name() -> String {
    random_name_with(&mut rand::rng())
}

pub(crate) fn random_name_with<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..NAME_LEN)
        .map(|_| char::from(LETTERS[rng.random_range(0..LETTERS.len())]))
        .collect()
}
