//! Random names and default credentials.
//!
//! Every generated character is drawn independently and uniformly from its
//! class. The random source is injected so tests can seed it; production
//! code uses [`SecretGenerator::from_entropy`], which is backed by a
//! cryptographically secure generator.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{RngCore, SeedableRng};

const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";

/// Characters drawn from each class when building a password.
pub const PASSWORD_CLASS_SIZE: usize = 5;

/// Special characters used for database administrator passwords.
pub const DB_ADMIN_SPECIAL_CHARS: &[char] = &['#', '_', '-'];

/// Special characters used for Windows remote-management passwords.
pub const WINRM_SPECIAL_CHARS: &[char] = &['@', '-', '(', ')', '.'];

/// Produces random passwords, strings and numeric suffixes.
#[derive(Clone, Debug)]
pub struct SecretGenerator<R: RngCore = StdRng> {
    rng: R,
}

impl SecretGenerator<StdRng> {
    /// Creates a generator seeded from operating-system entropy.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    /// Creates a deterministic generator for reproducible runs.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// Uses `seed` when present, entropy otherwise.
    #[must_use]
    pub fn from_seed_or_entropy(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::from_entropy, Self::seeded)
    }
}

impl<R: RngCore> SecretGenerator<R> {
    /// Wraps an existing random source.
    pub const fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Returns a 20 character password made of five characters from
    /// `special_chars`, five lowercase letters, five uppercase letters and
    /// five digits, shuffled together.
    ///
    /// An empty `special_chars` set contributes nothing, leaving a 15
    /// character password.
    pub fn random_password(&mut self, special_chars: &[char]) -> String {
        let mut chars: Vec<char> = Vec::with_capacity(PASSWORD_CLASS_SIZE * 4);
        chars.extend(
            (0..PASSWORD_CLASS_SIZE).filter_map(|_| special_chars.choose(&mut self.rng).copied()),
        );
        chars.extend(self.sample(LOWERCASE, PASSWORD_CLASS_SIZE));
        chars.extend(self.sample(UPPERCASE, PASSWORD_CLASS_SIZE));
        chars.extend(self.sample(DIGITS, PASSWORD_CLASS_SIZE));
        chars.shuffle(&mut self.rng);
        chars.into_iter().collect()
    }

    /// Returns `length` lowercase ASCII letters.
    pub fn random_string(&mut self, length: usize) -> String {
        self.sample(LOWERCASE, length).collect()
    }

    /// Returns `length` ASCII digits.
    pub fn random_number(&mut self, length: usize) -> String {
        self.sample(DIGITS, length).collect()
    }

    fn sample<'a>(&'a mut self, alphabet: &'a [u8], count: usize) -> impl Iterator<Item = char> + 'a {
        (0..count).filter_map(move |_| alphabet.choose(&mut self.rng).copied().map(char::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn count(value: &str, predicate: impl Fn(char) -> bool) -> usize {
        value.chars().filter(|ch| predicate(*ch)).count()
    }

    #[rstest]
    #[case(DB_ADMIN_SPECIAL_CHARS)]
    #[case(WINRM_SPECIAL_CHARS)]
    #[case(&['!'])]
    fn password_has_five_of_each_class(#[case] specials: &[char]) {
        let mut generator = SecretGenerator::seeded(7);
        for _ in 0..50 {
            let password = generator.random_password(specials);
            assert_eq!(password.chars().count(), 20, "{password}");
            assert_eq!(count(&password, |ch| specials.contains(&ch)), 5, "{password}");
            assert_eq!(count(&password, |ch| ch.is_ascii_lowercase()), 5, "{password}");
            assert_eq!(count(&password, |ch| ch.is_ascii_uppercase()), 5, "{password}");
            assert_eq!(count(&password, |ch| ch.is_ascii_digit()), 5, "{password}");
        }
    }

    #[test]
    fn password_without_specials_keeps_other_classes() {
        let password = SecretGenerator::seeded(1).random_password(&[]);
        assert_eq!(password.len(), 15);
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(25)]
    fn random_string_is_lowercase_of_requested_length(#[case] length: usize) {
        let value = SecretGenerator::seeded(3).random_string(length);
        assert_eq!(value.len(), length);
        assert!(value.chars().all(|ch| ch.is_ascii_lowercase()));
    }

    #[rstest]
    #[case(0)]
    #[case(2)]
    #[case(10)]
    fn random_number_is_digits_of_requested_length(#[case] length: usize) {
        let value = SecretGenerator::seeded(5).random_number(length);
        assert_eq!(value.len(), length);
        assert!(value.chars().all(|ch| ch.is_ascii_digit()));
    }

    #[test]
    fn seeded_generators_repeat() {
        let first = SecretGenerator::seeded(42).random_string(12);
        let second = SecretGenerator::seeded(42).random_string(12);
        assert_eq!(first, second);
    }
}
