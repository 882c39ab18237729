use data_encoding::{Encoding, Specification};
use rand::Rng;

use crate::{Error, Result};

/// RFC4648 base32 alphabet, used without padding
pub const RFC4648_ALPHABET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

const DEFAULT_TOKEN_LENGTH: usize = 12;
const SEPARATORS: &str = "- ";

#[derive(Debug, Clone)]
pub struct Base32 {
    alphabet: String,
    encoding: Encoding,
}

impl Base32 {
    /// Creates a codec for a custom 32 symbol ASCII alphabet.
    ///
    /// Lowercase input maps onto uppercase symbols, hyphens and spaces are
    /// skipped and leftover trailing bits are not checked.
    pub fn new(alphabet: &str) -> Result<Self> {
        if alphabet.len() != 32 || !alphabet.is_ascii() {
            return Err(Error::InvalidInput(format!(
                "a base32 alphabet needs 32 ASCII symbols, got {alphabet:?}"
            )));
        }

        let mut spec = Specification::new();
        spec.symbols.push_str(alphabet);
        for symbol in alphabet.chars().filter(char::is_ascii_uppercase) {
            let lower = symbol.to_ascii_lowercase();
            if !alphabet.contains(lower) {
                spec.translate.from.push(lower);
                spec.translate.to.push(symbol);
            }
        }
        spec.ignore.push_str(SEPARATORS);
        spec.check_trailing_bits = false;

        let encoding = spec.encoding().map_err(|err| {
            Error::InvalidInput(format!("base32 alphabet {alphabet:?} is unusable: {err}"))
        })?;

        Ok(Self {
            alphabet: alphabet.to_string(),
            encoding,
        })
    }

    /// Decodes a secret into raw key bytes.
    ///
    /// Whitespace around the secret, inner hyphens and spaces are ignored and
    /// case does not matter. Trailing symbols that do not fill a whole byte
    /// are dropped, so the output is `len * 5 / 8` bytes long.
    pub fn decode(&self, secret: &str) -> Result<Vec<u8>> {
        let secret = secret.trim();

        let mut symbols = 0;
        for c in secret.chars().filter(|c| !SEPARATORS.contains(*c)) {
            if !self.alphabet.contains(c) && !self.alphabet.contains(c.to_ascii_uppercase()) {
                return Err(Error::SecretDecode(c));
            }
            symbols += 1;
        }

        // shortest prefix that still yields every whole byte
        let keep = (symbols * 5 / 8 * 8 + 4) / 5;
        let cut = secret
            .char_indices()
            .filter(|(_, c)| !SEPARATORS.contains(*c))
            .nth(keep)
            .map_or(secret.len(), |(at, _)| at);

        self.encoding
            .decode(secret[..cut].as_bytes())
            .map_err(|err| Error::InvalidInput(format!("base32 secret: {err}")))
    }

    /// Draws `length` symbols uniformly from the alphabet, 12 when `length` is zero.
    pub fn random_token(&self, length: usize) -> String {
        random_symbols(self.alphabet.as_bytes(), length)
    }
}

fn random_symbols(alphabet: &[u8], length: usize) -> String {
    let length = if length == 0 {
        DEFAULT_TOKEN_LENGTH
    } else {
        length
    };

    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| alphabet[rng.gen_range(0..alphabet.len())] as char)
        .collect()
}

/// Decodes with the RFC4648 alphabet.
pub fn decode(secret: &str) -> Result<Vec<u8>> {
    Base32::new(RFC4648_ALPHABET)?.decode(secret)
}

/// Generates a fresh RFC4648 secret of `length` symbols.
pub fn encode_random_token(length: usize) -> String {
    random_symbols(RFC4648_ALPHABET.as_bytes(), length)
}
