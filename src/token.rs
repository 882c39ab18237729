use data_encoding::HEXLOWER;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A decrypted authenticator token, as kept in the local cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub name: String,
    #[serde(default)]
    pub original_name: String,
    #[serde(rename = "digital", default)]
    pub digits: u32,
    /// Base32 secret, in plaintext
    #[serde(default)]
    pub secret: String,
    /// Informational, codes always use 30 second steps
    #[serde(default)]
    pub period: u32,
    #[serde(default)]
    pub weight: u64,
}

impl Token {
    /// Name shown to the user: the custom name when it was renamed.
    pub fn title(&self) -> &str {
        if self.name != self.original_name || self.original_name.is_empty() {
            &self.name
        } else {
            &self.original_name
        }
    }

    /// Content hash over name, original name and secret.
    pub fn identity(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.name.as_bytes());
        hasher.update(self.original_name.as_bytes());
        hasher.update(self.secret.as_bytes());

        HEXLOWER.encode(&hasher.finalize())
    }

    /// Text the fuzzy matcher searches in.
    pub fn search_text(&self) -> String {
        format!("{}{}", self.name, self.original_name)
    }

    pub fn bump_weight(&mut self) {
        self.weight += 1;
    }
}
