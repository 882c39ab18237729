use tracing::debug;

use crate::{
    device::Device,
    fuzzy,
    token::Token,
    totp::{self, Totp, DEFAULT_DIGITS},
    Result,
};

/// Command that rebuilds the token cache, shown when there is nothing to search
pub const REFRESH_ACTION: &str = "authy refresh";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputKind {
    Code { code: String, remaining_seconds: u64 },
    /// The token could not produce a code
    Error(String),
    /// Not a token: a hint, with the action that resolves it
    Notice { action: String },
}

/// One display-ready search result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    pub title: String,
    pub kind: OutputKind,
}

impl Output {
    fn notice(title: String, action: &str) -> Self {
        Self {
            title,
            kind: OutputKind::Notice {
                action: action.to_string(),
            },
        }
    }

    pub fn code(&self) -> Option<&str> {
        match &self.kind {
            OutputKind::Code { code, .. } => Some(code),
            _ => None,
        }
    }
}

pub struct Searcher<'d, 'a> {
    device: &'d mut Device<'a>,
}

impl<'d, 'a> Searcher<'d, 'a> {
    pub fn new(device: &'d mut Device<'a>) -> Self {
        Self { device }
    }

    /// Finds the tokens matching `keyword` and computes their codes.
    ///
    /// An empty keyword lists every token, most used first. Otherwise tokens
    /// are fuzzy matched on their names, best match first, and each match
    /// gains weight. The result is never empty: when nothing can be shown a
    /// single notice explains why.
    pub fn search(&mut self, keyword: &str) -> Result<Vec<Output>> {
        if self.device.cache().is_empty() {
            self.device.load_tokens_from_cache()?;
        }

        if self.device.cache().is_empty() {
            return Ok(vec![Output::notice(
                "No tokens found, please refresh the token cache".to_string(),
                REFRESH_ACTION,
            )]);
        }

        let keyword = keyword.trim();
        let tokens: Vec<Token> = if keyword.is_empty() {
            self.device.cache().ranked().into_iter().cloned().collect()
        } else {
            self.matching(keyword)?
        };

        if tokens.is_empty() {
            return Ok(vec![Output::notice(
                format!("No match for `{keyword}`, try another keyword"),
                keyword,
            )]);
        }

        Ok(tokens.iter().map(|token| self.output(token)).collect())
    }

    fn matching(&mut self, keyword: &str) -> Result<Vec<Token>> {
        let cache = self.device.cache();
        let texts: Vec<String> = cache.tokens().iter().map(Token::search_text).collect();
        let identities: Vec<String> = fuzzy::find(keyword, &texts)
            .into_iter()
            .map(|m| cache.tokens()[m.index].identity())
            .collect();
        debug!(keyword, matches = identities.len(), "fuzzy search");

        if identities.is_empty() {
            return Ok(vec![]);
        }

        let cache = self.device.cache_mut();
        for identity in &identities {
            cache.bump_weight(identity);
        }
        self.device.save_cache()?;

        let cache = self.device.cache();
        Ok(identities
            .iter()
            .filter_map(|identity| cache.get(identity).cloned())
            .collect())
    }

    fn output(&self, token: &Token) -> Output {
        let title = token.title().to_string();
        if token.secret.is_empty() {
            return Output {
                title,
                kind: OutputKind::Error("OTP token is empty".to_string()),
            };
        }

        let digits = if token.digits == 0 {
            DEFAULT_DIGITS
        } else {
            token.digits
        };
        let clock = self.device.clock();

        let kind = match Totp::new(token.secret.as_str())
            .with_digits(digits)
            .generate_with_offset(clock, 0)
        {
            Ok(code) => OutputKind::Code {
                code: code.to_string(),
                remaining_seconds: totp::remaining_seconds(clock),
            },
            Err(err) => OutputKind::Error(err.to_string()),
        };

        Output { title, kind }
    }
}
