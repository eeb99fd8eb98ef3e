use tracing::{debug, info, warn};

use crate::error::{BlocksError, Result};
use super::TranslationClient;

/// How a batch reply was mapped back onto the tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchMode {
    /// The combined reply split into exactly one piece per token
    Positional,
    /// Piece count mismatched; every token was requested on its own
    Fallback,
}

/// Result of translating every block at once
#[derive(Debug)]
pub struct BatchTranslation {
    pub mode: BatchMode,
    /// One entry per input token, in input order
    pub entries: Vec<(String, Option<String>)>,
    /// Per-token failures collected in fallback mode
    pub failures: Vec<(String, BlocksError)>,
}

impl BatchTranslation {
    fn empty() -> Self {
        Self {
            mode: BatchMode::Positional,
            entries: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Token/annotation pairs that produced a translation
    pub fn translated(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .filter_map(|(token, translation)| translation.as_deref().map(|t| (token.as_str(), t)))
    }

    pub fn translated_count(&self) -> usize {
        self.translated().count()
    }

    pub fn is_complete(&self) -> bool {
        self.entries.iter().all(|(_, translation)| translation.is_some())
    }
}

/// Split a combined reply on `|`, trimming each piece.
pub fn split_batch_reply(reply: &str) -> Vec<String> {
    reply.split('|').map(|piece| piece.trim().to_string()).collect()
}

impl TranslationClient {
    /// Translate all tokens with one combined request in the configured direction
    pub async fn translate_all(&self, tokens: &[String]) -> Result<BatchTranslation> {
        self.translate_all_with(tokens, self.to_english).await
    }

    /// Fails only when the combined request fails. A reply with the wrong
    /// number of pieces degrades to sequential single requests through the
    /// same rate limiter; throttled or failed tokens are left untranslated.
    pub async fn translate_all_with(
        &self,
        tokens: &[String],
        to_english: bool,
    ) -> Result<BatchTranslation> {
        if tokens.is_empty() {
            return Ok(BatchTranslation::empty());
        }

        let combined = tokens.join(self.batch_separator.as_str());
        info!("Translating {} blocks in one request", tokens.len());

        let reply = self.translate_with(&combined, to_english).await?;
        let pieces = split_batch_reply(&reply);

        if pieces.len() == tokens.len() {
            let entries = tokens
                .iter()
                .zip(pieces)
                .map(|(token, piece)| {
                    let translation = if piece.is_empty() { None } else { Some(piece) };
                    (token.clone(), translation)
                })
                .collect();
            return Ok(BatchTranslation {
                mode: BatchMode::Positional,
                entries,
                failures: Vec::new(),
            });
        }

        warn!(
            "Batch reply has {} pieces for {} blocks, translating one by one",
            pieces.len(),
            tokens.len()
        );

        let mut entries = Vec::with_capacity(tokens.len());
        let mut failures = Vec::new();
        for token in tokens {
            match self.translate_with(token, to_english).await {
                Ok(translation) => entries.push((token.clone(), Some(translation))),
                Err(e) => {
                    debug!("No translation for '{}': {}", token, e);
                    entries.push((token.clone(), None));
                    failures.push((token.clone(), e));
                }
            }
        }

        Ok(BatchTranslation {
            mode: BatchMode::Fallback,
            entries,
            failures,
        })
    }
}
