//! Tokenizer adapter.
//!
//! Maps text to token ids and back. The tokenizer is resolved from the
//! configured model name and silently falls back to `cl100k_base` when the
//! model is not recognized, so the same model name always tokenizes the same way.

use std::sync::Arc;
use tiktoken_rs::CoreBPE;
use tracing::{debug, warn};

/// Name of the encoding used when the model has no known tokenizer.
pub const FALLBACK_ENCODING: &str = "cl100k_base";

/// Trait for text tokenizers.
pub trait Tokenizer: Send + Sync {
    /// Encode text into token ids.
    fn encode(&self, text: &str) -> Vec<u32>;

    /// Decode token ids back into text.
    fn decode(&self, tokens: &[u32]) -> String;

    /// Name of the underlying encoding.
    fn name(&self) -> &str;
}

/// Resolve the tokenizer for a model, falling back to `cl100k_base`.
pub fn tokenizer_for_model(model: &str) -> Arc<dyn Tokenizer> {
    match tiktoken_rs::get_bpe_from_model(model) {
        Ok(bpe) => {
            debug!("Using model tokenizer for {}", model);
            Arc::new(TiktokenTokenizer::new(bpe, model))
        }
        Err(_) => {
            debug!("No tokenizer for model {}, using {}", model, FALLBACK_ENCODING);
            fallback_tokenizer()
        }
    }
}

/// The fixed default tokenizer.
pub fn fallback_tokenizer() -> Arc<dyn Tokenizer> {
    match tiktoken_rs::cl100k_base() {
        Ok(bpe) => Arc::new(TiktokenTokenizer::new(bpe, FALLBACK_ENCODING)),
        Err(e) => {
            // The encoding is bundled with tiktoken-rs, so this only happens on a broken build.
            warn!("Failed to load {}: {}; using byte tokens", FALLBACK_ENCODING, e);
            Arc::new(ByteTokenizer)
        }
    }
}

/// BPE tokenizer backed by tiktoken.
pub struct TiktokenTokenizer {
    bpe: CoreBPE,
    name: String,
}

impl TiktokenTokenizer {
    pub fn new(bpe: CoreBPE, name: &str) -> Self {
        Self {
            bpe,
            name: name.to_string(),
        }
    }

    fn try_decode(&self, tokens: &[u32]) -> Option<String> {
        self.bpe
            .decode(tokens.iter().map(|&t| t as _).collect())
            .ok()
    }
}

impl Tokenizer for TiktokenTokenizer {
    fn encode(&self, text: &str) -> Vec<u32> {
        self.bpe
            .encode_with_special_tokens(text)
            .into_iter()
            .map(|t| t as u32)
            .collect()
    }

    fn decode(&self, tokens: &[u32]) -> String {
        if let Some(text) = self.try_decode(tokens) {
            return text;
        }

        // A window cut through a multi-byte character does not decode as UTF-8.
        // Drop up to three tokens from either edge until it does.
        for trim_start in 0..=3usize.min(tokens.len()) {
            for trim_end in 0..=3usize.min(tokens.len() - trim_start) {
                if trim_start == 0 && trim_end == 0 {
                    continue;
                }
                let window = &tokens[trim_start..tokens.len() - trim_end];
                if let Some(text) = self.try_decode(window) {
                    return text;
                }
            }
        }

        warn!("Dropping undecodable token window of {} tokens", tokens.len());
        String::new()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Lossless tokenizer that treats every UTF-8 byte as one token.
pub struct ByteTokenizer;

impl Tokenizer for ByteTokenizer {
    fn encode(&self, text: &str) -> Vec<u32> {
        text.bytes().map(u32::from).collect()
    }

    fn decode(&self, tokens: &[u32]) -> String {
        let bytes: Vec<u8> = tokens.iter().map(|&t| t as u8).collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    fn name(&self) -> &str {
        "bytes"
    }
}
