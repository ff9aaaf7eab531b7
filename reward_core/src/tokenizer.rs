/// Decoding half of the tokenizer collaborator.
///
/// No failure contract: an implementation that cannot decode returns whatever
/// text it can (possibly empty) and the scorer judges that text.
pub trait Tokenizer: Send + Sync {
    fn decode(&self, ids: &[u32], skip_special_tokens: bool) -> String;
}

impl<F> Tokenizer for F
where
    F: Fn(&[u32], bool) -> String + Send + Sync,
{
    fn decode(&self, ids: &[u32], skip_special_tokens: bool) -> String {
        self(ids, skip_special_tokens)
    }
}

#[cfg(feature = "hf-tokenizers")]
impl Tokenizer for tokenizers::Tokenizer {
    fn decode(&self, ids: &[u32], skip_special_tokens: bool) -> String {
        match tokenizers::Tokenizer::decode(self, ids, skip_special_tokens) {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!(%e, tokens = ids.len(), "tokenizer decode failed");
                String::new()
            }
        }
    }
}
