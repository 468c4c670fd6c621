//! Plain-text extraction from fetched HTML.
//!
//! The page is scanned as a token stream with `lol_html`; no document tree is
//! built. Every text node outside `<script>`/`<style>` is entity-decoded,
//! trimmed, and written as its own line when non-empty, so inline runs such
//! as `Hello <b>World</b>` become two lines. That keeps later diffs aligned
//! with the page's natural content boundaries.
//!
//! Extraction never fails the caller: malformed input degrades to whatever
//! text was recovered, and a tokenizer error degrades to an empty result.

pub mod charset;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use html_escape::decode_html_entities;
use lol_html::html_content::Element;
use lol_html::{HtmlRewriter, OutputSink, Settings, doc_text, element};
use thiserror::Error;

/// Extract normalized text from a raw body and its `Content-Type` header.
pub fn extract_text(body: &[u8], content_type: &str) -> String {
    let decoded = charset::decode(content_type, body);

    let mut extractor = TextExtractor::new();
    let result = extractor
        .write(decoded.as_bytes())
        .and_then(|()| extractor.finish());

    match result {
        Ok(text) => text,
        Err(e) => {
            log::warn!("Text extraction failed, treating page as empty: {e}");
            String::new()
        }
    }
}

/// Whether text tokens are currently kept or discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum TextMode {
    #[default]
    Emit,
    /// Inside `<script>` or `<style>`
    Suppress,
}

#[derive(Debug, Default)]
struct ScanState {
    mode: TextMode,
    /// Raw text of the current text node, which may arrive in several chunks
    pending: String,
    output: String,
}

impl ScanState {
    fn flush_pending(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let decoded = decode_html_entities(&self.pending);
        let line = decoded.trim();
        if !line.is_empty() {
            self.output.push_str(line);
            self.output.push('\n');
        }
        self.pending.clear();
    }
}

fn lock(state: &Mutex<ScanState>) -> MutexGuard<'_, ScanState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Streaming UTF-8 HTML to text scanner.
pub struct TextExtractor {
    rewriter: HtmlRewriter<'static, NoopSink>,
    state: Arc<Mutex<ScanState>>,
}

impl TextExtractor {
    pub fn new() -> Self {
        let state = Arc::new(Mutex::new(ScanState::default()));
        let element_state = Arc::clone(&state);
        let text_state = Arc::clone(&state);

        let suppress_handler = element!("script, style", move |el: &mut Element<'_, '_>| {
            lock(&element_state).mode = TextMode::Suppress;

            let end_state = Arc::clone(&element_state);
            if let Some(handlers) = el.end_tag_handlers() {
                handlers.push(Box::new(move |_end| {
                    lock(&end_state).mode = TextMode::Emit;
                    Ok(())
                }));
            }
            Ok(())
        });

        let text_handler = doc_text!(move |chunk| {
            let mut state = lock(&text_state);
            if state.mode == TextMode::Emit {
                state.pending.push_str(chunk.as_str());
            }
            if chunk.last_in_text_node() {
                state.flush_pending();
            }
            Ok(())
        });

        let rewriter = HtmlRewriter::new(
            Settings {
                element_content_handlers: vec![suppress_handler],
                document_content_handlers: vec![text_handler],
                strict: false,
                ..Settings::default()
            },
            NoopSink,
        );

        Self { rewriter, state }
    }

    /// Feed a chunk of UTF-8 markup.
    pub fn write(&mut self, chunk: &[u8]) -> Result<(), ExtractError> {
        self.rewriter.write(chunk)?;
        Ok(())
    }

    /// Finish the stream and return the collected text.
    pub fn finish(self) -> Result<String, ExtractError> {
        let TextExtractor { rewriter, state } = self;
        rewriter.end()?;

        let state = Arc::try_unwrap(state).map_err(|_| ExtractError::CollectorInUse)?;
        let mut state = state.into_inner().unwrap_or_else(PoisonError::into_inner);
        if state.mode == TextMode::Emit {
            state.flush_pending();
        }
        Ok(state.output)
    }
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors surfaced while scanning markup.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The tokenizer gave up on the input.
    #[error("html rewrite error: {0}")]
    Rewrite(#[from] lol_html::errors::RewritingError),

    /// Handler state still had outstanding references.
    #[error("text collector still in use")]
    CollectorInUse,
}

pub struct NoopSink;

impl OutputSink for NoopSink {
    fn handle_chunk(&mut self, _chunk: &[u8]) {}
}
