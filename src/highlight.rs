//! Syntax-highlight adapter.
//!
//! The renderer hands every freshly built code block to `HighlightAdapter::apply`
//! before emitting HTML. The adapter normalizes the language class and invokes
//! the configured `Highlighter` once per block; the block's mark (rendered as the
//! `data-hl` attribute) records that it has been handled.

use std::sync::Arc;

pub const PLAINTEXT_CLASS: &str = "language-plaintext";

/// Language tag (lowercase) → highlight.js class.
const LANGUAGE_CLASSES: &[(&str, &str)] = &[
    ("swift", "language-swift"),
    ("kotlin", "language-kotlin"),
    ("kt", "language-kotlin"),
    ("java", "language-java"),
    ("objc", "language-objectivec"),
    ("objectivec", "language-objectivec"),
    ("objective-c", "language-objectivec"),
    ("dart", "language-dart"),
    ("js", "language-javascript"),
    ("javascript", "language-javascript"),
    ("jsx", "language-javascript"),
    ("ts", "language-typescript"),
    ("typescript", "language-typescript"),
    ("tsx", "language-typescript"),
    ("py", "language-python"),
    ("python", "language-python"),
    ("rb", "language-ruby"),
    ("ruby", "language-ruby"),
    ("go", "language-go"),
    ("golang", "language-go"),
    ("rs", "language-rust"),
    ("rust", "language-rust"),
    ("c", "language-c"),
    ("h", "language-c"),
    ("cpp", "language-cpp"),
    ("c++", "language-cpp"),
    ("cs", "language-csharp"),
    ("c#", "language-csharp"),
    ("csharp", "language-csharp"),
    ("php", "language-php"),
    ("sh", "language-bash"),
    ("bash", "language-bash"),
    ("shell", "language-bash"),
    ("zsh", "language-bash"),
    ("json", "language-json"),
    ("yaml", "language-yaml"),
    ("yml", "language-yaml"),
    ("xml", "language-xml"),
    ("html", "language-xml"),
    ("css", "language-css"),
    ("sql", "language-sql"),
    ("gradle", "language-gradle"),
    ("groovy", "language-groovy"),
    ("text", PLAINTEXT_CLASS),
    ("txt", PLAINTEXT_CLASS),
    ("plain", PLAINTEXT_CLASS),
    ("plaintext", PLAINTEXT_CLASS),
];

/// Class for a fence tag: table hit, else `language-<tag>` lowercased, else plaintext.
pub fn language_class(tag: Option<&str>) -> String {
    let tag = match tag.map(str::trim) {
        Some(t) if !t.is_empty() => t.to_lowercase(),
        _ => return PLAINTEXT_CLASS.to_string(),
    };
    LANGUAGE_CLASSES
        .iter()
        .find(|(name, _)| *name == tag)
        .map(|(_, class)| class.to_string())
        .unwrap_or_else(|| format!("language-{tag}"))
}

/// Highlighting state of a block, rendered as `data-hl`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HighlightMark {
    Unmarked,
    /// Handed to the browser-side highlighter, which colors it once and flips it to done.
    Queued,
    Done,
}

impl HighlightMark {
    pub fn attr(self) -> Option<&'static str> {
        match self {
            HighlightMark::Unmarked => None,
            HighlightMark::Queued => Some("queued"),
            HighlightMark::Done => Some("done"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CodeBlock {
    pub tag: Option<String>,
    pub classes: Vec<String>,
    pub source: String,
    /// Pre-rendered markup from a server-side highlighter; escaped `source` otherwise.
    pub html: Option<String>,
    pub mark: HighlightMark,
}

impl CodeBlock {
    pub fn new(tag: Option<&str>, source: &str) -> Self {
        Self {
            tag: tag.map(str::to_string),
            classes: Vec::new(),
            source: source.to_string(),
            html: None,
            mark: HighlightMark::Unmarked,
        }
    }

    pub fn class_attr(&self) -> String {
        self.classes.join(" ")
    }

    fn has_language_class(&self) -> bool {
        self.classes.iter().any(|c| c.starts_with("language-"))
    }
}

/// The external highlighter. Called at most once per block.
pub trait Highlighter: Send + Sync {
    fn highlight(&self, block: &mut CodeBlock);
}

/// Leaves token coloring to highlight.js in the browser: tags the block with the
/// theme class and queues it.
#[derive(Debug, Default)]
pub struct HljsHighlighter;

impl Highlighter for HljsHighlighter {
    fn highlight(&self, block: &mut CodeBlock) {
        if !block.classes.iter().any(|c| c == "hljs") {
            block.classes.push("hljs".into());
        }
        block.mark = HighlightMark::Queued;
    }
}

#[derive(Clone)]
pub struct HighlightAdapter {
    highlighter: Arc<dyn Highlighter>,
}

impl HighlightAdapter {
    pub fn new(highlighter: Arc<dyn Highlighter>) -> Self {
        Self { highlighter }
    }

    /// Ensure a language class and highlight every unmarked block. Returns how
    /// many blocks were handed to the highlighter; marked blocks are skipped, so
    /// calling this again is harmless.
    pub fn apply<'a, I>(&self, blocks: I) -> usize
    where
        I: IntoIterator<Item = &'a mut CodeBlock>,
    {
        let mut invoked = 0;
        for block in blocks {
            if block.mark != HighlightMark::Unmarked {
                continue;
            }
            if !block.has_language_class() {
                block.classes.insert(0, language_class(block.tag.as_deref()));
            }
            self.highlighter.highlight(block);
            if block.mark == HighlightMark::Unmarked {
                block.mark = HighlightMark::Done;
            }
            invoked += 1;
        }
        invoked
    }
}

impl Default for HighlightAdapter {
    fn default() -> Self {
        Self::new(Arc::new(HljsHighlighter))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts invocations; leaves the mark alone so the adapter sets `Done`.
    #[derive(Default)]
    pub(crate) struct CountingHighlighter {
        pub calls: AtomicUsize,
    }

    impl Highlighter for CountingHighlighter {
        fn highlight(&self, _block: &mut CodeBlock) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn table_hits_and_aliases() {
        assert_eq!(language_class(Some("swift")), "language-swift");
        assert_eq!(language_class(Some("KT")), "language-kotlin");
        assert_eq!(language_class(Some("objc")), "language-objectivec");
        assert_eq!(language_class(Some("c#")), "language-csharp");
    }

    #[test]
    fn missing_tag_is_plaintext() {
        assert_eq!(language_class(None), PLAINTEXT_CLASS);
        assert_eq!(language_class(Some("  ")), PLAINTEXT_CLASS);
    }

    #[test]
    fn unknown_tag_falls_back_verbatim_lowercase() {
        assert_eq!(language_class(Some("Elixir")), "language-elixir");
        assert_eq!(language_class(Some("zig")), "language-zig");
    }

    #[test]
    fn adapter_highlights_each_block_once() {
        let counter = Arc::new(CountingHighlighter::default());
        let adapter = HighlightAdapter::new(counter.clone());
        let mut blocks = vec![CodeBlock::new(Some("swift"), "let a = 1"), CodeBlock::new(None, "x")];

        assert_eq!(adapter.apply(blocks.iter_mut()), 2);
        assert_eq!(adapter.apply(blocks.iter_mut()), 0);
        assert_eq!(counter.calls.load(Ordering::SeqCst), 2);
        assert_eq!(blocks[0].classes, vec!["language-swift".to_string()]);
        assert_eq!(blocks[1].classes, vec![PLAINTEXT_CLASS.to_string()]);
        assert!(blocks.iter().all(|b| b.mark == HighlightMark::Done));
    }

    #[test]
    fn newly_added_block_is_picked_up_alone() {
        let counter = Arc::new(CountingHighlighter::default());
        let adapter = HighlightAdapter::new(counter.clone());
        let mut blocks = vec![CodeBlock::new(Some("go"), "package main")];
        adapter.apply(blocks.iter_mut());
        blocks.push(CodeBlock::new(Some("rust"), "fn main() {}"));
        assert_eq!(adapter.apply(blocks.iter_mut()), 1);
        assert_eq!(counter.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn hljs_highlighter_queues_for_browser() {
        let adapter = HighlightAdapter::default();
        let mut block = CodeBlock::new(Some("kotlin"), "val a = 1");
        adapter.apply(std::iter::once(&mut block));
        assert_eq!(block.mark, HighlightMark::Queued);
        assert_eq!(block.class_attr(), "language-kotlin hljs");
    }
}
