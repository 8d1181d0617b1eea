use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

/// Highlight tier for a hard-to-read sentence. The serialized form doubles as
/// the decoration class name on the rendering side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warn,
    Danger,
}

impl Severity {
    pub fn class_name(self) -> &'static str {
        match self {
            Severity::Warn => "warn",
            Severity::Danger => "danger",
        }
    }
}

/// A half-open `[from, to)` range of absolute document offsets flagged as a
/// readability concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RiskSpan {
    pub from: usize,
    pub to: usize,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Keyword {
    pub word: String,
    /// Share of all words, in percent, rounded to one decimal.
    pub density: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticsSnapshot {
    pub words: usize,
    pub characters: usize,
    pub characters_with_formatting: usize,
    pub sentences: usize,
    pub paragraphs: usize,
    pub reading_time: String,
    pub speaking_time: String,
    pub reading_grade: String,
    pub keywords: Vec<Keyword>,
}

/// One sentence-like run inside a block, borrowed from the block text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sentence<'a> {
    /// The untrimmed run, trailing terminators included.
    pub raw: &'a str,
    pub trimmed: &'a str,
    /// Byte offset of the run within the block text.
    pub offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Paragraph,
    Heading,
    ListItem,
    BulletList,
    Blockquote,
}

/// One node of the host document tree. Leaf kinds carry flattened text,
/// container kinds carry children. The engine reads a snapshot and never
/// mutates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockKind,
    pub text: String,
    pub children: Vec<Block>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub blocks: Vec<Block>,
}

/// Absolute offset range of the host's current selection. `from == to` means
/// no selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub from: usize,
    pub to: usize,
}

impl Selection {
    pub fn new(from: usize, to: usize) -> Self {
        Self { from, to }
    }

    pub fn none() -> Self {
        Self { from: 0, to: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.from == self.to
    }
}

// ---------------------------------------------------------------------------
// Tunables
// ---------------------------------------------------------------------------

struct Tunables {
    word_weight: f64,
    syllable_weight: f64,
    punctuation_weight: f64,
    warn_threshold: f64,
    danger_threshold: f64,
    short_word_max_len: usize,
    reading_wpm: f64,
    speaking_wpm: f64,
    keyword_cap: usize,
    grade_sentence_weight: f64,
    grade_syllable_weight: f64,
    grade_offset: f64,
}

static TUNING: Tunables = Tunables {
    word_weight: 0.5,
    syllable_weight: 10.0,
    punctuation_weight: 2.0,
    warn_threshold: 25.0,
    danger_threshold: 35.0,
    short_word_max_len: 3,
    reading_wpm: 238.0,
    speaking_wpm: 158.0,
    keyword_cap: 10,
    grade_sentence_weight: 0.39,
    grade_syllable_weight: 11.8,
    grade_offset: 15.59,
};

/// Rendered in place of a reading grade when the formula has nothing to say.
pub const GRADE_UNAVAILABLE: &str = "N/A";

// ---------------------------------------------------------------------------
// Compiled patterns
// ---------------------------------------------------------------------------

// One or more non-terminator characters plus any trailing terminators.
static SENTENCE_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^.!?]+[.!?]*").unwrap());

// A run of one or two consecutive vowels counts as one syllable nucleus.
static VOWEL_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[aeiouy]{1,2}").unwrap());

// ---------------------------------------------------------------------------
// Stop words
// ---------------------------------------------------------------------------

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "the", "and", "a", "to", "of", "in", "is", "it", "that", "on", "for", "with", "as", "at",
        "this", "by", "an", "be", "are", "from", "or", "was", "were", "but", "not",
    ]
    .into_iter()
    .collect()
});

// ---------------------------------------------------------------------------
// Lexical metrics
// ---------------------------------------------------------------------------

/// Estimate the syllable count of a single word.
///
/// Vowel-run counting with the usual silent-e and `-le` adjustments. This is
/// a heuristic approximation, not a dictionary lookup; it misjudges plenty of
/// real words but is stable and close enough for readability scoring.
pub fn count_syllables(word: &str) -> usize {
    let cleaned: String = word
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase())
        .collect();
    if cleaned.is_empty() {
        return 0;
    }
    if cleaned.len() <= TUNING.short_word_max_len {
        return 1;
    }
    let mut count = VOWEL_RUN_RE.find_iter(&cleaned).count();
    if cleaned.ends_with('e') {
        count = count.saturating_sub(1);
    }
    if cleaned.ends_with("le") {
        count += 1;
    }
    count.max(1)
}

/// Split on whitespace runs. Empty input yields an empty sequence.
pub fn tokenize_words(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

pub fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(token.to_lowercase().as_str())
}

/// Lower-case and keep only `[a-z0-9]`. May yield an empty string; callers
/// must exclude empties from frequency tallies.
pub fn normalize_for_frequency(word: &str) -> String {
    word.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}

// ---------------------------------------------------------------------------
// Sentence segmentation
// ---------------------------------------------------------------------------

/// Split a block's flattened text into sentence-like runs.
///
/// A run is one or more non-terminator characters plus any trailing `.` `!`
/// `?`. Match offsets are byte offsets into `text`. Runs that trim to nothing
/// still consume their bytes, so the surviving sentences stay disjoint and in
/// order; every character of the input is either inside a run or part of the
/// whitespace remainder between runs.
pub fn segment_sentences(text: &str) -> Vec<Sentence<'_>> {
    SENTENCE_RUN_RE
        .find_iter(text)
        .filter_map(|m| {
            let trimmed = m.as_str().trim();
            if trimmed.is_empty() {
                return None;
            }
            Some(Sentence {
                raw: m.as_str(),
                trimmed,
                offset: m.start(),
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Risk scoring
// ---------------------------------------------------------------------------

fn sentence_score(trimmed: &str) -> f64 {
    let words = tokenize_words(trimmed);
    let word_count = words.len();
    let syllable_total: usize = words.iter().map(|w| count_syllables(w)).sum();
    let avg_syllables = syllable_total as f64 / word_count.max(1) as f64;
    let punctuation = trimmed
        .chars()
        .filter(|c| matches!(c, ',' | ';' | ':' | '\u{2014}' | '\u{2013}'))
        .count();
    word_count as f64 * TUNING.word_weight
        + avg_syllables * TUNING.syllable_weight
        + punctuation as f64 * TUNING.punctuation_weight
}

/// Classify a trimmed sentence into a highlight tier, or `None` when it is
/// unremarkable. Length, polysyllabic vocabulary, and clause punctuation
/// (`, ; :` and dashes) all push the score up.
pub fn classify_sentence(trimmed: &str) -> Option<Severity> {
    let score = sentence_score(trimmed);
    if score >= TUNING.danger_threshold {
        Some(Severity::Danger)
    } else if score >= TUNING.warn_threshold {
        Some(Severity::Warn)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Document model
// ---------------------------------------------------------------------------

impl Block {
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self {
            kind: BlockKind::Paragraph,
            text: text.into(),
            children: Vec::new(),
        }
    }

    pub fn heading(text: impl Into<String>) -> Self {
        Self {
            kind: BlockKind::Heading,
            text: text.into(),
            children: Vec::new(),
        }
    }

    pub fn list_item(text: impl Into<String>) -> Self {
        Self {
            kind: BlockKind::ListItem,
            text: text.into(),
            children: Vec::new(),
        }
    }

    pub fn bullet_list(children: Vec<Block>) -> Self {
        Self {
            kind: BlockKind::BulletList,
            text: String::new(),
            children,
        }
    }

    pub fn blockquote(children: Vec<Block>) -> Self {
        Self {
            kind: BlockKind::Blockquote,
            text: String::new(),
            children,
        }
    }

    /// Text-bearing leaf; the only kind the heat map analyzes.
    pub fn is_text_block(&self) -> bool {
        self.children.is_empty()
            && matches!(
                self.kind,
                BlockKind::Paragraph | BlockKind::Heading | BlockKind::ListItem
            )
    }

    /// Structural block; counts toward paragraph counting. Inline content is
    /// not modeled, so every node qualifies.
    pub fn is_block(&self) -> bool {
        true
    }

    /// Size in document positions: one opening and one closing position plus
    /// the content between them.
    fn node_size(&self) -> usize {
        if self.is_text_block() {
            self.text.len() + 2
        } else {
            2 + self.children.iter().map(Block::node_size).sum::<usize>()
        }
    }
}

impl Document {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    /// Build a document from plain text: one paragraph per blank-line
    /// separated chunk, inner line breaks collapsed to spaces.
    pub fn from_plain_text(text: &str) -> Self {
        let blocks = text
            .split("\n\n")
            .map(str::trim)
            .filter(|chunk| !chunk.is_empty())
            .map(|chunk| Block::paragraph(chunk.split_whitespace().collect::<Vec<_>>().join(" ")))
            .collect();
        Self { blocks }
    }

    /// Depth-first traversal paired with each block's absolute start offset.
    ///
    /// A block occupies one opening position, its content, and one closing
    /// position; the first top-level block starts at offset 0, so a leaf's
    /// text content begins at `start + 1`.
    pub fn walk(&self) -> Vec<(&Block, usize)> {
        fn visit<'a>(blocks: &'a [Block], mut pos: usize, out: &mut Vec<(&'a Block, usize)>) {
            for block in blocks {
                out.push((block, pos));
                visit(&block.children, pos + 1, out);
                pos += block.node_size();
            }
        }
        let mut out = Vec::new();
        visit(&self.blocks, 0, &mut out);
        out
    }

    /// Flattened text of every text block, blocks joined with newlines.
    pub fn full_text(&self) -> String {
        let parts: Vec<&str> = self
            .walk()
            .into_iter()
            .filter(|(block, _)| block.is_text_block())
            .map(|(block, _)| block.text.as_str())
            .collect();
        parts.join("\n")
    }

    /// Text content intersecting the absolute range `[from, to)`, pieces from
    /// different blocks joined with newlines.
    pub fn text_between(&self, from: usize, to: usize) -> String {
        let mut parts: Vec<&str> = Vec::new();
        for (block, start) in self.walk() {
            if !block.is_text_block() {
                continue;
            }
            let content_start = start + 1;
            let content_end = content_start + block.text.len();
            let lo = from.max(content_start);
            let hi = to.min(content_end);
            if lo >= hi {
                continue;
            }
            let lo = snap_to_char_boundary(&block.text, lo - content_start, false);
            let hi = snap_to_char_boundary(&block.text, hi - content_start, true);
            parts.push(&block.text[lo..hi]);
        }
        parts.join("\n")
    }
}

/// Snap a byte offset to a valid char boundary.
/// If `forward` is true, snap forward; otherwise snap backward.
fn snap_to_char_boundary(text: &str, pos: usize, forward: bool) -> usize {
    if pos >= text.len() {
        return text.len();
    }
    let mut pos = pos;
    if forward {
        while pos < text.len() && !text.is_char_boundary(pos) {
            pos += 1;
        }
    } else {
        while pos > 0 && !text.is_char_boundary(pos) {
            pos -= 1;
        }
    }
    pos
}

// ---------------------------------------------------------------------------
// Heat map
// ---------------------------------------------------------------------------

/// Scan every text block and flag sentences that are hard to read.
///
/// Spans come back in document order with absolute half-open `[from, to)`
/// offsets, disjoint within a block. The whole map is recomputed on every
/// call; results depend only on the snapshot, so repeated invocation is
/// idempotent and always safe. If very large documents ever matter, memoize
/// per block keyed by content rather than caching inside the engine.
pub fn compute_heatmap(document: &Document) -> Vec<RiskSpan> {
    let mut spans = Vec::new();
    for (block, start) in document.walk() {
        if !block.is_text_block() || block.text.is_empty() {
            continue;
        }
        for sentence in segment_sentences(&block.text) {
            if let Some(severity) = classify_sentence(sentence.trimmed) {
                let from = start + 1 + sentence.offset;
                spans.push(RiskSpan {
                    from,
                    to: from + sentence.trimmed.len(),
                    severity,
                });
            }
        }
    }
    spans
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

/// Render a word count as a human-readable duration at the given pace.
pub fn format_time(word_count: usize, wpm: f64) -> String {
    if word_count == 0 {
        return "0 min".to_string();
    }
    let total_seconds = (word_count as f64 / wpm * 60.0).round() as u64;
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;
    if minutes == 0 {
        format!("{seconds} sec")
    } else if seconds == 0 {
        format!("{minutes} min")
    } else {
        format!("{minutes} min {seconds} sec")
    }
}

/// English ordinal: teens take `th`, otherwise the last digit decides.
pub fn ordinal(n: u32) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn keyword_density(words: &[&str]) -> Vec<Keyword> {
    let mut tally: Vec<(String, usize)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for word in words {
        let normalized = normalize_for_frequency(word);
        if normalized.is_empty() || is_stop_word(&normalized) {
            continue;
        }
        match index.get(&normalized) {
            Some(&i) => tally[i].1 += 1,
            None => {
                index.insert(normalized.clone(), tally.len());
                tally.push((normalized, 1));
            }
        }
    }
    // Stable sort keeps first-seen order among equal counts.
    tally.sort_by(|a, b| b.1.cmp(&a.1));
    tally
        .into_iter()
        .take(TUNING.keyword_cap)
        .map(|(word, count)| Keyword {
            word,
            density: round1(count as f64 / words.len() as f64 * 100.0),
        })
        .collect()
}

/// Aggregate counts, timings, reading grade, and keyword ranking.
///
/// `active_text` is the current selection when one exists, the full document
/// text otherwise. The document tree and selection are consulted only for the
/// paragraph count.
pub fn compute_statistics(
    active_text: &str,
    document: &Document,
    selection: Selection,
) -> StatisticsSnapshot {
    let trimmed = active_text.trim();
    if trimmed.is_empty() {
        return StatisticsSnapshot {
            words: 0,
            characters: 0,
            characters_with_formatting: 0,
            sentences: 0,
            paragraphs: 0,
            reading_time: format_time(0, TUNING.reading_wpm),
            speaking_time: format_time(0, TUNING.speaking_wpm),
            reading_grade: GRADE_UNAVAILABLE.to_string(),
            keywords: Vec::new(),
        };
    }

    let words = tokenize_words(trimmed);
    // Count-only pass, no offset tracking; span-accurate segmentation lives
    // in `segment_sentences`.
    let sentences = trimmed
        .split(|c| matches!(c, '.' | '!' | '?'))
        .filter(|piece| !piece.trim().is_empty())
        .count();
    let syllables: usize = words.iter().map(|w| count_syllables(w)).sum();

    let reading_grade = if sentences > 0 {
        let grade = TUNING.grade_sentence_weight * (words.len() as f64 / sentences as f64)
            + TUNING.grade_syllable_weight * (syllables as f64 / words.len() as f64)
            - TUNING.grade_offset;
        if grade > 0.0 {
            ordinal(grade.round().max(1.0) as u32)
        } else {
            GRADE_UNAVAILABLE.to_string()
        }
    } else {
        GRADE_UNAVAILABLE.to_string()
    };

    let paragraphs = if selection.is_empty() {
        document.blocks.len()
    } else {
        document
            .walk()
            .into_iter()
            .filter(|(block, start)| {
                block.is_block()
                    && *start < selection.to
                    && start + block.node_size() > selection.from
            })
            .count()
    };

    StatisticsSnapshot {
        words: words.len(),
        characters: trimmed.chars().filter(|c| !c.is_whitespace()).count(),
        characters_with_formatting: trimmed.chars().count(),
        sentences,
        paragraphs,
        reading_time: format_time(words.len(), TUNING.reading_wpm),
        speaking_time: format_time(words.len(), TUNING.speaking_wpm),
        reading_grade,
        keywords: keyword_density(&words),
    }
}
