//! Hierarchical text chunker.
//!
//! Cascading three-tier splitting strategy:
//! 1. Split at blank-line paragraph boundaries and greedily merge up to the
//!    size budget, carrying a word-aligned overlap between chunks
//! 2. A paragraph that alone exceeds the budget is re-split at sentence
//!    boundaries and packed with the same accumulate+overlap logic
//! 3. A sentence that alone exceeds the budget falls back to word-level
//!    splitting
//!
//! All lengths are measured in characters. Output chunks are trimmed, never
//! empty, and preserve document order.

/// Granularity levels tried in order against the "unit still too long"
/// predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Granularity {
    Paragraph,
    Sentence,
    Word,
}

impl Granularity {
    fn finer(self) -> Option<Granularity> {
        match self {
            Granularity::Paragraph => Some(Granularity::Sentence),
            Granularity::Sentence => Some(Granularity::Word),
            Granularity::Word => None,
        }
    }

    fn joiner(self) -> &'static str {
        match self {
            Granularity::Paragraph => "\n\n",
            Granularity::Sentence | Granularity::Word => " ",
        }
    }

    fn split(self, text: &str) -> Vec<String> {
        match self {
            Granularity::Paragraph => split_paragraphs(text),
            Granularity::Sentence => split_sentences(text),
            Granularity::Word => text.split_whitespace().map(str::to_string).collect(),
        }
    }
}

/// Split `text` into chunks of at most `max_size` characters, with
/// consecutive chunks sharing roughly `max_size * overlap_ratio` characters
/// of word-aligned overlap. The overlap is silently capped at a quarter of
/// `max_size`. Empty or whitespace-only input yields no chunks.
pub fn chunk(text: &str, max_size: usize, overlap_ratio: f32) -> Vec<String> {
    if max_size == 0 || text.trim().is_empty() {
        return Vec::new();
    }

    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");

    let requested = (max_size as f32 * overlap_ratio.max(0.0)) as usize;
    let overlap = requested.min(max_size / 4);

    let paragraphs = Granularity::Paragraph.split(&normalized);
    pack(&paragraphs, max_size, overlap, Granularity::Paragraph)
}

/// Greedily accumulate units into chunks of at most `max_size` characters.
/// Units exceeding the budget on their own descend one granularity level;
/// single words beyond the budget are cut at character boundaries.
fn pack(units: &[String], max_size: usize, overlap: usize, level: Granularity) -> Vec<String> {
    let sep = level.joiner();
    let sep_len = sep.chars().count();

    let mut chunks: Vec<String> = Vec::new();
    let mut buf = String::new();
    let mut buf_len = 0usize;
    // Whether buf holds anything beyond a carried overlap seed. A buffer
    // that is pure overlap is never flushed as a chunk of its own.
    let mut fresh = false;

    for unit in units {
        let unit_len = unit.chars().count();

        if unit_len > max_size {
            if fresh {
                flush(&mut chunks, &mut buf);
            } else {
                buf.clear();
            }
            buf_len = 0;
            fresh = false;

            match level.finer() {
                Some(next) => {
                    let sub_units = next.split(unit);
                    chunks.extend(pack(&sub_units, max_size, overlap, next));
                }
                None => hard_split(unit, max_size, overlap, &mut chunks),
            }

            // Seed the overlap from whatever was emitted last
            if let Some(last) = chunks.last() {
                let seed = overlap_suffix(last, overlap);
                buf_len = seed.chars().count();
                buf = seed;
            }
            continue;
        }

        let candidate = if buf.is_empty() {
            unit_len
        } else {
            buf_len + sep_len + unit_len
        };

        if !buf.is_empty() && candidate > max_size {
            let mut seed = overlap_suffix(&buf, overlap);
            if fresh {
                flush(&mut chunks, &mut buf);
            } else {
                buf.clear();
            }
            // Drop the seed if it would push this unit past the budget
            if !seed.is_empty() && seed.chars().count() + sep_len + unit_len > max_size {
                seed.clear();
            }
            buf_len = seed.chars().count();
            buf = seed;
            fresh = false;
        }

        if !buf.is_empty() {
            buf.push_str(sep);
            buf_len += sep_len;
        }
        buf.push_str(unit);
        buf_len += unit_len;
        fresh = true;
    }

    if fresh {
        flush(&mut chunks, &mut buf);
    }
    chunks
}

fn flush(chunks: &mut Vec<String>, buf: &mut String) {
    let trimmed = buf.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
    buf.clear();
}

/// Last `overlap` characters of `prev`, backed off to the nearest word
/// boundary so the overlap never starts mid-word. Empty when `overlap` is 0
/// or no boundary falls inside the window.
fn overlap_suffix(prev: &str, overlap: usize) -> String {
    if overlap == 0 {
        return String::new();
    }

    let chars: Vec<char> = prev.chars().collect();
    if chars.len() <= overlap {
        return prev.trim_start().to_string();
    }

    let window = &chars[chars.len() - overlap..];
    // Already word-aligned if the cut lands right after whitespace
    let start = if chars[chars.len() - overlap - 1].is_whitespace() {
        0
    } else {
        match window.iter().position(|c| c.is_whitespace()) {
            Some(pos) => pos + 1,
            None => return String::new(),
        }
    };

    window[start..].iter().collect::<String>().trim_start().to_string()
}

/// Last resort for a single word longer than the budget: cut at character
/// boundaries, stepping by `max_size - overlap` so the overlap rule still
/// holds.
fn hard_split(word: &str, max_size: usize, overlap: usize, chunks: &mut Vec<String>) {
    let chars: Vec<char> = word.chars().collect();
    let step = (max_size - overlap.min(max_size - 1)).max(1);

    let mut start = 0;
    while start < chars.len() {
        let end = (start + max_size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }
}

fn split_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join("\n").trim().to_string());
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join("\n").trim().to_string());
    }

    paragraphs.retain(|p| !p.is_empty());
    paragraphs
}

/// Split at `.`/`!`/`?` followed by whitespace and an uppercase letter.
/// The uppercase requirement keeps abbreviations ("e.g. foo", "Dr. Smith")
/// inside one sentence.
fn split_sentences(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut sentences = Vec::new();
    let mut start = 0;

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if matches!(c, '.' | '!' | '?') {
            // Look past the run of whitespace that follows
            let mut j = i + 1;
            let mut saw_ws = false;
            while j < chars.len() && chars[j].is_whitespace() {
                saw_ws = true;
                j += 1;
            }
            if saw_ws && j < chars.len() && chars[j].is_uppercase() {
                let sentence: String = chars[start..=i].iter().collect();
                let sentence = sentence.trim();
                if !sentence.is_empty() {
                    sentences.push(sentence.to_string());
                }
                start = j;
                i = j;
                continue;
            }
        }
        i += 1;
    }

    if start < chars.len() {
        let tail: String = chars[start..].iter().collect();
        let tail = tail.trim();
        if !tail.is_empty() {
            sentences.push(tail.to_string());
        }
    }

    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert!(chunk("", 100, 0.1).is_empty());
        assert!(chunk("   \n\n  \t ", 100, 0.1).is_empty());
    }

    #[test]
    fn test_zero_max_size() {
        assert!(chunk("some text", 0, 0.1).is_empty());
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = chunk("Alpha. Beta. Gamma.", 1000, 0.1);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], "Alpha. Beta. Gamma.");
    }

    #[test]
    fn test_no_chunk_exceeds_max_size() {
        let text: String = (0..200)
            .map(|i| format!("Sentence number {i} contains several words of filler content."))
            .collect::<Vec<_>>()
            .join(" ");
        for max in [80, 200, 500] {
            for chunks in [chunk(&text, max, 0.0), chunk(&text, max, 0.2)] {
                assert!(!chunks.is_empty());
                for c in &chunks {
                    assert!(
                        c.chars().count() <= max,
                        "chunk of {} chars exceeds max {max}",
                        c.chars().count()
                    );
                }
            }
        }
    }

    #[test]
    fn test_no_empty_chunks() {
        let text = "First paragraph.\n\n\n\n\nSecond paragraph.\n\n   \n\nThird.";
        let chunks = chunk(text, 50, 0.1);
        assert!(chunks.iter().all(|c| !c.trim().is_empty()));
    }

    #[test]
    fn test_paragraphs_merge_under_budget() {
        let text = "Para one.\n\nPara two.\n\nPara three.";
        let chunks = chunk(text, 1000, 0.1);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].contains("Para one."));
        assert!(chunks[0].contains("Para three."));
    }

    #[test]
    fn test_paragraphs_split_over_budget() {
        let p1 = "alpha ".repeat(20); // 120 chars
        let p2 = "beta ".repeat(20); // 100 chars
        let text = format!("{}\n\n{}", p1.trim(), p2.trim());
        let chunks = chunk(&text, 150, 0.0);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].contains("alpha"));
        assert!(chunks[1].contains("beta"));
    }

    #[test]
    fn test_oversized_paragraph_splits_at_sentences() {
        let text = (0..30)
            .map(|i| format!("This is sentence {i} with some words."))
            .collect::<Vec<_>>()
            .join(" ");
        let chunks = chunk(&text, 120, 0.0);
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(c.chars().count() <= 120);
        }
        // Sentences stay whole at this granularity
        assert!(chunks[0].starts_with("This is sentence 0"));
    }

    #[test]
    fn test_abbreviations_not_split() {
        let sentences = split_sentences("See e.g. the appendix. Another thought here.");
        assert_eq!(sentences.len(), 2);
        assert_eq!(sentences[0], "See e.g. the appendix.");
    }

    #[test]
    fn test_sentence_boundary_requires_uppercase() {
        let sentences = split_sentences("version 2.5 is out. next one pending");
        // "2.5 is" and ". next" both lack the uppercase follower
        assert_eq!(sentences.len(), 1);
    }

    #[test]
    fn test_sentence_boundary_exclamation_question() {
        let sentences = split_sentences("Really! Are you sure? Yes.");
        assert_eq!(sentences.len(), 3);
    }

    #[test]
    fn test_oversized_sentence_falls_back_to_words() {
        let text = "word ".repeat(100).trim().to_string(); // one long "sentence"
        let chunks = chunk(&text, 60, 0.0);
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(c.chars().count() <= 60);
            assert!(!c.is_empty());
        }
    }

    #[test]
    fn test_giant_single_word_hard_split() {
        let text = "x".repeat(250);
        let chunks = chunk(&text, 100, 0.0);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 100));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_overlap_is_word_aligned_and_shared() {
        let text = (0..40)
            .map(|i| format!("Sentence {i} holds a handful of words."))
            .collect::<Vec<_>>()
            .join(" ");
        let chunks = chunk(&text, 200, 0.2);
        assert!(chunks.len() >= 2);
        for pair in chunks.windows(2) {
            let prev = &pair[0];
            let next = &pair[1];
            // The next chunk starts with a suffix of the previous chunk
            let overlap_words: Vec<&str> = next.split_whitespace().take(2).collect();
            assert!(
                prev.contains(&overlap_words.join(" ")),
                "expected overlap between {prev:?} and {next:?}"
            );
            // And that overlap starts at a word boundary
            let first = next.split_whitespace().next().unwrap();
            assert!(prev.split_whitespace().any(|w| w == first));
        }
    }

    #[test]
    fn test_overlap_capped_at_quarter() {
        // Requesting 90% overlap must not loop forever or exceed the cap
        let text = "word ".repeat(200).trim().to_string();
        let chunks = chunk(&text, 100, 0.9);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 100));
    }

    #[test]
    fn test_zero_overlap_reconstructs_content() {
        let text = (0..50)
            .map(|i| format!("Token{i}"))
            .collect::<Vec<_>>()
            .join(" ");
        let chunks = chunk(&text, 80, 0.0);
        let rejoined = chunks.join(" ");
        for i in 0..50 {
            assert!(rejoined.contains(&format!("Token{i}")));
        }
    }

    #[test]
    fn test_rechunking_a_chunk_is_identity() {
        let text = (0..30)
            .map(|i| format!("Sentence {i} with filler words inside."))
            .collect::<Vec<_>>()
            .join(" ");
        for c in chunk(&text, 150, 0.1) {
            let again = chunk(&c, 150, 0.1);
            assert_eq!(again, vec![c]);
        }
    }

    #[test]
    fn test_crlf_normalized() {
        let text = "Para one.\r\n\r\nPara two.";
        let chunks = chunk(text, 15, 0.0);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], "Para one.");
        assert_eq!(chunks[1], "Para two.");
    }

    #[test]
    fn test_document_order_preserved() {
        let text = "Aaa first.\n\nBbb second.\n\nCcc third.";
        let chunks = chunk(text, 14, 0.0);
        assert_eq!(chunks, vec!["Aaa first.", "Bbb second.", "Ccc third."]);
    }

    #[test]
    fn test_overlap_suffix_word_boundary() {
        // window "own fox" starts mid-word, backed off to "fox"
        assert_eq!(overlap_suffix("the quick brown fox", 7), "fox");
        // window "wn fox" backed off to "fox"
        assert_eq!(overlap_suffix("the quick brown fox", 6), "fox");
        // cut right after a space keeps the whole window
        assert_eq!(overlap_suffix("the quick fox", 3), "fox");
        // no boundary inside the window
        assert_eq!(overlap_suffix("supercalifragilistic", 5), "");
        // zero overlap
        assert_eq!(overlap_suffix("anything", 0), "");
    }
}
