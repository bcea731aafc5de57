//! Text preprocessing for speech synthesis.
//!
//! Replies are cleaned of the markdown markers a speech engine would read
//! aloud, then split into fragments no longer than a target length. Sentence
//! boundaries are preferred; words are used when the text has none.

/// Remove markdown that should not be spoken.
///
/// - Links `[label](url)` → `label`
/// - Backticks → removed
/// - Emphasis and heading markers (`*`, `#`) → removed
///
/// Everything else is kept verbatim. Whitespace runs collapse to one space.
#[must_use]
pub fn sanitize(text: &str) -> String {
    let unlinked = strip_links(text);
    let stripped: String = unlinked
        .chars()
        .filter(|c| !matches!(c, '*' | '#' | '`'))
        .collect();
    collapse_whitespace(&stripped)
}

/// Split `text` into speech-friendly fragments of at most `target_size` characters.
///
/// Sentences are packed greedily, joined by a single space. A sentence longer
/// than `target_size` is kept whole rather than cut mid-sentence. Text without
/// any sentence terminator is packed word by word instead.
///
/// Empty or whitespace-only input yields no fragments; no fragment is ever empty.
#[must_use]
pub fn chunk(text: &str, target_size: usize) -> Vec<String> {
    let clean = sanitize(text);
    if clean.is_empty() {
        return Vec::new();
    }

    let sentences = split_sentences(&clean);
    if sentences.len() > 1 || ends_with_terminator(&clean) {
        pack(sentences.iter().map(String::as_str), target_size)
    } else {
        pack(clean.split(' '), target_size)
    }
}

// ── Internal helpers ───────────────────────────────────────────────

const fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

fn ends_with_terminator(text: &str) -> bool {
    text.chars().last().is_some_and(is_terminator)
}

/// Greedily join `units` with single spaces while staying within `target_size`.
fn pack<'a>(units: impl Iterator<Item = &'a str>, target_size: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for unit in units {
        let unit = unit.trim();
        if unit.is_empty() {
            continue;
        }
        let unit_len = unit.chars().count();

        if !current.is_empty() && current_len + 1 + unit_len > target_size {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(unit);
        current_len += unit_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

/// Split at runs of `.` `!` `?` followed by whitespace or the end of text.
///
/// Trailing text after the last terminator becomes its own sentence.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);

        if is_terminator(c) && chars.peek().is_none_or(|next| next.is_whitespace()) {
            let trimmed = current.trim();
            if !trimmed.is_empty() {
                sentences.push(trimmed.to_string());
            }
            current.clear();
        }
    }

    let rest = current.trim();
    if !rest.is_empty() {
        sentences.push(rest.to_string());
    }

    sentences
}

fn strip_links(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '[' {
            let mut label = String::new();
            let mut closed = false;
            for l in chars.by_ref() {
                if l == ']' {
                    closed = true;
                    break;
                }
                label.push(l);
            }

            if closed && chars.peek() == Some(&'(') {
                chars.next(); // consume '('
                let _url: String = chars.by_ref().take_while(|&c| c != ')').collect();
                result.push_str(&label);
                continue;
            }

            // Not a link, emit as-is
            result.push('[');
            result.push_str(&label);
            if closed {
                result.push(']');
            }
        } else {
            result.push(c);
        }
    }

    result
}

fn collapse_whitespace(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut prev_space = false;

    for c in text.chars() {
        if c.is_whitespace() {
            if !prev_space {
                result.push(' ');
                prev_space = true;
            }
        } else {
            result.push(c);
            prev_space = false;
        }
    }

    result.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn without_whitespace(s: &str) -> String {
        s.chars().filter(|c| !c.is_whitespace()).collect()
    }

    #[test]
    fn splits_on_sentence_boundaries() {
        let chunks = chunk("Hello world. This is a test! Is it working?", 20);
        assert_eq!(
            chunks,
            vec!["Hello world.", "This is a test!", "Is it working?"]
        );
    }

    #[test]
    fn packs_short_sentences_together() {
        let chunks = chunk("One. Two. Three. Four.", 200);
        assert_eq!(chunks, vec!["One. Two. Three. Four."]);
    }

    #[test]
    fn empty_and_blank_input() {
        assert!(chunk("", 200).is_empty());
        assert!(chunk("   \n\t ", 200).is_empty());
        assert!(chunk("** ##", 200).is_empty());
    }

    #[test]
    fn trailing_text_is_kept() {
        let chunks = chunk("First sentence. and then no terminator", 20);
        assert_eq!(chunks, vec!["First sentence.", "and then no terminator"]);
    }

    #[test]
    fn falls_back_to_words_without_terminators() {
        let chunks = chunk("alpha beta gamma delta epsilon", 11);
        assert_eq!(chunks, vec!["alpha beta", "gamma delta", "epsilon"]);
    }

    #[test]
    fn long_sentence_stays_whole() {
        let long = "This single sentence is much longer than the tiny target size.";
        let chunks = chunk(&format!("Hi. {long} Bye."), 10);
        assert_eq!(chunks, vec!["Hi.", long, "Bye."]);
    }

    #[test]
    fn terminator_runs_split_once() {
        let chunks = chunk("Really?! Yes... Version 3.5 is out.", 10);
        assert_eq!(chunks, vec!["Really?!", "Yes...", "Version 3.5 is out."]);
    }

    #[test]
    fn sanitize_strips_markdown_markers() {
        assert_eq!(
            sanitize("## Title\n**Bold** and *italic* with `code`."),
            "Title Bold and italic with code."
        );
    }

    #[test]
    fn sanitize_unwraps_links() {
        assert_eq!(
            sanitize("See [the guide](https://example.com/guide) now."),
            "See the guide now."
        );
        assert_eq!(sanitize("Array [1, 2] stays."), "Array [1, 2] stays.");
        assert_eq!(sanitize("Open [bracket"), "Open [bracket");
    }

    #[test]
    fn fragments_reassemble_to_sanitized_text() {
        let text = "# Plan\nFirst, *listen*. Then reflect!  Ask: what did you notice? \
                    Finally summarize the [key points](http://x.y) without judgement";
        let clean = sanitize(text);
        for size in [5, 20, 50, 200] {
            let chunks = chunk(text, size);
            assert!(chunks.iter().all(|c| !c.trim().is_empty()));
            assert_eq!(
                without_whitespace(&chunks.concat()),
                without_whitespace(&clean)
            );
        }
    }

    #[test]
    fn fragments_respect_target_unless_atomic() {
        let text = "Short one. A considerably longer second sentence follows here. Tiny.";
        let sentences = split_sentences(&sanitize(text));
        for c in chunk(text, 30) {
            assert!(c.chars().count() <= 30 || sentences.contains(&c));
        }
    }

    #[test]
    fn counts_characters_not_bytes() {
        let chunks = chunk("Café crème. Ça va?", 11);
        assert_eq!(chunks, vec!["Café crème.", "Ça va?"]);
    }
}
