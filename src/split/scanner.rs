#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum State {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    /// `[identifier]`
    Bracketed,
    /// `` `identifier` ``
    Backticked,
    LineComment,
    BlockComment,
}

pub(super) fn is_line_comment_start(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'-') && bytes.get(idx + 1) == Some(&b'-')
}

pub(super) fn is_block_comment_start(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'/') && bytes.get(idx + 1) == Some(&b'*')
}

pub(super) fn is_block_comment_end(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'*') && bytes.get(idx + 1) == Some(&b'/')
}

pub(super) fn is_word_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b >= 0x80
}

/// End index (exclusive) of the word starting at `start`.
pub(super) fn scan_word(bytes: &[u8], start: usize) -> usize {
    let mut idx = start;
    while idx < bytes.len() && is_word_byte(bytes[idx]) {
        idx += 1;
    }
    idx
}

/// Tracks `CREATE [TEMP] TRIGGER ... BEGIN ... END` so semicolons inside a
/// trigger body do not end the statement.
#[derive(Debug, Default)]
pub(super) struct BlockTracker {
    words_seen: usize,
    creates: bool,
    trigger: bool,
    depth: u32,
}

impl BlockTracker {
    pub(super) fn observe(&mut self, word: &str) {
        let index = self.words_seen;
        self.words_seen += 1;
        if index == 0 {
            self.creates = word.eq_ignore_ascii_case("create");
            return;
        }
        if self.creates && index <= 2 && word.eq_ignore_ascii_case("trigger") {
            self.trigger = true;
            return;
        }
        if !self.trigger {
            return;
        }
        if word.eq_ignore_ascii_case("begin") || word.eq_ignore_ascii_case("case") {
            self.depth += 1;
        } else if word.eq_ignore_ascii_case("end") {
            self.depth = self.depth.saturating_sub(1);
        }
    }

    pub(super) fn in_block(&self) -> bool {
        self.depth > 0
    }
}
