//! Split a SQL script into individual statements.
//!
//! rusqlite prepares one statement at a time, so scripts such as
//! `INSERT ...; SELECT last_insert_rowid();` are cut on `;` before
//! execution. Semicolons inside string literals, quoted identifiers,
//! comments and trigger bodies do not split.

mod scanner;

use scanner::{
    BlockTracker, State, is_block_comment_end, is_block_comment_start, is_line_comment_start,
    is_word_start, scan_word,
};

/// Statements of `sql` in order, trimmed and without their terminating `;`.
/// Segments holding only whitespace or comments are dropped.
#[must_use]
pub fn split_statements(sql: &str) -> Vec<&str> {
    let bytes = sql.as_bytes();
    let mut statements = Vec::new();
    let mut state = State::Normal;
    let mut tracker = BlockTracker::default();
    let mut start = 0;
    let mut has_code = false;
    let mut idx = 0;

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => match b {
                b'\'' => {
                    state = State::SingleQuoted;
                    has_code = true;
                }
                b'"' => {
                    state = State::DoubleQuoted;
                    has_code = true;
                }
                b'[' => {
                    state = State::Bracketed;
                    has_code = true;
                }
                b'`' => {
                    state = State::Backticked;
                    has_code = true;
                }
                _ if is_line_comment_start(bytes, idx) => {
                    state = State::LineComment;
                    idx += 1;
                }
                _ if is_block_comment_start(bytes, idx) => {
                    state = State::BlockComment;
                    idx += 1;
                }
                b';' if !tracker.in_block() => {
                    if has_code {
                        statements.push(sql[start..idx].trim());
                    }
                    start = idx + 1;
                    has_code = false;
                    tracker = BlockTracker::default();
                }
                // Parameter names like `@end` are not keywords.
                b'@' | b':' | b'$' | b'?' => {
                    has_code = true;
                    idx = scan_word(bytes, idx + 1) - 1;
                }
                _ if is_word_start(b) => {
                    has_code = true;
                    let end = scan_word(bytes, idx);
                    tracker.observe(&sql[idx..end]);
                    idx = end - 1;
                }
                _ if b.is_ascii_whitespace() => {}
                _ => has_code = true,
            },
            State::SingleQuoted => {
                if b == b'\'' {
                    if bytes.get(idx + 1) == Some(&b'\'') {
                        idx += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::DoubleQuoted => {
                if b == b'"' {
                    if bytes.get(idx + 1) == Some(&b'"') {
                        idx += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::Bracketed => {
                if b == b']' {
                    state = State::Normal;
                }
            }
            State::Backticked => {
                if b == b'`' {
                    if bytes.get(idx + 1) == Some(&b'`') {
                        idx += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment => {
                if is_block_comment_end(bytes, idx) {
                    state = State::Normal;
                    idx += 1;
                }
            }
        }
        idx += 1;
    }

    if has_code {
        statements.push(sql[start..].trim());
    }
    statements
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_semicolons() {
        let sql = "INSERT INTO t(a) VALUES(@a); SELECT last_insert_rowid();";
        assert_eq!(
            split_statements(sql),
            ["INSERT INTO t(a) VALUES(@a)", "SELECT last_insert_rowid()"]
        );
    }

    #[test]
    fn ignores_semicolons_in_literals_and_comments() {
        let sql = "SELECT 'a;b', \"c;d\", [e;f] -- g;h\nFROM t /* i;j */ WHERE x = 1";
        assert_eq!(split_statements(sql), [sql]);
    }

    #[test]
    fn drops_empty_and_comment_only_segments() {
        let sql = ";; SELECT 1; -- trailing note\n ; /* done */";
        assert_eq!(split_statements(sql), ["SELECT 1"]);
        assert!(split_statements("   ").is_empty());
    }

    #[test]
    fn keeps_trigger_bodies_whole() {
        let sql = "CREATE TRIGGER trg AFTER INSERT ON t BEGIN \
                   UPDATE t SET n = CASE WHEN n IS NULL THEN 0 ELSE n END; \
                   DELETE FROM log; END; SELECT 1";
        let parts = split_statements(sql);
        assert_eq!(parts.len(), 2);
        assert!(parts[0].ends_with("END"));
        assert_eq!(parts[1], "SELECT 1");
    }

    #[test]
    fn begin_outside_triggers_does_not_nest() {
        let sql = "BEGIN DEFERRED; UPDATE t SET a = @end; COMMIT";
        assert_eq!(
            split_statements(sql),
            ["BEGIN DEFERRED", "UPDATE t SET a = @end", "COMMIT"]
        );
    }
}
