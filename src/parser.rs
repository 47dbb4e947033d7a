//! Splitting a decoded command string into an argument vector.

/// Maximum number of tokens accepted from a single command line.
pub const TOKEN_LIMIT: usize = 1000;

/// Split `command` into whitespace-delimited argument tokens, honoring
/// double-quoted spans.
///
/// Separators are unquoted ASCII space and tab; runs of separators are
/// skipped, so leading and trailing whitespace produce no tokens. A `"`
/// toggles a quoted span and is dropped from the output; separators inside
/// a span belong to the token. Single quotes are not special at this stage:
/// shell-level quoting is resolved by [`unescape`](crate::unescape) before
/// tokenization, so the quote handling here only matters for callers that
/// skip decoding.
///
/// At most `max_tokens` tokens are produced; once the cap is reached the
/// rest of the input is ignored. The cap is a soft limit, not an error. If
/// the input ends inside a quoted span, the final token is cut back to the
/// point where the unterminated span opened (best-effort recovery).
pub fn tokenize(command: &str, max_tokens: usize) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut has_token = false;
    let mut in_quote = false;
    // Length of the current token when the open quote was seen, for the
    // unterminated-span recovery below.
    let mut quote_start = 0;

    for ch in command.chars() {
        if tokens.len() >= max_tokens {
            return tokens;
        }
        match ch {
            '"' => {
                if !in_quote {
                    quote_start = current.len();
                }
                in_quote = !in_quote;
                has_token = true;
            }
            ' ' | '\t' if !in_quote => {
                if has_token {
                    tokens.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }

    if has_token && tokens.len() < max_tokens {
        if in_quote {
            current.truncate(quote_start);
        }
        tokens.push(current);
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(command: &str) -> Vec<String> {
        tokenize(command, TOKEN_LIMIT)
    }

    #[test]
    fn splits_on_whitespace_runs() {
        assert_eq!(toks("  ls   -la  "), vec!["ls", "-la"]);
        assert_eq!(toks("a\tb \t c"), vec!["a", "b", "c"]);
    }

    #[test]
    fn empty_input_yields_no_tokens() {
        assert!(toks("").is_empty());
        assert!(toks("   \t ").is_empty());
    }

    #[test]
    fn double_quotes_join_and_disappear() {
        assert_eq!(toks(r#"echo "a b" c"#), vec!["echo", "a b", "c"]);
        assert_eq!(toks(r#"he"llo wo"rld"#), vec!["hello world"]);
    }

    #[test]
    fn single_quotes_are_ordinary_characters() {
        assert_eq!(toks("it's fine"), vec!["it's", "fine"]);
    }

    #[test]
    fn token_cap_is_soft() {
        assert_eq!(tokenize("a b c d e", 3), vec!["a", "b", "c"]);
        assert_eq!(tokenize("a b", 2), vec!["a", "b"]);
        assert!(tokenize("a b", 0).is_empty());
    }

    #[test]
    fn unterminated_quote_truncates_last_token() {
        // The orphan span is dropped from the final token.
        assert_eq!(toks(r#"abc"def ghi"#), vec!["abc"]);
        // A span that opened the token leaves it empty.
        assert_eq!(toks(r#"ls "def ghi"#), vec!["ls", ""]);
    }
}
