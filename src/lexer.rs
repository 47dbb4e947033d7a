//! Escape and quote decoding for raw input lines.
//!
//! The first stage of the line-to-process pipeline: a raw line is decoded
//! into the literal command string before it is trimmed and tokenized.
//! Decoding only ever removes or replaces characters, never adds them, so
//! the output is pre-sized to the input length.

use thiserror::Error;

/// Errors that can occur while decoding a raw input line.
///
/// All of them abort the current command only; the shell loop continues.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// A backslash introduced an escape but the line ended before the
    /// sequence was complete.
    #[error("unterminated escape sequence")]
    UnterminatedEscape,
    /// A quoted region was opened and never closed.
    #[error("unterminated quote")]
    UnterminatedQuote,
    /// An octal escape without exactly three octal digits, or a hex escape
    /// without exactly two hex digits.
    #[error("invalid digit in escape sequence")]
    InvalidEscapeDigit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    /// Outside any quoted region.
    Plain,
    /// Inside a quoted region opened by the contained delimiter.
    Quoted(char),
}

struct DecodeFsm {
    input: Vec<char>,
    pos: usize,
    state: DecodeState,
    out: String,
}

impl DecodeFsm {
    fn new(line: &str) -> Self {
        DecodeFsm {
            out: String::with_capacity(line.len()),
            input: line.chars().collect(),
            pos: 0,
            state: DecodeState::Plain,
        }
    }

    fn decode(mut self) -> Result<String, DecodeError> {
        while let Some(ch) = self.read_char() {
            match self.state {
                DecodeState::Plain => self.handle_plain(ch)?,
                DecodeState::Quoted(delim) => self.handle_quoted(ch, delim)?,
            }
        }

        if let DecodeState::Quoted(_) = self.state {
            return Err(DecodeError::UnterminatedQuote);
        }
        Ok(self.out)
    }

    fn read_char(&mut self) -> Option<char> {
        let ch = self.input.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn handle_plain(&mut self, ch: char) -> Result<(), DecodeError> {
        match ch {
            '\\' => {
                let esc = self.read_char().ok_or(DecodeError::UnterminatedEscape)?;
                self.handle_escape(esc)
            }
            '\'' | '"' => {
                // The delimiter itself is consumed, not copied.
                self.state = DecodeState::Quoted(ch);
                Ok(())
            }
            c => {
                self.out.push(c);
                Ok(())
            }
        }
    }

    fn handle_escape(&mut self, esc: char) -> Result<(), DecodeError> {
        match esc {
            'n' => self.out.push('\n'),
            'a' => self.out.push('\x07'),
            'b' => self.out.push('\x08'),
            'r' => self.out.push('\r'),
            '\\' => self.out.push('\\'),
            'f' => self.out.push('\x0C'),
            'v' => self.out.push('\x0B'),
            '\'' => self.out.push('\''),
            '"' => self.out.push('"'),
            '?' => self.out.push('?'),
            '*' => self.out.push('*'),
            '$' => self.out.push('$'),
            't' => self.out.push('\t'),
            ' ' => self.out.push(' '),
            '!' => self.out.push('!'),
            '0'..='7' => {
                let value = self.octal_escape(esc)?;
                self.out.push(value as char);
            }
            'x' | 'X' => {
                let value = self.hex_escape()?;
                self.out.push(value as char);
            }
            // Any other escape target is copied literally, backslash dropped.
            c => self.out.push(c),
        }
        Ok(())
    }

    /// Three octal digits, the first already consumed. The value is
    /// truncated to a byte, as `\777` historically wraps.
    fn octal_escape(&mut self, first: char) -> Result<u8, DecodeError> {
        let mut value = (first as u32 - '0' as u32) << 6;
        value |= self.octal_digit()? << 3;
        value |= self.octal_digit()?;
        Ok(value as u8)
    }

    fn octal_digit(&mut self) -> Result<u32, DecodeError> {
        match self.read_char() {
            Some(c @ '0'..='7') => Ok(c as u32 - '0' as u32),
            _ => Err(DecodeError::InvalidEscapeDigit),
        }
    }

    /// Exactly two hex digits, either case.
    fn hex_escape(&mut self) -> Result<u8, DecodeError> {
        let hi = self.hex_digit()?;
        let lo = self.hex_digit()?;
        Ok(((hi << 4) | lo) as u8)
    }

    fn hex_digit(&mut self) -> Result<u32, DecodeError> {
        self.read_char()
            .and_then(|c| c.to_digit(16))
            .ok_or(DecodeError::InvalidEscapeDigit)
    }

    fn handle_quoted(&mut self, ch: char, delim: char) -> Result<(), DecodeError> {
        match ch {
            '\\' => {
                // Inside quotes only the active delimiter can be escaped;
                // in front of anything else the backslash stays.
                let next = self.read_char().ok_or(DecodeError::UnterminatedEscape)?;
                if next != delim {
                    self.out.push('\\');
                }
                self.out.push(next);
                Ok(())
            }
            c if c == delim => {
                self.state = DecodeState::Plain;
                Ok(())
            }
            c => {
                self.out.push(c);
                Ok(())
            }
        }
    }
}

/// Decode backslash escapes and quoted regions of a raw input line into a
/// literal string.
///
/// Outside quotes, `\n`, `\t`, `\\` and friends map to the characters they
/// denote, `\NNN` takes exactly three octal digits, `\xNN` exactly two hex
/// digits, and an unrecognized escape target is kept with the backslash
/// dropped. A `'` or `"` opens a quoted region in which everything is
/// literal except a backslash before the closing delimiter. The quote
/// delimiters themselves are consumed.
pub fn unescape(raw: &str) -> Result<String, DecodeError> {
    DecodeFsm::new(raw).decode()
}
