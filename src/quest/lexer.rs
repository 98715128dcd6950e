use super::QuestParseError;

const COMMENT: &[u8] = b"$-";

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Identifier(String),
    Integer(i64),
    /// Run of line breaks; the count is how many newlines were folded.
    Separator(usize),
    EndOfFile,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset of the first character.
    pub offset: usize,
}

impl Token {
    /// Identifier or integer text.
    pub fn word(&self) -> Option<String> {
        match &self.kind {
            TokenKind::Identifier(text) => Some(text.clone()),
            TokenKind::Integer(value) => Some(value.to_string()),
            _ => None,
        }
    }

    pub fn is_identifier(&self, text: &str) -> bool {
        matches!(&self.kind, TokenKind::Identifier(t) if t.eq_ignore_ascii_case(text))
    }
}

/// Stream tokenizer over an ASCII quest source.
///
/// Words end at whitespace, a newline or `:`. Inside parentheses whitespace
/// and `:` are part of the word until the parentheses balance again; a line
/// break inside them is an error.
#[derive(Debug, Clone, Copy)]
pub struct Lexer<'a> {
    data: &'a [u8],
    pos: usize,
}

fn is_blank(byte: u8) -> bool {
    byte.is_ascii_whitespace() && byte != b'\n'
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            data: source.as_bytes(),
            pos: 0,
        }
    }

    pub fn offset(&self) -> usize {
        self.pos
    }

    fn peek_byte(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    fn skip_blanks(&mut self) {
        while self.peek_byte().is_some_and(is_blank) {
            self.pos += 1;
        }
    }

    fn skip_comment(&mut self) {
        if self.data[self.pos..].starts_with(COMMENT) {
            while self.peek_byte().is_some_and(|b| b != b'\n') {
                self.pos += 1;
            }
        }
    }

    pub fn next_token(&mut self) -> Result<Token, QuestParseError> {
        self.skip_blanks();
        self.skip_comment();
        let offset = self.pos;
        let Some(byte) = self.peek_byte() else {
            return Ok(Token {
                kind: TokenKind::EndOfFile,
                offset,
            });
        };

        match byte {
            b':' => {
                self.pos += 1;
                Ok(Token {
                    kind: TokenKind::Identifier(":".into()),
                    offset,
                })
            }
            b'\n' => {
                let mut count = 0;
                while self.peek_byte() == Some(b'\n') {
                    count += 1;
                    self.pos += 1;
                    self.skip_blanks();
                    self.skip_comment();
                }
                Ok(Token {
                    kind: TokenKind::Separator(count),
                    offset,
                })
            }
            _ => self.word(offset),
        }
    }

    fn word(&mut self, offset: usize) -> Result<Token, QuestParseError> {
        let mut depth = 0usize;
        while let Some(byte) = self.peek_byte() {
            match byte {
                b'\n' if depth > 0 => {
                    return Err(QuestParseError::new(offset, "unbalanced parenthesis"));
                }
                b'\n' => break,
                b'(' => depth += 1,
                b')' if depth > 0 => depth -= 1,
                b':' if depth == 0 => break,
                b if is_blank(b) && depth == 0 => break,
                _ => {}
            }
            self.pos += 1;
        }
        if depth > 0 {
            return Err(QuestParseError::new(offset, "unbalanced parenthesis"));
        }
        if !self.data[offset..self.pos].is_ascii() {
            return Err(QuestParseError::new(offset, "quest sources must be ASCII"));
        }
        let text = String::from_utf8_lossy(&self.data[offset..self.pos]).into_owned();
        let kind = match text.parse::<i64>() {
            Ok(value) => TokenKind::Integer(value),
            Err(_) => TokenKind::Identifier(text),
        };
        Ok(Token { kind, offset })
    }

    pub fn peek_token(&self) -> Result<Token, QuestParseError> {
        let mut copy = *self;
        copy.next_token()
    }

    pub fn skip_separators(&mut self) -> Result<(), QuestParseError> {
        while matches!(self.peek_token()?.kind, TokenKind::Separator(_)) {
            self.next_token()?;
        }
        Ok(())
    }

    /// Consumes the rest of the current line verbatim (without the newline).
    pub fn rest_of_line(&mut self) -> String {
        let start = self.pos;
        while self.peek_byte().is_some_and(|b| b != b'\n') {
            self.pos += 1;
        }
        String::from_utf8_lossy(&self.data[start..self.pos])
            .trim()
            .to_string()
    }

    /// The line after the current newline, without consuming anything.
    /// `None` at the end of input or when not positioned at a newline.
    pub fn peek_next_line(&self) -> Option<&'a str> {
        if self.peek_byte() != Some(b'\n') {
            return None;
        }
        let start = self.pos + 1;
        if start > self.data.len() {
            return None;
        }
        let end = self.data[start..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(self.data.len(), |n| start + n);
        std::str::from_utf8(&self.data[start..end]).ok()
    }

    /// Steps over one newline.
    pub fn skip_newline(&mut self) {
        if self.peek_byte() == Some(b'\n') {
            self.pos += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(source);
        let mut out = Vec::new();
        loop {
            let token = lexer.next_token().unwrap();
            let end = token.kind == TokenKind::EndOfFile;
            out.push(token.kind);
            if end {
                return out;
            }
        }
    }

    fn ident(text: &str) -> TokenKind {
        TokenKind::Identifier(text.into())
    }

    #[test]
    fn scope_is_its_own_token_and_blank_lines_fold() {
        assert_eq!(
            kinds("task foo:\n\n  \n timer t 100"),
            vec![
                ident("task"),
                ident("foo"),
                ident(":"),
                TokenKind::Separator(3),
                ident("timer"),
                ident("t"),
                TokenKind::Integer(100),
                TokenKind::EndOfFile,
            ]
        );
    }

    #[test]
    fn parentheses_keep_whitespace_until_balanced() {
        assert_eq!(
            kinds("setvar x (a + (b * 2)) y"),
            vec![
                ident("setvar"),
                ident("x"),
                ident("(a + (b * 2))"),
                ident("y"),
                TokenKind::EndOfFile,
            ]
        );
        let mut lexer = Lexer::new("when (a\n)");
        lexer.next_token().unwrap();
        assert_eq!(lexer.next_token().unwrap_err().offset, 5);
    }

    #[test]
    fn comments_run_to_the_end_of_the_line() {
        assert_eq!(
            kinds("fire t $- arm it\ndone t"),
            vec![
                ident("fire"),
                ident("t"),
                TokenKind::Separator(1),
                ident("done"),
                ident("t"),
                TokenKind::EndOfFile,
            ]
        );
    }
}
