//! Lexical analysis of a single pipeline stage.
//!
//! The input is the text between two pipe separators; the `|` character has
//! already been dealt with by the parser.

use crate::error::MalformedLine;

/// What a token stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// An ordinary word: command name, argument or redirect target.
    Word,
    /// `>`
    RedirectOutTruncate,
    /// `>>`
    RedirectOutAppend,
    /// `<`
    RedirectIn,
    /// End of the stage. Always the last token.
    Terminator,
}

/// A token with the text it was built from.
///
/// Redirect tokens carry their operator (`">"`, `">>"`, `"<"`) so a built-in
/// can receive its words exactly as typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

impl Token {
    pub fn word(text: impl Into<String>) -> Self {
        Self {
            kind: TokenKind::Word,
            text: text.into(),
        }
    }

    fn operator(kind: TokenKind) -> Self {
        let text = match kind {
            TokenKind::RedirectOutTruncate => ">",
            TokenKind::RedirectOutAppend => ">>",
            TokenKind::RedirectIn => "<",
            TokenKind::Word | TokenKind::Terminator => "",
        };
        Self {
            kind,
            text: text.to_string(),
        }
    }

    pub fn is_redirect(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::RedirectIn | TokenKind::RedirectOutTruncate | TokenKind::RedirectOutAppend
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    Whitespace,
    Word,
    Quoted,
    /// A `>` has been read; the next character decides between `>` and `>>`.
    Redirect,
}

struct LexingFSM {
    input: Vec<char>,
    pos: usize,
    state: LexingState,
    buffer: String,
    // set once a quote opens so that `""` still yields a (empty) word
    quoted: bool,
}

impl LexingFSM {
    fn new(stage: &str) -> Self {
        LexingFSM {
            input: stage.chars().collect(),
            pos: 0,
            state: LexingState::Whitespace,
            buffer: String::new(),
            quoted: false,
        }
    }

    /// Runs the machine over the whole input.
    ///
    /// Fails only on an unterminated quote, in which case no tokens are
    /// returned at all.
    fn make_tokens(&mut self) -> Result<Vec<Token>, MalformedLine> {
        let mut out = Vec::new();

        while let Some(ch) = self.read_char() {
            match self.state {
                LexingState::Whitespace => self.handle_whitespace(ch, &mut out),
                LexingState::Word => self.handle_word(ch, &mut out),
                LexingState::Quoted => self.handle_quoted(ch),
                LexingState::Redirect => self.handle_redirect(ch, &mut out),
            }
        }

        match self.state {
            LexingState::Quoted => return Err(MalformedLine::UnterminatedQuote),
            LexingState::Redirect => out.push(Token::operator(TokenKind::RedirectOutTruncate)),
            LexingState::Word => self.flush_word(&mut out),
            LexingState::Whitespace => {}
        }

        out.push(Token::operator(TokenKind::Terminator));
        Ok(out)
    }

    fn read_char(&mut self) -> Option<char> {
        let ch = self.input.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn handle_whitespace(&mut self, ch: char, out: &mut Vec<Token>) {
        match ch {
            ' ' | '\t' => {}
            '"' => self.open_quote(),
            '>' => self.state = LexingState::Redirect,
            '<' => out.push(Token::operator(TokenKind::RedirectIn)),
            c => {
                self.buffer.push(c);
                self.state = LexingState::Word;
            }
        }
    }

    fn handle_word(&mut self, ch: char, out: &mut Vec<Token>) {
        match ch {
            ' ' | '\t' => {
                self.flush_word(out);
                self.state = LexingState::Whitespace;
            }
            '"' => self.open_quote(),
            '>' => {
                self.flush_word(out);
                self.state = LexingState::Redirect;
            }
            '<' => {
                self.flush_word(out);
                out.push(Token::operator(TokenKind::RedirectIn));
                self.state = LexingState::Whitespace;
            }
            c => self.buffer.push(c),
        }
    }

    fn handle_quoted(&mut self, ch: char) {
        match ch {
            '"' => self.state = LexingState::Word,
            c => self.buffer.push(c),
        }
    }

    fn handle_redirect(&mut self, ch: char, out: &mut Vec<Token>) {
        self.state = LexingState::Whitespace;
        if ch == '>' {
            out.push(Token::operator(TokenKind::RedirectOutAppend));
        } else {
            out.push(Token::operator(TokenKind::RedirectOutTruncate));
            self.handle_whitespace(ch, out);
        }
    }

    fn open_quote(&mut self) {
        self.quoted = true;
        self.state = LexingState::Quoted;
    }

    fn flush_word(&mut self, out: &mut Vec<Token>) {
        if !self.buffer.is_empty() || self.quoted {
            out.push(Token::word(std::mem::take(&mut self.buffer)));
        }
        self.quoted = false;
    }
}

/// Tokenizes one pipeline stage.
///
/// The result always ends with a [`TokenKind::Terminator`] token.
///
/// # Errors
/// [`MalformedLine::UnterminatedQuote`] when the input ends inside a quoted span.
pub fn split_into_tokens(stage: &str) -> Result<Vec<Token>, MalformedLine> {
    let mut lexer = LexingFSM::new(stage);
    lexer.make_tokens()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(tokens: &[Token]) -> Vec<TokenKind> {
        tokens.iter().map(|t| t.kind).collect()
    }

    fn words(tokens: &[Token]) -> Vec<&str> {
        tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Word)
            .map(|t| t.text.as_str())
            .collect()
    }

    #[test]
    fn test_plain_words() {
        let tokens = split_into_tokens("ls  -l\t/tmp").unwrap();
        assert_eq!(words(&tokens), vec!["ls", "-l", "/tmp"]);
        assert_eq!(tokens.last().unwrap().kind, TokenKind::Terminator);
    }

    #[test]
    fn test_empty_input_is_just_terminator() {
        let tokens = split_into_tokens("   ").unwrap();
        assert_eq!(kinds(&tokens), vec![TokenKind::Terminator]);
    }

    #[test]
    fn test_redirect_operators() {
        let tokens = split_into_tokens("sort < in > out").unwrap();
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::Word,
                TokenKind::RedirectIn,
                TokenKind::Word,
                TokenKind::RedirectOutTruncate,
                TokenKind::Word,
                TokenKind::Terminator,
            ]
        );
    }

    #[test]
    fn test_append_needs_lookahead() {
        let tokens = split_into_tokens("echo hi>>log").unwrap();
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::Word,
                TokenKind::Word,
                TokenKind::RedirectOutAppend,
                TokenKind::Word,
                TokenKind::Terminator,
            ]
        );
        assert_eq!(tokens[2].text, ">>");
        assert_eq!(words(&tokens), vec!["echo", "hi", "log"]);
    }

    #[test]
    fn test_operators_flush_pending_word() {
        let tokens = split_into_tokens("cat<in>out").unwrap();
        assert_eq!(words(&tokens), vec!["cat", "in", "out"]);
        assert_eq!(tokens[1].kind, TokenKind::RedirectIn);
        assert_eq!(tokens[3].kind, TokenKind::RedirectOutTruncate);
    }

    #[test]
    fn test_trailing_redirect_without_target() {
        let tokens = split_into_tokens("echo >").unwrap();
        assert_eq!(
            kinds(&tokens),
            vec![TokenKind::Word, TokenKind::RedirectOutTruncate, TokenKind::Terminator]
        );
    }

    #[test]
    fn test_quotes_keep_specials_literal() {
        let tokens = split_into_tokens(r#"echo "a > b < c" 'x'"#).unwrap();
        assert_eq!(words(&tokens), vec!["echo", "a > b < c", "'x'"]);
        assert!(!tokens.iter().any(Token::is_redirect));
    }

    #[test]
    fn test_quote_joins_surrounding_text() {
        let tokens = split_into_tokens(r#"a"b c"d"#).unwrap();
        assert_eq!(words(&tokens), vec!["ab cd"]);
    }

    #[test]
    fn test_empty_quotes_make_empty_word() {
        let tokens = split_into_tokens(r#"printf "" x"#).unwrap();
        assert_eq!(words(&tokens), vec!["printf", "", "x"]);
    }

    #[test]
    fn test_unterminated_quote() {
        let err = split_into_tokens(r#"echo "oops"#).unwrap_err();
        assert_eq!(err, MalformedLine::UnterminatedQuote);
    }
}
