use super::ast::RedirectOp;

#[derive(Debug, PartialEq, Clone)]
pub enum Token<'a> {
    Word(&'a str),
    Pipe,
    Background,
    Redirect(RedirectOp, &'a str),
    EOF,
}

pub fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t'
}

/// Pulls one whitespace-delimited token at a time out of a line. Tokens are
/// handed out one by one so the parser can stop at `|` and hand the rest of
/// the raw buffer to a nested parse.
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    pub fn next_token(&mut self) -> Token<'a> {
        match self.read_word() {
            None => Token::EOF,
            Some("|") => Token::Pipe,
            Some("&") => Token::Background,
            Some(word) => {
                if let Some(rest) = word.strip_prefix(">>") {
                    Token::Redirect(RedirectOp::Append, rest)
                } else if let Some(rest) = word.strip_prefix('>') {
                    Token::Redirect(RedirectOp::Output, rest)
                } else if let Some(rest) = word.strip_prefix('<') {
                    Token::Redirect(RedirectOp::Input, rest)
                } else {
                    Token::Word(word)
                }
            }
        }
    }

    /// The next raw token, unclassified.
    pub fn read_word(&mut self) -> Option<&'a str> {
        self.skip_whitespace();
        let rest = &self.input[self.pos..];
        if rest.is_empty() {
            return None;
        }

        let mut quote: Option<char> = None;
        let mut end = rest.len();
        for (i, c) in rest.char_indices() {
            match quote {
                Some(q) if c == q => quote = None,
                Some(_) => {}
                None if is_blank(c) => {
                    end = i;
                    break;
                }
                None if c == '"' || c == '\'' => quote = Some(c),
                None => {}
            }
        }
        // an unterminated quote simply runs to the end of the line

        self.pos += end;
        Some(&rest[..end])
    }

    /// Everything not consumed yet, leading blanks skipped.
    pub fn rest(&mut self) -> &'a str {
        self.skip_whitespace();
        &self.input[self.pos..]
    }

    fn skip_whitespace(&mut self) {
        let rest = &self.input[self.pos..];
        let trimmed = rest.trim_start_matches(is_blank);
        self.pos += rest.len() - trimmed.len();
    }
}
