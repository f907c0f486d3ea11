use log::{debug, warn};

use super::ast::Command;
use super::lexer::{is_blank, Lexer, Token};
use crate::shell::error::ShellError;

pub const DEFAULT_MAX_LINE_LEN: usize = 4096;

pub struct Parser {
    max_line_len: usize,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE_LEN)
    }
}

impl Parser {
    pub fn new(max_line_len: usize) -> Self {
        Parser { max_line_len }
    }

    /// Parses one line into a command chain.
    ///
    /// Malformed quoting and dangling redirections are tolerated and logged; the
    /// only hard failure is a line over the length limit.
    pub fn parse(&self, line: &str) -> Result<Command, ShellError> {
        if line.len() > self.max_line_len {
            return Err(ShellError::ParseAmbiguity(format!(
                "line exceeds {} bytes",
                self.max_line_len
            )));
        }

        let line = line.trim_matches(is_blank);
        let mut command = self.parse_command(line);
        // markers are read off the whole line, not per token
        command.auto_complete = line.ends_with('?');
        command.background = line.ends_with('&');
        debug!("parsed {} stage(s) from {:?}", command.len(), line);
        Ok(command)
    }

    fn parse_command(&self, buf: &str) -> Command {
        let mut lexer = Lexer::new(buf);
        let mut command = Command::default();

        match lexer.read_word() {
            Some(name) => command.name = name.to_string(),
            None => return command,
        }

        // a token read while looking for a redirect target, not yet handled
        let mut pending: Option<Token<'_>> = None;

        loop {
            match pending.take().unwrap_or_else(|| lexer.next_token()) {
                Token::EOF => break,
                Token::Pipe => {
                    let rest = lexer.rest();
                    if rest.is_empty() {
                        warn!("pipe after {:?} has no command, ignoring it", command.name);
                    } else {
                        command.next = Some(Box::new(self.parse_command(rest)));
                    }
                    break;
                }
                // captured from the end of the line already
                Token::Background => continue,
                Token::Redirect(op, target) => {
                    let target = if target.is_empty() {
                        // operators are never targets
                        match lexer.next_token() {
                            Token::Word(word) => Some(word),
                            other => {
                                pending = Some(other);
                                None
                            }
                        }
                    } else {
                        Some(target)
                    };
                    match target.map(unquote).filter(|t| !t.is_empty()) {
                        Some(target) => command.redirects.set(op, target.to_string()),
                        None => warn!(
                            "{} in {:?} has no target, ignoring it",
                            op.symbol(),
                            command.name
                        ),
                    }
                }
                Token::Word(word) => {
                    let arg = unquote(word);
                    if !arg.is_empty() {
                        command.args.push(arg.to_string());
                    }
                }
            }
        }

        command
    }
}

pub fn parse(line: &str) -> Result<Command, ShellError> {
    Parser::default().parse(line)
}

/// Strips one pair of matching quotes wrapping the whole token.
fn unquote(token: &str) -> &str {
    for quote in ['"', '\''] {
        if token.len() >= 2 && token.starts_with(quote) && token.ends_with(quote) {
            return &token[1..token.len() - 1];
        }
    }
    token
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::shell::parser::ast::RedirectOp;

    fn parse_ok(line: &str) -> Command {
        parse(line).unwrap()
    }

    #[test]
    fn test_simple_command() {
        let cmd = parse_ok("ls -l");
        assert_eq!(cmd.name, "ls");
        assert_eq!(cmd.args, vec!["-l"]);
        assert!(cmd.redirects.is_empty());
        assert!(!cmd.background);
        assert!(cmd.next.is_none());
    }

    #[test]
    fn test_args_match_whitespace_split() {
        let lines = [
            "echo a b   c",
            "\t grep -r  --color=auto pattern src \t",
            "printf %s\\n x y z",
        ];
        for line in lines {
            let cmd = parse_ok(line);
            let tokens: Vec<&str> = line.split(&[' ', '\t'][..]).filter(|t| !t.is_empty()).collect();
            assert_eq!(cmd.name, tokens[0]);
            assert_eq!(cmd.args, tokens[1..].to_vec(), "line {:?}", line);
        }
    }

    #[test]
    fn test_quotes_stripped_when_wrapping() {
        let cmd = parse_ok(r#"echo "hello world" 'single one' mid"dle" """#);
        assert_eq!(cmd.args, vec!["hello world", "single one", "mid\"dle\""]);
    }

    #[test]
    fn test_unbalanced_quote_passes_through() {
        let cmd = parse_ok("echo \"oops here");
        assert_eq!(cmd.args, vec!["\"oops here"]);
    }

    #[test]
    fn test_pipeline_of_three() {
        let cmd = parse_ok("a | b | c");
        let names: Vec<&str> = cmd.stages().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["a", "b", "c"]);
        let tail = cmd.stages().last().unwrap();
        assert!(tail.next.is_none());
    }

    #[test]
    fn test_pipeline_keeps_stage_args() {
        let cmd = parse_ok("ls -l | grep foo");
        assert_eq!(cmd.name, "ls");
        assert_eq!(cmd.args, vec!["-l"]);
        let next = cmd.next.as_deref().unwrap();
        assert_eq!(next.name, "grep");
        assert_eq!(next.args, vec!["foo"]);
    }

    #[test]
    fn test_trailing_pipe_is_tolerated() {
        let cmd = parse_ok("ls |");
        assert_eq!(cmd.name, "ls");
        assert!(cmd.next.is_none());
    }

    #[test]
    fn test_each_redirection_slot() {
        let cmd = parse_ok("cmd > out.txt");
        assert_eq!(cmd.redirects.output.as_deref(), Some("out.txt"));
        assert!(cmd.redirects.input.is_none());
        assert!(cmd.redirects.append.is_none());
        assert!(cmd.args.is_empty());

        let cmd = parse_ok("cmd >>out.txt");
        assert_eq!(cmd.redirects.append.as_deref(), Some("out.txt"));
        assert!(cmd.redirects.output.is_none());
        assert!(cmd.redirects.input.is_none());

        let cmd = parse_ok("cmd < in.txt");
        assert_eq!(cmd.redirects.get(RedirectOp::Input), Some("in.txt"));
        assert!(cmd.redirects.output.is_none());
        assert!(cmd.redirects.append.is_none());
    }

    #[test]
    fn test_redirect_without_target_is_ignored() {
        let cmd = parse_ok("cat file >");
        assert_eq!(cmd.args, vec!["file"]);
        assert!(cmd.redirects.is_empty());
    }

    #[test]
    fn test_operator_is_not_a_redirect_target() {
        let cmd = parse_ok("echo hi > | cat");
        assert_eq!(cmd.args, vec!["hi"]);
        assert!(cmd.redirects.is_empty());
        assert_eq!(cmd.next.as_deref().unwrap().name, "cat");

        let cmd = parse_ok("sleep 1 > &");
        assert_eq!(cmd.args, vec!["1"]);
        assert!(cmd.redirects.is_empty());
        assert!(cmd.background);

        let cmd = parse_ok("sort < >> out");
        assert!(cmd.redirects.input.is_none());
        assert_eq!(cmd.redirects.append.as_deref(), Some("out"));
    }

    #[test]
    fn test_redirect_on_pipeline_ends() {
        let cmd = parse_ok("sort < names | uniq > out");
        assert_eq!(cmd.redirects.input.as_deref(), Some("names"));
        let tail = cmd.next.as_deref().unwrap();
        assert_eq!(tail.redirects.output.as_deref(), Some("out"));
    }

    #[test]
    fn test_background() {
        let cmd = parse_ok("sleep 10 &");
        assert_eq!(cmd.name, "sleep");
        assert_eq!(cmd.args, vec!["10"]);
        assert!(cmd.background);
        assert!(!cmd.auto_complete);
    }

    #[test]
    fn test_background_only_on_head() {
        let cmd = parse_ok("yes | head -n 1 &");
        assert!(cmd.background);
        assert!(!cmd.next.as_deref().unwrap().background);
    }

    #[test]
    fn test_auto_complete_marker() {
        let cmd = parse_ok("git chec?");
        assert!(cmd.auto_complete);
        assert!(!cmd.background);
    }

    #[test]
    fn test_blank_line() {
        for line in ["", "   ", "\t \t"] {
            let cmd = parse_ok(line);
            assert!(cmd.is_empty());
            assert_eq!(cmd.arg_count(), 0);
        }
    }

    #[test]
    fn test_too_long_line() {
        let parser = Parser::new(8);
        let err = parser.parse("echo 123456789").unwrap_err();
        assert!(matches!(err, ShellError::ParseAmbiguity(_)));
        assert!(parser.parse("echo 1").is_ok());
    }

    #[test]
    fn test_reparse_display_is_equivalent() {
        let lines = [
            "ls -l",
            "grep \"two words\" -n < in.txt | sort | uniq >> log",
            "sleep 5 &",
            "cat 'a b' > out",
        ];
        for line in lines {
            let cmd = parse_ok(line);
            let again = parse_ok(&cmd.to_string());
            assert_eq!(cmd, again, "round trip of {:?}", line);
        }
    }
}
