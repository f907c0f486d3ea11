use std::fmt;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum RedirectOp {
    Input,  // <
    Output, // >
    Append, // >>
}

impl RedirectOp {
    pub fn symbol(self) -> &'static str {
        match self {
            RedirectOp::Input => "<",
            RedirectOp::Output => ">",
            RedirectOp::Append => ">>",
        }
    }
}

/// Where a command sits in its pipeline. Decides which redirect slots can
/// still take effect once pipes own the other streams.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum StageRole {
    Only,
    Head,
    Middle,
    Tail,
}

impl StageRole {
    pub fn of(index: usize, len: usize) -> Self {
        match (index, len) {
            (_, 0 | 1) => StageRole::Only,
            (0, _) => StageRole::Head,
            (i, n) if i + 1 == n => StageRole::Tail,
            _ => StageRole::Middle,
        }
    }
}

/// The three redirect slots of a command. Any combination may be filled in by
/// the parser, but at most one is acted upon at execution time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Redirects {
    pub input: Option<String>,
    pub output: Option<String>,
    pub append: Option<String>,
}

impl Redirects {
    pub fn get(&self, op: RedirectOp) -> Option<&str> {
        match op {
            RedirectOp::Input => self.input.as_deref(),
            RedirectOp::Output => self.output.as_deref(),
            RedirectOp::Append => self.append.as_deref(),
        }
    }

    pub fn set(&mut self, op: RedirectOp, target: String) {
        let slot = match op {
            RedirectOp::Input => &mut self.input,
            RedirectOp::Output => &mut self.output,
            RedirectOp::Append => &mut self.append,
        };
        *slot = Some(target);
    }

    pub fn is_empty(&self) -> bool {
        self.input.is_none() && self.output.is_none() && self.append.is_none()
    }

    /// The single slot honored for a stage in `role`.
    ///
    /// A lone command uses the fixed priority input > output > append. Inside a
    /// pipeline the head can only rebind its input, the tail only its output,
    /// and a middle stage nothing.
    pub fn effective(&self, role: StageRole) -> Option<(RedirectOp, &str)> {
        let order: &[RedirectOp] = match role {
            StageRole::Only => &[RedirectOp::Input, RedirectOp::Output, RedirectOp::Append],
            StageRole::Head => &[RedirectOp::Input],
            StageRole::Tail => &[RedirectOp::Output, RedirectOp::Append],
            StageRole::Middle => &[],
        };
        order
            .iter()
            .find_map(|&op| self.get(op).map(|target| (op, target)))
    }
}

/// One stage of a pipeline. The head owns the rest of the chain through `next`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    pub args: Vec<String>,
    pub redirects: Redirects,
    pub background: bool,
    pub auto_complete: bool,
    pub next: Option<Box<Command>>,
}

impl Command {
    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }

    pub fn arg_count(&self) -> usize {
        self.args.len()
    }

    /// Walks the chain from this stage to the tail.
    pub fn stages(&self) -> Stages<'_> {
        Stages { current: Some(self) }
    }

    pub fn len(&self) -> usize {
        self.stages().count()
    }

    pub fn is_pipeline(&self) -> bool {
        self.next.is_some()
    }

    fn fmt_stage(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        for arg in &self.args {
            write!(f, " {}", shell_words::quote(arg))?;
        }
        for op in [RedirectOp::Input, RedirectOp::Output, RedirectOp::Append] {
            if let Some(target) = self.redirects.get(op) {
                write!(f, " {} {}", op.symbol(), shell_words::quote(target))?;
            }
        }
        Ok(())
    }
}

/// Rebuilds a line that parses back to an equivalent chain, as long as no
/// argument needs quoting that the parser cannot undo (embedded quotes).
impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, stage) in self.stages().enumerate() {
            if i > 0 {
                write!(f, " | ")?;
            }
            stage.fmt_stage(f)?;
        }
        if self.background {
            write!(f, " &")?;
        }
        Ok(())
    }
}

pub struct Stages<'a> {
    current: Option<&'a Command>,
}

impl<'a> Iterator for Stages<'a> {
    type Item = &'a Command;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.current?;
        self.current = current.next.as_deref();
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn redirects(input: Option<&str>, output: Option<&str>, append: Option<&str>) -> Redirects {
        Redirects {
            input: input.map(String::from),
            output: output.map(String::from),
            append: append.map(String::from),
        }
    }

    #[test]
    fn test_priority_for_single_command() {
        let all = redirects(Some("in"), Some("out"), Some("log"));
        assert_eq!(all.effective(StageRole::Only), Some((RedirectOp::Input, "in")));

        let outputs = redirects(None, Some("out"), Some("log"));
        assert_eq!(
            outputs.effective(StageRole::Only),
            Some((RedirectOp::Output, "out"))
        );

        let append = redirects(None, None, Some("log"));
        assert_eq!(
            append.effective(StageRole::Only),
            Some((RedirectOp::Append, "log"))
        );
    }

    #[test]
    fn test_pipeline_roles_narrow_slots() {
        let all = redirects(Some("in"), Some("out"), None);
        assert_eq!(all.effective(StageRole::Head), Some((RedirectOp::Input, "in")));
        assert_eq!(all.effective(StageRole::Tail), Some((RedirectOp::Output, "out")));
        assert_eq!(all.effective(StageRole::Middle), None);

        let only_output = redirects(None, Some("out"), None);
        assert_eq!(only_output.effective(StageRole::Head), None);
    }

    #[test]
    fn test_stage_role_of() {
        assert_eq!(StageRole::of(0, 1), StageRole::Only);
        assert_eq!(StageRole::of(0, 3), StageRole::Head);
        assert_eq!(StageRole::of(1, 3), StageRole::Middle);
        assert_eq!(StageRole::of(2, 3), StageRole::Tail);
    }

    #[test]
    fn test_stages_walks_chain() {
        let chain = Command {
            name: "a".to_string(),
            next: Some(Box::new(Command {
                name: "b".to_string(),
                ..Default::default()
            })),
            ..Default::default()
        };
        let names: Vec<_> = chain.stages().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(chain.len(), 2);
        assert!(chain.is_pipeline());
    }

    #[test]
    fn test_display() {
        let mut head = Command {
            name: "grep".to_string(),
            args: vec!["hello world".to_string(), "-n".to_string()],
            background: true,
            ..Default::default()
        };
        head.redirects.set(RedirectOp::Input, "in.txt".to_string());
        head.next = Some(Box::new(Command {
            name: "wc".to_string(),
            redirects: redirects(None, None, Some("log")),
            ..Default::default()
        }));
        assert_eq!(
            head.to_string(),
            "grep 'hello world' -n < in.txt | wc >> log &"
        );
    }
}
