//! Scripted command runner for testing command-based sources.

use std::io;
use std::sync::{Arc, Mutex, PoisonError};

use crate::collector::traits::CommandRunner;

#[derive(Debug, Clone)]
enum Reply {
    Stdout(String),
    Fail(io::ErrorKind, String),
}

#[derive(Debug, Clone)]
struct Rule {
    program: String,
    needle: Option<String>,
    reply: Reply,
}

#[derive(Debug, Default)]
struct Script {
    rules: Vec<Rule>,
    calls: Vec<String>,
}

/// Command runner that answers from a script instead of spawning processes.
///
/// Rules are matched in insertion order on the program name and, optionally,
/// a substring of the space-joined arguments. A program with no rules at all
/// behaves as if it were not installed (`NotFound`); a known program whose
/// arguments match no rule fails with a non-zero exit.
///
/// Clones share the script and the call log.
#[derive(Debug, Clone, Default)]
pub struct MockCommands {
    script: Arc<Mutex<Script>>,
}

impl MockCommands {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, program: &str, needle: Option<&str>, reply: Reply) {
        let mut script = self.script.lock().unwrap_or_else(PoisonError::into_inner);
        script.rules.push(Rule {
            program: program.to_string(),
            needle: needle.map(str::to_string),
            reply,
        });
    }

    /// Any invocation of `program` prints `stdout`.
    pub fn respond(&self, program: &str, stdout: impl Into<String>) {
        self.push(program, None, Reply::Stdout(stdout.into()));
    }

    /// Invocations of `program` whose arguments contain `needle` print `stdout`.
    pub fn respond_when(&self, program: &str, needle: &str, stdout: impl Into<String>) {
        self.push(program, Some(needle), Reply::Stdout(stdout.into()));
    }

    /// Any invocation of `program` fails with the given error.
    pub fn fail(&self, program: &str, kind: io::ErrorKind, message: &str) {
        self.push(program, None, Reply::Fail(kind, message.to_string()));
    }

    /// Invocations of `program` whose arguments contain `needle` fail.
    pub fn fail_when(&self, program: &str, needle: &str, kind: io::ErrorKind, message: &str) {
        self.push(program, Some(needle), Reply::Fail(kind, message.to_string()));
    }

    /// Every command line run so far, in order.
    pub fn calls(&self) -> Vec<String> {
        let script = self.script.lock().unwrap_or_else(PoisonError::into_inner);
        script.calls.clone()
    }
}

impl CommandRunner for MockCommands {
    fn run(&self, program: &str, args: &[&str]) -> io::Result<String> {
        let joined = args.join(" ");
        let mut script = self.script.lock().unwrap_or_else(PoisonError::into_inner);
        script.calls.push(format!("{program} {joined}").trim_end().to_string());

        let mut known = false;
        for rule in script.rules.iter().filter(|r| r.program == program) {
            known = true;
            if rule.needle.as_ref().is_none_or(|n| joined.contains(n.as_str())) {
                return match &rule.reply {
                    Reply::Stdout(out) => Ok(out.clone()),
                    Reply::Fail(kind, message) => Err(io::Error::new(*kind, message.clone())),
                };
            }
        }

        if known {
            Err(io::Error::other(format!("{program} exited with exit status: 1")))
        } else {
            Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("program not found: {program}"),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_program_is_not_found() {
        let commands = MockCommands::new();
        let err = commands.run("wmic", &["path", "Win32_Battery"]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_rules_match_in_order() {
        let commands = MockCommands::new();
        commands.respond_when("powershell", "BatteryCycleCount", "{\"CycleCount\":3}");
        commands.respond("powershell", "");

        assert_eq!(
            commands
                .run("powershell", &["-Command", "Get BatteryCycleCount"])
                .unwrap(),
            "{\"CycleCount\":3}"
        );
        assert_eq!(commands.run("powershell", &["-Command", "Other"]).unwrap(), "");
    }

    #[test]
    fn test_known_program_without_matching_rule_fails() {
        let commands = MockCommands::new();
        commands.respond_when("powercfg", "/batteryreport", "");
        let err = commands.run("powercfg", &["/energy"]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Other);
    }

    #[test]
    fn test_calls_are_recorded() {
        let commands = MockCommands::new();
        let clone = commands.clone();
        let _ = clone.run("wmic", &["path", "Win32_Battery", "get", "/format:list"]);
        assert_eq!(
            commands.calls(),
            vec!["wmic path Win32_Battery get /format:list".to_string()]
        );
    }
}
