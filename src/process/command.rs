//! Command line parsing
//!
//! Splits on unquoted whitespace. Single quotes are literal, double quotes
//! allow `\"` and `\\` escapes, a backslash outside quotes escapes the next
//! character. No shell features (pipes, redirection, globbing) are applied.

use crate::error::{Error, Result};
use std::str::FromStr;

/// Executable plus ordered argument list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
}

impl CommandSpec {
    pub fn parse(command: &str) -> Result<Self> {
        let mut tokens = tokenize(command)?.into_iter();
        match tokens.next() {
            Some(program) if !program.is_empty() => Ok(Self {
                program,
                args: tokens.collect(),
            }),
            _ => Err(Error::InvalidCommand(command.to_string())),
        }
    }

    pub fn new(program: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Result<Self> {
        let program = program.into();
        if program.is_empty() {
            return Err(Error::InvalidCommand(program));
        }
        Ok(Self {
            program,
            args: args.into_iter().map(Into::into).collect(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl FromStr for CommandSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl std::fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Quote {
    None,
    Single,
    Double,
}

fn tokenize(command: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    // distinguishes `""` (an empty argument) from no token at all
    let mut in_token = false;
    let mut quote = Quote::None;
    let mut chars = command.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Quote::None, c) if c.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            (Quote::None, '\'') => {
                quote = Quote::Single;
                in_token = true;
            }
            (Quote::None, '"') => {
                quote = Quote::Double;
                in_token = true;
            }
            (Quote::None, '\\') => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
                in_token = true;
            }
            (Quote::Single, '\'') | (Quote::Double, '"') => quote = Quote::None,
            (Quote::Double, '\\') => match chars.next() {
                Some(next @ ('"' | '\\')) => current.push(next),
                Some(next) => {
                    current.push('\\');
                    current.push(next);
                }
                None => current.push('\\'),
            },
            (_, c) => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if quote != Quote::None {
        return Err(Error::InvalidCommand(format!("unterminated quote in {command:?}")));
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}
