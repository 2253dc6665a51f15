//! Path expressions addressing nodes of the data tree.
//!
//! Syntax: absolute, slash-separated steps. A step is an optionally
//! module-qualified name (or `*`) followed by predicates:
//!
//! ```text
//! /example-schema:person[name='Jan']/department
//! /example-schema:addresses[.='0.0.0.0']
//! /example-schema:*
//! ```
//!
//! An unqualified step inherits the module of the step before it. The
//! canonical rendering ([`fmt::Display`]) prints a module prefix only where
//! the module changes, so the expression the backend reports for a node can
//! be parsed back into an identical [`DataPath`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PathError;

// ---------------------------------------------------------------------------
// Steps and predicates
// ---------------------------------------------------------------------------

/// A bracketed predicate on a step.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Predicate {
    /// `[key='value']` on a list step.
    Key { name: String, value: String },
    /// `[.='value']` on a leaf-list step.
    Value(String),
}

/// One step of a path expression.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathStep {
    /// Explicit module prefix, if the step carried one.
    pub module: Option<String>,
    /// Node name, or `*`.
    pub name: String,
    pub predicates: Vec<Predicate>,
}

impl PathStep {
    pub const WILDCARD: &'static str = "*";

    pub fn qualified(module: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            module: Some(module.into()),
            name: name.into(),
            predicates: Vec::new(),
        }
    }

    pub fn unqualified(name: impl Into<String>) -> Self {
        Self {
            module: None,
            name: name.into(),
            predicates: Vec::new(),
        }
    }

    pub fn with_key(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.predicates.push(Predicate::Key {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.predicates.push(Predicate::Value(value.into()));
        self
    }

    pub fn is_wildcard(&self) -> bool {
        self.name == Self::WILDCARD
    }

    /// Value of the key predicate `name`, if present.
    pub fn key(&self, name: &str) -> Option<&str> {
        self.predicates.iter().find_map(|p| match p {
            Predicate::Key { name: n, value } if n == name => Some(value.as_str()),
            _ => None,
        })
    }

    /// Value of a `[.='...']` predicate, if present.
    pub fn leaf_list_value(&self) -> Option<&str> {
        self.predicates.iter().find_map(|p| match p {
            Predicate::Value(value) => Some(value.as_str()),
            _ => None,
        })
    }
}

// ---------------------------------------------------------------------------
// DataPath
// ---------------------------------------------------------------------------

/// A parsed path expression. The empty path is the datastore root (`/`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataPath {
    steps: Vec<PathStep>,
}

impl DataPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn from_steps(steps: Vec<PathStep>) -> Self {
        Self { steps }
    }

    /// Parse a path expression. Only syntax is checked here; whether the
    /// nodes exist is the resolver's business.
    pub fn parse(expr: &str) -> Result<Self, PathError> {
        Parser::new(expr).parse()
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    pub fn steps_mut(&mut self) -> &mut [PathStep] {
        &mut self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_root(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn last(&self) -> Option<&PathStep> {
        self.steps.last()
    }

    /// Returns `true` if any step is `*`.
    pub fn has_wildcard(&self) -> bool {
        self.steps.iter().any(PathStep::is_wildcard)
    }

    /// The first `len` steps.
    pub fn prefix(&self, len: usize) -> DataPath {
        let len = len.min(self.steps.len());
        Self {
            steps: self.steps[..len].to_vec(),
        }
    }

    /// The enclosing path, or `None` at the root.
    pub fn parent(&self) -> Option<DataPath> {
        if self.steps.is_empty() {
            None
        } else {
            Some(self.prefix(self.steps.len() - 1))
        }
    }

    /// This path extended by one step.
    pub fn child(&self, step: PathStep) -> DataPath {
        let mut steps = self.steps.clone();
        steps.push(step);
        Self { steps }
    }

    /// The module each step belongs to after prefix inheritance.
    pub fn effective_modules(&self) -> Vec<Option<&str>> {
        let mut current: Option<&str> = None;
        self.steps
            .iter()
            .map(|step| {
                if let Some(module) = step.module.as_deref() {
                    current = Some(module);
                }
                current
            })
            .collect()
    }

    /// Module of the final step after prefix inheritance.
    pub fn module(&self) -> Option<&str> {
        self.effective_modules().last().copied().flatten()
    }

    /// The first predicate value that no quoting can express, i.e. one
    /// holding both `'` and `"`. Such a path has no textual form.
    pub fn unquotable_value(&self) -> Option<&str> {
        self.steps
            .iter()
            .flat_map(|step| step.predicates.iter())
            .map(|predicate| match predicate {
                Predicate::Key { value, .. } | Predicate::Value(value) => value.as_str(),
            })
            .find(|value| !is_quotable(value))
    }

    /// Schema path of the addressed node: predicates dropped, every step
    /// prefixed with its module.
    pub fn schema_path(&self) -> String {
        if self.steps.is_empty() {
            return "/".to_string();
        }
        let mut out = String::new();
        for (step, module) in self.steps.iter().zip(self.effective_modules()) {
            out.push('/');
            if let Some(module) = module {
                out.push_str(module);
                out.push(':');
            }
            out.push_str(&step.name);
        }
        out
    }

    /// Returns `true` if this (concrete) path lies at or below `pattern`.
    ///
    /// Pattern steps named `*` match any name, pattern steps without an
    /// effective module match any module, and every predicate of a pattern
    /// step must also be present on the corresponding step here.
    pub fn matches(&self, pattern: &DataPath) -> bool {
        if pattern.steps.len() > self.steps.len() {
            return false;
        }
        let mine = self.effective_modules();
        let theirs = pattern.effective_modules();
        pattern.steps.iter().enumerate().all(|(i, wanted)| {
            let step = &self.steps[i];
            if theirs[i].is_some() && theirs[i] != mine[i] {
                return false;
            }
            if !wanted.is_wildcard() && wanted.name != step.name {
                return false;
            }
            wanted.predicates.iter().all(|p| step.predicates.contains(p))
        })
    }
}

impl fmt::Display for DataPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.steps.is_empty() {
            return f.write_str("/");
        }
        let mut current: Option<&str> = None;
        for step in &self.steps {
            f.write_str("/")?;
            if let Some(module) = step.module.as_deref() {
                if current != Some(module) {
                    write!(f, "{module}:")?;
                }
                current = Some(module);
            }
            f.write_str(&step.name)?;
            for predicate in &step.predicates {
                match predicate {
                    Predicate::Key { name, value } => write!(f, "[{name}={}]", quote(value))?,
                    Predicate::Value(value) => write!(f, "[.={}]", quote(value))?,
                }
            }
        }
        Ok(())
    }
}

impl FromStr for DataPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Returns `true` if `value` can sit inside a quoted predicate. Neither
/// quote character can be escaped, so a value must not hold both.
pub fn is_quotable(value: &str) -> bool {
    !(value.contains('\'') && value.contains('"'))
}

fn quote(value: &str) -> String {
    if value.contains('\'') {
        format!("\"{value}\"")
    } else {
        format!("'{value}'")
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser<'a> {
    expr: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(expr: &'a str) -> Self {
        Self {
            expr,
            chars: expr.chars().collect(),
            pos: 0,
        }
    }

    fn error(&self, reason: impl Into<String>) -> PathError {
        PathError::malformed(self.expr, reason)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn expect(&mut self, wanted: char) -> Result<(), PathError> {
        match self.bump() {
            Some(c) if c == wanted => Ok(()),
            Some(c) => Err(self.error(format!(
                "expected '{wanted}' at offset {}, found '{c}'",
                self.pos - 1
            ))),
            None => Err(self.error(format!("expected '{wanted}', found end of path"))),
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn parse(mut self) -> Result<DataPath, PathError> {
        if self.chars.is_empty() {
            return Err(self.error("empty path"));
        }
        if self.peek() != Some('/') {
            return Err(self.error("path must be absolute"));
        }
        if self.chars.len() == 1 {
            return Ok(DataPath::root());
        }

        let mut steps = Vec::new();
        while self.peek().is_some() {
            self.expect('/')?;
            steps.push(self.step()?);
        }
        Ok(DataPath { steps })
    }

    fn step(&mut self) -> Result<PathStep, PathError> {
        let mut step = if self.peek() == Some('*') {
            self.bump();
            PathStep::unqualified(PathStep::WILDCARD)
        } else {
            let first = self.identifier()?;
            if self.peek() == Some(':') {
                self.bump();
                if self.peek() == Some('*') {
                    self.bump();
                    PathStep::qualified(first, PathStep::WILDCARD)
                } else {
                    PathStep::qualified(first, self.identifier()?)
                }
            } else {
                PathStep::unqualified(first)
            }
        };

        while self.peek() == Some('[') {
            self.bump();
            self.skip_whitespace();
            let predicate = if self.peek() == Some('.') {
                self.bump();
                self.skip_whitespace();
                self.expect('=')?;
                self.skip_whitespace();
                Predicate::Value(self.quoted()?)
            } else {
                let mut name = self.identifier()?;
                // Key names may carry a (redundant) module prefix.
                if self.peek() == Some(':') {
                    self.bump();
                    name = self.identifier()?;
                }
                self.skip_whitespace();
                self.expect('=')?;
                self.skip_whitespace();
                Predicate::Key {
                    name,
                    value: self.quoted()?,
                }
            };
            self.skip_whitespace();
            self.expect(']')?;
            step.predicates.push(predicate);
        }

        if step.is_wildcard() && !step.predicates.is_empty() {
            return Err(self.error("a wildcard step cannot carry predicates"));
        }
        match self.peek() {
            None | Some('/') => Ok(step),
            Some(c) => Err(self.error(format!("unexpected '{c}' at offset {}", self.pos))),
        }
    }

    fn identifier(&mut self) -> Result<String, PathError> {
        let start = self.pos;
        match self.peek() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                self.pos += 1;
            }
            Some(c) => {
                return Err(self.error(format!(
                    "expected an identifier at offset {start}, found '{c}'"
                )))
            }
            None => return Err(self.error("expected an identifier, found end of path")),
        }
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        {
            self.pos += 1;
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn quoted(&mut self) -> Result<String, PathError> {
        let quote = match self.bump() {
            Some(q @ ('\'' | '"')) => q,
            _ => return Err(self.error("predicate value must be quoted")),
        };
        let start = self.pos;
        while let Some(c) = self.bump() {
            if c == quote {
                return Ok(self.chars[start..self.pos - 1].iter().collect());
            }
        }
        Err(self.error("unterminated quoted value"))
    }
}
