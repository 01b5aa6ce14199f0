//! Feature flag extraction from C preprocessor output.
//!
//! The expected input is a macro dump such as `g++ -dM -E config.h`, one
//! definition per line. A dump contains thousands of lines that have nothing
//! to do with payload layout (include guards, pin numbers, compiler
//! builtins); everything that is not a catalog entry is dropped without
//! comment. No line shape is an error.

use std::collections::HashSet;

use log::trace;

use crate::profile::PayloadProfile;

/// Feature flags found active in the scanned input. Membership-only; the
/// scanner collapses repeated definitions.
#[derive(Debug, Default, Clone)]
pub struct ActiveFeatures {
    names: HashSet<String>,
}

impl ActiveFeatures {
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Flag names in sorted order, for logging and reports.
    pub fn sorted(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.names.iter().map(|n| n.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Set assembled directly from flag names, bypassing the scanner.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ActiveFeatures {
            names: names.into_iter().map(|n| n.into()).collect(),
        }
    }

    fn insert(&mut self, name: &str) -> bool {
        self.names.insert(name.to_string())
    }
}

/// Scans preprocessor definition lines for known feature flags.
///
/// Holds the profile by reference so the same scanner semantics apply to any
/// layout; nothing is looked up globally.
pub struct DefineScanner<'a> {
    profile: &'a PayloadProfile,
    active: ActiveFeatures,
}

impl<'a> DefineScanner<'a> {
    pub fn new(profile: &'a PayloadProfile) -> Self {
        DefineScanner {
            profile,
            active: ActiveFeatures::default(),
        }
    }

    /// Feed one input line. Never fails; lines that do not name a catalog
    /// entry are ignored.
    pub fn scan_line(&mut self, line: &str) {
        let Some(name) = define_name(line) else {
            return;
        };
        if self.profile.is_known_feature(name) && self.active.insert(name) {
            trace!("feature {} active", name);
        }
    }

    /// Feed any number of lines.
    pub fn scan_lines<'l, I>(&mut self, lines: I)
    where
        I: IntoIterator<Item = &'l str>,
    {
        for line in lines {
            self.scan_line(line);
        }
    }

    pub fn finish(self) -> ActiveFeatures {
        self.active
    }
}

/// Candidate macro name of one input line.
///
/// The line is split on whitespace; if the first token is a literal
/// `#define` the name is the token after it, otherwise the first token
/// itself. A macro value is discarded because only the name token is
/// examined, and function-like macros keep their parameter list glued to
/// the name, which never matches a catalog entry.
fn define_name(line: &str) -> Option<&str> {
    let mut tokens = line.split_whitespace();
    let first = tokens.next()?;
    if first == "#define" {
        tokens.next()
    } else {
        Some(first)
    }
}
