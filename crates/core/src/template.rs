// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The drover authors

//! Argument template interpolation

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;

/// Regex pattern for ${variable_name}
// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
pub static VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([a-zA-Z_][a-zA-Z0-9_]*)\}").expect("constant regex pattern is valid")
});

// Regex pattern for ${VAR:-default} environment variable expansion
#[allow(clippy::expect_used)]
static ENV_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{(\w+):-([^}]*)\}").expect("constant regex pattern is valid"));

/// Names of the variables bound for every attempt.
pub mod vars {
    pub const ITEM: &str = "item";
    pub const TOKEN: &str = "token";
    pub const OUTPUT: &str = "output";
    pub const ITEM_LIST: &str = "item_list";
    pub const SCRATCH: &str = "scratch";
    pub const RESULTS_DIR: &str = "results_dir";
    pub const ATTEMPT: &str = "attempt";
}

/// Interpolate `${name}` placeholders with values from the vars map
///
/// Also expands `${VAR:-default}` patterns from environment variables.
/// Environment variables are expanded first, then template variables.
///
/// Unknown template variables are left as-is.
pub fn interpolate(template: &str, vars: &HashMap<String, String>) -> String {
    let result = ENV_PATTERN
        .replace_all(template, |caps: &regex::Captures| {
            let var_name = &caps[1];
            let default_value = &caps[2];
            std::env::var(var_name).unwrap_or_else(|_| default_value.to_string())
        })
        .to_string();

    VAR_PATTERN
        .replace_all(&result, |caps: &regex::Captures| {
            let name = &caps[1];
            match vars.get(name) {
                Some(val) => val.clone(),
                None => caps[0].to_string(),
            }
        })
        .to_string()
}

/// An external command: program plus argument templates.
///
/// Each template renders to exactly one argv entry; no shell is involved,
/// so values never need quoting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandTemplate {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandTemplate {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self { program: program.into(), args }
    }

    /// Render the argument list for one attempt.
    pub fn render_args(&self, vars: &HashMap<String, String>) -> Vec<String> {
        self.args.iter().map(|arg| interpolate(arg, vars)).collect()
    }

    /// Render the full command line for display (dry runs, logs).
    pub fn render_display(&self, vars: &HashMap<String, String>) -> String {
        let mut parts = vec![display_quote(&self.program)];
        parts.extend(self.render_args(vars).iter().map(|a| display_quote(a)));
        parts.join(" ")
    }
}

fn display_quote(s: &str) -> String {
    if !s.is_empty() && !s.contains([' ', '\t', '"', '\'']) {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', "'\\''"))
    }
}

#[cfg(test)]
#[path = "template_tests.rs"]
mod tests;
