//! Rendering of search results, for a terminal or for the Alfred launcher.

use std::fmt::Write as _;

use serde::Serialize;

use crate::search::{Output, OutputKind};

const GREEN: &str = "\x1b[1;32m";
const TEAL: &str = "\x1b[1;36m";
const RED: &str = "\x1b[1;31m";
const RESET: &str = "\x1b[0m";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlfredItem {
    pub title: String,
    pub subtitle: String,
    pub arg: String,
    pub valid: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlfredItems {
    pub items: Vec<AlfredItem>,
}

impl AlfredItems {
    /// Tokens without a code are left out, hints are kept.
    pub fn from_outputs(outputs: &[Output]) -> Self {
        let items = outputs
            .iter()
            .filter_map(|output| {
                let (subtitle, arg) = match &output.kind {
                    OutputKind::Code {
                        code,
                        remaining_seconds,
                    } => (
                        format!(
                            "Code: {code} [Press Enter copy to clipboard], Expires in {remaining_seconds} second(s)"
                        ),
                        code.clone(),
                    ),
                    OutputKind::Notice { action } => (action.clone(), action.clone()),
                    OutputKind::Error(_) => return None,
                };

                Some(AlfredItem {
                    title: output.title.clone(),
                    subtitle,
                    arg,
                    valid: true,
                })
            })
            .collect();

        Self { items }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Colored, human readable listing.
pub fn pretty(outputs: &[Output]) -> String {
    let mut text = String::from("\n");

    for output in outputs {
        let _ = writeln!(text, "- Title: {GREEN}{}{RESET}", output.title);
        let _ = match &output.kind {
            OutputKind::Code {
                code,
                remaining_seconds,
            } => writeln!(
                text,
                "- Code: {TEAL}{code}{RESET} Expires in {RED}{remaining_seconds}{RESET}(s)\n"
            ),
            OutputKind::Error(err) => writeln!(text, "- {err}\n"),
            OutputKind::Notice { action } => writeln!(text, "- Run: {action}\n"),
        };
    }

    text
}
