//! Build id extraction from `qwak models build` output
//!
//! The CLI prints the id underlined with ANSI escapes:
//! `Build ID \x1b[4m<id>\x1b[0m`. The pattern is tied to that exact framing;
//! a change in the CLI's output format makes extraction return `None`.

use std::sync::OnceLock;

use regex_lite::Regex;

/// Pattern matching the decorated build id line
pub const BUILD_ID_PATTERN: &str = r"Build ID \x1b\[4m([a-fA-F0-9\-]+)\x1b\[0m";

fn build_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(BUILD_ID_PATTERN).expect("build id pattern is valid"))
}

/// Whether `id` is a bare build id token (hex digits and dashes)
pub fn is_build_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_hexdigit() || c == '-')
}

/// Extract the first build id from captured CLI output
pub fn extract_build_id(output: &str) -> Option<String> {
    build_id_regex()
        .captures(output)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
}
