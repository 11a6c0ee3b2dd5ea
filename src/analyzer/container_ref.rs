//! Failing-container extraction from free-text condition messages.
//!
//! The kubelet names unready containers in the `ContainersReady` / `Ready`
//! condition message, e.g.
//! `containers with unready status: [web sidecar]`. The grammar accepted by
//! [`UnreadyStatusParser`] is:
//!
//! ```text
//! message := .* marker "[" ws* ident (ws | "]") .*
//! marker  := "containers with unready status: "
//!          | "containers with incomplete status: "
//! ident   := [a-z0-9] [a-z0-9-]*
//! ```
//!
//! The first identifier after the first marker is returned. Anything else
//! yields `None` and the caller falls back to a per-container report.

/// Names the container a condition message blames, if any.
pub trait FailingContainerParser: Send + Sync {
    fn failing_container(&self, message: &str) -> Option<String>;
}

const MARKERS: [&str; 2] = [
    "containers with unready status: ",
    "containers with incomplete status: ",
];

/// Default parser for kubelet-generated condition messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnreadyStatusParser;

impl FailingContainerParser for UnreadyStatusParser {
    fn failing_container(&self, message: &str) -> Option<String> {
        let rest = MARKERS
            .iter()
            .filter_map(|marker| message.find(marker).map(|at| (at, marker.len())))
            .min_by_key(|(at, _)| *at)
            .map(|(at, len)| &message[at + len..])?;

        let list = rest.strip_prefix('[')?.trim_start();
        let end = list
            .find(|c: char| c.is_whitespace() || c == ']')
            .unwrap_or(list.len());
        let ident = &list[..end];

        is_container_name(ident).then(|| ident.to_string())
    }
}

fn is_container_name(ident: &str) -> bool {
    let mut chars = ident.chars();
    match chars.next() {
        Some(first) if first.is_ascii_lowercase() || first.is_ascii_digit() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}
