//! Single-line progress rendering for verbose runs

use crate::git::HEAD_LABEL;

/// One flag per stage: which stages are configured, or which have finished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageFlags {
    pub pre: bool,
    pub metric: bool,
    pub post: bool,
}

impl StageFlags {
    pub const NONE: StageFlags = StageFlags {
        pre: false,
        metric: false,
        post: false,
    };
}

/// Render `"<label>: pre [x] ; metric [ ] ; post [ ]"`.
///
/// Stages missing from `present` are left out. With no stage present the
/// line falls back to `metric [ ]`. The label column is padded to the
/// longer of `base_ref` and `HEAD` so the base and current lines align.
pub fn render_line(branch: &str, base_ref: &str, present: StageFlags, done: StageFlags) -> String {
    let stages = [
        ("pre", present.pre, done.pre),
        ("metric", present.metric, done.metric),
        ("post", present.post, done.post),
    ];

    let parts: Vec<String> = stages
        .into_iter()
        .filter(|(_, present, _)| *present)
        .map(|(name, _, done)| format!("{name} {}", if done { "[x]" } else { "[ ]" }))
        .collect();

    let width = base_ref.chars().count().max(HEAD_LABEL.len());
    let padding = " ".repeat(width.saturating_sub(branch.chars().count()) + 1);

    if parts.is_empty() {
        format!("{branch}:{padding}metric [ ]")
    } else {
        format!("{branch}:{padding}{}", parts.join(" ; "))
    }
}
