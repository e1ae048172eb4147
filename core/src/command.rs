use serde::{Deserialize, Serialize};

/// Session-level commands issued by tooling (the day runner's IPC mode).
/// Variants are appended, never removed or reordered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum SessionCommand {
    // ── Clock control ─────────────────────────────
    Freeze,
    Unfreeze,
    SetSpeed { speed: u32 },

    // ── Time skips ────────────────────────────────
    /// Sleep until the next occurrence of hour:minute.
    Sleep { hour: u32, minute: u32 },

    // ── Persistence ───────────────────────────────
    Save,
    Load,
}
