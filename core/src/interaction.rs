//! "Press to interact" prompt shared by NPCs, shops and the sleeping cot.
//!
//! The engine decides whether the player is facing the object (a raycast);
//! this only edge-detects that boolean and gates the interaction.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptEdge {
    Shown,
    Hidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PromptOutcome {
    pub edge:     Option<PromptEdge>,
    pub interact: bool,
}

#[derive(Debug, Clone, Default)]
pub struct InteractionPrompt {
    showing: bool,
}

impl InteractionPrompt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_showing(&self) -> bool {
        self.showing
    }

    /// Sample one frame while the player is in range.
    ///
    /// `available`: the object itself is idle and may be used. An
    /// unavailable object hides its prompt, and shows it again once it is
    /// available and still faced.
    /// `player_busy`: the player is talking or locked.
    pub fn observe(
        &mut self,
        facing: bool,
        interact_pressed: bool,
        available: bool,
        player_busy: bool,
    ) -> PromptOutcome {
        let showing = facing && available;
        let was_showing = std::mem::replace(&mut self.showing, showing);

        let edge = match (was_showing, showing) {
            (false, true) => Some(PromptEdge::Shown),
            (true, false) => Some(PromptEdge::Hidden),
            _ => None,
        };

        PromptOutcome {
            edge,
            interact: showing && interact_pressed && !player_busy,
        }
    }

    /// The player walked out of range. Returns true if the prompt was up.
    pub fn leave_range(&mut self) -> bool {
        std::mem::replace(&mut self.showing, false)
    }
}
