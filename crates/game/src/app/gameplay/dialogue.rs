use std::collections::VecDeque;

use engine::DialoguePanel;

const TYPING_CHARS_PER_SECOND: f32 = 40.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DialogueLine {
    pub(crate) speaker: String,
    pub(crate) text: String,
}

impl DialogueLine {
    pub(crate) fn new(speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone)]
struct ActiveLine {
    line: DialogueLine,
    total_chars: usize,
    revealed: f32,
}

impl ActiveLine {
    fn new(line: DialogueLine) -> Self {
        Self {
            total_chars: line.text.chars().count(),
            line,
            revealed: 0.0,
        }
    }

    fn shown_chars(&self) -> usize {
        (self.revealed.floor() as usize).min(self.total_chars)
    }

    fn is_typed(&self) -> bool {
        self.shown_chars() >= self.total_chars
    }
}

/// Modal queue of speaker lines revealed a few characters at a time.
#[derive(Debug, Default)]
pub(crate) struct DialogueBox {
    current: Option<ActiveLine>,
    queued: VecDeque<DialogueLine>,
}

impl DialogueBox {
    pub(crate) fn enqueue(&mut self, lines: impl IntoIterator<Item = DialogueLine>) {
        self.queued
            .extend(lines.into_iter().filter(|line| !line.text.trim().is_empty()));
        if self.current.is_none() {
            self.current = self.queued.pop_front().map(ActiveLine::new);
        }
    }

    pub(crate) fn update(&mut self, dt_seconds: f32) {
        if let Some(active) = self.current.as_mut() {
            if !active.is_typed() {
                active.revealed += dt_seconds.max(0.0) * TYPING_CHARS_PER_SECOND;
            }
        }
    }

    /// Interact while typing shows the whole line; on a finished line it
    /// moves to the next one, closing the box after the last.
    pub(crate) fn advance(&mut self) {
        let Some(active) = self.current.as_mut() else {
            return;
        };
        if !active.is_typed() {
            active.revealed = active.total_chars as f32;
            return;
        }
        self.current = self.queued.pop_front().map(ActiveLine::new);
    }

    /// Nothing showing and nothing queued.
    pub(crate) fn is_idle(&self) -> bool {
        self.current.is_none()
    }

    pub(crate) fn panel(&self) -> Option<DialoguePanel> {
        self.current.as_ref().map(|active| DialoguePanel {
            speaker: active.line.speaker.clone(),
            text: active.line.text.chars().take(active.shown_chars()).collect(),
            awaiting_advance: active.is_typed(),
        })
    }
}
