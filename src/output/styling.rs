use console::{style, StyledObject};
use std::fmt::Display;

/// What a piece of terminal output is saying about a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Pending,
    Done,
    Failed,
    Heading,
    Muted,
}

impl Tone {
    pub fn paint<T: Display>(self, text: T) -> StyledObject<String> {
        let styled = style(text.to_string());
        match self {
            Tone::Pending => styled.yellow().bright(),
            Tone::Done => styled.green().bright(),
            Tone::Failed => styled.red().bright(),
            Tone::Heading => styled.magenta().bold(),
            Tone::Muted => styled.dim(),
        }
    }
}
