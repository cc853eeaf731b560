use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

use super::styling::Tone;

const TICK_INTERVAL: Duration = Duration::from_millis(120);

/// Spinner shown on stderr while a request is in flight
pub struct RequestProgress {
    pb: ProgressBar,
    label: String,
}

impl RequestProgress {
    pub fn start(label: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_draw_target(ProgressDrawTarget::stderr());
        pb.set_style(request_style());
        pb.set_message(Tone::Pending.paint(format!("GET {label}")).to_string());
        pb.enable_steady_tick(TICK_INTERVAL);
        Self {
            pb,
            label: label.to_string(),
        }
    }

    pub fn finish(self) {
        let message = Tone::Done.paint(format!("{} ✓", self.label));
        self.pb.finish_with_message(message.to_string());
    }

    pub fn fail(self) {
        let message = Tone::Failed.paint(format!("{} ✗", self.label));
        self.pb.abandon_with_message(message.to_string());
    }
}

fn request_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner} {msg} {elapsed:.dim}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
}
