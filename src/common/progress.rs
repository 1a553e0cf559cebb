use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::ui::{OutputFormat, get_output_format};

/// Progress output is only drawn for human readers; JSON consumers get events only.
fn hidden_in_json(pb: ProgressBar) -> ProgressBar {
    if get_output_format() == OutputFormat::Json {
        ProgressBar::hidden()
    } else {
        pb
    }
}

pub fn create_spinner(message: String) -> ProgressBar {
    let pb = hidden_in_json(ProgressBar::new_spinner());
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠁⠉⠙⠚⠒⠂⠂⠒⠲⠴⠤⠄⠄⠤⠠⠠⠤⠦⠖⠒⠐⠐⠒⠓⠋⠉⠙⠚⠒⠂⠂⠒⠲⠴⠤⠄⠄⠤⠠⠠⠤⠦⠖⠒⠐⠐⠒⠓⠋⠉⠙⠚"),
    );
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Byte progress for a download. Falls back to a spinner when the server
/// does not send a content length.
pub fn create_download_bar(total: Option<u64>, message: String) -> ProgressBar {
    let Some(total) = total else {
        return create_spinner(message);
    };

    let pb = hidden_in_json(ProgressBar::new(total));
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:30}] {bytes}/{total_bytes} ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    pb.set_message(message);
    pb
}

/// Finish a spinner and print a success message with a checkmark
/// This clears the spinner line entirely and prints a clean message
pub fn finish_spinner_with_success(pb: ProgressBar, message: impl Into<String>) {
    pb.finish_and_clear();
    if get_output_format() == OutputFormat::Text {
        println!("✓ {}", message.into());
    }
}
