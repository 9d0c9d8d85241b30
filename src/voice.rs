use std::process::Stdio;

use colored::*;
use serde_json::json;

use crate::mcp::ToolGateway;

/// Sentinel returned when the correction tool ran but produced no usable
/// content.
pub const NOT_RECOGNIZED: &str = "COMMAND NOT RECOGNIZED";

/// Fixed gateway tool the voice-command path routes through.
pub const CORRECTION_TOOL: &str = "correct_command";

const TURN_MARKERS: [&str; 2] = ["<start_of_turn>", "<end_of_turn>"];

/// Strip turn-delimiter markers and surrounding whitespace.
pub fn clean_spoken_text(text: &str) -> String {
    let mut cleaned = text.to_string();
    for marker in TURN_MARKERS {
        cleaned = cleaned.replace(marker, "");
    }
    cleaned.trim().to_string()
}

/// Whether cleaned text may be handed to the speech sink. Empty text and
/// error-shaped results are filtered out.
pub fn should_speak(cleaned: &str) -> bool {
    !cleaned.is_empty() && !cleaned.starts_with("Error:") && !cleaned.starts_with(NOT_RECOGNIZED)
}

/// Speech sink collaborator: speak or silently fail. Nothing in the
/// conversation path depends on speech succeeding.
pub trait Speaker: Send + Sync {
    fn speak(&self, text: &str);
}

/// Speaks by spawning the configured system TTS command (`espeak`, `say`).
pub struct SystemSpeaker {
    program: String,
}

impl SystemSpeaker {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
        }
    }
}

impl Speaker for SystemSpeaker {
    fn speak(&self, text: &str) {
        let spawned = tokio::process::Command::new(&self.program)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        match spawned {
            Ok(mut child) => {
                // Reap in the background; playback is fire and forget.
                tokio::spawn(async move {
                    let _ = child.wait().await;
                });
            }
            Err(e) => {
                eprintln!(
                    "{}",
                    format!("[voice] speech command '{}' failed: {}", self.program, e).dimmed()
                );
            }
        }
    }
}

/// Speech output disabled.
pub struct NullSpeaker;

impl Speaker for NullSpeaker {
    fn speak(&self, _text: &str) {}
}

/// Clean, gate, then speak. Filtered text is logged and skipped.
pub fn speak_gated(speaker: &dyn Speaker, text: &str) {
    let cleaned = clean_spoken_text(text);
    if should_speak(&cleaned) {
        speaker.speak(&cleaned);
    } else {
        eprintln!(
            "{}",
            format!("[voice] not speaking filtered text: {:?}", cleaned).dimmed()
        );
    }
}

/// One-shot voice-command correction: send the natural-language command
/// through the fixed correction tool on a fresh gateway session and return
/// the normalized command string.
///
/// This path never fails. A gateway session error comes back as an
/// error-describing string and an empty tool result as the
/// [`NOT_RECOGNIZED`] sentinel; callers announce whatever they get.
pub async fn correct_command(
    gateway: &dyn ToolGateway,
    speaker: &dyn Speaker,
    natural_command: &str,
) -> String {
    let arguments = json!({ "query": natural_command });

    match gateway.call_tool(CORRECTION_TOOL, &arguments).await {
        Ok(result) => match result.first_text() {
            Some(text) => {
                let corrected = text.to_string();
                speak_gated(speaker, &corrected);
                corrected
            }
            None => NOT_RECOGNIZED.to_string(),
        },
        Err(e) => format!("Error processing voice command: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleaning_strips_markers_and_whitespace() {
        assert_eq!(
            clean_spoken_text("  <start_of_turn>CLICK home<end_of_turn> "),
            "CLICK home"
        );
    }

    #[test]
    fn cleaned_command_is_speakable() {
        let cleaned = clean_spoken_text("  <start_of_turn>CLICK home<end_of_turn> ");
        assert!(should_speak(&cleaned));
    }

    #[test]
    fn errors_are_never_spoken() {
        assert!(!should_speak("Error: timeout"));
    }

    #[test]
    fn empty_text_is_never_spoken() {
        assert!(!should_speak(""));
        assert!(!should_speak(&clean_spoken_text("  <end_of_turn>  ")));
    }

    #[test]
    fn sentinel_is_never_spoken() {
        assert!(!should_speak(NOT_RECOGNIZED));
        assert!(!should_speak("COMMAND NOT RECOGNIZED: no match"));
    }

    #[test]
    fn ordinary_text_passes_the_gate() {
        assert!(should_speak("OPEN calculator"));
    }
}
