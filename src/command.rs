/// Prefix routing the UI layer applies before anything reaches the model.
pub const ECHO_PREFIX: &str = "/echo ";
pub const VOICE_PREFIX: &str = "/vc ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    /// Immediate text-to-speech request, bypasses the model entirely.
    Echo(String),
    /// Natural-language command routed through the voice-command corrector.
    VoiceCommand(String),
    /// Everything else: a regular chat turn.
    Chat(String),
}

/// Classify raw user input by its command prefix.
pub fn classify(input: &str) -> CommandKind {
    let input = input.trim();

    if let Some(rest) = input.strip_prefix(ECHO_PREFIX) {
        CommandKind::Echo(rest.trim().to_string())
    } else if let Some(rest) = input.strip_prefix(VOICE_PREFIX) {
        CommandKind::VoiceCommand(rest.trim().to_string())
    } else {
        CommandKind::Chat(input.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echo_prefix_routes_to_echo() {
        assert_eq!(
            classify("/echo hello there"),
            CommandKind::Echo("hello there".to_string())
        );
    }

    #[test]
    fn voice_prefix_routes_to_voice_command() {
        assert_eq!(
            classify("/vc click the home button"),
            CommandKind::VoiceCommand("click the home button".to_string())
        );
    }

    #[test]
    fn plain_text_routes_to_chat() {
        assert_eq!(
            classify("what is 2+2"),
            CommandKind::Chat("what is 2+2".to_string())
        );
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        assert_eq!(
            classify("  /vc open calculator  "),
            CommandKind::VoiceCommand("open calculator".to_string())
        );
    }

    #[test]
    fn prefix_without_trailing_space_is_chat() {
        // "/echotest" is not an echo command.
        assert_eq!(
            classify("/echotest"),
            CommandKind::Chat("/echotest".to_string())
        );
    }
}
