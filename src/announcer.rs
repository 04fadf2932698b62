use std::process::{Child, Command, Stdio};

use lap_core::{Announcer, CollaboratorError, Language};
use serde::{Deserialize, Serialize};

const DEFAULT_RATE: f32 = 0.5;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    pub enabled: bool,
    /// Speech program and arguments; the text is appended as the last argument.
    /// `{wpm}` and `{lang}` are substituted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// 0.1 (slow) to 1.0 (fast).
    pub rate: f32,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: None,
            rate: DEFAULT_RATE,
        }
    }
}

impl VoiceConfig {
    /// Words per minute for backends that take one.
    pub fn words_per_minute(&self) -> u32 {
        let rate = if self.rate > 0.0 { self.rate } else { DEFAULT_RATE };
        ((rate * 350.0).round() as u32).clamp(80, 450)
    }
}

/// Speech output chosen from the voice settings.
pub enum HostAnnouncer {
    Silent,
    Console,
    Command(CommandAnnouncer),
}

impl HostAnnouncer {
    pub fn from_config(config: &VoiceConfig, language: Language) -> Self {
        if !config.enabled {
            return HostAnnouncer::Silent;
        }
        match config.command.as_deref() {
            Some(line) => match CommandAnnouncer::parse(line, config.words_per_minute(), language) {
                Some(cmd) => HostAnnouncer::Command(cmd),
                None => {
                    log::warn!("empty speech command, printing announcements instead");
                    HostAnnouncer::Console
                }
            },
            None => HostAnnouncer::Console,
        }
    }
}

impl Announcer for HostAnnouncer {
    fn speak_number(&mut self, n: i64) -> Result<(), CollaboratorError> {
        match self {
            HostAnnouncer::Silent => Ok(()),
            HostAnnouncer::Console => {
                println!("  » {}", n);
                Ok(())
            }
            HostAnnouncer::Command(cmd) => cmd.speak(&n.to_string()),
        }
    }

    fn speak_message(&mut self, text: &str) -> Result<(), CollaboratorError> {
        match self {
            HostAnnouncer::Silent => Ok(()),
            HostAnnouncer::Console => {
                println!("  » {}", text);
                Ok(())
            }
            HostAnnouncer::Command(cmd) => cmd.speak(text),
        }
    }
}

/// Runs an external text-to-speech program per utterance.
///
/// Only one utterance plays at a time: the previous process is killed
/// before the next one starts.
pub struct CommandAnnouncer {
    program: String,
    args: Vec<String>,
    current: Option<Child>,
}

impl CommandAnnouncer {
    pub fn parse(line: &str, wpm: u32, language: Language) -> Option<Self> {
        let mut parts = line.split_whitespace().map(|part| {
            part.replace("{wpm}", &wpm.to_string())
                .replace("{lang}", language.code())
        });
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
            current: None,
        })
    }

    fn interrupt(&mut self) {
        if let Some(mut child) = self.current.take() {
            // Already exited is fine.
            child.kill().ok();
            child.wait().ok();
        }
    }

    fn speak(&mut self, text: &str) -> Result<(), CollaboratorError> {
        self.interrupt();
        let child = Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| CollaboratorError::Speech(format!("{}: {}", self.program, e)))?;
        self.current = Some(child);
        Ok(())
    }
}

impl Drop for CommandAnnouncer {
    fn drop(&mut self) {
        self.interrupt();
    }
}
