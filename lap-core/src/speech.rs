//! What the engine says, and how each phrase reads per language.

/// Announcement language.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Language {
    #[default]
    Chinese,
    English,
}

impl Language {
    /// BCP 47 tag handed to speech backends.
    pub fn code(self) -> &'static str {
        match self {
            Language::Chinese => "zh-CN",
            Language::English => "en-US",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        let lower = code.to_ascii_lowercase();
        if lower.starts_with("zh") {
            Some(Language::Chinese)
        } else if lower.starts_with("en") {
            Some(Language::English)
        } else {
            None
        }
    }
}

/// A single utterance produced by a tick or a command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Announcement {
    /// Seconds left in the current lap.
    Remaining(i64),
    /// The lap budget ran out and the engine moved on by itself.
    AutoAdvance,
    /// The lap budget ran out; overtime is now being counted.
    TimeUp,
    /// The final lap was granted the banked seconds.
    ExtraTimeGranted(i64),
    /// Extra time ran out; the session is over.
    ExtraTimeExhausted,
    /// The final lap was completed with this bank balance.
    Completed { banked: i64 },
}

impl Announcement {
    /// Text for message announcements; `None` for a bare number.
    pub fn message(&self, language: Language) -> Option<String> {
        let text = match (self, language) {
            (Announcement::Remaining(_), _) => return None,
            (Announcement::AutoAdvance, Language::Chinese) => "自动进入下一圈".to_string(),
            (Announcement::AutoAdvance, Language::English) => "Next lap".to_string(),
            (Announcement::TimeUp, Language::Chinese) => "时间到，请尽快完成本圈".to_string(),
            (Announcement::TimeUp, Language::English) => {
                "Time is up, finish this lap".to_string()
            }
            (Announcement::ExtraTimeGranted(secs), Language::Chinese) => {
                format!("您提前完成了训练，获得额外{}秒时间", secs)
            }
            (Announcement::ExtraTimeGranted(secs), Language::English) => {
                format!("You are ahead of schedule, {} extra seconds granted", secs)
            }
            (Announcement::ExtraTimeExhausted, Language::Chinese) => {
                "额外时间用完，计时完成".to_string()
            }
            (Announcement::ExtraTimeExhausted, Language::English) => {
                "Extra time exhausted, session complete".to_string()
            }
            (Announcement::Completed { banked }, Language::Chinese) => {
                if *banked > 0 {
                    format!("计时完成，总共节省{}秒", banked)
                } else if *banked < 0 {
                    format!("计时完成，总共超时{}秒", banked.unsigned_abs())
                } else {
                    "计时完成".to_string()
                }
            }
            (Announcement::Completed { banked }, Language::English) => {
                if *banked > 0 {
                    format!("Session complete, saved {} seconds", banked)
                } else if *banked < 0 {
                    format!("Session complete, overtime {} seconds", banked.unsigned_abs())
                } else {
                    "Session complete".to_string()
                }
            }
        };
        Some(text)
    }

    /// A completion summary outranks an auto-advance in the same tick.
    pub(crate) fn is_completion(&self) -> bool {
        matches!(
            self,
            Announcement::Completed { .. } | Announcement::ExtraTimeExhausted
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_has_no_message() {
        assert_eq!(Announcement::Remaining(12).message(Language::English), None);
    }

    #[test]
    fn test_completion_summary_variants() {
        let saved = Announcement::Completed { banked: 14 };
        let over = Announcement::Completed { banked: -9 };
        let even = Announcement::Completed { banked: 0 };
        assert_eq!(
            saved.message(Language::English).as_deref(),
            Some("Session complete, saved 14 seconds")
        );
        assert_eq!(
            over.message(Language::English).as_deref(),
            Some("Session complete, overtime 9 seconds")
        );
        assert_eq!(even.message(Language::English).as_deref(), Some("Session complete"));
        assert_eq!(over.message(Language::Chinese).as_deref(), Some("计时完成，总共超时9秒"));
    }

    #[test]
    fn test_extra_time_grant_mentions_seconds() {
        let text = Announcement::ExtraTimeGranted(20)
            .message(Language::Chinese)
            .unwrap();
        assert!(text.contains("20"));
    }

    #[test]
    fn test_language_codes() {
        assert_eq!(Language::from_code("en-GB"), Some(Language::English));
        assert_eq!(Language::from_code("zh-CN"), Some(Language::Chinese));
        assert_eq!(Language::from_code("fr"), None);
        assert_eq!(Language::English.code(), "en-US");
    }
}
