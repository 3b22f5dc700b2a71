use serde::{Deserialize, Serialize};

/// Room-category fallback used when a room has no explicit mode of its own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomNotificationMode {
    AllMessages,
    MentionsAndKeywordsOnly,
    Mute,
}

impl RoomNotificationMode {
    pub const ALL: [RoomNotificationMode; 3] = [
        RoomNotificationMode::AllMessages,
        RoomNotificationMode::MentionsAndKeywordsOnly,
        RoomNotificationMode::Mute,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoomNotificationMode::AllMessages => "all_messages",
            RoomNotificationMode::MentionsAndKeywordsOnly => "mentions_and_keywords_only",
            RoomNotificationMode::Mute => "mute",
        }
    }
}

impl std::fmt::Display for RoomNotificationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RoomNotificationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all_messages" | "all" => Ok(RoomNotificationMode::AllMessages),
            "mentions_and_keywords_only" | "mentions" => {
                Ok(RoomNotificationMode::MentionsAndKeywordsOnly)
            }
            "mute" => Ok(RoomNotificationMode::Mute),
            other => Err(format!("unknown notification mode: {}", other)),
        }
    }
}

/// Account-level notification settings as read from the settings service.
///
/// `Valid` only exists when the encrypted and unencrypted defaults agree for
/// both room categories; the default-mode fields carry the encrypted values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum MatrixSettings {
    #[default]
    Uninitialized,
    Valid {
        at_room_enabled: bool,
        call_enabled: bool,
        invite_for_me_enabled: bool,
        default_group_mode: RoomNotificationMode,
        default_one_to_one_mode: RoomNotificationMode,
    },
    Invalid {
        fix_failed: bool,
    },
}

impl MatrixSettings {
    pub fn is_valid(&self) -> bool {
        matches!(self, MatrixSettings::Valid { .. })
    }
}

/// Mirror of the OS-level switch and the per-device push flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AppSettings {
    pub system_notifications_enabled: bool,
    pub app_notifications_enabled: bool,
}
