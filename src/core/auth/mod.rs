use serde::{Deserialize, Serialize};

const OFFLINE_UUID: &str = "00000000-0000-0000-0000-000000000000";
const OFFLINE_ACCESS_TOKEN: &str = "offline_access_token";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AccountMode {
    Offline,
    Microsoft,
    Mojang,
}

/// An authenticated (or offline) account as stored in the launcher config.
///
/// Authentication itself happens elsewhere; the launch core only reads the
/// resulting profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthAccount {
    pub mode: AccountMode,
    pub display_name: String,
    pub uuid: String,
    pub access_token: String,
    #[serde(default)]
    pub user_type: String,
}

impl AuthAccount {
    pub fn offline(display_name: &str) -> Self {
        Self {
            mode: AccountMode::Offline,
            display_name: display_name.trim().to_string(),
            uuid: OFFLINE_UUID.into(),
            access_token: OFFLINE_ACCESS_TOKEN.into(),
            user_type: "legacy".into(),
        }
    }

    /// Fill blank fields so argument substitution never emits empty values.
    pub fn sanitized(mut self) -> Self {
        if self.display_name.trim().is_empty() {
            self.display_name = "Player".into();
        }
        if self.uuid.trim().is_empty() {
            self.uuid = OFFLINE_UUID.into();
        }
        if self.access_token.trim().is_empty() {
            self.access_token = OFFLINE_ACCESS_TOKEN.into();
        }
        if self.user_type.trim().is_empty() {
            self.user_type = match self.mode {
                AccountMode::Offline => "legacy".into(),
                AccountMode::Microsoft => "msa".into(),
                AccountMode::Mojang => "mojang".into(),
            };
        }
        self
    }

    /// Undashed uuid, the form the game expects on its command line.
    pub fn simple_uuid(&self) -> String {
        self.uuid.replace('-', "")
    }
}
