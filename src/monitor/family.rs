// Which family models the server has pulled

use serde::{Deserialize, Serialize};

use crate::family::{Member, Roster};
use crate::ollama::{model_available, ModelServer};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberModelState {
    pub member: Member,
    pub model: String,
    pub available: bool,
    pub backup_model: String,
    pub backup_available: bool,
}

impl MemberModelState {
    pub fn label(&self) -> &'static str {
        if self.available {
            "Ready"
        } else {
            "Loading"
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FamilyStatus {
    Online(Vec<MemberModelState>),
    /// Server could not be asked; carries the reason
    Offline(String),
}

impl FamilyStatus {
    pub fn is_online(&self) -> bool {
        matches!(self, FamilyStatus::Online(_))
    }
}

/// Check each member's model against the server listing
pub fn family_from_listing(listing: &[String], roster: &Roster) -> Vec<MemberModelState> {
    roster
        .iter()
        .map(|(member, profile)| MemberModelState {
            member,
            model: profile.model.clone(),
            available: model_available(listing, &profile.model),
            backup_model: profile.backup_model.clone(),
            backup_available: model_available(listing, &profile.backup_model),
        })
        .collect()
}

pub async fn family_status(server: &dyn ModelServer, roster: &Roster) -> FamilyStatus {
    match server.list_models().await {
        Ok(listing) => FamilyStatus::Online(family_from_listing(&listing, roster)),
        Err(e) => FamilyStatus::Offline(format!("Cannot check model server status: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ollama::fake::ScriptedServer;

    #[tokio::test]
    async fn test_ready_and_loading() {
        let server = ScriptedServer::constant("").with_models(&["mistral:7b", "PHI:2.7b"]);
        let status = family_status(&server, &Roster::default()).await;

        let FamilyStatus::Online(members) = status else {
            panic!("expected online");
        };
        assert_eq!(members.len(), 3);
        assert_eq!(members[0].member, Member::Claudae);
        assert_eq!(members[0].label(), "Ready");
        assert!(members[0].backup_available);
        assert_eq!(members[1].label(), "Loading");
        assert!(!members[1].backup_available);
    }

    #[tokio::test]
    async fn test_offline() {
        let server = ScriptedServer::offline();
        let status = family_status(&server, &Roster::default()).await;
        assert!(!status.is_online());
    }
}
