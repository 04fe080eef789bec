// The AI family roster
//
// Three named members, each backed by a model on the local server.
// Model names and timeouts are configurable; names and roles are not.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[derive(clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Member {
    Claudae,
    Nyala,
    Deon,
}

impl Member {
    /// Every member, in the order health checks and status reports use
    pub const ALL: [Member; 3] = [Member::Claudae, Member::Nyala, Member::Deon];

    /// Lowercase key used for file names and JSON records
    pub fn key(&self) -> &'static str {
        match self {
            Member::Claudae => "claudae",
            Member::Nyala => "nyala",
            Member::Deon => "deon",
        }
    }

    /// Uppercase display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Member::Claudae => "CLAUDAE",
            Member::Nyala => "NYALA",
            Member::Deon => "DEON",
        }
    }

    pub fn role(&self) -> &'static str {
        match self {
            Member::Claudae => "System Guardian",
            Member::Nyala => "Trading Engine",
            Member::Deon => "Risk Grader",
        }
    }

    /// Prompt used when a member is tested without an explicit prompt
    pub fn readiness_prompt(&self) -> String {
        format!(
            "You are {}, the {} for HONEY DUO WEALTH. Confirm your role and readiness.",
            self.display_name(),
            self.role()
        )
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Member {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "claudae" => Ok(Member::Claudae),
            "nyala" => Ok(Member::Nyala),
            "deon" => Ok(Member::Deon),
            other => anyhow::bail!("Unknown family member '{}' (expected claudae, nyala or deon)", other),
        }
    }
}

/// Model assignment for one member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberProfile {
    /// Primary model tag on the server (e.g. "mistral:7b")
    pub model: String,

    /// Smaller model used when the primary is not loaded
    pub backup_model: String,

    /// Timeout for a full (non-quick) call, in seconds
    pub timeout_secs: u64,
}

impl MemberProfile {
    pub fn default_for(member: Member) -> Self {
        match member {
            Member::Claudae => Self {
                model: "mistral:7b".to_string(),
                backup_model: "phi:2.7b".to_string(),
                timeout_secs: 120,
            },
            Member::Nyala => Self {
                model: "mixtral:8x7b".to_string(),
                backup_model: "neural-chat:7b".to_string(),
                timeout_secs: 300,
            },
            Member::Deon => Self {
                model: "llama2:13b".to_string(),
                backup_model: "phi:2.7b".to_string(),
                timeout_secs: 180,
            },
        }
    }
}

/// The configured roster: one profile per member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Roster {
    #[serde(default = "default_claudae")]
    pub claudae: MemberProfile,
    #[serde(default = "default_nyala")]
    pub nyala: MemberProfile,
    #[serde(default = "default_deon")]
    pub deon: MemberProfile,
}

fn default_claudae() -> MemberProfile {
    MemberProfile::default_for(Member::Claudae)
}

fn default_nyala() -> MemberProfile {
    MemberProfile::default_for(Member::Nyala)
}

fn default_deon() -> MemberProfile {
    MemberProfile::default_for(Member::Deon)
}

impl Default for Roster {
    fn default() -> Self {
        Self {
            claudae: default_claudae(),
            nyala: default_nyala(),
            deon: default_deon(),
        }
    }
}

impl Roster {
    pub fn profile(&self, member: Member) -> &MemberProfile {
        match member {
            Member::Claudae => &self.claudae,
            Member::Nyala => &self.nyala,
            Member::Deon => &self.deon,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Member, &MemberProfile)> {
        Member::ALL.into_iter().map(move |m| (m, self.profile(m)))
    }
}
