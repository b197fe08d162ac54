use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdeaStatus {
    EnAttentePrequalification,
    EnAttenteDeQualification,
    EnCoursDeQualification,
    Validee,
    Ajournee,
    Rejetee,
    PocEnCours,
    PocTermineFavorable,
    PocTermineDefavorable,
    EnDeveloppement,
    Realisee,
    Archivee,
    /// A status this client does not know about yet. Keeps a whole list
    /// from failing to decode because of one new backend value.
    #[serde(other)]
    Unknown,
}

/// Colour family of a status badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTone {
    Positive,
    Negative,
    Pending,
}

impl IdeaStatus {
    pub const ALL: &[IdeaStatus] = &[
        IdeaStatus::EnAttentePrequalification,
        IdeaStatus::EnAttenteDeQualification,
        IdeaStatus::EnCoursDeQualification,
        IdeaStatus::Validee,
        IdeaStatus::Ajournee,
        IdeaStatus::Rejetee,
        IdeaStatus::PocEnCours,
        IdeaStatus::PocTermineFavorable,
        IdeaStatus::PocTermineDefavorable,
        IdeaStatus::EnDeveloppement,
        IdeaStatus::Realisee,
        IdeaStatus::Archivee,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IdeaStatus::EnAttentePrequalification => "EN_ATTENTE_PREQUALIFICATION",
            IdeaStatus::EnAttenteDeQualification => "EN_ATTENTE_DE_QUALIFICATION",
            IdeaStatus::EnCoursDeQualification => "EN_COURS_DE_QUALIFICATION",
            IdeaStatus::Validee => "VALIDEE",
            IdeaStatus::Ajournee => "AJOURNEE",
            IdeaStatus::Rejetee => "REJETEE",
            IdeaStatus::PocEnCours => "POC_EN_COURS",
            IdeaStatus::PocTermineFavorable => "POC_TERMINE_FAVORABLE",
            IdeaStatus::PocTermineDefavorable => "POC_TERMINE_DEFAVORABLE",
            IdeaStatus::EnDeveloppement => "EN_DEVELOPPEMENT",
            IdeaStatus::Realisee => "REALISEE",
            IdeaStatus::Archivee => "ARCHIVEE",
            IdeaStatus::Unknown => "UNKNOWN",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            IdeaStatus::EnAttentePrequalification => "Awaiting pre-qualification",
            IdeaStatus::EnAttenteDeQualification => "Awaiting qualification",
            IdeaStatus::EnCoursDeQualification => "In qualification",
            IdeaStatus::Validee => "Validated",
            IdeaStatus::Ajournee => "Postponed",
            IdeaStatus::Rejetee => "Rejected",
            IdeaStatus::PocEnCours => "POC in progress",
            IdeaStatus::PocTermineFavorable => "POC favorable",
            IdeaStatus::PocTermineDefavorable => "POC unfavorable",
            IdeaStatus::EnDeveloppement => "In development",
            IdeaStatus::Realisee => "Delivered",
            IdeaStatus::Archivee => "Archived",
            IdeaStatus::Unknown => "Unknown",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        IdeaStatus::ALL.iter().copied().find(|st| st.as_str() == s)
    }

    pub fn tone(&self) -> StatusTone {
        match self {
            IdeaStatus::Rejetee | IdeaStatus::Archivee | IdeaStatus::PocTermineDefavorable => {
                StatusTone::Negative
            }
            IdeaStatus::Validee | IdeaStatus::Realisee | IdeaStatus::PocTermineFavorable => {
                StatusTone::Positive
            }
            _ => StatusTone::Pending,
        }
    }
}

impl fmt::Display for IdeaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub const ALL: &[Priority] = &[Priority::Low, Priority::Medium, Priority::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "High" => Some(Priority::High),
            "Medium" => Some(Priority::Medium),
            "Low" => Some(Priority::Low),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Priority::High => "!!",
            Priority::Medium => "!",
            Priority::Low => "-",
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Idea {
    pub id: i64,
    pub titre: String,
    #[serde(default)]
    pub description: String,
    pub statut: IdeaStatus,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub date_creation: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motif_rejet: Option<String>,
}

/// The user-editable part of an idea. Status and priority belong to the
/// workflow and never travel through this type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdeaInput {
    pub titre: String,
    pub description: String,
}

impl IdeaInput {
    pub fn from_idea(idea: &Idea) -> Self {
        Self {
            titre: idea.titre.clone(),
            description: idea.description.clone(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.titre.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        if self.description.trim().is_empty() {
            return Err(ValidationError::EmptyDescription);
        }
        Ok(())
    }
}

/// Status and priority filters for the idea list. `None` means "any".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdeaFilter {
    pub status: Option<IdeaStatus>,
    pub priority: Option<Priority>,
}

impl IdeaFilter {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.priority.is_none()
    }

    pub fn matches(&self, idea: &Idea) -> bool {
        let status_ok = self.status.map_or(true, |s| idea.statut == s);
        let priority_ok = self.priority.map_or(true, |p| idea.priority == Some(p));
        status_ok && priority_ok
    }

    pub fn apply(&self, ideas: Vec<Idea>) -> Vec<Idea> {
        ideas.into_iter().filter(|i| self.matches(i)).collect()
    }

    /// Query parameters for `GET /api/ideas`. The backend may ignore them,
    /// so results are filtered again locally with [`IdeaFilter::apply`].
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(status) = self.status {
            pairs.push(("status", status.as_str().to_string()));
        }
        if let Some(priority) = self.priority {
            pairs.push(("priority", priority.as_str().to_string()));
        }
        pairs
    }

    /// Any -> each status in order -> Any.
    pub fn cycle_status(&mut self) {
        self.status = cycle(IdeaStatus::ALL, self.status);
    }

    pub fn cycle_priority(&mut self) {
        self.priority = cycle(Priority::ALL, self.priority);
    }
}

fn cycle<T: Copy + PartialEq>(all: &[T], current: Option<T>) -> Option<T> {
    match current {
        None => all.first().copied(),
        Some(cur) => {
            let idx = all.iter().position(|x| *x == cur)?;
            all.get(idx + 1).copied()
        }
    }
}
