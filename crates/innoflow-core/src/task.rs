use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::idea::Idea;

/// One unit of human work in an idea's process instance.
///
/// `assignee == None` means any member of the candidate group may claim it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub task_definition_key: String,
    #[serde(default)]
    pub assignee: Option<String>,
    pub process_instance_id: String,
    #[serde(default)]
    pub created: Option<String>,
}

impl Task {
    pub fn is_assigned(&self) -> bool {
        self.assignee.as_deref().is_some_and(|a| !a.is_empty())
    }

    /// Best-effort parse of the engine timestamp. Accepts RFC 3339 and the
    /// engine's `+0000` offset form.
    pub fn created_at(&self) -> Option<DateTime<FixedOffset>> {
        let raw = self.created.as_deref()?;
        DateTime::parse_from_rfc3339(raw)
            .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z"))
            .ok()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poc {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub date_debut: Option<NaiveDate>,
    #[serde(default)]
    pub date_fin: Option<NaiveDate>,
    #[serde(default)]
    pub business_model: Option<String>,
    #[serde(default)]
    pub charge_estimee: Option<String>,
    #[serde(default)]
    pub cout_estime: Option<f64>,
    #[serde(default)]
    pub conclusion: Option<String>,
    #[serde(default)]
    pub decision: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Developpement {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub date_lancement: Option<NaiveDate>,
    #[serde(default)]
    pub date_fin: Option<NaiveDate>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub statut_dev: Option<String>,
    #[serde(default)]
    pub chef_de_projet: Option<String>,
    /// Comma separated user ids.
    #[serde(default)]
    pub membres_equipe: Option<String>,
    #[serde(default)]
    pub avis_negatif: Option<String>,
}

impl Developpement {
    pub fn members(&self) -> Vec<&str> {
        self.membres_equipe
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .collect()
    }
}

/// `GET /api/ideas/{id}`: an idea with every phase record attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullIdeaDetails {
    pub idea: Idea,
    #[serde(default)]
    pub poc: Option<Poc>,
    #[serde(default)]
    pub developpement: Option<Developpement>,
    #[serde(default)]
    pub documents: Vec<Document>,
}

/// A task joined with whatever context the backend or a follow-up fetch
/// supplied. List entries and `GET /api/tasks/{id}/details` carry only
/// `task` and `idea`; the rest is filled by [`TaskDetails::enrich`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDetails {
    pub task: Task,
    #[serde(default)]
    pub idea: Option<Idea>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poc: Option<Poc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub developpement: Option<Developpement>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub documents: Vec<Document>,
}

impl TaskDetails {
    pub fn new(task: Task, idea: Option<Idea>) -> Self {
        Self {
            task,
            idea,
            poc: None,
            developpement: None,
            documents: Vec::new(),
        }
    }

    pub fn enrich(mut self, full: FullIdeaDetails) -> Self {
        self.idea = Some(full.idea);
        self.poc = full.poc;
        self.developpement = full.developpement;
        self.documents = full.documents;
        self
    }

    pub fn idea_title(&self) -> &str {
        self.idea.as_ref().map_or("", |i| i.titre.as_str())
    }
}

/// Server-side filters for `GET /api/tasks`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskQuery {
    /// Case-insensitive substring of the idea title.
    pub idea_name: String,
    /// Exact task-definition key.
    pub task_definition_key: Option<String>,
}

impl TaskQuery {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        let name = self.idea_name.trim();
        if !name.is_empty() {
            pairs.push(("ideaName", name.to_string()));
        }
        if let Some(key) = self.task_definition_key.as_deref().filter(|k| !k.is_empty()) {
            pairs.push(("taskDefinitionKey", key.to_string()));
        }
        pairs
    }
}

/// One fetched task collection split by a single predicate, so the two
/// halves always describe the same instant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPartition {
    pub assigned: Vec<TaskDetails>,
    pub claimable: Vec<TaskDetails>,
}

impl TaskPartition {
    pub fn split(entries: Vec<TaskDetails>) -> Self {
        let (assigned, claimable) = entries.into_iter().partition(|e| e.task.is_assigned());
        Self {
            assigned,
            claimable,
        }
    }

    pub fn len(&self) -> usize {
        self.assigned.len() + self.claimable.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str, assignee: Option<&str>) -> Task {
        Task {
            id: id.into(),
            name: format!("task {id}"),
            task_definition_key: "Activity_x".into(),
            assignee: assignee.map(String::from),
            process_instance_id: format!("pi-{id}"),
            created: None,
        }
    }

    #[test]
    fn partition_is_disjoint_and_complete() {
        let entries = vec![
            TaskDetails::new(task("1", Some("alice")), None),
            TaskDetails::new(task("2", None), None),
            TaskDetails::new(task("3", Some("alice")), None),
            TaskDetails::new(task("4", Some("")), None),
        ];
        let split = TaskPartition::split(entries);
        let assigned: Vec<&str> = split.assigned.iter().map(|e| e.task.id.as_str()).collect();
        let claimable: Vec<&str> = split.claimable.iter().map(|e| e.task.id.as_str()).collect();
        assert_eq!(assigned, vec!["1", "3"]);
        assert_eq!(claimable, vec!["2", "4"]);
        assert_eq!(split.len(), 4);
    }

    #[test]
    fn query_skips_blank_filters() {
        let q = TaskQuery {
            idea_name: "  ".into(),
            task_definition_key: Some(String::new()),
        };
        assert!(q.query_pairs().is_empty());

        let q = TaskQuery {
            idea_name: " kiosk ".into(),
            task_definition_key: Some("Activity_0tg41vr".into()),
        };
        assert_eq!(
            q.query_pairs(),
            vec![
                ("ideaName", "kiosk".to_string()),
                ("taskDefinitionKey", "Activity_0tg41vr".to_string())
            ]
        );
    }

    #[test]
    fn created_accepts_engine_offset() {
        let mut t = task("1", None);
        t.created = Some("2024-03-01T10:00:00.000+0000".into());
        assert!(t.created_at().is_some());
        t.created = Some("2024-03-01T10:00:00Z".into());
        assert!(t.created_at().is_some());
        t.created = Some("yesterday".into());
        assert!(t.created_at().is_none());
    }

    #[test]
    fn members_split_on_commas() {
        let dev = Developpement {
            membres_equipe: Some("a, b,,c".into()),
            ..Default::default()
        };
        assert_eq!(dev.members(), vec!["a", "b", "c"]);
        assert!(Developpement::default().members().is_empty());
    }

    #[test]
    fn list_entry_decodes_without_idea() {
        let json = r#"{"task":{"id":"t1","name":"Qualify","taskDefinitionKey":"Activity_0tg41vr","assignee":null,"processInstanceId":"p1","created":"2024-01-01T00:00:00.000+0000"},"idea":null}"#;
        let entry: TaskDetails = serde_json::from_str(json).unwrap();
        assert!(entry.idea.is_none());
        assert!(!entry.task.is_assigned());
        assert!(entry.documents.is_empty());
    }
}
