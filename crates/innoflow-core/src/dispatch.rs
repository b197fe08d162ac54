//! Task-definition key to form mapping.
//!
//! Keys are plain strings from the workflow definition. They are resolved
//! once into a [`TaskKind`]; everything downstream matches on the enum, so
//! adding a kind forces every consumer to handle it.

use std::collections::HashMap;
use std::fmt;

pub const KEY_PRIORITIZATION: &str = "Activity_10rvc7h";
pub const KEY_QUALIFICATION: &str = "Activity_0tg41vr";
pub const KEY_BUSINESS_PLAN: &str = "Activity_0bqn3dl";
pub const KEY_BUSINESS_PLAN_FINAL: &str = "Activity_1npl4tr";
pub const KEY_POC_CONCLUSION: &str = "Activity_1oplie6";
pub const KEY_MVP_PRESENTATION: &str = "Activity_0a8a9ls";
pub const KEY_TEAM_COMPOSITION: &str = "Activity_1cgibts";
pub const KEY_BUSINESS_PLAN_VALIDATION: &str = "Activity_1bpvalid";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskKind {
    Prioritization,
    Qualification,
    BusinessPlan,
    PocConclusion,
    MvpPresentation,
    TeamComposition,
    BusinessPlanValidation,
    Generic,
}

/// Context a form needs before it can be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextNeed {
    None,
    /// `GET /api/ideas/{ideaId}`; falls back to the task's own details.
    FullIdeaDetails,
    /// `GET /api/developpements/users`.
    DevUsers,
    /// `GET /api/process-instances/{pid}/documents`.
    Documents,
}

impl TaskKind {
    pub const ALL: &[TaskKind] = &[
        TaskKind::Prioritization,
        TaskKind::Qualification,
        TaskKind::BusinessPlan,
        TaskKind::PocConclusion,
        TaskKind::MvpPresentation,
        TaskKind::TeamComposition,
        TaskKind::BusinessPlanValidation,
        TaskKind::Generic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Prioritization => "prioritization",
            TaskKind::Qualification => "qualification",
            TaskKind::BusinessPlan => "business_plan",
            TaskKind::PocConclusion => "poc_conclusion",
            TaskKind::MvpPresentation => "mvp_presentation",
            TaskKind::TeamComposition => "team_composition",
            TaskKind::BusinessPlanValidation => "business_plan_validation",
            TaskKind::Generic => "generic",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            TaskKind::Prioritization => "Prioritization",
            TaskKind::Qualification => "Qualification",
            TaskKind::BusinessPlan => "Business plan",
            TaskKind::PocConclusion => "POC conclusion",
            TaskKind::MvpPresentation => "MVP presentation",
            TaskKind::TeamComposition => "Team composition",
            TaskKind::BusinessPlanValidation => "Business plan validation",
            TaskKind::Generic => "Task",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        TaskKind::ALL.iter().copied().find(|k| k.as_str() == s)
    }

    pub fn context(&self) -> ContextNeed {
        match self {
            TaskKind::MvpPresentation => ContextNeed::FullIdeaDetails,
            TaskKind::TeamComposition => ContextNeed::DevUsers,
            TaskKind::BusinessPlan | TaskKind::BusinessPlanValidation => ContextNeed::Documents,
            TaskKind::Prioritization
            | TaskKind::Qualification
            | TaskKind::PocConclusion
            | TaskKind::Generic => ContextNeed::None,
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Lookup from task-definition key to [`TaskKind`], with a mandatory
/// fallback to [`TaskKind::Generic`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchTable {
    keys: HashMap<String, TaskKind>,
}

impl Default for DispatchTable {
    fn default() -> Self {
        let keys = [
            (KEY_PRIORITIZATION, TaskKind::Prioritization),
            (KEY_QUALIFICATION, TaskKind::Qualification),
            (KEY_BUSINESS_PLAN, TaskKind::BusinessPlan),
            (KEY_BUSINESS_PLAN_FINAL, TaskKind::BusinessPlan),
            (KEY_POC_CONCLUSION, TaskKind::PocConclusion),
            (KEY_MVP_PRESENTATION, TaskKind::MvpPresentation),
            (KEY_TEAM_COMPOSITION, TaskKind::TeamComposition),
            (KEY_BUSINESS_PLAN_VALIDATION, TaskKind::BusinessPlanValidation),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        Self { keys }
    }
}

impl DispatchTable {
    /// Default table with `overrides` layered on top. Overriding a key to
    /// `Generic` effectively removes it.
    pub fn with_overrides(overrides: impl IntoIterator<Item = (String, TaskKind)>) -> Self {
        let mut table = Self::default();
        for (key, kind) in overrides {
            table.keys.insert(key, kind);
        }
        table
    }

    pub fn resolve(&self, task_definition_key: &str) -> TaskKind {
        self.keys
            .get(task_definition_key)
            .copied()
            .unwrap_or(TaskKind::Generic)
    }

    /// Keys with a specialised form, sorted by kind then key. Feeds the
    /// task-type filter.
    pub fn known_keys(&self) -> Vec<(String, TaskKind)> {
        let mut keys: Vec<(String, TaskKind)> = self
            .keys
            .iter()
            .filter(|(_, kind)| **kind != TaskKind::Generic)
            .map(|(key, kind)| (key.clone(), *kind))
            .collect();
        keys.sort_by(|a, b| (a.1, &a.0).cmp(&(b.1, &b.0)));
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_default_key_resolves_to_its_form() {
        let table = DispatchTable::default();
        assert_eq!(table.resolve(KEY_PRIORITIZATION), TaskKind::Prioritization);
        assert_eq!(table.resolve(KEY_QUALIFICATION), TaskKind::Qualification);
        assert_eq!(table.resolve(KEY_BUSINESS_PLAN), TaskKind::BusinessPlan);
        assert_eq!(table.resolve(KEY_BUSINESS_PLAN_FINAL), TaskKind::BusinessPlan);
        assert_eq!(table.resolve(KEY_POC_CONCLUSION), TaskKind::PocConclusion);
        assert_eq!(table.resolve(KEY_MVP_PRESENTATION), TaskKind::MvpPresentation);
        assert_eq!(table.resolve(KEY_TEAM_COMPOSITION), TaskKind::TeamComposition);
        assert_eq!(
            table.resolve(KEY_BUSINESS_PLAN_VALIDATION),
            TaskKind::BusinessPlanValidation
        );
    }

    #[test]
    fn unknown_keys_fall_back_to_generic() {
        let table = DispatchTable::default();
        assert_eq!(table.resolve("Activity_unheard_of"), TaskKind::Generic);
        assert_eq!(table.resolve(""), TaskKind::Generic);
    }

    #[test]
    fn overrides_replace_and_extend() {
        let table = DispatchTable::with_overrides([
            ("Activity_custom".to_string(), TaskKind::PocConclusion),
            (KEY_QUALIFICATION.to_string(), TaskKind::Generic),
        ]);
        assert_eq!(table.resolve("Activity_custom"), TaskKind::PocConclusion);
        assert_eq!(table.resolve(KEY_QUALIFICATION), TaskKind::Generic);
        assert!(!table
            .known_keys()
            .iter()
            .any(|(k, _)| k == KEY_QUALIFICATION));
    }

    #[test]
    fn known_keys_are_ordered_by_kind() {
        let keys = DispatchTable::default().known_keys();
        assert_eq!(keys.len(), 8);
        assert_eq!(keys[0], (KEY_PRIORITIZATION.to_string(), TaskKind::Prioritization));
        assert_eq!(keys[2].1, TaskKind::BusinessPlan);
        assert_eq!(keys[3].1, TaskKind::BusinessPlan);
    }

    #[test]
    fn kind_names_round_trip() {
        for kind in TaskKind::ALL {
            assert_eq!(TaskKind::from_str(kind.as_str()), Some(*kind));
        }
        assert_eq!(TaskKind::from_str("nope"), None);
    }

    #[test]
    fn only_enriched_kinds_need_context() {
        assert_eq!(TaskKind::MvpPresentation.context(), ContextNeed::FullIdeaDetails);
        assert_eq!(TaskKind::TeamComposition.context(), ContextNeed::DevUsers);
        assert_eq!(TaskKind::BusinessPlan.context(), ContextNeed::Documents);
        assert_eq!(TaskKind::Generic.context(), ContextNeed::None);
    }
}
