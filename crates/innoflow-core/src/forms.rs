//! Per-kind task forms: field state, editing, validation and the calls a
//! submission turns into.

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, Offset, TimeZone, Utc};
use serde_json::{json, Map, Value};

use crate::dispatch::TaskKind;
use crate::error::ValidationError;
use crate::idea::Priority;
use crate::task::Task;
use crate::user::{TeamAssignment, User};

/// Wire format of `dateEcheance`.
pub const DEADLINE_WIRE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const DEADLINE_INPUT_FORMATS: &[&str] = &["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"];

/// A single backend write produced by a form submission. A plan is a list
/// of these, executed strictly in order.
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionCall {
    /// `POST /api/ideas/{processInstanceId}/prioritize`; completes the task server-side.
    SetPriority {
        process_instance_id: String,
        priority: Priority,
    },
    /// `POST /api/developpements/process-instances/{id}/equipe`. Overwrites
    /// the whole team, so sending it twice is harmless.
    AssignTeam {
        process_instance_id: String,
        team: TeamAssignment,
    },
    /// `POST /api/tasks/{id}/complete`.
    CompleteTask {
        task_id: String,
        variables: Map<String, Value>,
    },
}

impl CompletionCall {
    pub fn describe(&self) -> &'static str {
        match self {
            CompletionCall::SetPriority { .. } => "set priority",
            CompletionCall::AssignTeam { .. } => "assign team",
            CompletionCall::CompleteTask { .. } => "complete task",
        }
    }
}

/// Wall clock plus the offset used to interpret typed deadlines.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    pub now: DateTime<Utc>,
    pub offset: FixedOffset,
}

impl Clock {
    pub fn system() -> Self {
        let local = Local::now();
        Self {
            now: local.with_timezone(&Utc),
            offset: *local.offset(),
        }
    }

    pub fn utc(now: DateTime<Utc>) -> Self {
        Self {
            now,
            offset: Utc.fix(),
        }
    }
}

/// Parses a deadline typed in local time and returns it in UTC.
pub fn parse_deadline(raw: &str, clock: &Clock) -> Result<DateTime<Utc>, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ValidationError::MissingDeadline);
    }
    let naive = DEADLINE_INPUT_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .ok_or(ValidationError::InvalidDeadline)?;
    let local = clock
        .offset
        .from_local_datetime(&naive)
        .single()
        .ok_or(ValidationError::InvalidDeadline)?;
    let utc = local.with_timezone(&Utc);
    if utc <= clock.now {
        return Err(ValidationError::DeadlineNotInFuture);
    }
    Ok(utc)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualificationDecision {
    Validate,
    Postpone,
    Reject,
}

impl QualificationDecision {
    pub const ALL: &[QualificationDecision] = &[
        QualificationDecision::Validate,
        QualificationDecision::Postpone,
        QualificationDecision::Reject,
    ];

    pub fn wire(&self) -> &'static str {
        match self {
            QualificationDecision::Validate => "VALIDEE",
            QualificationDecision::Postpone => "AJOURNEE",
            QualificationDecision::Reject => "REJETEE",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            QualificationDecision::Validate => "Validate",
            QualificationDecision::Postpone => "Postpone",
            QualificationDecision::Reject => "Reject",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PocVerdict {
    Favorable,
    Unfavorable,
}

impl PocVerdict {
    pub fn wire(&self) -> &'static str {
        match self {
            PocVerdict::Favorable => "favorable",
            PocVerdict::Unfavorable => "defavorable",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PocVerdict::Favorable => "Favorable",
            PocVerdict::Unfavorable => "Unfavorable",
        }
    }

    fn toggled(self) -> Self {
        match self {
            PocVerdict::Favorable => PocVerdict::Unfavorable,
            PocVerdict::Unfavorable => PocVerdict::Favorable,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MvpOutcome {
    Ok,
    Nok,
}

impl MvpOutcome {
    pub fn wire(&self) -> &'static str {
        match self {
            MvpOutcome::Ok => "ok",
            MvpOutcome::Nok => "nok",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MvpOutcome::Ok => "OK (favorable)",
            MvpOutcome::Nok => "NOK (negative feedback)",
        }
    }

    fn toggled(self) -> Self {
        match self {
            MvpOutcome::Ok => MvpOutcome::Nok,
            MvpOutcome::Nok => MvpOutcome::Ok,
        }
    }
}

/// An editable field. Which ones are visible depends on the form and its
/// current choices; see [`TaskForm::fields`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Priority,
    Decision,
    RejectionReason,
    Deadline,
    Verdict,
    Conclusion,
    Outcome,
    NegativeFeedback,
    ProjectLead,
    Members,
}

impl Field {
    pub fn label(&self) -> &'static str {
        match self {
            Field::Priority => "Priority",
            Field::Decision => "Decision",
            Field::RejectionReason => "Rejection reason",
            Field::Deadline => "Deadline (YYYY-MM-DD HH:MM)",
            Field::Verdict => "Verdict",
            Field::Conclusion => "Conclusion",
            Field::Outcome => "Outcome",
            Field::NegativeFeedback => "Negative feedback",
            Field::ProjectLead => "Project lead",
            Field::Members => "Team members",
        }
    }

    /// Free-text fields accept typed characters.
    pub fn is_text(&self) -> bool {
        matches!(
            self,
            Field::RejectionReason | Field::Deadline | Field::Conclusion | Field::NegativeFeedback
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualificationForm {
    pub decision: QualificationDecision,
    pub reason: String,
    pub deadline: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PocConclusionForm {
    pub verdict: PocVerdict,
    pub conclusion: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MvpPresentationForm {
    pub outcome: MvpOutcome,
    pub negative_feedback: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeamCompositionForm {
    pub candidates: Vec<User>,
    pub lead: Option<String>,
    pub members: Vec<String>,
    /// Highlighted row in the member checklist.
    pub cursor: usize,
}

impl TeamCompositionForm {
    pub fn with_candidates(candidates: Vec<User>) -> Self {
        Self {
            candidates,
            ..Default::default()
        }
    }

    pub fn is_member(&self, user_id: &str) -> bool {
        self.members.iter().any(|m| m == user_id)
    }

    /// Select or deselect the highlighted candidate.
    pub fn toggle_member(&mut self) {
        let Some(user) = self.candidates.get(self.cursor) else {
            return;
        };
        if let Some(pos) = self.members.iter().position(|m| *m == user.id) {
            self.members.remove(pos);
        } else {
            self.members.push(user.id.clone());
        }
    }

    fn cycle_lead(&mut self, forward: bool) {
        if self.candidates.is_empty() {
            return;
        }
        let len = self.candidates.len();
        let current = self
            .lead
            .as_ref()
            .and_then(|id| self.candidates.iter().position(|u| &u.id == id));
        let next = match (current, forward) {
            (None, true) => 0,
            (None, false) => len - 1,
            (Some(i), true) => (i + 1) % len,
            (Some(i), false) => (i + len - 1) % len,
        };
        self.lead = Some(self.candidates[next].id.clone());
    }

    fn move_cursor(&mut self, forward: bool) {
        if self.candidates.is_empty() {
            return;
        }
        let len = self.candidates.len();
        self.cursor = if forward {
            (self.cursor + 1) % len
        } else {
            (self.cursor + len - 1) % len
        };
    }

    /// Selecting the lead as a member too is allowed, only flagged.
    pub fn lead_is_also_member(&self) -> bool {
        self.lead.as_deref().is_some_and(|lead| self.is_member(lead))
    }
}

/// The one form shown for a task, chosen by its [`TaskKind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskForm {
    Prioritization { priority: Priority },
    Qualification(QualificationForm),
    BusinessPlan,
    PocConclusion(PocConclusionForm),
    MvpPresentation(MvpPresentationForm),
    TeamComposition(TeamCompositionForm),
    BusinessPlanValidation,
    Generic,
}

impl TaskForm {
    pub fn for_kind(kind: TaskKind) -> Self {
        match kind {
            TaskKind::Prioritization => TaskForm::Prioritization {
                priority: Priority::Medium,
            },
            TaskKind::Qualification => TaskForm::Qualification(QualificationForm {
                decision: QualificationDecision::Validate,
                reason: String::new(),
                deadline: String::new(),
            }),
            TaskKind::BusinessPlan => TaskForm::BusinessPlan,
            TaskKind::PocConclusion => TaskForm::PocConclusion(PocConclusionForm {
                verdict: PocVerdict::Favorable,
                conclusion: String::new(),
            }),
            TaskKind::MvpPresentation => TaskForm::MvpPresentation(MvpPresentationForm {
                outcome: MvpOutcome::Ok,
                negative_feedback: String::new(),
            }),
            TaskKind::TeamComposition => TaskForm::TeamComposition(TeamCompositionForm::default()),
            TaskKind::BusinessPlanValidation => TaskForm::BusinessPlanValidation,
            TaskKind::Generic => TaskForm::Generic,
        }
    }

    pub fn kind(&self) -> TaskKind {
        match self {
            TaskForm::Prioritization { .. } => TaskKind::Prioritization,
            TaskForm::Qualification(_) => TaskKind::Qualification,
            TaskForm::BusinessPlan => TaskKind::BusinessPlan,
            TaskForm::PocConclusion(_) => TaskKind::PocConclusion,
            TaskForm::MvpPresentation(_) => TaskKind::MvpPresentation,
            TaskForm::TeamComposition(_) => TaskKind::TeamComposition,
            TaskForm::BusinessPlanValidation => TaskKind::BusinessPlanValidation,
            TaskForm::Generic => TaskKind::Generic,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            TaskForm::Prioritization { .. } => "Set Idea Priority",
            TaskForm::Qualification(_) => "Qualify Idea",
            TaskForm::BusinessPlan => "Business Plan Documents",
            TaskForm::PocConclusion(_) => "POC Conclusion",
            TaskForm::MvpPresentation(_) => "MVP Presentation Outcome",
            TaskForm::TeamComposition(_) => "Team Composition",
            TaskForm::BusinessPlanValidation => "Validate Business Plan",
            TaskForm::Generic => "Complete Task",
        }
    }

    pub fn submit_label(&self) -> &'static str {
        match self {
            TaskForm::Prioritization { .. } => "Set Priority & Complete",
            TaskForm::Qualification(_) => "Submit Decision",
            TaskForm::BusinessPlan => "Submit Business Plan",
            TaskForm::PocConclusion(_) | TaskForm::MvpPresentation(_) => "Submit Conclusion",
            TaskForm::TeamComposition(_) => "Set Team & Complete Task",
            TaskForm::BusinessPlanValidation => "Validate Business Plan",
            TaskForm::Generic => "Complete Task",
        }
    }

    /// Visible fields, in focus order.
    pub fn fields(&self) -> Vec<Field> {
        match self {
            TaskForm::Prioritization { .. } => vec![Field::Priority],
            TaskForm::Qualification(f) => match f.decision {
                QualificationDecision::Validate => vec![Field::Decision],
                QualificationDecision::Postpone => vec![Field::Decision, Field::Deadline],
                QualificationDecision::Reject => vec![Field::Decision, Field::RejectionReason],
            },
            TaskForm::PocConclusion(_) => vec![Field::Conclusion, Field::Verdict],
            TaskForm::MvpPresentation(f) => match f.outcome {
                MvpOutcome::Ok => vec![Field::Outcome],
                MvpOutcome::Nok => vec![Field::Outcome, Field::NegativeFeedback],
            },
            TaskForm::TeamComposition(_) => vec![Field::ProjectLead, Field::Members],
            TaskForm::BusinessPlan | TaskForm::BusinessPlanValidation | TaskForm::Generic => {
                Vec::new()
            }
        }
    }

    /// Current value of a text field, if `field` is one on this form.
    pub fn text(&self, field: Field) -> Option<&str> {
        match (self, field) {
            (TaskForm::Qualification(f), Field::RejectionReason) => Some(f.reason.as_str()),
            (TaskForm::Qualification(f), Field::Deadline) => Some(f.deadline.as_str()),
            (TaskForm::PocConclusion(f), Field::Conclusion) => Some(f.conclusion.as_str()),
            (TaskForm::MvpPresentation(f), Field::NegativeFeedback) => {
                Some(f.negative_feedback.as_str())
            }
            _ => None,
        }
    }

    fn text_mut(&mut self, field: Field) -> Option<&mut String> {
        match (self, field) {
            (TaskForm::Qualification(f), Field::RejectionReason) => Some(&mut f.reason),
            (TaskForm::Qualification(f), Field::Deadline) => Some(&mut f.deadline),
            (TaskForm::PocConclusion(f), Field::Conclusion) => Some(&mut f.conclusion),
            (TaskForm::MvpPresentation(f), Field::NegativeFeedback) => {
                Some(&mut f.negative_feedback)
            }
            _ => None,
        }
    }

    /// Human readable value of a choice field.
    pub fn choice(&self, field: Field) -> Option<String> {
        match (self, field) {
            (TaskForm::Prioritization { priority }, Field::Priority) => {
                Some(priority.as_str().to_string())
            }
            (TaskForm::Qualification(f), Field::Decision) => Some(f.decision.label().to_string()),
            (TaskForm::PocConclusion(f), Field::Verdict) => Some(f.verdict.label().to_string()),
            (TaskForm::MvpPresentation(f), Field::Outcome) => Some(f.outcome.label().to_string()),
            (TaskForm::TeamComposition(f), Field::ProjectLead) => Some(
                f.lead
                    .as_ref()
                    .and_then(|id| f.candidates.iter().find(|u| &u.id == id))
                    .map(|u| format!("{} ({})", u.full_name(), u.id))
                    .unwrap_or_else(|| "Select a project lead...".to_string()),
            ),
            _ => None,
        }
    }

    pub fn input_char(&mut self, field: Field, c: char) {
        if let Some(text) = self.text_mut(field) {
            text.push(c);
        }
    }

    pub fn backspace(&mut self, field: Field) {
        if let Some(text) = self.text_mut(field) {
            text.pop();
        }
    }

    /// Step a choice field to its next (or previous) value. On the member
    /// checklist this moves the highlight instead.
    pub fn cycle(&mut self, field: Field, forward: bool) {
        match (self, field) {
            (TaskForm::Prioritization { priority }, Field::Priority) => {
                let all = Priority::ALL;
                let idx = all.iter().position(|p| *p == *priority).unwrap_or(0);
                let next = if forward {
                    (idx + 1) % all.len()
                } else {
                    (idx + all.len() - 1) % all.len()
                };
                *priority = all[next];
            }
            (TaskForm::Qualification(f), Field::Decision) => {
                let all = QualificationDecision::ALL;
                let idx = all.iter().position(|d| *d == f.decision).unwrap_or(0);
                let next = if forward {
                    (idx + 1) % all.len()
                } else {
                    (idx + all.len() - 1) % all.len()
                };
                f.decision = all[next];
            }
            (TaskForm::PocConclusion(f), Field::Verdict) => f.verdict = f.verdict.toggled(),
            (TaskForm::MvpPresentation(f), Field::Outcome) => f.outcome = f.outcome.toggled(),
            (TaskForm::TeamComposition(f), Field::ProjectLead) => f.cycle_lead(forward),
            (TaskForm::TeamComposition(f), Field::Members) => f.move_cursor(forward),
            _ => {}
        }
    }

    pub fn toggle(&mut self, field: Field) {
        if let (TaskForm::TeamComposition(f), Field::Members) = (self, field) {
            f.toggle_member();
        }
    }

    /// Non-blocking notices shown above the submit action.
    pub fn warnings(&self) -> Vec<&'static str> {
        match self {
            TaskForm::TeamComposition(f) if f.lead_is_also_member() => {
                vec!["The project lead is also selected as a team member."]
            }
            _ => Vec::new(),
        }
    }

    /// Validate and turn the form into the backend calls to run, in order.
    /// Nothing is sent when this returns an error.
    pub fn plan(&self, task: &Task, clock: &Clock) -> Result<Vec<CompletionCall>, ValidationError> {
        let complete = |variables: Map<String, Value>| CompletionCall::CompleteTask {
            task_id: task.id.clone(),
            variables,
        };

        match self {
            TaskForm::Prioritization { priority } => Ok(vec![CompletionCall::SetPriority {
                process_instance_id: task.process_instance_id.clone(),
                priority: *priority,
            }]),
            TaskForm::Qualification(f) => {
                let mut vars = Map::new();
                vars.insert("resultatQualification".into(), json!(f.decision.wire()));
                match f.decision {
                    QualificationDecision::Validate => {}
                    QualificationDecision::Reject => {
                        let reason = f.reason.trim();
                        if reason.is_empty() {
                            return Err(ValidationError::MissingRejectionReason);
                        }
                        vars.insert("motifRejet".into(), json!(reason));
                    }
                    QualificationDecision::Postpone => {
                        let deadline = parse_deadline(&f.deadline, clock)?;
                        vars.insert(
                            "dateEcheance".into(),
                            json!(deadline.format(DEADLINE_WIRE_FORMAT).to_string()),
                        );
                    }
                }
                Ok(vec![complete(vars)])
            }
            TaskForm::PocConclusion(f) => {
                let conclusion = f.conclusion.trim();
                if conclusion.is_empty() {
                    return Err(ValidationError::MissingConclusion);
                }
                let mut vars = Map::new();
                vars.insert("avis".into(), json!(f.verdict.wire()));
                vars.insert("conclusion".into(), json!(conclusion));
                Ok(vec![complete(vars)])
            }
            TaskForm::MvpPresentation(f) => {
                let mut vars = Map::new();
                vars.insert("conclusion".into(), json!(f.outcome.wire()));
                if f.outcome == MvpOutcome::Nok {
                    let feedback = f.negative_feedback.trim();
                    if feedback.is_empty() {
                        return Err(ValidationError::MissingNegativeFeedback);
                    }
                    vars.insert("avisNegatif".into(), json!(feedback));
                }
                Ok(vec![complete(vars)])
            }
            TaskForm::TeamComposition(f) => {
                let lead = f
                    .lead
                    .as_deref()
                    .filter(|l| !l.is_empty())
                    .ok_or(ValidationError::MissingProjectLead)?;
                Ok(vec![
                    CompletionCall::AssignTeam {
                        process_instance_id: task.process_instance_id.clone(),
                        team: TeamAssignment {
                            chef_de_projet: lead.to_string(),
                            membres_equipe: f.members.clone(),
                        },
                    },
                    complete(Map::new()),
                ])
            }
            TaskForm::BusinessPlanValidation => {
                let mut vars = Map::new();
                vars.insert("businessPlanValide".into(), json!(true));
                Ok(vec![complete(vars)])
            }
            TaskForm::BusinessPlan | TaskForm::Generic => Ok(vec![complete(Map::new())]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task() -> Task {
        Task {
            id: "t-1".into(),
            name: "Qualify".into(),
            task_definition_key: "Activity_0tg41vr".into(),
            assignee: Some("carol".into()),
            process_instance_id: "pi-9".into(),
            created: None,
        }
    }

    fn clock() -> Clock {
        Clock::utc(Utc.with_ymd_and_hms(2025, 1, 10, 12, 0, 0).unwrap())
    }

    fn vars(calls: &[CompletionCall]) -> &Map<String, Value> {
        match calls.last() {
            Some(CompletionCall::CompleteTask { variables, .. }) => variables,
            other => panic!("expected a completion, got {other:?}"),
        }
    }

    fn user(id: &str) -> User {
        User {
            id: id.into(),
            first_name: id.to_uppercase(),
            last_name: "Dev".into(),
            email: format!("{id}@example.com"),
        }
    }

    #[test]
    fn every_kind_builds_a_matching_form() {
        for kind in TaskKind::ALL {
            assert_eq!(TaskForm::for_kind(*kind).kind(), *kind);
        }
    }

    #[test]
    fn qualification_reject_payload() {
        let mut form = TaskForm::for_kind(TaskKind::Qualification);
        form.cycle(Field::Decision, true);
        form.cycle(Field::Decision, true);
        assert_eq!(form.fields(), vec![Field::Decision, Field::RejectionReason]);
        for c in "Budget insufficient".chars() {
            form.input_char(Field::RejectionReason, c);
        }
        let calls = form.plan(&task(), &clock()).unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            Value::Object(vars(&calls).clone()),
            json!({"resultatQualification": "REJETEE", "motifRejet": "Budget insufficient"})
        );
    }

    #[test]
    fn qualification_reject_requires_reason() {
        let form = TaskForm::Qualification(QualificationForm {
            decision: QualificationDecision::Reject,
            reason: "   ".into(),
            deadline: String::new(),
        });
        assert_eq!(
            form.plan(&task(), &clock()),
            Err(ValidationError::MissingRejectionReason)
        );
    }

    #[test]
    fn qualification_postpone_requires_future_deadline() {
        let mut f = QualificationForm {
            decision: QualificationDecision::Postpone,
            reason: String::new(),
            deadline: String::new(),
        };
        let plan = |f: &QualificationForm| TaskForm::Qualification(f.clone()).plan(&task(), &clock());
        assert_eq!(plan(&f), Err(ValidationError::MissingDeadline));

        f.deadline = "next tuesday".into();
        assert_eq!(plan(&f), Err(ValidationError::InvalidDeadline));

        f.deadline = "2025-01-09 08:00".into();
        assert_eq!(plan(&f), Err(ValidationError::DeadlineNotInFuture));

        f.deadline = "2025-02-01 09:30".into();
        let calls = plan(&f).unwrap();
        assert_eq!(
            Value::Object(vars(&calls).clone()),
            json!({"resultatQualification": "AJOURNEE", "dateEcheance": "2025-02-01T09:30:00"})
        );
    }

    #[test]
    fn deadline_is_converted_to_utc() {
        let clock = Clock {
            now: Utc.with_ymd_and_hms(2025, 1, 10, 12, 0, 0).unwrap(),
            offset: FixedOffset::east_opt(2 * 3600).unwrap(),
        };
        let utc = parse_deadline("2025-03-01T10:00", &clock).unwrap();
        assert_eq!(utc.format(DEADLINE_WIRE_FORMAT).to_string(), "2025-03-01T08:00:00");
    }

    #[test]
    fn validate_sends_decision_only() {
        let form = TaskForm::for_kind(TaskKind::Qualification);
        let calls = form.plan(&task(), &clock()).unwrap();
        assert_eq!(
            Value::Object(vars(&calls).clone()),
            json!({"resultatQualification": "VALIDEE"})
        );
    }

    #[test]
    fn prioritization_uses_dedicated_call() {
        let mut form = TaskForm::for_kind(TaskKind::Prioritization);
        assert_eq!(form.choice(Field::Priority).as_deref(), Some("Medium"));
        form.cycle(Field::Priority, true);
        let calls = form.plan(&task(), &clock()).unwrap();
        assert_eq!(
            calls,
            vec![CompletionCall::SetPriority {
                process_instance_id: "pi-9".into(),
                priority: Priority::High,
            }]
        );
    }

    #[test]
    fn poc_requires_conclusion() {
        let mut form = TaskForm::for_kind(TaskKind::PocConclusion);
        assert_eq!(
            form.plan(&task(), &clock()),
            Err(ValidationError::MissingConclusion)
        );
        for c in "Works".chars() {
            form.input_char(Field::Conclusion, c);
        }
        form.cycle(Field::Verdict, true);
        let calls = form.plan(&task(), &clock()).unwrap();
        assert_eq!(
            Value::Object(vars(&calls).clone()),
            json!({"avis": "defavorable", "conclusion": "Works"})
        );
    }

    #[test]
    fn mvp_nok_requires_feedback() {
        let mut form = TaskForm::for_kind(TaskKind::MvpPresentation);
        let calls = form.plan(&task(), &clock()).unwrap();
        assert_eq!(Value::Object(vars(&calls).clone()), json!({"conclusion": "ok"}));

        form.cycle(Field::Outcome, true);
        assert_eq!(
            form.plan(&task(), &clock()),
            Err(ValidationError::MissingNegativeFeedback)
        );
        form.input_char(Field::NegativeFeedback, 'x');
        form.backspace(Field::NegativeFeedback);
        form.input_char(Field::NegativeFeedback, 'y');
        let calls = form.plan(&task(), &clock()).unwrap();
        assert_eq!(
            Value::Object(vars(&calls).clone()),
            json!({"conclusion": "nok", "avisNegatif": "y"})
        );
    }

    #[test]
    fn team_requires_lead_then_assigns_before_completing() {
        let mut form =
            TaskForm::TeamComposition(TeamCompositionForm::with_candidates(vec![user("a"), user("b")]));
        assert_eq!(
            form.plan(&task(), &clock()),
            Err(ValidationError::MissingProjectLead)
        );

        form.cycle(Field::ProjectLead, true);
        form.cycle(Field::Members, true);
        form.toggle(Field::Members);
        let calls = form.plan(&task(), &clock()).unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(
            calls[0],
            CompletionCall::AssignTeam {
                process_instance_id: "pi-9".into(),
                team: TeamAssignment {
                    chef_de_projet: "a".into(),
                    membres_equipe: vec!["b".into()],
                },
            }
        );
        assert!(vars(&calls).is_empty());
        assert!(form.warnings().is_empty());
    }

    #[test]
    fn lead_as_member_is_flagged_not_blocked() {
        let mut team = TeamCompositionForm::with_candidates(vec![user("a"), user("b")]);
        team.lead = Some("a".into());
        team.toggle_member();
        let form = TaskForm::TeamComposition(team);
        assert_eq!(form.warnings().len(), 1);
        assert!(form.plan(&task(), &clock()).is_ok());
    }

    #[test]
    fn toggling_twice_deselects() {
        let mut team = TeamCompositionForm::with_candidates(vec![user("a")]);
        team.toggle_member();
        assert!(team.is_member("a"));
        team.toggle_member();
        assert!(team.members.is_empty());
    }

    #[test]
    fn signal_forms_complete_with_fixed_payloads() {
        for kind in [TaskKind::BusinessPlan, TaskKind::Generic] {
            let calls = TaskForm::for_kind(kind).plan(&task(), &clock()).unwrap();
            assert!(vars(&calls).is_empty());
        }
        let calls = TaskForm::for_kind(TaskKind::BusinessPlanValidation)
            .plan(&task(), &clock())
            .unwrap();
        assert_eq!(
            Value::Object(vars(&calls).clone()),
            json!({"businessPlanValide": true})
        );
    }

    #[test]
    fn typing_into_choice_fields_is_ignored() {
        let mut form = TaskForm::for_kind(TaskKind::Prioritization);
        form.input_char(Field::Priority, 'x');
        assert_eq!(form, TaskForm::for_kind(TaskKind::Prioritization));
    }
}
