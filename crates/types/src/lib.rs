use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use utoipa::ToSchema;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(
            Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Eq, PartialEq, Hash, PartialOrd, Ord,
        )]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}
id_newtype!(GroupId);
id_newtype!(SubjectId);
id_newtype!(TeacherId);
id_newtype!(RoomId);

/// An atomic teaching time: a day label drawn from `Calendar::days` and a
/// 1-based period. Day order is only meaningful relative to a `Calendar`
/// (see `Calendar::day_index`) — `Slot` itself only supports equality and
/// hashing, not a standalone `Ord`.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Eq, PartialEq, Hash)]
pub struct Slot {
    pub day: String,
    pub period: u32,
}

impl Slot {
    pub fn new(day: impl Into<String>, period: u32) -> Self {
        Self {
            day: day.into(),
            period,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Eq, PartialEq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomType {
    Normal,
    Lab,
    Gym,
    Music,
    It,
    Other,
}

impl Default for RoomType {
    fn default() -> Self {
        RoomType::Normal
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Eq, PartialEq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TeacherPolicy {
    Fixed,
    Choose,
}

impl Default for TeacherPolicy {
    fn default() -> Self {
        TeacherPolicy::Fixed
    }
}

/// A weekly calendar: an ordered sequence of day labels and a uniform
/// number of periods per day, plus a set of globally blocked slots
/// (recesses, assemblies, etc).
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
pub struct Calendar {
    pub days: Vec<String>,
    pub periods_per_day: u32,
    #[serde(default)]
    pub blocked_slots: HashSet<Slot>,
}

impl Calendar {
    pub fn day_index(&self, day: &str) -> Option<usize> {
        self.days.iter().position(|d| d == day)
    }

    /// Every slot in the calendar, in day/period order.
    pub fn all_slots(&self) -> Vec<Slot> {
        let mut out = Vec::with_capacity(self.days.len() * self.periods_per_day as usize);
        for day in &self.days {
            for period in 1..=self.periods_per_day {
                out.push(Slot::new(day.clone(), period));
            }
        }
        out
    }

    /// `all_slots()` minus `blocked_slots`.
    pub fn teaching_slots(&self) -> Vec<Slot> {
        self.all_slots()
            .into_iter()
            .filter(|s| !self.blocked_slots.contains(s))
            .collect()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
pub struct Group {
    pub id: GroupId,
    pub size: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
pub struct Subject {
    pub id: SubjectId,
    #[serde(default)]
    pub room_type_required: RoomType,
    #[serde(default)]
    pub max_per_day: Option<u32>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
pub struct Teacher {
    pub id: TeacherId,
    #[serde(default)]
    pub can_teach: HashSet<SubjectId>,
    #[serde(default)]
    pub unavailable: HashSet<Slot>,
    #[serde(default)]
    pub max_periods_per_day: Option<u32>,
    #[serde(default)]
    pub max_periods_per_week: Option<u32>,
    #[serde(default)]
    pub min_periods_per_day: Option<u32>,
    #[serde(default)]
    pub min_periods_per_week: Option<u32>,
}

impl Teacher {
    pub fn is_available(&self, slot: &Slot) -> bool {
        !self.unavailable.contains(slot)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
pub struct Room {
    pub id: RoomId,
    #[serde(rename = "type", default)]
    pub room_type: RoomType,
    #[serde(default = "default_room_capacity")]
    pub capacity: u32,
    #[serde(default)]
    pub unavailable: HashSet<Slot>,
}

fn default_room_capacity() -> u32 {
    9999
}

impl Room {
    pub fn is_available(&self, slot: &Slot) -> bool {
        !self.unavailable.contains(slot)
    }
}

/// `group_id`/`subject_id` pair that a `CourseRequirement` shares a single
/// teacher over. Doubles as the key used to group `Event`s back together.
pub type TeacherKey = (GroupId, SubjectId);

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
pub struct CourseRequirement {
    pub group_id: GroupId,
    pub subject_id: SubjectId,
    pub periods_per_week: u32,
    #[serde(default = "default_max_consecutive")]
    pub max_consecutive: Option<u32>,
    #[serde(default)]
    pub teacher_policy: TeacherPolicy,
    #[serde(default)]
    pub teacher_id: Option<TeacherId>,
    #[serde(default)]
    pub teacher_pool: Option<Vec<TeacherId>>,
    #[serde(default)]
    pub preferred_periods: Option<HashSet<u32>>,
    #[serde(default)]
    pub forbidden_periods: Option<HashSet<u32>>,
    /// Reserved: parsed but never consulted by the model builder.
    #[serde(default)]
    pub allow_double: bool,
}

fn default_max_consecutive() -> Option<u32> {
    Some(2)
}

impl CourseRequirement {
    pub fn key(&self) -> TeacherKey {
        (self.group_id.clone(), self.subject_id.clone())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
pub struct ObjectiveWeights {
    #[serde(default = "w_teacher_gaps")]
    pub teacher_gaps: u32,
    #[serde(default = "w_teacher_late")]
    pub teacher_late: u32,
    #[serde(default = "w_subject_same_day_excess")]
    pub subject_same_day_excess: u32,
    #[serde(default = "w_preferred_period_penalty")]
    pub preferred_period_penalty: u32,
    #[serde(default = "w_forbidden_period_penalty")]
    pub forbidden_period_penalty: u32,
}

fn w_teacher_gaps() -> u32 {
    1000
}
fn w_teacher_late() -> u32 {
    100
}
fn w_subject_same_day_excess() -> u32 {
    10
}
fn w_preferred_period_penalty() -> u32 {
    1
}
fn w_forbidden_period_penalty() -> u32 {
    50
}

impl Default for ObjectiveWeights {
    fn default() -> Self {
        Self {
            teacher_gaps: w_teacher_gaps(),
            teacher_late: w_teacher_late(),
            subject_same_day_excess: w_subject_same_day_excess(),
            preferred_period_penalty: w_preferred_period_penalty(),
            forbidden_period_penalty: w_forbidden_period_penalty(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
pub struct SolveConfig {
    #[serde(default = "default_max_seconds")]
    pub max_seconds: Option<u64>,
    #[serde(default)]
    pub random_seed: Option<u64>,
    #[serde(default)]
    pub weights: ObjectiveWeights,
    #[serde(default = "default_forbidden_hard")]
    pub forbidden_periods_hard: bool,
}

fn default_max_seconds() -> Option<u64> {
    Some(30)
}
fn default_forbidden_hard() -> bool {
    true
}

impl Default for SolveConfig {
    fn default() -> Self {
        Self {
            max_seconds: default_max_seconds(),
            random_seed: None,
            weights: ObjectiveWeights::default(),
            forbidden_periods_hard: default_forbidden_hard(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
pub struct TimetableProblem {
    pub calendar: Calendar,
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub subjects: Vec<Subject>,
    #[serde(default)]
    pub teachers: Vec<Teacher>,
    #[serde(default)]
    pub rooms: Vec<Room>,
    #[serde(default)]
    pub requirements: Vec<CourseRequirement>,
    #[serde(default)]
    pub config: SolveConfig,
}

impl TimetableProblem {
    pub fn index_groups(&self) -> std::collections::HashMap<&str, &Group> {
        self.groups.iter().map(|g| (g.id.0.as_str(), g)).collect()
    }

    pub fn index_subjects(&self) -> std::collections::HashMap<&str, &Subject> {
        self.subjects.iter().map(|s| (s.id.0.as_str(), s)).collect()
    }

    pub fn index_teachers(&self) -> std::collections::HashMap<&str, &Teacher> {
        self.teachers.iter().map(|t| (t.id.0.as_str(), t)).collect()
    }

    pub fn index_rooms(&self) -> std::collections::HashMap<&str, &Room> {
        self.rooms.iter().map(|r| (r.id.0.as_str(), r)).collect()
    }
}

/// A single unit lesson instance generated by the compiler from a
/// `CourseRequirement`. Unit duration only (see Non-goals).
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
pub struct Event {
    pub id: String,
    pub group_id: GroupId,
    pub subject_id: SubjectId,
    pub room_type_required: RoomType,
    pub teacher_key: TeacherKey,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema, JsonSchema)]
pub struct ScheduledEvent {
    pub event_id: String,
    pub slot: Slot,
    pub room_id: RoomId,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema, JsonSchema)]
pub struct TeacherAssignment {
    pub group_id: GroupId,
    pub subject_id: SubjectId,
    pub teacher_id: TeacherId,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema, JsonSchema)]
pub struct TimetableSolution {
    pub scheduled: Vec<ScheduledEvent>,
    pub teacher_assignment: Vec<TeacherAssignment>,
    pub objective_value: Option<i64>,
    pub objective_breakdown: std::collections::HashMap<String, i64>,
}
