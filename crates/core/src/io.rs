//! Deserializer and serializer for the untyped JSON problem/solution
//! payloads described in the spec's external interfaces. Mirrors the
//! `problem_from_dict`/`solution_to_dict` pair from the source this
//! engine was distilled from: each entity gets its own small conversion
//! function so a malformed field fails with a path naming exactly where
//! it went wrong, rather than a generic serde error.

use crate::error::EngineError;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use types::{
    Calendar, CourseRequirement, Group, ObjectiveWeights, Room, RoomType, ScheduledEvent, Slot,
    SolveConfig, Subject, Teacher, TeacherAssignment, TeacherPolicy, TimetableProblem,
    TimetableSolution,
};

type PResult<T> = Result<T, EngineError>;

fn err(path: impl Into<String>, message: impl Into<String>) -> EngineError {
    EngineError::ParseError {
        path: path.into(),
        message: message.into(),
    }
}

fn obj<'a>(v: &'a Value, path: &str) -> PResult<&'a serde_json::Map<String, Value>> {
    v.as_object()
        .ok_or_else(|| err(path, format!("expected an object, got {v}")))
}

fn field<'a>(o: &'a serde_json::Map<String, Value>, path: &str, key: &str) -> PResult<&'a Value> {
    o.get(key)
        .ok_or_else(|| err(format!("{path}.{key}"), "missing required field"))
}

fn as_str(v: &Value, path: &str) -> PResult<String> {
    v.as_str()
        .map(str::to_string)
        .ok_or_else(|| err(path, format!("expected a string, got {v}")))
}

fn as_u32(v: &Value, path: &str) -> PResult<u32> {
    v.as_u64()
        .and_then(|x| u32::try_from(x).ok())
        .ok_or_else(|| err(path, format!("expected a non-negative integer, got {v}")))
}

fn as_u64(v: &Value, path: &str) -> PResult<u64> {
    v.as_u64()
        .ok_or_else(|| err(path, format!("expected a non-negative integer, got {v}")))
}

fn as_array<'a>(v: &'a Value, path: &str) -> PResult<&'a Vec<Value>> {
    v.as_array()
        .ok_or_else(|| err(path, format!("expected an array, got {v}")))
}

fn opt_field<'a>(o: &'a serde_json::Map<String, Value>, key: &str) -> Option<&'a Value> {
    o.get(key).filter(|v| !v.is_null())
}

fn room_type(v: &Value, path: &str) -> PResult<RoomType> {
    let s = as_str(v, path)?;
    match s.as_str() {
        "NORMAL" => Ok(RoomType::Normal),
        "LAB" => Ok(RoomType::Lab),
        "GYM" => Ok(RoomType::Gym),
        "MUSIC" => Ok(RoomType::Music),
        "IT" => Ok(RoomType::It),
        "OTHER" => Ok(RoomType::Other),
        other => Err(err(path, format!("unknown RoomType '{other}'"))),
    }
}

fn teacher_policy(v: &Value, path: &str) -> PResult<TeacherPolicy> {
    let s = as_str(v, path)?;
    match s.as_str() {
        "FIXED" => Ok(TeacherPolicy::Fixed),
        "CHOOSE" => Ok(TeacherPolicy::Choose),
        other => Err(err(path, format!("unknown TeacherPolicy '{other}'"))),
    }
}

fn slot_from_value(v: &Value, path: &str) -> PResult<Slot> {
    let o = obj(v, path)?;
    let day = as_str(field(o, path, "day")?, &format!("{path}.day"))?;
    let period = as_u32(field(o, path, "period")?, &format!("{path}.period"))?;
    Ok(Slot::new(day, period))
}

fn slots_from_array(v: &Value, path: &str) -> PResult<HashSet<Slot>> {
    as_array(v, path)?
        .iter()
        .enumerate()
        .map(|(i, s)| slot_from_value(s, &format!("{path}[{i}]")))
        .collect()
}

fn u32_set_from_array(v: &Value, path: &str) -> PResult<HashSet<u32>> {
    as_array(v, path)?
        .iter()
        .enumerate()
        .map(|(i, x)| as_u32(x, &format!("{path}[{i}]")))
        .collect()
}

fn calendar_from_value(v: &Value, path: &str) -> PResult<Calendar> {
    let o = obj(v, path)?;
    let days: Vec<String> = as_array(field(o, path, "days")?, &format!("{path}.days"))?
        .iter()
        .enumerate()
        .map(|(i, d)| as_str(d, &format!("{path}.days[{i}]")))
        .collect::<PResult<_>>()?;
    let periods_per_day = as_u32(
        field(o, path, "periods_per_day")?,
        &format!("{path}.periods_per_day"),
    )?;
    let blocked_slots = match opt_field(o, "blocked_slots") {
        Some(v) => slots_from_array(v, &format!("{path}.blocked_slots"))?,
        None => HashSet::new(),
    };
    Ok(Calendar {
        days,
        periods_per_day,
        blocked_slots,
    })
}

fn group_from_value(v: &Value, path: &str) -> PResult<Group> {
    let o = obj(v, path)?;
    let id = as_str(field(o, path, "id")?, &format!("{path}.id"))?;
    let size = as_u32(field(o, path, "size")?, &format!("{path}.size"))?;
    Ok(Group {
        id: id.into(),
        size,
    })
}

fn subject_from_value(v: &Value, path: &str) -> PResult<Subject> {
    let o = obj(v, path)?;
    let id = as_str(field(o, path, "id")?, &format!("{path}.id"))?;
    let room_type_required = match opt_field(o, "room_type_required") {
        Some(v) => room_type(v, &format!("{path}.room_type_required"))?,
        None => RoomType::Normal,
    };
    let max_per_day = match opt_field(o, "max_per_day") {
        Some(v) => Some(as_u32(v, &format!("{path}.max_per_day"))?),
        None => None,
    };
    Ok(Subject {
        id: id.into(),
        room_type_required,
        max_per_day,
    })
}

fn teacher_from_value(v: &Value, path: &str) -> PResult<Teacher> {
    let o = obj(v, path)?;
    let id = as_str(field(o, path, "id")?, &format!("{path}.id"))?;
    let can_teach = match opt_field(o, "can_teach") {
        Some(v) => as_array(v, &format!("{path}.can_teach"))?
            .iter()
            .enumerate()
            .map(|(i, s)| as_str(s, &format!("{path}.can_teach[{i}]")).map(Into::into))
            .collect::<PResult<_>>()?,
        None => HashSet::new(),
    };
    let unavailable = match opt_field(o, "unavailable") {
        Some(v) => slots_from_array(v, &format!("{path}.unavailable"))?,
        None => HashSet::new(),
    };
    let max_periods_per_day = match opt_field(o, "max_periods_per_day") {
        Some(v) => Some(as_u32(v, &format!("{path}.max_periods_per_day"))?),
        None => None,
    };
    let max_periods_per_week = match opt_field(o, "max_periods_per_week") {
        Some(v) => Some(as_u32(v, &format!("{path}.max_periods_per_week"))?),
        None => None,
    };
    let min_periods_per_day = match opt_field(o, "min_periods_per_day") {
        Some(v) => Some(as_u32(v, &format!("{path}.min_periods_per_day"))?),
        None => None,
    };
    let min_periods_per_week = match opt_field(o, "min_periods_per_week") {
        Some(v) => Some(as_u32(v, &format!("{path}.min_periods_per_week"))?),
        None => None,
    };
    Ok(Teacher {
        id: id.into(),
        can_teach,
        unavailable,
        max_periods_per_day,
        max_periods_per_week,
        min_periods_per_day,
        min_periods_per_week,
    })
}

fn room_from_value(v: &Value, path: &str) -> PResult<Room> {
    let o = obj(v, path)?;
    let id = as_str(field(o, path, "id")?, &format!("{path}.id"))?;
    let room_type_v = match opt_field(o, "type") {
        Some(v) => room_type(v, &format!("{path}.type"))?,
        None => RoomType::Normal,
    };
    let capacity = match opt_field(o, "capacity") {
        Some(v) => as_u32(v, &format!("{path}.capacity"))?,
        None => 9999,
    };
    let unavailable = match opt_field(o, "unavailable") {
        Some(v) => slots_from_array(v, &format!("{path}.unavailable"))?,
        None => HashSet::new(),
    };
    Ok(Room {
        id: id.into(),
        room_type: room_type_v,
        capacity,
        unavailable,
    })
}

fn requirement_from_value(v: &Value, path: &str) -> PResult<CourseRequirement> {
    let o = obj(v, path)?;
    let group_id = as_str(field(o, path, "group_id")?, &format!("{path}.group_id"))?;
    let subject_id = as_str(field(o, path, "subject_id")?, &format!("{path}.subject_id"))?;
    let periods_per_week = as_u32(
        field(o, path, "periods_per_week")?,
        &format!("{path}.periods_per_week"),
    )?;
    let max_consecutive = match opt_field(o, "max_consecutive") {
        Some(v) => Some(as_u32(v, &format!("{path}.max_consecutive"))?),
        None => Some(2),
    };
    let teacher_policy_v = match opt_field(o, "teacher_policy") {
        Some(v) => teacher_policy(v, &format!("{path}.teacher_policy"))?,
        None => TeacherPolicy::Fixed,
    };
    let teacher_id = match opt_field(o, "teacher_id") {
        Some(v) => Some(as_str(v, &format!("{path}.teacher_id"))?.into()),
        None => None,
    };
    let teacher_pool = match opt_field(o, "teacher_pool") {
        Some(v) => Some(
            as_array(v, &format!("{path}.teacher_pool"))?
                .iter()
                .enumerate()
                .map(|(i, s)| as_str(s, &format!("{path}.teacher_pool[{i}]")).map(Into::into))
                .collect::<PResult<Vec<_>>>()?,
        ),
        None => None,
    };
    let preferred_periods = match opt_field(o, "preferred_periods") {
        Some(v) => Some(u32_set_from_array(v, &format!("{path}.preferred_periods"))?),
        None => None,
    };
    let forbidden_periods = match opt_field(o, "forbidden_periods") {
        Some(v) => Some(u32_set_from_array(v, &format!("{path}.forbidden_periods"))?),
        None => None,
    };
    let allow_double = match opt_field(o, "allow_double") {
        Some(v) => v
            .as_bool()
            .ok_or_else(|| err(format!("{path}.allow_double"), format!("expected a bool, got {v}")))?,
        None => false,
    };
    Ok(CourseRequirement {
        group_id: group_id.into(),
        subject_id: subject_id.into(),
        periods_per_week,
        max_consecutive,
        teacher_policy: teacher_policy_v,
        teacher_id,
        teacher_pool,
        preferred_periods,
        forbidden_periods,
        allow_double,
    })
}

fn weights_from_value(v: Option<&Value>, path: &str) -> PResult<ObjectiveWeights> {
    let Some(v) = v else {
        return Ok(ObjectiveWeights::default());
    };
    let o = obj(v, path)?;
    let defaults = ObjectiveWeights::default();
    let get = |key: &str, default: u32| -> PResult<u32> {
        match opt_field(o, key) {
            Some(v) => as_u32(v, &format!("{path}.{key}")),
            None => Ok(default),
        }
    };
    Ok(ObjectiveWeights {
        teacher_gaps: get("teacher_gaps", defaults.teacher_gaps)?,
        teacher_late: get("teacher_late", defaults.teacher_late)?,
        subject_same_day_excess: get("subject_same_day_excess", defaults.subject_same_day_excess)?,
        preferred_period_penalty: get("preferred_period_penalty", defaults.preferred_period_penalty)?,
        forbidden_period_penalty: get("forbidden_period_penalty", defaults.forbidden_period_penalty)?,
    })
}

fn config_from_value(v: Option<&Value>, path: &str) -> PResult<SolveConfig> {
    let Some(v) = v else {
        return Ok(SolveConfig::default());
    };
    let o = obj(v, path)?;
    let max_seconds = match opt_field(o, "max_seconds") {
        Some(v) => Some(as_u64(v, &format!("{path}.max_seconds"))?),
        None => Some(30),
    };
    let random_seed = match opt_field(o, "random_seed") {
        Some(v) => Some(as_u64(v, &format!("{path}.random_seed"))?),
        None => None,
    };
    let weights = weights_from_value(opt_field(o, "weights"), &format!("{path}.weights"))?;
    let forbidden_periods_hard = match opt_field(o, "forbidden_periods_hard") {
        Some(v) => v.as_bool().ok_or_else(|| {
            err(
                format!("{path}.forbidden_periods_hard"),
                format!("expected a bool, got {v}"),
            )
        })?,
        None => true,
    };
    Ok(SolveConfig {
        max_seconds,
        random_seed,
        weights,
        forbidden_periods_hard,
    })
}

/// Parses an untyped JSON problem payload into a `TimetableProblem`,
/// applying the defaulting rules from the spec (empty collections,
/// `max_consecutive=2`, `teacher_policy=FIXED`, `max_seconds=30`,
/// `forbidden_periods_hard=true`, default weights).
pub fn problem_from_value(v: &Value) -> Result<TimetableProblem, EngineError> {
    let o = obj(v, "")?;
    let calendar = calendar_from_value(field(o, "", "calendar")?, "calendar")?;

    let groups = match opt_field(o, "groups") {
        Some(v) => as_array(v, "groups")?
            .iter()
            .enumerate()
            .map(|(i, g)| group_from_value(g, &format!("groups[{i}]")))
            .collect::<PResult<Vec<_>>>()?,
        None => Vec::new(),
    };
    let subjects = match opt_field(o, "subjects") {
        Some(v) => as_array(v, "subjects")?
            .iter()
            .enumerate()
            .map(|(i, s)| subject_from_value(s, &format!("subjects[{i}]")))
            .collect::<PResult<Vec<_>>>()?,
        None => Vec::new(),
    };
    let teachers = match opt_field(o, "teachers") {
        Some(v) => as_array(v, "teachers")?
            .iter()
            .enumerate()
            .map(|(i, t)| teacher_from_value(t, &format!("teachers[{i}]")))
            .collect::<PResult<Vec<_>>>()?,
        None => Vec::new(),
    };
    let rooms = match opt_field(o, "rooms") {
        Some(v) => as_array(v, "rooms")?
            .iter()
            .enumerate()
            .map(|(i, r)| room_from_value(r, &format!("rooms[{i}]")))
            .collect::<PResult<Vec<_>>>()?,
        None => Vec::new(),
    };
    let requirements = match opt_field(o, "requirements") {
        Some(v) => as_array(v, "requirements")?
            .iter()
            .enumerate()
            .map(|(i, r)| requirement_from_value(r, &format!("requirements[{i}]")))
            .collect::<PResult<Vec<_>>>()?,
        None => Vec::new(),
    };
    let config = config_from_value(opt_field(o, "config"), "config")?;

    Ok(TimetableProblem {
        calendar,
        groups,
        subjects,
        teachers,
        rooms,
        requirements,
        config,
    })
}

/// Emits the solution payload shape from the spec: `scheduled`,
/// `teacher_assignment` as an array of triples, `objective_value`, and
/// `objective_breakdown`.
pub fn solution_to_value(sol: &TimetableSolution) -> Value {
    let scheduled: Vec<Value> = sol
        .scheduled
        .iter()
        .map(|se: &ScheduledEvent| {
            serde_json::json!({
                "event_id": se.event_id,
                "slot": { "day": se.slot.day, "period": se.slot.period },
                "room_id": se.room_id.0,
            })
        })
        .collect();

    let teacher_assignment: Vec<Value> = sol
        .teacher_assignment
        .iter()
        .map(|ta: &TeacherAssignment| {
            serde_json::json!({
                "group_id": ta.group_id.0,
                "subject_id": ta.subject_id.0,
                "teacher_id": ta.teacher_id.0,
            })
        })
        .collect();

    let breakdown: HashMap<&str, i64> = sol
        .objective_breakdown
        .iter()
        .map(|(k, v)| (k.as_str(), *v))
        .collect();

    serde_json::json!({
        "scheduled": scheduled,
        "teacher_assignment": teacher_assignment,
        "objective_value": sol.objective_value,
        "objective_breakdown": breakdown,
    })
}

/// Parses a solution payload back into a `TimetableSolution`. Exists
/// mainly to exercise the round-trip property in tests; callers that
/// only ever produce solutions (never consume them) have no use for it.
pub fn solution_from_value(v: &Value) -> Result<TimetableSolution, EngineError> {
    let o = obj(v, "")?;

    let scheduled = match opt_field(o, "scheduled") {
        Some(v) => as_array(v, "scheduled")?
            .iter()
            .enumerate()
            .map(|(i, se)| {
                let path = format!("scheduled[{i}]");
                let seo = obj(se, &path)?;
                let event_id = as_str(field(seo, &path, "event_id")?, &format!("{path}.event_id"))?;
                let slot = slot_from_value(field(seo, &path, "slot")?, &format!("{path}.slot"))?;
                let room_id = as_str(field(seo, &path, "room_id")?, &format!("{path}.room_id"))?;
                Ok(ScheduledEvent {
                    event_id,
                    slot,
                    room_id: room_id.into(),
                })
            })
            .collect::<PResult<Vec<_>>>()?,
        None => Vec::new(),
    };

    let teacher_assignment = match opt_field(o, "teacher_assignment") {
        Some(v) => as_array(v, "teacher_assignment")?
            .iter()
            .enumerate()
            .map(|(i, ta)| {
                let path = format!("teacher_assignment[{i}]");
                let tao = obj(ta, &path)?;
                let group_id = as_str(field(tao, &path, "group_id")?, &format!("{path}.group_id"))?;
                let subject_id = as_str(field(tao, &path, "subject_id")?, &format!("{path}.subject_id"))?;
                let teacher_id = as_str(field(tao, &path, "teacher_id")?, &format!("{path}.teacher_id"))?;
                Ok(TeacherAssignment {
                    group_id: group_id.into(),
                    subject_id: subject_id.into(),
                    teacher_id: teacher_id.into(),
                })
            })
            .collect::<PResult<Vec<_>>>()?,
        None => Vec::new(),
    };

    let objective_value = match opt_field(o, "objective_value") {
        Some(v) if !v.is_null() => Some(v.as_i64().ok_or_else(|| err("objective_value", "expected an integer"))?),
        _ => None,
    };

    let objective_breakdown = match opt_field(o, "objective_breakdown") {
        Some(v) => obj(v, "objective_breakdown")?
            .iter()
            .map(|(k, val)| {
                val.as_i64()
                    .map(|n| (k.clone(), n))
                    .ok_or_else(|| err(format!("objective_breakdown.{k}"), "expected an integer"))
            })
            .collect::<PResult<HashMap<_, _>>>()?,
        None => HashMap::new(),
    };

    Ok(TimetableSolution {
        scheduled,
        teacher_assignment,
        objective_value,
        objective_breakdown,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_payload() -> Value {
        serde_json::json!({
            "calendar": {"days": ["mon", "tue"], "periods_per_day": 6},
            "groups": [{"id": "G1", "size": 20}],
            "subjects": [{"id": "MATH"}],
            "teachers": [{"id": "T1", "can_teach": ["MATH"]}],
            "rooms": [{"id": "R1", "capacity": 20}],
            "requirements": [{
                "group_id": "G1", "subject_id": "MATH", "periods_per_week": 3,
                "teacher_policy": "CHOOSE"
            }],
        })
    }

    #[test]
    fn parses_minimal_payload_with_defaults() {
        let problem = problem_from_value(&minimal_payload()).unwrap();
        assert_eq!(problem.requirements[0].max_consecutive, Some(2));
        assert_eq!(problem.config.max_seconds, Some(30));
        assert!(problem.config.forbidden_periods_hard);
        assert_eq!(problem.config.weights.teacher_gaps, 1000);
    }

    #[test]
    fn unknown_room_type_is_a_parse_error() {
        let mut payload = minimal_payload();
        payload["subjects"][0]["room_type_required"] = serde_json::json!("SWIMMING_POOL");
        let err = problem_from_value(&payload).unwrap_err();
        match err {
            EngineError::ParseError { path, .. } => assert!(path.contains("room_type_required")),
            other => panic!("expected ParseError, got {other:?}"),
        }
    }

    #[test]
    fn missing_required_field_names_its_path() {
        let mut payload = minimal_payload();
        payload["calendar"].as_object_mut().unwrap().remove("periods_per_day");
        let err = problem_from_value(&payload).unwrap_err();
        match err {
            EngineError::ParseError { path, .. } => assert_eq!(path, "calendar.periods_per_day"),
            other => panic!("expected ParseError, got {other:?}"),
        }
    }

    /// Testable property #7: deserialize . serialize round-trips a
    /// solution up to set/order normalization of `teacher_assignment`.
    #[test]
    fn solution_round_trips_through_json() {
        let sol = TimetableSolution {
            scheduled: vec![ScheduledEvent {
                event_id: "G1-MATH-01".into(),
                slot: Slot::new("mon", 1),
                room_id: "R1".into(),
            }],
            teacher_assignment: vec![TeacherAssignment {
                group_id: "G1".into(),
                subject_id: "MATH".into(),
                teacher_id: "T1".into(),
            }],
            objective_value: Some(42),
            objective_breakdown: [("teacher_gaps".to_string(), 42)].into_iter().collect(),
        };

        let value = solution_to_value(&sol);
        let round_tripped = solution_from_value(&value).unwrap();

        let mut original_ta = sol.teacher_assignment.clone();
        let mut round_ta = round_tripped.teacher_assignment.clone();
        original_ta.sort_by(|a, b| (a.group_id.0.clone(), a.subject_id.0.clone()).cmp(&(b.group_id.0.clone(), b.subject_id.0.clone())));
        round_ta.sort_by(|a, b| (a.group_id.0.clone(), a.subject_id.0.clone()).cmp(&(b.group_id.0.clone(), b.subject_id.0.clone())));

        assert_eq!(round_tripped.scheduled.len(), sol.scheduled.len());
        assert_eq!(original_ta, round_ta);
        assert_eq!(round_tripped.objective_value, sol.objective_value);
        assert_eq!(round_tripped.objective_breakdown, sol.objective_breakdown);
    }
}
