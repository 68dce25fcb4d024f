//! Expands `CourseRequirement`s into unit `Event`s and precomputes the
//! pruned per-event slot/room domains the model builder and the
//! deterministic fallback both consume. One compilation pass, shared by
//! both solver tiers, so pruning logic only lives in one place.

use crate::error::EngineError;
use crate::validate::possible_slots_for;
use std::collections::HashMap;
use types::{CourseRequirement, Event, RoomId, Slot, TeacherId, TeacherKey, TeacherPolicy, TimetableProblem};

#[derive(Clone, Debug)]
pub struct CompiledProblem {
    pub events: Vec<Event>,
    /// event id -> (group_id, subject_id)
    pub event_key: HashMap<String, TeacherKey>,
    pub req_by_key: HashMap<TeacherKey, CourseRequirement>,
    /// Teaching slots in calendar order; indices below refer into this.
    pub slots: Vec<Slot>,
    pub slot_index: HashMap<Slot, usize>,
    pub key_pools: HashMap<TeacherKey, Vec<TeacherId>>,
    /// event id -> slot indices it may occupy
    pub allowed_slots: HashMap<String, Vec<usize>>,
    /// event id -> room ids it may use
    pub allowed_rooms: HashMap<String, Vec<RoomId>>,
}

fn pool_for(problem: &TimetableProblem, req: &CourseRequirement) -> Vec<TeacherId> {
    match req.teacher_policy {
        TeacherPolicy::Fixed => req.teacher_id.clone().into_iter().collect(),
        TeacherPolicy::Choose => {
            if let Some(pool) = &req.teacher_pool {
                pool.clone()
            } else {
                problem
                    .teachers
                    .iter()
                    .filter(|t| t.can_teach.contains(&req.subject_id))
                    .map(|t| t.id.clone())
                    .collect()
            }
        }
    }
}

fn rooms_for(problem: &TimetableProblem, req: &CourseRequirement) -> Vec<RoomId> {
    let groups = problem.index_groups();
    let subjects = problem.index_subjects();
    let Some(g) = groups.get(req.group_id.0.as_str()) else {
        return Vec::new();
    };
    let Some(sub) = subjects.get(req.subject_id.0.as_str()) else {
        return Vec::new();
    };
    problem
        .rooms
        .iter()
        .filter(|r| r.room_type == sub.room_type_required && r.capacity >= g.size)
        .map(|r| r.id.clone())
        .collect()
}

/// Compiles a (presumed already validated) problem into the unit-event
/// domains used by every solver tier. Fails fast on the first event
/// with no usable room or slot domain — unlike validation, this stage
/// does not accumulate.
pub fn compile_problem(problem: &TimetableProblem) -> Result<CompiledProblem, EngineError> {
    let slots = problem.calendar.teaching_slots();
    let slot_index: HashMap<Slot, usize> = slots
        .iter()
        .enumerate()
        .map(|(i, s)| (s.clone(), i))
        .collect();

    let mut events = Vec::new();
    let mut event_key = HashMap::new();
    let mut req_by_key = HashMap::new();
    let mut key_pools = HashMap::new();
    let mut allowed_slots = HashMap::new();
    let mut allowed_rooms = HashMap::new();

    for req in &problem.requirements {
        let key = req.key();
        req_by_key.insert(key.clone(), req.clone());

        let pool = pool_for(problem, req);
        key_pools.insert(key.clone(), pool);

        let Some(sub) = problem.index_subjects().get(req.subject_id.0.as_str()).copied() else {
            continue;
        };

        for i in 1..=req.periods_per_week {
            let event_id = format!("{}-{}-{:02}", req.group_id, req.subject_id, i);
            events.push(Event {
                id: event_id.clone(),
                group_id: req.group_id.clone(),
                subject_id: req.subject_id.clone(),
                room_type_required: sub.room_type_required,
                teacher_key: key.clone(),
            });
            event_key.insert(event_id.clone(), key.clone());

            let rids = rooms_for(problem, req);
            if rids.is_empty() {
                return Err(EngineError::CompileError {
                    event_id,
                    domain: "room",
                });
            }
            allowed_rooms.insert(event_id.clone(), rids);

            let possible = possible_slots_for(problem, req);
            if possible.is_empty() {
                return Err(EngineError::CompileError {
                    event_id,
                    domain: "slot",
                });
            }
            let indices: Vec<usize> = possible
                .iter()
                .filter_map(|s| slot_index.get(s).copied())
                .collect();
            allowed_slots.insert(event_id, indices);
        }
    }

    Ok(CompiledProblem {
        events,
        event_key,
        req_by_key,
        slots,
        slot_index,
        key_pools,
        allowed_slots,
        allowed_rooms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use types::{Calendar, Group, Room, RoomType, SolveConfig, Teacher, TeacherPolicy};

    fn base_problem() -> TimetableProblem {
        TimetableProblem {
            calendar: Calendar {
                days: vec!["mon".into(), "tue".into()],
                periods_per_day: 6,
                blocked_slots: HashSet::new(),
            },
            groups: vec![Group { id: "G1".into(), size: 20 }],
            subjects: vec![types::Subject {
                id: "MATH".into(),
                room_type_required: RoomType::Normal,
                max_per_day: None,
            }],
            teachers: vec![Teacher {
                id: "T1".into(),
                can_teach: ["MATH".into()].into_iter().collect(),
                unavailable: HashSet::new(),
                max_periods_per_day: None,
                max_periods_per_week: None,
                min_periods_per_day: None,
                min_periods_per_week: None,
            }],
            rooms: vec![Room {
                id: "R1".into(),
                room_type: RoomType::Normal,
                capacity: 20,
                unavailable: HashSet::new(),
            }],
            requirements: vec![CourseRequirement {
                group_id: "G1".into(),
                subject_id: "MATH".into(),
                periods_per_week: 3,
                max_consecutive: Some(2),
                teacher_policy: TeacherPolicy::Choose,
                teacher_id: None,
                teacher_pool: None,
                preferred_periods: None,
                forbidden_periods: None,
                allow_double: false,
            }],
            config: SolveConfig::default(),
        }
    }

    /// Testable property #1: every compiled event has non-empty allowed
    /// slots and rooms.
    #[test]
    fn every_event_has_nonempty_domains() {
        let problem = base_problem();
        let compiled = compile_problem(&problem).unwrap();
        assert_eq!(compiled.events.len(), 3);
        for e in &compiled.events {
            assert!(!compiled.allowed_slots[&e.id].is_empty());
            assert!(!compiled.allowed_rooms[&e.id].is_empty());
        }
    }

    #[test]
    fn event_ids_are_stable_and_zero_padded() {
        let problem = base_problem();
        let compiled = compile_problem(&problem).unwrap();
        let ids: Vec<&str> = compiled.events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["G1-MATH-01", "G1-MATH-02", "G1-MATH-03"]);
    }

    #[test]
    fn compile_fails_when_no_room_matches() {
        let mut problem = base_problem();
        problem.rooms[0].room_type = RoomType::Lab;
        let err = compile_problem(&problem).unwrap_err();
        match err {
            EngineError::CompileError { domain, .. } => assert_eq!(domain, "room"),
            other => panic!("expected CompileError, got {other:?}"),
        }
    }

    #[test]
    fn compile_fails_when_no_slot_survives_filtering() {
        let mut problem = base_problem();
        problem.teachers[0].unavailable = problem.calendar.teaching_slots().into_iter().collect();
        let err = compile_problem(&problem).unwrap_err();
        match err {
            EngineError::CompileError { domain, .. } => assert_eq!(domain, "slot"),
            other => panic!("expected CompileError, got {other:?}"),
        }
    }

    #[test]
    fn fixed_policy_pool_is_the_single_teacher() {
        let mut problem = base_problem();
        problem.requirements[0].teacher_policy = TeacherPolicy::Fixed;
        problem.requirements[0].teacher_id = Some("T1".into());
        let compiled = compile_problem(&problem).unwrap();
        let key = problem.requirements[0].key();
        assert_eq!(compiled.key_pools[&key], vec![types::TeacherId::from("T1")]);
    }
}
