//! Deterministic fallback: a declaration-order constructive scan used
//! when the MILP backend is disabled or fails to produce a usable
//! solution. Schedules events in the order the compiler emitted them,
//! scanning each event's allowed slots ascending and its allowed rooms
//! in declaration order, and fixes one teacher per `(group, subject)`
//! key up front (the first pool entry) rather than re-deciding per
//! event. It only enforces the baseline conflict-freeness and
//! availability constraints — `max_consecutive`, per-day/week teacher
//! caps, and `Subject.max_per_day` are left to the MILP tier.

use sched_core::compile::CompiledProblem;
use sched_core::error::EngineError;
use std::collections::HashSet;
use types::{ScheduledEvent, TeacherAssignment, TeacherKey, TimetableProblem, TimetableSolution};

pub fn solve_fallback(
    problem: &TimetableProblem,
    compiled: &CompiledProblem,
) -> Result<TimetableSolution, EngineError> {
    let teachers = problem.index_teachers();
    let rooms = problem.index_rooms();

    let mut teacher_for_key = std::collections::HashMap::new();
    for (k, pool) in &compiled.key_pools {
        let Some(first) = pool.first() else {
            return Err(EngineError::ModelInvariantViolation {
                context: format!("key ({}, {})", k.0, k.1),
                status: "empty teacher pool reached the fallback solver".into(),
            });
        };
        teacher_for_key.insert(k.clone(), first.clone());
    }

    let mut occ_group: HashSet<(String, usize)> = HashSet::new();
    let mut occ_teacher: HashSet<(String, usize)> = HashSet::new();
    let mut occ_room: HashSet<(String, usize)> = HashSet::new();
    let mut scheduled = Vec::with_capacity(compiled.events.len());

    for e in &compiled.events {
        let key: &TeacherKey = &e.teacher_key;
        let teacher_id = &teacher_for_key[key];
        let Some(teacher) = teachers.get(teacher_id.0.as_str()) else {
            return Err(EngineError::NoSolution {
                status: format!("teacher '{teacher_id}' referenced by key ({}, {}) not found", key.0, key.1),
            });
        };

        let mut placed = None;
        'slots: for &si in &compiled.allowed_slots[&e.id] {
            if occ_group.contains(&(e.group_id.0.clone(), si)) {
                continue;
            }
            if occ_teacher.contains(&(teacher_id.0.clone(), si)) {
                continue;
            }
            let slot = &compiled.slots[si];
            if !teacher.is_available(slot) {
                continue;
            }
            for rid in &compiled.allowed_rooms[&e.id] {
                if occ_room.contains(&(rid.0.clone(), si)) {
                    continue;
                }
                let Some(room) = rooms.get(rid.0.as_str()) else {
                    continue;
                };
                if !room.is_available(slot) {
                    continue;
                }
                placed = Some((si, rid.clone()));
                break 'slots;
            }
        }

        let Some((si, rid)) = placed else {
            return Err(EngineError::NoSolution {
                status: "INFEASIBLE".into(),
            });
        };

        occ_group.insert((e.group_id.0.clone(), si));
        occ_teacher.insert((teacher_id.0.clone(), si));
        occ_room.insert((rid.0.clone(), si));
        scheduled.push(ScheduledEvent {
            event_id: e.id.clone(),
            slot: compiled.slots[si].clone(),
            room_id: rid,
        });
    }

    let teacher_assignment = compiled
        .key_pools
        .keys()
        .map(|k| TeacherAssignment {
            group_id: k.0.clone(),
            subject_id: k.1.clone(),
            teacher_id: teacher_for_key[k].clone(),
        })
        .collect();

    Ok(TimetableSolution {
        scheduled,
        teacher_assignment,
        objective_value: None,
        objective_breakdown: Default::default(),
    })
}
