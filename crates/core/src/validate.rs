//! Pre-solve validation. Accumulates every problem it finds instead of
//! failing on the first one, so a caller gets the full list in a single
//! round trip. Mirrors the five check categories from the source this
//! engine was distilled from: calendar, uniqueness, entity sanity,
//! requirements, and capacity sanity.

use crate::error::EngineError;
use std::collections::HashSet;
use types::{CourseRequirement, Slot, TeacherPolicy, TimetableProblem};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub ok: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Validates a `TimetableProblem`. If `raise_on_error` is true and any
/// errors were found, returns `Err(EngineError::ValidationFailed)`
/// instead of a report with `ok: false`.
pub fn validate_problem(
    problem: &TimetableProblem,
    raise_on_error: bool,
) -> Result<ValidationReport, EngineError> {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    validate_calendar(problem, &mut errors, &mut warnings);
    validate_uniqueness(problem, &mut errors);
    validate_entities(problem, &mut errors, &mut warnings);
    validate_requirements(problem, &mut errors, &mut warnings);
    validate_capacity_sanity(problem, &mut errors, &mut warnings);

    let ok = errors.is_empty();
    if raise_on_error && !ok {
        return Err(EngineError::ValidationFailed(errors));
    }
    Ok(ValidationReport {
        ok,
        errors,
        warnings,
    })
}

fn validate_calendar(problem: &TimetableProblem, errors: &mut Vec<String>, warnings: &mut Vec<String>) {
    let cal = &problem.calendar;
    if cal.days.is_empty() {
        errors.push("Calendar.days is empty.".into());
        return;
    }
    if cal.periods_per_day == 0 {
        errors.push(format!(
            "Calendar.periods_per_day must be > 0 (got: {}).",
            cal.periods_per_day
        ));
    }
    for s in &cal.blocked_slots {
        if !cal.days.contains(&s.day) {
            errors.push(format!(
                "blocked_slot {:?} uses day '{}' which is not in Calendar.days.",
                s, s.day
            ));
        }
        if s.period < 1 || s.period > cal.periods_per_day {
            errors.push(format!(
                "blocked_slot {:?} uses period {} outside 1..{}.",
                s, s.period, cal.periods_per_day
            ));
        }
    }
    if cal.periods_per_day > 12 {
        warnings.push(format!(
            "Calendar.periods_per_day={} is high; check whether these are all real teaching periods.",
            cal.periods_per_day
        ));
    }
    if cal.teaching_slots().is_empty() {
        errors.push("No teaching slots available: every slot is blocked.".into());
    }
}

fn validate_uniqueness(problem: &TimetableProblem, errors: &mut Vec<String>) {
    fn dupes<'a>(ids: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
        let mut seen = HashSet::new();
        let mut dup = HashSet::new();
        for id in ids {
            if !seen.insert(id) {
                dup.insert(id);
            }
        }
        let mut dup: Vec<&str> = dup.into_iter().collect();
        dup.sort_unstable();
        dup
    }

    let g = dupes(problem.groups.iter().map(|g| g.id.0.as_str()));
    let s = dupes(problem.subjects.iter().map(|s| s.id.0.as_str()));
    let t = dupes(problem.teachers.iter().map(|t| t.id.0.as_str()));
    let r = dupes(problem.rooms.iter().map(|r| r.id.0.as_str()));

    if !g.is_empty() {
        errors.push(format!("Duplicate group ids: {g:?}"));
    }
    if !s.is_empty() {
        errors.push(format!("Duplicate subject ids: {s:?}"));
    }
    if !t.is_empty() {
        errors.push(format!("Duplicate teacher ids: {t:?}"));
    }
    if !r.is_empty() {
        errors.push(format!("Duplicate room ids: {r:?}"));
    }
}

fn validate_min_max_pair(
    ctx: &str,
    min_name: &str,
    min_val: Option<u32>,
    max_name: &str,
    max_val: Option<u32>,
    errors: &mut Vec<String>,
) {
    // min/max are stored as u32 here, so "negative" can't occur; only the
    // ordering check applies.
    if let (Some(min), Some(max)) = (min_val, max_val) {
        if min > max {
            errors.push(format!("{ctx}: {min_name} ({min}) > {max_name} ({max})."));
        }
    }
}

fn validate_entities(problem: &TimetableProblem, errors: &mut Vec<String>, warnings: &mut Vec<String>) {
    let cal = &problem.calendar;
    let subjects = problem.index_subjects();

    for g in &problem.groups {
        if g.id.0.trim().is_empty() {
            errors.push("A Group exists with an empty id.".into());
        }
        if g.size == 0 {
            errors.push(format!("Group '{}' has size <= 0 (got: {}).", g.id, g.size));
        }
    }

    for sub in &problem.subjects {
        if sub.id.0.trim().is_empty() {
            errors.push("A Subject exists with an empty id.".into());
        }
        if let Some(max_per_day) = sub.max_per_day {
            if max_per_day == 0 {
                errors.push(format!("Subject '{}': max_per_day must be > 0 or null.", sub.id));
            } else if max_per_day > cal.periods_per_day {
                warnings.push(format!(
                    "Subject '{}': max_per_day={} > periods_per_day={}.",
                    sub.id, max_per_day, cal.periods_per_day
                ));
            }
        }
    }

    for t in &problem.teachers {
        if t.id.0.trim().is_empty() {
            errors.push("A Teacher exists with an empty id.".into());
        }
        for sub_id in &t.can_teach {
            if !subjects.contains_key(sub_id.0.as_str()) {
                errors.push(format!(
                    "Teacher '{}' can_teach references unknown subject_id '{}'.",
                    t.id, sub_id
                ));
            }
        }
        for s in &t.unavailable {
            check_slot_in_calendar(&format!("Teacher '{}' unavailable", t.id), s, cal, errors);
        }

        validate_min_max_pair(
            &format!("Teacher '{}'", t.id),
            "min_periods_per_day",
            t.min_periods_per_day,
            "max_periods_per_day",
            t.max_periods_per_day,
            errors,
        );
        validate_min_max_pair(
            &format!("Teacher '{}'", t.id),
            "min_periods_per_week",
            t.min_periods_per_week,
            "max_periods_per_week",
            t.max_periods_per_week,
            errors,
        );

        if let Some(max_day) = t.max_periods_per_day {
            if max_day > cal.periods_per_day {
                warnings.push(format!(
                    "Teacher '{}': max_periods_per_day={} > periods_per_day={}.",
                    t.id, max_day, cal.periods_per_day
                ));
            }
        }
    }

    for r in &problem.rooms {
        if r.id.0.trim().is_empty() {
            errors.push("A Room exists with an empty id.".into());
        }
        if r.capacity == 0 {
            errors.push(format!("Room '{}' has capacity <= 0 (got: {}).", r.id, r.capacity));
        }
        for s in &r.unavailable {
            check_slot_in_calendar(&format!("Room '{}' unavailable", r.id), s, cal, errors);
        }
    }
}

fn check_slot_in_calendar(ctx: &str, s: &Slot, cal: &types::Calendar, errors: &mut Vec<String>) {
    if !cal.days.contains(&s.day) {
        errors.push(format!("{ctx} {s:?} has a day outside Calendar.days."));
    }
    if s.period < 1 || s.period > cal.periods_per_day {
        errors.push(format!(
            "{ctx} {s:?} has period outside 1..{}.",
            cal.periods_per_day
        ));
    }
}

fn validate_requirements(problem: &TimetableProblem, errors: &mut Vec<String>, warnings: &mut Vec<String>) {
    let cal = &problem.calendar;
    let groups = problem.index_groups();
    let subjects = problem.index_subjects();
    let teachers = problem.index_teachers();

    let mut seen_keys = HashSet::new();
    for req in &problem.requirements {
        let key = (req.group_id.0.as_str(), req.subject_id.0.as_str());
        if !seen_keys.insert(key) {
            errors.push(format!(
                "Duplicate CourseRequirement for group='{}', subject='{}'. \
                 Merge them into one (summing periods_per_week) or use a distinct key if they really differ.",
                req.group_id, req.subject_id
            ));
        }
    }

    for req in &problem.requirements {
        let ctx = format!("Requirement (group={}, subject={})", req.group_id, req.subject_id);

        if !groups.contains_key(req.group_id.0.as_str()) {
            errors.push(format!("Requirement references unknown group_id '{}'.", req.group_id));
            continue;
        }
        if !subjects.contains_key(req.subject_id.0.as_str()) {
            errors.push(format!("Requirement references unknown subject_id '{}'.", req.subject_id));
            continue;
        }

        if req.periods_per_week == 0 {
            errors.push(format!(
                "{ctx}: periods_per_week must be > 0 (got: {}).",
                req.periods_per_week
            ));
        }

        if let Some(mc) = req.max_consecutive {
            if mc == 0 {
                errors.push(format!("{ctx}: max_consecutive must be > 0 or null (got: {mc})."));
            }
            if mc > cal.periods_per_day {
                warnings.push(format!(
                    "{ctx}: max_consecutive={mc} > periods_per_day={}.",
                    cal.periods_per_day
                ));
            }
        }

        validate_period_set(
            &format!("{ctx} preferred_periods"),
            req.preferred_periods.as_ref(),
            cal.periods_per_day,
            errors,
            warnings,
            false,
        );
        validate_period_set(
            &format!("{ctx} forbidden_periods"),
            req.forbidden_periods.as_ref(),
            cal.periods_per_day,
            errors,
            warnings,
            true,
        );

        match req.teacher_policy {
            TeacherPolicy::Fixed => match &req.teacher_id {
                None => errors.push(format!(
                    "{ctx}: teacher_policy=FIXED but teacher_id is null/empty."
                )),
                Some(tid) => match teachers.get(tid.0.as_str()) {
                    None => errors.push(format!("{ctx}: teacher_id '{tid}' does not exist.")),
                    Some(t) => {
                        if !t.can_teach.contains(&req.subject_id) {
                            errors.push(format!(
                                "{ctx}: Teacher '{}' cannot teach '{}' (not in can_teach).",
                                t.id, req.subject_id
                            ));
                        }
                    }
                },
            },
            TeacherPolicy::Choose => {
                let pool = resolve_pool(problem, req);
                if pool.is_empty() {
                    errors.push(format!(
                        "{ctx}: teacher_policy=CHOOSE but the teacher pool is empty."
                    ));
                } else {
                    for tid in &pool {
                        match teachers.get(tid.0.as_str()) {
                            None => errors.push(format!(
                                "{ctx}: teacher_pool contains unknown teacher_id '{tid}'."
                            )),
                            Some(t) => {
                                if !t.can_teach.contains(&req.subject_id) {
                                    errors.push(format!(
                                        "{ctx}: teacher_pool includes '{tid}' who cannot teach '{}'.",
                                        req.subject_id
                                    ));
                                }
                            }
                        }
                    }
                }
            }
        }

        let sub = subjects[req.subject_id.0.as_str()];
        let g = groups[req.group_id.0.as_str()];
        let rooms_ok = problem
            .rooms
            .iter()
            .any(|r| r.room_type == sub.room_type_required && r.capacity >= g.size);
        if !rooms_ok {
            errors.push(format!(
                "{ctx}: no compatible Room (type={:?}, capacity>={}).",
                sub.room_type_required, g.size
            ));
        }

        let possible = possible_slots_for(problem, req);
        if req.periods_per_week as usize > possible.len() {
            errors.push(format!(
                "{ctx}: requests {} sessions/week but only {} slots are possible given \
                 blocks/forbidden-periods/availability.",
                req.periods_per_week,
                possible.len()
            ));
        }
    }
}

fn validate_period_set(
    ctx: &str,
    periods: Option<&HashSet<u32>>,
    max_period: u32,
    errors: &mut Vec<String>,
    warnings: &mut Vec<String>,
    allow_empty: bool,
) {
    let Some(periods) = periods else {
        return;
    };
    if periods.is_empty() && !allow_empty {
        warnings.push(format!("{ctx}: empty set (is this intentional?)."));
    }
    let mut bad: Vec<u32> = periods
        .iter()
        .copied()
        .filter(|&p| p < 1 || p > max_period)
        .collect();
    if !bad.is_empty() {
        bad.sort_unstable();
        errors.push(format!("{ctx}: contains periods outside 1..{max_period}: {bad:?}."));
    }
}

/// The teacher pool a `CHOOSE` requirement draws from: its explicit
/// `teacher_pool` if given, otherwise every teacher who can teach the
/// requirement's subject.
fn resolve_pool(problem: &TimetableProblem, req: &CourseRequirement) -> Vec<types::TeacherId> {
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

/// The slots a requirement could possibly occupy, after removing
/// globally blocked slots, hard forbidden periods, and slots where no
/// eligible teacher (fixed or pool) is available.
pub fn possible_slots_for(problem: &TimetableProblem, req: &CourseRequirement) -> Vec<Slot> {
    let mut slots = problem.calendar.teaching_slots();

    if problem.config.forbidden_periods_hard {
        if let Some(forbidden) = &req.forbidden_periods {
            slots.retain(|s| !forbidden.contains(&s.period));
        }
    }

    match req.teacher_policy {
        TeacherPolicy::Fixed => {
            if let Some(tid) = &req.teacher_id {
                if let Some(t) = problem.index_teachers().get(tid.0.as_str()) {
                    slots.retain(|s| t.is_available(s));
                }
            }
            slots
        }
        TeacherPolicy::Choose => {
            let teachers = problem.index_teachers();
            let pool = resolve_pool(problem, req);
            slots
                .into_iter()
                .filter(|s| {
                    pool.iter()
                        .any(|tid| teachers.get(tid.0.as_str()).is_some_and(|t| t.is_available(s)))
                })
                .collect()
        }
    }
}

fn validate_capacity_sanity(
    problem: &TimetableProblem,
    errors: &mut Vec<String>,
    warnings: &mut Vec<String>,
) {
    let teaching_slots = problem.calendar.teaching_slots();
    let slots_per_week = teaching_slots.len();

    let mut load_by_group: std::collections::HashMap<&str, u32> = std::collections::HashMap::new();
    for req in &problem.requirements {
        *load_by_group.entry(req.group_id.0.as_str()).or_default() += req.periods_per_week;
    }
    for (g_id, load) in &load_by_group {
        let load = *load as usize;
        if load > slots_per_week {
            errors.push(format!(
                "Group '{g_id}' requires {load} sessions/week but only {slots_per_week} teaching slots exist."
            ));
        } else if load == slots_per_week {
            warnings.push(format!(
                "Group '{g_id}' fills 100% of teaching slots ({load}/{slots_per_week}). \
                 This usually makes the problem harder."
            ));
        }
    }

    let teachers = problem.index_teachers();
    let mut fixed_load: std::collections::HashMap<&str, u32> = std::collections::HashMap::new();
    for req in &problem.requirements {
        if req.teacher_policy == TeacherPolicy::Fixed {
            if let Some(tid) = &req.teacher_id {
                *fixed_load.entry(tid.0.as_str()).or_default() += req.periods_per_week;
            }
        }
    }
    for (t_id, load) in &fixed_load {
        let Some(t) = teachers.get(t_id) else {
            continue;
        };
        let load = *load;
        let available = teaching_slots.iter().filter(|s| t.is_available(s)).count();
        if load as usize > available {
            errors.push(format!(
                "Teacher '{t_id}' has a fixed load of {load} but only {available} slots are available."
            ));
        }
        if let Some(max_week) = t.max_periods_per_week {
            if load > max_week {
                errors.push(format!(
                    "Teacher '{t_id}': fixed load {load} > max_periods_per_week {max_week}."
                ));
            }
        }
        if let Some(min_week) = t.min_periods_per_week {
            if load < min_week {
                warnings.push(format!(
                    "Teacher '{t_id}': fixed load {load} < min_periods_per_week {min_week} \
                     (if that minimum is hard, this will be infeasible)."
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::{
        Calendar, Group, ObjectiveWeights, Room, RoomType, SolveConfig, Subject, Teacher,
        TimetableProblem,
    };

    fn empty_problem() -> TimetableProblem {
        TimetableProblem {
            calendar: Calendar {
                days: vec![],
                periods_per_day: 0,
                blocked_slots: HashSet::new(),
            },
            groups: vec![],
            subjects: vec![],
            teachers: vec![],
            rooms: vec![],
            requirements: vec![],
            config: SolveConfig::default(),
        }
    }

    /// S1 — an entirely empty problem is rejected with a calendar error.
    #[test]
    fn s1_empty_problem_fails_on_calendar() {
        let report = validate_problem(&empty_problem(), false).unwrap();
        assert!(!report.ok);
        assert!(
            report.errors.iter().any(|e| e.contains("Calendar.days is empty")),
            "errors: {:?}",
            report.errors
        );
    }

    fn minimal_feasible_problem() -> TimetableProblem {
        TimetableProblem {
            calendar: Calendar {
                days: vec!["mon".into(), "tue".into()],
                periods_per_day: 6,
                blocked_slots: HashSet::new(),
            },
            groups: vec![Group { id: "G1".into(), size: 20 }],
            subjects: vec![Subject {
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

    /// S2 — the minimal feasible instance validates clean.
    #[test]
    fn s2_minimal_feasible_validates_ok() {
        let report = validate_problem(&minimal_feasible_problem(), false).unwrap();
        assert!(report.ok, "errors: {:?}", report.errors);
    }

    #[test]
    fn duplicate_group_ids_are_rejected() {
        let mut problem = minimal_feasible_problem();
        let dup = problem.groups[0].clone();
        problem.groups.push(dup);
        let report = validate_problem(&problem, false).unwrap();
        assert!(!report.ok);
        assert!(report.errors.iter().any(|e| e.contains("Duplicate group ids")));
    }

    /// S4 — a group requiring more periods/week than there are teaching
    /// slots is rejected, naming the group.
    #[test]
    fn s4_infeasible_by_load_names_the_group() {
        let mut problem = minimal_feasible_problem();
        problem.calendar.days = vec!["mon".into()];
        problem.calendar.periods_per_day = 5;
        problem.requirements[0].periods_per_week = 7;
        let report = validate_problem(&problem, false).unwrap();
        assert!(!report.ok);
        assert!(
            report.errors.iter().any(|e| e.contains("G1") && e.contains("7")),
            "errors: {:?}",
            report.errors
        );
    }

    #[test]
    fn strict_mode_raises_instead_of_reporting() {
        let err = validate_problem(&empty_problem(), true).unwrap_err();
        match err {
            EngineError::ValidationFailed(errors) => assert!(!errors.is_empty()),
            other => panic!("expected ValidationFailed, got {other:?}"),
        }
    }

    /// Validator idempotence (testable property #6).
    #[test]
    fn validator_is_idempotent() {
        let problem = minimal_feasible_problem();
        let a = validate_problem(&problem, false).unwrap();
        let b = validate_problem(&problem, false).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn possible_slots_for_excludes_hard_forbidden_periods() {
        let mut problem = minimal_feasible_problem();
        problem.requirements[0].forbidden_periods = Some([1, 2].into_iter().collect());
        problem.config.forbidden_periods_hard = true;
        let possible = possible_slots_for(&problem, &problem.requirements[0]);
        assert!(possible.iter().all(|s| s.period >= 3));
    }

    #[test]
    fn weights_default_to_spec_values() {
        let w = ObjectiveWeights::default();
        assert_eq!(w.teacher_gaps, 1000);
        assert_eq!(w.teacher_late, 100);
        assert_eq!(w.subject_same_day_excess, 10);
        assert_eq!(w.preferred_period_penalty, 1);
        assert_eq!(w.forbidden_period_penalty, 50);
    }
}
