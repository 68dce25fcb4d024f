//! Integration tests for the concrete scenarios in the spec's testable
//! properties section (S2, S3, S5), run against the deterministic
//! fallback tier so the expected outcome doesn't depend on whether a
//! MILP backend is linked in.

use sched_core::compile::compile_problem;
use solver_milp::solve_fallback;
use std::collections::HashSet;
use types::{
    Calendar, CourseRequirement, Group, Room, RoomType, SolveConfig, Subject, Teacher,
    TeacherPolicy, TimetableProblem,
};

fn subject(id: &str) -> Subject {
    Subject {
        id: id.into(),
        room_type_required: RoomType::Normal,
        max_per_day: None,
    }
}

/// S2 — minimal feasible instance: one group, one subject, one teacher
/// in CHOOSE mode, one room, three periods/week.
#[test]
fn s2_minimal_feasible() {
    let problem = TimetableProblem {
        calendar: Calendar {
            days: vec!["mon".into(), "tue".into()],
            periods_per_day: 6,
            blocked_slots: HashSet::new(),
        },
        groups: vec![Group { id: "G1".into(), size: 20 }],
        subjects: vec![subject("MATH")],
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
    };

    let report = sched_core::validate_problem(&problem, false).unwrap();
    assert!(report.ok, "errors: {:?}", report.errors);

    let compiled = compile_problem(&problem).unwrap();
    let solution = solve_fallback(&problem, &compiled).unwrap();

    assert_eq!(solution.scheduled.len(), 3);
    assert!(solution.scheduled.iter().all(|se| se.room_id.0 == "R1"));
    assert_eq!(solution.teacher_assignment.len(), 1);
    assert_eq!(solution.teacher_assignment[0].teacher_id.0, "T1");

    let mut slots: Vec<_> = solution.scheduled.iter().map(|se| se.slot.clone()).collect();
    slots.sort_by_key(|s| (s.day.clone(), s.period));
    slots.dedup();
    assert_eq!(slots.len(), 3, "no two events should share a slot");
}

/// S3 — two groups forced onto the same fixed teacher, only two slots
/// total: the teacher must not be double-booked.
#[test]
fn s3_forced_teacher_conflict_resolves() {
    let problem = TimetableProblem {
        calendar: Calendar {
            days: vec!["mon".into()],
            periods_per_day: 2,
            blocked_slots: HashSet::new(),
        },
        groups: vec![
            Group { id: "G1".into(), size: 10 },
            Group { id: "G2".into(), size: 10 },
        ],
        subjects: vec![subject("MATH")],
        teachers: vec![Teacher {
            id: "T1".into(),
            can_teach: ["MATH".into()].into_iter().collect(),
            unavailable: HashSet::new(),
            max_periods_per_day: None,
            max_periods_per_week: None,
            min_periods_per_day: None,
            min_periods_per_week: None,
        }],
        rooms: vec![
            Room {
                id: "R1".into(),
                room_type: RoomType::Normal,
                capacity: 10,
                unavailable: HashSet::new(),
            },
            Room {
                id: "R2".into(),
                room_type: RoomType::Normal,
                capacity: 10,
                unavailable: HashSet::new(),
            },
        ],
        requirements: vec![
            CourseRequirement {
                group_id: "G1".into(),
                subject_id: "MATH".into(),
                periods_per_week: 1,
                max_consecutive: Some(2),
                teacher_policy: TeacherPolicy::Fixed,
                teacher_id: Some("T1".into()),
                teacher_pool: None,
                preferred_periods: None,
                forbidden_periods: None,
                allow_double: false,
            },
            CourseRequirement {
                group_id: "G2".into(),
                subject_id: "MATH".into(),
                periods_per_week: 1,
                max_consecutive: Some(2),
                teacher_policy: TeacherPolicy::Fixed,
                teacher_id: Some("T1".into()),
                teacher_pool: None,
                preferred_periods: None,
                forbidden_periods: None,
                allow_double: false,
            },
        ],
        config: SolveConfig::default(),
    };

    let report = sched_core::validate_problem(&problem, false).unwrap();
    assert!(report.ok, "errors: {:?}", report.errors);

    let compiled = compile_problem(&problem).unwrap();
    let solution = solve_fallback(&problem, &compiled).unwrap();

    assert_eq!(solution.scheduled.len(), 2);
    assert!(solution
        .teacher_assignment
        .iter()
        .all(|ta| ta.teacher_id.0 == "T1"));

    let slot_g1 = &solution.scheduled[0].slot;
    let slot_g2 = &solution.scheduled[1].slot;
    assert_ne!(slot_g1, slot_g2, "T1 must not be double-booked");
}

/// S5 — a hard forbidden-periods set removes those slots from the
/// compiled domain entirely, so every scheduled event must land outside
/// it regardless of which solver tier runs.
#[test]
fn s5_hard_forbidden_periods_are_excluded_from_the_domain() {
    let mut config = SolveConfig::default();
    config.forbidden_periods_hard = true;

    let problem = TimetableProblem {
        calendar: Calendar {
            days: vec!["mon".into(), "tue".into(), "wed".into(), "thu".into(), "fri".into()],
            periods_per_day: 3,
            blocked_slots: HashSet::new(),
        },
        groups: vec![Group { id: "G1".into(), size: 10 }],
        subjects: vec![subject("MATH")],
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
            capacity: 10,
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
            forbidden_periods: Some([1, 2].into_iter().collect()),
            allow_double: false,
        }],
        config,
    };

    let compiled = compile_problem(&problem).unwrap();
    for e in &compiled.events {
        for &si in &compiled.allowed_slots[&e.id] {
            assert_eq!(compiled.slots[si].period, 3);
        }
    }

    let solution = solve_fallback(&problem, &compiled).unwrap();
    assert!(solution.scheduled.iter().all(|se| se.slot.period == 3));
}
