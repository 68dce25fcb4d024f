#![allow(clippy::type_complexity)]
//! MILP model for a compiled problem: declares the full decomposed
//! variable set (x/y/a/occ/teach/busy/w plus the objective's auxiliary
//! vars), one constraint function per class, chained the way the
//! teacher's model builder chains `model.with(...)`. Everything is
//! declared only over the domains `compile::compile_problem` already
//! pruned — no full Cartesian product anywhere.

use good_lp::{Expression, ProblemVariables, Solution, SolverModel, Variable};
use sched_core::compile::CompiledProblem;
use std::collections::HashMap;
use types::{ObjectiveWeights, Room, RoomId, Teacher, TeacherId, TeacherKey, TimetableProblem, TimetableSolution};

pub(crate) struct Prep<'a> {
    pub problem: &'a TimetableProblem,
    pub compiled: &'a CompiledProblem,
    pub teachers: HashMap<&'a str, &'a Teacher>,
    pub rooms: HashMap<&'a str, &'a Room>,
    /// day -> slot indices for that day, ascending by period.
    pub slots_by_day: HashMap<&'a str, Vec<usize>>,
    pub events_by_group: HashMap<&'a str, Vec<usize>>,
    pub events_of_key: HashMap<TeacherKey, Vec<usize>>,
}

pub(crate) fn build_prep<'a>(problem: &'a TimetableProblem, compiled: &'a CompiledProblem) -> Prep<'a> {
    let teachers = problem.index_teachers();
    let rooms = problem.index_rooms();

    let mut slots_by_day: HashMap<&str, Vec<usize>> = HashMap::new();
    for (si, slot) in compiled.slots.iter().enumerate() {
        slots_by_day.entry(slot.day.as_str()).or_default().push(si);
    }
    for v in slots_by_day.values_mut() {
        v.sort_by_key(|&si| compiled.slots[si].period);
    }

    let mut events_by_group: HashMap<&str, Vec<usize>> = HashMap::new();
    let mut events_of_key: HashMap<TeacherKey, Vec<usize>> = HashMap::new();
    for (i, e) in compiled.events.iter().enumerate() {
        events_by_group.entry(e.group_id.0.as_str()).or_default().push(i);
        events_of_key.entry(e.teacher_key.clone()).or_default().push(i);
    }

    Prep {
        problem,
        compiled,
        teachers,
        rooms,
        slots_by_day,
        events_by_group,
        events_of_key,
    }
}

pub(crate) struct Vars {
    /// (event_id, slot_idx) -> var
    pub x: HashMap<(String, usize), Variable>,
    /// (event_id, room_id) -> var
    pub y: HashMap<(String, RoomId), Variable>,
    /// (key, teacher_id) -> var
    pub a: HashMap<(TeacherKey, TeacherId), Variable>,
    /// (key, slot_idx) -> var; absent means structurally 0
    pub occ: HashMap<(TeacherKey, usize), Variable>,
    /// (key, teacher_id, slot_idx) -> var; absent means structurally 0
    pub teach: HashMap<(TeacherKey, TeacherId, usize), Variable>,
    /// (teacher_id, slot_idx) -> var; absent means structurally 0
    pub busy: HashMap<(TeacherId, usize), Variable>,
    /// (event_id, slot_idx, room_id) -> var; absent means structurally 0
    pub w: HashMap<(String, usize, RoomId), Variable>,
    pub gap_vars: Vec<Variable>,
    pub late_vars: Vec<Variable>,
    pub excess_vars: Vec<Variable>,
    pub pref_terms: Vec<Variable>,
    pub forbidden_soft_terms: Vec<Variable>,
}

fn occ_expr(occ: &HashMap<(TeacherKey, usize), Variable>, k: &TeacherKey, si: usize) -> Expression {
    occ.get(&(k.clone(), si))
        .map(|&v| Expression::from(v))
        .unwrap_or_else(|| Expression::from(0.0))
}

fn busy_expr(busy: &HashMap<(TeacherId, usize), Variable>, tid: &TeacherId, si: usize) -> Expression {
    busy.get(&(tid.clone(), si))
        .map(|&v| Expression::from(v))
        .unwrap_or_else(|| Expression::from(0.0))
}

pub(crate) fn declare_x(prep: &Prep, vars: &mut ProblemVariables) -> HashMap<(String, usize), Variable> {
    let mut x = HashMap::new();
    for e in &prep.compiled.events {
        for &si in &prep.compiled.allowed_slots[&e.id] {
            x.insert((e.id.clone(), si), vars.add(good_lp::variable().binary()));
        }
    }
    x
}

pub(crate) fn declare_y(prep: &Prep, vars: &mut ProblemVariables) -> HashMap<(String, RoomId), Variable> {
    let mut y = HashMap::new();
    for e in &prep.compiled.events {
        for rid in &prep.compiled.allowed_rooms[&e.id] {
            y.insert((e.id.clone(), rid.clone()), vars.add(good_lp::variable().binary()));
        }
    }
    y
}

pub(crate) fn declare_a(
    prep: &Prep,
    vars: &mut ProblemVariables,
) -> HashMap<(TeacherKey, TeacherId), Variable> {
    let mut a = HashMap::new();
    for (k, pool) in &prep.compiled.key_pools {
        for tid in pool {
            a.insert((k.clone(), tid.clone()), vars.add(good_lp::variable().binary()));
        }
    }
    a
}

pub(crate) fn declare_occ(
    prep: &Prep,
    vars: &mut ProblemVariables,
    x: &HashMap<(String, usize), Variable>,
) -> HashMap<(TeacherKey, usize), Variable> {
    let mut occ = HashMap::new();
    for (k, ev_idxs) in &prep.events_of_key {
        for si in 0..prep.compiled.slots.len() {
            let has_terms = ev_idxs
                .iter()
                .any(|&i| x.contains_key(&(prep.compiled.events[i].id.clone(), si)));
            if has_terms {
                occ.insert((k.clone(), si), vars.add(good_lp::variable().binary()));
            }
        }
    }
    occ
}

pub(crate) fn declare_teach(
    prep: &Prep,
    vars: &mut ProblemVariables,
    occ: &HashMap<(TeacherKey, usize), Variable>,
) -> HashMap<(TeacherKey, TeacherId, usize), Variable> {
    let mut teach = HashMap::new();
    for (k, pool) in &prep.compiled.key_pools {
        for tid in pool {
            let Some(&t) = prep.teachers.get(tid.0.as_str()) else {
                continue;
            };
            for si in 0..prep.compiled.slots.len() {
                if !occ.contains_key(&(k.clone(), si)) {
                    continue;
                }
                if !t.is_available(&prep.compiled.slots[si]) {
                    continue;
                }
                teach.insert((k.clone(), tid.clone(), si), vars.add(good_lp::variable().binary()));
            }
        }
    }
    teach
}

pub(crate) fn declare_busy(
    prep: &Prep,
    vars: &mut ProblemVariables,
    teach: &HashMap<(TeacherKey, TeacherId, usize), Variable>,
) -> HashMap<(TeacherId, usize), Variable> {
    let mut busy = HashMap::new();
    for t in &prep.problem.teachers {
        for si in 0..prep.compiled.slots.len() {
            let has_terms = teach.keys().any(|(_, tid, s)| tid == &t.id && *s == si);
            if has_terms {
                busy.insert((t.id.clone(), si), vars.add(good_lp::variable().binary()));
            }
        }
    }
    busy
}

pub(crate) fn declare_w(
    prep: &Prep,
    vars: &mut ProblemVariables,
    x: &HashMap<(String, usize), Variable>,
    y: &HashMap<(String, RoomId), Variable>,
) -> HashMap<(String, usize, RoomId), Variable> {
    let mut w = HashMap::new();
    for e in &prep.compiled.events {
        for &si in &prep.compiled.allowed_slots[&e.id] {
            if !x.contains_key(&(e.id.clone(), si)) {
                continue;
            }
            let slot = &prep.compiled.slots[si];
            for rid in &prep.compiled.allowed_rooms[&e.id] {
                if !y.contains_key(&(e.id.clone(), rid.clone())) {
                    continue;
                }
                let Some(&room) = prep.rooms.get(rid.0.as_str()) else {
                    continue;
                };
                if !room.is_available(slot) {
                    continue;
                }
                w.insert((e.id.clone(), si, rid.clone()), vars.add(good_lp::variable().binary()));
            }
        }
    }
    w
}

pub(crate) fn add_event_once_constraints<M: SolverModel>(
    mut model: M,
    prep: &Prep,
    x: &HashMap<(String, usize), Variable>,
) -> M {
    for e in &prep.compiled.events {
        let mut sum = Expression::from(0.0);
        for &si in &prep.compiled.allowed_slots[&e.id] {
            if let Some(&v) = x.get(&(e.id.clone(), si)) {
                sum = sum + v;
            }
        }
        model = model.with(sum.eq(1.0));
    }
    model
}

pub(crate) fn add_group_conflict_constraints<M: SolverModel>(
    mut model: M,
    prep: &Prep,
    x: &HashMap<(String, usize), Variable>,
) -> M {
    for (_gid, ev_idxs) in &prep.events_by_group {
        for si in 0..prep.compiled.slots.len() {
            let mut sum = Expression::from(0.0);
            let mut any = false;
            for &i in ev_idxs {
                if let Some(&v) = x.get(&(prep.compiled.events[i].id.clone(), si)) {
                    sum = sum + v;
                    any = true;
                }
            }
            if any {
                model = model.with(sum.leq(1.0));
            }
        }
    }
    model
}

pub(crate) fn add_teacher_assignment_constraints<M: SolverModel>(
    mut model: M,
    prep: &Prep,
    a: &HashMap<(TeacherKey, TeacherId), Variable>,
) -> M {
    for (k, pool) in &prep.compiled.key_pools {
        let mut sum = Expression::from(0.0);
        for tid in pool {
            sum = sum + a[&(k.clone(), tid.clone())];
        }
        model = model.with(sum.eq(1.0));

        let req = &prep.compiled.req_by_key[k];
        if req.teacher_policy == types::TeacherPolicy::Fixed {
            if let Some(fixed) = &req.teacher_id {
                for tid in pool {
                    let rhs = if tid == fixed { 1.0 } else { 0.0 };
                    model = model.with(Expression::from(a[&(k.clone(), tid.clone())]).eq(rhs));
                }
            }
        }
    }
    model
}

pub(crate) fn link_occ<M: SolverModel>(
    mut model: M,
    prep: &Prep,
    x: &HashMap<(String, usize), Variable>,
    occ: &HashMap<(TeacherKey, usize), Variable>,
) -> M {
    for (k, ev_idxs) in &prep.events_of_key {
        for si in 0..prep.compiled.slots.len() {
            let Some(&occ_var) = occ.get(&(k.clone(), si)) else {
                continue;
            };
            let mut sum = Expression::from(0.0);
            for &i in ev_idxs {
                if let Some(&v) = x.get(&(prep.compiled.events[i].id.clone(), si)) {
                    sum = sum + v;
                }
            }
            model = model.with(sum.clone().leq(1.0));
            model = model.with(sum.eq(occ_var));
        }
    }
    model
}

pub(crate) fn link_teach<M: SolverModel>(
    mut model: M,
    prep: &Prep,
    a: &HashMap<(TeacherKey, TeacherId), Variable>,
    occ: &HashMap<(TeacherKey, usize), Variable>,
    teach: &HashMap<(TeacherKey, TeacherId, usize), Variable>,
) -> M {
    for (&(ref k, ref tid, si), &v) in teach {
        let a_var = a[&(k.clone(), tid.clone())];
        let occ_var = occ_expr(occ, k, si);
        model = model.with((Expression::from(v) - a_var).leq(0.0));
        model = model.with((Expression::from(v) - occ_var.clone()).leq(0.0));
        model = model.with((Expression::from(v) - a_var - occ_var).geq(-1.0));
    }
    model
}

pub(crate) fn add_teacher_conflict_constraints<M: SolverModel>(
    mut model: M,
    prep: &Prep,
    teach: &HashMap<(TeacherKey, TeacherId, usize), Variable>,
    busy: &HashMap<(TeacherId, usize), Variable>,
) -> M {
    for t in &prep.problem.teachers {
        for si in 0..prep.compiled.slots.len() {
            let mut sum = Expression::from(0.0);
            let mut any = false;
            for ((_, tid, s), &v) in teach {
                if tid == &t.id && *s == si {
                    sum = sum + v;
                    any = true;
                }
            }
            if !any {
                continue;
            }
            let busy_var = busy[&(t.id.clone(), si)];
            model = model.with(sum.clone().leq(1.0));
            model = model.with(sum.eq(busy_var));
        }
    }
    model
}

pub(crate) fn add_teacher_load_constraints<M: SolverModel>(
    mut model: M,
    prep: &Prep,
    busy: &HashMap<(TeacherId, usize), Variable>,
) -> M {
    for t in &prep.problem.teachers {
        if let Some(max_day) = t.max_periods_per_day {
            for silist in prep.slots_by_day.values() {
                let mut sum = Expression::from(0.0);
                for &si in silist {
                    sum = sum + busy_expr(busy, &t.id, si);
                }
                model = model.with(sum.leq(max_day as f64));
            }
        }
        if let Some(max_week) = t.max_periods_per_week {
            let mut sum = Expression::from(0.0);
            for si in 0..prep.compiled.slots.len() {
                sum = sum + busy_expr(busy, &t.id, si);
            }
            model = model.with(sum.leq(max_week as f64));
        }
    }
    model
}

pub(crate) fn add_room_assignment_constraints<M: SolverModel>(
    mut model: M,
    prep: &Prep,
    y: &HashMap<(String, RoomId), Variable>,
) -> M {
    for e in &prep.compiled.events {
        let mut sum = Expression::from(0.0);
        for rid in &prep.compiled.allowed_rooms[&e.id] {
            sum = sum + y[&(e.id.clone(), rid.clone())];
        }
        model = model.with(sum.eq(1.0));
    }
    model
}

/// Critical guard: if a room isn't available in a given slot, forbid the
/// (event-in-that-slot, event-in-that-room) combination outright.
pub(crate) fn add_room_availability_guard<M: SolverModel>(
    mut model: M,
    prep: &Prep,
    x: &HashMap<(String, usize), Variable>,
    y: &HashMap<(String, RoomId), Variable>,
) -> M {
    for e in &prep.compiled.events {
        for &si in &prep.compiled.allowed_slots[&e.id] {
            let Some(&x_var) = x.get(&(e.id.clone(), si)) else {
                continue;
            };
            let slot = &prep.compiled.slots[si];
            for rid in &prep.compiled.allowed_rooms[&e.id] {
                let Some(&room) = prep.rooms.get(rid.0.as_str()) else {
                    continue;
                };
                if room.is_available(slot) {
                    continue;
                }
                let y_var = y[&(e.id.clone(), rid.clone())];
                model = model.with((Expression::from(x_var) + y_var).leq(1.0));
            }
        }
    }
    model
}

pub(crate) fn link_w<M: SolverModel>(
    mut model: M,
    prep: &Prep,
    x: &HashMap<(String, usize), Variable>,
    y: &HashMap<(String, RoomId), Variable>,
    w: &HashMap<(String, usize, RoomId), Variable>,
) -> M {
    for ((eid, si, rid), &wv) in w {
        let x_var = x[&(eid.clone(), *si)];
        let y_var = y[&(eid.clone(), rid.clone())];
        model = model.with((Expression::from(wv) - x_var).leq(0.0));
        model = model.with((Expression::from(wv) - y_var).leq(0.0));
        model = model.with((Expression::from(wv) - x_var - y_var).geq(-1.0));
    }
    model
}

pub(crate) fn add_room_conflict_constraints<M: SolverModel>(
    mut model: M,
    prep: &Prep,
    w: &HashMap<(String, usize, RoomId), Variable>,
) -> M {
    for rid in prep.rooms.keys() {
        for si in 0..prep.compiled.slots.len() {
            let mut sum = Expression::from(0.0);
            let mut any = false;
            for ((_, s, r), &v) in w {
                if *s == si && r.0.as_str() == *rid {
                    sum = sum + v;
                    any = true;
                }
            }
            if any {
                model = model.with(sum.leq(1.0));
            }
        }
    }
    model
}

pub(crate) fn add_max_consecutive_constraints<M: SolverModel>(
    mut model: M,
    prep: &Prep,
    occ: &HashMap<(TeacherKey, usize), Variable>,
) -> M {
    let periods_per_day = prep.problem.calendar.periods_per_day;
    for (k, req) in &prep.compiled.req_by_key {
        let Some(m) = req.max_consecutive.filter(|&m| m >= 1) else {
            continue;
        };
        if m > periods_per_day {
            continue;
        }
        for silist in prep.slots_by_day.values() {
            for start_p in 1..=(periods_per_day - m) {
                let mut sum = Expression::from(0.0);
                let mut any = false;
                for &si in silist {
                    let p = prep.compiled.slots[si].period;
                    if p >= start_p && p <= start_p + m {
                        sum = sum + occ_expr(occ, k, si);
                        any = true;
                    }
                }
                if any {
                    model = model.with(sum.leq(m as f64));
                }
            }
        }
    }
    model
}

pub(crate) fn add_subject_max_per_day_constraints<M: SolverModel>(
    mut model: M,
    prep: &Prep,
    occ: &HashMap<(TeacherKey, usize), Variable>,
) -> M {
    let subjects = prep.problem.index_subjects();
    for k in prep.compiled.key_pools.keys() {
        let Some(&sub) = subjects.get(k.1 .0.as_str()) else {
            continue;
        };
        let Some(maxpd) = sub.max_per_day else {
            continue;
        };
        for silist in prep.slots_by_day.values() {
            if silist.is_empty() {
                continue;
            }
            let mut sum = Expression::from(0.0);
            for &si in silist {
                sum = sum + occ_expr(occ, k, si);
            }
            model = model.with(sum.leq(maxpd as f64));
        }
    }
    model
}

pub(crate) fn collect_preference_terms(
    prep: &Prep,
    occ: &HashMap<(TeacherKey, usize), Variable>,
) -> (Vec<Variable>, Vec<Variable>) {
    let mut pref_terms = Vec::new();
    let mut forbidden_soft_terms = Vec::new();

    for (k, req) in &prep.compiled.req_by_key {
        if let Some(pref) = &req.preferred_periods {
            for si in 0..prep.compiled.slots.len() {
                if pref.contains(&prep.compiled.slots[si].period) {
                    continue;
                }
                if let Some(&v) = occ.get(&(k.clone(), si)) {
                    pref_terms.push(v);
                }
            }
        }
        if !prep.problem.config.forbidden_periods_hard {
            if let Some(forbidden) = &req.forbidden_periods {
                for si in 0..prep.compiled.slots.len() {
                    if !forbidden.contains(&prep.compiled.slots[si].period) {
                        continue;
                    }
                    if let Some(&v) = occ.get(&(k.clone(), si)) {
                        forbidden_soft_terms.push(v);
                    }
                }
            }
        }
    }

    (pref_terms, forbidden_soft_terms)
}

/// A gap variable plus the three `busy` slot indices its defining
/// constraint relates: `gap >= busy[prev] + busy[next] - busy[cur] - 1`.
pub(crate) struct GapVar {
    pub var: Variable,
    pub teacher_id: TeacherId,
    pub prev: usize,
    pub cur: usize,
    pub next: usize,
}

pub(crate) fn declare_gap_and_late_vars(
    prep: &Prep,
    vars: &mut ProblemVariables,
    busy: &HashMap<(TeacherId, usize), Variable>,
) -> (Vec<GapVar>, Vec<Variable>) {
    let periods_per_day = prep.problem.calendar.periods_per_day;
    let mut gaps = Vec::new();
    let mut late_vars = Vec::new();

    for t in &prep.problem.teachers {
        for silist in prep.slots_by_day.values() {
            for p in 2..periods_per_day {
                let si_prev = silist.iter().copied().find(|&si| prep.compiled.slots[si].period == p - 1);
                let si_cur = silist.iter().copied().find(|&si| prep.compiled.slots[si].period == p);
                let si_next = silist.iter().copied().find(|&si| prep.compiled.slots[si].period == p + 1);
                let (Some(prev), Some(cur), Some(next)) = (si_prev, si_cur, si_next) else {
                    continue;
                };
                let gvar = vars.add(good_lp::variable().binary());
                gaps.push(GapVar {
                    var: gvar,
                    teacher_id: t.id.clone(),
                    prev,
                    cur,
                    next,
                });
            }
            if let Some(&si_last) = silist.iter().find(|&&si| prep.compiled.slots[si].period == periods_per_day) {
                if let Some(&v) = busy.get(&(t.id.clone(), si_last)) {
                    late_vars.push(v);
                }
            }
        }
    }
    (gaps, late_vars)
}

pub(crate) fn add_gap_constraints<M: SolverModel>(
    mut model: M,
    busy: &HashMap<(TeacherId, usize), Variable>,
    gaps: &[GapVar],
) -> M {
    for g in gaps {
        let rhs = busy_expr(busy, &g.teacher_id, g.prev) + busy_expr(busy, &g.teacher_id, g.next)
            - busy_expr(busy, &g.teacher_id, g.cur)
            - 1.0;
        model = model.with((Expression::from(g.var) - rhs).geq(0.0));
    }
    model
}

/// An excess variable plus the slot indices its defining constraint
/// sums over: `excess >= (sum of occ over the day) - 1`.
pub(crate) struct ExcessVar {
    pub var: Variable,
    pub key: TeacherKey,
    pub day_slots: Vec<usize>,
}

pub(crate) fn declare_excess_vars(prep: &Prep, vars: &mut ProblemVariables) -> Vec<ExcessVar> {
    let periods_per_day = prep.problem.calendar.periods_per_day;
    let mut excess = Vec::new();
    for k in prep.compiled.key_pools.keys() {
        for silist in prep.slots_by_day.values() {
            if silist.is_empty() {
                continue;
            }
            let ex = vars.add(
                good_lp::variable()
                    .integer()
                    .min(0.0)
                    .max(periods_per_day as f64),
            );
            excess.push(ExcessVar {
                var: ex,
                key: k.clone(),
                day_slots: silist.clone(),
            });
        }
    }
    excess
}

pub(crate) fn add_excess_constraints<M: SolverModel>(
    mut model: M,
    occ: &HashMap<(TeacherKey, usize), Variable>,
    excess: &[ExcessVar],
) -> M {
    for ex in excess {
        let mut cnt = Expression::from(0.0);
        for &si in &ex.day_slots {
            cnt = cnt + occ_expr(occ, &ex.key, si);
        }
        model = model.with((Expression::from(ex.var) - cnt + 1.0).geq(0.0));
    }
    model
}

pub(crate) struct ObjectiveBundle {
    pub expr: Expression,
    pub gap_vars: Vec<Variable>,
    pub late_vars: Vec<Variable>,
    pub excess_vars: Vec<Variable>,
    pub pref_terms: Vec<Variable>,
    pub forbidden_soft_terms: Vec<Variable>,
}

pub(crate) fn weighted_sum(vars: &[Variable], weight: u32) -> Expression {
    let mut expr = Expression::from(0.0);
    if weight == 0 {
        return expr;
    }
    for &v in vars {
        expr = expr + (weight as f64) * v;
    }
    expr
}

pub(crate) fn build_objective(
    weights: &ObjectiveWeights,
    gap_vars: Vec<Variable>,
    late_vars: Vec<Variable>,
    excess_vars: Vec<Variable>,
    pref_terms: Vec<Variable>,
    forbidden_soft_terms: Vec<Variable>,
) -> ObjectiveBundle {
    let mut expr = Expression::from(0.0);
    if !gap_vars.is_empty() {
        expr = expr + weighted_sum(&gap_vars, weights.teacher_gaps);
    }
    if !late_vars.is_empty() {
        expr = expr + weighted_sum(&late_vars, weights.teacher_late);
    }
    if !excess_vars.is_empty() {
        expr = expr + weighted_sum(&excess_vars, weights.subject_same_day_excess);
    }
    if !pref_terms.is_empty() {
        expr = expr + weighted_sum(&pref_terms, weights.preferred_period_penalty);
    }
    if !forbidden_soft_terms.is_empty() {
        expr = expr + weighted_sum(&forbidden_soft_terms, weights.forbidden_period_penalty);
    }
    ObjectiveBundle {
        expr,
        gap_vars,
        late_vars,
        excess_vars,
        pref_terms,
        forbidden_soft_terms,
    }
}

pub(crate) fn extract_solution(
    prep: &Prep,
    x: &HashMap<(String, usize), Variable>,
    y: &HashMap<(String, RoomId), Variable>,
    a: &HashMap<(TeacherKey, TeacherId), Variable>,
    objective: &ObjectiveBundle,
    objective_declared: bool,
    sol: &impl Solution,
) -> TimetableSolution {
    let mut scheduled = Vec::with_capacity(prep.compiled.events.len());
    for e in &prep.compiled.events {
        let allowed = &prep.compiled.allowed_slots[&e.id];
        let chosen_si = allowed
            .iter()
            .copied()
            .find(|&si| x.get(&(e.id.clone(), si)).map(|&v| sol.value(v) > 0.5).unwrap_or(false))
            .unwrap_or(allowed[0]);
        let rooms = &prep.compiled.allowed_rooms[&e.id];
        let chosen_room = rooms
            .iter()
            .find(|rid| y.get(&(e.id.clone(), (*rid).clone())).map(|&v| sol.value(v) > 0.5).unwrap_or(false))
            .cloned()
            .unwrap_or_else(|| rooms[0].clone());
        scheduled.push(types::ScheduledEvent {
            event_id: e.id.clone(),
            slot: prep.compiled.slots[chosen_si].clone(),
            room_id: chosen_room,
        });
    }

    let mut teacher_assignment = Vec::with_capacity(prep.compiled.key_pools.len());
    for (k, pool) in &prep.compiled.key_pools {
        let chosen = pool
            .iter()
            .find(|tid| sol.value(a[&(k.clone(), (*tid).clone())]) > 0.5)
            .cloned()
            .unwrap_or_else(|| pool[0].clone());
        teacher_assignment.push(types::TeacherAssignment {
            group_id: k.0.clone(),
            subject_id: k.1.clone(),
            teacher_id: chosen,
        });
    }

    let mut breakdown = HashMap::new();
    if !objective.gap_vars.is_empty() {
        breakdown.insert(
            "teacher_gaps".to_string(),
            objective.gap_vars.iter().map(|&v| sol.value(v).round() as i64).sum(),
        );
    }
    if !objective.late_vars.is_empty() {
        breakdown.insert(
            "teacher_late".to_string(),
            objective.late_vars.iter().map(|&v| sol.value(v).round() as i64).sum(),
        );
    }
    if !objective.excess_vars.is_empty() {
        breakdown.insert(
            "subject_same_day_excess".to_string(),
            objective.excess_vars.iter().map(|&v| sol.value(v).round() as i64).sum(),
        );
    }
    if !objective.pref_terms.is_empty() {
        breakdown.insert(
            "preferred_period_penalty".to_string(),
            objective.pref_terms.iter().map(|&v| sol.value(v).round() as i64).sum(),
        );
    }
    if !objective.forbidden_soft_terms.is_empty() {
        breakdown.insert(
            "forbidden_period_penalty".to_string(),
            objective.forbidden_soft_terms.iter().map(|&v| sol.value(v).round() as i64).sum(),
        );
    }

    let objective_value = if objective_declared {
        Some(sol.eval(objective.expr.clone()).round() as i64)
    } else {
        None
    };

    TimetableSolution {
        scheduled,
        teacher_assignment,
        objective_value,
        objective_breakdown: breakdown,
    }
}
