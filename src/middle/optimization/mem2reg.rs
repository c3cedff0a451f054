//! Promotes entry-block allocas to SSA values: phi placement at the iterated
//! dominance frontier, a renaming walk over the dominator tree, then cleanup
//! of dead memory ops and trivial phis. Allocas whose address escapes (any
//! use other than Load/Store/Zero through arg 0) are left intact.

use hashbrown::{HashMap, HashSet};

use crate::middle::{
    ssa::{dom, BlockId, Func, Op, ValueId},
    ty::{BasicKind, TypeKind},
    TypeCx,
};

pub fn mem2reg(f: &mut Func, cx: &TypeCx) {
    dom::compute_dom(f);

    let allocas = find_promotable(f);
    if allocas.is_empty() {
        return;
    }

    let df = dom::compute_dom_frontier(f);

    let mut def_blocks: HashMap<ValueId, Vec<BlockId>> = HashMap::new();
    for &a in &allocas {
        def_blocks.insert(a, find_def_blocks(f, a));
    }

    let phi_map = insert_phis(f, cx, &allocas, &def_blocks, &df);
    rename(f, cx, &allocas, &phi_map);
    cleanup_trivial_phis(f);
}

/// All allocas whose every use is a Load (ptr), Store (destination), or Zero
/// (ptr) with the alloca as args[0].
fn find_promotable(f: &Func) -> Vec<ValueId> {
    let mut all = Vec::new();
    for b in f.blocks.values() {
        for &v in &b.values {
            if f.value(v).op == Op::Alloca {
                all.push(v);
            }
        }
    }

    let alloca_set: HashSet<ValueId> = all.iter().copied().collect();
    let mut non_promotable: HashSet<ValueId> = HashSet::new();

    for b in f.blocks.values() {
        for &vid in &b.values {
            let v = f.value(vid);
            for (i, &arg) in v.args.iter().enumerate() {
                if !alloca_set.contains(&arg) {
                    continue;
                }
                let ok = match v.op {
                    Op::Load => i == 0,
                    // The alloca may be the store destination, never the
                    // stored value.
                    Op::Store => i == 0,
                    Op::Zero => i == 0,
                    _ => false,
                };
                if !ok {
                    non_promotable.insert(arg);
                }
            }
        }
        // An alloca used as a control value also escapes.
        for &c in &b.controls {
            if alloca_set.contains(&c) {
                non_promotable.insert(c);
            }
        }
    }

    all.retain(|a| !non_promotable.contains(a));
    all
}

/// The blocks containing a store or zero to the given alloca.
fn find_def_blocks(f: &Func, alloca: ValueId) -> Vec<BlockId> {
    let mut seen = HashSet::new();
    let mut blocks = Vec::new();
    for (&bid, b) in &f.blocks {
        for &vid in &b.values {
            let v = f.value(vid);
            if matches!(v.op, Op::Store | Op::Zero) && v.args.first() == Some(&alloca) {
                if seen.insert(bid) {
                    blocks.push(bid);
                }
            }
        }
    }
    blocks
}

/// Places phi nodes at the iterated dominance frontier of each alloca's
/// defining blocks. Returns phi_map[block][alloca] = phi. Each phi is
/// pre-sized with one slot per predecessor, self-referencing until renamed.
fn insert_phis(
    f: &mut Func,
    cx: &TypeCx,
    allocas: &[ValueId],
    def_blocks: &HashMap<ValueId, Vec<BlockId>>,
    df: &HashMap<BlockId, Vec<BlockId>>,
) -> HashMap<BlockId, HashMap<ValueId, ValueId>> {
    let mut phi_map: HashMap<BlockId, HashMap<ValueId, ValueId>> = HashMap::new();

    for &alloca in allocas {
        let elem = elem_type(f, cx, alloca);

        for b in iterated_df(&def_blocks[&alloca], df) {
            let phi = f.new_value_at_front(b, Op::Phi, Some(elem));
            let npreds = f.block(b).preds.len();
            f.value_mut(phi).args = vec![phi; npreds];

            phi_map.entry(b).or_default().insert(alloca, phi);
        }
    }

    phi_map
}

/// The iterated dominance frontier of a set of defining blocks.
fn iterated_df(defs: &[BlockId], df: &HashMap<BlockId, Vec<BlockId>>) -> Vec<BlockId> {
    let mut result = Vec::new();
    let mut in_result = HashSet::new();
    let mut worklist: Vec<BlockId> = defs.to_vec();
    let mut in_worklist: HashSet<BlockId> = defs.iter().copied().collect();

    while let Some(b) = worklist.pop() {
        let Some(frontier) = df.get(&b) else {
            continue;
        };
        for &d in frontier {
            if in_result.insert(d) {
                result.push(d);
                if in_worklist.insert(d) {
                    worklist.push(d);
                }
            }
        }
    }
    result
}

/// Preorder walk of the dominator tree, tracking each alloca's stack of
/// reaching definitions (seeded with a zero constant in the entry block) and
/// wiring successor phi arguments.
fn rename(
    f: &mut Func,
    cx: &TypeCx,
    allocas: &[ValueId],
    phi_map: &HashMap<BlockId, HashMap<ValueId, ValueId>>,
) {
    // Zero constants per alloca, created in the entry block.
    let mut zero_vals: HashMap<ValueId, ValueId> = HashMap::new();
    for &a in allocas {
        let elem = elem_type(f, cx, a);
        zero_vals.insert(a, make_zero(f, cx, elem));
    }

    let mut stacks: HashMap<ValueId, Vec<ValueId>> = HashMap::new();
    for &a in allocas {
        stacks.insert(a, vec![zero_vals[&a]]);
    }

    let alloca_set: HashSet<ValueId> = allocas.iter().copied().collect();
    let mut dead: HashSet<ValueId> = HashSet::new();

    let entry = f.entry;
    visit(
        f,
        entry,
        &alloca_set,
        &zero_vals,
        phi_map,
        &mut stacks,
        &mut dead,
    );

    remove_dead(f, &dead, &alloca_set);
}

#[allow(clippy::too_many_arguments)]
fn visit(
    f: &mut Func,
    b: BlockId,
    alloca_set: &HashSet<ValueId>,
    zero_vals: &HashMap<ValueId, ValueId>,
    phi_map: &HashMap<BlockId, HashMap<ValueId, ValueId>>,
    stacks: &mut HashMap<ValueId, Vec<ValueId>>,
    dead: &mut HashSet<ValueId>,
) {
    let mut push_counts: HashMap<ValueId, usize> = HashMap::new();

    // 1. Phis in this block are new definitions.
    if let Some(pm) = phi_map.get(&b) {
        for (&alloca, &phi) in pm {
            stacks.get_mut(&alloca).unwrap().push(phi);
            *push_counts.entry(alloca).or_default() += 1;
        }
    }

    // 2. Process the block's values in order.
    let vals = f.block(b).values.clone();
    for vid in vals {
        let (op, arg0, arg1) = {
            let v = f.value(vid);
            (v.op, v.args.first().copied(), v.args.get(1).copied())
        };
        match op {
            Op::Load => {
                if let Some(alloca) = arg0.filter(|a| alloca_set.contains(a)) {
                    let reaching = *stacks[&alloca].last().unwrap();
                    f.replace_uses(vid, reaching);
                    dead.insert(vid);
                }
            }
            Op::Store => {
                if let Some(alloca) = arg0.filter(|a| alloca_set.contains(a)) {
                    let stored = arg1.expect("store without value");
                    stacks.get_mut(&alloca).unwrap().push(stored);
                    *push_counts.entry(alloca).or_default() += 1;
                    dead.insert(vid);
                }
            }
            Op::Zero => {
                if let Some(alloca) = arg0.filter(|a| alloca_set.contains(a)) {
                    stacks.get_mut(&alloca).unwrap().push(zero_vals[&alloca]);
                    *push_counts.entry(alloca).or_default() += 1;
                    dead.insert(vid);
                }
            }
            _ => {}
        }
    }

    // 3. Fill successor phi arguments for this block's predecessor slot.
    let succs = f.block(b).succs.clone();
    for s in succs {
        let Some(pm) = phi_map.get(&s) else {
            continue;
        };
        let Some(pred_idx) = f.block(s).preds.iter().position(|&p| p == b) else {
            continue;
        };
        for (&alloca, &phi) in pm {
            let val = *stacks[&alloca].last().unwrap();
            f.value_mut(phi).args[pred_idx] = val;
            f.value_mut(val).uses += 1;
        }
    }

    // 4. Recurse into dominated blocks.
    let children = f.block(b).dominees.clone();
    for child in children {
        visit(f, child, alloca_set, zero_vals, phi_map, stacks, dead);
    }

    // 5. Pop this block's definitions.
    for (alloca, count) in push_counts {
        let stack = stacks.get_mut(&alloca).unwrap();
        stack.truncate(stack.len() - count);
    }
}

/// A zero constant of the given type. Placed at the front of the entry block
/// so it precedes every renamed use.
fn make_zero(f: &mut Func, cx: &TypeCx, t: crate::middle::ty::TypeId) -> ValueId {
    let entry = f.entry;
    let op = match cx.types.kind(cx.types.underlying(t)) {
        TypeKind::Basic(BasicKind::Float) => Op::ConstF64,
        TypeKind::Basic(BasicKind::Bool) => Op::ConstBool,
        TypeKind::Basic(BasicKind::String) => Op::ConstString,
        TypeKind::Pointer { .. } | TypeKind::Ref { .. } => Op::ConstNil,
        // Int, plus the fallback for anything else; aggregate allocas are
        // never promotable, so this covers the promoted set.
        _ => Op::Const64,
    };
    let v = f.new_value_at_front(entry, op, Some(t));
    if op == Op::ConstString {
        f.value_mut(v).aux = crate::middle::ssa::Aux::Str(String::new());
    }
    v
}

/// The element type behind an alloca's pointer type.
fn elem_type(f: &Func, cx: &TypeCx, alloca: ValueId) -> crate::middle::ty::TypeId {
    let ptr = f.value(alloca).ty.expect("alloca without type");
    cx.types
        .elem(ptr)
        .expect("alloca type is not a pointer")
}

/// Removes dead loads/stores/zeros (decrementing their arguments' use
/// counts) and promoted allocas whose use count reached zero.
fn remove_dead(f: &mut Func, dead: &HashSet<ValueId>, alloca_set: &HashSet<ValueId>) {
    let block_ids: Vec<BlockId> = f.blocks.keys().copied().collect();

    for &b in &block_ids {
        let vals = f.block(b).values.clone();
        let mut live = Vec::with_capacity(vals.len());
        for v in vals {
            if dead.contains(&v) {
                let args = f.value(v).args.clone();
                for arg in args {
                    f.value_mut(arg).uses -= 1;
                }
                f.values.remove(&v);
                continue;
            }
            live.push(v);
        }
        f.block_mut(b).values = live;
    }

    for &b in &block_ids {
        let vals = f.block(b).values.clone();
        let mut live = Vec::with_capacity(vals.len());
        for v in vals {
            if alloca_set.contains(&v) && f.value(v).uses == 0 {
                f.values.remove(&v);
                continue;
            }
            live.push(v);
        }
        f.block_mut(b).values = live;
    }
}

/// Collapses phis whose argument set reduces to a single non-self value,
/// then drops phis that end up unused. Repeats to a fixed point.
fn cleanup_trivial_phis(f: &mut Func) {
    let mut changed = true;
    while changed {
        changed = false;

        let block_ids: Vec<BlockId> = f.blocks.keys().copied().collect();
        for &b in &block_ids {
            let vals = f.block(b).values.clone();
            for v in vals {
                if f.values.get(&v).map(|x| x.op) != Some(Op::Phi) {
                    continue;
                }
                if let Some(unique) = trivial_phi(f, v) {
                    f.replace_uses(v, unique);
                    changed = true;
                }
            }
        }

        if changed {
            for &b in &block_ids {
                let vals = f.block(b).values.clone();
                let mut live = Vec::with_capacity(vals.len());
                for v in vals {
                    let is_dead_phi =
                        f.value(v).op == Op::Phi && f.value(v).uses == 0;
                    if is_dead_phi {
                        let args = f.value(v).args.clone();
                        for arg in args {
                            if arg != v {
                                f.value_mut(arg).uses -= 1;
                            }
                        }
                        f.values.remove(&v);
                        continue;
                    }
                    live.push(v);
                }
                f.block_mut(b).values = live;
            }
        }
    }
}

/// The single non-self argument of a trivial phi, or None when the phi has
/// several distinct arguments (or none at all).
fn trivial_phi(f: &Func, phi: ValueId) -> Option<ValueId> {
    let v = f.value(phi);
    let mut unique = None;
    for &arg in &v.args {
        if arg == phi {
            continue;
        }
        match unique {
            None => unique = Some(arg),
            Some(u) if u == arg => {}
            Some(_) => return None,
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        middle::ssa::{dom as ssa_dom, verify},
        testutil::build_src,
    };

    fn run(src: &str, name: &str) -> (Func, crate::middle::TypeCx) {
        let (mut funcs, cx, _info) = build_src(src);
        let idx = funcs
            .iter()
            .position(|f| f.name.as_str() == name)
            .unwrap_or_else(|| panic!("no function named {name}"));
        let mut f = funcs.remove(idx);
        verify::verify(&f).unwrap();
        mem2reg(&mut f, &cx);
        verify::verify(&f).unwrap();
        ssa_dom::compute_dom(&mut f);
        verify::verify_dom(&f).unwrap();
        (f, cx)
    }

    fn count_op(f: &Func, op: Op) -> usize {
        f.blocks
            .values()
            .flat_map(|b| b.values.iter())
            .filter(|&&v| f.value(v).op == op)
            .count()
    }

    #[test]
    fn straight_line_promotion_removes_all_memory_ops() {
        let (f, _cx) = run(
            "package main\nfunc add(a int, b int) int {\n    return a + b\n}\n",
            "add",
        );

        assert_eq!(count_op(&f, Op::Alloca), 0);
        assert_eq!(count_op(&f, Op::Load), 0);
        assert_eq!(count_op(&f, Op::Store), 0);

        // The add now consumes the Arg values directly.
        let add = f
            .blocks
            .values()
            .flat_map(|b| b.values.iter())
            .find(|&&v| f.value(v).op == Op::Add64)
            .copied()
            .expect("no Add64 after promotion");
        for &arg in &f.value(add).args {
            assert_eq!(f.value(arg).op, Op::Arg);
        }
    }

    #[test]
    fn loop_variable_gets_a_header_phi() {
        let (f, _cx) = run(
            "package main\nfunc f() int {\n    var i int = 0\n    for i < 10 {\n        i = i + 1\n    }\n    return i\n}\n",
            "f",
        );

        assert_eq!(count_op(&f, Op::Alloca), 0);
        assert_eq!(count_op(&f, Op::Phi), 1);

        // The phi lives in the loop header and merges the initial constant
        // with the increment.
        let header = f.block(f.entry).succs[0];
        let phi = f
            .block(header)
            .values
            .iter()
            .find(|&&v| f.value(v).op == Op::Phi)
            .copied()
            .expect("no phi in the loop header");
        let arg_ops: Vec<Op> = f
            .value(phi)
            .args
            .iter()
            .map(|&a| f.value(a).op)
            .collect();
        assert!(arg_ops.contains(&Op::Const64));
        assert!(arg_ops.contains(&Op::Add64));
    }

    #[test]
    fn uninitialized_variable_is_seeded_with_zero() {
        let (f, _cx) = run(
            "package main\nfunc f() int {\n    var x int\n    return x\n}\n",
            "f",
        );
        assert_eq!(count_op(&f, Op::Alloca), 0);
        assert_eq!(count_op(&f, Op::Zero), 0);
        // The return control is the zero constant.
        let ret = f.block(f.entry).controls[0];
        assert_eq!(f.value(ret).op, Op::Const64);
        assert_eq!(f.value(ret).aux_int, 0);
    }

    #[test]
    fn address_taken_alloca_is_not_promoted() {
        let (f, _cx) = run(
            "package main\nfunc f() int {\n    var x int = 1\n    p := &x\n    *p = 2\n    return x\n}\n",
            "f",
        );

        // x's slot is stored as a value (its address escapes into p), so it
        // must keep its alloca; p itself promotes.
        assert_eq!(count_op(&f, Op::Alloca), 1);
        assert!(count_op(&f, Op::Load) >= 1);
        assert!(count_op(&f, Op::Store) >= 1);
    }

    #[test]
    fn diamond_join_phi_collapses_when_trivial() {
        // Both arms leave x untouched, so the join phi (if any) collapses and
        // the function reduces to returning the constant.
        let (f, _cx) = run(
            "package main\nfunc f(c bool) int {\n    x := 7\n    if c {\n        println(1)\n    } else {\n        println(2)\n    }\n    return x\n}\n",
            "f",
        );
        assert_eq!(count_op(&f, Op::Phi), 0);

        let ret_block = f
            .blocks
            .values()
            .find(|b| b.kind == crate::middle::ssa::BlockKind::Return)
            .expect("no return block");
        let ret = ret_block.controls[0];
        assert_eq!(f.value(ret).op, Op::Const64);
        assert_eq!(f.value(ret).aux_int, 7);
    }

    #[test]
    fn diamond_with_distinct_assignments_keeps_a_phi() {
        let (f, _cx) = run(
            "package main\nfunc f(c bool) int {\n    x := 0\n    if c {\n        x = 1\n    } else {\n        x = 2\n    }\n    return x\n}\n",
            "f",
        );
        assert_eq!(count_op(&f, Op::Phi), 1);
        assert_eq!(count_op(&f, Op::Alloca), 0);
    }

    #[test]
    fn use_counts_stay_consistent_after_promotion() {
        let (f, _cx) = run(
            "package main\nfunc f(c bool) int {\n    x := 0\n    i := 0\n    for i < 4 {\n        if c {\n            x = x + 1\n        }\n        i = i + 1\n    }\n    return x + i\n}\n",
            "f",
        );

        let mut counted: HashMap<ValueId, i32> = HashMap::new();
        for b in f.blocks.values() {
            for &v in &b.values {
                for &arg in &f.value(v).args {
                    if arg != v {
                        *counted.entry(arg).or_default() += 1;
                    }
                }
            }
            for &c in &b.controls {
                *counted.entry(c).or_default() += 1;
            }
        }
        for b in f.blocks.values() {
            for &v in &b.values {
                let expected = counted.get(&v).copied().unwrap_or(0);
                let self_uses: i32 = f
                    .value(v)
                    .args
                    .iter()
                    .filter(|&&a| a == v)
                    .count() as i32;
                assert_eq!(
                    f.value(v).uses,
                    expected + self_uses,
                    "use count mismatch for {:?}",
                    v
                );
            }
        }
    }
}

