//! SSA verifiers. [`verify`] checks structural integrity; [`verify_dom`]
//! additionally checks dominance properties after dominator computation.
//! Verifier failures are internal invariant violations and abort the
//! compilation.

use hashbrown::{HashMap, HashSet};
use thiserror::Error;

use super::{dom, BlockKind, Func, Op, ValueId};
use crate::index::Index;

#[derive(Debug, Error)]
#[error("SSA verification failed:\n  {}", .0.join("\n  "))]
pub struct VerifyError(pub Vec<String>);

/// Checks the structural integrity of an SSA function.
pub fn verify(f: &Func) -> Result<(), VerifyError> {
    let mut errs: Vec<String> = Vec::new();
    let name = f.name;

    if f.blocks.is_empty() {
        errs.push(format!("func {name}: no blocks"));
        return Err(VerifyError(errs));
    }

    // The entry block is blocks[0].
    if f.blocks.keys().next() != Some(&f.entry) {
        errs.push(format!("func {name}: first block is not the entry block"));
    }

    // 1. The entry block has no predecessors.
    let entry_preds = f.block(f.entry).preds.len();
    if entry_preds != 0 {
        errs.push(format!(
            "func {name}: entry block b{} has {} predecessors, want 0",
            f.entry.index(),
            entry_preds
        ));
    }

    // The set of values reachable through block value lists.
    let mut value_set: HashSet<ValueId> = HashSet::new();
    for b in f.blocks.values() {
        for &v in &b.values {
            value_set.insert(v);
        }
    }

    for (&bid, b) in &f.blocks {
        let bname = format!("b{}", bid.index());

        // 2. Every value's block pointer matches its container.
        for &vid in &b.values {
            let v = f.value(vid);
            if v.block != bid {
                errs.push(format!(
                    "func {name}, {bname}, v{}: value block is b{}, want {bname}",
                    vid.index(),
                    v.block.index()
                ));
            }

            // 3. Non-void values carry a type. Static and indirect calls may
            // carry none for void-returning callees.
            if !v.op.is_void() && v.ty.is_none() && v.op != Op::StaticCall && v.op != Op::Call {
                errs.push(format!(
                    "func {name}, {bname}, v{} ({}): non-void value has no type",
                    vid.index(),
                    v.op
                ));
            }

            // 4. Phi argument count equals predecessor count.
            if v.op == Op::Phi && v.args.len() != b.preds.len() {
                errs.push(format!(
                    "func {name}, {bname}, v{}: phi has {} args but block has {} preds",
                    vid.index(),
                    v.args.len(),
                    b.preds.len()
                ));
            }

            // 5. Phis appear only at the front of their block.
            if v.op == Op::Phi {
                let i = b.values.iter().position(|&x| x == vid).unwrap();
                if b.values[..i].iter().any(|&x| f.value(x).op != Op::Phi) {
                    errs.push(format!(
                        "func {name}, {bname}, v{}: phi after non-phi value",
                        vid.index()
                    ));
                }
            }

            // 6. All arguments are values of this function.
            for (i, &arg) in v.args.iter().enumerate() {
                if !value_set.contains(&arg) {
                    errs.push(format!(
                        "func {name}, {bname}, v{}: arg[{i}] (v{}) not found in function",
                        vid.index(),
                        arg.index()
                    ));
                }
            }
        }

        // 7. Terminator shape matches the block kind.
        match b.kind {
            BlockKind::Plain => {
                if b.succs.len() != 1 {
                    errs.push(format!(
                        "func {name}, {bname}: plain block has {} succs, want 1",
                        b.succs.len()
                    ));
                }
            }
            BlockKind::If => {
                if b.controls.len() != 1 {
                    errs.push(format!(
                        "func {name}, {bname}: if block has {} controls, want 1",
                        b.controls.len()
                    ));
                }
                if b.succs.len() != 2 {
                    errs.push(format!(
                        "func {name}, {bname}: if block has {} succs, want 2",
                        b.succs.len()
                    ));
                }
            }
            BlockKind::Return => {
                if !b.succs.is_empty() {
                    errs.push(format!(
                        "func {name}, {bname}: return block has {} succs, want 0",
                        b.succs.len()
                    ));
                }
                if b.controls.len() > 1 {
                    errs.push(format!(
                        "func {name}, {bname}: return block has {} controls, want at most 1",
                        b.controls.len()
                    ));
                }
            }
            BlockKind::Exit => {
                if !b.succs.is_empty() {
                    errs.push(format!(
                        "func {name}, {bname}: exit block has {} succs, want 0",
                        b.succs.len()
                    ));
                }
            }
        }

        // 8. Successor/predecessor lists are mutually consistent.
        for &succ in &b.succs {
            match f.blocks.get(&succ) {
                None => errs.push(format!(
                    "func {name}, {bname}: successor b{} not in function",
                    succ.index()
                )),
                Some(sb) => {
                    if !sb.preds.contains(&bid) {
                        errs.push(format!(
                            "func {name}, {bname}: successor b{} does not list {bname} as predecessor",
                            succ.index()
                        ));
                    }
                }
            }
        }
        for &pred in &b.preds {
            match f.blocks.get(&pred) {
                None => errs.push(format!(
                    "func {name}, {bname}: predecessor b{} not in function",
                    pred.index()
                )),
                Some(pb) => {
                    if !pb.succs.contains(&bid) {
                        errs.push(format!(
                            "func {name}, {bname}: predecessor b{} does not list {bname} as successor",
                            pred.index()
                        ));
                    }
                }
            }
        }

        // 9. Control values belong to the function.
        for (i, &c) in b.controls.iter().enumerate() {
            if !value_set.contains(&c) {
                errs.push(format!(
                    "func {name}, {bname}: control[{i}] (v{}) not found in function",
                    c.index()
                ));
            }
        }
    }

    if errs.is_empty() {
        Ok(())
    } else {
        Err(VerifyError(errs))
    }
}

/// Checks dominance properties: runs [`verify`] first, then requires the
/// dominator tree to be consistent and every use to be dominated by its
/// definition.
pub fn verify_dom(f: &Func) -> Result<(), VerifyError> {
    verify(f)?;

    let mut errs: Vec<String> = Vec::new();
    let name = f.name;

    // Reachability from the entry.
    let mut reachable = HashSet::new();
    let mut stack = vec![f.entry];
    while let Some(b) = stack.pop() {
        if !reachable.insert(b) {
            continue;
        }
        for &s in &f.block(b).succs {
            stack.push(s);
        }
    }

    // 1. The entry has no immediate dominator.
    if f.block(f.entry).idom.is_some() {
        errs.push(format!("func {name}: entry block has an immediate dominator"));
    }

    // 2. Every reachable non-entry block has a non-self immediate dominator.
    for (&bid, b) in &f.blocks {
        if !reachable.contains(&bid) || bid == f.entry {
            continue;
        }
        match b.idom {
            None => errs.push(format!(
                "func {name}, b{}: reachable block has no immediate dominator",
                bid.index()
            )),
            Some(d) if d == bid => errs.push(format!(
                "func {name}, b{}: block is its own immediate dominator",
                bid.index()
            )),
            _ => {}
        }
    }

    // Value position within its block, for same-block ordering checks.
    let mut val_idx: HashMap<ValueId, usize> = HashMap::new();
    for b in f.blocks.values() {
        for (i, &v) in b.values.iter().enumerate() {
            val_idx.insert(v, i);
        }
    }

    // 3. A non-phi value's arguments are defined in blocks that dominate its
    // block, or earlier in the same block.
    for (&bid, b) in &f.blocks {
        if !reachable.contains(&bid) {
            continue;
        }
        for &vid in &b.values {
            let v = f.value(vid);
            if v.op == Op::Phi {
                continue;
            }
            for (i, &arg) in v.args.iter().enumerate() {
                let def_block = f.value(arg).block;
                if def_block == bid {
                    if val_idx[&arg] >= val_idx[&vid] {
                        errs.push(format!(
                            "func {name}, b{}, v{}: arg[{i}] v{} does not precede its use",
                            bid.index(),
                            vid.index(),
                            arg.index()
                        ));
                    }
                } else if !dom::dominates(f, def_block, bid) {
                    errs.push(format!(
                        "func {name}, b{}, v{}: arg[{i}] v{} defined in b{} which does not dominate b{}",
                        bid.index(),
                        vid.index(),
                        arg.index(),
                        def_block.index(),
                        bid.index()
                    ));
                }
            }
        }
    }

    // 4. A phi's i-th argument is defined in a block dominating the i-th
    // predecessor.
    for (&bid, b) in &f.blocks {
        if !reachable.contains(&bid) {
            continue;
        }
        for &vid in &b.values {
            let v = f.value(vid);
            if v.op != Op::Phi {
                continue;
            }
            for (i, &arg) in v.args.iter().enumerate() {
                if i >= b.preds.len() {
                    continue;
                }
                // A self-argument is a placeholder or loop-carried value.
                if arg == vid {
                    continue;
                }
                let pred = b.preds[i];
                let def_block = f.value(arg).block;
                if !dom::dominates(f, def_block, pred) {
                    errs.push(format!(
                        "func {name}, b{}, v{}: phi arg[{i}] v{} defined in b{} which does not dominate pred b{}",
                        bid.index(),
                        vid.index(),
                        arg.index(),
                        def_block.index(),
                        pred.index()
                    ));
                }
            }
        }
    }

    // 5. Control values dominate their block.
    for (&bid, b) in &f.blocks {
        if !reachable.contains(&bid) {
            continue;
        }
        for (i, &c) in b.controls.iter().enumerate() {
            let def_block = f.value(c).block;
            if def_block != bid && !dom::dominates(f, def_block, bid) {
                errs.push(format!(
                    "func {name}, b{}: control[{i}] v{} defined in b{} which does not dominate b{}",
                    bid.index(),
                    c.index(),
                    def_block.index(),
                    bid.index()
                ));
            }
        }
    }

    if errs.is_empty() {
        Ok(())
    } else {
        Err(VerifyError(errs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        frontend::{intern::Symbol, pos::Pos},
        middle::{ssa::BlockKind, ty::BasicKind, TypeCx},
    };

    #[test]
    fn minimal_function_verifies() {
        let cx = TypeCx::new();
        let int = cx.types.basic(BasicKind::Int);
        let mut f = Func::new(Symbol::new("f"), vec![], Some(int));
        let c = f.new_value(f.entry, Op::Const64, Some(int), &[], Pos::none());
        f.value_mut(c).aux_int = 7;
        f.block_mut(f.entry).kind = BlockKind::Return;
        f.set_control(f.entry, c);

        assert!(verify(&f).is_ok());
        super::super::dom::compute_dom(&mut f);
        assert!(verify_dom(&f).is_ok());
    }

    #[test]
    fn plain_block_without_successor_fails() {
        // The entry stays Plain with no successor.
        let f = Func::new(Symbol::new("f"), vec![], None);
        let err = verify(&f).unwrap_err();
        assert!(err.0.iter().any(|m| m.contains("plain block")));
    }

    #[test]
    fn inconsistent_edges_fail() {
        let mut f = Func::new(Symbol::new("f"), vec![], None);
        let b1 = f.new_block(BlockKind::Return);
        // Successor edge without the matching predecessor entry.
        f.block_mut(f.entry).succs.push(b1);
        let err = verify(&f).unwrap_err();
        assert!(err.0.iter().any(|m| m.contains("does not list")));
    }

    #[test]
    fn phi_arity_mismatch_fails() {
        let cx = TypeCx::new();
        let int = cx.types.basic(BasicKind::Int);
        let mut f = Func::new(Symbol::new("f"), vec![], None);
        let b1 = f.new_block(BlockKind::Return);
        f.add_succ(f.entry, b1);
        // One predecessor but two phi argument slots.
        let c = f.new_value(f.entry, Op::Const64, Some(int), &[], Pos::none());
        let phi = f.new_value_at_front(b1, Op::Phi, Some(int));
        f.value_mut(phi).args = vec![c, c];
        let err = verify(&f).unwrap_err();
        assert!(err.0.iter().any(|m| m.contains("phi has 2 args")));
    }

    #[test]
    fn use_before_def_in_same_block_fails_dominance() {
        let cx = TypeCx::new();
        let int = cx.types.basic(BasicKind::Int);
        let mut f = Func::new(Symbol::new("f"), vec![], Some(int));
        let c = f.new_value(f.entry, Op::Const64, Some(int), &[], Pos::none());
        let sum = f.new_value(f.entry, Op::Add64, Some(int), &[c, c], Pos::none());
        // Swap the order so the use precedes the definition.
        f.block_mut(f.entry).values.swap(0, 1);
        f.block_mut(f.entry).kind = BlockKind::Return;
        f.set_control(f.entry, sum);

        assert!(verify(&f).is_ok());
        super::super::dom::compute_dom(&mut f);
        let err = verify_dom(&f).unwrap_err();
        assert!(err.0.iter().any(|m| m.contains("does not precede")));
    }
}
