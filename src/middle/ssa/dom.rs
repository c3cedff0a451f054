//! Dominator tree and dominance frontier computation, using Cooper, Harvey,
//! and Kennedy's "A Simple, Fast Dominance Algorithm".

use hashbrown::{HashMap, HashSet};

use super::{BlockId, Func};

/// The blocks of `f` in reverse post-order starting from the entry block.
/// Unreachable blocks are excluded.
pub fn reverse_post_order(f: &Func) -> Vec<BlockId> {
    let mut visited = HashSet::new();
    let mut order = Vec::new();

    fn dfs(f: &Func, b: BlockId, visited: &mut HashSet<BlockId>, order: &mut Vec<BlockId>) {
        if !visited.insert(b) {
            return;
        }
        for &s in &f.block(b).succs {
            dfs(f, s, visited, order);
        }
        order.push(b);
    }
    dfs(f, f.entry, &mut visited, &mut order);

    order.reverse();
    order
}

/// Computes the immediate dominator tree, populating `idom` and `dominees`
/// for all reachable blocks. Unreachable blocks are not assigned a
/// dominator.
pub fn compute_dom(f: &mut Func) {
    let rpo = reverse_post_order(f);
    if rpo.is_empty() {
        return;
    }

    let mut rpo_num = HashMap::with_capacity(rpo.len());
    for (i, &b) in rpo.iter().enumerate() {
        rpo_num.insert(b, i);
    }

    // Clear old tree data; entry dominates itself as a sentinel.
    let entry = rpo[0];
    let block_ids: Vec<BlockId> = f.blocks.keys().copied().collect();
    for b in &block_ids {
        let blk = f.block_mut(*b);
        blk.idom = None;
        blk.dominees.clear();
    }
    f.block_mut(entry).idom = Some(entry);

    // The closest common dominator of two blocks, walking idom chains guided
    // by RPO numbers.
    fn intersect(
        f: &Func,
        rpo_num: &HashMap<BlockId, usize>,
        mut b1: BlockId,
        mut b2: BlockId,
    ) -> BlockId {
        while b1 != b2 {
            while rpo_num[&b1] > rpo_num[&b2] {
                b1 = f.block(b1).idom.expect("idom missing during intersect");
            }
            while rpo_num[&b2] > rpo_num[&b1] {
                b2 = f.block(b2).idom.expect("idom missing during intersect");
            }
        }
        b1
    }

    let mut changed = true;
    while changed {
        changed = false;
        for &b in rpo.iter().skip(1) {
            // First predecessor with a computed dominator.
            let preds = f.block(b).preds.clone();
            let mut new_idom = None;
            for &p in &preds {
                if f.block(p).idom.is_some() {
                    new_idom = Some(p);
                    break;
                }
            }
            let Some(mut new_idom) = new_idom else {
                continue;
            };

            for &p in &preds {
                if p == new_idom {
                    continue;
                }
                if f.block(p).idom.is_some() {
                    new_idom = intersect(f, &rpo_num, p, new_idom);
                }
            }

            if f.block(b).idom != Some(new_idom) {
                f.block_mut(b).idom = Some(new_idom);
                changed = true;
            }
        }
    }

    // Clear the entry sentinel and build dominee lists.
    f.block_mut(entry).idom = None;
    for &b in &rpo {
        if let Some(idom) = f.block(b).idom {
            f.block_mut(idom).dominees.push(b);
        }
    }
}

/// Computes the dominance frontier of every block. `compute_dom` must have
/// run first.
pub fn compute_dom_frontier(f: &Func) -> HashMap<BlockId, Vec<BlockId>> {
    let mut df: HashMap<BlockId, Vec<BlockId>> = HashMap::new();

    for (&b, block) in &f.blocks {
        if block.preds.len() < 2 {
            continue;
        }
        for &p in &block.preds {
            let mut runner = Some(p);
            while let Some(r) = runner {
                if Some(r) == block.idom {
                    break;
                }
                let list = df.entry(r).or_default();
                if !list.contains(&b) {
                    list.push(b);
                }
                runner = f.block(r).idom;
            }
        }
    }

    df
}

/// Whether `a` dominates `b` (including a == b).
pub fn dominates(f: &Func, a: BlockId, b: BlockId) -> bool {
    let mut cur = Some(b);
    while let Some(c) = cur {
        if c == a {
            return true;
        }
        cur = f.block(c).idom;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        frontend::intern::Symbol,
        middle::ssa::{BlockKind, Func},
    };

    /// Builds a diamond: b0 -> {b1, b2} -> b3.
    fn diamond() -> (Func, BlockId, BlockId, BlockId, BlockId) {
        let mut f = Func::new(Symbol::new("t"), vec![], None);
        let b0 = f.entry;
        let b1 = f.new_block(BlockKind::Plain);
        let b2 = f.new_block(BlockKind::Plain);
        let b3 = f.new_block(BlockKind::Return);
        f.block_mut(b0).kind = BlockKind::If;
        f.add_succ(b0, b1);
        f.add_succ(b0, b2);
        f.add_succ(b1, b3);
        f.add_succ(b2, b3);
        (f, b0, b1, b2, b3)
    }

    #[test]
    fn rpo_starts_at_entry_and_skips_unreachable() {
        let (mut f, b0, ..) = diamond();
        let dead = f.new_block(BlockKind::Plain);
        let rpo = reverse_post_order(&f);
        assert_eq!(rpo[0], b0);
        assert_eq!(rpo.len(), 4);
        assert!(!rpo.contains(&dead));
    }

    #[test]
    fn diamond_idoms() {
        let (mut f, b0, b1, b2, b3) = diamond();
        compute_dom(&mut f);
        assert_eq!(f.block(b0).idom, None);
        assert_eq!(f.block(b1).idom, Some(b0));
        assert_eq!(f.block(b2).idom, Some(b0));
        // The join point is dominated by the branch, not by either arm.
        assert_eq!(f.block(b3).idom, Some(b0));
        assert!(dominates(&f, b0, b3));
        assert!(!dominates(&f, b1, b3));
    }

    #[test]
    fn diamond_frontier() {
        let (mut f, _b0, b1, b2, b3) = diamond();
        compute_dom(&mut f);
        let df = compute_dom_frontier(&f);
        assert_eq!(df.get(&b1), Some(&vec![b3]));
        assert_eq!(df.get(&b2), Some(&vec![b3]));
        assert_eq!(df.get(&b3), None);
    }

    #[test]
    fn loop_header_dominates_body_and_exit() {
        // b0 -> b1 (header) -> {b2 (body), b3 (exit)}; b2 -> b1.
        let mut f = Func::new(Symbol::new("t"), vec![], None);
        let b0 = f.entry;
        let b1 = f.new_block(BlockKind::If);
        let b2 = f.new_block(BlockKind::Plain);
        let b3 = f.new_block(BlockKind::Return);
        f.add_succ(b0, b1);
        f.add_succ(b1, b2);
        f.add_succ(b1, b3);
        f.add_succ(b2, b1);

        compute_dom(&mut f);
        assert_eq!(f.block(b1).idom, Some(b0));
        assert_eq!(f.block(b2).idom, Some(b1));
        assert_eq!(f.block(b3).idom, Some(b1));

        // The header is in its own body's dominance frontier (back edge).
        let df = compute_dom_frontier(&f);
        assert!(df.get(&b2).is_some_and(|v| v.contains(&b1)));
        assert!(df.get(&b1).is_some_and(|v| v.contains(&b1)));
    }
}
