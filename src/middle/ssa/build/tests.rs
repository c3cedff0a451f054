use crate::{
    middle::ssa::{dom, verify, Aux, BlockKind, Func, Op},
    testutil::{build_src, func_named},
};

fn ops_of(f: &Func) -> Vec<Op> {
    f.blocks
        .values()
        .flat_map(|b| b.values.iter().map(|&v| f.value(v).op))
        .collect()
}

fn count_op(f: &Func, op: Op) -> usize {
    ops_of(f).iter().filter(|&&o| o == op).count()
}

#[test]
fn built_functions_pass_both_verifiers() {
    let (mut funcs, _cx, _info) = build_src(
        "package main\n\
         type P struct { x int; y int; }\n\
         func (p P) sum() int {\n    return p.x + p.y\n}\n\
         func add(a int, b int) int {\n    return a + b\n}\n\
         func main() {\n    var p P\n    p.x = 1\n    p.y = 2\n    println(add(p.sum(), 2))\n}\n",
    );
    for f in &mut funcs {
        verify::verify(f).unwrap();
        dom::compute_dom(f);
        verify::verify_dom(f).unwrap();
    }
}

#[test]
fn add_lowers_to_loads_and_add64() {
    let (funcs, _cx, _info) = build_src(
        "package main\nfunc add(a int, b int) int {\n    return a + b\n}\n",
    );
    let f = func_named(&funcs, "add");

    // Entry: two Args, two Allocas, two Stores; then two Loads feeding Add64.
    assert_eq!(count_op(f, Op::Arg), 2);
    assert_eq!(count_op(f, Op::Alloca), 2);
    assert_eq!(count_op(f, Op::Store), 2);
    assert_eq!(count_op(f, Op::Load), 2);
    assert_eq!(count_op(f, Op::Add64), 1);

    // The add's operands are the loads.
    let entry = f.block(f.entry);
    let add = entry
        .values
        .iter()
        .find(|&&v| f.value(v).op == Op::Add64)
        .copied()
        .expect("no Add64");
    for &arg in &f.value(add).args {
        assert_eq!(f.value(arg).op, Op::Load);
    }

    // The entry returns the add.
    assert_eq!(entry.kind, BlockKind::Return);
    assert_eq!(entry.controls, vec![add]);
}

#[test]
fn receiver_arg_uses_index_minus_one() {
    let (funcs, _cx, _info) = build_src(
        "package main\ntype P struct { x int; }\nfunc (p P) get() int {\n    return p.x\n}\n",
    );
    let f = func_named(&funcs, "get");
    let entry = f.block(f.entry);
    let recv_arg = entry
        .values
        .iter()
        .find(|&&v| f.value(v).op == Op::Arg)
        .copied()
        .expect("no Arg");
    assert_eq!(f.value(recv_arg).aux_int, -1);
}

#[test]
fn if_with_both_returns_drops_the_join_block() {
    let (funcs, _cx, _info) = build_src(
        "package main\nfunc f(x int) int {\n    if x > 0 {\n        return 1\n    } else {\n        return -1\n    }\n}\n",
    );
    let f = func_named(&funcs, "f");

    // Entry (if), then, else — the join block was removed.
    assert_eq!(f.num_blocks(), 3);
    assert_eq!(f.block(f.entry).kind, BlockKind::If);
    let return_blocks = f
        .blocks
        .values()
        .filter(|b| b.kind == BlockKind::Return)
        .count();
    assert_eq!(return_blocks, 2);
}

#[test]
fn loop_shape_header_body_exit() {
    let (funcs, _cx, _info) = build_src(
        "package main\nfunc f() int {\n    var i int = 0\n    for i < 10 {\n        i = i + 1\n    }\n    return i\n}\n",
    );
    let f = func_named(&funcs, "f");

    // entry -> header (if) -> {body, exit}; body -> header.
    assert_eq!(f.num_blocks(), 4);
    let header = f.block(f.entry).succs[0];
    assert_eq!(f.block(header).kind, BlockKind::If);
    let body = f.block(header).succs[0];
    let exit = f.block(header).succs[1];
    assert_eq!(f.block(body).succs, vec![header]);
    assert_eq!(f.block(exit).kind, BlockKind::Return);
}

#[test]
fn short_circuit_produces_merge_phi() {
    let (mut funcs, _cx, _info) = build_src(
        "package main\nfunc f(a bool, b bool) bool {\n    return a && b\n}\n",
    );
    let f = func_named(&mut funcs, "f");

    assert_eq!(count_op(f, Op::Phi), 1);
    // The short-circuit constant of && is false.
    let phi = f
        .blocks
        .values()
        .flat_map(|b| b.values.iter())
        .find(|&&v| f.value(v).op == Op::Phi)
        .copied()
        .unwrap();
    let short_arg = f.value(phi).args[0];
    assert_eq!(f.value(short_arg).op, Op::ConstBool);
    assert_eq!(f.value(short_arg).aux_int, 0);

    // || short-circuits to true.
    let (funcs2, _cx2, _info2) = build_src(
        "package main\nfunc g(a bool, b bool) bool {\n    return a || b\n}\n",
    );
    let g = func_named(&funcs2, "g");
    let phi = g
        .blocks
        .values()
        .flat_map(|b| b.values.iter())
        .find(|&&v| g.value(v).op == Op::Phi)
        .copied()
        .unwrap();
    let short_arg = g.value(phi).args[0];
    assert_eq!(g.value(short_arg).aux_int, 1);
}

#[test]
fn panic_terminates_with_an_exit_block() {
    let (funcs, _cx, _info) = build_src(
        "package main\nfunc f() {\n    panic(\"boom\")\n    println(1)\n}\n",
    );
    let f = func_named(&funcs, "f");
    assert_eq!(f.block(f.entry).kind, BlockKind::Exit);
    assert_eq!(count_op(f, Op::Panic), 1);
    // The println after the panic is unreachable and was dropped.
    assert_eq!(count_op(f, Op::Println), 0);
}

#[test]
fn method_call_prepends_receiver() {
    let (funcs, cx, _info) = build_src(
        "package main\n\
         type P struct { x int; y int; }\n\
         func (p P) sum() int {\n    return p.x + p.y\n}\n\
         func main() {\n    var p P\n    println(p.sum())\n}\n",
    );
    let f = func_named(&funcs, "main");

    let call = f
        .blocks
        .values()
        .flat_map(|b| b.values.iter())
        .find(|&&v| f.value(v).op == Op::StaticCall)
        .copied()
        .expect("no StaticCall");
    let call_val = f.value(call);
    assert_eq!(call_val.args.len(), 1, "receiver is the only argument");
    let Aux::Func(obj) = &call_val.aux else {
        panic!("static call without callee");
    };
    assert_eq!(cx.obj(*obj).name.as_str(), "sum");
}

#[test]
fn new_lowers_to_new_alloc_with_element_type() {
    let (funcs, cx, _info) = build_src(
        "package main\ntype N struct { v int; }\nfunc main() {\n    n := new(N)\n    n.v = 7\n    println(n.v)\n}\n",
    );
    let f = func_named(&funcs, "main");

    let alloc = f
        .blocks
        .values()
        .flat_map(|b| b.values.iter())
        .find(|&&v| f.value(v).op == Op::NewAlloc)
        .copied()
        .expect("no NewAlloc");
    let Aux::Type(elem) = f.value(alloc).aux.clone() else {
        panic!("NewAlloc without element type");
    };
    assert_eq!(cx.types.display(elem).to_string(), "N");

    // Field assignment through the ref uses StructFieldPtr + Store.
    assert!(count_op(f, Op::StructFieldPtr) >= 1);
}

#[test]
fn composite_literal_zero_fills_then_stores_fields() {
    let (funcs, _cx, _info) = build_src(
        "package main\ntype P struct { x int; y int; }\nfunc f() int {\n    p := P{x: 1, y: 2}\n    return p.x\n}\n",
    );
    let f = func_named(&funcs, "f");

    assert!(count_op(f, Op::Zero) >= 1);
    // One field pointer per initialized field.
    assert!(count_op(f, Op::StructFieldPtr) >= 2);

    // Struct layout scenario: field indices 0 and 1 appear as aux.
    let field_idxs: Vec<i64> = f
        .blocks
        .values()
        .flat_map(|b| b.values.iter())
        .filter(|&&v| f.value(v).op == Op::StructFieldPtr)
        .map(|&v| f.value(v).aux_int)
        .collect();
    assert!(field_idxs.contains(&0));
    assert!(field_idxs.contains(&1));
}

#[test]
fn implicit_void_return_is_added() {
    let (funcs, _cx, _info) = build_src("package main\nfunc f() {\n    println(1)\n}\n");
    let f = func_named(&funcs, "f");
    assert_eq!(f.block(f.entry).kind, BlockKind::Return);
    assert!(f.block(f.entry).controls.is_empty());
}

#[test]
fn break_and_continue_wire_to_loop_targets() {
    let (mut funcs, _cx, _info) = build_src(
        "package main\nfunc f() int {\n    i := 0\n    for i < 10 {\n        i = i + 1\n        if i > 5 {\n            break\n        }\n    }\n    return i\n}\n",
    );
    let f = func_named(&mut funcs, "f");
    verify::verify(f).unwrap();

    let header = f.block(f.entry).succs[0];
    let exit = f.block(header).succs[1];
    // The break edge makes the exit block a join of the header and the
    // break site.
    assert!(f.block(exit).preds.len() == 2);
}

#[test]
fn use_counts_match_argument_references() {
    let (funcs, _cx, _info) = build_src(
        "package main\nfunc f(a int) int {\n    return a + a\n}\n",
    );
    let f = func_named(&funcs, "f");

    let mut counted: hashbrown::HashMap<_, i32> = hashbrown::HashMap::new();
    for b in f.blocks.values() {
        for &v in &b.values {
            for &arg in &f.value(v).args {
                *counted.entry(arg).or_default() += 1;
            }
        }
        for &c in &b.controls {
            *counted.entry(c).or_default() += 1;
        }
    }
    for b in f.blocks.values() {
        for &v in &b.values {
            assert_eq!(
                f.value(v).uses,
                counted.get(&v).copied().unwrap_or(0),
                "use count mismatch for v{:?}",
                v
            );
        }
    }
}
