use crate::testutil::check_src;

fn errors_of(src: &str) -> Vec<String> {
    check_src(src).errors
}

fn assert_clean(src: &str) {
    let errs = errors_of(src);
    assert!(errs.is_empty(), "unexpected errors: {errs:?}");
}

fn assert_error(src: &str, needle: &str) {
    let errs = errors_of(src);
    assert!(
        errs.iter().any(|e| e.contains(needle)),
        "expected an error containing {needle:?}, got {errs:?}"
    );
}

#[test]
fn simple_function_checks() {
    assert_clean(
        "package main\n\
         func add(a int, b int) int {\n    return a + b\n}\n\
         func main() {\n    println(add(1, 2))\n}\n",
    );
}

#[test]
fn undefined_name() {
    assert_error(
        "package main\nfunc f() {\n    x = 1\n}\n",
        "undefined: x",
    );
}

#[test]
fn redeclaration_in_same_scope() {
    assert_error(
        "package main\nfunc f() {\n    x := 1\n    x := 2\n    println(x)\n}\n",
        "x redeclared in this block",
    );
}

#[test]
fn shadowing_in_nested_block_is_allowed() {
    assert_clean(
        "package main\nfunc f() {\n    x := 1\n    {\n        x := 2\n        println(x)\n    }\n    println(x)\n}\n",
    );
}

#[test]
fn type_mismatch_in_assignment() {
    assert_error(
        "package main\nfunc f() {\n    var x int = 1\n    var s string = \"a\"\n    x = s\n}\n",
        "cannot use string as int",
    );
}

#[test]
fn untyped_literals_adopt_target_types() {
    assert_clean(
        "package main\nfunc f() {\n    var x float = 1\n    var y float = x + 1\n    println(y)\n}\n",
    );
    // Untyped float never flows into int.
    assert_error(
        "package main\nfunc f() {\n    var x int = 1.5\n    println(x)\n}\n",
        "cannot use untyped float as int",
    );
}

#[test]
fn missing_return_is_reported() {
    assert_error(
        "package main\nfunc f(x int) int {\n    if x > 0 {\n        return 1\n    }\n}\n",
        "missing return statement",
    );
    // Both branches returning satisfies the analysis.
    assert_clean(
        "package main\nfunc f(x int) int {\n    if x > 0 {\n        return 1\n    } else {\n        return -1\n    }\n}\n",
    );
    // A loop is never proven to return.
    assert_error(
        "package main\nfunc f(x int) int {\n    for x > 0 {\n        return 1\n    }\n}\n",
        "missing return statement",
    );
}

#[test]
fn break_and_continue_outside_loop() {
    assert_error(
        "package main\nfunc f() {\n    break\n}\n",
        "break not in for loop",
    );
    assert_error(
        "package main\nfunc f() {\n    continue\n}\n",
        "continue not in for loop",
    );
    assert_clean(
        "package main\nfunc f() {\n    i := 0\n    for i < 3 {\n        i = i + 1\n        continue\n    }\n}\n",
    );
}

#[test]
fn non_boolean_conditions() {
    assert_error(
        "package main\nfunc f() {\n    if 1 {\n    }\n}\n",
        "non-boolean condition in if statement",
    );
    assert_error(
        "package main\nfunc f() {\n    for 1 {\n    }\n}\n",
        "non-boolean condition in for statement",
    );
}

#[test]
fn constant_folding_division() {
    // 10/3 at type float keeps the exact quotient; at type int it truncates.
    let checked = check_src(
        "package main\nfunc f() {\n    var x float = 10 / 3\n    var y int = 10 / 3\n    println(x, y)\n}\n",
    );
    assert!(checked.errors.is_empty(), "{:?}", checked.errors);

    assert_error(
        "package main\nfunc f() {\n    x := 1 / 0\n    println(x)\n}\n",
        "division by zero",
    );
    assert_error(
        "package main\nfunc f() {\n    x := 1 % 0\n    println(x)\n}\n",
        "modulo by zero",
    );
}

#[test]
fn modulo_on_floats_is_rejected() {
    assert_error(
        "package main\nfunc f() {\n    x := 1.5 % 2.0\n    println(x)\n}\n",
        "operator % not defined for float",
    );
}

#[test]
fn string_concatenation_and_comparison() {
    assert_clean(
        "package main\nfunc f() {\n    s := \"a\" + \"b\"\n    println(s, s < \"c\")\n}\n",
    );
    assert_error(
        "package main\nfunc f() {\n    s := \"a\" - \"b\"\n    println(s)\n}\n",
        "not defined for strings",
    );
}

#[test]
fn struct_fields_and_methods() {
    assert_clean(
        "package main\n\
         type P struct { x int; y int; }\n\
         func (p P) sum() int {\n    return p.x + p.y\n}\n\
         func main() {\n    var p P\n    p.x = 1\n    p.y = 2\n    println(p.sum())\n}\n",
    );
}

#[test]
fn unknown_field_or_method() {
    assert_error(
        "package main\ntype P struct { x int; }\nfunc f() {\n    var p P\n    println(p.z)\n}\n",
        "has no field or method z",
    );
}

#[test]
fn method_expressions_are_rejected() {
    assert_error(
        "package main\ntype P struct { x int; }\nfunc (p P) m() int {\n    return p.x\n}\nfunc f() {\n    var p P\n    q := p.m\n    println(q)\n}\n",
        "method expressions not supported",
    );
}

#[test]
fn duplicate_method_names_are_rejected() {
    assert_error(
        "package main\ntype P struct { x int; }\nfunc (p P) m() int {\n    return 1\n}\nfunc (p P) m() int {\n    return 2\n}\n",
        "method m already declared for P",
    );
}

#[test]
fn ref_receiver_is_rejected() {
    assert_error(
        "package main\ntype P struct { x int; }\nfunc (p ref P) m() int {\n    return 1\n}\n",
        "method receiver cannot be ref type",
    );
}

#[test]
fn pointer_method_on_non_addressable_receiver() {
    assert_error(
        "package main\n\
         type P struct { x int; }\n\
         func (p *P) bump() {\n    p.x = p.x + 1\n}\n\
         func mk() P {\n    var p P\n    return p\n}\n\
         func f() {\n    mk().bump()\n}\n",
        "cannot call pointer method on non-addressable",
    );
    // An addressable receiver auto-addresses.
    assert_clean(
        "package main\n\
         type P struct { x int; }\n\
         func (p *P) bump() {\n    p.x = p.x + 1\n}\n\
         func f() {\n    var p P\n    p.bump()\n    println(p.x)\n}\n",
    );
}

#[test]
fn composite_literal_rules() {
    assert_clean(
        "package main\ntype P struct { x int; y int; }\nfunc f() {\n    p := P{x: 1, y: 2}\n    q := P{1, 2}\n    println(p.x, q.y)\n}\n",
    );
    assert_error(
        "package main\ntype P struct { x int; }\nfunc f() {\n    p := P{x: 1, x: 2}\n    println(p.x)\n}\n",
        "duplicate field name x",
    );
    assert_error(
        "package main\ntype P struct { x int; }\nfunc f() {\n    p := P{z: 1}\n    println(p.x)\n}\n",
        "unknown field z",
    );
    assert_error(
        "package main\ntype P struct { x int; }\nfunc f() {\n    p := P{1, 2}\n    println(p.x)\n}\n",
        "too many values in struct literal",
    );
}

#[test]
fn call_arity_and_argument_types() {
    assert_error(
        "package main\nfunc g(a int) int {\n    return a\n}\nfunc f() {\n    println(g(1, 2))\n}\n",
        "wrong number of arguments: got 2, want 1",
    );
    assert_error(
        "package main\nfunc g(a int) int {\n    return a\n}\nfunc f() {\n    println(g(\"s\"))\n}\n",
        "cannot use string as int in argument",
    );
    assert_error(
        "package main\nfunc f() {\n    x := 1\n    x()\n}\n",
        "cannot call non-function",
    );
}

#[test]
fn builtin_rules() {
    assert_clean("package main\nfunc f() {\n    println(1, 1.5, true, \"s\")\n}\n");
    assert_error(
        "package main\ntype P struct { x int; }\nfunc f() {\n    var p P\n    println(p)\n}\n",
        "cannot print value of type P",
    );
    assert_error(
        "package main\nfunc f() {\n    panic(1)\n}\n",
        "panic argument must be a string",
    );
    assert_clean("package main\nfunc f() {\n    panic(\"boom\")\n}\n");
}

#[test]
fn new_produces_ref() {
    assert_clean(
        "package main\ntype N struct { v int; }\nfunc main() {\n    n := new(N)\n    n.v = 7\n    println(n.v)\n}\n",
    );
    // ref fields auto-dereference, and refs accept nil.
    assert_clean(
        "package main\ntype N struct { v int; }\nfunc f() {\n    var n ref N = nil\n    n = new(N)\n    println(n.v)\n}\n",
    );
}

#[test]
fn index_rules() {
    assert_clean(
        "package main\nfunc f() {\n    var a [4]int\n    a[0] = 1\n    println(a[0])\n}\n",
    );
    assert_error(
        "package main\nfunc f() {\n    var a [4]int\n    println(a[1.5])\n}\n",
        "index must be an integer",
    );
    assert_error(
        "package main\nfunc f() {\n    x := 1\n    println(x[0])\n}\n",
        "cannot index into int",
    );
    assert_error(
        "package main\nfunc f() {\n    var a [0 - 1]int\n    println(a[0])\n}\n",
        "array length must be non-negative",
    );
}

#[test]
fn alias_chains_resolve_to_a_fixed_point() {
    let checked = check_src(
        "package main\ntype A = B\ntype B = int\nfunc f() {\n    var x A = 1\n    var y int = x\n    println(y)\n}\n",
    );
    assert!(checked.errors.is_empty(), "{:?}", checked.errors);
}

#[test]
fn mutually_recursive_types_through_ref() {
    assert_clean(
        "package main\n\
         type Node struct { value int; next ref Node; }\n\
         func f() {\n    n := new(Node)\n    n.value = 1\n    n.next = nil\n    println(n.value)\n}\n",
    );
}

#[test]
fn cyclic_type_definitions_are_rejected() {
    assert_error(
        "package main\ntype A B\ntype B A\n",
        "invalid recursive type",
    );
}

#[test]
fn named_types_are_nominal() {
    assert_error(
        "package main\n\
         type A struct { x int; }\n\
         type B struct { x int; }\n\
         func f() {\n    var a A\n    var b B\n    a = b\n}\n",
        "cannot use B as A",
    );
}

#[test]
fn imports_are_rejected() {
    assert_error(
        "package main\nimport \"fmt\"\nfunc f() {\n}\n",
        "import statements are not supported",
    );
}

#[test]
fn globals_check_assignability() {
    assert_clean("package main\nvar g int = 3\nfunc f() {\n    println(g)\n}\n");
    assert_error(
        "package main\nvar g int = \"s\"\n",
        "cannot use untyped string as int",
    );
    assert_error("package main\nvar g\n", "expected type");
}

/* Escape rules */

#[test]
fn returning_a_pointer_is_rejected() {
    assert_error(
        "package main\nfunc getPtr() *int {\n    var x int = 42\n    return &x\n}\n",
        "cannot return *T from function",
    );
    // The analogous ref program succeeds.
    assert_clean(
        "package main\nfunc get() ref int {\n    r := new(int)\n    return r\n}\n",
    );
}

#[test]
fn assigning_a_pointer_to_a_global_is_rejected() {
    assert_error(
        "package main\nvar g *int\nfunc f() {\n    var x int\n    g = &x\n}\n",
        "*T cannot escape to global variable g",
    );
}

#[test]
fn storing_a_pointer_into_a_ref_field_is_rejected() {
    assert_error(
        "package main\n\
         type Holder struct { p *int; }\n\
         func f() {\n    h := new(Holder)\n    var x int\n    h.p = &x\n}\n",
        "*T cannot escape to heap object field",
    );
    // The same store through a stack struct is allowed.
    assert_clean(
        "package main\n\
         type Holder struct { p *int; }\n\
         func f() {\n    var h Holder\n    var x int\n    h.p = &x\n    println(h.p)\n}\n",
    );
}

#[test]
fn storing_a_pointer_into_a_ref_array_is_rejected() {
    assert_error(
        "package main\nfunc f() {\n    a := new([2]*int)\n    var x int\n    a[0] = &x\n}\n",
        "*T cannot escape to heap object element",
    );
}

#[test]
fn passing_a_pointer_to_a_call_is_rejected() {
    assert_error(
        "package main\nfunc g(p *int) {\n}\nfunc f() {\n    var x int\n    g(&x)\n}\n",
        "*T cannot be passed to function",
    );
    // Builtins are exempt.
    assert_clean("package main\nfunc f() {\n    var x int\n    println(&x)\n}\n");
}

#[test]
fn ref_to_pointer_conversion_is_rejected() {
    assert_error(
        "package main\nfunc f() {\n    r := new(int)\n    var p *int = r\n    println(p)\n}\n",
        "would cause use-after-free",
    );
}

#[test]
fn local_pointer_use_is_allowed() {
    assert_clean(
        "package main\nfunc f() {\n    var x int = 1\n    p := &x\n    *p = 2\n    println(x)\n}\n",
    );
}

#[test]
fn info_defs_land_in_the_right_scopes() {
    let checked = check_src(
        "package main\nfunc f() {\n    x := 1\n    {\n        y := 2\n        println(x + y)\n    }\n}\n",
    );
    assert!(checked.errors.is_empty());

    // Every defining name's object has a parent scope recorded.
    for (_, &obj) in checked.info.defs.iter() {
        let o = checked.cx.obj(obj);
        if o.is_var() && !o.name.is_empty() {
            assert!(o.parent.is_some(), "variable {} has no parent scope", o.name);
        }
    }
}

#[test]
fn constant_overflow_is_reported() {
    assert_error(
        "package main\nfunc f() {\n    x := 9223372036854775807 + 1\n    println(x)\n}\n",
        "overflows int",
    );
}
