//! SSA pass plumbing: a fixed pass list per function, with optional dumps
//! before/after each pass and verification hooks.

pub mod mem2reg;

use crate::middle::{
    ssa::{print, verify, Func},
    TypeCx,
};

pub struct Pass {
    pub name: &'static str,
    pub run: fn(&mut Func, &TypeCx),
}

#[derive(Debug, Default, Clone)]
pub struct PassConfig {
    /// Dump SSA before this pass ("*" for all).
    pub dump_before: Option<String>,
    /// Dump SSA after this pass ("*" for all).
    pub dump_after: Option<String>,
    /// Verify SSA before and after each pass.
    pub verify: bool,
    /// Restrict dumps to this function name.
    pub dump_func: Option<String>,
}

/// The standard pass list.
pub fn default_passes() -> Vec<Pass> {
    vec![Pass {
        name: "mem2reg",
        run: mem2reg::mem2reg,
    }]
}

/// Runs the given passes over a function in order.
pub fn run_passes(
    f: &mut Func,
    passes: &[Pass],
    cfg: &PassConfig,
    cx: &TypeCx,
) -> Result<(), verify::VerifyError> {
    for pass in passes {
        if should_dump(&cfg.dump_before, pass.name) && matches_func(&cfg.dump_func, f) {
            eprintln!("--- before {} ({}) ---", pass.name, f.name);
            eprint!("{}", print::sprint(f, cx));
            eprintln!();
        }

        if cfg.verify {
            verify::verify(f)?;
        }

        (pass.run)(f, cx);

        if cfg.verify {
            verify::verify(f)?;
        }

        if should_dump(&cfg.dump_after, pass.name) && matches_func(&cfg.dump_func, f) {
            eprintln!("--- after {} ({}) ---", pass.name, f.name);
            eprint!("{}", print::sprint(f, cx));
            eprintln!();
        }
    }
    Ok(())
}

fn should_dump(pattern: &Option<String>, name: &str) -> bool {
    match pattern {
        Some(p) => p == "*" || p == name,
        None => false,
    }
}

fn matches_func(filter: &Option<String>, f: &Func) -> bool {
    match filter {
        Some(want) => f.name.as_str() == want,
        None => true,
    }
}
