//! Front- and middle-end of the Yoru compiler.
//!
//! The pipeline is: scan + parse ([`frontend`]) into an AST, type-check
//! ([`middle::check`]) against the scope tree and type arenas held by a
//! [`middle::TypeCx`], lower to SSA ([`middle::ssa`]), then promote stack
//! slots to SSA values ([`middle::optimization`]). LLVM IR emission and the
//! C runtime live outside this crate; the SSA printer and verifiers define
//! the contract they consume.

pub mod diag;
pub mod frontend;
pub mod index;
pub mod middle;

#[cfg(test)]
pub(crate) mod testutil;
