use std::{path::PathBuf, process::ExitCode, time::Instant};

use clap::Parser as ClapParser;

use yoruc::{
    diag::new_handler,
    frontend::{
        ast::print::{fprint, fprint_json},
        parser::Parser,
        scanner::Scanner,
        token::TokenKind,
    },
    middle::{
        check::{check, Info},
        optimization::{default_passes, run_passes, PassConfig},
        scope::ObjKind,
        ssa::{build::build_file, print::sprint},
        ty::TypeKind,
        TypeCx,
    },
};

#[derive(Debug, ClapParser)]
#[command(name = "yoruc", version, about = "Compiler for the Yoru language", long_about = None)]
struct Args {
    source_file: PathBuf,

    /// Output the token stream and stop.
    #[arg(long)]
    emit_tokens: bool,
    /// Output the AST and stop.
    #[arg(long)]
    emit_ast: bool,
    /// AST output format.
    #[arg(long, value_enum, default_value_t = AstFormat::Text)]
    ast_format: AstFormat,
    /// Output the typed AST (scope tree) and stop.
    #[arg(long)]
    emit_typed_ast: bool,
    /// Output struct layouts and stop.
    #[arg(long)]
    emit_layout: bool,
    /// Output SSA after optimization and stop.
    #[arg(long)]
    emit_ssa: bool,

    /// Disable automatic semicolon insertion.
    #[arg(long)]
    no_asi: bool,

    /// Only dump the named function.
    #[arg(long)]
    dump_func: Option<String>,
    /// Dump SSA before a pass (pass name or "*").
    #[arg(long)]
    dump_before: Option<String>,
    /// Dump SSA after a pass (pass name or "*").
    #[arg(long)]
    dump_after: Option<String>,
    /// Verify SSA before and after each pass.
    #[arg(long)]
    ssa_verify: bool,

    /// Print per-phase timings to stderr.
    #[arg(long)]
    trace: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum AstFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let filename = args.source_file.display().to_string();
    let source = match std::fs::read(&args.source_file) {
        Ok(bytes) => bytes,
        Err(err) => {
            eprintln!("error: cannot read {filename}: {err}");
            return ExitCode::FAILURE;
        }
    };

    let handler = new_handler();

    if args.emit_tokens {
        return emit_tokens(&filename, source, args.no_asi, &handler);
    }

    /* Parse */

    let parse_start = Instant::now();
    let mut parser = Parser::new(&filename, source, handler.clone());
    if args.no_asi {
        parser.set_asi_enabled(false);
    }
    let file = parser.parse();
    trace(args.trace, "parse", parse_start);

    if args.emit_ast {
        match args.ast_format {
            AstFormat::Text => print!("{}", fprint(&file)),
            AstFormat::Json => match fprint_json(&file) {
                Ok(json) => println!("{json}"),
                Err(err) => {
                    eprintln!("error: {err}");
                    return ExitCode::FAILURE;
                }
            },
        }
        return finish(&handler);
    }

    if !handler.borrow().is_empty() {
        return finish(&handler);
    }

    /* Type check */

    let check_start = Instant::now();
    let mut cx = TypeCx::new();
    let mut info = Info::default();
    let (pkg, _errors) = check(&file, &mut cx, handler.clone(), &mut info);
    trace(args.trace, "check", check_start);

    if args.emit_typed_ast {
        print!("{}", cx.scope_string(pkg.scope));
        return finish(&handler);
    }

    if args.emit_layout {
        emit_layout(&mut cx, &pkg);
        return finish(&handler);
    }

    if !handler.borrow().is_empty() {
        return finish(&handler);
    }

    /* Build SSA and run passes */

    let build_start = Instant::now();
    let mut funcs = build_file(&file, &info, &mut cx);
    trace(args.trace, "ssa", build_start);

    let cfg = PassConfig {
        dump_before: args.dump_before.clone(),
        dump_after: args.dump_after.clone(),
        verify: args.ssa_verify,
        dump_func: args.dump_func.clone(),
    };
    let passes = default_passes();

    let opt_start = Instant::now();
    for f in &mut funcs {
        if let Err(err) = run_passes(f, &passes, &cfg, &cx) {
            eprintln!("internal error: {err}");
            return ExitCode::FAILURE;
        }
    }
    trace(args.trace, "opt", opt_start);

    if args.emit_ssa {
        for f in &funcs {
            if let Some(want) = &args.dump_func {
                if f.name.as_str() != want {
                    continue;
                }
            }
            print!("{}", sprint(f, &cx));
            println!();
        }
        return finish(&handler);
    }

    // The LLVM emitter consumes the SSA from here; this build stops at the
    // verified, optimized form.
    finish(&handler)
}

fn emit_tokens(
    filename: &str,
    source: Vec<u8>,
    no_asi: bool,
    handler: &yoruc::diag::Handler,
) -> ExitCode {
    let mut scanner = Scanner::new(filename, source, handler.clone());
    if no_asi {
        scanner.set_asi_enabled(false);
    }

    println!("{:<20} {:<12} LITERAL", "POSITION", "TOKEN");
    loop {
        scanner.next();
        let tok = scanner.token();
        println!(
            "{:<20} {:<12} {}",
            scanner.pos().to_string(),
            tok.to_string(),
            escape_literal(scanner.literal()),
        );
        if tok == TokenKind::Eof {
            break;
        }
    }

    finish(handler)
}

fn escape_literal(lit: &str) -> String {
    lit.chars()
        .flat_map(|c| c.escape_default())
        .collect()
}

fn emit_layout(cx: &mut TypeCx, pkg: &yoruc::middle::Package) {
    for name in cx.scope_names(pkg.scope) {
        let Some(obj) = cx.lookup(pkg.scope, name) else {
            continue;
        };
        if !matches!(cx.obj(obj).kind, ObjKind::TypeName) {
            continue;
        }
        let Some(ty) = cx.obj(obj).ty else {
            continue;
        };

        let under = cx.types.underlying(ty);
        let TypeKind::Struct { fields } = cx.types.kind(under).clone() else {
            continue;
        };

        let layout = cx.types.struct_layout(under).clone();
        println!("{name}: size={} align={}", layout.size, layout.align);
        for (i, f) in fields.iter().enumerate() {
            println!(
                "  {} {} @ {}",
                f.name,
                cx.types.display(f.ty),
                layout.offsets[i]
            );
        }
    }
}

fn trace(enabled: bool, phase: &str, start: Instant) {
    if enabled {
        eprintln!("{phase}: {:.3?}", start.elapsed());
    }
}

/// Prints accumulated diagnostics; nonzero exit on any.
fn finish(handler: &yoruc::diag::Handler) -> ExitCode {
    let diags = handler.borrow();
    if diags.is_empty() {
        ExitCode::SUCCESS
    } else {
        diags.print();
        ExitCode::FAILURE
    }
}
