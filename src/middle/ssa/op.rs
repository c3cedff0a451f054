/// An SSA operation code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    /* Constants */
    Const64,     // integer constant; aux_int = value
    ConstF64,    // float constant; aux_float = value
    ConstBool,   // bool constant; aux_int = 0 or 1
    ConstString, // string constant; aux = decoded value
    ConstNil,    // nil constant

    /* Integer arithmetic (64-bit signed) */
    Add64,
    Sub64,
    Mul64,
    Div64,
    Mod64,
    Neg64,

    /* Float arithmetic */
    AddF64,
    SubF64,
    MulF64,
    DivF64,
    NegF64,

    /* Integer comparison */
    Eq64,
    Neq64,
    Lt64,
    Leq64,
    Gt64,
    Geq64,

    /* Float comparison (ordered) */
    EqF64,
    NeqF64,
    LtF64,
    LeqF64,
    GtF64,
    GeqF64,

    /* Pointer comparison (ptr or ref) */
    EqPtr,
    NeqPtr,

    /* Boolean */
    Not,
    AndBool,
    OrBool,

    /* Conversion */
    IntToFloat,
    FloatToInt,

    /* Memory */
    Alloca, // stack slot; type = *T; aux = variable name
    Load,   // args[0] = ptr
    Store,  // args[0] = ptr, args[1] = val; void
    Zero,   // zero-fill; args[0] = ptr; aux_int = size in bytes; void

    /* Address arithmetic */
    StructFieldPtr, // &s.field; args[0] = struct ptr; aux_int = field index
    ArrayIndexPtr,  // &a[i]; args[0] = array ptr, args[1] = index

    /* Calls */
    StaticCall, // direct call; aux = function object; args = arguments
    Call,       // indirect call; args[0] = fn ptr, args[1..] = arguments

    /* Heap allocation */
    NewAlloc, // new(T) → ref T; aux = element type

    /* SSA plumbing */
    Phi,  // args[i] corresponds to preds[i]
    Copy, // identity
    Arg,  // function argument; aux_int = param index (-1 = receiver); aux = name

    /* Builtins */
    Println, // variadic; void
    Panic,   // args[0] = string; void

    NilCheck, // panics if args[0] is null; void

    /* String projections */
    StringLen,
    StringPtr,
}

impl Op {
    pub fn name(self) -> &'static str {
        use Op::*;
        match self {
            Const64 => "Const64",
            ConstF64 => "ConstF64",
            ConstBool => "ConstBool",
            ConstString => "ConstString",
            ConstNil => "ConstNil",
            Add64 => "Add64",
            Sub64 => "Sub64",
            Mul64 => "Mul64",
            Div64 => "Div64",
            Mod64 => "Mod64",
            Neg64 => "Neg64",
            AddF64 => "AddF64",
            SubF64 => "SubF64",
            MulF64 => "MulF64",
            DivF64 => "DivF64",
            NegF64 => "NegF64",
            Eq64 => "Eq64",
            Neq64 => "Neq64",
            Lt64 => "Lt64",
            Leq64 => "Leq64",
            Gt64 => "Gt64",
            Geq64 => "Geq64",
            EqF64 => "EqF64",
            NeqF64 => "NeqF64",
            LtF64 => "LtF64",
            LeqF64 => "LeqF64",
            GtF64 => "GtF64",
            GeqF64 => "GeqF64",
            EqPtr => "EqPtr",
            NeqPtr => "NeqPtr",
            Not => "Not",
            AndBool => "AndBool",
            OrBool => "OrBool",
            IntToFloat => "IntToFloat",
            FloatToInt => "FloatToInt",
            Alloca => "Alloca",
            Load => "Load",
            Store => "Store",
            Zero => "Zero",
            StructFieldPtr => "StructFieldPtr",
            ArrayIndexPtr => "ArrayIndexPtr",
            StaticCall => "StaticCall",
            Call => "Call",
            NewAlloc => "NewAlloc",
            Phi => "Phi",
            Copy => "Copy",
            Arg => "Arg",
            Println => "Println",
            Panic => "Panic",
            NilCheck => "NilCheck",
            StringLen => "StringLen",
            StringPtr => "StringPtr",
        }
    }

    /// Whether the op has no side effects (safe to CSE or DCE).
    pub fn is_pure(self) -> bool {
        use Op::*;
        match self {
            Const64 | ConstF64 | ConstBool | ConstString | ConstNil => true,
            Add64 | Sub64 | Mul64 | Div64 | Mod64 | Neg64 => true,
            AddF64 | SubF64 | MulF64 | DivF64 | NegF64 => true,
            Eq64 | Neq64 | Lt64 | Leq64 | Gt64 | Geq64 => true,
            EqF64 | NeqF64 | LtF64 | LeqF64 | GtF64 | GeqF64 => true,
            EqPtr | NeqPtr => true,
            Not | AndBool | OrBool => true,
            IntToFloat | FloatToInt => true,
            // Pointer arithmetic only.
            StructFieldPtr | ArrayIndexPtr => true,
            Phi | Copy | Arg => true,
            StringLen | StringPtr => true,
            // Memory, calls, heap allocation, builtins, and the nil check
            // all have side effects.
            Alloca | Load | Store | Zero | StaticCall | Call | NewAlloc | Println | Panic
            | NilCheck => false,
        }
    }

    /// Whether the op produces no value.
    pub fn is_void(self) -> bool {
        matches!(
            self,
            Op::Store | Op::Zero | Op::Println | Op::Panic | Op::NilCheck
        )
    }
}

impl core::fmt::Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
