// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Lightweight semantic checker.
//!
//! The checker resolves names and types the predeclared scalar types
//! (`int`, `float64`, `bool`, ...) together with untyped constants and
//! function signatures. Everything it cannot model precisely (pointers,
//! slices, maps, struct fields, user-defined types) gets the `Unknown` type,
//! which is compatible with every other type. An error is therefore only
//! reported when it is certain, and the first one found stops checking.

use std::collections::{HashMap, HashSet};
use std::fmt::{self, Display, Formatter};
use std::rc::Rc;

use itertools::Itertools;
use log::{debug, trace};

use crate::ast::*;
use crate::error::TypeError;
use crate::token::{LitKind, Span};

type CResult<T> = Result<T, TypeError>;

/// Checks a parsed file, returning the first semantic error.
pub fn check(file: &File, source: &str) -> CResult<()> {
    Checker::new(source).check_file(file)
}

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasicKind {
    Bool,
    String,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Uintptr,
    Float32,
    Float64,
    Complex64,
    Complex128,
}

impl BasicKind {
    pub fn name(self) -> &'static str {
        match self {
            BasicKind::Bool => "bool",
            BasicKind::String => "string",
            BasicKind::Int => "int",
            BasicKind::Int8 => "int8",
            BasicKind::Int16 => "int16",
            BasicKind::Int32 => "int32",
            BasicKind::Int64 => "int64",
            BasicKind::Uint => "uint",
            BasicKind::Uint8 => "uint8",
            BasicKind::Uint16 => "uint16",
            BasicKind::Uint32 => "uint32",
            BasicKind::Uint64 => "uint64",
            BasicKind::Uintptr => "uintptr",
            BasicKind::Float32 => "float32",
            BasicKind::Float64 => "float64",
            BasicKind::Complex64 => "complex64",
            BasicKind::Complex128 => "complex128",
        }
    }

    fn is_integer(self) -> bool {
        matches!(
            self,
            BasicKind::Int
                | BasicKind::Int8
                | BasicKind::Int16
                | BasicKind::Int32
                | BasicKind::Int64
                | BasicKind::Uint
                | BasicKind::Uint8
                | BasicKind::Uint16
                | BasicKind::Uint32
                | BasicKind::Uint64
                | BasicKind::Uintptr
        )
    }

    fn is_unsigned(self) -> bool {
        matches!(
            self,
            BasicKind::Uint | BasicKind::Uint8 | BasicKind::Uint16 | BasicKind::Uint32 | BasicKind::Uint64 | BasicKind::Uintptr
        )
    }

    /// Inclusive bounds of an integer kind.
    fn int_range(self) -> (i128, i128) {
        match self {
            BasicKind::Int8 => (i8::MIN.into(), i8::MAX.into()),
            BasicKind::Int16 => (i16::MIN.into(), i16::MAX.into()),
            BasicKind::Int32 => (i32::MIN.into(), i32::MAX.into()),
            BasicKind::Int | BasicKind::Int64 => (i64::MIN.into(), i64::MAX.into()),
            BasicKind::Uint8 => (0, u8::MAX.into()),
            BasicKind::Uint16 => (0, u16::MAX.into()),
            BasicKind::Uint32 => (0, u32::MAX.into()),
            BasicKind::Uint | BasicKind::Uint64 | BasicKind::Uintptr => (0, u64::MAX.into()),
            _ => (i128::MIN, i128::MAX),
        }
    }

    fn is_float(self) -> bool {
        matches!(self, BasicKind::Float32 | BasicKind::Float64)
    }

    fn is_complex(self) -> bool {
        matches!(self, BasicKind::Complex64 | BasicKind::Complex128)
    }

    fn is_numeric(self) -> bool {
        self.is_integer() || self.is_float() || self.is_complex()
    }
}

/// Kinds of untyped constants, ordered so that mixing two numeric kinds
/// yields the larger one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum UntypedKind {
    Bool,
    String,
    Nil,
    Int,
    Rune,
    Float,
}

impl UntypedKind {
    fn is_numeric(self) -> bool {
        matches!(self, UntypedKind::Int | UntypedKind::Rune | UntypedKind::Float)
    }

    /// Whether a constant of this kind can take on the given basic type.
    fn fits(self, kind: BasicKind) -> bool {
        match self {
            UntypedKind::Bool => kind == BasicKind::Bool,
            UntypedKind::String => kind == BasicKind::String,
            UntypedKind::Nil => false,
            UntypedKind::Int | UntypedKind::Rune | UntypedKind::Float => kind.is_numeric(),
        }
    }

    fn default_kind(self) -> Option<BasicKind> {
        match self {
            UntypedKind::Bool => Some(BasicKind::Bool),
            UntypedKind::String => Some(BasicKind::String),
            UntypedKind::Int => Some(BasicKind::Int),
            UntypedKind::Rune => Some(BasicKind::Int32),
            UntypedKind::Float => Some(BasicKind::Float64),
            UntypedKind::Nil => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub params: Vec<Type>,
    pub results: Vec<Type>,
    /// The last entry of `params` is the element type of a `...T` parameter.
    pub variadic: bool,
}

impl Signature {
    fn matches(&self, other: &Signature) -> bool {
        fn same(a: &[Type], b: &[Type]) -> bool {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.identical(y))
        }
        self.variadic == other.variadic
            && same(&self.params, &other.params)
            && same(&self.results, &other.results)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Basic(BasicKind),
    Untyped(UntypedKind),
    Func(Rc<Signature>),
    /// Result list of a call; empty for calls without results.
    Tuple(Vec<Type>),
    Unknown,
}

impl Type {
    fn identical(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Unknown, _) | (_, Type::Unknown) => true,
            (Type::Func(a), Type::Func(b)) => a.matches(b),
            (a, b) => a == b,
        }
    }

    fn is_untyped(&self) -> bool {
        matches!(self, Type::Untyped(_))
    }

    fn is_boolean(&self) -> bool {
        matches!(
            self,
            Type::Basic(BasicKind::Bool) | Type::Untyped(UntypedKind::Bool) | Type::Unknown
        )
    }

    fn is_numeric(&self) -> bool {
        match self {
            Type::Basic(kind) => kind.is_numeric(),
            Type::Untyped(kind) => kind.is_numeric(),
            Type::Unknown => true,
            _ => false,
        }
    }

    fn is_integer(&self) -> bool {
        match self {
            Type::Basic(kind) => kind.is_integer(),
            Type::Untyped(kind) => matches!(kind, UntypedKind::Int | UntypedKind::Rune),
            Type::Unknown => true,
            _ => false,
        }
    }

    fn is_string(&self) -> bool {
        matches!(
            self,
            Type::Basic(BasicKind::String) | Type::Untyped(UntypedKind::String) | Type::Unknown
        )
    }

    fn is_ordered(&self) -> bool {
        match self {
            Type::Basic(kind) => (kind.is_numeric() && !kind.is_complex()) || *kind == BasicKind::String,
            Type::Untyped(kind) => kind.is_numeric() || *kind == UntypedKind::String,
            Type::Unknown => true,
            _ => false,
        }
    }

    /// Scalar types that are certainly not containers, channels or interfaces.
    fn is_scalar(&self) -> bool {
        matches!(self, Type::Basic(_) | Type::Untyped(_))
    }

    /// Type a variable takes when initialized with a value of this type.
    fn default_type(&self) -> Type {
        match self {
            Type::Untyped(kind) => match kind.default_kind() {
                Some(kind) => Type::Basic(kind),
                None => self.clone(),
            },
            _ => self.clone(),
        }
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Type::Basic(kind) => write!(f, "{}", kind.name()),
            Type::Untyped(kind) => {
                let name = match kind {
                    UntypedKind::Bool => "bool",
                    UntypedKind::String => "string",
                    UntypedKind::Nil => "nil",
                    UntypedKind::Int => "int",
                    UntypedKind::Rune => "rune",
                    UntypedKind::Float => "float",
                };
                write!(f, "untyped {}", name)
            }
            Type::Func(sig) => {
                let params = sig
                    .params
                    .iter()
                    .enumerate()
                    .map(|(i, ty)| match sig.variadic && i + 1 == sig.params.len() {
                        true => format!("...{}", ty),
                        false => ty.to_string(),
                    })
                    .join(", ");
                write!(f, "func({})", params)?;
                match sig.results.as_slice() {
                    [] => Ok(()),
                    [single] => write!(f, " {}", single),
                    results => write!(f, " ({})", results.iter().join(", ")),
                }
            }
            Type::Tuple(types) => write!(f, "({})", types.iter().join(", ")),
            Type::Unknown => write!(f, "invalid type"),
        }
    }
}

// ============================================================================
// Constant values
// ============================================================================

/// Value of a constant expression, when the checker can compute it.
#[derive(Debug, Clone, Copy, PartialEq)]
enum ConstValue {
    Bool(bool),
    Int(i128),
    /// Non-integral values, and integers too large for `i128`.
    Float(f64),
}

/// Why a constant cannot take on a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unrepresentable {
    Truncated,
    Overflows,
}

impl Unrepresentable {
    fn as_str(self) -> &'static str {
        match self {
            Unrepresentable::Truncated => "truncated",
            Unrepresentable::Overflows => "overflows",
        }
    }

    /// Verb joining an operand and its target type.
    fn verb(self) -> &'static str {
        match self {
            Unrepresentable::Truncated => "truncated to",
            Unrepresentable::Overflows => "overflows",
        }
    }
}

impl ConstValue {
    fn of_literal(lit: &BasicLit) -> Option<ConstValue> {
        let text = lit.value.replace('_', "");
        match lit.kind {
            LitKind::Int => Self::of_int_literal(&text),
            LitKind::Float => text.parse().ok().map(ConstValue::Float),
            LitKind::Char => {
                let inner = text.strip_prefix('\'')?.strip_suffix('\'')?;
                let mut chars = inner.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if c != '\\' => Some(ConstValue::Int(i128::from(u32::from(c)))),
                    _ => None,
                }
            }
            LitKind::String | LitKind::Imag => None,
        }
    }

    fn of_int_literal(text: &str) -> Option<ConstValue> {
        let (radix, digits) = match text.as_bytes() {
            [b'0', b'x' | b'X', ..] => (16, &text[2..]),
            [b'0', b'o' | b'O', ..] => (8, &text[2..]),
            [b'0', b'b' | b'B', ..] => (2, &text[2..]),
            [b'0', _, ..] => (8, &text[1..]),
            _ => (10, text),
        };
        if let Ok(value) = i128::from_str_radix(digits, radix) {
            return Some(ConstValue::Int(value));
        }
        let mut value = 0f64;
        for c in digits.chars() {
            value = value * f64::from(radix) + f64::from(c.to_digit(radix)?);
        }
        Some(ConstValue::Float(value))
    }

    fn to_f64(self) -> Option<f64> {
        match self {
            ConstValue::Bool(_) => None,
            ConstValue::Int(value) => Some(value as f64),
            ConstValue::Float(value) => Some(value),
        }
    }

    fn is_zero(self) -> bool {
        match self {
            ConstValue::Bool(_) => false,
            ConstValue::Int(value) => value == 0,
            ConstValue::Float(value) => value == 0.0,
        }
    }

    /// The value as held by a variable of `kind`.
    fn represent(self, kind: BasicKind) -> Result<ConstValue, Unrepresentable> {
        if kind.is_integer() {
            let value = match self {
                ConstValue::Bool(_) => return Ok(self),
                ConstValue::Int(value) => value,
                ConstValue::Float(value) if !value.is_finite() || value.abs() >= 1.7e38 => {
                    return Err(Unrepresentable::Overflows)
                }
                ConstValue::Float(value) if value.fract() != 0.0 => return Err(Unrepresentable::Truncated),
                ConstValue::Float(value) => value as i128,
            };
            let (min, max) = kind.int_range();
            return match (min..=max).contains(&value) {
                true => Ok(ConstValue::Int(value)),
                false => Err(Unrepresentable::Overflows),
            };
        }
        if kind.is_float() {
            let Some(value) = self.to_f64() else {
                return Ok(self);
            };
            let value = match kind {
                BasicKind::Float32 => f64::from(value as f32),
                _ => value,
            };
            return match value.is_finite() {
                true => Ok(ConstValue::Float(value)),
                false => Err(Unrepresentable::Overflows),
            };
        }
        Ok(self)
    }
}

impl Display for ConstValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match *self {
            ConstValue::Bool(value) => write!(f, "{}", value),
            ConstValue::Int(value) => write!(f, "{}", value),
            ConstValue::Float(value) if value == 0.0 || (1e-4..1e21).contains(&value.abs()) => {
                write!(f, "{}", value)
            }
            ConstValue::Float(value) => {
                let text = format!("{:e}", value);
                match text.split_once('e') {
                    Some((mantissa, exp)) if !exp.starts_with('-') => write!(f, "{}e+{}", mantissa, exp),
                    _ => write!(f, "{}", text),
                }
            }
        }
    }
}

fn fold_unary(op: UnaryOp, x: ConstValue, ty: &Type) -> Option<ConstValue> {
    match (op, x) {
        (UnaryOp::Plus, _) => Some(x),
        (UnaryOp::Neg, ConstValue::Int(v)) => {
            Some(v.checked_neg().map_or(ConstValue::Float(-(v as f64)), ConstValue::Int))
        }
        (UnaryOp::Neg, ConstValue::Float(v)) => Some(ConstValue::Float(-v)),
        (UnaryOp::Not, ConstValue::Bool(b)) => Some(ConstValue::Bool(!b)),
        (UnaryOp::BitNot, ConstValue::Int(v)) => match ty {
            Type::Basic(kind) if kind.is_unsigned() => Some(ConstValue::Int(kind.int_range().1 ^ v)),
            _ => Some(ConstValue::Int(!v)),
        },
        _ => None,
    }
}

fn compare<T: PartialOrd>(op: BinaryOp, a: T, b: T) -> Option<bool> {
    Some(match op {
        BinaryOp::Eql => a == b,
        BinaryOp::Neq => a != b,
        BinaryOp::Lss => a < b,
        BinaryOp::Leq => a <= b,
        BinaryOp::Gtr => a > b,
        BinaryOp::Geq => a >= b,
        _ => return None,
    })
}

/// Folds a binary operation on two constants. Integer operands divide
/// exactly when `integer` is set; results that leave `i128` continue as
/// floats.
fn fold_binary(op: BinaryOp, x: ConstValue, y: ConstValue, integer: bool) -> Option<ConstValue> {
    use ConstValue::{Bool, Float, Int};
    if let (Bool(a), Bool(b)) = (x, y) {
        return match op {
            BinaryOp::LAnd => Some(Bool(a && b)),
            BinaryOp::LOr => Some(Bool(a || b)),
            _ => compare(op, a, b).map(Bool),
        };
    }
    if let (Int(a), Int(b)) = (x, y) {
        if op.is_comparison() {
            return compare(op, a, b).map(Bool);
        }
        let exact = match op {
            BinaryOp::Add => a.checked_add(b),
            BinaryOp::Sub => a.checked_sub(b),
            BinaryOp::Mul => a.checked_mul(b),
            BinaryOp::Quo if integer => a.checked_div(b),
            BinaryOp::Rem => return a.checked_rem(b).map(Int),
            BinaryOp::And => Some(a & b),
            BinaryOp::Or => Some(a | b),
            BinaryOp::Xor => Some(a ^ b),
            BinaryOp::AndNot => Some(a & !b),
            BinaryOp::Shl => match u32::try_from(b) {
                Ok(shift) if shift < 127 && (a << shift) >> shift == a => Some(a << shift),
                _ => None,
            },
            BinaryOp::Shr => match u32::try_from(b) {
                Ok(shift) if shift < 127 => Some(a >> shift),
                _ => Some(if a < 0 { -1 } else { 0 }),
            },
            _ => None,
        };
        if let Some(value) = exact {
            return Some(Int(value));
        }
    }
    let (a, b) = (x.to_f64()?, y.to_f64()?);
    if op.is_comparison() {
        return compare(op, a, b).map(Bool);
    }
    Some(Float(match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Quo => a / b,
        BinaryOp::Shl => a * 2f64.powf(b),
        _ => return None,
    }))
}

// ============================================================================
// Operands and objects
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Builtin {
    Append,
    Cap,
    Clear,
    Close,
    Complex,
    Copy,
    Delete,
    Imag,
    Len,
    Make,
    Max,
    Min,
    New,
    Panic,
    Print,
    Println,
    Real,
}

impl Builtin {
    const ALL: [(&'static str, Builtin); 17] = [
        ("append", Builtin::Append),
        ("cap", Builtin::Cap),
        ("clear", Builtin::Clear),
        ("close", Builtin::Close),
        ("complex", Builtin::Complex),
        ("copy", Builtin::Copy),
        ("delete", Builtin::Delete),
        ("imag", Builtin::Imag),
        ("len", Builtin::Len),
        ("make", Builtin::Make),
        ("max", Builtin::Max),
        ("min", Builtin::Min),
        ("new", Builtin::New),
        ("panic", Builtin::Panic),
        ("print", Builtin::Print),
        ("println", Builtin::Println),
        ("real", Builtin::Real),
    ];

    fn name(self) -> &'static str {
        Self::ALL
            .iter()
            .find(|(_, builtin)| *builtin == self)
            .map(|(name, _)| *name)
            .unwrap_or("builtin")
    }

    /// Minimum and maximum argument counts.
    fn arity(self) -> (usize, Option<usize>) {
        match self {
            Builtin::Print | Builtin::Println => (0, None),
            Builtin::Append | Builtin::Max | Builtin::Min => (1, None),
            Builtin::Make => (1, Some(3)),
            Builtin::Complex | Builtin::Copy | Builtin::Delete => (2, Some(2)),
            Builtin::Cap
            | Builtin::Clear
            | Builtin::Close
            | Builtin::Imag
            | Builtin::Len
            | Builtin::New
            | Builtin::Panic
            | Builtin::Real => (1, Some(1)),
        }
    }

    /// Builtins whose call may stand alone as a statement.
    fn is_statement(self) -> bool {
        matches!(
            self,
            Builtin::Clear
                | Builtin::Close
                | Builtin::Copy
                | Builtin::Delete
                | Builtin::Panic
                | Builtin::Print
                | Builtin::Println
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    NoValue,
    Builtin(Builtin),
    TypeExpr,
    Constant,
    Variable,
    Value,
}

#[derive(Debug, Clone)]
struct Operand {
    mode: Mode,
    ty: Type,
    /// Known value of a constant operand.
    val: Option<ConstValue>,
}

impl Operand {
    fn new(mode: Mode, ty: Type) -> Self {
        Self { mode, ty, val: None }
    }

    fn constant(ty: Type, val: Option<ConstValue>) -> Self {
        Self {
            mode: Mode::Constant,
            ty,
            val,
        }
    }

    fn value(ty: Type) -> Self {
        Self::new(Mode::Value, ty)
    }

    fn unknown() -> Self {
        Self::value(Type::Unknown)
    }

    fn is_constant(&self) -> bool {
        self.mode == Mode::Constant
    }

    fn is_nil(&self) -> bool {
        self.ty == Type::Untyped(UntypedKind::Nil)
    }
}

/// Renders an operand the way Go diagnostics do: `x (variable of type int)`.
/// Constants whose value reads differently from their expression show it too.
fn describe(expr: &dyn Display, operand: &Operand) -> String {
    let ty = &operand.ty;
    let value = match operand.val {
        Some(ConstValue::Float(v)) if !v.is_finite() => String::new(),
        Some(val) if val.to_string() != expr.to_string() => format!(" {}", val),
        _ => String::new(),
    };
    match operand.mode {
        _ if operand.is_nil() => "nil".to_string(),
        Mode::NoValue => format!("{} (no value)", expr),
        Mode::Builtin(builtin) => format!("{} (built-in function {})", expr, builtin.name()),
        Mode::TypeExpr => format!("{} (type)", expr),
        Mode::Constant if ty.is_untyped() => format!("{} ({} constant{})", expr, ty, value),
        Mode::Constant if *ty == Type::Unknown => format!("{} (constant)", expr),
        Mode::Constant => format!("{} (constant{} of type {})", expr, value, ty),
        Mode::Variable if *ty == Type::Unknown => format!("{} (variable)", expr),
        Mode::Variable => format!("{} (variable of type {})", expr, ty),
        Mode::Value if *ty == Type::Unknown => format!("{} (value)", expr),
        Mode::Value => format!("{} (value of type {})", expr, ty),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ObjKind {
    Var,
    Const,
    TypeName,
    Func,
    Builtin(Builtin),
    Nil,
    Iota,
}

#[derive(Debug)]
struct Object {
    name: String,
    kind: ObjKind,
    ty: Type,
    /// Value of a constant, once its declaration has been checked.
    val: Option<ConstValue>,
    span: Span,
    used: bool,
}

type ObjId = usize;

/// What a call expression turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallKind {
    Conversion,
    Builtin(Builtin),
    Func,
}

#[derive(Debug, Default)]
struct Label {
    span: Span,
    used: bool,
}

/// Per-function state; function literals push their own.
#[derive(Debug, Default)]
struct FuncCtx {
    results: Vec<Type>,
    named_results: bool,
    loops: u32,
    breakables: u32,
    labels: HashMap<String, Label>,
}

// ============================================================================
// Checker
// ============================================================================

pub struct Checker<'s> {
    source: &'s str,
    objects: Vec<Object>,
    scopes: Vec<HashMap<String, ObjId>>,
    funcs: Vec<FuncCtx>,
    /// Local variables of the function bodies being checked, for usage checks.
    locals: Vec<ObjId>,
    in_const_decl: bool,
    /// Value of `iota` in the constant spec being checked.
    iota: i128,
    /// Package-level variables or function whose initializer or body is
    /// being checked.
    init_owners: Vec<ObjId>,
    /// Package-level variables and functions each one refers to.
    init_deps: HashMap<ObjId, Vec<ObjId>>,
    package: String,
}

impl<'s> Checker<'s> {
    pub fn new(source: &'s str) -> Self {
        let mut checker = Self {
            source,
            objects: Vec::new(),
            scopes: vec![HashMap::new()],
            funcs: Vec::new(),
            locals: Vec::new(),
            in_const_decl: false,
            iota: 0,
            init_owners: Vec::new(),
            init_deps: HashMap::new(),
            package: String::new(),
        };
        checker.populate_universe();
        checker
    }

    fn populate_universe(&mut self) {
        use BasicKind::*;
        let types = [
            ("bool", Type::Basic(Bool)),
            ("string", Type::Basic(String)),
            ("int", Type::Basic(Int)),
            ("int8", Type::Basic(Int8)),
            ("int16", Type::Basic(Int16)),
            ("int32", Type::Basic(Int32)),
            ("rune", Type::Basic(Int32)),
            ("int64", Type::Basic(Int64)),
            ("uint", Type::Basic(Uint)),
            ("uint8", Type::Basic(Uint8)),
            ("byte", Type::Basic(Uint8)),
            ("uint16", Type::Basic(Uint16)),
            ("uint32", Type::Basic(Uint32)),
            ("uint64", Type::Basic(Uint64)),
            ("uintptr", Type::Basic(Uintptr)),
            ("float32", Type::Basic(Float32)),
            ("float64", Type::Basic(Float64)),
            ("complex64", Type::Basic(Complex64)),
            ("complex128", Type::Basic(Complex128)),
            ("error", Type::Unknown),
            ("any", Type::Unknown),
            ("comparable", Type::Unknown),
        ];
        for (name, ty) in types {
            self.insert_universe(name, ObjKind::TypeName, ty);
        }
        for (name, value) in [("true", true), ("false", false)] {
            let id = self.insert_universe(name, ObjKind::Const, Type::Untyped(UntypedKind::Bool));
            self.objects[id].val = Some(ConstValue::Bool(value));
        }
        self.insert_universe("nil", ObjKind::Nil, Type::Untyped(UntypedKind::Nil));
        self.insert_universe("iota", ObjKind::Iota, Type::Untyped(UntypedKind::Int));
        for (name, builtin) in Builtin::ALL {
            self.insert_universe(name, ObjKind::Builtin(builtin), Type::Unknown);
        }
    }

    fn insert_universe(&mut self, name: &str, kind: ObjKind, ty: Type) -> ObjId {
        let id = self.objects.len();
        self.objects.push(Object {
            name: name.to_string(),
            kind,
            ty,
            val: None,
            span: Span::default(),
            used: true,
        });
        self.scopes[0].insert(name.to_string(), id);
        id
    }

    fn error(&self, span: Span, message: impl Into<String>) -> TypeError {
        let err = TypeError::new(self.source, span, message);
        debug!("type error: {}", err);
        err
    }

    // -----------------------------------------------------------------------
    // Scopes
    // -----------------------------------------------------------------------

    fn open_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn close_scope(&mut self) {
        self.scopes.pop();
    }

    fn lookup(&self, name: &str) -> Option<ObjId> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name).copied())
    }

    fn lookup_innermost(&self, name: &str) -> Option<ObjId> {
        self.scopes.last().and_then(|scope| scope.get(name).copied())
    }

    /// Declares `ident` in the innermost scope. Blank identifiers get an
    /// object but no binding.
    fn declare(&mut self, ident: &Ident, kind: ObjKind, ty: Type) -> CResult<ObjId> {
        if !ident.is_blank() && self.lookup_innermost(&ident.name).is_some() {
            return Err(self.error(
                ident.span,
                format!("{} redeclared in this block", ident.name),
            ));
        }
        let id = self.objects.len();
        self.objects.push(Object {
            name: ident.name.clone(),
            kind,
            ty,
            val: None,
            span: ident.span,
            used: false,
        });
        if !ident.is_blank() {
            if let Some(scope) = self.scopes.last_mut() {
                scope.insert(ident.name.clone(), id);
            }
        }
        Ok(id)
    }

    /// Declares a function-local variable subject to the usage check.
    fn declare_local(&mut self, ident: &Ident, ty: Type) -> CResult<ObjId> {
        let id = self.declare(ident, ObjKind::Var, ty)?;
        if !ident.is_blank() {
            self.locals.push(id);
        }
        Ok(id)
    }

    fn func_ctx(&mut self) -> Option<&mut FuncCtx> {
        self.funcs.last_mut()
    }

    // -----------------------------------------------------------------------
    // Package level
    // -----------------------------------------------------------------------

    pub fn check_file(mut self, file: &File) -> CResult<()> {
        self.package = file.package.name.clone();
        debug!("checking package {}", self.package);
        self.open_scope();

        for decl in &file.decls {
            if let Decl::Gen(gen) = decl {
                for spec in &gen.specs {
                    if let Spec::Import(import) = spec {
                        let path = import.path.value.trim_matches(|c| c == '"' || c == '`');
                        return Err(self.error(
                            import.path.span,
                            format!("could not import {} (no importer configured)", path),
                        ));
                    }
                }
            }
        }

        self.collect_objects(file)?;
        self.resolve_type_decls(file)?;
        self.resolve_func_decls(file)?;

        for decl in &file.decls {
            if let Decl::Gen(gen) = decl {
                if matches!(gen.keyword, DeclKeyword::Const | DeclKeyword::Var) {
                    self.check_value_decl(gen, false)?;
                }
            }
        }

        for decl in &file.decls {
            if let Decl::Func(func) = decl {
                if let Some(body) = &func.body {
                    trace!("checking body of {}", func.name.name);
                    if func.recv.is_none() {
                        self.init_owners = self.package_object(&func.name.name).into_iter().collect();
                    }
                    let checked = self.check_func_body(func.recv.as_ref(), &func.ty, body);
                    self.init_owners.clear();
                    checked?;
                }
            }
        }

        self.check_init_cycles(file)
    }

    /// The package-level object named `name`.
    fn package_object(&self, name: &str) -> Option<ObjId> {
        self.scopes.get(1).and_then(|scope| scope.get(name).copied())
    }

    /// Records that the package-level declaration being checked refers to
    /// `id`.
    fn note_reference(&mut self, id: ObjId) {
        let obj = &self.objects[id];
        if self.init_owners.is_empty() || !matches!(obj.kind, ObjKind::Var | ObjKind::Func) {
            return;
        }
        if self.package_object(&obj.name) != Some(id) {
            return;
        }
        for owner in &self.init_owners {
            self.init_deps.entry(*owner).or_default().push(id);
        }
    }

    /// Reports the first package-level variable, in source order, whose
    /// initialization depends on itself.
    fn check_init_cycles(&self, file: &File) -> CResult<()> {
        for decl in &file.decls {
            let Decl::Gen(gen) = decl else { continue };
            if gen.keyword != DeclKeyword::Var {
                continue;
            }
            for spec in &gen.specs {
                let Spec::Value(spec) = spec else { continue };
                for name in &spec.names {
                    let Some(id) = self.package_object(&name.name) else { continue };
                    let message = match self.init_cycle_len(id) {
                        None => continue,
                        Some(1) => format!("initialization cycle: {} refers to itself", name.name),
                        Some(_) => format!("initialization cycle for {}", name.name),
                    };
                    return Err(self.error(name.span, message));
                }
            }
        }
        Ok(())
    }

    /// Length of the shortest reference chain leading from `start` back to
    /// itself.
    fn init_cycle_len(&self, start: ObjId) -> Option<usize> {
        let mut seen = HashSet::new();
        let mut frontier = vec![start];
        let mut len = 0;
        while !frontier.is_empty() {
            len += 1;
            let mut next = Vec::new();
            for id in frontier {
                for &dep in self.init_deps.get(&id).into_iter().flatten() {
                    if dep == start {
                        return Some(len);
                    }
                    if seen.insert(dep) {
                        next.push(dep);
                    }
                }
            }
            frontier = next;
        }
        None
    }

    /// Declares every package-level name before any body is examined.
    fn collect_objects(&mut self, file: &File) -> CResult<()> {
        for decl in &file.decls {
            match decl {
                Decl::Gen(gen) => {
                    for spec in &gen.specs {
                        match spec {
                            Spec::Type(spec) => {
                                self.declare(&spec.name, ObjKind::TypeName, Type::Unknown)?;
                            }
                            Spec::Value(spec) => {
                                let kind = match gen.keyword {
                                    DeclKeyword::Const => ObjKind::Const,
                                    _ => ObjKind::Var,
                                };
                                for name in &spec.names {
                                    self.declare(name, kind, Type::Unknown)?;
                                }
                            }
                            Spec::Import(_) => {}
                        }
                    }
                }
                Decl::Func(func) => {
                    if func.recv.is_none() && func.name.name != "init" {
                        self.declare(&func.name, ObjKind::Func, Type::Unknown)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn resolve_type_decls(&mut self, file: &File) -> CResult<()> {
        for decl in &file.decls {
            let Decl::Gen(gen) = decl else { continue };
            for spec in &gen.specs {
                if let Spec::Type(spec) = spec {
                    self.check_type_spec(spec, false)?;
                }
            }
        }
        Ok(())
    }

    fn resolve_func_decls(&mut self, file: &File) -> CResult<()> {
        for decl in &file.decls {
            let Decl::Func(func) = decl else { continue };
            self.open_scope();
            self.declare_type_params(func.ty.type_params.as_ref())?;
            if let Some(recv) = &func.recv {
                self.signature_params(recv)?;
            }
            let sig = self.signature(&func.ty)?;
            self.close_scope();

            if func.body.is_none() {
                return Err(self.error(func.name.span, "missing function body"));
            }
            let name = func.name.name.as_str();
            if func.recv.is_none()
                && (name == "init" || (name == "main" && self.package == "main"))
                && (!sig.params.is_empty() || !sig.results.is_empty())
            {
                return Err(self.error(
                    func.name.span,
                    format!("func {} must have no arguments and no return values", name),
                ));
            }
            if func.recv.is_none() && name != "init" && !func.name.is_blank() {
                if let Some(id) = self.lookup_innermost(name) {
                    self.objects[id].ty = Type::Func(Rc::new(sig));
                }
            }
        }
        Ok(())
    }

    fn check_type_spec(&mut self, spec: &TypeSpec, local: bool) -> CResult<()> {
        if local {
            self.declare(&spec.name, ObjKind::TypeName, Type::Unknown)?;
        }
        self.open_scope();
        self.declare_type_params(spec.type_params.as_ref())?;
        let ty = self.resolve_type(&spec.ty);
        self.close_scope();
        let ty = ty?;
        // Defined types are distinct from their underlying type; only aliases
        // keep it.
        if spec.alias {
            if let Some(id) = self.lookup_innermost(&spec.name.name) {
                self.objects[id].ty = ty;
            }
        }
        Ok(())
    }

    fn declare_type_params(&mut self, params: Option<&FieldList>) -> CResult<()> {
        let Some(params) = params else {
            return Ok(());
        };
        for field in &params.fields {
            for name in &field.names {
                self.declare(name, ObjKind::TypeName, Type::Unknown)?;
            }
        }
        for field in &params.fields {
            self.resolve_constraint(&field.ty)?;
        }
        Ok(())
    }

    fn resolve_constraint(&mut self, expr: &Expr) -> CResult<()> {
        match &expr.kind {
            ExprKind::Binary {
                op: BinaryOp::Or,
                x,
                y,
            } => {
                self.resolve_constraint(x)?;
                self.resolve_constraint(y)
            }
            ExprKind::Unary {
                op: UnaryOp::Tilde,
                x,
            } => self.resolve_type(x).map(|_| ()),
            _ => self.resolve_type(expr).map(|_| ()),
        }
    }

    // -----------------------------------------------------------------------
    // Types
    // -----------------------------------------------------------------------

    fn resolve_type(&mut self, expr: &Expr) -> CResult<Type> {
        match &expr.kind {
            ExprKind::Ident(ident) => {
                let Some(id) = self.lookup(&ident.name) else {
                    return Err(self.error(ident.span, format!("undefined: {}", ident.name)));
                };
                let obj = &mut self.objects[id];
                obj.used = true;
                let (kind, ty) = (obj.kind, obj.ty.clone());
                match kind {
                    ObjKind::TypeName => Ok(ty),
                    _ => Err(self.error(ident.span, format!("{} is not a type", ident.name))),
                }
            }
            ExprKind::Paren(inner) => self.resolve_type(inner),
            ExprKind::Selector { x, .. } => {
                if let Some(ident) = x.as_ident() {
                    if self.lookup(&ident.name).is_none() {
                        return Err(self.error(ident.span, format!("undefined: {}", ident.name)));
                    }
                }
                Ok(Type::Unknown)
            }
            ExprKind::Star(elem) => self.resolve_type(elem).map(|_| Type::Unknown),
            ExprKind::ArrayType { len, elem } => {
                if let Some(len) = len {
                    if !matches!(len.kind, ExprKind::Ellipsis(None)) {
                        let operand = self.value(len)?;
                        if !operand.is_constant() {
                            return Err(self.error(
                                len.span,
                                format!("array length {} must be constant", describe(len, &operand)),
                            ));
                        }
                    }
                }
                self.resolve_type(elem).map(|_| Type::Unknown)
            }
            ExprKind::MapType { key, value } => {
                self.resolve_type(key)?;
                self.resolve_type(value).map(|_| Type::Unknown)
            }
            ExprKind::ChanType { value, .. } => self.resolve_type(value).map(|_| Type::Unknown),
            ExprKind::StructType(fields) => {
                let mut seen = HashSet::new();
                for field in &fields.fields {
                    self.resolve_type(&field.ty)?;
                    for name in &field.names {
                        if !name.is_blank() && !seen.insert(name.name.as_str()) {
                            return Err(self.error(
                                name.span,
                                format!("{} redeclared", name.name),
                            ));
                        }
                    }
                }
                Ok(Type::Unknown)
            }
            ExprKind::InterfaceType(fields) => {
                for field in &fields.fields {
                    match &field.ty.kind {
                        ExprKind::FuncType(ty) if !field.names.is_empty() => {
                            self.signature(ty)?;
                        }
                        _ => self.resolve_constraint(&field.ty)?,
                    }
                }
                Ok(Type::Unknown)
            }
            ExprKind::FuncType(ty) => Ok(Type::Func(Rc::new(self.signature(ty)?))),
            ExprKind::Index { x, .. } => self.resolve_type(x).map(|_| Type::Unknown),
            ExprKind::Ellipsis(_) => Err(self.error(expr.span, "invalid use of ...")),
            _ => Err(self.error(expr.span, format!("{} is not a type", expr))),
        }
    }

    fn signature(&mut self, ty: &FuncType) -> CResult<Signature> {
        let (params, variadic) = self.signature_params(&ty.params)?;
        let results = match &ty.results {
            Some(results) => {
                let (results, variadic) = self.signature_params(results)?;
                if variadic {
                    return Err(self.error(ty.span, "can only use ... with final parameter in list"));
                }
                results
            }
            None => Vec::new(),
        };
        Ok(Signature {
            params,
            results,
            variadic,
        })
    }

    /// Flattens a parameter list into one type per parameter.
    fn signature_params(&mut self, list: &FieldList) -> CResult<(Vec<Type>, bool)> {
        let mut types = Vec::new();
        let mut variadic = false;
        for (index, field) in list.fields.iter().enumerate() {
            let ty = match &field.ty.kind {
                ExprKind::Ellipsis(Some(elem)) => {
                    if index + 1 != list.fields.len() || field.names.len() > 1 {
                        return Err(self.error(
                            field.ty.span,
                            "can only use ... with final parameter in list",
                        ));
                    }
                    variadic = true;
                    self.resolve_type(elem)?
                }
                _ => self.resolve_type(&field.ty)?,
            };
            for _ in 0..field.names.len().max(1) {
                types.push(ty.clone());
            }
        }
        Ok((types, variadic))
    }

    // -----------------------------------------------------------------------
    // Function bodies
    // -----------------------------------------------------------------------

    fn check_func_body(
        &mut self,
        recv: Option<&FieldList>,
        ty: &FuncType,
        body: &BlockStmt,
    ) -> CResult<()> {
        self.open_scope();
        self.declare_type_params(ty.type_params.as_ref())?;

        let mut params: Vec<&Field> = Vec::new();
        if let Some(recv) = recv {
            params.extend(&recv.fields);
        }
        params.extend(&ty.params.fields);
        for field in params {
            let ty = match &field.ty.kind {
                ExprKind::Ellipsis(Some(elem)) => self.resolve_type(elem).map(|_| Type::Unknown)?,
                _ => self.resolve_type(&field.ty)?,
            };
            for name in &field.names {
                let id = self.declare(name, ObjKind::Var, ty.clone())?;
                self.objects[id].used = true;
            }
        }

        let mut results = Vec::new();
        let mut named_results = false;
        if let Some(list) = &ty.results {
            for field in &list.fields {
                let ty = self.resolve_type(&field.ty)?;
                for name in &field.names {
                    named_results = true;
                    let id = self.declare(name, ObjKind::Var, ty.clone())?;
                    self.objects[id].used = true;
                }
                for _ in 0..field.names.len().max(1) {
                    results.push(ty.clone());
                }
            }
        }

        let mut ctx = FuncCtx {
            results,
            named_results,
            ..FuncCtx::default()
        };
        collect_labels(&body.stmts, &mut ctx.labels, self)?;
        self.funcs.push(ctx);
        let locals_start = self.locals.len();

        // Parameters and top-level body declarations share one block.
        let checked = self.check_stmt_list(&body.stmts);
        let ctx = self.funcs.pop().unwrap_or_default();
        checked?;

        if let Some((name, label)) = ctx
            .labels
            .iter()
            .filter(|(_, label)| !label.used)
            .min_by_key(|(_, label)| label.span.start)
        {
            return Err(self.error(label.span, format!("label {} declared and not used", name)));
        }

        if !ctx.results.is_empty() && !is_terminating_list(&body.stmts, None) {
            let close = Span::new(body.span.end.saturating_sub(1), body.span.end);
            return Err(self.error(close, "missing return"));
        }

        let unused = self
            .locals
            .drain(locals_start..)
            .filter(|&id| !self.objects[id].used)
            .min_by_key(|&id| self.objects[id].span.start);
        if let Some(id) = unused {
            let obj = &self.objects[id];
            return Err(self.error(obj.span, format!("declared and not used: {}", obj.name)));
        }

        self.close_scope();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------------

    fn check_block(&mut self, block: &BlockStmt) -> CResult<()> {
        self.open_scope();
        let result = self.check_stmt_list(&block.stmts);
        self.close_scope();
        result
    }

    fn check_stmt_list(&mut self, stmts: &[Stmt]) -> CResult<()> {
        for stmt in stmts {
            self.check_stmt(stmt)?;
        }
        Ok(())
    }

    fn check_stmt(&mut self, stmt: &Stmt) -> CResult<()> {
        trace!("checking {}", stmt.kind_name());
        match &stmt.kind {
            StmtKind::Empty => Ok(()),
            StmtKind::Decl(gen) => match gen.keyword {
                DeclKeyword::Const | DeclKeyword::Var => self.check_value_decl(gen, true),
                DeclKeyword::Type => {
                    for spec in &gen.specs {
                        if let Spec::Type(spec) = spec {
                            self.check_type_spec(spec, true)?;
                        }
                    }
                    Ok(())
                }
                DeclKeyword::Import => Err(self.error(gen.span, "imports must appear at package level")),
            },
            StmtKind::Labeled { stmt, .. } => self.check_stmt(stmt),
            StmtKind::Expr(x) => self.check_expr_stmt(x),
            StmtKind::IncDec { x, inc } => {
                let operand = self.value(x)?;
                let op = if *inc { "++" } else { "--" };
                if !operand.ty.is_numeric() {
                    return Err(self.error(
                        stmt.span,
                        format!(
                            "invalid operation: {}{} (non-numeric type {})",
                            x, op, operand.ty
                        ),
                    ));
                }
                self.require_assignable_target(x, &operand)
            }
            StmtKind::Assign { lhs, op, rhs } => self.check_assign(stmt, lhs, *op, rhs),
            StmtKind::Send { chan, value } => {
                let ch = self.value(chan)?;
                if ch.ty.is_scalar() {
                    return Err(self.error(
                        chan.span,
                        format!("invalid operation: cannot send to non-channel {}", describe(chan, &ch)),
                    ));
                }
                self.value(value).map(|_| ())
            }
            StmtKind::Go(call) => self.check_call_stmt(call, "go"),
            StmtKind::Defer(call) => self.check_call_stmt(call, "defer"),
            StmtKind::Return(results) => self.check_return(stmt, results),
            StmtKind::Branch { keyword, label } => self.check_branch(stmt, *keyword, label.as_ref()),
            StmtKind::Block(block) => self.check_block(block),
            StmtKind::If(if_stmt) => {
                self.open_scope();
                let result = self.check_if(if_stmt);
                self.close_scope();
                result
            }
            StmtKind::For(for_stmt) => {
                self.open_scope();
                let result = self.check_for(for_stmt);
                self.close_scope();
                result
            }
            StmtKind::Range(range) => {
                self.open_scope();
                let result = self.check_range(range);
                self.close_scope();
                result
            }
            StmtKind::Switch(switch) => {
                self.open_scope();
                let result = self.check_switch(stmt, switch);
                self.close_scope();
                result
            }
            StmtKind::TypeSwitch(switch) => {
                self.open_scope();
                let result = self.check_type_switch(switch);
                self.close_scope();
                result
            }
            StmtKind::Select(clauses) => self.check_select(clauses),
        }
    }

    fn check_expr_stmt(&mut self, x: &Expr) -> CResult<()> {
        let inner = x.unparen();
        let operand = match &inner.kind {
            ExprKind::Call(call) => {
                let (operand, kind) = self.call(call)?;
                match kind {
                    CallKind::Func => return Ok(()),
                    CallKind::Builtin(builtin) if builtin.is_statement() => return Ok(()),
                    _ => operand,
                }
            }
            ExprKind::Unary {
                op: UnaryOp::Recv, ..
            } => {
                self.expr(inner)?;
                return Ok(());
            }
            _ => self.expr(inner)?,
        };
        Err(self.error(x.span, format!("{} is not used", describe(x, &operand))))
    }

    fn check_call_stmt(&mut self, call: &CallExpr, keyword: &str) -> CResult<()> {
        let (_, kind) = self.call(call)?;
        match kind {
            CallKind::Conversion => Err(self.error(
                call.span,
                format!("{} requires function call, not conversion", keyword),
            )),
            CallKind::Builtin(builtin) if !builtin.is_statement() => Err(self.error(
                call.span,
                format!("{} discards result of {}", keyword, call),
            )),
            _ => Ok(()),
        }
    }

    fn check_return(&mut self, stmt: &Stmt, values: &[Expr]) -> CResult<()> {
        let (results, named) = match self.funcs.last() {
            Some(ctx) => (ctx.results.clone(), ctx.named_results),
            None => (Vec::new(), false),
        };
        if values.is_empty() {
            if !results.is_empty() && !named {
                return Err(self.error(stmt.span, "not enough return values"));
            }
            return Ok(());
        }
        if results.is_empty() {
            self.expr(&values[0])?;
            return Err(self.error(values[0].span, "too many return values"));
        }

        let operands = self.value_list(values, results.len(), false)?;
        if operands.len() < results.len() {
            return Err(self.error(stmt.span, "not enough return values"));
        }
        if operands.len() > results.len() {
            return Err(self.error(values[results.len().min(values.len() - 1)].span, "too many return values"));
        }
        for ((operand, expr), ty) in operands.iter().zip(&results) {
            self.require_assignable(operand, expr, ty, "return statement")?;
        }
        Ok(())
    }

    fn check_branch(&mut self, stmt: &Stmt, keyword: BranchKeyword, label: Option<&Ident>) -> CResult<()> {
        let source = self.source;
        let Some(ctx) = self.funcs.last_mut() else {
            return Ok(());
        };
        if let Some(label) = label {
            if let Some(entry) = ctx.labels.get_mut(&label.name) {
                entry.used = true;
                return Ok(());
            }
            let message = match keyword {
                BranchKeyword::Break => format!("invalid break label {}", label.name),
                BranchKeyword::Continue => format!("invalid continue label {}", label.name),
                _ => format!("label {} not declared", label.name),
            };
            return Err(TypeError::new(source, label.span, message));
        }
        let message = match keyword {
            BranchKeyword::Break if ctx.breakables == 0 => "break is not in a loop, switch, or select",
            BranchKeyword::Continue if ctx.loops == 0 => "continue is not in a loop",
            BranchKeyword::Fallthrough => "fallthrough statement out of place",
            _ => return Ok(()),
        };
        Err(self.error(stmt.span, message))
    }

    fn check_if(&mut self, stmt: &IfStmt) -> CResult<()> {
        if let Some(init) = &stmt.init {
            self.check_stmt(init)?;
        }
        self.check_condition(&stmt.cond, "if")?;
        self.check_block(&stmt.body)?;
        if let Some(els) = &stmt.els {
            self.check_stmt(els)?;
        }
        Ok(())
    }

    fn check_condition(&mut self, cond: &Expr, keyword: &str) -> CResult<()> {
        let operand = self.value(cond)?;
        if !operand.ty.is_boolean() {
            return Err(self.error(
                cond.span,
                format!("non-boolean condition in {} statement", keyword),
            ));
        }
        Ok(())
    }

    fn with_loop<T>(&mut self, breakable_only: bool, f: impl FnOnce(&mut Self) -> CResult<T>) -> CResult<T> {
        if let Some(ctx) = self.func_ctx() {
            ctx.breakables += 1;
            if !breakable_only {
                ctx.loops += 1;
            }
        }
        let result = f(self);
        if let Some(ctx) = self.func_ctx() {
            ctx.breakables -= 1;
            if !breakable_only {
                ctx.loops -= 1;
            }
        }
        result
    }

    fn check_for(&mut self, stmt: &ForStmt) -> CResult<()> {
        if let Some(init) = &stmt.init {
            self.check_stmt(init)?;
        }
        if let Some(cond) = &stmt.cond {
            self.check_condition(cond, "for")?;
        }
        if let Some(post) = &stmt.post {
            self.check_stmt(post)?;
        }
        self.with_loop(false, |checker| checker.check_block(&stmt.body))
    }

    fn check_range(&mut self, stmt: &RangeStmt) -> CResult<()> {
        let x = self.value(&stmt.x)?;
        let (key_ty, value_ty) = match &x.ty {
            Type::Basic(BasicKind::String) | Type::Untyped(UntypedKind::String) => {
                (Type::Basic(BasicKind::Int), Some(Type::Basic(BasicKind::Int32)))
            }
            Type::Basic(kind) if kind.is_integer() => (x.ty.clone(), None),
            Type::Untyped(UntypedKind::Int | UntypedKind::Rune) => (Type::Basic(BasicKind::Int), None),
            Type::Basic(_) | Type::Untyped(_) => {
                return Err(self.error(
                    stmt.x.span,
                    format!("cannot range over {}", describe(&stmt.x, &x)),
                ))
            }
            _ => (Type::Unknown, Some(Type::Unknown)),
        };

        let vars = [(stmt.key.as_ref(), Some(key_ty)), (stmt.value.as_ref(), value_ty)];
        for (var, ty) in vars {
            let Some(var) = var else { continue };
            let Some(ty) = ty else {
                return Err(self.error(
                    var.span,
                    format!("range over {} permits only one iteration variable", describe(&stmt.x, &x)),
                ));
            };
            match stmt.op {
                Some(AssignOp::Define) => {
                    let Some(ident) = var.as_ident() else {
                        return Err(self.error(
                            var.span,
                            format!("non-name {} on left side of :=", var),
                        ));
                    };
                    self.declare_local(ident, ty)?;
                }
                _ => {
                    let operand = Operand::value(ty);
                    self.assign_to_target(var, &operand, var)?;
                }
            }
        }
        self.with_loop(false, |checker| checker.check_block(&stmt.body))
    }

    fn check_switch(&mut self, stmt: &Stmt, switch: &SwitchStmt) -> CResult<()> {
        if let Some(init) = &switch.init {
            self.check_stmt(init)?;
        }
        let tag = match &switch.tag {
            Some(tag) => {
                let operand = self.value(tag)?;
                if operand.is_nil() {
                    return Err(self.error(tag.span, "use of untyped nil in switch expression"));
                }
                Some((tag, Operand::new(operand.mode, operand.ty.default_type())))
            }
            None => None,
        };

        check_single_default(self, switch.clauses.iter().map(|c| (c.exprs.is_none(), c.span)))?;
        let count = switch.clauses.len();
        self.with_loop(true, |checker| {
            for (index, clause) in switch.clauses.iter().enumerate() {
                for expr in clause.exprs.iter().flatten() {
                    let operand = checker.value(expr)?;
                    let (tag_desc, tag_ty) = match &tag {
                        Some((tag_expr, tag)) => (format!(" on {}", tag_expr), tag.ty.clone()),
                        None => (String::new(), Type::Basic(BasicKind::Bool)),
                    };
                    if unify(&operand.ty, &tag_ty).is_none() {
                        return Err(checker.error(
                            expr.span,
                            format!(
                                "invalid case {} in switch{} (mismatched types {} and {})",
                                expr, tag_desc, operand.ty, tag_ty
                            ),
                        ));
                    }
                }
                checker.open_scope();
                let result = checker.check_case_body(&clause.body, index + 1 == count, false);
                checker.close_scope();
                result?;
            }
            Ok(())
        })
    }

    /// Checks a clause body, allowing a trailing `fallthrough` where Go does.
    fn check_case_body(&mut self, body: &[Stmt], last_clause: bool, type_switch: bool) -> CResult<()> {
        for (index, stmt) in body.iter().enumerate() {
            if let StmtKind::Branch {
                keyword: BranchKeyword::Fallthrough,
                ..
            } = stmt.kind
            {
                let message = if type_switch {
                    "cannot fallthrough in type switch"
                } else if index + 1 != body.len() {
                    "fallthrough statement out of place"
                } else if last_clause {
                    "cannot fallthrough final case in switch"
                } else {
                    continue;
                };
                return Err(self.error(stmt.span, message));
            }
            self.check_stmt(stmt)?;
        }
        Ok(())
    }

    fn check_type_switch(&mut self, switch: &TypeSwitchStmt) -> CResult<()> {
        if let Some(init) = &switch.init {
            self.check_stmt(init)?;
        }
        let (binding, guard) = match &switch.assign.kind {
            StmtKind::Assign { lhs, rhs, .. } => (lhs[0].as_ident(), &rhs[0]),
            StmtKind::Expr(guard) => (None, guard),
            _ => return Err(self.error(switch.assign.span, "invalid type switch guard")),
        };
        let ExprKind::TypeAssert { x, .. } = &guard.kind else {
            return Err(self.error(guard.span, "invalid type switch guard"));
        };
        let operand = self.value(x)?;
        if operand.ty.is_scalar() {
            return Err(self.error(
                x.span,
                format!("{} is not an interface", describe(x, &operand)),
            ));
        }
        if let Some(binding) = binding {
            if binding.is_blank() {
                return Err(self.error(binding.span, "no new variable on left side of :="));
            }
        }

        check_single_default(self, switch.clauses.iter().map(|c| (c.exprs.is_none(), c.span)))?;
        let mut binding_used = false;
        self.with_loop(true, |checker| {
            for clause in &switch.clauses {
                let mut clause_ty = Type::Unknown;
                for expr in clause.exprs.iter().flatten() {
                    if expr.as_ident().is_some_and(|i| i.name == "nil") {
                        continue;
                    }
                    let ty = checker.resolve_type(expr)?;
                    if clause.exprs.as_ref().is_some_and(|e| e.len() == 1) {
                        clause_ty = ty;
                    }
                }
                checker.open_scope();
                let declared = match binding {
                    Some(binding) => Some(checker.declare(binding, ObjKind::Var, clause_ty)?),
                    None => None,
                };
                let result = checker.check_case_body(&clause.body, false, true);
                if let Some(id) = declared {
                    binding_used |= checker.objects[id].used;
                }
                checker.close_scope();
                result?;
            }
            Ok(())
        })?;

        match binding {
            Some(binding) if !binding_used => Err(self.error(
                binding.span,
                format!("declared and not used: {}", binding.name),
            )),
            _ => Ok(()),
        }
    }

    fn check_select(&mut self, clauses: &[CommClause]) -> CResult<()> {
        self.with_loop(true, |checker| {
            for clause in clauses {
                checker.open_scope();
                let result = checker.check_comm_clause(clause);
                checker.close_scope();
                result?;
            }
            Ok(())
        })
    }

    fn check_comm_clause(&mut self, clause: &CommClause) -> CResult<()> {
        if let Some(comm) = &clause.comm {
            let is_recv = |x: &Expr| {
                matches!(
                    x.unparen().kind,
                    ExprKind::Unary {
                        op: UnaryOp::Recv,
                        ..
                    }
                )
            };
            let valid = match &comm.kind {
                StmtKind::Send { .. } => true,
                StmtKind::Expr(x) => is_recv(x),
                StmtKind::Assign { rhs, .. } => rhs.len() == 1 && is_recv(&rhs[0]),
                _ => false,
            };
            if !valid {
                return Err(self.error(comm.span, "select case must be receive, send or assign recv"));
            }
            self.check_stmt(comm)?;
        }
        self.check_stmt_list(&clause.body)
    }

    // -----------------------------------------------------------------------
    // Declarations and assignments
    // -----------------------------------------------------------------------

    fn check_value_decl(&mut self, gen: &GenDecl, local: bool) -> CResult<()> {
        let mut previous: Option<&ValueSpec> = None;
        for (index, spec) in gen.specs.iter().enumerate() {
            let Spec::Value(spec) = spec else { continue };
            self.iota = index as i128;
            // Constant specs without values repeat the previous type and values.
            let source = match (gen.keyword, previous) {
                (DeclKeyword::Const, Some(prev)) if spec.values.is_empty() => prev,
                _ => spec,
            };
            self.check_value_spec(gen.keyword, spec, source, local)?;
            if !spec.values.is_empty() {
                previous = Some(spec);
            }
        }
        Ok(())
    }

    fn check_value_spec(
        &mut self,
        keyword: DeclKeyword,
        spec: &ValueSpec,
        source: &ValueSpec,
        local: bool,
    ) -> CResult<()> {
        let is_const = keyword == DeclKeyword::Const;
        let declared = match &source.ty {
            Some(ty) => Some(self.resolve_type(ty)?),
            None => None,
        };

        if !local && !is_const {
            self.init_owners = spec.names.iter().filter_map(|name| self.package_object(&name.name)).collect();
        }
        self.in_const_decl = is_const;
        let operands = self.spec_values(spec, source, is_const);
        self.in_const_decl = false;
        if !local {
            self.init_owners.clear();
        }
        let operands = operands?;

        let context = if is_const { "constant declaration" } else { "variable declaration" };
        let mut declared_names = Vec::new();
        for (index, name) in spec.names.iter().enumerate() {
            let (ty, val) = match (&declared, operands.get(index)) {
                (Some(declared), Some((operand, expr))) => {
                    self.require_assignable(operand, expr, declared, context)?;
                    let val = match declared {
                        Type::Basic(kind) if is_const => operand.val.and_then(|val| val.represent(*kind).ok()),
                        _ => None,
                    };
                    (declared.clone(), val)
                }
                (Some(declared), None) => (declared.clone(), None),
                (None, Some((operand, expr))) => {
                    if operand.is_nil() {
                        return Err(self.error(expr.span, "use of untyped nil in variable declaration"));
                    }
                    if is_const {
                        (operand.ty.clone(), operand.val)
                    } else {
                        let ty = operand.ty.default_type();
                        self.require_assignable(operand, expr, &ty, context)?;
                        (ty, None)
                    }
                }
                (None, None) => {
                    return Err(self.error(name.span, "missing init expr for variable declaration"))
                }
            };
            declared_names.push((name, ty, val));
        }

        let kind = if is_const { ObjKind::Const } else { ObjKind::Var };
        for (name, ty, val) in declared_names {
            let id = if local {
                match kind {
                    ObjKind::Var => self.declare_local(name, ty)?,
                    _ => self.declare(name, kind, ty)?,
                }
            } else {
                match self.package_object(&name.name).filter(|_| !name.is_blank()) {
                    Some(id) => {
                        self.objects[id].ty = ty;
                        id
                    }
                    None => continue,
                }
            };
            self.objects[id].val = val;
        }
        Ok(())
    }

    /// Evaluates the initializers of a value spec, one operand per name.
    fn spec_values<'e>(
        &mut self,
        spec: &ValueSpec,
        source: &'e ValueSpec,
        is_const: bool,
    ) -> CResult<Vec<(Operand, &'e Expr)>> {
        let names = spec.names.len();
        let values = &source.values;
        if values.is_empty() {
            return Ok(Vec::new());
        }

        if is_const {
            if names != values.len() {
                let message = if names > values.len() {
                    "missing init expr for const declaration"
                } else {
                    "extra init expr"
                };
                return Err(self.error(spec.span, message));
            }
            let mut operands = Vec::new();
            for value in values {
                let operand = self.value(value)?;
                if !operand.is_constant() {
                    return Err(self.error(
                        value.span,
                        format!("{} is not constant", describe(value, &operand)),
                    ));
                }
                operands.push((operand, value));
            }
            return Ok(operands);
        }

        let operands = self.value_list(values, names, true)?;
        if operands.len() != names {
            return Err(self.assignment_mismatch(spec.span, names, values, operands.len()));
        }
        Ok(operands)
    }

    /// Evaluates a list of values. A single multi-value call (or a comma-ok
    /// expression when two values are expected) is expanded.
    fn value_list<'e>(
        &mut self,
        exprs: &'e [Expr],
        expected: usize,
        comma_ok: bool,
    ) -> CResult<Vec<(Operand, &'e Expr)>> {
        if let [single] = exprs {
            let operand = self.expr(single)?;
            if let (Mode::Value, Type::Tuple(types)) = (operand.mode, &operand.ty) {
                if types.len() != 1 {
                    return Ok(types
                        .iter()
                        .map(|ty| (Operand::value(ty.clone()), single))
                        .collect());
                }
            }
            let operand = self.single_value(single, operand)?;
            if comma_ok && expected == 2 && is_comma_ok(single) {
                return Ok(vec![
                    (operand, single),
                    (Operand::value(Type::Untyped(UntypedKind::Bool)), single),
                ]);
            }
            return Ok(vec![(operand, single)]);
        }
        exprs
            .iter()
            .map(|expr| self.value(expr).map(|operand| (operand, expr)))
            .collect()
    }

    fn assignment_mismatch(&self, span: Span, vars: usize, values: &[Expr], found: usize) -> TypeError {
        let variables = plural(vars, "variable");
        match values {
            [call @ Expr {
                kind: ExprKind::Call(_),
                ..
            }] => self.error(
                span,
                format!(
                    "assignment mismatch: {} but {} returns {}",
                    variables,
                    call,
                    plural(found, "value")
                ),
            ),
            _ => self.error(
                span,
                format!("assignment mismatch: {} but {}", variables, plural(values.len(), "value")),
            ),
        }
    }

    fn check_assign(&mut self, stmt: &Stmt, lhs: &[Expr], op: AssignOp, rhs: &[Expr]) -> CResult<()> {
        if let Some(binary) = op.binary_op() {
            if lhs.len() != 1 || rhs.len() != 1 {
                return Err(self.error(
                    stmt.span,
                    format!("assignment operation {} requires single-valued expressions", op.as_str()),
                ));
            }
            let x = self.value(&lhs[0])?;
            let y = self.value(&rhs[0])?;
            let text = format!("{} {} {}", lhs[0], op.as_str(), rhs[0]);
            let result = self.binary(binary, (&x, &lhs[0]), (&y, &rhs[0]), stmt.span, &text)?;
            return self.assign_to_target(&lhs[0], &result, &rhs[0]);
        }

        let operands = self.value_list(rhs, lhs.len(), true)?;
        if operands.len() != lhs.len() {
            return Err(self.assignment_mismatch(stmt.span, lhs.len(), rhs, operands.len()));
        }

        if op == AssignOp::Assign {
            for (target, (operand, expr)) in lhs.iter().zip(&operands) {
                self.assign_to_target(target, operand, expr)?;
            }
            return Ok(());
        }

        // Short variable declaration.
        let mut seen = HashSet::new();
        let mut new_vars = Vec::new();
        for (target, (operand, expr)) in lhs.iter().zip(&operands) {
            let Some(ident) = target.as_ident() else {
                return Err(self.error(
                    target.span,
                    format!("non-name {} on left side of :=", target),
                ));
            };
            if ident.is_blank() {
                if operand.is_nil() {
                    return Err(self.error(expr.span, "use of untyped nil in assignment"));
                }
                continue;
            }
            if !seen.insert(ident.name.as_str()) {
                return Err(self.error(
                    ident.span,
                    format!("{} repeated on left side of :=", ident.name),
                ));
            }
            match self.lookup_innermost(&ident.name) {
                Some(_) => self.assign_to_target(target, operand, expr)?,
                None => {
                    if operand.is_nil() {
                        return Err(self.error(expr.span, "use of untyped nil in assignment"));
                    }
                    let ty = operand.ty.default_type();
                    self.require_assignable(operand, expr, &ty, "assignment")?;
                    new_vars.push((ident, ty));
                }
            }
        }
        if new_vars.is_empty() {
            return Err(self.error(stmt.span, "no new variables on left side of :="));
        }
        for (ident, ty) in new_vars {
            self.declare_local(ident, ty)?;
        }
        Ok(())
    }

    /// Checks `target = value` where `target` is not yet evaluated.
    fn assign_to_target(&mut self, target: &Expr, value: &Operand, value_expr: &Expr) -> CResult<()> {
        let inner = target.unparen();
        if let ExprKind::Ident(ident) = &inner.kind {
            if ident.is_blank() {
                if value.is_nil() {
                    return Err(self.error(value_expr.span, "use of untyped nil in assignment"));
                }
                return Ok(());
            }
            let Some(id) = self.lookup(&ident.name) else {
                return Err(self.error(ident.span, format!("undefined: {}", ident.name)));
            };
            self.note_reference(id);
            let obj = &self.objects[id];
            if obj.kind != ObjKind::Var {
                return Err(self.unassignable(target));
            }
            let ty = obj.ty.clone();
            return self.require_assignable(value, value_expr, &ty, "assignment");
        }
        let operand = self.expr(inner)?;
        if operand.mode != Mode::Variable {
            return Err(self.unassignable(target));
        }
        self.require_assignable(value, value_expr, &operand.ty, "assignment")
    }

    /// Checks that an already evaluated operand can be assigned to.
    fn require_assignable_target(&mut self, target: &Expr, operand: &Operand) -> CResult<()> {
        match operand.mode {
            Mode::Variable => Ok(()),
            _ => Err(self.unassignable(target)),
        }
    }

    fn unassignable(&self, target: &Expr) -> TypeError {
        self.error(
            target.span,
            format!("cannot assign to {} (neither addressable nor a map index expression)", target),
        )
    }

    /// Constants must also be representable by the target type.
    fn require_assignable(&self, value: &Operand, expr: &Expr, target: &Type, context: &str) -> CResult<()> {
        let suffix = match (assignable(value, target), value.mode, value.val, target) {
            (false, ..) => String::new(),
            (true, Mode::Constant, Some(val), Type::Basic(kind)) => match val.represent(*kind) {
                Ok(_) => return Ok(()),
                Err(reason) => format!(" ({})", reason.as_str()),
            },
            (true, ..) => return Ok(()),
        };
        Err(self.error(
            expr.span,
            format!("cannot use {} as {} value in {}{}", describe(expr, value), target, context, suffix),
        ))
    }

    // -----------------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------------

    /// Evaluates an expression that must produce exactly one value.
    fn value(&mut self, expr: &Expr) -> CResult<Operand> {
        let operand = self.expr(expr)?;
        self.single_value(expr, operand)
    }

    fn single_value(&self, expr: &Expr, operand: Operand) -> CResult<Operand> {
        let message = match (&operand.mode, &operand.ty) {
            (Mode::NoValue, _) => format!("{} (no value) used as value", expr),
            (Mode::Value, Type::Tuple(types)) if types.len() != 1 => format!(
                "multiple-value {} in single-value context",
                describe(expr, &operand)
            ),
            (Mode::Value, Type::Tuple(types)) => {
                return Ok(Operand::value(types[0].clone()));
            }
            (Mode::TypeExpr, _) => format!("{} is not an expression", describe(expr, &operand)),
            (Mode::Builtin(_), _) => format!("{} must be called", describe(expr, &operand)),
            _ => return Ok(operand),
        };
        Err(self.error(expr.span, message))
    }

    fn expr(&mut self, expr: &Expr) -> CResult<Operand> {
        match &expr.kind {
            ExprKind::Ident(ident) => self.ident(ident),
            ExprKind::BasicLit(lit) => {
                let ty = match lit.kind {
                    LitKind::Int => Type::Untyped(UntypedKind::Int),
                    LitKind::Float => Type::Untyped(UntypedKind::Float),
                    LitKind::Char => Type::Untyped(UntypedKind::Rune),
                    LitKind::String => Type::Untyped(UntypedKind::String),
                    LitKind::Imag => Type::Unknown,
                };
                Ok(Operand::constant(ty, ConstValue::of_literal(lit)))
            }
            ExprKind::FuncLit(lit) => {
                let sig = self.signature(&lit.ty)?;
                let outer_const = self.in_const_decl;
                self.in_const_decl = false;
                let checked = self.check_func_body(None, &lit.ty, &lit.body);
                self.in_const_decl = outer_const;
                checked?;
                Ok(Operand::value(Type::Func(Rc::new(sig))))
            }
            ExprKind::Paren(inner) => self.expr(inner),
            ExprKind::Selector { x, sel } => {
                let operand = self.expr(x)?;
                match (&operand.mode, &operand.ty) {
                    (Mode::TypeExpr, _) => Ok(Operand::unknown()),
                    (_, Type::Basic(_) | Type::Untyped(_)) => Err(self.error(
                        sel.span,
                        format!(
                            "{}.{} undefined (type {} has no field or method {})",
                            x, sel.name, operand.ty, sel.name
                        ),
                    )),
                    _ => {
                        self.single_value(x, operand)?;
                        Ok(Operand::new(Mode::Variable, Type::Unknown))
                    }
                }
            }
            ExprKind::Index { x, index } => {
                let operand = self.expr(x)?;
                match (&operand.mode, &operand.ty) {
                    // Generic instantiation.
                    (Mode::TypeExpr, _) => {
                        self.resolve_type(index)?;
                        return Ok(Operand::new(Mode::TypeExpr, Type::Unknown));
                    }
                    (_, Type::Func(_)) => {
                        self.resolve_type(index)?;
                        return Ok(Operand::unknown());
                    }
                    _ => {}
                }
                let operand = self.single_value(x, operand)?;
                let idx = self.value(index)?;
                if !idx.ty.is_integer() && operand.ty.is_string() && operand.ty != Type::Unknown {
                    return Err(self.error(
                        index.span,
                        format!("invalid argument: index {} must be integer", describe(index, &idx)),
                    ));
                }
                match &operand.ty {
                    Type::Basic(BasicKind::String) | Type::Untyped(UntypedKind::String) => {
                        Ok(Operand::value(Type::Basic(BasicKind::Uint8)))
                    }
                    Type::Basic(_) | Type::Untyped(_) | Type::Func(_) => Err(self.error(
                        expr.span,
                        format!("invalid operation: cannot index {}", describe(x, &operand)),
                    )),
                    _ => Ok(Operand::new(Mode::Variable, Type::Unknown)),
                }
            }
            ExprKind::Slice { x, low, high, max } => {
                let operand = self.value(x)?;
                for bound in [low, high, max].into_iter().flatten() {
                    let bound_op = self.value(bound)?;
                    if !bound_op.ty.is_integer() {
                        return Err(self.error(
                            bound.span,
                            format!("invalid argument: index {} must be integer", describe(bound, &bound_op)),
                        ));
                    }
                }
                match &operand.ty {
                    Type::Basic(BasicKind::String) | Type::Untyped(UntypedKind::String) => {
                        Ok(Operand::value(Type::Basic(BasicKind::String)))
                    }
                    Type::Basic(_) | Type::Untyped(_) | Type::Func(_) => Err(self.error(
                        expr.span,
                        format!("cannot slice {}", describe(x, &operand)),
                    )),
                    _ => Ok(Operand::unknown()),
                }
            }
            ExprKind::TypeAssert { x, ty } => {
                let operand = self.value(x)?;
                if operand.ty.is_scalar() || matches!(operand.ty, Type::Func(_)) {
                    return Err(self.error(
                        x.span,
                        format!("invalid operation: {} is not an interface", describe(x, &operand)),
                    ));
                }
                match ty {
                    Some(ty) => Ok(Operand::value(self.resolve_type(ty)?)),
                    None => Err(self.error(expr.span, "use of .(type) outside type switch")),
                }
            }
            ExprKind::Call(call) => self.call(call).map(|(operand, _)| operand),
            ExprKind::Star(x) => {
                let operand = self.expr(x)?;
                if operand.mode == Mode::TypeExpr {
                    return Ok(Operand::new(Mode::TypeExpr, Type::Unknown));
                }
                let operand = self.single_value(x, operand)?;
                if operand.ty.is_scalar() || matches!(operand.ty, Type::Func(_)) {
                    return Err(self.error(
                        expr.span,
                        format!("invalid operation: cannot indirect {}", describe(x, &operand)),
                    ));
                }
                Ok(Operand::new(Mode::Variable, Type::Unknown))
            }
            ExprKind::Unary { op, x } => self.unary(expr, *op, x),
            ExprKind::Binary { op, x, y } => {
                let xo = self.value(x)?;
                let yo = self.value(y)?;
                self.binary(*op, (&xo, &**x), (&yo, &**y), expr.span, expr)
            }
            ExprKind::KeyValue { .. } => Err(self.error(expr.span, "unexpected key:value expression")),
            ExprKind::CompositeLit { ty, elts } => {
                if let Some(ty) = ty {
                    let resolved = match &ty.kind {
                        ExprKind::ArrayType {
                            len: Some(len),
                            elem,
                        } if matches!(len.kind, ExprKind::Ellipsis(None)) => {
                            self.resolve_type(elem).map(|_| Type::Unknown)?
                        }
                        _ => self.resolve_type(ty)?,
                    };
                    if !matches!(resolved, Type::Unknown) {
                        return Err(self.error(
                            ty.span,
                            format!("invalid composite literal type {}", ty),
                        ));
                    }
                }
                for elt in elts {
                    self.element(elt)?;
                }
                Ok(Operand::unknown())
            }
            ExprKind::ArrayType { .. }
            | ExprKind::MapType { .. }
            | ExprKind::ChanType { .. }
            | ExprKind::StructType(_)
            | ExprKind::InterfaceType(_)
            | ExprKind::FuncType(_) => {
                let ty = self.resolve_type(expr)?;
                Ok(Operand::new(Mode::TypeExpr, ty))
            }
            ExprKind::Ellipsis(_) => Err(self.error(expr.span, "invalid use of ...")),
        }
    }

    fn ident(&mut self, ident: &Ident) -> CResult<Operand> {
        if ident.is_blank() {
            return Err(self.error(ident.span, "cannot use _ as value"));
        }
        let Some(id) = self.lookup(&ident.name) else {
            return Err(self.error(ident.span, format!("undefined: {}", ident.name)));
        };
        self.note_reference(id);
        let obj = &mut self.objects[id];
        obj.used = true;
        let (kind, ty, val) = (obj.kind, obj.ty.clone(), obj.val);
        Ok(match kind {
            ObjKind::Var => Operand::new(Mode::Variable, ty),
            ObjKind::Const => Operand::constant(ty, val),
            ObjKind::TypeName => Operand::new(Mode::TypeExpr, ty),
            ObjKind::Func | ObjKind::Nil => Operand::value(ty),
            ObjKind::Builtin(builtin) => Operand::new(Mode::Builtin(builtin), Type::Unknown),
            ObjKind::Iota => {
                if !self.in_const_decl {
                    return Err(self.error(ident.span, "cannot use iota outside constant declaration"));
                }
                Operand::constant(ty, Some(ConstValue::Int(self.iota)))
            }
        })
    }

    /// Element of a composite literal; keys that are bare names may be
    /// struct field names and are not resolved.
    fn element(&mut self, elt: &Expr) -> CResult<()> {
        let value = match &elt.kind {
            ExprKind::KeyValue { key, value } => {
                match &key.kind {
                    ExprKind::Ident(ident) => {
                        if let Some(id) = self.lookup(&ident.name) {
                            self.objects[id].used = true;
                        }
                    }
                    ExprKind::CompositeLit { ty: None, .. } => self.element(key)?,
                    _ => {
                        self.value(key)?;
                    }
                }
                value
            }
            _ => elt,
        };
        match &value.kind {
            ExprKind::CompositeLit { ty: None, elts } => {
                for elt in elts {
                    self.element(elt)?;
                }
                Ok(())
            }
            _ => self.value(value).map(|_| ()),
        }
    }

    fn unary(&mut self, expr: &Expr, op: UnaryOp, x: &Expr) -> CResult<Operand> {
        if op == UnaryOp::Addr {
            let inner = x.unparen();
            if let ExprKind::CompositeLit { .. } = inner.kind {
                self.expr(inner)?;
                return Ok(Operand::unknown());
            }
            let operand = self.value(x)?;
            if operand.mode != Mode::Variable {
                return Err(self.error(
                    expr.span,
                    format!("invalid operation: cannot take address of {}", describe(x, &operand)),
                ));
            }
            return Ok(Operand::unknown());
        }

        let operand = self.value(x)?;
        let defined = match op {
            UnaryOp::Plus | UnaryOp::Neg => operand.ty.is_numeric(),
            UnaryOp::Not => operand.ty.is_boolean(),
            UnaryOp::BitNot => operand.ty.is_integer(),
            UnaryOp::Recv => {
                if operand.ty.is_scalar() || matches!(operand.ty, Type::Func(_)) {
                    return Err(self.error(
                        expr.span,
                        format!("invalid operation: cannot receive from non-channel {}", describe(x, &operand)),
                    ));
                }
                return Ok(Operand::unknown());
            }
            UnaryOp::Tilde => false,
            UnaryOp::Addr => true,
        };
        if !defined {
            return Err(self.error(
                expr.span,
                format!(
                    "invalid operation: operator {} not defined on {}",
                    op.as_str(),
                    describe(x, &operand)
                ),
            ));
        }
        if !operand.is_constant() {
            return Ok(Operand::value(operand.ty));
        }
        let val = operand.val.and_then(|val| fold_unary(op, val, &operand.ty));
        self.typed_constant(expr.span, expr, Operand::constant(operand.ty, val))
    }

    /// Checks that a typed constant result still fits its type.
    fn typed_constant(&self, span: Span, text: &dyn Display, result: Operand) -> CResult<Operand> {
        let (Some(val), Type::Basic(kind)) = (result.val, &result.ty) else {
            return Ok(result);
        };
        match val.represent(*kind) {
            Ok(val) => Ok(Operand {
                val: Some(val),
                ..result
            }),
            Err(reason) => Err(self.error(
                span,
                format!("{} {} {}", describe(text, &result), reason.verb(), result.ty),
            )),
        }
    }

    /// Converts an untyped constant operand of a binary operation to the
    /// other operand's type.
    fn convert_untyped(&self, (operand, expr): (&Operand, &Expr), ty: &Type) -> CResult<Option<ConstValue>> {
        match (operand.ty.is_untyped(), operand.val, ty) {
            (true, Some(val), Type::Basic(kind)) => match val.represent(*kind) {
                Ok(val) => Ok(Some(val)),
                Err(reason) => Err(self.error(
                    expr.span,
                    format!("{} {} {}", describe(expr, operand), reason.verb(), ty),
                )),
            },
            _ => Ok(operand.val),
        }
    }

    fn binary(
        &self,
        op: BinaryOp,
        (x, x_expr): (&Operand, &Expr),
        (y, y_expr): (&Operand, &Expr),
        span: Span,
        text: &dyn Display,
    ) -> CResult<Operand> {
        let constant = x.is_constant() && y.is_constant();
        let mode = if constant { Mode::Constant } else { Mode::Value };

        if op.is_shift() {
            if !x.ty.is_integer() && x.ty != Type::Untyped(UntypedKind::Float) {
                return Err(self.error(
                    span,
                    format!("invalid operation: shifted operand {} must be integer", describe(x_expr, x)),
                ));
            }
            if !y.ty.is_integer() && !(y.is_constant() && y.ty.is_numeric()) {
                return Err(self.error(
                    span,
                    format!("invalid operation: shift count {} must be integer", describe(y_expr, y)),
                ));
            }
            let ty = match (&x.ty, constant) {
                (Type::Untyped(_), false) => Type::Basic(BasicKind::Int),
                (ty, _) => ty.clone(),
            };
            if !constant {
                return Ok(Operand::new(mode, ty));
            }
            let val = match (x.val, y.val) {
                (Some(a), Some(b)) => fold_binary(op, a, b, true),
                _ => None,
            };
            return self.typed_constant(span, text, Operand::constant(ty, val));
        }

        let Some(ty) = unify(&x.ty, &y.ty) else {
            return Err(self.error(
                span,
                format!("invalid operation: {} (mismatched types {} and {})", text, x.ty, y.ty),
            ));
        };
        let x_val = self.convert_untyped((x, x_expr), &ty)?;
        let y_val = self.convert_untyped((y, y_expr), &ty)?;
        let folded = match (constant, x_val, y_val) {
            (true, Some(a), Some(b)) => {
                let integer = ty.is_integer() && !matches!(ty, Type::Unknown);
                fold_binary(op, a, b, integer)
            }
            _ => None,
        };

        if op.is_comparison() {
            match (&x.ty, &y.ty) {
                (Type::Untyped(UntypedKind::Nil), Type::Untyped(UntypedKind::Nil)) => {
                    return Err(self.error(
                        span,
                        format!("invalid operation: {} (operator {} not defined on nil)", text, op.as_str()),
                    ))
                }
                (Type::Func(_), Type::Func(_)) => {
                    return Err(self.error(
                        span,
                        format!("invalid operation: {} (func can only be compared to nil)", text),
                    ))
                }
                _ => {}
            }
            let ordered = !matches!(op, BinaryOp::Eql | BinaryOp::Neq);
            if ordered && !ty.is_ordered() {
                return Err(self.error(
                    span,
                    format!(
                        "invalid operation: {} (operator {} not defined on {})",
                        text,
                        op.as_str(),
                        describe(x_expr, x)
                    ),
                ));
            }
            return Ok(Operand {
                mode,
                ty: Type::Untyped(UntypedKind::Bool),
                val: folded,
            });
        }

        let defined = if op.is_logical() {
            ty.is_boolean()
        } else if op.is_integer_only() {
            ty.is_integer()
        } else if op == BinaryOp::Add {
            ty.is_numeric() || ty.is_string()
        } else {
            ty.is_numeric()
        };
        if !defined {
            let culprit = match op.is_logical() && x.ty.is_boolean() {
                true => (y_expr, y),
                false => (x_expr, x),
            };
            return Err(self.error(
                span,
                format!(
                    "invalid operation: operator {} not defined on {}",
                    op.as_str(),
                    describe(culprit.0, culprit.1)
                ),
            ));
        }

        let integer_dividend = matches!(x.ty, Type::Basic(kind) if kind.is_integer());
        if matches!(op, BinaryOp::Quo | BinaryOp::Rem)
            && (x.is_constant() || integer_dividend)
            && y.is_constant()
            && y_val.is_some_and(ConstValue::is_zero)
        {
            return Err(self.error(y_expr.span, "invalid operation: division by zero"));
        }
        if !constant {
            return Ok(Operand::new(mode, ty));
        }
        self.typed_constant(span, text, Operand::constant(ty, folded))
    }

    // -----------------------------------------------------------------------
    // Calls
    // -----------------------------------------------------------------------

    fn call(&mut self, call: &CallExpr) -> CResult<(Operand, CallKind)> {
        let fun = self.expr(&call.fun)?;
        match (&fun.mode, &fun.ty) {
            (Mode::TypeExpr, target) => {
                let target = target.clone();
                self.conversion(call, target).map(|op| (op, CallKind::Conversion))
            }
            (Mode::Builtin(builtin), _) => {
                let builtin = *builtin;
                self.builtin(call, builtin).map(|op| (op, CallKind::Builtin(builtin)))
            }
            (_, Type::Func(sig)) => {
                let sig = sig.clone();
                self.func_call(call, &sig).map(|op| (op, CallKind::Func))
            }
            (_, Type::Unknown) => {
                self.single_value(&call.fun, fun)?;
                for arg in &call.args {
                    self.expr(arg)?;
                }
                Ok((Operand::unknown(), CallKind::Func))
            }
            _ => Err(self.error(
                call.span,
                format!("invalid operation: cannot call non-function {}", describe(&call.fun, &fun)),
            )),
        }
    }

    fn conversion(&mut self, call: &CallExpr, target: Type) -> CResult<Operand> {
        let arg = match call.args.as_slice() {
            [arg] => arg,
            [] => {
                return Err(self.error(
                    call.span,
                    format!("missing argument in conversion to {}", call.fun),
                ))
            }
            _ => {
                return Err(self.error(
                    call.span,
                    format!("too many arguments in conversion to {}", call.fun),
                ))
            }
        };
        let operand = self.value(arg)?;
        if !convertible(&operand.ty, &target) {
            return Err(self.error(
                arg.span,
                format!("cannot convert {} to type {}", describe(arg, &operand), call.fun),
            ));
        }
        let kind = match &target {
            Type::Basic(kind) => *kind,
            _ => return Ok(Operand::value(target)),
        };
        if !operand.is_constant() {
            return Ok(Operand::value(target));
        }
        let val = match operand.val {
            Some(_) if kind == BasicKind::String => None,
            Some(val) => match val.represent(kind) {
                Ok(val) => Some(val),
                Err(_) if operand.ty.is_integer() && kind.is_integer() => {
                    return Err(self.error(arg.span, format!("constant {} overflows {}", val, call.fun)))
                }
                Err(reason) => {
                    return Err(self.error(
                        arg.span,
                        format!(
                            "cannot convert {} to type {} ({})",
                            describe(arg, &operand),
                            call.fun,
                            reason.as_str()
                        ),
                    ))
                }
            },
            None => None,
        };
        Ok(Operand::constant(target, val))
    }

    fn builtin(&mut self, call: &CallExpr, builtin: Builtin) -> CResult<Operand> {
        let (min, max) = builtin.arity();
        let count = call.args.len();
        if count < min || max.is_some_and(|max| count > max) {
            let (which, expected) = match count < min {
                true => ("not enough", min),
                false => ("too many", max.unwrap_or(min)),
            };
            return Err(self.error(
                call.span,
                format!(
                    "{} arguments for {} (expected {}, found {})",
                    which, call, expected, count
                ),
            ));
        }

        match builtin {
            Builtin::Make | Builtin::New => {
                let first = &call.args[0];
                let operand = self.expr(first)?;
                if operand.mode != Mode::TypeExpr {
                    return Err(self.error(first.span, format!("{} is not a type", first)));
                }
                for arg in &call.args[1..] {
                    let size = self.value(arg)?;
                    if !size.ty.is_integer() {
                        return Err(self.error(
                            arg.span,
                            format!("cannot convert {} to type int", describe(arg, &size)),
                        ));
                    }
                }
                return Ok(Operand::unknown());
            }
            _ => {}
        }

        let mut args = Vec::new();
        for arg in &call.args {
            args.push((self.value(arg)?, arg));
        }

        Ok(match builtin {
            Builtin::Print | Builtin::Println | Builtin::Panic => {
                for (operand, arg) in &args {
                    if operand.is_nil() && builtin != Builtin::Panic {
                        return Err(self.error(arg.span, "use of untyped nil in argument to built-in print"));
                    }
                }
                Operand::new(Mode::NoValue, Type::Tuple(Vec::new()))
            }
            Builtin::Len | Builtin::Cap => {
                let (operand, _) = &args[0];
                let valid = match &operand.ty {
                    Type::Basic(BasicKind::String) | Type::Untyped(UntypedKind::String) => {
                        builtin == Builtin::Len
                    }
                    Type::Basic(_) | Type::Untyped(_) | Type::Func(_) => false,
                    _ => true,
                };
                if !valid {
                    return Err(self.invalid_builtin_arg(builtin, &args[0]));
                }
                Operand::value(Type::Basic(BasicKind::Int))
            }
            Builtin::Append => {
                let (operand, _) = &args[0];
                if (operand.ty.is_scalar() && !operand.is_nil()) || matches!(operand.ty, Type::Func(_)) {
                    return Err(self.invalid_builtin_arg(builtin, &args[0]));
                }
                Operand::unknown()
            }
            Builtin::Copy => Operand::value(Type::Basic(BasicKind::Int)),
            Builtin::Delete | Builtin::Close | Builtin::Clear => {
                let (operand, _) = &args[0];
                if operand.ty.is_scalar() || matches!(operand.ty, Type::Func(_)) {
                    return Err(self.invalid_builtin_arg(builtin, &args[0]));
                }
                Operand::new(Mode::NoValue, Type::Tuple(Vec::new()))
            }
            Builtin::Min | Builtin::Max => {
                for entry in &args {
                    if !entry.0.ty.is_ordered() {
                        return Err(self.invalid_builtin_arg(builtin, entry));
                    }
                }
                let mut ty = args[0].0.ty.clone();
                for (operand, arg) in &args[1..] {
                    ty = unify(&ty, &operand.ty).ok_or_else(|| {
                        self.error(
                            arg.span,
                            format!(
                                "invalid argument: mismatched types {} (previous argument) and {} (type of {})",
                                ty, operand.ty, arg
                            ),
                        )
                    })?;
                }
                let mode = match args.iter().all(|(operand, _)| operand.is_constant()) {
                    true => Mode::Constant,
                    false => Mode::Value,
                };
                Operand::new(mode, ty)
            }
            Builtin::Complex | Builtin::Real | Builtin::Imag => {
                for entry in &args {
                    if !entry.0.ty.is_numeric() {
                        return Err(self.invalid_builtin_arg(builtin, entry));
                    }
                }
                Operand::unknown()
            }
            Builtin::Make | Builtin::New => Operand::unknown(),
        })
    }

    fn invalid_builtin_arg(&self, builtin: Builtin, (operand, arg): &(Operand, &Expr)) -> TypeError {
        self.error(
            arg.span,
            format!(
                "invalid argument: {} for built-in {}",
                describe(*arg, operand),
                builtin.name()
            ),
        )
    }

    fn func_call(&mut self, call: &CallExpr, sig: &Signature) -> CResult<Operand> {
        let args = match call.args.as_slice() {
            [] => Vec::new(),
            _ => self.value_list(&call.args, sig.params.len(), false)?,
        };

        let fixed = match sig.variadic {
            true => sig.params.len() - 1,
            false => sig.params.len(),
        };
        let spread = sig.variadic && call.has_ellipsis;
        let too_few = args.len() < fixed || (spread && args.len() < sig.params.len());
        let too_many = (!sig.variadic || spread) && args.len() > sig.params.len();
        if too_few || too_many {
            let which = if too_few { "not enough" } else { "too many" };
            return Err(self.error(
                call.span,
                format!("{} arguments in call to {}", which, call.fun),
            ));
        }

        let context = format!("argument to {}", call.fun);
        for (index, (operand, arg)) in args.iter().enumerate() {
            if spread && index + 1 == sig.params.len() {
                continue;
            }
            let param = &sig.params[index.min(sig.params.len() - 1)];
            self.require_assignable(operand, arg, param, &context)?;
        }

        Ok(match sig.results.as_slice() {
            [] => Operand::new(Mode::NoValue, Type::Tuple(Vec::new())),
            [single] => Operand::value(single.clone()),
            results => Operand::value(Type::Tuple(results.to_vec())),
        })
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Common type of two operands of a binary operation.
fn unify(x: &Type, y: &Type) -> Option<Type> {
    match (x, y) {
        (Type::Unknown, other) | (other, Type::Unknown) => Some(match other {
            Type::Basic(_) | Type::Func(_) => other.clone(),
            _ => Type::Unknown,
        }),
        (Type::Basic(a), Type::Basic(b)) => (a == b).then_some(Type::Basic(*a)),
        (Type::Basic(kind), Type::Untyped(untyped)) | (Type::Untyped(untyped), Type::Basic(kind)) => {
            untyped.fits(*kind).then_some(Type::Basic(*kind))
        }
        (Type::Untyped(a), Type::Untyped(b)) if a == b => Some(x.clone()),
        (Type::Untyped(a), Type::Untyped(b)) if a.is_numeric() && b.is_numeric() => {
            Some(Type::Untyped(*a.max(b)))
        }
        (Type::Func(_), Type::Untyped(UntypedKind::Nil)) => Some(x.clone()),
        (Type::Untyped(UntypedKind::Nil), Type::Func(_)) => Some(y.clone()),
        (Type::Func(_), Type::Func(_)) => Some(x.clone()),
        _ => None,
    }
}

fn assignable(value: &Operand, target: &Type) -> bool {
    match (&value.ty, target) {
        (Type::Unknown, _) | (_, Type::Unknown) => true,
        (Type::Basic(a), Type::Basic(b)) => a == b,
        (Type::Untyped(untyped), Type::Basic(kind)) => untyped.fits(*kind),
        (Type::Untyped(UntypedKind::Nil), Type::Func(_)) => true,
        (Type::Func(a), Type::Func(b)) => a.matches(b),
        _ => false,
    }
}

fn convertible(from: &Type, to: &Type) -> bool {
    match (from, to) {
        (Type::Unknown, _) | (_, Type::Unknown) => true,
        (_, Type::Basic(BasicKind::String)) => from.is_integer() || from.is_string(),
        (_, Type::Basic(BasicKind::Bool)) => from.is_boolean(),
        (_, Type::Basic(_)) => from.is_numeric(),
        (Type::Untyped(UntypedKind::Nil), Type::Func(_)) => true,
        (Type::Func(a), Type::Func(b)) => a.matches(b),
        _ => false,
    }
}

/// Expressions that may yield an extra boolean in a two-value assignment.
fn is_comma_ok(expr: &Expr) -> bool {
    matches!(
        expr.unparen().kind,
        ExprKind::Index { .. }
            | ExprKind::TypeAssert { .. }
            | ExprKind::Unary {
                op: UnaryOp::Recv,
                ..
            }
    )
}

fn plural(count: usize, word: &str) -> String {
    match count {
        1 => format!("1 {}", word),
        n => format!("{} {}s", n, word),
    }
}

fn check_single_default(
    checker: &Checker<'_>,
    clauses: impl Iterator<Item = (bool, Span)>,
) -> CResult<()> {
    let defaults: Vec<Span> = clauses.filter(|(is_default, _)| *is_default).map(|(_, span)| span).collect();
    match defaults.as_slice() {
        [_, second, ..] => Err(checker.error(*second, "multiple defaults in switch")),
        _ => Ok(()),
    }
}

/// Collects the labels of a function body; labels are function-scoped.
fn collect_labels(stmts: &[Stmt], labels: &mut HashMap<String, Label>, checker: &Checker<'_>) -> CResult<()> {
    for stmt in stmts {
        collect_stmt_labels(stmt, labels, checker)?;
    }
    Ok(())
}

fn collect_stmt_labels(stmt: &Stmt, labels: &mut HashMap<String, Label>, checker: &Checker<'_>) -> CResult<()> {
    match &stmt.kind {
        StmtKind::Labeled { label, stmt } => {
            if !label.is_blank() {
                if labels.contains_key(&label.name) {
                    return Err(checker.error(
                        label.span,
                        format!("label {} already declared", label.name),
                    ));
                }
                labels.insert(
                    label.name.clone(),
                    Label {
                        span: label.span,
                        used: false,
                    },
                );
            }
            collect_stmt_labels(stmt, labels, checker)
        }
        StmtKind::Block(block) => collect_labels(&block.stmts, labels, checker),
        StmtKind::If(stmt) => {
            collect_labels(&stmt.body.stmts, labels, checker)?;
            match &stmt.els {
                Some(els) => collect_stmt_labels(els, labels, checker),
                None => Ok(()),
            }
        }
        StmtKind::For(stmt) => collect_labels(&stmt.body.stmts, labels, checker),
        StmtKind::Range(stmt) => collect_labels(&stmt.body.stmts, labels, checker),
        StmtKind::Switch(stmt) => stmt
            .clauses
            .iter()
            .try_for_each(|clause| collect_labels(&clause.body, labels, checker)),
        StmtKind::TypeSwitch(stmt) => stmt
            .clauses
            .iter()
            .try_for_each(|clause| collect_labels(&clause.body, labels, checker)),
        StmtKind::Select(clauses) => clauses
            .iter()
            .try_for_each(|clause| collect_labels(&clause.body, labels, checker)),
        _ => Ok(()),
    }
}

// ============================================================================
// Terminating statements
// ============================================================================

fn is_terminating_list(stmts: &[Stmt], label: Option<&str>) -> bool {
    stmts
        .iter()
        .rev()
        .find(|stmt| !matches!(stmt.kind, StmtKind::Empty))
        .is_some_and(|stmt| is_terminating(stmt, label))
}

fn is_terminating(stmt: &Stmt, label: Option<&str>) -> bool {
    match &stmt.kind {
        StmtKind::Return(_) => true,
        StmtKind::Branch {
            keyword: BranchKeyword::Goto,
            ..
        } => true,
        StmtKind::Expr(x) => match &x.unparen().kind {
            ExprKind::Call(call) => call.fun.as_ident().is_some_and(|f| f.name == "panic"),
            _ => false,
        },
        StmtKind::Block(block) => is_terminating_list(&block.stmts, None),
        StmtKind::If(stmt) => {
            stmt.els.as_ref().is_some_and(|els| is_terminating(els, None))
                && is_terminating_list(&stmt.body.stmts, None)
        }
        StmtKind::Labeled { label, stmt } => is_terminating(stmt, Some(&label.name)),
        StmtKind::For(stmt) => stmt.cond.is_none() && !has_break_list(&stmt.body.stmts, label, true),
        StmtKind::Switch(stmt) => {
            stmt.clauses.iter().any(|c| c.exprs.is_none())
                && stmt.clauses.iter().all(|c| {
                    is_terminating_list(&c.body, None) || ends_in_fallthrough(&c.body)
                })
                && !stmt.clauses.iter().any(|c| has_break_list(&c.body, label, true))
        }
        StmtKind::TypeSwitch(stmt) => {
            stmt.clauses.iter().any(|c| c.exprs.is_none())
                && stmt.clauses.iter().all(|c| is_terminating_list(&c.body, None))
                && !stmt.clauses.iter().any(|c| has_break_list(&c.body, label, true))
        }
        StmtKind::Select(clauses) => clauses
            .iter()
            .all(|c| is_terminating_list(&c.body, None) && !has_break_list(&c.body, label, true)),
        _ => false,
    }
}

fn ends_in_fallthrough(stmts: &[Stmt]) -> bool {
    matches!(
        stmts.last().map(|s| &s.kind),
        Some(StmtKind::Branch {
            keyword: BranchKeyword::Fallthrough,
            ..
        })
    )
}

/// Whether `stmts` contain a `break` leaving the enclosing statement:
/// an unlabeled one while `implicit` holds, or one naming `label`.
fn has_break_list(stmts: &[Stmt], label: Option<&str>, implicit: bool) -> bool {
    stmts.iter().any(|stmt| has_break(stmt, label, implicit))
}

fn has_break(stmt: &Stmt, label: Option<&str>, implicit: bool) -> bool {
    match &stmt.kind {
        StmtKind::Branch {
            keyword: BranchKeyword::Break,
            label: target,
        } => match target {
            None => implicit,
            Some(target) => Some(target.name.as_str()) == label,
        },
        StmtKind::Block(block) => has_break_list(&block.stmts, label, implicit),
        StmtKind::If(stmt) => {
            has_break_list(&stmt.body.stmts, label, implicit)
                || stmt.els.as_ref().is_some_and(|els| has_break(els, label, implicit))
        }
        StmtKind::Labeled { stmt, .. } => has_break(stmt, label, implicit),
        StmtKind::For(stmt) => has_break_list(&stmt.body.stmts, label, false),
        StmtKind::Range(stmt) => has_break_list(&stmt.body.stmts, label, false),
        StmtKind::Switch(stmt) => stmt.clauses.iter().any(|c| has_break_list(&c.body, label, false)),
        StmtKind::TypeSwitch(stmt) => stmt.clauses.iter().any(|c| has_break_list(&c.body, label, false)),
        StmtKind::Select(clauses) => clauses.iter().any(|c| has_break_list(&c.body, label, false)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_file;

    fn check_source(source: &str) -> Result<(), String> {
        let file = parse_file(source).map_err(|err| format!("syntax: {}", err))?;
        check(&file, source).map_err(|err| err.to_string())
    }

    fn check_main(body: &str) -> Result<(), String> {
        check_source(&format!("package main\n\nfunc main() {{\n{}\n}}\n", body))
    }

    fn assert_ok(source: &str) {
        if let Err(err) = check_source(source) {
            panic!("unexpected error {} in\n{}", err, source);
        }
    }

    fn error_message(result: Result<(), String>) -> String {
        let err = result.expect_err("expected a type error");
        // Drop the `line:col: ` prefix.
        err.splitn(3, ':').nth(2).unwrap_or_default().trim().to_string()
    }

    #[test]
    fn test_accepts_factorial_program() {
        assert_ok(
            "package main

func factorial(n int) int {
	if n == 0 {
		return 1
	} else {
		return n * factorial(n-1)
	}
}

func main() {
	const x int = 4 + 2
	var y int = factorial(x)
	println(y)
}
",
        );
    }

    #[test]
    fn test_package_level_order_does_not_matter() {
        assert_ok(
            "package main

func main() {
	println(double(limit))
}

func double(v int) int { return v * 2 }

const limit = 10
",
        );
    }

    #[test]
    fn test_undefined_name() {
        let err = check_main("x := y").unwrap_err();
        assert_eq!(err, "4:6: undefined: y");
    }

    #[test]
    fn test_declared_and_not_used() {
        let err = check_main("x := 1").unwrap_err();
        assert_eq!(err, "4:1: declared and not used: x");
        // Only assigning does not count as a use.
        assert_eq!(
            error_message(check_main("var x int = 1\nx = 2")),
            "declared and not used: x"
        );
        assert!(check_main("x := 1\nx++").is_ok());
    }

    #[test]
    fn test_redeclaration() {
        assert_eq!(
            error_message(check_main("var a int = 1\nvar a int = 2\nprintln(a)")),
            "a redeclared in this block"
        );
        assert_eq!(
            error_message(check_source("package p\nfunc f() {}\nfunc f() {}\n")),
            "f redeclared in this block"
        );
    }

    #[test]
    fn test_mismatched_binary_operands() {
        assert_eq!(
            error_message(check_main("var a int = 1\nvar b float64 = 2\nprintln(a + b)")),
            "invalid operation: a + b (mismatched types int and float64)"
        );
        // Untyped constants adapt to the other operand.
        assert!(check_main("var b float64 = 2\nprintln(b * 2)").is_ok());
    }

    #[test]
    fn test_operator_not_defined() {
        assert_eq!(
            error_message(check_main("var f float64 = 1\nprintln(f % 2)")),
            "invalid operation: operator % not defined on f (variable of type float64)"
        );
        assert_eq!(
            error_message(check_main("var n int = 1\nprintln(!n)")),
            "invalid operation: operator ! not defined on n (variable of type int)"
        );
    }

    #[test]
    fn test_non_boolean_condition() {
        assert_eq!(
            error_message(check_main("x := 1\nif x {\n}")),
            "non-boolean condition in if statement"
        );
    }

    #[test]
    fn test_assignability() {
        assert_eq!(
            error_message(check_main("var f float64 = 1\nvar i int = f\nprintln(i)")),
            "cannot use f (variable of type float64) as int value in variable declaration"
        );
        assert_eq!(
            error_message(check_main("var b bool = 1\nprintln(b)")),
            "cannot use 1 (untyped int constant) as bool value in variable declaration"
        );
    }

    #[test]
    fn test_call_arity_and_arguments() {
        let source = |call: &str| {
            format!(
                "package main\n\nfunc add(a, b int) int {{ return a + b }}\n\nfunc main() {{\n\tprintln({})\n}}\n",
                call
            )
        };
        assert_eq!(
            error_message(check_source(&source("add(1)"))),
            "not enough arguments in call to add"
        );
        assert_eq!(
            error_message(check_source(&source("add(1, 2, 3)"))),
            "too many arguments in call to add"
        );
        assert_eq!(
            error_message(check_source(&source("add(1, true)"))),
            "cannot use true (untyped bool constant) as int value in argument to add"
        );
        assert!(check_source(&source("add(1, 2)")).is_ok());
    }

    #[test]
    fn test_multi_value_and_no_value() {
        let source = |body: &str| {
            format!(
                "package main\n\nfunc pair() (int, int) {{ return 1, 2 }}\n\nfunc none() {{}}\n\nfunc main() {{\n{}\n}}\n",
                body
            )
        };
        assert_eq!(
            error_message(check_source(&source("x := pair() + 1\nprintln(x)"))),
            "multiple-value pair() (value of type (int, int)) in single-value context"
        );
        assert_eq!(
            error_message(check_source(&source("x := none()\nprintln(x)"))),
            "none() (no value) used as value"
        );
        assert!(check_source(&source("a, b := pair()\nprintln(a, b)")).is_ok());
        assert_eq!(
            error_message(check_source(&source("a, b, c := pair()\nprintln(a, b, c)"))),
            "assignment mismatch: 3 variables but pair() returns 2 values"
        );
    }

    #[test]
    fn test_assignment_rules() {
        assert_eq!(
            error_message(check_main("a, b := 1\nprintln(a, b)")),
            "assignment mismatch: 2 variables but 1 value"
        );
        assert_eq!(
            error_message(check_main("a := 1\na := 2\nprintln(a)")),
            "no new variables on left side of :="
        );
        assert_eq!(
            error_message(check_main("const c = 1\nc = 2")),
            "cannot assign to c (neither addressable nor a map index expression)"
        );
    }

    #[test]
    fn test_constant_initializers() {
        assert_eq!(
            error_message(check_source(
                "package main\n\nfunc f() int { return 1 }\n\nconst c = f()\n\nfunc main() {}\n"
            )),
            "f() (value of type int) is not constant"
        );
        assert_eq!(
            error_message(check_main("x := iota\nprintln(x)")),
            "cannot use iota outside constant declaration"
        );
        assert!(check_source("package main\n\nconst (\n\tA = iota\n\tB\n\tC\n)\n\nfunc main() { println(A, B, C) }\n").is_ok());
    }

    #[test]
    fn test_return_values() {
        assert_eq!(
            error_message(check_source("package p\n\nfunc f() int {\n\treturn\n}\n")),
            "not enough return values"
        );
        assert_eq!(
            error_message(check_source("package p\n\nfunc f() {\n\treturn 1\n}\n")),
            "too many return values"
        );
        assert_eq!(
            error_message(check_source("package p\n\nfunc f() (int, bool) {\n\treturn 1, 2\n}\n")),
            "cannot use 2 (untyped int constant) as bool value in return statement"
        );
        assert!(check_source("package p\n\nfunc f() (n int) {\n\tn = 2\n\treturn\n}\n").is_ok());
    }

    #[test]
    fn test_missing_return() {
        let err = check_source("package p\n\nfunc f(x int) int {\n\tif x > 0 {\n\t\treturn 1\n\t}\n}\n")
            .unwrap_err();
        assert_eq!(err, "7:1: missing return");
        assert_ok("package p\n\nfunc f(x int) int {\n\tif x > 0 {\n\t\treturn 1\n\t} else {\n\t\treturn 2\n\t}\n}\n");
        assert_ok("package p\n\nfunc f() int {\n\tfor {\n\t}\n}\n");
        assert_ok("package p\n\nfunc f() int {\n\tpanic(\"unreachable\")\n}\n");
        assert_eq!(
            error_message(check_source("package p\n\nfunc f() int {\n\tfor {\n\t\tbreak\n\t}\n}\n")),
            "missing return"
        );
    }

    #[test]
    fn test_imports_are_not_resolved() {
        assert_eq!(
            check_source("package main\n\nimport \"fmt\"\n\nfunc main() { fmt.Println(1) }\n").unwrap_err(),
            "3:8: could not import fmt (no importer configured)"
        );
    }

    #[test]
    fn test_missing_function_body() {
        assert_eq!(
            error_message(check_source("package p\n\nfunc external(x int) int\n")),
            "missing function body"
        );
    }

    #[test]
    fn test_branch_statements() {
        assert_eq!(
            error_message(check_main("break")),
            "break is not in a loop, switch, or select"
        );
        assert_eq!(
            error_message(check_main("for {\n}\ncontinue")),
            "continue is not in a loop"
        );
        assert_eq!(
            error_message(check_main("L:\n\tfor {\n\t}")),
            "label L declared and not used"
        );
    }

    #[test]
    fn test_unsupported_constructs_still_type_check() {
        assert_ok(
            "package main

type point struct {
	x, y int
}

func (p point) sum() int { return p.x + p.y }

func main() {
	values := []int{1, 2, 3}
	total := 0
	for _, v := range values {
		total += v
	}
	switch total {
	case 6:
		println(\"six\")
	default:
	}
	p := point{x: 1, y: 2}
	go println(p.sum())
	for i := 0; i < 3; i++ {
		total -= i
	}
	println(total, len(values))
}
",
        );
    }

    #[test]
    fn test_closures_capture_outer_variables() {
        assert_ok(
            "package main

func main() {
	count := 0
	inc := func(by int) int {
		count += by
		return count
	}
	println(inc(2))
}
",
        );
    }

    #[test]
    fn test_conversions() {
        assert!(check_main("var i int = 3\nvar f float64 = float64(i)\nprintln(f)").is_ok());
        assert_eq!(
            error_message(check_main("var b bool = true\nprintln(int(b))")),
            "cannot convert b (variable of type bool) to type int"
        );
    }

    #[test]
    fn test_constants_must_be_representable() {
        assert_eq!(
            error_message(check_main("var x int = 1.5\nprintln(x)")),
            "cannot use 1.5 (untyped float constant) as int value in variable declaration (truncated)"
        );
        assert_eq!(
            error_message(check_main("var x int = 9223372036854775808\nprintln(x)")),
            "cannot use 9223372036854775808 (untyped int constant) as int value in variable declaration (overflows)"
        );
        assert_eq!(
            error_message(check_main("x := 1e400\nprintln(x)")),
            "cannot use 1e400 (untyped float constant) as float64 value in assignment (overflows)"
        );
        assert_eq!(
            error_message(check_main("const big = 1 << 62\nvar x int32 = big\nprintln(x)")),
            "cannot use big (untyped int constant 4611686018427387904) as int32 value in variable declaration (overflows)"
        );
        assert_eq!(
            error_message(check_source(
                "package main\n\nconst (\n\tA = iota * 100\n\tB\n\tC\n)\n\nvar small int8 = C\n\nfunc main() {}\n"
            )),
            "cannot use C (untyped int constant 200) as int8 value in variable declaration (overflows)"
        );
        assert_ok(
            "package main

const quarter = 10 / 4

func main() {
	var x int = 2.0
	var u uint64 = 1 << 63
	var f float32 = 1e38
	var y int8 = quarter * 50
	println(x, u, f, y)
}
",
        );
    }

    #[test]
    fn test_constant_operands_convert_to_the_other_type() {
        assert_eq!(
            error_message(check_main("var b int8 = 1\nprintln(b + 300)")),
            "300 (untyped int constant) overflows int8"
        );
        assert_eq!(
            error_message(check_main("var i int = 1\nprintln(i * 2.5)")),
            "2.5 (untyped float constant) truncated to int"
        );
        assert_eq!(
            error_message(check_main("const c int8 = 100\nprintln(c * 2)")),
            "c * 2 (constant 200 of type int8) overflows int8"
        );
        assert_eq!(
            error_message(check_main("println(int8(300))")),
            "constant 300 overflows int8"
        );
        assert_eq!(
            error_message(check_main("println(int(2.5))")),
            "cannot convert 2.5 (untyped float constant) to type int (truncated)"
        );
    }

    #[test]
    fn test_division_by_constant_zero() {
        assert_eq!(
            error_message(check_main("x := 4\nprintln(x / 0)")),
            "invalid operation: division by zero"
        );
        assert_eq!(
            error_message(check_main("const n = 1\nprintln(2 % (n - 1))")),
            "invalid operation: division by zero"
        );
        assert!(check_main("var f float64 = 1\nprintln(f / 0)").is_ok());
    }

    #[test]
    fn test_initialization_cycles() {
        assert_eq!(
            check_source("package main\n\nvar a int = b\n\nvar b int = a\n\nfunc main() {}\n").unwrap_err(),
            "3:5: initialization cycle for a"
        );
        assert_eq!(
            error_message(check_source(
                "package main\n\nvar x int = next()\n\nfunc next() int { return x + 1 }\n\nfunc main() {}\n"
            )),
            "initialization cycle for x"
        );
        assert_eq!(
            error_message(check_source("package main\n\nvar x int = x\n\nfunc main() {}\n")),
            "initialization cycle: x refers to itself"
        );
        assert_eq!(
            error_message(check_source(
                "package main\n\nvar f func() int = func() int { return count }\n\nvar count int = f()\n\nfunc main() {}\n"
            )),
            "initialization cycle for f"
        );
        assert_ok(
            "package main

var total int = 1

func bump() { total = total + 1 }

var start int = twice(3)

func twice(v int) int { return v * 2 }

func main() {
	bump()
	println(start)
}
",
        );
    }

    #[test]
    fn test_type_switch() {
        assert_ok(
            "package main

func main() {
	var v any = 1
	switch t := v.(type) {
	case int:
		println(t + 1)
	case nil:
	}
}
",
        );
        assert_eq!(
            error_message(check_main("x := 1\nswitch x.(type) {\n}")),
            "x (variable of type int) is not an interface"
        );
        assert_eq!(
            error_message(check_main("var v any = 1\nswitch t := v.(type) {\ncase int:\n}")),
            "declared and not used: t"
        );
    }

    #[test]
    fn test_unused_expression() {
        assert_eq!(
            error_message(check_main("x := 1\nx + 1")),
            "x + 1 (value of type int) is not used"
        );
    }
}
