// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Syntax tree for Go source files.
//!
//! The shapes follow the Go standard library's `go/ast` closely so that a tree
//! can represent every construct the parser accepts, including the ones later
//! stages reject. Each node can name its own kind (`ForStmt`, `CompositeLit`,
//! ...) for diagnostics.

use std::fmt::{self, Display, Formatter};

use itertools::Itertools;

use crate::token::{LitKind, Span};

/// A parsed source file.
#[derive(Debug, Clone, PartialEq)]
pub struct File {
    pub package: Ident,
    pub decls: Vec<Decl>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn is_blank(&self) -> bool {
        self.name == "_"
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BasicLit {
    pub kind: LitKind,
    /// Literal text exactly as written, quotes and prefixes included.
    pub value: String,
    pub span: Span,
}

// ============================================================================
// Declarations
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    Gen(GenDecl),
    Func(FuncDecl),
}

impl Decl {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Decl::Gen(_) => "GenDecl",
            Decl::Func(func) if func.recv.is_some() => "MethodDecl",
            Decl::Func(_) => "FuncDecl",
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Decl::Gen(gen) => gen.span,
            Decl::Func(func) => func.span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKeyword {
    Import,
    Const,
    Type,
    Var,
}

/// `const`, `var`, `type` or `import` declaration, single or parenthesized.
#[derive(Debug, Clone, PartialEq)]
pub struct GenDecl {
    pub keyword: DeclKeyword,
    /// Position of the opening parenthesis of a grouped declaration.
    pub lparen: Option<Span>,
    pub specs: Vec<Spec>,
    pub span: Span,
}

impl GenDecl {
    pub fn is_grouped(&self) -> bool {
        self.lparen.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Spec {
    Import(ImportSpec),
    Value(ValueSpec),
    Type(TypeSpec),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportSpec {
    pub name: Option<Ident>,
    pub path: BasicLit,
}

/// `names [Type] [= values]` inside a `const` or `var` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueSpec {
    pub names: Vec<Ident>,
    pub ty: Option<Expr>,
    pub values: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeSpec {
    pub name: Ident,
    pub type_params: Option<FieldList>,
    /// `type A = B` alias form.
    pub alias: bool,
    pub ty: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuncDecl {
    pub recv: Option<FieldList>,
    pub name: Ident,
    pub ty: FuncType,
    /// Absent for declarations implemented outside Go.
    pub body: Option<BlockStmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuncType {
    pub type_params: Option<FieldList>,
    pub params: FieldList,
    pub results: Option<FieldList>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldList {
    pub fields: Vec<Field>,
}

impl FieldList {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of entries once grouped names are expanded.
    pub fn arity(&self) -> usize {
        self.fields.iter().map(|f| f.names.len().max(1)).sum()
    }
}

/// One group of a parameter or result list: `a, b int` or just `int`.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub names: Vec<Ident>,
    pub ty: Expr,
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Ident(Ident),
    BasicLit(BasicLit),
    FuncLit(FuncLit),
    Paren(Box<Expr>),
    Selector {
        x: Box<Expr>,
        sel: Ident,
    },
    Index {
        x: Box<Expr>,
        index: Box<Expr>,
    },
    /// `x[low:high:max]`
    Slice {
        x: Box<Expr>,
        low: Option<Box<Expr>>,
        high: Option<Box<Expr>>,
        max: Option<Box<Expr>>,
    },
    /// `x.(T)`, or `x.(type)` inside a type switch when `ty` is absent.
    TypeAssert {
        x: Box<Expr>,
        ty: Option<Box<Expr>>,
    },
    Call(CallExpr),
    /// `*x`, either a dereference or a pointer type.
    Star(Box<Expr>),
    Unary {
        op: UnaryOp,
        x: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        x: Box<Expr>,
        y: Box<Expr>,
    },
    KeyValue {
        key: Box<Expr>,
        value: Box<Expr>,
    },
    CompositeLit {
        ty: Option<Box<Expr>>,
        elts: Vec<Expr>,
    },
    /// `[N]T`, or `[]T` when `len` is absent.
    ArrayType {
        len: Option<Box<Expr>>,
        elem: Box<Expr>,
    },
    MapType {
        key: Box<Expr>,
        value: Box<Expr>,
    },
    ChanType {
        dir: ChanDir,
        value: Box<Expr>,
    },
    StructType(FieldList),
    /// Methods carry their name and a `FuncType`; embedded elements have no names.
    InterfaceType(FieldList),
    FuncType(FuncType),
    /// `...T` in the last parameter position.
    Ellipsis(Option<Box<Expr>>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChanDir {
    Both,
    Send,
    Recv,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            ExprKind::Ident(_) => "Ident",
            ExprKind::BasicLit(_) => "BasicLit",
            ExprKind::FuncLit(_) => "FuncLit",
            ExprKind::Paren(_) => "ParenExpr",
            ExprKind::Selector { .. } => "SelectorExpr",
            ExprKind::Index { .. } => "IndexExpr",
            ExprKind::Slice { .. } => "SliceExpr",
            ExprKind::TypeAssert { .. } => "TypeAssertExpr",
            ExprKind::Call(_) => "CallExpr",
            ExprKind::Star(_) => "StarExpr",
            ExprKind::Unary { .. } => "UnaryExpr",
            ExprKind::Binary { .. } => "BinaryExpr",
            ExprKind::KeyValue { .. } => "KeyValueExpr",
            ExprKind::CompositeLit { .. } => "CompositeLit",
            ExprKind::ArrayType { .. } => "ArrayType",
            ExprKind::MapType { .. } => "MapType",
            ExprKind::ChanType { .. } => "ChanType",
            ExprKind::StructType(_) => "StructType",
            ExprKind::InterfaceType(_) => "InterfaceType",
            ExprKind::FuncType(_) => "FuncType",
            ExprKind::Ellipsis(_) => "Ellipsis",
        }
    }

    /// Strips any number of enclosing parentheses.
    pub fn unparen(&self) -> &Expr {
        match &self.kind {
            ExprKind::Paren(inner) => inner.unparen(),
            _ => self,
        }
    }

    pub fn as_ident(&self) -> Option<&Ident> {
        match &self.kind {
            ExprKind::Ident(ident) => Some(ident),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuncLit {
    pub ty: FuncType,
    pub body: BlockStmt,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    pub fun: Box<Expr>,
    pub args: Vec<Expr>,
    /// `f(xs...)`
    pub has_ellipsis: bool,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Neg,
    Not,
    BitNot,
    Addr,
    Recv,
    /// `~T` in constraint position.
    Tilde,
}

impl UnaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "^",
            UnaryOp::Addr => "&",
            UnaryOp::Recv => "<-",
            UnaryOp::Tilde => "~",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Quo,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    AndNot,
    LAnd,
    LOr,
    Eql,
    Neq,
    Lss,
    Leq,
    Gtr,
    Geq,
}

impl BinaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Quo => "/",
            BinaryOp::Rem => "%",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::Xor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::AndNot => "&^",
            BinaryOp::LAnd => "&&",
            BinaryOp::LOr => "||",
            BinaryOp::Eql => "==",
            BinaryOp::Neq => "!=",
            BinaryOp::Lss => "<",
            BinaryOp::Leq => "<=",
            BinaryOp::Gtr => ">",
            BinaryOp::Geq => ">=",
        }
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Eql | BinaryOp::Neq | BinaryOp::Lss | BinaryOp::Leq | BinaryOp::Gtr | BinaryOp::Geq
        )
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOp::LAnd | BinaryOp::LOr)
    }

    pub fn is_shift(&self) -> bool {
        matches!(self, BinaryOp::Shl | BinaryOp::Shr)
    }

    /// Operators defined on integers only.
    pub fn is_integer_only(&self) -> bool {
        matches!(
            self,
            BinaryOp::Rem | BinaryOp::And | BinaryOp::Or | BinaryOp::Xor | BinaryOp::AndNot
        )
    }
}

// ============================================================================
// Statements
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Decl(GenDecl),
    Empty,
    Labeled {
        label: Ident,
        stmt: Box<Stmt>,
    },
    Expr(Expr),
    IncDec {
        x: Expr,
        inc: bool,
    },
    Assign {
        lhs: Vec<Expr>,
        op: AssignOp,
        rhs: Vec<Expr>,
    },
    /// `ch <- v`
    Send {
        chan: Expr,
        value: Expr,
    },
    Go(CallExpr),
    Defer(CallExpr),
    Return(Vec<Expr>),
    Branch {
        keyword: BranchKeyword,
        label: Option<Ident>,
    },
    Block(BlockStmt),
    If(IfStmt),
    For(ForStmt),
    Range(RangeStmt),
    Switch(SwitchStmt),
    TypeSwitch(TypeSwitchStmt),
    Select(Vec<CommClause>),
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            StmtKind::Decl(_) => "DeclStmt",
            StmtKind::Empty => "EmptyStmt",
            StmtKind::Labeled { .. } => "LabeledStmt",
            StmtKind::Expr(_) => "ExprStmt",
            StmtKind::IncDec { .. } => "IncDecStmt",
            StmtKind::Assign { .. } => "AssignStmt",
            StmtKind::Send { .. } => "SendStmt",
            StmtKind::Go(_) => "GoStmt",
            StmtKind::Defer(_) => "DeferStmt",
            StmtKind::Return(_) => "ReturnStmt",
            StmtKind::Branch { .. } => "BranchStmt",
            StmtKind::Block(_) => "BlockStmt",
            StmtKind::If(_) => "IfStmt",
            StmtKind::For(_) => "ForStmt",
            StmtKind::Range(_) => "RangeStmt",
            StmtKind::Switch(_) => "SwitchStmt",
            StmtKind::TypeSwitch(_) => "TypeSwitchStmt",
            StmtKind::Select(_) => "SelectStmt",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Define,
    Add,
    Sub,
    Mul,
    Quo,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    AndNot,
}

impl AssignOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::Define => ":=",
            AssignOp::Add => "+=",
            AssignOp::Sub => "-=",
            AssignOp::Mul => "*=",
            AssignOp::Quo => "/=",
            AssignOp::Rem => "%=",
            AssignOp::And => "&=",
            AssignOp::Or => "|=",
            AssignOp::Xor => "^=",
            AssignOp::Shl => "<<=",
            AssignOp::Shr => ">>=",
            AssignOp::AndNot => "&^=",
        }
    }

    /// The binary operator a compound assignment applies.
    pub fn binary_op(&self) -> Option<BinaryOp> {
        Some(match self {
            AssignOp::Assign | AssignOp::Define => return None,
            AssignOp::Add => BinaryOp::Add,
            AssignOp::Sub => BinaryOp::Sub,
            AssignOp::Mul => BinaryOp::Mul,
            AssignOp::Quo => BinaryOp::Quo,
            AssignOp::Rem => BinaryOp::Rem,
            AssignOp::And => BinaryOp::And,
            AssignOp::Or => BinaryOp::Or,
            AssignOp::Xor => BinaryOp::Xor,
            AssignOp::Shl => BinaryOp::Shl,
            AssignOp::Shr => BinaryOp::Shr,
            AssignOp::AndNot => BinaryOp::AndNot,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchKeyword {
    Break,
    Continue,
    Goto,
    Fallthrough,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockStmt {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    pub init: Option<Box<Stmt>>,
    pub cond: Expr,
    pub body: BlockStmt,
    /// Either a block or a nested `if` statement.
    pub els: Option<Box<Stmt>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForStmt {
    pub init: Option<Box<Stmt>>,
    pub cond: Option<Expr>,
    pub post: Option<Box<Stmt>>,
    pub body: BlockStmt,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RangeStmt {
    pub key: Option<Expr>,
    pub value: Option<Expr>,
    /// `:=` or `=` when key/value are present.
    pub op: Option<AssignOp>,
    pub x: Expr,
    pub body: BlockStmt,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchStmt {
    pub init: Option<Box<Stmt>>,
    pub tag: Option<Expr>,
    pub clauses: Vec<CaseClause>,
}

/// `case a, b:` or `default:` when `exprs` is `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseClause {
    pub exprs: Option<Vec<Expr>>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

/// `switch [init;] [x :=] y.(type) { ... }`; `assign` holds the guard statement.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeSwitchStmt {
    pub init: Option<Box<Stmt>>,
    pub assign: Box<Stmt>,
    pub clauses: Vec<CaseClause>,
}

/// `case <send or receive>:` or `default:` when `comm` is `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct CommClause {
    pub comm: Option<Box<Stmt>>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

// ============================================================================
// Printing
// ============================================================================

/// Prints expressions the way Go diagnostics quote them: `x + y`, `f(a, b)`,
/// `map[string]int{…}`.
impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Ident(ident) => write!(f, "{}", ident.name),
            ExprKind::BasicLit(lit) => write!(f, "{}", lit.value),
            ExprKind::FuncLit(lit) => write!(f, "({} literal)", lit.ty),
            ExprKind::Paren(x) => write!(f, "({})", x),
            ExprKind::Selector { x, sel } => write!(f, "{}.{}", x, sel.name),
            ExprKind::Index { x, index } => write!(f, "{}[{}]", x, index),
            ExprKind::Slice { x, low, high, max } => {
                write!(f, "{}[", x)?;
                if let Some(low) = low {
                    write!(f, "{}", low)?;
                }
                write!(f, ":")?;
                if let Some(high) = high {
                    write!(f, "{}", high)?;
                }
                if let Some(max) = max {
                    write!(f, ":{}", max)?;
                }
                write!(f, "]")
            }
            ExprKind::TypeAssert { x, ty: Some(ty) } => write!(f, "{}.({})", x, ty),
            ExprKind::TypeAssert { x, ty: None } => write!(f, "{}.(type)", x),
            ExprKind::Call(call) => write!(f, "{}", call),
            ExprKind::Star(x) => write!(f, "*{}", x),
            ExprKind::Unary { op, x } => write!(f, "{}{}", op.as_str(), x),
            ExprKind::Binary { op, x, y } => write!(f, "{} {} {}", x, op.as_str(), y),
            ExprKind::KeyValue { key, value } => write!(f, "{}: {}", key, value),
            ExprKind::CompositeLit { ty: Some(ty), .. } => write!(f, "{}{{…}}", ty),
            ExprKind::CompositeLit { ty: None, .. } => write!(f, "{{…}}"),
            ExprKind::ArrayType { len: Some(len), elem } => write!(f, "[{}]{}", len, elem),
            ExprKind::ArrayType { len: None, elem } => write!(f, "[]{}", elem),
            ExprKind::MapType { key, value } => write!(f, "map[{}]{}", key, value),
            ExprKind::ChanType { dir, value } => match dir {
                ChanDir::Both => write!(f, "chan {}", value),
                ChanDir::Send => write!(f, "chan<- {}", value),
                ChanDir::Recv => write!(f, "<-chan {}", value),
            },
            ExprKind::StructType(fields) => write!(f, "struct{{{}}}", fields.display("; ")),
            ExprKind::InterfaceType(fields) => {
                write!(f, "interface{{{}}}", fields.display("; "))
            }
            ExprKind::FuncType(ty) => write!(f, "{}", ty),
            ExprKind::Ellipsis(Some(elem)) => write!(f, "...{}", elem),
            ExprKind::Ellipsis(None) => write!(f, "..."),
        }
    }
}

impl Display for CallExpr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}", self.fun, self.args.iter().join(", "))?;
        if self.has_ellipsis {
            write!(f, "...")?;
        }
        write!(f, ")")
    }
}

impl Display for FuncType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "func({})", self.params.display(", "))?;
        match &self.results {
            Some(results) if results.fields.len() == 1 && results.fields[0].names.is_empty() => {
                write!(f, " {}", results.fields[0].ty)
            }
            Some(results) if !results.is_empty() => write!(f, " ({})", results.display(", ")),
            _ => Ok(()),
        }
    }
}

impl FieldList {
    fn display(&self, separator: &str) -> String {
        self.fields
            .iter()
            .map(|field| match field.names.is_empty() {
                true => field.ty.to_string(),
                false => format!(
                    "{} {}",
                    field.names.iter().map(|n| n.name.as_str()).join(", "),
                    field.ty
                ),
            })
            .join(separator)
    }
}
