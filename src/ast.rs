use std::rc::Rc;

use crate::types::TypeExpr;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Eq,
    NotEq,
    Greater,
    Less,
    GreaterEq,
    LessEq,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

/// Compound assignment flavor. `Set` is plain `=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Set,
    Add,
    Sub,
    Mul,
    Div,
}

/// Left-hand side of an assignment: an identifier followed by zero or more
/// field/index steps, resolved left-to-right at evaluation time.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignTarget {
    pub name: Rc<str>,
    pub path: Vec<AccessStep>,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AccessStep {
    Field(String),
    Index(Expr),
}

/// Function parameter. `ty` is the declared type if one was written;
/// `default` is evaluated at call time only when the argument is omitted.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Rc<str>,
    pub ty: Option<TypeExpr>,
    pub default: Option<Expr>,
}

/// Call argument: positional, or `name = value` named form.
#[derive(Debug, Clone, PartialEq)]
pub enum CallArg {
    Positional(Expr),
    Named { name: String, value: Expr },
}

/// One `when` clause of a try statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Handler {
    pub kind: String,
    pub binding: Option<Rc<str>>,
    pub body: Vec<Stmt>,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    VarDecl {
        name: Rc<str>,
        ty: Option<TypeExpr>,
        init: Option<Expr>,
        line: u32,
    },
    Assign {
        target: AssignTarget,
        op: AssignOp,
        value: Expr,
        line: u32,
    },
    Expr(Expr),
    Print {
        value: Expr,
        line: u32,
    },
    If {
        condition: Expr,
        then_branch: Vec<Stmt>,
        else_branch: Option<Vec<Stmt>>,
        line: u32,
    },
    While {
        condition: Expr,
        body: Vec<Stmt>,
        line: u32,
    },
    DoWhile {
        body: Vec<Stmt>,
        condition: Expr,
        line: u32,
    },
    For {
        init: Option<Box<Stmt>>,
        condition: Option<Expr>,
        step: Option<Box<Stmt>>,
        body: Vec<Stmt>,
        line: u32,
    },
    ForEach {
        var: Rc<str>,
        iterable: Expr,
        body: Vec<Stmt>,
        line: u32,
    },
    Break {
        line: u32,
    },
    Continue {
        line: u32,
    },
    Function {
        name: Rc<str>,
        params: Vec<Param>,
        return_ty: Option<TypeExpr>,
        body: Rc<Vec<Stmt>>,
        line: u32,
    },
    Return {
        value: Option<Expr>,
        line: u32,
    },
    Import {
        path: String,
        line: u32,
    },
    Try {
        body: Vec<Stmt>,
        handlers: Vec<Handler>,
        line: u32,
    },
    Raise {
        kind: String,
        args: Vec<Expr>,
        line: u32,
    },
    /// Type alias declaration: `name typeof type-expr;`
    TypeDef {
        name: String,
        ty: TypeExpr,
        line: u32,
    },
    /// Screen declaration. The body is held unevaluated; rendering is an
    /// external collaborator.
    Screen {
        name: Rc<str>,
        body: Vec<Stmt>,
        line: u32,
    },
}

impl Stmt {
    pub fn line(&self) -> u32 {
        match self {
            Stmt::VarDecl { line, .. }
            | Stmt::Assign { line, .. }
            | Stmt::Print { line, .. }
            | Stmt::If { line, .. }
            | Stmt::While { line, .. }
            | Stmt::DoWhile { line, .. }
            | Stmt::For { line, .. }
            | Stmt::ForEach { line, .. }
            | Stmt::Break { line }
            | Stmt::Continue { line }
            | Stmt::Function { line, .. }
            | Stmt::Return { line, .. }
            | Stmt::Import { line, .. }
            | Stmt::Try { line, .. }
            | Stmt::Raise { line, .. }
            | Stmt::TypeDef { line, .. }
            | Stmt::Screen { line, .. } => *line,
            Stmt::Expr(expr) => expr.line,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub line: u32,
}

impl Expr {
    pub fn new(kind: ExprKind, line: u32) -> Self {
        Self { kind, line }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Literal(Value),
    Identifier(Rc<str>),
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    FieldAccess {
        object: Box<Expr>,
        field: String,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    /// `.length` / `.size` postfix property.
    Length {
        object: Box<Expr>,
    },
    /// User-defined function call.
    Call {
        name: Rc<str>,
        args: Vec<CallArg>,
        line: u32,
    },
    /// Namespaced builtin call: `ns.name(args)`.
    BuiltinCall {
        namespace: String,
        name: String,
        args: Vec<Expr>,
        line: u32,
    },
    Array {
        elements: Vec<Expr>,
    },
    JsonObject {
        fields: Vec<(String, Expr)>,
    },
    Cast {
        expr: Box<Expr>,
        ty: TypeExpr,
    },
    TypeOf {
        expr: Box<Expr>,
    },
}
