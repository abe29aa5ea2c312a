use crate::diagnostic::Span;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Keywords
    Var,
    If,
    Then,
    Else,
    While,
    Do,
    For,
    ForEach,
    In,
    Break,
    Continue,
    Function,
    Return,
    Print,
    Import,
    Try,
    Exceptions,
    When,
    Raise,
    Exception,
    Screen,
    Cast,
    TypeOf,
    Length,
    Size,

    // Type names
    TyByte,
    TyInt,
    TyLong,
    TyFloat,
    TyDouble,
    TyBool,
    TyString,
    TyDate,
    TyJson,
    TyArray,
    TyQueue,
    TyRecord,

    // Literals and identifiers. Identifiers are lowercased at creation;
    // string payloads preserve case.
    Ident(String),
    Int(i32),
    Long(i64),
    Num(f64),
    Str(String),
    True,
    False,
    Null,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    Eq,
    NotEq,
    Greater,
    Less,
    GreaterEq,
    LessEq,
    And,
    Or,
    Bang,
    Assign,
    PlusPlus,
    MinusMinus,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,

    // Delimiters
    Dot,
    Comma,
    Colon,
    Semicolon,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
}

/// A single lexed token. `line` is 1-based and computed once when the token
/// stream is built, never re-derived at lookup time.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub line: u32,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span, line: u32) -> Self {
        Self { kind, span, line }
    }
}
