use chumsky::prelude::*;

use crate::diagnostic::{line_col, Span};
use crate::interpreter::parser::ParseError;
use crate::token::{Token, TokenKind};

/// Maps a case-folded word to its keyword token, or an identifier.
/// Folding happens here, once per token; lookups never re-fold.
fn keyword(word: &str) -> TokenKind {
    let lower = word.to_ascii_lowercase();
    match lower.as_str() {
        "var" | "let" => TokenKind::Var,
        "if" => TokenKind::If,
        "then" => TokenKind::Then,
        "else" => TokenKind::Else,
        "while" => TokenKind::While,
        "do" => TokenKind::Do,
        "for" => TokenKind::For,
        "foreach" => TokenKind::ForEach,
        "in" => TokenKind::In,
        "break" | "exit" => TokenKind::Break,
        "continue" => TokenKind::Continue,
        "function" => TokenKind::Function,
        "return" => TokenKind::Return,
        "print" => TokenKind::Print,
        "import" => TokenKind::Import,
        "try" => TokenKind::Try,
        "exceptions" => TokenKind::Exceptions,
        "when" => TokenKind::When,
        "raise" => TokenKind::Raise,
        "exception" => TokenKind::Exception,
        "screen" => TokenKind::Screen,
        "cast" => TokenKind::Cast,
        "typeof" => TokenKind::TypeOf,
        "length" => TokenKind::Length,
        "size" => TokenKind::Size,
        "byte" => TokenKind::TyByte,
        "int" | "integer" => TokenKind::TyInt,
        "long" => TokenKind::TyLong,
        "float" => TokenKind::TyFloat,
        "double" => TokenKind::TyDouble,
        "bool" | "boolean" => TokenKind::TyBool,
        "string" => TokenKind::TyString,
        "date" => TokenKind::TyDate,
        "json" => TokenKind::TyJson,
        "array" => TokenKind::TyArray,
        "queue" => TokenKind::TyQueue,
        "record" => TokenKind::TyRecord,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        "null" => TokenKind::Null,
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        _ => TokenKind::Ident(lower),
    }
}

fn number(text: &str) -> TokenKind {
    if text.contains('.') {
        TokenKind::Num(text.parse().unwrap_or(0.0))
    } else if let Ok(n) = text.parse::<i32>() {
        TokenKind::Int(n)
    } else if let Ok(n) = text.parse::<i64>() {
        TokenKind::Long(n)
    } else {
        TokenKind::Num(text.parse().unwrap_or(0.0))
    }
}

pub fn lexer<'a>()
-> impl Parser<'a, &'a str, Vec<(TokenKind, SimpleSpan)>, extra::Err<Simple<'a, char>>> {
    let num = text::int(10)
        .then(just('.').then(text::digits(10)).or_not())
        .to_slice()
        .map(number);

    let escape = just('\\').ignore_then(choice((
        just('\\'),
        just('/'),
        just('"'),
        just('\''),
        just('n').to('\n'),
        just('r').to('\r'),
        just('t').to('\t'),
    )));

    // Two string forms, double and single quoted; payload case is preserved.
    let dq_string = just('"')
        .ignore_then(none_of("\\\"").or(escape).repeated().collect::<String>())
        .then_ignore(just('"'))
        .map(TokenKind::Str);

    let sq_string = just('\'')
        .ignore_then(none_of("\\'").or(escape).repeated().collect::<String>())
        .then_ignore(just('\''))
        .map(TokenKind::Str);

    let ident = text::ident().map(keyword);

    // Two-character operators must come before their one-character prefixes
    // so the cursor advances by exactly their width.
    let op_double = choice((
        just("==").to(TokenKind::Eq),
        just("!=").to(TokenKind::NotEq),
        just(">=").to(TokenKind::GreaterEq),
        just("<=").to(TokenKind::LessEq),
        just("=>").to(TokenKind::GreaterEq),
        just("=<").to(TokenKind::LessEq),
        just("&&").to(TokenKind::And),
        just("||").to(TokenKind::Or),
        just("++").to(TokenKind::PlusPlus),
        just("--").to(TokenKind::MinusMinus),
        just("+=").to(TokenKind::PlusEq),
        just("-=").to(TokenKind::MinusEq),
        just("*=").to(TokenKind::StarEq),
        just("/=").to(TokenKind::SlashEq),
    ));

    let op_single = choice((
        just('+').to(TokenKind::Plus),
        just('-').to(TokenKind::Minus),
        just('*').to(TokenKind::Star),
        just('/').to(TokenKind::Slash),
        just('%').to(TokenKind::Percent),
        just('^').to(TokenKind::Caret),
        just('>').to(TokenKind::Greater),
        just('<').to(TokenKind::Less),
        just('!').to(TokenKind::Bang),
        just('=').to(TokenKind::Assign),
        just('.').to(TokenKind::Dot),
        just(',').to(TokenKind::Comma),
        just(':').to(TokenKind::Colon),
        just(';').to(TokenKind::Semicolon),
        just('(').to(TokenKind::LParen),
        just(')').to(TokenKind::RParen),
        just('{').to(TokenKind::LBrace),
        just('}').to(TokenKind::RBrace),
        just('[').to(TokenKind::LBracket),
        just(']').to(TokenKind::RBracket),
    ));

    let comment = just("//")
        .then(any().and_is(just('\n').not()).repeated())
        .padded();

    let token = num
        .or(dq_string)
        .or(sq_string)
        .or(ident)
        .or(op_double)
        .or(op_single)
        .map_with(|kind, e| (kind, e.span()))
        .padded_by(comment.repeated())
        .padded();

    token.repeated().collect().then_ignore(end())
}

/// Lexes `source` into a line-tagged token stream.
pub fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
    match lexer().parse(source).into_result() {
        Ok(pairs) => {
            let tokens = pairs
                .into_iter()
                .map(|(kind, span)| {
                    let span = Span::new(span.start, span.end);
                    let (line, _) = line_col(source, span.start);
                    Token::new(kind, span, line as u32)
                })
                .collect();
            Ok(tokens)
        }
        Err(errors) => {
            let offset = errors
                .first()
                .map(|e| e.span().start)
                .unwrap_or(source.len());
            let (line, _) = line_col(source, offset);
            let message = describe_lex_failure(source, offset);
            Err(ParseError::new(message, line as u32))
        }
    }
}

fn describe_lex_failure(source: &str, offset: usize) -> String {
    // An error at end of input with an unbalanced quote earlier means a
    // string literal ran off the end of the source.
    let tail = &source[offset.min(source.len())..];
    match tail.chars().next() {
        Some(c) if c == '"' || c == '\'' => "unterminated string literal".to_string(),
        Some(c) => format!("illegal character `{}`", c),
        None => {
            if source.chars().filter(|&c| c == '"').count() % 2 == 1
                || source.chars().filter(|&c| c == '\'').count() % 2 == 1
            {
                "unterminated string literal".to_string()
            } else {
                "unexpected end of input".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .expect("lexer failed")
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_keywords_case_insensitive() {
        assert_eq!(lex("var"), vec![TokenKind::Var]);
        assert_eq!(lex("VAR"), vec![TokenKind::Var]);
        assert_eq!(lex("Let"), vec![TokenKind::Var]);
        assert_eq!(lex("WHILE"), vec![TokenKind::While]);
        assert_eq!(lex("ForEach"), vec![TokenKind::ForEach]);
        assert_eq!(lex("EXIT"), vec![TokenKind::Break]);
    }

    #[test]
    fn test_keyword_aliases() {
        assert_eq!(lex("exit"), lex("break"));
        assert_eq!(lex("let"), lex("var"));
        assert_eq!(lex("integer"), lex("int"));
        assert_eq!(lex("boolean"), lex("bool"));
        assert_eq!(lex("and"), lex("&&"));
        assert_eq!(lex("or"), lex("||"));
    }

    #[test]
    fn test_identifiers_fold_to_lowercase() {
        assert_eq!(lex("MyVar"), vec![TokenKind::Ident("myvar".to_string())]);
        assert_eq!(lex("COUNT"), vec![TokenKind::Ident("count".to_string())]);
    }

    #[test]
    fn test_string_payload_preserves_case() {
        assert_eq!(
            lex(r#""Hello World""#),
            vec![TokenKind::Str("Hello World".to_string())]
        );
        assert_eq!(
            lex("'MiXeD cAsE'"),
            vec![TokenKind::Str("MiXeD cAsE".to_string())]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            lex(r#""a\nb""#),
            vec![TokenKind::Str("a\nb".to_string())]
        );
        assert_eq!(
            lex(r#""quote\"inside""#),
            vec![TokenKind::Str("quote\"inside".to_string())]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(lex("42"), vec![TokenKind::Int(42)]);
        assert_eq!(lex("3.14"), vec![TokenKind::Num(3.14)]);
        assert_eq!(lex("0"), vec![TokenKind::Int(0)]);
        // Too wide for i32 widens to long
        assert_eq!(lex("3000000000"), vec![TokenKind::Long(3_000_000_000)]);
    }

    #[test]
    fn test_two_char_operators_consume_exact_width() {
        assert_eq!(lex("=="), vec![TokenKind::Eq]);
        assert_eq!(lex("!="), vec![TokenKind::NotEq]);
        assert_eq!(lex("<="), vec![TokenKind::LessEq]);
        assert_eq!(lex(">="), vec![TokenKind::GreaterEq]);
        assert_eq!(lex("++"), vec![TokenKind::PlusPlus]);
        assert_eq!(lex("--"), vec![TokenKind::MinusMinus]);
        assert_eq!(lex("+="), vec![TokenKind::PlusEq]);
        assert_eq!(lex("-="), vec![TokenKind::MinusEq]);
        assert_eq!(lex("*="), vec![TokenKind::StarEq]);
        assert_eq!(lex("/="), vec![TokenKind::SlashEq]);
    }

    #[test]
    fn test_two_char_operators_in_context() {
        // The cursor must not swallow the character after the operator.
        assert_eq!(
            lex("i+=1"),
            vec![
                TokenKind::Ident("i".to_string()),
                TokenKind::PlusEq,
                TokenKind::Int(1),
            ]
        );
        assert_eq!(
            lex("i++;"),
            vec![
                TokenKind::Ident("i".to_string()),
                TokenKind::PlusPlus,
                TokenKind::Semicolon,
            ]
        );
        assert_eq!(
            lex("a<=b"),
            vec![
                TokenKind::Ident("a".to_string()),
                TokenKind::LessEq,
                TokenKind::Ident("b".to_string()),
            ]
        );
        // Adjacent singles do not merge
        assert_eq!(
            lex("a = = b"),
            vec![
                TokenKind::Ident("a".to_string()),
                TokenKind::Assign,
                TokenKind::Assign,
                TokenKind::Ident("b".to_string()),
            ]
        );
    }

    #[test]
    fn test_comments_skipped() {
        assert_eq!(
            lex("var x = 1; // trailing\n// full line\nx"),
            vec![
                TokenKind::Var,
                TokenKind::Ident("x".to_string()),
                TokenKind::Assign,
                TokenKind::Int(1),
                TokenKind::Semicolon,
                TokenKind::Ident("x".to_string()),
            ]
        );
    }

    #[test]
    fn test_line_numbers() {
        let tokens = tokenize("var x = 1;\nvar y = 2;\n\nvar z = 3;").unwrap();
        assert_eq!(tokens[0].line, 1);
        let y_decl: Vec<u32> = tokens.iter().filter(|t| t.line == 2).map(|t| t.line).collect();
        assert_eq!(y_decl.len(), 5);
        assert_eq!(tokens.last().unwrap().line, 4);
    }

    #[test]
    fn test_unterminated_string_is_parse_error() {
        let err = tokenize("var s = \"oops;\nvar t = 1;").unwrap_err();
        assert!(err.message.contains("unterminated"), "got: {}", err.message);
    }

    #[test]
    fn test_illegal_character_is_parse_error() {
        let err = tokenize("var x = 1;\nvar y = ~2;").unwrap_err();
        assert_eq!(err.line, 2);
    }
}
