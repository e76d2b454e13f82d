use super::*;

fn kinds(src: &str) -> Vec<TokenKind> {
    let mut scanner = Scanner::new(src);
    let mut out = Vec::new();
    loop {
        let token = scanner.scan_token();
        let done = token.kind == TokenKind::Eof;
        out.push(token.kind);
        if done {
            break;
        }
    }
    out
}

#[test]
fn scans_punctuation_and_operators() {
    assert_eq!(
        kinds("<- -> == != <= >= ~ ?"),
        vec![
            TokenKind::Arrow,
            TokenKind::RightArrow,
            TokenKind::EqualEqual,
            TokenKind::BangEqual,
            TokenKind::LessEqual,
            TokenKind::GreaterEqual,
            TokenKind::Tilde,
            TokenKind::Question,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn skips_percent_comments() {
    let mut scanner = Scanner::new("% this is a comment\n42");
    let token = scanner.scan_token();
    assert_eq!(token.kind, TokenKind::Number);
    assert_eq!(token.lexeme, "42");
}

#[test]
fn recognizes_keywords() {
    assert_eq!(
        kinds("set func puts class case match"),
        vec![
            TokenKind::Var,
            TokenKind::Fun,
            TokenKind::Print,
            TokenKind::Class,
            TokenKind::Case,
            TokenKind::Match,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn strings_have_no_escape_processing() {
    let mut scanner = Scanner::new(r#""a\nb""#);
    let token = scanner.scan_token();
    assert_eq!(token.kind, TokenKind::String);
    assert_eq!(token.lexeme, r#""a\nb""#);
}

#[test]
fn unterminated_string_is_an_error_token() {
    let mut scanner = Scanner::new("\"never closed");
    let token = scanner.scan_token();
    assert_eq!(token.kind, TokenKind::Error);
    assert_eq!(token.lexeme, "Non-terminated string.");
}

#[test]
fn numbers_allow_one_decimal_point() {
    let mut scanner = Scanner::new("3.14");
    let token = scanner.scan_token();
    assert_eq!(token.kind, TokenKind::Number);
    assert_eq!(token.lexeme, "3.14");
}

#[test]
fn tracks_line_numbers_across_newlines() {
    let mut scanner = Scanner::new("set\na\n<-\n1.");
    let lines: Vec<u32> = (0..5).map(|_| scanner.scan_token().line).collect();
    assert_eq!(lines, vec![1, 2, 3, 4, 4]);
}
