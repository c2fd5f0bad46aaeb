//! Small pure-Rust JavaScript minifier for the hydration runtime.
//!
//! Two passes: comments are stripped, then whitespace is collapsed to a single
//! space where two word characters would otherwise merge and removed
//! everywhere else. String and template literals pass through untouched.
//!
//! The minifier does not understand regular-expression literals or automatic
//! semicolon insertion, so its input must terminate statements explicitly and
//! keep regex literals free of quotes and `//`. The bundled runtime is written
//! that way.

use crate::error::SynthesisError;

enum State {
    Normal,
    AfterSlash,
    InString(char),
    InStringEscape(char),
    InBlockComment,
    InBlockCommentEnd,
    InLineComment,
}

/// Remove `/* */` and `//` comments outside string literals.
pub fn strip_comments(input: &str) -> Result<String, SynthesisError> {
    let mut output = String::with_capacity(input.len());
    let mut state = State::Normal;

    for ch in input.chars() {
        state = match state {
            State::Normal => {
                output.push(ch);
                match ch {
                    '"' | '\'' | '`' => State::InString(ch),
                    '/' => State::AfterSlash,
                    _ => State::Normal,
                }
            }
            State::AfterSlash => match ch {
                '*' => {
                    output.pop();
                    State::InBlockComment
                }
                '/' => {
                    output.pop();
                    State::InLineComment
                }
                '"' | '\'' | '`' => {
                    output.push(ch);
                    State::InString(ch)
                }
                _ => {
                    // Division or a regex: keep the character.
                    output.push(ch);
                    State::Normal
                }
            },
            State::InString(quote) => {
                output.push(ch);
                if ch == '\\' {
                    State::InStringEscape(quote)
                } else if ch == quote {
                    State::Normal
                } else {
                    State::InString(quote)
                }
            }
            State::InStringEscape(quote) => {
                output.push(ch);
                State::InString(quote)
            }
            State::InBlockComment => {
                if ch == '*' {
                    State::InBlockCommentEnd
                } else {
                    State::InBlockComment
                }
            }
            State::InBlockCommentEnd => match ch {
                '/' => {
                    // Keep tokens on either side of the comment apart.
                    output.push(' ');
                    State::Normal
                }
                '*' => State::InBlockCommentEnd,
                _ => State::InBlockComment,
            },
            State::InLineComment => {
                if ch == '\n' || ch == '\r' {
                    output.push(ch);
                    State::Normal
                } else {
                    State::InLineComment
                }
            }
        };
    }

    match state {
        State::InString(q) | State::InStringEscape(q) => Err(SynthesisError::Minify(format!(
            "unterminated {q} string literal"
        ))),
        State::InBlockComment | State::InBlockCommentEnd => Err(SynthesisError::Minify(
            "unterminated block comment".to_string(),
        )),
        _ => Ok(output),
    }
}

/// Drop whitespace that the grammar does not need.
pub fn collapse_whitespace(input: &str) -> Result<String, SynthesisError> {
    let mut out = String::with_capacity(input.len());
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut pending_space = false;

    for ch in input.chars() {
        if let Some(q) = quote {
            out.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }

        if ch.is_whitespace() {
            pending_space = true;
            continue;
        }

        if pending_space {
            maybe_push_space(&mut out, ch);
            pending_space = false;
        }
        if matches!(ch, '"' | '\'' | '`') {
            quote = Some(ch);
        }
        out.push(ch);
    }

    if let Some(q) = quote {
        return Err(SynthesisError::Minify(format!(
            "unterminated {q} string literal"
        )));
    }
    Ok(out)
}

fn is_word_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '$' || !ch.is_ascii()
}

fn maybe_push_space(out: &mut String, next: char) {
    let Some(prev) = out.chars().last() else {
        return;
    };
    // `a + +b` and `a - -b` must not fuse into `++` / `--`.
    if (prev == '+' || prev == '-') && prev == next {
        out.push(' ');
        return;
    }
    if is_word_char(prev) && is_word_char(next) {
        out.push(' ');
    }
}

/// Strip comments and collapse whitespace. Deterministic.
pub fn minify_js(input: &str) -> Result<String, SynthesisError> {
    let stripped = strip_comments(input)?;
    collapse_whitespace(&stripped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_block_and_line_comments() {
        let out = strip_comments("/* block */ var x = 1; // line\nvar y = 2;").unwrap();
        assert!(!out.contains("block"));
        assert!(!out.contains("line"));
        assert!(out.contains("var x = 1;"));
        assert!(out.contains("var y = 2;"));
    }

    #[test]
    fn comment_markers_inside_strings_survive() {
        let out = strip_comments(r#"var a = "/* no */", b = `// no`, c = 'x//y';"#).unwrap();
        assert!(out.contains("/* no */"));
        assert!(out.contains("// no"));
        assert!(out.contains("x//y"));
    }

    #[test]
    fn division_keeps_both_operands() {
        let out = strip_comments("var r = a / b;").unwrap();
        assert_eq!(out, "var r = a / b;");
    }

    #[test]
    fn block_comment_between_words_keeps_them_apart() {
        assert_eq!(minify_js("return/* x */value;").unwrap(), "return value;");
    }

    #[test]
    fn collapses_whitespace_around_punctuation() {
        let out = collapse_whitespace("function foo ( x ) { return x + 1 ; }").unwrap();
        assert_eq!(out, "function foo(x){return x+1;}");
    }

    #[test]
    fn keeps_unary_operators_apart() {
        assert_eq!(collapse_whitespace("a + +b - -c").unwrap(), "a+ +b- -c");
    }

    #[test]
    fn escaped_backslash_ends_string() {
        let out = collapse_whitespace(r#"var s = "\\" ; var t = 1 ;"#).unwrap();
        assert_eq!(out, r#"var s="\\";var t=1;"#);
    }

    #[test]
    fn unterminated_input_is_an_error() {
        assert!(minify_js("var s = 'open;").is_err());
        assert!(minify_js("/* open").is_err());
    }

    #[test]
    fn full_minify_is_deterministic() {
        let src = "\n/* header */\nfunction test(x) {\n    // inc\n    return x + 1;\n}\n";
        let a = minify_js(src).unwrap();
        assert_eq!(a, "function test(x){return x+1;}");
        assert_eq!(a, minify_js(src).unwrap());
    }
}
