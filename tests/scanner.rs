#[cfg(test)]
mod scanner_tests {
    use rox::error::{LoxError, Result};
    use rox::scanner::*;
    use rox::token::*;

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let scanner = Scanner::new(source);
        let tokens: Vec<_> = scanner.filter_map(std::result::Result::ok).collect();

        assert_eq!(tokens.len(), expected.len());

        for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
            assert_eq!(actual.token_type, *expected_type);
            assert_eq!(actual.lexeme, *expected_lexeme);
        }
    }

    #[test]
    fn test_scanner_01_symbols() {
        assert_token_sequence(
            "({*.,+*})",
            &[
                (TokenType::LEFT_PAREN, "("),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::STAR, "*"),
                (TokenType::DOT, "."),
                (TokenType::COMMA, ","),
                (TokenType::PLUS, "+"),
                (TokenType::STAR, "*"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_02_ternary_and_comparison() {
        assert_token_sequence(
            "a >= 1 ? b : c != d",
            &[
                (TokenType::IDENTIFIER, "a"),
                (TokenType::GREATER_EQUAL, ">="),
                (TokenType::NUMBER(1.0), "1"),
                (TokenType::QUESTION, "?"),
                (TokenType::IDENTIFIER, "b"),
                (TokenType::COLON, ":"),
                (TokenType::IDENTIFIER, "c"),
                (TokenType::BANG_EQUAL, "!="),
                (TokenType::IDENTIFIER, "d"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_03_keywords() {
        assert_token_sequence(
            "class static private break continue this fun nil",
            &[
                (TokenType::CLASS, "class"),
                (TokenType::STATIC, "static"),
                (TokenType::PRIVATE, "private"),
                (TokenType::BREAK, "break"),
                (TokenType::CONTINUE, "continue"),
                (TokenType::THIS, "this"),
                (TokenType::FUN, "fun"),
                (TokenType::NIL, "nil"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_04_comments_and_lines() {
        let source = "// leading comment\nvar x = 1; // trailing\nprint x;";
        let tokens: Vec<Token> = Scanner::new(source).collect::<Result<_>>().unwrap();

        assert_eq!(tokens[0].token_type, TokenType::VAR);
        assert_eq!(tokens[0].line, 2);

        let print = tokens
            .iter()
            .find(|t| t.token_type == TokenType::PRINT)
            .unwrap();
        assert_eq!(print.line, 3);
        assert_eq!(tokens.len(), 9);
    }

    #[test]
    fn test_scanner_05_literals_display() {
        let tokens: Vec<Token> = Scanner::new("\"hi\" 42 3.5")
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(tokens[0].to_string(), "STRING \"hi\" hi");
        assert_eq!(tokens[1].to_string(), "NUMBER 42 42.0");
        assert_eq!(tokens[2].to_string(), "NUMBER 3.5 3.5");
        assert_eq!(tokens[3].to_string(), "EOF  null");
    }

    #[test]
    fn test_scanner_06_unterminated_string() {
        let results: Vec<_> = Scanner::new("\"never closed").collect();

        let err = results
            .iter()
            .find_map(|r| r.as_ref().err())
            .expect("an error for the open string");
        assert!(matches!(err, LoxError::Lex { line: 1, .. }));
        assert!(err.to_string().contains("Unterminated string."));
    }

    #[test]
    fn test_unexpected_chars_token_sequence() {
        let source = ",.$(#";
        let scanner = Scanner::new(source);

        // Collect all results (both tokens and errors)
        let results: Vec<_> = scanner.collect();

        // We expect this sequence:
        // 0: COMMA ','
        // 1: DOT '.'
        // 2: Error for '$'
        // 3: LEFT_PAREN '('
        // 4: Error for '#'
        // 5: EOF

        assert_eq!(results.len(), 6, "Expected 6 items in result");

        assert_token_matches(&results[0], TokenType::COMMA, ",");
        assert_token_matches(&results[1], TokenType::DOT, ".");
        assert_token_matches(&results[3], TokenType::LEFT_PAREN, "(");
        assert_token_matches(&results[5], TokenType::EOF, "");

        let error_count = results.iter().filter(|r| r.is_err()).count();
        assert_eq!(error_count, 2, "Expected 2 error messages");

        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            assert!(
                err.to_string().contains("Unexpected character"),
                "Error message should contain 'Unexpected character', got: {}",
                err
            );
        }

        fn assert_token_matches(
            result: &Result<Token>,
            expected_type: TokenType,
            expected_lexeme: &str,
        ) {
            match result {
                Ok(token) => {
                    assert_eq!(
                        token.token_type, expected_type,
                        "Expected token type {:?}, got {:?}",
                        expected_type, token.token_type
                    );
                    assert_eq!(
                        token.lexeme, expected_lexeme,
                        "Expected lexeme '{}', got '{}'",
                        expected_lexeme, token.lexeme
                    );
                }
                Err(e) => panic!("Expected token but got error: {}", e),
            }
        }
    }
}
