#[cfg(test)]
mod scanner_tests {
    use seemm::error::{Diagnostics, Stage};
    use seemm::scanner::*;
    use seemm::token::*;
    use seemm::types::SemanticType;

    fn scan_fresh(source: &str) -> (Vec<Token>, Diagnostics, IdentifierTypes) {
        let mut identifiers = IdentifierTypes::new();
        let mut diagnostics = Diagnostics::new();
        let tokens = scan(source, &mut identifiers, &mut diagnostics);
        (tokens, diagnostics, identifiers)
    }

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let (tokens, diagnostics, _) = scan_fresh(source);

        assert!(diagnostics.is_empty(), "unexpected errors: {}", diagnostics);
        assert_eq!(tokens.len(), expected.len());

        for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
            assert_eq!(actual.token_type, *expected_type);
            assert_eq!(actual.lexeme, *expected_lexeme);
        }
    }

    fn types_of(tokens: &[Token], name: &str) -> Vec<SemanticType> {
        tokens
            .iter()
            .filter(|t| t.token_type == TokenType::IDENTIFIER && t.lexeme == name)
            .map(|t| t.semantic_type)
            .collect()
    }

    #[test]
    fn test_scanner_01_symbols() {
        assert_token_sequence(
            "({[*.,+%]})",
            &[
                (TokenType::LEFT_PAREN, "("),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::LEFT_BRACKET, "["),
                (TokenType::STAR, "*"),
                (TokenType::DOT, "."),
                (TokenType::COMMA, ","),
                (TokenType::PLUS, "+"),
                (TokenType::PERCENT, "%"),
                (TokenType::RIGHT_BRACKET, "]"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_02_operators() {
        assert_token_sequence(
            "! != = == < <= > >= && ||",
            &[
                (TokenType::BANG, "!"),
                (TokenType::BANG_EQUAL, "!="),
                (TokenType::EQUAL, "="),
                (TokenType::EQUAL_EQUAL, "=="),
                (TokenType::LESS, "<"),
                (TokenType::LESS_EQUAL, "<="),
                (TokenType::GREATER, ">"),
                (TokenType::GREATER_EQUAL, ">="),
                (TokenType::AND, "&&"),
                (TokenType::OR, "||"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_03_keywords_and_comments() {
        assert_token_sequence(
            "while (true) // spin\n{ break; continue; } else return false;",
            &[
                (TokenType::WHILE, "while"),
                (TokenType::LEFT_PAREN, "("),
                (TokenType::TRUE, "true"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::BREAK, "break"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::CONTINUE, "continue"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::ELSE, "else"),
                (TokenType::RETURN, "return"),
                (TokenType::FALSE, "false"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn numbers_are_ints_unless_a_digit_follows_the_dot() {
        let (tokens, diagnostics, _) = scan_fresh("42 4.25 7.");

        assert!(diagnostics.is_empty());
        assert_eq!(tokens[0].token_type, TokenType::INT_NUMBER);
        assert_eq!(tokens[0].literal, Some(Literal::Int(42)));
        assert_eq!(tokens[1].token_type, TokenType::FLOAT_NUMBER);
        assert_eq!(tokens[1].literal, Some(Literal::Float(4.25)));
        assert_eq!(tokens[2].token_type, TokenType::INT_NUMBER);
        assert_eq!(tokens[3].token_type, TokenType::DOT);
    }

    #[test]
    fn newlines_advance_the_line_counter() {
        let (tokens, _, _) = scan_fresh("a\n// note\nb");

        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[1].line, 3);
        assert_eq!(tokens[2].token_type, TokenType::EOF);
    }

    #[test]
    fn test_unexpected_chars_are_reported_and_skipped() {
        let (tokens, diagnostics, _) = scan_fresh(",.$(#é&");

        let kinds: Vec<TokenType> = tokens.iter().map(|t| t.token_type).collect();
        assert_eq!(
            kinds,
            vec![
                TokenType::COMMA,
                TokenType::DOT,
                TokenType::LEFT_PAREN,
                TokenType::EOF
            ]
        );

        assert_eq!(diagnostics.len(), 4, "got: {}", diagnostics);
        for diagnostic in &diagnostics {
            assert_eq!(diagnostic.stage, Stage::Lex);
            assert!(diagnostic.message.starts_with("Unexpected character"));
        }
    }

    #[test]
    fn declared_identifiers_are_stamped_with_their_type() {
        let (tokens, diagnostics, identifiers) =
            scan_fresh("int n = 1; float[] xs; n = n + 1;");

        assert!(diagnostics.is_empty());
        assert_eq!(types_of(&tokens, "n"), vec![SemanticType::INT; 3]);
        assert_eq!(types_of(&tokens, "xs"), vec![SemanticType::FLOAT_ARRAY]);
        assert_eq!(identifiers.get("xs"), Some(&SemanticType::FLOAT_ARRAY));
    }

    #[test]
    fn use_before_declaration_is_backfilled() {
        let (tokens, diagnostics, _) = scan_fresh("int f() { return later; } bool later = true;");

        assert!(diagnostics.is_empty());
        assert_eq!(types_of(&tokens, "later"), vec![SemanticType::BOOL; 2]);
        assert_eq!(types_of(&tokens, "f"), vec![SemanticType::INT]);
    }

    #[test]
    fn host_seeded_names_keep_their_type() {
        let mut identifiers = IdentifierTypes::new();
        identifiers.insert("speed".to_string(), SemanticType::FLOAT);

        let mut diagnostics = Diagnostics::new();
        let tokens = scan("speed = 2;", &mut identifiers, &mut diagnostics);

        assert_eq!(tokens[0].semantic_type, SemanticType::FLOAT);
    }

    #[test]
    fn conflicting_redeclaration_keeps_the_first_type() {
        let (tokens, diagnostics, identifiers) = scan_fresh("int x; float x;");

        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics.mentions("already declared as int"));
        assert_eq!(types_of(&tokens, "x"), vec![SemanticType::INT; 2]);
        assert_eq!(identifiers.get("x"), Some(&SemanticType::INT));
    }

    #[test]
    fn oversized_integer_literal_is_a_diagnostic() {
        let (tokens, diagnostics, _) = scan_fresh("99999999999999999999");

        assert!(diagnostics.mentions("too large"));
        assert_eq!(tokens[0].literal, Some(Literal::Int(0)));
    }
}
