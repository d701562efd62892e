#[cfg(test)]
mod parser_tests {
    use seemm::ast::{Expr, Stmt};
    use seemm::ast_printer::AstPrinter;
    use seemm::error::{Diagnostics, Stage};
    use seemm::parser::{self, Parser};
    use seemm::scanner::{scan, IdentifierTypes};
    use seemm::token::{Token, TokenType};

    fn tokens(source: &str) -> Vec<Token> {
        let mut identifiers = IdentifierTypes::new();
        let mut diagnostics = Diagnostics::new();
        let tokens = scan(source, &mut identifiers, &mut diagnostics);
        assert!(diagnostics.is_empty(), "lex errors: {}", diagnostics);
        tokens
    }

    fn parse_source(source: &str) -> (Vec<Stmt>, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let statements = parser::parse(tokens(source), &mut diagnostics);
        (statements, diagnostics)
    }

    fn printed(source: &str) -> Vec<String> {
        let (statements, diagnostics) = parse_source(source);
        assert!(diagnostics.is_empty(), "parse errors: {}", diagnostics);
        statements.iter().map(AstPrinter::print_stmt).collect()
    }

    #[test]
    fn precedence_climbs_from_assignment_to_primary() {
        assert_eq!(
            printed("x = 1 + 2 * 3 % 4 - -y;"),
            vec!["(; (= x (- (+ 1 (% (* 2 3) 4)) (- y))))"]
        );
        assert_eq!(
            printed("b = a < 1 == !c || d && e;"),
            vec!["(; (= b (|| (== (< a 1) (! c)) (&& d e))))"]
        );
    }

    #[test]
    fn assignment_is_right_associative() {
        assert_eq!(printed("a = b = 2.5;"), vec!["(; (= a (= b 2.5)))"]);
    }

    #[test]
    fn indexed_and_array_literal_assignment() {
        assert_eq!(
            printed("xs[i + 1] = (xs[0]); xs = { 1, 2 };"),
            vec![
                "(; (= (index xs (+ i 1)) (group (index xs 0))))",
                "(; (= xs {1 2}))"
            ]
        );
    }

    #[test]
    fn typed_declarations() {
        assert_eq!(
            printed("int a = 1; float b; bool[] c = { true }; int[] d = e;"),
            vec![
                "(var int a 1)",
                "(var float b)",
                "(var bool[] c {true})",
                "(var int[] d e)"
            ]
        );
    }

    #[test]
    fn function_declarations_are_hoisted_to_the_front() {
        let out = printed("print(1); int one() { return 1; } void two(int a, float[] b) { }");

        assert_eq!(
            out,
            vec![
                "(fun void two (int a, float[] b))",
                "(fun int one () (return 1))",
                "(; (call print 1))"
            ]
        );
    }

    #[test]
    fn hoisting_applies_inside_blocks() {
        assert_eq!(
            printed("{ f(); void f() { } }"),
            vec!["(block (fun void f ()) (; (call f)))"]
        );
    }

    #[test]
    fn array_return_type_functions() {
        assert_eq!(
            printed("int[] evens() { int[] e = { 0, 2 }; return e; }"),
            vec!["(fun int[] evens () (var int[] e {0 2}) (return e))"]
        );
    }

    #[test]
    fn control_flow_statements() {
        assert_eq!(
            printed("while (i < 3) { if (i == 1) continue; else break; } return;"),
            vec![
                "(while (< i 3) (block (if (== i 1) (continue) (break))))",
                "(return)"
            ]
        );
    }

    #[test]
    fn calls_chain() {
        assert_eq!(printed("f(1)(2, 3);"), vec!["(; (call (call f 1) 2 3))"]);
    }

    #[test]
    fn invalid_assignment_target_is_reported() {
        let (_, diagnostics) = parse_source("1 = 2; (a) = { 1 };");

        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics.iter().all(|d| d.stage == Stage::Parse));
        assert!(diagnostics.iter().all(|d| d.message == "Invalid assignment target."));
    }

    #[test]
    fn recovery_continues_after_an_error() {
        let (statements, diagnostics) = parse_source("int = 3;\nint ok = 1;\nprint(ok;\nint after;");

        assert_eq!(diagnostics.len(), 2, "got: {}", diagnostics);
        assert_eq!(
            diagnostics.iter().map(|d| d.line).collect::<Vec<_>>(),
            vec![1, 3]
        );

        let printed: Vec<String> = statements.iter().map(AstPrinter::print_stmt).collect();
        assert_eq!(printed, vec!["(var int ok 1)", "(var int after)"]);
    }

    #[test]
    fn error_at_end_of_input() {
        let (_, diagnostics) = parse_source("print(1)");

        let first = diagnostics.iter().next().unwrap();
        assert_eq!(first.location, " at end");
        assert_eq!(first.message, "Expect ';' after expression.");
        assert_eq!(first.to_string(), "[line 1] Error at end: Expect ';' after expression.");
    }

    #[test]
    fn void_variables_are_rejected() {
        let (_, diagnostics) = parse_source("void v; void[] vs;");
        assert!(diagnostics.mentions("Can't declare a void variable."));
        assert!(diagnostics.mentions("Can't declare an array of void."));
    }

    #[test]
    fn parameters_need_a_type() {
        let (_, diagnostics) = parse_source("int f(a) { return a; }");
        assert!(diagnostics.mentions("Expect parameter type."));
    }

    #[test]
    fn set_tokens_resets_state_and_ids_are_deterministic() {
        let mut parser = Parser::new(tokens("a = 1;"));
        let first = parser.parse();

        parser.set_tokens(tokens("a = 1;"));
        let second = parser.parse();

        assert_eq!(first, second);
        assert!(parser.diagnostics().is_empty());

        let Stmt::Expression(Expr::Assign { value, .. }) = &first[0] else {
            panic!("expected an assignment, got {:?}", first[0]);
        };
        assert_eq!(value.line(), 1);
    }

    #[test]
    fn missing_eof_is_tolerated() {
        let mut toks = tokens("a;");
        toks.retain(|t| t.token_type != TokenType::EOF);

        let mut parser = Parser::new(toks);
        assert_eq!(parser.parse().len(), 1);
    }
}
