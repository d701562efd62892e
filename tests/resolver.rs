#[cfg(test)]
mod resolver_tests {
    use std::rc::Rc;

    use seemm::ast::{Expr, Stmt};
    use seemm::error::{CollectingReporter, Diagnostics, Stage};
    use seemm::host::Host;
    use seemm::interpreter::Interpreter;
    use seemm::types::SemanticType;
    use seemm::value::Value;

    fn compile_with(host: &Host, source: &str) -> (Result<Vec<Stmt>, Diagnostics>, Interpreter) {
        let mut interpreter = Interpreter::new(host, Rc::new(CollectingReporter::new()));
        let result = seemm::compile(source, host, &mut interpreter);
        (result, interpreter)
    }

    fn assert_ok(source: &str) {
        let (result, _) = compile_with(&Host::new(), source);
        if let Err(diagnostics) = result {
            panic!("expected {:?} to compile, got:\n{}", source, diagnostics);
        }
    }

    fn errors(source: &str) -> Diagnostics {
        match compile_with(&Host::new(), source).0 {
            Ok(_) => panic!("expected {:?} to fail", source),
            Err(diagnostics) => diagnostics,
        }
    }

    fn assert_error(source: &str, message: &str) {
        let diagnostics = errors(source);
        assert!(
            diagnostics.mentions(message),
            "expected {:?} in diagnostics for {:?}, got:\n{}",
            message,
            source,
            diagnostics
        );
    }

    // ─── control flow ────────────────────────────────────────────────────────

    #[test]
    fn break_outside_loop_is_rejected() {
        assert_error("while (true) { } break;", "Can't use 'break' outside of a loop.");
        assert_error("continue;", "Can't use 'continue' outside of a loop.");
        assert_ok("while (true) { if (false) continue; break; }");
    }

    #[test]
    fn loops_do_not_leak_into_function_bodies() {
        assert_error(
            "while (true) { void f() { break; } }",
            "Can't use 'break' outside of a loop.",
        );
    }

    #[test]
    fn top_level_return_is_rejected() {
        let diagnostics = errors("return 1;");
        assert_eq!(diagnostics.len(), 1);

        let d = diagnostics.iter().next().unwrap();
        assert_eq!(d.stage, Stage::Resolve);
        assert_eq!(d.message, "Can't return from top-level code.");
        assert_eq!(d.location, " at 'return'");
    }

    #[test]
    fn return_type_must_match() {
        assert_error("int f() { return 1.5; }", "Function must return int but this returns float.");
        assert_error("int f() { return; }", "Function must return int but this returns void.");
        assert_ok("void f() { return; } float g() { return 0.5; } int[] h(int[] a) { return a; }");
    }

    #[test]
    fn non_void_functions_must_return_on_every_path() {
        assert_error("int f() { }", "Function 'f' must return int on every path.");
        assert_error(
            "float g(bool b) { if (b) return 1.0; }",
            "Function 'g' must return float on every path.",
        );
        assert_error(
            "int h() { while (true) { break; } }",
            "Function 'h' must return int on every path.",
        );
        assert_ok("int f(bool b) { if (b) { return 1; } else return 2; }");
        assert_ok("int g() { while (true) { if (false) continue; return 1; } }");
        assert_ok("int h() { { return 1; } } void v() { }");
    }

    #[test]
    fn nested_functions_are_rejected() {
        assert_error(
            "void outer() { void inner() { } }",
            "Can't declare a function inside another function.",
        );
    }

    // ─── declarations and scopes ─────────────────────────────────────────────

    #[test]
    fn duplicate_declarations_are_rejected() {
        assert_error("{ int x = 1; int x = 2; }", "'x' is already declared in this scope.");
        assert_error("int x; int x;", "'x' is already defined.");
        assert_error("void f(int a, int a) { }", "'a' is already declared in this scope.");
    }

    #[test]
    fn redeclaring_in_an_enclosing_scope_of_the_same_function_is_rejected() {
        assert_error(
            "void f(int a) { { int a = 2; } }",
            "'a' is already declared in this scope.",
        );
    }

    #[test]
    fn shadowing_a_global_in_a_block_is_allowed() {
        assert_ok("int x = 1; { int x = 2; }");
        assert_ok("int x = 1; void f() { int x = 2; }");
    }

    #[test]
    fn reading_a_local_in_its_own_initializer_is_rejected() {
        assert_error("{ int a = a; }", "Can't read local variable in its own initializer.");
        assert_error("{ int[] b = { b[0] }; }", "Can't read local variable in its own initializer.");
    }

    #[test]
    fn reading_a_global_in_its_own_initializer_is_rejected() {
        assert_error("int x = x + 1;", "Can't read local variable in its own initializer.");
        assert_error("int[] a = { a[0] };", "Can't read local variable in its own initializer.");
        assert_ok("int x = 1; int y = x + 1; int[] a = { x }; int[] b = { a[0] };");
    }

    #[test]
    fn functions_can_only_be_called() {
        assert_error(
            "int f() { return 1; } int r = f;",
            "Can't use function 'f' as a value.",
        );
        assert_error(
            "{ void g() { } print(g); }",
            "Can't use function 'g' as a value.",
        );
        assert_error("int n = size_of;", "Can't use function 'size_of' as a value.");
        assert_ok("int f() { return 1; } int r = f(); { int f = 2; r = f; }");
    }

    #[test]
    fn undeclared_names_are_rejected() {
        assert_error("y = 1;", "Undefined variable 'y'.");
        assert_error("nope();", "Undefined function 'nope'.");
    }

    #[test]
    fn host_names_can_not_be_redeclared() {
        let mut host = Host::new();
        host.add_variable("speed", SemanticType::FLOAT, Value::Float(1.0))
            .unwrap();

        let (result, _) = compile_with(&host, "speed = speed * 2; print(speed);");
        assert!(result.is_ok());

        let (result, _) = compile_with(&host, "float speed = 1.0;");
        assert!(result.unwrap_err().mentions("'speed' is already defined."));

        let (result, _) = compile_with(&host, "int print() { return 1; }");
        assert!(result.unwrap_err().mentions("'print' is already defined."));
    }

    // ─── type checking ───────────────────────────────────────────────────────

    #[test]
    fn scalar_assignment_rules() {
        assert_ok("float f = 1; f = 2; f = 2.5; int i = 1 + 2; bool b = 1 < 2.0;");
        assert_error(
            "int x = 1.5;",
            "Can't initialize 'x' of type int with a value of type float.",
        );
        assert_error(
            "int x = 1 + 2.0;",
            "Can't initialize 'x' of type int with a value of type float.",
        );
        assert_error(
            "bool b = true; b = 1;",
            "Can't assign a value of type int to 'b' of type bool.",
        );
    }

    #[test]
    fn array_rules() {
        assert_ok("int[] xs = { 1, 2 }; xs[0] = 3; xs = { 4 }; int[] ys = xs; int n = xs[1] + size_of(ys);");
        assert_error("int[] xs = { 1, 2.5 };", "Elements of 'xs' must be int but got float.");
        assert_error("int[] xs = { 1 }; int v = xs[true];", "Array index must be an int.");
        assert_error("int n = 3; int w = n[0];", "'n' is not an array.");
        assert_error("int[] xs; float[] fs = xs;", "Can't initialize 'fs'");
    }

    #[test]
    fn operator_rules() {
        assert_error("bool b = 1 && true;", "Operands must be booleans.");
        assert_error("float f = -true;", "Operand must be a number.");
        assert_error("bool b = !1;", "Operand must be a boolean.");
        assert_error("bool b = true == 1;", "Operands must be two numbers or two booleans.");
        assert_error("bool b = true < false;", "Operands must be numbers.");
        assert_error("if (1) { }", "Condition must be a boolean.");
        assert_error("while (2.0) { }", "Condition must be a boolean.");
    }

    #[test]
    fn call_rules() {
        let source = "int add(int a, int b) { return a + b; }";

        assert_ok(&format!("{} int r = add(1, 2);", source));
        assert_error(
            &format!("{} int r = add(1, true);", source),
            "Argument 2 of 'add' must be int but got bool.",
        );
        assert_error(&format!("{} add(1);", source), "Expected 2 arguments but got 1.");
        assert_ok("print(1); print(true); int n = size_of(2.5);");
    }

    #[test]
    fn every_error_is_reported_in_one_pass() {
        let diagnostics = errors("int a = true;\nbreak;\nreturn;\nb = 1;");

        assert_eq!(diagnostics.len(), 4, "got:\n{}", diagnostics);
        assert_eq!(
            diagnostics.iter().map(|d| d.line).collect::<Vec<_>>(),
            vec![1, 2, 3, 4]
        );
    }

    // ─── binding distances ───────────────────────────────────────────────────

    #[test]
    fn locals_record_their_scope_distance() {
        let (result, interpreter) = compile_with(
            &Host::new(),
            "int g = 0; void f(int p) { int l = p; { l = l + g; } }",
        );
        let statements = result.unwrap();

        let Stmt::Function(decl) = &statements[0] else {
            panic!("function should be hoisted first");
        };

        let Stmt::Var { initializer: Some(read_p), .. } = &decl.body[0] else {
            panic!("expected `int l = p;`");
        };
        assert_eq!(interpreter.locals().get(&read_p.id()), Some(&0));

        let Stmt::Block(inner) = &decl.body[1] else {
            panic!("expected a block");
        };
        let Stmt::Expression(assign @ Expr::Assign { value, .. }) = &inner[0] else {
            panic!("expected `l = l + g;`");
        };
        assert_eq!(interpreter.locals().get(&assign.id()), Some(&1));

        let Expr::Binary { left, right, .. } = &**value else {
            panic!("expected `l + g`");
        };
        assert_eq!(interpreter.locals().get(&left.id()), Some(&1));
        assert_eq!(interpreter.locals().get(&right.id()), None, "globals are unrecorded");
    }

    #[test]
    fn resolving_the_same_source_twice_is_deterministic() {
        let source = "int[] xs = { 1, 2 };
            int sum(int[] v) { int i = 0; int s = 0; while (i < size_of(v)) { s = s + v[i]; i = i + 1; } return s; }
            { int local = sum(xs); print(local); }";

        let (first, a) = compile_with(&Host::new(), source);
        let (second, b) = compile_with(&Host::new(), source);

        assert_eq!(first, second);
        assert!(!a.locals().is_empty());
        assert_eq!(a.locals(), b.locals());
    }
}
