#[cfg(test)]
mod runner_tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use seemm::error::{CollectingReporter, Reporter, SeeError};
    use seemm::host::{Host, HostFunction};
    use seemm::runner::{ScriptRunner, VariableChange};
    use seemm::types::SemanticType;
    use seemm::value::Value;

    fn host_with_x() -> Host {
        let mut host = Host::new();
        host.add_variable("x", SemanticType::INT, Value::Int(0))
            .unwrap();
        host
    }

    fn runner(host: Host) -> (ScriptRunner, Rc<CollectingReporter>) {
        let reporter = Rc::new(CollectingReporter::new());
        let sink: Rc<dyn Reporter> = reporter.clone();
        (ScriptRunner::new(host, sink), reporter)
    }

    fn change(name: &str, previous: Value, current: Value) -> VariableChange {
        VariableChange {
            name: name.to_string(),
            previous,
            current,
        }
    }

    #[test]
    fn run_reports_each_changed_external_variable_once() {
        let (mut runner, _) = runner(host_with_x());

        runner.compile("x = 3; x = 5;").unwrap();
        let changes = runner.run().unwrap();

        assert_eq!(changes, vec![change("x", Value::Int(0), Value::Int(5))]);
        assert_eq!(runner.variable("x"), Some(Value::Int(5)));
    }

    #[test]
    fn setup_runs_once_and_main_runs_every_tick() {
        let (mut runner, reporter) = runner(host_with_x());

        runner
            .compile("int frames = 0;
                      void Setup() { x = 100; print(0); }
                      void Main() { frames = frames + 1; x = x + 1; }")
            .unwrap();

        let changes = runner.run().unwrap();
        assert_eq!(changes, vec![change("x", Value::Int(0), Value::Int(100))]);
        assert_eq!(reporter.take_console(), vec!["0"]);

        let changes = runner.tick().unwrap();
        assert_eq!(changes, vec![change("x", Value::Int(100), Value::Int(101))]);

        runner.tick().unwrap();
        assert_eq!(runner.ticks(), 2);
        assert_eq!(runner.variable("frames"), Some(Value::Int(2)));
        assert!(reporter.console_lines().is_empty());
    }

    #[test]
    fn unchanged_variables_produce_no_changes() {
        let (mut runner, _) = runner(host_with_x());

        runner.compile("void Main() { x = x; }").unwrap();

        assert!(runner.run().unwrap().is_empty());
        assert!(runner.tick().unwrap().is_empty());
    }

    #[test]
    fn host_writes_are_not_reported_back() {
        let (mut runner, _) = runner(host_with_x());

        runner.compile("int seen = 0; void Main() { seen = x; }").unwrap();
        runner.run().unwrap();

        runner.set_variable("x", Value::Int(7)).unwrap();
        assert!(runner.tick().unwrap().is_empty());
        assert_eq!(runner.variable("seen"), Some(Value::Int(7)));

        assert!(matches!(
            runner.set_variable("nope", Value::Int(1)),
            Err(SeeError::Config(_))
        ));
        assert!(matches!(
            runner.set_variable("x", Value::Bool(true)),
            Err(SeeError::Runtime(_))
        ));
    }

    #[test]
    fn recompiling_starts_from_fresh_globals() {
        let (mut runner, _) = runner(host_with_x());

        runner.compile("int kept = 1; x = 9;").unwrap();
        runner.run().unwrap();
        runner.tick().unwrap();

        runner.compile("int other = 2;").unwrap();
        assert_eq!(runner.ticks(), 0);
        assert_eq!(runner.variable("kept"), None);
        assert_eq!(runner.variable("x"), Some(Value::Int(0)));

        assert!(runner.run().unwrap().is_empty());
        assert_eq!(runner.variable("other"), Some(Value::Int(2)));
    }

    #[test]
    fn compile_errors_are_reported_and_leave_nothing_to_run() {
        let (mut runner, reporter) = runner(host_with_x());

        let diagnostics = runner.compile("int a = true;\nbreak;").unwrap_err();

        assert_eq!(diagnostics.len(), 2);
        assert_eq!(reporter.diagnostics().len(), 2);
        assert!(!runner.is_compiled());
        assert!(matches!(runner.run(), Err(SeeError::NotCompiled)));
        assert!(matches!(runner.tick(), Err(SeeError::NotCompiled)));
    }

    #[test]
    fn runtime_errors_surface_as_errors_and_are_reported_once() {
        let (mut runner, reporter) = runner(host_with_x());

        runner.compile("void Main() { x = 1 / 0; }").unwrap();
        runner.run().unwrap();

        let error = runner.tick().unwrap_err();
        assert!(matches!(error, SeeError::Runtime(ref e) if e.message == "Division by zero."));
        assert_eq!(reporter.runtime_errors().len(), 1);
    }

    #[test]
    fn host_functions_receive_coerced_arguments() {
        let seen: Rc<RefCell<Vec<Value>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);

        let mut host = host_with_x();
        host.add_function(HostFunction::new(
            "record",
            vec![SemanticType::FLOAT],
            SemanticType::VOID,
            move |args: &[Value]| {
                sink.borrow_mut().extend_from_slice(args);
                None
            },
        ))
        .unwrap();

        let (mut runner, _) = runner(host);
        runner.compile("record(2); void Main() { record(x); }").unwrap();
        runner.run().unwrap();
        runner.tick().unwrap();

        assert_eq!(*seen.borrow(), vec![Value::Float(2.0), Value::Float(0.0)]);
    }

    #[test]
    fn deltatime_follows_the_pinned_frame_length() {
        let (mut runner, _) = runner(Host::new());

        runner
            .compile("float total = 0; void Main() { total = total + deltatime(); }")
            .unwrap();
        runner.run().unwrap();

        runner.interpreter_mut().set_delta_time(0.25);
        runner.tick().unwrap();
        runner.tick().unwrap();

        assert_eq!(runner.variable("total"), Some(Value::Float(0.5)));
    }

    #[test]
    fn external_arrays_are_compared_by_content() {
        let mut host = Host::new();
        host.add_variable("grid", SemanticType::INT_ARRAY, Value::array(vec![Value::Int(0); 2]))
            .unwrap();

        let (mut runner, _) = runner(host);
        runner
            .compile("void Main() { grid[1] = grid[1] + 1; }")
            .unwrap();
        runner.run().unwrap();

        let changes = runner.tick().unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(
            changes[0].previous,
            Value::array(vec![Value::Int(0), Value::Int(0)])
        );
        assert_eq!(
            changes[0].current,
            Value::array(vec![Value::Int(0), Value::Int(1)])
        );
    }
}
