use super::*;

fn run(source: &str) -> Result<(), InterpretError> {
    Vm::new().interpret(source)
}

fn runtime_message(source: &str) -> String {
    match run(source) {
        Err(InterpretError::Runtime(err)) => err.message,
        other => panic!("expected a runtime error, got {other:?}"),
    }
}

#[test]
fn arithmetic_precedence_runs_to_completion() {
    assert!(run("puts 1 + 2 * 3.").is_ok());
}

#[test]
fn globals_persist_across_statements() {
    assert!(run("set x <- 10. puts x + 1.").is_ok());
}

#[test]
fn if_else_branches_both_compile_and_run() {
    let source = "set x <- 5.\nif (x > 0) ->\n    puts \"positive\".\nelse ->\n    puts \"non-positive\".\nend";
    assert!(run(source).is_ok());
}

#[test]
fn closures_capture_and_keep_independent_state() {
    let source = "\
func make_counter() ->
    set count <- 0.
    func increment() ->
        count <- count + 1.
        return count.
    end
    return increment.
end

set a <- make_counter().
set b <- make_counter().
puts a().
puts a().
puts b().
";
    assert!(run(source).is_ok());
}

#[test]
fn classes_support_initializers_and_methods() {
    let source = "\
class Point [
    init(x, y) ->
        this:x <- x.
        this:y <- y.
    end

    sum() ->
        return this:x + this:y.
    end
]

set p <- Point(3, 4).
puts p:sum().
";
    assert!(run(source).is_ok());
}

#[test]
fn inheritance_binds_super_methods() {
    let source = "\
class Animal [
    init(name) ->
        this:name <- name.
    end

    speak() ->
        return this:name + \" makes a noise\".
    end
]

class Dog < Animal [
    speak() ->
        return super:speak() + \"!\".
    end
]

set d <- Dog(\"Rex\").
puts d:speak().
";
    assert!(run(source).is_ok());
}

#[test]
fn native_clock_is_callable() {
    assert!(run("puts clock().").is_ok());
}

#[test]
fn undefined_global_is_a_runtime_error() {
    assert_eq!(runtime_message("puts never_defined."), "Undefined variable 'never_defined'.");
}

#[test]
fn undefined_property_is_a_runtime_error() {
    let source = "class Foo [\n]\nset f <- Foo().\nputs f:bar().";
    assert_eq!(runtime_message(source), "Undefined property 'bar'.");
}

#[test]
fn only_instances_have_methods() {
    assert_eq!(runtime_message("puts 1:bar()."), "Only instances can have methods.");
}

#[test]
fn adding_a_number_and_a_bool_is_a_type_error() {
    assert_eq!(
        runtime_message("puts 1 + true."),
        "Operands must be two numbers or two strings."
    );
}

#[test]
fn comparing_non_numbers_is_a_type_error() {
    assert_eq!(runtime_message("puts true < 1."), "Operands must be numbers.");
}

#[test]
fn negating_a_non_number_is_a_type_error() {
    assert_eq!(runtime_message("puts -true."), "Operand must be a number.");
}

#[test]
fn calling_a_non_callable_value_is_an_error() {
    assert_eq!(runtime_message("puts 1()."), "Can only call functions and classes.");
}

#[test]
fn wrong_arity_is_a_runtime_error() {
    let source = "func add(a, b) -> return a + b. end\nputs add(1).";
    assert_eq!(runtime_message(source), "Expected 2 arguments, but got 1 instead.");
}

#[test]
fn deep_recursion_overflows_the_frame_stack() {
    let source = "func recurse() -> return recurse() + 1. end\nrecurse().";
    assert_eq!(runtime_message(source), "Stack overflow.");
}

#[test]
fn string_concatenation_is_distinct_from_addition() {
    assert!(run("puts \"foo\" + \"bar\".").is_ok());
}

#[test]
fn interpret_leaves_the_vm_empty_after_a_runtime_error() {
    let mut vm = Vm::new();
    assert!(vm.interpret("puts nope.").is_err());
    assert!(vm.stack.is_empty());
    assert!(vm.frames.is_empty());
}

#[test]
fn a_compile_error_is_reported_before_anything_runs() {
    match run("set 1 <- 2.") {
        Err(InterpretError::Compile(errors)) => assert!(!errors.is_empty()),
        other => panic!("expected a compile error, got {other:?}"),
    }
}
