//! This module provides [`TwInterpreter`].

use crate::resolver::Resolver;
use ilox_lib::{
    ast::{
        BinaryOperator, Expr, FunctionOrMethod, LogicalOperator, SpanExpr, SpanStmt, Stmt,
        UnaryOperator,
    },
    callable::{lox_function::LoxFunction, native::Clock, LoxCallable},
    class::{LoxClass, LoxInstance},
    environment::Environment,
    interpreter::{ErrorOrReturn, Interpreter, ResolveError, Result, RuntimeError},
    object::{LoxObject, SpanObject},
    span::{Span, WithSpan},
};
use std::{cell::RefCell, collections::HashMap, rc::Rc};
use tracing::trace;

/// A tree-walk Lox interpreter.
#[derive(Clone, Debug)]
pub struct TwInterpreter {
    /// The global environment, pre-populated with the native functions.
    global_env: Rc<RefCell<Environment>>,

    /// The environment of the scope currently being executed.
    environment: Rc<RefCell<Environment>>,

    /// The resolved depths of local variable uses, accumulated across [`resolve`] calls so that
    /// REPL lines can refer to names resolved earlier.
    ///
    /// [`resolve`]: Interpreter::resolve
    locals: HashMap<WithSpan<String>, usize>,
}

impl Interpreter for TwInterpreter {
    fn new() -> Self {
        let global_env = Rc::new(RefCell::new(Environment::default()));
        global_env.borrow_mut().define(
            String::from("clock"),
            LoxObject::NativeFunction(Rc::new(Clock)),
        );

        Self {
            environment: Rc::clone(&global_env),
            global_env,
            locals: HashMap::new(),
        }
    }

    fn resolve(&mut self, stmts: &[SpanStmt]) -> ::std::result::Result<(), ResolveError> {
        let locals = Resolver::get_locals_map(stmts)?;
        trace!(?locals);
        self.locals.extend(locals);
        Ok(())
    }

    fn interpret(&mut self, stmts: &[SpanStmt]) -> ::std::result::Result<(), RuntimeError> {
        match self.execute_statements(stmts) {
            Ok(()) => Ok(()),
            Err(ErrorOrReturn::Error(error)) => Err(error),
            Err(ErrorOrReturn::Return(_)) => {
                unreachable!("The resolver rejects return statements outside of functions")
            }
        }
    }

    fn execute_block(
        &mut self,
        stmts: &[SpanStmt],
        environment: Option<Rc<RefCell<Environment>>>,
    ) -> Result<()> {
        let previous = Rc::clone(&self.environment);

        match environment {
            Some(environment) => self.environment = environment,
            None => Environment::wrap_with_new_env(&mut self.environment),
        }

        let result = self.execute_statements(stmts);
        self.environment = previous;
        result
    }
}

impl TwInterpreter {
    /// Execute the given statements.
    fn execute_statements(&mut self, stmts: &[SpanStmt]) -> Result<()> {
        for stmt in stmts {
            self.execute_statement(stmt)?;
        }
        Ok(())
    }

    /// Execute the given statement.
    fn execute_statement(&mut self, stmt: &SpanStmt) -> Result<()> {
        match &stmt.value {
            Stmt::Expression(expr) => {
                self.evaluate_expression(expr)?;
            }
            Stmt::Print(expr) => println!("{}", self.evaluate_expression(expr)?.print()),
            Stmt::VarDecl(name, initializer) => self.execute_var_decl(name, initializer)?,
            Stmt::FunDecl((name, params, _right_paren, body)) => {
                let function = LoxFunction::new(
                    name.clone(),
                    params.clone(),
                    body.clone(),
                    Rc::clone(&self.environment),
                    false,
                );
                self.environment
                    .borrow_mut()
                    .define(name.value.clone(), LoxObject::LoxFunction(Rc::new(function)));
            }
            Stmt::ClassDecl(name, superclass_name, methods) => {
                self.execute_class_decl(name, superclass_name.as_ref(), methods)?;
            }
            Stmt::If(condition, then_branch, else_branch) => {
                if self.evaluate_expression(condition)?.is_truthy() {
                    self.execute_statement(then_branch)?;
                } else if let Some(else_branch) = else_branch {
                    self.execute_statement(else_branch)?;
                }
            }
            Stmt::While(condition, body) => {
                while self.evaluate_expression(condition)?.is_truthy() {
                    self.execute_statement(body)?;
                }
            }
            Stmt::Return(keyword_span, expr) => {
                let value = match expr {
                    Some(expr) => self.evaluate_expression(expr)?,
                    None => WithSpan {
                        span: *keyword_span,
                        value: LoxObject::Nil,
                    },
                };
                return Err(ErrorOrReturn::Return(value));
            }
            Stmt::Block(stmts) => self.execute_block(stmts, None)?,
        }

        Ok(())
    }

    /// Execute a variable declaration in the current environment.
    fn execute_var_decl(
        &mut self,
        name: &WithSpan<String>,
        initializer: &Option<SpanExpr>,
    ) -> Result<()> {
        let value = match initializer {
            Some(expr) => self.evaluate_expression(expr)?.value,
            None => LoxObject::Nil,
        };
        self.environment.borrow_mut().define(name.value.clone(), value);
        Ok(())
    }

    /// Execute a class declaration in the current environment.
    ///
    /// The name is defined before the class value is built, so that methods can refer to the
    /// class by name.
    fn execute_class_decl(
        &mut self,
        name: &WithSpan<String>,
        superclass_name: Option<&WithSpan<String>>,
        methods: &[WithSpan<FunctionOrMethod>],
    ) -> Result<()> {
        let superclass = match superclass_name {
            Some(superclass_name) => match self.look_up_variable(superclass_name)? {
                LoxObject::LoxClass(class) => Some(class),
                other => {
                    return Err(RuntimeError {
                        message: format!(
                            "Superclass must be a class, found {}",
                            other.type_name()
                        ),
                        lexeme: superclass_name.value.clone(),
                        span: superclass_name.span,
                    }
                    .into())
                }
            },
            None => None,
        };
        let has_superclass = superclass.is_some();

        self.environment
            .borrow_mut()
            .define(name.value.clone(), LoxObject::Nil);

        if let Some(superclass) = &superclass {
            // The scope holding `super`, captured by every method's closure.
            Environment::wrap_with_new_env(&mut self.environment);
            self.environment
                .borrow_mut()
                .define(String::from("super"), LoxObject::LoxClass(Rc::clone(superclass)));
        }

        let mut method_map = HashMap::new();
        for method in methods {
            let (method_name, params, _right_paren, body) = &method.value;
            let function = LoxFunction::new(
                method_name.clone(),
                params.clone(),
                body.clone(),
                Rc::clone(&self.environment),
                method_name.value == "init",
            );
            method_map.insert(method_name.value.clone(), Rc::new(function));
        }

        let class = LoxClass::new(name.clone(), superclass, method_map);

        if has_superclass {
            Environment::pop_env(&mut self.environment);
        }

        self.environment
            .borrow_mut()
            .assign(name, LoxObject::LoxClass(Rc::new(class)))?;

        Ok(())
    }

    /// Evaluate the given expression.
    fn evaluate_expression(&mut self, expr: &SpanExpr) -> Result<SpanObject> {
        let mut span = expr.span;

        let value = match &expr.value {
            Expr::Nil => LoxObject::Nil,
            Expr::Boolean(b) => LoxObject::Boolean(*b),
            Expr::Number(number) => LoxObject::Number(*number),
            Expr::String(string) => LoxObject::String(string.clone()),
            Expr::Variable(name) => self.look_up_variable(&WithSpan {
                span,
                value: name.clone(),
            })?,
            Expr::Assign(name, r_value) => {
                let value = self.evaluate_expression(r_value)?.value;
                if let Some(&depth) = self.locals.get(name) {
                    Environment::assign_at_depth(&self.environment, depth, name, value.clone());
                } else {
                    self.global_env.borrow_mut().assign(name, value.clone())?;
                }
                value
            }
            Expr::Unary(operator, operand) => {
                let operand = self.evaluate_expression(operand)?;
                let WithSpan {
                    span: new_span,
                    value,
                } = Self::evaluate_unary_expression(*operator, operand)?;
                span = new_span;
                value
            }
            Expr::Binary(left, operator, right) => {
                let left = self.evaluate_expression(left)?;
                let right = self.evaluate_expression(right)?;
                let WithSpan {
                    span: new_span,
                    value,
                } = Self::evaluate_binary_expression(*operator, left, right)?;
                span = new_span;
                value
            }
            Expr::Logical(left, operator, right) => {
                let left = self.evaluate_expression(left)?;
                let short_circuit = match operator.value {
                    LogicalOperator::Or => left.is_truthy(),
                    LogicalOperator::And => !left.is_truthy(),
                };

                if short_circuit {
                    left.value
                } else {
                    self.evaluate_expression(right)?.value
                }
            }
            Expr::Call(callee, arguments, close_paren) => {
                self.evaluate_call(callee, arguments, *close_paren)?
            }
            Expr::Grouping(inner) => self.evaluate_expression(inner)?.value,
            Expr::Get(object, name) => {
                let object = self.evaluate_expression(object)?;
                match &object.value {
                    LoxObject::LoxInstance(instance) => LoxInstance::get(instance, name)?,
                    other => {
                        return Err(RuntimeError {
                            message: format!(
                                "Only instances have fields, found {}",
                                other.type_name()
                            ),
                            lexeme: name.value.clone(),
                            span: name.span,
                        }
                        .into())
                    }
                }
            }
            Expr::Set(object, name, r_value) => {
                let object = self.evaluate_expression(object)?;
                match &object.value {
                    LoxObject::LoxInstance(instance) => {
                        let value = self.evaluate_expression(r_value)?.value;
                        instance.borrow_mut().set(name, value.clone());
                        value
                    }
                    other => {
                        return Err(RuntimeError {
                            message: format!(
                                "Only instances have fields, found {}",
                                other.type_name()
                            ),
                            lexeme: name.value.clone(),
                            span: name.span,
                        }
                        .into())
                    }
                }
            }
            Expr::This => self.look_up_variable(&WithSpan {
                span,
                value: String::from("this"),
            })?,
            Expr::Super(method) => self.evaluate_super(span, method)?,
        };

        Ok(WithSpan { span, value })
    }

    /// Look up a variable, using its resolved depth if it has one, or the global environment
    /// otherwise.
    fn look_up_variable(
        &self,
        name: &WithSpan<String>,
    ) -> ::std::result::Result<LoxObject, RuntimeError> {
        if let Some(&depth) = self.locals.get(name) {
            Ok(Environment::get_at_depth(&self.environment, depth, name))
        } else {
            self.global_env.borrow().get(name)
        }
    }

    /// Evaluate a `super.method` expression.
    ///
    /// `super` lives in its resolved scope and `this` in the scope one level inward, so the
    /// superclass method gets bound to the instance the enclosing method was called on.
    fn evaluate_super(&mut self, span: Span, method: &WithSpan<String>) -> Result<LoxObject> {
        let super_key = WithSpan {
            span,
            value: String::from("super"),
        };
        let depth = *self
            .locals
            .get(&super_key)
            .unwrap_or_else(|| panic!("'super' should always be resolved (span = {span:?})"));

        let LoxObject::LoxClass(superclass) =
            Environment::get_at_depth(&self.environment, depth, &super_key)
        else {
            unreachable!("'super' always refers to a class");
        };

        let this_object = Environment::get_at_depth(
            &self.environment,
            depth - 1,
            &WithSpan {
                span,
                value: String::from("this"),
            },
        );

        match superclass.find_method(&method.value) {
            Some(function) => Ok(LoxObject::LoxFunction(function.bind_this(this_object))),
            None => Err(RuntimeError {
                message: format!("Undefined property '{}'", method.value),
                lexeme: method.value.clone(),
                span: method.span,
            }
            .into()),
        }
    }

    /// Evaluate a call expression: the callee, then the arguments left to right, then the call
    /// itself.
    fn evaluate_call(
        &mut self,
        callee: &SpanExpr,
        arguments: &[SpanExpr],
        close_paren: Span,
    ) -> Result<LoxObject> {
        let callee = self.evaluate_expression(callee)?;

        let mut evaluated_args = Vec::with_capacity(arguments.len());
        for argument in arguments {
            evaluated_args.push(self.evaluate_expression(argument)?);
        }

        let callable: &dyn LoxCallable = match &callee.value {
            LoxObject::NativeFunction(function) => function.as_ref(),
            LoxObject::LoxFunction(function) => function.as_ref(),
            LoxObject::LoxClass(class) => class,
            other => {
                return Err(RuntimeError {
                    message: format!(
                        "Can only call functions and classes, found {}",
                        other.type_name()
                    ),
                    lexeme: other.type_name(),
                    span: callee.span,
                }
                .into())
            }
        };

        if evaluated_args.len() != callable.arity() as usize {
            return Err(callable
                .bad_arity_error(callee.span, &evaluated_args, close_paren)
                .into());
        }

        Ok(callable.call(self, callee.span, &evaluated_args, close_paren)?)
    }

    /// Evaluate a binary expression.
    ///
    /// Equality accepts any pair of operands; `+` accepts two numbers or two strings; the rest
    /// require numbers. Division is IEEE-754, so dividing by zero is not an error.
    fn evaluate_binary_expression(
        operator: WithSpan<BinaryOperator>,
        left: SpanObject,
        right: SpanObject,
    ) -> Result<SpanObject> {
        use BinaryOperator::*;
        use LoxObject::*;

        let WithSpan {
            span: left_span,
            value: left,
        } = left;
        let WithSpan {
            span: right_span,
            value: right,
        } = right;
        let WithSpan {
            span: op_span,
            value: operator,
        } = operator;
        let span = left_span.union(&right_span).union(&op_span);

        let value = match operator {
            EqualEqual => Boolean(left == right),
            BangEqual => Boolean(left != right),
            Plus => match (&left, &right) {
                (Number(a), Number(b)) => Number(a + b),
                (String(a), String(b)) => String(a.clone() + b),
                _ => {
                    return Err(RuntimeError {
                        message: format!(
                            "Invalid operands for '+': expected two numbers or two strings, found {} and {}",
                            left.type_name(),
                            right.type_name()
                        ),
                        lexeme: operator.to_string(),
                        span,
                    }
                    .into())
                }
            },
            Minus | Slash | Star | Greater | GreaterEqual | Less | LessEqual => {
                let (Number(a), Number(b)) = (&left, &right) else {
                    return Err(RuntimeError {
                        message: format!(
                            "Invalid operands for '{operator}': expected numbers, found {} and {}",
                            left.type_name(),
                            right.type_name()
                        ),
                        lexeme: operator.to_string(),
                        span,
                    }
                    .into());
                };

                match operator {
                    Minus => Number(a - b),
                    Slash => Number(a / b),
                    Star => Number(a * b),
                    Greater => Boolean(a > b),
                    GreaterEqual => Boolean(a >= b),
                    Less => Boolean(a < b),
                    LessEqual => Boolean(a <= b),
                    Plus | BangEqual | EqualEqual => {
                        unreachable!("These operators are handled in the outer match")
                    }
                }
            }
        };

        Ok(WithSpan { span, value })
    }

    /// Evaluate a unary expression.
    fn evaluate_unary_expression(
        operator: WithSpan<UnaryOperator>,
        operand: SpanObject,
    ) -> Result<SpanObject> {
        use LoxObject::*;
        use UnaryOperator::*;

        let WithSpan { span, value } = operand;
        let WithSpan {
            span: op_span,
            value: operator,
        } = operator;
        let span = span.union(&op_span);

        let value = match (operator, &value) {
            (Bang, _) => Boolean(!value.is_truthy()),
            (Minus, Number(n)) => Number(-*n),
            (Minus, _) => {
                return Err(RuntimeError {
                    message: format!(
                        "Invalid operand for unary '-': expected number, found {}",
                        value.type_name()
                    ),
                    lexeme: operator.to_string(),
                    span,
                }
                .into())
            }
        };

        Ok(WithSpan { span, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ilox_lib::{lox::LoxError, parser::Parser, scanner::Scanner};

    /// Run the full pipeline over the given code with a fresh interpreter.
    fn run(code: &str) -> ::std::result::Result<TwInterpreter, LoxError> {
        let mut interpreter = TwInterpreter::new();
        run_with(&mut interpreter, code)?;
        Ok(interpreter)
    }

    /// Run the full pipeline over the given code with an existing interpreter, like one REPL line.
    fn run_with(
        interpreter: &mut TwInterpreter,
        code: &str,
    ) -> ::std::result::Result<(), LoxError> {
        let tokens = Scanner::scan_tokens(code)?;
        let stmts = Parser::parse(tokens)?;
        interpreter.resolve(&stmts)?;
        interpreter.interpret(&stmts)?;
        Ok(())
    }

    /// Get the value of a global variable after a run.
    fn global(interpreter: &TwInterpreter, name: &str) -> LoxObject {
        interpreter
            .global_env
            .borrow()
            .values
            .get(name)
            .cloned()
            .unwrap_or_else(|| panic!("Global '{name}' should be defined"))
    }

    /// Unwrap a runtime error from a run.
    fn runtime_error(result: ::std::result::Result<TwInterpreter, LoxError>) -> RuntimeError {
        match result {
            Err(LoxError::Runtime(error)) => error,
            other => panic!("Expected a runtime error, got {other:?}"),
        }
    }

    #[test]
    fn arithmetic_and_grouping() {
        let interpreter = run("var x = (5 - (3 - 1)) + -1;").unwrap();
        assert_eq!(global(&interpreter, "x"), LoxObject::Number(2.0));
    }

    #[test]
    fn string_concatenation() {
        let interpreter = run("var s = \"foo\" + \"bar\";").unwrap();
        assert_eq!(
            global(&interpreter, "s"),
            LoxObject::String("foobar".to_string())
        );
    }

    #[test]
    fn division_by_zero_is_ieee() {
        let interpreter = run("var x = 1 / 0; var y = 0 / 0;").unwrap();
        assert!(matches!(
            global(&interpreter, "x"),
            LoxObject::Number(n) if n.is_infinite()
        ));
        assert!(matches!(
            global(&interpreter, "y"),
            LoxObject::Number(n) if n.is_nan()
        ));
    }

    #[test]
    fn mixed_plus_is_an_error() {
        let error = runtime_error(run("var x = 1 + \"a\";"));
        assert!(error.message.starts_with("Invalid operands for '+'"));
    }

    #[test]
    fn comparison_requires_numbers() {
        let error = runtime_error(run("var x = \"a\" < \"b\";"));
        assert!(error.message.starts_with("Invalid operands for '<'"));
    }

    #[test]
    fn unary_minus_requires_a_number() {
        let error = runtime_error(run("var x = -\"a\";"));
        assert!(error.message.starts_with("Invalid operand for unary '-'"));
    }

    #[test]
    fn equality_accepts_any_operands() {
        let interpreter = run(
            "var a = 1 == 1;\n\
             var b = \"x\" == \"x\";\n\
             var c = nil == nil;\n\
             var d = 0 == \"\";\n\
             var e = nil == false;\n\
             var f = 1 != 2;",
        )
        .unwrap();

        assert_eq!(global(&interpreter, "a"), LoxObject::Boolean(true));
        assert_eq!(global(&interpreter, "b"), LoxObject::Boolean(true));
        assert_eq!(global(&interpreter, "c"), LoxObject::Boolean(true));
        assert_eq!(global(&interpreter, "d"), LoxObject::Boolean(false));
        assert_eq!(global(&interpreter, "e"), LoxObject::Boolean(false));
        assert_eq!(global(&interpreter, "f"), LoxObject::Boolean(true));
    }

    #[test]
    fn functions_compare_by_identity_and_instances_never_compare() {
        let interpreter = run(
            "fun f() {}\n\
             var same_function = f == f;\n\
             class A {}\n\
             var p = A();\n\
             var same_instance = p == p;",
        )
        .unwrap();

        assert_eq!(
            global(&interpreter, "same_function"),
            LoxObject::Boolean(true)
        );
        assert_eq!(
            global(&interpreter, "same_instance"),
            LoxObject::Boolean(false)
        );
    }

    #[test]
    fn truthiness_boundaries() {
        let interpreter = run(
            "var x; var y; var z;\n\
             if (0) x = 1; else x = 2;\n\
             if (\"\") y = 1; else y = 2;\n\
             if (nil) z = 1; else z = 2;",
        )
        .unwrap();

        assert_eq!(global(&interpreter, "x"), LoxObject::Number(1.0));
        assert_eq!(global(&interpreter, "y"), LoxObject::Number(1.0));
        assert_eq!(global(&interpreter, "z"), LoxObject::Number(2.0));
    }

    #[test]
    fn logical_operators_short_circuit() {
        let interpreter = run(
            "var called = false;\n\
             fun side() { called = true; return true; }\n\
             var a = true or side();\n\
             var b = false and side();",
        )
        .unwrap();

        assert_eq!(global(&interpreter, "called"), LoxObject::Boolean(false));
        assert_eq!(global(&interpreter, "a"), LoxObject::Boolean(true));
        assert_eq!(global(&interpreter, "b"), LoxObject::Boolean(false));
    }

    #[test]
    fn logical_operators_return_the_deciding_value() {
        let interpreter = run("var a = nil or \"fallback\"; var b = 1 and 2;").unwrap();

        assert_eq!(
            global(&interpreter, "a"),
            LoxObject::String("fallback".to_string())
        );
        assert_eq!(global(&interpreter, "b"), LoxObject::Number(2.0));
    }

    #[test]
    fn closures_capture_their_environment() {
        let interpreter = run(
            "fun makeCounter() {\n\
                 var i = 0;\n\
                 fun count() { i = i + 1; return i; }\n\
                 return count;\n\
             }\n\
             var counter = makeCounter();\n\
             var first = counter();\n\
             var second = counter();",
        )
        .unwrap();

        assert_eq!(global(&interpreter, "first"), LoxObject::Number(1.0));
        assert_eq!(global(&interpreter, "second"), LoxObject::Number(2.0));
    }

    #[test]
    fn lexical_scoping_is_static() {
        let interpreter = run(
            "var a = \"global\";\n\
             var first; var second; var shadow;\n\
             {\n\
                 fun show() { return a; }\n\
                 first = show();\n\
                 var a = \"local\";\n\
                 second = show();\n\
                 shadow = a;\n\
             }",
        )
        .unwrap();

        // `show` captured the global `a` at declaration; the later shadowing `a` is invisible
        // to it.
        assert_eq!(
            global(&interpreter, "first"),
            LoxObject::String("global".to_string())
        );
        assert_eq!(
            global(&interpreter, "second"),
            LoxObject::String("global".to_string())
        );
        assert_eq!(
            global(&interpreter, "shadow"),
            LoxObject::String("local".to_string())
        );
    }

    #[test]
    fn for_loops_desugar_and_run() {
        let interpreter =
            run("var sum = 0; for (var i = 0; i < 3; i = i + 1) sum = sum + i;").unwrap();
        assert_eq!(global(&interpreter, "sum"), LoxObject::Number(3.0));
    }

    #[test]
    fn while_loops_see_body_mutations() {
        let interpreter = run("var i = 0; while (i < 5) i = i + 1;").unwrap();
        assert_eq!(global(&interpreter, "i"), LoxObject::Number(5.0));
    }

    #[test]
    fn return_unwinds_nested_statements() {
        let interpreter = run("fun f() { for (;;) { return 7; } } var x = f();").unwrap();
        assert_eq!(global(&interpreter, "x"), LoxObject::Number(7.0));
    }

    #[test]
    fn functions_without_return_yield_nil() {
        let interpreter = run("fun f() {} var x = f();").unwrap();
        assert_eq!(global(&interpreter, "x"), LoxObject::Nil);
    }

    #[test]
    fn init_populates_fields() {
        let interpreter = run(
            "class A { init() { this.x = 1; } }\n\
             var x = A().x;",
        )
        .unwrap();
        assert_eq!(global(&interpreter, "x"), LoxObject::Number(1.0));
    }

    #[test]
    fn init_with_bare_return_yields_this() {
        let interpreter = run(
            "class A { init() { this.x = 5; return; } }\n\
             var a = A();\n\
             var x = a.x;",
        )
        .unwrap();

        assert!(matches!(global(&interpreter, "a"), LoxObject::LoxInstance(_)));
        assert_eq!(global(&interpreter, "x"), LoxObject::Number(5.0));
    }

    #[test]
    fn init_takes_constructor_arguments() {
        let interpreter = run(
            "class Point { init(x, y) { this.x = x; this.y = y; } }\n\
             var p = Point(3, 4);\n\
             var x = p.x; var y = p.y;",
        )
        .unwrap();

        assert_eq!(global(&interpreter, "x"), LoxObject::Number(3.0));
        assert_eq!(global(&interpreter, "y"), LoxObject::Number(4.0));
    }

    #[test]
    fn fields_are_per_instance() {
        let interpreter = run(
            "class A {}\n\
             var a = A(); var b = A();\n\
             a.x = 1; b.x = 2;\n\
             var ax = a.x; var bx = b.x;",
        )
        .unwrap();

        assert_eq!(global(&interpreter, "ax"), LoxObject::Number(1.0));
        assert_eq!(global(&interpreter, "bx"), LoxObject::Number(2.0));
    }

    #[test]
    fn methods_bind_this_to_their_instance() {
        let interpreter = run(
            "class C { m() { return this; } }\n\
             var inst = C();\n\
             var got = inst.m();",
        )
        .unwrap();

        let (LoxObject::LoxInstance(inst), LoxObject::LoxInstance(got)) =
            (global(&interpreter, "inst"), global(&interpreter, "got"))
        else {
            panic!("Both globals should be instances");
        };
        assert!(Rc::ptr_eq(&inst, &got));
    }

    #[test]
    fn bound_methods_can_be_stored_and_called_later() {
        let interpreter = run(
            "class C { init() { this.x = 9; } get() { return this.x; } }\n\
             var m = C().get;\n\
             var x = m();",
        )
        .unwrap();
        assert_eq!(global(&interpreter, "x"), LoxObject::Number(9.0));
    }

    #[test]
    fn inheritance_finds_superclass_methods() {
        let interpreter = run(
            "class A { greet() { return \"a\"; } }\n\
             class B < A {}\n\
             var g = B().greet();",
        )
        .unwrap();
        assert_eq!(global(&interpreter, "g"), LoxObject::String("a".to_string()));
    }

    #[test]
    fn super_calls_the_superclass_method() {
        let interpreter = run(
            "class A { greet() { return \"a\"; } }\n\
             class B < A { greet() { return super.greet() + \"b\"; } }\n\
             var g = B().greet();",
        )
        .unwrap();
        assert_eq!(
            global(&interpreter, "g"),
            LoxObject::String("ab".to_string())
        );
    }

    #[test]
    fn super_binds_this_from_the_call_site() {
        let interpreter = run(
            "class A { name() { return this.id; } }\n\
             class B < A { name() { return super.name() + \"!\"; } }\n\
             var b = B();\n\
             b.id = \"b\";\n\
             var n = b.name();",
        )
        .unwrap();
        assert_eq!(
            global(&interpreter, "n"),
            LoxObject::String("b!".to_string())
        );
    }

    #[test]
    fn superclass_must_be_a_class() {
        let error = runtime_error(run("var NotAClass = 1; class B < NotAClass {}"));
        assert!(error.message.starts_with("Superclass must be a class"));
    }

    #[test]
    fn arity_mismatch_reports_the_expected_count() {
        let error = runtime_error(run("fun add(a, b) { return a + b; } add(1, 2, 3);"));
        assert_eq!(
            error.message,
            "Expected 2 arguments in function call but got 3"
        );
        assert_eq!(error.lexeme, "add");
    }

    #[test]
    fn calling_a_non_callable_is_an_error() {
        let error = runtime_error(run("var x = \"hi\"; x();"));
        assert!(error.message.starts_with("Can only call functions and classes"));
    }

    #[test]
    fn undefined_variable_is_a_runtime_error() {
        let error = runtime_error(run("print missing;"));
        assert_eq!(error.message, "Undefined variable 'missing'");

        let error = runtime_error(run("missing = 1;"));
        assert_eq!(error.message, "Undefined variable 'missing'");
    }

    #[test]
    fn undefined_property_is_a_runtime_error() {
        let error = runtime_error(run("class A {} var a = A(); print a.missing;"));
        assert_eq!(error.message, "Undefined property 'missing'");
    }

    #[test]
    fn only_instances_have_fields() {
        let error = runtime_error(run("var x = 1; print x.field;"));
        assert!(error.message.starts_with("Only instances have fields"));

        let error = runtime_error(run("var x = 1; x.field = 2;"));
        assert!(error.message.starts_with("Only instances have fields"));
    }

    #[test]
    fn clock_returns_a_positive_number() {
        let interpreter = run("var t = clock();").unwrap();
        assert!(matches!(
            global(&interpreter, "t"),
            LoxObject::Number(n) if n > 0.0
        ));
    }

    #[test]
    fn state_persists_across_runs_like_a_repl() {
        let mut interpreter = TwInterpreter::new();

        run_with(&mut interpreter, "var x = 1;").unwrap();
        run_with(&mut interpreter, "var y = x + 1;").unwrap();
        run_with(&mut interpreter, "fun double(n) { return n * 2; }").unwrap();
        run_with(&mut interpreter, "var z = double(y);").unwrap();

        assert_eq!(global(&interpreter, "z"), LoxObject::Number(4.0));
    }
}
