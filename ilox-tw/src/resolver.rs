//! This module provides the [`Resolver`].

use ilox_lib::{
    ast::{Expr, FunctionOrMethod, SpanExpr, SpanStmt, Stmt},
    interpreter::ResolveError,
    span::{Span, WithSpan},
};
use std::{collections::HashMap, mem};
use tracing::debug;

/// A result wrapping a [`ResolveError`].
type Result<T = (), E = ResolveError> = ::std::result::Result<T, E>;

/// An enum to determine if the [`Resolver`] is currently in a function. Used to detect badly
/// placed return statements.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum FunctionType {
    /// Not in a function.
    None,

    /// In a free function.
    Function,

    /// In a method on a class.
    Method,

    /// In the init method of a class.
    Initializer,
}

/// An enum to determine if the [`Resolver`] is currently in a class. Used to detect badly placed
/// `this` and `super` expressions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum ClassType {
    /// Not in a class.
    None,

    /// In a class with no superclass.
    Class,

    /// In a class with a superclass.
    Subclass,
}

/// An enum to distinguish different things that a name could refer to. Used for warning reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[allow(clippy::missing_docs_in_private_items)]
enum ScopeValueType {
    Class,
    Function,
    Parameter,
    Variable,
}

impl ScopeValueType {
    /// The word for this kind of name in a diagnostic.
    fn describe(self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Function => "function",
            Self::Parameter => "parameter",
            Self::Variable => "variable",
        }
    }
}

/// A value for the [`scopes`](Resolver.scopes) map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct ScopeValue {
    /// Where was the name declared?
    declaration: Span,

    /// What is the type of the name?
    value_type: ScopeValueType,

    /// Has the name been defined?
    defined: bool,

    /// Has the name been used?
    used: bool,
}

impl ScopeValue {
    /// Create a new value for a name that's just been declared.
    fn new(declaration: Span, value_type: ScopeValueType) -> Self {
        Self {
            declaration,
            value_type,
            defined: false,
            used: false,
        }
    }

    /// Create a value for an implicitly bound name (`this`, `super`), which is always defined and
    /// never warned about.
    fn implicit(declaration: Span) -> Self {
        Self {
            declaration,
            value_type: ScopeValueType::Variable,
            defined: true,
            used: true,
        }
    }
}

/// A type to handle resolving and binding names before runtime.
#[derive(Clone, Debug)]
pub struct Resolver {
    /// A stack of local scopes.
    ///
    /// The global scope is not included and global variables are never
    /// [declared](Self::declare_name) or [defined](Self::define_name).
    ///
    /// The hashmap maps variable names to whether they've been defined and/or used. When a
    /// variable gets declared, its name is added here, and when it is defined or used, the
    /// appropriate value is set to true.
    scopes: Vec<HashMap<String, ScopeValue>>,

    /// A map from a name to its local environment depth. When resolving that name, go up that many
    /// environments in the chain.
    locals: HashMap<WithSpan<String>, usize>,

    /// The type of function that we're currently inside.
    current_function: FunctionType,

    /// The type of class that we're currently inside.
    current_class: ClassType,
}

impl Resolver {
    /// Resolve the given code and get the map of local names to their depths.
    pub fn get_locals_map(stmts: &[SpanStmt]) -> Result<HashMap<WithSpan<String>, usize>> {
        debug!("Beginning resolve pass over {} statement(s)", stmts.len());

        let mut resolver = Self::new();
        resolver.resolve_stmts(stmts)?;
        Ok(resolver.locals)
    }

    /// Create a new Resolver.
    fn new() -> Self {
        Self {
            scopes: Vec::new(),
            locals: HashMap::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
        }
    }

    /// Resolve a list of statements.
    fn resolve_stmts(&mut self, stmts: &[SpanStmt]) -> Result {
        for stmt in stmts {
            self.resolve_stmt(stmt)?;
        }

        Ok(())
    }

    /// Resolve a single statement.
    fn resolve_stmt(&mut self, stmt: &SpanStmt) -> Result {
        match &stmt.value {
            Stmt::Block(body) => {
                self.begin_scope();
                self.resolve_stmts(body)?;
                self.end_scope();
            }
            Stmt::ClassDecl(name, superclass_name, methods) => {
                self.resolve_class_decl(name, superclass_name.as_ref(), methods, stmt.span)?;
            }
            Stmt::VarDecl(name, initializer) => {
                self.declare_name(name.clone(), stmt.span, ScopeValueType::Variable)?;
                if let Some(initializer) = initializer {
                    self.resolve_expr(initializer)?;
                }
                self.define_name(&name.value);
            }
            Stmt::FunDecl((name, params, _right_paren, body)) => {
                self.declare_name(name.clone(), stmt.span, ScopeValueType::Function)?;
                self.define_name(&name.value);
                self.resolve_function(params, body, FunctionType::Function)?;
            }
            Stmt::Expression(expr) => self.resolve_expr(expr)?,
            Stmt::If(condition, then_branch, else_branch) => {
                self.resolve_expr(condition)?;
                self.resolve_stmt(then_branch)?;
                if let Some(else_branch) = else_branch {
                    self.resolve_stmt(else_branch)?;
                }
            }
            Stmt::Print(expr) => self.resolve_expr(expr)?,
            Stmt::Return(keyword_span, expr) => {
                if self.current_function == FunctionType::None {
                    return Err(ResolveError {
                        message: "Cannot return outside of a function".to_string(),
                        lexeme: "return".to_string(),
                        span: *keyword_span,
                    });
                }

                if let Some(expr) = expr {
                    if self.current_function == FunctionType::Initializer {
                        return Err(ResolveError {
                            message: "Cannot return a value from an init method".to_string(),
                            lexeme: "return".to_string(),
                            span: *keyword_span,
                        });
                    }
                    self.resolve_expr(expr)?;
                }
            }
            Stmt::While(condition, body) => {
                self.resolve_expr(condition)?;
                self.resolve_stmt(body)?;
            }
        }

        Ok(())
    }

    /// Resolve a class declaration.
    fn resolve_class_decl(
        &mut self,
        name: &WithSpan<String>,
        superclass_name: Option<&WithSpan<String>>,
        methods: &[WithSpan<FunctionOrMethod>],
        decl_span: Span,
    ) -> Result {
        let enclosing_class = mem::replace(&mut self.current_class, ClassType::Class);

        self.declare_name(name.clone(), decl_span, ScopeValueType::Class)?;
        self.define_name(&name.value);

        if let Some(superclass) = superclass_name {
            if superclass.value == name.value {
                self.current_class = enclosing_class;
                return Err(ResolveError {
                    message: "A class cannot inherit from itself".to_string(),
                    lexeme: superclass.value.clone(),
                    span: superclass.span,
                });
            }

            self.current_class = ClassType::Subclass;
            self.resolve_local(superclass.clone());

            // The scope holding `super`, captured by every method's closure.
            self.begin_scope();
            if let Some(scope) = self.scopes.last_mut() {
                scope.insert(String::from("super"), ScopeValue::implicit(superclass.span));
            }
        }

        self.begin_scope();
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(String::from("this"), ScopeValue::implicit(name.span));
        }

        for method in methods {
            let WithSpan {
                span: _,
                value: (method_name, params, _right_paren, body),
            } = method;
            let declaration = if method_name.value == "init" {
                FunctionType::Initializer
            } else {
                FunctionType::Method
            };
            self.resolve_function(params, body, declaration)?;
        }

        self.end_scope();
        if superclass_name.is_some() {
            self.end_scope();
        }

        self.current_class = enclosing_class;
        Ok(())
    }

    /// Resolve a single expression.
    fn resolve_expr(&mut self, expr: &SpanExpr) -> Result {
        match &expr.value {
            Expr::Variable(name) => {
                if self
                    .scopes
                    .last()
                    .is_some_and(|scope| scope.get(name).is_some_and(|value| !value.defined))
                {
                    return Err(ResolveError {
                        message: "Cannot read local variable in its own initializer".to_string(),
                        lexeme: name.clone(),
                        span: expr.span,
                    });
                }

                self.resolve_local(WithSpan {
                    span: expr.span,
                    value: name.clone(),
                });
            }
            Expr::Assign(name, value) => {
                self.resolve_expr(value)?;
                self.resolve_local(name.clone());
            }
            Expr::Binary(left, _, right) | Expr::Logical(left, _, right) => {
                self.resolve_expr(left)?;
                self.resolve_expr(right)?;
            }
            Expr::Call(callee, arguments, _) => {
                self.resolve_expr(callee)?;
                for arg in arguments {
                    self.resolve_expr(arg)?;
                }
            }
            Expr::Get(object, _) => self.resolve_expr(object)?,
            Expr::Set(object, _, value) => {
                self.resolve_expr(object)?;
                self.resolve_expr(value)?;
            }
            Expr::This => {
                if self.current_class == ClassType::None {
                    return Err(ResolveError {
                        message: "Cannot use 'this' outside of a class".to_string(),
                        lexeme: "this".to_string(),
                        span: expr.span,
                    });
                }

                self.resolve_local(WithSpan {
                    span: expr.span,
                    value: String::from("this"),
                });
            }
            Expr::Super(_) => match self.current_class {
                ClassType::None => {
                    return Err(ResolveError {
                        message: "Cannot use 'super' outside of a class".to_string(),
                        lexeme: "super".to_string(),
                        span: expr.span,
                    });
                }
                ClassType::Class => {
                    return Err(ResolveError {
                        message: "Cannot use 'super' in a class with no superclass".to_string(),
                        lexeme: "super".to_string(),
                        span: expr.span,
                    });
                }
                ClassType::Subclass => {
                    self.resolve_local(WithSpan {
                        span: expr.span,
                        value: String::from("super"),
                    });
                }
            },
            Expr::Grouping(expr) | Expr::Unary(_, expr) => self.resolve_expr(expr)?,
            Expr::Nil | Expr::Boolean(_) | Expr::String(_) | Expr::Number(_) => (),
        }

        Ok(())
    }

    /// Begin a new local scope.
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    /// End a local scope, warning about any names in it that were never read.
    ///
    /// Warnings go through the driver's diagnostic pipeline in source order and never fail
    /// resolution.
    fn end_scope(&mut self) {
        let Some(scope) = self.scopes.pop() else {
            return;
        };

        let mut unused: Vec<(String, ScopeValue)> = scope
            .into_iter()
            .filter(|(_, value)| !value.used)
            .collect();
        unused.sort_by_key(|(_, value)| value.declaration.start);

        for (name, value) in unused {
            ilox_lib::lox::report_warning(
                value.declaration,
                &name,
                &format!("Unused {} '{name}'", value.value_type.describe()),
            );
        }
    }

    /// Declare the given name to exist in the current scope, but not yet be defined.
    fn declare_name(
        &mut self,
        name: WithSpan<String>,
        declaration: Span,
        value_type: ScopeValueType,
    ) -> Result {
        if let Some(scope) = self.scopes.last_mut() {
            if scope.contains_key(&name.value) {
                return Err(ResolveError {
                    message: format!("Already declared variable '{}' in this scope", &name.value),
                    lexeme: name.value,
                    span: name.span,
                });
            }
            scope.insert(name.value, ScopeValue::new(declaration, value_type));
        }
        Ok(())
    }

    /// Define the given name in the current scope, setting its value to true.
    fn define_name(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            let x = scope.get_mut(name).expect(
                "We should only call define_name() after calling declare_name() with the same name",
            );
            x.defined = true;
        }
    }

    /// Resolve a name in a local scope by traversing up the scope stack to find the definition of
    /// the name, and add it to [`self.locals`](Resolver.locals).
    ///
    /// A name found in no scope is a global and gets no entry.
    fn resolve_local(&mut self, name: WithSpan<String>) {
        let num = self.scopes.len().saturating_sub(1);

        for (idx, scope) in self.scopes.iter_mut().enumerate().rev() {
            if let Some(scope_value) = scope.get_mut(&name.value) {
                scope_value.used = true;
                self.locals.insert(name, num.saturating_sub(idx));
                return;
            }
        }
    }

    /// Resolve a function or method declaration.
    fn resolve_function(
        &mut self,
        params: &[WithSpan<String>],
        body: &[SpanStmt],
        function_type: FunctionType,
    ) -> Result {
        let enclosing_function = mem::replace(&mut self.current_function, function_type);

        self.begin_scope();

        for param in params {
            self.declare_name(param.clone(), param.span, ScopeValueType::Parameter)?;
            self.define_name(&param.value);
        }
        let result = self.resolve_stmts(body);

        self.end_scope();
        self.current_function = enclosing_function;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ilox_lib::{parser::Parser, scanner::Scanner};

    fn resolve(code: &str) -> Result<HashMap<WithSpan<String>, usize>> {
        Resolver::get_locals_map(&Parser::parse(Scanner::scan_tokens(code).unwrap()).unwrap())
    }

    /// Collect the (name, depth) pairs from the locals map, sorted for stable comparison.
    fn depths(locals: &HashMap<WithSpan<String>, usize>) -> Vec<(String, usize)> {
        let mut pairs: Vec<_> = locals
            .iter()
            .map(|(name, depth)| (name.value.clone(), *depth))
            .collect();
        pairs.sort();
        pairs
    }

    #[test]
    fn globals_are_absent_from_the_map() {
        let locals = resolve("var a = 1; print a; a = 2;").unwrap();
        assert!(locals.is_empty());
    }

    #[test]
    fn block_locals_get_depths() {
        let locals = resolve("{ var a = 1; { print a; } print a; }").unwrap();

        assert_eq!(
            depths(&locals),
            vec![("a".to_string(), 0), ("a".to_string(), 1)]
        );
    }

    #[test]
    fn closures_capture_across_function_boundaries() {
        let locals = resolve("fun outer() { var i = 0; fun inner() { i = i + 1; } inner(); }")
            .unwrap();

        // Both uses of `i` inside `inner` sit one scope out; the call to `inner` is in the same
        // scope as its declaration.
        let mut i_depths: Vec<_> = locals
            .iter()
            .filter(|(name, _)| name.value == "i")
            .map(|(_, depth)| *depth)
            .collect();
        i_depths.sort();
        assert_eq!(i_depths, vec![1, 1]);

        let inner_depth = locals
            .iter()
            .find(|(name, _)| name.value == "inner")
            .map(|(_, depth)| *depth);
        assert_eq!(inner_depth, Some(0));
    }

    #[test]
    fn this_and_super_are_resolved_in_methods() {
        let locals = resolve(
            "class A { greet() { return 1; } }\n\
             class B < A { greet() { return super.greet() + this.offset; } }",
        )
        .unwrap();

        // `super` sits two scopes out from the method body, `this` one scope out.
        let find = |wanted: &str| {
            locals
                .iter()
                .find(|(name, _)| name.value == wanted)
                .map(|(_, depth)| *depth)
        };
        assert_eq!(find("super"), Some(2));
        assert_eq!(find("this"), Some(1));
    }

    #[test]
    fn redeclaration_in_same_scope_is_an_error() {
        let error = resolve("{ var a = 1; var a = 2; }").unwrap_err();
        assert_eq!(error.message, "Already declared variable 'a' in this scope");

        // Redeclaring a global is fine.
        assert!(resolve("var a = 1; var a = 2;").is_ok());
    }

    #[test]
    fn reading_a_local_in_its_own_initializer_is_an_error() {
        let error = resolve("{ var a = a; }").unwrap_err();
        assert_eq!(
            error.message,
            "Cannot read local variable in its own initializer"
        );

        // At global scope the rule does not apply: the initializer reads the old global.
        assert!(resolve("var a = 1; var a = a;").is_ok());
    }

    #[test]
    fn top_level_return_is_an_error() {
        let error = resolve("return 1;").unwrap_err();
        assert_eq!(error.message, "Cannot return outside of a function");

        assert!(resolve("fun f() { return 1; }").is_ok());
    }

    #[test]
    fn returning_a_value_from_init_is_an_error() {
        let error = resolve("class A { init() { return 2; } }").unwrap_err();
        assert_eq!(error.message, "Cannot return a value from an init method");

        // A bare return in init is legal.
        assert!(resolve("class A { init() { return; } }").is_ok());
    }

    #[test]
    fn this_outside_a_class_is_an_error() {
        let error = resolve("print this;").unwrap_err();
        assert_eq!(error.message, "Cannot use 'this' outside of a class");

        let error = resolve("fun f() { return this; }").unwrap_err();
        assert_eq!(error.message, "Cannot use 'this' outside of a class");
    }

    #[test]
    fn super_outside_a_class_is_an_error() {
        let error = resolve("fun f() { return super.f(); }").unwrap_err();
        assert_eq!(error.message, "Cannot use 'super' outside of a class");
    }

    #[test]
    fn super_without_a_superclass_is_an_error() {
        let error = resolve("class A { f() { return super.f(); } }").unwrap_err();
        assert_eq!(
            error.message,
            "Cannot use 'super' in a class with no superclass"
        );
    }

    #[test]
    fn self_inheritance_is_an_error() {
        let error = resolve("class A < A {}").unwrap_err();
        assert_eq!(error.message, "A class cannot inherit from itself");
        assert_eq!(error.lexeme, "A");
    }
}
