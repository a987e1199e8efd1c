//! This module provides [`LoxClass`] and [`LoxInstance`].

use crate::{
    callable::{lox_function::LoxFunction, LoxCallable},
    interpreter::{Interpreter, RuntimeError},
    object::{LoxObject, SpanObject},
    span::{Span, WithSpan},
};
use std::{cell::RefCell, collections::HashMap, rc::Rc};

/// A class itself, used to create instances.
#[derive(Clone, Debug)]
pub struct LoxClass {
    /// The name of the class, including the span where it was defined.
    name: WithSpan<String>,

    /// The class that this class inherits from, if any.
    superclass: Option<Rc<LoxClass>>,

    /// The methods of this class, keyed by name. Each method's closure contains `this` (and
    /// `super` when the class has a superclass).
    methods: HashMap<String, Rc<LoxFunction>>,
}

impl LoxClass {
    /// Create a new Lox class.
    pub fn new(
        name: WithSpan<String>,
        superclass: Option<Rc<LoxClass>>,
        methods: HashMap<String, Rc<LoxFunction>>,
    ) -> Self {
        Self {
            name,
            superclass,
            methods,
        }
    }

    /// Find the method with the given name, walking up the superclass chain.
    pub fn find_method(&self, name: &str) -> Option<Rc<LoxFunction>> {
        self.methods.get(name).map(Rc::clone).or_else(|| {
            self.superclass
                .as_ref()
                .and_then(|superclass| superclass.find_method(name))
        })
    }
}

impl LoxCallable for Rc<LoxClass> {
    fn name(&self) -> &str {
        &self.name.value
    }

    fn arity(&self) -> u8 {
        self.find_method("init").map_or(0, |init| init.arity())
    }

    fn call(
        &self,
        interpreter: &mut dyn Interpreter,
        callee_span: Span,
        arguments: &[SpanObject],
        close_paren: Span,
    ) -> Result<LoxObject, RuntimeError> {
        let instance = Rc::new(RefCell::new(LoxInstance::new(Rc::clone(self))));
        let object = LoxObject::LoxInstance(Rc::clone(&instance));

        if let Some(init) = self.find_method("init") {
            init.bind_this(object.clone())
                .call(interpreter, callee_span, arguments, close_paren)?;
        }

        Ok(object)
    }
}

/// An instance of a class, created from its constructor.
#[derive(Clone, Debug)]
pub struct LoxInstance {
    /// The class that created this instance.
    class: Rc<LoxClass>,

    /// The fields that have been set on this instance.
    fields: HashMap<String, LoxObject>,
}

impl LoxInstance {
    /// Create a new instance with no fields.
    pub fn new(class: Rc<LoxClass>) -> Self {
        Self {
            class,
            fields: HashMap::new(),
        }
    }

    /// Get the name of the class that created this instance.
    pub fn class_name(&self) -> &str {
        &self.class.name.value
    }

    /// Get a property of this instance: a field if one has been set, otherwise a method of the
    /// class with `this` bound to the instance.
    pub fn get(
        this: &Rc<RefCell<LoxInstance>>,
        name: &WithSpan<String>,
    ) -> Result<LoxObject, RuntimeError> {
        if let Some(value) = this.borrow().fields.get(&name.value) {
            return Ok(value.clone());
        }

        if let Some(method) = this.borrow().class.find_method(&name.value) {
            return Ok(LoxObject::LoxFunction(
                method.bind_this(LoxObject::LoxInstance(Rc::clone(this))),
            ));
        }

        Err(RuntimeError {
            message: format!("Undefined property '{}'", name.value),
            lexeme: name.value.clone(),
            span: name.span,
        })
    }

    /// Set a field on this instance.
    pub fn set(&mut self, name: &WithSpan<String>, value: LoxObject) {
        self.fields.insert(name.value.clone(), value);
    }
}
