//! The bytecode dispatch loop.
//!
//! A [`Vm`] owns the heap, the globals table, the value stack and the
//! call-frame stack, and executes one [`Chunk`](crate::chunk::Chunk) at a
//! time by wrapping it in a closure and pushing a frame - the same
//! structure as the original `vm.c`'s `run()`, translated into a loop over
//! [`OpCode`] rather than a `switch` with computed gotos.

#[cfg(test)]
mod vm_test;

use crate::chunk::OpCode;
use crate::compiler::{CompileError, Compiler};
use crate::heap::{Handle, Heap};
use crate::natives;
use crate::object::{BoundMethod, Class, Closure, Instance, NativeObj, Object, Upvalue, UpvalueState};
use crate::table::Table;
use crate::value::Value;
use std::time::Instant;

/// Matches the original's `FRAMES_MAX`. The value stack's capacity is this
/// times the 256 local slots a single frame can address, per §3's stated
/// invariant.
const FRAMES_MAX: usize = 64;

/// One in-progress call: which closure is executing, where its instruction
/// pointer is, and which stack slot its argument 0 (the receiver/closure
/// slot) starts at.
struct CallFrame {
    closure: Handle,
    ip: usize,
    slots: usize,
}

/// Why `interpret` didn't produce a value.
#[derive(Debug)]
pub enum InterpretError {
    /// The source did not compile; every diagnostic collected is included.
    Compile(Vec<CompileError>),
    /// The source compiled but faulted at runtime.
    Runtime(RuntimeError),
}

/// A runtime fault: the message the original formats as
/// `fprintf(stderr, ...)`, plus the call-stack trace beneath it (innermost
/// frame first).
#[derive(Debug, Clone)]
pub struct RuntimeError {
    pub message: String,
    pub trace: Vec<String>,
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.message)?;
        for line in &self.trace {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

/// The virtual machine: heap, globals, value stack, call frames, and the
/// open-upvalue list, bundled the way `init_vm`/`free_vm` bracket a single
/// process-wide `VM` in the original. Here it's just an owned value with
/// no lifecycle functions to call.
pub struct Vm {
    heap: Heap,
    stack: Vec<Value>,
    frames: Vec<CallFrame>,
    globals: Table,
    open_upvalues: Vec<Handle>,
    init_string: Handle,
}

impl Vm {
    #[must_use]
    pub fn new() -> Self {
        let mut heap = Heap::new();
        let init_string = heap.intern("init");

        let mut vm = Self {
            heap,
            stack: Vec::with_capacity(FRAMES_MAX * 256),
            frames: Vec::with_capacity(FRAMES_MAX),
            globals: Table::new(),
            open_upvalues: Vec::new(),
            init_string,
        };

        let start = Instant::now();
        vm.define_native("clock", natives::clock(start));
        vm
    }

    /// Compile `source` as a top-level script and run it to completion.
    ///
    /// # Errors
    ///
    /// Returns [`InterpretError::Compile`] if `source` does not compile, or
    /// [`InterpretError::Runtime`] if it faults while executing. Either way,
    /// the value stack and frame stack are empty again once this returns -
    /// matching the testable property that `interpret` never leaves the VM
    /// in a half-finished state.
    pub fn interpret(&mut self, source: &str) -> Result<(), InterpretError> {
        let function = match Compiler::compile(&mut self.heap, source) {
            Ok(function) => function,
            Err(errors) => {
                for error in &errors {
                    eprintln!("{error}");
                }
                return Err(InterpretError::Compile(errors));
            }
        };

        self.push(Value::object(function));
        let closure = self.heap.allocate(Object::Closure(Closure {
            function,
            upvalues: Vec::new(),
        }));
        self.pop();
        self.push(Value::object(closure));
        self.frames.push(CallFrame {
            closure,
            ip: 0,
            slots: 0,
        });

        self.run()
    }

    // -- the dispatch loop -----------------------------------------------------

    fn run(&mut self) -> Result<(), InterpretError> {
        loop {
            let op = OpCode::from_u8(self.read_byte());

            match op {
                OpCode::Constant => {
                    let value = self.read_constant();
                    self.push(value);
                }
                OpCode::Nil => self.push(Value::nil()),
                OpCode::True => self.push(Value::bool(true)),
                OpCode::False => self.push(Value::bool(false)),
                OpCode::Pop => {
                    self.pop();
                }
                OpCode::Dup => {
                    let top = self.peek(0);
                    self.push(top);
                }
                OpCode::GetLocal => {
                    let slot = usize::from(self.read_byte());
                    let base = self.frames.last().expect("active frame").slots;
                    self.push(self.stack[base + slot]);
                }
                OpCode::SetLocal => {
                    let slot = usize::from(self.read_byte());
                    let base = self.frames.last().expect("active frame").slots;
                    self.stack[base + slot] = self.peek(0);
                }
                OpCode::GetGlobal => {
                    let name = self.read_string();
                    let hash = self.heap.hash_of(name);
                    match self.globals.get(name, hash) {
                        Some(value) => self.push(value),
                        None => {
                            let message = format!("Undefined variable '{}'.", self.heap.as_str(name));
                            return Err(self.runtime_error(&message));
                        }
                    }
                }
                OpCode::DefineGlobal => {
                    let name = self.read_string();
                    let hash = self.heap.hash_of(name);
                    let value = self.pop();
                    self.globals.set(name, hash, value);
                }
                OpCode::SetGlobal => {
                    let name = self.read_string();
                    let hash = self.heap.hash_of(name);
                    let value = self.peek(0);
                    if self.globals.set(name, hash, value) {
                        self.globals.delete(name, hash);
                        let message = format!("Undefined variable '{}'.", self.heap.as_str(name));
                        return Err(self.runtime_error(&message));
                    }
                }
                OpCode::GetUpvalue => {
                    let slot = usize::from(self.read_byte());
                    let value = self.read_upvalue(slot);
                    self.push(value);
                }
                OpCode::SetUpvalue => {
                    let slot = usize::from(self.read_byte());
                    let value = self.peek(0);
                    self.write_upvalue(slot, value);
                }
                OpCode::GetProperty => self.get_property()?,
                OpCode::SetProperty => self.set_property()?,
                OpCode::GetSuper => {
                    let name = self.read_string();
                    let superclass = self.pop().as_object();
                    self.bind_method(superclass, name)?;
                }
                OpCode::Equal => {
                    let b = self.pop();
                    let a = self.pop();
                    self.push(Value::bool(a.values_equal(b)));
                }
                OpCode::Greater => self.numeric_compare(|a, b| a > b)?,
                OpCode::Less => self.numeric_compare(|a, b| a < b)?,
                OpCode::Add => self.add()?,
                OpCode::Subtract => self.numeric_binary(|a, b| a - b)?,
                OpCode::Multiply => self.numeric_binary(|a, b| a * b)?,
                OpCode::Divide => self.numeric_binary(|a, b| a / b)?,
                OpCode::Not => {
                    let value = self.pop();
                    self.push(Value::bool(value.is_falsey()));
                }
                OpCode::Negate => {
                    let value = self.peek(0);
                    if !value.is_number() {
                        return Err(self.runtime_error("Operand must be a number."));
                    }
                    self.pop();
                    self.push(Value::number(-value.as_number()));
                }
                OpCode::Print => {
                    let value = self.pop();
                    let text = self.format_value(value);
                    println!("{text}");
                }
                OpCode::Jump => {
                    let offset = usize::from(self.read_short());
                    self.frames.last_mut().expect("active frame").ip += offset;
                }
                OpCode::JumpIfFalse => {
                    let offset = usize::from(self.read_short());
                    if self.peek(0).is_falsey() {
                        self.frames.last_mut().expect("active frame").ip += offset;
                    }
                }
                OpCode::Call => {
                    let arg_count = self.read_byte();
                    let callee = self.peek(usize::from(arg_count));
                    self.call_value(callee, arg_count)?;
                }
                OpCode::Invoke => {
                    let method = self.read_string();
                    let arg_count = self.read_byte();
                    self.invoke(method, arg_count)?;
                }
                OpCode::InvokeSuper => {
                    let method = self.read_string();
                    let arg_count = self.read_byte();
                    let superclass = self.pop().as_object();
                    self.invoke_from_class(superclass, method, arg_count)?;
                }
                OpCode::Closure => self.closure(),
                OpCode::CloseUpvalue => {
                    let top = self.stack.len() - 1;
                    self.close_upvalues(top);
                    self.pop();
                }
                OpCode::Return => {
                    if self.do_return() {
                        return Ok(());
                    }
                }
                OpCode::Class => {
                    let name = self.read_string();
                    let handle = self.heap.allocate(Object::Class(Class::new(name)));
                    self.push(Value::object(handle));
                    self.maybe_collect();
                }
                OpCode::Inherit => self.inherit()?,
                OpCode::Method => {
                    let name = self.read_string();
                    let hash = self.heap.hash_of(name);
                    let method = self.pop();
                    let class = self.peek(0).as_object();
                    match self.heap.get_mut(class) {
                        Object::Class(c) => {
                            c.methods.set(name, hash, method);
                        }
                        other => unreachable!("OP_METHOD target is a {}", other.type_name()),
                    }
                }
            }
        }
    }

    /// Executes `OP_RETURN`. Returns `true` if this was the outermost
    /// frame (the script itself), meaning the program is finished.
    fn do_return(&mut self) -> bool {
        let result = self.pop();
        let frame_slots = self.frames.last().expect("active frame").slots;
        self.close_upvalues(frame_slots);
        self.frames.pop();

        if self.frames.is_empty() {
            self.pop(); // the script's own closure
            return true;
        }

        self.stack.truncate(frame_slots);
        self.push(result);
        false
    }

    // -- bytecode stream -----------------------------------------------------

    fn function_of(&self, closure: Handle) -> Handle {
        match self.heap.get(closure) {
            Object::Closure(c) => c.function,
            other => unreachable!("frame's closure slot holds a {}", other.type_name()),
        }
    }

    fn read_byte(&mut self) -> u8 {
        let frame = self.frames.last().expect("active frame");
        let (closure, ip) = (frame.closure, frame.ip);
        let function = self.function_of(closure);
        let byte = match self.heap.get(function) {
            Object::Function(f) => f.chunk.code[ip],
            other => unreachable!("expected function, found {}", other.type_name()),
        };
        self.frames.last_mut().expect("active frame").ip += 1;
        byte
    }

    fn read_short(&mut self) -> u16 {
        let hi = u16::from(self.read_byte());
        let lo = u16::from(self.read_byte());
        (hi << 8) | lo
    }

    fn read_constant(&mut self) -> Value {
        let index = self.read_byte();
        let closure = self.frames.last().expect("active frame").closure;
        let function = self.function_of(closure);
        match self.heap.get(function) {
            Object::Function(f) => f.chunk.constants[usize::from(index)],
            other => unreachable!("expected function, found {}", other.type_name()),
        }
    }

    fn read_string(&mut self) -> Handle {
        self.read_constant().as_object()
    }

    // -- value stack -----------------------------------------------------

    fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    fn pop(&mut self) -> Value {
        self.stack.pop().expect("pop on an empty value stack")
    }

    fn peek(&self, distance: usize) -> Value {
        self.stack[self.stack.len() - 1 - distance]
    }

    // -- arithmetic & comparison -----------------------------------------------------

    fn numeric_binary(&mut self, op: impl Fn(f64, f64) -> f64) -> Result<(), InterpretError> {
        let b = self.peek(0);
        let a = self.peek(1);
        if !a.is_number() || !b.is_number() {
            return Err(self.runtime_error("Operands must be numbers."));
        }
        let result = op(a.as_number(), b.as_number());
        self.pop();
        self.pop();
        self.push(Value::number(result));
        Ok(())
    }

    fn numeric_compare(&mut self, op: impl Fn(f64, f64) -> bool) -> Result<(), InterpretError> {
        let b = self.peek(0);
        let a = self.peek(1);
        if !a.is_number() || !b.is_number() {
            return Err(self.runtime_error("Operands must be numbers."));
        }
        let result = op(a.as_number(), b.as_number());
        self.pop();
        self.pop();
        self.push(Value::bool(result));
        Ok(())
    }

    fn add(&mut self) -> Result<(), InterpretError> {
        let b = self.peek(0);
        let a = self.peek(1);

        if a.is_number() && b.is_number() {
            let result = a.as_number() + b.as_number();
            self.pop();
            self.pop();
            self.push(Value::number(result));
            Ok(())
        } else if self.both_strings(a, b) {
            self.concatenate();
            Ok(())
        } else {
            Err(self.runtime_error("Operands must be two numbers or two strings."))
        }
    }

    fn both_strings(&self, a: Value, b: Value) -> bool {
        a.is_object()
            && b.is_object()
            && matches!(self.heap.get(a.as_object()), Object::String(..))
            && matches!(self.heap.get(b.as_object()), Object::String(..))
    }

    fn concatenate(&mut self) {
        let b = self.peek(0);
        let a = self.peek(1);
        let combined = {
            let left = self.heap.as_str(a.as_object());
            let right = self.heap.as_str(b.as_object());
            format!("{left}{right}")
        };
        let handle = self.heap.intern(&combined);
        self.pop();
        self.pop();
        self.push(Value::object(handle));
        self.maybe_collect();
    }

    // -- properties & methods -----------------------------------------------------

    fn get_property(&mut self) -> Result<(), InterpretError> {
        let name = self.read_string();
        let receiver = self.peek(0);
        if !receiver.is_object() {
            return Err(self.runtime_error("Only instances can have properties."));
        }
        let handle = receiver.as_object();
        let hash = self.heap.hash_of(name);
        let (class, field) = match self.heap.get(handle) {
            Object::Instance(i) => (i.class, i.fields.get(name, hash)),
            _ => return Err(self.runtime_error("Only instances can have properties.")),
        };

        if let Some(value) = field {
            self.pop();
            self.push(value);
            Ok(())
        } else {
            self.bind_method(class, name)
        }
    }

    fn set_property(&mut self) -> Result<(), InterpretError> {
        let name = self.read_string();
        let receiver = self.peek(1);
        if !receiver.is_object() {
            return Err(self.runtime_error("Only instances can have fields."));
        }
        let handle = receiver.as_object();
        let hash = self.heap.hash_of(name);
        let value = self.peek(0);

        match self.heap.get_mut(handle) {
            Object::Instance(i) => {
                i.fields.set(name, hash, value);
            }
            _ => return Err(self.runtime_error("Only instances can have fields.")),
        }

        let value = self.pop();
        self.pop();
        self.push(value);
        Ok(())
    }

    fn bind_method(&mut self, class: Handle, name: Handle) -> Result<(), InterpretError> {
        let hash = self.heap.hash_of(name);
        let method = match self.heap.get(class) {
            Object::Class(c) => c.methods.get(name, hash),
            other => unreachable!("expected class, found {}", other.type_name()),
        };

        let Some(method_value) = method else {
            let message = format!("Undefined property '{}'.", self.heap.as_str(name));
            return Err(self.runtime_error(&message));
        };

        let receiver = self.peek(0);
        let bound = self.heap.allocate(Object::BoundMethod(BoundMethod {
            receiver,
            method: method_value.as_object(),
        }));
        self.pop();
        self.push(Value::object(bound));
        self.maybe_collect();
        Ok(())
    }

    fn inherit(&mut self) -> Result<(), InterpretError> {
        let superclass_value = self.peek(1);
        if !superclass_value.is_object() {
            return Err(self.runtime_error("Superclasses must be a class."));
        }

        let methods = match self.heap.get(superclass_value.as_object()) {
            Object::Class(c) => c.methods.clone(),
            _ => return Err(self.runtime_error("Superclasses must be a class.")),
        };

        let subclass = self.peek(0).as_object();
        match self.heap.get_mut(subclass) {
            Object::Class(c) => c.methods.add_all(&methods),
            other => unreachable!("OP_INHERIT target is a {}", other.type_name()),
        }

        self.pop();
        Ok(())
    }

    // -- calls -----------------------------------------------------

    fn call_value(&mut self, callee: Value, arg_count: u8) -> Result<(), InterpretError> {
        if !callee.is_object() {
            return Err(self.runtime_error("Can only call functions and classes."));
        }

        let handle = callee.as_object();
        match self.heap.get(handle) {
            Object::Closure(_) => self.call_closure(handle, arg_count),
            Object::Class(class) => {
                let init_hash = self.heap.hash_of(self.init_string);
                let initializer = class.methods.get(self.init_string, init_hash);

                let callee_slot = self.stack.len() - 1 - usize::from(arg_count);
                let instance = self.heap.allocate(Object::Instance(Instance::new(handle)));
                self.stack[callee_slot] = Value::object(instance);
                self.maybe_collect();

                match initializer {
                    Some(init) => self.call_closure(init.as_object(), arg_count),
                    None if arg_count == 0 => Ok(()),
                    None => {
                        let message = format!("Expected no arguments but got {arg_count} instead.");
                        Err(self.runtime_error(&message))
                    }
                }
            }
            Object::BoundMethod(bound) => {
                let (receiver, method) = (bound.receiver, bound.method);
                let callee_slot = self.stack.len() - 1 - usize::from(arg_count);
                self.stack[callee_slot] = receiver;
                self.call_closure(method, arg_count)
            }
            Object::Native(native) => {
                let function = native.function.clone();
                let start = self.stack.len() - usize::from(arg_count);
                let result = function(&self.stack[start..]);
                self.stack.truncate(start - 1);
                self.push(result);
                Ok(())
            }
            _ => Err(self.runtime_error("Can only call functions and classes.")),
        }
    }

    fn call_closure(&mut self, closure: Handle, arg_count: u8) -> Result<(), InterpretError> {
        let function = self.function_of(closure);
        let arity = match self.heap.get(function) {
            Object::Function(f) => f.arity,
            other => unreachable!("expected function, found {}", other.type_name()),
        };

        if arg_count != arity {
            let message = format!("Expected {arity} arguments, but got {arg_count} instead.");
            return Err(self.runtime_error(&message));
        }

        if self.frames.len() == FRAMES_MAX {
            return Err(self.runtime_error("Stack overflow."));
        }

        let slots = self.stack.len() - usize::from(arg_count) - 1;
        self.frames.push(CallFrame {
            closure,
            ip: 0,
            slots,
        });
        Ok(())
    }

    fn invoke(&mut self, name: Handle, arg_count: u8) -> Result<(), InterpretError> {
        let receiver = self.peek(usize::from(arg_count));
        if !receiver.is_object() {
            return Err(self.runtime_error("Only instances can have methods."));
        }

        let handle = receiver.as_object();
        let hash = self.heap.hash_of(name);
        let (class, field) = match self.heap.get(handle) {
            Object::Instance(i) => (i.class, i.fields.get(name, hash)),
            _ => return Err(self.runtime_error("Only instances can have methods.")),
        };

        if let Some(value) = field {
            let slot = self.stack.len() - 1 - usize::from(arg_count);
            self.stack[slot] = value;
            self.call_value(value, arg_count)
        } else {
            self.invoke_from_class(class, name, arg_count)
        }
    }

    fn invoke_from_class(&mut self, class: Handle, name: Handle, arg_count: u8) -> Result<(), InterpretError> {
        let hash = self.heap.hash_of(name);
        let method = match self.heap.get(class) {
            Object::Class(c) => c.methods.get(name, hash),
            other => unreachable!("expected class, found {}", other.type_name()),
        };

        match method {
            Some(value) => self.call_closure(value.as_object(), arg_count),
            None => {
                let message = format!("Undefined property '{}'.", self.heap.as_str(name));
                Err(self.runtime_error(&message))
            }
        }
    }

    // -- closures & upvalues -----------------------------------------------------

    fn closure(&mut self) {
        let function_value = self.read_constant();
        let function = function_value.as_object();
        let upvalue_count = match self.heap.get(function) {
            Object::Function(f) => f.upvalue_count,
            other => unreachable!("expected function, found {}", other.type_name()),
        };

        let mut upvalues = Vec::with_capacity(upvalue_count);
        for _ in 0..upvalue_count {
            let is_local = self.read_byte() != 0;
            let index = usize::from(self.read_byte());

            if is_local {
                let base = self.frames.last().expect("active frame").slots;
                upvalues.push(self.capture_upvalue(base + index));
            } else {
                let enclosing = self.frames.last().expect("active frame").closure;
                let handle = match self.heap.get(enclosing) {
                    Object::Closure(c) => c.upvalues[index],
                    other => unreachable!("expected closure, found {}", other.type_name()),
                };
                upvalues.push(handle);
            }
        }

        let handle = self.heap.allocate(Object::Closure(Closure { function, upvalues }));
        self.push(Value::object(handle));
        self.maybe_collect();
    }

    /// Reuse an existing open upvalue for `location`, or create one.
    /// `open_upvalues` stays sorted by descending `location` (nearer the
    /// top of the stack comes first), per §3's invariant.
    fn capture_upvalue(&mut self, location: usize) -> Handle {
        for &handle in &self.open_upvalues {
            match self.heap.get(handle) {
                Object::Upvalue(u) => match u.state {
                    UpvalueState::Open(loc) if loc == location => return handle,
                    UpvalueState::Open(loc) if loc < location => break,
                    _ => {}
                },
                other => unreachable!("open-upvalue list holds a {}", other.type_name()),
            }
        }

        let handle = self.heap.allocate(Object::Upvalue(Upvalue {
            state: UpvalueState::Open(location),
        }));

        let position = self
            .open_upvalues
            .iter()
            .position(|&h| match self.heap.get(h) {
                Object::Upvalue(u) => matches!(u.state, UpvalueState::Open(loc) if loc < location),
                other => unreachable!("open-upvalue list holds a {}", other.type_name()),
            })
            .unwrap_or(self.open_upvalues.len());
        self.open_upvalues.insert(position, handle);
        self.maybe_collect();
        handle
    }

    fn read_upvalue(&self, slot: usize) -> Value {
        let closure = self.frames.last().expect("active frame").closure;
        let handle = match self.heap.get(closure) {
            Object::Closure(c) => c.upvalues[slot],
            other => unreachable!("expected closure, found {}", other.type_name()),
        };
        match self.heap.get(handle) {
            Object::Upvalue(u) => match u.state {
                UpvalueState::Open(loc) => self.stack[loc],
                UpvalueState::Closed(value) => value,
            },
            other => unreachable!("expected upvalue, found {}", other.type_name()),
        }
    }

    fn write_upvalue(&mut self, slot: usize, value: Value) {
        let closure = self.frames.last().expect("active frame").closure;
        let handle = match self.heap.get(closure) {
            Object::Closure(c) => c.upvalues[slot],
            other => unreachable!("expected closure, found {}", other.type_name()),
        };
        let location = match self.heap.get(handle) {
            Object::Upvalue(u) => match u.state {
                UpvalueState::Open(loc) => Some(loc),
                UpvalueState::Closed(_) => None,
            },
            other => unreachable!("expected upvalue, found {}", other.type_name()),
        };

        match location {
            Some(loc) => self.stack[loc] = value,
            None => match self.heap.get_mut(handle) {
                Object::Upvalue(u) => u.state = UpvalueState::Closed(value),
                other => unreachable!("expected upvalue, found {}", other.type_name()),
            },
        }
    }

    /// Close every open upvalue whose location is at or above `from` -
    /// used both at block-scope exit (`OP_CLOSE_UPVAL`) and on return,
    /// where `from` is the returning frame's base slot.
    fn close_upvalues(&mut self, from: usize) {
        while let Some(&handle) = self.open_upvalues.first() {
            let location = match self.heap.get(handle) {
                Object::Upvalue(u) => match u.state {
                    UpvalueState::Open(loc) => loc,
                    UpvalueState::Closed(_) => unreachable!("open list held a closed upvalue"),
                },
                other => unreachable!("open-upvalue list holds a {}", other.type_name()),
            };

            if location < from {
                break;
            }

            let value = self.stack[location];
            match self.heap.get_mut(handle) {
                Object::Upvalue(u) => u.state = UpvalueState::Closed(value),
                other => unreachable!("open-upvalue list holds a {}", other.type_name()),
            }
            self.open_upvalues.remove(0);
        }
    }

    // -- printing -----------------------------------------------------

    fn format_value(&self, value: Value) -> String {
        if value.is_nil() {
            "nil".to_string()
        } else if value.is_bool() {
            value.as_bool().to_string()
        } else if value.is_number() {
            value.as_number().to_string()
        } else {
            self.format_object(value.as_object())
        }
    }

    fn format_object(&self, handle: Handle) -> String {
        match self.heap.get(handle) {
            Object::String(s, _) => s.to_string(),
            Object::Function(f) => match f.name {
                Some(name) => format!("<fn {}>", self.heap.as_str(name)),
                None => "<script>".to_string(),
            },
            Object::Closure(c) => self.format_object(c.function),
            Object::Upvalue(_) => "upvalue".to_string(),
            Object::Class(c) => self.heap.as_str(c.name).to_string(),
            Object::Instance(i) => {
                let class_name = match self.heap.get(i.class) {
                    Object::Class(c) => self.heap.as_str(c.name),
                    other => unreachable!("expected class, found {}", other.type_name()),
                };
                format!("<{class_name} instance>")
            }
            Object::BoundMethod(b) => self.format_object(b.method),
            Object::Native(n) => format!("<native fn {}>", n.name),
        }
    }

    // -- errors & GC -----------------------------------------------------

    /// Formats and prints `message` plus a stack trace (innermost call
    /// first), then resets the VM to a clean, empty state - mirroring
    /// `runtime_error`'s direct `fprintf(stderr, ...)` followed by
    /// `reset_stack` in the original.
    fn runtime_error(&mut self, message: &str) -> InterpretError {
        let mut trace = Vec::with_capacity(self.frames.len());
        for frame in self.frames.iter().rev() {
            let function = self.function_of(frame.closure);
            let (name, line) = match self.heap.get(function) {
                Object::Function(f) => {
                    let line = f.chunk.line_at(frame.ip.saturating_sub(1));
                    let name = match f.name {
                        Some(handle) => format!("{}()", self.heap.as_str(handle)),
                        None => "script".to_string(),
                    };
                    (name, line)
                }
                other => unreachable!("expected function, found {}", other.type_name()),
            };
            trace.push(format!("[ line {line} ] in {name}"));
        }

        eprintln!("{message}");
        for line in &trace {
            eprintln!("{line}");
        }

        self.stack.clear();
        self.frames.clear();
        self.open_upvalues.clear();

        InterpretError::Runtime(RuntimeError {
            message: message.to_string(),
            trace,
        })
    }

    fn define_native(&mut self, name: &'static str, function: impl Fn(&[Value]) -> Value + 'static) {
        let name_handle = self.heap.intern(name);
        let hash = self.heap.hash_of(name_handle);
        let handle = self.heap.allocate(Object::Native(NativeObj {
            name,
            function: std::rc::Rc::new(function),
        }));
        self.globals.set(name_handle, hash, Value::object(handle));
    }

    fn maybe_collect(&mut self) {
        if self.heap.should_collect() {
            self.collect_garbage();
        }
    }

    /// Roots: every value on the stack, every active frame's closure,
    /// every open upvalue, every key and value in `globals`, and the
    /// cached `init` string - exactly §4.4's root set.
    fn collect_garbage(&mut self) {
        let mut roots: Vec<Handle> = self
            .stack
            .iter()
            .filter(|v| v.is_object())
            .map(|v| v.as_object())
            .collect();
        roots.extend(self.frames.iter().map(|f| f.closure));
        roots.extend(self.open_upvalues.iter().copied());
        roots.extend(self.globals.keys());
        roots.extend(self.globals.handles());
        roots.push(self.init_string);
        self.heap.collect(roots);
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}
