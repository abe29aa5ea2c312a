use std::path::{Path, PathBuf};
use std::rc::Rc;

use indexmap::IndexMap;

use crate::ast::{
    AccessStep, AssignOp, AssignTarget, BinaryOp, CallArg, Expr, ExprKind, Handler, Stmt, UnaryOp,
};
use crate::interpreter::control_flow::Signal;
use crate::interpreter::environment::Environment;
use crate::interpreter::error::{ErrorKind, ExceptionKind, ExceptionValue, Outcome};
use crate::interpreter::imports;
use crate::interpreter::parser;
use crate::interpreter::session::Session;
use crate::types::{self, DataType, TypeExpr, TypeFault};
use crate::value::{ArrayValue, ElementFault, FunctionValue, JsonValue, QueueValue, RecordValue, Value};

const MAX_CALL_DEPTH: usize = 200;

/// The tree-walking evaluator. Control flow travels as `Signal`; raised
/// exceptions travel as the `Err` arm, so nothing ever unwinds the host.
pub struct Interpreter {
    session: Session,
    env: Environment,
    source_name: String,
    base_dir: PathBuf,
    top_level: bool,
    call_depth: usize,
    last_value: Value,
}

impl Interpreter {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            env: Environment::new(),
            source_name: "<main>".to_string(),
            base_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            top_level: true,
            call_depth: 0,
            last_value: Value::Null,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Parses and runs a script, classifying how it ended. The completed
    /// value is the value of the last expression statement.
    pub fn run_source(&mut self, name: &str, source: &str) -> Outcome {
        self.source_name = name.to_string();
        let program = match parser::parse_source(source) {
            Ok(program) => program,
            Err(e) => {
                return Outcome::ParseFailed {
                    message: e.message,
                    line: e.line,
                }
            }
        };
        match self.execute(&program.statements) {
            Ok(_) => Outcome::Completed(self.last_value.clone()),
            Err(exc) => Outcome::Raised {
                kind: exc.kind.name(),
                message: exc.message,
                line: exc.line,
            },
        }
    }

    pub fn run_file(&mut self, path: &Path) -> Outcome {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                return Outcome::Raised {
                    kind: ErrorKind::Io.as_str().to_string(),
                    message: format!("cannot read '{}': {}", path.display(), e),
                    line: 0,
                }
            }
        };
        let mut name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "<script>".to_string());
        if let Ok(canonical) = path.canonicalize() {
            // The entry script counts as imported, so importing it back
            // from a library file is a no-op.
            self.session.begin_import(&canonical);
            if let Some(parent) = canonical.parent() {
                self.base_dir = parent.to_path_buf();
            }
            if let Some(file) = canonical.file_name() {
                name = file.to_string_lossy().into_owned();
            }
        }
        self.run_source(&name, &text)
    }

    pub fn execute(&mut self, statements: &[Stmt]) -> Result<Signal, ExceptionValue> {
        for stmt in statements {
            let signal = self.execute_statement(stmt)?;
            if !signal.is_normal() {
                return Ok(signal);
            }
        }
        Ok(Signal::Normal)
    }

    fn execute_statement(&mut self, stmt: &Stmt) -> Result<Signal, ExceptionValue> {
        match stmt {
            Stmt::VarDecl {
                name,
                ty,
                init,
                line,
            } => {
                let value = match (ty, init) {
                    (Some(ty), Some(init)) => {
                        let value = self.evaluate(init)?;
                        self.cast_to(&value, ty, *line)?
                    }
                    (Some(ty), None) => {
                        let resolved = self.resolve(ty, *line)?;
                        default_value(&resolved)
                    }
                    (None, Some(init)) => self.evaluate(init)?,
                    (None, None) => Value::Null,
                };
                self.env.define(name.to_string(), value);
                Ok(Signal::Normal)
            }
            Stmt::Assign {
                target,
                op,
                value,
                line,
            } => {
                let rhs = self.evaluate(value)?;
                let final_value = match op {
                    AssignOp::Set => rhs,
                    compound => {
                        let current = self.read_target(target)?;
                        let op = match compound {
                            AssignOp::Add => BinaryOp::Add,
                            AssignOp::Sub => BinaryOp::Sub,
                            AssignOp::Mul => BinaryOp::Mul,
                            AssignOp::Div => BinaryOp::Div,
                            AssignOp::Set => unreachable!(),
                        };
                        binary_op(op, &current, &rhs, *line)?
                    }
                };
                self.write_target(target, final_value, *line)?;
                Ok(Signal::Normal)
            }
            Stmt::Expr(expr) => {
                self.last_value = self.evaluate(expr)?;
                Ok(Signal::Normal)
            }
            Stmt::Print { value, .. } => {
                let value = self.evaluate(value)?;
                println!("{}", value);
                Ok(Signal::Normal)
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                if self.truthy(condition)? {
                    self.block_scoped(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.block_scoped(else_branch)
                } else {
                    Ok(Signal::Normal)
                }
            }
            Stmt::While {
                condition, body, ..
            } => {
                while self.truthy(condition)? {
                    match self.block_scoped(body)? {
                        Signal::Break => break,
                        Signal::Return(v) => return Ok(Signal::Return(v)),
                        Signal::Normal | Signal::Continue => {}
                    }
                }
                Ok(Signal::Normal)
            }
            Stmt::DoWhile {
                body, condition, ..
            } => {
                loop {
                    match self.block_scoped(body)? {
                        Signal::Break => break,
                        Signal::Return(v) => return Ok(Signal::Return(v)),
                        Signal::Normal | Signal::Continue => {}
                    }
                    if !self.truthy(condition)? {
                        break;
                    }
                }
                Ok(Signal::Normal)
            }
            Stmt::For {
                init,
                condition,
                step,
                body,
                ..
            } => self.run_for(init.as_deref(), condition.as_ref(), step.as_deref(), body),
            Stmt::ForEach {
                var,
                iterable,
                body,
                line,
            } => self.run_foreach(var, iterable, body, *line),
            Stmt::Break { .. } => Ok(Signal::Break),
            Stmt::Continue { .. } => Ok(Signal::Continue),
            Stmt::Function {
                name,
                params,
                return_ty,
                body,
                line,
            } => {
                if self.top_level {
                    self.session
                        .declare(name, &self.source_name)
                        .map_err(|conflict| conflict.to_exception(*line))?;
                }
                let function = FunctionValue {
                    name: name.clone(),
                    params: params.clone(),
                    return_ty: return_ty.clone(),
                    body: body.clone(),
                    env: self.env.clone(),
                };
                self.env
                    .define(name.to_string(), Value::Function(Rc::new(function)));
                Ok(Signal::Normal)
            }
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Null,
                };
                Ok(Signal::Return(value))
            }
            Stmt::Import { path, line } => {
                self.execute_import(path, *line)?;
                Ok(Signal::Normal)
            }
            Stmt::Try {
                body, handlers, ..
            } => self.run_try(body, handlers),
            Stmt::Raise { kind, args, line } => Err(self.build_exception(kind, args, *line)?),
            Stmt::TypeDef { name, ty, .. } => {
                self.session.define_alias(name, ty.clone());
                Ok(Signal::Normal)
            }
            Stmt::Screen { name, body, line } => {
                if self.top_level {
                    self.session
                        .declare(name, &self.source_name)
                        .map_err(|conflict| conflict.to_exception(*line))?;
                }
                self.session
                    .register_screen(name, Rc::new(body.clone()));
                self.session
                    .trace(format!("registered screen '{}' from {}", name, self.source_name));
                Ok(Signal::Normal)
            }
        }
    }

    /// Runs a block in a fresh child frame; the frame is left again whether
    /// the block completed, signalled, or raised. A closure declared inside
    /// the block keeps the frame alive past this call.
    fn block_scoped(&mut self, body: &[Stmt]) -> Result<Signal, ExceptionValue> {
        let saved = self.enter_block();
        let result = self.execute(body);
        self.leave_block(saved);
        result
    }

    fn enter_block(&mut self) -> (Environment, bool) {
        let parent = Rc::new(self.env.clone());
        let saved_env = std::mem::replace(&mut self.env, Environment::with_parent(parent));
        let was_top = std::mem::replace(&mut self.top_level, false);
        (saved_env, was_top)
    }

    fn leave_block(&mut self, saved: (Environment, bool)) {
        self.env = saved.0;
        self.top_level = saved.1;
    }

    fn run_for(
        &mut self,
        init: Option<&Stmt>,
        condition: Option<&Expr>,
        step: Option<&Stmt>,
        body: &[Stmt],
    ) -> Result<Signal, ExceptionValue> {
        let saved = self.enter_block();
        let result = self.run_for_inner(init, condition, step, body);
        self.leave_block(saved);
        result
    }

    fn run_for_inner(
        &mut self,
        init: Option<&Stmt>,
        condition: Option<&Expr>,
        step: Option<&Stmt>,
        body: &[Stmt],
    ) -> Result<Signal, ExceptionValue> {
        if let Some(init) = init {
            self.execute_statement(init)?;
        }
        loop {
            if let Some(condition) = condition {
                if !self.truthy(condition)? {
                    break;
                }
            }
            match self.block_scoped(body)? {
                Signal::Break => break,
                Signal::Return(v) => return Ok(Signal::Return(v)),
                Signal::Normal | Signal::Continue => {}
            }
            if let Some(step) = step {
                self.execute_statement(step)?;
            }
        }
        Ok(Signal::Normal)
    }

    fn run_foreach(
        &mut self,
        var: &Rc<str>,
        iterable: &Expr,
        body: &[Stmt],
        line: u32,
    ) -> Result<Signal, ExceptionValue> {
        let source = self.evaluate(iterable)?;
        let elements: Vec<Value> = match &source {
            Value::Array(array) => array.borrow().to_vec(),
            Value::Queue(queue) => queue.borrow().items.iter().cloned().collect(),
            Value::Json(json) => match &*json.borrow() {
                JsonValue::Array(items) => items.clone(),
                JsonValue::Object(fields) => fields.keys().map(Value::string).collect(),
            },
            Value::Str(s) => s.chars().map(|c| Value::string(c.to_string())).collect(),
            Value::Null => {
                return Err(ExceptionValue::null_error_at("cannot iterate null", line))
            }
            other => {
                return Err(ExceptionValue::type_error_at(
                    format!("cannot iterate {}", types::type_of(other)),
                    line,
                ))
            }
        };
        for element in elements {
            let saved = self.enter_block();
            self.env.define(var.to_string(), element);
            let result = self.execute(body);
            self.leave_block(saved);
            match result? {
                Signal::Break => break,
                Signal::Return(v) => return Ok(Signal::Return(v)),
                Signal::Normal | Signal::Continue => {}
            }
        }
        Ok(Signal::Normal)
    }

    fn run_try(
        &mut self,
        body: &[Stmt],
        handlers: &[Handler],
    ) -> Result<Signal, ExceptionValue> {
        match self.block_scoped(body) {
            Ok(signal) => Ok(signal),
            Err(exc) => {
                for handler in handlers {
                    if !exc.matches(&handler.kind) {
                        continue;
                    }
                    let saved = self.enter_block();
                    if let Some(binding) = &handler.binding {
                        // Standard kinds expose their message; custom
                        // exceptions expose the raise-time payload array.
                        let bound = match &exc.kind {
                            ExceptionKind::Standard(_) => Value::string(&exc.message),
                            ExceptionKind::Custom(_) => {
                                Value::dynamic_array(exc.payload.clone())
                            }
                        };
                        self.env.define(binding.to_string(), bound);
                    }
                    let result = self.execute(&handler.body);
                    self.leave_block(saved);
                    return result;
                }
                Err(exc)
            }
        }
    }

    fn execute_import(&mut self, spec: &str, line: u32) -> Result<(), ExceptionValue> {
        let loaded = match imports::load(&self.session, &self.base_dir, spec, line)? {
            Some(loaded) => loaded,
            None => return Ok(()),
        };
        let saved_name = std::mem::replace(&mut self.source_name, loaded.source_name);
        let saved_dir = std::mem::replace(&mut self.base_dir, loaded.base_dir);
        let result = self.execute(&loaded.program.statements);
        self.source_name = saved_name;
        self.base_dir = saved_dir;
        result.map(|_| ())
    }

    fn build_exception(
        &mut self,
        kind: &str,
        args: &[Expr],
        line: u32,
    ) -> Result<ExceptionValue, ExceptionValue> {
        match ErrorKind::from_name(kind) {
            Some(standard) => {
                let message = match args.first() {
                    Some(expr) => self.evaluate(expr)?.to_string(),
                    None => "raised".to_string(),
                };
                Ok(ExceptionValue::standard(standard, message, line))
            }
            None => {
                let mut payload = Vec::with_capacity(args.len());
                for arg in args {
                    payload.push(self.evaluate(arg)?);
                }
                Ok(ExceptionValue::custom(kind, payload, line))
            }
        }
    }

    // Expressions

    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value, ExceptionValue> {
        let line = expr.line;
        match &expr.kind {
            ExprKind::Literal(value) => Ok(value.clone()),
            ExprKind::Identifier(name) => self.env.get(name).ok_or_else(|| {
                ExceptionValue::not_found_at(format!("undefined variable '{}'", name), line)
            }),
            ExprKind::Binary { left, op, right } => {
                if matches!(op, BinaryOp::And | BinaryOp::Or) {
                    return self.short_circuit(*op, left, right, line);
                }
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                binary_op(*op, &left, &right, line)
            }
            ExprKind::Unary { op, expr } => {
                let value = self.evaluate(expr)?;
                unary_op(*op, &value, line)
            }
            ExprKind::FieldAccess { object, field } => {
                let object = self.evaluate(object)?;
                read_field(&object, field, line)
            }
            ExprKind::Index { object, index } => {
                let object = self.evaluate(object)?;
                let index = self.evaluate(index)?;
                read_index(&object, &index, line)
            }
            ExprKind::Length { object } => {
                let object = self.evaluate(object)?;
                length_of(&object, line)
            }
            ExprKind::Call { name, args, line } => {
                let callee = self.env.get(name).ok_or_else(|| {
                    ExceptionValue::not_found_at(format!("undefined function '{}'", name), *line)
                })?;
                match callee {
                    Value::Function(function) => self.call_function(function, args, *line),
                    other => Err(ExceptionValue::type_error_at(
                        format!("'{}' is {}, not a function", name, types::type_of(&other)),
                        *line,
                    )),
                }
            }
            ExprKind::BuiltinCall {
                namespace,
                name,
                args,
                line,
            } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.evaluate(arg)?);
                }
                self.session.builtin(namespace, name, &values, *line)
            }
            ExprKind::Array { elements } => {
                let mut items = Vec::with_capacity(elements.len());
                for element in elements {
                    items.push(self.evaluate(element)?);
                }
                Ok(Value::dynamic_array(items))
            }
            ExprKind::JsonObject { fields } => {
                let mut map = IndexMap::with_capacity(fields.len());
                for (key, value) in fields {
                    map.insert(key.clone(), self.evaluate(value)?);
                }
                Ok(Value::json_object(map))
            }
            ExprKind::Cast { expr, ty } => {
                let value = self.evaluate(expr)?;
                self.cast_to(&value, ty, line)
            }
            ExprKind::TypeOf { expr } => {
                let value = self.evaluate(expr)?;
                Ok(Value::string(types::type_of(&value)))
            }
        }
    }

    fn short_circuit(
        &mut self,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
        line: u32,
    ) -> Result<Value, ExceptionValue> {
        let lhs = self.evaluate(left)?;
        let lhs = bool_operand(&lhs, line)?;
        match (op, lhs) {
            (BinaryOp::And, false) => Ok(Value::Bool(false)),
            (BinaryOp::Or, true) => Ok(Value::Bool(true)),
            _ => {
                let rhs = self.evaluate(right)?;
                Ok(Value::Bool(bool_operand(&rhs, line)?))
            }
        }
    }

    fn call_function(
        &mut self,
        function: Rc<FunctionValue>,
        args: &[CallArg],
        line: u32,
    ) -> Result<Value, ExceptionValue> {
        if self.call_depth >= MAX_CALL_DEPTH {
            return Err(ExceptionValue::validation_error_at(
                format!("call depth limit reached in '{}'", function.name),
                line,
            ));
        }

        let mut positional = Vec::new();
        let mut named: Vec<(String, Value)> = Vec::new();
        for arg in args {
            match arg {
                CallArg::Positional(expr) => positional.push(self.evaluate(expr)?),
                CallArg::Named { name, value } => named.push((name.clone(), self.evaluate(value)?)),
            }
        }
        if positional.len() > function.params.len() {
            return Err(ExceptionValue::type_error_at(
                format!(
                    "'{}' takes {} argument(s), got {}",
                    function.name,
                    function.params.len(),
                    positional.len()
                ),
                line,
            ));
        }

        let mut slots: Vec<Option<Value>> = vec![None; function.params.len()];
        for (i, value) in positional.into_iter().enumerate() {
            slots[i] = Some(value);
        }
        // A named argument wins over whatever position put there.
        for (name, value) in named {
            match function
                .params
                .iter()
                .position(|p| p.name.as_ref() == name.as_str())
            {
                Some(i) => slots[i] = Some(value),
                None => {
                    return Err(ExceptionValue::type_error_at(
                        format!("'{}' has no parameter '{}'", function.name, name),
                        line,
                    ))
                }
            }
        }

        let call_env = Environment::with_parent(Rc::new(function.env.clone()));
        let saved_env = std::mem::replace(&mut self.env, call_env);
        let was_top = std::mem::replace(&mut self.top_level, false);
        self.call_depth += 1;
        let result = self.bind_and_run(&function, slots, line);
        self.call_depth -= 1;
        self.top_level = was_top;
        self.env = saved_env;

        let value = match result? {
            Signal::Return(value) => value,
            _ => Value::Null,
        };
        match &function.return_ty {
            Some(ty) => self.cast_to(&value, ty, line),
            None => Ok(value),
        }
    }

    fn bind_and_run(
        &mut self,
        function: &FunctionValue,
        mut slots: Vec<Option<Value>>,
        line: u32,
    ) -> Result<Signal, ExceptionValue> {
        for (i, param) in function.params.iter().enumerate() {
            let value = match slots[i].take() {
                Some(value) => value,
                // Defaults run in the callee environment, so an omitted
                // argument may default off an earlier parameter.
                None => match &param.default {
                    Some(default) => self.evaluate(default)?,
                    None => {
                        return Err(ExceptionValue::type_error_at(
                            format!(
                                "missing argument '{}' in call to '{}'",
                                param.name, function.name
                            ),
                            line,
                        ))
                    }
                },
            };
            let value = match &param.ty {
                Some(ty) => self.cast_to(&value, ty, line)?,
                None => value,
            };
            self.env.define(param.name.to_string(), value);
        }
        self.execute(&function.body)
    }

    // Assignment targets

    fn read_target(&mut self, target: &AssignTarget) -> Result<Value, ExceptionValue> {
        let mut value = self.env.get(&target.name).ok_or_else(|| {
            ExceptionValue::not_found_at(
                format!("undefined variable '{}'", target.name),
                target.line,
            )
        })?;
        for step in &target.path {
            value = self.step_read(&value, step, target.line)?;
        }
        Ok(value)
    }

    fn write_target(
        &mut self,
        target: &AssignTarget,
        value: Value,
        line: u32,
    ) -> Result<(), ExceptionValue> {
        if target.path.is_empty() {
            if !self.env.assign(&target.name, value) {
                return Err(ExceptionValue::not_found_at(
                    format!("undefined variable '{}'", target.name),
                    line,
                ));
            }
            return Ok(());
        }

        let mut container = self.env.get(&target.name).ok_or_else(|| {
            ExceptionValue::not_found_at(format!("undefined variable '{}'", target.name), line)
        })?;
        let (last, prefix) = target
            .path
            .split_last()
            .unwrap_or_else(|| unreachable!());
        for step in prefix {
            container = self.step_read(&container, step, line)?;
        }
        self.step_write(&container, last, value, line)
    }

    fn step_read(
        &mut self,
        value: &Value,
        step: &AccessStep,
        line: u32,
    ) -> Result<Value, ExceptionValue> {
        match step {
            AccessStep::Field(field) => read_field(value, field, line),
            AccessStep::Index(index_expr) => {
                let index = self.evaluate(index_expr)?;
                read_index(value, &index, line)
            }
        }
    }

    fn step_write(
        &mut self,
        container: &Value,
        step: &AccessStep,
        value: Value,
        line: u32,
    ) -> Result<(), ExceptionValue> {
        match step {
            AccessStep::Field(field) => match container {
                Value::Record(record) => {
                    record.borrow_mut().fields.insert(field.clone(), value);
                    Ok(())
                }
                Value::Json(json) => match &mut *json.borrow_mut() {
                    JsonValue::Object(fields) => {
                        fields.insert(field.clone(), value);
                        Ok(())
                    }
                    JsonValue::Array(_) => Err(ExceptionValue::type_error_at(
                        "cannot assign a field on a json array",
                        line,
                    )),
                },
                Value::Null => Err(ExceptionValue::null_error_at(
                    format!("cannot assign field '{}' on null", field),
                    line,
                )),
                other => Err(ExceptionValue::type_error_at(
                    format!("cannot assign a field on {}", types::type_of(other)),
                    line,
                )),
            },
            AccessStep::Index(index_expr) => {
                let index = self.evaluate(index_expr)?;
                let index = index.as_i64().ok_or_else(|| {
                    ExceptionValue::type_error_at(
                        format!("index must be an integer, got {}", types::type_of(&index)),
                        line,
                    )
                })?;
                match container {
                    Value::Array(array) => array
                        .borrow_mut()
                        .set(index, value)
                        .map_err(|fault| element_fault(fault, line)),
                    Value::Json(json) => match &mut *json.borrow_mut() {
                        JsonValue::Array(items) => {
                            if index < 0 || index as usize >= items.len() {
                                return Err(ExceptionValue::index_error_at(
                                    format!("index {} out of bounds for length {}", index, items.len()),
                                    line,
                                ));
                            }
                            items[index as usize] = value;
                            Ok(())
                        }
                        JsonValue::Object(_) => Err(ExceptionValue::type_error_at(
                            "cannot index a json object with an integer",
                            line,
                        )),
                    },
                    Value::Null => Err(ExceptionValue::null_error_at("cannot index null", line)),
                    other => Err(ExceptionValue::type_error_at(
                        format!("cannot index {}", types::type_of(other)),
                        line,
                    )),
                }
            }
        }
    }

    // Type plumbing

    fn resolve(&self, ty: &TypeExpr, line: u32) -> Result<DataType, ExceptionValue> {
        let session = self.session.clone();
        let lookup = move |name: &str| session.lookup_alias(name);
        types::resolve_type(ty, &lookup).map_err(|fault| type_fault(fault, line))
    }

    fn cast_to(&self, value: &Value, ty: &TypeExpr, line: u32) -> Result<Value, ExceptionValue> {
        let resolved = self.resolve(ty, line)?;
        types::cast_value(value, &resolved).map_err(|fault| type_fault(fault, line))
    }

    fn truthy(&mut self, condition: &Expr) -> Result<bool, ExceptionValue> {
        let line = condition.line;
        let value = self.evaluate(condition)?;
        bool_operand(&value, line)
    }
}

fn type_fault(fault: TypeFault, line: u32) -> ExceptionValue {
    match fault {
        TypeFault::Type(message) => ExceptionValue::type_error_at(message, line),
        TypeFault::Validation(message) => ExceptionValue::validation_error_at(message, line),
    }
}

fn element_fault(fault: ElementFault, line: u32) -> ExceptionValue {
    match fault {
        ElementFault::OutOfBounds { index, len } => ExceptionValue::index_error_at(
            format!("index {} out of bounds for length {}", index, len),
            line,
        ),
        ElementFault::Incompatible(message) => ExceptionValue::type_error_at(message, line),
    }
}

fn bool_operand(value: &Value, line: u32) -> Result<bool, ExceptionValue> {
    value.as_bool().ok_or_else(|| {
        ExceptionValue::type_error_at(
            format!("expected a bool, got {}", types::type_of(value)),
            line,
        )
    })
}

/// Numeric rank for promotion: byte and int arithmetic happens in int,
/// then long, float, double.
fn rank(value: &Value) -> Option<u8> {
    match value {
        Value::Byte(_) => Some(0),
        Value::Int(_) => Some(1),
        Value::Long(_) => Some(2),
        Value::Float(_) => Some(3),
        Value::Double(_) => Some(4),
        _ => None,
    }
}

pub(crate) fn binary_op(
    op: BinaryOp,
    left: &Value,
    right: &Value,
    line: u32,
) -> Result<Value, ExceptionValue> {
    match op {
        BinaryOp::Add => {
            if matches!(left, Value::Str(_)) || matches!(right, Value::Str(_)) {
                return Ok(Value::string(format!("{}{}", left, right)));
            }
            arithmetic(op, left, right, line)
        }
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            arithmetic(op, left, right, line)
        }
        BinaryOp::Pow => {
            let base = number_operand(left, line)?;
            let exp = number_operand(right, line)?;
            Ok(Value::Double(base.powf(exp)))
        }
        BinaryOp::Eq => Ok(Value::Bool(left == right)),
        BinaryOp::NotEq => Ok(Value::Bool(left != right)),
        BinaryOp::Greater | BinaryOp::Less | BinaryOp::GreaterEq | BinaryOp::LessEq => {
            let ordering = compare(left, right, line)?;
            let holds = match op {
                BinaryOp::Greater => ordering == std::cmp::Ordering::Greater,
                BinaryOp::Less => ordering == std::cmp::Ordering::Less,
                BinaryOp::GreaterEq => ordering != std::cmp::Ordering::Less,
                BinaryOp::LessEq => ordering != std::cmp::Ordering::Greater,
                _ => unreachable!(),
            };
            Ok(Value::Bool(holds))
        }
        BinaryOp::And | BinaryOp::Or => {
            let l = bool_operand(left, line)?;
            let r = bool_operand(right, line)?;
            Ok(Value::Bool(match op {
                BinaryOp::And => l && r,
                _ => l || r,
            }))
        }
    }
}

fn arithmetic(
    op: BinaryOp,
    left: &Value,
    right: &Value,
    line: u32,
) -> Result<Value, ExceptionValue> {
    let (lr, rr) = match (rank(left), rank(right)) {
        (Some(l), Some(r)) => (l, r),
        _ => {
            return Err(ExceptionValue::type_error_at(
                format!(
                    "cannot apply arithmetic to {} and {}",
                    types::type_of(left),
                    types::type_of(right)
                ),
                line,
            ))
        }
    };
    let result_rank = lr.max(rr);

    if result_rank <= 2 {
        let a = left.as_i64().unwrap_or_else(|| unreachable!());
        let b = right.as_i64().unwrap_or_else(|| unreachable!());
        let out = match op {
            BinaryOp::Add => a.wrapping_add(b),
            BinaryOp::Sub => a.wrapping_sub(b),
            BinaryOp::Mul => a.wrapping_mul(b),
            BinaryOp::Div | BinaryOp::Mod => {
                if b == 0 {
                    return Err(ExceptionValue::math_error_at("division by zero", line));
                }
                if matches!(op, BinaryOp::Div) {
                    a.wrapping_div(b)
                } else {
                    a.wrapping_rem(b)
                }
            }
            _ => unreachable!(),
        };
        return Ok(if result_rank == 2 {
            Value::Long(out)
        } else {
            Value::Int(out as i32)
        });
    }

    let a = left.as_f64().unwrap_or_else(|| unreachable!());
    let b = right.as_f64().unwrap_or_else(|| unreachable!());
    let out = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        BinaryOp::Mod => a % b,
        _ => unreachable!(),
    };
    Ok(if result_rank == 3 {
        Value::Float(out as f32)
    } else {
        Value::Double(out)
    })
}

fn number_operand(value: &Value, line: u32) -> Result<f64, ExceptionValue> {
    value.as_f64().ok_or_else(|| {
        ExceptionValue::type_error_at(
            format!("expected a number, got {}", types::type_of(value)),
            line,
        )
    })
}

fn compare(
    left: &Value,
    right: &Value,
    line: u32,
) -> Result<std::cmp::Ordering, ExceptionValue> {
    if left.is_integral() && right.is_integral() {
        let a = left.as_i64().unwrap_or_else(|| unreachable!());
        let b = right.as_i64().unwrap_or_else(|| unreachable!());
        return Ok(a.cmp(&b));
    }
    if left.is_numeric() && right.is_numeric() {
        let a = left.as_f64().unwrap_or_else(|| unreachable!());
        let b = right.as_f64().unwrap_or_else(|| unreachable!());
        return a.partial_cmp(&b).ok_or_else(|| {
            ExceptionValue::math_error_at("cannot order NaN", line)
        });
    }
    match (left, right) {
        (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
        (Value::Date(a), Value::Date(b)) => Ok(a.cmp(b)),
        _ => Err(ExceptionValue::type_error_at(
            format!(
                "cannot compare {} and {}",
                types::type_of(left),
                types::type_of(right)
            ),
            line,
        )),
    }
}

fn unary_op(op: UnaryOp, value: &Value, line: u32) -> Result<Value, ExceptionValue> {
    match op {
        UnaryOp::Not => Ok(Value::Bool(!bool_operand(value, line)?)),
        UnaryOp::Neg => match value {
            Value::Byte(b) => Ok(Value::Int(-(*b as i32))),
            Value::Int(i) => Ok(Value::Int(i.wrapping_neg())),
            Value::Long(l) => Ok(Value::Long(l.wrapping_neg())),
            Value::Float(x) => Ok(Value::Float(-x)),
            Value::Double(x) => Ok(Value::Double(-x)),
            other => Err(ExceptionValue::type_error_at(
                format!("cannot negate {}", types::type_of(other)),
                line,
            )),
        },
    }
}

fn read_field(object: &Value, field: &str, line: u32) -> Result<Value, ExceptionValue> {
    match object {
        Value::Record(record) => {
            let record = record.borrow();
            record
                .fields
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(field))
                .map(|(_, value)| value.clone())
                .ok_or_else(|| {
                    ExceptionValue::not_found_at(
                        format!("record has no field '{}'", field),
                        line,
                    )
                })
        }
        // json is lenient: a missing key reads as null.
        Value::Json(json) => match &*json.borrow() {
            JsonValue::Object(fields) => Ok(fields.get(field).cloned().unwrap_or(Value::Null)),
            JsonValue::Array(_) => Err(ExceptionValue::type_error_at(
                format!("json array has no field '{}'", field),
                line,
            )),
        },
        Value::Null => Err(ExceptionValue::null_error_at(
            format!("cannot read field '{}' of null", field),
            line,
        )),
        other => Err(ExceptionValue::type_error_at(
            format!("{} has no fields", types::type_of(other)),
            line,
        )),
    }
}

fn read_index(object: &Value, index: &Value, line: u32) -> Result<Value, ExceptionValue> {
    match object {
        Value::Json(json) => {
            if let JsonValue::Object(fields) = &*json.borrow() {
                // String keys index json objects; anything else falls
                // through to the integer path below.
                if let Value::Str(key) = index {
                    return Ok(fields.get(key.as_ref()).cloned().unwrap_or(Value::Null));
                }
            }
        }
        Value::Null => {
            return Err(ExceptionValue::null_error_at("cannot index null", line));
        }
        _ => {}
    }

    let i = index.as_i64().ok_or_else(|| {
        ExceptionValue::type_error_at(
            format!("index must be an integer, got {}", types::type_of(index)),
            line,
        )
    })?;
    match object {
        Value::Array(array) => array
            .borrow()
            .get(i)
            .map_err(|fault| element_fault(fault, line)),
        Value::Json(json) => match &*json.borrow() {
            JsonValue::Array(items) => {
                if i < 0 || i as usize >= items.len() {
                    return Err(ExceptionValue::index_error_at(
                        format!("index {} out of bounds for length {}", i, items.len()),
                        line,
                    ));
                }
                Ok(items[i as usize].clone())
            }
            JsonValue::Object(_) => Err(ExceptionValue::type_error_at(
                "cannot index a json object with an integer",
                line,
            )),
        },
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            if i < 0 || i as usize >= chars.len() {
                return Err(ExceptionValue::index_error_at(
                    format!("index {} out of bounds for length {}", i, chars.len()),
                    line,
                ));
            }
            Ok(Value::string(chars[i as usize].to_string()))
        }
        other => Err(ExceptionValue::type_error_at(
            format!("cannot index {}", types::type_of(other)),
            line,
        )),
    }
}

fn length_of(value: &Value, line: u32) -> Result<Value, ExceptionValue> {
    let len = match value {
        Value::Array(array) => array.borrow().len(),
        Value::Queue(queue) => queue.borrow().items.len(),
        Value::Str(s) => s.chars().count(),
        Value::Json(json) => match &*json.borrow() {
            JsonValue::Array(items) => items.len(),
            JsonValue::Object(fields) => fields.len(),
        },
        Value::Record(record) => record.borrow().fields.len(),
        Value::Null => {
            return Err(ExceptionValue::null_error_at("null has no length", line));
        }
        other => {
            return Err(ExceptionValue::type_error_at(
                format!("{} has no length", types::type_of(other)),
                line,
            ));
        }
    };
    Ok(Value::Int(len as i32))
}

/// The zero value a typed declaration starts with when no initializer is
/// given. Fixed arrays allocate at their declared size.
fn default_value(ty: &DataType) -> Value {
    match ty {
        DataType::Byte => Value::Byte(0),
        DataType::Int => Value::Int(0),
        DataType::Long => Value::Long(0),
        DataType::Float => Value::Float(0.0),
        DataType::Double => Value::Double(0.0),
        DataType::Bool => Value::Bool(false),
        DataType::String => Value::string(""),
        DataType::Date => Value::Null,
        DataType::Json => Value::json_object(IndexMap::new()),
        DataType::Record(schema) => {
            let mut fields = IndexMap::new();
            for (name, field_ty) in &schema.fields {
                fields.insert(name.clone(), default_value(field_ty));
            }
            Value::record(RecordValue {
                fields,
                schema: Some(schema.clone()),
            })
        }
        DataType::Array { elem, size } => match size {
            None => Value::array(ArrayValue::Dynamic(Vec::new())),
            Some(n) => match elem.as_deref() {
                Some(DataType::Byte) => Value::array(ArrayValue::FixedByte(vec![0; *n])),
                Some(DataType::Int) => Value::array(ArrayValue::FixedInt(vec![0; *n])),
                other => Value::array(ArrayValue::FixedGeneric {
                    elem: other.cloned(),
                    items: (0..*n)
                        .map(|_| other.map(default_value).unwrap_or(Value::Null))
                        .collect(),
                }),
            },
        },
        DataType::Queue(elem) => Value::queue(QueueValue::new(Some((**elem).clone()))),
    }
}
