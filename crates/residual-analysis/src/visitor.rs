//! The reachability visitor.

use crate::error::{AnalysisError, Result};
use crate::free_vars::analyze_function;
use crate::residual::ResidualHeap;
use indexmap::IndexMap;
use log::{debug, trace};
use residual_diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSink};
use residual_heap::{
    AbstractKind, FunctionData, Generator, Heap, ObjectData, ObjectValue, PlainFunction,
    PropertyDescriptor, Reference, ReferenceBase, ReferencedName, ScopeChain, ScopeResolver, Value,
    ValueId,
};

/// Walks a heap from its roots and records what the residual program needs.
///
/// One visitor runs one pass; [`visit_roots`](Self::visit_roots) consumes it.
pub struct ResidualHeapVisitor<'a> {
    pub(crate) heap: &'a Heap,
    resolver: &'a dyn ScopeResolver,
    sink: &'a mut dyn DiagnosticSink,
    pub(crate) residual: ResidualHeap,
}

/// Run one pass over `heap` with the default scope resolver.
pub fn analyze(
    heap: &Heap,
    generator: &Generator,
    modules: &[ValueId],
    sink: &mut dyn DiagnosticSink,
) -> Result<ResidualHeap> {
    ResidualHeapVisitor::new(heap, &ScopeChain, sink).visit_roots(generator, modules)
}

impl<'a> ResidualHeapVisitor<'a> {
    pub fn new(
        heap: &'a Heap,
        resolver: &'a dyn ScopeResolver,
        sink: &'a mut dyn DiagnosticSink,
    ) -> Self {
        Self {
            heap,
            resolver,
            sink,
            residual: ResidualHeap::default(),
        }
    }

    /// Visit everything the generator touches, then every module value.
    pub fn visit_roots(mut self, generator: &Generator, modules: &[ValueId]) -> Result<ResidualHeap> {
        debug!(
            "Residual heap pass: {} generator entries, {} module values",
            generator.entries.len(),
            modules.len()
        );

        generator.visit(&mut |id| self.visit_value(id))?;
        for module in modules {
            self.visit_value(*module)?;
        }

        debug!(
            "Residual heap pass done: {} values, {} function bodies, {} global bindings",
            self.residual.values.len(),
            self.residual.function_infos.len(),
            self.residual.global_bindings.len()
        );
        Ok(self.residual)
    }

    /// Report a survivable problem with `id`.
    pub(crate) fn report(&mut self, code: DiagnosticCode, id: ValueId, message: impl Into<String>) {
        let diagnostic = Diagnostic::new(code, message)
            .with_subject(id.0, self.heap.describe(id))
            .with_location(self.heap.location(id))
            .build();
        self.sink.report(diagnostic);
    }

    pub fn visit_value(&mut self, id: ValueId) -> Result<()> {
        if !self.residual.values.insert(id) {
            return Ok(());
        }
        trace!("visit {}", id);

        let heap = self.heap;
        match heap.get(id)? {
            Value::Undefined
            | Value::Null
            | Value::Boolean { .. }
            | Value::Number { .. }
            | Value::String { .. }
            | Value::Empty
            | Value::Symbol { .. }
            | Value::Intrinsic { .. } => Ok(()),
            Value::Abstract(abs) => {
                if abs.name.is_some() {
                    return Ok(());
                }
                if abs.kind == AbstractKind::SentinelMemberExpression {
                    self.report(
                        DiagnosticCode::SymbolicMemberAccess,
                        id,
                        "expressions of type o[p] are not yet supported for partially known o and unknown p",
                    );
                }
                for arg in &abs.args {
                    self.visit_value(*arg)?;
                }
                Ok(())
            }
            Value::Object(obj) => match &obj.data {
                ObjectData::Array => self.visit_array(id, obj),
                ObjectData::Proxy { target, handler } => {
                    self.visit_value(*target)?;
                    self.visit_value(*handler)
                }
                ObjectData::Function(function) => self.visit_function(id, obj, function),
                _ => self.visit_object(id, obj),
            },
        }
    }

    fn visit_descriptor(&mut self, desc: &PropertyDescriptor) -> Result<()> {
        match desc {
            PropertyDescriptor::Data { value, .. } => self.visit_value(*value),
            PropertyDescriptor::Accessor { get, set, .. } => {
                if let Some(get) = get {
                    self.visit_value(*get)?;
                }
                if let Some(set) = set {
                    self.visit_value(*set)?;
                }
                Ok(())
            }
        }
    }

    /// Own string-keyed properties, computed-name writes and the prototype.
    /// Symbol-keyed properties are not walked.
    fn visit_object_properties(&mut self, id: ValueId, obj: &'a ObjectValue) -> Result<()> {
        for (key, binding) in &obj.properties {
            let Some(desc) = &binding.descriptor else {
                continue;
            };
            if self.can_ignore_property(id, obj, key, desc)? {
                self.residual
                    .ignored_properties
                    .entry(id)
                    .or_default()
                    .insert(key.clone());
                continue;
            }
            self.visit_descriptor(desc)?;
        }

        if let Some(desc) = obj
            .unknown_property
            .as_ref()
            .and_then(|binding| binding.descriptor.as_ref())
        {
            let chain = desc
                .value()
                .ok_or(AnalysisError::MalformedComputedNames(id))?;
            self.visit_computed_names(chain)?;
        }

        if self.heap.default_prototype(obj.kind()) != Some(obj.prototype) {
            self.visit_value(obj.prototype)?;
        }

        if obj.as_function().is_some() {
            self.visit_constructor_prototype(id, obj)?;
        }
        Ok(())
    }

    fn visit_array(&mut self, id: ValueId, obj: &'a ObjectValue) -> Result<()> {
        self.visit_object_properties(id, obj)?;
        if let Some(length) = obj.property_value("length") {
            if matches!(self.heap.get(length)?, Value::Abstract(_)) {
                self.visit_value(length)?;
            }
        }
        Ok(())
    }

    fn visit_object(&mut self, id: ValueId, obj: &'a ObjectValue) -> Result<()> {
        self.visit_object_properties(id, obj)?;

        // The default prototype of a constructor is reached through it.
        if let Some(constructor) = obj.original_constructor {
            return self.visit_value(constructor);
        }

        match &obj.data {
            ObjectData::Map { entries } | ObjectData::WeakMap { entries } => {
                for entry in entries {
                    let (Some(key), Some(value)) = (entry.key, entry.value) else {
                        continue;
                    };
                    self.visit_value(key)?;
                    self.visit_value(value)?;
                }
            }
            ObjectData::Set { entries } | ObjectData::WeakSet { entries } => {
                for entry in entries.iter().flatten() {
                    self.visit_value(*entry)?;
                }
            }
            ObjectData::Date { value } => self.visit_value(*value)?,
            ObjectData::TypedArray { buffer, .. } | ObjectData::DataView { buffer } => {
                self.visit_value(*buffer)?
            }
            ObjectData::Arguments => self.report(
                DiagnosticCode::ArgumentsObject,
                id,
                "Arguments object is not supported in residual heap",
            ),
            ObjectData::Error | ObjectData::Promise => self.report(
                DiagnosticCode::UnsupportedObjectKind,
                id,
                format!("Object of kind {} is not supported in residual heap", obj.kind()),
            ),
            ObjectData::Ordinary
            | ObjectData::RegExp
            | ObjectData::Boolean { .. }
            | ObjectData::Number { .. }
            | ObjectData::String { .. }
            | ObjectData::ArrayBuffer
            | ObjectData::Array
            | ObjectData::Proxy { .. }
            | ObjectData::Function(_) => {}
        }
        Ok(())
    }

    fn visit_function(
        &mut self,
        id: ValueId,
        obj: &'a ObjectValue,
        function: &'a FunctionData,
    ) -> Result<()> {
        self.visit_object_properties(id, obj)?;

        match function {
            FunctionData::Bound(bound) => {
                self.visit_value(bound.target)?;
                self.visit_value(bound.bound_this)?;
                for arg in &bound.bound_args {
                    self.visit_value(*arg)?;
                }
                Ok(())
            }
            FunctionData::Native(_) => Ok(()),
            FunctionData::Plain(plain) => self.visit_plain_function(id, plain),
        }
    }

    fn visit_plain_function(&mut self, id: ValueId, plain: &PlainFunction) -> Result<()> {
        let info = match self.residual.function_infos.get(&plain.code) {
            Some(info) => info.clone(),
            None => {
                let info = analyze_function(self.heap.code(plain.code)?);
                debug!(
                    "Analyzed {} of {}: {} free names",
                    plain.code,
                    self.heap.describe(id),
                    info.unbound.len()
                );

                if plain.residual && !plain.unsafe_residual && !info.unbound.is_empty() {
                    let location = self
                        .heap
                        .location(id)
                        .map(|l| l.to_string())
                        .unwrap_or_else(|| "(unknown)".to_string());
                    let names: Vec<&str> = info.unbound.iter().map(|s| s.as_str()).collect();
                    let diagnostic = Diagnostic::new(
                        DiagnosticCode::ResidualClosureCapture,
                        format!(
                            "residual function {} refers to the following identifiers defined outside of the local scope: {}",
                            location,
                            names.join(", ")
                        ),
                    )
                    .with_subject(id.0, self.heap.describe(id))
                    .with_location(self.heap.location(id))
                    .with_help("pass these values in as parameters, or mark the function unsafe-residual")
                    .build();
                    self.sink.report(diagnostic);
                }

                self.residual
                    .function_infos
                    .insert(plain.code, info.clone());
                info
            }
        };

        let mut captures = IndexMap::new();
        for name in &info.unbound {
            let reference = self
                .resolver
                .resolve_binding(self.heap, name, plain.environment, true)?;
            let key = match reference {
                Reference::Unresolvable
                | Reference::Resolved {
                    base: ReferenceBase::Global,
                    ..
                } => self.visit_global_binding(name)?,
                Reference::Resolved {
                    base: ReferenceBase::Declarative(environment),
                    name: ReferencedName::String(resolved),
                } => self.visit_declarative_binding(environment, &resolved)?,
                Reference::Resolved {
                    name: ReferencedName::Symbol(symbol),
                    ..
                } => {
                    return Err(AnalysisError::SymbolReference {
                        name: name.clone(),
                        symbol,
                    })
                }
            };

            if info.is_modified(name) {
                if let Some(binding) = self.residual.binding_mut(&key) {
                    binding.modified = true;
                }
            }
            captures.insert(name.clone(), key);
        }

        self.residual.function_bindings.insert(id, captures);
        Ok(())
    }
}
