//! Default-descriptor classification.
//!
//! A property whose descriptor is exactly what the host would synthesize on
//! its own can be left out of the residual program; the code generator
//! reconstructs it implicitly.

use crate::error::Result;
use crate::visitor::ResidualHeapVisitor;
use residual_diagnostics::DiagnosticCode;
use residual_heap::{
    FunctionData, FunctionKind, ObjectData, ObjectKind, ObjectValue, PropertyDescriptor, Value,
    ValueId,
};

impl<'a> ResidualHeapVisitor<'a> {
    /// Whether property `key` of object `id` has the host-default descriptor.
    pub(crate) fn can_ignore_property(
        &mut self,
        id: ValueId,
        obj: &ObjectValue,
        key: &str,
        desc: &PropertyDescriptor,
    ) -> Result<bool> {
        match &obj.data {
            ObjectData::Array => {
                if key == "length" && desc.writable() && !desc.enumerable() && !desc.configurable()
                {
                    return Ok(true);
                }
            }
            ObjectData::Function(function) => match key {
                "length" => {
                    if desc.is_accessor() {
                        self.report(
                            DiagnosticCode::FunctionLengthAccessor,
                            id,
                            "Functions with length accessor properties are not supported in residual heap",
                        );
                    }
                    return Ok(!desc.writable()
                        && !desc.enumerable()
                        && desc.configurable()
                        && self.has_default_length(id, desc)?);
                }
                // TODO: keep `name` when it differs from the name the code declares
                "name" => return Ok(true),
                "caller" | "arguments" => {
                    if let FunctionData::Plain(plain) = function {
                        let code = self.heap.code(plain.code)?;
                        if !code.strict
                            && code.kind == FunctionKind::Normal
                            && desc.writable()
                            && !desc.enumerable()
                            && desc.configurable()
                            && self.is_undefined(desc.value())?
                        {
                            return Ok(true);
                        }
                    }
                }
                "prototype" => {
                    if !desc.configurable() && !desc.enumerable() && desc.writable() {
                        if let Some(value) = desc.value() {
                            let constructor = self
                                .heap
                                .get(value)?
                                .as_object()
                                .and_then(|proto| proto.original_constructor);
                            if constructor == Some(id) {
                                return Ok(true);
                            }
                        }
                    }
                }
                _ => {}
            },
            ObjectData::RegExp => {
                if key == "lastIndex" && desc.writable() && !desc.enumerable() && !desc.configurable()
                {
                    let Some(value) = desc.value() else {
                        return Ok(false);
                    };
                    return Ok(self.heap.get(value)?.as_number() == Some(0.0));
                }
            }
            _ => {}
        }

        if key == "constructor"
            && desc.configurable()
            && !desc.enumerable()
            && desc.writable()
            && desc.value().is_some()
            && desc.value() == obj.original_constructor
        {
            return Ok(true);
        }

        Ok(false)
    }

    /// Whether a function's `length` value is the one the host computes.
    fn has_default_length(&self, id: ValueId, desc: &PropertyDescriptor) -> Result<bool> {
        let Some(value) = desc.value() else {
            return Ok(false);
        };
        let expected = self.heap.expected_length(id)?;
        Ok(self.heap.get(value)?.as_number() == Some(expected as f64))
    }

    fn is_undefined(&self, value: Option<ValueId>) -> Result<bool> {
        match value {
            Some(value) => Ok(matches!(self.heap.get(value)?, Value::Undefined)),
            None => Ok(false),
        }
    }

    /// A `prototype` object nobody touched: extensible, inheriting from the
    /// default Object prototype, and holding nothing but `constructor`.
    pub(crate) fn is_default_prototype(&self, proto: &ObjectValue) -> bool {
        if !proto.symbols.is_empty()
            || proto.unknown_property.is_some()
            || !proto.extensible
            || self.heap.default_prototype(ObjectKind::Object) != Some(proto.prototype)
        {
            return false;
        }

        let mut found_constructor = false;
        for (key, binding) in &proto.properties {
            let Some(desc) = &binding.descriptor else {
                continue;
            };
            if key == "constructor"
                && desc.value().is_some()
                && desc.value() == proto.original_constructor
            {
                found_constructor = true;
            } else {
                return false;
            }
        }
        found_constructor
    }

    /// Visit a function's `prototype` object when it was mutated, since the
    /// change is observable by residual code.
    pub(crate) fn visit_constructor_prototype(
        &mut self,
        id: ValueId,
        function: &ObjectValue,
    ) -> Result<()> {
        let Some(proto_id) = function.property_value("prototype") else {
            return Ok(());
        };
        let heap = self.heap;
        if let Some(proto) = heap.get(proto_id)?.as_object() {
            if proto.original_constructor == Some(id) && !self.is_default_prototype(proto) {
                self.visit_value(proto_id)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::fixtures::{plain_function, run};
    use residual_diagnostics::DiagnosticCode;
    use residual_heap::{Heap, ObjectData, PropertyDescriptor, ValueId};

    fn array_with_length(heap: &mut Heap, enumerable: bool) -> (ValueId, ValueId) {
        let length = heap.alloc_number(0.0);
        let array = heap.new_object(ObjectData::Array).with_property(
            "length",
            PropertyDescriptor::with_attributes(length, true, enumerable, false),
        );
        (heap.alloc_object(array), length)
    }

    #[test]
    fn test_default_array_length_is_ignored() {
        let mut heap = Heap::new();
        let (array, length) = array_with_length(&mut heap, false);

        let (residual, diagnostics) = run(&heap, &[array]);
        assert!(residual.is_ignored(array, "length"));
        assert!(!residual.is_visited(length));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_enumerable_array_length_is_visited() {
        let mut heap = Heap::new();
        let (array, length) = array_with_length(&mut heap, true);

        let (residual, _) = run(&heap, &[array]);
        assert!(!residual.is_ignored(array, "length"));
        assert!(residual.is_visited(length));
    }

    #[test]
    fn test_function_defaults_are_ignored() {
        let mut heap = Heap::new();
        let global = heap.global_env();
        let func = plain_function(&mut heap, "function point(x, y) { return x + y; }", global);
        let undefined = heap.undefined();
        heap.object_mut(func).unwrap().define_property(
            "caller",
            PropertyDescriptor::with_attributes(undefined, true, false, true),
        );
        let proto = heap.add_default_prototype(func).unwrap();

        let (residual, diagnostics) = run(&heap, &[func]);
        for key in ["length", "name", "caller", "prototype"] {
            assert!(residual.is_ignored(func, key), "{} should be ignored", key);
        }
        // Untouched default prototype is not visited on its own
        assert!(!residual.is_visited(proto));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_overridden_function_length_is_visited() {
        let mut heap = Heap::new();
        let global = heap.global_env();
        let func = plain_function(&mut heap, "function f(a, b) {}", global);
        let three = heap.alloc_number(3.0);
        heap.object_mut(func).unwrap().define_property(
            "length",
            PropertyDescriptor::with_attributes(three, false, false, true),
        );

        let (residual, _) = run(&heap, &[func]);
        assert!(!residual.is_ignored(func, "length"));
        assert!(residual.is_visited(three));
    }

    #[test]
    fn test_length_accessor_is_reported() {
        let mut heap = Heap::new();
        let global = heap.global_env();
        let func = plain_function(&mut heap, "function f() {}", global);
        let getter = plain_function(&mut heap, "function () { return 1; }", global);
        heap.object_mut(func)
            .unwrap()
            .define_property("length", PropertyDescriptor::accessor(Some(getter), None));

        let (residual, diagnostics) = run(&heap, &[func]);
        assert_eq!(
            diagnostics.with_code(DiagnosticCode::FunctionLengthAccessor).count(),
            1
        );
        assert!(residual.is_visited(getter));
    }

    #[test]
    fn test_strict_function_caller_is_kept() {
        let mut heap = Heap::new();
        let global = heap.global_env();
        let func = plain_function(&mut heap, "function f() { 'use strict'; }", global);
        let undefined = heap.undefined();
        heap.object_mut(func).unwrap().define_property(
            "arguments",
            PropertyDescriptor::with_attributes(undefined, true, false, true),
        );

        let (residual, _) = run(&heap, &[func]);
        assert!(!residual.is_ignored(func, "arguments"));
        assert!(residual.is_visited(undefined));
    }

    #[test]
    fn test_mutated_prototype_is_visited() {
        let mut heap = Heap::new();
        let global = heap.global_env();
        let func = plain_function(&mut heap, "function Point() {}", global);
        let proto = heap.add_default_prototype(func).unwrap();
        let method = plain_function(&mut heap, "function norm() { return 0; }", global);
        heap.object_mut(proto)
            .unwrap()
            .define_property("norm", PropertyDescriptor::data(method));

        let (residual, _) = run(&heap, &[func]);
        assert!(residual.is_ignored(func, "prototype"));
        assert!(residual.is_visited(proto));
        assert!(residual.is_ignored(proto, "constructor"));
        assert!(residual.is_visited(method));
    }

    #[test]
    fn test_regexp_last_index() {
        let mut heap = Heap::new();
        let zero = heap.alloc_number(0.0);
        let five = heap.alloc_number(5.0);
        let fresh = heap.new_object(ObjectData::RegExp).with_property(
            "lastIndex",
            PropertyDescriptor::with_attributes(zero, true, false, false),
        );
        let used = heap.new_object(ObjectData::RegExp).with_property(
            "lastIndex",
            PropertyDescriptor::with_attributes(five, true, false, false),
        );
        let fresh = heap.alloc_object(fresh);
        let used = heap.alloc_object(used);

        let (residual, _) = run(&heap, &[fresh, used]);
        assert!(residual.is_ignored(fresh, "lastIndex"));
        assert!(!residual.is_ignored(used, "lastIndex"));
        assert!(residual.is_visited(five));
        assert!(!residual.is_visited(zero));
    }
}
