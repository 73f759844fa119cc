//! Properties written under computed names.
//!
//! When an object receives writes `o[p] = v` with `p` unknown, the engine
//! keeps them as a chain of three-operand abstract values hanging off the
//! object's unknown-key property. Each link is either
//!
//! - a write: `args[0]` is a "template for property name condition" whose
//!   own first operand is the key `p`, `args[1]` is the value `v` and
//!   `args[2]` is the earlier link (or a non-abstract leaf when there is none), or
//! - a merge of two chains under a condition: `args[0]` is the condition,
//!   `args[1]` and `args[2]` are the two branches.

use crate::error::{AnalysisError, Result};
use crate::visitor::ResidualHeapVisitor;
use residual_heap::{AbstractKind, AbstractValue, Value, ValueId};

/// A chain link: a three-operand abstract value whose first operand is abstract.
struct Link<'h> {
    condition: ValueId,
    condition_value: &'h AbstractValue,
    second: ValueId,
    third: ValueId,
}

impl<'a> ResidualHeapVisitor<'a> {
    pub(crate) fn visit_computed_names(&mut self, id: ValueId) -> Result<()> {
        let link = self
            .chain_link(id)?
            .ok_or(AnalysisError::MalformedComputedNames(id))?;

        if link.condition_value.kind == AbstractKind::TemplateForPropertyNameCondition {
            let key = *link
                .condition_value
                .args
                .first()
                .ok_or(AnalysisError::MalformedComputedNames(link.condition))?;
            // Any abstract earlier operand must itself be a link.
            if self.heap.get(link.third)?.as_abstract().is_some() {
                self.visit_computed_names(link.third)?;
            }
            self.visit_value(key)?;
            self.visit_value(link.second)?;
        } else {
            self.visit_value(link.condition)?;
            for branch in [link.second, link.third] {
                if self.chain_link(branch)?.is_some() {
                    self.visit_computed_names(branch)?;
                }
            }
        }
        Ok(())
    }

    fn chain_link(&self, id: ValueId) -> Result<Option<Link<'a>>> {
        let heap = self.heap;
        let Value::Abstract(abs) = heap.get(id)? else {
            return Ok(None);
        };
        let &[condition, second, third] = abs.args.as_slice() else {
            return Ok(None);
        };
        let Value::Abstract(condition_value) = heap.get(condition)? else {
            return Ok(None);
        };
        Ok(Some(Link {
            condition,
            condition_value,
            second,
            third,
        }))
    }
}

#[cfg(test)]
mod tests {
    use crate::error::AnalysisError;
    use crate::fixtures::{run, try_run};
    use residual_heap::{
        AbstractKind, AbstractValue, Heap, ObjectData, PropertyBinding, PropertyDescriptor, Value,
        ValueId,
    };

    fn unknown(heap: &mut Heap) -> ValueId {
        heap.alloc(Value::Abstract(AbstractValue::new(AbstractKind::Unknown, vec![])))
    }

    fn write(heap: &mut Heap, key: ValueId, value: ValueId, earlier: ValueId) -> ValueId {
        let condition = heap.alloc(Value::Abstract(AbstractValue::new(
            AbstractKind::TemplateForPropertyNameCondition,
            vec![key],
        )));
        heap.alloc(Value::Abstract(AbstractValue::new(
            AbstractKind::Conditional,
            vec![condition, value, earlier],
        )))
    }

    fn object_with_chain(heap: &mut Heap, chain: ValueId) -> ValueId {
        let mut obj = heap.new_object(ObjectData::Ordinary);
        obj.unknown_property = Some(PropertyBinding::new(PropertyDescriptor::data(chain)));
        heap.alloc_object(obj)
    }

    #[test]
    fn test_two_link_chain() {
        let mut heap = Heap::new();
        let undefined = heap.undefined();
        let (k1, v1, k2, v2) = (
            unknown(&mut heap),
            heap.alloc_number(1.0),
            unknown(&mut heap),
            heap.alloc_number(2.0),
        );
        let first = write(&mut heap, k1, v1, undefined);
        let second = write(&mut heap, k2, v2, first);
        let obj = object_with_chain(&mut heap, second);

        let (residual, _) = run(&heap, &[obj]);
        for id in [k1, v1, k2, v2] {
            assert!(residual.is_visited(id));
        }
        // "no earlier link" is a leaf, not a value to re-emit
        assert!(!residual.is_visited(undefined));
    }

    #[test]
    fn test_merge_visits_condition_and_both_branches() {
        let mut heap = Heap::new();
        let undefined = heap.undefined();
        let (k1, v1, k2, v2) = (
            unknown(&mut heap),
            heap.alloc_number(1.0),
            unknown(&mut heap),
            heap.alloc_number(2.0),
        );
        let left = write(&mut heap, k1, v1, undefined);
        let right = write(&mut heap, k2, v2, undefined);
        let condition = unknown(&mut heap);
        let merge = heap.alloc(Value::Abstract(AbstractValue::new(
            AbstractKind::Conditional,
            vec![condition, left, right],
        )));
        let obj = object_with_chain(&mut heap, merge);

        let (residual, _) = run(&heap, &[obj]);
        for id in [condition, k1, v1, k2, v2] {
            assert!(residual.is_visited(id));
        }
    }

    #[test]
    fn test_abstract_earlier_operand_must_be_a_link() {
        let mut heap = Heap::new();
        let (key, value, stray) = (
            unknown(&mut heap),
            heap.alloc_number(1.0),
            unknown(&mut heap),
        );
        let link = write(&mut heap, key, value, stray);
        let obj = object_with_chain(&mut heap, link);

        assert_eq!(
            try_run(&heap, &[obj]).unwrap_err(),
            AnalysisError::MalformedComputedNames(stray)
        );
    }

    #[test]
    fn test_malformed_chain_is_fatal() {
        let mut heap = Heap::new();
        let number = heap.alloc_number(7.0);
        let obj = object_with_chain(&mut heap, number);

        assert_eq!(
            try_run(&heap, &[obj]).unwrap_err(),
            AnalysisError::MalformedComputedNames(number)
        );
    }
}
