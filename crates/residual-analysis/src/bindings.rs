//! Binding records for captured names.

use crate::error::{AnalysisError, Result};
use crate::residual::{BindingKey, BindingOrigin, VisitedBinding};
use crate::visitor::ResidualHeapVisitor;
use log::trace;
use residual_heap::{EnvId, Environment};

impl<'a> ResidualHeapVisitor<'a> {
    /// Record (once) the global binding `name` and visit its let-value.
    ///
    /// Globals are always considered modified: assignments to them cannot
    /// all be seen from here.
    pub(crate) fn visit_global_binding(&mut self, name: &str) -> Result<BindingKey> {
        let key = BindingKey::Global {
            name: name.to_string(),
        };
        if self.residual.global_bindings.contains_key(name) {
            return Ok(key);
        }

        let value = self.heap.global_let_binding(name).and_then(|b| b.value);
        trace!("global binding `{}` -> {:?}", name, value);
        self.residual.global_bindings.insert(
            name.to_string(),
            VisitedBinding {
                origin: BindingOrigin::Global,
                value,
                modified: true,
            },
        );
        if let Some(value) = value {
            self.visit_value(value)?;
        }
        Ok(key)
    }

    /// Record (once) binding `name` of a declarative record and visit its value.
    pub(crate) fn visit_declarative_binding(
        &mut self,
        environment: EnvId,
        name: &str,
    ) -> Result<BindingKey> {
        let key = BindingKey::Lexical {
            environment,
            name: name.to_string(),
        };
        let known = self
            .residual
            .declarative_bindings
            .get(&environment)
            .map_or(false, |bindings| bindings.contains_key(name));
        if known {
            return Ok(key);
        }

        let binding = match self.heap.env(environment)? {
            Environment::Declarative { bindings, .. } => bindings.get(name),
            Environment::Global { .. } => None,
        }
        .ok_or_else(|| AnalysisError::MissingBinding {
            environment,
            name: name.to_string(),
        })?;
        if binding.deletable {
            return Err(AnalysisError::DeletableBinding {
                environment,
                name: name.to_string(),
            });
        }

        let value = match binding.value {
            Some(value) if binding.initialized => value,
            _ => self.heap.undefined(),
        };
        trace!("binding `{}` in {} -> {}", name, environment, value);
        self.residual
            .declarative_bindings
            .entry(environment)
            .or_default()
            .insert(
                name.to_string(),
                VisitedBinding {
                    origin: BindingOrigin::Lexical(environment),
                    value: Some(value),
                    modified: false,
                },
            );
        self.visit_value(value)?;
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::AnalysisError;
    use crate::fixtures::{plain_function, try_run};
    use residual_heap::{Binding, Environment, Heap};

    #[test]
    fn test_deletable_binding_is_fatal() {
        let mut heap = Heap::new();
        let global = heap.global_env();
        let undefined = heap.undefined();
        let env = heap.alloc_env(Environment::declarative(global).with_binding(
            "x",
            Binding {
                value: Some(undefined),
                initialized: true,
                deletable: true,
                modified: false,
            },
        ));
        let func = plain_function(&mut heap, "function f() { return x; }", env);

        assert_eq!(
            try_run(&heap, &[func]).unwrap_err(),
            AnalysisError::DeletableBinding {
                environment: env,
                name: "x".to_string(),
            }
        );
    }

    #[test]
    fn test_uninitialized_binding_captures_undefined() {
        let mut heap = Heap::new();
        let global = heap.global_env();
        let env = heap.alloc_env(
            Environment::declarative(global).with_binding("later", Binding::uninitialized()),
        );
        let func = plain_function(&mut heap, "function f() { return later; }", env);

        let residual = try_run(&heap, &[func]).unwrap().0;
        let captures = residual.captures(func);
        assert_eq!(captures.len(), 1);
        assert_eq!(captures[0].1.value, Some(heap.undefined()));
        assert!(residual.is_visited(heap.undefined()));
    }
}
