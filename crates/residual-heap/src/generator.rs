//! The generator: the ordered sequence of global side effects recorded while
//! the program was partially evaluated.

use crate::value::ValueId;
use serde::{Deserialize, Serialize};

/// One recorded side effect.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GeneratorEntry {
    /// What the effect does, e.g. `console.log`
    #[serde(default)]
    pub description: String,
    /// Values the effect reads
    #[serde(default)]
    pub args: Vec<ValueId>,
    /// Value the effect introduces, if it declares one
    #[serde(default)]
    pub declared: Option<ValueId>,
    /// Effects guarded by this one (e.g. the body of a conditional)
    #[serde(default)]
    pub nested: Option<Generator>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Generator {
    #[serde(default)]
    pub entries: Vec<GeneratorEntry>,
}

impl Generator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an effect reading `args`.
    pub fn emit(&mut self, description: impl Into<String>, args: Vec<ValueId>) {
        self.entries.push(GeneratorEntry {
            description: description.into(),
            args,
            declared: None,
            nested: None,
        });
    }

    /// Record an effect introducing `value`, computed from `args`.
    pub fn declare(&mut self, description: impl Into<String>, value: ValueId, args: Vec<ValueId>) {
        self.entries.push(GeneratorEntry {
            description: description.into(),
            args,
            declared: Some(value),
            nested: None,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Call `callback` for every value the generator touches, in registration
    /// order. The first error stops the walk and is returned.
    pub fn visit<E, F>(&self, callback: &mut F) -> Result<(), E>
    where
        F: FnMut(ValueId) -> Result<(), E>,
    {
        for entry in &self.entries {
            if let Some(declared) = entry.declared {
                callback(declared)?;
            }
            for arg in &entry.args {
                callback(*arg)?;
            }
            if let Some(nested) = &entry.nested {
                nested.visit(callback)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visit_order() {
        let mut inner = Generator::new();
        inner.emit("inner", vec![ValueId(5)]);

        let mut generator = Generator::new();
        generator.declare("var x", ValueId(1), vec![ValueId(2), ValueId(3)]);
        generator.entries.push(GeneratorEntry {
            description: "if".to_string(),
            args: vec![ValueId(4)],
            declared: None,
            nested: Some(inner),
        });

        let mut seen = Vec::new();
        generator
            .visit(&mut |id| -> Result<(), ()> {
                seen.push(id.0);
                Ok(())
            })
            .unwrap();
        assert_eq!(seen, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_visit_stops_at_first_error() {
        let mut generator = Generator::new();
        generator.emit("a", vec![ValueId(1), ValueId(2), ValueId(3)]);

        let mut seen = Vec::new();
        let result = generator.visit(&mut |id| {
            seen.push(id);
            if id == ValueId(2) {
                Err("boom")
            } else {
                Ok(())
            }
        });
        assert_eq!(result, Err("boom"));
        assert_eq!(seen, vec![ValueId(1), ValueId(2)]);
    }
}
