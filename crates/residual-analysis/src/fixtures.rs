//! Shared helpers for the unit tests.

use crate::error::AnalysisError;
use crate::residual::ResidualHeap;
use crate::visitor::analyze;
use residual_diagnostics::Diagnostics;
use residual_heap::{EnvId, Generator, Heap, ValueId};

pub(crate) fn try_run(
    heap: &Heap,
    roots: &[ValueId],
) -> Result<(ResidualHeap, Diagnostics), AnalysisError> {
    let mut diagnostics = Diagnostics::new();
    let residual = analyze(heap, &Generator::new(), roots, &mut diagnostics)?;
    Ok((residual, diagnostics))
}

pub(crate) fn run(heap: &Heap, roots: &[ValueId]) -> (ResidualHeap, Diagnostics) {
    try_run(heap, roots).expect("analysis failed")
}

pub(crate) fn plain_function(heap: &mut Heap, source: &str, env: EnvId) -> ValueId {
    let code = heap.parse_code(source, "test.js").unwrap();
    heap.alloc_plain_function(code, env).unwrap()
}
