//! Ordered stage composition

use crate::stage::{Stage, Unit};
use sluice_core::Result;

/// An ordered sequence of stages connected source-to-sink.
///
/// A pipeline owns its stages exclusively and lives for one transformation
/// run. Units are routed depth-first: each unit is fully flushed through
/// every downstream stage before the caller may push the next one, so the
/// synchronous call chain itself is the backpressure signal and no stage
/// buffers unboundedly. Output order is preserved end-to-end.
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    /// Assemble a pipeline from an ordered stage list.
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Self {
        Self { stages }
    }

    /// Number of stages in the pipeline.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// True when the pipeline has no stages (units pass through unchanged).
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Push one unit through every stage in order.
    ///
    /// Returns the units emitted at the sink end. Any stage failure aborts
    /// the run; output already handed to the caller is not retracted.
    pub fn push(&mut self, unit: Unit) -> Result<Vec<Unit>> {
        self.run_from(0, vec![unit])
    }

    /// Close every stage front-to-back, flushing trailing output through
    /// the stages after it, and return the final units.
    pub fn close(mut self) -> Result<Vec<Unit>> {
        tracing::debug!(stages = self.stages.len(), "closing pipeline");
        let mut output = Vec::new();
        for idx in 0..self.stages.len() {
            let trailing = self.stages[idx].close()?;
            output.extend(self.run_from(idx + 1, trailing)?);
        }
        Ok(output)
    }

    fn run_from(&mut self, start: usize, mut units: Vec<Unit>) -> Result<Vec<Unit>> {
        for stage in self.stages[start..].iter_mut() {
            if units.is_empty() {
                break;
            }
            let mut next = Vec::new();
            for unit in units {
                next.extend(stage.process(unit)?);
            }
            units = next;
        }
        Ok(units)
    }
}
