//! Staged step-counting pipeline.
//!
//! This module connects the stages into a fixed chain and runs the cascade
//! for each ingested sample.
//!
//! # Architecture
//!
//! ```text
//! raw ─▶ PreProcess ─▶ MotionDetect ─▶ [Filter] ─▶ Scoring ─▶ Detection ─▶ PostProcess ─▶ steps
//!     buf          buf             buf         buf        buf          buf             buf
//! ```
//!
//! Every stage reads from the buffer in front of it and writes to the buffer
//! behind it. The last buffer collects confirmed steps.
//!
//! # Cascade order
//!
//! `feed` always services the deepest non-empty buffer first. An output is
//! therefore carried all the way downstream before the stage that produced
//! it handles its next input, which is the order a chain of synchronous
//! callbacks would produce, without the recursion.
//!
//! # Memory
//! - Buffers and stages are allocated once, when the pipeline is built
//! - Per-sample work is bounded by buffer capacity and stage count

use crate::config::Tuning;
use crate::error::{PedometerError, Result};
use crate::stage::{PointBuffer, Stage, StageContext};
use crate::types::{DataPoint, StageRole, Topology};

pub struct Pipeline {
    topology: Topology,
    stages: Vec<Box<dyn Stage>>,
    /// `buffers[i]` feeds `stages[i]`; the final buffer holds confirmed steps.
    buffers: Vec<PointBuffer>,
}

impl Pipeline {
    /// Connect stages into a chain.
    ///
    /// The roles must match one of the two topologies exactly.
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Result<Self> {
        let roles: Vec<StageRole> = stages.iter().map(|s| s.role()).collect();
        let topology = Topology::from_roles(&roles).ok_or(PedometerError::InvalidTopology(roles))?;

        let buffers = (0..=stages.len()).map(|_| PointBuffer::new()).collect();
        Ok(Self {
            topology,
            stages,
            buffers,
        })
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    pub fn roles(&self) -> Vec<StageRole> {
        self.stages.iter().map(|s| s.role()).collect()
    }

    /// Hand the tunables to every stage.
    pub fn apply_tuning(&mut self, tuning: &Tuning) {
        for stage in &mut self.stages {
            stage.tune(tuning);
        }
    }

    /// Run one raw point through the chain.
    ///
    /// Returns the number of steps confirmed during this cascade. For each
    /// one, `ctx` records a step sourced from the latest peak.
    pub fn feed(&mut self, raw: DataPoint, ctx: &mut StageContext<'_>) -> u32 {
        if self.buffers[0].push(raw) {
            log::trace!("raw buffer full, evicted oldest sample");
        }

        let terminal = self.stages.len() - 1;
        let mut confirmed = 0;

        while let Some(index) = self.deepest_pending() {
            let (upstream, downstream) = self.buffers.split_at_mut(index + 1);
            let Some(point) = upstream[index].pop() else {
                break;
            };
            let output = &mut downstream[0];
            self.stages[index].process(point, output, ctx);

            if index == terminal {
                let source = upstream[index].peek_last();
                while output.pop().is_some() {
                    ctx.metrics.record_step(source);
                    confirmed += 1;
                }
            }
        }

        confirmed
    }

    /// Clear every stage and buffer, keeping the chain as built.
    pub fn reset(&mut self) {
        for stage in &mut self.stages {
            stage.reset();
        }
        for buffer in &mut self.buffers {
            buffer.clear();
        }
    }

    /// Most recent point written to the post-processing input.
    pub fn last_peak(&self) -> Option<&DataPoint> {
        self.buffers[self.stages.len() - 1].peek_last()
    }

    /// Buffer feeding the stage with the given role.
    pub fn input_buffer(&self, role: StageRole) -> Option<&PointBuffer> {
        self.stages
            .iter()
            .position(|s| s.role() == role)
            .map(|i| &self.buffers[i])
    }

    /// Total entries lost to overflow across all buffers.
    pub fn evicted(&self) -> u64 {
        self.buffers.iter().map(|b| b.evicted()).sum()
    }

    fn deepest_pending(&self) -> Option<usize> {
        (0..self.stages.len())
            .rev()
            .find(|&i| !self.buffers[i].is_empty())
    }
}
