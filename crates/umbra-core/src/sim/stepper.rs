use umbra_params::{bindings, AgentUniforms, RenderConfig, TrailUniforms};

use super::agents::{Agent, AgentField};
use super::trail::{Texel, TrailField};
use crate::error::SimError;
use crate::eval::{download, linear_grid, Binding, DispatchRequest, Evaluator, Kernel, TransientScope};

/// Outcome of one simulation tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    pub agents: u32,
    pub elapsed: f32,
}

/// Owns the agent population and the trail store and advances them one tick at a time
pub struct SimulationStepper {
    field: AgentField,
    trail: TrailField,
    agent_params: AgentUniforms,
    trail_params: TrailUniforms,
    tick: u64,
}

impl SimulationStepper {
    /// Spawn the agents and allocate a cleared trail the size of the evaluator output
    pub fn new<E: Evaluator + ?Sized>(config: &RenderConfig, evaluator: &mut E) -> Result<Self, SimError> {
        let field = AgentField::new(&config.slime, &config.limits)?;
        let size = evaluator.output_size();
        let trail = TrailField::create(evaluator, size)?;

        let mut agent_params = AgentUniforms::from(config);
        agent_params.agent_count = field.len() as u32;
        agent_params.size = size;
        let mut trail_params = TrailUniforms::from(config);
        trail_params.size = size;

        log::info!("Simulation started: {} agents on a {}x{} trail", field.len(), size[0], size[1]);
        Ok(Self {
            field,
            trail,
            agent_params,
            trail_params,
            tick: 0,
        })
    }

    /// Advance one tick
    ///
    /// Uploads the agents, runs the agent kernel against the persistent trail, reads
    /// the agents back, then evolves the trail with `elapsed` as the time step. The
    /// read-back agents and the tick counter are committed only once both kernels
    /// have succeeded, so a failed tick leaves the host population where it was.
    pub fn tick<E: Evaluator + ?Sized>(&mut self, evaluator: &mut E, elapsed: f32) -> Result<TickReport, SimError> {
        let count = self.field.len() as u32;
        self.agent_params.delta_time = elapsed;
        self.agent_params.frame = self.tick as u32;
        bindings::validate_agent_uniforms(&self.agent_params, count, self.trail.size()).map_err(SimError::Params)?;

        let updated = {
            let mut scope = TransientScope::new(&mut *evaluator);
            let agents = scope.upload("agents", self.field.agents())?;
            let buffers = [(Binding::Agents, agents), (Binding::Trail, self.trail.handle())];
            scope.dispatch(&DispatchRequest {
                kernel: Kernel::AgentUpdate,
                groups: linear_grid(count, bindings::AGENT_WORKGROUP),
                uniforms: bytemuck::bytes_of(&self.agent_params),
                buffers: &buffers,
            })?;

            let mut updated = vec![Agent::default(); count as usize];
            download(&mut *scope, agents, &mut updated)?;
            updated
        };

        self.trail_params.delta_time = elapsed;
        self.trail.evolve(evaluator, &self.trail_params)?;

        self.field.agents_mut().copy_from_slice(&updated);
        self.field.update_stats();
        self.tick += 1;
        log::debug!("Tick {}: {} agents, dt {:.4}", self.tick, count, elapsed);
        Ok(TickReport {
            tick: self.tick,
            agents: count,
            elapsed,
        })
    }

    /// Recreate the trail at a new size; agents keep their normalized positions
    pub fn resize<E: Evaluator + ?Sized>(&mut self, evaluator: &mut E, size: [u32; 2]) -> Result<(), SimError> {
        let trail = TrailField::create(evaluator, size)?;
        self.replace_trail(evaluator, trail);
        Ok(())
    }

    /// Swap in a prepared trail store, releasing the current one
    pub fn replace_trail<E: Evaluator + ?Sized>(&mut self, evaluator: &mut E, trail: TrailField) {
        let size = trail.size();
        let old = std::mem::replace(&mut self.trail, trail);
        old.release(evaluator);
        self.agent_params.size = size;
        self.trail_params.size = size;
    }

    /// Respawn the agents and clear the trail
    pub fn reset<E: Evaluator + ?Sized>(&mut self, config: &RenderConfig, evaluator: &mut E) -> Result<(), SimError> {
        self.field.reset(&config.slime, &config.limits)?;
        self.apply_params(config);
        let size = self.trail.size();
        self.resize(evaluator, size)?;
        self.tick = 0;
        log::info!("Simulation reset");
        Ok(())
    }

    /// Pick up edited steering and trail parameters without touching state
    pub fn apply_params(&mut self, config: &RenderConfig) {
        let size = self.trail.size();
        self.agent_params = AgentUniforms {
            agent_count: self.field.len() as u32,
            size,
            ..AgentUniforms::from(config)
        };
        self.trail_params = TrailUniforms {
            size,
            ..TrailUniforms::from(config)
        };
    }

    pub fn agents(&self) -> &AgentField {
        &self.field
    }

    pub fn agents_mut(&mut self) -> &mut AgentField {
        &mut self.field
    }

    pub fn trail(&self) -> &TrailField {
        &self.trail
    }

    pub fn agent_params(&self) -> &AgentUniforms {
        &self.agent_params
    }

    pub fn ticks(&self) -> u64 {
        self.tick
    }

    pub fn read_trail<E: Evaluator + ?Sized>(&self, evaluator: &mut E) -> Result<Vec<Texel>, SimError> {
        Ok(self.trail.read(evaluator)?)
    }

    /// Release the persistent trail store
    pub fn teardown<E: Evaluator + ?Sized>(self, evaluator: &mut E) {
        self.trail.release(evaluator);
        log::info!("Simulation torn down after {} ticks", self.tick);
    }
}
