use bytemuck::{Pod, Zeroable};
use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use umbra_params::{Limits, SlimeConfig, SpawnPolicy};

use crate::error::SimError;

/// Centre of the normalized field
pub const FIELD_CENTRE: Vec2 = Vec2::new(0.5, 0.5);

/// Heading used whenever a direction cannot be normalized
pub const DEFAULT_FORWARD: Vec2 = Vec2::X;

/// Agent data structure for GPU compute
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct Agent {
    pub forward: [f32; 2],  // Unit heading
    pub position: [f32; 2], // Normalized field space [0, 1]^2
}

impl Agent {
    pub fn new(position: Vec2, forward: Vec2) -> Self {
        Self {
            forward: forward.to_array(),
            position: position.to_array(),
        }
    }

    /// Agent at `FIELD_CENTRE + offset`, heading back toward the centre
    ///
    /// A zero offset has no direction to face and gets [`DEFAULT_FORWARD`].
    pub fn facing_centre(offset: Vec2) -> Self {
        let forward = (-offset).try_normalize().unwrap_or(DEFAULT_FORWARD);
        Self::new(FIELD_CENTRE + offset, forward)
    }

    pub fn position(&self) -> Vec2 {
        Vec2::from_array(self.position)
    }

    /// Normalized heading, falling back to [`DEFAULT_FORWARD`]
    pub fn heading(&self) -> Vec2 {
        Vec2::from_array(self.forward).try_normalize().unwrap_or(DEFAULT_FORWARD)
    }

    pub fn is_finite(&self) -> bool {
        self.forward.iter().chain(self.position.iter()).all(|v| v.is_finite())
    }
}

/// Agent statistics for metrics collection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentStats {
    pub count: u32,
    pub mean_position: [f32; 2],
    /// One minus the length of the mean heading: 0 when aligned, near 1 when uniform
    pub heading_spread: f32,
    pub non_finite: u32,
}

impl AgentStats {
    /// Summarize a population; non-finite agents are counted but left out of the means
    pub fn collect(agents: &[Agent]) -> Self {
        let count = agents.len() as u32;
        if count == 0 {
            return Self::default();
        }

        let mut position_sum = Vec2::ZERO;
        let mut heading_sum = Vec2::ZERO;
        let mut finite = 0u32;
        for agent in agents.iter().filter(|a| a.is_finite()) {
            position_sum += agent.position();
            heading_sum += agent.heading();
            finite += 1;
        }

        let (mean_position, heading_spread) = if finite > 0 {
            let n = finite as f32;
            ((position_sum / n).to_array(), 1.0 - (heading_sum / n).length())
        } else {
            ([0.0; 2], 0.0)
        };

        Self {
            count,
            mean_position,
            heading_spread,
            non_finite: count - finite,
        }
    }
}

/// Fixed-size agent population
#[derive(Debug, Clone)]
pub struct AgentField {
    agents: Vec<Agent>,
    pub stats: AgentStats,
}

impl AgentField {
    /// Build the population from the configured spawn policy
    pub fn new(config: &SlimeConfig, limits: &Limits) -> Result<Self, SimError> {
        if config.agent_count == 0 {
            return Err(SimError::EmptyPopulation);
        }
        if config.agent_count > limits.max_agents {
            return Err(SimError::Capacity {
                requested: config.agent_count,
                max: limits.max_agents,
            });
        }
        if !config.spawn.fits_field() {
            return Err(SimError::SpawnRadius(config.spawn.radius()));
        }

        let agents = match config.spawn {
            SpawnPolicy::Ring { radius } => ring(config.agent_count, radius),
            SpawnPolicy::Scattered { radius } => scattered(config.agent_count, radius, config.seed),
        };
        log::info!("Spawned {} agents ({:?})", agents.len(), config.spawn);

        let mut field = Self {
            agents,
            stats: AgentStats::default(),
        };
        field.update_stats();
        Ok(field)
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// Mutable access to the agents; the population size cannot change
    pub fn agents_mut(&mut self) -> &mut [Agent] {
        &mut self.agents
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn update_stats(&mut self) {
        self.stats = AgentStats::collect(&self.agents);
    }

    /// Respawn with the same count from a (possibly changed) configuration
    pub fn reset(&mut self, config: &SlimeConfig, limits: &Limits) -> Result<(), SimError> {
        let config = SlimeConfig {
            agent_count: self.agents.len() as u32,
            ..config.clone()
        };
        *self = Self::new(&config, limits)?;
        Ok(())
    }
}

/// Evenly spaced on a ring, each agent facing radially outward
///
/// The direction is advanced by one precomputed rotation per agent rather than by
/// recomputing the angle.
fn ring(count: u32, radius: f32) -> Vec<Agent> {
    let step = std::f32::consts::TAU / count as f32;
    let rotation = Vec2::from_angle(step);
    let mut direction = DEFAULT_FORWARD;

    let mut agents = Vec::with_capacity(count as usize);
    for _ in 0..count {
        agents.push(Agent::new(FIELD_CENTRE + direction * radius, direction));
        direction = rotation.rotate(direction);
    }
    agents
}

/// Uniform in a disc, each agent facing the centre
fn scattered(count: u32, radius: f32, seed: u64) -> Vec<Agent> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let angle = rng.gen_range(0.0..std::f32::consts::TAU);
            let distance = radius * rng.gen::<f32>().sqrt();
            Agent::facing_centre(Vec2::from_angle(angle) * distance)
        })
        .collect()
}
