use super::agent::AgentId;
use crate::dynamic::{State, StateDefinition};
use crate::geometry::{point, Point2d, Polygon2d};
use crate::map::LaneCorridor;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Frozen copy of an agent, as other agents perceive it.
#[derive(Debug, Clone)]
pub struct AgentSnapshot {
    pub id: AgentId,
    pub state: State,
    /// Footprint in the body frame
    pub shape: Polygon2d,
    pub corridor: Arc<LaneCorridor>,
}

impl AgentSnapshot {
    pub fn position(&self) -> Point2d {
        point(self.state[StateDefinition::X_POSITION], self.state[StateDefinition::Y_POSITION])
    }

    pub fn heading(&self) -> f64 {
        self.state[StateDefinition::THETA_POSITION]
    }

    pub fn velocity(&self) -> f64 {
        self.state[StateDefinition::VEL_POSITION]
    }

    /// Footprint in the map frame.
    pub fn polygon(&self) -> Polygon2d {
        let (x, y) = (self.state[StateDefinition::X_POSITION], self.state[StateDefinition::Y_POSITION]);
        self.shape.transform(x, y, self.heading())
    }

    /// Distance from the reference point to the front of the shape.
    pub fn front_length(&self) -> f64 {
        self.shape
            .exterior()
            .iter()
            .map(|c| c.x)
            .fold(0.0, f64::max)
    }

    /// Distance from the reference point to the rear of the shape.
    pub fn rear_length(&self) -> f64 {
        -self
            .shape
            .exterior()
            .iter()
            .map(|c| c.x)
            .fold(0.0, f64::min)
    }

    /// Moves the snapshot `dt` seconds along its corridor at its current speed.
    fn advanced(&self, dt: f64) -> AgentSnapshot {
        let line = self.corridor.center_line();
        let (_, s) = line.nearest_point_and_s(self.position());
        let s = s + self.velocity() * dt;
        let p = line.point_at_s(s);

        let mut state = self.state;
        state[StateDefinition::TIME_POSITION] += dt;
        state[StateDefinition::X_POSITION] = p.x;
        state[StateDefinition::Y_POSITION] = p.y;
        state[StateDefinition::THETA_POSITION] = line.angle_at_s(s);

        AgentSnapshot { state, ..self.clone() }
    }
}

/// The world as seen by one agent (the ego) at one instant.
#[derive(Debug, Clone)]
pub struct ObservedWorld {
    time: f64,
    ego: AgentSnapshot,
    others: Vec<AgentSnapshot>,
}

impl ObservedWorld {
    /// Builds the view of `ego_id`; `None` when that agent is not in `agents`.
    pub fn new(ego_id: AgentId, time: f64, agents: &BTreeMap<AgentId, AgentSnapshot>) -> Option<Self> {
        let ego = agents.get(&ego_id)?.clone();
        let others = agents
            .values()
            .filter(|agent| agent.id != ego_id)
            .cloned()
            .collect();
        Some(Self { time, ego, others })
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn ego(&self) -> &AgentSnapshot {
        &self.ego
    }

    pub fn ego_id(&self) -> AgentId {
        self.ego.id
    }

    /// Every agent except the ego, ordered by id.
    pub fn others(&self) -> &[AgentSnapshot] {
        &self.others
    }

    /// All agents, ego first.
    pub fn agents(&self) -> impl Iterator<Item = &AgentSnapshot> {
        std::iter::once(&self.ego).chain(self.others.iter())
    }

    pub fn lane_corridor(&self) -> &Arc<LaneCorridor> {
        &self.ego.corridor
    }

    /// The world `delta_time` seconds ahead, with every agent (ego included)
    /// moved along its own corridor at constant velocity.
    pub fn predict(&self, delta_time: f64) -> ObservedWorld {
        if delta_time <= 0.0 {
            return self.clone();
        }
        ObservedWorld {
            time: self.time + delta_time,
            ego: self.ego.advanced(delta_time),
            others: self.others.iter().map(|a| a.advanced(delta_time)).collect(),
        }
    }

    /// Agents whose footprint touches `polygon`, ego included.
    pub fn agents_intersecting_polygon(&self, polygon: &Polygon2d) -> Vec<&AgentSnapshot> {
        self.agents()
            .filter(|agent| agent.polygon().intersects(polygon))
            .collect()
    }
}
