//! Robots, pucks and homes, plus the handles that link them.

use antix_index::{Torus, angle_normalize};
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use slotmap::{SecondaryMap, new_key_type};

use crate::sensor::{SeePuck, SeeRobot};

new_key_type! {
    /// Stable handle for robots.
    pub struct AgentId;
    /// Stable handle for pucks.
    pub struct PuckId;
    /// Stable handle for home zones.
    pub struct HomeId;
}

/// Convenience alias for associating side data with robots.
pub type AgentMap<T> = SecondaryMap<AgentId, T>;

/// 2D position plus heading in `(-π, π]`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub a: f64,
}

impl Pose {
    #[must_use]
    pub const fn new(x: f64, y: f64, a: f64) -> Self {
        Self { x, y, a }
    }

    /// Uniformly random pose on the torus.
    pub fn random(torus: &Torus, rng: &mut dyn RngCore) -> Self {
        let size = torus.size();
        Self {
            x: torus.distance_normalize(rng.random_range(0.0..size)),
            y: torus.distance_normalize(rng.random_range(0.0..size)),
            a: angle_normalize(rng.random_range(0.0..std::f64::consts::TAU)),
        }
    }

    #[must_use]
    pub const fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    /// Pose after one unit tick at `speed`, normalized onto the torus.
    #[must_use]
    pub fn advanced(&self, speed: Speed, torus: &Torus) -> Self {
        Self {
            x: torus.distance_normalize(self.x + speed.v * self.a.cos()),
            y: torus.distance_normalize(self.y + speed.v * self.a.sin()),
            a: angle_normalize(self.a + speed.w),
        }
    }
}

/// Forward and turn speed, per tick.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Speed {
    pub v: f64,
    pub w: f64,
}

impl Speed {
    #[must_use]
    pub const fn new(v: f64, w: f64) -> Self {
        Self { v, w }
    }

    #[must_use]
    pub const fn stopped() -> Self {
        Self { v: 0.0, w: 0.0 }
    }
}

/// RGB triple in `[0, 1]`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Color {
    #[must_use]
    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    pub fn random(rng: &mut dyn RngCore) -> Self {
        Self {
            r: rng.random(),
            g: rng.random(),
            b: rng.random(),
        }
    }
}

/// Fixed delivery zone.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Home {
    pub color: Color,
    pub x: f64,
    pub y: f64,
    pub r: f64,
}

impl Home {
    #[must_use]
    pub const fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    /// Whether `point` lies inside the zone, measured across the torus seam.
    #[must_use]
    pub fn contains(&self, torus: &Torus, point: (f64, f64)) -> bool {
        torus.distance(self.position(), point) <= self.r
    }
}

/// Where a puck currently is in its possession lifecycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PuckState {
    /// Lying in the world, registered in grid cell `cell`.
    Free { cell: usize },
    /// Carried by exactly one robot.
    Held { by: AgentId },
}

/// Collectible item.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Puck {
    pub x: f64,
    pub y: f64,
    pub state: PuckState,
}

impl Puck {
    #[must_use]
    pub const fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    #[must_use]
    pub const fn held(&self) -> bool {
        matches!(self.state, PuckState::Held { .. })
    }

    /// The robot carrying this puck, if any.
    #[must_use]
    pub const fn holder(&self) -> Option<AgentId> {
        match self.state {
            PuckState::Held { by } => Some(by),
            PuckState::Free { .. } => None,
        }
    }
}

/// Robot state owned by the world. Percept lists are rebuilt every tick.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Robot {
    pub pose: Pose,
    pub speed: Speed,
    pub home: HomeId,
    pub(crate) cell: usize,
    pub(crate) puck_held: Option<PuckId>,
    pub(crate) see_robots: Vec<SeeRobot>,
    pub(crate) see_pucks: Vec<SeePuck>,
}

impl Robot {
    /// Grid cell this robot is registered in.
    #[must_use]
    pub const fn cell(&self) -> usize {
        self.cell
    }

    #[must_use]
    pub const fn holding(&self) -> bool {
        self.puck_held.is_some()
    }

    #[must_use]
    pub const fn puck_held(&self) -> Option<PuckId> {
        self.puck_held
    }

    /// Robots seen during the latest sensing pass.
    pub fn see_robots(&self) -> &[SeeRobot] {
        &self.see_robots
    }

    /// Pucks seen during the latest sensing pass.
    pub fn see_pucks(&self) -> &[SeePuck] {
        &self.see_pucks
    }
}
