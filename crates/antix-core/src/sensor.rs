//! Range- and field-of-view-limited sensing over the cell grid.

use antix_index::{Torus, angle_normalize};
use serde::{Deserialize, Serialize};

use crate::config::AntixConfig;
use crate::entity::{AgentId, HomeId, Pose, PuckId, Speed};
use crate::world::World;

/// Another robot detected in the field of view.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SeeRobot {
    pub id: AgentId,
    pub home: HomeId,
    pub pose: Pose,
    pub speed: Speed,
    pub range: f64,
    pub bearing: f64,
    pub holding: bool,
}

/// A puck detected in the field of view.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SeePuck {
    pub id: PuckId,
    pub held: bool,
    pub range: f64,
    pub bearing: f64,
}

/// Sensor model shared by every robot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sensor {
    range: f64,
    range_sq: f64,
    half_fov: f64,
}

impl Sensor {
    #[must_use]
    pub fn new(range: f64, fov: f64) -> Self {
        Self {
            range,
            range_sq: range * range,
            half_fov: fov * 0.5,
        }
    }

    #[must_use]
    pub fn from_config(config: &AntixConfig) -> Self {
        Self::new(config.sensor_range, config.fov)
    }

    #[must_use]
    pub const fn range(&self) -> f64 {
        self.range
    }

    #[must_use]
    pub const fn fov(&self) -> f64 {
        self.half_fov * 2.0
    }

    /// Range and bearing from `observer` to `target`, or `None` when the target
    /// is out of range or outside the field of view. Cheap tests run first.
    #[must_use]
    pub fn detect(
        &self,
        torus: &Torus,
        observer: &Pose,
        target: (f64, f64),
    ) -> Option<(f64, f64)> {
        let dx = torus.wrap_distance(target.0 - observer.x);
        if dx.abs() > self.range {
            return None;
        }
        let dy = torus.wrap_distance(target.1 - observer.y);
        if dy.abs() > self.range {
            return None;
        }
        let dsq = dx * dx + dy * dy;
        if dsq > self.range_sq {
            return None;
        }
        let bearing = angle_normalize(dy.atan2(dx) - observer.a);
        if bearing.abs() > self.half_fov {
            return None;
        }
        Some((dsq.sqrt(), bearing))
    }

    /// Rebuild the percepts of robot `id` into the supplied buffers.
    ///
    /// Only reads the world, so many robots can be scanned concurrently.
    pub fn scan(
        &self,
        world: &World,
        id: AgentId,
        robots: &mut Vec<SeeRobot>,
        pucks: &mut Vec<SeePuck>,
    ) {
        robots.clear();
        pucks.clear();
        let Some(me) = world.robots.get(id) else {
            return;
        };
        let torus = world.grid.torus();

        for cell_idx in world.grid.neighbor_cells(me.pose.x, me.pose.y, self.range) {
            let Some(cell) = world.grid.cell(cell_idx) else {
                continue;
            };

            for &other_id in cell.agents() {
                if other_id == id {
                    continue;
                }
                let Some(other) = world.robots.get(other_id) else {
                    debug_assert!(false, "grid references an unknown robot");
                    continue;
                };
                if let Some((range, bearing)) =
                    self.detect(torus, &me.pose, other.pose.position())
                {
                    robots.push(SeeRobot {
                        id: other_id,
                        home: other.home,
                        pose: other.pose,
                        speed: other.speed,
                        range,
                        bearing,
                        holding: other.holding(),
                    });
                }
            }

            for &puck_id in cell.pucks() {
                let Some(puck) = world.pucks.get(puck_id) else {
                    debug_assert!(false, "grid references an unknown puck");
                    continue;
                };
                if let Some((range, bearing)) = self.detect(torus, &me.pose, puck.position()) {
                    pucks.push(SeePuck {
                        id: puck_id,
                        held: puck.held(),
                        range,
                        bearing,
                    });
                }
            }
        }
    }
}
