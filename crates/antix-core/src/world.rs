use std::fmt;
use std::mem;

use antix_index::{CellGrid, Torus};
use ordered_float::OrderedFloat;
use rand::rngs::SmallRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use tracing::{debug, trace};

use crate::config::{AntixConfig, Scheduling};
use crate::controller::{ControlInput, Controller, ControllerRegistry, Grip};
use crate::entity::{
    AgentId, AgentMap, Color, Home, HomeId, Pose, Puck, PuckId, PuckState, Robot, Speed,
};
use crate::sensor::Sensor;
use crate::{InvariantError, WorldError};

/// Simulation clock (ticks completed since construction).
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub struct Tick(pub u64);

impl Tick {
    /// Returns the next sequential tick.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }
}

/// What happened during one tick.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TickSummary {
    pub tick: Tick,
    pub pickups: usize,
    pub drops: usize,
    /// Pucks carried at the end of the tick.
    pub held: usize,
}

/// Running totals since construction.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorldTotals {
    pub pickups: u64,
    pub drops: u64,
}

/// The whole simulation: entities, the cell grid, and the tick clock.
pub struct World {
    config: AntixConfig,
    torus: Torus,
    sensor: Sensor,
    tick: Tick,
    rng: SmallRng,
    pub(crate) robots: SlotMap<AgentId, Robot>,
    pub(crate) pucks: SlotMap<PuckId, Puck>,
    homes: SlotMap<HomeId, Home>,
    pub(crate) grid: CellGrid<AgentId, PuckId>,
    controllers: AgentMap<Box<dyn Controller>>,
    totals: WorldTotals,
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("config", &self.config)
            .field("tick", &self.tick)
            .field("robot_count", &self.robots.len())
            .field("puck_count", &self.pucks.len())
            .field("home_count", &self.homes.len())
            .finish()
    }
}

impl World {
    /// Build a world with its homes and pucks placed, but no robots yet.
    pub fn new(config: AntixConfig) -> Result<Self, WorldError> {
        config.validate()?;
        let torus = Torus::new(config.world_size)?;
        let grid = CellGrid::new(torus, config.matrix_width)?;
        let rng = config.seeded_rng();
        let mut world = Self {
            sensor: Sensor::from_config(&config),
            torus,
            tick: Tick::zero(),
            rng,
            robots: SlotMap::with_key(),
            pucks: SlotMap::with_key(),
            homes: SlotMap::with_key(),
            grid,
            controllers: AgentMap::new(),
            totals: WorldTotals::default(),
            config,
        };

        for _ in 0..world.config.home_count {
            let color = Color::random(&mut world.rng);
            let pose = Pose::random(&world.torus, &mut world.rng);
            world.add_home(Home {
                color,
                x: pose.x,
                y: pose.y,
                r: world.config.home_radius,
            });
        }
        for _ in 0..world.config.puck_count {
            let pose = Pose::random(&world.torus, &mut world.rng);
            world.spawn_puck(pose.x, pose.y);
        }

        debug!(
            homes = world.homes.len(),
            pucks = world.pucks.len(),
            cells = world.grid.len(),
            "world constructed"
        );
        Ok(world)
    }

    /// Build a world and populate every home with `home_population` robots
    /// driven by controllers spawned from `controller_key`.
    pub fn populate(
        config: AntixConfig,
        registry: &ControllerRegistry,
        controller_key: u64,
    ) -> Result<Self, WorldError> {
        if !registry.contains(controller_key) {
            return Err(WorldError::UnknownController(controller_key));
        }
        let mut world = Self::new(config)?;
        let homes: Vec<HomeId> = world.homes.keys().collect();
        for home in homes {
            for _ in 0..world.config.home_population {
                let pose = Pose::random(&world.torus, &mut world.rng);
                let controller = registry
                    .spawn(&mut world.rng, controller_key)
                    .ok_or(WorldError::UnknownController(controller_key))?;
                world.spawn_robot(home, pose, Some(controller))?;
            }
        }
        debug!(
            robots = world.robots.len(),
            controller = registry.kind(controller_key).unwrap_or("unknown"),
            "world populated"
        );
        Ok(world)
    }

    /// Register a home zone, wrapping its center onto the torus.
    pub fn add_home(&mut self, home: Home) -> HomeId {
        let home = Home {
            x: self.torus.distance_normalize(home.x),
            y: self.torus.distance_normalize(home.y),
            ..home
        };
        self.homes.insert(home)
    }

    /// Place a free puck at `(x, y)`.
    pub fn spawn_puck(&mut self, x: f64, y: f64) -> PuckId {
        let x = self.torus.distance_normalize(x);
        let y = self.torus.distance_normalize(y);
        let cell = self.grid.cell_index(x, y);
        let id = self.pucks.insert(Puck {
            x,
            y,
            state: PuckState::Free { cell },
        });
        self.grid.insert_puck(id, cell);
        id
    }

    /// Place a robot belonging to `home` at `pose`.
    pub fn spawn_robot(
        &mut self,
        home: HomeId,
        pose: Pose,
        controller: Option<Box<dyn Controller>>,
    ) -> Result<AgentId, WorldError> {
        if !self.homes.contains_key(home) {
            return Err(WorldError::UnknownHome);
        }
        let pose = Pose::new(
            self.torus.distance_normalize(pose.x),
            self.torus.distance_normalize(pose.y),
            self.torus.angle_normalize(pose.a),
        );
        let cell = self.grid.cell_index(pose.x, pose.y);
        let id = self.robots.insert(Robot {
            pose,
            speed: Speed::stopped(),
            home,
            cell,
            puck_held: None,
            see_robots: Vec::new(),
            see_pucks: Vec::new(),
        });
        self.grid.insert_agent(id, cell);
        if let Some(controller) = controller {
            self.controllers.insert(id, controller);
        }
        Ok(id)
    }

    /// Attach or replace the controller of `id`.
    pub fn bind_controller(&mut self, id: AgentId, controller: Box<dyn Controller>) -> bool {
        if !self.robots.contains_key(id) {
            return false;
        }
        self.controllers.insert(id, controller);
        true
    }

    /// Override a robot's speed; returns false for an unknown robot.
    pub fn set_speed(&mut self, id: AgentId, speed: Speed) -> bool {
        match self.robots.get_mut(id) {
            Some(robot) => {
                robot.speed = speed;
                true
            }
            None => false,
        }
    }

    /// Rebuild the percepts of one robot against the current world.
    pub fn sense(&mut self, id: AgentId) {
        let Some(robot) = self.robots.get_mut(id) else {
            return;
        };
        let mut see_robots = mem::take(&mut robot.see_robots);
        let mut see_pucks = mem::take(&mut robot.see_pucks);
        self.sensor.scan(self, id, &mut see_robots, &mut see_pucks);
        if let Some(robot) = self.robots.get_mut(id) {
            robot.see_robots = see_robots;
            robot.see_pucks = see_pucks;
        }
    }

    /// Rebuild every robot's percepts in parallel against the same world state.
    pub fn sense_all(&mut self) {
        let mut buffers: Vec<_> = self
            .robots
            .iter_mut()
            .map(|(id, robot)| {
                (
                    id,
                    mem::take(&mut robot.see_robots),
                    mem::take(&mut robot.see_pucks),
                )
            })
            .collect();

        let sensor = self.sensor;
        let world: &Self = self;
        buffers
            .par_iter_mut()
            .for_each(|(id, see_robots, see_pucks)| {
                sensor.scan(world, *id, see_robots, see_pucks);
            });

        for (id, see_robots, see_pucks) in buffers {
            if let Some(robot) = self.robots.get_mut(id) {
                robot.see_robots = see_robots;
                robot.see_pucks = see_pucks;
            }
        }
    }

    /// Try to pick up the nearest free puck in this robot's cell within
    /// `pickup_range`. Ties go to the lowest puck handle.
    pub fn pickup(&mut self, id: AgentId) -> bool {
        self.pickup_matching(id, |_| true)
    }

    /// Try to pick up `puck` specifically; it must lie in the robot's cell
    /// within `pickup_range`.
    pub fn pickup_puck(&mut self, id: AgentId, puck: PuckId) -> bool {
        self.pickup_matching(id, |candidate| candidate == puck)
    }

    fn pickup_matching(&mut self, id: AgentId, accept: impl Fn(PuckId) -> bool) -> bool {
        let Some(robot) = self.robots.get(id) else {
            return false;
        };
        if robot.puck_held.is_some() {
            return false;
        }
        let Some(cell) = self.grid.cell(robot.cell) else {
            return false;
        };
        let here = robot.pose.position();
        let reach = self.config.pickup_range;
        let candidate = cell
            .pucks()
            .iter()
            .filter(|&&puck_id| accept(puck_id))
            .filter_map(|&puck_id| {
                let puck = self.pucks.get(puck_id)?;
                let distance = self.torus.distance(here, puck.position());
                (distance <= reach).then_some((puck_id, OrderedFloat(distance)))
            })
            .min_by_key(|(_, distance)| *distance)
            .map(|(puck_id, _)| puck_id);

        let Some(puck_id) = candidate else {
            return false;
        };
        let cell_idx = robot.cell;
        let Some(puck) = self.pucks.get_mut(puck_id) else {
            return false;
        };
        debug_assert_eq!(puck.state, PuckState::Free { cell: cell_idx });
        puck.state = PuckState::Held { by: id };
        self.grid.remove_puck(puck_id, cell_idx);
        if let Some(robot) = self.robots.get_mut(id) {
            robot.puck_held = Some(puck_id);
        }
        self.totals.pickups += 1;
        trace!(?id, ?puck_id, cell = cell_idx, "puck picked up");
        true
    }

    /// Drop the held puck at the robot's position.
    pub fn drop_puck(&mut self, id: AgentId) -> bool {
        let Some(robot) = self.robots.get(id) else {
            return false;
        };
        let Some(puck_id) = robot.puck_held else {
            return false;
        };
        let (x, y) = robot.pose.position();
        let cell = self.grid.cell_index(x, y);
        let Some(puck) = self.pucks.get_mut(puck_id) else {
            debug_assert!(false, "robot held an unknown puck");
            return false;
        };
        debug_assert_eq!(puck.state, PuckState::Held { by: id });
        if let Some(robot) = self.robots.get_mut(id) {
            robot.puck_held = None;
        }
        puck.x = x;
        puck.y = y;
        puck.state = PuckState::Free { cell };
        self.grid.insert_puck(puck_id, cell);
        self.totals.drops += 1;
        trace!(?id, ?puck_id, cell, "puck dropped");
        true
    }

    /// Run the robot's controller and apply its command. Returns the grip
    /// actually performed (`Keep` when a requested pickup/drop failed).
    pub fn control(&mut self, id: AgentId) -> Grip {
        let Some(controller) = self.controllers.get_mut(id) else {
            return Grip::Keep;
        };
        let Some(robot) = self.robots.get(id) else {
            return Grip::Keep;
        };
        let Some(home) = self.homes.get(robot.home) else {
            return Grip::Keep;
        };
        let input = ControlInput {
            pose: robot.pose,
            speed: robot.speed,
            holding: robot.holding(),
            home,
            see_robots: &robot.see_robots,
            see_pucks: &robot.see_pucks,
            torus: &self.torus,
            config: &self.config,
        };
        let command = controller.control(&input);

        if let Some(robot) = self.robots.get_mut(id) {
            robot.speed = command.speed;
        }
        match command.grip {
            Grip::Pickup if self.pickup(id) => Grip::Pickup,
            Grip::PickupPuck(puck) if self.pickup_puck(id, puck) => Grip::PickupPuck(puck),
            Grip::Drop if self.drop_puck(id) => Grip::Drop,
            _ => Grip::Keep,
        }
    }

    /// Integrate one tick of motion and re-index the robot in the grid.
    pub fn update_pose(&mut self, id: AgentId) {
        let Some(robot) = self.robots.get_mut(id) else {
            return;
        };
        let old = robot.pose;
        let new = old.advanced(robot.speed, &self.torus);
        debug_assert_eq!(robot.cell, self.grid.cell_index(old.x, old.y));
        robot.pose = new;
        robot.cell = self
            .grid
            .relocate_agent(id, old.position(), new.position());
        if let Some(puck) = robot.puck_held.and_then(|puck_id| self.pucks.get_mut(puck_id)) {
            puck.x = new.x;
            puck.y = new.y;
        }
    }

    /// Execute one tick for the whole population.
    pub fn step(&mut self) -> TickSummary {
        let handles: Vec<AgentId> = self.robots.keys().collect();
        let mut summary = TickSummary::default();

        if self.config.scheduling == Scheduling::Phased {
            self.sense_all();
        }
        for id in handles {
            if self.config.scheduling == Scheduling::Sequential {
                self.sense(id);
            }
            match self.control(id) {
                Grip::Pickup | Grip::PickupPuck(_) => summary.pickups += 1,
                Grip::Drop => summary.drops += 1,
                Grip::Keep => {}
            }
            self.update_pose(id);
        }

        self.tick = self.tick.next();
        summary.tick = self.tick;
        summary.held = self.robots.values().filter(|robot| robot.holding()).count();

        if cfg!(debug_assertions)
            && let Err(err) = self.audit()
        {
            panic!("world invariant violated at tick {}: {err}", self.tick.0);
        }
        trace!(
            tick = summary.tick.0,
            pickups = summary.pickups,
            drops = summary.drops,
            "tick complete"
        );
        summary
    }

    /// Whether the configured tick bound has been reached.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.config.max_ticks > 0 && self.tick.0 >= self.config.max_ticks
    }

    /// Check every structural invariant linking robots, pucks and the grid.
    pub fn audit(&self) -> Result<(), InvariantError> {
        for (id, robot) in &self.robots {
            let expected = self.grid.cell_index(robot.pose.x, robot.pose.y);
            if robot.cell != expected {
                return Err(InvariantError::AgentCellStale {
                    agent: id,
                    stored: robot.cell,
                    expected,
                });
            }
            let registered = self
                .grid
                .cell(expected)
                .is_some_and(|cell| cell.agents().contains(&id));
            if !registered {
                return Err(InvariantError::AgentNotInCell {
                    agent: id,
                    cell: expected,
                });
            }
            if let Some(puck_id) = robot.puck_held {
                let holder = self.pucks.get(puck_id).and_then(Puck::holder);
                if holder != Some(id) {
                    return Err(InvariantError::HolderMismatch {
                        agent: id,
                        puck: puck_id,
                    });
                }
            }
        }
        if self.grid.agent_count() != self.robots.len() {
            return Err(InvariantError::AgentCountMismatch {
                registered: self.grid.agent_count(),
                robots: self.robots.len(),
            });
        }

        let mut free = 0;
        for (puck_id, puck) in &self.pucks {
            match puck.state {
                PuckState::Free { cell } => {
                    free += 1;
                    let expected = self.grid.cell_index(puck.x, puck.y);
                    let registered = self
                        .grid
                        .cell(expected)
                        .is_some_and(|c| c.pucks().contains(&puck_id));
                    if cell != expected || !registered {
                        return Err(InvariantError::PuckNotInCell {
                            puck: puck_id,
                            cell: expected,
                        });
                    }
                }
                PuckState::Held { by } => {
                    let held = self.robots.get(by).and_then(Robot::puck_held);
                    if held != Some(puck_id) {
                        return Err(InvariantError::HolderMismatch {
                            agent: by,
                            puck: puck_id,
                        });
                    }
                }
            }
        }
        if self.grid.puck_count() != free {
            return Err(InvariantError::PuckCountMismatch {
                registered: self.grid.puck_count(),
                free,
            });
        }
        Ok(())
    }

    /// Free pucks lying inside any home zone.
    #[must_use]
    pub fn delivered_pucks(&self) -> usize {
        self.pucks
            .values()
            .filter(|puck| !puck.held())
            .filter(|puck| {
                self.homes
                    .values()
                    .any(|home| home.contains(&self.torus, puck.position()))
            })
            .count()
    }

    #[must_use]
    pub fn config(&self) -> &AntixConfig {
        &self.config
    }

    #[must_use]
    pub const fn torus(&self) -> &Torus {
        &self.torus
    }

    #[must_use]
    pub const fn sensor(&self) -> &Sensor {
        &self.sensor
    }

    #[must_use]
    pub const fn tick(&self) -> Tick {
        self.tick
    }

    #[must_use]
    pub const fn totals(&self) -> WorldTotals {
        self.totals
    }

    /// Robots in population order.
    pub fn robots(&self) -> impl Iterator<Item = (AgentId, &Robot)> {
        self.robots.iter()
    }

    #[must_use]
    pub fn robot(&self, id: AgentId) -> Option<&Robot> {
        self.robots.get(id)
    }

    #[must_use]
    pub fn robot_count(&self) -> usize {
        self.robots.len()
    }

    pub fn pucks(&self) -> impl Iterator<Item = (PuckId, &Puck)> {
        self.pucks.iter()
    }

    #[must_use]
    pub fn puck(&self, id: PuckId) -> Option<&Puck> {
        self.pucks.get(id)
    }

    pub fn homes(&self) -> impl Iterator<Item = (HomeId, &Home)> {
        self.homes.iter()
    }

    #[must_use]
    pub fn home(&self, id: HomeId) -> Option<&Home> {
        self.homes.get(id)
    }

    #[must_use]
    pub const fn grid(&self) -> &CellGrid<AgentId, PuckId> {
        &self.grid
    }

    /// Kind of the controller bound to `id`, if any.
    #[must_use]
    pub fn controller_kind(&self, id: AgentId) -> Option<&'static str> {
        self.controllers.get(id).map(|controller| controller.kind())
    }
}
