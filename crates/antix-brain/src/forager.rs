//! Puck-collecting behavior: find a puck, carry it home, drop it, repeat.

use antix_core::{Command, ControlInput, Controller, Grip, SeePuck, angle_normalize};
use rand::{Rng, RngCore, SeedableRng, rngs::SmallRng};
use serde::{Deserialize, Serialize};

/// Tunables for [`Forager`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ForagerSettings {
    /// Forward speed while searching or carrying.
    pub cruise_speed: f64,
    /// Largest heading change per tick when steering.
    pub max_turn: f64,
    /// Largest random heading change per tick when nothing is in sight.
    pub wander_turn: f64,
    /// Robots closer than this many body radii ahead are steered around.
    pub crowding_radii: f64,
}

impl Default for ForagerSettings {
    fn default() -> Self {
        Self {
            cruise_speed: 0.005,
            max_turn: 0.2,
            wander_turn: 0.1,
            crowding_radii: 3.0,
        }
    }
}

/// Classic Antix forager.
#[derive(Debug, Clone)]
pub struct Forager {
    settings: ForagerSettings,
    rng: SmallRng,
}

impl Forager {
    pub const KIND: &'static str = "antix.forager";

    #[must_use]
    pub fn new(settings: ForagerSettings, rng: &mut dyn RngCore) -> Self {
        Self {
            settings,
            rng: SmallRng::seed_from_u64(rng.next_u64()),
        }
    }

    #[must_use]
    pub fn controller(rng: &mut dyn RngCore) -> Box<dyn Controller> {
        Box::new(Self::new(ForagerSettings::default(), rng))
    }

    fn steer(&self, bearing: f64) -> f64 {
        bearing.clamp(-self.settings.max_turn, self.settings.max_turn)
    }

    fn wander(&mut self, input: &ControlInput<'_>) -> Command {
        let jitter = self.settings.wander_turn;
        let mut turn = if jitter > 0.0 {
            self.rng.random_range(-jitter..=jitter)
        } else {
            0.0
        };
        // veer away from the closest robot directly ahead
        let personal_space = input.config.robot_radius * self.settings.crowding_radii;
        if let Some(nearest) = input
            .see_robots
            .iter()
            .filter(|seen| seen.range < personal_space)
            .min_by(|a, b| a.range.total_cmp(&b.range))
        {
            turn = if nearest.bearing >= 0.0 {
                -self.settings.max_turn
            } else {
                self.settings.max_turn
            };
        }
        Command::drive(self.settings.cruise_speed, turn)
    }

    /// Nearest free puck in view that is not already lying in our home.
    fn target<'a>(input: &'a ControlInput<'_>) -> Option<&'a SeePuck> {
        input
            .see_pucks
            .iter()
            .filter(|seen| !seen.held)
            .filter(|seen| {
                let heading = input.pose.a + seen.bearing;
                let position = (
                    input.pose.x + seen.range * heading.cos(),
                    input.pose.y + seen.range * heading.sin(),
                );
                !input.home.contains(input.torus, position)
            })
            .min_by(|a, b| a.range.total_cmp(&b.range))
    }
}

impl Controller for Forager {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn control(&mut self, input: &ControlInput<'_>) -> Command {
        let here = input.pose.position();
        let at_home = input.home.contains(input.torus, here);

        if input.holding {
            if at_home {
                // turn around and head back out
                return Command::drive(0.0, std::f64::consts::PI).with_grip(Grip::Drop);
            }
            let (dx, dy) = input.torus.delta(here, input.home.position());
            let bearing = angle_normalize(dy.atan2(dx) - input.pose.a);
            return Command::drive(self.settings.cruise_speed, self.steer(bearing));
        }

        if !at_home && let Some(puck) = Self::target(input) {
            let turn = self.steer(puck.bearing);
            if puck.range <= input.config.pickup_range {
                // creep onto the puck so it ends up in our cell
                let creep = puck.range.min(self.settings.cruise_speed);
                return Command::drive(creep, turn).with_grip(Grip::PickupPuck(puck.id));
            }
            return Command::drive(self.settings.cruise_speed, turn);
        }

        self.wander(input)
    }
}
