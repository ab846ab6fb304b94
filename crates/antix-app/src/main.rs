use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use antix_app::{Runner, StopFlag};
use antix_brain::ControllerKind;
use antix_core::{AntixConfig, ControllerRegistry, Scheduling, World, dtor, rtod};
use clap::{Parser, ValueEnum};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "antix",
    version,
    about = "Robots foraging for pucks on a toroidal world"
)]
struct Cli {
    /// TOML file supplying the base configuration; flags override it.
    #[arg(long, env = "ANTIX_CONFIG")]
    config: Option<PathBuf>,
    /// Number of pucks.
    #[arg(short = 'a', long)]
    pucks: Option<usize>,
    /// Number of homes.
    #[arg(short = 'o', long)]
    homes: Option<usize>,
    /// Robots per home.
    #[arg(short = 'p', long)]
    robots_per_home: Option<usize>,
    /// Side length of the world.
    #[arg(short = 's', long)]
    world_size: Option<f64>,
    /// Sensor field of view in degrees.
    #[arg(short = 'f', long)]
    fov: Option<f64>,
    /// Sensor range.
    #[arg(short = 'r', long)]
    range: Option<f64>,
    /// Pickup range.
    #[arg(short = 'k', long)]
    pickup_range: Option<f64>,
    /// Grid cells along each axis.
    #[arg(short = 'm', long)]
    matrix_width: Option<usize>,
    /// Stop after this many ticks (0 runs until interrupted).
    #[arg(short = 'u', long)]
    max_ticks: Option<u64>,
    /// Milliseconds to sleep between ticks.
    #[arg(short = 'z', long)]
    sleep_ms: Option<u64>,
    /// Redraw interval in milliseconds.
    #[arg(short = 'g', long)]
    gui_interval_ms: Option<u64>,
    /// Window size in pixels.
    #[arg(short = 'w', long)]
    window_size: Option<u32>,
    /// Draw sensor fields.
    #[arg(short = 'd', long)]
    show_sensors: bool,
    /// Seed for reproducible worlds.
    #[arg(long, conflicts_with = "unseeded")]
    seed: Option<u64>,
    /// Seed the world from OS entropy.
    #[arg(long)]
    unseeded: bool,
    /// Sense every robot in parallel before any robot acts.
    #[arg(long)]
    phased: bool,
    /// Controller driving every robot.
    #[arg(long, value_enum, default_value_t = ControllerArg::Forager)]
    controller: ControllerArg,
    /// Write the final run report as JSON to this path.
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ControllerArg {
    Forager,
    Wanderer,
    Idle,
}

impl From<ControllerArg> for ControllerKind {
    fn from(arg: ControllerArg) -> Self {
        match arg {
            ControllerArg::Forager => Self::Forager,
            ControllerArg::Wanderer => Self::Wanderer,
            ControllerArg::Idle => Self::Idle,
        }
    }
}

impl Cli {
    fn resolve_config(&self) -> Result<AntixConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => AntixConfig::default(),
        };
        self.apply_overrides(&mut config);
        config.validate().context("invalid configuration")?;
        Ok(config)
    }

    fn apply_overrides(&self, config: &mut AntixConfig) {
        if let Some(pucks) = self.pucks {
            config.puck_count = pucks;
        }
        if let Some(homes) = self.homes {
            config.home_count = homes;
        }
        if let Some(population) = self.robots_per_home {
            config.home_population = population;
        }
        if let Some(size) = self.world_size {
            config.world_size = size;
        }
        if let Some(fov) = self.fov {
            config.fov = dtor(fov);
        }
        if let Some(range) = self.range {
            config.sensor_range = range;
        }
        if let Some(range) = self.pickup_range {
            config.pickup_range = range;
        }
        if let Some(width) = self.matrix_width {
            config.matrix_width = width;
        }
        if let Some(ticks) = self.max_ticks {
            config.max_ticks = ticks;
        }
        if let Some(ms) = self.sleep_ms {
            config.sleep_ms = ms;
        }
        if let Some(ms) = self.gui_interval_ms {
            config.gui_interval_ms = ms;
        }
        if let Some(size) = self.window_size {
            config.window_size = size;
        }
        if self.show_sensors {
            config.show_sensors = true;
        }
        if let Some(seed) = self.seed {
            config.rng_seed = Some(seed);
        }
        if self.unseeded {
            config.rng_seed = None;
        }
        if self.phased {
            config.scheduling = Scheduling::Phased;
        }
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = cli.resolve_config()?;
    let kind = ControllerKind::from(cli.controller);

    info!(
        pucks = config.puck_count,
        homes = config.home_count,
        robots_per_home = config.home_population,
        world_size = config.world_size,
        fov_deg = rtod(config.fov),
        range = config.sensor_range,
        pickup_range = config.pickup_range,
        matrix_width = config.matrix_width,
        max_ticks = config.max_ticks,
        seed = ?config.rng_seed,
        scheduling = ?config.scheduling,
        controller = kind.id(),
        "starting Antix"
    );
    info!(
        gui_interval_ms = config.gui_interval_ms,
        window_size = config.window_size,
        show_sensors = config.show_sensors,
        "running headless; presentation settings unused"
    );

    let mut registry = ControllerRegistry::new();
    let key = antix_brain::register(&mut registry, kind);
    let world = World::populate(config, &registry, key).context("failed to build world")?;

    let stop = StopFlag::new();
    let handler_flag = stop.clone();
    if let Err(err) = ctrlc::set_handler(move || handler_flag.raise()) {
        warn!(%err, "could not install Ctrl-C handler");
    }

    let mut runner = Runner::new(world).with_stop_flag(stop);
    let report = runner.run();

    if let Some(path) = &cli.report {
        let json = serde_json::to_string_pretty(&report).context("failed to encode run report")?;
        fs::write(path, json)
            .with_context(|| format!("failed to write run report to {}", path.display()))?;
    }
    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn load_config(path: &Path) -> Result<AntixConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("failed to parse config file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("antix").chain(args.iter().copied()))
            .expect("arguments parse")
    }

    #[test]
    fn classic_switches_override_defaults() {
        let cli = parse(&[
            "-a", "250", "-o", "3", "-p", "8", "-s", "2.0", "-f", "180", "-r", "0.2", "-k",
            "0.05", "-m", "20", "-u", "500", "-z", "0", "-d", "--phased", "--seed", "11",
        ]);
        let config = cli.resolve_config().expect("config");
        assert_eq!(config.puck_count, 250);
        assert_eq!(config.home_count, 3);
        assert_eq!(config.home_population, 8);
        assert_eq!(config.world_size, 2.0);
        assert!((config.fov - std::f64::consts::PI).abs() < 1e-12);
        assert_eq!(config.sensor_range, 0.2);
        assert_eq!(config.pickup_range, 0.05);
        assert_eq!(config.matrix_width, 20);
        assert_eq!(config.max_ticks, 500);
        assert_eq!(config.sleep_ms, 0);
        assert!(config.show_sensors);
        assert_eq!(config.scheduling, Scheduling::Phased);
        assert_eq!(config.rng_seed, Some(11));
    }

    #[test]
    fn no_flags_keep_defaults() {
        let config = parse(&[]).resolve_config().expect("config");
        assert_eq!(config, AntixConfig::default());
        assert_eq!(parse(&[]).controller, ControllerArg::Forager);
    }

    #[test]
    fn invalid_overrides_are_rejected() {
        let err = parse(&["-m", "0"]).resolve_config().expect_err("zero width");
        assert!(format!("{err:#}").contains("matrix_width"));
    }

    #[test]
    fn seed_and_unseeded_conflict() {
        assert!(Cli::try_parse_from(["antix", "--seed", "1", "--unseeded"]).is_err());
        let config = parse(&["--unseeded"]).resolve_config().expect("config");
        assert_eq!(config.rng_seed, None);
    }

    #[test]
    fn missing_config_file_reports_path() {
        let err = load_config(Path::new("/nonexistent/antix.toml")).expect_err("missing");
        assert!(err.to_string().contains("/nonexistent/antix.toml"));
    }
}
