//! Command line interface for emtracks

use clap::Parser;
use thiserror::Error;

use crate::config::RunConfig;
use crate::error::{ConfigError, TrackError};
use crate::physics::integrators::registry::IntegratorRegistry;
use crate::physics::math::Scalar;
use crate::physics::solver::TrajectorySolver;
use crate::physics::species::all_species;
use crate::reconstruction::{self, ReconstructedMomentumTable};
use crate::trajectory::{TerminationCause, Trajectory};

const LONG_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (built ", env!("BUILD_DATE"), ")");

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Failed to load configuration: {0}")]
    ConfigLoad(String),

    #[error("Invalid integrator: {0}")]
    InvalidIntegrator(ConfigError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Tracking(#[from] TrackError),
}

/// emtracks - charged particle tracking and momentum reconstruction
#[derive(Parser, Debug, Default)]
#[command(version, long_version = LONG_VERSION, about, long_about = None)]
pub struct Args {
    /// Path to configuration file (TOML format)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<String>,

    /// Signed PDG species number, negative for the antiparticle (overrides config file)
    #[arg(short = 'p', long, value_name = "ID", allow_negative_numbers = true)]
    pub particle: Option<i32>,

    /// Initial momentum magnitude in MeV/c
    #[arg(short = 'm', long, value_name = "MEV")]
    pub momentum: Option<Scalar>,

    /// Initial polar angle of the momentum in radians
    #[arg(long, value_name = "RAD", allow_negative_numbers = true)]
    pub theta: Option<Scalar>,

    /// Initial azimuthal angle of the momentum in radians
    #[arg(long, value_name = "RAD", allow_negative_numbers = true)]
    pub phi: Option<Scalar>,

    /// End time in seconds
    #[arg(short = 't', long, value_name = "SECONDS")]
    pub end_time: Option<Scalar>,

    /// Number of output samples
    #[arg(short = 'n', long, value_name = "COUNT")]
    pub points: Option<usize>,

    /// Integrator type (e.g., dop853, dormand_prince, cash_karp, rk45)
    #[arg(short = 'i', long, value_name = "TYPE")]
    pub integrator: Option<String>,

    /// Absolute error tolerance
    #[arg(long, value_name = "VALUE")]
    pub atol: Option<Scalar>,

    /// Relative error tolerance
    #[arg(long, value_name = "VALUE")]
    pub rtol: Option<Scalar>,

    /// Samples per reconstruction window
    #[arg(long, value_name = "COUNT")]
    pub step: Option<usize>,

    /// Distance between samples used inside a window
    #[arg(long, value_name = "COUNT")]
    pub stride: Option<usize>,

    /// Enable verbose logging
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// List known particle species and exit
    #[arg(long)]
    pub list_species: bool,

    /// List available integrators and exit
    #[arg(long)]
    pub list_integrators: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    pub print_config: bool,

    /// Print this many evenly spaced trajectory samples
    #[arg(long, value_name = "COUNT")]
    pub samples: Option<usize>,
}

/// Handles the --list-species flag by printing the species table
pub fn handle_list_species() {
    println!("Known species (negative id selects the antiparticle):");
    println!("  {:>6}  {:<6} {:<6} {:>14} {:>7}", "id", "name", "anti", "mass [GeV]", "charge");
    for species in all_species() {
        println!(
            "  {:>6}  {:<6} {:<6} {:>14.9} {:>+7.1}",
            species.pdg_id, species.name, species.antiparticle_name, species.mass, species.charge
        );
    }
}

/// Handles the --list-integrators flag by printing available integrators and exiting
pub fn handle_list_integrators() {
    let registry = IntegratorRegistry::new().with_standard_integrators();
    println!("Available integrators:");
    for name in registry.list_available() {
        println!("  - {name}");
    }

    let aliases = registry.list_aliases();
    if !aliases.is_empty() {
        println!("\nAliases:");
        for (alias, target) in aliases {
            println!("  - {alias} -> {target}");
        }
    }
}

/// Loads configuration from file or defaults, then applies command-line overrides
pub fn load_and_apply_config(args: &Args) -> Result<RunConfig, CliError> {
    let mut config = if let Some(config_path) = &args.config {
        println!("Loading configuration from: {config_path}");
        RunConfig::load_layered(Some(std::path::Path::new(config_path)))
            .map_err(|err| CliError::ConfigLoad(err.to_string()))?
    } else {
        RunConfig::load_from_user_config()
    };

    apply_overrides(&mut config, args)?;
    Ok(config)
}

fn apply_overrides(config: &mut RunConfig, args: &Args) -> Result<(), CliError> {
    if let Some(species_id) = args.particle {
        config.particle.species_id = species_id;
    }
    if let Some(momentum) = args.momentum {
        config.initial.p0 = momentum;
    }
    if let Some(theta) = args.theta {
        config.initial.theta0 = theta;
    }
    if let Some(phi) = args.phi {
        config.initial.phi0 = phi;
    }
    if let Some(end_time) = args.end_time {
        config.initial.tf = end_time;
    }
    if let Some(points) = args.points {
        config.initial.n_t = points;
    }
    if let Some(atol) = args.atol {
        config.solver.atol = atol;
    }
    if let Some(rtol) = args.rtol {
        config.solver.rtol = rtol;
    }
    if let Some(step) = args.step {
        config.reconstruction.options.step = step;
    }
    if let Some(stride) = args.stride {
        config.reconstruction.options.stride = stride;
    }

    if let Some(integrator_type) = &args.integrator {
        // Validate integrator name against registry
        let registry = IntegratorRegistry::new().with_standard_integrators();
        registry
            .create(integrator_type)
            .map_err(CliError::InvalidIntegrator)?;
        config.solver.integrator = integrator_type.clone();
    }

    Ok(())
}

/// Track the configured particle and reconstruct its momentum
pub fn simulate(config: &RunConfig) -> Result<(Trajectory, ReconstructedMomentumTable), TrackError> {
    config.validate()?;
    let particle = config.particle_model()?;
    let termination = config.termination_policy()?;
    let solver = TrajectorySolver::new(config.solver.clone())?;

    let trajectory = solver.solve(
        &config.initial,
        &particle,
        &config.fields.magnetic,
        &config.fields.electric,
        &termination,
        config.z_events.as_ref(),
    )?;

    let magnetic = config.reconstruction.magnetic_or(&config.fields.magnetic);
    let table = reconstruction::reconstruct(&trajectory, magnetic, &config.reconstruction.options)?;
    Ok((trajectory, table))
}

/// Runs the pipeline and prints the report
pub fn run(args: &Args, config: &RunConfig) -> Result<(), CliError> {
    if args.print_config {
        let text = toml::to_string_pretty(config).map_err(|err| CliError::ConfigLoad(err.to_string()))?;
        println!("{text}");
        return Ok(());
    }

    let (trajectory, table) = simulate(config)?;
    let particle = config.particle_model()?;

    println!("Particle: {} (id {})", particle.name(), particle.species_id());
    print_trajectory(&trajectory, args.samples.unwrap_or(0));
    print_reconstruction(&table, particle.mass_mev());
    Ok(())
}

fn print_trajectory(trajectory: &Trajectory, sample_count: usize) {
    let statistics = trajectory.statistics();
    println!(
        "Trajectory: {} samples, {} accepted / {} rejected steps, {} derivative evaluations",
        trajectory.len(),
        statistics.accepted_steps,
        statistics.rejected_steps,
        statistics.derivative_evaluations
    );
    match trajectory.termination() {
        TerminationCause::ReachedEndTime => println!("Termination: reached end time"),
        TerminationCause::BoundsExited { t, position } => println!(
            "Termination: left bounds at t = {t:.6e} s, position ({:.6}, {:.6}, {:.6}) m",
            position.x, position.y, position.z
        ),
    }

    if let (Some(first), Some(last)) = (trajectory.first(), trajectory.last()) {
        println!(
            "  start: t = {:.6e} s, p = {:.6} MeV/c, pT = {:.6} MeV/c",
            first.t(),
            first.total_momentum(),
            first.transverse_momentum()
        );
        println!(
            "  end:   t = {:.6e} s, p = {:.6} MeV/c, pT = {:.6} MeV/c",
            last.t(),
            last.total_momentum(),
            last.transverse_momentum()
        );
    }

    if sample_count > 0 && !trajectory.is_empty() {
        println!(
            "  {:>13} {:>11} {:>11} {:>11} {:>11} {:>11} {:>11} {:>9}",
            "t [s]", "x [m]", "y [m]", "z [m]", "px", "py", "pz", "beta"
        );
        let stride = trajectory.len().div_ceil(sample_count).max(1);
        for sample in trajectory.samples().iter().step_by(stride) {
            let (position, momentum) = (sample.position(), sample.momentum());
            println!(
                "  {:>13.6e} {:>11.6} {:>11.6} {:>11.6} {:>11.4} {:>11.4} {:>11.4} {:>9.6}",
                sample.t(),
                position.x,
                position.y,
                position.z,
                momentum.x,
                momentum.y,
                momentum.z,
                sample.beta()
            );
        }
    }

    for crossing in trajectory.z_crossings() {
        println!(
            "  z plane {:.4} m reached at t = {:.6e} s (z = {:.6} m)",
            crossing.plane, crossing.t, crossing.z
        );
    }
}

fn print_reconstruction(table: &ReconstructedMomentumTable, true_mass: Scalar) {
    println!("Reconstruction: {} windows", table.len());
    println!(
        "  {:>4} {:>13} {:>10} {:>10} {:>10} {:>10} {:>10} {:>6}",
        "win", "t_start [s]", "p", "pT", "pz", "m", "E", "q"
    );
    for window in table.windows() {
        match &window.result {
            Ok(estimate) => println!(
                "  {:>4} {:>13.6e} {:>10.4} {:>10.4} {:>10.4} {:>10.4} {:>10.4} {:>+6.0}",
                window.index,
                window.t_start,
                estimate.p,
                estimate.pt,
                estimate.pz,
                estimate.mass,
                estimate.energy,
                estimate.charge_sign
            ),
            Err(error) => println!("  {:>4} {:>13.6e} failed: {error}", window.index, window.t_start),
        }
    }

    if let Some(mean) = table.mean_momentum() {
        println!("Mean reconstructed momentum: {mean:.4} MeV/c");
    }
    let failures = table.failures().count();
    if failures > 0 {
        println!("{failures} windows could not be reconstructed");
    }
    println!("True mass: {true_mass:.6} MeV/c^2");
}
