//! Command line interface for moldrift

use clap::Parser;
use std::fmt;

use crate::config::{IntegratorConfig, SimulationConfig};
use crate::physics::integrators::registry::IntegratorRegistry;

/// CLI-specific errors
#[derive(Debug)]
pub enum CliError {
    /// Configuration file could not be loaded
    ConfigLoad(String),
    /// Invalid integrator name provided
    InvalidIntegrator(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::ConfigLoad(msg) => write!(f, "Failed to load configuration: {msg}"),
            CliError::InvalidIntegrator(msg) => write!(f, "Invalid integrator: {msg}"),
        }
    }
}

impl std::error::Error for CliError {}

/// moldrift - pausable molecular-dynamics engine
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file (TOML format)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<String>,

    /// Number of time steps to run (overrides config file)
    #[arg(short = 'n', long, value_name = "COUNT")]
    pub steps: Option<u64>,

    /// Time step length (overrides config file)
    #[arg(short = 't', long, value_name = "VALUE")]
    pub timestep: Option<f64>,

    /// Integrator type (e.g., velocity_verlet, verlet, gear4)
    #[arg(short = 'i', long, value_name = "TYPE")]
    pub integrator: Option<String>,

    /// Number of rigid dimer molecules in the box
    #[arg(short = 'm', long, value_name = "COUNT")]
    pub molecules: Option<usize>,

    /// Initial temperature in reduced units
    #[arg(short = 'T', long, value_name = "VALUE")]
    pub temperature: Option<f64>,

    /// Random seed for initial configuration
    #[arg(short = 's', long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// List available integrators and exit
    #[arg(long)]
    pub list_integrators: bool,

    /// Enable verbose logging
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

/// Handles the --list-integrators flag by printing available integrators and exiting
pub fn handle_list_integrators() {
    let registry = IntegratorRegistry::default();
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
pub fn load_and_apply_config(args: &Args) -> Result<SimulationConfig, CliError> {
    let mut config = if let Some(config_path) = &args.config {
        println!("Loading configuration from: {config_path}");
        SimulationConfig::load_or_default(config_path)
    } else {
        SimulationConfig::load_from_user_config()
    };

    if let Some(steps) = args.steps {
        config.run.steps = steps;
    }

    if let Some(timestep) = args.timestep {
        if timestep <= 0.0 {
            return Err(CliError::ConfigLoad(format!(
                "time step must be positive, got {timestep}"
            )));
        }
        config.physics.timestep = timestep;
    }

    if let Some(integrator_type) = &args.integrator {
        // Validate integrator name against registry
        let registry = IntegratorRegistry::default();
        registry
            .create(integrator_type, config.physics.timestep)
            .map_err(CliError::InvalidIntegrator)?;

        config.physics.integrator = IntegratorConfig {
            integrator_type: integrator_type.clone(),
        };
    }

    if let Some(molecules) = args.molecules {
        config.physics.molecule_count = molecules;
    }

    if let Some(temperature) = args.temperature {
        config.physics.temperature = temperature;
    }

    if let Some(seed) = args.seed {
        config.physics.initial_seed = Some(seed);
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_args() -> Args {
        Args {
            config: None,
            steps: None,
            timestep: None,
            integrator: None,
            molecules: None,
            temperature: None,
            seed: None,
            list_integrators: false,
            verbose: false,
        }
    }

    #[test]
    fn test_overrides_apply() {
        let mut args = bare_args();
        args.steps = Some(50);
        args.integrator = Some("gear".to_string());
        args.seed = Some(123);

        let config = load_and_apply_config(&args).unwrap();
        assert_eq!(config.run.steps, 50);
        assert_eq!(config.physics.integrator.integrator_type, "gear");
        assert_eq!(config.physics.initial_seed, Some(123));
    }

    #[test]
    fn test_unknown_integrator_is_rejected() {
        let mut args = bare_args();
        args.integrator = Some("leapfrog9000".to_string());

        assert!(matches!(
            load_and_apply_config(&args),
            Err(CliError::InvalidIntegrator(_))
        ));
    }

    #[test]
    fn test_non_positive_timestep_is_rejected() {
        let mut args = bare_args();
        args.timestep = Some(0.0);

        assert!(matches!(
            load_and_apply_config(&args),
            Err(CliError::ConfigLoad(_))
        ));
    }
}
