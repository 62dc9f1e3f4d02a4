use clap::{Parser, Subcommand, ValueEnum};
use pf_mission::{MissionError, MissionResults, MissionSummary};
use pf_network::{ConditionBlock, NetworkError};
use pf_project::{CompiledProject, ProjectError};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pf-cli")]
#[command(about = "PropFlow CLI - aircraft energy-network mission analysis", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate project file syntax and structure
    Validate {
        /// Path to the project YAML or JSON file
        project_path: PathBuf,
    },
    /// Fly the project's mission and report each segment
    Run {
        /// Path to the project YAML or JSON file
        project_path: PathBuf,
        /// Fail on the first segment that does not converge
        #[arg(long)]
        strict: bool,
    },
    /// Fly the mission and print a machine-readable summary
    Summary {
        /// Path to the project YAML or JSON file
        project_path: PathBuf,
        #[arg(short, long, value_enum, default_value_t = SummaryFormat::Json)]
        format: SummaryFormat,
        /// Output file (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Export one time series of a segment as CSV
    ExportSeries {
        /// Path to the project YAML or JSON file
        project_path: PathBuf,
        /// Segment tag
        segment: String,
        /// Variable: altitude, velocity, throttle, thrust, power, mass_rate,
        /// vehicle_mass, or soc:<bus>.<battery>
        variable: String,
        /// Output CSV file path (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SummaryFormat {
    Json,
    Yaml,
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Project(#[from] ProjectError),

    #[error(transparent)]
    Mission(#[from] MissionError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{what}")]
    Usage { what: String },
}

type CliResult<T> = Result<T, CliError>;

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { project_path } => cmd_validate(&project_path),
        Commands::Run {
            project_path,
            strict,
        } => cmd_run(&project_path, strict),
        Commands::Summary {
            project_path,
            format,
            output,
        } => cmd_summary(&project_path, format, output.as_deref()),
        Commands::ExportSeries {
            project_path,
            segment,
            variable,
            output,
        } => cmd_export_series(&project_path, &segment, &variable, output.as_deref()),
    }
}

fn cmd_validate(project_path: &Path) -> CliResult<()> {
    println!("Validating project: {}", project_path.display());
    let project = pf_project::load(project_path)?;
    pf_project::compile(&project)?;
    println!("✓ Project is valid");
    Ok(())
}

fn fly(project_path: &Path, strict: bool) -> CliResult<MissionResults> {
    let project = pf_project::load(project_path)?;
    let CompiledProject {
        mut vehicle,
        mut mission,
    } = pf_project::compile(&project)?;
    if strict {
        mission.config.fail_on_nonconvergence = true;
    }

    let start = Instant::now();
    let results = mission.run(&mut vehicle)?;
    info!(
        elapsed_s = start.elapsed().as_secs_f64(),
        segments = results.segments.len(),
        "mission finished"
    );
    Ok(results)
}

fn cmd_run(project_path: &Path, strict: bool) -> CliResult<()> {
    let results = fly(project_path, strict)?;
    let summary = results.summary();
    print_summary(&summary);
    if summary.all_converged {
        println!("✓ All segments converged");
    } else {
        println!("⚠ Some segments did not converge");
    }
    Ok(())
}

fn print_summary(summary: &MissionSummary) {
    println!(
        "{:<16} {:<18} {:>5} {:>9} {:>6} {:>11} {:>12} {:>10}",
        "segment", "kind", "n", "time_s", "iters", "residual", "energy_kwh", "fuel_kg"
    );
    for s in &summary.segments {
        println!(
            "{:<16} {:<18} {:>5} {:>9.1} {:>6} {:>11.3e} {:>12.3} {:>10.3}{}",
            s.tag,
            s.kind,
            s.n_points,
            s.duration,
            s.iterations,
            s.residual_norm,
            s.energy / 3.6e6,
            s.fuel_burned,
            if s.converged { "" } else { "  (not converged)" }
        );
        for (battery, soc) in &s.state_of_charge {
            println!("    {battery}: soc = {soc:.4}");
        }
    }
    println!(
        "Total: {:.1} s, {:.3} kWh, {:.3} kg fuel",
        summary.total_time,
        summary.total_energy / 3.6e6,
        summary.total_fuel_burned
    );
}

fn cmd_summary(
    project_path: &Path,
    format: SummaryFormat,
    output: Option<&Path>,
) -> CliResult<()> {
    let summary = fly(project_path, false)?.summary();
    let text = match format {
        SummaryFormat::Json => serde_json::to_string_pretty(&summary)?,
        SummaryFormat::Yaml => serde_yaml::to_string(&summary)?,
    };
    write_output(output, &text)
}

fn write_output(output: Option<&Path>, text: &str) -> CliResult<()> {
    match output {
        Some(path) => {
            std::fs::write(path, text)?;
            println!("✓ Written to {}", path.display());
        }
        None => println!("{text}"),
    }
    Ok(())
}

fn series(cond: &ConditionBlock, variable: &str) -> CliResult<Vec<f64>> {
    let values = match variable {
        "altitude" => cond.freestream.altitude.clone(),
        "velocity" => cond.freestream.velocity.clone(),
        "throttle" => cond.throttle.clone(),
        "thrust" => cond
            .total_thrust
            .iter()
            .map(|[x, y, z]| (x * x + y * y + z * z).sqrt())
            .collect(),
        "power" => cond.total_power.clone(),
        "mass_rate" => cond.total_mass_rate.clone(),
        "vehicle_mass" => cond.vehicle_mass.clone(),
        other => {
            let Some((bus, battery)) = other.strip_prefix("soc:").and_then(|k| k.split_once('.'))
            else {
                return Err(CliError::Usage {
                    what: format!("unknown variable '{other}'"),
                });
            };
            let line = cond.line(bus)?;
            let battery = line.batteries.require(battery).map_err(NetworkError::from)?;
            battery.soc.clone()
        }
    };
    Ok(values)
}

fn cmd_export_series(
    project_path: &Path,
    segment: &str,
    variable: &str,
    output: Option<&Path>,
) -> CliResult<()> {
    let results = fly(project_path, false)?;
    let Some(result) = results.segment(segment) else {
        return Err(CliError::Usage {
            what: format!("no segment '{segment}' in mission"),
        });
    };
    let cond = &result.segment.conditions;
    let values = series(cond, variable)?;

    let mut csv = format!("time_s,{variable}\n");
    for (t, v) in cond.time.iter().zip(&values) {
        csv.push_str(&format!("{t},{v}\n"));
    }
    match output {
        Some(path) => {
            std::fs::write(path, csv)?;
            println!("✓ Exported {} points to {}", values.len(), path.display());
        }
        None => print!("{csv}"),
    }
    Ok(())
}
