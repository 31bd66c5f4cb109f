use clap::{Parser, Subcommand};

/// Run data-parallel pipelines on a pool of isolated units.
///
/// Pool settings fall back to `FANOUT_*` environment variables (and a
/// `.env` file), optionally prefixed by the active profile.
#[derive(Parser, Debug)]
#[command(name = "fanout", about = "Run data-parallel pipelines on isolated units")]
pub struct CliArgs {
    /// Config profile; `BATCH` reads `BATCH_FANOUT_UNITS` before `FANOUT_UNITS`
    #[arg(long, env = "FANOUT_PROFILE", default_value = "")]
    pub profile: String,

    /// Number of isolated units (0 = available parallelism)
    #[arg(long)]
    pub units: Option<usize>,

    /// Upper bound on tasks per job
    #[arg(long)]
    pub max_concurrency: Option<usize>,

    /// Lower bound on values handed to one task
    #[arg(long)]
    pub min_values_per_worker: Option<usize>,

    /// Upper bound on values handed to one task
    #[arg(long)]
    pub max_values_per_worker: Option<usize>,

    /// Pretty-print the JSON report
    #[arg(long)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the resolved pool configuration
    Config,
    #[command(flatten)]
    Pipeline(Pipeline),
}

/// Subcommands that start a pool and run a chain on it.
#[derive(Subcommand, Debug)]
pub enum Pipeline {
    /// Square 1..=N, optionally keeping only the even squares
    Squares {
        count: usize,
        #[arg(long)]
        even: bool,
    },
    /// Sum start..end by step
    Sum {
        start: i64,
        end: i64,
        #[arg(long)]
        step: Option<i64>,
    },
    /// Square every index in 0..N, computed on the units
    Times { count: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_is_its_own_command() {
        let args = CliArgs::try_parse_from(["fanout", "config"]).unwrap();
        assert!(matches!(args.command, Command::Config));
    }

    #[test]
    fn pipelines_parse_at_the_top_level() {
        let args = CliArgs::try_parse_from(["fanout", "--units", "2", "squares", "5", "--even"]).unwrap();
        assert_eq!(args.units, Some(2));
        assert!(matches!(
            args.command,
            Command::Pipeline(Pipeline::Squares { count: 5, even: true })
        ));

        let args = CliArgs::try_parse_from(["fanout", "sum", "0", "10", "--step", "2"]).unwrap();
        assert!(matches!(
            args.command,
            Command::Pipeline(Pipeline::Sum { start: 0, end: 10, step: Some(2) })
        ));
    }
}
