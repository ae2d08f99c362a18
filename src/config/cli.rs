//! CLI argument parsing using clap

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Execution mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExecutionMode {
    /// Standalone mode (default) - one machine, optionally several local processes
    Standalone,
    /// Coordinator mode - rank 0 of a process group spread over nodes
    Coordinator,
    /// Service mode - wait for a coordinator and join its process group
    Service,
}

/// divsearch - distributed largest-divisor search
#[derive(Parser, Debug)]
#[command(name = "divsearch")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Execution mode: standalone, coordinator, or service
    #[arg(long, value_enum, default_value = "standalone")]
    pub mode: ExecutionMode,

    /// Worker threads per process (positive integer)
    ///
    /// Not required in service mode (coordinator sends configuration)
    #[arg(value_name = "THREADS")]
    pub threads: Option<String>,

    /// Random bits in the generated dividend; also sizes the wire buffers (e.g., 100M, 64k, 4096)
    #[arg(long)]
    pub bits: Option<String>,

    /// Seed for the dividend generator (default: wall-clock seconds)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Use this decimal value as the dividend instead of generating one
    #[arg(long)]
    pub dividend: Option<String>,

    /// TOML configuration file (CLI options take precedence)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    // === Process Group Options ===
    /// Total processes to run on this machine in standalone mode (spawns local services)
    #[arg(short = 'p', long, default_value = "1")]
    pub processes: usize,

    /// Port for service to listen on (service mode only)
    #[arg(long, default_value = "9999")]
    pub listen_port: u16,

    /// Comma-separated list of node addresses for coordinator mode (e.g., "10.0.1.10:9999,10.0.1.11:9999")
    #[arg(long)]
    pub host_list: Option<String>,

    /// File containing list of node addresses (one per line, for coordinator mode)
    #[arg(long)]
    pub clients_file: Option<PathBuf>,

    /// Port to connect to on nodes when an address has none (coordinator mode only)
    #[arg(long, default_value = "9999")]
    pub worker_port: u16,

    // === Output Options ===
    /// Write a JSON report to this path
    #[arg(long)]
    pub json_output: Option<PathBuf>,

    /// Validate configuration and exit without searching
    #[arg(long)]
    pub dry_run: bool,

    /// Enable debug output (ranges, timing, protocol messages)
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate CLI arguments
    pub fn validate(&self) -> anyhow::Result<()> {
        // Service mode gets everything else from the coordinator
        if self.mode == ExecutionMode::Service {
            return Ok(());
        }

        super::validator::validate_world_size(self.processes)?;

        if self.mode == ExecutionMode::Coordinator {
            if self.host_list.is_none() && self.clients_file.is_none() {
                anyhow::bail!("Coordinator mode requires --host-list or --clients-file");
            }
            if self.processes != 1 {
                anyhow::bail!("--processes only applies to standalone mode; list nodes with --host-list instead");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_parse_positional_threads() {
        let cli = parse(&["divsearch", "8"]);
        assert_eq!(cli.mode, ExecutionMode::Standalone);
        assert_eq!(cli.threads.as_deref(), Some("8"));
        assert_eq!(cli.processes, 1);
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_service_mode_needs_nothing() {
        let cli = parse(&["divsearch", "--mode", "service", "--listen-port", "7000"]);
        assert_eq!(cli.listen_port, 7000);
        assert!(cli.threads.is_none());
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_coordinator_requires_nodes() {
        let cli = parse(&["divsearch", "--mode", "coordinator", "4"]);
        assert!(cli.validate().is_err());

        let cli = parse(&["divsearch", "--mode", "coordinator", "--host-list", "a,b", "4"]);
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_zero_processes_rejected() {
        let cli = parse(&["divsearch", "--processes", "0", "4"]);
        assert!(cli.validate().is_err());
    }
}
