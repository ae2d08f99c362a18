//! divsearch CLI entry point

use anyhow::{Context, Result};
use divsearch::config::cli::{Cli, ExecutionMode};
use divsearch::config::{build_config, cli_convert, validator, SearchConfig};
use divsearch::distributed::{capacity_for_bits, CoordinatorCollective, LocalCollective, NodeService};
use divsearch::output;
use divsearch::search::{run_or_abort, SearchOutcome};
use std::process::Child;
use std::time::Duration;

fn main() -> Result<()> {
    let cli = Cli::parse_args();

    if cli.mode != ExecutionMode::Service {
        println!("divsearch v{}", env!("CARGO_PKG_VERSION"));
        println!("Distributed largest-divisor search");
        println!();
    }

    // Coordinator mode validates itself so it can release waiting nodes on failure
    if cli.mode != ExecutionMode::Coordinator {
        cli.validate()?;
    }

    // Handle different execution modes
    match cli.mode {
        ExecutionMode::Standalone => run_standalone(cli),
        ExecutionMode::Service => run_service(cli),
        ExecutionMode::Coordinator => run_coordinator(cli),
    }
}

/// Build and validate the configuration
fn load_config(cli: &Cli) -> Result<SearchConfig> {
    let config = build_config(cli)?;
    validator::validate_config(&config).context("Configuration validation failed")?;
    Ok(config)
}

/// Run in standalone mode (single machine, one or more local processes)
fn run_standalone(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    print_configuration(&config, cli.processes);

    if config.runtime.dry_run {
        println!();
        println!("Dry run mode - configuration validated successfully");
        return Ok(());
    }

    println!();
    println!("Starting search...");
    println!();

    if cli.processes == 1 {
        let mut collective = LocalCollective::new(capacity_for_bits(config.bits));
        let outcome = run_or_abort(&mut collective, &config)?;
        return report(&outcome, &config);
    }

    // Rank 0 here, ranks 1..N as localhost services
    let mut children = Vec::with_capacity(cli.processes - 1);
    let result = run_with_local_services(&cli, &config, &mut children);

    for child in children {
        if let Err(e) = cleanup_service(child, config.runtime.debug) {
            eprintln!("Warning: failed to clean up service: {}", e);
        }
    }

    report(&result?, &config)
}

fn run_with_local_services(cli: &Cli, config: &SearchConfig, children: &mut Vec<Child>) -> Result<SearchOutcome> {
    let debug = config.runtime.debug;
    let mut ports = Vec::with_capacity(cli.processes - 1);

    for _ in 1..cli.processes {
        let port = find_available_port(&ports, debug)?;
        children.push(launch_localhost_service(port, debug)?);
        ports.push(port);
    }

    let node_addresses: Vec<String> = ports.iter().map(|port| format!("127.0.0.1:{}", port)).collect();
    let mut collective = CoordinatorCollective::connect(&node_addresses, config)
        .context("Failed to start local process group")?;

    run_or_abort(&mut collective, config)
}

/// Run in service mode (one non-root rank)
fn run_service(cli: Cli) -> Result<()> {
    let addr = format!("0.0.0.0:{}", cli.listen_port);
    let service = NodeService::bind(&addr).context("Failed to create node service")?;

    println!("Node service listening on {}", service.local_addr()?);
    println!("Node ID: {}", service.node_id());

    let (mut collective, config) = service.accept().context("Failed to join process group")?;
    let outcome = run_or_abort(&mut collective, &config)?;
    output::text::print_process_summary(&outcome);

    Ok(())
}

/// Run in coordinator mode (rank 0 of a multi-node group)
fn run_coordinator(cli: Cli) -> Result<()> {
    let node_addresses = if let Some(ref host_list) = cli.host_list {
        cli_convert::parse_host_list(host_list, cli.worker_port)?
    } else if let Some(ref clients_file) = cli.clients_file {
        cli_convert::read_clients_file(clients_file, cli.worker_port)?
    } else {
        anyhow::bail!("Coordinator mode requires --host-list or --clients-file");
    };

    // Nodes are already waiting; a bad configuration must release them too
    let config = match cli.validate().and_then(|_| load_config(&cli)) {
        Ok(config) => config,
        Err(e) => {
            println!("Aborting {} nodes: {:#}", node_addresses.len(), e);
            CoordinatorCollective::notify_abort(&node_addresses, &format!("{:#}", e));
            return Err(e);
        }
    };

    print_configuration(&config, node_addresses.len() + 1);

    if config.runtime.dry_run {
        println!();
        println!("Dry run mode - configuration validated successfully");
        CoordinatorCollective::notify_abort(&node_addresses, "dry run: no search will be started");
        return Ok(());
    }

    println!();
    let mut collective = CoordinatorCollective::connect(&node_addresses, &config)
        .context("Failed to form process group")?;

    println!();
    println!("Starting search...");
    println!();

    let outcome = run_or_abort(&mut collective, &config)?;
    report(&outcome, &config)
}

fn print_configuration(config: &SearchConfig, processes: usize) {
    println!("Configuration:");
    println!("  Processes: {}", processes);
    println!("  Threads per process: {}", config.threads);
    println!("  Bit budget: {} ({} limbs)", config.bits, capacity_for_bits(config.bits));
    match (&config.dividend, config.seed) {
        (Some(dividend), _) => println!("  Dividend: {}", dividend),
        (None, Some(seed)) => println!("  Seed: {}", seed),
        (None, None) => println!("  Seed: wall clock"),
    }
    if let Some(ref path) = config.output.json_output {
        println!("  JSON output: {}", path.display());
    }
}

/// Print the root's report and write the JSON file if requested
fn report(outcome: &SearchOutcome, config: &SearchConfig) -> Result<()> {
    output::text::print_results(outcome, config);

    if let Some(ref path) = config.output.json_output {
        if let Some(json) = output::json::JsonReport::from_outcome(outcome, config) {
            output::json::write_json_report(&json, path)?;
            println!();
            println!("JSON report written to {}", path.display());
        }
    }

    Ok(())
}

/// Find an available port for a localhost service, skipping ones already handed out
fn find_available_port(taken: &[u16], debug: bool) -> Result<u16> {
    use std::net::TcpListener;

    // Try ports 9999-10099
    for port in 9999..10100 {
        if taken.contains(&port) {
            continue;
        }
        if let Ok(listener) = TcpListener::bind(("127.0.0.1", port)) {
            drop(listener);
            if debug {
                eprintln!("DEBUG: Port {} is available", port);
            }
            return Ok(port);
        }
    }

    anyhow::bail!("No available ports found in range 9999-10099. Reduce --processes or close other divsearch instances.")
}

/// Launch a localhost service process
fn launch_localhost_service(port: u16, debug: bool) -> Result<Child> {
    use std::process::{Command, Stdio};

    let exe_path = std::env::current_exe()
        .context("Failed to get current executable path")?;

    let mut cmd = Command::new(&exe_path);
    cmd.arg("--mode").arg("service");
    cmd.arg("--listen-port").arg(port.to_string());

    // Redirect output to /dev/null (or log file if debug)
    if debug {
        let log_path = std::env::temp_dir().join(format!("divsearch_service_{}.log", port));
        let log_file = std::fs::File::create(&log_path)
            .context("Failed to create service log file")?;
        cmd.stdout(Stdio::from(log_file.try_clone()?));
        cmd.stderr(Stdio::from(log_file));
        eprintln!("DEBUG: Service log: {}", log_path.display());
    } else {
        cmd.stdout(Stdio::null());
        cmd.stderr(Stdio::null());
    }

    let child = cmd.spawn()
        .context("Failed to spawn service process")?;

    if debug {
        eprintln!("DEBUG: Service launched on port {} (PID: {})", port, child.id());
    }

    Ok(child)
}

/// Cleanup service process
fn cleanup_service(mut child: Child, debug: bool) -> Result<()> {
    if debug {
        eprintln!("DEBUG: Cleaning up service (PID: {})...", child.id());
    }

    // Services exit on their own once their result is sent; give them a moment
    for _ in 0..10 {
        if let Some(status) = child.try_wait()? {
            if debug {
                eprintln!("DEBUG: Service exited with status: {}", status);
            }
            return Ok(());
        }
        std::thread::sleep(Duration::from_millis(100));
    }

    if debug {
        eprintln!("DEBUG: Service still running, force killing...");
    }
    child.kill()?;
    let status = child.wait()?;
    if debug {
        eprintln!("DEBUG: Service killed with status: {}", status);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use divsearch::DivisorError;
    use std::thread;

    /// Bind a local node service and wait for the coordinator on a thread
    fn waiting_node() -> (String, thread::JoinHandle<divsearch::error::Result<()>>) {
        let service = NodeService::bind("127.0.0.1:0").unwrap();
        let addr = service.local_addr().unwrap().to_string();
        (addr, thread::spawn(move || service.accept().map(|_| ())))
    }

    fn coordinator_cli(addr: &str, extra: &[&str]) -> Cli {
        let mut args = vec!["divsearch", "--mode", "coordinator", "--host-list", addr];
        args.extend_from_slice(extra);
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_coordinator_dry_run_releases_nodes() {
        let (addr, node) = waiting_node();
        let cli = coordinator_cli(&addr, &["--dry-run", "--dividend", "360", "2"]);

        assert!(run_coordinator(cli).is_ok());
        assert!(matches!(node.join().unwrap(), Err(DivisorError::Aborted(_))));
    }

    #[test]
    fn test_coordinator_cli_error_releases_nodes() {
        let (addr, node) = waiting_node();
        let cli = coordinator_cli(&addr, &["--processes", "2", "2"]);

        assert!(run_coordinator(cli).is_err());
        assert!(matches!(node.join().unwrap(), Err(DivisorError::Aborted(_))));
    }

    #[test]
    fn test_coordinator_config_error_releases_nodes() {
        let (addr, node) = waiting_node();
        let cli = coordinator_cli(&addr, &["0"]);

        assert!(run_coordinator(cli).is_err());
        assert!(matches!(node.join().unwrap(), Err(DivisorError::Aborted(_))));
    }
}
