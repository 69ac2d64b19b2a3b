use crate::config::types::{ExecutionRequest, ResourceParams};
use crate::guard::GuardAdapter;
use crate::remote::{HttpTransport, RemoteSandbox};
use crate::sandbox::Sandbox;
use crate::session::LocalSandbox;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Submit to a remote execution service instead of the local guard
    #[arg(long, global = true)]
    remote: Option<String>,
    /// API key for the remote service
    #[arg(long, global = true)]
    api_key: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute source code and print the classified result as JSON
    ExecuteCode {
        /// Programming language key (see `languages`)
        #[arg(long)]
        language: String,
        /// Source code as a string
        #[arg(long, conflicts_with = "source_file")]
        code: Option<String>,
        /// Read source code from a file
        #[arg(long)]
        source_file: Option<std::path::PathBuf>,
        /// Data to pass to stdin
        #[arg(long)]
        stdin: Option<String>,
        /// CPU time limit in seconds
        #[arg(long)]
        cpu: Option<f64>,
        /// Wall clock time limit in seconds
        #[arg(long)]
        wall_time: Option<f64>,
        /// Memory limit in MB
        #[arg(long)]
        mem: Option<f64>,
        /// Output limit in MB
        #[arg(long)]
        output_limit: Option<f64>,
        /// Guard binary to use (overrides RUNBOX_GUARD)
        #[arg(long)]
        guard: Option<std::path::PathBuf>,
    },
    /// List the language keys the selected backend accepts
    Languages,
    /// Check that the execution guard can be invoked
    CheckDeps,
}

fn limit_params(
    cpu: Option<f64>,
    wall_time: Option<f64>,
    mem: Option<f64>,
    output_limit: Option<f64>,
) -> Option<ResourceParams> {
    if cpu.is_none() && wall_time.is_none() && mem.is_none() && output_limit.is_none() {
        return None;
    }
    let mut kv = BTreeMap::new();
    if let Some(v) = cpu {
        kv.insert("cpu_time_limit_seconds".to_string(), v);
    }
    if let Some(v) = wall_time {
        kv.insert("wall_time_limit_seconds".to_string(), v);
    }
    if let Some(v) = mem {
        kv.insert("memory_limit_megabytes".to_string(), v);
    }
    if let Some(v) = output_limit {
        kv.insert("output_limit_megabytes".to_string(), v);
    }
    Some(ResourceParams::from_key_values(&kv))
}

fn make_backend(
    remote: Option<&str>,
    api_key: Option<&str>,
    guard: Option<std::path::PathBuf>,
) -> Result<Box<dyn Sandbox>> {
    match remote {
        Some(url) => {
            let mut transport = HttpTransport::new(url)?;
            if let Some(key) = api_key {
                transport = transport.with_api_key(key);
            }
            Ok(Box::new(RemoteSandbox::new(Box::new(transport))?))
        }
        None => {
            let guard = guard.map(GuardAdapter::new).unwrap_or_else(GuardAdapter::from_env);
            let euid = unsafe { libc::geteuid() };
            let base = std::env::temp_dir().join(format!("runbox-uid-{}", euid));
            Ok(Box::new(LocalSandbox::new(guard, base)))
        }
    }
}

pub fn run() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::ExecuteCode {
            language,
            code,
            source_file,
            stdin,
            cpu,
            wall_time,
            mem,
            output_limit,
            guard,
        } => {
            let source_code = match (code, source_file) {
                (Some(code), None) => code,
                (None, Some(path)) => std::fs::read_to_string(&path)?,
                (None, None) => {
                    anyhow::bail!("either --code or --source-file is required")
                }
                (Some(_), Some(_)) => unreachable!("clap conflicts_with"),
            };

            let mut backend = make_backend(cli.remote.as_deref(), cli.api_key.as_deref(), guard)?;
            let mut request = ExecutionRequest::new(source_code, language);
            request.stdin = stdin;
            request.params = limit_params(cpu, wall_time, mem, output_limit);

            let outcome = backend.execute(&request);
            backend.close();

            match outcome {
                Ok(result) => {
                    println!("{}", serde_json::to_string_pretty(&result)?);
                    Ok(())
                }
                Err(e) => Err(e.into()),
            }
        }
        Commands::Languages => {
            let mut backend = make_backend(cli.remote.as_deref(), cli.api_key.as_deref(), None)?;
            for lang in backend.supported_languages() {
                println!("{}", lang);
            }
            backend.close();
            Ok(())
        }
        Commands::CheckDeps => {
            let guard = GuardAdapter::from_env();
            match guard.probe() {
                Ok(()) => {
                    println!("guard ok: {}", guard.guard_path().display());
                    Ok(())
                }
                Err(e) => {
                    eprintln!("guard unavailable: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn no_limit_flags_means_backend_defaults() {
        assert!(limit_params(None, None, None, None).is_none());
    }

    #[test]
    fn limit_flags_map_to_params() {
        let params = limit_params(Some(3.0), None, Some(64.0), None).unwrap();
        assert_eq!(params.cpu_time_limit, Duration::from_secs(3));
        assert_eq!(params.memory_limit, 64 * 1024 * 1024);
        // unspecified limits keep bounded defaults
        assert_eq!(
            params.wall_time_limit,
            ResourceParams::default().wall_time_limit
        );
    }
}
