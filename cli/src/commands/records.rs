use anyhow::{Context, Result};

use pollmap::service::{ServiceConfig, build_feature_collection};
use pollmap::write_atomic;

use crate::cli::{Cli, RecordsArgs};

pub fn run(cli: &Cli, args: &RecordsArgs) -> Result<()> {
    let excluded_reasons: Vec<String> = match &args.exclusions {
        Some(path) => {
            let bytes =
                std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
            serde_json::from_slice(&bytes)
                .with_context(|| format!("parse exclusion list {}", path.display()))?
        }
        None => Vec::new(),
    };
    let config = ServiceConfig {
        excluded_reasons,
        time_window_minutes: args.window,
    };

    let collection = build_feature_collection(&args.service, &config, cli.verbose)?;
    let json = serde_json::to_vec_pretty(&collection)?;

    match &args.output {
        Some(path) => {
            write_atomic(path, &json, args.force)?;
            println!("Wrote {} -> {}", args.service, path.display());
        }
        None => println!("{}", String::from_utf8_lossy(&json)),
    }
    Ok(())
}
