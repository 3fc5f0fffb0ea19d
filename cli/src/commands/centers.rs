use anyhow::{Context, Result};

use pollmap::{
    BatchResolver, CenterLookupClient, CenterMapping, CenterResolver, LookupConfig, Nominatim,
    read_precinct_features, write_atomic,
};

use crate::cli::{CentersArgs, Cli};

pub fn run(cli: &Cli, args: &CentersArgs) -> Result<()> {
    let bytes = std::fs::read(&args.precincts)
        .with_context(|| format!("read {}", args.precincts.display()))?;
    let features = read_precinct_features(&bytes)?;
    if cli.verbose > 0 {
        eprintln!("[resolve] {} precinct features loaded", features.len());
    }

    let seed = match &args.resume {
        Some(path) => {
            let bytes =
                std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
            serde_json::from_slice::<CenterMapping>(&bytes)
                .with_context(|| format!("parse mapping {}", path.display()))?
        }
        None => CenterMapping::default(),
    };

    let geocoder = Nominatim::new(&args.geocoder_url)?;
    let mut config = LookupConfig::default();
    if let Some(url) = &args.form_url {
        config.form_url = url.clone();
    }
    let lookup = CenterLookupClient::new(config)?;

    let resolver = CenterResolver::new(geocoder, lookup)
        .with_max_attempts(args.max_attempts)
        .with_verbose(cli.verbose);
    let report = BatchResolver::new(resolver).resolve_all(&features, seed);

    let json = serde_json::to_vec_pretty(&report.mapping)?;
    write_atomic(&args.output, &json, args.force)?;

    if let Some(err) = &report.halted {
        eprintln!(
            "Halted early ({err}); partial mapping of {} precincts written to {}",
            report.mapping.len(),
            args.output.display()
        );
    } else {
        println!(
            "Resolved {} precincts -> {}",
            report.mapping.len(),
            args.output.display()
        );
    }
    Ok(())
}
