use anyhow::Context;
use clap::{value_parser, Arg, ArgMatches, Command, ValueHint};
use diffquant::*;
use quantfile::QuantFile;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::fs;
use std::io::{self, BufWriter, Write};

/// Load a single replicate file, keeping both quantification channels
fn read_replicate(path: &str) -> io::Result<HashMap<String, Measurement>> {
    let file = QuantFile::load(path)?;
    if file.is_empty() {
        log::warn!("no valid protein entries in {}", path);
    }
    Ok(file
        .entries
        .into_iter()
        .map(|(acc, q)| (acc, Measurement::new(q.sin, q.nsaf)))
        .collect())
}

/// Read the JSON parameter file, applying any command line overrides
fn input_from_arguments(matches: &ArgMatches) -> anyhow::Result<Input> {
    let path = matches
        .get_one::<String>("parameters")
        .context("missing parameter file")?;
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read parameters from `{}`", path))?;
    let mut input: Input = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse parameters from `{}`", path))?;

    if let Some(paths) = matches.get_many::<String>("control") {
        log::trace!("overriding `control` parameter.");
        input.control = paths.cloned().collect();
    }
    if let Some(paths) = matches.get_many::<String>("treatment") {
        log::trace!("overriding `treatment` parameter.");
        input.treatment = paths.cloned().collect();
    }
    if let Some(channel) = matches.get_one::<String>("channel") {
        input.channel = Some(channel.clone());
    }
    if let Some(imputation) = matches.get_one::<String>("imputation") {
        input.imputation = Some(imputation.clone());
    }
    if let Some(fdr) = matches.get_one::<f64>("fdr") {
        input.fdr = Some(*fdr);
    }
    if let Some(fold) = matches.get_one::<f64>("fold-change") {
        input.fold_change = Some(*fold);
    }
    if let Some(scale) = matches.get_one::<String>("scale") {
        input.scale = Some(scale.parse()?);
    }
    if let Some(seed) = matches.get_one::<u64>("seed") {
        input.seed = Some(*seed);
    }
    Ok(input)
}

/// Write selected proteins as TSV. With `all`, every tested protein is
/// written instead, with a column marking the selected ones
fn write_report<W: Write>(mut w: W, report: &Report, all: bool) -> io::Result<()> {
    if all {
        writeln!(w, "protein\tp_value\tlog2_fold\tneg_log10_p\tselected")?;
        for (acc, res) in &report.results {
            let selected = report
                .selection
                .proteins
                .iter()
                .any(|p| &p.accession == acc);
            writeln!(
                w,
                "{}\t{:e}\t{:.4}\t{:.4}\t{}",
                acc,
                res.p_value,
                res.log2_fold,
                res.neg_log10_p(),
                selected
            )?;
        }
    } else {
        writeln!(w, "protein\tp_value\tlog2_fold\tq_value\tregulation")?;
        for p in &report.selection.proteins {
            let regulation = if p.log2_fold > 0.0 { "up" } else { "down" };
            writeln!(
                w,
                "{}\t{:e}\t{:.4}\t{:e}\t{}",
                p.accession, p.p_value, p.log2_fold, p.q_value, regulation
            )?;
        }
    }
    w.flush()
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::default()
        .filter_level(log::LevelFilter::Error)
        .parse_env(
            env_logger::Env::default()
                .filter_or("DIFFQUANT_LOG", "error,diffquant=info,analyze=info"),
        )
        .init();

    let matches = Command::new("diffquant")
        .version(clap::crate_version!())
        .author("Michael Lazear <lazear@scripps.edu>")
        .about("Differential protein abundance from replicate label-free quantification")
        .arg(
            Arg::new("parameters")
                .required(true)
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help("Path to analysis parameters (JSON file)")
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("control")
                .short('c')
                .long("control")
                .num_args(1..)
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help("Control replicate files. Overrides `control` in the parameter file")
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("treatment")
                .short('t')
                .long("treatment")
                .num_args(1..)
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help("Treatment replicate files. Overrides `treatment` in the parameter file")
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("channel")
                .long("channel")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help("Quantification channel to test: SIn or NSAF"),
        )
        .arg(
            Arg::new("imputation")
                .long("imputation")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help("Imputation strategy: average or minimum"),
        )
        .arg(
            Arg::new("scale")
                .long("scale")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help("Scale of the input values: linear, or log2 if already log-transformed"),
        )
        .arg(
            Arg::new("fdr")
                .long("fdr")
                .value_parser(value_parser!(f64))
                .help("Benjamini-Hochberg false discovery rate"),
        )
        .arg(
            Arg::new("fold-change")
                .long("fold-change")
                .value_parser(value_parser!(f64))
                .help("Minimum absolute log2 fold change"),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .value_parser(value_parser!(u64))
                .help("Seed for imputation and variance jitter, for reproducible runs"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help("Write results to this file instead of stdout")
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("all")
                .long("all")
                .action(clap::ArgAction::SetTrue)
                .help("Write every tested protein, not just the selected ones"),
        )
        .get_matches();

    let all = matches.get_one::<bool>("all").copied().unwrap_or(false);
    let parameters = input_from_arguments(&matches)?.build()?;
    log::debug!("{:?}", parameters);

    let control = load_replicates(&parameters.control, read_replicate)
        .context("Failed to read control replicates")?;
    let treatment = load_replicates(&parameters.treatment, read_replicate)
        .context("Failed to read treatment replicates")?;

    let mut rng = match parameters.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let report = parameters.run(control, treatment, &mut rng)?;

    match matches.get_one::<String>("output") {
        Some(path) => {
            let f = fs::File::create(path)
                .with_context(|| format!("Failed to create `{}`", path))?;
            write_report(BufWriter::new(f), &report, all)?;
            log::info!("wrote results to {}", path);
        }
        None => {
            let stdout = io::stdout();
            write_report(BufWriter::new(stdout.lock()), &report, all)?;
        }
    }
    Ok(())
}
