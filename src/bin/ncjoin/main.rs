//! ncjoin CLI - Joins NetCDF trajectory segments into one continuous file.

use std::collections::BTreeSet;
use std::env;
use std::path::PathBuf;
use std::process;

use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use ncjoin::core::{Segment, Tolerance};
use ncjoin::join::{join, JoinConfig};
use ncjoin::netcdf::NcVersion;

fn print_help() {
    println!("ncjoin - join consecutive NetCDF trajectory segments");
    println!();
    println!("USAGE:");
    println!("    ncjoin [OPTIONS] <file.nc>...");
    println!();
    println!("    Files are joined in the order given. Prefix a file name with '+'");
    println!("    to trust it: its frames are kept wholesale and the overlap check");
    println!("    against the previous file is skipped.");
    println!();
    println!("OPTIONS:");
    println!("    -e, --every <interval>     Resample the joined timeline onto a");
    println!("                               uniform interval");
    println!("    -v, --test-var <name>      Variable compared across segments to");
    println!("                               find the overlap; append [k] to compare");
    println!("                               a single element (default: coordinates)");
    println!("    -t, --test-tol <tol>       Comparison tolerance; a comma-separated");
    println!("                               list is matched element-wise");
    println!("                               (default: 1e-6)");
    println!("    -i, --index <name>         Particle identifier variable used to");
    println!("                               restore storage order (default: id)");
    println!("    -o, --index-offset <n>     Offset added to identifiers to get the");
    println!("                               zero-based storage row (default: -1)");
    println!("    -x, --exclude <names>      Comma-separated variables to drop from");
    println!("                               the output");
    println!("    -O, --output <file>        Output file, must not exist");
    println!("                               (default: traj.nc)");
    println!("        --classic              Write CDF-1 (32-bit offsets) instead of");
    println!("                               CDF-2");
    println!("        --verbose              Show debug output");
    println!("    -q, --quiet                Warnings and errors only");
    println!("        --version              Show version");
    println!("    -h, --help                 Show this help");
}

fn print_version() {
    let date = option_env!("NCJOIN_BUILD_DATE").unwrap_or("unknown");
    println!("ncjoin {} (built {})", env!("CARGO_PKG_VERSION"), date);
}

fn fail(msg: &str) -> ! {
    eprintln!("Error: {msg}");
    process::exit(1);
}

/// Splits `name[k]` into the variable name and the element index.
fn parse_test_var(spec: &str) -> (String, Option<usize>) {
    if let Some(open) = spec.find('[') {
        if let Some(inner) = spec[open + 1..].strip_suffix(']') {
            if let Ok(k) = inner.parse::<usize>() {
                return (spec[..open].to_string(), Some(k));
            }
        }
        fail(&format!("cannot parse test variable '{spec}'"));
    }
    (spec.to_string(), None)
}

fn parse_tolerance(spec: &str) -> Tolerance {
    let values: Vec<f64> = spec
        .split(',')
        .map(|s| {
            s.trim()
                .parse::<f64>()
                .unwrap_or_else(|_| fail(&format!("cannot parse tolerance '{spec}'")))
        })
        .collect();
    match values.as_slice() {
        [] => fail("empty tolerance"),
        [one] => Tolerance::Scalar(*one),
        _ => Tolerance::PerElement(values),
    }
}

fn value<'a>(it: &mut std::slice::Iter<'a, String>, name: &str) -> &'a str {
    it.next()
        .map(String::as_str)
        .unwrap_or_else(|| fail(&format!("option {name} needs a value")))
}

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_help();
        return;
    }

    let mut config = JoinConfig::default();
    let mut filter = "info";

    let mut it = args[1..].iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                return;
            }
            "--version" => {
                print_version();
                return;
            }
            "-q" | "--quiet" => filter = "warn",
            "--verbose" => filter = "debug",
            "--classic" => config.format = NcVersion::Classic,
            "-e" | "--every" => {
                let v = value(&mut it, "--every");
                config.every = Some(
                    v.parse()
                        .unwrap_or_else(|_| fail(&format!("cannot parse interval '{v}'"))),
                );
            }
            "-v" | "--test-var" => {
                let (name, index) = parse_test_var(value(&mut it, "--test-var"));
                config.test_var = name;
                config.test_index = index;
            }
            "-t" | "--test-tol" => config.tolerance = parse_tolerance(value(&mut it, "--test-tol")),
            "-i" | "--index" => config.index_var = value(&mut it, "--index").to_string(),
            "-o" | "--index-offset" => {
                let v = value(&mut it, "--index-offset");
                config.index_offset = v
                    .parse()
                    .unwrap_or_else(|_| fail(&format!("cannot parse offset '{v}'")));
            }
            "-x" | "--exclude" => {
                config.exclude = value(&mut it, "--exclude")
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect::<BTreeSet<_>>();
            }
            "-O" | "--output" => config.output = PathBuf::from(value(&mut it, "--output")),
            other if other.starts_with('-') && other.len() > 1 => {
                fail(&format!("unknown option '{other}'"));
            }
            file => {
                config.segments.push(match file.strip_prefix('+') {
                    Some(rest) => Segment::trusted(rest),
                    None => Segment::new(file),
                });
            }
        }
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().without_time().with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    if config.segments.is_empty() {
        fail("no input files given");
    }
    if config.output.exists() {
        fail(&format!(
            "output file '{}' exists already",
            config.output.display()
        ));
    }

    match join(&config) {
        Ok(summary) => {
            println!(
                "Successfully wrote {} frames to '{}'.",
                summary.frames_written,
                summary.output.display()
            );
        }
        Err(e) => fail(&e.to_string()),
    }
}
