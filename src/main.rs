//! Main Program for Catscramble
//! Run with `--help` for more instruction

// Copyright (C) 2023 Dheatly23
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{anyhow, bail, Error};
use clap::{Parser, Subcommand};
use log::error;
use rayon::prelude::*;

use catscramble::catmap::period;
use catscramble::transform::run;
use catscramble::{Direction, Fit, Status, TransformRequest};

#[derive(Parser, Debug)]
#[command(author, version)]
struct Args {
    /// Increase logging (repeat for more)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scramble images
    Scramble(TransformArgs),

    /// Unscramble images
    Unscramble(TransformArgs),

    /// Print after how many iterations a square image repeats
    Period {
        /// Image side length
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        size: u32,
    },
}

#[derive(clap::Args, Debug)]
struct TransformArgs {
    /// Input files
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output file (single input only)
    #[arg(
        short = 'o',
        long,
        conflicts_with = "out_dir",
        required_unless_present = "out_dir"
    )]
    output: Option<PathBuf>,

    /// Output directory, outputs keep the input file name
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Number of iterations
    #[arg(short = 'n', long, default_value_t = 1, allow_negative_numbers = true)]
    iterations: i64,

    /// Pad non-square images to a square instead of rejecting them
    #[arg(long)]
    pad: bool,

    /// Sample value used for padding
    #[arg(long, default_value_t = 0, requires = "pad")]
    fill: u16,

    /// Crop the result to WIDTHxHEIGHT (e.g. to undo --pad)
    #[arg(long, value_parser = parse_dims)]
    crop: Option<Dims>,
}

#[derive(Clone, Copy, Debug)]
struct Dims(usize, usize);

fn parse_dims(s: &str) -> Result<Dims, String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {s:?}"))?;
    let parse = |v: &str| v.trim().parse::<usize>().map_err(|e| format!("{v:?}: {e}"));
    Ok(Dims(parse(w)?, parse(h)?))
}

fn requests(args: &TransformArgs) -> Result<Vec<TransformRequest>, Error> {
    if args.output.is_some() && args.inputs.len() > 1 {
        bail!("--output takes a single input, use --out-dir for several");
    }

    let fit = if args.pad {
        Fit::Pad { fill: args.fill }
    } else {
        Fit::Strict
    };
    let destination = |input: &Path| -> Result<PathBuf, Error> {
        match (&args.output, &args.out_dir) {
            (Some(p), _) => Ok(p.clone()),
            (None, Some(dir)) => input
                .file_name()
                .map(|name| dir.join(name))
                .ok_or_else(|| anyhow!("{} has no file name", input.display())),
            (None, None) => bail!("Either --output or --out-dir is required"),
        }
    };

    let mut seen = HashSet::new();
    let mut ret = Vec::with_capacity(args.inputs.len());
    for input in &args.inputs {
        let dst = destination(input)?;
        if !seen.insert(dst.clone()) {
            bail!("More than one input would be written to {}", dst.display());
        }

        let mut builder = TransformRequest::builder(input, dst)
            .iterations(args.iterations)
            .fit(fit);
        if let Some(Dims(w, h)) = args.crop {
            builder = builder.crop(w, h);
        }
        ret.push(builder.build());
    }
    Ok(ret)
}

fn main() -> Result<ExitCode, Error> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let (direction, args) = match args.command {
        Command::Period { size } => {
            let size = NonZeroUsize::new(size as usize)
                .ok_or_else(|| anyhow!("Image size must be nonzero"))?;
            println!("{}", period(size));
            return Ok(ExitCode::SUCCESS);
        }
        Command::Scramble(a) => (Direction::Scramble, a),
        Command::Unscramble(a) => (Direction::Unscramble, a),
    };

    // Each image is transformed on a single thread, independent images in parallel
    let statuses: Vec<Status> = requests(&args)?
        .par_iter()
        .map(|req| {
            let outcome = run(direction, req);
            if let Err(e) = &outcome {
                error!("{e}");
            }
            Status::from(&outcome)
        })
        .collect();

    Ok(match statuses.into_iter().find(|s| *s != Status::Ok) {
        Some(s) => ExitCode::from(s.code() as u8),
        None => ExitCode::SUCCESS,
    })
}
