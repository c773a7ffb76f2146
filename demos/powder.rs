//! Powder pattern of a uniaxial chemical shift tensor deposited from an orientation mesh
#![deny(warnings)]

use std::{
    env,
    f64::consts::FRAC_PI_2,
    io::{self, Write},
};
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};
use trihist::*;

type Error = Box<dyn std::error::Error>;

const SHADES: &[u8] = b" .:-=+*#%@";
const PLOT_WIDTH: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Output {
    Plot,
    Json,
    Raw,
}

#[derive(Debug)]
struct Args {
    bins: usize,
    mesh: usize,
    center: Option<Scalar>,
    anisotropy: Option<Scalar>,
    two_dim: bool,
    output: Output,
}

impl Args {
    fn parse() -> Result<Args, Error> {
        let mut result = Args {
            bins: 64,
            mesh: 48,
            center: None,
            anisotropy: None,
            two_dim: false,
            output: Output::Plot,
        };
        let mut args = env::args();
        let cmd = args.next().unwrap_or_default();
        while let Some(arg) = args.next() {
            match arg.as_ref() {
                "-n" => {
                    result.bins = args.next().ok_or("-n requires argument")?.parse()?;
                }
                "-m" => {
                    result.mesh = args.next().ok_or("-m requires argument")?.parse()?;
                }
                "-c" => {
                    let center = args.next().ok_or("-c requires argument")?;
                    result.center = Some(center.parse()?);
                }
                "-d" => {
                    let anisotropy = args.next().ok_or("-d requires argument")?;
                    result.anisotropy = Some(anisotropy.parse()?);
                }
                "-2" => result.two_dim = true,
                "-j" => result.output = Output::Json,
                "-r" => result.output = Output::Raw,
                _ => {
                    eprintln!("Powder pattern of a uniaxial tensor deposited into a histogram");
                    eprintln!("\nUSAGE:");
                    eprintln!("    {} [-n <bins>] [-m <mesh>] [-c <center>] [-d <delta>] [-2] [-j|-r]", cmd);
                    eprintln!("\nARGS:");
                    eprintln!("    -n <bins>    number of bins per axis (default: 64)");
                    eprintln!("    -m <mesh>    orientation mesh steps per angle (default: 48)");
                    eprintln!("    -c <center>  isotropic shift in bins (default: bins / 2)");
                    eprintln!("    -d <delta>   anisotropy in bins (default: bins / 4)");
                    eprintln!("    -2           correlate with a tensor along x on the second axis");
                    eprintln!("    -j           write grid as JSON to stdout");
                    eprintln!("    -r           write grid as raw native f64 to stdout");
                    std::process::exit(1);
                }
            }
        }
        if result.bins == 0 || result.mesh == 0 {
            return Err("bins and mesh must be positive".into());
        }
        Ok(result)
    }
}

/// Shift of the tensor aligned with `z` and of the one aligned with `x`
fn shifts(center: Scalar, anisotropy: Scalar, theta: Scalar, phi: Scalar) -> Point {
    let z = theta.cos();
    let x = theta.sin() * phi.cos();
    Point::new(
        center + anisotropy * (3.0 * z * z - 1.0) / 2.0,
        center + anisotropy * (3.0 * x * x - 1.0) / 2.0,
    )
}

/// Triangulated octant of the unit sphere, vertices carry both shifts
fn mesh(args: &Args) -> Vec<([Point; 3], Scalar)> {
    let bins = args.bins as Scalar;
    let center = args.center.unwrap_or(bins / 2.0);
    let anisotropy = args.anisotropy.unwrap_or(bins / 4.0);
    let step = FRAC_PI_2 / args.mesh as Scalar;
    let node = |i: usize, j: usize| {
        let (theta, phi) = (i as Scalar * step, j as Scalar * step);
        (shifts(center, anisotropy, theta, phi), theta.sin())
    };
    let mut triangles = Vec::with_capacity(2 * args.mesh * args.mesh);
    for i in 0..args.mesh {
        for j in 0..args.mesh {
            let (p00, s00) = node(i, j);
            let (p10, s10) = node(i + 1, j);
            let (p11, s11) = node(i + 1, j + 1);
            let (p01, s01) = node(i, j + 1);
            // solid angle of the half cell
            let area = step * step / 2.0;
            triangles.push(([p00, p10, p11], area * (s00 + s10 + s11) / 3.0));
            triangles.push(([p00, p11, p01], area * (s00 + s11 + s01) / 3.0));
        }
    }
    triangles
}

fn plot_1d(spec: &[Scalar]) {
    let max = spec.iter().copied().fold(0.0, Scalar::max);
    for (bin, value) in spec.iter().enumerate() {
        let width = if max > 0.0 {
            (value / max * PLOT_WIDTH as Scalar).round() as usize
        } else {
            0
        };
        eprintln!("{:>5} {:<w$} {:.4e}", bin, "#".repeat(width), value, w = PLOT_WIDTH);
    }
}

fn plot_2d(grid: &impl Grid) {
    let max = grid.iter().fold(0.0, Scalar::max);
    for row in (0..grid.rows()).filter_map(|row| grid.row(row)) {
        let line: String = row
            .iter()
            .map(|value| {
                let level = if max > 0.0 { value / max } else { 0.0 };
                let index = (level.sqrt() * (SHADES.len() - 1) as Scalar).round() as usize;
                SHADES[index.min(SHADES.len() - 1)] as char
            })
            .collect();
        eprintln!("|{}|", line);
    }
}

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_span_events(FmtSpan::CLOSE)
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse()?;
    let triangles = tracing::debug_span!("[mesh]").in_scope(|| mesh(&args));
    tracing::debug!("[mesh:triangles] {}", triangles.len());

    let rows = if args.two_dim { args.bins } else { 1 };
    let mut grid = GridOwned::new(rows, args.bins);
    let written = tracing::debug_span!("[distribute]", two_dim = args.two_dim).in_scope(
        || -> Result<usize, Error> {
            let mut written = 0;
            for (vertices, amplitude) in triangles.iter() {
                let outcome = if args.two_dim {
                    distribute_2d(*vertices, *amplitude, &mut grid)
                } else {
                    let spec = grid.row_mut(0).ok_or("empty grid")?;
                    distribute_1d(vertices.map(Point::x), *amplitude, spec)
                };
                written += outcome.is_written() as usize;
            }
            Ok(written)
        },
    )?;
    let total: Scalar = triangles.iter().map(|(_, amplitude)| amplitude).sum();
    tracing::debug!("[distribute:written] {} of {}", written, triangles.len());

    match args.output {
        Output::Plot if args.two_dim => plot_2d(&grid),
        Output::Plot => plot_1d(grid.row(0).unwrap_or_default()),
        Output::Json => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{}", grid.to_json()?)?;
        }
        Output::Raw => io::stdout().lock().write_all(grid.as_bytes())?,
    }
    eprintln!("mass: {:.6} of {:.6}", grid.sum(), total);

    Ok(())
}
