extern crate clap;
extern crate image;
extern crate num;
extern crate num_cpus;
extern crate quantum_julia;

use clap::{App, Arg, ArgMatches};
use image::pnm::PNMEncoder;
use image::pnm::{PNMSubtype, SampleEncoding};
use image::ColorType;
use num::{clamp, Complex};
use std::fmt;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::str::FromStr;

use quantum_julia::logging::init_tracing;
use quantum_julia::schedule::MAX_QUBITS;
use quantum_julia::statevector::{parse_coefficients, FixedCoefficients};
use quantum_julia::{
    EscapeParams, EscapeResult, EscapeTimeEngine, MapKind, QuantumJuliaError, Session, Viewport,
};

fn parse_pair<T: FromStr>(s: &str, separator: char) -> Option<(T, T)> {
    let mut halves = s.splitn(2, separator);
    let left = halves.next()?.trim().parse().ok()?;
    let right = halves.next()?.trim().parse().ok()?;
    Some((left, right))
}

fn parse_complex(s: &str) -> Option<Complex<f64>> {
    parse_pair(s, ',').map(|(re, im)| Complex::new(re, im))
}

fn validate_pair<T: FromStr>(s: &str, separator: char, what: &str) -> Result<(), String> {
    parse_pair::<T>(s, separator)
        .map(|_| ())
        .ok_or_else(|| format!("Could not parse {}", what))
}

fn validate_range<T>(s: &str, low: T, high: T, what: &str) -> Result<(), String>
where
    T: FromStr + PartialOrd + fmt::Display,
{
    match s.trim().parse::<T>() {
        Ok(v) if v >= low && v <= high => Ok(()),
        Ok(_) => Err(format!("{} must be between {} and {}", what, low, high)),
        Err(_) => Err(format!("Could not parse {}", what)),
    }
}

fn validate_positive(s: &str, what: &str) -> Result<(), String> {
    match s.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => Ok(()),
        Ok(_) => Err(format!("{} must be positive and finite", what)),
        Err(_) => Err(format!("Could not parse {}", what)),
    }
}

const OUTPUT: &str = "output";
const SIZE: &str = "size";
const CENTER: &str = "center";
const HALFWIDTH: &str = "half-width";
const ZOOM: &str = "zoom";
const MAP: &str = "map";
const QUBITS: &str = "qubits";
const OFFSET: &str = "power-offset";
const COEFFICIENTS: &str = "coefficients";
const ITERATIONS: &str = "iterations";
const RADIUS: &str = "escape-radius";
const THREADS: &str = "threads";

fn args<'a>() -> ArgMatches<'a> {
    let max_threads = num_cpus::get();

    App::new("qjulia")
        .version("0.1.0")
        .about("Renders one frame of a statevector-driven Julia map")
        .arg(
            Arg::with_name(OUTPUT)
                .required(true)
                .long(OUTPUT)
                .short("o")
                .takes_value(true)
                .help("Output file (binary PGM)"),
        )
        .arg(
            Arg::with_name(SIZE)
                .long(SIZE)
                .short("s")
                .takes_value(true)
                .default_value("500x500")
                .validator(|s| validate_pair::<u16>(&s, 'x', "output image size"))
                .help("Size of output image, WIDTHxHEIGHT"),
        )
        .arg(
            Arg::with_name(CENTER)
                .long(CENTER)
                .short("c")
                .takes_value(true)
                .allow_hyphen_values(true)
                .default_value("0,0")
                .validator(|s| validate_pair::<f64>(&s, ',', "centre point"))
                .help("Centre of the window on the complex plane, RE,IM"),
        )
        .arg(
            Arg::with_name(HALFWIDTH)
                .long(HALFWIDTH)
                .short("w")
                .takes_value(true)
                .default_value("1.5,1.5")
                .validator(|s| validate_pair::<f64>(&s, ',', "half widths"))
                .help("Half of the horizontal and vertical spans at zoom 1, X,Y"),
        )
        .arg(
            Arg::with_name(ZOOM)
                .long(ZOOM)
                .short("z")
                .takes_value(true)
                .default_value("1.0")
                .validator(|s| validate_positive(&s, "Zoom"))
                .help("Magnification of the window"),
        )
        .arg(
            Arg::with_name(MAP)
                .long(MAP)
                .short("m")
                .takes_value(true)
                .default_value("general")
                .validator(|s| MapKind::from_str(&s).map(|_| ()).map_err(|e| e.to_string()))
                .help("general, quadratic, pair-a or pair-b (any case)"),
        )
        .arg(
            Arg::with_name(QUBITS)
                .long(QUBITS)
                .short("q")
                .takes_value(true)
                .default_value("1")
                .validator(|s| validate_range(&s, 1, MAX_QUBITS, "Qubit count"))
                .help("Qubits in the statevector; the general map has degree 2^qubits"),
        )
        .arg(
            Arg::with_name(OFFSET)
                .long(OFFSET)
                .short("p")
                .takes_value(true)
                .default_value("0")
                .validator(|s| validate_range(&s, 0, 64, "Power offset"))
                .help("Added to every exponent of the general map"),
        )
        .arg(
            Arg::with_name(COEFFICIENTS)
                .required(true)
                .long(COEFFICIENTS)
                .short("k")
                .takes_value(true)
                .allow_hyphen_values(true)
                .validator(|s| match parse_coefficients(&s) {
                    Some(ref k) if !k.is_empty() => Ok(()),
                    _ => Err("Could not parse coefficients".to_string()),
                })
                .help("Coefficient vector, RE,IM;RE,IM;..."),
        )
        .arg(
            Arg::with_name(ITERATIONS)
                .long(ITERATIONS)
                .short("i")
                .takes_value(true)
                .default_value("100")
                .validator(|s| validate_range(&s, 1, 65_535, "Iteration count"))
                .help("Maximum iterations per point"),
        )
        .arg(
            Arg::with_name(RADIUS)
                .long(RADIUS)
                .short("e")
                .takes_value(true)
                .default_value("2.0")
                .validator(|s| validate_positive(&s, "Escape radius"))
                .help("A point escapes once its magnitude exceeds this"),
        )
        .arg(
            Arg::with_name(THREADS)
                .long(THREADS)
                .short("t")
                .takes_value(true)
                .default_value("1")
                .validator(move |s| validate_range(&s, 1, max_threads, "Thread count"))
                .help("Number of threads to use in the engine"),
        )
        .get_matches()
}

fn value<T: FromStr>(matches: &ArgMatches<'_>, name: &str) -> quantum_julia::Result<T> {
    matches
        .value_of(name)
        .and_then(|s| T::from_str(s).ok())
        .ok_or_else(|| QuantumJuliaError::InvalidParameter {
            reason: format!("could not read --{}", name),
        })
}

fn pair<T: FromStr>(matches: &ArgMatches<'_>, name: &str) -> quantum_julia::Result<(T, T)> {
    matches
        .value_of(name)
        .and_then(|s| parse_pair(s, if name == SIZE { 'x' } else { ',' }))
        .ok_or_else(|| QuantumJuliaError::InvalidParameter {
            reason: format!("could not read --{}", name),
        })
}

/// Maps divergence values to gray levels: late escapes are bright,
/// points that never escaped are black.  The top image row is the
/// highest imaginary part, so rows are written in reverse.
fn pixelate(result: &EscapeResult, max_iterations: u32) -> Vec<u8> {
    let shape = result.divergence.shape();
    let mut pixels = Vec::with_capacity(shape.len());
    for (divs, flags) in result
        .divergence
        .rows()
        .zip(result.converging.rows())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
    {
        for (d, converging) in divs.iter().zip(flags) {
            let gray = if *converging {
                0
            } else {
                clamp(((*d as u64 + 1) * 255) / u64::from(max_iterations), 1, 255) as u8
            };
            pixels.push(gray);
        }
    }
    pixels
}

/// Writes the run as a binary graymap, one byte per grid point.
fn write_graymap(path: &Path, result: &EscapeResult, max_iterations: u32) -> quantum_julia::Result<()> {
    let shape = result.divergence.shape();
    let pixels = pixelate(result, max_iterations);
    let sink = BufWriter::new(File::create(path)?);
    PNMEncoder::new(sink)
        .with_subtype(PNMSubtype::Graymap(SampleEncoding::Binary))
        .encode(&pixels[..], shape.width as u32, shape.height as u32, ColorType::Gray(8))?;
    Ok(())
}

fn run(matches: &ArgMatches<'_>) -> quantum_julia::Result<EscapeResult> {
    let (width, height) = pair::<usize>(matches, SIZE)?;
    let center = matches
        .value_of(CENTER)
        .and_then(parse_complex)
        .ok_or_else(|| QuantumJuliaError::InvalidParameter {
            reason: "could not read --center".to_string(),
        })?;
    let (half_width, half_height) = pair::<f64>(matches, HALFWIDTH)?;
    let viewport = Viewport::new(center, half_width, half_height, value(matches, ZOOM)?, width, height)?;

    let params = EscapeParams::new(value(matches, ITERATIONS)?, value(matches, RADIUS)?)?;
    let engine = EscapeTimeEngine::new(params)?.with_threads(value(matches, THREADS)?);
    let kind: MapKind = value(matches, MAP)?;
    let session = Session::new(
        viewport,
        kind,
        value(matches, QUBITS)?,
        value(matches, OFFSET)?,
        engine,
    )?;

    let coefficients = matches
        .value_of(COEFFICIENTS)
        .and_then(parse_coefficients)
        .ok_or_else(|| QuantumJuliaError::InvalidParameter {
            reason: "could not read --coefficients".to_string(),
        })?;
    let result = session.render_frame(&FixedCoefficients(coefficients), 0)?;

    let output = value::<String>(matches, OUTPUT)?;
    write_graymap(Path::new(&output), &result, params.max_iterations)?;
    Ok(result)
}

fn main() {
    init_tracing();
    let matches = args();
    match run(&matches) {
        Err(e) => {
            eprintln!("Render failure: {}", e);
            std::process::exit(1);
        }
        Ok(result) => {
            println!(
                "escaped {} of {} points",
                result.stats.escaped, result.stats.points
            );
        }
    }
}
