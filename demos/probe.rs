use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ras_serial::config::ServiceConfig;
use ras_serial::payload::HexPayload;
use ras_serial::ras::{RasService, Status};
use ras_serial::scoring::{ScoringBackend, SimulationProfile};
use ras_serial::transport::serial::SerialPortLine;
use ras_serial::transport::UartContext;
use ras_serial::MAX_DATA_SIZE;

/// Brings a modem up, sends a payload, reads it back and compares
#[derive(Parser, Debug)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "RAS_CONFIG")]
    config: Option<PathBuf>,
    /// Serial device, overrides the configured one
    #[arg(short, long)]
    port: Option<String>,
    /// Payload to send, in hex
    #[arg(long, default_value = "0102030405")]
    payload: HexPayload,
    /// Fixed bit error rate reported for every transmission
    #[arg(long)]
    score: Option<f64>,
}

fn run<S: ScoringBackend>(mut service: RasService<'_, SerialPortLine, S>, payload: &[u8]) -> bool {
    println!("Testing RAS initialization...");
    service.init();

    println!("Testing RAS data transmission...");
    let transmitted = service.transmit_data(payload);
    match &transmitted {
        Ok(t) if t.is_degraded(service.quality_threshold()) => {
            println!("Data transmission passed with degraded link quality ({:?}).", t.score)
        }
        Ok(_) => println!("Data transmission test passed."),
        Err(e) => println!(
            "Data transmission test failed. Error code: {}",
            e.status() as u8
        ),
    }
    service.handle_error(Status::of(&transmitted));

    println!("Testing RAS data reception...");
    let mut buffer = [0u8; MAX_DATA_SIZE];
    let received = service.receive_data(&mut buffer, MAX_DATA_SIZE);
    let matched = match &received {
        Ok(n) => &buffer[..*n] == payload,
        Err(_) => false,
    };
    if matched {
        println!("Data reception test passed.");
    } else {
        println!(
            "Data reception test failed. Error code: {}",
            Status::of(&received) as u8
        );
    }
    service.handle_error(Status::of(&received));

    println!("Testing RAS error handling...");
    for status in [
        Status::InvalidParameter,
        Status::TransmissionFailed,
        Status::ReceptionFailed,
    ] {
        service.handle_error(status);
    }

    transmitted.is_ok() && matched
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let mut config = match ServiceConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration. Error: {}", e);
            process::exit(2);
        }
    };
    if let Some(port) = args.port {
        config.port = port;
    }

    let mut context = UartContext::<SerialPortLine>::new();
    let transport = config.open(&mut context);
    if !transport.is_open() {
        eprintln!("Failed to open \"{}\".", config.port);
        process::exit(1);
    }

    let service = config.service(transport);
    let passed = match args.score {
        Some(score) => run(
            service.with_scoring(move |_: &SimulationProfile| score),
            args.payload.as_slice(),
        ),
        None => run(service, args.payload.as_slice()),
    };
    if !passed {
        process::exit(1);
    }
}
