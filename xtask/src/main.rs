// Licensed under the Apache-2.0 license

use clap::{Parser, Subcommand};

mod console;
mod image;
mod policy;

use image::{InfoArgs, SignArgs, VerifyArgs};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Xtask {
    /// Log debug output, including the verifier's console
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    xtask: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build and sign a boot image
    ImageSign(SignArgs),
    /// Verify a boot image against a set of public keys
    ImageVerify(VerifyArgs),
    /// Print the header and trailer of a boot image
    ImageInfo(InfoArgs),
}

fn main() {
    let cli = Xtask::parse();
    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    let _ = simple_logger::SimpleLogger::new().with_level(level).init();
    console::install();

    let result = match &cli.xtask {
        Commands::ImageSign(args) => image::sign(args),
        Commands::ImageVerify(args) => image::verify(args),
        Commands::ImageInfo(args) => image::info(args),
    };
    result.unwrap_or_else(|e| {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    });
}
