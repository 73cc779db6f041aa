//! # thermal-raster CLI
//!
//! ```bash
//! # Print over a USB-serial adapter
//! thermal-raster print receipt.png --serial /dev/ttyUSB0 --baud 19200
//!
//! # Print to the first device of a vendor, on an 80 mm printer
//! thermal-raster print receipt.png --width 576 --usb 0416
//!
//! # Encode only, with a preview of the dithered bitmap
//! thermal-raster render receipt.png --out receipt.bin --preview receipt-dither.png
//!
//! # What can this host talk to?
//! thermal-raster probe
//! thermal-raster devices
//! ```

use std::{fs, path::PathBuf, process::ExitCode};

use clap::{Args, Parser, Subcommand};
use log::error;

use thermal_raster::{
    available, dither, pack, resize, to_grayscale,
    transport::{usb, UsbFilter, DEFAULT_BAUD_RATE},
    Capture, Config, Connection, Error, ImageCapture, DOT_WIDTH_58MM,
};

/// Encode images for thermal receipt printers and send them
#[derive(Parser, Debug)]
#[command(name = "thermal-raster")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print an image
    Print {
        image: PathBuf,

        #[command(flatten)]
        raster: RasterArgs,

        #[command(flatten)]
        target: TargetArgs,

        /// Serial baud rate
        #[arg(long, default_value_t = DEFAULT_BAUD_RATE)]
        baud: u32,

        /// USB serial number string, to pick one of several identical printers
        #[arg(long, value_name = "SERIAL")]
        usb_serial: Option<String>,
    },
    /// Encode an image to a raster command file without printing
    Render {
        image: PathBuf,

        #[command(flatten)]
        raster: RasterArgs,

        /// Where to write the command bytes
        #[arg(long, value_name = "FILE")]
        out: PathBuf,

        /// Also save the dithered bitmap as PNG
        #[arg(long, value_name = "PNG")]
        preview: Option<PathBuf>,
    },
    /// Show which transports this host supports
    Probe,
    /// List USB devices and their OUT endpoint
    Devices,
}

#[derive(Args, Debug)]
struct RasterArgs {
    /// Print head width in dots (384 for 58 mm, 576 for 80 mm)
    #[arg(long, default_value_t = DOT_WIDTH_58MM)]
    width: u32,

    /// Raster mode byte
    #[arg(long, default_value_t = 0)]
    mode: u8,
}

impl RasterArgs {
    fn config(&self) -> Config {
        Config::new(self.width).mode(self.mode)
    }
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false, id = "target")]
struct TargetArgs {
    /// Serial device path
    #[arg(long, value_name = "PATH")]
    serial: Option<PathBuf>,

    /// USB device as VID or VID:PID, in hex
    #[arg(long, value_name = "VID[:PID]", value_parser = parse_usb_id)]
    usb: Option<(u16, Option<u16>)>,

    /// WebSocket relay URL
    #[arg(long, value_name = "URL")]
    relay: Option<String>,
}

fn parse_usb_id(s: &str) -> Result<(u16, Option<u16>), String> {
    let hex = |part: &str| {
        u16::from_str_radix(part.trim_start_matches("0x"), 16)
            .map_err(|e| format!("invalid USB id {:?}: {}", part, e))
    };
    match s.split_once(':') {
        Some((vid, pid)) => Ok((hex(vid)?, Some(hex(pid)?))),
        None => Ok((hex(s)?, None)),
    }
}

fn connection(target: TargetArgs, baud: u32, usb_serial: Option<String>) -> Connection {
    if let Some(path) = target.serial {
        Connection::Serial { path, baud }
    } else if let Some((vid, pid)) = target.usb {
        let mut filter = UsbFilter::new(vid);
        if let Some(pid) = pid {
            filter = filter.product_id(pid);
        }
        if let Some(serial) = usb_serial {
            filter = filter.serial(serial);
        }
        Connection::Usb(filter)
    } else {
        Connection::Relay {
            url: target.relay.unwrap_or_default(),
        }
    }
}

fn run(cli: Cli) -> Result<(), Error> {
    match cli.command {
        Commands::Print {
            image,
            raster,
            target,
            baud,
            usb_serial,
        } => {
            let handle = connection(target, baud, usb_serial).open()?;
            let mut source = ImageCapture::open(&image)?;
            thermal_raster::print(&mut source, &raster.config(), handle)?;
            println!("printed {}", image.display());
        }
        Commands::Render {
            image,
            raster,
            out,
            preview,
        } => {
            let config = raster.config();
            config.validate()?;
            let pixels = ImageCapture::open(&image)?.capture()?;
            let resized = resize(&pixels, config.dot_width())?;
            let bits = dither(to_grayscale(&resized));
            if let Some(preview) = preview {
                bits.to_image().save(&preview).map_err(|e| {
                    Error::InvalidInput(format!("failed to write {}: {}", preview.display(), e))
                })?;
            }
            let command = thermal_raster::frame(pack(&bits), config.mode_byte())?;
            fs::write(&out, command.as_bytes()).map_err(|e| {
                Error::InvalidInput(format!("failed to write {}: {}", out.display(), e))
            })?;
            println!(
                "wrote {} bytes ({} rows) to {}",
                command.len(),
                bits.height(),
                out.display()
            );
        }
        Commands::Probe => {
            let caps = available();
            println!("serial: {}", caps.serial);
            println!("usb:    {}", caps.usb);
            println!("relay:  {}", caps.relay);
        }
        Commands::Devices => {
            for (vid, pid, endpoint) in usb::list_devices()? {
                match endpoint {
                    Ok(ep) => println!(
                        "{:04x}:{:04x}  interface {} setting {} endpoint {:#04x}",
                        vid, pid, ep.iface, ep.setting, ep.address
                    ),
                    Err(err) => println!("{:04x}:{:04x}  {}", vid, pid, err),
                }
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_default_env()
        .format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "[{}:{}] {} - {}",
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.level(),
                record.args()
            )
        })
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{:?}", err);
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}
