use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use clap::{CommandFactory, Parser, ValueEnum};

use crate::{
    display::hd44780::{DEFAULT_I2C_ADDRESS, DEFAULT_I2C_BUS},
    sensor::{
        cpu::DEFAULT_THERMAL_ZONE,
        device::{DEFAULT_SMARTCTL, DEFAULT_SMART_ATTRIBUTE_INDEX},
        MONITORED_DEVICES,
    },
};

pub const DEFAULT_MOUNT: &str = "/";
pub const DEFAULT_DEVICES: [&str; MONITORED_DEVICES] = ["/dev/sda", "/dev/sdb"];
/// Seconds between two cycles.
pub const DEFAULT_INTERVAL_SECS: u64 = 5;

#[derive(ValueEnum, PartialEq, Eq, Debug, Clone, Copy)]
pub enum DisplayBackend {
    /// HD44780 LCD behind a PCF8574 I2C backpack
    Hd44780,
    /// Log every cell write instead of driving hardware
    Log,
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Shows filesystem usage and temperatures on a 16x2 character LCD",
    long_about = None
)]
struct Args {
    /// Mount point whose usage is shown on the first line
    #[arg(long, value_name = "PATH", env = "LCD_STATUS_MOUNT", default_value = DEFAULT_MOUNT)]
    mount: PathBuf,

    /// The two storage devices whose temperatures are shown, in display order
    #[arg(
        long = "device",
        value_name = "PATH",
        env = "LCD_STATUS_DEVICES",
        value_delimiter = ',',
        default_values = DEFAULT_DEVICES
    )]
    devices: Vec<PathBuf>,

    /// Seconds between two display updates
    #[arg(
        long,
        value_name = "SECONDS",
        env = "LCD_STATUS_INTERVAL",
        default_value_t = DEFAULT_INTERVAL_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    interval_secs: u64,

    /// Seconds a device temperature is reused before smartctl runs again, 0 reads every cycle
    #[arg(long, value_name = "SECONDS", default_value_t = 0)]
    device_refresh_secs: u64,

    /// Sysfs file with the CPU temperature in millidegrees Celsius
    #[arg(long, value_name = "PATH", default_value = DEFAULT_THERMAL_ZONE)]
    thermal_zone: PathBuf,

    /// smartctl executable used to read device temperatures
    #[arg(long, value_name = "PATH", default_value = DEFAULT_SMARTCTL)]
    smartctl: PathBuf,

    /// Index in the smartctl ATA attribute table holding the temperature
    #[arg(long, value_name = "INDEX", default_value_t = DEFAULT_SMART_ATTRIBUTE_INDEX)]
    smart_attribute_index: usize,

    /// Display backend
    #[arg(long, value_enum, default_value = "hd44780")]
    display: DisplayBackend,

    /// I2C bus device of the LCD backpack
    #[arg(long, value_name = "PATH", default_value = DEFAULT_I2C_BUS)]
    i2c_bus: PathBuf,

    /// 7-bit I2C address of the LCD backpack, decimal or 0x-prefixed hex
    #[arg(long, value_name = "ADDRESS", default_value = "0x27", value_parser = parse_i2c_address)]
    i2c_address: u8,

    /// Turn all log categories up to Debug, for more information check RUST_LOG env variable.
    #[arg(short, long)]
    verbose: bool,

    /// Directory for daily rotated log files, console only when unset
    #[arg(long, value_name = "PATH")]
    log_path: Option<PathBuf>,
}

/// Everything the agent needs at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub mount: PathBuf,
    pub devices: [PathBuf; MONITORED_DEVICES],
    pub interval: Duration,
    pub device_refresh: Duration,
    pub thermal_zone: PathBuf,
    pub smartctl: PathBuf,
    pub smart_attribute_index: usize,
    pub display: DisplayBackend,
    pub i2c_bus: PathBuf,
    pub i2c_address: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mount: DEFAULT_MOUNT.into(),
            devices: DEFAULT_DEVICES.map(PathBuf::from),
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            device_refresh: Duration::ZERO,
            thermal_zone: DEFAULT_THERMAL_ZONE.into(),
            smartctl: DEFAULT_SMARTCTL.into(),
            smart_attribute_index: DEFAULT_SMART_ATTRIBUTE_INDEX,
            display: DisplayBackend::Hd44780,
            i2c_bus: DEFAULT_I2C_BUS.into(),
            i2c_address: DEFAULT_I2C_ADDRESS,
        }
    }
}

impl Config {
    fn from_args(args: &Args) -> Result<Self, String> {
        let devices: [PathBuf; MONITORED_DEVICES] =
            args.devices.clone().try_into().map_err(|devices: Vec<PathBuf>| {
                format!(
                    "exactly {MONITORED_DEVICES} devices are required, got {}: {devices:?}",
                    devices.len()
                )
            })?;

        Ok(Self {
            mount: args.mount.clone(),
            devices,
            interval: Duration::from_secs(args.interval_secs),
            device_refresh: Duration::from_secs(args.device_refresh_secs),
            thermal_zone: args.thermal_zone.clone(),
            smartctl: args.smartctl.clone(),
            smart_attribute_index: args.smart_attribute_index,
            display: args.display,
            i2c_bus: args.i2c_bus.clone(),
            i2c_address: args.i2c_address,
        })
    }
}

#[derive(Debug)]
struct Manager {
    clap_matches: Args,
}

lazy_static! {
    static ref MANAGER: Arc<Manager> = Arc::new(Manager::new());
}

impl Manager {
    fn new() -> Self {
        Self {
            clap_matches: Args::parse(),
        }
    }
}

// Construct our manager, should be done inside main
pub fn init() {
    MANAGER.as_ref();
}

// Check if the verbosity parameter was used
pub fn is_verbose() -> bool {
    MANAGER.clap_matches.verbose
}

pub fn log_path() -> Option<&'static Path> {
    MANAGER.clap_matches.log_path.as_deref()
}

// Return the command line used to start this application
pub fn command_line_string() -> String {
    std::env::args().collect::<Vec<String>>().join(" ")
}

// Return the parsed command line as a debug string
pub fn command_line() -> String {
    format!("{:?}", MANAGER.clap_matches)
}

/// The startup configuration. Exits with a usage error when the arguments
/// are inconsistent, like clap does for malformed ones.
pub fn config() -> Config {
    Config::from_args(&MANAGER.clap_matches).unwrap_or_else(|message| {
        Args::command()
            .error(clap::error::ErrorKind::WrongNumberOfValues, message)
            .exit()
    })
}

fn parse_i2c_address(value: &str) -> Result<u8, String> {
    let parsed = match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => value.parse::<u8>(),
    };
    let address = parsed.map_err(|error| format!("invalid I2C address {value:?}: {error}"))?;

    if address > 0x7F {
        return Err(format!("I2C address {value} does not fit in 7 bits"));
    }
    Ok(address)
}
