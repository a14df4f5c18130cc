use lcdbang_gpio::lcd::hd44780::driver::{DotSize, InterfaceWidth};
use serde::{Deserialize, Serialize};
use std::env::var_os;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value {value:?} for {name}")]
    Invalid { name: &'static str, value: String },
    #[error("expected 4 or 8 data pins, got {0}")]
    DataPinCount(usize),
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse config file: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum Font {
    #[default]
    #[serde(rename = "5x8")]
    Dots5x8,
    #[serde(rename = "5x10")]
    Dots5x10,
}

impl From<Font> for DotSize {
    fn from(font: Font) -> Self {
        match font {
            Font::Dots5x8 => DotSize::Dots5x8,
            Font::Dots5x10 => DotSize::Dots5x10,
        }
    }
}

/// Wiring and geometry of the display under test.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_gpio_chip")]
    pub gpio_chip: String,
    pub pin_rs: usize,
    pub pin_e: usize,
    #[serde(default)]
    pub pin_rw: Option<usize>,
    /// D0.. in bus order. Four pins select the 4-bit interface and go to D4..D7 of the display.
    pub pins_data: Vec<usize>,
    #[serde(default = "default_columns")]
    pub columns: u8,
    #[serde(default = "default_lines")]
    pub lines: u8,
    #[serde(default)]
    pub font: Font,
}

fn default_gpio_chip() -> String {
    "/dev/gpiochip0".to_string()
}

fn default_columns() -> u8 {
    16
}

fn default_lines() -> u8 {
    2
}

impl Config {
    /// Loads the JSON file named by `LCD_CONFIG_FILE` if set, otherwise reads the `LCD_*`
    /// environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let config = match var_os("LCD_CONFIG_FILE") {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::from_env(|name| std::env::var(name).ok())?,
        };
        config.interface_width()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Builds the config from variables looked up through `var`.
    pub fn from_env(var: impl Fn(&'static str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &'static str| var(name).ok_or(ConfigError::Missing(name));

        Ok(Config {
            gpio_chip: var("LCD_GPIO_CHIP").unwrap_or_else(default_gpio_chip),
            pin_rs: parse("LCD_PIN_RS", &required("LCD_PIN_RS")?)?,
            pin_e: parse("LCD_PIN_E", &required("LCD_PIN_E")?)?,
            pin_rw: var("LCD_PIN_RW")
                .map(|value| parse("LCD_PIN_RW", &value))
                .transpose()?,
            pins_data: parse_pin_bus("LCD_PINS_DATA", &required("LCD_PINS_DATA")?)?,
            columns: var("LCD_COLUMNS")
                .map(|value| parse("LCD_COLUMNS", &value))
                .transpose()?
                .unwrap_or_else(default_columns),
            lines: var("LCD_LINES")
                .map(|value| parse("LCD_LINES", &value))
                .transpose()?
                .unwrap_or_else(default_lines),
            font: match var("LCD_FONT").as_deref() {
                None | Some("5x8") => Font::Dots5x8,
                Some("5x10") => Font::Dots5x10,
                Some(other) => {
                    return Err(ConfigError::Invalid {
                        name: "LCD_FONT",
                        value: other.to_string(),
                    });
                }
            },
        })
    }

    pub fn interface_width(&self) -> Result<InterfaceWidth, ConfigError> {
        match self.pins_data.len() {
            4 => Ok(InterfaceWidth::FourBit),
            8 => Ok(InterfaceWidth::EightBit),
            n => Err(ConfigError::DataPinCount(n)),
        }
    }
}

fn parse<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        value: value.to_string(),
    })
}

fn parse_pin_bus(name: &'static str, pin_str: &str) -> Result<Vec<usize>, ConfigError> {
    pin_str
        .split([',', ' ', ';'])
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| parse(name, s))
        .collect()
}
