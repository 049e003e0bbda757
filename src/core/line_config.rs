//! Line configuration decoding
//!
//! A line configuration is written as a compact token: baud rate digits,
//! one parity character, one data-bit digit, one stop-bit digit and an
//! optional flow-control character, e.g. `9600n81h`.

use std::fmt;
use std::str::FromStr;

use nix::sys::termios::BaudRate;

use super::BridgeError;

/// Field of the configuration token that failed to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigField {
    /// The leading baud rate digits.
    Baud,
    /// The parity character.
    Parity,
    /// The data-bit digit.
    DataBits,
    /// The stop-bit digit.
    StopBits,
}

impl fmt::Display for ConfigField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Baud => write!(f, "baud rate"),
            Self::Parity => write!(f, "parity"),
            Self::DataBits => write!(f, "data bit count"),
            Self::StopBits => write!(f, "stop bit count"),
        }
    }
}

macro_rules! baud_rates {
    ($($rate:literal => $variant:ident),+ $(,)?) => {
        /// Supported baud rates.
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum Baud {
            $(
                #[doc = concat!(stringify!($rate), " baud")]
                $variant,
            )+
        }

        impl Baud {
            /// Map a numeric rate onto a supported baud rate, if any.
            pub fn from_rate(rate: u32) -> Option<Self> {
                match rate {
                    $($rate => Some(Self::$variant),)+
                    _ => None,
                }
            }

            /// Numeric rate in bits per second.
            pub fn rate(self) -> u32 {
                match self {
                    $(Self::$variant => $rate,)+
                }
            }

            /// Corresponding termios speed constant.
            pub(crate) fn speed(self) -> BaudRate {
                match self {
                    $(Self::$variant => BaudRate::$variant,)+
                }
            }
        }
    };
}

baud_rates! {
    50 => B50,
    75 => B75,
    110 => B110,
    134 => B134,
    150 => B150,
    200 => B200,
    300 => B300,
    600 => B600,
    1200 => B1200,
    1800 => B1800,
    2400 => B2400,
    4800 => B4800,
    9600 => B9600,
    19200 => B19200,
    38400 => B38400,
    57600 => B57600,
    115200 => B115200,
    230400 => B230400,
}

/// Parity bit setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Parity {
    /// No parity bit.
    #[default]
    None,
    /// Even parity.
    Even,
    /// Odd parity.
    Odd,
}

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataBits {
    /// 5 data bits.
    Five,
    /// 6 data bits.
    Six,
    /// 7 data bits.
    Seven,
    /// 8 data bits.
    Eight,
}

impl DataBits {
    /// Bit count as a number.
    pub fn bits(self) -> u8 {
        match self {
            Self::Five => 5,
            Self::Six => 6,
            Self::Seven => 7,
            Self::Eight => 8,
        }
    }
}

/// Number of stop bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopBits {
    /// One stop bit.
    One,
    /// Two stop bits.
    Two,
}

/// Flow control mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlowControl {
    /// No flow control.
    #[default]
    None,
    /// Hardware flow control (RTS/CTS).
    Hardware,
    /// Software flow control (XON/XOFF).
    Software,
}

/// Decoded serial line configuration.
///
/// Decoding is all-or-nothing: a token that fails at any field yields
/// [`BridgeError::InvalidConfig`] naming that field, never a partially
/// populated configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineConfig {
    /// Baud rate.
    pub baud: Baud,
    /// Parity.
    pub parity: Parity,
    /// Data bits per character.
    pub data_bits: DataBits,
    /// Stop bits.
    pub stop_bits: StopBits,
    /// Flow control.
    pub flow_control: FlowControl,
}

// Baud digits are capped at 7 characters; anything longer spills into the
// parity position.
const MAX_BAUD_DIGITS: usize = 7;

impl FromStr for LineConfig {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();

        let mut pos = 0;
        while pos < bytes.len() && pos < MAX_BAUD_DIGITS && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
        // A token that is nothing but digits never reaches the parity field.
        if pos == 0 || pos == bytes.len() {
            return Err(BridgeError::InvalidConfig(ConfigField::Baud));
        }
        let rate: u32 = s[..pos]
            .parse()
            .map_err(|_| BridgeError::InvalidConfig(ConfigField::Baud))?;
        let baud = Baud::from_rate(rate).ok_or(BridgeError::InvalidConfig(ConfigField::Baud))?;

        let parity = match bytes[pos] {
            b'n' => Parity::None,
            b'e' => Parity::Even,
            b'o' => Parity::Odd,
            _ => return Err(BridgeError::InvalidConfig(ConfigField::Parity)),
        };
        pos += 1;

        let data_bits = match bytes.get(pos) {
            Some(b'5') => DataBits::Five,
            Some(b'6') => DataBits::Six,
            Some(b'7') => DataBits::Seven,
            Some(b'8') => DataBits::Eight,
            _ => return Err(BridgeError::InvalidConfig(ConfigField::DataBits)),
        };
        pos += 1;

        let stop_bits = match bytes.get(pos) {
            Some(b'1') => StopBits::One,
            Some(b'2') => StopBits::Two,
            _ => return Err(BridgeError::InvalidConfig(ConfigField::StopBits)),
        };
        pos += 1;

        // Any trailing character other than 'h' or 's' means no flow
        // control, without error. Matches the historical behavior.
        let flow_control = match bytes.get(pos) {
            Some(b'h') => FlowControl::Hardware,
            Some(b's') => FlowControl::Software,
            _ => FlowControl::None,
        };

        Ok(Self {
            baud,
            parity,
            data_bits,
            stop_bits,
            flow_control,
        })
    }
}

impl fmt::Display for LineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} baud {}{}{} ({})",
            self.baud.rate(),
            self.data_bits.bits(),
            match self.parity {
                Parity::None => 'N',
                Parity::Even => 'E',
                Parity::Odd => 'O',
            },
            match self.stop_bits {
                StopBits::One => '1',
                StopBits::Two => '2',
            },
            match self.flow_control {
                FlowControl::None => "no flow control",
                FlowControl::Hardware => "hardware flow control",
                FlowControl::Software => "software flow control",
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(err: BridgeError) -> ConfigField {
        match err {
            BridgeError::InvalidConfig(field) => field,
            other => panic!("expected InvalidConfig, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_plain_token() {
        let config: LineConfig = "9600n81".parse().unwrap();
        assert_eq!(config.baud, Baud::B9600);
        assert_eq!(config.parity, Parity::None);
        assert_eq!(config.data_bits, DataBits::Eight);
        assert_eq!(config.stop_bits, StopBits::One);
        assert_eq!(config.flow_control, FlowControl::None);
    }

    #[test]
    fn test_decode_flow_control() {
        let hw: LineConfig = "115200e72h".parse().unwrap();
        assert_eq!(hw.baud, Baud::B115200);
        assert_eq!(hw.parity, Parity::Even);
        assert_eq!(hw.data_bits, DataBits::Seven);
        assert_eq!(hw.stop_bits, StopBits::Two);
        assert_eq!(hw.flow_control, FlowControl::Hardware);

        let sw: LineConfig = "300o52s".parse().unwrap();
        assert_eq!(sw.flow_control, FlowControl::Software);
    }

    #[test]
    fn test_unknown_flow_character_means_none() {
        let config: LineConfig = "9600n81x".parse().unwrap();
        assert_eq!(config.flow_control, FlowControl::None);
    }

    #[test]
    fn test_unsupported_baud_rejected() {
        let err = "12345n81".parse::<LineConfig>().unwrap_err();
        assert_eq!(field_of(err), ConfigField::Baud);
    }

    #[test]
    fn test_digits_only_token_fails_at_baud() {
        let err = "9600".parse::<LineConfig>().unwrap_err();
        assert_eq!(field_of(err), ConfigField::Baud);
    }

    #[test]
    fn test_empty_token_fails_at_baud() {
        let err = "".parse::<LineConfig>().unwrap_err();
        assert_eq!(field_of(err), ConfigField::Baud);
    }

    #[test]
    fn test_bad_parity_character() {
        let err = "300x81".parse::<LineConfig>().unwrap_err();
        assert_eq!(field_of(err), ConfigField::Parity);
    }

    #[test]
    fn test_bad_data_bit_digit() {
        let err = "9600n91".parse::<LineConfig>().unwrap_err();
        assert_eq!(field_of(err), ConfigField::DataBits);
    }

    #[test]
    fn test_missing_stop_bits() {
        let err = "115200e7".parse::<LineConfig>().unwrap_err();
        assert_eq!(field_of(err), ConfigField::StopBits);
    }

    #[test]
    fn test_bad_stop_bit_digit() {
        let err = "9600n83".parse::<LineConfig>().unwrap_err();
        assert_eq!(field_of(err), ConfigField::StopBits);
    }

    #[test]
    fn test_all_supported_rates_decode() {
        for rate in [
            50u32, 75, 110, 134, 150, 200, 300, 600, 1200, 1800, 2400, 4800, 9600, 19200, 38400,
            57600, 115200, 230400,
        ] {
            let token = format!("{rate}n81");
            let config: LineConfig = token.parse().unwrap();
            assert_eq!(config.baud.rate(), rate);
        }
    }

    #[test]
    fn test_display_summary() {
        let config: LineConfig = "9600n81h".parse().unwrap();
        assert_eq!(config.to_string(), "9600 baud 8N1 (hardware flow control)");
    }
}
