//! Per-field text formatters for register dumps.

use core::fmt::{self, Write};

use super::decode_signed;

/// Renders a field value into `out`.
pub type FieldFormatter = fn(&mut dyn Write, u32) -> fmt::Result;

macro_rules! flag {
    ($label:literal) => {
        (|out: &mut dyn Write, v: u32| -> fmt::Result {
            if v != 0 {
                write!(out, concat!("1(", $label, ")"))
            } else {
                Ok(())
            }
        }) as FieldFormatter
    };
}

fn hex(out: &mut dyn Write, v: u32) -> fmt::Result {
    write!(out, "{:#x}", v)
}

fn microstep_resolution(out: &mut dyn Write, v: u32) -> fmt::Result {
    write!(out, "{}({}usteps)", v, 0x100u32.checked_shr(v).unwrap_or(0))
}

fn signed9(out: &mut dyn Write, v: u32) -> fmt::Result {
    write!(out, "{}", decode_signed(v, 9))
}

fn signed7(out: &mut dyn Write, v: u32) -> fmt::Result {
    write!(out, "{}", decode_signed(v, 7))
}

fn current_scale(out: &mut dyn Write, v: u32) -> fmt::Result {
    if v == 0 {
        write!(out, "0(Reset?)")
    } else {
        write!(out, "{}", v)
    }
}

/// Formatters for TMC2130 fields that need more than a decimal value.
pub static TMC2130_FORMATTERS: &[(&str, FieldFormatter)] = &[
    ("I_scale_analog", flag!("ExtVREF")),
    ("shaft", flag!("Reverse")),
    ("reset", flag!("Reset")),
    ("drv_err", flag!("ErrorShutdown!")),
    ("uv_cp", flag!("Undervoltage!")),
    ("VERSION", hex),
    ("MRES", microstep_resolution),
    ("dedge", flag!("EdgeStep")),
    ("coil_A", signed9),
    ("coil_B", signed9),
    ("CUR_A", signed9),
    ("CUR_B", signed9),
    ("sgt", signed7),
    ("CS_ACTUAL", current_scale),
    ("ot", flag!("OvertempError!")),
    ("otpw", flag!("OvertempWarning!")),
    ("s2ga", flag!("ShortToGND_A!")),
    ("s2gb", flag!("ShortToGND_B!")),
    ("ola", flag!("OpenLoad_A!")),
    ("olb", flag!("OpenLoad_B!")),
];

#[cfg(test)]
mod tests {
    use super::*;
    use heapless::String;

    fn render(name: &str, v: u32) -> String<32> {
        let mut out = String::new();
        let (_, f) = TMC2130_FORMATTERS.iter().find(|(n, _)| *n == name).unwrap();
        f(&mut out, v).unwrap();
        out
    }

    #[test]
    fn test_flag_formatter() {
        assert_eq!(render("ot", 1).as_str(), "1(OvertempError!)");
        assert_eq!(render("ot", 0).as_str(), "");
    }

    #[test]
    fn test_signed_formatters() {
        assert_eq!(render("CUR_A", 0x1ff).as_str(), "-1");
        assert_eq!(render("sgt", 0x40).as_str(), "-64");
        assert_eq!(render("sgt", 5).as_str(), "5");
    }

    #[test]
    fn test_value_formatters() {
        assert_eq!(render("VERSION", 0x11).as_str(), "0x11");
        assert_eq!(render("MRES", 8).as_str(), "8(1usteps)");
        assert_eq!(render("CS_ACTUAL", 0).as_str(), "0(Reset?)");
        assert_eq!(render("CS_ACTUAL", 17).as_str(), "17");
    }
}
