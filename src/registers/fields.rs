//! Static field table and its validated lookup view.

use crate::error::{error_name, ConfigError};

use super::Register;

/// A named bit range within a register word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    /// Field name, unique across all registers.
    pub name: &'static str,
    /// Contiguous bit mask within the 32-bit word.
    pub mask: u32,
}

/// Fields belonging to one register.
#[derive(Debug, Clone, Copy)]
pub struct RegisterFields {
    /// Owning register.
    pub register: Register,
    /// Fields of the register, in any order.
    pub fields: &'static [FieldDef],
}

const fn field(name: &'static str, mask: u32) -> FieldDef {
    FieldDef { name, mask }
}

/// TMC2130 field masks.
pub static TMC2130_FIELDS: &[RegisterFields] = &[
    RegisterFields {
        register: Register::GCONF,
        fields: &[
            field("I_scale_analog", 1 << 0),
            field("internal_Rsense", 1 << 1),
            field("en_pwm_mode", 1 << 2),
            field("enc_commutation", 1 << 3),
            field("shaft", 1 << 4),
            field("diag0_error", 1 << 5),
            field("diag0_otpw", 1 << 6),
            field("diag0_stall", 1 << 7),
            field("diag1_stall", 1 << 8),
            field("diag1_index", 1 << 9),
            field("diag1_onstate", 1 << 10),
            field("diag1_steps_skipped", 1 << 11),
            field("diag0_int_pushpull", 1 << 12),
            field("diag1_pushpull", 1 << 13),
            field("small_hysteresis", 1 << 14),
            field("stop_enable", 1 << 15),
            field("direct_mode", 1 << 16),
            field("test_mode", 1 << 17),
        ],
    },
    RegisterFields {
        register: Register::GSTAT,
        fields: &[
            field("reset", 1 << 0),
            field("drv_err", 1 << 1),
            field("uv_cp", 1 << 2),
        ],
    },
    RegisterFields {
        register: Register::IOIN,
        fields: &[
            field("STEP", 1 << 0),
            field("DIR", 1 << 1),
            field("DCEN_CFG4", 1 << 2),
            field("DCIN_CFG5", 1 << 3),
            field("DRV_ENN_CFG6", 1 << 4),
            field("DCO", 1 << 5),
            field("VERSION", 0xff << 24),
        ],
    },
    RegisterFields {
        register: Register::IHOLD_IRUN,
        fields: &[
            field("IHOLD", 0x1f),
            field("IRUN", 0x1f << 8),
            field("IHOLDDELAY", 0x0f << 16),
        ],
    },
    RegisterFields {
        register: Register::TPOWERDOWN,
        fields: &[field("TPOWERDOWN", 0xff)],
    },
    RegisterFields {
        register: Register::TSTEP,
        fields: &[field("TSTEP", 0xfffff)],
    },
    RegisterFields {
        register: Register::TPWMTHRS,
        fields: &[field("TPWMTHRS", 0xfffff)],
    },
    RegisterFields {
        register: Register::TCOOLTHRS,
        fields: &[field("TCOOLTHRS", 0xfffff)],
    },
    RegisterFields {
        register: Register::THIGH,
        fields: &[field("THIGH", 0xfffff)],
    },
    RegisterFields {
        register: Register::XDIRECT,
        fields: &[field("coil_A", 0x1ff), field("coil_B", 0x1ff << 16)],
    },
    RegisterFields {
        register: Register::VDCMIN,
        fields: &[field("VDCMIN", 0x7fffff)],
    },
    RegisterFields {
        register: Register::MSCNT,
        fields: &[field("MSCNT", 0x3ff)],
    },
    RegisterFields {
        register: Register::MSCURACT,
        fields: &[field("CUR_A", 0x1ff), field("CUR_B", 0x1ff << 16)],
    },
    RegisterFields {
        register: Register::CHOPCONF,
        fields: &[
            field("toff", 0x0f),
            field("hstrt", 0x07 << 4),
            field("hend", 0x0f << 7),
            field("fd3", 1 << 11),
            field("disfdcc", 1 << 12),
            field("rndtf", 1 << 13),
            field("chm", 1 << 14),
            field("TBL", 0x03 << 15),
            field("vsense", 1 << 17),
            field("vhighfs", 1 << 18),
            field("vhighchm", 1 << 19),
            field("sync", 0x0f << 20),
            field("MRES", 0x0f << 24),
            field("intpol", 1 << 28),
            field("dedge", 1 << 29),
            field("diss2g", 1 << 30),
        ],
    },
    RegisterFields {
        register: Register::COOLCONF,
        fields: &[
            field("semin", 0x0f),
            field("seup", 0x03 << 5),
            field("semax", 0x0f << 8),
            field("sedn", 0x03 << 13),
            field("seimin", 1 << 15),
            field("sgt", 0x7f << 16),
            field("sfilt", 1 << 24),
        ],
    },
    RegisterFields {
        register: Register::DCCTRL,
        fields: &[field("DC_TIME", 0x3ff), field("DC_SG", 0xff << 16)],
    },
    RegisterFields {
        register: Register::DRV_STATUS,
        fields: &[
            field("SG_RESULT", 0x3ff),
            field("fsactive", 1 << 15),
            field("CS_ACTUAL", 0x1f << 16),
            field("stallGuard", 1 << 24),
            field("ot", 1 << 25),
            field("otpw", 1 << 26),
            field("s2ga", 1 << 27),
            field("s2gb", 1 << 28),
            field("ola", 1 << 29),
            field("olb", 1 << 30),
            field("stst", 1 << 31),
        ],
    },
    RegisterFields {
        register: Register::PWMCONF,
        fields: &[
            field("PWM_AMPL", 0xff),
            field("PWM_GRAD", 0xff << 8),
            field("pwm_freq", 0x03 << 16),
            field("pwm_autoscale", 1 << 18),
            field("pwm_symmetric", 1 << 19),
            field("freewheel", 0x03 << 20),
        ],
    },
    RegisterFields {
        register: Register::PWM_SCALE,
        fields: &[field("PWM_SCALE", 0xff)],
    },
    RegisterFields {
        register: Register::ENCM_CTRL,
        fields: &[field("inv", 1 << 0), field("maxspeed", 1 << 1)],
    },
    RegisterFields {
        register: Register::LOST_STEPS,
        fields: &[field("LOST_STEPS", 0xfffff)],
    },
];

/// Validated view over a static register/field table.
///
/// Construction rejects empty or non-contiguous masks, overlapping fields
/// within one register, and field names used more than once, so every
/// lookup afterwards resolves to exactly one register and a non-zero mask.
#[derive(Debug, Clone, Copy)]
pub struct FieldTable {
    registers: &'static [RegisterFields],
}

impl FieldTable {
    /// Validate `registers` and build a table over it.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` describing the first defect found.
    pub fn new(registers: &'static [RegisterFields]) -> Result<Self, ConfigError> {
        for (ri, entry) in registers.iter().enumerate() {
            let register = entry.register.name();
            if registers[..ri].iter().any(|r| r.register == entry.register) {
                return Err(ConfigError::DuplicateRegister(register));
            }
            for (fi, def) in entry.fields.iter().enumerate() {
                if def.mask == 0 {
                    return Err(ConfigError::EmptyMask { register, field: def.name });
                }
                let run = def.mask >> first_set_bit(def.mask);
                if run & run.wrapping_add(1) != 0 {
                    return Err(ConfigError::NonContiguousMask { register, field: def.name });
                }
                if let Some(other) = entry.fields[..fi].iter().find(|o| o.mask & def.mask != 0) {
                    return Err(ConfigError::OverlappingFields {
                        register,
                        first: other.name,
                        second: def.name,
                    });
                }
                let seen_before = registers[..ri]
                    .iter()
                    .flat_map(|r| r.fields.iter())
                    .chain(entry.fields[..fi].iter())
                    .any(|o| o.name == def.name);
                if seen_before {
                    return Err(ConfigError::AmbiguousField(def.name));
                }
            }
        }
        Ok(Self { registers })
    }

    /// Table over the built-in TMC2130 field masks.
    pub fn tmc2130() -> Result<Self, ConfigError> {
        Self::new(TMC2130_FIELDS)
    }

    /// Register that owns `field`.
    pub fn owning_register(&self, field: &str) -> Result<Register, ConfigError> {
        self.lookup(field).map(|(register, _)| register)
    }

    /// Mask of `field` within `register`.
    pub fn mask_of(&self, register: Register, field: &str) -> Result<u32, ConfigError> {
        self.fields_of(register)
            .iter()
            .find(|def| def.name == field)
            .map(|def| def.mask)
            .ok_or_else(|| ConfigError::UnknownField(error_name(field)))
    }

    /// Owning register and mask of `field`.
    pub fn lookup(&self, field: &str) -> Result<(Register, u32), ConfigError> {
        self.registers
            .iter()
            .find_map(|entry| {
                entry
                    .fields
                    .iter()
                    .find(|def| def.name == field)
                    .map(|def| (entry.register, def.mask))
            })
            .ok_or_else(|| ConfigError::UnknownField(error_name(field)))
    }

    /// All fields of `register` (empty if the register has none).
    pub fn fields_of(&self, register: Register) -> &'static [FieldDef] {
        self.registers
            .iter()
            .find(|entry| entry.register == register)
            .map(|entry| entry.fields)
            .unwrap_or(&[])
    }

    /// Iterate over every register entry of the table.
    pub fn registers(&self) -> impl Iterator<Item = &'static RegisterFields> {
        self.registers.iter()
    }
}

/// Index of the lowest set bit of `mask`.
///
/// Only meaningful for non-zero masks, which `FieldTable::new` guarantees.
#[inline]
pub(crate) const fn first_set_bit(mask: u32) -> u32 {
    mask.trailing_zeros()
}

/// Largest value a field with `mask` can hold.
#[inline]
pub(crate) const fn field_max(mask: u32) -> u32 {
    mask >> first_set_bit(mask)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table_is_valid() {
        let table = FieldTable::tmc2130().unwrap();
        assert_eq!(table.owning_register("sgt").unwrap(), Register::COOLCONF);
        assert_eq!(table.owning_register("MRES").unwrap(), Register::CHOPCONF);
        assert_eq!(table.mask_of(Register::IHOLD_IRUN, "IRUN").unwrap(), 0x1f << 8);
        assert!(table.fields_of(Register::TSTEP).len() == 1);
    }

    #[test]
    fn test_unknown_field() {
        let table = FieldTable::tmc2130().unwrap();
        assert_eq!(
            table.owning_register("bogus"),
            Err(ConfigError::UnknownField(error_name("bogus")))
        );
        assert!(table.mask_of(Register::GCONF, "IRUN").is_err());
    }

    #[test]
    fn test_rejects_empty_mask() {
        static BAD: &[RegisterFields] = &[RegisterFields {
            register: Register::GCONF,
            fields: &[field("nothing", 0)],
        }];
        assert_eq!(
            FieldTable::new(BAD).unwrap_err(),
            ConfigError::EmptyMask { register: "GCONF", field: "nothing" }
        );
    }

    #[test]
    fn test_rejects_non_contiguous_mask() {
        static BAD: &[RegisterFields] = &[RegisterFields {
            register: Register::GCONF,
            fields: &[field("split", 0b1011)],
        }];
        assert!(matches!(
            FieldTable::new(BAD),
            Err(ConfigError::NonContiguousMask { .. })
        ));
    }

    #[test]
    fn test_rejects_overlap_within_register() {
        static BAD: &[RegisterFields] = &[RegisterFields {
            register: Register::CHOPCONF,
            fields: &[field("a", 0x0f), field("b", 0x18)],
        }];
        assert_eq!(
            FieldTable::new(BAD).unwrap_err(),
            ConfigError::OverlappingFields { register: "CHOPCONF", first: "a", second: "b" }
        );
    }

    #[test]
    fn test_rejects_register_listed_twice() {
        static BAD: &[RegisterFields] = &[
            RegisterFields {
                register: Register::GCONF,
                fields: &[field("a", 0x0f)],
            },
            RegisterFields {
                register: Register::GCONF,
                fields: &[field("b", 0x18)],
            },
        ];
        assert_eq!(FieldTable::new(BAD).unwrap_err(), ConfigError::DuplicateRegister("GCONF"));
    }

    #[test]
    fn test_rejects_name_in_two_registers() {
        static BAD: &[RegisterFields] = &[
            RegisterFields {
                register: Register::GCONF,
                fields: &[field("shared", 1)],
            },
            RegisterFields {
                register: Register::GSTAT,
                fields: &[field("shared", 2)],
            },
        ];
        assert_eq!(FieldTable::new(BAD).unwrap_err(), ConfigError::AmbiguousField("shared"));
    }

    #[test]
    fn test_full_width_mask_is_contiguous() {
        static WIDE: &[RegisterFields] = &[RegisterFields {
            register: Register::XDIRECT,
            fields: &[field("all", u32::MAX)],
        }];
        assert!(FieldTable::new(WIDE).is_ok());
        assert_eq!(field_max(u32::MAX), u32::MAX);
    }
}
