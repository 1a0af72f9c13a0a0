//! Register field codec.
//!
//! Packs named fields into cached 32-bit register words and renders
//! register words as human-readable text. No transport I/O happens here.

mod format;

pub use format::{FieldFormatter, TMC2130_FORMATTERS};

use core::fmt::Write;

use heapless::{FnvIndexMap, String, Vec};

use crate::config::ConfigSource;
use crate::error::Result;
use crate::registers::{FieldTable, Register};
use crate::registers::fields::{field_max, first_set_bit};

/// A formatted register line, as produced by [`RegisterFieldCodec::pretty_format`].
pub type DumpLine = String<512>;

/// Last known word of every register touched so far.
///
/// Registers never read or written report 0. That default does not
/// reflect the hardware; a field update on such a register starts from
/// zero rather than from the chip's actual contents.
#[derive(Debug, Clone, Default)]
pub struct RegisterCache {
    words: FnvIndexMap<Register, u32, 32>,
}

impl RegisterCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached word of `register`, or 0 if never stored.
    #[inline]
    pub fn get(&self, register: Register) -> u32 {
        self.words.get(&register).copied().unwrap_or(0)
    }

    /// Whether `register` has been stored at least once.
    #[inline]
    pub fn contains(&self, register: Register) -> bool {
        self.words.contains_key(&register)
    }

    pub(crate) fn store(&mut self, register: Register, word: u32) {
        // Capacity exceeds the register count, the insert cannot fail.
        let _ = self.words.insert(register, word);
    }

    /// Iterate over cached (register, word) pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (Register, u32)> + '_ {
        self.words.iter().map(|(r, w)| (*r, *w))
    }
}

/// Named-field access to register words.
#[derive(Clone)]
pub struct RegisterFieldCodec {
    table: FieldTable,
    formatters: &'static [(&'static str, FieldFormatter)],
    cache: RegisterCache,
}

impl RegisterFieldCodec {
    /// Create a codec over `table` with no field formatters.
    pub fn new(table: FieldTable) -> Self {
        Self::with_formatters(table, &[])
    }

    /// Create a codec with per-field formatters used by `pretty_format`.
    pub fn with_formatters(
        table: FieldTable,
        formatters: &'static [(&'static str, FieldFormatter)],
    ) -> Self {
        Self {
            table,
            formatters,
            cache: RegisterCache::new(),
        }
    }

    /// Codec over the TMC2130 field table and formatters.
    pub fn tmc2130() -> Result<Self> {
        Ok(Self::with_formatters(FieldTable::tmc2130()?, TMC2130_FORMATTERS))
    }

    /// The field table.
    #[inline]
    pub fn table(&self) -> &FieldTable {
        &self.table
    }

    /// The register cache.
    #[inline]
    pub fn cache(&self) -> &RegisterCache {
        &self.cache
    }

    /// Cached word of `register` (0 if never stored).
    #[inline]
    pub fn register(&self, register: Register) -> u32 {
        self.cache.get(register)
    }

    pub(crate) fn store(&mut self, register: Register, word: u32) {
        self.cache.store(register, word);
    }

    /// Value of `field`, taken from `word` or from the cached register word.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownField` if the field is not in the table.
    pub fn get_field(&self, field: &str, word: Option<u32>) -> Result<u32> {
        let (register, mask) = self.table.lookup(field)?;
        let word = word.unwrap_or_else(|| self.cache.get(register));
        Ok((word & mask) >> first_set_bit(mask))
    }

    /// Store `value` into `field` and return the new register word.
    ///
    /// The base word is `word` if given, else the cached word. Bits of
    /// `value` beyond the field width are dropped. The result is cached
    /// under the owning register; nothing is sent to the device.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownField` if the field is not in the table.
    pub fn set_field(&mut self, field: &str, value: u32, word: Option<u32>) -> Result<u32> {
        let (register, new_word) = self.compose_field(field, value, word)?;
        self.cache.store(register, new_word);
        Ok(new_word)
    }

    /// Like [`RegisterFieldCodec::set_field`], but leaves the cache alone.
    ///
    /// Returns the owning register and the composed word, for callers that
    /// only commit the word once the device has accepted it.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownField` if the field is not in the table.
    pub fn compose_field(
        &self,
        field: &str,
        value: u32,
        word: Option<u32>,
    ) -> Result<(Register, u32)> {
        let (register, mask) = self.table.lookup(field)?;
        let word = word.unwrap_or_else(|| self.cache.get(register));
        Ok((register, (word & !mask) | ((value << first_set_bit(mask)) & mask)))
    }

    /// Set `field` from the `driver_<FIELD>` option of `source`.
    ///
    /// Single-bit fields read a boolean option, wider fields an integer
    /// option bounded to `[0, field max]`.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` for unknown fields or out-of-range options.
    pub fn set_config_field<S: ConfigSource + ?Sized>(
        &mut self,
        source: &S,
        field: &str,
        default: u32,
    ) -> Result<u32> {
        let (_, mask) = self.table.lookup(field)?;
        let option = config_option_name(field);
        let max = field_max(mask);
        let value = if max == 1 {
            u32::from(source.get_bool(&option, Some(default != 0))?)
        } else {
            let value = source.get_int(&option, Some(i64::from(default)), Some(0), Some(i64::from(max)))?;
            // Bounded to [0, max] above.
            value as u32
        };
        self.set_field(field, value, None)
    }

    /// Render `word` as `"<REG>: 0xXXXXXXXX field=value ..."`.
    ///
    /// Fields are listed by ascending mask; fields whose text is empty or
    /// `"0"` are left out.
    pub fn pretty_format(&self, register: Register, word: u32) -> DumpLine {
        let mut fields: Vec<(u32, &'static str), 32> = self
            .table
            .fields_of(register)
            .iter()
            .map(|def| (def.mask, def.name))
            .collect();
        fields.sort_unstable();

        let mut line = DumpLine::new();
        let _ = write!(line, "{}: 0x{:08x}", register.name(), word);
        for (mask, name) in fields {
            let value = (word & mask) >> first_set_bit(mask);
            let mut text: String<32> = String::new();
            let _ = match self.formatter(name) {
                Some(formatter) => formatter(&mut text, value),
                None => write!(text, "{}", value),
            };
            if text.is_empty() || text.as_str() == "0" {
                continue;
            }
            let _ = write!(line, " {}={}", name, text);
        }
        line
    }

    fn formatter(&self, field: &str) -> Option<FieldFormatter> {
        self.formatters
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, f)| *f)
    }
}

impl core::fmt::Debug for RegisterFieldCodec {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RegisterFieldCodec")
            .field("table", &self.table)
            .field("formatters", &self.formatters.len())
            .field("cache", &self.cache)
            .finish()
    }
}

/// Two's complement decode of the low `bits` bits of `value`.
pub fn decode_signed(value: u32, bits: u32) -> i32 {
    if bits == 0 || bits > 32 {
        return value as i32;
    }
    let value = i64::from(value);
    if (value >> (bits - 1)) & 1 == 1 {
        (value - (1i64 << bits)) as i32
    } else {
        value as i32
    }
}

/// Option name used for a raw field: `driver_` followed by the upper-cased field name.
pub fn config_option_name(field: &str) -> String<32> {
    let mut name = String::new();
    let _ = name.push_str("driver_");
    for c in field.chars() {
        let _ = name.push(c.to_ascii_uppercase());
    }
    name
}
