//! Signature ID allocation.
//!
//! Providers are plain values owned by the caller. Whoever signs a document
//! seeds a provider from the document's `MaxSignId` and threads it through
//! the signing call; two signers must never share one document at a time.

use super::types::SignIdFormat;
use crate::error::{Error, Result};

/// Allocates monotonically increasing signature IDs.
pub trait SignIdProvider: std::fmt::Debug {
    /// Reset the counter to the value of an existing maximum ID.
    fn set_current_max(&mut self, max_id: &str) -> Result<()>;

    /// Advance the counter and return the new ID.
    ///
    /// Fails with [`Error::ProtocolState`] once the counter is exhausted.
    fn increment_and_get(&mut self) -> Result<String>;

    /// Current maximum ID, formatted.
    fn get(&self) -> String;

    /// Numeric value of a formatted ID.
    fn parse(&self, id: &str) -> Result<u32>;
}

/// Create a provider for `format`, starting from zero.
pub fn provider_for(format: SignIdFormat) -> Box<dyn SignIdProvider> {
    match format {
        SignIdFormat::Number => Box::new(NumberFormatSignId::new()),
        SignIdFormat::NumberZeroPrefix => Box::new(NumberFormatSignId::zero_prefixed()),
        SignIdFormat::Standard => Box::new(StandFormatSignId::new()),
    }
}

fn next_value(current: u32) -> Result<u32> {
    current.checked_add(1).ok_or_else(|| {
        Error::ProtocolState(format!("Signature ID {} cannot be incremented", current))
    })
}

fn parse_number(id: &str) -> Result<u32> {
    id.trim()
        .parse::<u32>()
        .map_err(|_| Error::InvalidArgument(format!("Malformed signature ID '{}'", id)))
}

/// Plain numeric IDs: `1`, `2`, ... or zero-padded `001`, `002`, ...
#[derive(Debug, Clone, Default)]
pub struct NumberFormatSignId {
    current: u32,
    zero_prefix: bool,
}

impl NumberFormatSignId {
    /// Unpadded provider starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero-padded provider starting at zero.
    pub fn zero_prefixed() -> Self {
        Self {
            current: 0,
            zero_prefix: true,
        }
    }

    /// Unpadded provider seeded with an existing maximum ID.
    ///
    /// ```
    /// use ofd_sign::signatures::{NumberFormatSignId, SignIdProvider};
    ///
    /// let mut ids = NumberFormatSignId::seeded("7").unwrap();
    /// assert_eq!(ids.increment_and_get().unwrap(), "8");
    /// ```
    pub fn seeded(max_id: &str) -> Result<Self> {
        Ok(Self {
            current: parse_number(max_id)?,
            zero_prefix: false,
        })
    }

    /// Whether IDs are zero-padded to three digits.
    pub fn is_zero_prefixed(&self) -> bool {
        self.zero_prefix
    }

    fn format(&self, n: u32) -> String {
        if self.zero_prefix {
            format!("{:03}", n)
        } else {
            n.to_string()
        }
    }
}

impl SignIdProvider for NumberFormatSignId {
    fn set_current_max(&mut self, max_id: &str) -> Result<()> {
        self.current = self.parse(max_id)?;
        Ok(())
    }

    fn increment_and_get(&mut self) -> Result<String> {
        self.current = next_value(self.current)?;
        Ok(self.format(self.current))
    }

    fn get(&self) -> String {
        self.format(self.current)
    }

    fn parse(&self, id: &str) -> Result<u32> {
        parse_number(id)
    }
}

/// Standard IDs as used by GB/T 33190: `s001`, `s002`, ...
#[derive(Debug, Clone, Default)]
pub struct StandFormatSignId {
    current: u32,
}

impl StandFormatSignId {
    /// Provider starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider seeded with an existing maximum ID.
    pub fn seeded(max_id: &str) -> Result<Self> {
        Ok(Self {
            current: Self::parse_index(max_id)?,
        })
    }

    /// Numeric index of `sNNN`; bare numbers are accepted as well.
    pub fn parse_index(id: &str) -> Result<u32> {
        let id = id.trim();
        parse_number(id.strip_prefix('s').unwrap_or(id))
    }
}

impl SignIdProvider for StandFormatSignId {
    fn set_current_max(&mut self, max_id: &str) -> Result<()> {
        self.current = Self::parse_index(max_id)?;
        Ok(())
    }

    fn increment_and_get(&mut self) -> Result<String> {
        self.current = next_value(self.current)?;
        Ok(format!("s{:03}", self.current))
    }

    fn get(&self) -> String {
        format!("s{:03}", self.current)
    }

    fn parse(&self, id: &str) -> Result<u32> {
        Self::parse_index(id)
    }
}
