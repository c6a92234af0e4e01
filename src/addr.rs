//! Conversions between dotted-decimal text and 32-bit big-endian addresses.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Number of bits in an IPv4 address, and the longest valid prefix length.
pub const ADDRESS_BITS: u8 = 32;

/// Mask with the leading `len` bits set.
#[inline]
pub(crate) const fn mask_of(len: u8) -> u32 {
    debug_assert!(len <= ADDRESS_BITS);
    if len == 0 {
        0
    } else {
        u32::MAX << (ADDRESS_BITS - len)
    }
}

/// An IPv4 address held as a big-endian `u32`.
///
/// Bit `0` is the most significant bit, i.e. the first bit written in
/// dotted-decimal form.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BitAddress(u32);

impl BitAddress {
    pub const UNSPECIFIED: BitAddress = BitAddress(0);

    #[inline]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    #[inline]
    pub const fn to_bits(self) -> u32 {
        self.0
    }

    /// Bit at `index`, where `0` is the MSB. Indices past the last bit read as clear.
    #[inline]
    pub const fn bit(self, index: u8) -> bool {
        index < ADDRESS_BITS && (self.0 >> (ADDRESS_BITS - 1 - index)) & 1 == 1
    }

    /// Clears every bit from `len` onwards.
    #[inline]
    pub const fn masked(self, len: u8) -> Self {
        Self(self.0 & mask_of(len))
    }

    /// Number of leading bits shared with `other`.
    #[inline]
    pub const fn common_prefix_len(self, other: Self) -> u8 {
        (self.0 ^ other.0).leading_zeros() as u8
    }
}

impl From<Ipv4Addr> for BitAddress {
    fn from(addr: Ipv4Addr) -> Self {
        Self(u32::from(addr))
    }
}

impl From<BitAddress> for Ipv4Addr {
    fn from(addr: BitAddress) -> Self {
        Ipv4Addr::from(addr.0)
    }
}

impl From<u32> for BitAddress {
    fn from(bits: u32) -> Self {
        Self(bits)
    }
}

impl FromStr for BitAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.parse::<Ipv4Addr>()
            .map(Self::from)
            .map_err(|_| Error::InvalidAddress(s.to_string()))
    }
}

impl fmt::Display for BitAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.0.to_be_bytes();
        write!(f, "{a}.{b}.{c}.{d}")
    }
}

impl fmt::Debug for BitAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// An address range: a canonical network address plus a prefix length.
///
/// The address never has bits set at or beyond `prefix_len`.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Prefix {
    addr: BitAddress,
    len: u8,
}

impl Prefix {
    /// Builds the prefix covering `addr` with the leading `len` bits significant.
    pub fn new(addr: BitAddress, len: u8) -> Result<Self> {
        if len > ADDRESS_BITS {
            return Err(Error::InvalidMask(len.to_string()));
        }
        Ok(Self::truncated(addr, len))
    }

    /// The single-address prefix `addr/32`.
    #[inline]
    pub const fn host(addr: BitAddress) -> Self {
        Self {
            addr,
            len: ADDRESS_BITS,
        }
    }

    #[inline]
    pub(crate) const fn truncated(addr: BitAddress, len: u8) -> Self {
        Self {
            addr: addr.masked(len),
            len,
        }
    }

    #[inline]
    pub const fn addr(&self) -> BitAddress {
        self.addr
    }

    #[inline]
    pub const fn prefix_len(&self) -> u8 {
        self.len
    }

    /// True if every address in `other` is also in `self`.
    #[inline]
    pub fn covers(&self, other: &Prefix) -> bool {
        self.len <= other.len && other.addr.masked(self.len) == self.addr
    }

    #[inline]
    pub fn contains(&self, addr: BitAddress) -> bool {
        self.covers(&Prefix::host(addr))
    }
}

impl FromStr for Prefix {
    type Err = Error;

    /// Parses `A.B.C.D` or `A.B.C.D/N`. A missing `/N` means a length of 0.
    fn from_str(s: &str) -> Result<Self> {
        let (addr, len) = match s.split_once('/') {
            Some((addr, mask)) => {
                // `u8::from_str` also takes a leading `+`.
                let len = mask
                    .starts_with(|c: char| c.is_ascii_digit())
                    .then(|| mask.parse::<u8>().ok())
                    .flatten()
                    .ok_or_else(|| Error::InvalidMask(mask.to_string()))?;
                (addr, len)
            }
            None => (s, 0),
        };
        let addr = addr
            .parse::<BitAddress>()
            .map_err(|_| Error::InvalidAddress(s.to_string()))?;
        Prefix::new(addr, len)
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.len)
    }
}

impl fmt::Debug for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
