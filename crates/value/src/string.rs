//! Immutable, reference-counted strings with a packed header.
//!
//! The header word stores a 22-bit byte length and a 10-bit logical
//! reference count. The count saturates at [`REF_MAX`]; a saturated string
//! is never released before its pool goes away.

use crate::error::ValueError;
use std::borrow::Borrow;
use std::cell::Cell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::rc::Rc;

pub const LEN_BITS: u32 = 22;
pub const STR_MAX_LEN: usize = (1 << LEN_BITS) - 1;
pub const REF_MAX: u32 = (1 << 10) - 1;

const LEN_MASK: u32 = STR_MAX_LEN as u32;

struct StrBox {
    header: Cell<u32>,
    text: Box<str>,
}

#[derive(Clone)]
pub struct Str(Rc<StrBox>);

impl Str {
    pub fn new(text: &str) -> Result<Self, ValueError> {
        if text.len() > STR_MAX_LEN {
            return Err(ValueError::out_of_range(format!(
                "string of {} bytes exceeds the {} byte limit",
                text.len(),
                STR_MAX_LEN
            )));
        }
        let header = text.len() as u32 | (1 << LEN_BITS);
        Ok(Str(Rc::new(StrBox {
            header: Cell::new(header),
            text: text.into(),
        })))
    }

    /// Builds a string from raw bytes, replacing invalid UTF-8 sequences.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ValueError> {
        Self::new(&String::from_utf8_lossy(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0.text
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.text.as_bytes()
    }

    pub fn len(&self) -> usize {
        (self.0.header.get() & LEN_MASK) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ref_count(&self) -> u32 {
        self.0.header.get() >> LEN_BITS
    }

    pub fn is_saturated(&self) -> bool {
        self.ref_count() == REF_MAX
    }

    /// Increments the logical count. Saturates silently at [`REF_MAX`].
    pub fn retain(&self) {
        let count = self.ref_count();
        if count >= REF_MAX {
            return;
        }
        if count + 1 == REF_MAX {
            log::debug!("string {:?} reached refcount saturation", self.as_str());
        }
        self.set_ref_count(count + 1);
    }

    /// Decrements the logical count and reports whether it reached zero.
    ///
    /// Saturated strings are immortal and never reach zero; neither does a
    /// string below 1.
    pub fn release(&self) -> bool {
        let count = self.ref_count();
        if count >= REF_MAX || count == 0 {
            return false;
        }
        self.set_ref_count(count - 1);
        count == 1
    }

    pub fn ptr_eq(a: &Str, b: &Str) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    fn set_ref_count(&self, count: u32) {
        let len = self.0.header.get() & LEN_MASK;
        self.0.header.set(len | (count << LEN_BITS));
    }
}

impl Deref for Str {
    type Target = str;

    fn deref(&self) -> &str {
        self.as_str()
    }
}

impl Borrow<str> for Str {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl AsRef<str> for Str {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl PartialEq for Str {
    fn eq(&self, other: &Self) -> bool {
        Str::ptr_eq(self, other) || self.as_str() == other.as_str()
    }
}

impl Eq for Str {}

impl PartialEq<str> for Str {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for Str {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl Hash for Str {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state)
    }
}

impl fmt::Debug for Str {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl fmt::Display for Str {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
