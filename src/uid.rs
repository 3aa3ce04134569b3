use std::{fmt, sync::Mutex};
use lazy_static::lazy_static;

lazy_static! {
   static ref LAST_UID: Mutex<u32> = Mutex::new(1);
}

/// Process-unique handle, used to name GPU textures owned by a backend.
#[derive(Clone, Copy, PartialEq, Debug, Eq, Hash, PartialOrd, Ord)]
pub struct Uid {
    inner: u32
}

impl Uid {
    pub fn new() -> Uid {
        let mut last = match LAST_UID.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let res = Uid { inner: *last };
        *last += 1;
        res
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}
