//! Opt-in hook traits the façade probes for.

use prism_core::MetaError;

use crate::BoxedValue;

/// Per-type text serialization hook.
///
/// The string syntax is defined entirely by the implementing type; the
/// façade only stores and forwards it. The impls provided here for the
/// standard scalars use the minimal default encoding: strings double-quoted
/// with no escaping, booleans as `true`/`false`, numbers in their natural
/// decimal form, the unit type as `null`.
pub trait TextSerial {
    /// Encode `self` as a string.
    fn serialize(&self) -> String;

    /// Replace `self` with the value encoded in `text`. Returns `false`
    /// when the text is not a valid encoding; `self` is left unchanged in
    /// that case.
    fn deserialize(&mut self, text: &str) -> bool;
}

impl TextSerial for String {
    fn serialize(&self) -> String {
        format!("\"{self}\"")
    }

    fn deserialize(&mut self, text: &str) -> bool {
        let inner = text
            .strip_prefix('"')
            .and_then(|t| t.strip_suffix('"'))
            .unwrap_or(text);
        *self = inner.to_string();
        true
    }
}

impl TextSerial for char {
    fn serialize(&self) -> String {
        format!("\"{self}\"")
    }

    fn deserialize(&mut self, text: &str) -> bool {
        let inner = text
            .strip_prefix('"')
            .and_then(|t| t.strip_suffix('"'))
            .unwrap_or(text);
        let mut chars = inner.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => {
                *self = c;
                true
            }
            _ => false,
        }
    }
}

impl TextSerial for () {
    fn serialize(&self) -> String {
        "null".to_string()
    }

    fn deserialize(&mut self, text: &str) -> bool {
        text == "null"
    }
}

macro_rules! impl_text_serial_decimal {
    ($($t:ty),* $(,)?) => {
        $(
            impl TextSerial for $t {
                fn serialize(&self) -> String {
                    self.to_string()
                }

                fn deserialize(&mut self, text: &str) -> bool {
                    match text.trim().parse::<$t>() {
                        Ok(v) => {
                            *self = v;
                            true
                        }
                        Err(_) => false,
                    }
                }
            }
        )*
    };
}

impl_text_serial_decimal!(
    u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64, bool,
);

/// Per-type dynamic invocation hook.
///
/// Implementing this makes a type Callable through the façade: the value
/// can be invoked with a sequence of boxed arguments.
pub trait DynCall {
    /// Invoke the value. Implementations reject unacceptable argument
    /// lists with [`MetaError::ArgumentMismatch`].
    fn dyn_call(&self, args: &[BoxedValue]) -> Result<BoxedValue, MetaError>;
}
