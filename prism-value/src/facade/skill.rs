//! Skill dispatch against a value's cached vtable.

use core::cmp::Ordering;
use core::fmt;
use std::sync::Arc;
use std::time::Instant;

use prism_core::MetaError;

use crate::facade::FacadeVTable;
use crate::payload::Payload;
use crate::value::{BoxedValue, ValueFlags, ValueState, debug_string_locked};

/// One optional capability of a concrete type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Skill {
    /// Stream-insertion into a sink.
    Printable,
    /// Explicit string conversion.
    Stringable,
    /// Equality, optionally ordering.
    Comparable,
    /// Text encode/decode hooks.
    Serializable,
    /// Deep copy.
    Cloneable,
    /// Dynamic invocation.
    Callable,
}

impl Skill {
    /// Skill name as used in diagnostics.
    pub const fn name(self) -> &'static str {
        match self {
            Skill::Printable => "printable",
            Skill::Stringable => "stringable",
            Skill::Comparable => "comparable",
            Skill::Serializable => "serializable",
            Skill::Cloneable => "cloneable",
            Skill::Callable => "callable",
        }
    }
}

impl FacadeVTable {
    /// True when the table carries the given skill.
    pub fn supports(&self, skill: Skill) -> bool {
        match skill {
            Skill::Printable => self.print.is_some(),
            Skill::Stringable => self.to_string.is_some(),
            Skill::Comparable => self.equals.is_some(),
            Skill::Serializable => self.serialize.is_some() && self.deserialize.is_some(),
            Skill::Cloneable => self.clone_fn.is_some(),
            Skill::Callable => self.call.is_some(),
        }
    }
}

/// Comparable dispatch over two already-locked states.
fn cmp_locked(a: &ValueState, b: &ValueState) -> Option<Ordering> {
    let vt = a.vtable.as_ref()?;
    // Heterogeneous concrete types never compare; both sides must carry
    // the skill for the comparison to be defined at all.
    b.vtable.as_ref().filter(|v| v.equals.is_some())?;
    let (x, y) = (a.payload.as_any()?, b.payload.as_any()?);
    if let Some(less) = vt.less {
        less(x, y)
    } else if let Some(equals) = vt.equals {
        equals(x, y).then_some(Ordering::Equal)
    } else {
        None
    }
}

fn eq_locked(a: &ValueState, b: &ValueState) -> bool {
    let Some(vt) = &a.vtable else { return false };
    let Some(equals) = vt.equals else { return false };
    if !b.vtable.as_ref().is_some_and(|v| v.equals.is_some()) {
        return false;
    }
    match (a.payload.as_any(), b.payload.as_any()) {
        (Some(x), Some(y)) => equals(x, y),
        _ => false,
    }
}

impl BoxedValue {
    /// True when the value's concrete type advertises the skill.
    pub fn has_skill(&self, skill: Skill) -> bool {
        let state = self.cell.state.read();
        state.vtable.as_ref().is_some_and(|vt| vt.supports(skill))
    }

    /// Printable skill: stream the payload into `out`.
    ///
    /// Falls back to the [`debug_string`](BoxedValue::debug_string)
    /// rendering when the type is not printable.
    pub fn print_to(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        let state = self.cell.state.read();
        if let Some(vt) = &state.vtable
            && let Some(print) = vt.print
            && let Some(any) = state.payload.as_any()
        {
            return print(any, out);
        }
        out.write_str(&debug_string_locked(&state))
    }

    /// Stringable skill: render the payload as a string.
    ///
    /// Falls back to the descriptor's display name when the type is not
    /// stringable.
    pub fn to_display_string(&self) -> String {
        let state = self.cell.state.read();
        if let Some(vt) = &state.vtable
            && let Some(to_string) = vt.to_string
            && let Some(any) = state.payload.as_any()
        {
            return to_string(any);
        }
        state.descriptor.name().to_string()
    }

    /// Comparable skill: equality.
    ///
    /// False unless both values carry the skill and share a concrete type
    /// that compares equal; values without the skill are never equal.
    pub fn skill_eq(&self, other: &BoxedValue) -> bool {
        self.cmp_with(other, eq_locked)
    }

    /// Comparable skill: ordering. `None` when either side lacks the skill
    /// or the concrete types differ.
    pub fn skill_cmp(&self, other: &BoxedValue) -> Option<Ordering> {
        self.cmp_with(other, cmp_locked)
    }

    /// Comparable skill: strict less-than. False when undefined.
    pub fn skill_lt(&self, other: &BoxedValue) -> bool {
        self.skill_cmp(other) == Some(Ordering::Less)
    }

    /// Lock both records (address-ordered, self-comparison aware) and run
    /// the comparison.
    fn cmp_with<R>(&self, other: &BoxedValue, f: fn(&ValueState, &ValueState) -> R) -> R {
        if Arc::ptr_eq(&self.cell, &other.cell) {
            let state = self.cell.state.read();
            return f(&state, &state);
        }
        let flip = Arc::as_ptr(&self.cell) > Arc::as_ptr(&other.cell);
        let (first, second) = if flip {
            (&other.cell, &self.cell)
        } else {
            (&self.cell, &other.cell)
        };
        let ga = first.state.read();
        let gb = second.state.read();
        if flip { f(&gb, &ga) } else { f(&ga, &gb) }
    }

    /// Serializable skill: encode the payload through its text hook.
    pub fn serialize(&self) -> Result<String, MetaError> {
        let state = self.cell.state.read();
        let any = state.payload.as_any().ok_or(MetaError::Undefined {
            operation: "serialize",
        })?;
        let serialize = state
            .vtable
            .as_ref()
            .and_then(|vt| vt.serialize)
            .ok_or_else(|| MetaError::Unsupported {
                skill: "serializable",
                type_name: state.descriptor.name().to_string(),
            })?;
        serialize(any)
    }

    /// Serializable skill: decode `text` into the payload in place.
    ///
    /// Requires the value not be readonly. A hook that rejects the text
    /// leaves the payload unchanged and fails with `CastFailure`.
    pub fn deserialize_into(&self, text: &str) -> Result<(), MetaError> {
        let mut state = self.cell.state.write();
        let type_name = state.descriptor.name().to_string();
        if state.flags.contains(ValueFlags::READONLY) {
            return Err(MetaError::ReadOnly {
                type_name,
                operation: "deserialize",
            });
        }
        let deserialize = state
            .vtable
            .as_ref()
            .and_then(|vt| vt.deserialize)
            .ok_or_else(|| MetaError::Unsupported {
                skill: "serializable",
                type_name: type_name.clone(),
            })?;
        let empty = state.payload.is_empty();
        let Some(any) = state.payload.as_any_mut() else {
            return Err(if empty {
                MetaError::Undefined {
                    operation: "deserialize",
                }
            } else {
                MetaError::ReadOnly {
                    type_name,
                    operation: "deserialize",
                }
            });
        };
        if deserialize(any, text) {
            state.modified_at = Instant::now();
            Ok(())
        } else {
            Err(MetaError::CastFailure {
                from: "string".to_string(),
                to: type_name,
                detail: "deserialize hook rejected the input".to_string(),
            })
        }
    }

    /// Cloneable skill: produce a genuinely new value with a deep-copied
    /// payload.
    ///
    /// The attribute map is shared with the source (deep copies are the
    /// same logical value); flags are kept except reference-ness, since
    /// the copy owns its payload. Cloning a void value yields void.
    pub fn clone_value(&self) -> Result<BoxedValue, MetaError> {
        let state = self.cell.state.read();
        let Some(any) = state.payload.as_any() else {
            return Ok(BoxedValue::void());
        };
        let vt = state
            .vtable
            .clone()
            .filter(|vt| vt.clone_fn.is_some())
            .ok_or_else(|| MetaError::Unsupported {
                skill: "cloneable",
                type_name: state.descriptor.name().to_string(),
            })?;
        let clone_fn = vt.clone_fn.ok_or(MetaError::Internal {
            detail: "clone capability vanished between probe and call".to_string(),
        })?;
        let copy = clone_fn(any).ok_or(MetaError::Internal {
            detail: "clone dispatched against a foreign payload".to_string(),
        })?;
        let descriptor = vt.descriptor().clone();
        Ok(BoxedValue::from_parts(
            Payload::Boxed(copy),
            descriptor,
            Some(vt),
            state.attrs.clone(),
            state.flags - ValueFlags::REFERENCE,
        ))
    }

    /// Uniform skill invocation: dispatch `skill` against this value with
    /// boxed arguments, boxing whatever comes back.
    ///
    /// Argument shapes per skill: Printable and Stringable take none and
    /// yield the rendered string; Comparable takes the other operand and
    /// yields a boolean; Serializable with no argument serializes (yielding
    /// the text), with one string argument deserializes in place (yielding
    /// void); Cloneable takes none and yields the copy; Callable forwards
    /// the whole argument list.
    pub fn invoke_skill(
        &self,
        skill: Skill,
        args: &[BoxedValue],
    ) -> Result<BoxedValue, MetaError> {
        match skill {
            Skill::Printable => {
                let mut out = String::new();
                self.print_to(&mut out).map_err(|_| MetaError::Internal {
                    detail: "print sink rejected the rendering".to_string(),
                })?;
                Ok(BoxedValue::new(out))
            }
            Skill::Stringable => Ok(BoxedValue::new(self.to_display_string())),
            Skill::Comparable => match args {
                [other] => Ok(BoxedValue::new(self.skill_eq(other))),
                _ => Err(MetaError::ArgumentMismatch {
                    detail: "comparable takes exactly one operand".to_string(),
                }),
            },
            Skill::Serializable => match args {
                [] => self.serialize().map(BoxedValue::new),
                [text] => {
                    let text =
                        text.try_cast::<String>()
                            .ok_or_else(|| MetaError::ArgumentMismatch {
                                detail: "deserialize takes a string".to_string(),
                            })?;
                    self.deserialize_into(&text)?;
                    Ok(BoxedValue::void())
                }
                _ => Err(MetaError::ArgumentMismatch {
                    detail: "serializable takes zero or one argument".to_string(),
                }),
            },
            Skill::Cloneable => self.clone_value(),
            Skill::Callable => self.call_value(args),
        }
    }

    /// Callable skill: invoke the payload with boxed arguments.
    ///
    /// The callable hook runs under the value's read lock; it must not
    /// write back into the same value.
    pub fn call_value(&self, args: &[BoxedValue]) -> Result<BoxedValue, MetaError> {
        let state = self.cell.state.read();
        let any = state
            .payload
            .as_any()
            .ok_or(MetaError::Undefined { operation: "call" })?;
        let call = state
            .vtable
            .as_ref()
            .and_then(|vt| vt.call)
            .ok_or_else(|| MetaError::Unsupported {
                skill: "callable",
                type_name: state.descriptor.name().to_string(),
            })?;
        call(any, args)
    }
}

/// Equality is defined only when both operands' concrete types implement
/// the Comparable skill; everything else is never equal.
impl PartialEq for BoxedValue {
    fn eq(&self, other: &Self) -> bool {
        self.skill_eq(other)
    }
}

impl PartialOrd for BoxedValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.skill_cmp(other)
    }
}
