// ActionScript bytecode stream: the zero-terminated action dispatcher, the six field-bearing
// action handlers with named records, and the fieldless opcode table below 0x80.

use log::{trace, warn};

use crate::errors::{unknown_name_error, Result};
use crate::io::{BitConsumer, Bytestream, ScopedStream};
use crate::primitives::read_string;
use crate::DecoderOptions;

/// A decoded `PUSH` operand, tagged by the SWF19 push-value type byte.
#[derive(Debug, Clone, PartialEq)]
pub enum PushValue {
    Str(String),
    Float(f32),
    Null,
    Undefined,
    Register(u8),
    Boolean(bool),
    Double(f64),
    Integer(u32),
    Constant8(u8),
    Constant16(u16),
}

fn read_push_value<S: Bytestream>(src: &mut S) -> Result<PushValue> {
    let type_tag = src.read_u8()?;

    let value = match type_tag {
        0 => PushValue::Str(read_string(src)?),
        1 => PushValue::Float(src.read_f32()?),
        2 => PushValue::Null,
        3 => PushValue::Undefined,
        4 => PushValue::Register(src.read_u8()?),
        5 => PushValue::Boolean(src.read_u8()? != 0),
        6 => PushValue::Double(src.read_f64()?),
        7 => PushValue::Integer(src.read_u32()?),
        8 => PushValue::Constant8(src.read_u8()?),
        9 => PushValue::Constant16(src.read_u16()?),
        other => return unknown_name_error("PushValueType", u32::from(other), src.pos()),
    };

    Ok(value)
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionParam {
    pub register: u8,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DefineFunction2Flags {
    pub preload_this: bool,
    pub suppress_this: bool,
    pub preload_arguments: bool,
    pub suppress_arguments: bool,
    pub preload_super: bool,
    pub suppress_super: bool,
    pub preload_root: bool,
    pub preload_parent: bool,
    pub preload_global: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionBody {
    ConstantPool { pool: Vec<String> },
    GetUrl { url: String, target: String },
    Push { values: Vec<PushValue> },
    DefineFunction { name: String, params: Vec<String>, code: Vec<u8> },
    If { branch_offset: i16 },
    DefineFunction2 {
        name: String,
        register_count: u8,
        flags: DefineFunction2Flags,
        params: Vec<FunctionParam>,
        code: Vec<u8>,
    },
    /// One of the fieldless opcodes below `0x80` (`ActionPlay`, `ActionStop`, `ActionAdd`, …).
    Fieldless { code: u8, name: &'static str },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Known(Box<ActionBody>),
    Unknown { code: u8, raw: Vec<u8> },
    Failing { code: u8, raw: Vec<u8> },
}

const FIELDLESS_ACTION_NAMES: &[(u8, &str)] = &[
    (0x04, "ActionNextFrame"), (0x05, "ActionPreviousFrame"), (0x06, "ActionPlay"),
    (0x07, "ActionStop"), (0x08, "ActionToggleQuality"), (0x09, "ActionStopSounds"),
    (0x0A, "ActionAdd"), (0x0B, "ActionSubtract"), (0x0C, "ActionMultiply"),
    (0x0D, "ActionDivide"), (0x0E, "ActionEquals"), (0x0F, "ActionLess"),
    (0x10, "ActionAnd"), (0x11, "ActionOr"), (0x12, "ActionNot"),
    (0x13, "ActionStringEquals"), (0x14, "ActionStringLength"), (0x15, "ActionStringExtract"),
    (0x17, "ActionPop"), (0x18, "ActionToInteger"), (0x1C, "ActionGetVariable"),
    (0x1D, "ActionSetVariable"), (0x20, "ActionSetTarget2"), (0x21, "ActionStringAdd"),
    (0x22, "ActionGetProperty"), (0x23, "ActionSetProperty"), (0x24, "ActionCloneSprite"),
    (0x25, "ActionRemoveSprite"), (0x26, "ActionTrace"), (0x27, "ActionStartDrag"),
    (0x28, "ActionEndDrag"), (0x29, "ActionStringLess"), (0x2A, "ActionThrow"),
    (0x2B, "ActionCastOp"), (0x2C, "ActionImplementsOp"), (0x2D, "ActionFSCommand2"),
    (0x30, "ActionRandomNumber"), (0x31, "ActionMBStringLength"), (0x32, "ActionCharToAscii"),
    (0x33, "ActionAsciiToChar"), (0x34, "ActionGetTime"), (0x35, "ActionMBStringExtract"),
    (0x36, "ActionMBCharToAscii"), (0x37, "ActionMBAsciiToChar"), (0x3A, "ActionDelete"),
    (0x3B, "ActionDelete2"), (0x3C, "ActionDefineLocal"), (0x3D, "ActionCallFunction"),
    (0x3E, "ActionReturn"), (0x3F, "ActionModulo"), (0x40, "ActionNewObject"),
    (0x41, "ActionDefineLocal2"), (0x42, "ActionInitArray"), (0x43, "ActionInitObject"),
    (0x44, "ActionTypeOf"), (0x45, "ActionTargetPath"), (0x46, "ActionEnumerate"),
    (0x47, "ActionAdd2"), (0x48, "ActionLess2"), (0x49, "ActionEquals2"),
    (0x4A, "ActionToNumber"), (0x4B, "ActionToString"), (0x4C, "ActionPushDuplicate"),
    (0x4D, "ActionStackSwap"), (0x4E, "ActionGetMember"), (0x4F, "ActionSetMember"),
    (0x50, "ActionIncrement"), (0x51, "ActionDecrement"), (0x52, "ActionCallMethod"),
    (0x53, "ActionNewMethod"), (0x54, "ActionInstanceOf"), (0x55, "ActionEnumerate2"),
    (0x60, "ActionBitAnd"), (0x61, "ActionBitOr"), (0x62, "ActionBitXor"),
    (0x63, "ActionBitLShift"), (0x64, "ActionBitRShift"), (0x65, "ActionBitURShift"),
    (0x66, "ActionStrictEquals"), (0x67, "ActionGreater"), (0x68, "ActionStringGreater"),
    (0x69, "ActionExtends"),
];

fn fieldless_action_name(code: u8) -> Option<&'static str> {
    FIELDLESS_ACTION_NAMES.iter().find(|(c, _)| *c == code).map(|(_, name)| *name)
}

fn read_constant_pool<S: Bytestream>(src: &mut S) -> Result<ActionBody> {
    let count = src.read_u16()?;
    let mut pool = Vec::with_capacity(count as usize);
    for _ in 0..count {
        pool.push(read_string(src)?);
    }
    Ok(ActionBody::ConstantPool { pool })
}

fn read_get_url<S: Bytestream>(src: &mut S) -> Result<ActionBody> {
    Ok(ActionBody::GetUrl { url: read_string(src)?, target: read_string(src)? })
}

fn read_push<S: Bytestream + crate::io::FiniteStream>(src: &mut S) -> Result<ActionBody> {
    let mut values = Vec::new();
    while crate::io::FiniteStream::bytes_available(src) > 0 {
        values.push(read_push_value(src)?);
    }
    Ok(ActionBody::Push { values })
}

fn read_define_function<S: Bytestream>(src: &mut S) -> Result<ActionBody> {
    let name = read_string(src)?;
    let num_params = src.read_u16()?;

    let mut params = Vec::with_capacity(num_params as usize);
    for _ in 0..num_params {
        params.push(read_string(src)?);
    }

    let code_size = src.read_u16()?;
    let code = src.read_vec_bytes(code_size as usize)?;

    Ok(ActionBody::DefineFunction { name, params, code })
}

fn read_if<S: Bytestream>(src: &mut S) -> Result<ActionBody> {
    Ok(ActionBody::If { branch_offset: src.read_i16()? })
}

fn read_define_function2<S: Bytestream>(src: &mut S) -> Result<ActionBody> {
    let name = read_string(src)?;
    let num_params = src.read_u16()?;
    let register_count = src.read_u8()?;

    let flags = {
        let mut bc = BitConsumer::new(&mut *src);
        DefineFunction2Flags {
            preload_this: bc.get_flag()?,
            suppress_this: bc.get_flag()?,
            preload_arguments: bc.get_flag()?,
            suppress_arguments: bc.get_flag()?,
            preload_super: bc.get_flag()?,
            suppress_super: bc.get_flag()?,
            preload_root: bc.get_flag()?,
            preload_parent: bc.get_flag()?,
            preload_global: { let _reserved = bc.get_unsigned(7)?; bc.get_flag()? },
        }
    };

    let mut params = Vec::with_capacity(num_params as usize);
    for _ in 0..num_params {
        let register = src.read_u8()?;
        let name = read_string(src)?;
        params.push(FunctionParam { register, name });
    }

    let code_size = src.read_u16()?;
    let code = src.read_vec_bytes(code_size as usize)?;

    Ok(ActionBody::DefineFunction2 { name, register_count, flags, params, code })
}

/// Runs `handler` over a `ScopedStream` bounded to `length` bytes starting at `offset`, checking
/// on exit that the handler consumed exactly that many bytes.
fn with_scope<S, F>(src: &mut S, name: &'static str, offset: u64, length: u64, handler: F) -> Result<ActionBody>
where
    S: Bytestream,
    F: FnOnce(&mut ScopedStream<&mut S>) -> Result<ActionBody>,
{
    let mut scoped = ScopedStream::new(&mut *src, name, offset, length);
    let result = handler(&mut scoped);

    match (result, scoped.finish()) {
        (Ok(body), Ok(_)) => Ok(body),
        (Ok(_), Err(err)) => Err(err),
        (Err(err), _) => Err(err),
    }
}

/// Re-reads the raw bytes of an action payload that could not be (fully) decoded, by seeking
/// back to where the payload started.
fn recover_raw<S: Bytestream>(src: &mut S, offset: u64, length: u64) -> Vec<u8> {
    if src.seek_to(offset).is_err() {
        return Vec::new();
    }
    src.read_vec_bytes(length as usize).unwrap_or_default()
}

/// Drives the zero-terminated action dispatcher starting at the stream's current position.
///
/// Action codes strictly greater than `0x80` carry a 16-bit length prefix; codes `0x80` and
/// below are fieldless (see DESIGN.md for why `>` rather than `>=` is the authoritative test).
pub fn read_action_list<S: Bytestream>(src: &mut S, options: &DecoderOptions) -> Result<Vec<Action>> {
    let mut actions = Vec::new();

    loop {
        let code = src.read_u8()?;
        if code == 0 {
            break;
        }

        if code <= 0x80 {
            let body = match fieldless_action_name(code) {
                Some(name) => ActionBody::Fieldless { code, name },
                None => {
                    if options.unknown_alert {
                        return unknown_name_error("Action", u32::from(code), src.pos());
                    }
                    actions.push(Action::Unknown { code, raw: Vec::new() });
                    continue;
                }
            };
            actions.push(Action::Known(Box::new(body)));
            continue;
        }

        let length = u64::from(src.read_u16()?);
        let offset = src.pos();
        let name = action_name(code);

        let outcome = match code {
            0x88 => Some(with_scope(src, name, offset, length, read_constant_pool)),
            0x83 => Some(with_scope(src, name, offset, length, read_get_url)),
            0x96 => Some(with_scope(src, name, offset, length, read_push)),
            0x9B => Some(with_scope(src, name, offset, length, read_define_function)),
            0x9D => Some(with_scope(src, name, offset, length, read_if)),
            0x8E => Some(with_scope(src, name, offset, length, read_define_function2)),
            _ => None,
        };

        match outcome {
            Some(Ok(body)) => actions.push(Action::Known(Box::new(body))),
            Some(Err(_)) => {
                warn!("action {:#x} at offset {} failed to decode, treating as raw", code, offset);
                actions.push(Action::Failing { code, raw: recover_raw(src, offset, length) });
            }
            None => {
                if options.unknown_alert {
                    return unknown_name_error("Action", u32::from(code), offset);
                }
                trace!("unknown action code {:#x} at offset {}", code, offset);
                actions.push(Action::Unknown { code, raw: recover_raw(src, offset, length) });
            }
        }
    }

    Ok(actions)
}

fn action_name(code: u8) -> &'static str {
    match code {
        0x81 => "ActionGotoFrame",
        0x83 => "ActionGetURL",
        0x87 => "ActionStoreRegister",
        0x88 => "ActionConstantPool",
        0x8A => "ActionWaitForFrame",
        0x8B => "ActionSetTarget",
        0x8C => "ActionGoToLabel",
        0x8D => "ActionWaitForFrame2",
        0x8E => "ActionDefineFunction2",
        0x8F => "ActionTry",
        0x94 => "ActionWith",
        0x96 => "ActionPush",
        0x99 => "ActionJump",
        0x9A => "ActionGetURL2",
        0x9B => "ActionDefineFunction",
        0x9D => "ActionIf",
        0x9E => "ActionCall",
        0x9F => "ActionGotoFrame2",
        _ => "UnknownAction",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::BufStream;

    #[test]
    fn fieldless_action_is_named() {
        assert_eq!(fieldless_action_name(0x06), Some("ActionPlay"));
        assert_eq!(fieldless_action_name(0x99), None);
    }

    #[test]
    fn terminates_on_zero_code() {
        let mut src = BufStream::new(&[0x06, 0x00]);
        let options = DecoderOptions::default();
        let actions = read_action_list(&mut src, &options).unwrap();
        assert_eq!(actions.len(), 1);
        assert!(matches!(actions[0], Action::Known(_)));
    }
}
