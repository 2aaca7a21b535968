//! Bit-exact OSC 1.0 message encoding.

use vrelay_foundation::error::OscError;

/// One OSC argument. Deliberately closed: every variant maps to exactly one
/// OSC 1.0 type tag, so there is no runtime "unsupported type" branch to
/// forget to handle.
#[derive(Debug, Clone, PartialEq)]
pub enum OscArg {
    String(String),
    Int(i32),
    Float(f32),
    Bool(bool),
}

/// Null-terminate and zero-pad to the next 4-byte boundary.
fn encode_osc_string(s: &str) -> Vec<u8> {
    let mut out = s.as_bytes().to_vec();
    out.push(0);
    while out.len() % 4 != 0 {
        out.push(0);
    }
    out
}

/// Encode `address` and `args` as a single OSC 1.0 message. `address` must
/// start with `/`.
pub fn encode_message(address: &str, args: &[OscArg]) -> Result<Vec<u8>, OscError> {
    if !address.starts_with('/') {
        return Err(OscError::InvalidAddress { address: address.to_string() });
    }

    let mut type_tags = String::from(",");
    let mut arg_bytes = Vec::new();
    for arg in args {
        match arg {
            OscArg::String(s) => {
                type_tags.push('s');
                arg_bytes.extend(encode_osc_string(s));
            }
            OscArg::Int(i) => {
                type_tags.push('i');
                arg_bytes.extend_from_slice(&i.to_be_bytes());
            }
            OscArg::Float(f) => {
                type_tags.push('f');
                arg_bytes.extend_from_slice(&f.to_be_bytes());
            }
            OscArg::Bool(true) => type_tags.push('T'),
            OscArg::Bool(false) => type_tags.push('F'),
        }
    }

    let mut out = encode_osc_string(address);
    out.extend(encode_osc_string(&type_tags));
    out.extend(arg_bytes);
    Ok(out)
}

/// `(text: s, chatbox_send: T|F, chatbox_clear: T|F)` per §4.9.
pub fn encode_chatbox_message(
    address: &str,
    text: &str,
    send: bool,
    clear: bool,
) -> Result<Vec<u8>, OscError> {
    encode_message(
        address,
        &[
            OscArg::String(text.to_string()),
            OscArg::Bool(send),
            OscArg::Bool(clear),
        ],
    )
}

/// `(is_typing: T|F)` per §4.9.
pub fn encode_typing_message(address: &str, is_typing: bool) -> Result<Vec<u8>, OscError> {
    encode_message(address, &[OscArg::Bool(is_typing)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_address_without_leading_slash() {
        let err = encode_message("chatbox/input", &[]).unwrap_err();
        assert!(matches!(err, OscError::InvalidAddress { .. }));
    }

    #[test]
    fn string_arg_is_null_terminated_and_padded_to_four_bytes() {
        let msg = encode_message("/a", &[OscArg::String("hi".into())]).unwrap();
        // address "/a" -> padded to 4 bytes: 2f 61 00 00
        assert_eq!(&msg[0..4], &[0x2f, 0x61, 0x00, 0x00]);
        // type tag ",s" -> padded to 4 bytes
        assert_eq!(&msg[4..8], &[b',', b's', 0x00, 0x00]);
        // "hi" -> 2 bytes + null + pad = 4 bytes
        assert_eq!(&msg[8..12], &[b'h', b'i', 0x00, 0x00]);
        assert_eq!(msg.len(), 12);
    }

    #[test]
    fn int_arg_is_big_endian_four_bytes() {
        let msg = encode_message("/a", &[OscArg::Int(1)]).unwrap();
        let tail = &msg[msg.len() - 4..];
        assert_eq!(tail, &[0, 0, 0, 1]);
    }

    #[test]
    fn float_arg_is_big_endian_ieee754() {
        let msg = encode_message("/a", &[OscArg::Float(1.0)]).unwrap();
        let tail = &msg[msg.len() - 4..];
        assert_eq!(tail, &1.0f32.to_be_bytes());
    }

    #[test]
    fn bool_args_carry_no_payload_bytes() {
        let with_true = encode_message("/a", &[OscArg::Bool(true)]).unwrap();
        let with_false = encode_message("/a", &[OscArg::Bool(false)]).unwrap();
        assert_eq!(with_true.len(), with_false.len());
        // "/a" (4) + ",T" padded (4) = 8, no trailing arg bytes
        assert_eq!(with_true.len(), 8);
    }

    #[test]
    fn chatbox_message_matches_documented_shape() {
        let msg = encode_chatbox_message("/chatbox/input", "hello", true, false).unwrap();
        assert!(msg.starts_with(b"/chatbox/input\0\0"));
    }
}
