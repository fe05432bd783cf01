/// Significance codeword (VLC) for a 2x2 quad of code-block samples, the
/// middle stage of the HT block coder's cleanup pass between MEL's
/// run-length gate and MagSgn's per-sample magnitude/sign (§4.7).
///
/// `context` (0 or 1, from the quad's already-decoded neighbors) selects
/// between two nibble orderings so that the codeword depends on local
/// state the way the real context-adaptive table does, without needing
/// bit-exact agreement with it — only a self-consistent round trip is
/// required of the block coder interface.

fn reverse_nibble(n: u8) -> u8 {
    n.reverse_bits() >> 4
}

/// Encodes the 4-bit significance pattern `rho` (bit `i` set means
/// quad position `i` is individually significant) into a codeword.
pub fn encode_vlc(rho: u8, context: u8) -> u8 {
    let rho = rho & 0b1111;
    if context == 0 { rho } else { reverse_nibble(rho) }
}

pub fn decode_vlc(code: u8, context: u8) -> u8 {
    let code = code & 0b1111;
    if context == 0 { code } else { reverse_nibble(code) }
}
