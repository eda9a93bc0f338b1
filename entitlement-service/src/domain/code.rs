//! Activation code format and generation.

use rand::Rng;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
/// Alphanumeric characters per code, excluding separators.
pub const CODE_LENGTH: usize = 12;
/// Characters per hyphen-separated block.
pub const CODE_GROUP: usize = 4;

/// Generate a code like `AB12-CD34-EF56`: 12 uppercase alphanumerics in
/// 4-character blocks. Uniqueness is enforced by the database column, not
/// here.
pub fn generate_code<R: Rng>(rng: &mut R) -> String {
    let mut code = String::with_capacity(CODE_LENGTH + CODE_LENGTH / CODE_GROUP - 1);
    for i in 0..CODE_LENGTH {
        if i > 0 && i % CODE_GROUP == 0 {
            code.push('-');
        }
        let idx = rng.gen_range(0..CODE_ALPHABET.len());
        code.push(CODE_ALPHABET[idx] as char);
    }
    code
}

/// Check the fixed-length grouped format any generator must satisfy.
pub fn is_valid_format(code: &str) -> bool {
    let groups: Vec<&str> = code.split('-').collect();
    groups.len() == CODE_LENGTH / CODE_GROUP
        && groups.iter().all(|group| {
            group.len() == CODE_GROUP
                && group
                    .bytes()
                    .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
        })
}
