use rand::Rng;

/// Produces reset codes. Injected so tests can pin the code.
pub trait OtpSource: Send + Sync {
    fn generate(&self) -> String;
}

/// Uniform over 100000..=999999, so codes are always six digits.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomOtp;

impl OtpSource for RandomOtp {
    fn generate(&self) -> String {
        rand::thread_rng().gen_range(100_000u32..=999_999).to_string()
    }
}

/// Equality that does not short-circuit on the first differing byte.
pub fn codes_match(stored: &str, supplied: &str) -> bool {
    let (a, b) = (stored.as_bytes(), supplied.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
