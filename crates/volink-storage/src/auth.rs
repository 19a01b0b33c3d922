use anyhow::Result;
use base64::{engine::general_purpose, Engine as _};
use rand::Rng;

/// 生成一个 32 字节的加密安全随机值（Base64 编码）。
/// 用于未配置 `jwt_secret` 时生成临时签名密钥。
pub fn generate_secret() -> String {
    let mut rng = rand::thread_rng();
    let secret_bytes: [u8; 32] = rng.gen();
    general_purpose::STANDARD.encode(secret_bytes)
}

/// 生成 6 位数字 OTP 验证码（左侧补零）
pub fn generate_otp_code() -> String {
    let mut rng = rand::thread_rng();
    format!("{:06}", rng.gen_range(0..1_000_000))
}

/// 使用 bcrypt 对明文密码进行哈希
pub fn hash_password(password: &str) -> Result<String> {
    let hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)?;
    Ok(hash)
}

/// 验证明文密码是否匹配哈希值
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    Ok(bcrypt::verify(password, hash)?)
}

/// Constant-time comparison for OTP codes and other short secrets.
/// Always compares all bytes regardless of mismatch position.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    // XOR all bytes and OR into an accumulator; no early exit on mismatch
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_secret_is_random() {
        let s1 = generate_secret();
        let s2 = generate_secret();
        assert_ne!(s1, s2);
        assert!(s1.len() > 40); // Base64 encoded 32 bytes
    }

    #[test]
    fn test_otp_code_shape() {
        for _ in 0..100 {
            let code = generate_otp_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("hunter2hunter2").unwrap();
        assert!(verify_password("hunter2hunter2", &hash).unwrap());
        assert!(!verify_password("wrong-password", &hash).unwrap());
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq("483921", "483921"));
        assert!(!constant_time_eq("483921", "483922"));
        assert!(!constant_time_eq("483921", "48392"));
        assert!(constant_time_eq("", ""));
    }
}
