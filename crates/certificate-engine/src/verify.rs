//! 验证码签发
//!
//! 产出全局唯一、URL 安全、便于口头转述的证书编号，以及嵌入制品的
//! 验证 URL。编号由时间分量与随机分量拼接：按签发时间大致有序，
//! 但无法仅凭时间戳猜出完整编号。签发操作不会失败。

use chrono::Utc;
use rand::Rng;

use cert_shared::model::CertificateId;

/// 随机分量长度
///
/// 36^10 ≈ 3.6e15 的取值空间，同一毫秒内大批量签发也不会撞号。
const RANDOM_LEN: usize = 10;

const BASE36: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// 验证码签发器
#[derive(Debug, Clone, Default)]
pub struct CodeIssuer;

impl CodeIssuer {
    pub fn new() -> Self {
        Self
    }

    /// 签发一个证书编号：`CERT-{毫秒时间戳 base36}-{随机 base36}`
    pub fn issue(&self) -> CertificateId {
        let ts = to_base36(Utc::now().timestamp_millis().max(0) as u64);

        let mut rng = rand::rng();
        let random: String = (0..RANDOM_LEN)
            .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
            .collect();

        CertificateId(format!("CERT-{ts}-{random}"))
    }

    /// 构造证书编号对应的验证 URL
    ///
    /// 由外部验证端点解析；base 尾部斜杠容忍处理。
    pub fn verification_url(&self, base: &str, id: &CertificateId) -> String {
        format!("{}/verify/{}", base.trim_end_matches('/'), id)
    }
}

/// 无符号整数转 base36 大写字符串
fn to_base36(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut buf = Vec::new();
    while n > 0 {
        buf.push(BASE36[(n % 36) as usize]);
        n /= 36;
    }
    buf.reverse();
    String::from_utf8(buf).expect("base36 字符集恒为合法 UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_issue_format() {
        let issuer = CodeIssuer::new();
        let id = issuer.issue();
        let s = id.as_str();

        assert!(s.starts_with("CERT-"));
        let parts: Vec<&str> = s.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[2].len(), RANDOM_LEN);
        // URL 安全：全部为大写字母数字与连字符
        assert!(
            s.chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-')
        );
    }

    #[test]
    fn test_issue_no_collisions_over_large_sample() {
        let issuer = CodeIssuer::new();
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            let id = issuer.issue();
            assert!(seen.insert(id.0), "证书编号出现重复");
        }
    }

    #[test]
    fn test_ids_sort_roughly_chronologically() {
        let issuer = CodeIssuer::new();
        let first = issuer.issue();
        std::thread::sleep(std::time::Duration::from_millis(40));
        let second = issuer.issue();
        // 时间分量在前，跨毫秒签发的编号字典序递增
        assert!(second.as_str() > first.as_str());
    }

    #[test]
    fn test_verification_url() {
        let issuer = CodeIssuer::new();
        let id = CertificateId("CERT-ABC-0123456789".to_string());

        assert_eq!(
            issuer.verification_url("http://localhost:3000", &id),
            "http://localhost:3000/verify/CERT-ABC-0123456789"
        );
        // 尾部斜杠不产生双斜杠
        assert_eq!(
            issuer.verification_url("http://localhost:3000/", &id),
            "http://localhost:3000/verify/CERT-ABC-0123456789"
        );
    }

    #[test]
    fn test_to_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "Z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(36 * 36 + 1), "101");
    }
}
