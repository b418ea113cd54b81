use sha2::{Digest, Sha256}; // 引入 SHA2 算法和 Digest 特性(方法集)

// 本地指纹：只算密码学哈希 (SHA256)。
// 作用：校验页面上把“我手里这个文件”的指纹展示出来，
// 并和后端回显的 file_hash 对比，两边不一致说明传输过程中文件被改动过。
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    // `{:x}` 将 32 字节摘要转为 64 字符的小写十六进制
    format!("{:x}", hasher.finalize())
}

/// 与后端给出的哈希比对：忽略大小写和 `0x` 前缀
pub fn matches(local: &str, remote: &str) -> bool {
    fn normalize(h: &str) -> String {
        let h = h.trim();
        h.strip_prefix("0x").unwrap_or(h).to_ascii_lowercase()
    }
    let remote = normalize(remote);
    !remote.is_empty() && normalize(local) == remote
}
