//! 请求 ID 生成
//!
//! 每个进入内核的 Action 请求都会分配一个 UUID v4，用于日志关联。

/// 生成请求 ID（UUID v4）
///
/// # Example
///
/// ```
/// use chips_action::utils::id::generate_request_id;
///
/// let id = generate_request_id();
/// assert_eq!(id.len(), 36);
/// ```
pub fn generate_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_request_id_format() {
        let id = generate_request_id();
        assert_eq!(id.len(), 36);
        assert_eq!(id.matches('-').count(), 4);
    }

    #[test]
    fn test_generate_request_id_uniqueness() {
        let mut ids = HashSet::new();
        for _ in 0..1000 {
            assert!(ids.insert(generate_request_id()), "ID collision detected");
        }
    }
}
