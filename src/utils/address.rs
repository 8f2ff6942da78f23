use crate::error::{AppError, AppResult};
use regex::Regex;
use std::sync::OnceLock;

fn address_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^0x[0-9a-fA-F]{40}$").expect("valid address regex"))
}

/// 验证以太坊钱包地址格式 (0x + 40 位十六进制)
pub fn validate_wallet_address(address: &str) -> AppResult<()> {
    if !address_regex().is_match(address) {
        return Err(AppError::BadRequest("Invalid wallet address".to_string()));
    }
    Ok(())
}

/// 统一转为小写，作为用户身份键
pub fn normalize_wallet_address(address: &str) -> String {
    address.trim().to_ascii_lowercase()
}

/// 校验并返回小写地址；缺失时返回 BadRequest
pub fn require_wallet_address(address: Option<&str>) -> AppResult<String> {
    let address = address
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .ok_or_else(|| AppError::BadRequest("Address is required".to_string()))?;
    validate_wallet_address(address)?;
    Ok(normalize_wallet_address(address))
}

/// 大小写无关地比较两个地址
pub fn same_address(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_wallet_address() {
        assert!(validate_wallet_address("0x52908400098527886E0F7030069857D2E4169EE7").is_ok());
        assert!(validate_wallet_address("0x52908400098527886e0f7030069857d2e4169ee7").is_ok());
        assert!(validate_wallet_address("52908400098527886E0F7030069857D2E4169EE7").is_err());
        assert!(validate_wallet_address("0x52908400098527886E0F7030069857D2E4169EE").is_err());
        assert!(validate_wallet_address("0xZZ908400098527886E0F7030069857D2E4169EE7").is_err());
    }

    #[test]
    fn test_require_wallet_address() {
        assert_eq!(
            require_wallet_address(Some(" 0x52908400098527886E0F7030069857D2E4169EE7 ")).unwrap(),
            "0x52908400098527886e0f7030069857d2e4169ee7"
        );
        assert!(matches!(
            require_wallet_address(None),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            require_wallet_address(Some("")),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_same_address() {
        assert!(same_address(
            "0x52908400098527886E0F7030069857D2E4169EE7",
            "0x52908400098527886e0f7030069857d2e4169ee7"
        ));
        assert!(!same_address(
            "0x52908400098527886E0F7030069857D2E4169EE7",
            "0x8617e340b3d01fa5f11f306f4090fd50e238070d"
        ));
    }
}
