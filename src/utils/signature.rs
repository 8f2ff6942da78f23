//! 钱包签名校验 (EIP-191 personal_sign)
//!
//! 前端对创建内容 `JSON.stringify({title, description, imageUrl, prizes, address})`
//! 签名，这里必须逐字节还原同一串 JSON，否则所有签名都会被拒绝。

use crate::models::{CreateLotteryRequest, PrizeInput};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use serde::Serialize;
use sha3::{Digest, Keccak256};

/// 签名原文，字段顺序与前端一致；imageUrl 缺失时不输出该键，null 原样输出
#[derive(Serialize)]
struct CreationMessage<'a> {
    title: &'a str,
    description: &'a str,
    #[serde(rename = "imageUrl", skip_serializing_if = "Option::is_none")]
    image_url: Option<Option<&'a str>>,
    prizes: &'a [PrizeInput],
    address: &'a str,
}

/// 构造创建抽奖的签名原文
pub fn creation_message(req: &CreateLotteryRequest) -> Result<String, serde_json::Error> {
    serde_json::to_string(&CreationMessage {
        title: req.title.as_deref().unwrap_or_default(),
        description: req.description.as_deref().unwrap_or_default(),
        image_url: req.image_url.as_ref().map(|v| v.as_deref()),
        prizes: req.prizes.as_deref().unwrap_or_default(),
        address: req.address.as_deref().unwrap_or_default(),
    })
}

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// "\x19Ethereum Signed Message:\n" + len(message) + message
pub fn eip191_hash(message: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(format!("\x19Ethereum Signed Message:\n{}", message.len()).as_bytes());
    hasher.update(message);
    hasher.finalize().into()
}

/// 公钥对应的小写地址
pub fn address_from_verifying_key(key: &VerifyingKey) -> String {
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    format!("0x{}", hex::encode(&hash[12..]))
}

/// 从 personal_sign 签名恢复签名地址，任何解析/恢复失败都返回 None
pub fn recover_address(message: &[u8], signature: &str) -> Option<String> {
    let raw = signature.trim();
    let raw = raw.strip_prefix("0x").unwrap_or(raw);
    let bytes = hex::decode(raw).ok()?;
    if bytes.len() != 65 {
        return None;
    }

    let v = match bytes[64] {
        0 | 1 => bytes[64],
        27 | 28 => bytes[64] - 27,
        _ => return None,
    };

    let mut sig = Signature::from_slice(&bytes[..64]).ok()?;
    let mut recid = RecoveryId::from_byte(v)?;
    // high-S 签名归一化后 y 的奇偶性翻转
    if let Some(normalized) = sig.normalize_s() {
        sig = normalized;
        recid = RecoveryId::new(!recid.is_y_odd(), recid.is_x_reduced());
    }

    let hash = eip191_hash(message);
    let key = VerifyingKey::recover_from_prehash(&hash, &sig, recid).ok()?;
    Some(address_from_verifying_key(&key))
}

/// 校验 message 是否由 address 签名（大小写无关）
pub fn verify_signature(message: &str, signature: &str, address: &str) -> bool {
    match recover_address(message.as_bytes(), signature) {
        Some(recovered) => {
            let ok = recovered.eq_ignore_ascii_case(address.trim());
            if !ok {
                log::debug!("Signature recovered {recovered}, expected {address}");
            }
            ok
        }
        None => {
            log::debug!("Signature recovery failed for {address}");
            false
        }
    }
}

/// 测试用：模拟钱包 personal_sign
#[cfg(test)]
pub(crate) fn personal_sign(key: &k256::ecdsa::SigningKey, message: &str) -> String {
    let hash = eip191_hash(message.as_bytes());
    let (sig, recid) = key.sign_prehash_recoverable(&hash).unwrap();
    let mut bytes = sig.to_bytes().to_vec();
    bytes.push(recid.to_byte() + 27);
    format!("0x{}", hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::SigningKey;

    fn signing_key(seed: u8) -> SigningKey {
        SigningKey::from_slice(&[seed; 32]).unwrap()
    }

    fn sample_request(address: &str) -> CreateLotteryRequest {
        CreateLotteryRequest {
            title: Some("Launch party".to_string()),
            description: Some("Win some swag".to_string()),
            image_url: None,
            prizes: Some(vec![
                PrizeInput {
                    level: 1,
                    name: "T-shirt".to_string(),
                    amount: 2,
                },
                PrizeInput {
                    level: 2,
                    name: "Sticker".to_string(),
                    amount: 5,
                },
            ]),
            address: Some(address.to_string()),
            signature: None,
        }
    }

    #[test]
    fn test_keccak256_empty() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_creation_message_matches_frontend_json() {
        let req = sample_request("0xabc");
        assert_eq!(
            creation_message(&req).unwrap(),
            r#"{"title":"Launch party","description":"Win some swag","prizes":[{"level":1,"name":"T-shirt","amount":2},{"level":2,"name":"Sticker","amount":5}],"address":"0xabc"}"#
        );

        let mut with_image = req;
        with_image.image_url = Some(Some(String::new()));
        assert!(
            creation_message(&with_image)
                .unwrap()
                .contains(r#""description":"Win some swag","imageUrl":"","prizes""#)
        );

        let mut with_null = with_image;
        with_null.image_url = Some(None);
        assert!(
            creation_message(&with_null)
                .unwrap()
                .contains(r#""description":"Win some swag","imageUrl":null,"prizes""#)
        );
    }

    #[test]
    fn test_verify_signature_roundtrip() {
        let key = signing_key(7);
        let address = address_from_verifying_key(key.verifying_key());
        let message = creation_message(&sample_request(&address)).unwrap();
        let signature = personal_sign(&key, &message);

        assert!(verify_signature(&message, &signature, &address));
        // 地址大小写不影响
        assert!(verify_signature(
            &message,
            &signature,
            &address.to_ascii_uppercase().replacen("0X", "0x", 1)
        ));
        // 不带 0x 前缀的签名同样可用
        assert!(verify_signature(
            &message,
            signature.trim_start_matches("0x"),
            &address
        ));
    }

    #[test]
    fn test_verify_signature_rejects_other_signer_and_tampering() {
        let key = signing_key(7);
        let other = signing_key(9);
        let address = address_from_verifying_key(key.verifying_key());
        let message = creation_message(&sample_request(&address)).unwrap();

        let forged = personal_sign(&other, &message);
        assert!(!verify_signature(&message, &forged, &address));

        let signature = personal_sign(&key, &message);
        let tampered = message.replace("Launch party", "Launch partY");
        assert!(!verify_signature(&tampered, &signature, &address));
    }

    #[test]
    fn test_malformed_signature_is_false_not_panic() {
        let address = "0x52908400098527886e0f7030069857d2e4169ee7";
        assert!(!verify_signature("hello", "", address));
        assert!(!verify_signature("hello", "0xzz", address));
        assert!(!verify_signature("hello", &format!("0x{}", "11".repeat(64)), address));
        // v 非法
        assert!(!verify_signature("hello", &format!("0x{}05", "11".repeat(64)), address));
    }
}
