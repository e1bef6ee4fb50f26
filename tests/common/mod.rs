#![allow(dead_code)]

use std::sync::Arc;

use ecr_core::config::registry::ReferenceRegistry;

pub const EMPLOYER: &str = "APHYD1234567001";
pub const OTHER_EMPLOYER: &str = "APHYD1234567002";
pub const UNLISTED_EMPLOYER: &str = "APHYD9999999999";

pub const BANK: &str = "Axis Bank";
pub const BANK_USER: &str = "Shrishti";
pub const BANK_PASSWORD: &str = "Shrishti*765";

pub const ALICE: &str =
    "100000000001#~#Alice#~#50000#~#50000#~#50000#~#50000#~#6000#~#5500#~#6000#~#0#~#0";
pub const BOB: &str =
    "100000000002#~#Bob#~#30000#~#30000#~#15000#~#30000#~#3600#~#1250#~#3600#~#2#~#100";

pub const REGISTRY_JSON: &str = r#"{
    "default_lin": "1234567890",
    "establishments": [
        { "establishment_id": "APHYD1234567001", "establishment_name": "Suhani Pvt. Ltd.", "lin": "1234567891" },
        { "establishment_id": "APHYD1234567002", "establishment_name": "Hindustan Packages Pvt. Ltd.", "lin": "1234567892" }
    ],
    "banks": [
        { "name": "Axis Bank", "account_number": "5643753275674568", "user_id": "Shrishti", "password": "Shrishti*765" },
        { "name": "State Bank of India", "account_number": "6785436735935479", "user_id": "Raman Kumar", "password": "Sinha@897" }
    ]
}"#;

pub fn registry() -> Arc<ReferenceRegistry> {
    Arc::new(ReferenceRegistry::from_json_str(REGISTRY_JSON).expect("valid registry"))
}

pub fn return_file(lines: &[&str]) -> Vec<u8> {
    lines.join("\n").into_bytes()
}
