//! 证书生成引擎
//!
//! 负责签发唯一验证码、渲染证书制品并批量生成：
//! 名册 + 活动描述 → 每位参与者一个独立的生成单元，
//! 成功与失败逐条收集，单个参与者的失败不影响同批其他人。

pub mod batch;
pub mod error;
pub mod render;
pub mod storage;
pub mod verify;
