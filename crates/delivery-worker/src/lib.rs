//! 证书投递工作器
//!
//! 承接生成引擎产出的证书制品，经邮件与聊天两个渠道适配器对外投递，
//! 由编排器负责批次切分、节奏控制与结果回写。渠道适配器把传输失败
//! 折叠为渠道结果，不向编排器抛出异常。

pub mod chat;
pub mod email;
pub mod error;
pub mod orchestrator;
pub mod outcome;
pub mod templates;
