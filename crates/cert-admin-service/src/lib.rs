//! 证书管理后台服务
//!
//! 面向活动组织者的 REST API：触发证书批量生成与投递、
//! 管理聊天会话配对、查询投递状态与失败清单。

pub mod dto;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
