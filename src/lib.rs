//! Swarm - 工具执行与子代理编排引擎
//!
//! 模块划分：
//! - **agents**: 子代理编排（事件、档位、运行缝、步骤转发、宽容解析、委派工具）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误分类、挂起操作表（回调 -> await 桥接）、并发槽位池
//! - **observability**: tracing 初始化
//! - **runtime**: 组件装配（执行器 + 编排器 + 共享表）
//! - **tools**: Tool 契约、注册表、执行器（超时竞速 + 熔断记账）

pub mod agents;
pub mod config;
pub mod core;
pub mod observability;
pub mod runtime;
pub mod tools;

pub use runtime::{create_components, Components};
