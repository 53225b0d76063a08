//! 子代理层：过程事件、档位映射、运行缝、步骤转发、宽容解析与编排

pub mod delegate;
pub mod events;
pub mod orchestrator;
pub mod parser;
pub mod profile;
pub mod relay;
pub mod runner;

pub use delegate::{CallSubordinateTool, DelegateParallelTool};
pub use events::{StepEvent, StepKind};
pub use orchestrator::{MemoryInherit, RunAggregate, SubAgentOrchestrator};
pub use parser::{parse_task_batch, TaskSpec};
pub use profile::{resolve_profile, AgentRole};
pub use relay::StepRelay;
pub use runner::{AgentRunner, MemorySnapshot, ProviderConfig, SubAgentRun};
