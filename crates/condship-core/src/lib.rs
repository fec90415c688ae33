pub mod catalog;
pub mod config;
pub mod package;
pub mod rules;
pub mod telemetry;

pub use catalog::{Catalog, IdentityCatalog, StaticCatalog};
pub use config::{Config, EngineConfig};
pub use package::{Item, Package, ProductId, ProductKind, ShippingClassId};
pub use rules::{Action, Evaluator, RuleExecutor, Ruleset, RulesetRecord};
pub use telemetry::{TelemetryError, TelemetryGuard, init_logging, init_telemetry};
