//! Business logic services.

#![allow(missing_docs)]

pub mod analytics;
pub mod battle;
pub mod identity;
pub mod ledger;
pub mod option;
pub mod store;
pub mod tally;

pub use analytics::{
    AnalyticsEvent, AnalyticsSink, AnalyticsSinkService, NoOpAnalyticsSink, TracingAnalyticsSink,
};
pub use battle::{
    BattleService, BattleStatus, BattleView, TrendingBattle, TrendingSettings, TrendingWindow,
};
pub use identity::{IdentityResolver, VoterIdentity};
pub use ledger::VoteLedger;
pub use option::{ContentOption, NormalizedOption, OptionError};
pub use store::{BattleFilter, BattleStore, CreateBattleInput};
pub use tally::{Tally, TallyMode, Winner, compute_tally};
